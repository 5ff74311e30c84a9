//! Bearer token authentication.
//!
//! Every `/news` and `/history` route requires `Authorization: Bearer <JWT>`
//! signed with HS256. The `sub` claim names the user whose history is read
//! or written.
//!
//! # Configuration
//!
//! - `[server] jwt_secret` or `NEWSROOM_JWT_SECRET`: required, 32+ characters.
//! - `[server] jwt_issuer`: optional expected `iss` claim.
//! - `[server] jwt_audience`: optional expected `aud` claim.

use crate::config::ServerConfig;
use crate::models::UserId;
use crate::{Error, Result};
use jsonwebtoken::{Algorithm, DecodingKey, TokenData, Validation, decode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// Minimum secret key length.
const MIN_SECRET_LENGTH: usize = 32;

/// A 32+ character secret with fewer unique characters is rejected.
const MIN_UNIQUE_CHARS: usize = 8;

fn validate_secret_entropy(secret: &str) -> std::result::Result<(), String> {
    let unique_chars: HashSet<char> = secret.chars().collect();
    if unique_chars.len() < MIN_UNIQUE_CHARS {
        return Err(format!(
            "JWT secret has insufficient entropy: only {} unique characters (minimum: {MIN_UNIQUE_CHARS})",
            unique_chars.len()
        ));
    }

    let lowercase = secret.to_lowercase();
    let weak_patterns = ["password", "123456", "abcdef", "qwerty", "000000", "aaaaaa"];
    for pattern in weak_patterns {
        if lowercase.contains(pattern) {
            return Err(format!("JWT secret contains weak pattern '{pattern}'"));
        }
    }

    Ok(())
}

/// JWT claims.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject: the user id.
    pub sub: String,
    /// Expiration time (Unix timestamp).
    pub exp: u64,
    /// Issued at (Unix timestamp).
    #[serde(default)]
    pub iat: u64,
    /// Issuer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    /// Audience.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,
}

/// JWT validation settings.
#[derive(Clone)]
pub struct JwtConfig {
    secret: SecretString,
    issuer: Option<String>,
    audience: Option<String>,
}

impl fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtConfig")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .finish_non_exhaustive()
    }
}

impl JwtConfig {
    /// Builds JWT settings from the server section.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if no secret is configured, it is
    /// shorter than 32 characters, or it has too little entropy.
    pub fn from_server(server: &ServerConfig) -> Result<Self> {
        let secret = server.jwt_secret.as_ref().ok_or_else(|| {
            Error::InvalidInput(
                "JWT secret not configured (set NEWSROOM_JWT_SECRET or [server] jwt_secret)"
                    .to_string(),
            )
        })?;

        let exposed = secret.expose_secret();
        if exposed.len() < MIN_SECRET_LENGTH {
            return Err(Error::InvalidInput(format!(
                "JWT secret must be at least {MIN_SECRET_LENGTH} characters (got {})",
                exposed.len()
            )));
        }
        validate_secret_entropy(exposed).map_err(Error::InvalidInput)?;

        Ok(Self {
            secret: secret.clone(),
            issuer: server.jwt_issuer.clone(),
            audience: server.jwt_audience.clone(),
        })
    }

    /// Creates settings with an explicit secret and no strength checks.
    #[must_use]
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: SecretString::from(secret.into()),
            issuer: None,
            audience: None,
        }
    }

    /// Sets the expected issuer.
    #[must_use]
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    /// Sets the expected audience.
    #[must_use]
    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = Some(audience.into());
        self
    }
}

/// Validates bearer tokens.
#[derive(Clone)]
pub struct JwtAuthenticator {
    decoding_key: Arc<DecodingKey>,
    validation: Validation,
}

impl fmt::Debug for JwtAuthenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtAuthenticator")
            .field("validation", &self.validation)
            .finish_non_exhaustive()
    }
}

impl JwtAuthenticator {
    /// Creates an authenticator.
    #[must_use]
    pub fn new(config: &JwtConfig) -> Self {
        let decoding_key = Arc::new(DecodingKey::from_secret(
            config.secret.expose_secret().as_bytes(),
        ));

        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        if let Some(issuer) = &config.issuer {
            validation.set_issuer(&[issuer]);
        }
        if let Some(audience) = &config.audience {
            validation.set_audience(&[audience]);
        }

        Self {
            decoding_key,
            validation,
        }
    }

    /// Validates a token and returns its claims.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unauthorized`] if the token is malformed, expired,
    /// badly signed or fails issuer/audience checks.
    pub fn validate(&self, token: &str) -> Result<Claims> {
        let token_data: TokenData<Claims> = decode(token, &self.decoding_key, &self.validation)
            .map_err(|e| {
                tracing::warn!(error = %e, "JWT validation failed");
                Error::Unauthorized(format!("invalid token: {e}"))
            })?;
        Ok(token_data.claims)
    }

    /// Validates an `Authorization` header value and returns the user.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unauthorized`] if the header is not a bearer token,
    /// the token is invalid, or its subject is not a valid user id.
    pub fn authenticate(&self, auth_header: &str) -> Result<UserId> {
        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| Error::Unauthorized("invalid Authorization header format".to_string()))?;

        let claims = self.validate(token.trim())?;
        let user = UserId::parse(&claims.sub)
            .map_err(|e| Error::Unauthorized(format!("invalid subject claim: {e}")))?;
        tracing::debug!(user_id = %user, "bearer token accepted");
        Ok(user)
    }
}
