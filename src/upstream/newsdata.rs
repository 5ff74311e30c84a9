//! newsdata.io client.
//!
//! Both endpoints answer `{status, totalResults, results, nextPage}`. On
//! failure the provider sets `status` to `"error"` and puts
//! `{message, code}` in `results`, sometimes with a 2xx status code, so the
//! body is always inspected.

use super::{LatestQuery, NewsProvider, SourcesQuery};
use crate::config::UpstreamConfig;
use crate::models::{Article, Page, Source};
use crate::{Error, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;

/// HTTP client for the newsdata.io API.
#[derive(Debug, Clone)]
pub struct NewsDataClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<SecretString>,
    country: Option<String>,
}

impl NewsDataClient {
    /// Default API endpoint.
    pub const DEFAULT_BASE_URL: &'static str = "https://newsdata.io/api/1";

    /// Builds a client from upstream settings.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OperationFailed`] if the HTTP client cannot be built.
    pub fn from_config(config: &UpstreamConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.timeout_secs.min(5)))
            .user_agent(concat!("newsroom/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::failed("build_http_client", e))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            country: config.country.clone(),
        })
    }

    /// Returns the configured base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn latest_params(&self, query: &LatestQuery) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(country) = &self.country {
            params.push(("country", country.clone()));
        }
        let optional = [
            ("language", &query.language),
            ("domain", &query.domain),
            ("qInTitle", &query.title_query),
            ("category", &query.category),
            ("page", &query.page),
        ];
        for (name, value) in optional {
            if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
                params.push((name, value.to_string()));
            }
        }
        params
    }

    fn sources_params(&self, query: &SourcesQuery) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(country) = &self.country {
            params.push(("country", country.clone()));
        }
        if let Some(language) = query.language.as_deref().filter(|v| !v.is_empty()) {
            params.push(("language", language.to_string()));
        }
        params
    }

    async fn request(&self, endpoint: &'static str, params: &[(&'static str, String)]) -> Result<Value> {
        let api_key = self
            .api_key
            .as_ref()
            .ok_or_else(|| Error::upstream(endpoint, "API key not configured"))?;

        let result = self.send(endpoint, api_key, params).await;
        let outcome = match &result {
            Ok(_) => "success",
            Err(_) => "error",
        };
        metrics::counter!(
            "newsroom_upstream_requests_total",
            "endpoint" => endpoint,
            "outcome" => outcome
        )
        .increment(1);
        result
    }

    async fn send(
        &self,
        endpoint: &'static str,
        api_key: &SecretString,
        params: &[(&'static str, String)],
    ) -> Result<Value> {
        let response = self
            .client
            .get(format!("{}/{endpoint}", self.base_url))
            .query(&[("apikey", api_key.expose_secret())])
            .query(params)
            .send()
            .await
            .map_err(|e| {
                let e = e.without_url();
                let error_kind = if e.is_timeout() {
                    "timeout"
                } else if e.is_connect() {
                    "connect"
                } else {
                    "request"
                };
                tracing::warn!(endpoint, error_kind, error = %e, "upstream request failed");
                Error::upstream(endpoint, format!("{error_kind} error: {e}"))
            })?;

        let status = response.status();
        let body: Value = response.json().await.unwrap_or(Value::Null);

        if status == StatusCode::TOO_MANY_REQUESTS {
            tracing::warn!(endpoint, "upstream rate limit reached");
            return Err(Error::upstream(
                endpoint,
                format!("rate limited: {}", provider_message(&body)),
            ));
        }
        if !status.is_success() || body.get("status").and_then(Value::as_str) == Some("error") {
            let message = provider_message(&body);
            tracing::warn!(endpoint, status = %status, message = %message, "upstream returned an error");
            return Err(Error::upstream(endpoint, format!("status {status}: {message}")));
        }
        if body.is_null() {
            return Err(Error::upstream(endpoint, "response body is not JSON"));
        }

        Ok(body)
    }
}

/// Extracts the provider's error message, if any.
fn provider_message(body: &Value) -> String {
    body.get("results")
        .and_then(|r| r.get("message"))
        .or_else(|| body.get("message"))
        .and_then(Value::as_str)
        .unwrap_or("no message")
        .to_string()
}

/// Decodes the `results` array; `null` or missing means no records.
fn decode_results<T: DeserializeOwned>(endpoint: &str, body: &mut Value) -> Result<Vec<T>> {
    match body.get_mut("results").map(Value::take) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(results) => serde_json::from_value(results)
            .map_err(|e| Error::upstream(endpoint, format!("undecodable results: {e}"))),
    }
}

/// Reads `nextPage`, which the provider sends as a string or a number.
fn next_page_token(body: &Value) -> Option<String> {
    match body.get("nextPage")? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn decode_page(mut body: Value) -> Result<Page<Article>> {
    let next_page = next_page_token(&body);
    let results = decode_results("latest", &mut body)?;
    Ok(Page::new(results, next_page))
}

#[async_trait]
impl NewsProvider for NewsDataClient {
    fn name(&self) -> &'static str {
        "newsdata"
    }

    async fn latest(&self, query: &LatestQuery) -> Result<Page<Article>> {
        let body = self.request("latest", &self.latest_params(query)).await?;
        decode_page(body)
    }

    async fn sources(&self, query: &SourcesQuery) -> Result<Vec<Source>> {
        let mut body = self.request("sources", &self.sources_params(query)).await?;
        decode_results("sources", &mut body)
    }
}
