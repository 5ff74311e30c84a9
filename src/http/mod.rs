//! HTTP surface.
//!
//! Routes mirror the service operations one to one. Everything under
//! `/news` and `/history` requires a bearer token; `/health` does not.

pub mod auth;
pub mod error;
pub mod handlers;

pub use auth::{Claims, JwtAuthenticator, JwtConfig};
pub use error::{ErrorBody, status_for};
pub use handlers::AuthenticatedUser;

use crate::config::NewsroomConfig;
use crate::services::ServiceContainer;
use crate::{Error, Result};
use axum::Router;
use axum::extract::FromRef;
use axum::http::header;
use axum::routing::{get, post};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

/// Shared state of every handler.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Application services.
    pub services: ServiceContainer,
    /// Bearer token validator.
    pub authenticator: JwtAuthenticator,
}

impl FromRef<AppState> for JwtAuthenticator {
    fn from_ref(state: &AppState) -> Self {
        state.authenticator.clone()
    }
}

/// Builds the application router.
pub fn router(services: ServiceContainer, authenticator: JwtAuthenticator) -> Router {
    let state = AppState {
        services,
        authenticator,
    };

    let news = Router::new()
        .route("/lang/{language}", get(handlers::latest_by_language))
        .route("/sources/{language}", get(handlers::sources))
        .route("/search", get(handlers::search))
        .route("/next-search", get(handlers::next_search))
        .route("/next-page/{domain}", get(handlers::next_domain_page))
        .route("/{domain}", get(handlers::domain));

    let history = Router::new()
        .route("/save-news", post(handlers::save_news))
        .route("/fetch-history", get(handlers::fetch_history))
        .route("/recommendations", get(handlers::recommendations));

    Router::new()
        .route("/health", get(handlers::health))
        .nest("/news", news)
        .nest("/history", history)
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            header::HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            header::HeaderValue::from_static("no-store"),
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serves the API until Ctrl-C.
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] if no usable JWT secret is configured, or
/// [`Error::OperationFailed`] if the listener cannot bind.
pub async fn serve(config: &NewsroomConfig, services: ServiceContainer) -> Result<()> {
    let authenticator = JwtAuthenticator::new(&JwtConfig::from_server(&config.server)?);
    let app = router(services, authenticator);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| Error::failed("bind", format!("{addr}: {e}")))?;
    tracing::info!(%addr, "newsroom listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| Error::failed("serve", e))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}
