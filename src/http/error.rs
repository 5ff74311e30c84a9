//! Error to HTTP response mapping.

use crate::Error;
use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// Body of every error response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Human-readable description.
    pub message: String,
    /// Stable machine-readable code.
    pub code: &'static str,
}

/// Returns the HTTP status for an error.
#[must_use]
pub const fn status_for(error: &Error) -> StatusCode {
    match error {
        Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
        Error::NotFound(_) => StatusCode::NOT_FOUND,
        Error::UpstreamUnavailable { .. } => StatusCode::BAD_GATEWAY,
        Error::CacheUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        Error::StoreWriteFailure { .. } | Error::OperationFailed { .. } => {
            StatusCode::INTERNAL_SERVER_ERROR
        },
        Error::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        Error::FeatureNotEnabled(_) => StatusCode::NOT_IMPLEMENTED,
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = status_for(&self);
        if status.is_server_error() {
            tracing::error!(error = %self, code = self.code(), "request failed");
        } else {
            tracing::debug!(error = %self, code = self.code(), "request rejected");
        }
        metrics::counter!("newsroom_http_errors_total", "code" => self.code()).increment(1);

        let body = ErrorBody {
            message: self.to_string(),
            code: self.code(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for Error {
    fn from(rejection: JsonRejection) -> Self {
        Self::InvalidInput(format!("request body: {}", rejection.body_text()))
    }
}

impl From<PathRejection> for Error {
    fn from(rejection: PathRejection) -> Self {
        Self::InvalidInput(format!("path: {}", rejection.body_text()))
    }
}

impl From<QueryRejection> for Error {
    fn from(rejection: QueryRejection) -> Self {
        Self::InvalidInput(format!("query string: {}", rejection.body_text()))
    }
}
