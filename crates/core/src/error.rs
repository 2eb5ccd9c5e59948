use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use kafka_admin_broker::{BrokerError, BrokerErrorKind};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// The result type for this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in this crate.
#[derive(Debug, Error)]
pub enum Error {
    /// Core already started.
    #[error("Server already started")]
    AlreadyStarted,

    /// HTTP server error.
    #[error("http server error: {0}")]
    HttpServer(String),

    /// HTTP server exited without being asked to.
    #[error("http server stopped unexpectedly")]
    HttpServerStopped,
}

/// Error returned from a handler, rendered as `{"error": "..."}`.
#[derive(Debug)]
pub(crate) struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub(crate) fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub(crate) fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }

    pub(crate) fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }

    /// Logs a failed broker operation and maps it to a status by kind.
    pub(crate) fn broker<E: BrokerError>(operation: &'static str, error: &E) -> Self {
        let status = match error.kind() {
            BrokerErrorKind::NotFound => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        error!(kind = %error.kind(), error = %error, "{operation} failed");

        Self {
            status,
            message: error.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}
