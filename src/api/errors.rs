use crate::errors::ErrorKind;
use crate::protocol::ChatFailure;
use crate::relay::RelayFailure;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

/// Failure body returned by every relay endpoint
///
/// Always carries an in-character fallback so the front-end has something
/// to show instead of a raw error.
#[derive(Debug, Clone)]
pub struct ApiError {
    pub message: String,
    pub code: ErrorKind,
    pub fallback: String,
    pub status: StatusCode,
}

impl ApiError {
    pub fn new(code: ErrorKind) -> Self {
        RelayFailure::new(code).into()
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }
}

impl From<RelayFailure> for ApiError {
    fn from(failure: RelayFailure) -> Self {
        ApiError {
            status: failure.kind.http_status(),
            message: failure.message,
            code: failure.kind,
            fallback: failure.fallback,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ChatFailure {
            success: false,
            error: self.message,
            code: self.code,
            fallback: Some(self.fallback),
        });
        (self.status, body).into_response()
    }
}
