//! Server error types with HTTP status code mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

use cmwell_consume_service::{CursorError, ServiceError};
use cmwell_record_format::FormatError;

/// Server error type wrapping service errors and providing HTTP status
/// mapping.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Generic bad request error
    #[error("{0}")]
    BadRequest(String),

    /// Undecodable or inconsistent position token
    #[error("{0}")]
    Cursor(#[from] CursorError),

    /// Unstreamable format selector
    #[error("{0}")]
    Format(#[from] FormatError),

    /// Collaborator failure during discovery or streaming
    #[error("{0}")]
    Service(#[from] ServiceError),
}

impl ServerError {
    /// Create a bad request error
    pub fn bad_request(msg: impl Into<String>) -> Self {
        ServerError::BadRequest(msg.into())
    }

    /// Map error to HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 400 - Bad Request (client errors)
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::Cursor(_) => StatusCode::BAD_REQUEST,
            ServerError::Format(_) => StatusCode::BAD_REQUEST,
            ServerError::Service(ServiceError::InvalidFilter { .. }) => StatusCode::BAD_REQUEST,

            // 500 - transient backend failures surface as-is; the client
            // re-issues the same position
            ServerError::Service(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// JSON error response body
#[derive(Serialize)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
    /// HTTP status code
    pub status: u16,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: self.to_string(),
            status: status.as_u16(),
        };
        let json = serde_json::to_string(&body).unwrap_or_else(|_| {
            format!(r#"{{"error":"{}","status":{}}}"#, self, status.as_u16())
        });

        (status, [("content-type", "application/json")], json).into_response()
    }
}

/// Result type alias for server operations
pub type Result<T> = std::result::Result<T, ServerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ServerError::bad_request("nope").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServerError::Service(ServiceError::search("backend down")).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ServerError::Service(ServiceError::invalid_filter("bad qp")).status_code(),
            StatusCode::BAD_REQUEST
        );
    }
}
