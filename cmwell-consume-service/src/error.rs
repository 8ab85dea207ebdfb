//! Service-level error types.
//!
//! These are internal to the coordinator; the HTTP layer maps them onto
//! status codes before they reach a client.

use thiserror::Error;

/// Errors surfaced by the coordinator's collaborators.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The backing index failed a thin search.
    #[error("search backend error: {message}")]
    Search { message: String },

    /// The scroll source failed to start or continue a stream.
    #[error("scroll source error: {message}")]
    Scroll { message: String },

    /// The record-body resolver failed.
    #[error("record body resolver error: {message}")]
    Resolve { message: String },

    /// A field-filter expression could not be parsed or resolved.
    #[error("invalid field filter: {message}")]
    InvalidFilter { message: String },
}

impl ServiceError {
    pub fn search(message: impl Into<String>) -> Self {
        ServiceError::Search {
            message: message.into(),
        }
    }

    pub fn scroll(message: impl Into<String>) -> Self {
        ServiceError::Scroll {
            message: message.into(),
        }
    }

    pub fn invalid_filter(message: impl Into<String>) -> Self {
        ServiceError::InvalidFilter {
            message: message.into(),
        }
    }
}

/// Result type alias for service operations.
pub type Result<T> = std::result::Result<T, ServiceError>;
