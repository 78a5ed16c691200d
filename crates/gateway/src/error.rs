//! Gateway error types.

use thiserror::Error;

/// Errors that can occur when talking to the backend.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// HTTP transport failed before a response was produced.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with a non-success status.
    #[error("backend error ({status}): {message}")]
    Api {
        /// HTTP status code of the response.
        status: u16,
        /// Message extracted from the response body.
        message: String,
    },

    /// A unique index rejected the write.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The operation requires a signed-in account and none is held.
    #[error("authentication required")]
    AuthRequired,

    /// A response body did not parse as the expected JSON shape.
    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),
}

impl GatewayError {
    /// Whether this error is a unique-index conflict.
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_display() {
        let err = GatewayError::Api {
            status: 400,
            message: "invalid input syntax".to_string(),
        };
        assert_eq!(err.to_string(), "backend error (400): invalid input syntax");
    }

    #[test]
    fn test_conflict_detection() {
        assert!(GatewayError::Conflict("code".to_string()).is_conflict());
        assert!(!GatewayError::AuthRequired.is_conflict());
    }
}
