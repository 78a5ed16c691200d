//! Storefront error types.

use thiserror::Error;
use vitrine_core::RecordError;
use vitrine_gateway::GatewayError;

/// Errors that can occur in shopper-facing operations.
///
/// Mutations return these to the caller with the backend's message intact;
/// loads additionally degrade the in-memory snapshot to empty so a view
/// never renders stale lines next to an error.
#[derive(Debug, Error)]
pub enum StorefrontError {
    /// The operation requires a signed-in account.
    #[error("sign in to continue")]
    LoginRequired,

    /// A referenced resource does not exist (anymore).
    #[error("not found: {0}")]
    NotFound(String),

    /// Password too weak or invalid.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// Backend call failed.
    #[error("backend error: {0}")]
    Gateway(#[from] GatewayError),

    /// A row did not match its record shape.
    #[error(transparent)]
    Record(#[from] RecordError),
}
