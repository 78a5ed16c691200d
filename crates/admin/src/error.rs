//! Unified error handling for back-office operations.

use thiserror::Error;
use vitrine_core::RecordError;
use vitrine_gateway::GatewayError;

use crate::coupons::CouponFormErrors;
use crate::products::ProductFormErrors;

/// Application-level error type for admin flows.
#[derive(Debug, Error)]
pub enum AdminError {
    /// Coupon form rejected with per-field messages.
    #[error("{0}")]
    CouponForm(CouponFormErrors),

    /// Product form rejected with per-field messages.
    #[error("{0}")]
    ProductForm(ProductFormErrors),

    /// A unique value is already taken.
    #[error("{0} already exists")]
    AlreadyExists(String),

    /// Input rejected before reaching the backend.
    #[error("invalid input: {0}")]
    Invalid(String),

    /// The operation requires a signed-in account.
    #[error("sign in to continue")]
    LoginRequired,

    /// The signed-in account lacks permission.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Resource not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Backend call failed.
    #[error("backend error: {0}")]
    Gateway(#[from] GatewayError),

    /// A row did not match its record shape.
    #[error(transparent)]
    Record(#[from] RecordError),
}
