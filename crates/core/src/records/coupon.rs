//! Coupon records.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::CouponId;

/// How a coupon's `discount_value` is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscountType {
    /// `discount_value` is a percentage of the order total, 0 to 100.
    Percent,
    /// `discount_value` is a fixed amount, non-negative.
    Fixed,
}

impl std::fmt::Display for DiscountType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Percent => write!(f, "percent"),
            Self::Fixed => write!(f, "fixed"),
        }
    }
}

/// A row of the `coupons` table.
///
/// Codes are stored trimmed and upper-cased, and the table carries a
/// case-insensitive unique index on `code`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coupon {
    pub id: CouponId,
    pub code: String,
    pub discount_type: DiscountType,
    pub discount_value: Decimal,
    /// Maximum number of redemptions, unlimited when absent.
    pub usage_limit: Option<i64>,
    #[serde(default)]
    pub used_count: i64,
    pub expiration_date: Option<NaiveDate>,
    /// Minimum order total the coupon applies to.
    pub min_order_value: Option<Decimal>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Coupon {
    /// Table this record is stored in.
    pub const TABLE: &'static str = "coupons";
}
