//! Order records.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::OrderId;

/// A row of the `orders` table.
///
/// Orders are written by checkout, which lives outside this system; here
/// they are only read for dashboard metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub total_price: Decimal,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Table this record is stored in.
    pub const TABLE: &'static str = "orders";

    /// Status excluded from revenue metrics.
    pub const STATUS_CANCELLED: &'static str = "cancelled";
}
