//! Cart item records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{AccountId, CartItemId, ProductId};

/// A row of the `cart_items` table.
///
/// One row per (account, product); repeated adds accumulate `quantity`
/// instead of inserting a second row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub id: CartItemId,
    pub user_id: AccountId,
    pub product_id: ProductId,
    pub quantity: i64,
    pub created_at: DateTime<Utc>,
}

impl CartItem {
    /// Table this record is stored in.
    pub const TABLE: &'static str = "cart_items";
}
