//! Favorite records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{AccountId, FavoriteId, ProductId};

/// A row of the `favorites` table.
///
/// At most one row per (account, product); adding an already-favorited
/// product is a no-op.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FavoriteItem {
    pub id: FavoriteId,
    pub user_id: AccountId,
    pub product_id: ProductId,
    pub created_at: DateTime<Utc>,
}

impl FavoriteItem {
    /// Table this record is stored in.
    pub const TABLE: &'static str = "favorites";
}
