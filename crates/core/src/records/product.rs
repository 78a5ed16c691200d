//! Product records.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{AccountId, CategoryId, ProductId};

/// A row of the `products` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub price: Decimal,
    pub category_id: Option<CategoryId>,
    pub size: Option<String>,
    pub description: Option<String>,
    /// Public URLs of uploaded images, upload order. At most
    /// [`Product::MAX_IMAGES`] entries.
    #[serde(default)]
    pub images: Vec<String>,
    /// Public URL of the primary image; always the first entry of `images`
    /// when that list is non-empty.
    pub image_url: Option<String>,
    #[serde(default)]
    pub featured: bool,
    #[serde(default = "default_in_stock")]
    pub in_stock: bool,
    /// Account that created the product.
    pub created_by: Option<AccountId>,
    pub created_at: DateTime<Utc>,
}

const fn default_in_stock() -> bool {
    true
}

impl Product {
    /// Table this record is stored in.
    pub const TABLE: &'static str = "products";

    /// Maximum number of images a product may carry.
    pub const MAX_IMAGES: usize = 5;
}

/// The slice of a product that cart and favorites views render.
///
/// Parsed from full `products` rows but deliberately tolerant: a row whose
/// price is missing still parses, and consumers treat the absent price as
/// zero rather than failing the whole snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductSummary {
    pub id: ProductId,
    pub name: String,
    pub price: Option<Decimal>,
    pub image_url: Option<String>,
}

impl ProductSummary {
    /// The price to charge, with a missing price counting as zero.
    #[must_use]
    pub fn price_or_zero(&self) -> Decimal {
        self.price.unwrap_or(Decimal::ZERO)
    }
}
