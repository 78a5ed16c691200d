//! Favorites (wishlist) state.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{instrument, warn};
use vitrine_core::{
    AccountId, FavoriteId, FavoriteItem, Product, ProductId, ProductSummary, Row, parse_rows,
};
use vitrine_gateway::{BackendGateway, Filter, Order, Query};

use crate::error::StorefrontError;

/// One favorite row joined with its product summary.
///
/// Unlike cart lines, a favorite without a live product is dropped at load
/// time, so the product here is always present.
#[derive(Debug, Clone)]
pub struct FavoriteLine {
    pub favorite: FavoriteItem,
    pub product: ProductSummary,
}

/// What an [`FavoritesState::add`] call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddToFavorites {
    /// A new favorite row was inserted.
    Added,
    /// The product was already favorited; nothing was written.
    AlreadyFavorited,
}

struct FavoritesInner {
    gateway: Arc<dyn BackendGateway>,
    lines: RwLock<Vec<FavoriteLine>>,
    /// Serializes mutations so a double-submitted add stays a single row.
    mutation: Mutex<()>,
}

/// Account-scoped favorites snapshot, synchronized with the backend.
///
/// Same shape as the cart container: cheap to clone, clones share state,
/// every mutation reloads the snapshot.
#[derive(Clone)]
pub struct FavoritesState {
    inner: Arc<FavoritesInner>,
}

impl FavoritesState {
    #[must_use]
    pub fn new(gateway: Arc<dyn BackendGateway>) -> Self {
        Self {
            inner: Arc::new(FavoritesInner {
                gateway,
                lines: RwLock::new(Vec::new()),
                mutation: Mutex::new(()),
            }),
        }
    }

    /// Replace the snapshot with the account's favorites, oldest first.
    ///
    /// Favorites whose product no longer exists are dropped silently; the
    /// dangling rows stay in the backend but never reach a view.
    ///
    /// # Errors
    ///
    /// Returns the gateway or row-parsing error that interrupted the load.
    #[instrument(skip(self))]
    pub async fn load(&self) -> Result<(), StorefrontError> {
        let Some(session) = self.inner.gateway.session() else {
            self.inner.lines.write().clear();
            return Ok(());
        };

        match self.fetch_lines(session.account_id()).await {
            Ok(lines) => {
                *self.inner.lines.write() = lines;
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "favorites load failed");
                self.inner.lines.write().clear();
                Err(e)
            }
        }
    }

    /// Favorite a product.
    ///
    /// Idempotent: if the account already favorited the product (checked
    /// against the backend, not the snapshot), reports
    /// [`AddToFavorites::AlreadyFavorited`] without writing. The product
    /// must still exist; favoriting a product deleted meanwhile fails
    /// instead of planting a dangling row.
    ///
    /// # Errors
    ///
    /// Returns [`StorefrontError::LoginRequired`] without a session,
    /// [`StorefrontError::NotFound`] when the product is gone, or the
    /// gateway's error if a call fails.
    #[instrument(skip(self), fields(product = %product_id))]
    pub async fn add(&self, product_id: ProductId) -> Result<AddToFavorites, StorefrontError> {
        let Some(session) = self.inner.gateway.session() else {
            return Err(StorefrontError::LoginRequired);
        };
        let account = session.account_id();
        let _guard = self.inner.mutation.lock().await;

        let existing = self
            .inner
            .gateway
            .select_one(
                FavoriteItem::TABLE,
                Query::new()
                    .filter(Filter::eq("user_id", account.to_string()))
                    .filter(Filter::eq("product_id", product_id.as_i64())),
            )
            .await?;
        if existing.is_some() {
            return Ok(AddToFavorites::AlreadyFavorited);
        }

        let product = self
            .inner
            .gateway
            .select_one(
                Product::TABLE,
                Query::new().filter(Filter::eq("id", product_id.as_i64())),
            )
            .await?;
        if product.is_none() {
            return Err(StorefrontError::NotFound(format!("product {product_id}")));
        }

        let mut row = Row::new();
        row.insert("user_id".to_string(), Value::from(account.to_string()));
        row.insert("product_id".to_string(), Value::from(product_id.as_i64()));
        self.inner.gateway.insert(FavoriteItem::TABLE, row).await?;

        self.resync(account).await?;
        Ok(AddToFavorites::Added)
    }

    /// Unfavorite by favorite row id.
    ///
    /// # Errors
    ///
    /// Returns the gateway's error if the delete or reload fails.
    #[instrument(skip(self), fields(favorite = %favorite_id))]
    pub async fn remove(&self, favorite_id: FavoriteId) -> Result<(), StorefrontError> {
        let _guard = self.inner.mutation.lock().await;

        self.inner
            .gateway
            .delete(
                FavoriteItem::TABLE,
                &[Filter::eq("id", favorite_id.as_i64())],
            )
            .await?;

        match self.inner.gateway.session() {
            Some(session) => self.resync(session.account_id()).await,
            None => {
                self.inner.lines.write().clear();
                Ok(())
            }
        }
    }

    /// Whether the snapshot holds a favorite for `product_id`.
    #[must_use]
    pub fn is_favorited(&self, product_id: ProductId) -> bool {
        self.inner
            .lines
            .read()
            .iter()
            .any(|line| line.favorite.product_id == product_id)
    }

    /// Current snapshot of favorites, oldest first.
    #[must_use]
    pub fn lines(&self) -> Vec<FavoriteLine> {
        self.inner.lines.read().clone()
    }

    async fn resync(&self, account: AccountId) -> Result<(), StorefrontError> {
        match self.fetch_lines(account).await {
            Ok(lines) => {
                *self.inner.lines.write() = lines;
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "favorites resync failed");
                self.inner.lines.write().clear();
                Err(e)
            }
        }
    }

    async fn fetch_lines(&self, account: AccountId) -> Result<Vec<FavoriteLine>, StorefrontError> {
        let rows = self
            .inner
            .gateway
            .select(
                FavoriteItem::TABLE,
                Query::new()
                    .filter(Filter::eq("user_id", account.to_string()))
                    .order(Order::asc("created_at")),
            )
            .await?;
        let favorites: Vec<FavoriteItem> = parse_rows("favorite", rows)?;
        if favorites.is_empty() {
            return Ok(Vec::new());
        }

        let ids = favorites
            .iter()
            .map(|favorite| Value::from(favorite.product_id.as_i64()))
            .collect();
        let rows = self
            .inner
            .gateway
            .select(Product::TABLE, Query::new().filter(Filter::any_of("id", ids)))
            .await?;
        let mut products: HashMap<ProductId, ProductSummary> = HashMap::new();
        for summary in parse_rows::<ProductSummary>("product", rows)? {
            products.insert(summary.id, summary);
        }

        Ok(favorites
            .into_iter()
            .filter_map(|favorite| {
                let product = products.get(&favorite.product_id).cloned()?;
                Some(FavoriteLine { favorite, product })
            })
            .collect())
    }
}
