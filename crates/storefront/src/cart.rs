//! Shopping cart state.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use rust_decimal::Decimal;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{instrument, warn};
use vitrine_core::{
    AccountId, CartItem, CartItemId, Product, ProductId, ProductSummary, Row, parse_row,
    parse_rows,
};
use vitrine_gateway::{BackendGateway, Filter, Order, Query};

use crate::error::StorefrontError;

/// One cart row joined with its product summary.
#[derive(Debug, Clone)]
pub struct CartLine {
    pub item: CartItem,
    /// `None` when the product row has gone missing. The line still renders;
    /// it just prices at zero.
    pub product: Option<ProductSummary>,
}

impl CartLine {
    /// Price times quantity; zero when the product or its price is missing.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        let price = self
            .product
            .as_ref()
            .map_or(Decimal::ZERO, ProductSummary::price_or_zero);
        price * Decimal::from(self.item.quantity)
    }
}

struct CartInner {
    gateway: Arc<dyn BackendGateway>,
    lines: RwLock<Vec<CartLine>>,
    /// Serializes mutations so a double-submitted add merges into one row
    /// with quantity 2 instead of racing two inserts.
    mutation: Mutex<()>,
}

/// Account-scoped cart snapshot, synchronized with the backend.
///
/// Cloning is cheap and clones share state; one instance serves one
/// authenticated session. Every mutation reloads the snapshot from the
/// backend, so it is stale only while a round trip is in flight.
#[derive(Clone)]
pub struct CartState {
    inner: Arc<CartInner>,
}

impl CartState {
    #[must_use]
    pub fn new(gateway: Arc<dyn BackendGateway>) -> Self {
        Self {
            inner: Arc::new(CartInner {
                gateway,
                lines: RwLock::new(Vec::new()),
                mutation: Mutex::new(()),
            }),
        }
    }

    /// Replace the snapshot with the account's cart rows, oldest first.
    ///
    /// Without a session the cart is simply empty. On failure the snapshot
    /// degrades to empty and the error is returned for the view to surface.
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
                warn!(error = %e, "cart load failed");
                self.inner.lines.write().clear();
                Err(e)
            }
        }
    }

    /// Add one unit of `product_id` to the cart.
    ///
    /// An existing row for the product gains quantity 1; otherwise a new row
    /// is inserted with quantity 1. The snapshot is reloaded afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`StorefrontError::LoginRequired`] without a session, or the
    /// gateway's error if the write fails.
    #[instrument(skip(self), fields(product = %product_id))]
    pub async fn add(&self, product_id: ProductId) -> Result<(), StorefrontError> {
        let Some(session) = self.inner.gateway.session() else {
            return Err(StorefrontError::LoginRequired);
        };
        let account = session.account_id();
        let _guard = self.inner.mutation.lock().await;

        let existing = self
            .inner
            .gateway
            .select_one(
                CartItem::TABLE,
                Query::new()
                    .filter(Filter::eq("user_id", account.to_string()))
                    .filter(Filter::eq("product_id", product_id.as_i64())),
            )
            .await?;

        if let Some(row) = existing {
            let item: CartItem = parse_row("cart item", row)?;
            let mut patch = Row::new();
            patch.insert("quantity".to_string(), Value::from(item.quantity + 1));
            self.inner
                .gateway
                .update(
                    CartItem::TABLE,
                    patch,
                    &[Filter::eq("id", item.id.as_i64())],
                )
                .await?;
        } else {
            let mut row = Row::new();
            row.insert("user_id".to_string(), Value::from(account.to_string()));
            row.insert("product_id".to_string(), Value::from(product_id.as_i64()));
            row.insert("quantity".to_string(), Value::from(1));
            self.inner.gateway.insert(CartItem::TABLE, row).await?;
        }

        self.resync(account).await
    }

    /// Set the quantity on a cart row; zero or less deletes the row.
    ///
    /// The snapshot is reloaded afterwards.
    ///
    /// # Errors
    ///
    /// Returns the gateway's error if the write or reload fails.
    #[instrument(skip(self), fields(item = %item_id))]
    pub async fn set_quantity(
        &self,
        item_id: CartItemId,
        quantity: i64,
    ) -> Result<(), StorefrontError> {
        let _guard = self.inner.mutation.lock().await;

        let by_id = [Filter::eq("id", item_id.as_i64())];
        if quantity <= 0 {
            self.inner.gateway.delete(CartItem::TABLE, &by_id).await?;
        } else {
            let mut patch = Row::new();
            patch.insert("quantity".to_string(), Value::from(quantity));
            self.inner
                .gateway
                .update(CartItem::TABLE, patch, &by_id)
                .await?;
        }

        match self.inner.gateway.session() {
            Some(session) => self.resync(session.account_id()).await,
            None => {
                self.inner.lines.write().clear();
                Ok(())
            }
        }
    }

    /// Delete every cart row owned by the current account.
    ///
    /// The snapshot resets immediately; no reload round trip is needed.
    ///
    /// # Errors
    ///
    /// Returns the gateway's error if the delete fails.
    #[instrument(skip(self))]
    pub async fn clear(&self) -> Result<(), StorefrontError> {
        let Some(session) = self.inner.gateway.session() else {
            self.inner.lines.write().clear();
            return Ok(());
        };
        let _guard = self.inner.mutation.lock().await;

        self.inner
            .gateway
            .delete(
                CartItem::TABLE,
                &[Filter::eq("user_id", session.account_id().to_string())],
            )
            .await?;
        self.inner.lines.write().clear();
        Ok(())
    }

    /// Current snapshot of cart lines, oldest first.
    #[must_use]
    pub fn lines(&self) -> Vec<CartLine> {
        self.inner.lines.read().clone()
    }

    /// Sum of price times quantity across the snapshot.
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.inner
            .lines
            .read()
            .iter()
            .map(CartLine::line_total)
            .sum()
    }

    /// Total unit count across the snapshot.
    #[must_use]
    pub fn item_count(&self) -> i64 {
        self.inner
            .lines
            .read()
            .iter()
            .map(|line| line.item.quantity)
            .sum()
    }

    async fn resync(&self, account: AccountId) -> Result<(), StorefrontError> {
        match self.fetch_lines(account).await {
            Ok(lines) => {
                *self.inner.lines.write() = lines;
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "cart resync failed");
                self.inner.lines.write().clear();
                Err(e)
            }
        }
    }

    async fn fetch_lines(&self, account: AccountId) -> Result<Vec<CartLine>, StorefrontError> {
        let rows = self
            .inner
            .gateway
            .select(
                CartItem::TABLE,
                Query::new()
                    .filter(Filter::eq("user_id", account.to_string()))
                    .order(Order::asc("created_at")),
            )
            .await?;
        let items: Vec<CartItem> = parse_rows("cart item", rows)?;

        let mut products = HashMap::new();
        if !items.is_empty() {
            let ids = items
                .iter()
                .map(|item| Value::from(item.product_id.as_i64()))
                .collect();
            let rows = self
                .inner
                .gateway
                .select(Product::TABLE, Query::new().filter(Filter::any_of("id", ids)))
                .await?;
            for summary in parse_rows::<ProductSummary>("product", rows)? {
                products.insert(summary.id, summary);
            }
        }

        Ok(items
            .into_iter()
            .map(|item| {
                let product = products.get(&item.product_id).cloned();
                CartLine { item, product }
            })
            .collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;
    use vitrine_gateway::{AuthApi, MemoryGateway};

    async fn signed_in() -> (MemoryGateway, CartState) {
        let gateway = MemoryGateway::new();
        gateway
            .sign_up("shopper@example.com", "hunter2!")
            .await
            .unwrap();
        let cart = CartState::new(Arc::new(gateway.clone()));
        (gateway, cart)
    }

    fn seed_product(gateway: &MemoryGateway, name: &str, price: f64) -> ProductId {
        let row = gateway.seed(
            Product::TABLE,
            json!({ "name": name, "price": price, "image_url": null }),
        );
        ProductId::new(row.get("id").and_then(Value::as_i64).unwrap())
    }

    #[tokio::test]
    async fn test_load_without_session_is_empty() {
        let gateway = MemoryGateway::new();
        let cart = CartState::new(Arc::new(gateway));

        cart.load().await.unwrap();
        assert!(cart.lines().is_empty());
        assert_eq!(cart.total(), Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_add_without_session_requires_login() {
        let gateway = MemoryGateway::new();
        let product = seed_product(&gateway, "Mug", 9.90);
        let cart = CartState::new(Arc::new(gateway));

        let err = cart.add(product).await.unwrap_err();
        assert!(matches!(err, StorefrontError::LoginRequired));
    }

    #[tokio::test]
    async fn test_add_twice_merges_into_one_row() {
        let (gateway, cart) = signed_in().await;
        let product = seed_product(&gateway, "Mug", 9.90);

        cart.add(product).await.unwrap();
        cart.add(product).await.unwrap();
        cart.load().await.unwrap();

        let lines = cart.lines();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines.first().unwrap().item.quantity, 2);
        assert_eq!(gateway.rows(CartItem::TABLE).len(), 1);
    }

    #[tokio::test]
    async fn test_simultaneous_adds_merge_into_one_row() {
        let (gateway, cart) = signed_in().await;
        let product = seed_product(&gateway, "Mug", 9.90);

        // Two clones share the mutation lock, so the adds serialize
        let other = cart.clone();
        let (a, b) = tokio::join!(cart.add(product), other.add(product));
        a.unwrap();
        b.unwrap();

        cart.load().await.unwrap();
        let lines = cart.lines();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines.first().unwrap().item.quantity, 2);
    }

    #[tokio::test]
    async fn test_set_quantity_updates_row() {
        let (gateway, cart) = signed_in().await;
        let product = seed_product(&gateway, "Mug", 10.00);

        cart.add(product).await.unwrap();
        let item_id = cart.lines().first().unwrap().item.id;

        cart.set_quantity(item_id, 5).await.unwrap();
        assert_eq!(cart.lines().first().unwrap().item.quantity, 5);
        assert_eq!(cart.item_count(), 5);
        assert_eq!(cart.total(), Decimal::from(50));
    }

    #[tokio::test]
    async fn test_set_quantity_zero_deletes_row() {
        let (gateway, cart) = signed_in().await;
        let product = seed_product(&gateway, "Mug", 10.00);
        cart.add(product).await.unwrap();
        let item_id = cart.lines().first().unwrap().item.id;

        cart.set_quantity(item_id, 0).await.unwrap();
        cart.load().await.unwrap();
        assert!(cart.lines().is_empty());
        assert!(gateway.rows(CartItem::TABLE).is_empty());
    }

    #[tokio::test]
    async fn test_clear_resets_snapshot_and_backend() {
        let (gateway, cart) = signed_in().await;
        let mug = seed_product(&gateway, "Mug", 10.00);
        let cap = seed_product(&gateway, "Cap", 25.00);

        cart.add(mug).await.unwrap();
        cart.add(cap).await.unwrap();
        cart.clear().await.unwrap();

        assert!(cart.lines().is_empty());
        assert!(gateway.rows(CartItem::TABLE).is_empty());
    }

    #[tokio::test]
    async fn test_total_counts_missing_product_as_zero() {
        let (gateway, cart) = signed_in().await;
        let mug = seed_product(&gateway, "Mug", 12.50);
        let account = gateway.current_user().unwrap().id;

        // A cart row pointing at a product that no longer exists
        gateway.seed(
            CartItem::TABLE,
            json!({ "user_id": account.to_string(), "product_id": 999, "quantity": 3 }),
        );
        cart.add(mug).await.unwrap();

        assert_eq!(cart.lines().len(), 2);
        assert_eq!(cart.total(), Decimal::new(1250, 2));
        assert_eq!(cart.item_count(), 4);
    }

    #[tokio::test]
    async fn test_lines_keep_insertion_order() {
        let (gateway, cart) = signed_in().await;
        let first = seed_product(&gateway, "First", 1.00);
        let second = seed_product(&gateway, "Second", 2.00);

        cart.add(first).await.unwrap();
        cart.add(second).await.unwrap();

        let order: Vec<ProductId> = cart
            .lines()
            .iter()
            .map(|line| line.item.product_id)
            .collect();
        assert_eq!(order, vec![first, second]);
    }

    #[tokio::test]
    async fn test_load_failure_degrades_to_empty() {
        let (gateway, cart) = signed_in().await;
        let mug = seed_product(&gateway, "Mug", 10.00);
        cart.add(mug).await.unwrap();
        assert_eq!(cart.lines().len(), 1);

        // A row the record parser cannot accept poisons the next load
        let account = gateway.current_user().unwrap().id;
        gateway.seed(
            CartItem::TABLE,
            json!({ "user_id": account.to_string(), "product_id": "oops", "quantity": 1 }),
        );

        cart.load().await.unwrap_err();
        assert!(cart.lines().is_empty());
    }
}
