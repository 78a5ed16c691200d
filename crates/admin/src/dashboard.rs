//! Dashboard metrics.

use std::sync::Arc;

use chrono::{NaiveTime, Utc};
use rust_decimal::Decimal;
use tracing::instrument;
use vitrine_core::{Order, Product, Profile, parse_rows};
use vitrine_gateway::{BackendGateway, Filter, Query};

use crate::error::AdminError;

/// The numbers on the admin landing page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DashboardMetrics {
    pub product_count: u64,
    /// Orders placed since UTC midnight, regardless of status.
    pub orders_today: u64,
    /// Lifetime revenue, cancelled orders excluded.
    pub revenue: Decimal,
    pub account_count: u64,
}

/// Read-only rollups for the admin landing page.
#[derive(Clone)]
pub struct DashboardService {
    gateway: Arc<dyn BackendGateway>,
}

impl DashboardService {
    #[must_use]
    pub fn new(gateway: Arc<dyn BackendGateway>) -> Self {
        Self { gateway }
    }

    /// Compute the dashboard numbers.
    ///
    /// "Today" is the UTC day. Revenue sums `total_price` over every
    /// non-cancelled order ever placed; orders are written by checkout,
    /// which lives outside this system, so the sum is read-only here.
    ///
    /// # Errors
    ///
    /// Returns an error if a backend call fails or an order row does not
    /// parse.
    #[instrument(skip(self))]
    pub async fn metrics(&self) -> Result<DashboardMetrics, AdminError> {
        let product_count = self.gateway.count(Product::TABLE, &[]).await?;

        let midnight = Utc::now()
            .date_naive()
            .and_time(NaiveTime::MIN)
            .and_utc()
            .to_rfc3339();
        let orders_today = self
            .gateway
            .count(Order::TABLE, &[Filter::gte("created_at", midnight)])
            .await?;

        let rows = self
            .gateway
            .select(
                Order::TABLE,
                Query::new().filter(Filter::neq("status", Order::STATUS_CANCELLED)),
            )
            .await?;
        let orders: Vec<Order> = parse_rows("order", rows)?;
        let revenue = orders.iter().map(|order| order.total_price).sum();

        let account_count = self.gateway.count(Profile::TABLE, &[]).await?;

        Ok(DashboardMetrics {
            product_count,
            orders_today,
            revenue,
            account_count,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;
    use vitrine_gateway::MemoryGateway;

    fn seed_order(gateway: &MemoryGateway, total: i64, status: &str, created_at: &str) {
        gateway.seed(
            Order::TABLE,
            json!({ "total_price": total, "status": status, "created_at": created_at }),
        );
    }

    #[tokio::test]
    async fn test_metrics_roll_up() {
        let gateway = MemoryGateway::new();
        gateway.seed(Product::TABLE, json!({ "name": "Tee", "price": 25 }));
        gateway.seed(Product::TABLE, json!({ "name": "Cap", "price": 15 }));
        gateway.seed(
            Profile::TABLE,
            json!({
                "id": "7f3d2c21-9c9b-4ab0-b7a4-6f2e6a3d1a11",
                "full_name": "Ana Lima",
                "role": "client"
            }),
        );

        let today = Utc::now().to_rfc3339();
        let yesterday = (Utc::now() - Duration::days(1)).to_rfc3339();
        seed_order(&gateway, 100, "paid", &yesterday);
        seed_order(&gateway, 50, "paid", &today);
        seed_order(&gateway, 30, "cancelled", &today);

        let service = DashboardService::new(Arc::new(gateway));
        let metrics = service.metrics().await.unwrap();

        assert_eq!(metrics.product_count, 2);
        assert_eq!(metrics.orders_today, 2);
        assert_eq!(metrics.revenue, Decimal::new(150, 0));
        assert_eq!(metrics.account_count, 1);
    }

    #[tokio::test]
    async fn test_cancelled_orders_still_count_toward_today() {
        let gateway = MemoryGateway::new();
        seed_order(&gateway, 30, "cancelled", &Utc::now().to_rfc3339());

        let service = DashboardService::new(Arc::new(gateway));
        let metrics = service.metrics().await.unwrap();

        assert_eq!(metrics.orders_today, 1);
        assert_eq!(metrics.revenue, Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_empty_backend_is_all_zeroes() {
        let gateway = MemoryGateway::new();
        let service = DashboardService::new(Arc::new(gateway));

        let metrics = service.metrics().await.unwrap();
        assert_eq!(metrics.product_count, 0);
        assert_eq!(metrics.orders_today, 0);
        assert_eq!(metrics.revenue, Decimal::ZERO);
        assert_eq!(metrics.account_count, 0);
    }
}
