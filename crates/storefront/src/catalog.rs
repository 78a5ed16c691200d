//! Read-only catalog queries.

use std::sync::Arc;

use tracing::instrument;
use vitrine_core::{Category, CategoryId, Product, ProductId, parse_row, parse_rows};
use vitrine_gateway::{BackendGateway, Filter, Order, Query};

use crate::error::StorefrontError;

/// A home-page section: one category and its featured products.
#[derive(Debug, Clone)]
pub struct CategorySection {
    pub category: Category,
    /// Newest first, capped at [`CatalogService::HOME_SECTION_LIMIT`].
    pub products: Vec<Product>,
}

/// Everything the product detail view renders.
#[derive(Debug, Clone)]
pub struct ProductPage {
    pub product: Product,
    /// Resolved category name; `None` when the product has no category or
    /// the lookup fails. The page renders without it.
    pub category_name: Option<String>,
}

/// Products of one category sharing a name prefix.
#[derive(Debug, Clone)]
pub struct ProductGroup {
    /// The part of the product name before `" - "` (the whole name when
    /// there is no separator).
    pub title: String,
    pub products: Vec<Product>,
}

/// A category listing: the category and its products in display groups.
#[derive(Debug, Clone)]
pub struct CategoryPage {
    pub category: Category,
    /// Groups in first-seen order over the newest-first product list.
    pub groups: Vec<ProductGroup>,
}

/// Catalog reads backing the public storefront views.
#[derive(Clone)]
pub struct CatalogService {
    gateway: Arc<dyn BackendGateway>,
}

impl CatalogService {
    /// Featured products shown per home-page section.
    pub const HOME_SECTION_LIMIT: u32 = 12;

    #[must_use]
    pub fn new(gateway: Arc<dyn BackendGateway>) -> Self {
        Self { gateway }
    }

    /// Home-page sections: every category (name order) with its featured
    /// products, newest first. Categories with nothing featured are skipped.
    ///
    /// # Errors
    ///
    /// Returns the gateway or row-parsing error that interrupted the reads.
    #[instrument(skip(self))]
    pub async fn home_sections(&self) -> Result<Vec<CategorySection>, StorefrontError> {
        let rows = self
            .gateway
            .select(Category::TABLE, Query::new().order(Order::asc("name")))
            .await?;
        let categories: Vec<Category> = parse_rows("category", rows)?;

        let mut sections = Vec::new();
        for category in categories {
            let rows = self
                .gateway
                .select(
                    Product::TABLE,
                    Query::new()
                        .filter(Filter::eq("category_id", category.id.as_i64()))
                        .filter(Filter::eq("featured", true))
                        .order(Order::desc("created_at"))
                        .limit(Self::HOME_SECTION_LIMIT),
                )
                .await?;
            let products: Vec<Product> = parse_rows("product", rows)?;
            if products.is_empty() {
                continue;
            }
            sections.push(CategorySection { category, products });
        }
        Ok(sections)
    }

    /// The product detail page for `id`.
    ///
    /// The category name is best-effort: a missing category row or a failed
    /// lookup leaves it `None` rather than failing the page.
    ///
    /// # Errors
    ///
    /// Returns [`StorefrontError::NotFound`] when the product does not
    /// exist, or the gateway's error if the product read fails.
    #[instrument(skip(self), fields(product = %id))]
    pub async fn product(&self, id: ProductId) -> Result<ProductPage, StorefrontError> {
        let row = self
            .gateway
            .select_one(
                Product::TABLE,
                Query::new().filter(Filter::eq("id", id.as_i64())),
            )
            .await?
            .ok_or_else(|| StorefrontError::NotFound(format!("product {id}")))?;
        let product: Product = parse_row("product", row)?;

        let category_name = match product.category_id {
            Some(category_id) => self.category_name(category_id).await,
            None => None,
        };

        Ok(ProductPage {
            product,
            category_name,
        })
    }

    /// The category listing for `id`: its products, newest first, grouped
    /// by name prefix.
    ///
    /// # Errors
    ///
    /// Returns [`StorefrontError::NotFound`] when the category does not
    /// exist, or the gateway's error if a read fails.
    #[instrument(skip(self), fields(category = %id))]
    pub async fn category_products(&self, id: CategoryId) -> Result<CategoryPage, StorefrontError> {
        let row = self
            .gateway
            .select_one(
                Category::TABLE,
                Query::new().filter(Filter::eq("id", id.as_i64())),
            )
            .await?
            .ok_or_else(|| StorefrontError::NotFound(format!("category {id}")))?;
        let category: Category = parse_row("category", row)?;

        let rows = self
            .gateway
            .select(
                Product::TABLE,
                Query::new()
                    .filter(Filter::eq("category_id", id.as_i64()))
                    .order(Order::desc("created_at")),
            )
            .await?;
        let products: Vec<Product> = parse_rows("product", rows)?;

        Ok(CategoryPage {
            category,
            groups: group_by_prefix(products),
        })
    }

    /// Products whose name contains `term`, case-insensitively.
    ///
    /// A blank term short-circuits to an empty result without a round trip.
    ///
    /// # Errors
    ///
    /// Returns the gateway or row-parsing error that interrupted the read.
    #[instrument(skip(self))]
    pub async fn search(&self, term: &str) -> Result<Vec<Product>, StorefrontError> {
        let term = term.trim();
        if term.is_empty() {
            return Ok(Vec::new());
        }

        let rows = self
            .gateway
            .select(
                Product::TABLE,
                Query::new().filter(Filter::ilike("name", format!("%{term}%"))),
            )
            .await?;
        Ok(parse_rows("product", rows)?)
    }

    async fn category_name(&self, id: CategoryId) -> Option<String> {
        let row = self
            .gateway
            .select_one(
                Category::TABLE,
                Query::new().filter(Filter::eq("id", id.as_i64())),
            )
            .await
            .ok()??;
        let category: Category = parse_row("category", row).ok()?;
        Some(category.name)
    }
}

fn group_by_prefix(products: Vec<Product>) -> Vec<ProductGroup> {
    let mut groups: Vec<ProductGroup> = Vec::new();
    for product in products {
        let title = product
            .name
            .split_once(" - ")
            .map_or(product.name.as_str(), |(prefix, _)| prefix)
            .trim()
            .to_string();
        match groups.iter_mut().find(|group| group.title == title) {
            Some(group) => group.products.push(product),
            None => groups.push(ProductGroup {
                title,
                products: vec![product],
            }),
        }
    }
    groups
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::{Value, json};
    use vitrine_gateway::MemoryGateway;

    fn seed_category(gateway: &MemoryGateway, name: &str) -> CategoryId {
        let row = gateway.seed(Category::TABLE, json!({ "name": name }));
        CategoryId::new(row.get("id").and_then(Value::as_i64).unwrap())
    }

    fn seed_product(
        gateway: &MemoryGateway,
        name: &str,
        category: CategoryId,
        featured: bool,
    ) -> ProductId {
        let row = gateway.seed(
            Product::TABLE,
            json!({
                "name": name,
                "price": 10.0,
                "category_id": category.as_i64(),
                "featured": featured,
            }),
        );
        ProductId::new(row.get("id").and_then(Value::as_i64).unwrap())
    }

    #[tokio::test]
    async fn test_home_sections_skip_categories_without_featured() {
        let gateway = MemoryGateway::new();
        let shirts = seed_category(&gateway, "Shirts");
        let hats = seed_category(&gateway, "Hats");
        seed_product(&gateway, "Linen Shirt", shirts, true);
        seed_product(&gateway, "Plain Cap", hats, false);

        let catalog = CatalogService::new(Arc::new(gateway));
        let sections = catalog.home_sections().await.unwrap();

        assert_eq!(sections.len(), 1);
        assert_eq!(sections.first().unwrap().category.id, shirts);
    }

    #[tokio::test]
    async fn test_home_sections_order_and_cap() {
        let gateway = MemoryGateway::new();
        let shirts = seed_category(&gateway, "Shirts");
        let hats = seed_category(&gateway, "Hats");
        seed_product(&gateway, "Cap", hats, true);
        for n in 0..15 {
            seed_product(&gateway, &format!("Shirt {n}"), shirts, true);
        }

        let catalog = CatalogService::new(Arc::new(gateway));
        let sections = catalog.home_sections().await.unwrap();

        // Categories in name order, products newest first and capped
        assert_eq!(sections.len(), 2);
        assert_eq!(sections.first().unwrap().category.id, hats);
        let shirt_section = sections.get(1).unwrap();
        assert_eq!(shirt_section.products.len(), 12);
        assert_eq!(shirt_section.products.first().unwrap().name, "Shirt 14");
    }

    #[tokio::test]
    async fn test_product_page_resolves_category_name() {
        let gateway = MemoryGateway::new();
        let shirts = seed_category(&gateway, "Shirts");
        let id = seed_product(&gateway, "Linen Shirt", shirts, false);

        let catalog = CatalogService::new(Arc::new(gateway));
        let page = catalog.product(id).await.unwrap();

        assert_eq!(page.product.id, id);
        assert_eq!(page.category_name.as_deref(), Some("Shirts"));
    }

    #[tokio::test]
    async fn test_product_page_tolerates_dangling_category() {
        let gateway = MemoryGateway::new();
        let row = gateway.seed(
            Product::TABLE,
            json!({ "name": "Orphan", "price": 5.0, "category_id": 999 }),
        );
        let id = ProductId::new(row.get("id").and_then(Value::as_i64).unwrap());

        let catalog = CatalogService::new(Arc::new(gateway));
        let page = catalog.product(id).await.unwrap();

        assert_eq!(page.category_name, None);
    }

    #[tokio::test]
    async fn test_missing_product_is_not_found() {
        let catalog = CatalogService::new(Arc::new(MemoryGateway::new()));

        let err = catalog.product(ProductId::new(999)).await.unwrap_err();
        assert!(matches!(err, StorefrontError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_category_products_group_by_name_prefix() {
        let gateway = MemoryGateway::new();
        let shirts = seed_category(&gateway, "Shirts");
        seed_product(&gateway, "Tee - Red", shirts, false);
        seed_product(&gateway, "Tee - Blue", shirts, false);
        seed_product(&gateway, "Polo", shirts, false);

        let catalog = CatalogService::new(Arc::new(gateway));
        let page = catalog.category_products(shirts).await.unwrap();

        // Newest first, so "Polo" opens the listing; both tees share a group
        let titles: Vec<&str> = page.groups.iter().map(|g| g.title.as_str()).collect();
        assert_eq!(titles, vec!["Polo", "Tee"]);
        let tees = page.groups.get(1).unwrap();
        assert_eq!(tees.products.first().unwrap().name, "Tee - Blue");
        assert_eq!(tees.products.get(1).unwrap().name, "Tee - Red");
    }

    #[tokio::test]
    async fn test_category_products_unknown_category() {
        let catalog = CatalogService::new(Arc::new(MemoryGateway::new()));

        let err = catalog
            .category_products(CategoryId::new(999))
            .await
            .unwrap_err();
        assert!(matches!(err, StorefrontError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_search_blank_term_short_circuits() {
        let catalog = CatalogService::new(Arc::new(MemoryGateway::new()));
        assert!(catalog.search("   ").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_search_is_case_insensitive_substring() {
        let gateway = MemoryGateway::new();
        let shirts = seed_category(&gateway, "Shirts");
        seed_product(&gateway, "Linen Shirt", shirts, false);
        seed_product(&gateway, "Plain Cap", shirts, false);

        let catalog = CatalogService::new(Arc::new(gateway));
        let hits = catalog.search("shirt").await.unwrap();

        assert_eq!(hits.len(), 1);
        assert_eq!(hits.first().unwrap().name, "Linen Shirt");
    }
}
