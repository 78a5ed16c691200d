//! Category administration.

use std::sync::Arc;

use serde_json::Value;
use tracing::instrument;
use vitrine_core::{Category, CategoryId, Row, parse_row, parse_rows};
use vitrine_gateway::{BackendGateway, Filter, Order, Query};

use crate::error::AdminError;

/// Category naming and lifecycle.
#[derive(Clone)]
pub struct CategoryService {
    gateway: Arc<dyn BackendGateway>,
}

impl CategoryService {
    #[must_use]
    pub fn new(gateway: Arc<dyn BackendGateway>) -> Self {
        Self { gateway }
    }

    /// Every category, alphabetically.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails or a row does not parse.
    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<Category>, AdminError> {
        let rows = self
            .gateway
            .select(Category::TABLE, Query::new().order(Order::asc("name")))
            .await?;
        Ok(parse_rows("category", rows)?)
    }

    /// Create a category from a trimmed, non-blank name.
    ///
    /// # Errors
    ///
    /// Returns [`AdminError::Invalid`] for a blank name.
    #[instrument(skip(self))]
    pub async fn create(&self, name: &str) -> Result<Category, AdminError> {
        let name = valid_name(name)?;
        let mut row = Row::new();
        row.insert("name".to_string(), Value::from(name));
        let stored = self.gateway.insert(Category::TABLE, row).await?;
        Ok(parse_row("category", stored)?)
    }

    /// Rename a category.
    ///
    /// # Errors
    ///
    /// Returns [`AdminError::Invalid`] for a blank name.
    #[instrument(skip(self), fields(category_id = %id))]
    pub async fn rename(&self, id: CategoryId, name: &str) -> Result<(), AdminError> {
        let name = valid_name(name)?;
        let mut patch = Row::new();
        patch.insert("name".to_string(), Value::from(name));
        self.gateway
            .update(Category::TABLE, patch, &[Filter::eq("id", id.as_i64())])
            .await?;
        Ok(())
    }

    /// Delete a category. Products keep their rows; the storefront shows
    /// them as uncategorized once the reference dangles.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails.
    #[instrument(skip(self), fields(category_id = %id))]
    pub async fn delete(&self, id: CategoryId) -> Result<(), AdminError> {
        self.gateway
            .delete(Category::TABLE, &[Filter::eq("id", id.as_i64())])
            .await?;
        Ok(())
    }
}

fn valid_name(name: &str) -> Result<&str, AdminError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(AdminError::Invalid("category name is required".to_string()));
    }
    Ok(trimmed)
}
