//! Product catalog administration.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::instrument;
use vitrine_core::{
    CartItem, CategoryId, Price, PriceError, Product, ProductId, Row, parse_row, parse_rows,
};
use vitrine_gateway::{BackendGateway, Filter, Order, Query};

use crate::error::AdminError;

/// Product form input, exactly as typed.
///
/// The price stays a [`String`] until [`Self::normalized`] runs, so a
/// rejected submit can re-render whatever the admin typed.
#[derive(Debug, Clone, Default)]
pub struct ProductForm {
    pub name: String,
    pub price: String,
    pub category_id: Option<CategoryId>,
    pub size: String,
    pub description: String,
}

impl ProductForm {
    /// Validate and convert into the shape that gets persisted.
    ///
    /// # Errors
    ///
    /// Returns every field's message at once, not just the first failure.
    pub fn normalized(&self) -> Result<NewProduct, ProductFormErrors> {
        let mut errors = ProductFormErrors::default();

        let name = self.name.trim();
        if name.is_empty() {
            errors.name = Some("name is required".to_string());
        }

        let price = match Price::parse(&self.price) {
            Ok(price) => Some(price),
            Err(err) => {
                errors.price = Some(
                    match err {
                        PriceError::Empty | PriceError::NotANumber => {
                            "price must be a valid number"
                        }
                        PriceError::NotPositive => "price must be greater than zero",
                    }
                    .to_string(),
                );
                None
            }
        };

        match (price, errors.is_empty()) {
            (Some(price), true) => Ok(NewProduct {
                name: name.to_string(),
                price,
                category_id: self.category_id,
                size: blank_to_none(&self.size),
                description: blank_to_none(&self.description),
            }),
            _ => Err(errors),
        }
    }

    /// Check the form without building the persisted shape.
    ///
    /// # Errors
    ///
    /// Returns the same per-field messages [`Self::normalized`] would.
    pub fn validate(&self) -> Result<(), ProductFormErrors> {
        self.normalized().map(|_| ())
    }
}

fn blank_to_none(input: &str) -> Option<String> {
    let trimmed = input.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Per-field messages from a rejected [`ProductForm`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductFormErrors {
    pub name: Option<String>,
    pub price: Option<String>,
}

impl ProductFormErrors {
    /// Whether every field passed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.price.is_none()
    }
}

impl fmt::Display for ProductFormErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<&str> = [self.name.as_deref(), self.price.as_deref()]
            .into_iter()
            .flatten()
            .collect();
        write!(f, "{}", messages.join("; "))
    }
}

/// A validated product ready to persist; produced by
/// [`ProductForm::normalized`].
#[derive(Debug, Clone, PartialEq)]
pub struct NewProduct {
    pub name: String,
    pub price: Price,
    pub category_id: Option<CategoryId>,
    pub size: Option<String>,
    pub description: Option<String>,
}

impl NewProduct {
    /// The columns a create or update writes. Image columns and the
    /// visibility flags are managed by their own operations and stay
    /// untouched here.
    fn into_row(self) -> Row {
        let mut row = Row::new();
        row.insert("name".to_string(), Value::from(self.name));
        row.insert("price".to_string(), Value::from(self.price.to_string()));
        row.insert(
            "category_id".to_string(),
            self.category_id
                .map_or(Value::Null, |id| Value::from(id.as_i64())),
        );
        row.insert("size".to_string(), self.size.map_or(Value::Null, Value::from));
        row.insert(
            "description".to_string(),
            self.description.map_or(Value::Null, Value::from),
        );
        row
    }
}

/// Product administration.
#[derive(Clone)]
pub struct ProductService {
    gateway: Arc<dyn BackendGateway>,
}

impl ProductService {
    #[must_use]
    pub fn new(gateway: Arc<dyn BackendGateway>) -> Self {
        Self { gateway }
    }

    /// Products for the admin list, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails or a row does not parse.
    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<Product>, AdminError> {
        let rows = self
            .gateway
            .select(
                Product::TABLE,
                Query::new().order(Order::desc("created_at")),
            )
            .await?;
        Ok(parse_rows("product", rows)?)
    }

    /// Fetch one product for the edit form.
    ///
    /// # Errors
    ///
    /// Returns [`AdminError::NotFound`] when the product does not exist.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn get(&self, id: ProductId) -> Result<Product, AdminError> {
        let row = self
            .gateway
            .select_one(
                Product::TABLE,
                Query::new().filter(Filter::eq("id", id.as_i64())),
            )
            .await?
            .ok_or_else(|| AdminError::NotFound(format!("product {id}")))?;
        Ok(parse_row("product", row)?)
    }

    /// Validate and persist a new product, stamped with its creator.
    ///
    /// # Errors
    ///
    /// Returns [`AdminError::ProductForm`] when the form is invalid and
    /// [`AdminError::LoginRequired`] without a session.
    #[instrument(skip(self, form), fields(name = %form.name))]
    pub async fn create(&self, form: &ProductForm) -> Result<Product, AdminError> {
        let product = form.normalized().map_err(AdminError::ProductForm)?;
        let session = self.gateway.session().ok_or(AdminError::LoginRequired)?;

        let mut row = product.into_row();
        row.insert(
            "created_by".to_string(),
            Value::from(session.account_id().to_string()),
        );
        let stored = self.gateway.insert(Product::TABLE, row).await?;
        Ok(parse_row("product", stored)?)
    }

    /// Validate and apply edits to an existing product.
    ///
    /// The creator stamp is not among the written columns, so an edit by a
    /// different admin never reassigns it.
    ///
    /// # Errors
    ///
    /// Returns [`AdminError::ProductForm`] when the form is invalid.
    #[instrument(skip(self, form), fields(product_id = %id))]
    pub async fn update(&self, id: ProductId, form: &ProductForm) -> Result<(), AdminError> {
        let product = form.normalized().map_err(AdminError::ProductForm)?;
        self.gateway
            .update(
                Product::TABLE,
                product.into_row(),
                &[Filter::eq("id", id.as_i64())],
            )
            .await?;
        Ok(())
    }

    /// Show or hide the product on the storefront home sections.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn set_featured(&self, id: ProductId, featured: bool) -> Result<(), AdminError> {
        self.set_flag(id, "featured", featured).await
    }

    /// Mark the product as purchasable or sold out.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn set_in_stock(&self, id: ProductId, in_stock: bool) -> Result<(), AdminError> {
        self.set_flag(id, "in_stock", in_stock).await
    }

    async fn set_flag(&self, id: ProductId, column: &str, value: bool) -> Result<(), AdminError> {
        let mut patch = Row::new();
        patch.insert(column.to_string(), Value::from(value));
        self.gateway
            .update(Product::TABLE, patch, &[Filter::eq("id", id.as_i64())])
            .await?;
        Ok(())
    }

    /// Delete a product and every cart row that references it.
    ///
    /// Cart rows go first so a failure cannot leave carts pointing at a
    /// deleted product. Favorites are left alone; the storefront drops
    /// dangling ones on load.
    ///
    /// # Errors
    ///
    /// Returns an error if either delete fails.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn delete(&self, id: ProductId) -> Result<(), AdminError> {
        self.gateway
            .delete(CartItem::TABLE, &[Filter::eq("product_id", id.as_i64())])
            .await?;
        self.gateway
            .delete(Product::TABLE, &[Filter::eq("id", id.as_i64())])
            .await?;
        Ok(())
    }
}
