//! Product image uploads.
//!
//! Images live in a public bucket under `{product_id}/{uuid}.{ext}`, so a
//! re-uploaded file never collides with an old object. The product row
//! carries the derived state: `images` is the ordered gallery and
//! `image_url` mirrors its first entry for list views.

use std::sync::Arc;

use serde_json::Value;
use tracing::instrument;
use uuid::Uuid;
use vitrine_core::{Product, ProductId, Row, parse_row};
use vitrine_gateway::{BackendGateway, Filter, Query};

use crate::error::AdminError;

/// An image file as it arrives from the admin's file picker.
#[derive(Debug, Clone)]
pub struct NewImage {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Progress of a batch upload, reported after each object lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadProgress {
    pub completed: usize,
    pub total: usize,
}

/// Batch image upload and removal for products.
#[derive(Clone)]
pub struct ImageUploader {
    gateway: Arc<dyn BackendGateway>,
}

impl ImageUploader {
    /// Bucket holding product images.
    pub const BUCKET: &'static str = "product-images";

    /// Content types accepted by [`Self::upload_batch`].
    pub const ALLOWED_MIME_TYPES: [&'static str; 3] = ["image/jpeg", "image/png", "image/webp"];

    #[must_use]
    pub fn new(gateway: Arc<dyn BackendGateway>) -> Self {
        Self { gateway }
    }

    /// Upload `images` and append them to the product's gallery.
    ///
    /// The whole batch is validated before the first byte moves: one bad
    /// content type, or more files than the gallery has room for, rejects
    /// everything. Uploads then run one at a time, reporting `progress`
    /// after each, and the product row is rewritten once at the end.
    ///
    /// Returns the public URLs of the uploaded objects, in upload order.
    ///
    /// # Errors
    ///
    /// Returns [`AdminError::NotFound`] for an unknown product,
    /// [`AdminError::Invalid`] when the batch fails validation, or the
    /// gateway error that interrupted an upload.
    #[instrument(skip(self, images, progress), fields(product = %product_id, total = images.len()))]
    pub async fn upload_batch(
        &self,
        product_id: ProductId,
        images: Vec<NewImage>,
        mut progress: impl FnMut(UploadProgress) + Send,
    ) -> Result<Vec<String>, AdminError> {
        if images.is_empty() {
            return Ok(Vec::new());
        }

        let product = self.fetch(product_id).await?;

        for image in &images {
            if !Self::ALLOWED_MIME_TYPES.contains(&image.content_type.as_str()) {
                return Err(AdminError::Invalid(format!(
                    "unsupported image type for {}",
                    image.file_name
                )));
            }
        }
        if product.images.len() + images.len() > Product::MAX_IMAGES {
            return Err(AdminError::Invalid(format!(
                "a product may carry at most {} images",
                Product::MAX_IMAGES
            )));
        }

        let total = images.len();
        let mut uploaded = Vec::with_capacity(total);
        for (index, image) in images.into_iter().enumerate() {
            let path = format!("{product_id}/{}.{}", Uuid::new_v4(), extension(&image));
            self.gateway
                .upload(Self::BUCKET, &path, image.bytes, &image.content_type)
                .await?;
            uploaded.push(self.gateway.public_url(Self::BUCKET, &path));
            progress(UploadProgress {
                completed: index + 1,
                total,
            });
        }

        let mut gallery = product.images;
        gallery.extend(uploaded.iter().cloned());
        self.write_gallery(product_id, &gallery).await?;
        Ok(uploaded)
    }

    /// Remove one image from the product's gallery and from storage.
    ///
    /// When the removed URL was the primary image, the next remaining
    /// entry is promoted.
    ///
    /// # Errors
    ///
    /// Returns [`AdminError::Invalid`] when `url` does not point into the
    /// product image bucket, or the gateway error that interrupted the
    /// removal.
    #[instrument(skip(self, url), fields(product = %product_id))]
    pub async fn remove_image(&self, product_id: ProductId, url: &str) -> Result<(), AdminError> {
        let marker = format!("/{}/", Self::BUCKET);
        let Some((_, path)) = url.split_once(&marker) else {
            return Err(AdminError::Invalid(format!(
                "url is not a product image: {url}"
            )));
        };

        let product = self.fetch(product_id).await?;
        self.gateway
            .remove(Self::BUCKET, &[path.to_string()])
            .await?;

        let gallery: Vec<String> = product.images.into_iter().filter(|u| u != url).collect();
        self.write_gallery(product_id, &gallery).await?;
        Ok(())
    }

    async fn fetch(&self, id: ProductId) -> Result<Product, AdminError> {
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

    /// Rewrite the image columns; `image_url` mirrors the first entry.
    async fn write_gallery(&self, id: ProductId, urls: &[String]) -> Result<(), AdminError> {
        let mut patch = Row::new();
        patch.insert("images".to_string(), Value::from(urls.to_vec()));
        patch.insert(
            "image_url".to_string(),
            urls.first().map_or(Value::Null, |u| Value::from(u.as_str())),
        );
        self.gateway
            .update(Product::TABLE, patch, &[Filter::eq("id", id.as_i64())])
            .await?;
        Ok(())
    }
}

fn extension(image: &NewImage) -> &str {
    match image.file_name.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() => ext,
        _ => image
            .content_type
            .rsplit_once('/')
            .map_or("bin", |(_, subtype)| subtype),
    }
}
