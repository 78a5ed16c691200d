//! Vitrine Admin - back-office flows.
//!
//! Everything the admin area does lives here: coupon lifecycle
//! ([`coupons::CouponService`]), catalog management
//! ([`products::ProductService`], [`categories::CategoryService`]),
//! product image uploads ([`uploads::ImageUploader`]), user administration
//! ([`users::UserDirectory`]), and the dashboard rollup
//! ([`dashboard::DashboardService`]). All of it talks to the backend
//! through `Arc<dyn BackendGateway>`; route protection is the storefront
//! guard's job and is not duplicated here, but role-sensitive operations
//! re-check the acting profile before writing.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod categories;
pub mod coupons;
pub mod dashboard;
pub mod error;
pub mod products;
pub mod uploads;
pub mod users;

pub use categories::CategoryService;
pub use coupons::{CouponForm, CouponFormErrors, CouponService};
pub use dashboard::{DashboardMetrics, DashboardService};
pub use error::AdminError;
pub use products::{ProductForm, ProductFormErrors, ProductService};
pub use uploads::{ImageUploader, NewImage, UploadProgress};
pub use users::UserDirectory;
