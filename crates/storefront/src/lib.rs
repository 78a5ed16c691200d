//! Vitrine Storefront - shopper-facing state layer.
//!
//! Everything a storefront view binds to lives here: the access check for
//! protected areas ([`guard::SessionGuard`]), the per-session cart and
//! favorites containers ([`cart::CartState`], [`favorites::FavoritesState`]),
//! read-only catalog queries ([`catalog::CatalogService`]), and account
//! flows ([`account::AccountService`]). All of it talks to the backend
//! through `Arc<dyn BackendGateway>` and never caches authorization.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod account;
pub mod cart;
pub mod catalog;
pub mod error;
pub mod favorites;
pub mod guard;

pub use account::AccountService;
pub use cart::{CartLine, CartState};
pub use catalog::{CatalogService, CategoryPage, CategorySection, ProductGroup, ProductPage};
pub use error::StorefrontError;
pub use favorites::{AddToFavorites, FavoriteLine, FavoritesState};
pub use guard::{AccessState, SessionGuard};
