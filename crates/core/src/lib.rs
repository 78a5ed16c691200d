//! Vitrine Core - Shared domain types.
//!
//! This crate provides common types used across all Vitrine components:
//! - `gateway` - Client for the hosted backend (auth, tables, storage)
//! - `storefront` - Shopper-facing state layer (session, cart, favorites)
//! - `admin` - Administration flows (catalog, coupons, users, uploads)
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no HTTP clients. Rows
//! returned by the backend are parsed into the typed records defined here
//! at the gateway boundary, so malformed payloads surface as
//! [`records::RecordError`] instead of leaking loosely-typed JSON into the
//! rest of the workspace.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, prices, and roles
//! - [`records`] - Typed table records and row parsing

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod records;
pub mod types;

pub use records::*;
pub use types::*;
