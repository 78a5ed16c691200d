//! Vitrine Gateway - client seam for the hosted backend.
//!
//! The backend is an opaque hosted service exposing authentication, a
//! relational table API, and blob storage over HTTP. This crate defines the
//! capability traits the rest of the workspace consumes and ships two
//! implementations:
//!
//! - [`SupabaseGateway`] - the production client, speaking the backend's
//!   REST dialect with `reqwest`
//! - [`MemoryGateway`] - an in-process double with the same observable
//!   behavior (identity assignment, unique-index conflicts, session
//!   tracking), used by every test in the workspace
//!
//! # Architecture
//!
//! - The backend is the source of truth - no local sync, direct API calls
//! - Consumers hold `Arc<dyn BackendGateway>` and never see HTTP details
//! - Rows cross this seam as loosely-typed JSON ([`vitrine_core::Row`]);
//!   callers parse them into typed records immediately
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use vitrine_gateway::{BackendGateway, Filter, GatewayConfig, Query, SupabaseGateway};
//!
//! let config = GatewayConfig::from_env()?;
//! let gateway: Arc<dyn BackendGateway> = Arc::new(SupabaseGateway::new(&config)?);
//!
//! gateway.sign_in("shopper@example.com", "hunter2!").await?;
//! let rows = gateway
//!     .select("products", Query::new().filter(Filter::eq("featured", true)))
//!     .await?;
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod memory;
pub mod query;
pub mod supabase;

pub use api::{AuthApi, BackendGateway, StorageApi, TableApi};
pub use auth::{AuthSession, AuthUser};
pub use config::{ConfigError, GatewayConfig};
pub use error::GatewayError;
pub use memory::MemoryGateway;
pub use query::{Filter, Order, Query};
pub use supabase::SupabaseGateway;
