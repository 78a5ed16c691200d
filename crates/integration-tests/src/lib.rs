//! Cross-crate integration tests for Vitrine.
//!
//! Every test drives the real storefront and admin services against one
//! shared [`MemoryGateway`], so a flow exercises exactly the code a view
//! tree would call, minus the rendering. The gateway holds a single
//! session, like a single browser: scenarios that need two actors switch
//! accounts the way a person would, by signing out and back in.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::sync::Arc;

use serde_json::{Value, json};
use vitrine_core::{AccountId, Product, ProductId, Profile, Role, Row};
use vitrine_gateway::{AuthApi, BackendGateway, Filter, MemoryGateway, TableApi};

/// Password shared by every fixture account, so tests can sign back in.
pub const PASSWORD: &str = "correct-horse-battery";

/// One backend plus the handles tests talk to it through.
pub struct TestContext {
    gateway: MemoryGateway,
}

impl TestContext {
    /// Fresh backend with no accounts, rows, or objects.
    ///
    /// Installs the global trace subscriber on first use, so `RUST_LOG`
    /// surfaces gateway traces from a failing scenario.
    #[must_use]
    pub fn new() -> Self {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
        Self {
            gateway: MemoryGateway::new(),
        }
    }

    /// A trait-object handle for constructing services under test.
    #[must_use]
    pub fn handle(&self) -> Arc<dyn BackendGateway> {
        Arc::new(self.gateway.clone())
    }

    /// Direct access to the backing store, for seeding and assertions.
    #[must_use]
    pub const fn backend(&self) -> &MemoryGateway {
        &self.gateway
    }

    /// Register an account with [`PASSWORD`] and force its profile role.
    ///
    /// Sign-up leaves the new account signed in, exactly like the real
    /// gateway.
    ///
    /// # Panics
    ///
    /// Panics when the fixture account cannot be created.
    pub async fn sign_up_as(&self, email: &str, role: Role) -> AccountId {
        let session = self
            .gateway
            .sign_up(email, PASSWORD)
            .await
            .expect("fixture sign-up");
        let account = session.account_id();

        if role != Role::Client {
            let mut patch = Row::new();
            patch.insert("role".to_string(), Value::from(role.to_string()));
            self.gateway
                .update(
                    Profile::TABLE,
                    patch,
                    &[Filter::eq("id", account.to_string())],
                )
                .await
                .expect("fixture role");
        }
        account
    }

    /// Switch the session to a previously registered account.
    ///
    /// # Panics
    ///
    /// Panics when the account does not exist.
    pub async fn sign_in(&self, email: &str) {
        self.gateway
            .sign_in(email, PASSWORD)
            .await
            .expect("fixture sign-in");
    }

    /// Drop the current session.
    ///
    /// # Panics
    ///
    /// Panics when the gateway rejects the sign-out.
    pub async fn sign_out(&self) {
        self.gateway.sign_out().await.expect("fixture sign-out");
    }

    /// Seed a product row directly, bypassing the admin flows.
    pub fn seed_product(&self, name: &str, price: f64) -> ProductId {
        let row = self.gateway.seed(
            Product::TABLE,
            json!({ "name": name, "price": price, "image_url": null }),
        );
        let id = row
            .get("id")
            .and_then(Value::as_i64)
            .expect("seeded product id");
        ProductId::new(id)
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}
