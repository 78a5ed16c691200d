//! Backend capability traits.
//!
//! Consumers depend on these traits, never on a concrete client, so the
//! whole state layer runs unchanged against [`crate::SupabaseGateway`] in
//! production and [`crate::MemoryGateway`] in tests.

use async_trait::async_trait;
use vitrine_core::Row;

use crate::auth::{AuthSession, AuthUser};
use crate::error::GatewayError;
use crate::query::{Filter, Query};

/// Account authentication and session state.
#[async_trait]
pub trait AuthApi: Send + Sync {
    /// Sign in with email and password, holding the resulting session.
    ///
    /// # Errors
    ///
    /// Returns an error if the credentials are rejected or the call fails.
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, GatewayError>;

    /// Register a new account and hold the resulting session.
    ///
    /// The backend provisions a `profiles` row for the new account with the
    /// default `client` role.
    ///
    /// # Errors
    ///
    /// Returns an error if the account cannot be created.
    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthSession, GatewayError>;

    /// Drop the held session, if any.
    ///
    /// The local session is dropped even when server-side revocation fails.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the revocation.
    async fn sign_out(&self) -> Result<(), GatewayError>;

    /// The currently held session, if signed in.
    fn session(&self) -> Option<AuthSession>;

    /// The currently signed-in user, if any.
    fn current_user(&self) -> Option<AuthUser>;

    /// Ask the backend to email a password-recovery link.
    ///
    /// `redirect_url` is where the link lands the account after recovery.
    ///
    /// # Errors
    ///
    /// Returns an error if the request is rejected.
    async fn request_password_reset(
        &self,
        email: &str,
        redirect_url: &str,
    ) -> Result<(), GatewayError>;

    /// Set a new password for the signed-in account.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::AuthRequired`] when no session is held, or
    /// the backend's error otherwise.
    async fn update_password(&self, new_password: &str) -> Result<AuthUser, GatewayError>;
}

/// Row-level access to backend tables.
#[async_trait]
pub trait TableApi: Send + Sync {
    /// Fetch rows matching `query`, in the query's order.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails or the response does not decode.
    async fn select(&self, table: &str, query: Query) -> Result<Vec<Row>, GatewayError>;

    /// Fetch at most one row matching `query`.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails or the response does not decode.
    async fn select_one(&self, table: &str, query: Query) -> Result<Option<Row>, GatewayError> {
        let rows = self.select(table, query.limit(1)).await?;
        Ok(rows.into_iter().next())
    }

    /// Count rows matching `filters` without fetching them.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails.
    async fn count(&self, table: &str, filters: &[Filter]) -> Result<u64, GatewayError>;

    /// Insert one row, returning the stored representation (with
    /// backend-assigned columns such as `id` and `created_at`).
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Conflict`] when a unique index rejects the
    /// row, or the backend's error otherwise.
    async fn insert(&self, table: &str, row: Row) -> Result<Row, GatewayError>;

    /// Apply `patch` to every row matching `filters`.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails.
    async fn update(&self, table: &str, patch: Row, filters: &[Filter]) -> Result<(), GatewayError>;

    /// Delete every row matching `filters`.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails.
    async fn delete(&self, table: &str, filters: &[Filter]) -> Result<(), GatewayError>;
}

/// Blob storage buckets.
#[async_trait]
pub trait StorageApi: Send + Sync {
    /// Upload one object.
    ///
    /// # Errors
    ///
    /// Returns an error if the upload is rejected.
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), GatewayError>;

    /// Public URL serving the object at `path`. Pure; does not verify the
    /// object exists.
    fn public_url(&self, bucket: &str, path: &str) -> String;

    /// Remove objects by path.
    ///
    /// # Errors
    ///
    /// Returns an error if the removal is rejected.
    async fn remove(&self, bucket: &str, paths: &[String]) -> Result<(), GatewayError>;
}

/// The full backend surface. Blanket-implemented, so any type providing the
/// three capability traits is a gateway.
pub trait BackendGateway: AuthApi + TableApi + StorageApi {}

impl<T: AuthApi + TableApi + StorageApi> BackendGateway for T {}
