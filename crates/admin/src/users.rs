//! User administration.
//!
//! The gateway returns the acting account's session, but permission lives
//! in the profiles table, so every role change re-reads the actor's profile
//! instead of trusting anything cached client-side.

use std::sync::Arc;

use serde_json::Value;
use tracing::instrument;
use vitrine_core::{AccountId, Profile, Role, Row, parse_row, parse_rows};
use vitrine_gateway::{BackendGateway, Filter, Order, Query};

use crate::error::AdminError;

/// Account listing and role management.
#[derive(Clone)]
pub struct UserDirectory {
    gateway: Arc<dyn BackendGateway>,
}

impl UserDirectory {
    #[must_use]
    pub fn new(gateway: Arc<dyn BackendGateway>) -> Self {
        Self { gateway }
    }

    /// Profiles for the admin list, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails or a row does not parse.
    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<Profile>, AdminError> {
        let rows = self
            .gateway
            .select(
                Profile::TABLE,
                Query::new().order(Order::desc("created_at")),
            )
            .await?;
        Ok(parse_rows("profile", rows)?)
    }

    /// The signed-in account's profile.
    ///
    /// # Errors
    ///
    /// Returns [`AdminError::LoginRequired`] without a session and
    /// [`AdminError::NotFound`] when the profile row is missing.
    #[instrument(skip(self))]
    pub async fn current_profile(&self) -> Result<Profile, AdminError> {
        let session = self.gateway.session().ok_or(AdminError::LoginRequired)?;
        let account = session.account_id();
        let row = self
            .gateway
            .select_one(
                Profile::TABLE,
                Query::new().filter(Filter::eq("id", account.to_string())),
            )
            .await?
            .ok_or_else(|| AdminError::NotFound(format!("profile {account}")))?;
        Ok(parse_row("profile", row)?)
    }

    /// Change another account's role.
    ///
    /// Only administrators may do this; moderators see the user list but
    /// cannot touch roles.
    ///
    /// # Errors
    ///
    /// Returns [`AdminError::Forbidden`] when the acting account is not an
    /// administrator.
    #[instrument(skip(self), fields(target = %target))]
    pub async fn assign_role(&self, target: AccountId, role: Role) -> Result<(), AdminError> {
        let actor = self.current_profile().await?;
        if !actor.role.can_assign_roles() {
            return Err(AdminError::Forbidden(
                "only administrators may change roles".to_string(),
            ));
        }

        let mut patch = Row::new();
        patch.insert("role".to_string(), Value::from(role.to_string()));
        self.gateway
            .update(
                Profile::TABLE,
                patch,
                &[Filter::eq("id", target.to_string())],
            )
            .await?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;
    use uuid::Uuid;
    use vitrine_gateway::{AuthApi, MemoryGateway, TableApi};

    async fn directory_as(role: &str) -> (MemoryGateway, UserDirectory) {
        let gateway = MemoryGateway::new();
        gateway
            .sign_up("staff@example.com", "hunter2!")
            .await
            .unwrap();
        let account = gateway.session().unwrap().account_id();

        let mut patch = Row::new();
        patch.insert("role".to_string(), Value::from(role));
        gateway
            .update(
                Profile::TABLE,
                patch,
                &[Filter::eq("id", account.to_string())],
            )
            .await
            .unwrap();

        let directory = UserDirectory::new(Arc::new(gateway.clone()));
        (gateway, directory)
    }

    fn seed_client(gateway: &MemoryGateway, full_name: &str) -> AccountId {
        let id = AccountId::new(Uuid::new_v4());
        gateway.seed(
            Profile::TABLE,
            json!({ "id": id.to_string(), "full_name": full_name, "role": "client" }),
        );
        id
    }

    fn stored_role(gateway: &MemoryGateway, account: AccountId) -> Value {
        gateway
            .rows(Profile::TABLE)
            .into_iter()
            .find(|row| row.get("id") == Some(&json!(account.to_string())))
            .and_then(|row| row.get("role").cloned())
            .unwrap()
    }

    #[tokio::test]
    async fn test_list_newest_first() {
        let gateway = MemoryGateway::new();
        seed_client(&gateway, "Ana Lima");
        seed_client(&gateway, "Bento Reis");
        let directory = UserDirectory::new(Arc::new(gateway));

        let names: Vec<Option<String>> = directory
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.full_name)
            .collect();
        assert_eq!(
            names,
            [Some("Bento Reis".to_string()), Some("Ana Lima".to_string())]
        );
    }

    #[tokio::test]
    async fn test_current_profile_requires_login() {
        let gateway = MemoryGateway::new();
        let directory = UserDirectory::new(Arc::new(gateway));

        let err = directory.current_profile().await.unwrap_err();
        assert!(matches!(err, AdminError::LoginRequired));
    }

    #[tokio::test]
    async fn test_admin_assigns_role() {
        let (gateway, directory) = directory_as("admin").await;
        let target = seed_client(&gateway, "Ana Lima");

        directory.assign_role(target, Role::Moderator).await.unwrap();
        assert_eq!(stored_role(&gateway, target), json!("moderator"));
    }

    #[tokio::test]
    async fn test_moderator_cannot_assign_roles() {
        let (gateway, directory) = directory_as("moderator").await;
        let target = seed_client(&gateway, "Ana Lima");

        let err = directory
            .assign_role(target, Role::Moderator)
            .await
            .unwrap_err();
        assert!(matches!(err, AdminError::Forbidden(_)));
        assert_eq!(stored_role(&gateway, target), json!("client"));
    }
}
