//! Access checks for protected areas.

use std::sync::Arc;

use tracing::{debug, instrument};
use vitrine_core::{Profile, Role, parse_row};
use vitrine_gateway::{BackendGateway, Filter, Query};

/// Outcome of an access check, as seen by a view.
///
/// A view starts in `Checking` while [`SessionGuard::check`] is in flight
/// and renders nothing gated until a terminal state arrives; `check` itself
/// only ever returns the two terminal states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessState {
    /// A check is in flight; render neither the content nor a redirect.
    Checking,
    /// The signed-in account's role is in the allowed set.
    Authorized,
    /// No session, no profile, a disallowed role, or any failure along the
    /// way. Views redirect to the sign-in page on this state.
    Unauthorized,
}

/// Gate for role-restricted areas.
///
/// The check runs in full on every navigation: current session, then a
/// fresh `profiles` lookup. Nothing is cached, so a role change or an
/// expired session takes effect on the next navigation, and every failure
/// mode collapses into [`AccessState::Unauthorized`] rather than surfacing
/// an error to the shopper.
pub struct SessionGuard {
    gateway: Arc<dyn BackendGateway>,
    allowed: Vec<Role>,
}

impl SessionGuard {
    /// Roles admitted when no explicit set is given.
    pub const DEFAULT_ALLOWED: [Role; 2] = [Role::Admin, Role::Moderator];

    /// Guard admitting the default set (admins and moderators).
    #[must_use]
    pub fn new(gateway: Arc<dyn BackendGateway>) -> Self {
        Self::with_allowed_roles(gateway, Self::DEFAULT_ALLOWED.to_vec())
    }

    /// Guard admitting exactly `allowed`.
    #[must_use]
    pub fn with_allowed_roles(gateway: Arc<dyn BackendGateway>, allowed: Vec<Role>) -> Self {
        Self { gateway, allowed }
    }

    /// Run the access check once.
    ///
    /// Returns [`AccessState::Authorized`] or [`AccessState::Unauthorized`],
    /// never [`AccessState::Checking`].
    #[must_use]
    #[instrument(skip(self))]
    pub async fn check(&self) -> AccessState {
        let Some(session) = self.gateway.session() else {
            debug!("no session");
            return AccessState::Unauthorized;
        };

        let query = Query::new().filter(Filter::eq("id", session.account_id().to_string()));
        let row = match self.gateway.select_one(Profile::TABLE, query).await {
            Ok(Some(row)) => row,
            Ok(None) => {
                debug!(account = %session.account_id(), "no profile row");
                return AccessState::Unauthorized;
            }
            Err(e) => {
                debug!(error = %e, "profile lookup failed");
                return AccessState::Unauthorized;
            }
        };

        let profile: Profile = match parse_row("profile", row) {
            Ok(profile) => profile,
            Err(e) => {
                debug!(error = %e, "profile row malformed");
                return AccessState::Unauthorized;
            }
        };

        if self.allowed.contains(&profile.role) {
            AccessState::Authorized
        } else {
            debug!(role = %profile.role, "role not allowed");
            AccessState::Unauthorized
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use vitrine_gateway::{AuthApi, MemoryGateway, TableApi};

    async fn gateway_with_role(role: &str) -> MemoryGateway {
        let gateway = MemoryGateway::new();
        let session = gateway.sign_up("user@example.com", "hunter2!").await.unwrap();

        let mut patch = vitrine_core::Row::new();
        patch.insert("role".to_string(), serde_json::Value::from(role));
        gateway
            .update(
                Profile::TABLE,
                patch,
                &[Filter::eq("id", session.user.id.to_string())],
            )
            .await
            .unwrap();
        gateway
    }

    #[tokio::test]
    async fn test_no_session_is_unauthorized() {
        let gateway = MemoryGateway::new();
        let guard = SessionGuard::new(Arc::new(gateway));
        assert_eq!(guard.check().await, AccessState::Unauthorized);
    }

    #[tokio::test]
    async fn test_client_role_is_unauthorized_by_default() {
        let gateway = gateway_with_role("client").await;
        let guard = SessionGuard::new(Arc::new(gateway));
        assert_eq!(guard.check().await, AccessState::Unauthorized);
    }

    #[tokio::test]
    async fn test_default_set_admits_admin_and_moderator() {
        for role in ["admin", "moderator"] {
            let gateway = gateway_with_role(role).await;
            let guard = SessionGuard::new(Arc::new(gateway));
            assert_eq!(guard.check().await, AccessState::Authorized, "role {role}");
        }
    }

    #[tokio::test]
    async fn test_caller_supplied_set_overrides_default() {
        let gateway = gateway_with_role("client").await;
        let guard = SessionGuard::with_allowed_roles(Arc::new(gateway), vec![Role::Client]);
        assert_eq!(guard.check().await, AccessState::Authorized);
    }

    #[tokio::test]
    async fn test_missing_profile_row_is_unauthorized() {
        let gateway = MemoryGateway::new();
        let session = gateway.sign_up("user@example.com", "hunter2!").await.unwrap();
        gateway
            .delete(
                Profile::TABLE,
                &[Filter::eq("id", session.user.id.to_string())],
            )
            .await
            .unwrap();

        let guard = SessionGuard::new(Arc::new(gateway));
        assert_eq!(guard.check().await, AccessState::Unauthorized);
    }

    #[tokio::test]
    async fn test_unknown_role_is_unauthorized() {
        let gateway = gateway_with_role("superuser").await;
        let guard = SessionGuard::new(Arc::new(gateway));
        assert_eq!(guard.check().await, AccessState::Unauthorized);
    }

    #[tokio::test]
    async fn test_check_sees_role_changes_between_navigations() {
        let gateway = gateway_with_role("admin").await;
        let account = gateway.current_user().unwrap().id;
        let guard = SessionGuard::new(Arc::new(gateway.clone()));
        assert_eq!(guard.check().await, AccessState::Authorized);

        // Demote between navigations; the next check must see it
        let mut patch = vitrine_core::Row::new();
        patch.insert("role".to_string(), serde_json::Value::from("client"));
        gateway
            .update(Profile::TABLE, patch, &[Filter::eq("id", account.to_string())])
            .await
            .unwrap();

        assert_eq!(guard.check().await, AccessState::Unauthorized);
    }
}
