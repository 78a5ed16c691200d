//! Account flows: registration, sign-in, password recovery, profile.

use std::sync::Arc;

use serde_json::Value;
use tracing::instrument;
use vitrine_core::{Profile, Row, parse_row};
use vitrine_gateway::{AuthSession, BackendGateway, Filter, GatewayError, Query};

use crate::error::StorefrontError;

const MIN_PASSWORD_LENGTH: usize = 6;

/// Account lifecycle operations for the signed-in (or signing-in) shopper.
#[derive(Clone)]
pub struct AccountService {
    gateway: Arc<dyn BackendGateway>,
}

impl AccountService {
    #[must_use]
    pub fn new(gateway: Arc<dyn BackendGateway>) -> Self {
        Self { gateway }
    }

    /// Sign in with email and password.
    ///
    /// # Errors
    ///
    /// Returns the gateway's error when the credentials are rejected.
    #[instrument(skip(self, password))]
    pub async fn sign_in(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, StorefrontError> {
        Ok(self.gateway.sign_in(email, password).await?)
    }

    /// Register a new account and put `display_name` on its profile.
    ///
    /// The backend provisions the profile row; this writes the shopper's
    /// chosen name onto it. A blank name leaves the profile unnamed.
    ///
    /// # Errors
    ///
    /// Returns [`StorefrontError::WeakPassword`] before any backend call
    /// when the password is too short, or the gateway's error otherwise.
    #[instrument(skip(self, password))]
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> Result<AuthSession, StorefrontError> {
        validate_password(password)?;
        let session = self.gateway.sign_up(email, password).await?;

        let display_name = display_name.trim();
        if !display_name.is_empty() {
            let mut patch = Row::new();
            patch.insert("full_name".to_string(), Value::from(display_name));
            self.gateway
                .update(
                    Profile::TABLE,
                    patch,
                    &[Filter::eq("id", session.account_id().to_string())],
                )
                .await?;
        }
        Ok(session)
    }

    /// Drop the current session.
    ///
    /// # Errors
    ///
    /// Returns the gateway's error when server-side revocation fails; the
    /// local session is gone either way.
    #[instrument(skip(self))]
    pub async fn sign_out(&self) -> Result<(), StorefrontError> {
        Ok(self.gateway.sign_out().await?)
    }

    /// Email a password-recovery link landing on `redirect_url`.
    ///
    /// # Errors
    ///
    /// Returns the gateway's error if the request is rejected.
    #[instrument(skip(self))]
    pub async fn request_password_reset(
        &self,
        email: &str,
        redirect_url: &str,
    ) -> Result<(), StorefrontError> {
        Ok(self
            .gateway
            .request_password_reset(email, redirect_url)
            .await?)
    }

    /// Set a new password for the signed-in account.
    ///
    /// # Errors
    ///
    /// Returns [`StorefrontError::WeakPassword`] when the password is too
    /// short, [`StorefrontError::LoginRequired`] without a session, or the
    /// gateway's error otherwise.
    #[instrument(skip(self, new_password))]
    pub async fn update_password(&self, new_password: &str) -> Result<(), StorefrontError> {
        validate_password(new_password)?;
        self.gateway
            .update_password(new_password)
            .await
            .map_err(login_required)?;
        Ok(())
    }

    /// The signed-in account's profile row.
    ///
    /// # Errors
    ///
    /// Returns [`StorefrontError::LoginRequired`] without a session,
    /// [`StorefrontError::NotFound`] when the profile row is missing, or
    /// the gateway's error if the read fails.
    #[instrument(skip(self))]
    pub async fn current_profile(&self) -> Result<Profile, StorefrontError> {
        let Some(session) = self.gateway.session() else {
            return Err(StorefrontError::LoginRequired);
        };

        let row = self
            .gateway
            .select_one(
                Profile::TABLE,
                Query::new().filter(Filter::eq("id", session.account_id().to_string())),
            )
            .await?
            .ok_or_else(|| {
                StorefrontError::NotFound(format!("profile {}", session.account_id()))
            })?;
        Ok(parse_row("profile", row)?)
    }
}

/// Validate password meets requirements.
fn validate_password(password: &str) -> Result<(), StorefrontError> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(StorefrontError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }

    Ok(())
}

fn login_required(e: GatewayError) -> StorefrontError {
    match e {
        GatewayError::AuthRequired => StorefrontError::LoginRequired,
        other => other.into(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use vitrine_gateway::MemoryGateway;

    fn service() -> (MemoryGateway, AccountService) {
        let gateway = MemoryGateway::new();
        let service = AccountService::new(Arc::new(gateway.clone()));
        (gateway, service)
    }

    fn full_name(gateway: &MemoryGateway) -> Value {
        gateway
            .rows(Profile::TABLE)
            .first()
            .and_then(|row| row.get("full_name"))
            .cloned()
            .unwrap()
    }

    #[tokio::test]
    async fn test_sign_up_rejects_short_password() {
        let (gateway, service) = service();

        let err = service
            .sign_up("ana@example.com", "12345", "Ana")
            .await
            .unwrap_err();
        assert!(matches!(err, StorefrontError::WeakPassword(_)));
        assert!(gateway.rows(Profile::TABLE).is_empty());
    }

    #[tokio::test]
    async fn test_sign_up_writes_display_name() {
        let (gateway, service) = service();

        service
            .sign_up("ana@example.com", "hunter2!", "  Ana Lima  ")
            .await
            .unwrap();
        assert_eq!(full_name(&gateway), Value::from("Ana Lima"));
    }

    #[tokio::test]
    async fn test_sign_up_blank_name_leaves_profile_unnamed() {
        let (gateway, service) = service();

        service
            .sign_up("ana@example.com", "hunter2!", "   ")
            .await
            .unwrap();
        assert_eq!(full_name(&gateway), Value::Null);
    }

    #[tokio::test]
    async fn test_sign_in_after_sign_out() {
        let (_gateway, service) = service();

        let first = service
            .sign_up("ana@example.com", "hunter2!", "Ana")
            .await
            .unwrap();
        service.sign_out().await.unwrap();

        let second = service.sign_in("ana@example.com", "hunter2!").await.unwrap();
        assert_eq!(second.account_id(), first.account_id());
    }

    #[tokio::test]
    async fn test_update_password_requires_session() {
        let (_gateway, service) = service();

        let err = service.update_password("hunter3!").await.unwrap_err();
        assert!(matches!(err, StorefrontError::LoginRequired));
    }

    #[tokio::test]
    async fn test_update_password_rejects_short() {
        let (_gateway, service) = service();
        service
            .sign_up("ana@example.com", "hunter2!", "Ana")
            .await
            .unwrap();

        let err = service.update_password("short").await.unwrap_err();
        assert!(matches!(err, StorefrontError::WeakPassword(_)));
    }

    #[tokio::test]
    async fn test_update_password_takes_effect() {
        let (_gateway, service) = service();
        service
            .sign_up("ana@example.com", "hunter2!", "Ana")
            .await
            .unwrap();

        service.update_password("hunter3!").await.unwrap();
        service.sign_out().await.unwrap();

        assert!(service.sign_in("ana@example.com", "hunter2!").await.is_err());
        service.sign_in("ana@example.com", "hunter3!").await.unwrap();
    }

    #[tokio::test]
    async fn test_password_reset_request_reaches_backend() {
        let (gateway, service) = service();

        service
            .request_password_reset("ana@example.com", "https://shop.example/reset")
            .await
            .unwrap();

        let requests = gateway.password_reset_requests();
        assert_eq!(
            requests.first().unwrap(),
            &(
                "ana@example.com".to_string(),
                "https://shop.example/reset".to_string()
            )
        );
    }

    #[tokio::test]
    async fn test_current_profile_round_trip() {
        let (_gateway, service) = service();

        let err = service.current_profile().await.unwrap_err();
        assert!(matches!(err, StorefrontError::LoginRequired));

        let session = service
            .sign_up("ana@example.com", "hunter2!", "Ana")
            .await
            .unwrap();
        let profile = service.current_profile().await.unwrap();
        assert_eq!(profile.id, session.account_id());
        assert_eq!(profile.full_name.as_deref(), Some("Ana"));
    }
}
