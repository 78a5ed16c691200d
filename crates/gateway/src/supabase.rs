//! REST client for the hosted backend.
//!
//! The backend exposes three HTTP surfaces under one project URL:
//! `/auth/v1` (accounts and sessions), `/rest/v1` (table rows with query
//! operators), and `/storage/v1` (blob buckets). This client speaks all
//! three with `reqwest`, holding the signed-in session so every call runs
//! under the account's row-level permissions.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, instrument, warn};
use vitrine_core::Row;

use crate::api::{AuthApi, StorageApi, TableApi};
use crate::auth::{AuthSession, AuthUser};
use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::query::{Filter, Query};

/// SQLSTATE code the backend reports for unique-index violations.
const UNIQUE_VIOLATION: &str = "23505";

/// Longest error-body excerpt carried into an error message.
const MAX_ERROR_EXCERPT: usize = 200;

// =============================================================================
// SupabaseGateway
// =============================================================================

/// Client for the hosted backend's REST surfaces.
///
/// Cloning is cheap and clones share the held session.
#[derive(Clone)]
pub struct SupabaseGateway {
    inner: Arc<SupabaseGatewayInner>,
}

struct SupabaseGatewayInner {
    client: reqwest::Client,
    /// Project base URL without a trailing slash.
    base: String,
    api_key: String,
    session: RwLock<Option<AuthSession>>,
}

impl SupabaseGateway {
    /// Create a client authenticated with the public key.
    ///
    /// Table and storage calls run anonymously until [`AuthApi::sign_in`]
    /// succeeds, after which the session token is attached instead.
    #[must_use]
    pub fn new(config: &GatewayConfig) -> Self {
        Self::with_key(config, config.anon_key.clone())
    }

    /// Create a client authenticated with the service-role key, for
    /// server-side jobs that must bypass row-level rules.
    ///
    /// Returns `None` when no service-role key is configured.
    #[must_use]
    pub fn with_service_role(config: &GatewayConfig) -> Option<Self> {
        config
            .service_role_key()
            .map(|key| Self::with_key(config, key.to_string()))
    }

    fn with_key(config: &GatewayConfig, api_key: String) -> Self {
        let base = config.project_url.as_str().trim_end_matches('/').to_string();

        Self {
            inner: Arc::new(SupabaseGatewayInner {
                client: reqwest::Client::new(),
                base,
                api_key,
                session: RwLock::new(None),
            }),
        }
    }

    /// Bearer token for the next request: the session token when signed in,
    /// the API key otherwise.
    fn bearer(&self) -> String {
        self.inner
            .session
            .read()
            .as_ref()
            .map_or_else(|| self.inner.api_key.clone(), |s| s.access_token.clone())
    }

    fn request(&self, method: reqwest::Method, url: String) -> reqwest::RequestBuilder {
        self.inner
            .client
            .request(method, url)
            .header("apikey", &self.inner.api_key)
            .bearer_auth(self.bearer())
    }

    fn auth_url(&self, endpoint: &str) -> String {
        format!("{}/auth/v1/{endpoint}", self.inner.base)
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{table}", self.inner.base)
    }

    fn object_url(&self, bucket: &str, path: &str) -> String {
        format!("{}/storage/v1/object/{bucket}/{path}", self.inner.base)
    }

    /// Read a response body as JSON, with the raw text kept for diagnostics.
    async fn read_json<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, GatewayError> {
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| {
            warn!(
                error = %e,
                body = %excerpt(&text),
                "failed to parse backend response"
            );
            GatewayError::Decode(e)
        })
    }
}

// =============================================================================
// Response handling
// =============================================================================

/// Pass successful responses through; turn everything else into a typed
/// error with the message the backend sent.
async fn check(response: reqwest::Response) -> Result<reqwest::Response, GatewayError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let (code, message) = parse_error_body(&body, status);

    if status == reqwest::StatusCode::CONFLICT || code.as_deref() == Some(UNIQUE_VIOLATION) {
        return Err(GatewayError::Conflict(message));
    }

    Err(GatewayError::Api {
        status: status.as_u16(),
        message,
    })
}

/// Extract the SQLSTATE code (if any) and a human-readable message from an
/// error body. The table surface reports `{"code", "message"}`; the auth
/// surface reports `{"msg"}` or `{"error_description"}`.
fn parse_error_body(body: &str, status: reqwest::StatusCode) -> (Option<String>, String) {
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        let code = value
            .get("code")
            .and_then(Value::as_str)
            .map(ToString::to_string);
        let message = ["message", "msg", "error_description", "error"]
            .iter()
            .find_map(|key| value.get(*key).and_then(Value::as_str))
            .map(ToString::to_string);

        if let Some(message) = message {
            return (code, message);
        }
    }

    let fallback = if body.trim().is_empty() {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    } else {
        excerpt(body)
    };
    (None, fallback)
}

fn excerpt(body: &str) -> String {
    body.chars().take(MAX_ERROR_EXCERPT).collect()
}

/// Parse the total from a `Content-Range` header (`0-9/42` or `*/42`).
fn parse_content_range(header: &str) -> Option<u64> {
    header.rsplit('/').next()?.parse().ok()
}

// =============================================================================
// Query rendering
// =============================================================================

/// Render a filter as the REST dialect's `column=operator.value` pair.
fn rest_filter(filter: &Filter) -> (String, String) {
    match filter {
        Filter::Eq { column, value } => (column.clone(), format!("eq.{}", rest_value(value))),
        Filter::Neq { column, value } => (column.clone(), format!("neq.{}", rest_value(value))),
        Filter::ILike { column, pattern } => (column.clone(), format!("ilike.{pattern}")),
        Filter::In { column, values } => {
            let list = values.iter().map(rest_value).collect::<Vec<_>>().join(",");
            (column.clone(), format!("in.({list})"))
        }
        Filter::Gte { column, value } => (column.clone(), format!("gte.{}", rest_value(value))),
    }
}

/// Values appear bare in query operators, not JSON-quoted.
fn rest_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn apply_query(mut request: reqwest::RequestBuilder, query: &Query) -> reqwest::RequestBuilder {
    for filter in &query.filters {
        request = request.query(&[rest_filter(filter)]);
    }
    if let Some(order) = &query.order {
        let direction = if order.ascending { "asc" } else { "desc" };
        request = request.query(&[("order", format!("{}.{direction}", order.column))]);
    }
    if let Some(limit) = query.limit {
        request = request.query(&[("limit", limit.to_string())]);
    }
    request
}

fn apply_filters(
    mut request: reqwest::RequestBuilder,
    filters: &[Filter],
) -> reqwest::RequestBuilder {
    for filter in filters {
        request = request.query(&[rest_filter(filter)]);
    }
    request
}

// =============================================================================
// AuthApi
// =============================================================================

/// Session payload returned by the auth surface.
#[derive(Debug, Deserialize)]
struct SessionPayload {
    access_token: String,
    user: AuthUser,
}

impl From<SessionPayload> for AuthSession {
    fn from(payload: SessionPayload) -> Self {
        Self {
            access_token: payload.access_token,
            user: payload.user,
        }
    }
}

#[async_trait]
impl AuthApi for SupabaseGateway {
    #[instrument(skip(self, password), fields(email = %email))]
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, GatewayError> {
        let url = format!("{}?grant_type=password", self.auth_url("token"));
        let response = self
            .request(reqwest::Method::POST, url)
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await?;

        let payload: SessionPayload = Self::read_json(check(response).await?).await?;
        let session = AuthSession::from(payload);
        *self.inner.session.write() = Some(session.clone());
        debug!(account = %session.user.id, "signed in");
        Ok(session)
    }

    #[instrument(skip(self, password), fields(email = %email))]
    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthSession, GatewayError> {
        let response = self
            .request(reqwest::Method::POST, self.auth_url("signup"))
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await?;

        let payload: SessionPayload = Self::read_json(check(response).await?).await?;
        let session = AuthSession::from(payload);
        *self.inner.session.write() = Some(session.clone());
        debug!(account = %session.user.id, "account created");
        Ok(session)
    }

    #[instrument(skip(self))]
    async fn sign_out(&self) -> Result<(), GatewayError> {
        // Drop the local session first so the account is signed out even if
        // revocation fails.
        let Some(session) = self.inner.session.write().take() else {
            return Ok(());
        };

        let response = self
            .inner
            .client
            .post(self.auth_url("logout"))
            .header("apikey", &self.inner.api_key)
            .bearer_auth(session.access_token)
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    fn session(&self) -> Option<AuthSession> {
        self.inner.session.read().clone()
    }

    fn current_user(&self) -> Option<AuthUser> {
        self.inner.session.read().as_ref().map(|s| s.user.clone())
    }

    #[instrument(skip(self), fields(email = %email))]
    async fn request_password_reset(
        &self,
        email: &str,
        redirect_url: &str,
    ) -> Result<(), GatewayError> {
        let response = self
            .request(reqwest::Method::POST, self.auth_url("recover"))
            .query(&[("redirect_to", redirect_url)])
            .json(&serde_json::json!({ "email": email }))
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    #[instrument(skip(self, new_password))]
    async fn update_password(&self, new_password: &str) -> Result<AuthUser, GatewayError> {
        if self.inner.session.read().is_none() {
            return Err(GatewayError::AuthRequired);
        }

        let response = self
            .request(reqwest::Method::PUT, self.auth_url("user"))
            .json(&serde_json::json!({ "password": new_password }))
            .send()
            .await?;

        let user: AuthUser = Self::read_json(check(response).await?).await?;
        if let Some(session) = self.inner.session.write().as_mut() {
            session.user = user.clone();
        }
        Ok(user)
    }
}

// =============================================================================
// TableApi
// =============================================================================

#[async_trait]
impl TableApi for SupabaseGateway {
    #[instrument(skip(self, query), fields(table = %table))]
    async fn select(&self, table: &str, query: Query) -> Result<Vec<Row>, GatewayError> {
        let request = self.request(reqwest::Method::GET, self.table_url(table));
        let response = apply_query(request, &query).send().await?;
        Self::read_json(check(response).await?).await
    }

    #[instrument(skip(self, filters), fields(table = %table))]
    async fn count(&self, table: &str, filters: &[Filter]) -> Result<u64, GatewayError> {
        let request = self
            .request(reqwest::Method::HEAD, self.table_url(table))
            .header("Prefer", "count=exact");
        let response = apply_filters(request, filters).send().await?;
        let response = check(response).await?;

        let header = response
            .headers()
            .get("content-range")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        parse_content_range(header).ok_or_else(|| GatewayError::Api {
            status: 200,
            message: format!("missing row count in content-range header: {header:?}"),
        })
    }

    #[instrument(skip(self, row), fields(table = %table))]
    async fn insert(&self, table: &str, row: Row) -> Result<Row, GatewayError> {
        let response = self
            .request(reqwest::Method::POST, self.table_url(table))
            .header("Prefer", "return=representation")
            .json(&Value::Object(row))
            .send()
            .await?;

        let mut rows: Vec<Row> = Self::read_json(check(response).await?).await?;
        rows.pop().ok_or_else(|| GatewayError::Api {
            status: 200,
            message: "insert returned no representation".to_string(),
        })
    }

    #[instrument(skip(self, patch, filters), fields(table = %table))]
    async fn update(
        &self,
        table: &str,
        patch: Row,
        filters: &[Filter],
    ) -> Result<(), GatewayError> {
        let request = self
            .request(reqwest::Method::PATCH, self.table_url(table))
            .header("Prefer", "return=minimal")
            .json(&Value::Object(patch));
        let response = apply_filters(request, filters).send().await?;
        check(response).await?;
        Ok(())
    }

    #[instrument(skip(self, filters), fields(table = %table))]
    async fn delete(&self, table: &str, filters: &[Filter]) -> Result<(), GatewayError> {
        let request = self.request(reqwest::Method::DELETE, self.table_url(table));
        let response = apply_filters(request, filters).send().await?;
        check(response).await?;
        Ok(())
    }
}

// =============================================================================
// StorageApi
// =============================================================================

#[async_trait]
impl StorageApi for SupabaseGateway {
    #[instrument(skip(self, bytes), fields(bucket = %bucket, path = %path, size = bytes.len()))]
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), GatewayError> {
        let response = self
            .request(reqwest::Method::POST, self.object_url(bucket, path))
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{bucket}/{path}",
            self.inner.base
        )
    }

    #[instrument(skip(self, paths), fields(bucket = %bucket, count = paths.len()))]
    async fn remove(&self, bucket: &str, paths: &[String]) -> Result<(), GatewayError> {
        let url = format!("{}/storage/v1/object/{bucket}", self.inner.base);
        let response = self
            .request(reqwest::Method::DELETE, url)
            .json(&serde_json::json!({ "prefixes": paths }))
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }
}
