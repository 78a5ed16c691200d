//! In-process gateway double.
//!
//! Implements the same capability traits as [`crate::SupabaseGateway`]
//! against plain in-memory state, reproducing the backend behaviors the
//! state layer depends on: identity columns, `created_at` assignment,
//! unique-index conflicts, the sign-up trigger that provisions a `profiles`
//! row, and public-URL shapes. Every test in the workspace runs against
//! this type.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use uuid::Uuid;
use vitrine_core::{AccountId, Row};

use crate::api::{AuthApi, StorageApi, TableApi};
use crate::auth::{AuthSession, AuthUser};
use crate::error::GatewayError;
use crate::query::{Filter, Order, Query};

/// Public-URL base the double reports, matching the production shape so URL
/// parsing code is exercised the same way.
const PUBLIC_BASE: &str = "https://backend.memory.test";

/// An object held by a memory bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

#[derive(Default)]
struct Table {
    rows: Vec<Row>,
    next_id: i64,
}

struct PasswordAccount {
    id: AccountId,
    password: String,
}

struct MemoryInner {
    tables: RwLock<HashMap<String, Table>>,
    /// Columns under a case-insensitive unique index, per table.
    unique_columns: RwLock<HashMap<String, Vec<String>>>,
    accounts: RwLock<HashMap<String, PasswordAccount>>,
    session: RwLock<Option<AuthSession>>,
    buckets: RwLock<HashMap<String, HashMap<String, StoredObject>>>,
    reset_requests: RwLock<Vec<(String, String)>>,
    /// Monotonic clock so `created_at` values are distinct and sortable.
    epoch: DateTime<Utc>,
    tick: Mutex<i64>,
}

/// In-memory implementation of the full gateway surface.
///
/// Cloning is cheap and clones share state, so a test can hand one clone to
/// the code under test and keep another for assertions.
#[derive(Clone)]
pub struct MemoryGateway {
    inner: Arc<MemoryInner>,
}

impl Default for MemoryGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryGateway {
    /// An empty backend. The schema's unique index on `coupons.code` is
    /// pre-declared; add others with [`Self::with_unique`].
    #[must_use]
    pub fn new() -> Self {
        let gateway = Self {
            inner: Arc::new(MemoryInner {
                tables: RwLock::new(HashMap::new()),
                unique_columns: RwLock::new(HashMap::new()),
                accounts: RwLock::new(HashMap::new()),
                session: RwLock::new(None),
                buckets: RwLock::new(HashMap::new()),
                reset_requests: RwLock::new(Vec::new()),
                epoch: Utc::now(),
                tick: Mutex::new(0),
            }),
        };
        gateway.declare_unique("coupons", "code");
        gateway
    }

    /// Declare a case-insensitive unique index on `table.column`.
    #[must_use]
    pub fn with_unique(self, table: &str, column: &str) -> Self {
        self.declare_unique(table, column);
        self
    }

    fn declare_unique(&self, table: &str, column: &str) {
        self.inner
            .unique_columns
            .write()
            .entry(table.to_string())
            .or_default()
            .push(column.to_string());
    }

    /// Insert a row directly, bypassing the trait. Assigns `id` and
    /// `created_at` like a real insert; panics when `row` is not an object.
    pub fn seed(&self, table: &str, row: Value) -> Row {
        let Value::Object(row) = row else {
            panic!("seed row must be a JSON object");
        };
        self.store(table, row)
            .unwrap_or_else(|e| panic!("seed rejected: {e}"))
    }

    /// Rows currently held by `table`, in insertion order.
    #[must_use]
    pub fn rows(&self, table: &str) -> Vec<Row> {
        self.inner
            .tables
            .read()
            .get(table)
            .map(|t| t.rows.clone())
            .unwrap_or_default()
    }

    /// The object stored at `bucket/path`, if any.
    #[must_use]
    pub fn object(&self, bucket: &str, path: &str) -> Option<StoredObject> {
        self.inner.buckets.read().get(bucket)?.get(path).cloned()
    }

    /// Number of objects held by `bucket`.
    #[must_use]
    pub fn object_count(&self, bucket: &str) -> usize {
        self.inner
            .buckets
            .read()
            .get(bucket)
            .map_or(0, HashMap::len)
    }

    /// Password-reset requests recorded so far, as (email, redirect URL).
    #[must_use]
    pub fn password_reset_requests(&self) -> Vec<(String, String)> {
        self.inner.reset_requests.read().clone()
    }

    fn next_timestamp(&self) -> String {
        let mut tick = self.inner.tick.lock();
        *tick += 1;
        (self.inner.epoch + Duration::seconds(*tick)).to_rfc3339()
    }

    fn new_session(&self, id: AccountId, email: &str) -> AuthSession {
        let session = AuthSession {
            access_token: format!("memory-token-{}", Uuid::new_v4()),
            user: AuthUser {
                id,
                email: email.to_string(),
            },
        };
        *self.inner.session.write() = Some(session.clone());
        session
    }

    /// The insert path shared by [`TableApi::insert`] and [`Self::seed`].
    fn store(&self, table: &str, mut row: Row) -> Result<Row, GatewayError> {
        let unique = self
            .inner
            .unique_columns
            .read()
            .get(table)
            .cloned()
            .unwrap_or_default();

        let mut tables = self.inner.tables.write();
        let entry = tables.entry(table.to_string()).or_default();

        for column in &unique {
            if let Some(value) = row.get(column) {
                let taken = entry
                    .rows
                    .iter()
                    .any(|existing| existing.get(column).is_some_and(|v| json_ci_eq(v, value)));
                if taken {
                    return Err(GatewayError::Conflict(format!(
                        "duplicate key value violates unique constraint \"{table}_{column}_key\""
                    )));
                }
            }
        }

        match row.get("id").and_then(Value::as_i64) {
            Some(id) => entry.next_id = entry.next_id.max(id + 1),
            None if !row.contains_key("id") => {
                if entry.next_id == 0 {
                    entry.next_id = 1;
                }
                row.insert("id".to_string(), Value::from(entry.next_id));
                entry.next_id += 1;
            }
            // Non-numeric id supplied by the caller (e.g. profiles are
            // keyed by the account UUID); nothing to assign.
            None => {}
        }

        if !row.contains_key("created_at") {
            row.insert("created_at".to_string(), Value::from(self.next_timestamp()));
        }

        entry.rows.push(row.clone());
        Ok(row)
    }
}

// =============================================================================
// Filter evaluation
// =============================================================================

fn json_eq(a: &Value, b: &Value) -> bool {
    match (a.as_f64(), b.as_f64()) {
        // Numbers compare numerically so 5 matches 5.0
        (Some(x), Some(y)) => (x - y).abs() < f64::EPSILON,
        _ => a == b,
    }
}

fn json_ci_eq(a: &Value, b: &Value) -> bool {
    match (a.as_str(), b.as_str()) {
        (Some(x), Some(y)) => x.eq_ignore_ascii_case(y),
        _ => json_eq(a, b),
    }
}

fn json_gte(a: &Value, b: &Value) -> bool {
    if let (Some(x), Some(y)) = (a.as_f64(), b.as_f64()) {
        return x >= y;
    }
    match (a.as_str(), b.as_str()) {
        // Timestamps are RFC 3339 strings, which order lexicographically
        (Some(x), Some(y)) => x >= y,
        _ => false,
    }
}

fn json_cmp(a: &Value, b: &Value) -> std::cmp::Ordering {
    use std::cmp::Ordering;

    if let (Some(x), Some(y)) = (a.as_f64(), b.as_f64()) {
        return x.partial_cmp(&y).unwrap_or(Ordering::Equal);
    }
    match (a.as_str(), b.as_str()) {
        (Some(x), Some(y)) => x.cmp(y),
        _ => Ordering::Equal,
    }
}

/// Case-insensitive SQL `like` with `%` wildcards.
fn ilike_match(pattern: &str, text: &str) -> bool {
    let pattern = pattern.to_lowercase();
    let text = text.to_lowercase();

    let mut parts = pattern.split('%');
    let Some(prefix) = parts.next() else {
        return text.is_empty();
    };
    let Some(mut remainder) = text.strip_prefix(prefix) else {
        return false;
    };

    let rest: Vec<&str> = parts.collect();
    let Some((suffix, middle)) = rest.split_last() else {
        // No wildcard at all: exact match
        return remainder.is_empty();
    };

    for part in middle {
        match remainder.find(part) {
            Some(at) => remainder = remainder.get(at + part.len()..).unwrap_or(""),
            None => return false,
        }
    }

    remainder.ends_with(suffix)
}

fn matches(filter: &Filter, row: &Row) -> bool {
    match filter {
        Filter::Eq { column, value } => row.get(column).is_some_and(|v| json_eq(v, value)),
        Filter::Neq { column, value } => row
            .get(column)
            .is_some_and(|v| !v.is_null() && !json_eq(v, value)),
        Filter::ILike { column, pattern } => row
            .get(column)
            .and_then(Value::as_str)
            .is_some_and(|s| ilike_match(pattern, s)),
        Filter::In { column, values } => row
            .get(column)
            .is_some_and(|v| values.iter().any(|candidate| json_eq(v, candidate))),
        Filter::Gte { column, value } => row.get(column).is_some_and(|v| json_gte(v, value)),
    }
}

fn matches_all(filters: &[Filter], row: &Row) -> bool {
    filters.iter().all(|filter| matches(filter, row))
}

// =============================================================================
// AuthApi
// =============================================================================

#[async_trait]
impl AuthApi for MemoryGateway {
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, GatewayError> {
        let id = {
            let accounts = self.inner.accounts.read();
            match accounts.get(email) {
                Some(account) if account.password == password => account.id,
                _ => {
                    return Err(GatewayError::Api {
                        status: 400,
                        message: "Invalid login credentials".to_string(),
                    });
                }
            }
        };
        Ok(self.new_session(id, email))
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthSession, GatewayError> {
        let id = {
            let mut accounts = self.inner.accounts.write();
            if accounts.contains_key(email) {
                return Err(GatewayError::Api {
                    status: 422,
                    message: "User already registered".to_string(),
                });
            }
            let id = AccountId::new(Uuid::new_v4());
            accounts.insert(
                email.to_string(),
                PasswordAccount {
                    id,
                    password: password.to_string(),
                },
            );
            id
        };

        // The real backend provisions a profile row via a trigger
        let mut profile = Row::new();
        profile.insert("id".to_string(), Value::from(id.to_string()));
        profile.insert("full_name".to_string(), Value::Null);
        profile.insert("role".to_string(), Value::from("client"));
        self.store("profiles", profile)?;

        Ok(self.new_session(id, email))
    }

    async fn sign_out(&self) -> Result<(), GatewayError> {
        *self.inner.session.write() = None;
        Ok(())
    }

    fn session(&self) -> Option<AuthSession> {
        self.inner.session.read().clone()
    }

    fn current_user(&self) -> Option<AuthUser> {
        self.inner.session.read().as_ref().map(|s| s.user.clone())
    }

    async fn request_password_reset(
        &self,
        email: &str,
        redirect_url: &str,
    ) -> Result<(), GatewayError> {
        // Like the real backend, unknown emails are not revealed
        self.inner
            .reset_requests
            .write()
            .push((email.to_string(), redirect_url.to_string()));
        Ok(())
    }

    async fn update_password(&self, new_password: &str) -> Result<AuthUser, GatewayError> {
        let user = self.current_user().ok_or(GatewayError::AuthRequired)?;
        let mut accounts = self.inner.accounts.write();
        let account = accounts
            .get_mut(&user.email)
            .ok_or(GatewayError::AuthRequired)?;
        account.password = new_password.to_string();
        Ok(user)
    }
}

// =============================================================================
// TableApi
// =============================================================================

#[async_trait]
impl TableApi for MemoryGateway {
    async fn select(&self, table: &str, query: Query) -> Result<Vec<Row>, GatewayError> {
        let tables = self.inner.tables.read();
        let mut rows: Vec<Row> = tables
            .get(table)
            .map(|t| {
                t.rows
                    .iter()
                    .filter(|row| matches_all(&query.filters, row))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        if let Some(Order { column, ascending }) = &query.order {
            let null = Value::Null;
            // Stable sort: ties keep insertion order
            rows.sort_by(|a, b| {
                let ordering = json_cmp(
                    a.get(column).unwrap_or(&null),
                    b.get(column).unwrap_or(&null),
                );
                if *ascending { ordering } else { ordering.reverse() }
            });
        }

        if let Some(limit) = query.limit {
            rows.truncate(limit as usize);
        }
        Ok(rows)
    }

    async fn count(&self, table: &str, filters: &[Filter]) -> Result<u64, GatewayError> {
        let tables = self.inner.tables.read();
        let count = tables.get(table).map_or(0, |t| {
            t.rows.iter().filter(|row| matches_all(filters, row)).count()
        });
        Ok(count as u64)
    }

    async fn insert(&self, table: &str, row: Row) -> Result<Row, GatewayError> {
        self.store(table, row)
    }

    async fn update(
        &self,
        table: &str,
        patch: Row,
        filters: &[Filter],
    ) -> Result<(), GatewayError> {
        let unique = self
            .inner
            .unique_columns
            .read()
            .get(table)
            .cloned()
            .unwrap_or_default();

        let mut tables = self.inner.tables.write();
        let Some(entry) = tables.get_mut(table) else {
            return Ok(());
        };

        // A patched unique column must not collide with an untouched row
        for column in unique.iter().filter(|c| patch.contains_key(*c)) {
            let Some(new_value) = patch.get(column) else {
                continue;
            };
            let collides = entry.rows.iter().any(|row| {
                !matches_all(filters, row)
                    && row.get(column).is_some_and(|v| json_ci_eq(v, new_value))
            });
            if collides {
                return Err(GatewayError::Conflict(format!(
                    "duplicate key value violates unique constraint \"{table}_{column}_key\""
                )));
            }
        }

        for row in entry.rows.iter_mut().filter(|row| matches_all(filters, row)) {
            for (key, value) in &patch {
                row.insert(key.clone(), value.clone());
            }
        }
        Ok(())
    }

    async fn delete(&self, table: &str, filters: &[Filter]) -> Result<(), GatewayError> {
        let mut tables = self.inner.tables.write();
        if let Some(entry) = tables.get_mut(table) {
            entry.rows.retain(|row| !matches_all(filters, row));
        }
        Ok(())
    }
}

// =============================================================================
// StorageApi
// =============================================================================

#[async_trait]
impl StorageApi for MemoryGateway {
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), GatewayError> {
        let mut buckets = self.inner.buckets.write();
        let bucket = buckets.entry(bucket.to_string()).or_default();
        if bucket.contains_key(path) {
            return Err(GatewayError::Conflict(format!(
                "object already exists: {path}"
            )));
        }
        bucket.insert(
            path.to_string(),
            StoredObject {
                bytes,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        format!("{PUBLIC_BASE}/storage/v1/object/public/{bucket}/{path}")
    }

    async fn remove(&self, bucket: &str, paths: &[String]) -> Result<(), GatewayError> {
        let mut buckets = self.inner.buckets.write();
        if let Some(bucket) = buckets.get_mut(bucket) {
            for path in paths {
                bucket.remove(path);
            }
        }
        Ok(())
    }
}
