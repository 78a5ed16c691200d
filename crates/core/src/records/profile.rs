//! Profile records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{AccountId, Role};

/// A row of the `profiles` table.
///
/// Provisioned by the backend when an account signs up, keyed by the
/// account's auth identity. The role column drives every access check; a
/// row whose role does not parse is treated as unauthorized by callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: AccountId,
    pub full_name: Option<String>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl Profile {
    /// Table this record is stored in.
    pub const TABLE: &'static str = "profiles";
}
