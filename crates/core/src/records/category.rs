//! Category records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::CategoryId;

/// A row of the `categories` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl Category {
    /// Table this record is stored in.
    pub const TABLE: &'static str = "categories";
}
