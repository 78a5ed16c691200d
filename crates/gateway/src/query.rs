//! Typed row predicates for the table API.
//!
//! The backend exposes a small set of row filters; this module models
//! exactly that set so callers cannot express queries the backend would
//! reject. How a filter is transported is an implementation concern
//! ([`crate::SupabaseGateway`] renders REST query operators,
//! [`crate::MemoryGateway`] evaluates rows directly).

use serde_json::Value;

/// A single row predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// `column = value`
    Eq {
        column: String,
        value: Value,
    },
    /// `column != value`
    Neq {
        column: String,
        value: Value,
    },
    /// Case-insensitive pattern match; `%` matches any run of characters.
    ILike {
        column: String,
        pattern: String,
    },
    /// `column` is one of `values`.
    In {
        column: String,
        values: Vec<Value>,
    },
    /// `column >= value`; useful for timestamp lower bounds.
    Gte {
        column: String,
        value: Value,
    },
}

impl Filter {
    /// `column = value`
    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Eq {
            column: column.into(),
            value: value.into(),
        }
    }

    /// `column != value`
    pub fn neq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Neq {
            column: column.into(),
            value: value.into(),
        }
    }

    /// Case-insensitive pattern match with `%` wildcards.
    pub fn ilike(column: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::ILike {
            column: column.into(),
            pattern: pattern.into(),
        }
    }

    /// `column` is one of `values`.
    pub fn any_of(column: impl Into<String>, values: Vec<Value>) -> Self {
        Self::In {
            column: column.into(),
            values,
        }
    }

    /// `column >= value`
    pub fn gte(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Gte {
            column: column.into(),
            value: value.into(),
        }
    }
}

/// Result ordering for a select.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub column: String,
    pub ascending: bool,
}

impl Order {
    /// Ascending order on `column`.
    pub fn asc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            ascending: true,
        }
    }

    /// Descending order on `column`.
    pub fn desc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            ascending: false,
        }
    }
}

/// A select query: filters, optional ordering, optional row limit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filters: Vec<Filter>,
    pub order: Option<Order>,
    pub limit: Option<u32>,
}

impl Query {
    /// An unfiltered query returning every row.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a filter; filters combine conjunctively.
    #[must_use]
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Set the result ordering.
    #[must_use]
    pub fn order(mut self, order: Order) -> Self {
        self.order = Some(order);
        self
    }

    /// Cap the number of returned rows.
    #[must_use]
    pub const fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }
}
