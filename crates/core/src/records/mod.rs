//! Typed table records.
//!
//! The backend returns table rows as loosely-typed JSON objects. Everything
//! that crosses that boundary is parsed into one of the records in this
//! module before the rest of the workspace touches it; rows that do not
//! match the expected shape surface as [`RecordError`] at the call site
//! instead of propagating `null`s downstream.

use serde::de::DeserializeOwned;

pub mod cart;
pub mod category;
pub mod coupon;
pub mod favorite;
pub mod order;
pub mod product;
pub mod profile;

pub use cart::CartItem;
pub use category::Category;
pub use coupon::{Coupon, DiscountType};
pub use favorite::FavoriteItem;
pub use order::Order;
pub use product::{Product, ProductSummary};
pub use profile::Profile;

/// A raw table row as returned by the backend.
pub type Row = serde_json::Map<String, serde_json::Value>;

/// Errors produced when parsing backend rows into typed records.
#[derive(thiserror::Error, Debug)]
pub enum RecordError {
    /// A row did not match the expected shape for the entity.
    #[error("malformed {entity} row")]
    Malformed {
        /// The entity being parsed (e.g. "product").
        entity: &'static str,
        /// The underlying deserialization error.
        #[source]
        source: serde_json::Error,
    },
}

/// Parse a single row into a typed record.
///
/// # Errors
///
/// Returns [`RecordError::Malformed`] if the row does not deserialize into
/// the target record.
pub fn parse_row<T: DeserializeOwned>(entity: &'static str, row: Row) -> Result<T, RecordError> {
    serde_json::from_value(serde_json::Value::Object(row))
        .map_err(|source| RecordError::Malformed { entity, source })
}

/// Parse a batch of rows into typed records, preserving order.
///
/// # Errors
///
/// Returns [`RecordError::Malformed`] for the first row that does not
/// deserialize into the target record.
pub fn parse_rows<T: DeserializeOwned>(
    entity: &'static str,
    rows: Vec<Row>,
) -> Result<Vec<T>, RecordError> {
    rows.into_iter().map(|row| parse_row(entity, row)).collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_row_reports_entity() {
        let row = serde_json::json!({ "id": "not-a-number" });
        let serde_json::Value::Object(row) = row else {
            unreachable!()
        };

        let err = parse_row::<Category>("category", row).unwrap_err();
        assert!(err.to_string().contains("category"));
    }
}
