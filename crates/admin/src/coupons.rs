//! Coupon lifecycle.
//!
//! Codes live in a case-insensitively unique column. Creation checks the
//! code before inserting so the common case gets a friendly message, and
//! still maps the index conflict when two submissions race; the index is
//! what actually guarantees uniqueness.

use std::fmt;
use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde_json::Value;
use tracing::instrument;
use vitrine_core::{Coupon, CouponId, DiscountType, Row, parse_row, parse_rows};
use vitrine_gateway::{BackendGateway, Filter, GatewayError, Order, Query};

use crate::error::AdminError;

/// Coupon form input, exactly as typed.
///
/// Numeric and date fields stay [`String`]s until [`Self::normalized`] runs,
/// so a partially filled form can round-trip through a failed submit
/// without losing what the admin typed.
#[derive(Debug, Clone)]
pub struct CouponForm {
    pub code: String,
    pub discount_type: DiscountType,
    pub discount_value: String,
    /// Maximum redemptions; blank means unlimited.
    pub usage_limit: String,
    /// Minimum order total; blank means none.
    pub min_order_value: String,
    /// `YYYY-MM-DD`; blank means the coupon never expires.
    pub expiration_date: String,
    pub is_active: bool,
}

impl Default for CouponForm {
    fn default() -> Self {
        Self {
            code: String::new(),
            discount_type: DiscountType::Percent,
            discount_value: String::new(),
            usage_limit: String::new(),
            min_order_value: String::new(),
            expiration_date: String::new(),
            is_active: true,
        }
    }
}

impl CouponForm {
    /// Validate and convert into the shape that gets persisted.
    ///
    /// The code is validated as typed (after trimming) and must already be
    /// upper-case; normalization does not forgive a lower-case entry.
    ///
    /// # Errors
    ///
    /// Returns every field's message at once, not just the first failure.
    pub fn normalized(&self) -> Result<NewCoupon, CouponFormErrors> {
        let mut errors = CouponFormErrors::default();

        let code = self.code.trim();
        if code.is_empty() {
            errors.code = Some("code is required".to_string());
        } else if !code
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
        {
            errors.code = Some("only uppercase letters and digits are allowed".to_string());
        }

        let discount_value = match self.discount_value.trim().parse::<Decimal>() {
            Ok(value) => {
                let in_range = match self.discount_type {
                    DiscountType::Percent => {
                        (Decimal::ZERO..=Decimal::ONE_HUNDRED).contains(&value)
                    }
                    DiscountType::Fixed => value >= Decimal::ZERO,
                };
                if in_range {
                    Some(value)
                } else {
                    errors.discount_value = Some(
                        match self.discount_type {
                            DiscountType::Percent => "percentage must be between 0 and 100",
                            DiscountType::Fixed => "value cannot be negative",
                        }
                        .to_string(),
                    );
                    None
                }
            }
            Err(_) => {
                errors.discount_value = Some("invalid value".to_string());
                None
            }
        };

        let mut usage_limit = None;
        let limit_input = self.usage_limit.trim();
        if !limit_input.is_empty() {
            match limit_input.parse::<i64>() {
                Ok(limit) if limit > 0 => usage_limit = Some(limit),
                _ => errors.usage_limit = Some("invalid limit".to_string()),
            }
        }

        let mut min_order_value = None;
        let min_input = self.min_order_value.trim();
        if !min_input.is_empty() {
            match min_input.parse::<Decimal>() {
                Ok(min) if min >= Decimal::ZERO => min_order_value = Some(min),
                _ => errors.min_order_value = Some("invalid minimum value".to_string()),
            }
        }

        let mut expiration_date = None;
        let date_input = self.expiration_date.trim();
        if !date_input.is_empty() {
            match NaiveDate::parse_from_str(date_input, "%Y-%m-%d") {
                Ok(date) => expiration_date = Some(date),
                Err(_) => errors.expiration_date = Some("invalid date".to_string()),
            }
        }

        match (discount_value, errors.is_empty()) {
            (Some(discount_value), true) => Ok(NewCoupon {
                code: code.to_uppercase(),
                discount_type: self.discount_type,
                discount_value,
                usage_limit,
                min_order_value,
                expiration_date,
                is_active: self.is_active,
            }),
            _ => Err(errors),
        }
    }

    /// Check the form without building the persisted shape.
    ///
    /// # Errors
    ///
    /// Returns the same per-field messages [`Self::normalized`] would.
    pub fn validate(&self) -> Result<(), CouponFormErrors> {
        self.normalized().map(|_| ())
    }
}

/// Per-field messages from a rejected [`CouponForm`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CouponFormErrors {
    pub code: Option<String>,
    pub discount_value: Option<String>,
    pub usage_limit: Option<String>,
    pub min_order_value: Option<String>,
    pub expiration_date: Option<String>,
}

impl CouponFormErrors {
    /// Whether every field passed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.code.is_none()
            && self.discount_value.is_none()
            && self.usage_limit.is_none()
            && self.min_order_value.is_none()
            && self.expiration_date.is_none()
    }
}

impl fmt::Display for CouponFormErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<&str> = [
            self.code.as_deref(),
            self.discount_value.as_deref(),
            self.usage_limit.as_deref(),
            self.min_order_value.as_deref(),
            self.expiration_date.as_deref(),
        ]
        .into_iter()
        .flatten()
        .collect();
        write!(f, "{}", messages.join("; "))
    }
}

/// A validated coupon ready to persist; produced by
/// [`CouponForm::normalized`].
#[derive(Debug, Clone, PartialEq)]
pub struct NewCoupon {
    pub code: String,
    pub discount_type: DiscountType,
    pub discount_value: Decimal,
    pub usage_limit: Option<i64>,
    pub min_order_value: Option<Decimal>,
    pub expiration_date: Option<NaiveDate>,
    pub is_active: bool,
}

impl NewCoupon {
    /// The columns a create or update writes. `used_count` is deliberately
    /// absent: creation seeds it once and edits never touch it.
    fn into_row(self) -> Row {
        let mut row = Row::new();
        row.insert("code".to_string(), Value::from(self.code));
        row.insert(
            "discount_type".to_string(),
            Value::from(self.discount_type.to_string()),
        );
        row.insert(
            "discount_value".to_string(),
            Value::from(self.discount_value.to_string()),
        );
        row.insert(
            "usage_limit".to_string(),
            self.usage_limit.map_or(Value::Null, Value::from),
        );
        row.insert(
            "min_order_value".to_string(),
            self.min_order_value
                .map_or(Value::Null, |v| Value::from(v.to_string())),
        );
        row.insert(
            "expiration_date".to_string(),
            self.expiration_date
                .map_or(Value::Null, |d| Value::from(d.to_string())),
        );
        row.insert("is_active".to_string(), Value::from(self.is_active));
        row
    }
}

/// Coupon administration.
#[derive(Clone)]
pub struct CouponService {
    gateway: Arc<dyn BackendGateway>,
}

impl CouponService {
    #[must_use]
    pub fn new(gateway: Arc<dyn BackendGateway>) -> Self {
        Self { gateway }
    }

    /// Coupons for the admin list, newest first.
    ///
    /// A non-blank `search` matches codes case-insensitively as a
    /// substring; `active_only` hides deactivated coupons.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails or a row does not parse.
    #[instrument(skip(self))]
    pub async fn list(&self, search: &str, active_only: bool) -> Result<Vec<Coupon>, AdminError> {
        let mut query = Query::new().order(Order::desc("created_at"));
        let term = search.trim();
        if !term.is_empty() {
            query = query.filter(Filter::ilike("code", format!("%{term}%")));
        }
        if active_only {
            query = query.filter(Filter::eq("is_active", true));
        }

        let rows = self.gateway.select(Coupon::TABLE, query).await?;
        Ok(parse_rows("coupon", rows)?)
    }

    /// Validate and persist a new coupon, with `used_count` starting at 0.
    ///
    /// # Errors
    ///
    /// Returns [`AdminError::CouponForm`] when the form is invalid and
    /// [`AdminError::AlreadyExists`] when the code is taken, whichever side
    /// of the race detects it.
    #[instrument(skip(self, form), fields(code = %form.code))]
    pub async fn create(&self, form: &CouponForm) -> Result<Coupon, AdminError> {
        let coupon = form.normalized().map_err(AdminError::CouponForm)?;

        // ilike without wildcards is an exact case-insensitive match
        let taken = self
            .gateway
            .select_one(
                Coupon::TABLE,
                Query::new().filter(Filter::ilike("code", coupon.code.clone())),
            )
            .await?;
        if taken.is_some() {
            return Err(code_taken());
        }

        let mut row = coupon.into_row();
        row.insert("used_count".to_string(), Value::from(0));
        let stored = self
            .gateway
            .insert(Coupon::TABLE, row)
            .await
            .map_err(conflict_to_exists)?;
        Ok(parse_row("coupon", stored)?)
    }

    /// Validate and apply edits to an existing coupon.
    ///
    /// The redemption counter is not among the written columns, so an edit
    /// never resets it.
    ///
    /// # Errors
    ///
    /// Returns [`AdminError::CouponForm`] when the form is invalid and
    /// [`AdminError::AlreadyExists`] when renaming onto a taken code.
    #[instrument(skip(self, form), fields(coupon_id = %id))]
    pub async fn update(&self, id: CouponId, form: &CouponForm) -> Result<(), AdminError> {
        let coupon = form.normalized().map_err(AdminError::CouponForm)?;
        self.gateway
            .update(
                Coupon::TABLE,
                coupon.into_row(),
                &[Filter::eq("id", id.as_i64())],
            )
            .await
            .map_err(conflict_to_exists)?;
        Ok(())
    }

    /// Take a coupon out of circulation without deleting its history.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails.
    #[instrument(skip(self), fields(coupon_id = %id))]
    pub async fn deactivate(&self, id: CouponId) -> Result<(), AdminError> {
        self.set_active(id, false).await
    }

    /// Put a deactivated coupon back into circulation.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails.
    #[instrument(skip(self), fields(coupon_id = %id))]
    pub async fn reactivate(&self, id: CouponId) -> Result<(), AdminError> {
        self.set_active(id, true).await
    }

    async fn set_active(&self, id: CouponId, active: bool) -> Result<(), AdminError> {
        let mut patch = Row::new();
        patch.insert("is_active".to_string(), Value::from(active));
        self.gateway
            .update(Coupon::TABLE, patch, &[Filter::eq("id", id.as_i64())])
            .await?;
        Ok(())
    }
}

fn code_taken() -> AdminError {
    AdminError::AlreadyExists("a coupon with this code".to_string())
}

fn conflict_to_exists(err: GatewayError) -> AdminError {
    if err.is_conflict() {
        code_taken()
    } else {
        AdminError::Gateway(err)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;
    use vitrine_gateway::MemoryGateway;

    fn service() -> (MemoryGateway, CouponService) {
        let gateway = MemoryGateway::new();
        let service = CouponService::new(Arc::new(gateway.clone()));
        (gateway, service)
    }

    fn valid_form() -> CouponForm {
        CouponForm {
            code: "SAVE10".to_string(),
            discount_value: "10".to_string(),
            ..CouponForm::default()
        }
    }

    #[test]
    fn test_lowercase_code_is_rejected_as_typed() {
        let form = CouponForm {
            code: "abc123".to_string(),
            ..valid_form()
        };

        let errors = form.normalized().unwrap_err();
        assert_eq!(
            errors.code.unwrap(),
            "only uppercase letters and digits are allowed"
        );
    }

    #[test]
    fn test_uppercase_code_passes() {
        let form = CouponForm {
            code: " ABC123 ".to_string(),
            ..valid_form()
        };

        let coupon = form.normalized().unwrap();
        assert_eq!(coupon.code, "ABC123");
    }

    #[test]
    fn test_blank_code_is_required() {
        let form = CouponForm {
            code: "   ".to_string(),
            ..valid_form()
        };

        let errors = form.normalized().unwrap_err();
        assert_eq!(errors.code.unwrap(), "code is required");
    }

    #[test]
    fn test_percentage_range() {
        let form = CouponForm {
            discount_value: "150".to_string(),
            ..valid_form()
        };
        let errors = form.normalized().unwrap_err();
        assert_eq!(
            errors.discount_value.unwrap(),
            "percentage must be between 0 and 100"
        );

        let form = CouponForm {
            discount_value: "50".to_string(),
            ..valid_form()
        };
        assert_eq!(
            form.normalized().unwrap().discount_value,
            Decimal::new(50, 0)
        );
    }

    #[test]
    fn test_fixed_discount_allows_over_one_hundred() {
        let form = CouponForm {
            discount_type: DiscountType::Fixed,
            discount_value: "150".to_string(),
            ..valid_form()
        };
        assert!(form.normalized().is_ok());

        let form = CouponForm {
            discount_type: DiscountType::Fixed,
            discount_value: "-1".to_string(),
            ..valid_form()
        };
        let errors = form.normalized().unwrap_err();
        assert_eq!(errors.discount_value.unwrap(), "value cannot be negative");
    }

    #[test]
    fn test_optional_fields_parse_or_reject() {
        let form = CouponForm {
            usage_limit: "100".to_string(),
            min_order_value: "50.00".to_string(),
            expiration_date: "2026-12-31".to_string(),
            ..valid_form()
        };
        let coupon = form.normalized().unwrap();
        assert_eq!(coupon.usage_limit, Some(100));
        assert_eq!(coupon.min_order_value, Some(Decimal::new(5000, 2)));
        assert_eq!(
            coupon.expiration_date,
            Some(NaiveDate::from_ymd_opt(2026, 12, 31).unwrap())
        );

        let form = CouponForm {
            usage_limit: "0".to_string(),
            min_order_value: "-5".to_string(),
            expiration_date: "31/12/2026".to_string(),
            ..valid_form()
        };
        let errors = form.normalized().unwrap_err();
        assert_eq!(errors.usage_limit.unwrap(), "invalid limit");
        assert_eq!(errors.min_order_value.unwrap(), "invalid minimum value");
        assert_eq!(errors.expiration_date.unwrap(), "invalid date");
    }

    #[test]
    fn test_all_errors_reported_at_once() {
        let form = CouponForm {
            code: String::new(),
            discount_value: "abc".to_string(),
            ..CouponForm::default()
        };

        let errors = form.normalized().unwrap_err();
        assert!(errors.code.is_some());
        assert_eq!(errors.discount_value.unwrap(), "invalid value");
    }

    #[tokio::test]
    async fn test_create_persists_and_seeds_counter() {
        let (gateway, service) = service();

        let coupon = service.create(&valid_form()).await.unwrap();
        assert_eq!(coupon.code, "SAVE10");
        assert_eq!(coupon.discount_value, Decimal::new(10, 0));
        assert_eq!(coupon.used_count, 0);
        assert!(coupon.is_active);

        let rows = gateway.rows(Coupon::TABLE);
        assert_eq!(rows.len(), 1);
        let stored = rows.first().unwrap();
        assert_eq!(stored.get("used_count"), Some(&json!(0)));
    }

    #[tokio::test]
    async fn test_create_rejects_duplicate_code_case_insensitively() {
        let (gateway, service) = service();
        gateway.seed(
            Coupon::TABLE,
            json!({
                "code": "save10",
                "discount_type": "percent",
                "discount_value": 5,
                "used_count": 0,
                "is_active": true
            }),
        );

        let err = service.create(&valid_form()).await.unwrap_err();
        assert!(matches!(err, AdminError::AlreadyExists(_)));
        assert_eq!(gateway.rows(Coupon::TABLE).len(), 1);
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_form_without_backend_write() {
        let (gateway, service) = service();
        let form = CouponForm {
            code: "abc".to_string(),
            ..valid_form()
        };

        let err = service.create(&form).await.unwrap_err();
        assert!(matches!(err, AdminError::CouponForm(_)));
        assert!(gateway.rows(Coupon::TABLE).is_empty());
    }

    #[tokio::test]
    async fn test_update_preserves_used_count() {
        let (gateway, service) = service();
        let row = gateway.seed(
            Coupon::TABLE,
            json!({
                "code": "SAVE10",
                "discount_type": "percent",
                "discount_value": 10,
                "used_count": 7,
                "is_active": true
            }),
        );
        let id = CouponId::new(row.get("id").and_then(Value::as_i64).unwrap());

        let form = CouponForm {
            discount_value: "15".to_string(),
            ..valid_form()
        };
        service.update(id, &form).await.unwrap();

        let rows = gateway.rows(Coupon::TABLE);
        let stored = rows.first().unwrap();
        assert_eq!(stored.get("discount_value"), Some(&json!("15")));
        assert_eq!(stored.get("used_count"), Some(&json!(7)));
    }

    #[tokio::test]
    async fn test_update_onto_taken_code_conflicts() {
        let (gateway, service) = service();
        gateway.seed(
            Coupon::TABLE,
            json!({
                "code": "SAVE10",
                "discount_type": "percent",
                "discount_value": 10,
                "used_count": 0,
                "is_active": true
            }),
        );
        let row = gateway.seed(
            Coupon::TABLE,
            json!({
                "code": "WELCOME",
                "discount_type": "percent",
                "discount_value": 10,
                "used_count": 0,
                "is_active": true
            }),
        );
        let id = CouponId::new(row.get("id").and_then(Value::as_i64).unwrap());

        let err = service.update(id, &valid_form()).await.unwrap_err();
        assert!(matches!(err, AdminError::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn test_list_filters_and_orders() {
        let (_, service) = service();
        for (code, active) in [("SAVE10", true), ("WELCOME", true), ("SAVE20", false)] {
            let form = CouponForm {
                code: code.to_string(),
                is_active: active,
                ..valid_form()
            };
            service.create(&form).await.unwrap();
        }

        let all = service.list("", false).await.unwrap();
        let codes: Vec<&str> = all.iter().map(|c| c.code.as_str()).collect();
        assert_eq!(codes, ["SAVE20", "WELCOME", "SAVE10"]);

        let active = service.list("", true).await.unwrap();
        assert!(active.iter().all(|c| c.is_active));
        assert_eq!(active.len(), 2);

        let searched = service.list("save", false).await.unwrap();
        let codes: Vec<&str> = searched.iter().map(|c| c.code.as_str()).collect();
        assert_eq!(codes, ["SAVE20", "SAVE10"]);
    }

    #[tokio::test]
    async fn test_deactivate_and_reactivate_toggle() {
        let (_, service) = service();
        let coupon = service.create(&valid_form()).await.unwrap();

        service.deactivate(coupon.id).await.unwrap();
        assert!(service.list("", true).await.unwrap().is_empty());

        service.reactivate(coupon.id).await.unwrap();
        let active = service.list("", true).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active.first().unwrap().code, "SAVE10");
    }
}
