//! Type-safe price representation using decimal arithmetic.

use core::fmt;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`Price`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    /// The input string is empty.
    #[error("price cannot be empty")]
    Empty,
    /// The input does not parse as a decimal number.
    #[error("price must be a number")]
    NotANumber,
    /// The value is zero or negative.
    #[error("price must be greater than zero")]
    NotPositive,
}

/// A validated, strictly positive price.
///
/// Prices are parsed at the input boundary (product forms) and stored with
/// two decimal places. Rows read back from the backend are not re-validated;
/// a missing or malformed stored price is treated as zero by the consumers
/// that tolerate it (cart totals).
///
/// ## Examples
///
/// ```
/// use vitrine_core::Price;
///
/// assert!(Price::parse("19.99").is_ok());
/// assert!(Price::parse("abc").is_err());   // not a number
/// assert!(Price::parse("0").is_err());     // not positive
/// assert!(Price::parse("-5").is_err());    // not positive
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(Decimal);

impl Price {
    /// Parse a `Price` from a raw form input.
    ///
    /// The input is trimmed, parsed as a decimal, required to be strictly
    /// positive, and rounded to two decimal places (half away from zero).
    ///
    /// # Errors
    ///
    /// Returns an error if the input is empty, does not parse as a number,
    /// or is not strictly positive.
    pub fn parse(s: &str) -> Result<Self, PriceError> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(PriceError::Empty);
        }

        let amount: Decimal = trimmed.parse().map_err(|_| PriceError::NotANumber)?;
        Self::from_decimal(amount)
    }

    /// Validate an already-parsed decimal as a price.
    ///
    /// # Errors
    ///
    /// Returns [`PriceError::NotPositive`] if the value is zero or negative.
    pub fn from_decimal(amount: Decimal) -> Result<Self, PriceError> {
        if amount <= Decimal::ZERO {
            return Err(PriceError::NotPositive);
        }

        Ok(Self(amount.round_dp_with_strategy(
            2,
            RoundingStrategy::MidpointAwayFromZero,
        )))
    }

    /// Get the underlying decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl From<Price> for Decimal {
    fn from(price: Price) -> Self {
        price.0
    }
}
