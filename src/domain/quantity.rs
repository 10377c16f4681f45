//! Quantity type
//!
//! Domain primitive for ticket quantities with business rule validation.
//! Quantities are validated at construction time, ensuring invalid values
//! cannot exist in the system.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Upper sanity bound on a single purchase request. The real per-user cap
/// is the event's `max_tickets_per_user`; this only rejects absurd input.
const MAX_QUANTITY: u32 = 1_000;

/// Quantity represents a validated ticket count.
///
/// # Invariants
/// - Value is always at least 1
/// - Value never exceeds 1000
///
/// # Example
/// ```
/// use box_office::domain::Quantity;
///
/// let quantity = Quantity::new(2).unwrap();
/// assert_eq!(quantity.value(), 2);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Quantity(u32);

/// Errors that can occur when creating a Quantity
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QuantityError {
    #[error("Quantity must be at least 1 (got {0})")]
    NotPositive(u32),

    #[error("Quantity exceeds maximum allowed value ({MAX_QUANTITY})")]
    TooLarge,

    #[error("Invalid quantity format: {0}")]
    ParseError(String),
}

impl Quantity {
    /// Create a new Quantity with validation.
    ///
    /// # Errors
    /// - `QuantityError::NotPositive` if value < 1
    /// - `QuantityError::TooLarge` if value > 1000
    pub fn new(value: u32) -> Result<Self, QuantityError> {
        if value == 0 {
            return Err(QuantityError::NotPositive(value));
        }

        if value > MAX_QUANTITY {
            return Err(QuantityError::TooLarge);
        }

        Ok(Self(value))
    }

    /// A quantity of exactly one ticket.
    pub fn one() -> Self {
        Self(1)
    }

    /// Get the underlying value.
    pub fn value(&self) -> u32 {
        self.0
    }

    /// The value as a signed integer, for SQL bind parameters.
    pub fn as_i32(&self) -> i32 {
        self.0 as i32
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Quantity {
    type Err = QuantityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: u32 = s
            .parse()
            .map_err(|e: std::num::ParseIntError| QuantityError::ParseError(e.to_string()))?;
        Quantity::new(value)
    }
}

impl TryFrom<u32> for Quantity {
    type Error = QuantityError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Quantity::new(value)
    }
}

impl From<Quantity> for u32 {
    fn from(quantity: Quantity) -> Self {
        quantity.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantity_positive() {
        let quantity = Quantity::new(2);
        assert!(quantity.is_ok());
        assert_eq!(quantity.unwrap().value(), 2);
    }

    #[test]
    fn test_quantity_zero_rejected() {
        let quantity = Quantity::new(0);
        assert!(matches!(quantity, Err(QuantityError::NotPositive(0))));
    }

    #[test]
    fn test_quantity_too_large() {
        let quantity = Quantity::new(1_001);
        assert!(matches!(quantity, Err(QuantityError::TooLarge)));
    }

    #[test]
    fn test_quantity_max_value_ok() {
        let quantity = Quantity::new(1_000);
        assert!(quantity.is_ok());
    }

    #[test]
    fn test_quantity_from_str() {
        let quantity: Result<Quantity, _> = "4".parse();
        assert!(quantity.is_ok());
        assert_eq!(quantity.unwrap().value(), 4);

        let bad: Result<Quantity, _> = "four".parse();
        assert!(matches!(bad, Err(QuantityError::ParseError(_))));

        let negative: Result<Quantity, _> = "-1".parse();
        assert!(matches!(negative, Err(QuantityError::ParseError(_))));
    }

    #[test]
    fn test_quantity_serde_rejects_zero() {
        let result: Result<Quantity, _> = serde_json::from_str("0");
        assert!(result.is_err());

        let ok: Quantity = serde_json::from_str("3").unwrap();
        assert_eq!(ok.value(), 3);
    }

    #[test]
    fn test_quantity_one() {
        assert_eq!(Quantity::one().value(), 1);
        assert_eq!(Quantity::one().as_i32(), 1);
    }
}
