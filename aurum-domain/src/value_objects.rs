//! Value objects for the Aurum domain.
//!
//! Immutable, validated domain primitives.
//! All value objects enforce invariants at construction time.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Domain errors for value object validation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomainError {
    /// Price must be positive
    #[error("Invalid price: {0}")]
    InvalidPrice(String),

    /// Quantity must be positive
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(String),

    /// Shipping information failed validation
    #[error("Invalid shipping info: {0}")]
    InvalidShippingInfo(String),

    /// Status string is not a known status
    #[error("Invalid status: {0}")]
    InvalidStatus(String),
}

// =============================================================================
// Price
// =============================================================================

/// Price represents a positive decimal amount in the store currency.
///
/// # Invariants
/// - Must be > 0
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Price(Decimal);

impl Price {
    /// Create a new Price with validation
    ///
    /// # Errors
    /// Returns `DomainError::InvalidPrice` if value <= 0
    pub fn new(value: Decimal) -> Result<Self, DomainError> {
        if value <= Decimal::ZERO {
            return Err(DomainError::InvalidPrice("Price must be positive".to_string()));
        }
        Ok(Self(value))
    }

    /// Get the underlying Decimal value
    pub fn as_decimal(&self) -> Decimal {
        self.0
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// Quantity
// =============================================================================

/// Quantity represents a positive unit count.
///
/// # Invariants
/// - Must be > 0
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Quantity(i32);

impl Quantity {
    /// Create a new Quantity with validation
    ///
    /// # Errors
    /// Returns `DomainError::InvalidQuantity` if value <= 0
    pub fn new(value: i32) -> Result<Self, DomainError> {
        if value <= 0 {
            return Err(DomainError::InvalidQuantity("Quantity must be positive".to_string()));
        }
        Ok(Self(value))
    }

    /// Get the underlying unit count
    pub fn as_i32(&self) -> i32 {
        self.0
    }

    /// Unit count as a Decimal (for money math)
    pub fn as_decimal(&self) -> Decimal {
        Decimal::from(self.0)
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// ShippingInfo
// =============================================================================

/// Shipping details frozen onto an order at creation time.
///
/// # Invariants
/// - All fields non-empty
/// - Email must contain an `@`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingInfo {
    /// Recipient full name
    pub recipient: String,
    /// Contact email, also used as the payment receipt address
    pub email: String,
    /// Street address
    pub address: String,
    /// City
    pub city: String,
    /// Postal code
    pub postal_code: String,
    /// Country
    pub country: String,
}

impl ShippingInfo {
    /// Create shipping info with validation
    ///
    /// # Errors
    /// Returns `DomainError::InvalidShippingInfo` if any field is empty
    /// or the email is malformed.
    pub fn new(
        recipient: impl Into<String>,
        email: impl Into<String>,
        address: impl Into<String>,
        city: impl Into<String>,
        postal_code: impl Into<String>,
        country: impl Into<String>,
    ) -> Result<Self, DomainError> {
        let info = Self {
            recipient: recipient.into(),
            email: email.into(),
            address: address.into(),
            city: city.into(),
            postal_code: postal_code.into(),
            country: country.into(),
        };
        info.validate()?;
        Ok(info)
    }

    fn validate(&self) -> Result<(), DomainError> {
        let fields = [
            ("recipient", &self.recipient),
            ("email", &self.email),
            ("address", &self.address),
            ("city", &self.city),
            ("postal_code", &self.postal_code),
            ("country", &self.country),
        ];

        for (name, value) in fields {
            if value.trim().is_empty() {
                return Err(DomainError::InvalidShippingInfo(format!("{} must not be empty", name)));
            }
        }

        if !self.email.contains('@') {
            return Err(DomainError::InvalidShippingInfo(format!(
                "Invalid email address: {}",
                self.email
            )));
        }

        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_price_validation() {
        assert!(Price::new(dec!(899.99)).is_ok());
        assert!(Price::new(dec!(0.01)).is_ok());
        assert!(Price::new(dec!(0)).is_err());
        assert!(Price::new(dec!(-10)).is_err());
    }

    #[test]
    fn test_price_as_decimal() {
        let price = Price::new(dec!(1299.50)).unwrap();
        assert_eq!(price.as_decimal(), dec!(1299.50));
    }

    #[test]
    fn test_quantity_validation() {
        assert!(Quantity::new(1).is_ok());
        assert!(Quantity::new(100).is_ok());
        assert!(Quantity::new(0).is_err());
        assert!(Quantity::new(-3).is_err());
    }

    #[test]
    fn test_quantity_as_decimal() {
        let qty = Quantity::new(2).unwrap();
        assert_eq!(qty.as_decimal(), dec!(2));
    }

    #[test]
    fn test_shipping_info_valid() {
        let info = ShippingInfo::new(
            "Ada Lovelace",
            "ada@example.com",
            "12 Gem Street",
            "London",
            "E1 6AN",
            "UK",
        );
        assert!(info.is_ok());
    }

    #[test]
    fn test_shipping_info_rejects_empty_fields() {
        let info = ShippingInfo::new("Ada Lovelace", "ada@example.com", "", "London", "E1 6AN", "UK");
        assert!(info.is_err());

        let info = ShippingInfo::new("  ", "ada@example.com", "12 Gem Street", "London", "E1 6AN", "UK");
        assert!(info.is_err());
    }

    #[test]
    fn test_shipping_info_rejects_bad_email() {
        let info = ShippingInfo::new("Ada Lovelace", "not-an-email", "12 Gem Street", "London", "E1 6AN", "UK");
        assert!(matches!(info, Err(DomainError::InvalidShippingInfo(_))));
    }
}
