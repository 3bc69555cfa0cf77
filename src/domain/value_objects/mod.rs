//! Value Objects for the checkout pipeline

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Discount code value object
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DiscountCode(String);

impl DiscountCode {
    pub fn new(value: impl Into<String>) -> Result<Self, DiscountCodeError> {
        let value = value.into().trim().to_string();
        if value.is_empty() { return Err(DiscountCodeError::Empty); }
        if value.len() > 64 { return Err(DiscountCodeError::TooLong); }
        Ok(Self(value))
    }
    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for DiscountCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum DiscountCodeError { Empty, TooLong }
impl std::error::Error for DiscountCodeError {}
impl fmt::Display for DiscountCodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self { Self::Empty => write!(f, "Discount code empty"), Self::TooLong => write!(f, "Discount code too long") }
    }
}

/// Percentage off, always within 0..=100
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Percentage(Decimal);

impl Percentage {
    pub fn new(value: Decimal) -> Result<Self, PercentageError> {
        if value < Decimal::ZERO || value > Decimal::ONE_HUNDRED { return Err(PercentageError::OutOfRange); }
        Ok(Self(value))
    }
    pub fn value(&self) -> Decimal { self.0 }
}

impl TryFrom<Decimal> for Percentage {
    type Error = PercentageError;
    fn try_from(value: Decimal) -> Result<Self, Self::Error> { Self::new(value) }
}

impl From<Percentage> for Decimal {
    fn from(p: Percentage) -> Self { p.0 }
}

impl fmt::Display for Percentage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}%", self.0.normalize()) }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum PercentageError { OutOfRange }
impl std::error::Error for PercentageError {}
impl fmt::Display for PercentageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "Percentage must be between 0 and 100") }
}

/// Quantity value object, strictly positive and at most [`Quantity::MAX`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u32")]
pub struct Quantity(u32);

impl Quantity {
    /// Largest quantity a cart line can hold; matches the INTEGER column.
    pub const MAX: u32 = i32::MAX as u32;

    pub fn new(value: i64) -> Result<Self, QuantityError> {
        if value <= 0 { return Err(QuantityError::NotPositive); }
        match u32::try_from(value) {
            Ok(v) if v <= Self::MAX => Ok(Self(v)),
            _ => Err(QuantityError::TooLarge),
        }
    }
    pub fn value(&self) -> u32 { self.0 }
    /// `None` when the sum would exceed [`Quantity::MAX`].
    pub fn checked_add(&self, other: Quantity) -> Option<Self> {
        self.0.checked_add(other.0).filter(|v| *v <= Self::MAX).map(Self)
    }
    /// `None` when nothing would be left.
    pub fn checked_sub(&self, other: Quantity) -> Option<Self> {
        self.0.checked_sub(other.0).filter(|v| *v > 0).map(Self)
    }
}

impl TryFrom<i64> for Quantity {
    type Error = QuantityError;
    fn try_from(value: i64) -> Result<Self, Self::Error> { Self::new(value) }
}

impl From<Quantity> for u32 {
    fn from(q: Quantity) -> Self { q.0 }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum QuantityError { NotPositive, TooLarge }
impl std::error::Error for QuantityError {}
impl fmt::Display for QuantityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotPositive => write!(f, "Quantity must be a positive integer"),
            Self::TooLarge => write!(f, "Quantity must not exceed {}", Quantity::MAX),
        }
    }
}

impl From<QuantityError> for crate::EcommerceError {
    fn from(_: QuantityError) -> Self { crate::EcommerceError::InvalidQuantity }
}

#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn test_discount_code() {
        let code = DiscountCode::new("  SPRING10 ").unwrap();
        assert_eq!(code.as_str(), "SPRING10");
        assert_eq!(DiscountCode::new("   "), Err(DiscountCodeError::Empty));
    }
    #[test]
    fn test_percentage_bounds() {
        assert!(Percentage::new(Decimal::new(10, 0)).is_ok());
        assert!(Percentage::new(Decimal::ONE_HUNDRED).is_ok());
        assert_eq!(Percentage::new(Decimal::new(101, 0)), Err(PercentageError::OutOfRange));
        assert_eq!(Percentage::new(Decimal::new(-1, 0)), Err(PercentageError::OutOfRange));
    }
    #[test]
    fn test_quantity() {
        assert_eq!(Quantity::new(3).unwrap().value(), 3);
        assert!(Quantity::new(0).is_err());
        assert!(Quantity::new(-2).is_err());
        assert_eq!(Quantity::new(i64::from(Quantity::MAX) + 1), Err(QuantityError::TooLarge));
        assert_eq!(Quantity::new(i64::from(u32::MAX) + 1), Err(QuantityError::TooLarge));
        assert_eq!(Quantity::new(2).unwrap().checked_add(Quantity::new(5).unwrap()).map(|q| q.value()), Some(7));
    }
    #[test]
    fn test_quantity_arithmetic_never_clamps() {
        let max = Quantity::new(i64::from(Quantity::MAX)).unwrap();
        let one = Quantity::new(1).unwrap();
        assert_eq!(max.checked_add(one), None);
        assert_eq!(max.checked_sub(one).map(|q| q.value()), Some(Quantity::MAX - 1));
        assert_eq!(one.checked_sub(one), None);
        assert_eq!(one.checked_sub(max), None);
    }
}
