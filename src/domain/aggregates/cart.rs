//! Cart Aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use crate::domain::value_objects::{DiscountCode, Percentage, Quantity};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Cart {
    user_id: Uuid,
    lines: Vec<CartLine>,
    applied_discount: Option<AppliedDiscount>,
    updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: Uuid,
    pub quantity: Quantity,
    pub added_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Copy of a discount taken when it was applied to the cart.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedDiscount {
    pub code: DiscountCode,
    pub percentage: Percentage,
}

impl Cart {
    pub fn new(user_id: Uuid) -> Self {
        Self { user_id, lines: vec![], applied_discount: None, updated_at: Utc::now() }
    }

    /// Rebuilds a cart from persisted state.
    pub fn restore(user_id: Uuid, lines: Vec<CartLine>, applied_discount: Option<AppliedDiscount>, updated_at: DateTime<Utc>) -> Self {
        let mut cart = Self { user_id, lines, applied_discount, updated_at };
        if cart.lines.is_empty() { cart.applied_discount = None; }
        cart
    }

    pub fn user_id(&self) -> Uuid { self.user_id }
    pub fn lines(&self) -> &[CartLine] { &self.lines }
    pub fn applied_discount(&self) -> Option<&AppliedDiscount> { self.applied_discount.as_ref() }
    pub fn updated_at(&self) -> DateTime<Utc> { self.updated_at }
    pub fn is_empty(&self) -> bool { self.lines.is_empty() }
    pub fn line(&self, product_id: Uuid) -> Option<&CartLine> { self.lines.iter().find(|l| l.product_id == product_id) }
    pub fn item_count(&self) -> u32 { self.lines.iter().fold(0u32, |acc, l| acc.saturating_add(l.quantity.value())) }

    /// Merges into an existing line. A merge past `Quantity::MAX` changes nothing.
    pub fn add_item(&mut self, product_id: Uuid, quantity: Quantity) -> Result<(), CartError> {
        let now = Utc::now();
        if let Some(existing) = self.lines.iter_mut().find(|l| l.product_id == product_id) {
            existing.quantity = existing.quantity.checked_add(quantity).ok_or(CartError::QuantityOverflow)?;
            existing.updated_at = now;
        } else {
            self.lines.push(CartLine { product_id, quantity, added_at: now, updated_at: now });
        }
        self.touch();
        Ok(())
    }

    pub fn update_quantity(&mut self, product_id: Uuid, quantity: Quantity) -> Result<(), CartError> {
        let line = self.lines.iter_mut().find(|l| l.product_id == product_id).ok_or(CartError::ProductNotInCart)?;
        line.quantity = quantity;
        line.updated_at = Utc::now();
        self.touch();
        Ok(())
    }

    /// Removes a line; an emptied cart also loses its discount.
    pub fn remove_item(&mut self, product_id: Uuid) -> Result<(), CartError> {
        let before = self.lines.len();
        self.lines.retain(|l| l.product_id != product_id);
        if self.lines.len() == before { return Err(CartError::ProductNotInCart); }
        if self.lines.is_empty() { self.applied_discount = None; }
        self.touch();
        Ok(())
    }

    /// Replaces any previously applied discount.
    pub fn set_discount(&mut self, discount: Option<AppliedDiscount>) {
        self.applied_discount = discount;
        self.touch();
    }

    /// Takes checked-out quantities out of the cart. Whatever was added after
    /// the order snapshot stays, and the discount goes only if nothing does.
    pub fn remove_ordered(&mut self, ordered: &[(Uuid, Quantity)]) {
        let now = Utc::now();
        for (product_id, quantity) in ordered {
            let Some(pos) = self.lines.iter().position(|l| l.product_id == *product_id) else { continue };
            match self.lines[pos].quantity.checked_sub(*quantity) {
                Some(rest) => {
                    self.lines[pos].quantity = rest;
                    self.lines[pos].updated_at = now;
                }
                None => { self.lines.remove(pos); }
            }
        }
        if self.lines.is_empty() { self.applied_discount = None; }
        self.touch();
    }

    fn touch(&mut self) { self.updated_at = Utc::now(); }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum CartError { ProductNotInCart, QuantityOverflow }
impl std::error::Error for CartError {}
impl std::fmt::Display for CartError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ProductNotInCart => write!(f, "Product is not in the cart"),
            Self::QuantityOverflow => write!(f, "Line quantity would exceed {}", Quantity::MAX),
        }
    }
}

impl From<CartError> for crate::EcommerceError {
    fn from(e: CartError) -> Self {
        match e {
            CartError::ProductNotInCart => crate::EcommerceError::ProductNotInCart,
            CartError::QuantityOverflow => crate::EcommerceError::InvalidQuantity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn qty(v: i64) -> Quantity { Quantity::new(v).unwrap() }
    fn ten_percent() -> AppliedDiscount {
        AppliedDiscount { code: DiscountCode::new("TEN").unwrap(), percentage: Percentage::new(Decimal::new(10, 0)).unwrap() }
    }

    #[test]
    fn test_add_merges_duplicate_products() {
        let mut cart = Cart::new(Uuid::now_v7());
        let p1 = Uuid::now_v7();
        cart.add_item(p1, qty(2)).unwrap();
        cart.add_item(p1, qty(1)).unwrap();
        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.lines()[0].quantity.value(), 3); // Merged
        cart.add_item(Uuid::now_v7(), qty(4)).unwrap();
        assert_eq!(cart.item_count(), 7);
    }

    #[test]
    fn test_update_quantity_sets_absolute_value() {
        let mut cart = Cart::new(Uuid::now_v7());
        let p1 = Uuid::now_v7();
        cart.add_item(p1, qty(5)).unwrap();
        cart.update_quantity(p1, qty(2)).unwrap();
        assert_eq!(cart.line(p1).map(|l| l.quantity.value()), Some(2));
    }

    #[test]
    fn test_update_missing_product_changes_nothing() {
        let mut cart = Cart::new(Uuid::now_v7());
        let p1 = Uuid::now_v7();
        cart.add_item(p1, qty(1)).unwrap();
        let before = cart.clone();
        assert_eq!(cart.update_quantity(Uuid::now_v7(), qty(9)), Err(CartError::ProductNotInCart));
        assert_eq!(cart, before);
    }

    #[test]
    fn test_removing_last_line_clears_discount() {
        let mut cart = Cart::new(Uuid::now_v7());
        let (p1, p2) = (Uuid::now_v7(), Uuid::now_v7());
        cart.add_item(p1, qty(1)).unwrap();
        cart.add_item(p2, qty(1)).unwrap();
        cart.set_discount(Some(ten_percent()));
        cart.remove_item(p1).unwrap();
        assert!(cart.applied_discount().is_some());
        cart.remove_item(p2).unwrap();
        assert!(cart.is_empty());
        assert!(cart.applied_discount().is_none());
        assert_eq!(cart.remove_item(p2), Err(CartError::ProductNotInCart));
    }

    #[test]
    fn test_overflowing_merge_changes_nothing() {
        let mut cart = Cart::new(Uuid::now_v7());
        let p1 = Uuid::now_v7();
        cart.add_item(p1, qty(i64::from(Quantity::MAX))).unwrap();
        let before = cart.clone();
        assert_eq!(cart.add_item(p1, qty(5)), Err(CartError::QuantityOverflow));
        assert_eq!(cart, before);
    }

    #[test]
    fn test_remove_ordered_drops_lines_and_discount() {
        let mut cart = Cart::new(Uuid::now_v7());
        let p1 = Uuid::now_v7();
        cart.add_item(p1, qty(2)).unwrap();
        cart.set_discount(Some(ten_percent()));
        cart.remove_ordered(&[(p1, qty(2))]);
        assert!(cart.is_empty());
        assert!(cart.applied_discount().is_none());
    }

    #[test]
    fn test_remove_ordered_keeps_later_additions() {
        let mut cart = Cart::new(Uuid::now_v7());
        let (mug, spoon) = (Uuid::now_v7(), Uuid::now_v7());
        cart.add_item(mug, qty(3)).unwrap();
        cart.add_item(spoon, qty(1)).unwrap();
        cart.set_discount(Some(ten_percent()));
        cart.remove_ordered(&[(mug, qty(2)), (Uuid::now_v7(), qty(1))]);
        assert_eq!(cart.line(mug).map(|l| l.quantity.value()), Some(1));
        assert_eq!(cart.line(spoon).map(|l| l.quantity.value()), Some(1));
        assert!(cart.applied_discount().is_some());
    }
}
