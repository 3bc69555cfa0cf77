//! Order Aggregate
//!
//! An order is a frozen copy of a cart at checkout time. Product attributes
//! are copied into [`OrderLine`]s so later catalog edits never reach it.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use crate::domain::aggregates::cart::AppliedDiscount;
use crate::domain::aggregates::product::Product;
use crate::domain::events::{DomainEvent, OrderEvent};
use crate::domain::value_objects::{DiscountCode, Percentage, Quantity};
use crate::pricing::{compute_totals, discount_amount, format_price, AmountOverflow, TotalsLine};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Order {
    id: Uuid,
    user: OrderOwner,
    lines: Vec<OrderLine>,
    shipping_address: Address,
    comment: Option<String>,
    total_price: Decimal,
    total_quantity: u32,
    formatted_price: String,
    discount: Option<OrderDiscount>,
    discounted_price: Decimal,
    formatted_discounted_price: String,
    payment_status: PaymentStatus,
    payment_authority: Option<String>,
    settlement: Option<Settlement>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(skip)]
    events: Vec<DomainEvent>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderOwner { pub user_id: Uuid, pub name: String }

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: Uuid,
    pub title: String,
    pub price: Decimal,
    pub image: Option<String>,
    pub product_code: String,
    pub weight: String,
    pub size: String,
    pub category: String,
    pub color: String,
    pub tag: String,
    pub rating: Option<Decimal>,
    pub quantity: Quantity,
}

impl OrderLine {
    pub fn snapshot(product: &Product, quantity: Quantity) -> Self {
        Self {
            product_id: product.id, title: product.title.clone(), price: product.price,
            image: product.primary_image().map(str::to_string), product_code: product.product_code.clone(),
            weight: product.weight.clone(), size: product.size.clone(), category: product.category.clone(),
            color: product.color.clone(), tag: product.tag.clone(), rating: product.rating, quantity,
        }
    }

    pub fn totals_line(&self) -> TotalsLine { TotalsLine::priced(self.price, self.quantity.value()) }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub recipient: String,
    pub street: String,
    pub city: String,
    pub province: Option<String>,
    pub postal_code: String,
    pub phone: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderDiscount { pub code: DiscountCode, pub percentage: Percentage, pub amount: Decimal }

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement { pub ref_id: String, pub card_pan: Option<String>, pub fee: Decimal }

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus { #[default] Pending, Paid }

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self { Self::Pending => "pending", Self::Paid => "paid" }
    }
}

impl Order {
    /// Builds a pending order from snapshotted lines.
    pub fn place(
        user: OrderOwner,
        lines: Vec<OrderLine>,
        shipping_address: Address,
        comment: Option<String>,
        applied_discount: Option<&AppliedDiscount>,
    ) -> Result<Self, OrderError> {
        if lines.is_empty() { return Err(OrderError::NoItems); }
        let totals = compute_totals(lines.iter().map(OrderLine::totals_line))?;
        let discount = match applied_discount {
            Some(d) => Some(OrderDiscount {
                code: d.code.clone(),
                percentage: d.percentage,
                amount: discount_amount(totals.total_price, d.percentage)?,
            }),
            None => None,
        };
        let discounted_price = totals.total_price - discount.as_ref().map_or(Decimal::ZERO, |d| d.amount);
        let now = Utc::now();
        let mut order = Self {
            id: Uuid::now_v7(), user, lines, shipping_address,
            comment: comment.map(|c| c.trim().to_string()).filter(|c| !c.is_empty()),
            total_price: totals.total_price, total_quantity: totals.total_quantity,
            formatted_price: totals.formatted_price, discount, discounted_price,
            formatted_discounted_price: format_price(discounted_price),
            payment_status: PaymentStatus::Pending, payment_authority: None, settlement: None,
            created_at: now, updated_at: now, events: vec![],
        };
        order.raise_event(DomainEvent::Order(OrderEvent::Placed {
            order_id: order.id, user_id: order.user.user_id, total: order.total_price, discounted_total: order.discounted_price,
        }));
        Ok(order)
    }

    pub fn id(&self) -> Uuid { self.id }
    pub fn user(&self) -> &OrderOwner { &self.user }
    pub fn is_owned_by(&self, user_id: Uuid) -> bool { self.user.user_id == user_id }
    pub fn lines(&self) -> &[OrderLine] { &self.lines }
    pub fn shipping_address(&self) -> &Address { &self.shipping_address }
    pub fn comment(&self) -> Option<&str> { self.comment.as_deref() }
    pub fn total_price(&self) -> Decimal { self.total_price }
    pub fn total_quantity(&self) -> u32 { self.total_quantity }
    pub fn formatted_price(&self) -> &str { &self.formatted_price }
    pub fn discount(&self) -> Option<&OrderDiscount> { self.discount.as_ref() }
    pub fn discounted_price(&self) -> Decimal { self.discounted_price }
    pub fn payment_status(&self) -> PaymentStatus { self.payment_status }
    pub fn is_paid(&self) -> bool { self.payment_status == PaymentStatus::Paid }
    pub fn payment_authority(&self) -> Option<&str> { self.payment_authority.as_deref() }
    pub fn settlement(&self) -> Option<&Settlement> { self.settlement.as_ref() }
    pub fn created_at(&self) -> DateTime<Utc> { self.created_at }

    /// Amount to charge: the discounted total, which equals the total when no discount applies.
    pub fn payable_amount(&self) -> Decimal { self.discounted_price }

    pub fn assign_authority(&mut self, authority: impl Into<String>) -> Result<(), OrderError> {
        if self.is_paid() { return Err(OrderError::AlreadyPaid); }
        let authority = authority.into();
        self.raise_event(DomainEvent::Order(OrderEvent::PaymentRequested {
            order_id: self.id, authority: authority.clone(), amount: self.payable_amount(),
        }));
        self.payment_authority = Some(authority);
        self.touch();
        Ok(())
    }

    /// `Pending -> Paid`. Paid is terminal.
    pub fn mark_paid(&mut self, settlement: Settlement) -> Result<(), OrderError> {
        if self.is_paid() { return Err(OrderError::AlreadyPaid); }
        self.raise_event(DomainEvent::Order(OrderEvent::Paid {
            order_id: self.id, user_id: self.user.user_id, ref_id: settlement.ref_id.clone(),
        }));
        self.payment_status = PaymentStatus::Paid;
        self.settlement = Some(settlement);
        self.touch();
        Ok(())
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }
    fn raise_event(&mut self, e: DomainEvent) { self.events.push(e); }
    fn touch(&mut self) { self.updated_at = Utc::now(); }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum OrderError { NoItems, AlreadyPaid, AmountOverflow }
impl std::error::Error for OrderError {}
impl std::fmt::Display for OrderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoItems => write!(f, "No items"),
            Self::AlreadyPaid => write!(f, "Already paid"),
            Self::AmountOverflow => write!(f, "Order total is too large"),
        }
    }
}

impl From<AmountOverflow> for OrderError {
    fn from(_: AmountOverflow) -> Self { OrderError::AmountOverflow }
}

impl From<OrderError> for crate::EcommerceError {
    fn from(e: OrderError) -> Self {
        match e {
            OrderError::NoItems => crate::EcommerceError::EmptyCart,
            OrderError::AlreadyPaid => crate::EcommerceError::OrderAlreadyPaid,
            OrderError::AmountOverflow => crate::EcommerceError::InvalidQuantity,
        }
    }
}
