//! Domain events
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    Order(OrderEvent),
    Cart(CartEvent),
}

impl DomainEvent {
    /// Subject suffix the event is published under.
    pub fn subject(&self) -> &'static str {
        match self {
            Self::Order(OrderEvent::Placed { .. }) => "order.placed",
            Self::Order(OrderEvent::PaymentRequested { .. }) => "order.payment_requested",
            Self::Order(OrderEvent::Paid { .. }) => "order.paid",
            Self::Cart(CartEvent::DiscountApplied { .. }) => "cart.discount_applied",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum OrderEvent {
    Placed { order_id: Uuid, user_id: Uuid, total: Decimal, discounted_total: Decimal },
    PaymentRequested { order_id: Uuid, authority: String, amount: Decimal },
    Paid { order_id: Uuid, user_id: Uuid, ref_id: String },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum CartEvent {
    DiscountApplied { user_id: Uuid, code: String },
}
