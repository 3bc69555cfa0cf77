//! Application services wired over the stores.
pub mod cart;
pub mod checkout;
pub mod discount;
pub mod payment;

use std::sync::Arc;

use crate::events::EventPublisher;
use crate::payment::PaymentGateway;
use crate::store::Stores;

pub use cart::{CartService, CartView, DiscountQuote, ResolvedLine};
pub use checkout::{OrderService, PlaceOrder};
pub use discount::{DiscountService, NewDiscount};
pub use payment::{PaymentOutcome, PaymentRedirect, PaymentService, PaymentSettings};

#[derive(Clone)]
pub struct Services {
    pub carts: CartService,
    pub discounts: DiscountService,
    pub orders: OrderService,
    pub payments: PaymentService,
}

impl Services {
    pub fn new(
        stores: &Stores,
        gateway: Arc<dyn PaymentGateway>,
        events: Arc<dyn EventPublisher>,
        settings: PaymentSettings,
    ) -> Self {
        let discounts = DiscountService::new(stores.discounts.clone());
        Self {
            carts: CartService::new(stores.products.clone(), stores.carts.clone(), discounts.clone(), events.clone()),
            orders: OrderService::new(
                stores.products.clone(),
                stores.carts.clone(),
                stores.orders.clone(),
                discounts.clone(),
                events.clone(),
            ),
            payments: PaymentService::new(stores.orders.clone(), gateway, events, settings),
            discounts,
        }
    }
}
