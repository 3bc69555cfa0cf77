//! Order placement: snapshots the cart into an immutable order.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use super::discount::DiscountService;
use crate::domain::aggregates::{Address, Order, OrderLine, OrderOwner, Product, User};
use crate::domain::value_objects::Quantity;
use crate::events::EventPublisher;
use crate::store::{CartStore, OrderStore, ProductStore};
use crate::{EcommerceError, Result};

#[derive(Clone, Debug, Default)]
pub struct PlaceOrder {
    pub shipping_address: Address,
    pub comment: Option<String>,
}

#[derive(Clone)]
pub struct OrderService {
    products: Arc<dyn ProductStore>,
    carts: Arc<dyn CartStore>,
    orders: Arc<dyn OrderStore>,
    discounts: DiscountService,
    events: Arc<dyn EventPublisher>,
}

impl OrderService {
    pub fn new(
        products: Arc<dyn ProductStore>,
        carts: Arc<dyn CartStore>,
        orders: Arc<dyn OrderStore>,
        discounts: DiscountService,
        events: Arc<dyn EventPublisher>,
    ) -> Self {
        Self { products, carts, orders, discounts, events }
    }

    /// Turns the user's cart into a pending order and takes the ordered
    /// quantities out of the cart.
    ///
    /// The order is persisted before the cart is touched. If the process
    /// dies in between, the cart survives and a retry places a second order.
    /// Items added while the order is being placed stay in the cart.
    pub async fn place_order(&self, user: &User, request: PlaceOrder) -> Result<Order> {
        let cart = self.carts.get(user.id).await?;
        if cart.is_empty() {
            return Err(EcommerceError::EmptyCart);
        }

        let ids: Vec<Uuid> = cart.lines().iter().map(|l| l.product_id).collect();
        let products: HashMap<Uuid, Product> =
            self.products.find_by_ids(&ids).await?.into_iter().map(|p| (p.id, p)).collect();
        let lines = cart
            .lines()
            .iter()
            .map(|l| {
                let product = products.get(&l.product_id).ok_or_else(|| {
                    warn!(user_id = %user.id, product_id = %l.product_id, "Cart references a missing product");
                    EcommerceError::ProductNotFound
                })?;
                Ok(OrderLine::snapshot(product, l.quantity))
            })
            .collect::<Result<Vec<_>>>()?;

        // The applied discount keeps the percentage it was applied with, but
        // the code itself must still be usable now.
        let applied = cart.applied_discount();
        if let Some(applied) = applied {
            if self.discounts.validate(applied.code.as_str()).await?.is_none() {
                return Err(EcommerceError::InvalidDiscount);
            }
        }

        let owner = OrderOwner { user_id: user.id, name: user.name.clone() };
        let mut order = Order::place(owner, lines, request.shipping_address, request.comment, applied)?;
        self.orders.insert(&order).await?;
        let ordered: Vec<(Uuid, Quantity)> = order.lines().iter().map(|l| (l.product_id, l.quantity)).collect();
        let remaining = self.carts.remove_ordered(user.id, &ordered).await?;
        if !remaining.is_empty() {
            info!(user_id = %user.id, lines = remaining.lines().len(), "Cart changed during checkout, kept the additions");
        }
        info!(
            order_id = %order.id(), user_id = %user.id, total = %order.total_price(),
            discounted = %order.discounted_price(), "Order placed"
        );

        for line in order.lines() {
            if let Err(e) = self.products.increment_sales_count(line.product_id, line.quantity.value()).await {
                warn!(product_id = %line.product_id, error = %e, "Failed to bump sales count");
            }
        }
        self.events.publish_all(order.take_events()).await;
        Ok(order)
    }

    pub async fn list(&self, user_id: Uuid) -> Result<Vec<Order>> {
        self.orders.list_for_user(user_id).await
    }

    pub async fn get(&self, user_id: Uuid, order_id: Uuid) -> Result<Order> {
        self.orders.find_owned(order_id, user_id).await?.ok_or(EcommerceError::OrderNotFound)
    }
}
