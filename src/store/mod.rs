//! Persistence seams.
//!
//! Every mutation that must not lose concurrent updates is expressed as a
//! single store call so each backend can make it atomic: cart increments,
//! line removal together with discount clearing, removal of checked-out
//! quantities, and the conditional `Pending -> Paid` transition.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::aggregates::{AppliedDiscount, Cart, Discount, Order, Product, Settlement, User};
use crate::domain::value_objects::{DiscountCode, Quantity};
use crate::Result;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait ProductStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Product>>;
    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Product>>;
    async fn increment_sales_count(&self, id: Uuid, by: u32) -> Result<()>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>>;
}

#[async_trait]
pub trait CartStore: Send + Sync {
    /// The user's cart; a user without persisted cart state has an empty one.
    async fn get(&self, user_id: Uuid) -> Result<Cart>;
    /// Adds `quantity` to the product's line, creating it when absent.
    async fn add_line(&self, user_id: Uuid, product_id: Uuid, quantity: Quantity) -> Result<Cart>;
    /// Fails with `ProductNotInCart` and changes nothing when the line is absent.
    async fn set_quantity(&self, user_id: Uuid, product_id: Uuid, quantity: Quantity) -> Result<Cart>;
    /// Fails with `ProductNotInCart` when absent; clears the discount if the cart empties.
    async fn remove_line(&self, user_id: Uuid, product_id: Uuid) -> Result<Cart>;
    async fn set_discount(&self, user_id: Uuid, discount: Option<AppliedDiscount>) -> Result<Cart>;
    /// Subtracts checked-out quantities, deleting lines that reach zero.
    /// Lines or increments added since the snapshot survive; the discount is
    /// cleared only when no line is left.
    async fn remove_ordered(&self, user_id: Uuid, ordered: &[(Uuid, Quantity)]) -> Result<Cart>;
}

#[async_trait]
pub trait DiscountStore: Send + Sync {
    /// Fails with `DuplicateDiscountCode` when the code is taken.
    async fn create(&self, discount: &Discount) -> Result<()>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Discount>>;
    async fn find_by_code(&self, code: &DiscountCode) -> Result<Option<Discount>>;
    async fn list(&self) -> Result<Vec<Discount>>;
    /// Fails with `DiscountNotFound` or `DuplicateDiscountCode`.
    async fn update(&self, discount: &Discount) -> Result<()>;
    async fn delete(&self, id: Uuid) -> Result<Option<Discount>>;
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn insert(&self, order: &Order) -> Result<()>;
    async fn find_owned(&self, id: Uuid, user_id: Uuid) -> Result<Option<Order>>;
    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Order>>;
    async fn find_by_authority(&self, authority: &str, user_id: Uuid) -> Result<Option<Order>>;
    /// Stores the gateway authority on a pending order. `None` if the order is missing or paid.
    async fn set_authority(&self, id: Uuid, authority: &str) -> Result<Option<Order>>;
    /// Transitions to `Paid` only if the order is still pending. `None` when it was not.
    async fn mark_paid_if_pending(&self, id: Uuid, settlement: &Settlement) -> Result<Option<Order>>;
}

/// All stores the pipeline needs, shared across request handlers.
#[derive(Clone)]
pub struct Stores {
    pub products: Arc<dyn ProductStore>,
    pub users: Arc<dyn UserStore>,
    pub carts: Arc<dyn CartStore>,
    pub discounts: Arc<dyn DiscountStore>,
    pub orders: Arc<dyn OrderStore>,
}

impl Stores {
    pub fn in_memory(store: Arc<MemoryStore>) -> Self {
        Self {
            products: store.clone(),
            users: store.clone(),
            carts: store.clone(),
            discounts: store.clone(),
            orders: store,
        }
    }

    pub fn postgres(store: Arc<PgStore>) -> Self {
        Self {
            products: store.clone(),
            users: store.clone(),
            carts: store.clone(),
            discounts: store.clone(),
            orders: store,
        }
    }
}
