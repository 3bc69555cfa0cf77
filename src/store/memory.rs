//! In-memory store used by tests and when no database is configured.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{CartStore, DiscountStore, OrderStore, ProductStore, UserStore};
use crate::domain::aggregates::{AppliedDiscount, Cart, Discount, Order, Product, Settlement, User};
use crate::domain::value_objects::{DiscountCode, Quantity};
use crate::{EcommerceError, Result};

#[derive(Debug, Default)]
struct State {
    products: HashMap<Uuid, Product>,
    users: HashMap<Uuid, User>,
    carts: HashMap<Uuid, Cart>,
    discounts: HashMap<Uuid, Discount>,
    orders: Vec<Order>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self { Self::default() }

    pub async fn put_product(&self, product: Product) {
        self.state.lock().await.products.insert(product.id, product);
    }

    pub async fn remove_product(&self, id: Uuid) -> Option<Product> {
        self.state.lock().await.products.remove(&id)
    }

    pub async fn put_user(&self, user: User) {
        self.state.lock().await.users.insert(user.id, user);
    }

    pub async fn order_count(&self) -> usize {
        self.state.lock().await.orders.len()
    }
}

fn code_taken(state: &State, code: &DiscountCode, except: Option<Uuid>) -> bool {
    state.discounts.values().any(|d| &d.code == code && Some(d.id) != except)
}

#[async_trait]
impl ProductStore for MemoryStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Product>> {
        Ok(self.state.lock().await.products.get(&id).cloned())
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Product>> {
        let state = self.state.lock().await;
        Ok(ids.iter().filter_map(|id| state.products.get(id).cloned()).collect())
    }

    async fn increment_sales_count(&self, id: Uuid, by: u32) -> Result<()> {
        let mut state = self.state.lock().await;
        let product = state.products.get_mut(&id).ok_or(EcommerceError::ProductNotFound)?;
        product.sales_count += i64::from(by);
        Ok(())
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.state.lock().await.users.get(&id).cloned())
    }
}

#[async_trait]
impl CartStore for MemoryStore {
    async fn get(&self, user_id: Uuid) -> Result<Cart> {
        let state = self.state.lock().await;
        Ok(state.carts.get(&user_id).cloned().unwrap_or_else(|| Cart::new(user_id)))
    }

    async fn add_line(&self, user_id: Uuid, product_id: Uuid, quantity: Quantity) -> Result<Cart> {
        let mut state = self.state.lock().await;
        let cart = state.carts.entry(user_id).or_insert_with(|| Cart::new(user_id));
        cart.add_item(product_id, quantity)?;
        Ok(cart.clone())
    }

    async fn set_quantity(&self, user_id: Uuid, product_id: Uuid, quantity: Quantity) -> Result<Cart> {
        let mut state = self.state.lock().await;
        let cart = state.carts.get_mut(&user_id).ok_or(EcommerceError::ProductNotInCart)?;
        cart.update_quantity(product_id, quantity)?;
        Ok(cart.clone())
    }

    async fn remove_line(&self, user_id: Uuid, product_id: Uuid) -> Result<Cart> {
        let mut state = self.state.lock().await;
        let cart = state.carts.get_mut(&user_id).ok_or(EcommerceError::ProductNotInCart)?;
        cart.remove_item(product_id)?;
        Ok(cart.clone())
    }

    async fn set_discount(&self, user_id: Uuid, discount: Option<AppliedDiscount>) -> Result<Cart> {
        let mut state = self.state.lock().await;
        let cart = state.carts.entry(user_id).or_insert_with(|| Cart::new(user_id));
        cart.set_discount(discount);
        Ok(cart.clone())
    }

    async fn remove_ordered(&self, user_id: Uuid, ordered: &[(Uuid, Quantity)]) -> Result<Cart> {
        let mut state = self.state.lock().await;
        let cart = state.carts.entry(user_id).or_insert_with(|| Cart::new(user_id));
        cart.remove_ordered(ordered);
        Ok(cart.clone())
    }
}

#[async_trait]
impl DiscountStore for MemoryStore {
    async fn create(&self, discount: &Discount) -> Result<()> {
        let mut state = self.state.lock().await;
        if code_taken(&state, &discount.code, None) {
            return Err(EcommerceError::DuplicateDiscountCode);
        }
        state.discounts.insert(discount.id, discount.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Discount>> {
        Ok(self.state.lock().await.discounts.get(&id).cloned())
    }

    async fn find_by_code(&self, code: &DiscountCode) -> Result<Option<Discount>> {
        let state = self.state.lock().await;
        Ok(state.discounts.values().find(|d| &d.code == code).cloned())
    }

    async fn list(&self) -> Result<Vec<Discount>> {
        let state = self.state.lock().await;
        let mut discounts: Vec<Discount> = state.discounts.values().cloned().collect();
        discounts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(discounts)
    }

    async fn update(&self, discount: &Discount) -> Result<()> {
        let mut state = self.state.lock().await;
        if !state.discounts.contains_key(&discount.id) {
            return Err(EcommerceError::DiscountNotFound);
        }
        if code_taken(&state, &discount.code, Some(discount.id)) {
            return Err(EcommerceError::DuplicateDiscountCode);
        }
        state.discounts.insert(discount.id, discount.clone());
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<Option<Discount>> {
        Ok(self.state.lock().await.discounts.remove(&id))
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn insert(&self, order: &Order) -> Result<()> {
        let mut stored = order.clone();
        stored.take_events();
        self.state.lock().await.orders.push(stored);
        Ok(())
    }

    async fn find_owned(&self, id: Uuid, user_id: Uuid) -> Result<Option<Order>> {
        let state = self.state.lock().await;
        Ok(state.orders.iter().find(|o| o.id() == id && o.is_owned_by(user_id)).cloned())
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Order>> {
        let state = self.state.lock().await;
        let mut orders: Vec<Order> = state.orders.iter().filter(|o| o.is_owned_by(user_id)).cloned().collect();
        orders.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
        Ok(orders)
    }

    async fn find_by_authority(&self, authority: &str, user_id: Uuid) -> Result<Option<Order>> {
        let state = self.state.lock().await;
        Ok(state
            .orders
            .iter()
            .find(|o| o.payment_authority() == Some(authority) && o.is_owned_by(user_id))
            .cloned())
    }

    async fn set_authority(&self, id: Uuid, authority: &str) -> Result<Option<Order>> {
        let mut state = self.state.lock().await;
        let Some(order) = state.orders.iter_mut().find(|o| o.id() == id) else { return Ok(None) };
        if order.assign_authority(authority).is_err() {
            return Ok(None);
        }
        let updated = order.clone();
        order.take_events();
        Ok(Some(updated))
    }

    async fn mark_paid_if_pending(&self, id: Uuid, settlement: &Settlement) -> Result<Option<Order>> {
        let mut state = self.state.lock().await;
        let Some(order) = state.orders.iter_mut().find(|o| o.id() == id) else { return Ok(None) };
        if order.mark_paid(settlement.clone()).is_err() {
            return Ok(None);
        }
        let updated = order.clone();
        order.take_events();
        Ok(Some(updated))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_missing_cart_reads_empty() {
        let store = MemoryStore::new();
        let cart = CartStore::get(&store, Uuid::now_v7()).await.unwrap();
        assert!(cart.is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_adds_are_not_lost() {
        let store = Arc::new(MemoryStore::new());
        let (user, product) = (Uuid::now_v7(), Uuid::now_v7());
        let mut tasks = tokio::task::JoinSet::new();
        for _ in 0..50 {
            let store = store.clone();
            tasks.spawn(async move { store.add_line(user, product, Quantity::new(1).unwrap()).await });
        }
        while let Some(res) = tasks.join_next().await {
            res.unwrap().unwrap();
        }
        let cart = CartStore::get(store.as_ref(), user).await.unwrap();
        assert_eq!(cart.line(product).map(|l| l.quantity.value()), Some(50));
    }

    #[tokio::test]
    async fn test_overflowing_add_is_rejected_not_clamped() {
        let store = MemoryStore::new();
        let (user, product) = (Uuid::now_v7(), Uuid::now_v7());
        let max = Quantity::new(i64::from(Quantity::MAX)).unwrap();
        store.add_line(user, product, max).await.unwrap();

        let err = store.add_line(user, product, Quantity::new(5).unwrap()).await.unwrap_err();
        assert!(matches!(err, EcommerceError::InvalidQuantity));
        let cart = CartStore::get(&store, user).await.unwrap();
        assert_eq!(cart.line(product).map(|l| l.quantity.value()), Some(Quantity::MAX));
    }

    #[tokio::test]
    async fn test_duplicate_discount_code_rejected() {
        let store = MemoryStore::new();
        let code = DiscountCode::new("DUP").unwrap();
        let pct = crate::domain::value_objects::Percentage::new(Decimal::new(5, 0)).unwrap();
        store.create(&Discount::create(code.clone(), pct, None)).await.unwrap();
        let err = store.create(&Discount::create(code, pct, None)).await.unwrap_err();
        assert!(matches!(err, EcommerceError::DuplicateDiscountCode));
    }
}
