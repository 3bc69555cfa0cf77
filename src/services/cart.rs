//! Cart operations and discount application.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use super::discount::DiscountService;
use crate::domain::aggregates::{AppliedDiscount, Cart, Product};
use crate::domain::events::{CartEvent, DomainEvent};
use crate::domain::value_objects::{Percentage, Quantity};
use crate::events::EventPublisher;
use crate::pricing::{compute_totals, discount_amount, format_price, Totals, TotalsLine};
use crate::store::{CartStore, ProductStore};
use crate::{EcommerceError, Result};

/// A cart line joined with the live product it points at.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ResolvedLine {
    pub product: Product,
    pub quantity: Quantity,
    pub added_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ResolvedLine {
    pub fn totals_line(&self) -> TotalsLine { TotalsLine::priced(self.product.price, self.quantity.value()) }
}

/// Cart contents with prices resolved at read time.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CartView {
    pub lines: Vec<ResolvedLine>,
    #[serde(flatten)]
    pub totals: Totals,
    pub applied_discount: Option<AppliedDiscount>,
    pub discount_amount: Option<Decimal>,
    pub formatted_discount_amount: Option<String>,
    pub discounted_price: Option<Decimal>,
    pub formatted_discounted_price: Option<String>,
}

impl CartView {
    fn build(cart: &Cart, lines: Vec<ResolvedLine>) -> Result<Self> {
        let totals = compute_totals(lines.iter().map(ResolvedLine::totals_line))?;
        let applied_discount = cart.applied_discount().cloned();
        let amount = applied_discount.as_ref().map(|d| discount_amount(totals.total_price, d.percentage)).transpose()?;
        let discounted = amount.map(|a| totals.total_price - a);
        Ok(Self {
            lines,
            applied_discount,
            formatted_discount_amount: amount.map(format_price),
            discount_amount: amount,
            formatted_discounted_price: discounted.map(format_price),
            discounted_price: discounted,
            totals,
        })
    }
}

/// Outcome of applying a discount code to a cart.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DiscountQuote {
    pub code: String,
    pub percentage: Percentage,
    #[serde(flatten)]
    pub totals: Totals,
    pub discount_amount: Decimal,
    pub formatted_discount_amount: String,
    pub discounted_total: Decimal,
    pub formatted_discounted_total: String,
}

#[derive(Clone)]
pub struct CartService {
    products: Arc<dyn ProductStore>,
    carts: Arc<dyn CartStore>,
    discounts: DiscountService,
    events: Arc<dyn EventPublisher>,
}

impl CartService {
    pub fn new(
        products: Arc<dyn ProductStore>,
        carts: Arc<dyn CartStore>,
        discounts: DiscountService,
        events: Arc<dyn EventPublisher>,
    ) -> Self {
        Self { products, carts, discounts, events }
    }

    pub async fn add_item(&self, user_id: Uuid, product_id: Uuid, quantity: i64) -> Result<CartView> {
        let quantity = Quantity::new(quantity)?;
        if self.products.find_by_id(product_id).await?.is_none() {
            return Err(EcommerceError::ProductNotFound);
        }
        let cart = self.carts.add_line(user_id, product_id, quantity).await?;
        info!(%user_id, %product_id, quantity = quantity.value(), "Added product to cart");
        self.view_of(cart).await
    }

    pub async fn update_quantity(&self, user_id: Uuid, product_id: Uuid, quantity: i64) -> Result<CartView> {
        let quantity = Quantity::new(quantity)?;
        let cart = self.carts.set_quantity(user_id, product_id, quantity).await?;
        info!(%user_id, %product_id, quantity = quantity.value(), "Updated cart quantity");
        self.view_of(cart).await
    }

    pub async fn remove_item(&self, user_id: Uuid, product_id: Uuid) -> Result<CartView> {
        let cart = self.carts.remove_line(user_id, product_id).await?;
        info!(%user_id, %product_id, emptied = cart.is_empty(), "Removed product from cart");
        self.view_of(cart).await
    }

    pub async fn view(&self, user_id: Uuid) -> Result<CartView> {
        let cart = self.carts.get(user_id).await?;
        self.view_of(cart).await
    }

    /// Sum of quantities across all lines.
    pub async fn count(&self, user_id: Uuid) -> Result<u32> {
        Ok(self.carts.get(user_id).await?.item_count())
    }

    /// Joins each line with its product. A line whose product no longer
    /// exists fails the whole read with `ProductNotFound`.
    pub async fn get_resolved(&self, user_id: Uuid) -> Result<(Cart, Vec<ResolvedLine>)> {
        let cart = self.carts.get(user_id).await?;
        let lines = self.resolve(&cart).await?;
        Ok((cart, lines))
    }

    /// Applies `code` to the cart, replacing any discount applied before.
    pub async fn apply_discount(&self, user_id: Uuid, code: &str) -> Result<DiscountQuote> {
        let discount = self.discounts.require_valid(code).await?;
        let (cart, lines) = self.get_resolved(user_id).await?;
        if cart.is_empty() {
            return Err(EcommerceError::EmptyCart);
        }
        let totals = compute_totals(lines.iter().map(ResolvedLine::totals_line))?;
        let amount = DiscountService::amount_for(totals.total_price, &discount)?;
        let discounted_total = totals.total_price - amount;
        self.carts.set_discount(user_id, Some(discount.applied())).await?;
        info!(%user_id, code = %discount.code, amount = %amount, "Applied discount to cart");
        self.events
            .publish(DomainEvent::Cart(CartEvent::DiscountApplied { user_id, code: discount.code.to_string() }))
            .await;
        Ok(DiscountQuote {
            code: discount.code.to_string(),
            percentage: discount.percentage,
            totals,
            discount_amount: amount,
            formatted_discount_amount: format_price(amount),
            discounted_total,
            formatted_discounted_total: format_price(discounted_total),
        })
    }

    pub async fn remove_discount(&self, user_id: Uuid) -> Result<CartView> {
        let cart = self.carts.set_discount(user_id, None).await?;
        info!(%user_id, "Removed discount from cart");
        self.view_of(cart).await
    }

    async fn view_of(&self, cart: Cart) -> Result<CartView> {
        let lines = self.resolve(&cart).await?;
        CartView::build(&cart, lines)
    }

    async fn resolve(&self, cart: &Cart) -> Result<Vec<ResolvedLine>> {
        let ids: Vec<Uuid> = cart.lines().iter().map(|l| l.product_id).collect();
        let mut products: HashMap<Uuid, Product> = self
            .products
            .find_by_ids(&ids)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();
        let lines = cart
            .lines()
            .iter()
            .map(|l| {
                let product = products.remove(&l.product_id).ok_or(EcommerceError::ProductNotFound)?;
                Ok(ResolvedLine { product, quantity: l.quantity, added_at: l.added_at, updated_at: l.updated_at })
            })
            .collect::<Result<Vec<_>>>()?;
        debug!(user_id = %cart.user_id(), lines = lines.len(), "Resolved cart lines");
        Ok(lines)
    }
}
