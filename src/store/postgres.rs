//! Postgres-backed stores.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::types::Json;
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use super::{CartStore, DiscountStore, OrderStore, ProductStore, UserStore};
use crate::domain::aggregates::{AppliedDiscount, Cart, CartLine, Discount, Order, Product, Settlement, User};
use crate::domain::value_objects::{DiscountCode, Percentage, Quantity};
use crate::{EcommerceError, Result};

#[derive(Clone, Debug)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self { Self { pool } }

    /// Connects and applies the embedded migrations.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new().max_connections(max_connections).connect(url).await?;
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| EcommerceError::StorageError(e.to_string()))?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool { &self.pool }
}

fn corrupt(what: &str, e: impl std::fmt::Display) -> EcommerceError {
    EcommerceError::StorageError(format!("corrupt {what}: {e}"))
}

fn unique_violation(e: sqlx::Error) -> EcommerceError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => EcommerceError::DuplicateDiscountCode,
        _ => e.into(),
    }
}

#[derive(sqlx::FromRow)]
struct CartRow { discount_code: Option<String>, discount_percentage: Option<Decimal>, updated_at: DateTime<Utc> }

#[derive(sqlx::FromRow)]
struct CartLineRow { product_id: Uuid, quantity: i32, added_at: DateTime<Utc>, updated_at: DateTime<Utc> }

#[derive(sqlx::FromRow)]
struct DiscountRow {
    id: Uuid, code: String, percentage: Decimal, expires_at: Option<DateTime<Utc>>,
    is_active: bool, created_at: DateTime<Utc>, updated_at: DateTime<Utc>,
}

impl TryFrom<DiscountRow> for Discount {
    type Error = EcommerceError;
    fn try_from(r: DiscountRow) -> Result<Self> {
        Ok(Discount {
            id: r.id,
            code: DiscountCode::new(r.code).map_err(|e| corrupt("discount code", e))?,
            percentage: Percentage::new(r.percentage).map_err(|e| corrupt("discount percentage", e))?,
            expires_at: r.expires_at, is_active: r.is_active, created_at: r.created_at, updated_at: r.updated_at,
        })
    }
}

async fn load_cart(tx: &mut Transaction<'_, Postgres>, user_id: Uuid) -> Result<Cart> {
    let row = sqlx::query_as::<_, CartRow>("SELECT discount_code, discount_percentage, updated_at FROM carts WHERE user_id = $1")
        .bind(user_id).fetch_optional(&mut **tx).await?;
    let lines = sqlx::query_as::<_, CartLineRow>("SELECT product_id, quantity, added_at, updated_at FROM cart_lines WHERE user_id = $1 ORDER BY added_at")
        .bind(user_id).fetch_all(&mut **tx).await?
        .into_iter()
        .map(|l| Ok(CartLine {
            product_id: l.product_id,
            quantity: Quantity::new(i64::from(l.quantity)).map_err(|e| corrupt("cart quantity", e))?,
            added_at: l.added_at, updated_at: l.updated_at,
        }))
        .collect::<Result<Vec<_>>>()?;
    let Some(row) = row else { return Ok(Cart::restore(user_id, lines, None, Utc::now())) };
    let discount = match (row.discount_code, row.discount_percentage) {
        (Some(code), Some(pct)) => Some(AppliedDiscount {
            code: DiscountCode::new(code).map_err(|e| corrupt("applied discount", e))?,
            percentage: Percentage::new(pct).map_err(|e| corrupt("applied discount", e))?,
        }),
        _ => None,
    };
    Ok(Cart::restore(user_id, lines, discount, row.updated_at))
}

async fn touch_cart(tx: &mut Transaction<'_, Postgres>, user_id: Uuid) -> Result<()> {
    sqlx::query("INSERT INTO carts (user_id, updated_at) VALUES ($1, NOW()) ON CONFLICT (user_id) DO UPDATE SET updated_at = NOW()")
        .bind(user_id).execute(&mut **tx).await?;
    Ok(())
}

#[async_trait]
impl ProductStore for PgStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Product>> {
        Ok(sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = $1").bind(id).fetch_optional(&self.pool).await?)
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Product>> {
        Ok(sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = ANY($1)").bind(ids).fetch_all(&self.pool).await?)
    }

    async fn increment_sales_count(&self, id: Uuid, by: u32) -> Result<()> {
        let res = sqlx::query("UPDATE products SET sales_count = sales_count + $2 WHERE id = $1")
            .bind(id).bind(i64::from(by)).execute(&self.pool).await?;
        if res.rows_affected() == 0 { return Err(EcommerceError::ProductNotFound); }
        Ok(())
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        Ok(sqlx::query_as::<_, User>("SELECT id, name, email, phone, is_admin FROM users WHERE id = $1").bind(id).fetch_optional(&self.pool).await?)
    }
}

#[async_trait]
impl CartStore for PgStore {
    async fn get(&self, user_id: Uuid) -> Result<Cart> {
        let mut tx = self.pool.begin().await?;
        let cart = load_cart(&mut tx, user_id).await?;
        tx.commit().await?;
        Ok(cart)
    }

    async fn add_line(&self, user_id: Uuid, product_id: Uuid, quantity: Quantity) -> Result<Cart> {
        let qty = i32::try_from(quantity.value()).map_err(|_| EcommerceError::InvalidQuantity)?;
        let mut tx = self.pool.begin().await?;
        touch_cart(&mut tx, user_id).await?;
        // The guard widens to BIGINT so an overflowing merge skips the row instead of erroring.
        let res = sqlx::query("INSERT INTO cart_lines (user_id, product_id, quantity, added_at, updated_at) VALUES ($1, $2, $3, NOW(), NOW()) ON CONFLICT (user_id, product_id) DO UPDATE SET quantity = cart_lines.quantity + EXCLUDED.quantity, updated_at = NOW() WHERE cart_lines.quantity::BIGINT + EXCLUDED.quantity <= $4")
            .bind(user_id).bind(product_id).bind(qty).bind(i64::from(Quantity::MAX)).execute(&mut *tx).await?;
        if res.rows_affected() == 0 { return Err(EcommerceError::InvalidQuantity); }
        let cart = load_cart(&mut tx, user_id).await?;
        tx.commit().await?;
        Ok(cart)
    }

    async fn set_quantity(&self, user_id: Uuid, product_id: Uuid, quantity: Quantity) -> Result<Cart> {
        let qty = i32::try_from(quantity.value()).map_err(|_| EcommerceError::InvalidQuantity)?;
        let mut tx = self.pool.begin().await?;
        let res = sqlx::query("UPDATE cart_lines SET quantity = $3, updated_at = NOW() WHERE user_id = $1 AND product_id = $2")
            .bind(user_id).bind(product_id).bind(qty).execute(&mut *tx).await?;
        if res.rows_affected() == 0 { return Err(EcommerceError::ProductNotInCart); }
        touch_cart(&mut tx, user_id).await?;
        let cart = load_cart(&mut tx, user_id).await?;
        tx.commit().await?;
        Ok(cart)
    }

    async fn remove_line(&self, user_id: Uuid, product_id: Uuid) -> Result<Cart> {
        let mut tx = self.pool.begin().await?;
        let res = sqlx::query("DELETE FROM cart_lines WHERE user_id = $1 AND product_id = $2")
            .bind(user_id).bind(product_id).execute(&mut *tx).await?;
        if res.rows_affected() == 0 { return Err(EcommerceError::ProductNotInCart); }
        sqlx::query("UPDATE carts SET discount_code = NULL, discount_percentage = NULL, updated_at = NOW() WHERE user_id = $1 AND NOT EXISTS (SELECT 1 FROM cart_lines WHERE user_id = $1)")
            .bind(user_id).execute(&mut *tx).await?;
        let cart = load_cart(&mut tx, user_id).await?;
        tx.commit().await?;
        Ok(cart)
    }

    async fn set_discount(&self, user_id: Uuid, discount: Option<AppliedDiscount>) -> Result<Cart> {
        let (code, pct) = match &discount {
            Some(d) => (Some(d.code.as_str().to_string()), Some(d.percentage.value())),
            None => (None, None),
        };
        let mut tx = self.pool.begin().await?;
        sqlx::query("INSERT INTO carts (user_id, discount_code, discount_percentage, updated_at) VALUES ($1, $2, $3, NOW()) ON CONFLICT (user_id) DO UPDATE SET discount_code = EXCLUDED.discount_code, discount_percentage = EXCLUDED.discount_percentage, updated_at = NOW()")
            .bind(user_id).bind(code).bind(pct).execute(&mut *tx).await?;
        let cart = load_cart(&mut tx, user_id).await?;
        tx.commit().await?;
        Ok(cart)
    }

    async fn remove_ordered(&self, user_id: Uuid, ordered: &[(Uuid, Quantity)]) -> Result<Cart> {
        let mut tx = self.pool.begin().await?;
        for (product_id, quantity) in ordered {
            let qty = i32::try_from(quantity.value()).map_err(|_| EcommerceError::InvalidQuantity)?;
            let current: Option<i32> = sqlx::query_scalar("SELECT quantity FROM cart_lines WHERE user_id = $1 AND product_id = $2 FOR UPDATE")
                .bind(user_id).bind(product_id).fetch_optional(&mut *tx).await?;
            match current {
                Some(current) if current > qty => {
                    sqlx::query("UPDATE cart_lines SET quantity = quantity - $3, updated_at = NOW() WHERE user_id = $1 AND product_id = $2")
                        .bind(user_id).bind(product_id).bind(qty).execute(&mut *tx).await?;
                }
                Some(_) => {
                    sqlx::query("DELETE FROM cart_lines WHERE user_id = $1 AND product_id = $2")
                        .bind(user_id).bind(product_id).execute(&mut *tx).await?;
                }
                None => {}
            }
        }
        sqlx::query("UPDATE carts SET discount_code = NULL, discount_percentage = NULL, updated_at = NOW() WHERE user_id = $1 AND NOT EXISTS (SELECT 1 FROM cart_lines WHERE user_id = $1)")
            .bind(user_id).execute(&mut *tx).await?;
        let cart = load_cart(&mut tx, user_id).await?;
        tx.commit().await?;
        Ok(cart)
    }
}

#[async_trait]
impl DiscountStore for PgStore {
    async fn create(&self, d: &Discount) -> Result<()> {
        sqlx::query("INSERT INTO discounts (id, code, percentage, expires_at, is_active, created_at, updated_at) VALUES ($1, $2, $3, $4, $5, $6, $7)")
            .bind(d.id).bind(d.code.as_str()).bind(d.percentage.value()).bind(d.expires_at).bind(d.is_active).bind(d.created_at).bind(d.updated_at)
            .execute(&self.pool).await.map_err(unique_violation)?;
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Discount>> {
        sqlx::query_as::<_, DiscountRow>("SELECT * FROM discounts WHERE id = $1").bind(id)
            .fetch_optional(&self.pool).await?.map(Discount::try_from).transpose()
    }

    async fn find_by_code(&self, code: &DiscountCode) -> Result<Option<Discount>> {
        sqlx::query_as::<_, DiscountRow>("SELECT * FROM discounts WHERE code = $1").bind(code.as_str())
            .fetch_optional(&self.pool).await?.map(Discount::try_from).transpose()
    }

    async fn list(&self) -> Result<Vec<Discount>> {
        sqlx::query_as::<_, DiscountRow>("SELECT * FROM discounts ORDER BY created_at DESC")
            .fetch_all(&self.pool).await?.into_iter().map(Discount::try_from).collect()
    }

    async fn update(&self, d: &Discount) -> Result<()> {
        let res = sqlx::query("UPDATE discounts SET code = $2, percentage = $3, expires_at = $4, is_active = $5, updated_at = $6 WHERE id = $1")
            .bind(d.id).bind(d.code.as_str()).bind(d.percentage.value()).bind(d.expires_at).bind(d.is_active).bind(d.updated_at)
            .execute(&self.pool).await.map_err(unique_violation)?;
        if res.rows_affected() == 0 { return Err(EcommerceError::DiscountNotFound); }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<Option<Discount>> {
        sqlx::query_as::<_, DiscountRow>("DELETE FROM discounts WHERE id = $1 RETURNING *").bind(id)
            .fetch_optional(&self.pool).await?.map(Discount::try_from).transpose()
    }
}

#[async_trait]
impl OrderStore for PgStore {
    async fn insert(&self, order: &Order) -> Result<()> {
        sqlx::query("INSERT INTO orders (id, user_id, status, payment_authority, doc, created_at) VALUES ($1, $2, $3, $4, $5, $6)")
            .bind(order.id()).bind(order.user().user_id).bind(order.payment_status().as_str())
            .bind(order.payment_authority()).bind(Json(order)).bind(order.created_at())
            .execute(&self.pool).await?;
        Ok(())
    }

    async fn find_owned(&self, id: Uuid, user_id: Uuid) -> Result<Option<Order>> {
        let doc = sqlx::query_scalar::<_, Json<Order>>("SELECT doc FROM orders WHERE id = $1 AND user_id = $2")
            .bind(id).bind(user_id).fetch_optional(&self.pool).await?;
        Ok(doc.map(|Json(o)| o))
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Order>> {
        let docs = sqlx::query_scalar::<_, Json<Order>>("SELECT doc FROM orders WHERE user_id = $1 ORDER BY created_at DESC")
            .bind(user_id).fetch_all(&self.pool).await?;
        Ok(docs.into_iter().map(|Json(o)| o).collect())
    }

    async fn find_by_authority(&self, authority: &str, user_id: Uuid) -> Result<Option<Order>> {
        let doc = sqlx::query_scalar::<_, Json<Order>>("SELECT doc FROM orders WHERE payment_authority = $1 AND user_id = $2")
            .bind(authority).bind(user_id).fetch_optional(&self.pool).await?;
        Ok(doc.map(|Json(o)| o))
    }

    async fn set_authority(&self, id: Uuid, authority: &str) -> Result<Option<Order>> {
        let mut tx = self.pool.begin().await?;
        let doc = sqlx::query_scalar::<_, Json<Order>>("SELECT doc FROM orders WHERE id = $1 AND status = 'pending' FOR UPDATE")
            .bind(id).fetch_optional(&mut *tx).await?;
        let Some(Json(mut order)) = doc else { return Ok(None) };
        if order.assign_authority(authority).is_err() { return Ok(None); }
        sqlx::query("UPDATE orders SET payment_authority = $2, doc = $3 WHERE id = $1 AND status = 'pending'")
            .bind(id).bind(authority).bind(Json(&order)).execute(&mut *tx).await?;
        tx.commit().await?;
        Ok(Some(order))
    }

    async fn mark_paid_if_pending(&self, id: Uuid, settlement: &Settlement) -> Result<Option<Order>> {
        let mut tx = self.pool.begin().await?;
        let doc = sqlx::query_scalar::<_, Json<Order>>("SELECT doc FROM orders WHERE id = $1 AND status = 'pending' FOR UPDATE")
            .bind(id).fetch_optional(&mut *tx).await?;
        let Some(Json(mut order)) = doc else { return Ok(None) };
        if order.mark_paid(settlement.clone()).is_err() { return Ok(None); }
        let res = sqlx::query("UPDATE orders SET status = 'paid', doc = $2 WHERE id = $1 AND status = 'pending'")
            .bind(id).bind(Json(&order)).execute(&mut *tx).await?;
        if res.rows_affected() == 0 { return Ok(None); }
        tx.commit().await?;
        Ok(Some(order))
    }
}
