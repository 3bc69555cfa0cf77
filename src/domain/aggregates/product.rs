//! Product read model
//!
//! Products are owned by the catalog; the checkout pipeline only reads them
//! and bumps their sales counter after an order is placed.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Product {
    pub id: Uuid,
    pub title: String,
    pub price: Decimal,
    pub image_urls: Vec<String>,
    pub product_code: String,
    pub weight: String,
    pub size: String,
    pub category: String,
    pub color: String,
    pub tag: String,
    pub rating: Option<Decimal>,
    pub sales_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    pub fn new(title: impl Into<String>, price: Decimal) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(), title: title.into(), price, image_urls: vec![],
            product_code: String::new(), weight: String::new(), size: String::new(),
            category: String::new(), color: String::new(), tag: String::new(),
            rating: None, sales_count: 0, created_at: now, updated_at: now,
        }
    }

    pub fn primary_image(&self) -> Option<&str> { self.image_urls.first().map(String::as_str) }
}

#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn test_product_new() {
        let mut p = Product::new("Ceramic Mug", Decimal::new(1000, 0));
        assert_eq!(p.title, "Ceramic Mug");
        assert_eq!(p.sales_count, 0);
        assert!(p.primary_image().is_none());
        p.image_urls.push("/images/mug.jpg".into());
        assert_eq!(p.primary_image(), Some("/images/mug.jpg"));
    }
}
