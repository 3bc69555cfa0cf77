//! Discount validation and administration.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::domain::aggregates::{Discount, DiscountPatch};
use crate::domain::value_objects::{DiscountCode, Percentage};
use crate::pricing::discount_amount;
use crate::store::DiscountStore;
use crate::{EcommerceError, Result};

#[derive(Clone, Debug)]
pub struct NewDiscount {
    pub code: DiscountCode,
    pub percentage: Percentage,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Clone)]
pub struct DiscountService {
    discounts: Arc<dyn DiscountStore>,
}

impl DiscountService {
    pub fn new(discounts: Arc<dyn DiscountStore>) -> Self { Self { discounts } }

    /// Looks the code up and checks it is active and unexpired right now.
    ///
    /// Unknown, inactive and expired codes all yield `None`. Nothing is
    /// cached: every call goes back to the store.
    pub async fn validate(&self, code: &str) -> Result<Option<Discount>> {
        self.validate_at(code, Utc::now()).await
    }

    pub async fn validate_at(&self, code: &str, now: DateTime<Utc>) -> Result<Option<Discount>> {
        let Ok(code) = DiscountCode::new(code) else { return Ok(None) };
        let found = self.discounts.find_by_code(&code).await?;
        let usable = found.filter(|d| d.is_usable_at(now));
        debug!(code = %code, valid = usable.is_some(), "Validated discount code");
        Ok(usable)
    }

    pub fn amount_for(subtotal: Decimal, discount: &Discount) -> Result<Decimal> {
        Ok(discount_amount(subtotal, discount.percentage)?)
    }

    /// Like [`validate`](Self::validate) but treats an unusable code as an error.
    pub async fn require_valid(&self, code: &str) -> Result<Discount> {
        self.validate(code).await?.ok_or(EcommerceError::InvalidDiscount)
    }

    pub async fn create(&self, new: NewDiscount) -> Result<Discount> {
        let discount = Discount::create(new.code, new.percentage, new.expires_at);
        self.discounts.create(&discount).await?;
        info!(discount_id = %discount.id, code = %discount.code, percentage = %discount.percentage, "Discount created");
        Ok(discount)
    }

    pub async fn list(&self) -> Result<Vec<Discount>> { self.discounts.list().await }

    pub async fn get(&self, id: Uuid) -> Result<Discount> {
        self.discounts.find_by_id(id).await?.ok_or(EcommerceError::DiscountNotFound)
    }

    pub async fn update(&self, id: Uuid, patch: DiscountPatch) -> Result<Discount> {
        let mut discount = self.get(id).await?;
        discount.apply_patch(patch);
        self.discounts.update(&discount).await?;
        info!(discount_id = %id, "Discount updated");
        Ok(discount)
    }

    pub async fn delete(&self, id: Uuid) -> Result<Discount> {
        let deleted = self.discounts.delete(id).await?.ok_or(EcommerceError::DiscountNotFound)?;
        info!(discount_id = %id, code = %deleted.code, "Discount deleted");
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use chrono::Duration;

    fn service() -> DiscountService { DiscountService::new(Arc::new(MemoryStore::new())) }
    fn new(code: &str, pct: i64, expires_at: Option<DateTime<Utc>>) -> NewDiscount {
        NewDiscount { code: DiscountCode::new(code).unwrap(), percentage: Percentage::new(Decimal::new(pct, 0)).unwrap(), expires_at }
    }

    #[tokio::test]
    async fn test_validate_active_code() {
        let svc = service();
        svc.create(new("YALDA", 10, Some(Utc::now() + Duration::days(1)))).await.unwrap();
        let d = svc.validate("YALDA").await.unwrap().unwrap();
        assert_eq!(DiscountService::amount_for(Decimal::new(10000, 0), &d).unwrap(), Decimal::new(1000, 0));
    }

    #[tokio::test]
    async fn test_unknown_blank_and_expired_are_invalid() {
        let svc = service();
        svc.create(new("OLD", 30, Some(Utc::now() - Duration::minutes(1)))).await.unwrap();
        assert!(svc.validate("OLD").await.unwrap().is_none());
        assert!(svc.validate("NOPE").await.unwrap().is_none());
        assert!(svc.validate("  ").await.unwrap().is_none());
        assert!(matches!(svc.require_valid("OLD").await, Err(EcommerceError::InvalidDiscount)));
    }

    #[tokio::test]
    async fn test_validity_is_rechecked_after_edit() {
        let svc = service();
        let d = svc.create(new("FLASH", 50, None)).await.unwrap();
        assert!(svc.validate("FLASH").await.unwrap().is_some());
        svc.update(d.id, DiscountPatch { is_active: Some(false), ..Default::default() }).await.unwrap();
        assert!(svc.validate("FLASH").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_missing_discount() {
        let svc = service();
        assert!(matches!(svc.delete(Uuid::now_v7()).await, Err(EcommerceError::DiscountNotFound)));
    }
}
