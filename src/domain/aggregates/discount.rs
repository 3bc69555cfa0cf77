//! Discount Aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use crate::domain::aggregates::cart::AppliedDiscount;
use crate::domain::value_objects::{DiscountCode, Percentage};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Discount {
    pub id: Uuid,
    pub code: DiscountCode,
    pub percentage: Percentage,
    pub expires_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Partial update; `None` fields are left untouched.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DiscountPatch {
    pub code: Option<DiscountCode>,
    pub percentage: Option<Percentage>,
    pub is_active: Option<bool>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Discount {
    pub fn create(code: DiscountCode, percentage: Percentage, expires_at: Option<DateTime<Utc>>) -> Self {
        let now = Utc::now();
        Self { id: Uuid::now_v7(), code, percentage, expires_at, is_active: true, created_at: now, updated_at: now }
    }

    /// Active and not yet expired at `now`.
    pub fn is_usable_at(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.expires_at.map_or(true, |exp| exp > now)
    }

    pub fn applied(&self) -> AppliedDiscount {
        AppliedDiscount { code: self.code.clone(), percentage: self.percentage }
    }

    pub fn apply_patch(&mut self, patch: DiscountPatch) {
        if let Some(code) = patch.code { self.code = code; }
        if let Some(percentage) = patch.percentage { self.percentage = percentage; }
        if let Some(is_active) = patch.is_active { self.is_active = is_active; }
        if let Some(expires_at) = patch.expires_at { self.expires_at = Some(expires_at); }
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal::Decimal;

    fn discount(expires_at: Option<DateTime<Utc>>) -> Discount {
        Discount::create(DiscountCode::new("NOWRUZ").unwrap(), Percentage::new(Decimal::new(20, 0)).unwrap(), expires_at)
    }

    #[test]
    fn test_usable_without_expiry() {
        assert!(discount(None).is_usable_at(Utc::now()));
    }

    #[test]
    fn test_expired_is_unusable_even_when_active() {
        let now = Utc::now();
        let d = discount(Some(now - Duration::hours(1)));
        assert!(d.is_active);
        assert!(!d.is_usable_at(now));
        assert!(!discount(Some(now)).is_usable_at(now));
    }

    #[test]
    fn test_inactive_is_unusable() {
        let mut d = discount(None);
        d.apply_patch(DiscountPatch { is_active: Some(false), ..Default::default() });
        assert!(!d.is_usable_at(Utc::now()));
    }

    #[test]
    fn test_patch_keeps_unset_fields() {
        let mut d = discount(None);
        d.apply_patch(DiscountPatch { percentage: Some(Percentage::new(Decimal::new(5, 0)).unwrap()), ..Default::default() });
        assert_eq!(d.code.as_str(), "NOWRUZ");
        assert_eq!(d.percentage.value(), Decimal::new(5, 0));
        assert!(d.is_active);
    }
}
