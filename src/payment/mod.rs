//! Payment gateway seam.
//!
//! Status codes follow the gateway convention: `100` is success, `101` means
//! the payment was already verified, anything else is a failure.

pub mod zarinpal;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::Result;

pub use zarinpal::{ZarinpalConfig, ZarinpalGateway};

pub const STATUS_OK: i32 = 100;
pub const STATUS_ALREADY_VERIFIED: i32 = 101;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PaymentRequest {
    /// Whole currency units.
    pub amount: i64,
    pub callback_url: String,
    pub description: String,
    pub email: String,
    pub mobile: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct PaymentRequestReply {
    pub status: i32,
    pub url: Option<String>,
    pub authority: Option<String>,
}

impl PaymentRequestReply {
    pub fn is_success(&self) -> bool { self.status == STATUS_OK }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct VerifyRequest {
    pub amount: i64,
    pub authority: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct VerifyReply {
    pub status: i32,
    pub ref_id: Option<String>,
    pub card_pan: Option<String>,
    pub fee: Option<Decimal>,
}

impl VerifyReply {
    pub fn is_success(&self) -> bool { matches!(self.status, STATUS_OK | STATUS_ALREADY_VERIFIED) }
}

/// Transport errors are `Err`; gateway-level rejections come back as a non-success status.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn request_payment(&self, request: PaymentRequest) -> Result<PaymentRequestReply>;
    async fn verify_payment(&self, request: VerifyRequest) -> Result<VerifyReply>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verify_success_codes() {
        let reply = |status| VerifyReply { status, ref_id: None, card_pan: None, fee: None };
        assert!(reply(100).is_success());
        assert!(reply(101).is_success());
        assert!(!reply(-51).is_success());
    }
}
