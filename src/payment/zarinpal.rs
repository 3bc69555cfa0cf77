//! Zarinpal v4 REST client.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};

use super::{PaymentGateway, PaymentRequest, PaymentRequestReply, VerifyReply, VerifyRequest};
use crate::Result;

const PRODUCTION_API: &str = "https://api.zarinpal.com";
const PRODUCTION_START_PAY: &str = "https://www.zarinpal.com";
const SANDBOX: &str = "https://sandbox.zarinpal.com";

/// Reported when the gateway answers without a usable status code.
const STATUS_UNKNOWN: i32 = -1;

#[derive(Clone, Debug)]
pub struct ZarinpalConfig {
    pub merchant_id: String,
    pub sandbox: bool,
    pub timeout: Duration,
}

#[derive(Clone, Debug)]
pub struct ZarinpalGateway {
    client: reqwest::Client,
    merchant_id: String,
    api_base: String,
    start_pay_base: String,
}

impl ZarinpalGateway {
    pub fn new(config: ZarinpalConfig) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        let (api_base, start_pay_base) = if config.sandbox {
            (SANDBOX, SANDBOX)
        } else {
            (PRODUCTION_API, PRODUCTION_START_PAY)
        };
        Ok(Self {
            client,
            merchant_id: config.merchant_id,
            api_base: api_base.to_string(),
            start_pay_base: start_pay_base.to_string(),
        })
    }

    /// Points the client at another host, e.g. a local stub.
    pub fn with_base_url(mut self, base: impl Into<String>) -> Self {
        let base = base.into();
        self.api_base = base.clone();
        self.start_pay_base = base;
        self
    }

    pub fn start_pay_url(&self, authority: &str) -> String {
        format!("{}/pg/StartPay/{}", self.start_pay_base, authority)
    }

    async fn post(&self, path: &str, body: Value) -> Result<Value> {
        let resp: Value = self
            .client
            .post(format!("{}{}", self.api_base, path))
            .header("accept", "application/json")
            .json(&body)
            .send()
            .await?
            .json()
            .await?;
        Ok(resp)
    }
}

/// Status code of a reply: `data.code` on success, `errors.code` on rejection.
fn reply_code(resp: &Value) -> i32 {
    resp["data"]["code"]
        .as_i64()
        .or_else(|| resp["errors"]["code"].as_i64())
        .and_then(|c| i32::try_from(c).ok())
        .unwrap_or(STATUS_UNKNOWN)
}

fn as_text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn as_decimal(v: &Value) -> Option<Decimal> {
    match v {
        Value::Number(n) => n.to_string().parse().ok(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

#[async_trait]
impl PaymentGateway for ZarinpalGateway {
    async fn request_payment(&self, request: PaymentRequest) -> Result<PaymentRequestReply> {
        let body = json!({
            "merchant_id": self.merchant_id,
            "amount": request.amount,
            "callback_url": request.callback_url,
            "description": request.description,
            "metadata": { "mobile": request.mobile, "email": request.email },
        });
        let resp = self.post("/pg/v4/payment/request.json", body).await?;
        let status = reply_code(&resp);
        let authority = as_text(&resp["data"]["authority"]);
        if status != super::STATUS_OK {
            warn!(status, errors = %resp["errors"], "Payment request rejected by gateway");
        }
        debug!(status, authority = ?authority, "Payment request answered");
        Ok(PaymentRequestReply { status, url: authority.as_deref().map(|a| self.start_pay_url(a)), authority })
    }

    async fn verify_payment(&self, request: VerifyRequest) -> Result<VerifyReply> {
        let body = json!({
            "merchant_id": self.merchant_id,
            "amount": request.amount,
            "authority": request.authority,
        });
        let resp = self.post("/pg/v4/payment/verify.json", body).await?;
        let data = &resp["data"];
        let status = reply_code(&resp);
        debug!(status, authority = %request.authority, "Payment verification answered");
        Ok(VerifyReply {
            status,
            ref_id: as_text(&data["ref_id"]),
            card_pan: as_text(&data["card_pan"]),
            fee: as_decimal(&data["fee"]),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gateway(sandbox: bool) -> ZarinpalGateway {
        ZarinpalGateway::new(ZarinpalConfig { merchant_id: "m".into(), sandbox, timeout: Duration::from_secs(5) }).unwrap()
    }

    #[test]
    fn test_start_pay_url() {
        assert_eq!(gateway(true).start_pay_url("A00"), "https://sandbox.zarinpal.com/pg/StartPay/A00");
        assert_eq!(gateway(false).start_pay_url("A00"), "https://www.zarinpal.com/pg/StartPay/A00");
    }

    #[test]
    fn test_reply_code_from_data_or_errors() {
        assert_eq!(reply_code(&json!({"data": {"code": 100}, "errors": []})), 100);
        assert_eq!(reply_code(&json!({"data": [], "errors": {"code": -9}})), -9);
        assert_eq!(reply_code(&json!({})), STATUS_UNKNOWN);
    }

    #[test]
    fn test_settlement_fields_parse() {
        let resp = json!({"data": {"code": 100, "ref_id": 201, "card_pan": "502229******5995", "fee": 2500}});
        assert_eq!(as_text(&resp["data"]["ref_id"]).as_deref(), Some("201"));
        assert_eq!(as_text(&resp["data"]["card_pan"]).as_deref(), Some("502229******5995"));
        assert_eq!(as_decimal(&resp["data"]["fee"]), Some(Decimal::new(2500, 0)));
        assert_eq!(as_text(&resp["data"]["missing"]), None);
    }
}
