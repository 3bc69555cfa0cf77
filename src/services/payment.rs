//! Payment requests and callback reconciliation.
//!
//! An order moves `Pending -> Paid` at most once. Duplicate or replayed
//! callbacks for a paid order return the stored settlement without asking
//! the gateway again.

use rust_decimal::prelude::ToPrimitive;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::aggregates::{Order, Settlement, User};
use crate::events::EventPublisher;
use crate::payment::{PaymentGateway, PaymentRequest, VerifyRequest};
use crate::pricing::round_amount;
use crate::store::OrderStore;
use crate::{EcommerceError, Result};

/// Callback status reported by the gateway for a completed payment.
pub const CALLBACK_STATUS_OK: &str = "OK";

#[derive(Clone, Debug)]
pub struct PaymentSettings {
    pub callback_url: String,
    pub description: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PaymentRedirect {
    pub order_id: Uuid,
    pub authority: String,
    pub payment_url: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PaymentOutcome {
    Paid { order_id: Uuid, settlement: Settlement, already_processed: bool },
    /// The gateway reported the payment as failed or abandoned; nothing changed.
    Cancelled { authority: String },
}

#[derive(Clone)]
pub struct PaymentService {
    orders: Arc<dyn OrderStore>,
    gateway: Arc<dyn PaymentGateway>,
    events: Arc<dyn EventPublisher>,
    settings: PaymentSettings,
}

impl PaymentService {
    pub fn new(
        orders: Arc<dyn OrderStore>,
        gateway: Arc<dyn PaymentGateway>,
        events: Arc<dyn EventPublisher>,
        settings: PaymentSettings,
    ) -> Self {
        Self { orders, gateway, events, settings }
    }

    pub async fn request_payment(&self, order_id: Uuid, user: &User) -> Result<PaymentRedirect> {
        let (email, mobile) = user.contact().ok_or(EcommerceError::MissingContactInfo)?;
        let order = self.orders.find_owned(order_id, user.id).await?.ok_or(EcommerceError::OrderNotFound)?;
        if order.is_paid() {
            return Err(EcommerceError::OrderAlreadyPaid);
        }

        let reply = self
            .gateway
            .request_payment(PaymentRequest {
                amount: gateway_amount(&order)?,
                callback_url: self.settings.callback_url.clone(),
                description: self.settings.description.clone(),
                email: email.to_string(),
                mobile: mobile.to_string(),
            })
            .await?;
        let (authority, payment_url) = match (reply.is_success(), reply.authority, reply.url) {
            (true, Some(authority), Some(url)) => (authority, url),
            _ => {
                warn!(%order_id, status = reply.status, "Payment request failed");
                return Err(EcommerceError::PaymentRequestFailed(reply.status));
            }
        };

        let mut updated = self
            .orders
            .set_authority(order_id, &authority)
            .await?
            .ok_or(EcommerceError::OrderAlreadyPaid)?;
        info!(%order_id, %authority, amount = %order.payable_amount(), "Payment requested");
        self.events.publish_all(updated.take_events()).await;
        Ok(PaymentRedirect { order_id, authority, payment_url })
    }

    pub async fn confirm_payment(&self, authority: &str, status: &str, user: &User) -> Result<PaymentOutcome> {
        if status != CALLBACK_STATUS_OK {
            info!(%authority, %status, "Gateway reported an unsuccessful payment");
            return Ok(PaymentOutcome::Cancelled { authority: authority.to_string() });
        }

        let order = self
            .orders
            .find_by_authority(authority, user.id)
            .await?
            .ok_or(EcommerceError::OrderNotFound)?;
        if order.is_paid() {
            info!(order_id = %order.id(), %authority, "Payment already confirmed");
            return already_paid(&order);
        }

        let reply = self
            .gateway
            .verify_payment(VerifyRequest { amount: gateway_amount(&order)?, authority: authority.to_string() })
            .await?;
        if !reply.is_success() {
            warn!(order_id = %order.id(), %authority, status = reply.status, "Payment verification failed");
            return Err(EcommerceError::PaymentVerificationFailed(reply.status));
        }
        if reply.ref_id.is_none() {
            warn!(order_id = %order.id(), %authority, "Gateway verified payment without a reference id");
        }
        let settlement = Settlement {
            ref_id: reply.ref_id.unwrap_or_default(),
            card_pan: reply.card_pan,
            fee: reply.fee.unwrap_or_default(),
        };

        match self.orders.mark_paid_if_pending(order.id(), &settlement).await? {
            Some(mut paid) => {
                info!(order_id = %paid.id(), %authority, ref_id = %settlement.ref_id, "Order paid");
                self.events.publish_all(paid.take_events()).await;
                Ok(PaymentOutcome::Paid { order_id: paid.id(), settlement, already_processed: false })
            }
            // Another callback won the race; report what it stored.
            None => {
                let current = self
                    .orders
                    .find_by_authority(authority, user.id)
                    .await?
                    .ok_or(EcommerceError::OrderNotFound)?;
                already_paid(&current)
            }
        }
    }
}

fn already_paid(order: &Order) -> Result<PaymentOutcome> {
    let settlement = order
        .settlement()
        .cloned()
        .ok_or_else(|| EcommerceError::StorageError(format!("order {} is not settled", order.id())))?;
    Ok(PaymentOutcome::Paid { order_id: order.id(), settlement, already_processed: true })
}

fn gateway_amount(order: &Order) -> Result<i64> {
    round_amount(order.payable_amount())
        .to_i64()
        .ok_or_else(|| EcommerceError::GatewayError(format!("amount out of range for order {}", order.id())))
}
