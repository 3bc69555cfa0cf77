//! Order and payment endpoints.

use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;
use validator::Validate;

use super::{auth::AuthUser, error::ApiError, extract::{ApiJson, ApiPath, ApiQuery}, AppState};
use crate::domain::aggregates::Address;
use crate::services::{PaymentOutcome, PlaceOrder};

#[derive(Debug, Deserialize, Validate)]
pub struct AddressRequest {
    #[validate(length(min = 1, max = 120, message = "recipient is required"))]
    pub recipient: String,
    #[validate(length(min = 1, max = 500, message = "street is required"))]
    pub street: String,
    #[validate(length(min = 1, max = 120, message = "city is required"))]
    pub city: String,
    pub province: Option<String>,
    #[validate(length(min = 1, max = 20, message = "postal code is required"))]
    pub postal_code: String,
    pub phone: Option<String>,
}

impl From<AddressRequest> for Address {
    fn from(r: AddressRequest) -> Self {
        Address {
            recipient: r.recipient.trim().to_string(),
            street: r.street.trim().to_string(),
            city: r.city.trim().to_string(),
            province: r.province,
            postal_code: r.postal_code.trim().to_string(),
            phone: r.phone,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct PlaceOrderRequest {
    #[validate]
    pub shipping_address: AddressRequest,
    #[validate(length(max = 1000, message = "comment is too long"))]
    pub comment: Option<String>,
}

/// Query string appended by the gateway when redirecting back.
#[derive(Debug, Deserialize)]
pub struct PaymentCallback {
    #[serde(rename = "Authority")]
    pub authority: String,
    #[serde(rename = "Status")]
    pub status: String,
}

pub async fn place_order(
    State(s): State<AppState>,
    AuthUser(user): AuthUser,
    ApiJson(r): ApiJson<PlaceOrderRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    r.validate()?;
    let request = PlaceOrder { shipping_address: r.shipping_address.into(), comment: r.comment };
    let order = s.services.orders.place_order(&user, request).await?;
    Ok((StatusCode::CREATED, Json(json!({ "message": "Order created", "order": order }))))
}

pub async fn list_orders(State(s): State<AppState>, AuthUser(user): AuthUser) -> Result<Json<Value>, ApiError> {
    let orders = s.services.orders.list(user.id).await?;
    Ok(Json(json!({ "orders": orders })))
}

pub async fn get_order(State(s): State<AppState>, AuthUser(user): AuthUser, ApiPath(id): ApiPath<Uuid>) -> Result<Json<Value>, ApiError> {
    let order = s.services.orders.get(user.id, id).await?;
    Ok(Json(json!({ "order": order })))
}

pub async fn request_payment(State(s): State<AppState>, AuthUser(user): AuthUser, ApiPath(id): ApiPath<Uuid>) -> Result<Json<Value>, ApiError> {
    let redirect = s.services.payments.request_payment(id, &user).await?;
    Ok(Json(json!({ "payment_url": redirect.payment_url, "authority": redirect.authority, "order_id": redirect.order_id })))
}

pub async fn payment_callback(
    State(s): State<AppState>,
    AuthUser(user): AuthUser,
    ApiQuery(q): ApiQuery<PaymentCallback>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let outcome = s.services.payments.confirm_payment(&q.authority, &q.status, &user).await?;
    let (status, message) = match &outcome {
        PaymentOutcome::Paid { already_processed: true, .. } => (StatusCode::OK, "Payment already confirmed"),
        PaymentOutcome::Paid { .. } => (StatusCode::OK, "Payment confirmed"),
        PaymentOutcome::Cancelled { .. } => (StatusCode::BAD_REQUEST, "Payment was cancelled or failed"),
    };
    Ok((status, Json(json!({ "message": message, "payment": outcome }))))
}
