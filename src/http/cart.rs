//! Cart endpoints.

use axum::{
    extract::State,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;
use validator::Validate;

use super::{auth::AuthUser, error::ApiError, extract::{ApiJson, ApiPath}, AppState};

#[derive(Debug, Deserialize)]
pub struct AddToCartRequest { pub product_id: Uuid, pub quantity: i64 }

#[derive(Debug, Deserialize)]
pub struct UpdateQuantityRequest { pub quantity: i64 }

#[derive(Debug, Deserialize, Validate)]
pub struct ApplyDiscountRequest {
    #[validate(length(min = 1, max = 64, message = "discount code is required"))]
    pub code: String,
}

pub async fn get_cart(State(s): State<AppState>, AuthUser(user): AuthUser) -> Result<Json<Value>, ApiError> {
    let view = s.services.carts.view(user.id).await?;
    Ok(Json(json!({ "message": "Fetched cart successfully", "cart": view })))
}

pub async fn add_to_cart(
    State(s): State<AppState>,
    AuthUser(user): AuthUser,
    ApiJson(r): ApiJson<AddToCartRequest>,
) -> Result<Json<Value>, ApiError> {
    let view = s.services.carts.add_item(user.id, r.product_id, r.quantity).await?;
    Ok(Json(json!({ "message": "Product added to cart", "cart": view })))
}

pub async fn update_quantity(
    State(s): State<AppState>,
    AuthUser(user): AuthUser,
    ApiPath(product_id): ApiPath<Uuid>,
    ApiJson(r): ApiJson<UpdateQuantityRequest>,
) -> Result<Json<Value>, ApiError> {
    let view = s.services.carts.update_quantity(user.id, product_id, r.quantity).await?;
    Ok(Json(json!({ "message": "Cart updated", "cart": view })))
}

pub async fn remove_from_cart(
    State(s): State<AppState>,
    AuthUser(user): AuthUser,
    ApiPath(product_id): ApiPath<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let view = s.services.carts.remove_item(user.id, product_id).await?;
    Ok(Json(json!({ "message": "Product removed from cart", "cart": view })))
}

pub async fn cart_count(State(s): State<AppState>, AuthUser(user): AuthUser) -> Result<Json<Value>, ApiError> {
    let count = s.services.carts.count(user.id).await?;
    Ok(Json(json!({ "count": count })))
}

pub async fn apply_discount(
    State(s): State<AppState>,
    AuthUser(user): AuthUser,
    ApiJson(r): ApiJson<ApplyDiscountRequest>,
) -> Result<Json<Value>, ApiError> {
    r.validate()?;
    let quote = s.services.carts.apply_discount(user.id, &r.code).await?;
    Ok(Json(json!({ "message": "Discount applied", "discount": quote })))
}

pub async fn remove_discount(State(s): State<AppState>, AuthUser(user): AuthUser) -> Result<Json<Value>, ApiError> {
    let view = s.services.carts.remove_discount(user.id).await?;
    Ok(Json(json!({ "message": "Discount removed", "cart": view })))
}
