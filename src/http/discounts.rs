//! Discount administration endpoints.

use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use super::{auth::{AdminUser, AuthUser}, error::ApiError, extract::{ApiJson, ApiPath}, AppState};
use crate::domain::aggregates::DiscountPatch;
use crate::domain::value_objects::{DiscountCode, Percentage};
use crate::services::NewDiscount;
use crate::{EcommerceError, FieldError};

fn validate_percentage(value: &Decimal) -> Result<(), ValidationError> {
    Percentage::new(*value).map(|_| ()).map_err(|_| {
        let mut err = ValidationError::new("range");
        err.message = Some("percentage must be between 0 and 100".into());
        err
    })
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateDiscountRequest {
    #[validate(length(min = 1, max = 64, message = "code must be 1 to 64 characters"))]
    pub code: String,
    #[validate(custom = "validate_percentage")]
    pub percentage: Decimal,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateDiscountRequest {
    #[validate(length(min = 1, max = 64, message = "code must be 1 to 64 characters"))]
    pub code: Option<String>,
    #[validate(custom = "validate_percentage")]
    pub percentage: Option<Decimal>,
    pub is_active: Option<bool>,
    pub expires_at: Option<DateTime<Utc>>,
}

fn code(raw: &str) -> Result<DiscountCode, ApiError> {
    DiscountCode::new(raw).map_err(|e| EcommerceError::Validation(vec![FieldError::new("code", "invalid", e.to_string())]).into())
}

fn percentage(raw: Decimal) -> Result<Percentage, ApiError> {
    Percentage::new(raw).map_err(|e| EcommerceError::Validation(vec![FieldError::new("percentage", "range", e.to_string())]).into())
}

pub async fn list_discounts(State(s): State<AppState>, _admin: AdminUser) -> Result<Json<Value>, ApiError> {
    let discounts = s.services.discounts.list().await?;
    Ok(Json(json!({ "discounts": discounts })))
}

pub async fn create_discount(
    State(s): State<AppState>,
    _admin: AdminUser,
    ApiJson(r): ApiJson<CreateDiscountRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    r.validate()?;
    let new = NewDiscount { code: code(&r.code)?, percentage: percentage(r.percentage)?, expires_at: r.expires_at };
    let discount = s.services.discounts.create(new).await?;
    Ok((StatusCode::CREATED, Json(json!({ "message": "Discount created", "discount": discount }))))
}

pub async fn get_discount(State(s): State<AppState>, _admin: AdminUser, ApiPath(id): ApiPath<Uuid>) -> Result<Json<Value>, ApiError> {
    let discount = s.services.discounts.get(id).await?;
    Ok(Json(json!({ "discount": discount })))
}

pub async fn update_discount(
    State(s): State<AppState>,
    _admin: AdminUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(r): ApiJson<UpdateDiscountRequest>,
) -> Result<Json<Value>, ApiError> {
    r.validate()?;
    let patch = DiscountPatch {
        code: r.code.as_deref().map(code).transpose()?,
        percentage: r.percentage.map(percentage).transpose()?,
        is_active: r.is_active,
        expires_at: r.expires_at,
    };
    let discount = s.services.discounts.update(id, patch).await?;
    Ok(Json(json!({ "message": "Discount updated", "discount": discount })))
}

pub async fn delete_discount(State(s): State<AppState>, _admin: AdminUser, ApiPath(id): ApiPath<Uuid>) -> Result<Json<Value>, ApiError> {
    let discount = s.services.discounts.delete(id).await?;
    Ok(Json(json!({ "message": "Discount deleted", "discount": discount })))
}

/// Reports whether a code is currently usable.
pub async fn validate_discount(State(s): State<AppState>, _user: AuthUser, ApiPath(raw): ApiPath<String>) -> Result<Json<Value>, ApiError> {
    let discount = s.services.discounts.require_valid(&raw).await?;
    Ok(Json(json!({ "message": "Discount code is valid", "discount": discount })))
}
