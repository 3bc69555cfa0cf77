//! Storefront checkout service
//!
//! Cart, discount, order and payment pipeline for a storefront backend.
//!
//! ## Features
//! - Per-user carts with merge-on-duplicate lines and one applied discount
//! - Percentage discount codes with activity and expiry gating
//! - Immutable order snapshots taken from the cart at checkout
//! - Payment gateway requests and idempotent callback reconciliation

pub mod config;
pub mod domain;
pub mod events;
pub mod http;
pub mod payment;
pub mod pricing;
pub mod services;
pub mod store;

use serde::Serialize;
use thiserror::Error;

// =============================================================================
// Error Types
// =============================================================================

/// Stable failure category, mapped to a transport status at the HTTP boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    InvalidInput,
    Conflict,
    Unauthorized,
    ExternalServiceFailure,
    Internal,
}

/// One field-level validation problem.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub code: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self { field: field.into(), code: code.into(), message: message.into() }
    }
}

#[derive(Error, Debug)]
pub enum EcommerceError {
    #[error("Product not found")]
    ProductNotFound,

    #[error("Product is not in the cart")]
    ProductNotInCart,

    #[error("Order not found")]
    OrderNotFound,

    #[error("Discount not found")]
    DiscountNotFound,

    #[error("User not found")]
    UserNotFound,

    #[error("Invalid quantity")]
    InvalidQuantity,

    #[error("Discount code is invalid or expired")]
    InvalidDiscount,

    #[error("Cart is empty")]
    EmptyCart,

    #[error("Email and phone are required to start a payment")]
    MissingContactInfo,

    #[error("Order has already been paid")]
    OrderAlreadyPaid,

    #[error("Discount code already exists")]
    DuplicateDiscountCode,

    #[error("Payment request was rejected by the gateway (status {0})")]
    PaymentRequestFailed(i32),

    #[error("Payment verification failed (status {0})")]
    PaymentVerificationFailed(i32),

    #[error("Validation failed")]
    Validation(Vec<FieldError>),

    #[error("Authentication required")]
    Unauthorized,

    #[error("Permission denied")]
    Forbidden,

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Payment gateway unreachable: {0}")]
    GatewayError(String),
}

impl EcommerceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ProductNotFound
            | Self::ProductNotInCart
            | Self::OrderNotFound
            | Self::DiscountNotFound
            | Self::UserNotFound => ErrorKind::NotFound,
            Self::InvalidQuantity
            | Self::InvalidDiscount
            | Self::EmptyCart
            | Self::MissingContactInfo
            | Self::Validation(_) => ErrorKind::InvalidInput,
            Self::OrderAlreadyPaid | Self::DuplicateDiscountCode => ErrorKind::Conflict,
            Self::Unauthorized | Self::Forbidden => ErrorKind::Unauthorized,
            Self::PaymentRequestFailed(_)
            | Self::PaymentVerificationFailed(_)
            | Self::GatewayError(_) => ErrorKind::ExternalServiceFailure,
            Self::StorageError(_) => ErrorKind::Internal,
        }
    }

    /// Field-level problems, present only for validation failures.
    pub fn field_errors(&self) -> Option<&[FieldError]> {
        match self {
            Self::Validation(errors) => Some(errors),
            _ => None,
        }
    }
}

impl From<sqlx::Error> for EcommerceError {
    fn from(e: sqlx::Error) -> Self {
        Self::StorageError(e.to_string())
    }
}

impl From<reqwest::Error> for EcommerceError {
    fn from(e: reqwest::Error) -> Self {
        Self::GatewayError(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, EcommerceError>;
