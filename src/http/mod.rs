//! HTTP transport.

pub mod auth;
pub mod cart;
pub mod discounts;
pub mod error;
pub mod extract;
pub mod orders;

use axum::{
    routing::{get, post, put},
    Json, Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::services::Services;
use crate::store::UserStore;

#[derive(Clone)]
pub struct AppState {
    pub services: Services,
    pub users: Arc<dyn UserStore>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { Json(serde_json::json!({"status": "healthy", "service": "storefront-checkout"})) }))
        .route("/api/v1/cart", get(cart::get_cart).post(cart::add_to_cart))
        .route("/api/v1/cart/count", get(cart::cart_count))
        .route("/api/v1/cart/discount", post(cart::apply_discount).delete(cart::remove_discount))
        .route("/api/v1/cart/:product_id", put(cart::update_quantity).delete(cart::remove_from_cart))
        .route("/api/v1/discounts", get(discounts::list_discounts).post(discounts::create_discount))
        .route("/api/v1/discounts/validate/:code", get(discounts::validate_discount))
        .route("/api/v1/discounts/:id", get(discounts::get_discount).put(discounts::update_discount).delete(discounts::delete_discount))
        .route("/api/v1/orders", get(orders::list_orders).post(orders::place_order))
        .route("/api/v1/orders/:id", get(orders::get_order))
        .route("/api/v1/orders/:id/payment", post(orders::request_payment))
        .route("/api/v1/payments/callback", get(orders::payment_callback))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
