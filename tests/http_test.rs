mod common;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use common::Harness;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use storefront_checkout::http::{auth::USER_ID_HEADER, router, AppState};

fn app(h: &Harness) -> Router {
    router(AppState { services: h.services.clone(), users: h.stores.users.clone() })
}

async fn send(app: Router, method: Method, uri: &str, user: Option<Uuid>, body: Option<Value>) -> (StatusCode, Value) {
    let mut req = Request::builder().method(method).uri(uri);
    if let Some(id) = user {
        req = req.header(USER_ID_HEADER, id.to_string());
    }
    let req = match body {
        Some(b) => req.header("content-type", "application/json").body(Body::from(b.to_string())).unwrap(),
        None => req.body(Body::empty()).unwrap(),
    };
    let res = app.oneshot(req).await.unwrap();
    let status = res.status();
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
    (status, value)
}

#[tokio::test]
async fn test_health() {
    let h = Harness::new();
    let (status, body) = send(app(&h), Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_cart_requires_known_user() {
    let h = Harness::new();
    let (status, body) = send(app(&h), Method::GET, "/api/v1/cart", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["kind"], "unauthorized");

    let (status, _) = send(app(&h), Method::GET, "/api/v1/cart", Some(Uuid::now_v7()), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_add_to_cart_and_count() {
    let h = Harness::new();
    let user = h.user("Mina").await;
    let mug = h.product("mug", 1500).await;

    let payload = json!({ "product_id": mug.id, "quantity": 3 });
    let (status, body) = send(app(&h), Method::POST, "/api/v1/cart", Some(user.id), Some(payload)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cart"]["total_quantity"], 3);
    assert_eq!(body["cart"]["formatted_price"], "۴٬۵۰۰");

    let (status, body) = send(app(&h), Method::GET, "/api/v1/cart/count", Some(user.id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 3);
}

#[tokio::test]
async fn test_bad_quantity_and_unknown_product() {
    let h = Harness::new();
    let user = h.user("Mina").await;
    let mug = h.product("mug", 1500).await;

    let payload = json!({ "product_id": mug.id, "quantity": 0 });
    let (status, body) = send(app(&h), Method::POST, "/api/v1/cart", Some(user.id), Some(payload)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "invalid_input");

    let payload = json!({ "product_id": Uuid::now_v7(), "quantity": 1 });
    let (status, body) = send(app(&h), Method::POST, "/api/v1/cart", Some(user.id), Some(payload)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "not_found");
}

#[tokio::test]
async fn test_discount_admin_routes_need_admin() {
    let h = Harness::new();
    let user = h.user("Mina").await;
    let admin = h.admin("Sara").await;
    let payload = json!({ "code": "TEN", "percentage": 10 });

    let (status, _) = send(app(&h), Method::POST, "/api/v1/discounts", Some(user.id), Some(payload.clone())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(app(&h), Method::POST, "/api/v1/discounts", Some(admin.id), Some(payload.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["discount"]["code"], "TEN");

    let (status, body) = send(app(&h), Method::POST, "/api/v1/discounts", Some(admin.id), Some(payload)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "conflict");

    let (status, body) = send(app(&h), Method::GET, "/api/v1/discounts/validate/TEN", Some(user.id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["discount"]["code"], "TEN");
}

#[tokio::test]
async fn test_discount_validation_reports_fields() {
    let h = Harness::new();
    let admin = h.admin("Sara").await;
    let payload = json!({ "code": "", "percentage": 150 });

    let (status, body) = send(app(&h), Method::POST, "/api/v1/discounts", Some(admin.id), Some(payload)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let fields: Vec<&str> = body["errors"].as_array().unwrap().iter().map(|e| e["field"].as_str().unwrap()).collect();
    assert_eq!(fields, vec!["code", "percentage"]);
}

#[tokio::test]
async fn test_order_flow_over_http() {
    let h = Harness::new();
    let user = h.user("Mina").await;
    let mug = h.product("mug", 2000).await;
    send(app(&h), Method::POST, "/api/v1/cart", Some(user.id), Some(json!({ "product_id": mug.id, "quantity": 2 }))).await;

    let address = json!({ "shipping_address": { "recipient": "", "street": "1 Main", "city": "Tehran", "postal_code": "123" } });
    let (status, body) = send(app(&h), Method::POST, "/api/v1/orders", Some(user.id), Some(address)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["errors"][0]["field"], "shipping_address.recipient");

    let address = json!({ "shipping_address": { "recipient": "Mina", "street": "1 Main", "city": "Tehran", "postal_code": "123" } });
    let (status, body) = send(app(&h), Method::POST, "/api/v1/orders", Some(user.id), Some(address)).await;
    assert_eq!(status, StatusCode::CREATED);
    let order_id = body["order"]["id"].as_str().unwrap().to_string();

    let uri = format!("/api/v1/orders/{order_id}/payment");
    let (status, body) = send(app(&h), Method::POST, &uri, Some(user.id), None).await;
    assert_eq!(status, StatusCode::OK);
    let authority = body["authority"].as_str().unwrap().to_string();

    let uri = format!("/api/v1/payments/callback?Authority={authority}&Status=NOK");
    let (status, body) = send(app(&h), Method::GET, &uri, Some(user.id), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["payment"]["status"], "cancelled");

    let uri = format!("/api/v1/payments/callback?Authority={authority}&Status=OK");
    let (status, body) = send(app(&h), Method::GET, &uri, Some(user.id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["payment"]["status"], "paid");
    assert_eq!(body["payment"]["already_processed"], false);

    let (_, body) = send(app(&h), Method::GET, &uri, Some(user.id), None).await;
    assert_eq!(body["payment"]["already_processed"], true);

    let (status, body) = send(app(&h), Method::GET, &format!("/api/v1/orders/{order_id}"), Some(user.id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["order"]["payment_status"], "paid");
}

#[tokio::test]
async fn test_malformed_body_renders_error_body() {
    let h = Harness::new();
    let user = h.user("Mina").await;
    let mug = h.product("mug", 1500).await;

    let payload = json!({ "product_id": mug.id, "quantity": "lots" });
    let (status, body) = send(app(&h), Method::POST, "/api/v1/cart", Some(user.id), Some(payload)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["kind"], "invalid_input");
    assert_eq!(body["message"], "Validation failed");
    assert_eq!(body["errors"][0]["field"], "body");
    assert_eq!(body["errors"][0]["code"], "invalid_json");
}

#[tokio::test]
async fn test_callback_without_authority_renders_error_body() {
    let h = Harness::new();
    let user = h.user("Mina").await;

    let (status, body) = send(app(&h), Method::GET, "/api/v1/payments/callback?Status=OK", Some(user.id), None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["kind"], "invalid_input");
    assert_eq!(body["errors"][0]["field"], "query");
    assert_eq!(h.gateway.verify_calls.load(std::sync::atomic::Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_malformed_path_id_renders_error_body() {
    let h = Harness::new();
    let user = h.user("Mina").await;

    let (status, body) = send(app(&h), Method::GET, "/api/v1/orders/not-a-uuid", Some(user.id), None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["kind"], "invalid_input");
    assert_eq!(body["errors"][0]["field"], "path");
}
