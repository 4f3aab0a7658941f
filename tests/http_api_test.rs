mod common;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use fulfillment_api::{app, config, AppState};

use common::{seed_product, seed_user, setup, TestCtx};

fn test_app(ctx: &TestCtx) -> axum::Router {
    let state = AppState {
        db: ctx.db.clone(),
        config: config::load_config().expect("default config"),
        event_sender: ctx.event_sender.clone(),
        services: ctx.services.clone(),
    };
    app(state)
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn order_payload(product_id: Uuid, quantity: i32) -> Value {
    json!({
        "customer_name": "Ada Lovelace",
        "customer_email": "ada@example.com",
        "shipping_address": "12 Analytical Way, London",
        "currency": "USD",
        "payment_method": "card",
        "items": [{ "product_id": product_id, "quantity": quantity }]
    })
}

fn post_json(uri: &str, payload: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(payload.to_string()))
        .unwrap()
}

#[tokio::test]
async fn health_endpoint_responds() {
    let ctx = setup().await;
    let app = test_app(&ctx);

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn create_order_returns_201_and_replays_on_the_same_key() {
    let ctx = setup().await;
    let app = test_app(&ctx);
    let product = seed_product(&ctx.db, 10, 500).await;
    let payload = order_payload(product, 2);

    let mut first_req = post_json("/api/v1/orders", &payload);
    first_req
        .headers_mut()
        .insert("idempotency-key", "http-key-1".parse().unwrap());
    let first = app.clone().oneshot(first_req).await.unwrap();
    assert_eq!(first.status(), StatusCode::CREATED);
    let first_body = json_body(first).await;
    assert_eq!(first_body["success"], true);
    assert_eq!(first_body["data"]["total_cents"], 1000);
    assert_eq!(first_body["data"]["status"], "PENDING");
    let order_id = first_body["data"]["order_id"].as_str().unwrap().to_string();

    let mut replay_req = post_json("/api/v1/orders", &payload);
    replay_req
        .headers_mut()
        .insert("idempotency-key", "http-key-1".parse().unwrap());
    let replay = app.oneshot(replay_req).await.unwrap();
    assert_eq!(replay.status(), StatusCode::CREATED);
    let replay_body = json_body(replay).await;
    assert_eq!(replay_body["data"]["order_id"].as_str().unwrap(), order_id);

    assert_eq!(ctx.services.inventory.get_stock(product).await.unwrap(), 8);
}

#[tokio::test]
async fn create_order_without_idempotency_key_is_a_400() {
    let ctx = setup().await;
    let app = test_app(&ctx);
    let product = seed_product(&ctx.db, 10, 500).await;

    let response = app
        .oneshot(post_json("/api/v1/orders", &order_payload(product, 1)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = json_body(response).await;
    assert_eq!(body["code"], "validation_error");
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("Idempotency-Key"));
}

#[tokio::test]
async fn out_of_stock_order_is_a_422() {
    let ctx = setup().await;
    let app = test_app(&ctx);
    let product = seed_product(&ctx.db, 1, 500).await;

    let mut request = post_json("/api/v1/orders", &order_payload(product, 5));
    request
        .headers_mut()
        .insert("idempotency-key", "http-key-oos".parse().unwrap());
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let body = json_body(response).await;
    assert_eq!(body["code"], "insufficient_stock");
}

#[tokio::test]
async fn invalid_transition_is_a_409_with_a_stable_code() {
    let ctx = setup().await;
    let app = test_app(&ctx);
    let product = seed_product(&ctx.db, 10, 500).await;

    let created = ctx
        .services
        .orders
        .create_order("http-key-transition", common::order_request(vec![(product, 1)]))
        .await
        .unwrap();

    let response = app
        .oneshot(post_json(
            &format!("/api/v1/orders/{}/status", created.order_id),
            &json!({ "status": "DELIVERED" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let body = json_body(response).await;
    assert_eq!(body["code"], "invalid_transition");
}

#[tokio::test]
async fn unknown_order_is_a_404() {
    let ctx = setup().await;
    let app = test_app(&ctx);

    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/api/v1/orders/{}", Uuid::new_v4()))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = json_body(response).await;
    assert_eq!(body["code"], "not_found");
}

#[tokio::test]
async fn stock_adjustment_and_audit_trail_round_trip() {
    let ctx = setup().await;
    let app = test_app(&ctx);
    let product = seed_product(&ctx.db, 5, 500).await;
    let actor = seed_user(&ctx.db, "Stock Clerk").await;

    let adjust = app
        .clone()
        .oneshot(post_json(
            "/api/v1/inventory/adjust",
            &json!({
                "product_id": product,
                "quantity_delta": 10,
                "reference": "Restock",
                "actor_user_id": actor
            }),
        ))
        .await
        .unwrap();
    assert_eq!(adjust.status(), StatusCode::OK);
    let adjust_body = json_body(adjust).await;
    assert_eq!(adjust_body["data"]["stock_quantity"], 15);

    let stock = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/api/v1/inventory/{}", product))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(stock.status(), StatusCode::OK);
    let stock_body = json_body(stock).await;
    assert_eq!(stock_body["data"]["stock_quantity"], 15);

    let movements = app
        .oneshot(
            Request::builder()
                .uri(format!("/api/v1/inventory/{}/movements?limit=10", product))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(movements.status(), StatusCode::OK);
    let movements_body = json_body(movements).await;
    assert_eq!(movements_body["data"]["total"], 1);
    let item = &movements_body["data"]["items"][0];
    assert_eq!(item["movement_type"], "ADJUSTMENT");
    assert_eq!(item["performed_by"]["name"], "Stock Clerk");
}

#[tokio::test]
async fn blank_adjustment_reason_is_a_400() {
    let ctx = setup().await;
    let app = test_app(&ctx);
    let product = seed_product(&ctx.db, 5, 500).await;
    let actor = seed_user(&ctx.db, "Stock Clerk").await;

    let response = app
        .oneshot(post_json(
            "/api/v1/inventory/adjust",
            &json!({
                "product_id": product,
                "quantity_delta": 3,
                "reference": "   ",
                "actor_user_id": actor
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = json_body(response).await;
    assert_eq!(body["code"], "validation_error");
}
