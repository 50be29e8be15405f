//! Cart to order to payment, with payments simulated (`TOSS_TEST_MODE=true`).

use reqwest::{Method, StatusCode};
use serde_json::{Value, json};
use shoplite_integration_tests::{Session, TestContext, json_body};

fn decimal(value: &Value) -> f64 {
    value
        .as_str()
        .and_then(|s| s.parse().ok())
        .or_else(|| value.as_f64())
        .expect("not a decimal")
}

async fn place_payment_order(ctx: &TestContext, session: &Session, product_id: i64) -> Value {
    let resp = ctx
        .authed(session, Method::POST, "/api/orders/payment")
        .json(&json!({
            "userId": session.user_id,
            "orderItems": [{ "productId": product_id, "quantity": 1 }],
            "shippingInfo": { "name": "Tester", "phone": "010-0000-0000", "address": "Seoul" },
        }))
        .send()
        .await
        .expect("order request failed");
    assert_eq!(resp.status(), StatusCode::CREATED);
    json_body(resp).await
}

#[tokio::test]
#[ignore = "Requires a running storefront server with seed data"]
async fn test_cart_accumulates_quantity() {
    let ctx = TestContext::new();
    let session = ctx.signup_customer().await;
    let product = ctx.product_in_stock(3).await;
    let product_id = product["id"].as_i64().expect("missing id");

    for _ in 0..2 {
        let resp = ctx
            .authed(&session, Method::POST, "/api/cart")
            .json(&json!({ "userId": session.user_id, "productId": product_id, "quantity": 1 }))
            .send()
            .await
            .expect("add request failed");
        assert_eq!(resp.status(), StatusCode::CREATED);
    }

    let items = json_body(
        ctx.authed(&session, Method::GET, &format!("/api/cart/user/{}", session.user_id))
            .send()
            .await
            .expect("cart request failed"),
    )
    .await;
    let items = items.as_array().expect("not an array");
    assert_eq!(items.len(), 1);
    assert_eq!(items.first().expect("empty cart")["quantity"], 2);

    let total = json_body(
        ctx.authed(
            &session,
            Method::GET,
            &format!("/api/cart/user/{}/total", session.user_id),
        )
        .send()
        .await
        .expect("total request failed"),
    )
    .await;
    assert!((decimal(&total) - decimal(&product["price"]) * 2.0).abs() < 0.01);
}

#[tokio::test]
#[ignore = "Requires a running storefront server with seed data"]
async fn test_concurrent_cart_adds_stay_within_stock() {
    let ctx = TestContext::new();
    let session = ctx.signup_customer().await;
    let product = ctx.product_in_stock(1).await;
    let product_id = product["id"].as_i64().expect("missing id");
    let stock = product["stockQuantity"].as_i64().expect("missing stock");

    // Each add alone fits; both together would not.
    let add = || {
        ctx.authed(&session, Method::POST, "/api/cart")
            .json(&json!({ "userId": session.user_id, "productId": product_id, "quantity": stock }))
            .send()
    };
    let (first, second) = tokio::join!(add(), add());
    let mut statuses = [
        first.expect("add request failed").status(),
        second.expect("add request failed").status(),
    ];
    statuses.sort_by_key(StatusCode::as_u16);
    assert_eq!(statuses, [StatusCode::CREATED, StatusCode::CONFLICT]);

    let items = json_body(
        ctx.authed(&session, Method::GET, &format!("/api/cart/user/{}", session.user_id))
            .send()
            .await
            .expect("cart request failed"),
    )
    .await;
    let items = items.as_array().expect("not an array");
    assert_eq!(items.first().expect("empty cart")["quantity"], stock);
}

#[tokio::test]
#[ignore = "Requires a running storefront server with seed data"]
async fn test_other_users_cart_is_forbidden() {
    let ctx = TestContext::new();
    let alice = ctx.signup_customer().await;
    let bob = ctx.signup_customer().await;

    let resp = ctx
        .authed(&bob, Method::GET, &format!("/api/cart/user/{}", alice.user_id))
        .send()
        .await
        .expect("cart request failed");
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
#[ignore = "Requires a running storefront server in Toss test mode"]
async fn test_payment_confirms_order_and_takes_stock() {
    let ctx = TestContext::new();
    let session = ctx.signup_customer().await;
    let product = ctx.product_in_stock(1).await;
    let product_id = product["id"].as_i64().expect("missing id");
    let stock_before = product["stockQuantity"].as_i64().expect("missing stock");

    let order = place_payment_order(&ctx, &session, product_id).await;
    assert_eq!(order["status"], "PENDING");
    let order_number = order["orderNumber"].as_str().expect("missing order number");
    let amount = order["totalAmount"].as_str().expect("missing amount");

    let resp = ctx
        .authed(
            &session,
            Method::POST,
            &format!(
                "/api/payments/confirm?paymentKey=it_{order_number}&orderId={order_number}&amount={amount}"
            ),
        )
        .send()
        .await
        .expect("confirm request failed");
    assert_eq!(resp.status(), StatusCode::OK);
    let payment = json_body(resp).await;
    assert_eq!(payment["status"], "APPROVED");

    let order = json_body(
        ctx.authed(
            &session,
            Method::GET,
            &format!("/api/orders/number/{order_number}"),
        )
        .send()
        .await
        .expect("order request failed"),
    )
    .await;
    assert_eq!(order["status"], "CONFIRMED");

    let product = json_body(
        ctx.request(Method::GET, &format!("/api/products/{product_id}"))
            .send()
            .await
            .expect("product request failed"),
    )
    .await;
    assert!(product["stockQuantity"].as_i64().expect("missing stock") <= stock_before - 1);
}

#[tokio::test]
#[ignore = "Requires a running storefront server in Toss test mode"]
async fn test_amount_mismatch_is_rejected() {
    let ctx = TestContext::new();
    let session = ctx.signup_customer().await;
    let product = ctx.product_in_stock(1).await;
    let product_id = product["id"].as_i64().expect("missing id");

    let order = place_payment_order(&ctx, &session, product_id).await;
    let order_number = order["orderNumber"].as_str().expect("missing order number");

    let resp = ctx
        .authed(
            &session,
            Method::POST,
            &format!("/api/payments/confirm?paymentKey=it_mismatch&orderId={order_number}&amount=1"),
        )
        .send()
        .await
        .expect("confirm request failed");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let order = json_body(
        ctx.authed(
            &session,
            Method::GET,
            &format!("/api/orders/number/{order_number}"),
        )
        .send()
        .await
        .expect("order request failed"),
    )
    .await;
    assert_eq!(order["status"], "PENDING");
}

#[tokio::test]
#[ignore = "Requires a running storefront server with seed data"]
async fn test_cancel_pending_order() {
    let ctx = TestContext::new();
    let session = ctx.signup_customer().await;
    let product = ctx.product_in_stock(1).await;
    let product_id = product["id"].as_i64().expect("missing id");

    let order = place_payment_order(&ctx, &session, product_id).await;
    let order_id = order["id"].as_i64().expect("missing id");

    let resp = ctx
        .authed(&session, Method::DELETE, &format!("/api/orders/{order_id}"))
        .send()
        .await
        .expect("cancel request failed");
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(json_body(resp).await["status"], "CANCELLED");

    let resp = ctx
        .authed(&session, Method::DELETE, &format!("/api/orders/{order_id}"))
        .send()
        .await
        .expect("cancel request failed");
    assert_eq!(resp.status(), StatusCode::CONFLICT);
}
