//! Reviews, reactions and wishlists.

use reqwest::{Method, StatusCode};
use serde_json::json;
use shoplite_integration_tests::{TestContext, json_body};

#[tokio::test]
#[ignore = "Requires a running storefront server with seed data"]
async fn test_one_review_per_product() {
    let ctx = TestContext::new();
    let session = ctx.signup_customer().await;
    let product_id = ctx.product_in_stock(0).await["id"]
        .as_i64()
        .expect("missing id");
    let path = format!("/api/reviews/products/{product_id}");

    let resp = ctx
        .authed(&session, Method::POST, &path)
        .json(&json!({ "rating": 4, "comment": "Solid" }))
        .send()
        .await
        .expect("review request failed");
    assert_eq!(resp.status(), StatusCode::CREATED);
    let review = json_body(resp).await;
    assert_eq!(review["success"], true);
    assert_eq!(review["data"]["verifiedPurchase"], false);

    let resp = ctx
        .authed(&session, Method::POST, &path)
        .json(&json!({ "rating": 5 }))
        .send()
        .await
        .expect("review request failed");
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let mine = json_body(
        ctx.authed(&session, Method::GET, &format!("{path}/my-review"))
            .send()
            .await
            .expect("my-review request failed"),
    )
    .await;
    assert_eq!(mine["hasReview"], true);
}

#[tokio::test]
#[ignore = "Requires a running storefront server with seed data"]
async fn test_rating_out_of_range_is_rejected() {
    let ctx = TestContext::new();
    let session = ctx.signup_customer().await;
    let product_id = ctx.product_in_stock(0).await["id"]
        .as_i64()
        .expect("missing id");

    let resp = ctx
        .authed(
            &session,
            Method::POST,
            &format!("/api/reviews/products/{product_id}"),
        )
        .json(&json!({ "rating": 6 }))
        .send()
        .await
        .expect("review request failed");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore = "Requires a running storefront server with seed data"]
async fn test_like_twice_conflicts() {
    let ctx = TestContext::new();
    let author = ctx.signup_customer().await;
    let reader = ctx.signup_customer().await;
    let product_id = ctx.product_in_stock(0).await["id"]
        .as_i64()
        .expect("missing id");

    let review = json_body(
        ctx.authed(
            &author,
            Method::POST,
            &format!("/api/reviews/products/{product_id}"),
        )
        .json(&json!({ "rating": 5, "comment": "Great" }))
        .send()
        .await
        .expect("review request failed"),
    )
    .await;
    let review_id = review["data"]["id"].as_i64().expect("missing id");
    let like = format!("/api/reviews/enhanced/{review_id}/like");

    let resp = ctx
        .authed(&reader, Method::POST, &like)
        .send()
        .await
        .expect("like request failed");
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(json_body(resp).await["data"]["likeCount"], 1);

    let resp = ctx
        .authed(&reader, Method::POST, &like)
        .send()
        .await
        .expect("like request failed");
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let resp = ctx
        .authed(&reader, Method::DELETE, &like)
        .send()
        .await
        .expect("unlike request failed");
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
#[ignore = "Requires a running storefront server with seed data"]
async fn test_wishlist_toggle() {
    let ctx = TestContext::new();
    let session = ctx.signup_customer().await;
    let product_id = ctx.product_in_stock(0).await["id"]
        .as_i64()
        .expect("missing id");
    let query = format!("userId={}&productId={product_id}", session.user_id);

    let toggled = json_body(
        ctx.authed(&session, Method::POST, &format!("/api/wishlist/toggle?{query}"))
            .send()
            .await
            .expect("toggle request failed"),
    )
    .await;
    assert_eq!(toggled["added"], true);

    let check = json_body(
        ctx.authed(&session, Method::GET, &format!("/api/wishlist/check?{query}"))
            .send()
            .await
            .expect("check request failed"),
    )
    .await;
    assert_eq!(check["isInWishlist"], true);

    let resp = ctx
        .authed(&session, Method::POST, &format!("/api/wishlist/add?{query}"))
        .send()
        .await
        .expect("add request failed");
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let toggled = json_body(
        ctx.authed(&session, Method::POST, &format!("/api/wishlist/toggle?{query}"))
            .send()
            .await
            .expect("toggle request failed"),
    )
    .await;
    assert_eq!(toggled["added"], false);

    let count = json_body(
        ctx.authed(
            &session,
            Method::GET,
            &format!("/api/wishlist/count/{}", session.user_id),
        )
        .send()
        .await
        .expect("count request failed"),
    )
    .await;
    assert_eq!(count["count"], 0);
}
