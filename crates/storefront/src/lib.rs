//! ShopLite storefront library.
//!
//! REST backend for a small online store: catalog, cart, orders, Toss
//! Payments, reviews, wishlists, and image uploads. The binary in `main.rs`
//! only loads configuration and serves [`app`].

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

use axum::{
    Router,
    extract::{Request, State},
    http::{HeaderName, HeaderValue, Method, StatusCode, header},
    middleware::from_fn,
    routing::get,
};
use tower_http::cors::{AllowHeaders, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{field::Empty, info_span, warn};

use crate::middleware::request_id::REQUEST_ID_HEADER;
use crate::state::AppState;

/// Build the full application router with its middleware stack.
///
/// Path normalization is not included: it has to wrap the router from the
/// outside, see `main.rs`.
pub fn app(state: AppState) -> Router {
    let cors = cors_layer(&state.config().cors_allowed_origins);

    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .merge(routes::routes(&state.config().uploads))
        .with_state(state)
        .layer(cors)
        .layer(from_fn(middleware::request_id_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request| {
                info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = Empty,
                    user_id = Empty,
                )
            }),
        )
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}

/// CORS for the configured origins, or mirror any origin when none are set.
fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins = if allowed_origins.is_empty() {
        AllowOrigin::mirror_request()
    } else {
        let parsed: Vec<HeaderValue> = allowed_origins
            .iter()
            .filter_map(|origin| match HeaderValue::from_str(origin) {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!(origin, "Ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        AllowOrigin::list(parsed)
    };

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
        .expose_headers([header::AUTHORIZATION, HeaderName::from_static(REQUEST_ID_HEADER)])
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Verifies database connectivity before returning OK.
/// Returns 503 Service Unavailable if the database is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match sqlx::query("SELECT 1").fetch_one(state.pool()).await {
        Ok(_) => StatusCode::OK,
        Err(e) => {
            warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use axum::body::Body;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use crate::config::StorefrontConfig;

    fn test_app() -> Router {
        let config = StorefrontConfig::for_tests();
        let pool = db::create_lazy_pool(&config.database_url).unwrap();
        app(AppState::new(config, pool).unwrap())
    }

    async fn send(request: axum::http::Request<Body>) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
        let response = test_app().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, headers, body.to_vec())
    }

    fn get_request(uri: &str) -> axum::http::Request<Body> {
        axum::http::Request::builder()
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    fn json(body: &[u8]) -> serde_json::Value {
        serde_json::from_slice(body).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let (status, _, body) = send(get_request("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"ok");
    }

    #[tokio::test]
    async fn test_request_id_is_echoed() {
        let request = axum::http::Request::builder()
            .uri("/health")
            .header(REQUEST_ID_HEADER, "req-123")
            .body(Body::empty())
            .unwrap();
        let (_, headers, _) = send(request).await;
        assert_eq!(headers.get(REQUEST_ID_HEADER).unwrap(), "req-123");

        let (_, headers, _) = send(get_request("/health")).await;
        assert!(headers.contains_key(REQUEST_ID_HEADER));

        let request = axum::http::Request::builder()
            .uri("/health")
            .header(REQUEST_ID_HEADER, "has spaces")
            .body(Body::empty())
            .unwrap();
        let (_, headers, _) = send(request).await;
        assert_ne!(headers.get(REQUEST_ID_HEADER).unwrap(), "has spaces");
    }

    #[tokio::test]
    async fn test_client_key_is_public() {
        let (status, _, body) = send(get_request("/api/payments/client-key")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            json(&body)["clientKey"],
            "test_ck_D5GePWvyJnrK0W0k6q8gLzN97Eoq"
        );
    }

    #[tokio::test]
    async fn test_protected_route_requires_token() {
        let (status, _, body) = send(get_request("/api/cart/user/1")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let body = json(&body);
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Authentication required");
    }

    #[tokio::test]
    async fn test_garbage_token_rejected() {
        let request = axum::http::Request::builder()
            .uri("/api/orders/me")
            .header(header::AUTHORIZATION, "Bearer not-a-jwt")
            .body(Body::empty())
            .unwrap();
        let (status, _, body) = send(request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json(&body)["message"], "Invalid or expired token");
    }

    #[tokio::test]
    async fn test_admin_route_requires_token() {
        let (status, _, _) = send(get_request("/api/admin/stats")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_malformed_login_body() {
        let request = axum::http::Request::builder()
            .method(Method::POST)
            .uri("/api/auth/login")
            .header(header::CONTENT_TYPE, "application/json")
            .header("x-forwarded-for", "203.0.113.9")
            .body(Body::from("{\"email\": 42"))
            .unwrap();
        let (status, _, body) = send(request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json(&body)["success"], false);
    }

    #[tokio::test]
    async fn test_file_name_traversal_rejected() {
        let (status, _, body) = send(get_request("/api/files/a..b.png")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json(&body)["message"], "Invalid file name");
    }

    #[tokio::test]
    async fn test_missing_file_is_json_404() {
        let (status, headers, body) = send(get_request("/api/files/image/missing.png")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json(&body)["message"], "File not found");
        assert_eq!(headers.get(header::X_CONTENT_TYPE_OPTIONS).unwrap(), "nosniff");
        assert!(!headers.contains_key(header::CACHE_CONTROL));
    }

    #[tokio::test]
    async fn test_image_route_refuses_svg() {
        let (status, _, body) = send(get_request("/api/files/image/logo.svg")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json(&body)["message"], "Not an image file");
    }

    #[tokio::test]
    async fn test_stored_image_is_served() {
        let dir = std::env::temp_dir().join(format!("shoplite-serve-{}", uuid::Uuid::new_v4()));
        tokio::fs::create_dir_all(&dir).await.unwrap();
        tokio::fs::write(dir.join("cat.png"), b"\x89PNG....").await.unwrap();

        let mut config = StorefrontConfig::for_tests();
        config.uploads.dir = dir.clone();
        let pool = db::create_lazy_pool(&config.database_url).unwrap();
        let response = app(AppState::new(config, pool).unwrap())
            .oneshot(get_request("/api/files/image/cat.png"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert_eq!(headers.get(header::CONTENT_TYPE).unwrap(), "image/png");
        assert_eq!(headers.get(header::CACHE_CONTROL).unwrap(), "max-age=3600");
        assert_eq!(
            headers.get(header::CONTENT_DISPOSITION).unwrap(),
            "inline; filename=\"cat.png\""
        );
        assert_eq!(headers.get(header::X_CONTENT_TYPE_OPTIONS).unwrap(), "nosniff");
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"\x89PNG....");

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }

    #[tokio::test]
    async fn test_invalid_path_id() {
        let (status, _, body) = send(get_request("/api/products/abc")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json(&body)["success"], false);
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let (status, _, _) = send(get_request("/api/nothing-here")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_cors_preflight() {
        let request = axum::http::Request::builder()
            .method(Method::OPTIONS)
            .uri("/api/products")
            .header(header::ORIGIN, "http://localhost:3000")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
            .body(Body::empty())
            .unwrap();
        let (status, headers, _) = send(request).await;
        assert!(status.is_success());
        assert_eq!(
            headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "http://localhost:3000"
        );
    }
}
