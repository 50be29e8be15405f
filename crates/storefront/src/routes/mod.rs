//! HTTP route handlers for the storefront API.
//!
//! # Route Structure
//!
//! ```text
//! /api/auth         - login, signup, token validation, own profile
//! /api/categories   - category catalog (writes: admin)
//! /api/products     - product catalog and search (writes: admin)
//! /api/cart         - per-user cart (owner or admin)
//! /api/orders       - order placement and lifecycle
//! /api/payments     - Toss Payments confirm/cancel and failure notices
//! /api/reviews      - reviews and rating summaries
//! /api/reviews/enhanced - images, likes, reports, filtered listings
//! /api/wishlist     - saved products
//! /api/upload       - image uploads (authenticated)
//! /api/files        - stored file downloads
//! /api/admin        - user management, stats, review moderation
//! ```

pub mod admin;
pub mod auth;
pub mod cart;
pub mod categories;
pub mod files;
pub mod orders;
pub mod payments;
pub mod products;
pub mod reviews;
pub mod reviews_enhanced;
pub mod wishlist;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, header},
    routing::{delete, get, post, put},
};
use tower_http::set_header::SetResponseHeaderLayer;

use crate::config::UploadConfig;
use crate::middleware::auth_rate_limiter;
use crate::state::AppState;

/// Slack for multipart boundaries and headers on top of the file bytes.
const MULTIPART_OVERHEAD: usize = 1024 * 1024;

/// Create the auth routes router. Credential endpoints are rate limited.
pub fn auth_routes() -> Router<AppState> {
    let credentials = Router::new()
        .route("/login", post(auth::login))
        .route("/signup", post(auth::signup))
        .layer(auth_rate_limiter());

    Router::new()
        .route("/validate", get(auth::validate))
        .route("/me", get(auth::me).put(auth::update_me))
        .merge(credentials)
}

/// Create the category routes router.
pub fn category_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(categories::list).post(categories::create))
        .route("/active", get(categories::list_active))
        .route("/search", get(categories::search))
        .route(
            "/{id}",
            get(categories::show)
                .put(categories::update)
                .delete(categories::delete),
        )
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::list).post(products::create))
        .route("/search", get(products::search))
        .route("/category/{category_id}", get(products::by_category))
        .route(
            "/{id}",
            get(products::show)
                .put(products::update)
                .delete(products::delete),
        )
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(cart::add))
        .route("/{id}", put(cart::update_quantity).delete(cart::remove))
        .route("/user/{user_id}", get(cart::items).delete(cart::clear))
        .route(
            "/user/{user_id}/product/{product_id}",
            delete(cart::remove_product),
        )
        .route("/user/{user_id}/count", get(cart::count))
        .route("/user/{user_id}/total", get(cart::total))
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(orders::list).post(orders::create))
        .route("/payment", post(orders::create_for_payment))
        .route("/me", get(orders::mine))
        .route("/user/{user_id}", get(orders::list_by_user))
        .route("/number/{order_number}", get(orders::show_by_number))
        .route("/status/{status}", get(orders::list_by_status))
        .route("/{id}", get(orders::show).delete(orders::cancel))
        .route("/{id}/confirm", post(orders::confirm))
        .route("/{id}/status", put(orders::update_status))
}

/// Create the payment routes router.
///
/// `{id}` is a payment id on `GET` and a payment key on `/cancel`.
pub fn payment_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(payments::create))
        .route("/confirm", post(payments::confirm))
        .route("/client-key", get(payments::client_key))
        .route("/webhook/fail", post(payments::webhook_fail))
        .route("/key/{payment_key}", get(payments::show_by_key))
        .route("/user/{user_id}", get(payments::list_by_user))
        .route("/{id}", get(payments::show))
        .route("/{id}/cancel", post(payments::cancel))
}

/// Create the review routes router, including the enhanced endpoints.
pub fn review_routes() -> Router<AppState> {
    let enhanced = Router::new()
        .route("/products/{product_id}", post(reviews_enhanced::create))
        .route(
            "/products/{product_id}/filtered",
            get(reviews_enhanced::filtered),
        )
        .route(
            "/{id}/like",
            post(reviews_enhanced::like).delete(reviews_enhanced::unlike),
        )
        .route("/{id}/report", post(reviews_enhanced::report));

    Router::new()
        .route(
            "/products/{product_id}",
            get(reviews::list_by_product).post(reviews::create),
        )
        .route("/products/{product_id}/summary", get(reviews::summary))
        .route("/products/{product_id}/my-review", get(reviews::my_review))
        .route("/users/me", get(reviews::mine))
        .route("/{id}", put(reviews::update).delete(reviews::delete))
        .nest("/enhanced", enhanced)
}

/// Create the wishlist routes router.
pub fn wishlist_routes() -> Router<AppState> {
    Router::new()
        .route("/add", post(wishlist::add))
        .route("/remove", delete(wishlist::remove))
        .route("/toggle", post(wishlist::toggle))
        .route("/check", get(wishlist::check))
        .route("/popular", get(wishlist::popular))
        .route("/user/{user_id}", get(wishlist::list))
        .route("/count/{user_id}", get(wishlist::count_for_user))
        .route("/product/{product_id}/count", get(wishlist::count_for_product))
}

/// Create the upload routes router with a body limit sized for `uploads`.
pub fn upload_routes(uploads: &UploadConfig) -> Router<AppState> {
    let limit = uploads
        .max_file_size
        .saturating_mul(uploads.max_files.max(1))
        .saturating_add(MULTIPART_OVERHEAD);

    Router::new()
        .route("/image", post(files::upload_image))
        .route("/images", post(files::upload_images))
        .layer(DefaultBodyLimit::max(limit))
}

/// Create the file download routes router.
///
/// Every response is marked `nosniff` so browsers keep to the served type.
pub fn file_routes() -> Router<AppState> {
    Router::new()
        .route("/{filename}", get(files::download))
        .route(
            "/image/{filename}",
            get(files::image).layer(SetResponseHeaderLayer::overriding(
                header::CACHE_CONTROL,
                files::image_cache_control,
            )),
        )
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
}

/// Create the admin routes router.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(admin::list_users))
        .route(
            "/users/{id}",
            get(admin::show_user).delete(admin::delete_user),
        )
        .route("/users/{id}/status", put(admin::update_user_status))
        .route("/users/{id}/role", put(admin::update_user_role))
        .route("/stats", get(admin::stats))
        .route("/reviews/reported", get(admin::reported_reviews))
        .route("/reviews/{id}/status", put(admin::update_review_status))
}

/// Create all API routes for the storefront.
pub fn routes(uploads: &UploadConfig) -> Router<AppState> {
    Router::new()
        .nest("/api/auth", auth_routes())
        .nest("/api/categories", category_routes())
        .nest("/api/products", product_routes())
        .nest("/api/cart", cart_routes())
        .nest("/api/orders", order_routes())
        .nest("/api/payments", payment_routes())
        .nest("/api/reviews", review_routes())
        .nest("/api/wishlist", wishlist_routes())
        .nest("/api/upload", upload_routes(uploads))
        .nest("/api/files", file_routes())
        .nest("/api/admin", admin_routes())
}
