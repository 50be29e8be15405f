//! Review routes.
//!
//! Responses use the `{success, message, data}` envelope.
//!
//! ```text
//! POST   /api/reviews/products/{productId}            - Write a review
//! PUT    /api/reviews/{reviewId}                      - Edit own review
//! DELETE /api/reviews/{reviewId}                      - Delete (author or admin)
//! GET    /api/reviews/products/{productId}            - Paged active reviews
//! GET    /api/reviews/products/{productId}/summary    - Rating summary
//! GET    /api/reviews/products/{productId}/my-review  - Caller's review, if any
//! GET    /api/reviews/users/me                        - Caller's reviews
//! ```

use axum::{extract::State, http::StatusCode};
use serde_json::{Value, json};
use tracing::instrument;

use shoplite_core::{ProductId, RatingSummary, ReviewId};

use crate::error::Result;
use crate::extract::{Json, Path, Query};
use crate::middleware::{OptionalAuth, RequireAuth};
use crate::models::review::{PageQuery, Review, ReviewRequest};
use crate::models::{ApiResponse, Page};
use crate::services::reviews::ReviewService;
use crate::state::AppState;

pub(super) fn service(state: &AppState) -> ReviewService<'_> {
    ReviewService::new(state.pool(), state.catalog())
}

/// # Errors
///
/// Returns 404 for an unknown product, 409 if the caller already reviewed it.
#[instrument(skip(state, caller, request), fields(caller = %caller.id))]
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(caller): RequireAuth,
    Path(product_id): Path<ProductId>,
    Json(request): Json<ReviewRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Review>>)> {
    let review = service(&state)
        .create(caller.id, product_id, &request, &[])
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok("Review created", review)),
    ))
}

/// # Errors
///
/// Returns 403 unless the caller wrote the review.
#[instrument(skip(state, caller, request), fields(caller = %caller.id))]
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(caller): RequireAuth,
    Path(review_id): Path<ReviewId>,
    Json(request): Json<ReviewRequest>,
) -> Result<Json<ApiResponse<Review>>> {
    let review = service(&state)
        .update(caller.id, review_id, &request)
        .await?;
    Ok(Json(ApiResponse::ok("Review updated", review)))
}

/// # Errors
///
/// Returns 403 unless the caller wrote the review or is an admin.
#[instrument(skip(state, caller), fields(caller = %caller.id))]
pub async fn delete(
    State(state): State<AppState>,
    RequireAuth(caller): RequireAuth,
    Path(review_id): Path<ReviewId>,
) -> Result<Json<ApiResponse<()>>> {
    service(&state)
        .delete(caller.id, caller.is_admin(), review_id)
        .await?;
    Ok(Json(ApiResponse::ok("Review deleted", ())))
}

/// # Errors
///
/// Returns 500 if the query fails.
#[instrument(skip(state, viewer))]
pub async fn list_by_product(
    State(state): State<AppState>,
    OptionalAuth(viewer): OptionalAuth,
    Path(product_id): Path<ProductId>,
    Query(page): Query<PageQuery>,
) -> Result<Json<ApiResponse<Page<Review>>>> {
    let reviews = service(&state)
        .list_by_product(product_id, page, viewer.map(|v| v.id))
        .await?;
    Ok(Json(ApiResponse::ok("Reviews retrieved", reviews)))
}

/// # Errors
///
/// Returns 404 for an unknown product.
#[instrument(skip(state))]
pub async fn summary(
    State(state): State<AppState>,
    Path(product_id): Path<ProductId>,
) -> Result<Json<ApiResponse<RatingSummary>>> {
    let summary = service(&state).summary(product_id).await?;
    Ok(Json(ApiResponse::ok("Rating summary retrieved", summary)))
}

/// # Errors
///
/// Returns 401 if not authenticated.
#[instrument(skip(state, caller), fields(caller = %caller.id))]
pub async fn my_review(
    State(state): State<AppState>,
    RequireAuth(caller): RequireAuth,
    Path(product_id): Path<ProductId>,
) -> Result<Json<Value>> {
    let review = service(&state)
        .find_by_author(caller.id, product_id)
        .await?;
    let message = if review.is_some() {
        "Review found"
    } else {
        "No review for this product"
    };
    Ok(Json(json!({
        "success": true,
        "message": message,
        "hasReview": review.is_some(),
        "data": review,
    })))
}

/// # Errors
///
/// Returns 401 if not authenticated.
#[instrument(skip(state, caller), fields(caller = %caller.id))]
pub async fn mine(
    State(state): State<AppState>,
    RequireAuth(caller): RequireAuth,
) -> Result<Json<ApiResponse<Vec<Review>>>> {
    let reviews = service(&state).list_by_user(caller.id).await?;
    Ok(Json(ApiResponse::ok("Reviews retrieved", reviews)))
}
