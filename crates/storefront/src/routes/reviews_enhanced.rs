//! Review routes with images, likes, reports, and filtering.

use axum::{extract::State, http::StatusCode};
use tracing::instrument;

use shoplite_core::{ProductId, ReviewId};

use super::reviews::service;
use crate::error::Result;
use crate::extract::{Json, Path, Query};
use crate::middleware::{OptionalAuth, RequireAuth};
use crate::models::review::{EnhancedReviewRequest, ReportRequest, Review, ReviewFilterQuery};
use crate::models::{ApiResponse, Page};
use crate::state::AppState;

/// POST /api/reviews/enhanced/products/{productId}
///
/// # Errors
///
/// Returns 400 for more than ten images, 404 for an unknown product, and 409
/// if the caller already reviewed it.
#[instrument(skip(state, caller, request), fields(caller = %caller.id))]
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(caller): RequireAuth,
    Path(product_id): Path<ProductId>,
    Json(request): Json<EnhancedReviewRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Review>>)> {
    let review = service(&state)
        .create(
            caller.id,
            product_id,
            &request.review_request,
            &request.image_urls,
        )
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok("Review created", review)),
    ))
}

/// POST /api/reviews/enhanced/{id}/like
///
/// # Errors
///
/// Returns 409 if the caller already liked the review.
#[instrument(skip(state, caller), fields(caller = %caller.id))]
pub async fn like(
    State(state): State<AppState>,
    RequireAuth(caller): RequireAuth,
    Path(review_id): Path<ReviewId>,
) -> Result<Json<ApiResponse<Review>>> {
    let review = service(&state).like(caller.id, review_id).await?;
    Ok(Json(ApiResponse::ok("Review liked", review)))
}

/// DELETE /api/reviews/enhanced/{id}/like
///
/// # Errors
///
/// Returns 404 if the caller had not liked the review.
#[instrument(skip(state, caller), fields(caller = %caller.id))]
pub async fn unlike(
    State(state): State<AppState>,
    RequireAuth(caller): RequireAuth,
    Path(review_id): Path<ReviewId>,
) -> Result<Json<ApiResponse<Review>>> {
    let review = service(&state).unlike(caller.id, review_id).await?;
    Ok(Json(ApiResponse::ok("Like removed", review)))
}

/// POST /api/reviews/enhanced/{id}/report
///
/// # Errors
///
/// Returns 400 for one's own review and 409 for a repeated report.
#[instrument(skip(state, caller, request), fields(caller = %caller.id))]
pub async fn report(
    State(state): State<AppState>,
    RequireAuth(caller): RequireAuth,
    Path(review_id): Path<ReviewId>,
    Json(request): Json<ReportRequest>,
) -> Result<Json<ApiResponse<Review>>> {
    let review = service(&state)
        .report(caller.id, review_id, request.reason.as_deref())
        .await?;
    Ok(Json(ApiResponse::ok("Review reported", review)))
}

/// GET /api/reviews/enhanced/products/{productId}/filtered
///
/// # Errors
///
/// Returns 400 for an out-of-range `rating`.
#[instrument(skip(state, viewer))]
pub async fn filtered(
    State(state): State<AppState>,
    OptionalAuth(viewer): OptionalAuth,
    Path(product_id): Path<ProductId>,
    Query(query): Query<ReviewFilterQuery>,
) -> Result<Json<ApiResponse<Page<Review>>>> {
    let reviews = service(&state)
        .list_filtered(
            product_id,
            &query.filter(),
            query.page_query(),
            viewer.map(|v| v.id),
        )
        .await?;
    Ok(Json(ApiResponse::ok("Reviews retrieved", reviews)))
}
