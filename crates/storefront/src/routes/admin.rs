//! Administration routes. Every handler requires an admin.
//!
//! ```text
//! GET    /api/admin/users                 - List (?role, ?status, ?q)
//! GET    /api/admin/users/{id}            - One user
//! PUT    /api/admin/users/{id}/status     - Activate, deactivate, suspend
//! PUT    /api/admin/users/{id}/role       - Promote or demote
//! DELETE /api/admin/users/{id}            - Delete (not oneself)
//! GET    /api/admin/stats                 - Revenue and counts (?since)
//! GET    /api/admin/reviews/reported      - Reported reviews (?minReports)
//! PUT    /api/admin/reviews/{id}/status   - Hide or restore a review
//! ```

use axum::{extract::State, http::StatusCode};
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use shoplite_core::{ReviewId, UserId, UserRole, UserStatus};

use super::reviews::service as review_service;
use crate::error::{AppError, Result};
use crate::extract::{Json, Path, Query};
use crate::middleware::RequireAdmin;
use crate::models::review::{Review, ReviewStatusRequest};
use crate::models::user::UserDto;
use crate::models::ApiResponse;
use crate::services::orders::OrderService;
use crate::services::products::ProductService;
use crate::services::users::UserService;
use crate::state::AppState;

/// Window used by `/stats` when no `since` is given.
const DEFAULT_STATS_WINDOW_DAYS: i64 = 30;

#[derive(Debug, Default, Deserialize)]
pub struct UserListQuery {
    pub role: Option<String>,
    pub status: Option<String>,
    pub q: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct RoleRequest {
    pub role: String,
}

#[derive(Debug, Deserialize)]
pub struct StatsQuery {
    pub since: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportedQuery {
    pub min_reports: Option<i32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub total_revenue: Decimal,
    pub order_count: i64,
    pub orders_since: i64,
    pub since: DateTime<Utc>,
    pub user_count: i64,
    pub product_count: i64,
}

fn parse<T>(value: Option<&str>) -> Result<Option<T>>
where
    T: std::str::FromStr<Err = shoplite_core::ParseStatusError>,
{
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::parse::<T>)
        .transpose()
        .map_err(|e| AppError::BadRequest(e.to_string()))
}

fn parse_required<T>(value: &str) -> Result<T>
where
    T: std::str::FromStr<Err = shoplite_core::ParseStatusError>,
{
    value
        .parse()
        .map_err(|e: shoplite_core::ParseStatusError| AppError::BadRequest(e.to_string()))
}

/// GET /api/admin/users
///
/// # Errors
///
/// Returns 400 for an unknown role or status.
#[instrument(skip(state, _admin))]
pub async fn list_users(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(query): Query<UserListQuery>,
) -> Result<Json<Vec<UserDto>>> {
    let role: Option<UserRole> = parse(query.role.as_deref())?;
    let status: Option<UserStatus> = parse(query.status.as_deref())?;
    let users = UserService::new(state.pool());

    let found = match query.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
        Some(term) => users
            .search(term)
            .await?
            .into_iter()
            .filter(|u| role.is_none_or(|r| u.role == r))
            .filter(|u| status.is_none_or(|s| u.status == s))
            .collect(),
        None => users.list(role, status).await?,
    };

    Ok(Json(found.into_iter().map(UserDto::from).collect()))
}

/// GET /api/admin/users/{id}
///
/// # Errors
///
/// Returns 404 if the user does not exist.
#[instrument(skip(state, _admin))]
pub async fn show_user(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<UserId>,
) -> Result<Json<UserDto>> {
    Ok(Json(UserService::new(state.pool()).get(id).await?.into()))
}

/// PUT /api/admin/users/{id}/status
///
/// # Errors
///
/// Returns 400 for an unknown status and 404 if the user does not exist.
#[instrument(skip(state, admin), fields(admin = %admin.id))]
pub async fn update_user_status(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<UserId>,
    Json(request): Json<StatusRequest>,
) -> Result<Json<UserDto>> {
    let status: UserStatus = parse_required(&request.status)?;
    let user = UserService::new(state.pool())
        .update_status(id, status)
        .await?;
    info!(user_id = %id, %status, "User status changed");
    Ok(Json(user.into()))
}

/// PUT /api/admin/users/{id}/role
///
/// # Errors
///
/// Returns 400 for an unknown role and 404 if the user does not exist.
#[instrument(skip(state, admin), fields(admin = %admin.id))]
pub async fn update_user_role(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<UserId>,
    Json(request): Json<RoleRequest>,
) -> Result<Json<UserDto>> {
    let role: UserRole = parse_required(&request.role)?;
    let user = UserService::new(state.pool()).update_role(id, role).await?;
    info!(user_id = %id, %role, "User role changed");
    Ok(Json(user.into()))
}

/// DELETE /api/admin/users/{id}
///
/// # Errors
///
/// Returns 400 when deleting oneself and 404 if the user does not exist.
#[instrument(skip(state, admin), fields(admin = %admin.id))]
pub async fn delete_user(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<UserId>,
) -> Result<StatusCode> {
    UserService::new(state.pool()).delete(id, admin.id).await?;
    info!(user_id = %id, "User deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/admin/stats
///
/// # Errors
///
/// Returns 500 if a query fails.
#[instrument(skip(state, _admin))]
pub async fn stats(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(query): Query<StatsQuery>,
) -> Result<Json<Stats>> {
    let since = query
        .since
        .unwrap_or_else(|| Utc::now() - Duration::days(DEFAULT_STATS_WINDOW_DAYS));

    let orders = OrderService::new(state.pool(), state.catalog()).stats(since).await?;
    let user_count = UserService::new(state.pool()).count().await?;
    let product_count = ProductService::new(state.pool(), state.catalog())
        .count()
        .await?;

    Ok(Json(Stats {
        total_revenue: orders.total_revenue,
        order_count: orders.order_count,
        orders_since: orders.orders_since,
        since,
        user_count,
        product_count,
    }))
}

/// GET /api/admin/reviews/reported
///
/// # Errors
///
/// Returns 500 if the query fails.
#[instrument(skip(state, _admin))]
pub async fn reported_reviews(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(query): Query<ReportedQuery>,
) -> Result<Json<ApiResponse<Vec<Review>>>> {
    let reviews = review_service(&state)
        .list_reported(query.min_reports)
        .await?;
    Ok(Json(ApiResponse::ok("Reported reviews retrieved", reviews)))
}

/// PUT /api/admin/reviews/{id}/status
///
/// # Errors
///
/// Returns 404 if the review does not exist.
#[instrument(skip(state, _admin))]
pub async fn update_review_status(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<ReviewId>,
    Json(request): Json<ReviewStatusRequest>,
) -> Result<Json<ApiResponse<Review>>> {
    let review = review_service(&state)
        .set_status(id, request.status)
        .await?;
    Ok(Json(ApiResponse::ok("Review status updated", review)))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_optional_filters_parse_case_insensitively() {
        assert_eq!(parse::<UserRole>(Some(" admin ")).unwrap(), Some(UserRole::Admin));
        assert_eq!(parse::<UserStatus>(Some("")).unwrap(), None);
        assert_eq!(parse::<UserStatus>(None).unwrap(), None);
        assert!(matches!(
            parse::<UserStatus>(Some("BANNED")),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn test_required_status_parse() {
        assert_eq!(
            parse_required::<UserStatus>("suspended").unwrap(),
            UserStatus::Suspended
        );
        assert!(parse_required::<UserRole>("OWNER").is_err());
    }
}
