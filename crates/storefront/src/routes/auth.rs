//! Account authentication routes.
//!
//! ```text
//! POST /api/auth/login     - Email/password login, returns a JWT
//! POST /api/auth/signup    - Register a customer, returns a JWT
//! GET  /api/auth/validate  - Check a bearer token
//! GET  /api/auth/me        - Caller's profile
//! PUT  /api/auth/me        - Update caller's profile
//! ```

use axum::{extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use shoplite_core::{Email, UserId, UserRole};

use crate::error::{Result, add_breadcrumb};
use crate::extract::Json;
use crate::middleware::{AuthUser, RequireAuth};
use crate::models::user::{UpdateProfile, User, UserDto};
use crate::services::auth::{AuthService, SignupRequest};
use crate::services::users::UserService;
use crate::state::AppState;

/// `POST /api/auth/login` body.
#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Token issued on login and signup.
#[derive(Debug, Serialize)]
pub struct JwtResponse {
    pub token: String,
    #[serde(rename = "type")]
    pub token_type: &'static str,
    pub id: UserId,
    pub username: String,
    pub email: Email,
    pub role: UserRole,
}

impl JwtResponse {
    fn new(user: User, token: String) -> Self {
        Self {
            token,
            token_type: "Bearer",
            id: user.id,
            username: user.username,
            email: user.email,
            role: user.role,
        }
    }
}

/// Result of `GET /api/auth/validate`.
#[derive(Debug, Serialize)]
pub struct TokenInfo {
    pub valid: bool,
    pub id: UserId,
    pub username: String,
    pub email: Email,
    pub role: UserRole,
}

/// Log in with email and password.
///
/// POST /api/auth/login
///
/// # Errors
///
/// Returns 401 for unknown email or wrong password, 403 for a disabled account.
#[instrument(skip(state, request), fields(email = %request.email))]
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<JwtResponse>> {
    let (user, token) = AuthService::new(state.pool(), state.jwt())
        .login(&request.email, &request.password)
        .await?;

    info!(user_id = %user.id, "User logged in");
    add_breadcrumb("auth", "Logged in", None);
    Ok(Json(JwtResponse::new(user, token)))
}

/// Register a customer account.
///
/// POST /api/auth/signup
///
/// # Errors
///
/// Returns 400 for invalid input and 409 if the email or username is taken.
#[instrument(skip(state, request), fields(username = %request.username))]
pub async fn signup(
    State(state): State<AppState>,
    Json(request): Json<SignupRequest>,
) -> Result<(StatusCode, Json<JwtResponse>)> {
    let (user, token) = AuthService::new(state.pool(), state.jwt())
        .signup(request)
        .await?;

    info!(user_id = %user.id, "User registered");
    Ok((StatusCode::CREATED, Json(JwtResponse::new(user, token))))
}

/// Confirm that the bearer token is valid.
///
/// GET /api/auth/validate
///
/// # Errors
///
/// Returns 401 if the token is missing or invalid.
pub async fn validate(RequireAuth(user): RequireAuth) -> Result<Json<TokenInfo>> {
    let AuthUser {
        id,
        username,
        email,
        role,
    } = user;
    Ok(Json(TokenInfo {
        valid: true,
        id,
        username,
        email,
        role,
    }))
}

/// The caller's profile.
///
/// GET /api/auth/me
///
/// # Errors
///
/// Returns 401 if not authenticated.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn me(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<UserDto>> {
    let user = UserService::new(state.pool()).get(user.id).await?;
    Ok(Json(user.into()))
}

/// Update the caller's name, phone number, or address.
///
/// PUT /api/auth/me
///
/// # Errors
///
/// Returns 401 if not authenticated.
#[instrument(skip(state, user, update), fields(user_id = %user.id))]
pub async fn update_me(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(update): Json<UpdateProfile>,
) -> Result<Json<UserDto>> {
    let user = UserService::new(state.pool())
        .update_profile(user.id, &update)
        .await?;
    Ok(Json(user.into()))
}
