//! Authentication extractors.
//!
//! Requests authenticate with `Authorization: Bearer <jwt>`. Every extractor
//! re-loads the account so a disabled user or a changed role takes effect on
//! the next request rather than when the token expires.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use tracing::{Span, debug};

use shoplite_core::{Email, UserId, UserRole};

use crate::error::{AppError, set_sentry_user};
use crate::models::user::User;
use crate::services::auth::{AuthError, AuthService};
use crate::state::AppState;

/// The authenticated caller.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: UserId,
    pub username: String,
    pub email: Email,
    pub role: UserRole,
}

impl AuthUser {
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    /// Allow the owner of a resource or an admin.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Forbidden` for anyone else.
    pub fn ensure_can_access(&self, owner: UserId) -> Result<(), AppError> {
        if self.id == owner || self.is_admin() {
            Ok(())
        } else {
            Err(AppError::Forbidden("Access denied".to_owned()))
        }
    }
}

impl From<User> for AuthUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            role: user.role,
        }
    }
}

/// Extractor that requires a valid bearer token for an active account.
///
/// ```rust,ignore
/// async fn handler(RequireAuth(user): RequireAuth) -> String {
///     format!("Hello, {}!", user.username)
/// }
/// ```
pub struct RequireAuth(pub AuthUser);

/// Extractor that authenticates when a valid token is present and otherwise
/// treats the caller as anonymous.
pub struct OptionalAuth(pub Option<AuthUser>);

/// Extractor that requires an authenticated admin.
pub struct RequireAdmin(pub AuthUser);

impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or(AuthError::MissingToken)?;
        let user = authenticate(state, token).await?;
        Ok(Self(user))
    }
}

impl FromRequestParts<AppState> for OptionalAuth {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Some(token) = bearer_token(parts) else {
            return Ok(Self(None));
        };

        match authenticate(state, token).await {
            Ok(user) => Ok(Self(Some(user))),
            Err(e) => {
                debug!(error = %e, "Ignoring unusable bearer token");
                Ok(Self(None))
            }
        }
    }
}

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let RequireAuth(user) = RequireAuth::from_request_parts(parts, state).await?;
        if !user.is_admin() {
            return Err(AppError::Forbidden("Admin access required".to_owned()));
        }
        Ok(Self(user))
    }
}

async fn authenticate(state: &AppState, token: &str) -> Result<AuthUser, AuthError> {
    let user = AuthService::new(state.pool(), state.jwt())
        .authenticate(token)
        .await?;

    Span::current().record("user_id", user.id.as_i32());
    set_sentry_user(&user.id, Some(user.email.as_str()));

    Ok(user.into())
}

/// Token from an `Authorization: Bearer ...` header, if any.
fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts_with(header: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/api/cart/user/1");
        if let Some(value) = header {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    fn user(id: i32, role: UserRole) -> AuthUser {
        AuthUser {
            id: UserId::new(id),
            username: "someone".into(),
            email: Email::parse("someone@example.com").unwrap(),
            role,
        }
    }

    #[test]
    fn test_bearer_token() {
        assert_eq!(bearer_token(&parts_with(Some("Bearer abc.def"))), Some("abc.def"));
        assert_eq!(bearer_token(&parts_with(Some("bearer  abc "))), Some("abc"));
        assert_eq!(bearer_token(&parts_with(Some("Basic abc"))), None);
        assert_eq!(bearer_token(&parts_with(Some("Bearer "))), None);
        assert_eq!(bearer_token(&parts_with(None)), None);
    }

    #[test]
    fn test_ensure_can_access() {
        let customer = user(1, UserRole::Customer);
        assert!(customer.ensure_can_access(UserId::new(1)).is_ok());
        assert!(matches!(
            customer.ensure_can_access(UserId::new(2)),
            Err(AppError::Forbidden(_))
        ));

        let admin = user(9, UserRole::Admin);
        assert!(admin.ensure_can_access(UserId::new(2)).is_ok());
    }
}
