//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures server errors to Sentry
//! before responding to the client. All route handlers return
//! `Result<T, AppError>`; every error body has the shape
//! `{"success": false, "message": "..."}`.

use axum::{
    Json,
    extract::multipart::{MultipartError, MultipartRejection},
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::ServiceError;
use crate::services::auth::AuthError;
use crate::services::files::FileError;
use crate::services::toss::TossError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Business rule violation from a service.
    #[error(transparent)]
    Service(#[from] ServiceError),

    /// Payment provider call failed outside a service.
    #[error("Payment error: {0}")]
    Payment(#[from] TossError),

    /// Upload or download failed.
    #[error(transparent)]
    File(#[from] FileError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// User is authenticated but not allowed.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Request conflicts with current state.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Rate limited.
    #[error("Rate limited")]
    RateLimited,

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Database(err) => repository_status(err),
            Self::Auth(err) => auth_status(err),
            Self::Service(err) => service_status(err),
            Self::Payment(err) => payment_status(err),
            Self::File(err) => file_status(err),
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show to the client.
    fn client_message(&self) -> String {
        match self {
            Self::Database(err) | Self::Service(ServiceError::Repository(err)) => {
                repository_message(err)
            }
            Self::Internal(_) => "Internal server error".to_owned(),
            Self::Auth(err) => auth_message(err),
            Self::Service(ServiceError::Payment(err)) | Self::Payment(err) => payment_message(err),
            Self::File(FileError::Io(_)) => "File storage error".to_owned(),
            Self::Service(err) => err.to_string(),
            Self::File(err) => err.to_string(),
            Self::NotFound(msg)
            | Self::Unauthorized(msg)
            | Self::Forbidden(msg)
            | Self::BadRequest(msg)
            | Self::Conflict(msg) => msg.clone(),
            Self::RateLimited => "Too many requests, please slow down".to_owned(),
        }
    }
}

fn repository_status(err: &RepositoryError) -> StatusCode {
    match err {
        RepositoryError::NotFound => StatusCode::NOT_FOUND,
        RepositoryError::Conflict(_) | RepositoryError::InsufficientStock { .. } => {
            StatusCode::CONFLICT
        }
        RepositoryError::Database(_) | RepositoryError::DataCorruption(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn auth_status(err: &AuthError) -> StatusCode {
    match err {
        AuthError::InvalidCredentials
        | AuthError::UserNotFound
        | AuthError::MissingToken
        | AuthError::InvalidToken(_)
        | AuthError::StaleToken => StatusCode::UNAUTHORIZED,
        AuthError::AccountDisabled => StatusCode::FORBIDDEN,
        AuthError::UserAlreadyExists(_) => StatusCode::CONFLICT,
        AuthError::InvalidEmail(_) | AuthError::WeakPassword(_) | AuthError::InvalidUsername(_) => {
            StatusCode::BAD_REQUEST
        }
        AuthError::Repository(err) => repository_status(err),
        AuthError::TokenCreation(_) | AuthError::PasswordHash => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn service_status(err: &ServiceError) -> StatusCode {
    match err {
        ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
        ServiceError::Validation(_) => StatusCode::BAD_REQUEST,
        ServiceError::Conflict(_) | ServiceError::InsufficientStock { .. } => StatusCode::CONFLICT,
        ServiceError::Forbidden(_) => StatusCode::FORBIDDEN,
        ServiceError::Payment(err) => payment_status(err),
        ServiceError::Repository(err) => repository_status(err),
    }
}

/// The provider refusing a payment is the client's problem; anything else is ours.
const fn payment_status(err: &TossError) -> StatusCode {
    if err.is_rejection() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::BAD_GATEWAY
    }
}

const fn file_status(err: &FileError) -> StatusCode {
    match err {
        FileError::NotFound => StatusCode::NOT_FOUND,
        FileError::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
        FileError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        FileError::Empty
        | FileError::NotAnImage(_)
        | FileError::UnsupportedImage(_)
        | FileError::TooManyFiles { .. }
        | FileError::InvalidName => StatusCode::BAD_REQUEST,
    }
}

fn auth_message(err: &AuthError) -> String {
    match err {
        AuthError::InvalidCredentials | AuthError::UserNotFound => {
            "Invalid email or password".to_owned()
        }
        AuthError::UserAlreadyExists(msg) => (*msg).to_owned(),
        AuthError::WeakPassword(msg) | AuthError::InvalidUsername(msg) => msg.clone(),
        AuthError::InvalidEmail(_) => "Invalid email address".to_owned(),
        AuthError::AccountDisabled => "Account is not active".to_owned(),
        AuthError::MissingToken => "Authentication required".to_owned(),
        AuthError::InvalidToken(_) | AuthError::StaleToken => {
            "Invalid or expired token".to_owned()
        }
        AuthError::Repository(err) => repository_message(err),
        _ => "Authentication error".to_owned(),
    }
}

fn payment_message(err: &TossError) -> String {
    match err {
        TossError::Api { message, .. } if err.is_rejection() => message.clone(),
        _ => "Payment provider error".to_owned(),
    }
}

fn repository_message(err: &RepositoryError) -> String {
    match err {
        RepositoryError::NotFound => "Resource not found".to_owned(),
        RepositoryError::Conflict(msg) => msg.clone(),
        RepositoryError::InsufficientStock { product_id } => {
            format!("Insufficient stock for product {product_id}")
        }
        RepositoryError::Database(_) | RepositoryError::DataCorruption(_) => {
            "Internal server error".to_owned()
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        } else {
            tracing::debug!(error = %self, %status, "Request rejected");
        }

        let body = json!({
            "success": false,
            "message": self.client_message(),
        });

        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<MultipartRejection> for AppError {
    fn from(rejection: MultipartRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        Self::BadRequest(err.body_text())
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of actions
/// leading up to an error.
///
/// ```rust,ignore
/// add_breadcrumb("order", "Order placed", Some(&[("order_number", number.as_str())]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use shoplite_core::ProductId;

    async fn body_of(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("product-123".to_string());
        assert_eq!(err.to_string(), "Not found: product-123");

        let err = AppError::BadRequest("invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: invalid input");
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            AppError::NotFound("test".to_string()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::Forbidden("test".to_string()).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(AppError::RateLimited.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            AppError::Internal("test".to_string()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_service_error_status_codes() {
        let status = |err: ServiceError| AppError::from(err).status();
        assert_eq!(status(ServiceError::NotFound("Product")), StatusCode::NOT_FOUND);
        assert_eq!(
            status(ServiceError::validation("bad")),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status(ServiceError::InsufficientStock { available: 2 }),
            StatusCode::CONFLICT
        );
        assert_eq!(status(ServiceError::Forbidden("no")), StatusCode::FORBIDDEN);
        assert_eq!(
            status(ServiceError::Repository(RepositoryError::NotFound)),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_auth_error_status_codes() {
        let status = |err: AuthError| AppError::from(err).status();
        assert_eq!(status(AuthError::InvalidCredentials), StatusCode::UNAUTHORIZED);
        assert_eq!(status(AuthError::MissingToken), StatusCode::UNAUTHORIZED);
        assert_eq!(status(AuthError::AccountDisabled), StatusCode::FORBIDDEN);
        assert_eq!(
            status(AuthError::UserAlreadyExists("Email already exists")),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status(AuthError::WeakPassword("short".into())),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_payment_error_status_codes() {
        let rejected = TossError::Api {
            status: 400,
            code: "REJECT_CARD_COMPANY".into(),
            message: "Card declined".into(),
        };
        let outage = TossError::Api {
            status: 503,
            code: "PROVIDER_ERROR".into(),
            message: "down".into(),
        };
        assert_eq!(AppError::from(rejected).status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::from(outage).status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn test_error_body_shape() {
        let (status, body) = body_of(ServiceError::InsufficientStock { available: 3 }.into()).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Insufficient stock. Available: 3");
    }

    #[tokio::test]
    async fn test_internal_details_hidden() {
        let (status, body) = body_of(AppError::Internal("pool exhausted".into())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "Internal server error");

        let (_, body) = body_of(
            ServiceError::Repository(RepositoryError::InsufficientStock {
                product_id: ProductId::new(7),
            })
            .into(),
        )
        .await;
        assert_eq!(body["message"], "Insufficient stock for product 7");
    }
}
