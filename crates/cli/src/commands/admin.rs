//! Administrator account management.

use shoplite_core::{UserId, UserRole};
use shoplite_storefront::services::auth::AuthError;
use shoplite_storefront::services::users::{NewAccount, UserService};
use thiserror::Error;

use super::{ConnectError, connect};

/// Errors that can occur during admin operations.
#[derive(Debug, Error)]
pub enum AdminError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    /// Invalid input or duplicate account.
    #[error("Could not create admin user: {0}")]
    Account(#[from] AuthError),
}

/// Create an ADMIN user and return its id.
pub async fn create_user(username: &str, email: &str, password: &str) -> Result<UserId, AdminError> {
    let pool = connect().await?;

    tracing::info!("Creating admin user: {username} ({email})");

    let user = UserService::new(&pool)
        .register(&NewAccount {
            username,
            email,
            password,
            full_name: None,
            role: UserRole::Admin,
        })
        .await?;

    tracing::info!(
        "Admin user created successfully! ID: {}, Username: {}, Email: {}",
        user.id,
        user.username,
        user.email
    );

    Ok(user.id)
}
