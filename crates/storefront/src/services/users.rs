//! Account management for administrators and tooling.

use sqlx::PgPool;

use shoplite_core::{Email, UserId, UserRole, UserStatus};

use super::ServiceError;
use super::auth::{self, AuthError};
use crate::db::RepositoryError;
use crate::db::users::UserRepository;
use crate::models::user::{NewUser, UpdateProfile, User};

/// Account fields supplied by an administrator or the CLI.
#[derive(Debug, Clone)]
pub struct NewAccount<'r> {
    pub username: &'r str,
    pub email: &'r str,
    pub password: &'r str,
    pub full_name: Option<&'r str>,
    pub role: UserRole,
}

/// User management service.
pub struct UserService<'a> {
    users: UserRepository<'a>,
}

impl<'a> UserService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            users: UserRepository::new(pool),
        }
    }

    /// Create an account with any role.
    ///
    /// # Errors
    ///
    /// Returns `AuthError` for invalid input or a duplicate email/username.
    pub async fn register(&self, account: &NewAccount<'_>) -> Result<User, AuthError> {
        let email = Email::parse(account.email)?;
        let username = auth::validate_username(account.username)?;
        auth::validate_password(account.password)?;

        if self.users.email_exists(&email).await? {
            return Err(AuthError::UserAlreadyExists("Email already exists"));
        }
        if self.users.username_exists(&username).await? {
            return Err(AuthError::UserAlreadyExists("Username already exists"));
        }

        let new_user = NewUser {
            username,
            email,
            password_hash: auth::hash_password(account.password)?,
            full_name: account.full_name.map(str::to_owned),
            phone_number: None,
            address: None,
            role: account.role,
        };
        self.users.create(&new_user).await.map_err(|e| match e {
            RepositoryError::Conflict(_) => AuthError::UserAlreadyExists("User already exists"),
            other => AuthError::Repository(other),
        })
    }

    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the user does not exist.
    pub async fn get(&self, id: UserId) -> Result<User, ServiceError> {
        self.users
            .get_by_id(id)
            .await?
            .ok_or(ServiceError::NotFound("User"))
    }

    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if no user has this email.
    pub async fn get_by_email(&self, email: &str) -> Result<User, ServiceError> {
        let email = Email::parse(email).map_err(|e| ServiceError::validation(e.to_string()))?;
        self.users
            .get_by_email(&email)
            .await?
            .ok_or(ServiceError::NotFound("User"))
    }

    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the user does not exist.
    pub async fn update_profile(
        &self,
        id: UserId,
        update: &UpdateProfile,
    ) -> Result<User, ServiceError> {
        self.users
            .update_profile(id, update)
            .await
            .map_err(not_found_as_user)
    }

    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the user does not exist.
    pub async fn update_status(&self, id: UserId, status: UserStatus) -> Result<User, ServiceError> {
        self.users
            .update_status(id, status)
            .await
            .map_err(not_found_as_user)
    }

    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the user does not exist.
    pub async fn update_role(&self, id: UserId, role: UserRole) -> Result<User, ServiceError> {
        self.users
            .update_role(id, role)
            .await
            .map_err(not_found_as_user)
    }

    /// Delete an account. Administrators cannot delete themselves.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Validation` when `id == acting_user`.
    /// Returns `ServiceError::NotFound` if the user does not exist.
    pub async fn delete(&self, id: UserId, acting_user: UserId) -> Result<(), ServiceError> {
        if id == acting_user {
            return Err(ServiceError::validation("You cannot delete your own account"));
        }
        self.users.delete(id).await.map_err(not_found_as_user)
    }

    /// Accounts whose username or email contains `term`.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the query fails.
    pub async fn search(&self, term: &str) -> Result<Vec<User>, ServiceError> {
        let term = term.trim();
        if term.is_empty() {
            return Ok(self.users.list(None, None).await?);
        }
        Ok(self.users.search(term).await?)
    }

    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the query fails.
    pub async fn list(
        &self,
        role: Option<UserRole>,
        status: Option<UserStatus>,
    ) -> Result<Vec<User>, ServiceError> {
        Ok(self.users.list(role, status).await?)
    }

    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the query fails.
    pub async fn count(&self) -> Result<i64, ServiceError> {
        Ok(self.users.count().await?)
    }
}

fn not_found_as_user(e: RepositoryError) -> ServiceError {
    match e {
        RepositoryError::NotFound => ServiceError::NotFound("User"),
        other => ServiceError::Repository(other),
    }
}
