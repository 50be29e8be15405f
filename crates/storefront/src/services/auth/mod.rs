//! Authentication service.
//!
//! Password signup/login with Argon2id hashes and JWT bearer tokens.

mod error;
mod jwt;

pub use error::AuthError;
pub use jwt::{Claims, JwtKeys};

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use serde::Deserialize;
use sqlx::PgPool;

use shoplite_core::{Email, UserRole, UserStatus};

use crate::db::RepositoryError;
use crate::db::users::UserRepository;
use crate::models::user::{NewUser, User};

/// Minimum password length.
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Allowed username length in characters.
pub const USERNAME_LENGTH: std::ops::RangeInclusive<usize> = 3..=50;

/// `POST /api/auth/signup` body.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub full_name: Option<String>,
    pub phone_number: Option<String>,
    pub address: Option<String>,
}

/// Authentication service.
///
/// Handles registration, login, and resolving bearer tokens to accounts.
pub struct AuthService<'a> {
    users: UserRepository<'a>,
    keys: &'a JwtKeys,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(pool: &'a PgPool, keys: &'a JwtKeys) -> Self {
        Self {
            users: UserRepository::new(pool),
            keys,
        }
    }

    /// Register a customer account and sign a token for it.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail`, `AuthError::InvalidUsername`, or
    /// `AuthError::WeakPassword` for bad input.
    /// Returns `AuthError::UserAlreadyExists` if the email or username is taken.
    pub async fn signup(&self, request: SignupRequest) -> Result<(User, String), AuthError> {
        let email = Email::parse(&request.email)?;
        let username = validate_username(&request.username)?;
        validate_password(&request.password)?;

        if self.users.email_exists(&email).await? {
            return Err(AuthError::UserAlreadyExists("Email already exists"));
        }
        if self.users.username_exists(&username).await? {
            return Err(AuthError::UserAlreadyExists("Username already exists"));
        }

        let new_user = NewUser {
            username,
            email,
            password_hash: hash_password(&request.password)?,
            full_name: request.full_name,
            phone_number: request.phone_number,
            address: request.address,
            role: UserRole::Customer,
        };

        let user = self.users.create(&new_user).await.map_err(|e| match e {
            RepositoryError::Conflict(_) => AuthError::UserAlreadyExists("User already exists"),
            other => AuthError::Repository(other),
        })?;

        let token = self.keys.issue(&user)?;
        Ok((user, token))
    }

    /// Log in with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` for an unknown email or wrong password.
    /// Returns `AuthError::AccountDisabled` if the account is not active.
    pub async fn login(&self, email: &str, password: &str) -> Result<(User, String), AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;

        let user = self
            .users
            .get_by_email(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &user.password_hash)?;

        if user.status != UserStatus::Active {
            return Err(AuthError::AccountDisabled);
        }

        self.users.touch_last_login(user.id).await?;
        let token = self.keys.issue(&user)?;
        Ok((user, token))
    }

    /// Resolve a bearer token to its active account.
    ///
    /// The account is reloaded so role, status, and email changes take effect
    /// immediately instead of at token expiry.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidToken` for a bad token.
    /// Returns `AuthError::StaleToken` if the account is gone, disabled, or
    /// changed email since the token was issued.
    pub async fn authenticate(&self, token: &str) -> Result<User, AuthError> {
        let claims = self.keys.verify(token)?;

        let user = self
            .users
            .get_by_id(claims.user_id)
            .await?
            .ok_or(AuthError::StaleToken)?;

        if user.status != UserStatus::Active || user.email.as_str() != claims.sub {
            return Err(AuthError::StaleToken);
        }

        Ok(user)
    }
}

/// Trim and length-check a username.
///
/// # Errors
///
/// Returns `AuthError::InvalidUsername` outside 3-50 characters.
pub fn validate_username(username: &str) -> Result<String, AuthError> {
    let username = username.trim();
    let len = username.chars().count();
    if !USERNAME_LENGTH.contains(&len) {
        return Err(AuthError::InvalidUsername(format!(
            "username must be between {} and {} characters",
            USERNAME_LENGTH.start(),
            USERNAME_LENGTH.end()
        )));
    }
    Ok(username.to_owned())
}

/// Validate password meets requirements.
///
/// # Errors
///
/// Returns `AuthError::WeakPassword` for passwords shorter than the minimum.
pub fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }

    Ok(())
}

/// Hash a password using Argon2id.
///
/// # Errors
///
/// Returns `AuthError::PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("test123").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("test123", &hash).is_ok());
        assert!(matches!(
            verify_password("test124", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_garbage_hash_is_invalid_credentials() {
        assert!(matches!(
            verify_password("test123", "not-a-hash"),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_password_length() {
        assert!(validate_password("12345").is_err());
        assert!(validate_password("123456").is_ok());
    }

    #[test]
    fn test_username_length() {
        assert!(validate_username("ab").is_err());
        assert_eq!(validate_username("  kim ").unwrap(), "kim");
        assert!(validate_username(&"x".repeat(51)).is_err());
        assert!(validate_username("김고객님").is_ok());
    }
}
