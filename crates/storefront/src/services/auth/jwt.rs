//! Bearer tokens.
//!
//! Tokens are HS256 JWTs. The subject is the account email; `userId` and
//! `role` ride along so most requests never need the email lookup.

use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};

use shoplite_core::{UserId, UserRole};

use super::AuthError;
use crate::config::JwtConfig;
use crate::models::user::User;

/// Claims carried by every token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    /// Account email.
    pub sub: String,
    pub user_id: UserId,
    pub role: UserRole,
    pub iat: i64,
    pub exp: i64,
}

/// Signing and verification keys derived from the configured secret.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    expiration: Duration,
}

impl std::fmt::Debug for JwtKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtKeys")
            .field("expiration", &self.expiration)
            .finish_non_exhaustive()
    }
}

impl JwtKeys {
    /// Build keys from configuration.
    #[must_use]
    pub fn new(config: &JwtConfig) -> Self {
        let secret = config.secret.expose_secret().as_bytes();
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            expiration: config.expiration,
        }
    }

    /// Sign a token for `user`, valid for the configured lifetime.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::TokenCreation` if signing fails.
    pub fn issue(&self, user: &User) -> Result<String, AuthError> {
        let now = Utc::now().timestamp();
        let lifetime = i64::try_from(self.expiration.as_secs()).unwrap_or(i64::MAX);
        let claims = Claims {
            sub: user.email.as_str().to_owned(),
            user_id: user.id,
            role: user.role,
            iat: now,
            exp: now.saturating_add(lifetime),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(AuthError::TokenCreation)
    }

    /// Check signature and expiry, returning the claims.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidToken` for a malformed, forged, or expired token.
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(AuthError::InvalidToken)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use secrecy::SecretString;

    use shoplite_core::{Email, UserStatus};

    use super::*;

    fn keys(secret: &str) -> JwtKeys {
        JwtKeys::new(&JwtConfig {
            secret: SecretString::from(secret.to_owned()),
            expiration: Duration::from_secs(3600),
        })
    }

    fn user() -> User {
        User {
            id: UserId::new(7),
            username: "customer".to_owned(),
            email: Email::parse("customer@test.com").unwrap(),
            password_hash: String::new(),
            full_name: None,
            phone_number: None,
            address: None,
            role: UserRole::Customer,
            status: UserStatus::Active,
            last_login: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_issue_then_verify() {
        let keys = keys("k7#Qz9!vR2@mL5$xW8^pT1&nB4*cY6%d");
        let token = keys.issue(&user()).unwrap();
        let claims = keys.verify(&token).unwrap();

        assert_eq!(claims.sub, "customer@test.com");
        assert_eq!(claims.user_id, UserId::new(7));
        assert_eq!(claims.role, UserRole::Customer);
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn test_claims_use_camel_case() {
        let keys = keys("k7#Qz9!vR2@mL5$xW8^pT1&nB4*cY6%d");
        let token = keys.issue(&user()).unwrap();
        let payload = token.split('.').nth(1).unwrap();
        let json = base64::Engine::decode(
            &base64::engine::general_purpose::URL_SAFE_NO_PAD,
            payload,
        )
        .unwrap();
        let value: serde_json::Value = serde_json::from_slice(&json).unwrap();
        assert_eq!(value["userId"], 7);
        assert_eq!(value["role"], "CUSTOMER");
    }

    #[test]
    fn test_rejects_other_secret() {
        let token = keys("k7#Qz9!vR2@mL5$xW8^pT1&nB4*cY6%d")
            .issue(&user())
            .unwrap();
        let result = keys("Zp4&uW1!eT8#rY3@oI6^aS9*dF2%gH5$").verify(&token);
        assert!(matches!(result, Err(AuthError::InvalidToken(_))));
    }

    #[test]
    fn test_rejects_expired() {
        let keys = keys("k7#Qz9!vR2@mL5$xW8^pT1&nB4*cY6%d");
        let past = Utc::now().timestamp() - 3600;
        let claims = Claims {
            sub: "customer@test.com".to_owned(),
            user_id: UserId::new(7),
            role: UserRole::Customer,
            iat: past - 60,
            exp: past,
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &keys.encoding).unwrap();
        assert!(keys.verify(&token).is_err());
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(keys("k7#Qz9!vR2@mL5$xW8^pT1&nB4*cY6%d").verify("not.a.jwt").is_err());
    }
}
