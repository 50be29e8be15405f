//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `SHOPLITE_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `JWT_SECRET` - HMAC signing secret for access tokens (min 32 chars, high entropy)
//! - `TOSS_SECRET_KEY` - Toss Payments secret key (server-side only)
//! - `TOSS_CLIENT_KEY` - Toss Payments client key (handed to the browser widget)
//!
//! ## Optional
//! - `SHOPLITE_HOST` - Bind address (default: 127.0.0.1)
//! - `SHOPLITE_PORT` - Listen port (default: 8080)
//! - `JWT_EXPIRATION_MS` - Token lifetime in milliseconds (default: 86400000, 24h)
//! - `TOSS_API_URL` - Payments API base (default: <https://api.tosspayments.com/v1/payments>)
//! - `TOSS_TEST_MODE` - Approve and cancel payments locally without calling Toss (default: false)
//! - `UPLOAD_DIR` - Directory for uploaded images (default: uploads)
//! - `UPLOAD_MAX_FILE_SIZE` - Max bytes per uploaded file (default: 5242880)
//! - `UPLOAD_MAX_FILES` - Max files per multi-upload request (default: 10)
//! - `CORS_ALLOWED_ORIGINS` - Comma-separated origins; unset mirrors any origin
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Transaction sample rate (default: 0.1)

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use url::Url;

const MIN_JWT_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Default Toss Payments endpoint for payment confirmation and cancellation.
pub const DEFAULT_TOSS_API_URL: &str = "https://api.tosspayments.com/v1/payments";

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Access token settings
    pub jwt: JwtConfig,
    /// Toss Payments settings
    pub toss: TossConfig,
    /// Image upload settings
    pub uploads: UploadConfig,
    /// Allowed CORS origins (empty means mirror the request origin)
    pub cors_allowed_origins: Vec<String>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate
    pub sentry_sample_rate: f32,
    /// Sentry transaction sample rate
    pub sentry_traces_sample_rate: f32,
}

/// JWT signing configuration.
#[derive(Clone)]
pub struct JwtConfig {
    /// HMAC secret
    pub secret: SecretString,
    /// Token lifetime
    pub expiration: Duration,
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"[REDACTED]")
            .field("expiration", &self.expiration)
            .finish()
    }
}

/// Toss Payments configuration.
///
/// Implements `Debug` manually to redact the secret key.
#[derive(Clone)]
pub struct TossConfig {
    /// Secret key used for Basic auth against the payments API
    pub secret_key: SecretString,
    /// Client key exposed to the checkout widget
    pub client_key: String,
    /// Payments API base URL (no trailing slash)
    pub api_url: Url,
    /// Skip provider calls and approve locally
    pub test_mode: bool,
}

impl std::fmt::Debug for TossConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TossConfig")
            .field("secret_key", &"[REDACTED]")
            .field("client_key", &self.client_key)
            .field("api_url", &self.api_url.as_str())
            .field("test_mode", &self.test_mode)
            .finish()
    }
}

/// Local-disk image upload configuration.
#[derive(Debug, Clone)]
pub struct UploadConfig {
    /// Directory uploaded files are written to
    pub dir: PathBuf,
    /// Max bytes per file
    pub max_file_size: usize,
    /// Max files per multi-upload request
    pub max_files: usize,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("uploads"),
            max_file_size: 5 * 1024 * 1024,
            max_files: 10,
        }
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if the JWT secret fails validation (length, placeholder detection, entropy).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("SHOPLITE_DATABASE_URL")?;
        let host = parse_env("SHOPLITE_HOST", "127.0.0.1")?;
        let port = parse_env("SHOPLITE_PORT", "8080")?;

        let jwt = JwtConfig::from_env()?;
        let toss = TossConfig::from_env()?;
        let uploads = UploadConfig::from_env()?;

        let cors_allowed_origins = get_optional_env("CORS_ALLOWED_ORIGINS")
            .map(|raw| split_list(&raw))
            .unwrap_or_default();

        Ok(Self {
            database_url,
            host,
            port,
            jwt,
            toss,
            uploads,
            cors_allowed_origins,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sentry_sample_rate: parse_env("SENTRY_SAMPLE_RATE", "1.0")?,
            sentry_traces_sample_rate: parse_env("SENTRY_TRACES_SAMPLE_RATE", "0.1")?,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl JwtConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let secret = get_validated_secret("JWT_SECRET")?;
        validate_secret_length(&secret, "JWT_SECRET")?;
        let expiration_ms: u64 = parse_env("JWT_EXPIRATION_MS", "86400000")?;

        Ok(Self {
            secret,
            expiration: Duration::from_millis(expiration_ms),
        })
    }
}

impl TossConfig {
    fn from_env() -> Result<Self, ConfigError> {
        // Toss keys are issued by the provider (`test_sk_...`, `live_sk_...`), so they
        // are not run through the entropy check.
        let secret_key = get_required_env("TOSS_SECRET_KEY").map(SecretString::from)?;
        let client_key = get_required_env("TOSS_CLIENT_KEY")?;

        let raw_url = get_env_or_default("TOSS_API_URL", DEFAULT_TOSS_API_URL);
        let api_url = Url::parse(raw_url.trim_end_matches('/'))
            .map_err(|e| ConfigError::InvalidEnvVar("TOSS_API_URL".to_string(), e.to_string()))?;

        let test_mode = parse_bool_env("TOSS_TEST_MODE", false)?;

        Ok(Self {
            secret_key,
            client_key,
            api_url,
            test_mode,
        })
    }
}

impl UploadConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            dir: get_optional_env("UPLOAD_DIR").map_or(defaults.dir, PathBuf::from),
            max_file_size: parse_env("UPLOAD_MAX_FILE_SIZE", &defaults.max_file_size.to_string())?,
            max_files: parse_env("UPLOAD_MAX_FILES", &defaults.max_files.to_string())?,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    std::env::var(primary_key)
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable (empty counts as unset).
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Parse an environment variable (or its default) with `FromStr`.
fn parse_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Parse a boolean flag accepting `true/false`, `1/0`, `yes/no`.
fn parse_bool_env(key: &str, default: bool) -> Result<bool, ConfigError> {
    let Some(raw) = get_optional_env(key) else {
        return Ok(default);
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        other => Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("expected a boolean, got '{other}'"),
        )),
    }
}

/// Split a comma-separated list, dropping blanks.
fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Validate that a signing secret meets minimum length requirements.
fn validate_secret_length(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_JWT_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_JWT_SECRET_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.chars().count() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    if let Some(pattern) = PLACEHOLDER_PATTERNS.iter().find(|p| lower.contains(*p)) {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!("appears to be a placeholder (contains '{pattern}')"),
        ));
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
impl StorefrontConfig {
    /// Configuration for unit and router tests. Payments run in test mode and the
    /// database URL is never connected to eagerly.
    #[allow(clippy::unwrap_used)]
    pub(crate) fn for_tests() -> Self {
        Self {
            database_url: SecretString::from("postgres://localhost/shoplite_test"),
            host: "127.0.0.1".parse().unwrap(),
            port: 8080,
            jwt: JwtConfig {
                secret: SecretString::from("k7#Qz9!vR2@mL5$xW8^pT1&nB4*cY6%d"),
                expiration: Duration::from_secs(3600),
            },
            toss: TossConfig {
                secret_key: SecretString::from("test_sk_zXLkKEypNArWmo50nX3lmeaxYG5R"),
                client_key: "test_ck_D5GePWvyJnrK0W0k6q8gLzN97Eoq".to_string(),
                api_url: Url::parse(DEFAULT_TOSS_API_URL).unwrap(),
                test_mode: true,
            },
            uploads: UploadConfig::default(),
            cors_allowed_origins: Vec::new(),
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.0,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_shannon_entropy_bounds() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
        assert!((shannon_entropy("zzzzzz") - 0.0).abs() < f64::EPSILON);
        assert!((shannon_entropy("ab") - 1.0).abs() < 0.01);
        assert!(shannon_entropy("aB3$xY9!mK2@nL5#") > MIN_ENTROPY_BITS_PER_CHAR);
    }

    #[test]
    fn test_validate_secret_strength_rejects_placeholders() {
        let err = validate_secret_strength("your-jwt-signing-key", "JWT_SECRET").unwrap_err();
        assert!(matches!(err, ConfigError::InsecureSecret(_, _)));
        assert!(validate_secret_strength("changeme-please", "JWT_SECRET").is_err());
    }

    #[test]
    fn test_validate_secret_strength_rejects_low_entropy() {
        let err = validate_secret_strength(&"ab".repeat(20), "JWT_SECRET").unwrap_err();
        assert!(err.to_string().contains("entropy too low"));
    }

    #[test]
    fn test_validate_secret_strength_accepts_random() {
        assert!(validate_secret_strength("k7#Qz9!vR2@mL5$xW8^pT1&nB4*cY6%d", "JWT_SECRET").is_ok());
    }

    #[test]
    fn test_validate_secret_length() {
        assert!(validate_secret_length(&SecretString::from("short"), "JWT_SECRET").is_err());
        assert!(validate_secret_length(&SecretString::from("a".repeat(32)), "JWT_SECRET").is_ok());
    }

    #[test]
    fn test_split_list() {
        assert_eq!(
            split_list(" http://localhost:3000, ,https://shop.test "),
            vec!["http://localhost:3000", "https://shop.test"]
        );
        assert!(split_list("").is_empty());
    }

    #[test]
    fn test_socket_addr() {
        let addr = StorefrontConfig::for_tests().socket_addr();
        assert_eq!(addr.to_string(), "127.0.0.1:8080");
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let debug_output = format!("{:?}", StorefrontConfig::for_tests());

        assert!(debug_output.contains("test_ck_D5GePWvyJnrK0W0k6q8gLzN97Eoq"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("test_sk_zXLkKEypNArWmo50nX3lmeaxYG5R"));
        assert!(!debug_output.contains("k7#Qz9!vR2@mL5$xW8^pT1&nB4*cY6%d"));
    }
}
