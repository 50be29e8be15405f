//! End-to-end tests for the `ShopLite` storefront API.
//!
//! # Running Tests
//!
//! ```bash
//! # Prepare a database with the demo data
//! cargo run -p shoplite-cli -- migrate
//! cargo run -p shoplite-cli -- seed
//!
//! # Start the server with simulated payments
//! TOSS_TEST_MODE=true cargo run -p shoplite-storefront
//!
//! # Run the ignored HTTP tests against it
//! cargo test -p shoplite-integration-tests -- --ignored
//! ```
//!
//! `SHOPLITE_BASE_URL` points the tests at another server
//! (default: `http://localhost:8080`).

use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde_json::{Value, json};
use uuid::Uuid;

/// Seeded administrator.
pub const ADMIN_EMAIL: &str = "admin@shoplite.com";
/// Password of [`ADMIN_EMAIL`].
pub const ADMIN_PASSWORD: &str = "admin123";

/// Base URL of the storefront under test.
#[must_use]
pub fn base_url() -> String {
    std::env::var("SHOPLITE_BASE_URL").unwrap_or_else(|_| "http://localhost:8080".to_string())
}

/// HTTP client plus the server location.
#[derive(Clone)]
pub struct TestContext {
    pub client: Client,
    pub base_url: String,
}

/// A logged-in account.
#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub user_id: i64,
    pub email: String,
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

impl TestContext {
    #[must_use]
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            base_url: base_url(),
        }
    }

    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Request without credentials.
    #[must_use]
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client.request(method, self.url(path))
    }

    /// Request carrying the session's bearer token.
    #[must_use]
    pub fn authed(&self, session: &Session, method: Method, path: &str) -> RequestBuilder {
        self.request(method, path).bearer_auth(&session.token)
    }

    /// Register a fresh customer with a unique username and email.
    ///
    /// # Panics
    ///
    /// Panics if signup does not return 201 with a token.
    pub async fn signup_customer(&self) -> Session {
        let suffix = Uuid::new_v4().simple().to_string();
        let suffix = suffix.get(..10).unwrap_or_default();
        let email = format!("it-{suffix}@example.com");

        let resp = self
            .request(Method::POST, "/api/auth/signup")
            .json(&json!({
                "username": format!("it_{suffix}"),
                "email": email,
                "password": "secret123",
                "fullName": "Integration Tester",
            }))
            .send()
            .await
            .expect("signup request failed");
        assert_eq!(resp.status(), StatusCode::CREATED);

        session_from(resp, email).await
    }

    /// Log in with existing credentials.
    ///
    /// # Panics
    ///
    /// Panics if login does not succeed.
    pub async fn login(&self, email: &str, password: &str) -> Session {
        let resp = self
            .request(Method::POST, "/api/auth/login")
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .expect("login request failed");
        assert_eq!(resp.status(), StatusCode::OK);

        session_from(resp, email.to_owned()).await
    }

    /// Log in as the seeded administrator.
    pub async fn admin(&self) -> Session {
        self.login(ADMIN_EMAIL, ADMIN_PASSWORD).await
    }

    /// First active product with at least `min_stock` units.
    ///
    /// # Panics
    ///
    /// Panics if the catalog has no such product.
    pub async fn product_in_stock(&self, min_stock: i64) -> Value {
        let products = json_body(
            self.request(Method::GET, "/api/products")
                .send()
                .await
                .expect("product list failed"),
        )
        .await;

        products
            .as_array()
            .expect("product list is not an array")
            .iter()
            .find(|p| p["stockQuantity"].as_i64().unwrap_or(0) >= min_stock)
            .cloned()
            .expect("no product with enough stock; run `shoplite-cli seed`")
    }
}

async fn session_from(resp: Response, email: String) -> Session {
    let body = json_body(resp).await;
    Session {
        token: body["token"].as_str().expect("missing token").to_owned(),
        user_id: body["id"].as_i64().expect("missing id"),
        email,
    }
}

/// Read a JSON body.
///
/// # Panics
///
/// Panics if the body is not JSON.
pub async fn json_body(resp: Response) -> Value {
    resp.json().await.expect("response body is not JSON")
}
