//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::StorefrontConfig;
use crate::services::CatalogCache;
use crate::services::auth::JwtKeys;
use crate::services::files::FileStore;
use crate::services::toss::{TossClient, TossError};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    pool: PgPool,
    jwt: JwtKeys,
    toss: TossClient,
    catalog: CatalogCache,
    files: FileStore,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if the Toss Payments client cannot be built.
    pub fn new(config: StorefrontConfig, pool: PgPool) -> Result<Self, TossError> {
        let jwt = JwtKeys::new(&config.jwt);
        let toss = TossClient::new(&config.toss)?;
        let files = FileStore::new(&config.uploads);

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                jwt,
                toss,
                catalog: CatalogCache::default(),
                files,
            }),
        })
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// JWT signing and verification keys.
    #[must_use]
    pub fn jwt(&self) -> &JwtKeys {
        &self.inner.jwt
    }

    /// Toss Payments API client.
    #[must_use]
    pub fn toss(&self) -> &TossClient {
        &self.inner.toss
    }

    /// In-memory cache for products and active categories.
    #[must_use]
    pub fn catalog(&self) -> &CatalogCache {
        &self.inner.catalog
    }

    /// Upload storage.
    #[must_use]
    pub fn files(&self) -> &FileStore {
        &self.inner.files
    }
}
