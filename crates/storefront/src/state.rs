//! Application state shared across handlers.

use std::sync::Arc;

use thiserror::Error;

use crate::config::{DatabaseTarget, StorefrontConfig};
use crate::db::{self, MemoryStore, PgStore, Store, UnavailableStore, seed};
use crate::services::TokenKeys;

/// Error building the application state.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("invalid database url: {0}")]
    Database(#[from] sqlx::Error),
    #[error("demo catalog: {0}")]
    Seed(#[from] seed::SeedError),
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// the store, signing keys and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    store: Arc<dyn Store>,
    tokens: TokenKeys,
}

impl AppState {
    /// Create state around an existing store.
    #[must_use]
    pub fn new(config: StorefrontConfig, store: Arc<dyn Store>) -> Self {
        let tokens = TokenKeys::new(&config.token_secret);
        Self {
            inner: Arc::new(AppStateInner {
                config,
                store,
                tokens,
            }),
        }
    }

    /// Build the store the configuration asks for.
    ///
    /// A missing database is not fatal: the server starts in degraded mode
    /// and data operations fail per request.
    ///
    /// # Errors
    ///
    /// Returns an error if the database URL cannot be parsed or the demo
    /// catalog is malformed.
    pub fn from_config(config: StorefrontConfig) -> Result<Self, StateError> {
        let store: Arc<dyn Store> = match &config.database.target {
            DatabaseTarget::Postgres(url) => {
                let pool = db::create_pool(url, &config.database)?;
                Arc::new(PgStore::new(pool))
            }
            DatabaseTarget::Memory => {
                let catalog = seed::demo_catalog()?;
                Arc::new(MemoryStore::with_catalog(&catalog))
            }
            DatabaseTarget::Unavailable => {
                tracing::warn!("no database configured, starting in degraded mode");
                Arc::new(UnavailableStore)
            }
        };

        tracing::info!(backend = store.backend(), "store ready");
        Ok(Self::new(config, store))
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// The storage backend.
    #[must_use]
    pub fn store(&self) -> &dyn Store {
        self.inner.store.as_ref()
    }

    /// Token signing keys.
    #[must_use]
    pub fn tokens(&self) -> &TokenKeys {
        &self.inner.tokens
    }
}
