//! Storage for the storefront.
//!
//! Everything the services need goes through the [`Store`] trait. Three
//! backends implement it:
//!
//! - [`PgStore`] - `PostgreSQL` via the table repositories in this module
//! - [`MemoryStore`] - in-process maps behind a mutex (tests, `memory://`)
//! - [`UnavailableStore`] - degraded mode when no database is configured
//!
//! ## Tables
//!
//! - `products` - Catalog
//! - `users` - Shopper accounts and saved address
//! - `owners` - Back-office accounts
//! - `cart_items` - One row per (user, product) cart line
//! - `orders` / `order_items` - Immutable order snapshots
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p scatch-cli -- migrate
//! ```

pub mod admins;
pub mod carts;
pub mod memory;
pub mod orders;
pub mod postgres;
pub mod products;
pub mod seed;
pub mod store;
pub mod users;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use crate::config::DatabaseConfig;

pub use admins::AdminRepository;
pub use carts::CartRepository;
pub use memory::MemoryStore;
pub use orders::OrderRepository;
pub use postgres::PgStore;
pub use products::ProductRepository;
pub use store::{PlaceOrderError, StatusChangeError, Store, UnavailableStore};
pub use users::UserRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),

    /// No database is configured.
    #[error("database unavailable")]
    Unavailable,
}

/// Map unique-constraint violations to [`RepositoryError::Conflict`].
pub(crate) fn conflict_on_unique(message: &str) -> impl FnOnce(sqlx::Error) -> RepositoryError + '_ {
    move |e| {
        if let sqlx::Error::Database(ref db_err) = e
            && db_err.is_unique_violation()
        {
            return RepositoryError::Conflict(message.to_owned());
        }
        RepositoryError::Database(e)
    }
}

/// Create a lazily-connecting `PostgreSQL` pool.
///
/// No connection is opened until the first query, so a database that is down
/// at boot only fails the requests that need it.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection string cannot be parsed.
pub fn create_pool(
    database_url: &secrecy::SecretString,
    config: &DatabaseConfig,
) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(0)
        .acquire_timeout(config.connect_timeout)
        .idle_timeout(config.idle_timeout)
        .connect_lazy(database_url.expose_secret())
}
