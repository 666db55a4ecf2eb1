//! Catalog seeding command.
//!
//! Reads products from a YAML file (the bundled demo catalog by default) and
//! inserts them when the catalog is empty.

use std::path::Path;

use thiserror::Error;
use tracing::info;

use scatch_storefront::db::{PgStore, RepositoryError, Store, seed};

use super::{CommandError, connect};

/// Units given to each sold-out product by `--restock`.
pub const RESTOCK_QUANTITY: i32 = 10;

/// Errors from seeding.
#[derive(Debug, Error)]
pub enum SeedCommandError {
    #[error(transparent)]
    Connect(#[from] CommandError),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Could not read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error(transparent)]
    Seed(#[from] seed::SeedError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Seed the catalog, optionally restocking sold-out products afterwards.
///
/// # Errors
///
/// Returns an error if the file is missing or invalid, or the database
/// fails. The file is validated before connecting.
pub async fn catalog(file_path: Option<&str>, restock: bool) -> Result<(), SeedCommandError> {
    let products = match file_path {
        Some(file_path) => {
            let path = Path::new(file_path);
            if !path.exists() {
                return Err(SeedCommandError::FileNotFound(file_path.to_owned()));
            }
            info!(path = %file_path, "Loading catalog from file");
            let content = tokio::fs::read_to_string(path)
                .await
                .map_err(|source| SeedCommandError::Read {
                    path: file_path.to_owned(),
                    source,
                })?;
            seed::parse_catalog(&content)?
        }
        None => {
            info!("Loading bundled demo catalog");
            seed::demo_catalog()?
        }
    };
    info!(products = products.len(), "Catalog validated");

    let store = PgStore::new(connect().await?);

    let inserted = seed::seed_if_empty(&store, &products).await?;
    info!("  Products inserted: {inserted}");

    if restock {
        let restocked = store.restock_empty_products(RESTOCK_QUANTITY).await?;
        info!("  Products restocked to {RESTOCK_QUANTITY}: {restocked}");
    }

    info!("Seeding complete!");
    Ok(())
}
