//! Catalog seeding from YAML.

use serde::Deserialize;
use thiserror::Error;

use super::{RepositoryError, Store};
use crate::models::{ProductFilter, ProductInput, ProductValidationError};

/// Demo catalog shipped with the crate.
pub const DEMO_CATALOG: &str = include_str!("../../seed/catalog.yaml");

/// Errors raised while loading or applying a seed file.
#[derive(Debug, Error)]
pub enum SeedError {
    #[error("invalid seed file: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("invalid product {name:?}: {source}")]
    Invalid {
        name: String,
        source: ProductValidationError,
    },
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    products: Vec<ProductInput>,
}

/// Parse and validate a catalog file.
///
/// # Errors
///
/// Returns `SeedError::Parse` for malformed YAML and `SeedError::Invalid` for
/// the first product that breaks a catalog rule.
pub fn parse_catalog(yaml: &str) -> Result<Vec<ProductInput>, SeedError> {
    let file: CatalogFile = serde_yaml::from_str(yaml)?;
    file.products
        .into_iter()
        .map(|mut product| {
            product.validate().map_err(|source| SeedError::Invalid {
                name: product.name.clone(),
                source,
            })?;
            product.normalize_images();
            Ok(product)
        })
        .collect()
}

/// The bundled demo catalog.
///
/// # Errors
///
/// Only fails if the bundled file is broken.
pub fn demo_catalog() -> Result<Vec<ProductInput>, SeedError> {
    parse_catalog(DEMO_CATALOG)
}

/// Insert `catalog` when the store has no products yet.
///
/// Returns how many products were inserted.
///
/// # Errors
///
/// Returns `SeedError::Repository` if the store fails.
pub async fn seed_if_empty(store: &dyn Store, catalog: &[ProductInput]) -> Result<usize, SeedError> {
    let existing = store
        .list_products(&ProductFilter {
            limit: Some(1),
            ..ProductFilter::default()
        })
        .await?;
    if !existing.is_empty() {
        tracing::info!("Catalog already populated, skipping seed");
        return Ok(0);
    }

    for product in catalog {
        store.create_product(product).await?;
    }
    tracing::info!(count = catalog.len(), "Seeded catalog");
    Ok(catalog.len())
}
