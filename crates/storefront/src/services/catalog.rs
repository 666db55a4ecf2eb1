//! Catalog service: shop listings and admin product management.

use thiserror::Error;
use tracing::instrument;

use scatch_core::{Category, ProductId};

use crate::db::{RepositoryError, Store};
use crate::models::{Product, ProductFilter, ProductInput, ProductValidationError};

/// Number of products on the new arrivals page.
pub const NEW_ARRIVALS_LIMIT: i64 = 10;

/// Errors from catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Product not found!")]
    NotFound,

    #[error(transparent)]
    Invalid(#[from] ProductValidationError),

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// What the shop page lists.
#[derive(Debug, Clone)]
pub struct ShopListing {
    pub products: Vec<Product>,
    /// In-stock counts per category, in display order.
    pub category_counts: Vec<(Category, i64)>,
    /// The category filter that was applied, if it named a real category.
    pub category: Option<Category>,
    pub search: Option<String>,
}

/// Catalog service.
pub struct CatalogService<'a> {
    store: &'a dyn Store,
}

impl<'a> CatalogService<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn Store) -> Self {
        Self { store }
    }

    /// In-stock products, newest first.
    ///
    /// An unknown category is ignored rather than rejected; blank searches
    /// are dropped.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the store fails.
    #[instrument(skip(self))]
    pub async fn shop(
        &self,
        category: Option<&str>,
        search: Option<&str>,
    ) -> Result<ShopListing, CatalogError> {
        let category = category.and_then(|raw| raw.parse::<Category>().ok());
        let search = search
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_owned);

        let products = self
            .store
            .list_products(&ProductFilter {
                category,
                search: search.clone(),
                in_stock_only: true,
                limit: None,
            })
            .await?;
        let category_counts = self.store.category_counts().await?;

        Ok(ShopListing {
            products,
            category_counts,
            category,
            search,
        })
    }

    /// The latest in-stock products.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the store fails.
    pub async fn new_arrivals(&self) -> Result<Vec<Product>, CatalogError> {
        Ok(self
            .store
            .list_products(&ProductFilter {
                in_stock_only: true,
                limit: Some(NEW_ARRIVALS_LIMIT),
                ..ProductFilter::default()
            })
            .await?)
    }

    /// Every product, stocked or not, for the back office.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the store fails.
    pub async fn all_products(&self) -> Result<Vec<Product>, CatalogError> {
        Ok(self.store.list_products(&ProductFilter::default()).await?)
    }

    /// # Errors
    ///
    /// `NotFound` if no product has this id.
    pub async fn get_product(&self, id: ProductId) -> Result<Product, CatalogError> {
        self.store
            .get_product(id)
            .await?
            .ok_or(CatalogError::NotFound)
    }

    /// # Errors
    ///
    /// `Invalid` if the input breaks a catalog rule.
    #[instrument(skip_all, fields(name = %input.name))]
    pub async fn create_product(&self, mut input: ProductInput) -> Result<Product, CatalogError> {
        input.validate()?;
        input.normalize_images();
        let product = self.store.create_product(&input).await?;
        tracing::info!(product_id = %product.id, "product created");
        Ok(product)
    }

    /// # Errors
    ///
    /// `Invalid` if the input breaks a catalog rule, `NotFound` for an
    /// unknown product.
    #[instrument(skip(self, input), fields(product_id = %id))]
    pub async fn update_product(
        &self,
        id: ProductId,
        mut input: ProductInput,
    ) -> Result<Product, CatalogError> {
        input.validate()?;
        input.normalize_images();
        self.store
            .update_product(id, &input)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => CatalogError::NotFound,
                other => CatalogError::Repository(other),
            })
    }

    /// Hard delete.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown product.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn delete_product(&self, id: ProductId) -> Result<(), CatalogError> {
        if self.store.delete_product(id).await? {
            tracing::info!("product deleted");
            Ok(())
        } else {
            Err(CatalogError::NotFound)
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use crate::db::MemoryStore;

    use super::*;

    fn bag(name: &str, category: Category, stock: i32) -> ProductInput {
        ProductInput {
            name: name.into(),
            description: format!("{name} in soft leather"),
            price: Decimal::from(120),
            discount_price: Decimal::ZERO,
            category,
            stock_quantity: stock,
            images: vec![],
            featured: false,
        }
    }

    fn store() -> MemoryStore {
        MemoryStore::with_catalog(&[
            bag("Trail Backpack", Category::Backpacks, 3),
            bag("City Tote", Category::Handbags, 0),
            bag("Evening Clutch", Category::Clutches, 2),
            bag("Canvas Backpack", Category::Backpacks, 1),
        ])
    }

    #[tokio::test]
    async fn test_shop_lists_in_stock_newest_first() {
        let store = store();
        let listing = CatalogService::new(&store).shop(None, None).await.unwrap();

        let names: Vec<_> = listing.products.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["Canvas Backpack", "Evening Clutch", "Trail Backpack"]);
        assert_eq!(
            listing.category_counts,
            vec![
                (Category::Backpacks, 2),
                (Category::Handbags, 0),
                (Category::Clutches, 1)
            ]
        );
    }

    #[tokio::test]
    async fn test_shop_filters() {
        let store = store();
        let catalog = CatalogService::new(&store);

        let backpacks = catalog.shop(Some("backpacks"), None).await.unwrap();
        assert_eq!(backpacks.category, Some(Category::Backpacks));
        assert_eq!(backpacks.products.len(), 2);

        let bogus = catalog.shop(Some("suitcases"), None).await.unwrap();
        assert_eq!(bogus.category, None);
        assert_eq!(bogus.products.len(), 3);

        let searched = catalog.shop(None, Some("  CLUTCH ")).await.unwrap();
        assert_eq!(searched.search.as_deref(), Some("CLUTCH"));
        assert_eq!(searched.products.len(), 1);
    }

    #[tokio::test]
    async fn test_admin_product_management() {
        let store = store();
        let catalog = CatalogService::new(&store);

        let mut bad = bag("Broken", Category::Clutches, 1);
        bad.discount_price = Decimal::from(500);
        assert!(matches!(
            catalog.create_product(bad).await,
            Err(CatalogError::Invalid(
                ProductValidationError::DiscountNotBelowPrice
            ))
        ));

        let created = catalog
            .create_product(bag("Mini Clutch", Category::Clutches, 4))
            .await
            .unwrap();
        assert_eq!(catalog.all_products().await.unwrap().len(), 5);

        catalog.delete_product(created.id).await.unwrap();
        assert!(matches!(
            catalog.get_product(created.id).await,
            Err(CatalogError::NotFound)
        ));
        assert!(matches!(
            catalog.delete_product(created.id).await,
            Err(CatalogError::NotFound)
        ));
        assert!(matches!(
            catalog
                .update_product(created.id, bag("Ghost", Category::Clutches, 1))
                .await,
            Err(CatalogError::NotFound)
        ));
    }
}
