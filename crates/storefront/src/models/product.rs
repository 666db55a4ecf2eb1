//! Catalog product types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use scatch_core::{Category, ProductId, pricing};

/// A product image reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductImage {
    pub url: String,
    /// Identifier at the image host, used when the image is replaced.
    #[serde(default)]
    pub public_id: String,
    #[serde(default)]
    pub is_primary: bool,
}

/// A catalog product (domain type).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    /// Zero means no discount.
    pub discount_price: Decimal,
    pub category: Category,
    pub stock_quantity: i32,
    /// Ordered; at most one is primary.
    pub images: Vec<ProductImage>,
    pub featured: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Unit price the shopper pays.
    #[must_use]
    pub fn effective_price(&self) -> Decimal {
        pricing::effective_price(self.price, self.discount_price)
    }

    #[must_use]
    pub fn has_discount(&self) -> bool {
        self.discount_price > Decimal::ZERO && self.discount_price < self.price
    }

    #[must_use]
    pub fn discount_percentage(&self) -> u32 {
        pricing::discount_percentage(self.price, self.discount_price)
    }

    #[must_use]
    pub const fn in_stock(&self) -> bool {
        self.stock_quantity > 0
    }

    /// The primary image, or the first one when none is flagged.
    #[must_use]
    pub fn primary_image(&self) -> Option<&ProductImage> {
        self.images
            .iter()
            .find(|image| image.is_primary)
            .or_else(|| self.images.first())
    }

    /// Case-insensitive match against name and description.
    #[must_use]
    pub fn matches_search(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        self.name.to_lowercase().contains(&needle)
            || self.description.to_lowercase().contains(&needle)
    }
}

/// Why a product create/update was rejected.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProductValidationError {
    #[error("Product name is required.")]
    MissingName,
    #[error("Price cannot be negative.")]
    NegativePrice,
    #[error("Prices need at most 2 decimal places and must be under 10,000,000,000.")]
    UnstorableAmount,
    #[error("Discount price must be below the regular price.")]
    DiscountNotBelowPrice,
    #[error("Stock quantity cannot be negative.")]
    NegativeStock,
}

/// Fields an admin supplies when creating or editing a product.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductInput {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Decimal,
    #[serde(default)]
    pub discount_price: Decimal,
    pub category: Category,
    #[serde(default)]
    pub stock_quantity: i32,
    #[serde(default)]
    pub images: Vec<ProductImage>,
    #[serde(default)]
    pub featured: bool,
}

impl ProductInput {
    /// Check the catalog invariants.
    ///
    /// # Errors
    ///
    /// Returns the first violated rule.
    pub fn validate(&self) -> Result<(), ProductValidationError> {
        if self.name.trim().is_empty() {
            return Err(ProductValidationError::MissingName);
        }
        if self.price < Decimal::ZERO {
            return Err(ProductValidationError::NegativePrice);
        }
        if !fits_money_column(self.price) || !fits_money_column(self.discount_price) {
            return Err(ProductValidationError::UnstorableAmount);
        }
        if self.discount_price < Decimal::ZERO
            || (self.discount_price > Decimal::ZERO && self.discount_price >= self.price)
        {
            return Err(ProductValidationError::DiscountNotBelowPrice);
        }
        if self.stock_quantity < 0 {
            return Err(ProductValidationError::NegativeStock);
        }
        Ok(())
    }

    /// Keep exactly one primary image when any exist.
    pub fn normalize_images(&mut self) {
        let primary = self
            .images
            .iter()
            .position(|image| image.is_primary)
            .unwrap_or(0);
        for (index, image) in self.images.iter_mut().enumerate() {
            image.is_primary = index == primary;
        }
    }
}

/// Amounts are stored as `NUMERIC(12, 2)`.
fn fits_money_column(amount: Decimal) -> bool {
    amount.normalize().scale() <= 2 && amount.abs() < Decimal::from(10_000_000_000_i64)
}

/// Catalog listing filter.
#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    pub category: Option<Category>,
    /// Case-insensitive substring of name or description.
    pub search: Option<String>,
    /// Only products with stock on hand.
    pub in_stock_only: bool,
    pub limit: Option<i64>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn input() -> ProductInput {
        ProductInput {
            name: "Canvas Backpack".into(),
            description: "Everyday carry".into(),
            price: Decimal::from(100),
            discount_price: Decimal::ZERO,
            category: Category::Backpacks,
            stock_quantity: 3,
            images: vec![],
            featured: false,
        }
    }

    #[test]
    fn test_validate_accepts_plain_product() {
        assert!(input().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_discount_at_or_above_price() {
        let product = ProductInput {
            discount_price: Decimal::from(100),
            ..input()
        };
        assert_eq!(
            product.validate(),
            Err(ProductValidationError::DiscountNotBelowPrice)
        );
    }

    #[test]
    fn test_validate_rejects_amounts_the_column_cannot_hold() {
        // Both round to 10.00 in storage.
        let product = ProductInput {
            price: Decimal::new(10_004, 3),
            discount_price: Decimal::new(10_001, 3),
            ..input()
        };
        assert_eq!(product.validate(), Err(ProductValidationError::UnstorableAmount));

        let product = ProductInput {
            price: Decimal::from(10_000_000_000_i64),
            ..input()
        };
        assert_eq!(product.validate(), Err(ProductValidationError::UnstorableAmount));

        // Trailing zeros are fine.
        let product = ProductInput {
            price: Decimal::new(49_990, 3),
            ..input()
        };
        assert!(product.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_negative_stock_and_blank_name() {
        let product = ProductInput {
            stock_quantity: -1,
            ..input()
        };
        assert_eq!(product.validate(), Err(ProductValidationError::NegativeStock));

        let product = ProductInput {
            name: "   ".into(),
            ..input()
        };
        assert_eq!(product.validate(), Err(ProductValidationError::MissingName));
    }

    #[test]
    fn test_normalize_images_keeps_one_primary() {
        let image = |url: &str, is_primary| ProductImage {
            url: url.into(),
            public_id: String::new(),
            is_primary,
        };
        let mut product = ProductInput {
            images: vec![image("a", false), image("b", true), image("c", true)],
            ..input()
        };
        product.normalize_images();
        let flags: Vec<bool> = product.images.iter().map(|i| i.is_primary).collect();
        assert_eq!(flags, vec![false, true, false]);

        let mut product = ProductInput {
            images: vec![image("a", false), image("b", false)],
            ..input()
        };
        product.normalize_images();
        assert!(product.images.first().unwrap().is_primary);
    }
}
