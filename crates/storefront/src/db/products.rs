//! Product repository for database operations.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder};

use scatch_core::{Category, ProductId};

use super::RepositoryError;
use crate::models::{Product, ProductFilter, ProductImage, ProductInput};

/// Columns selected for a [`ProductRow`].
macro_rules! product_columns {
    () => {
        "id, name, description, price, discount_price, category, stock_quantity, \
         images, featured, created_at, updated_at"
    };
}

/// Row type for the `products` table.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ProductRow {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub discount_price: Decimal,
    pub category: Category,
    pub stock_quantity: i32,
    pub images: Json<Vec<ProductImage>>,
    pub featured: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            description: row.description,
            price: row.price,
            discount_price: row.discount_price,
            category: row.category,
            stock_quantity: row.stock_quantity,
            images: row.images.0,
            featured: row.featured,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Escape `%`, `_` and `\` for use inside an `ILIKE` pattern.
fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Repository for product database operations.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List products matching a filter, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, filter: &ProductFilter) -> Result<Vec<Product>, RepositoryError> {
        let mut query: QueryBuilder<'_, Postgres> = QueryBuilder::new(concat!(
            "SELECT ",
            product_columns!(),
            " FROM products WHERE TRUE"
        ));

        if let Some(category) = filter.category {
            query.push(" AND category = ").push_bind(category);
        }
        if let Some(search) = filter.search.as_deref() {
            let pattern = format!("%{}%", escape_like(search));
            query
                .push(" AND (name ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR description ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
        if filter.in_stock_only {
            query.push(" AND stock_quantity > 0");
        }
        query.push(" ORDER BY created_at DESC, id DESC");
        if let Some(limit) = filter.limit {
            query.push(" LIMIT ").push_bind(limit);
        }

        let rows = query
            .build_query_as::<ProductRow>()
            .fetch_all(self.pool)
            .await?;
        Ok(rows.into_iter().map(Product::from).collect())
    }

    /// Count in-stock products per category, including empty categories.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn category_counts(&self) -> Result<Vec<(Category, i64)>, RepositoryError> {
        let rows: Vec<(Category, i64)> = sqlx::query_as(
            r"
            SELECT category, COUNT(*)
            FROM products
            WHERE stock_quantity > 0
            GROUP BY category
            ",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(Category::ALL
            .into_iter()
            .map(|category| {
                let count = rows
                    .iter()
                    .find(|(c, _)| *c == category)
                    .map_or(0, |(_, count)| *count);
                (category, count)
            })
            .collect())
    }

    /// Get a product by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row: Option<ProductRow> = sqlx::query_as(concat!(
            "SELECT ",
            product_columns!(),
            " FROM products WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(row.map(Product::from))
    }

    /// Insert a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(&self, input: &ProductInput) -> Result<Product, RepositoryError> {
        let row: ProductRow = sqlx::query_as(concat!(
            r"
            INSERT INTO products
                (name, description, price, discount_price, category, stock_quantity, images, featured)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING ",
            product_columns!()
        ))
        .bind(input.name.trim())
        .bind(&input.description)
        .bind(input.price)
        .bind(input.discount_price)
        .bind(input.category)
        .bind(input.stock_quantity)
        .bind(Json(input.images.clone()))
        .bind(input.featured)
        .fetch_one(self.pool)
        .await?;
        Ok(row.into())
    }

    /// Replace a product's editable fields.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn update(
        &self,
        id: ProductId,
        input: &ProductInput,
    ) -> Result<Product, RepositoryError> {
        let row: Option<ProductRow> = sqlx::query_as(concat!(
            r"
            UPDATE products
            SET name = $2, description = $3, price = $4, discount_price = $5,
                category = $6, stock_quantity = $7, images = $8, featured = $9,
                updated_at = now()
            WHERE id = $1
            RETURNING ",
            product_columns!()
        ))
        .bind(id)
        .bind(input.name.trim())
        .bind(&input.description)
        .bind(input.price)
        .bind(input.discount_price)
        .bind(input.category)
        .bind(input.stock_quantity)
        .bind(Json(input.images.clone()))
        .bind(input.featured)
        .fetch_optional(self.pool)
        .await?;
        row.map(Product::from).ok_or(RepositoryError::NotFound)
    }

    /// Hard-delete a product. Cart lines cascade; order snapshots remain.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn delete(&self, id: ProductId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Set every sold-out product to `quantity` units.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn restock_empty(&self, quantity: i32) -> Result<u64, RepositoryError> {
        let result = sqlx::query(
            "UPDATE products SET stock_quantity = $1, updated_at = now() WHERE stock_quantity = 0",
        )
        .bind(quantity)
        .execute(self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}
