//! Cart line repository.
//!
//! Each mutation is a single conditional statement (or a short row-locking
//! transaction), so concurrent requests for the same line never lose updates
//! and a line never exceeds the product's stock at the moment it is written.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use scatch_core::{ProductId, UserId};

use super::RepositoryError;
use super::products::ProductRow;
use crate::models::{CartIncrement, CartItem, CartMutation};

#[derive(Debug, sqlx::FromRow)]
struct CartItemRow {
    quantity: i32,
    added_at: DateTime<Utc>,
    #[sqlx(flatten)]
    product: ProductRow,
}

/// Repository for the `cart_items` table.
pub struct CartRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CartRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Lines joined with their products, in the order they were added.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn items(&self, user_id: UserId) -> Result<Vec<CartItem>, RepositoryError> {
        let rows: Vec<CartItemRow> = sqlx::query_as(
            r"
            SELECT c.quantity, c.added_at, p.*
            FROM cart_items c
            JOIN products p ON p.id = c.product_id
            WHERE c.user_id = $1
            ORDER BY c.added_at, p.id
            ",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| CartItem {
                product: row.product.into(),
                quantity: row.quantity,
                added_at: row.added_at,
            })
            .collect())
    }

    /// Add one unit of a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn increment(
        &self,
        user_id: UserId,
        product_id: ProductId,
        mode: CartIncrement,
    ) -> Result<CartMutation, RepositoryError> {
        let quantity: Option<i32> = match mode {
            CartIncrement::CreateIfMissing => {
                sqlx::query_scalar(
                    r"
                    INSERT INTO cart_items (user_id, product_id, quantity)
                    SELECT $1, p.id, 1
                    FROM products p
                    WHERE p.id = $2 AND p.stock_quantity >= 1
                    ON CONFLICT (user_id, product_id) DO UPDATE
                        SET quantity = cart_items.quantity + 1
                        WHERE cart_items.quantity + 1 <= (
                            SELECT stock_quantity FROM products WHERE id = EXCLUDED.product_id
                        )
                    RETURNING quantity
                    ",
                )
                .bind(user_id)
                .bind(product_id)
                .fetch_optional(self.pool)
                .await?
            }
            CartIncrement::ExistingOnly => {
                sqlx::query_scalar(
                    r"
                    UPDATE cart_items c
                    SET quantity = c.quantity + 1
                    FROM products p
                    WHERE p.id = c.product_id
                      AND c.user_id = $1
                      AND c.product_id = $2
                      AND c.quantity + 1 <= p.stock_quantity
                    RETURNING c.quantity
                    ",
                )
                .bind(user_id)
                .bind(product_id)
                .fetch_optional(self.pool)
                .await?
            }
        };

        if let Some(quantity) = quantity {
            return Ok(CartMutation::Set { quantity });
        }
        self.explain_rejected_increment(user_id, product_id, mode)
            .await
    }

    /// Work out why an increment wrote nothing.
    async fn explain_rejected_increment(
        &self,
        user_id: UserId,
        product_id: ProductId,
        mode: CartIncrement,
    ) -> Result<CartMutation, RepositoryError> {
        let row: Option<(i32, Option<i32>)> = sqlx::query_as(
            r"
            SELECT p.stock_quantity, c.quantity
            FROM products p
            LEFT JOIN cart_items c ON c.product_id = p.id AND c.user_id = $1
            WHERE p.id = $2
            ",
        )
        .bind(user_id)
        .bind(product_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(match row {
            None => CartMutation::ProductNotFound,
            Some((_, None)) if mode == CartIncrement::ExistingOnly => CartMutation::NotInCart,
            Some((stock, Some(_))) if mode == CartIncrement::ExistingOnly => {
                CartMutation::StockExceeded { available: stock }
            }
            Some((0, _)) => CartMutation::OutOfStock,
            Some((stock, _)) => CartMutation::StockExceeded { available: stock },
        })
    }

    /// Remove one unit, deleting the line when it reaches zero.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn decrement(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<CartMutation, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let current: Option<i32> = sqlx::query_scalar(
            "SELECT quantity FROM cart_items WHERE user_id = $1 AND product_id = $2 FOR UPDATE",
        )
        .bind(user_id)
        .bind(product_id)
        .fetch_optional(&mut *tx)
        .await?;

        let outcome = match current {
            None => CartMutation::NotInCart,
            Some(quantity) if quantity <= 1 => {
                sqlx::query("DELETE FROM cart_items WHERE user_id = $1 AND product_id = $2")
                    .bind(user_id)
                    .bind(product_id)
                    .execute(&mut *tx)
                    .await?;
                CartMutation::Removed
            }
            Some(quantity) => {
                sqlx::query(
                    "UPDATE cart_items SET quantity = $3 WHERE user_id = $1 AND product_id = $2",
                )
                .bind(user_id)
                .bind(product_id)
                .bind(quantity - 1)
                .execute(&mut *tx)
                .await?;
                CartMutation::Set {
                    quantity: quantity - 1,
                }
            }
        };

        tx.commit().await?;
        Ok(outcome)
    }

    /// Delete a line. Absent lines are not an error.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn remove(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM cart_items WHERE user_id = $1 AND product_id = $2")
            .bind(user_id)
            .bind(product_id)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
