//! Order repository.
//!
//! Checkout and status changes run in one transaction each. Product rows are
//! locked in id order, by checkouts and by cancels that restock, so
//! transactions touching the same products serialise without deadlocking.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use scatch_core::checkout::build_order;
use scatch_core::{
    OrderId, OrderLine, OrderStatus, PaymentMethod, PaymentStatus, PricedLine, ProductId,
    ShippingDetails, UserId,
};

use super::{PlaceOrderError, RepositoryError, StatusChangeError};
use crate::models::Order;

macro_rules! order_columns {
    () => {
        "id, user_id, platform_fee, total_amount, shipping_full_name, shipping_street, \
         shipping_city, shipping_state, shipping_zip_code, shipping_phone, shipping_country, \
         status, payment_method, payment_status, order_date, shipped_at, delivered_at"
    };
}

/// Cart lines priced against their products, locked for checkout.
const LOCK_CART_LINES: &str = r"
    SELECT p.id AS product_id, p.name, c.quantity, p.price, p.discount_price, p.stock_quantity
    FROM cart_items c
    JOIN products p ON p.id = c.product_id
    WHERE c.user_id = $1
    ORDER BY p.id
    FOR UPDATE OF p, c
";

/// Products on an order, locked before a cancel restocks them.
const LOCK_ORDER_PRODUCTS: &str = r"
    SELECT p.id
    FROM products p
    JOIN order_items oi ON oi.product_id = p.id
    WHERE oi.order_id = $1
    ORDER BY p.id
    FOR UPDATE OF p
";

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    user_id: UserId,
    platform_fee: Decimal,
    total_amount: Decimal,
    shipping_full_name: String,
    shipping_street: String,
    shipping_city: String,
    shipping_state: String,
    shipping_zip_code: String,
    shipping_phone: String,
    shipping_country: String,
    status: OrderStatus,
    payment_method: PaymentMethod,
    payment_status: PaymentStatus,
    order_date: DateTime<Utc>,
    shipped_at: Option<DateTime<Utc>>,
    delivered_at: Option<DateTime<Utc>>,
}

impl OrderRow {
    fn into_order(self, lines: Vec<OrderLine>) -> Order {
        Order {
            id: self.id,
            user_id: self.user_id,
            lines,
            platform_fee: self.platform_fee,
            total_amount: self.total_amount,
            shipping: ShippingDetails {
                full_name: self.shipping_full_name,
                street: self.shipping_street,
                city: self.shipping_city,
                state: self.shipping_state,
                zip_code: self.shipping_zip_code,
                phone: self.shipping_phone,
                country: self.shipping_country,
            },
            status: self.status,
            payment_method: self.payment_method,
            payment_status: self.payment_status,
            order_date: self.order_date,
            shipped_at: self.shipped_at,
            delivered_at: self.delivered_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OrderItemRow {
    order_id: OrderId,
    product_id: ProductId,
    product_name: String,
    quantity: i32,
    price: Decimal,
    discount_price: Decimal,
    subtotal: Decimal,
}

#[derive(Debug, sqlx::FromRow)]
struct PricedLineRow {
    product_id: ProductId,
    name: String,
    quantity: i32,
    price: Decimal,
    discount_price: Decimal,
    stock_quantity: i32,
}

impl From<PricedLineRow> for PricedLine {
    fn from(row: PricedLineRow) -> Self {
        Self {
            product_id: row.product_id,
            name: row.name,
            quantity: row.quantity,
            price: row.price,
            discount_price: row.discount_price,
            stock_quantity: row.stock_quantity,
        }
    }
}

/// Repository for `orders` and `order_items`.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Convert the user's cart into an order in one transaction.
    ///
    /// # Errors
    ///
    /// Returns `PlaceOrderError::Rejected` for an empty cart or short stock;
    /// nothing is written in that case.
    pub async fn place(
        &self,
        user_id: UserId,
        shipping: &ShippingDetails,
        payment_method: PaymentMethod,
    ) -> Result<Order, PlaceOrderError> {
        let mut tx = self.pool.begin().await?;

        let priced: Vec<PricedLineRow> = sqlx::query_as(LOCK_CART_LINES)
            .bind(user_id)
            .fetch_all(&mut *tx)
            .await?;
        let priced: Vec<PricedLine> = priced.into_iter().map(PricedLine::from).collect();

        // Dropping `tx` on any early return rolls everything back.
        let draft = build_order(&priced)?;

        let row: OrderRow = sqlx::query_as(concat!(
            r"
            INSERT INTO orders
                (user_id, platform_fee, total_amount, shipping_full_name, shipping_street,
                 shipping_city, shipping_state, shipping_zip_code, shipping_phone,
                 shipping_country, payment_method)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING ",
            order_columns!()
        ))
        .bind(user_id)
        .bind(draft.platform_fee)
        .bind(draft.total_amount)
        .bind(&shipping.full_name)
        .bind(&shipping.street)
        .bind(&shipping.city)
        .bind(&shipping.state)
        .bind(&shipping.zip_code)
        .bind(&shipping.phone)
        .bind(&shipping.country)
        .bind(payment_method)
        .fetch_one(&mut *tx)
        .await?;

        for (position, line) in (0_i32..).zip(&draft.lines) {
            sqlx::query(
                r"
                INSERT INTO order_items
                    (order_id, position, product_id, product_name, quantity, price, discount_price, subtotal)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                ",
            )
            .bind(row.id)
            .bind(position)
            .bind(line.product_id)
            .bind(&line.product_name)
            .bind(line.quantity)
            .bind(line.price)
            .bind(line.discount_price)
            .bind(line.subtotal)
            .execute(&mut *tx)
            .await?;

            sqlx::query(
                "UPDATE products SET stock_quantity = stock_quantity - $2, updated_at = now() WHERE id = $1",
            )
            .bind(line.product_id)
            .bind(line.quantity)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        // First order fills the saved address used to prefill checkout.
        sqlx::query(
            r"
            UPDATE users
            SET address_full_name = $2, address_street = $3, address_city = $4,
                address_state = $5, address_zip_code = $6, address_phone = $7,
                address_country = $8, updated_at = now()
            WHERE id = $1 AND address_street IS NULL
            ",
        )
        .bind(user_id)
        .bind(&shipping.full_name)
        .bind(&shipping.street)
        .bind(&shipping.city)
        .bind(&shipping.state)
        .bind(&shipping.zip_code)
        .bind(&shipping.phone)
        .bind(&shipping.country)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(row.into_order(draft.lines))
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let row: Option<OrderRow> =
            sqlx::query_as(concat!("SELECT ", order_columns!(), " FROM orders WHERE id = $1"))
                .bind(id)
                .fetch_optional(self.pool)
                .await?;
        match row {
            Some(row) => Ok(self.attach_lines(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        let rows: Vec<OrderRow> = sqlx::query_as(concat!(
            "SELECT ",
            order_columns!(),
            " FROM orders WHERE user_id = $1 ORDER BY order_date DESC, id DESC"
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;
        self.attach_lines(rows).await
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list_all(&self) -> Result<Vec<Order>, RepositoryError> {
        let rows: Vec<OrderRow> = sqlx::query_as(concat!(
            "SELECT ",
            order_columns!(),
            " FROM orders ORDER BY order_date DESC, id DESC"
        ))
        .fetch_all(self.pool)
        .await?;
        self.attach_lines(rows).await
    }

    /// Load lines for a batch of orders with one query.
    async fn attach_lines(&self, rows: Vec<OrderRow>) -> Result<Vec<Order>, RepositoryError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<i32> = rows.iter().map(|row| row.id.as_i32()).collect();
        let items: Vec<OrderItemRow> = sqlx::query_as(
            r"
            SELECT order_id, product_id, product_name, quantity, price, discount_price, subtotal
            FROM order_items
            WHERE order_id = ANY($1)
            ORDER BY order_id, position
            ",
        )
        .bind(&ids)
        .fetch_all(self.pool)
        .await?;

        let mut by_order: HashMap<OrderId, Vec<OrderLine>> = HashMap::new();
        for item in items {
            by_order.entry(item.order_id).or_default().push(OrderLine {
                product_id: item.product_id,
                product_name: item.product_name,
                quantity: item.quantity,
                price: item.price,
                discount_price: item.discount_price,
                subtotal: item.subtotal,
            });
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let lines = by_order.remove(&row.id).unwrap_or_default();
                row.into_order(lines)
            })
            .collect())
    }

    /// Apply a state-machine move; cancelling restocks every line.
    ///
    /// # Errors
    ///
    /// Returns `StatusChangeError::Rejected` for a forbidden move and
    /// `RepositoryError::NotFound` for an unknown order.
    pub async fn update_status(
        &self,
        id: OrderId,
        to: OrderStatus,
    ) -> Result<Order, StatusChangeError> {
        let mut tx = self.pool.begin().await?;

        let current: Option<OrderStatus> =
            sqlx::query_scalar("SELECT status FROM orders WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        let current = current.ok_or(RepositoryError::NotFound)?;
        let next = current.transition(to)?;

        if next == OrderStatus::Cancelled {
            let _locked: Vec<ProductId> = sqlx::query_scalar(LOCK_ORDER_PRODUCTS)
                .bind(id)
                .fetch_all(&mut *tx)
                .await?;

            sqlx::query(
                r"
                UPDATE products p
                SET stock_quantity = p.stock_quantity + oi.quantity, updated_at = now()
                FROM order_items oi
                WHERE oi.order_id = $1 AND p.id = oi.product_id
                ",
            )
            .bind(id)
            .execute(&mut *tx)
            .await?;
        }

        let now = Utc::now();
        let shipped_at = (next == OrderStatus::Shipped).then_some(now);
        let delivered_at = (next == OrderStatus::Delivered).then_some(now);
        sqlx::query(
            r"
            UPDATE orders
            SET status = $2,
                shipped_at = COALESCE($3, shipped_at),
                delivered_at = COALESCE($4, delivered_at)
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(next)
        .bind(shipped_at)
        .bind(delivered_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(self.get(id).await?.ok_or(RepositoryError::NotFound)?)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` for an unknown order.
    pub async fn update_payment_status(
        &self,
        id: OrderId,
        status: PaymentStatus,
    ) -> Result<Order, RepositoryError> {
        let result = sqlx::query("UPDATE orders SET payment_status = $2 WHERE id = $1")
            .bind(id)
            .bind(status)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        self.get(id).await?.ok_or(RepositoryError::NotFound)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn lock_clause(query: &str) -> Option<&str> {
        query.find("ORDER BY").and_then(|at| query.get(at..)).map(str::trim)
    }

    #[test]
    fn test_checkout_and_cancel_lock_products_in_id_order() {
        let checkout = lock_clause(LOCK_CART_LINES).unwrap();
        let cancel = lock_clause(LOCK_ORDER_PRODUCTS).unwrap();
        assert!(checkout.starts_with("ORDER BY p.id\n"));
        assert!(cancel.starts_with("ORDER BY p.id\n"));
        assert!(checkout.contains("FOR UPDATE OF p"));
        assert!(cancel.contains("FOR UPDATE OF p"));
    }
}
