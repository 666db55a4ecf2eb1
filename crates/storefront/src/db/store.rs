//! The storage seam between services and backends.

use async_trait::async_trait;
use thiserror::Error;

use scatch_core::{
    Category, CheckoutError, Email, OrderId, OrderStatus, PaymentMethod, PaymentStatus,
    ProductId, ShippingDetails, TransitionError, UserId,
};

use super::RepositoryError;
use crate::models::{
    Admin, CartIncrement, CartItem, CartMutation, NewAdmin, NewUser, Order, Product,
    ProductFilter, ProductInput, User,
};

/// Why an order could not be placed.
#[derive(Debug, Error)]
pub enum PlaceOrderError {
    /// The cart failed validation; nothing was written.
    #[error(transparent)]
    Rejected(#[from] CheckoutError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<sqlx::Error> for PlaceOrderError {
    fn from(e: sqlx::Error) -> Self {
        Self::Repository(e.into())
    }
}

/// Why an order status change failed.
#[derive(Debug, Error)]
pub enum StatusChangeError {
    /// The state machine forbids the move; nothing was written.
    #[error(transparent)]
    Rejected(#[from] TransitionError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<sqlx::Error> for StatusChangeError {
    fn from(e: sqlx::Error) -> Self {
        Self::Repository(e.into())
    }
}

/// Persistent state of the shop.
///
/// Cart mutations are atomic per (user, product). `place_order` and
/// `update_order_status` are each a single transaction.
#[async_trait]
pub trait Store: Send + Sync {
    /// Short backend name for logs.
    fn backend(&self) -> &'static str;

    /// Check the backend can serve queries.
    async fn ping(&self) -> Result<(), RepositoryError>;

    // Catalog

    /// Products matching `filter`, newest first.
    async fn list_products(&self, filter: &ProductFilter) -> Result<Vec<Product>, RepositoryError>;

    /// In-stock product counts for every category, in display order.
    async fn category_counts(&self) -> Result<Vec<(Category, i64)>, RepositoryError>;

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError>;

    async fn create_product(&self, input: &ProductInput) -> Result<Product, RepositoryError>;

    /// Fails `NotFound` when the product does not exist.
    async fn update_product(
        &self,
        id: ProductId,
        input: &ProductInput,
    ) -> Result<Product, RepositoryError>;

    /// Hard delete; cart lines referencing the product go with it.
    async fn delete_product(&self, id: ProductId) -> Result<bool, RepositoryError>;

    /// Set every zero-stock product to `quantity` units.
    async fn restock_empty_products(&self, quantity: i32) -> Result<u64, RepositoryError>;

    // Accounts

    /// Fails `Conflict` when the email is taken.
    async fn create_user(&self, user: &NewUser) -> Result<User, RepositoryError>;

    async fn get_user(&self, id: UserId) -> Result<Option<User>, RepositoryError>;

    async fn get_user_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError>;

    /// User and stored password hash, for login.
    async fn get_user_credentials(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError>;

    /// Fails `Conflict` when the email is taken.
    async fn create_admin(&self, admin: &NewAdmin) -> Result<Admin, RepositoryError>;

    async fn get_admin_by_email(&self, email: &Email) -> Result<Option<Admin>, RepositoryError>;

    async fn get_admin_credentials(
        &self,
        email: &Email,
    ) -> Result<Option<(Admin, String)>, RepositoryError>;

    // Cart

    /// Cart lines with live product data, oldest first.
    async fn cart_items(&self, user_id: UserId) -> Result<Vec<CartItem>, RepositoryError>;

    /// Add one unit, bounded by current stock.
    async fn increment_cart_line(
        &self,
        user_id: UserId,
        product_id: ProductId,
        mode: CartIncrement,
    ) -> Result<CartMutation, RepositoryError>;

    /// Remove one unit, deleting the line at zero.
    async fn decrement_cart_line(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<CartMutation, RepositoryError>;

    /// Returns whether a line was deleted.
    async fn remove_cart_line(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<bool, RepositoryError>;

    // Orders

    /// Turn the user's cart into an order.
    ///
    /// Re-checks stock, inserts the order, decrements stock and clears the
    /// cart, all or nothing.
    async fn place_order(
        &self,
        user_id: UserId,
        shipping: &ShippingDetails,
        payment_method: PaymentMethod,
    ) -> Result<Order, PlaceOrderError>;

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>, RepositoryError>;

    /// The user's orders, newest first.
    async fn list_orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError>;

    /// Every order, newest first.
    async fn list_orders(&self) -> Result<Vec<Order>, RepositoryError>;

    /// Apply a state-machine move, restocking on cancellation.
    async fn update_order_status(
        &self,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<Order, StatusChangeError>;

    async fn update_payment_status(
        &self,
        id: OrderId,
        status: PaymentStatus,
    ) -> Result<Order, RepositoryError>;
}

/// Backend used when no database is configured.
///
/// Pages still render; anything touching data reports an internal error.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableStore;

#[async_trait]
impl Store for UnavailableStore {
    fn backend(&self) -> &'static str {
        "unavailable"
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable)
    }

    async fn list_products(&self, _: &ProductFilter) -> Result<Vec<Product>, RepositoryError> {
        Err(RepositoryError::Unavailable)
    }

    async fn category_counts(&self) -> Result<Vec<(Category, i64)>, RepositoryError> {
        Err(RepositoryError::Unavailable)
    }

    async fn get_product(&self, _: ProductId) -> Result<Option<Product>, RepositoryError> {
        Err(RepositoryError::Unavailable)
    }

    async fn create_product(&self, _: &ProductInput) -> Result<Product, RepositoryError> {
        Err(RepositoryError::Unavailable)
    }

    async fn update_product(
        &self,
        _: ProductId,
        _: &ProductInput,
    ) -> Result<Product, RepositoryError> {
        Err(RepositoryError::Unavailable)
    }

    async fn delete_product(&self, _: ProductId) -> Result<bool, RepositoryError> {
        Err(RepositoryError::Unavailable)
    }

    async fn restock_empty_products(&self, _: i32) -> Result<u64, RepositoryError> {
        Err(RepositoryError::Unavailable)
    }

    async fn create_user(&self, _: &NewUser) -> Result<User, RepositoryError> {
        Err(RepositoryError::Unavailable)
    }

    async fn get_user(&self, _: UserId) -> Result<Option<User>, RepositoryError> {
        Err(RepositoryError::Unavailable)
    }

    async fn get_user_by_email(&self, _: &Email) -> Result<Option<User>, RepositoryError> {
        Err(RepositoryError::Unavailable)
    }

    async fn get_user_credentials(
        &self,
        _: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        Err(RepositoryError::Unavailable)
    }

    async fn create_admin(&self, _: &NewAdmin) -> Result<Admin, RepositoryError> {
        Err(RepositoryError::Unavailable)
    }

    async fn get_admin_by_email(&self, _: &Email) -> Result<Option<Admin>, RepositoryError> {
        Err(RepositoryError::Unavailable)
    }

    async fn get_admin_credentials(
        &self,
        _: &Email,
    ) -> Result<Option<(Admin, String)>, RepositoryError> {
        Err(RepositoryError::Unavailable)
    }

    async fn cart_items(&self, _: UserId) -> Result<Vec<CartItem>, RepositoryError> {
        Err(RepositoryError::Unavailable)
    }

    async fn increment_cart_line(
        &self,
        _: UserId,
        _: ProductId,
        _: CartIncrement,
    ) -> Result<CartMutation, RepositoryError> {
        Err(RepositoryError::Unavailable)
    }

    async fn decrement_cart_line(
        &self,
        _: UserId,
        _: ProductId,
    ) -> Result<CartMutation, RepositoryError> {
        Err(RepositoryError::Unavailable)
    }

    async fn remove_cart_line(&self, _: UserId, _: ProductId) -> Result<bool, RepositoryError> {
        Err(RepositoryError::Unavailable)
    }

    async fn place_order(
        &self,
        _: UserId,
        _: &ShippingDetails,
        _: PaymentMethod,
    ) -> Result<Order, PlaceOrderError> {
        Err(RepositoryError::Unavailable.into())
    }

    async fn get_order(&self, _: OrderId) -> Result<Option<Order>, RepositoryError> {
        Err(RepositoryError::Unavailable)
    }

    async fn list_orders_for_user(&self, _: UserId) -> Result<Vec<Order>, RepositoryError> {
        Err(RepositoryError::Unavailable)
    }

    async fn list_orders(&self) -> Result<Vec<Order>, RepositoryError> {
        Err(RepositoryError::Unavailable)
    }

    async fn update_order_status(
        &self,
        _: OrderId,
        _: OrderStatus,
    ) -> Result<Order, StatusChangeError> {
        Err(RepositoryError::Unavailable.into())
    }

    async fn update_payment_status(
        &self,
        _: OrderId,
        _: PaymentStatus,
    ) -> Result<Order, RepositoryError> {
        Err(RepositoryError::Unavailable)
    }
}
