//! `PostgreSQL` backend for [`Store`].

use async_trait::async_trait;
use sqlx::PgPool;

use scatch_core::{
    Category, Email, OrderId, OrderStatus, PaymentMethod, PaymentStatus, ProductId,
    ShippingDetails, UserId,
};

use super::{
    AdminRepository, CartRepository, OrderRepository, PlaceOrderError, ProductRepository,
    RepositoryError, StatusChangeError, Store, UserRepository,
};
use crate::models::{
    Admin, CartIncrement, CartItem, CartMutation, NewAdmin, NewUser, Order, Product,
    ProductFilter, ProductInput, User,
};

/// [`Store`] over a `PostgreSQL` pool, delegating to the table repositories.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Store for PgStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn list_products(&self, filter: &ProductFilter) -> Result<Vec<Product>, RepositoryError> {
        ProductRepository::new(&self.pool).list(filter).await
    }

    async fn category_counts(&self) -> Result<Vec<(Category, i64)>, RepositoryError> {
        ProductRepository::new(&self.pool).category_counts().await
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        ProductRepository::new(&self.pool).get_by_id(id).await
    }

    async fn create_product(&self, input: &ProductInput) -> Result<Product, RepositoryError> {
        ProductRepository::new(&self.pool).create(input).await
    }

    async fn update_product(
        &self,
        id: ProductId,
        input: &ProductInput,
    ) -> Result<Product, RepositoryError> {
        ProductRepository::new(&self.pool).update(id, input).await
    }

    async fn delete_product(&self, id: ProductId) -> Result<bool, RepositoryError> {
        ProductRepository::new(&self.pool).delete(id).await
    }

    async fn restock_empty_products(&self, quantity: i32) -> Result<u64, RepositoryError> {
        ProductRepository::new(&self.pool)
            .restock_empty(quantity)
            .await
    }

    async fn create_user(&self, user: &NewUser) -> Result<User, RepositoryError> {
        UserRepository::new(&self.pool).create(user).await
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        UserRepository::new(&self.pool).get_by_id(id).await
    }

    async fn get_user_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        UserRepository::new(&self.pool).get_by_email(email).await
    }

    async fn get_user_credentials(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        UserRepository::new(&self.pool)
            .get_with_password_hash(email)
            .await
    }

    async fn create_admin(&self, admin: &NewAdmin) -> Result<Admin, RepositoryError> {
        AdminRepository::new(&self.pool).create(admin).await
    }

    async fn get_admin_by_email(&self, email: &Email) -> Result<Option<Admin>, RepositoryError> {
        AdminRepository::new(&self.pool).get_by_email(email).await
    }

    async fn get_admin_credentials(
        &self,
        email: &Email,
    ) -> Result<Option<(Admin, String)>, RepositoryError> {
        AdminRepository::new(&self.pool)
            .get_with_password_hash(email)
            .await
    }

    async fn cart_items(&self, user_id: UserId) -> Result<Vec<CartItem>, RepositoryError> {
        CartRepository::new(&self.pool).items(user_id).await
    }

    async fn increment_cart_line(
        &self,
        user_id: UserId,
        product_id: ProductId,
        mode: CartIncrement,
    ) -> Result<CartMutation, RepositoryError> {
        CartRepository::new(&self.pool)
            .increment(user_id, product_id, mode)
            .await
    }

    async fn decrement_cart_line(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<CartMutation, RepositoryError> {
        CartRepository::new(&self.pool)
            .decrement(user_id, product_id)
            .await
    }

    async fn remove_cart_line(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<bool, RepositoryError> {
        CartRepository::new(&self.pool)
            .remove(user_id, product_id)
            .await
    }

    async fn place_order(
        &self,
        user_id: UserId,
        shipping: &ShippingDetails,
        payment_method: PaymentMethod,
    ) -> Result<Order, PlaceOrderError> {
        OrderRepository::new(&self.pool)
            .place(user_id, shipping, payment_method)
            .await
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        OrderRepository::new(&self.pool).get(id).await
    }

    async fn list_orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        OrderRepository::new(&self.pool)
            .list_for_user(user_id)
            .await
    }

    async fn list_orders(&self) -> Result<Vec<Order>, RepositoryError> {
        OrderRepository::new(&self.pool).list_all().await
    }

    async fn update_order_status(
        &self,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<Order, StatusChangeError> {
        OrderRepository::new(&self.pool)
            .update_status(id, status)
            .await
    }

    async fn update_payment_status(
        &self,
        id: OrderId,
        status: PaymentStatus,
    ) -> Result<Order, RepositoryError> {
        OrderRepository::new(&self.pool)
            .update_payment_status(id, status)
            .await
    }
}
