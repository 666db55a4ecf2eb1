//! Order service: checkout and the order lifecycle.

use rust_decimal::Decimal;
use thiserror::Error;
use tracing::instrument;

use scatch_core::{
    CheckoutError, MissingFields, OrderId, OrderStatus, PaymentMethod, PaymentStatus,
    ShippingForm, TransitionError, UserId, pricing,
};

use crate::db::{PlaceOrderError, RepositoryError, StatusChangeError, Store};
use crate::models::{Order, User};

use super::cart::{CartError, CartService, CartSummary};

/// Errors from order operations.
#[derive(Debug, Error)]
pub enum OrderError {
    #[error("Your cart is empty!")]
    EmptyCart,

    #[error(transparent)]
    MissingShipping(#[from] MissingFields),

    #[error("Please choose a valid payment method.")]
    InvalidPaymentMethod,

    /// A line asks for more than is left; nothing was written.
    #[error("Only {available} left of {name}. Please update your cart.")]
    StockExceeded { name: String, available: i32 },

    #[error("Order not found!")]
    NotFound,

    #[error("{0}")]
    InvalidTransition(#[from] TransitionError),

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<CheckoutError> for OrderError {
    fn from(e: CheckoutError) -> Self {
        match e {
            CheckoutError::EmptyCart => Self::EmptyCart,
            CheckoutError::InsufficientStock {
                name, available, ..
            } => Self::StockExceeded { name, available },
        }
    }
}

impl From<PlaceOrderError> for OrderError {
    fn from(e: PlaceOrderError) -> Self {
        match e {
            PlaceOrderError::Rejected(rejected) => rejected.into(),
            PlaceOrderError::Repository(RepositoryError::NotFound) => Self::NotFound,
            PlaceOrderError::Repository(other) => Self::Repository(other),
        }
    }
}

impl From<StatusChangeError> for OrderError {
    fn from(e: StatusChangeError) -> Self {
        match e {
            StatusChangeError::Rejected(rejected) => Self::InvalidTransition(rejected),
            StatusChangeError::Repository(RepositoryError::NotFound) => Self::NotFound,
            StatusChangeError::Repository(other) => Self::Repository(other),
        }
    }
}

impl From<CartError> for OrderError {
    fn from(e: CartError) -> Self {
        match e {
            CartError::Repository(inner) => Self::Repository(inner),
            // Reading a cart never yields the mutation errors.
            _ => Self::EmptyCart,
        }
    }
}

/// What the checkout page shows before the order is placed.
#[derive(Debug, Clone)]
pub struct CheckoutSummary {
    pub cart: CartSummary,
    pub subtotal: Decimal,
    pub platform_fee: Decimal,
    pub total: Decimal,
    /// The shopper's saved address, or blanks.
    pub prefill: ShippingForm,
}

/// Order service.
pub struct OrderService<'a> {
    store: &'a dyn Store,
}

impl<'a> OrderService<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn Store) -> Self {
        Self { store }
    }

    /// Preview of the order the cart would become.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::EmptyCart` when there is nothing to check out.
    #[instrument(skip_all, fields(user_id = %user.id))]
    pub async fn checkout_summary(&self, user: &User) -> Result<CheckoutSummary, OrderError> {
        let cart = CartService::new(self.store).get_cart(user.id).await?;
        if cart.is_empty() {
            return Err(OrderError::EmptyCart);
        }

        let subtotal = cart.totals.subtotal;
        let prefill = user
            .address
            .as_ref()
            .map(ShippingForm::from)
            .unwrap_or_else(|| ShippingForm {
                full_name: user.fullname.clone(),
                phone: user.contact.clone().unwrap_or_default(),
                ..ShippingForm::default()
            });

        Ok(CheckoutSummary {
            cart,
            subtotal,
            platform_fee: pricing::PLATFORM_FEE,
            total: pricing::order_total(subtotal),
            prefill,
        })
    }

    /// Turn the shopper's cart into an order.
    ///
    /// Stock is re-checked and decremented, and the cart cleared, in the same
    /// transaction as the insert.
    ///
    /// # Errors
    ///
    /// `EmptyCart`, `MissingShipping` naming the blank fields,
    /// `InvalidPaymentMethod`, or `StockExceeded` naming the product, checked
    /// in that order. Nothing is written on error.
    #[instrument(skip(self, form), fields(user_id = %user_id))]
    pub async fn place_order(
        &self,
        user_id: UserId,
        form: ShippingForm,
        payment_method: &str,
    ) -> Result<Order, OrderError> {
        if self.store.cart_items(user_id).await?.is_empty() {
            return Err(OrderError::EmptyCart);
        }

        let shipping = form.validate()?;
        let payment_method: PaymentMethod = payment_method
            .parse()
            .map_err(|_| OrderError::InvalidPaymentMethod)?;
        let order = self
            .store
            .place_order(user_id, &shipping, payment_method)
            .await?;

        tracing::info!(
            order_id = %order.id,
            total = %order.total_amount,
            lines = order.lines.len(),
            "order placed"
        );
        Ok(order)
    }

    /// One of the shopper's orders.
    ///
    /// # Errors
    ///
    /// `NotFound` if the order does not exist or belongs to someone else.
    #[instrument(skip(self), fields(user_id = %user_id, order_id = %order_id))]
    pub async fn get_order(&self, order_id: OrderId, user_id: UserId) -> Result<Order, OrderError> {
        self.store
            .get_order(order_id)
            .await?
            .filter(|order| order.user_id == user_id)
            .ok_or(OrderError::NotFound)
    }

    /// The shopper's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Repository` if the store fails.
    pub async fn list_orders(&self, user_id: UserId) -> Result<Vec<Order>, OrderError> {
        Ok(self.store.list_orders_for_user(user_id).await?)
    }

    /// Every order, newest first.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Repository` if the store fails.
    pub async fn list_all_orders(&self) -> Result<Vec<Order>, OrderError> {
        Ok(self.store.list_orders().await?)
    }

    /// Any order, regardless of owner.
    ///
    /// # Errors
    ///
    /// `NotFound` if the order does not exist.
    pub async fn get_order_for_admin(&self, order_id: OrderId) -> Result<Order, OrderError> {
        self.store
            .get_order(order_id)
            .await?
            .ok_or(OrderError::NotFound)
    }

    /// Move an order one step through its lifecycle.
    ///
    /// # Errors
    ///
    /// `InvalidTransition` for any move the state machine forbids, `NotFound`
    /// for an unknown order.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn update_status(
        &self,
        order_id: OrderId,
        status: OrderStatus,
    ) -> Result<Order, OrderError> {
        let order = self.store.update_order_status(order_id, status).await?;
        tracing::info!(status = %order.status, "order status changed");
        Ok(order)
    }

    /// Record a payment outcome.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown order.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn update_payment_status(
        &self,
        order_id: OrderId,
        status: PaymentStatus,
    ) -> Result<Order, OrderError> {
        self.store
            .update_payment_status(order_id, status)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => OrderError::NotFound,
                other => OrderError::Repository(other),
            })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use scatch_core::{Category, Email, Gender, ProductId};

    use crate::db::MemoryStore;
    use crate::models::{NewUser, ProductInput};
    use crate::services::catalog::CatalogService;

    use super::*;

    fn bag(name: &str, price: i64, discount: i64, stock: i32) -> ProductInput {
        ProductInput {
            name: name.into(),
            description: String::new(),
            price: Decimal::from(price),
            discount_price: Decimal::from(discount),
            category: Category::Clutches,
            stock_quantity: stock,
            images: vec![],
            featured: false,
        }
    }

    fn form() -> ShippingForm {
        ShippingForm {
            full_name: "Asha Rao".into(),
            address: "12 MG Road".into(),
            city: "Pune".into(),
            state: "MH".into(),
            zip_code: "411001".into(),
            phone: "9999999999".into(),
            country: String::new(),
        }
    }

    async fn setup(catalog: &[ProductInput]) -> (MemoryStore, User) {
        let store = MemoryStore::with_catalog(catalog);
        let user = store
            .create_user(&NewUser {
                fullname: "Asha Rao".into(),
                email: Email::parse("asha@example.com").unwrap(),
                password_hash: "hash".into(),
                gender: Gender::Female,
                age: 30,
            })
            .await
            .unwrap();
        (store, user)
    }

    async fn fill_cart(store: &MemoryStore, user: UserId) {
        let cart = CartService::new(store);
        cart.add_item(user, ProductId::new(1)).await.unwrap();
        cart.add_item(user, ProductId::new(1)).await.unwrap();
        cart.add_item(user, ProductId::new(2)).await.unwrap();
    }

    #[tokio::test]
    async fn test_place_order_snapshot_and_total() {
        let (store, user) = setup(&[bag("A", 100, 0, 5), bag("B", 50, 40, 5)]).await;
        fill_cart(&store, user.id).await;
        let orders = OrderService::new(&store);

        let order = orders
            .place_order(user.id, form(), "COD")
            .await
            .unwrap();
        assert_eq!(order.total_amount, Decimal::from(260));
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.payment_status, PaymentStatus::Pending);
        assert_eq!(order.shipping.country, "India");
        assert_eq!(
            CartService::new(&store).cart_count(user.id).await.unwrap(),
            0
        );

        // Stock was taken.
        let a = store.get_product(ProductId::new(1)).await.unwrap().unwrap();
        assert_eq!(a.stock_quantity, 3);

        // Later price changes leave the order alone.
        let mut repriced = bag("A", 999, 0, 3);
        repriced.name = "A".into();
        CatalogService::new(&store)
            .update_product(ProductId::new(1), repriced)
            .await
            .unwrap();
        let again = orders.get_order(order.id, user.id).await.unwrap();
        assert_eq!(again.total_amount, Decimal::from(260));
    }

    #[tokio::test]
    async fn test_empty_cart_creates_nothing() {
        let (store, user) = setup(&[bag("A", 100, 0, 5)]).await;
        let orders = OrderService::new(&store);

        let result = orders.place_order(user.id, form(), "COD").await;
        assert!(matches!(result, Err(OrderError::EmptyCart)));
        assert!(orders.list_orders(user.id).await.unwrap().is_empty());
        assert!(matches!(
            orders.checkout_summary(&user).await,
            Err(OrderError::EmptyCart)
        ));
    }

    #[tokio::test]
    async fn test_empty_cart_is_reported_before_payment_method() {
        let (store, user) = setup(&[bag("A", 100, 0, 5)]).await;
        let orders = OrderService::new(&store);

        let result = orders.place_order(user.id, form(), "Barter").await;
        assert!(matches!(result, Err(OrderError::EmptyCart)));

        CartService::new(&store)
            .add_item(user.id, ProductId::new(1))
            .await
            .unwrap();
        let result = orders.place_order(user.id, form(), "Barter").await;
        assert!(matches!(result, Err(OrderError::InvalidPaymentMethod)));
        assert!(orders.list_orders(user.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_shipping_fields_are_named() {
        let (store, user) = setup(&[bag("A", 100, 0, 5), bag("B", 50, 40, 5)]).await;
        fill_cart(&store, user.id).await;
        let orders = OrderService::new(&store);

        let mut partial = form();
        partial.city = "  ".into();
        partial.phone = String::new();
        match orders.place_order(user.id, partial, "COD").await {
            Err(OrderError::MissingShipping(MissingFields(missing))) => {
                assert_eq!(missing, vec!["city", "phone"]);
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(
            CartService::new(&store).cart_count(user.id).await.unwrap(),
            3
        );
    }

    #[tokio::test]
    async fn test_stock_shortfall_names_product() {
        let (store, user) = setup(&[bag("A", 100, 0, 5), bag("B", 50, 40, 5)]).await;
        fill_cart(&store, user.id).await;

        let mut sold_out = bag("A", 100, 0, 1);
        sold_out.name = "A".into();
        CatalogService::new(&store)
            .update_product(ProductId::new(1), sold_out)
            .await
            .unwrap();

        let result = OrderService::new(&store)
            .place_order(user.id, form(), "UPI")
            .await;
        match result {
            Err(OrderError::StockExceeded { name, available }) => {
                assert_eq!(name, "A");
                assert_eq!(available, 1);
            }
            other => panic!("unexpected result: {other:?}"),
        }
        let b = store.get_product(ProductId::new(2)).await.unwrap().unwrap();
        assert_eq!(b.stock_quantity, 5);
    }

    #[tokio::test]
    async fn test_other_users_order_is_not_found() {
        let (store, user) = setup(&[bag("A", 100, 0, 5), bag("B", 50, 40, 5)]).await;
        fill_cart(&store, user.id).await;
        let orders = OrderService::new(&store);
        let order = orders
            .place_order(user.id, form(), "COD")
            .await
            .unwrap();

        let stranger = store
            .create_user(&NewUser {
                fullname: "Ravi".into(),
                email: Email::parse("ravi@example.com").unwrap(),
                password_hash: "hash".into(),
                gender: Gender::Male,
                age: 40,
            })
            .await
            .unwrap();
        assert!(matches!(
            orders.get_order(order.id, stranger.id).await,
            Err(OrderError::NotFound)
        ));
        assert!(orders.get_order_for_admin(order.id).await.is_ok());
    }

    #[tokio::test]
    async fn test_status_lifecycle() {
        let (store, user) = setup(&[bag("A", 100, 0, 5), bag("B", 50, 40, 5)]).await;
        fill_cart(&store, user.id).await;
        let orders = OrderService::new(&store);
        let order = orders
            .place_order(user.id, form(), "COD")
            .await
            .unwrap();

        assert!(matches!(
            orders.update_status(order.id, OrderStatus::Shipped).await,
            Err(OrderError::InvalidTransition(_))
        ));

        for status in [
            OrderStatus::Processing,
            OrderStatus::Shipped,
            OrderStatus::Delivered,
        ] {
            orders.update_status(order.id, status).await.unwrap();
        }

        let listed = orders.list_orders(user.id).await.unwrap();
        assert_eq!(listed[0].status, OrderStatus::Delivered);
        assert!(listed[0].shipped_at.is_some());
        assert!(listed[0].delivered_at.is_some());
        assert!(matches!(
            orders.update_status(order.id, OrderStatus::Cancelled).await,
            Err(OrderError::InvalidTransition(_))
        ));
    }

    #[tokio::test]
    async fn test_cancel_restocks() {
        let (store, user) = setup(&[bag("A", 100, 0, 5), bag("B", 50, 40, 5)]).await;
        fill_cart(&store, user.id).await;
        let orders = OrderService::new(&store);
        let order = orders
            .place_order(user.id, form(), "COD")
            .await
            .unwrap();

        orders
            .update_status(order.id, OrderStatus::Cancelled)
            .await
            .unwrap();
        let a = store.get_product(ProductId::new(1)).await.unwrap().unwrap();
        assert_eq!(a.stock_quantity, 5);
    }

    #[tokio::test]
    async fn test_payment_status_update() {
        let (store, user) = setup(&[bag("A", 100, 0, 5), bag("B", 50, 40, 5)]).await;
        fill_cart(&store, user.id).await;
        let orders = OrderService::new(&store);
        let order = orders
            .place_order(user.id, form(), "Card")
            .await
            .unwrap();

        let paid = orders
            .update_payment_status(order.id, PaymentStatus::Paid)
            .await
            .unwrap();
        assert_eq!(paid.payment_status, PaymentStatus::Paid);
        assert!(matches!(
            orders
                .update_payment_status(OrderId::new(9999), PaymentStatus::Paid)
                .await,
            Err(OrderError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_checkout_summary_prefills_saved_address() {
        let (store, user) = setup(&[bag("A", 100, 0, 5), bag("B", 50, 40, 5)]).await;
        fill_cart(&store, user.id).await;
        let orders = OrderService::new(&store);

        let summary = orders.checkout_summary(&user).await.unwrap();
        assert_eq!(summary.subtotal, Decimal::from(240));
        assert_eq!(summary.total, Decimal::from(260));
        assert_eq!(summary.prefill.full_name, "Asha Rao");
        assert!(summary.prefill.address.is_empty());

        orders
            .place_order(user.id, form(), "COD")
            .await
            .unwrap();
        fill_cart(&store, user.id).await;
        let user = store.get_user(user.id).await.unwrap().unwrap();
        let summary = orders.checkout_summary(&user).await.unwrap();
        assert_eq!(summary.prefill.address, "12 MG Road");
    }
}
