//! Cart service.
//!
//! Every mutation is a single atomic store call keyed by (user, product),
//! so concurrent requests for the same line never lose an update.

use std::str::FromStr;

use serde::Deserialize;
use thiserror::Error;
use tracing::instrument;

use scatch_core::{CartTotals, ProductId, UserId};

use crate::db::{RepositoryError, Store};
use crate::models::{CartIncrement, CartItem, CartMutation};

/// Errors from cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    #[error("Product not found!")]
    ProductNotFound,

    #[error("Item not found in cart")]
    NotInCart,

    #[error("Product is out of stock!")]
    OutOfStock,

    /// One more unit would exceed current stock.
    #[error("Maximum stock available reached!")]
    StockExceeded { available: i32 },

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Quantity stepper direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CartAction {
    Increase,
    Decrease,
}

impl FromStr for CartAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "increase" => Ok(Self::Increase),
            "decrease" => Ok(Self::Decrease),
            other => Err(format!("unknown cart action: {other}")),
        }
    }
}

/// A cart with its totals.
#[derive(Debug, Clone)]
pub struct CartSummary {
    pub items: Vec<CartItem>,
    pub totals: CartTotals,
}

impl CartSummary {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Cart service.
pub struct CartService<'a> {
    store: &'a dyn Store,
}

impl<'a> CartService<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn Store) -> Self {
        Self { store }
    }

    /// Add one unit of a product, creating the line if needed.
    ///
    /// Returns the new line quantity.
    ///
    /// # Errors
    ///
    /// `ProductNotFound`, `OutOfStock` or `StockExceeded`; nothing is written
    /// in any of those cases.
    #[instrument(skip(self), fields(user_id = %user_id, product_id = %product_id))]
    pub async fn add_item(&self, user_id: UserId, product_id: ProductId) -> Result<i32, CartError> {
        let outcome = self
            .store
            .increment_cart_line(user_id, product_id, CartIncrement::CreateIfMissing)
            .await?;

        match into_result(outcome)? {
            CartMutation::Set { quantity } => Ok(quantity),
            _ => Err(CartError::NotInCart),
        }
    }

    /// Step a line's quantity up or down.
    ///
    /// Decreasing a line at quantity 1 removes it.
    ///
    /// # Errors
    ///
    /// `NotInCart` if the line does not exist, `StockExceeded` when
    /// increasing past current stock.
    #[instrument(skip(self), fields(user_id = %user_id, product_id = %product_id))]
    pub async fn update_quantity(
        &self,
        user_id: UserId,
        product_id: ProductId,
        action: CartAction,
    ) -> Result<CartMutation, CartError> {
        let outcome = match action {
            CartAction::Increase => {
                self.store
                    .increment_cart_line(user_id, product_id, CartIncrement::ExistingOnly)
                    .await?
            }
            CartAction::Decrease => self.store.decrement_cart_line(user_id, product_id).await?,
        };

        into_result(outcome)
    }

    /// Remove a line. Removing an absent line succeeds.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if the store fails.
    #[instrument(skip(self), fields(user_id = %user_id, product_id = %product_id))]
    pub async fn remove_item(&self, user_id: UserId, product_id: ProductId) -> Result<(), CartError> {
        let removed = self.store.remove_cart_line(user_id, product_id).await?;
        if !removed {
            tracing::debug!("cart line already absent");
        }
        Ok(())
    }

    /// The cart with live prices and totals.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if the store fails.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn get_cart(&self, user_id: UserId) -> Result<CartSummary, CartError> {
        let items = self.store.cart_items(user_id).await?;
        let totals = CartTotals::from_lines(
            items
                .iter()
                .map(|item| (item.product.effective_price(), item.quantity)),
        );
        Ok(CartSummary { items, totals })
    }

    /// Total units in the cart.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if the store fails.
    pub async fn cart_count(&self, user_id: UserId) -> Result<i64, CartError> {
        let items = self.store.cart_items(user_id).await?;
        Ok(items.iter().map(|item| i64::from(item.quantity)).sum())
    }
}

fn into_result(outcome: CartMutation) -> Result<CartMutation, CartError> {
    match outcome {
        CartMutation::Set { .. } | CartMutation::Removed => Ok(outcome),
        CartMutation::ProductNotFound => Err(CartError::ProductNotFound),
        CartMutation::NotInCart => Err(CartError::NotInCart),
        CartMutation::OutOfStock => Err(CartError::OutOfStock),
        CartMutation::StockExceeded { available } => Err(CartError::StockExceeded { available }),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use rust_decimal::Decimal;
    use scatch_core::{Category, Email, Gender};

    use crate::db::MemoryStore;
    use crate::models::{NewUser, ProductInput};

    use super::*;

    fn bag(name: &str, price: i64, discount: i64, stock: i32) -> ProductInput {
        ProductInput {
            name: name.into(),
            description: String::new(),
            price: Decimal::from(price),
            discount_price: Decimal::from(discount),
            category: Category::Backpacks,
            stock_quantity: stock,
            images: vec![],
            featured: false,
        }
    }

    async fn setup(catalog: &[ProductInput]) -> (MemoryStore, UserId) {
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
        (store, user.id)
    }

    #[tokio::test]
    async fn test_add_item_out_of_stock_leaves_cart_empty() {
        let (store, user) = setup(&[bag("Empty", 100, 0, 0)]).await;
        let cart = CartService::new(&store);

        let result = cart.add_item(user, ProductId::new(1)).await;
        assert!(matches!(result, Err(CartError::OutOfStock)));
        assert_eq!(cart.cart_count(user).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_add_item_unknown_product() {
        let (store, user) = setup(&[]).await;
        let cart = CartService::new(&store);
        assert!(matches!(
            cart.add_item(user, ProductId::new(42)).await,
            Err(CartError::ProductNotFound)
        ));
    }

    #[tokio::test]
    async fn test_totals_and_count() {
        let (store, user) = setup(&[bag("A", 100, 0, 5), bag("B", 50, 40, 5)]).await;
        let cart = CartService::new(&store);
        cart.add_item(user, ProductId::new(1)).await.unwrap();
        cart.add_item(user, ProductId::new(1)).await.unwrap();
        cart.add_item(user, ProductId::new(2)).await.unwrap();

        let summary = cart.get_cart(user).await.unwrap();
        assert_eq!(summary.totals.subtotal, Decimal::from(240));
        assert_eq!(summary.totals.shipping_fee, Decimal::from(10));
        assert_eq!(summary.totals.total, Decimal::from(250));
        assert_eq!(summary.totals.item_count, 3);
        assert_eq!(cart.cart_count(user).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_increase_stops_at_stock() {
        let (store, user) = setup(&[bag("A", 100, 0, 2)]).await;
        let cart = CartService::new(&store);
        let id = ProductId::new(1);
        cart.add_item(user, id).await.unwrap();

        assert_eq!(
            cart.update_quantity(user, id, CartAction::Increase)
                .await
                .unwrap(),
            CartMutation::Set { quantity: 2 }
        );
        assert!(matches!(
            cart.update_quantity(user, id, CartAction::Increase).await,
            Err(CartError::StockExceeded { available: 2 })
        ));
        assert_eq!(cart.cart_count(user).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_increase_after_sell_out_reports_stock_ceiling() {
        let (store, user) = setup(&[bag("A", 100, 0, 3)]).await;
        let cart = CartService::new(&store);
        let id = ProductId::new(1);
        cart.add_item(user, id).await.unwrap();

        store.update_product(id, &bag("A", 100, 0, 0)).await.unwrap();

        assert!(matches!(
            cart.update_quantity(user, id, CartAction::Increase).await,
            Err(CartError::StockExceeded { available: 0 })
        ));
        // Adding from the shop still reads as sold out.
        assert!(matches!(
            cart.add_item(user, id).await,
            Err(CartError::OutOfStock)
        ));
        assert_eq!(cart.cart_count(user).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_decrease_at_one_removes_line() {
        let (store, user) = setup(&[bag("A", 100, 0, 2)]).await;
        let cart = CartService::new(&store);
        let id = ProductId::new(1);
        cart.add_item(user, id).await.unwrap();

        assert_eq!(
            cart.update_quantity(user, id, CartAction::Decrease)
                .await
                .unwrap(),
            CartMutation::Removed
        );
        assert!(cart.get_cart(user).await.unwrap().is_empty());
        assert!(matches!(
            cart.update_quantity(user, id, CartAction::Decrease).await,
            Err(CartError::NotInCart)
        ));
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        let (store, user) = setup(&[bag("A", 100, 0, 2)]).await;
        let cart = CartService::new(&store);
        let id = ProductId::new(1);
        cart.add_item(user, id).await.unwrap();

        cart.remove_item(user, id).await.unwrap();
        let first = cart.get_cart(user).await.unwrap();
        cart.remove_item(user, id).await.unwrap();
        let second = cart.get_cart(user).await.unwrap();
        assert!(first.is_empty());
        assert_eq!(first.items, second.items);
    }

    #[tokio::test]
    async fn test_concurrent_adds_make_one_line() {
        let (store, user) = setup(&[bag("A", 100, 0, 5)]).await;
        let store = Arc::new(store);
        let id = ProductId::new(1);

        let tasks: Vec<_> = (0..2)
            .map(|_| {
                let store = Arc::clone(&store);
                tokio::spawn(async move { CartService::new(store.as_ref()).add_item(user, id).await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let summary = CartService::new(store.as_ref()).get_cart(user).await.unwrap();
        assert_eq!(summary.items.len(), 1);
        assert_eq!(summary.items[0].quantity, 2);
    }

    #[test]
    fn test_cart_action_parse() {
        assert_eq!("Increase".parse::<CartAction>().unwrap(), CartAction::Increase);
        assert_eq!("decrease".parse::<CartAction>().unwrap(), CartAction::Decrease);
        assert!("sideways".parse::<CartAction>().is_err());
    }
}
