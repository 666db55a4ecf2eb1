//! In-memory backend for [`Store`].
//!
//! All state sits behind one mutex and every trait method holds it for its
//! whole body, so each operation is atomic exactly like its SQL counterpart.
//! Used by the test suites and by `memory://` development runs.

#![allow(clippy::significant_drop_tightening)]

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use scatch_core::checkout::build_order;
use scatch_core::{
    AdminId, Category, Email, OrderId, OrderStatus, PaymentMethod, PaymentStatus, PricedLine,
    ProductId, ShippingDetails, UserId,
};

use super::{PlaceOrderError, RepositoryError, StatusChangeError, Store};
use crate::models::{
    Admin, CartIncrement, CartItem, CartMutation, NewAdmin, NewUser, Order, Product,
    ProductFilter, ProductInput, User,
};

#[derive(Debug, Clone)]
struct CartLine {
    product_id: ProductId,
    quantity: i32,
    added_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct State {
    products: BTreeMap<ProductId, Product>,
    users: BTreeMap<UserId, (User, String)>,
    admins: BTreeMap<AdminId, (Admin, String)>,
    carts: HashMap<UserId, Vec<CartLine>>,
    orders: BTreeMap<OrderId, Order>,
    next_id: i32,
}

impl State {
    fn next_id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }

    fn user_by_email(&self, email: &Email) -> Option<&(User, String)> {
        self.users.values().find(|(user, _)| user.email == *email)
    }

    fn admin_by_email(&self, email: &Email) -> Option<&(Admin, String)> {
        self.admins.values().find(|(admin, _)| admin.email == *email)
    }

    fn cart_line_mut(&mut self, user_id: UserId, product_id: ProductId) -> Option<&mut CartLine> {
        self.carts
            .get_mut(&user_id)?
            .iter_mut()
            .find(|line| line.product_id == product_id)
    }
}

/// Newest first, ties broken by id.
fn newest_first<T>(items: &mut [T], key: impl Fn(&T) -> (DateTime<Utc>, i32)) {
    items.sort_by(|a, b| key(b).cmp(&key(a)));
}

/// [`Store`] kept entirely in process memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-filled with products.
    #[must_use]
    pub fn with_catalog(catalog: &[ProductInput]) -> Self {
        let store = Self::new();
        {
            let mut state = store.state.lock();
            for input in catalog {
                insert_product(&mut state, input);
            }
        }
        store
    }
}

fn insert_product(state: &mut State, input: &ProductInput) -> Product {
    let now = Utc::now();
    let product = Product {
        id: ProductId::new(state.next_id()),
        name: input.name.trim().to_owned(),
        description: input.description.clone(),
        price: input.price,
        discount_price: input.discount_price,
        category: input.category,
        stock_quantity: input.stock_quantity,
        images: input.images.clone(),
        featured: input.featured,
        created_at: now,
        updated_at: now,
    };
    state.products.insert(product.id, product.clone());
    product
}

#[async_trait]
impl Store for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }

    async fn list_products(&self, filter: &ProductFilter) -> Result<Vec<Product>, RepositoryError> {
        let state = self.state.lock();
        let mut products: Vec<Product> = state
            .products
            .values()
            .filter(|p| filter.category.is_none_or(|c| p.category == c))
            .filter(|p| filter.search.as_deref().is_none_or(|s| p.matches_search(s)))
            .filter(|p| !filter.in_stock_only || p.in_stock())
            .cloned()
            .collect();
        newest_first(&mut products, |p| (p.created_at, p.id.as_i32()));
        if let Some(limit) = filter.limit {
            products.truncate(usize::try_from(limit).unwrap_or(0));
        }
        Ok(products)
    }

    async fn category_counts(&self) -> Result<Vec<(Category, i64)>, RepositoryError> {
        let state = self.state.lock();
        Ok(Category::ALL
            .into_iter()
            .map(|category| {
                let count = state
                    .products
                    .values()
                    .filter(|p| p.category == category && p.in_stock())
                    .count();
                (category, i64::try_from(count).unwrap_or(i64::MAX))
            })
            .collect())
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        Ok(self.state.lock().products.get(&id).cloned())
    }

    async fn create_product(&self, input: &ProductInput) -> Result<Product, RepositoryError> {
        Ok(insert_product(&mut self.state.lock(), input))
    }

    async fn update_product(
        &self,
        id: ProductId,
        input: &ProductInput,
    ) -> Result<Product, RepositoryError> {
        let mut state = self.state.lock();
        let product = state.products.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        product.name = input.name.trim().to_owned();
        product.description.clone_from(&input.description);
        product.price = input.price;
        product.discount_price = input.discount_price;
        product.category = input.category;
        product.stock_quantity = input.stock_quantity;
        product.images.clone_from(&input.images);
        product.featured = input.featured;
        product.updated_at = Utc::now();
        Ok(product.clone())
    }

    async fn delete_product(&self, id: ProductId) -> Result<bool, RepositoryError> {
        let mut state = self.state.lock();
        let removed = state.products.remove(&id).is_some();
        if removed {
            for lines in state.carts.values_mut() {
                lines.retain(|line| line.product_id != id);
            }
        }
        Ok(removed)
    }

    async fn restock_empty_products(&self, quantity: i32) -> Result<u64, RepositoryError> {
        let mut state = self.state.lock();
        let mut restocked = 0;
        for product in state.products.values_mut() {
            if product.stock_quantity == 0 {
                product.stock_quantity = quantity;
                product.updated_at = Utc::now();
                restocked += 1;
            }
        }
        Ok(restocked)
    }

    async fn create_user(&self, new: &NewUser) -> Result<User, RepositoryError> {
        let mut state = self.state.lock();
        if state.user_by_email(&new.email).is_some() {
            return Err(RepositoryError::Conflict("email already exists".to_owned()));
        }
        let now = Utc::now();
        let user = User {
            id: UserId::new(state.next_id()),
            fullname: new.fullname.trim().to_owned(),
            email: new.email.clone(),
            role: scatch_core::Role::User,
            gender: new.gender,
            age: Some(new.age),
            contact: None,
            address: None,
            created_at: now,
            updated_at: now,
        };
        state
            .users
            .insert(user.id, (user.clone(), new.password_hash.clone()));
        Ok(user)
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        Ok(self.state.lock().users.get(&id).map(|(user, _)| user.clone()))
    }

    async fn get_user_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        Ok(self
            .state
            .lock()
            .user_by_email(email)
            .map(|(user, _)| user.clone()))
    }

    async fn get_user_credentials(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        Ok(self.state.lock().user_by_email(email).cloned())
    }

    async fn create_admin(&self, new: &NewAdmin) -> Result<Admin, RepositoryError> {
        let mut state = self.state.lock();
        if state.admin_by_email(&new.email).is_some() {
            return Err(RepositoryError::Conflict(
                "owner email already exists".to_owned(),
            ));
        }
        let admin = Admin {
            id: AdminId::new(state.next_id()),
            fullname: new.fullname.trim().to_owned(),
            email: new.email.clone(),
            created_at: Utc::now(),
        };
        state
            .admins
            .insert(admin.id, (admin.clone(), new.password_hash.clone()));
        Ok(admin)
    }

    async fn get_admin_by_email(&self, email: &Email) -> Result<Option<Admin>, RepositoryError> {
        Ok(self
            .state
            .lock()
            .admin_by_email(email)
            .map(|(admin, _)| admin.clone()))
    }

    async fn get_admin_credentials(
        &self,
        email: &Email,
    ) -> Result<Option<(Admin, String)>, RepositoryError> {
        Ok(self.state.lock().admin_by_email(email).cloned())
    }

    async fn cart_items(&self, user_id: UserId) -> Result<Vec<CartItem>, RepositoryError> {
        let state = self.state.lock();
        let Some(lines) = state.carts.get(&user_id) else {
            return Ok(Vec::new());
        };
        Ok(lines
            .iter()
            .filter_map(|line| {
                state.products.get(&line.product_id).map(|product| CartItem {
                    product: product.clone(),
                    quantity: line.quantity,
                    added_at: line.added_at,
                })
            })
            .collect())
    }

    async fn increment_cart_line(
        &self,
        user_id: UserId,
        product_id: ProductId,
        mode: CartIncrement,
    ) -> Result<CartMutation, RepositoryError> {
        let mut state = self.state.lock();
        let Some(stock) = state.products.get(&product_id).map(|p| p.stock_quantity) else {
            return Ok(CartMutation::ProductNotFound);
        };

        if let Some(line) = state.cart_line_mut(user_id, product_id) {
            if stock == 0 && mode == CartIncrement::CreateIfMissing {
                return Ok(CartMutation::OutOfStock);
            }
            if line.quantity + 1 > stock {
                return Ok(CartMutation::StockExceeded { available: stock });
            }
            line.quantity += 1;
            return Ok(CartMutation::Set {
                quantity: line.quantity,
            });
        }

        match mode {
            CartIncrement::ExistingOnly => Ok(CartMutation::NotInCart),
            CartIncrement::CreateIfMissing if stock == 0 => Ok(CartMutation::OutOfStock),
            CartIncrement::CreateIfMissing => {
                state.carts.entry(user_id).or_default().push(CartLine {
                    product_id,
                    quantity: 1,
                    added_at: Utc::now(),
                });
                Ok(CartMutation::Set { quantity: 1 })
            }
        }
    }

    async fn decrement_cart_line(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<CartMutation, RepositoryError> {
        let mut state = self.state.lock();
        let Some(lines) = state.carts.get_mut(&user_id) else {
            return Ok(CartMutation::NotInCart);
        };
        let Some(index) = lines.iter().position(|line| line.product_id == product_id) else {
            return Ok(CartMutation::NotInCart);
        };
        let Some(line) = lines.get_mut(index) else {
            return Ok(CartMutation::NotInCart);
        };
        if line.quantity > 1 {
            line.quantity -= 1;
            return Ok(CartMutation::Set {
                quantity: line.quantity,
            });
        }
        lines.remove(index);
        Ok(CartMutation::Removed)
    }

    async fn remove_cart_line(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<bool, RepositoryError> {
        let mut state = self.state.lock();
        let Some(lines) = state.carts.get_mut(&user_id) else {
            return Ok(false);
        };
        let before = lines.len();
        lines.retain(|line| line.product_id != product_id);
        Ok(lines.len() != before)
    }

    async fn place_order(
        &self,
        user_id: UserId,
        shipping: &ShippingDetails,
        payment_method: PaymentMethod,
    ) -> Result<Order, PlaceOrderError> {
        let mut state = self.state.lock();

        let mut priced: Vec<PricedLine> = state
            .carts
            .get(&user_id)
            .map(|lines| {
                lines
                    .iter()
                    .filter_map(|line| {
                        state.products.get(&line.product_id).map(|p| PricedLine {
                            product_id: p.id,
                            name: p.name.clone(),
                            quantity: line.quantity,
                            price: p.price,
                            discount_price: p.discount_price,
                            stock_quantity: p.stock_quantity,
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();
        priced.sort_by_key(|line| line.product_id);

        let draft = build_order(&priced)?;

        for line in &draft.lines {
            if let Some(product) = state.products.get_mut(&line.product_id) {
                product.stock_quantity -= line.quantity;
                product.updated_at = Utc::now();
            }
        }
        state.carts.remove(&user_id);

        if let Some((user, _)) = state.users.get_mut(&user_id)
            && user.address.is_none()
        {
            user.address = Some(shipping.clone());
            user.updated_at = Utc::now();
        }

        let order = Order {
            id: OrderId::new(state.next_id()),
            user_id,
            lines: draft.lines,
            platform_fee: draft.platform_fee,
            total_amount: draft.total_amount,
            shipping: shipping.clone(),
            status: OrderStatus::Pending,
            payment_method,
            payment_status: PaymentStatus::Pending,
            order_date: Utc::now(),
            shipped_at: None,
            delivered_at: None,
        };
        state.orders.insert(order.id, order.clone());
        Ok(order)
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        Ok(self.state.lock().orders.get(&id).cloned())
    }

    async fn list_orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        let state = self.state.lock();
        let mut orders: Vec<Order> = state
            .orders
            .values()
            .filter(|order| order.user_id == user_id)
            .cloned()
            .collect();
        newest_first(&mut orders, |o| (o.order_date, o.id.as_i32()));
        Ok(orders)
    }

    async fn list_orders(&self) -> Result<Vec<Order>, RepositoryError> {
        let state = self.state.lock();
        let mut orders: Vec<Order> = state.orders.values().cloned().collect();
        newest_first(&mut orders, |o| (o.order_date, o.id.as_i32()));
        Ok(orders)
    }

    async fn update_order_status(
        &self,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<Order, StatusChangeError> {
        let mut state = self.state.lock();
        let current = state
            .orders
            .get(&id)
            .ok_or(RepositoryError::NotFound)?
            .status;
        let next = current.transition(status)?;

        if next == OrderStatus::Cancelled {
            let restock: Vec<(ProductId, i32)> = state
                .orders
                .get(&id)
                .map(|order| {
                    order
                        .lines
                        .iter()
                        .map(|line| (line.product_id, line.quantity))
                        .collect()
                })
                .unwrap_or_default();
            for (product_id, quantity) in restock {
                if let Some(product) = state.products.get_mut(&product_id) {
                    product.stock_quantity += quantity;
                    product.updated_at = Utc::now();
                }
            }
        }

        let order = state.orders.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        order.status = next;
        match next {
            OrderStatus::Shipped => order.shipped_at = Some(Utc::now()),
            OrderStatus::Delivered => order.delivered_at = Some(Utc::now()),
            _ => {}
        }
        Ok(order.clone())
    }

    async fn update_payment_status(
        &self,
        id: OrderId,
        status: PaymentStatus,
    ) -> Result<Order, RepositoryError> {
        let mut state = self.state.lock();
        let order = state.orders.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        order.payment_status = status;
        Ok(order.clone())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;
    use scatch_core::{CheckoutError, Gender};

    use super::*;

    fn bag(name: &str, stock: i32) -> ProductInput {
        ProductInput {
            name: name.into(),
            description: String::new(),
            price: Decimal::from(100),
            discount_price: Decimal::ZERO,
            category: Category::Handbags,
            stock_quantity: stock,
            images: vec![],
            featured: false,
        }
    }

    fn shipping() -> ShippingDetails {
        ShippingDetails {
            full_name: "Asha Rao".into(),
            street: "12 MG Road".into(),
            city: "Pune".into(),
            state: "MH".into(),
            zip_code: "411001".into(),
            phone: "9999999999".into(),
            country: "India".into(),
        }
    }

    async fn shopper(store: &MemoryStore) -> User {
        store
            .create_user(&NewUser {
                fullname: "Asha Rao".into(),
                email: Email::parse("asha@example.com").unwrap(),
                password_hash: "hash".into(),
                gender: Gender::Female,
                age: 30,
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_increment_respects_stock() {
        let store = MemoryStore::with_catalog(&[bag("Tote", 1)]);
        let user = shopper(&store).await;
        let id = ProductId::new(1);

        assert_eq!(
            store
                .increment_cart_line(user.id, id, CartIncrement::CreateIfMissing)
                .await
                .unwrap(),
            CartMutation::Set { quantity: 1 }
        );
        assert_eq!(
            store
                .increment_cart_line(user.id, id, CartIncrement::CreateIfMissing)
                .await
                .unwrap(),
            CartMutation::StockExceeded { available: 1 }
        );
    }

    #[tokio::test]
    async fn test_existing_only_requires_line() {
        let store = MemoryStore::with_catalog(&[bag("Tote", 5)]);
        let user = shopper(&store).await;
        assert_eq!(
            store
                .increment_cart_line(user.id, ProductId::new(1), CartIncrement::ExistingOnly)
                .await
                .unwrap(),
            CartMutation::NotInCart
        );
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let store = MemoryStore::new();
        shopper(&store).await;
        let again = store
            .create_user(&NewUser {
                fullname: "Someone Else".into(),
                email: Email::parse("ASHA@example.com").unwrap(),
                password_hash: "hash".into(),
                gender: Gender::default(),
                age: 40,
            })
            .await;
        assert!(matches!(again, Err(RepositoryError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_place_order_is_all_or_nothing() {
        let store = MemoryStore::with_catalog(&[bag("Tote", 2), bag("Clutch", 1)]);
        let user = shopper(&store).await;
        for _ in 0..2 {
            store
                .increment_cart_line(user.id, ProductId::new(1), CartIncrement::CreateIfMissing)
                .await
                .unwrap();
        }
        store
            .increment_cart_line(user.id, ProductId::new(2), CartIncrement::CreateIfMissing)
            .await
            .unwrap();

        // Someone else buys the last clutch first.
        let mut clutch = bag("Clutch", 0);
        clutch.category = Category::Handbags;
        store
            .update_product(ProductId::new(2), &clutch)
            .await
            .unwrap();

        let err = store
            .place_order(user.id, &shipping(), PaymentMethod::Cod)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PlaceOrderError::Rejected(CheckoutError::InsufficientStock { .. })
        ));
        assert_eq!(store.cart_items(user.id).await.unwrap().len(), 2);
        let tote = store.get_product(ProductId::new(1)).await.unwrap().unwrap();
        assert_eq!(tote.stock_quantity, 2);
        assert!(store.list_orders().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cancel_restocks() {
        let store = MemoryStore::with_catalog(&[bag("Tote", 3)]);
        let user = shopper(&store).await;
        store
            .increment_cart_line(user.id, ProductId::new(1), CartIncrement::CreateIfMissing)
            .await
            .unwrap();
        let order = store
            .place_order(user.id, &shipping(), PaymentMethod::Upi)
            .await
            .unwrap();
        let tote = store.get_product(ProductId::new(1)).await.unwrap().unwrap();
        assert_eq!(tote.stock_quantity, 2);

        let cancelled = store
            .update_order_status(order.id, OrderStatus::Cancelled)
            .await
            .unwrap();
        assert_eq!(cancelled.status, OrderStatus::Cancelled);
        let tote = store.get_product(ProductId::new(1)).await.unwrap().unwrap();
        assert_eq!(tote.stock_quantity, 3);
    }
}
