//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                            - Redirect to /shop or /login
//! GET  /health                      - Liveness
//! GET  /health/ready                - Readiness (store reachable)
//!
//! # Auth
//! GET  /login, /register, /signup   - Forms
//! POST /login, /register, /signup   - Actions (rate limited)
//! GET  /users/logout                - Clear the shopper token
//!
//! # Shop
//! GET  /shop?category=&search=      - In-stock products
//! GET  /new-arrivals                - Latest in-stock products
//! GET  /product/{id}                - Product detail
//! GET  /product/{id}/quick-view     - Quick view fragment
//!
//! # Cart (shopper)
//! GET  /cart                        - Cart page
//! POST /cart/add/{id}, /addtocart/{id} - Add one unit
//! POST /cart/update                 - Quantity stepper (JSON)
//! POST /cart/remove/{id}            - Remove a line
//! GET  /cart/count                  - Badge count (JSON)
//!
//! # Orders (shopper)
//! GET  /checkout                    - Checkout page
//! POST /order                       - Place the order
//! GET  /order/{id}                  - Order detail
//! GET  /orders                      - Order history
//!
//! # Owners
//! GET  /owners/login                - Form
//! POST /owners/login                - Action (rate limited)
//! GET  /owners/logout               - Clear the owner token
//! GET  /owners/admin                - Products and orders
//! GET  /admin/dashboard             - Alias for /owners/admin
//! POST /owners/admin/products/create
//! GET|POST /owners/admin/products/edit/{id}
//! POST /owners/admin/products/delete/{id}
//! POST /owners/admin/orders/{id}/status
//! POST /owners/admin/orders/{id}/payment
//! ```

pub mod admin;
pub mod auth;
pub mod cart;
pub mod health;
pub mod home;
pub mod orders;
pub mod page;
pub mod products;

use axum::{
    Router,
    routing::{get, post},
};

use crate::middleware::auth_rate_limiter;
use crate::state::AppState;

/// Form posts that check a password or create an account.
fn credential_routes(rate_limited: bool) -> Router<AppState> {
    let router = Router::new()
        .route("/login", post(auth::login))
        .route("/register", post(auth::register))
        .route("/signup", post(auth::register))
        .route("/owners/login", post(admin::login));

    if !rate_limited {
        return router;
    }
    match auth_rate_limiter() {
        Some(limiter) => router.layer(limiter),
        None => {
            tracing::warn!("auth rate limiter unavailable, continuing without it");
            router
        }
    }
}

/// Create the shop routes router.
pub fn shop_routes() -> Router<AppState> {
    Router::new()
        .route("/shop", get(products::shop))
        .route("/new-arrivals", get(products::new_arrivals))
        .route("/product/{id}", get(products::show))
        .route("/product/{id}/quick-view", get(products::quick_view))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add/{id}", post(cart::add))
        .route("/update", post(cart::update))
        .route("/remove/{id}", post(cart::remove))
        .route("/count", get(cart::count))
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/checkout", get(orders::checkout_page))
        .route("/order", post(orders::place_order))
        .route("/order/{id}", get(orders::show))
        .route("/orders", get(orders::index))
}

/// Create the owner routes router.
pub fn owner_routes() -> Router<AppState> {
    Router::new()
        .route("/owners/login", get(admin::login_page))
        .route("/owners/logout", get(admin::logout))
        .route("/owners/admin", get(admin::dashboard))
        .route("/owners/admin/products/create", post(admin::create_product))
        .route(
            "/owners/admin/products/edit/{id}",
            get(admin::edit_product_page).post(admin::update_product),
        )
        .route("/owners/admin/products/delete/{id}", post(admin::delete_product))
        .route(
            "/owners/admin/orders/{id}/status",
            post(admin::update_order_status),
        )
        .route(
            "/owners/admin/orders/{id}/payment",
            post(admin::update_payment_status),
        )
}

/// Create all routes for the storefront.
pub fn routes(rate_limit_auth: bool) -> Router<AppState> {
    Router::new()
        .route("/", get(home::home))
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        // Auth pages
        .route("/login", get(auth::login_page))
        .route("/register", get(auth::register_page))
        .route("/signup", get(auth::register_page))
        .route("/users/logout", get(auth::logout))
        .merge(credential_routes(rate_limit_auth))
        .merge(shop_routes())
        .nest("/cart", cart_routes())
        .route("/addtocart/{id}", post(cart::add))
        .merge(order_routes())
        .merge(owner_routes())
        .route("/admin/dashboard", get(home::admin_dashboard_alias))
        .fallback(home::fallback)
}
