//! Business logic services for the storefront.
//!
//! Each service borrows the [`Store`](crate::db::Store) for the length of
//! one request and turns storage outcomes into user-facing errors.
//!
//! # Services
//!
//! - `auth` - Shopper and owner accounts, signed identity tokens
//! - `cart` - Cart lines bounded by live stock
//! - `catalog` - Shop listings and admin product management
//! - `orders` - Checkout and the order lifecycle

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod orders;

pub use auth::{
    AuthError, AuthService, Registration, TOKEN_TTL_SECONDS, TokenKeys, TokenScope,
};
pub use cart::{CartAction, CartError, CartService, CartSummary};
pub use catalog::{CatalogError, CatalogService, ShopListing};
pub use orders::{CheckoutSummary, OrderError, OrderService};
