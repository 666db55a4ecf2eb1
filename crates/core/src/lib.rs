//! Scatch Core - Domain types and pricing rules.
//!
//! This crate provides the types shared by every Scatch component:
//! - `storefront` - Customer-facing shop, cart, checkout and admin back-office
//! - `cli` - Command-line tools for migrations, seeding and admin accounts
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP. Money arithmetic and the order status machine live here so
//! every storage backend computes totals and transitions the same way.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, emails, categories and status enums
//! - [`pricing`] - Effective prices, cart totals, shipping and platform fees
//! - [`checkout`] - Shipping validation and order snapshot construction

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod checkout;
pub mod pricing;
pub mod types;

pub use checkout::{CheckoutError, MissingFields, OrderDraft, OrderLine, PricedLine, ShippingDetails, ShippingForm};
pub use pricing::CartTotals;
pub use types::*;
