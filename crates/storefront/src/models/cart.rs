//! Cart line types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use scatch_core::pricing;

use super::Product;

/// A cart line joined with live product data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartItem {
    pub product: Product,
    /// Always at least 1.
    pub quantity: i32,
    pub added_at: DateTime<Utc>,
}

impl CartItem {
    /// `effective_price x quantity` at current prices.
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        pricing::line_subtotal(self.product.effective_price(), self.quantity)
    }
}

/// How an increment treats a product that is not yet in the cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartIncrement {
    /// Add-to-cart: create the line with quantity 1.
    CreateIfMissing,
    /// Quantity stepper: the line must already exist.
    ExistingOnly,
}

/// Outcome of an atomic cart line mutation.
///
/// Every variant other than `Set` and `Removed` means nothing was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartMutation {
    /// The line now has this quantity.
    Set { quantity: i32 },
    /// The line was deleted.
    Removed,
    ProductNotFound,
    NotInCart,
    OutOfStock,
    /// The increment would exceed `available` units.
    StockExceeded { available: i32 },
}
