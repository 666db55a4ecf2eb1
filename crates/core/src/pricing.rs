//! Money rules: effective prices, cart totals, shipping and the platform fee.
//!
//! Every amount is a [`Decimal`] in the store currency. All totals that reach
//! a page or an order are computed here so the cart view, the checkout
//! preview and the persisted order always agree.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::Serialize;

/// Flat fee added to every order at checkout.
pub const PLATFORM_FEE: Decimal = Decimal::from_parts(20, 0, 0, false, 0);

/// Cart subtotals strictly above this ship for free.
pub const FREE_SHIPPING_THRESHOLD: Decimal = Decimal::from_parts(500, 0, 0, false, 0);

/// Shipping charged at or below [`FREE_SHIPPING_THRESHOLD`].
pub const FLAT_SHIPPING_FEE: Decimal = Decimal::from_parts(10, 0, 0, false, 0);

/// The price a shopper actually pays per unit.
///
/// A positive `discount_price` replaces `price`; zero means no discount.
#[must_use]
pub fn effective_price(price: Decimal, discount_price: Decimal) -> Decimal {
    if discount_price > Decimal::ZERO {
        discount_price
    } else {
        price
    }
}

/// Whole-number percentage saved by the discount, for badges.
#[must_use]
pub fn discount_percentage(price: Decimal, discount_price: Decimal) -> u32 {
    if price <= Decimal::ZERO || discount_price <= Decimal::ZERO || discount_price >= price {
        return 0;
    }
    let saved = (price - discount_price) / price * Decimal::ONE_HUNDRED;
    saved.round().to_u32().unwrap_or(0)
}

/// `unit_price x quantity`.
#[must_use]
pub fn line_subtotal(unit_price: Decimal, quantity: i32) -> Decimal {
    unit_price * Decimal::from(quantity)
}

/// Shipping for a cart subtotal.
#[must_use]
pub fn shipping_fee(subtotal: Decimal) -> Decimal {
    if subtotal > FREE_SHIPPING_THRESHOLD {
        Decimal::ZERO
    } else {
        FLAT_SHIPPING_FEE
    }
}

/// Aggregate figures for a cart page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CartTotals {
    /// Sum of line subtotals.
    pub subtotal: Decimal,
    pub shipping_fee: Decimal,
    /// `subtotal + shipping_fee`.
    pub total: Decimal,
    /// Sum of line quantities.
    pub item_count: i64,
}

impl CartTotals {
    /// Totals for an empty cart.
    pub const EMPTY: Self = Self {
        subtotal: Decimal::ZERO,
        shipping_fee: Decimal::ZERO,
        total: Decimal::ZERO,
        item_count: 0,
    };

    /// Compute totals from `(effective unit price, quantity)` pairs.
    ///
    /// An empty cart owes nothing, shipping included.
    pub fn from_lines<I>(lines: I) -> Self
    where
        I: IntoIterator<Item = (Decimal, i32)>,
    {
        let (subtotal, item_count) = lines.into_iter().fold(
            (Decimal::ZERO, 0_i64),
            |(sum, count), (unit, quantity)| {
                (sum + line_subtotal(unit, quantity), count + i64::from(quantity))
            },
        );

        if item_count == 0 {
            return Self::EMPTY;
        }

        let shipping_fee = shipping_fee(subtotal);
        Self {
            subtotal,
            shipping_fee,
            total: subtotal + shipping_fee,
            item_count,
        }
    }
}

/// `subtotal + PLATFORM_FEE`, the amount charged for an order.
#[must_use]
pub fn order_total(subtotal: Decimal) -> Decimal {
    subtotal + PLATFORM_FEE
}
