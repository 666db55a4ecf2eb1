//! Checkout rules shared by every storage backend.
//!
//! A backend loads the shopper's cart lines together with live product data
//! (inside its transaction), hands them to [`build_order`], and persists the
//! resulting [`OrderDraft`] only if this returns `Ok`.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::pricing::{self, PLATFORM_FEE};
use crate::types::ProductId;

/// Country recorded when the shopper leaves it blank.
pub const DEFAULT_COUNTRY: &str = "India";

/// Raw shipping fields as submitted by the checkout form.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingForm {
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub zip_code: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub country: String,
}

/// Shipping fields that were blank.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("Please fill all shipping details! Missing: {}", .0.join(", "))]
pub struct MissingFields(pub Vec<&'static str>);

impl ShippingForm {
    /// Trim every field and require all but `country`.
    ///
    /// # Errors
    ///
    /// Returns [`MissingFields`] naming each blank required field.
    pub fn validate(self) -> Result<ShippingDetails, MissingFields> {
        let required = [
            ("fullName", &self.full_name),
            ("address", &self.address),
            ("city", &self.city),
            ("state", &self.state),
            ("zipCode", &self.zip_code),
            ("phone", &self.phone),
        ];
        let missing: Vec<&'static str> = required
            .iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(name, _)| *name)
            .collect();
        if !missing.is_empty() {
            return Err(MissingFields(missing));
        }

        let country = match self.country.trim() {
            "" => DEFAULT_COUNTRY.to_owned(),
            other => other.to_owned(),
        };

        Ok(ShippingDetails {
            full_name: self.full_name.trim().to_owned(),
            street: self.address.trim().to_owned(),
            city: self.city.trim().to_owned(),
            state: self.state.trim().to_owned(),
            zip_code: self.zip_code.trim().to_owned(),
            phone: self.phone.trim().to_owned(),
            country,
        })
    }
}

/// A validated shipping address, captured on the order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingDetails {
    pub full_name: String,
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub phone: String,
    pub country: String,
}

impl From<&ShippingDetails> for ShippingForm {
    fn from(details: &ShippingDetails) -> Self {
        Self {
            full_name: details.full_name.clone(),
            address: details.street.clone(),
            city: details.city.clone(),
            state: details.state.clone(),
            zip_code: details.zip_code.clone(),
            phone: details.phone.clone(),
            country: details.country.clone(),
        }
    }
}

/// A cart line joined with the product's current price and stock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedLine {
    pub product_id: ProductId,
    pub name: String,
    pub quantity: i32,
    pub price: Decimal,
    pub discount_price: Decimal,
    pub stock_quantity: i32,
}

/// One immutable line of a placed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: ProductId,
    /// Product name at purchase time.
    pub product_name: String,
    pub quantity: i32,
    pub price: Decimal,
    pub discount_price: Decimal,
    /// `effective_price x quantity`, fixed at purchase time.
    pub subtotal: Decimal,
}

impl OrderLine {
    /// Unit price actually charged.
    #[must_use]
    pub fn unit_price(&self) -> Decimal {
        pricing::effective_price(self.price, self.discount_price)
    }
}

/// Priced order ready to persist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderDraft {
    pub lines: Vec<OrderLine>,
    pub platform_fee: Decimal,
    /// Sum of line subtotals plus `platform_fee`.
    pub total_amount: Decimal,
}

/// Reasons a cart cannot become an order.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CheckoutError {
    #[error("cart is empty")]
    EmptyCart,
    #[error("only {available} of {name} left in stock, {requested} requested")]
    InsufficientStock {
        product_id: ProductId,
        name: String,
        requested: i32,
        available: i32,
    },
}

/// Snapshot live cart lines into an order.
///
/// # Errors
///
/// - [`CheckoutError::EmptyCart`] if there are no lines
/// - [`CheckoutError::InsufficientStock`] for the first line whose quantity
///   exceeds the product's current stock
pub fn build_order(lines: &[PricedLine]) -> Result<OrderDraft, CheckoutError> {
    if lines.is_empty() {
        return Err(CheckoutError::EmptyCart);
    }

    let mut order_lines = Vec::with_capacity(lines.len());
    for line in lines {
        if line.quantity > line.stock_quantity {
            return Err(CheckoutError::InsufficientStock {
                product_id: line.product_id,
                name: line.name.clone(),
                requested: line.quantity,
                available: line.stock_quantity,
            });
        }

        let unit = pricing::effective_price(line.price, line.discount_price);
        order_lines.push(OrderLine {
            product_id: line.product_id,
            product_name: line.name.clone(),
            quantity: line.quantity,
            price: line.price,
            discount_price: line.discount_price,
            subtotal: pricing::line_subtotal(unit, line.quantity),
        });
    }

    let subtotal: Decimal = order_lines.iter().map(|line| line.subtotal).sum();
    Ok(OrderDraft {
        lines: order_lines,
        platform_fee: PLATFORM_FEE,
        total_amount: pricing::order_total(subtotal),
    })
}
