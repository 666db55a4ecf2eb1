//! Custom Askama template filters.

#![allow(clippy::unnecessary_wraps)]

use std::fmt::Display;

/// Currency symbol shown before prices.
pub const CURRENCY_SYMBOL: &str = "₹";

/// Returns the current year.
///
/// Usage in templates: `{{ ""|current_year }}`
#[askama::filter_fn]
pub fn current_year(_value: impl Display, _env: &dyn askama::Values) -> askama::Result<i32> {
    use chrono::Datelike;
    Ok(chrono::Utc::now().year())
}

/// Formats an amount with the currency symbol and two decimals.
///
/// Usage in templates: `{{ product.price|money }}`
#[askama::filter_fn]
pub fn money(amount: impl Display, _env: &dyn askama::Values) -> askama::Result<String> {
    Ok(format_money(&amount))
}

fn format_money(amount: &impl Display) -> String {
    format!("{CURRENCY_SYMBOL}{amount:.2}")
}
