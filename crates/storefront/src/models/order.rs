//! Placed order type.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use scatch_core::{OrderId, OrderLine, OrderStatus, PaymentMethod, PaymentStatus, ShippingDetails, UserId};

/// An immutable order snapshot.
///
/// Only `status`, `payment_status` and the status timestamps change after
/// creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub lines: Vec<OrderLine>,
    pub platform_fee: Decimal,
    /// Sum of line subtotals plus `platform_fee`.
    pub total_amount: Decimal,
    pub shipping: ShippingDetails,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub order_date: DateTime<Utc>,
    pub shipped_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
}

impl Order {
    #[must_use]
    pub fn order_number(&self) -> String {
        self.id.order_number()
    }

    /// Sum of line subtotals, before the platform fee.
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        self.lines.iter().map(|line| line.subtotal).sum()
    }

    #[must_use]
    pub fn item_count(&self) -> i64 {
        self.lines.iter().map(|line| i64::from(line.quantity)).sum()
    }

    /// Order date as shown on receipts, e.g. `18 Oct 2026`.
    #[must_use]
    pub fn placed_on(&self) -> String {
        self.order_date.format("%d %b %Y").to_string()
    }

    /// Whether an owner can still cancel this order.
    #[must_use]
    pub fn is_cancellable(&self) -> bool {
        self.status.can_transition_to(OrderStatus::Cancelled)
    }
}
