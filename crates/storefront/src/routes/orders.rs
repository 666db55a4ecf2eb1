//! Checkout and order history handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};
use rust_decimal::Decimal;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use scatch_core::{OrderId, PaymentMethod, ShippingForm};

use crate::error::{AppError, ErrorKind};
use crate::filters;
use crate::middleware::{RequireUser, push_notice};
use crate::models::{Notice, Order};
use crate::routes::cart::CartLineView;
use crate::routes::page::{Layout, PageContext};
use crate::services::{OrderError, OrderService};
use crate::state::AppState;

/// Checkout form: the shipping fields plus a payment method.
#[derive(Debug, Deserialize)]
pub struct PlaceOrderForm {
    #[serde(flatten)]
    pub shipping: ShippingForm,
    #[serde(default, rename = "paymentMethod")]
    pub payment_method: String,
}

/// Payment method option for the checkout form.
#[derive(Debug, Clone)]
pub struct PaymentOption {
    pub label: &'static str,
    pub selected: bool,
}

/// Checkout page template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/checkout.html")]
pub struct CheckoutTemplate {
    pub layout: Layout,
    pub lines: Vec<CartLineView>,
    pub subtotal: Decimal,
    pub platform_fee: Decimal,
    pub total: Decimal,
    pub prefill: ShippingForm,
    pub payment_options: Vec<PaymentOption>,
}

/// Order confirmation and detail page template.
#[derive(Template, WebTemplate)]
#[template(path = "orders/detail.html")]
pub struct OrderDetailTemplate {
    pub layout: Layout,
    pub order: Order,
}

/// Order history template.
#[derive(Template, WebTemplate)]
#[template(path = "orders/list.html")]
pub struct OrderListTemplate {
    pub layout: Layout,
    pub orders: Vec<Order>,
}

/// Display the checkout page. An empty cart sends the shopper back to it.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn checkout_page(
    State(state): State<AppState>,
    session: Session,
    page: PageContext,
    RequireUser(user): RequireUser,
) -> Response {
    let summary = match OrderService::new(state.store())
        .checkout_summary(&user)
        .await
    {
        Ok(summary) => summary,
        Err(e) => return AppError::from(e).redirect_with_notice(&session, "/cart").await,
    };

    CheckoutTemplate {
        layout: page.layout("Checkout").await,
        lines: summary.cart.items.iter().map(CartLineView::from).collect(),
        subtotal: summary.subtotal,
        platform_fee: summary.platform_fee,
        total: summary.total,
        prefill: summary.prefill,
        payment_options: payment_options(PaymentMethod::default()),
    }
    .into_response()
}

fn payment_options(selected: PaymentMethod) -> Vec<PaymentOption> {
    PaymentMethod::ALL
        .into_iter()
        .map(|method| PaymentOption {
            label: method.label(),
            selected: method == selected,
        })
        .collect()
}

/// Place an order from the cart.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn place_order(
    State(state): State<AppState>,
    session: Session,
    RequireUser(user): RequireUser,
    Form(form): Form<PlaceOrderForm>,
) -> Response {
    match OrderService::new(state.store())
        .place_order(user.id, form.shipping, &form.payment_method)
        .await
    {
        Ok(order) => {
            push_notice(&session, Notice::success("Order placed successfully!")).await;
            Redirect::to(&format!("/order/{}", order.id)).into_response()
        }
        Err(e) => {
            let err = AppError::from(e);
            let back = if err.kind() == ErrorKind::EmptyCart {
                "/cart"
            } else {
                "/checkout"
            };
            err.redirect_with_notice(&session, back).await
        }
    }
}

/// Display one of the shopper's orders.
#[instrument(skip(state, session, page, user), fields(user_id = %user.id))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    page: PageContext,
    RequireUser(user): RequireUser,
    Path(id): Path<String>,
) -> Response {
    let Ok(order_id) = id.parse::<OrderId>() else {
        return AppError::from(OrderError::NotFound)
            .redirect_with_notice(&session, "/orders")
            .await;
    };

    match OrderService::new(state.store())
        .get_order(order_id, user.id)
        .await
    {
        Ok(order) => OrderDetailTemplate {
            layout: page.layout(&format!("Order {}", order.order_number())).await,
            order,
        }
        .into_response(),
        Err(e) => AppError::from(e).redirect_with_notice(&session, "/orders").await,
    }
}

/// Display the shopper's order history.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn index(
    State(state): State<AppState>,
    session: Session,
    page: PageContext,
    RequireUser(user): RequireUser,
) -> Response {
    match OrderService::new(state.store()).list_orders(user.id).await {
        Ok(orders) => OrderListTemplate {
            layout: page.layout("My Orders").await,
            orders,
        }
        .into_response(),
        Err(e) => AppError::from(e).redirect_with_notice(&session, "/shop").await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_options_mark_default() {
        let options = payment_options(PaymentMethod::Cod);
        assert_eq!(options.len(), PaymentMethod::ALL.len());
        assert_eq!(
            options.iter().filter(|o| o.selected).map(|o| o.label).collect::<Vec<_>>(),
            vec!["COD"]
        );
    }
}
