//! Checkout, order placement and order history.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use axum::http::StatusCode;
use rust_decimal::Decimal;

use scatch_core::{OrderStatus, PaymentMethod, PaymentStatus, ProductId};
use scatch_integration_tests::{TestApp, TestResponse};
use scatch_storefront::db::Store;

const SHIPPING: [(&str, &str); 6] = [
    ("fullName", "Asha Verma"),
    ("address", "12 MG Road"),
    ("city", "Bengaluru"),
    ("state", "Karnataka"),
    ("zipCode", "560001"),
    ("phone", "9876543210"),
];

async fn place(app: &mut TestApp, payment_method: &str) -> TestResponse {
    let mut fields = SHIPPING.to_vec();
    fields.push(("paymentMethod", payment_method));
    app.post_form("/order", &fields).await
}

async fn shopper_with_cart(email: &str, products: &[u32]) -> TestApp {
    let mut app = TestApp::new();
    app.register_shopper(email).await;
    for id in products {
        app.post_form(&format!("/cart/add/{id}"), &[]).await;
    }
    app
}

#[tokio::test]
async fn test_checkout_page_shows_fee_and_total() {
    let mut app = shopper_with_cart("asha@example.com", &[8]).await;

    let res = app.get("/checkout").await;
    assert_eq!(res.status, StatusCode::OK);
    let body = res.text();
    assert!(body.contains("Designer Wristlet"));
    // 999 plus the 20 platform fee.
    assert!(body.contains("1019"));
    // Name is prefilled from the account.
    assert!(body.contains("Asha Verma"));
}

#[tokio::test]
async fn test_empty_cart_cannot_check_out() {
    let mut app = shopper_with_cart("asha@example.com", &[]).await;

    let page = app.get("/checkout").await;
    assert_eq!(page.location(), Some("/cart"));
    assert!(app.get("/cart").await.text().contains("Your cart is empty!"));

    let order = place(&mut app, "COD").await;
    assert_eq!(order.location(), Some("/cart"));
    assert!(app.state().store().list_orders().await.unwrap().is_empty());

    // An empty cart wins over a bad payment method.
    let bogus = place(&mut app, "Barter").await;
    assert_eq!(bogus.location(), Some("/cart"));
    assert!(app.get("/cart").await.text().contains("Your cart is empty!"));
}

#[tokio::test]
async fn test_place_order() {
    let mut app = shopper_with_cart("asha@example.com", &[1, 1, 7]).await;

    let res = place(&mut app, "UPI").await;
    assert_eq!(res.status, StatusCode::SEE_OTHER);
    let location = res.location().unwrap().to_owned();
    assert!(location.starts_with("/order/"));

    let detail = app.get(&location).await;
    assert_eq!(detail.status, StatusCode::OK);
    let body = detail.text();
    assert!(body.contains("Order placed successfully!"));
    assert!(body.contains("Classic Leather Backpack"));
    assert!(body.contains("Evening Clutch"));

    let orders = app.state().store().list_orders().await.unwrap();
    assert_eq!(orders.len(), 1);
    let order = &orders[0];
    // 2 x 4299 + 1499, plus the platform fee.
    assert_eq!(order.subtotal(), Decimal::new(10097, 0));
    assert_eq!(order.total_amount, Decimal::new(10117, 0));
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.payment_method, PaymentMethod::Upi);
    assert_eq!(order.payment_status, PaymentStatus::Pending);
    assert_eq!(order.shipping.street, "12 MG Road");
    assert_eq!(order.shipping.country, "India");

    // Stock moved and the cart is empty.
    let backpack = app
        .state()
        .store()
        .get_product(ProductId::new(1))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(backpack.stock_quantity, 10);
    assert_eq!(app.get("/cart/count").await.json()["cartCount"], 0);
}

#[tokio::test]
async fn test_missing_shipping_fields_are_named() {
    let mut app = shopper_with_cart("asha@example.com", &[2]).await;

    let res = app
        .post_form(
            "/order",
            &[("fullName", "Asha Verma"), ("address", "  "), ("paymentMethod", "COD")],
        )
        .await;
    assert_eq!(res.location(), Some("/checkout"));

    let page = app.get("/checkout").await.text();
    assert!(page.contains("Please fill all shipping details!"));
    assert!(page.contains("zipCode"));
    assert!(app.state().store().list_orders().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unknown_payment_method_is_refused() {
    let mut app = shopper_with_cart("asha@example.com", &[2]).await;

    let res = place(&mut app, "Barter").await;
    assert_eq!(res.location(), Some("/checkout"));
    assert!(app.state().store().list_orders().await.unwrap().is_empty());
    assert_eq!(app.get("/cart/count").await.json()["cartCount"], 1);
}

#[tokio::test]
async fn test_order_fails_when_stock_ran_out() {
    let mut app = shopper_with_cart("asha@example.com", &[9]).await;

    // Another shopper buys every Luxury Mini Bag first.
    let asha_token = app.cookie("token").unwrap().to_owned();
    app.clear_cookies();
    app.register_shopper("ravi@example.com").await;
    for _ in 0..6 {
        app.post_form("/cart/add/9", &[]).await;
    }
    let ravi = place(&mut app, "Card").await;
    assert!(ravi.location().unwrap().starts_with("/order/"));

    app.clear_cookies();
    app.set_cookie("token", &asha_token);
    let res = place(&mut app, "COD").await;
    assert_eq!(res.location(), Some("/checkout"));
    assert_eq!(app.state().store().list_orders().await.unwrap().len(), 1);
    assert_eq!(app.get("/cart/count").await.json()["cartCount"], 1);
}

#[tokio::test]
async fn test_saved_address_prefills_next_checkout() {
    let mut app = shopper_with_cart("asha@example.com", &[2]).await;
    place(&mut app, "COD").await;

    app.post_form("/cart/add/4", &[]).await;
    let page = app.get("/checkout").await.text();
    assert!(page.contains("12 MG Road"));
    assert!(page.contains("560001"));
}

#[tokio::test]
async fn test_order_history_and_ownership() {
    let mut app = shopper_with_cart("asha@example.com", &[5]).await;
    let location = place(&mut app, "COD").await.location().unwrap().to_owned();

    let history = app.get("/orders").await;
    assert_eq!(history.status, StatusCode::OK);
    let orders = app.state().store().list_orders().await.unwrap();
    assert!(history.text().contains(&orders[0].order_number()));

    // Someone else's order reads as missing.
    app.clear_cookies();
    app.register_shopper("ravi@example.com").await;
    let res = app.get(&location).await;
    assert_eq!(res.location(), Some("/orders"));
    assert!(app.get("/orders").await.text().contains("Order not found!"));

    let garbage = app.get("/order/not-an-id").await;
    assert_eq!(garbage.location(), Some("/orders"));
}
