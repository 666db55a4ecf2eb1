//! Owner back office: login, catalog edits and order fulfilment.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use axum::http::StatusCode;
use rust_decimal::Decimal;

use scatch_core::{OrderId, OrderStatus, PaymentStatus, ProductId};
use scatch_integration_tests::{OWNER_EMAIL, TestApp};
use scatch_storefront::db::Store;

const SHIPPING: [(&str, &str); 7] = [
    ("fullName", "Asha Verma"),
    ("address", "12 MG Road"),
    ("city", "Bengaluru"),
    ("state", "Karnataka"),
    ("zipCode", "560001"),
    ("phone", "9876543210"),
    ("paymentMethod", "COD"),
];

/// A shopper buys two units of product 1, then the owner logs in.
async fn owner_with_order() -> (TestApp, OrderId) {
    let mut app = TestApp::new();
    app.register_shopper("asha@example.com").await;
    app.post_form("/cart/add/1", &[]).await;
    app.post_form("/cart/add/1", &[]).await;
    app.post_form("/order", &SHIPPING).await;
    let order_id = app.state().store().list_orders().await.unwrap()[0].id;

    app.clear_cookies();
    app.login_owner().await;
    (app, order_id)
}

async fn order_status(app: &TestApp, id: OrderId) -> OrderStatus {
    app.state().store().get_order(id).await.unwrap().unwrap().status
}

async fn stock_of(app: &TestApp, id: i32) -> i32 {
    app.state()
        .store()
        .get_product(ProductId::new(id))
        .await
        .unwrap()
        .unwrap()
        .stock_quantity
}

#[tokio::test]
async fn test_owner_login_and_logout() {
    let mut app = TestApp::new();

    let res = app.login_owner().await;
    assert_eq!(res.location(), Some("/owners/admin"));
    assert!(app.cookie("admin_token").is_some());

    let dashboard = app.get("/owners/admin").await;
    assert_eq!(dashboard.status, StatusCode::OK);
    let body = dashboard.text();
    assert!(body.contains("Admin login successful!"));
    assert!(body.contains("Classic Leather Backpack"));
    // Sold-out products still show here.
    assert!(body.contains("Designer Nylon Backpack"));

    let out = app.get("/owners/logout").await;
    assert_eq!(out.location(), Some("/owners/login"));
    assert!(app.cookie("admin_token").is_none());
    assert_eq!(app.get("/owners/admin").await.location(), Some("/owners/login"));
}

#[tokio::test]
async fn test_owner_login_rejects_bad_password_and_shoppers() {
    let mut app = TestApp::new();
    app.login_owner().await;
    app.clear_cookies();

    let wrong = app
        .post_form("/owners/login", &[("email", OWNER_EMAIL), ("password", "nope-nope")])
        .await;
    assert_eq!(wrong.location(), Some("/owners/login"));
    assert!(app.cookie("admin_token").is_none());

    // Shopper credentials do not open the back office.
    app.register_shopper("asha@example.com").await;
    let shopper = app
        .post_form(
            "/owners/login",
            &[
                ("email", "asha@example.com"),
                ("password", scatch_integration_tests::TEST_PASSWORD),
            ],
        )
        .await;
    assert_eq!(shopper.location(), Some("/owners/login"));
    assert!(app.cookie("admin_token").is_none());
}

#[tokio::test]
async fn test_create_product() {
    let mut app = TestApp::new();
    app.login_owner().await;

    let res = app
        .post_form(
            "/owners/admin/products/create",
            &[
                ("name", "Weekender Duffel"),
                ("description", "Roomy canvas duffel."),
                ("price", "3999"),
                ("discount_price", ""),
                ("category", "Backpacks"),
                ("stock_quantity", "4"),
                ("image_url", "https://img.scatch.test/duffel.jpg"),
                ("featured", "on"),
            ],
        )
        .await;
    assert_eq!(res.location(), Some("/owners/admin"));

    let shop = app.get("/shop?search=duffel").await.text();
    assert!(shop.contains("Weekender Duffel"));
}

#[tokio::test]
async fn test_create_product_rejects_bad_input() {
    let mut app = TestApp::new();
    app.login_owner().await;

    let res = app
        .post_form(
            "/owners/admin/products/create",
            &[("name", "Broken Bag"), ("price", "lots"), ("category", "Backpacks")],
        )
        .await;
    assert_eq!(res.location(), Some("/owners/admin"));
    assert!(app.get("/owners/admin").await.text().contains("Please enter a valid price."));

    let discount = app
        .post_form(
            "/owners/admin/products/create",
            &[
                ("name", "Odd Bag"),
                ("price", "100"),
                ("discount_price", "150"),
                ("category", "Clutches"),
            ],
        )
        .await;
    assert_eq!(discount.location(), Some("/owners/admin"));
    let body = app.get("/owners/admin").await.text();
    assert!(body.contains("Discount price must be below the regular price."));
    assert!(!body.contains("Odd Bag"));
}

#[tokio::test]
async fn test_edit_product_keeps_images_when_url_is_blank() {
    let mut app = TestApp::new();
    app.login_owner().await;

    let page = app.get("/owners/admin/products/edit/2").await;
    assert_eq!(page.status, StatusCode::OK);
    assert!(page.text().contains("Modern Canvas Backpack"));

    let res = app
        .post_form(
            "/owners/admin/products/edit/2",
            &[
                ("name", "Modern Canvas Backpack"),
                ("description", "Now in olive."),
                ("price", "2299"),
                ("category", "Backpacks"),
                ("stock_quantity", "18"),
                ("image_url", ""),
            ],
        )
        .await;
    assert_eq!(res.location(), Some("/owners/admin"));

    let product = app
        .state()
        .store()
        .get_product(ProductId::new(2))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(product.price, Decimal::new(2299, 0));
    assert_eq!(product.stock_quantity, 18);
    assert_eq!(product.images.len(), 1);
    assert!(!product.featured);
}

#[tokio::test]
async fn test_edit_product_rerenders_form_on_error() {
    let mut app = TestApp::new();
    app.login_owner().await;

    let res = app
        .post_form(
            "/owners/admin/products/edit/2",
            &[("name", "Modern Canvas Backpack"), ("price", "2299"), ("category", "Totes")],
        )
        .await;
    assert!(res.location().is_none());
    assert!(res.text().contains("Please choose a category."));
    assert_eq!(stock_of(&app, 2).await, 25);

    let missing = app.get("/owners/admin/products/edit/999").await;
    assert_eq!(missing.location(), Some("/owners/admin"));
}

#[tokio::test]
async fn test_delete_product() {
    let mut app = TestApp::new();
    app.login_owner().await;

    let res = app.post_form("/owners/admin/products/delete/4", &[]).await;
    assert_eq!(res.location(), Some("/owners/admin"));
    assert!(app.get("/owners/admin").await.text().contains("Product deleted successfully!"));

    assert_eq!(app.get("/product/4").await.location(), Some("/shop"));
}

#[tokio::test]
async fn test_order_moves_through_its_lifecycle() {
    let (mut app, order_id) = owner_with_order().await;
    let path = format!("/owners/admin/orders/{order_id}/status");

    let dashboard = app.get("/owners/admin").await.text();
    assert!(dashboard.contains(&order_id.order_number()));

    for next in ["Processing", "Shipped", "Delivered"] {
        let res = app.post_form(&path, &[("status", next)]).await;
        assert_eq!(res.location(), Some("/owners/admin"));
    }
    assert_eq!(order_status(&app, order_id).await, OrderStatus::Delivered);

    let order = app.state().store().get_order(order_id).await.unwrap().unwrap();
    assert!(order.shipped_at.is_some());
    assert!(order.delivered_at.is_some());
}

#[tokio::test]
async fn test_invalid_transitions_are_refused() {
    let (mut app, order_id) = owner_with_order().await;
    let path = format!("/owners/admin/orders/{order_id}/status");

    let skip = app.post_form(&path, &[("status", "Delivered")]).await;
    assert_eq!(skip.location(), Some("/owners/admin"));
    assert_eq!(order_status(&app, order_id).await, OrderStatus::Pending);

    let nonsense = app.post_form(&path, &[("status", "Teleported")]).await;
    assert_eq!(nonsense.location(), Some("/owners/admin"));
    assert_eq!(order_status(&app, order_id).await, OrderStatus::Pending);

    let unknown = app
        .post_form("/owners/admin/orders/999/status", &[("status", "Processing")])
        .await;
    assert_eq!(unknown.location(), Some("/owners/admin"));
}

#[tokio::test]
async fn test_cancelling_restocks() {
    let (mut app, order_id) = owner_with_order().await;
    assert_eq!(stock_of(&app, 1).await, 10);

    let path = format!("/owners/admin/orders/{order_id}/status");
    app.post_form(&path, &[("status", "Cancelled")]).await;

    assert_eq!(order_status(&app, order_id).await, OrderStatus::Cancelled);
    assert_eq!(stock_of(&app, 1).await, 12);

    // Cancelled is terminal.
    app.post_form(&path, &[("status", "Processing")]).await;
    assert_eq!(order_status(&app, order_id).await, OrderStatus::Cancelled);
}

#[tokio::test]
async fn test_payment_status() {
    let (mut app, order_id) = owner_with_order().await;

    let res = app
        .post_form(
            &format!("/owners/admin/orders/{order_id}/payment"),
            &[("paymentStatus", "Paid")],
        )
        .await;
    assert_eq!(res.location(), Some("/owners/admin"));

    let order = app.state().store().get_order(order_id).await.unwrap().unwrap();
    assert_eq!(order.payment_status, PaymentStatus::Paid);
}

#[tokio::test]
async fn test_shoppers_cannot_manage_orders() {
    let (mut app, order_id) = owner_with_order().await;
    app.clear_cookies();
    app.register_shopper("ravi@example.com").await;

    let res = app
        .post_form(
            &format!("/owners/admin/orders/{order_id}/status"),
            &[("status", "Processing")],
        )
        .await;
    assert_eq!(res.location(), Some("/owners/login"));
    assert_eq!(order_status(&app, order_id).await, OrderStatus::Pending);
}
