//! Owner back office: login, product management and order fulfilment.

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

use scatch_core::{Category, OrderId, OrderStatus, PaymentStatus, ProductId};

use crate::error::AppError;
use crate::filters;
use crate::middleware::{
    RequireAdmin, push_notice, redirect_with_cookie, removal_cookie, token_cookie,
};
use crate::models::{Admin, Notice, Order, Product, ProductImage, ProductInput};
use crate::routes::auth::LoginForm;
use crate::routes::page::{Layout, PageContext};
use crate::services::{AuthService, CatalogError, CatalogService, OrderService, TokenScope};
use crate::state::AppState;

const DASHBOARD: &str = "/owners/admin";

// =============================================================================
// Form Types
// =============================================================================

/// Product create/edit form. Every field arrives as text and is checked
/// before it becomes a [`ProductInput`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub price: String,
    #[serde(default)]
    pub discount_price: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub stock_quantity: String,
    #[serde(default)]
    pub image_url: String,
    /// Checkbox; present only when ticked.
    pub featured: Option<String>,
}

impl ProductForm {
    /// Convert to a product input. A blank image URL keeps `existing`.
    ///
    /// # Errors
    ///
    /// Returns a shopper-readable message for any unparseable field.
    pub fn into_input(self, existing: &[ProductImage]) -> Result<ProductInput, String> {
        let price = parse_decimal(&self.price).ok_or("Please enter a valid price.")?;
        let discount_price =
            parse_decimal(&self.discount_price).ok_or("Please enter a valid discount price.")?;
        let stock_quantity = match self.stock_quantity.trim() {
            "" => 0,
            raw => raw
                .parse::<i32>()
                .map_err(|_| "Please enter a whole number for stock.")?,
        };
        let category = self
            .category
            .parse::<Category>()
            .map_err(|_| "Please choose a category.")?;

        let images = match self.image_url.trim() {
            "" => existing.to_vec(),
            url => vec![ProductImage {
                url: url.to_owned(),
                public_id: String::new(),
                is_primary: true,
            }],
        };

        Ok(ProductInput {
            name: self.name.trim().to_owned(),
            description: self.description.trim().to_owned(),
            price,
            discount_price,
            category,
            stock_quantity,
            images,
            featured: self.featured.is_some(),
        })
    }
}

impl From<&Product> for ProductForm {
    fn from(product: &Product) -> Self {
        Self {
            name: product.name.clone(),
            description: product.description.clone(),
            price: product.price.to_string(),
            discount_price: if product.discount_price.is_zero() {
                String::new()
            } else {
                product.discount_price.to_string()
            },
            category: product.category.label().to_owned(),
            stock_quantity: product.stock_quantity.to_string(),
            image_url: product
                .primary_image()
                .map(|image| image.url.clone())
                .unwrap_or_default(),
            featured: product.featured.then(|| "on".to_owned()),
        }
    }
}

/// Blank means zero.
fn parse_decimal(raw: &str) -> Option<Decimal> {
    match raw.trim() {
        "" => Some(Decimal::ZERO),
        value => value.parse().ok(),
    }
}

/// Order status form.
#[derive(Debug, Deserialize)]
pub struct StatusForm {
    #[serde(default)]
    pub status: String,
}

/// Payment status form.
#[derive(Debug, Deserialize)]
pub struct PaymentForm {
    #[serde(default, rename = "paymentStatus")]
    pub payment_status: String,
}

// =============================================================================
// Views
// =============================================================================

/// An order row on the dashboard with the moves still open to it.
#[derive(Debug, Clone)]
pub struct AdminOrderView {
    pub order: Order,
    pub next_statuses: Vec<&'static str>,
    pub payment_statuses: Vec<&'static str>,
}

impl From<Order> for AdminOrderView {
    fn from(order: Order) -> Self {
        Self {
            next_statuses: order
                .status
                .allowed_transitions()
                .into_iter()
                .map(OrderStatus::label)
                .collect(),
            payment_statuses: PaymentStatus::ALL
                .into_iter()
                .filter(|status| *status != order.payment_status)
                .map(PaymentStatus::label)
                .collect(),
            order,
        }
    }
}

// =============================================================================
// Templates
// =============================================================================

/// Owner login page template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/login.html")]
pub struct AdminLoginTemplate {
    pub layout: Layout,
}

/// Back office dashboard template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/dashboard.html")]
pub struct DashboardTemplate {
    pub layout: Layout,
    pub admin_name: String,
    pub products: Vec<Product>,
    pub orders: Vec<AdminOrderView>,
    pub categories: Vec<&'static str>,
}

/// Product edit page template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/edit_product.html")]
pub struct EditProductTemplate {
    pub layout: Layout,
    pub product_id: i32,
    pub form: ProductForm,
    pub categories: Vec<CategoryOption>,
    pub error: Option<String>,
}

/// Category choice on the edit form.
#[derive(Debug, Clone)]
pub struct CategoryOption {
    pub label: &'static str,
    pub selected: bool,
}

fn category_labels() -> Vec<&'static str> {
    Category::ALL.iter().map(|c| c.label()).collect()
}

fn category_options(current: &str) -> Vec<CategoryOption> {
    let current = current.parse::<Category>().ok();
    Category::ALL
        .into_iter()
        .map(|category| CategoryOption {
            label: category.label(),
            selected: current == Some(category),
        })
        .collect()
}

// =============================================================================
// Handlers
// =============================================================================

/// Display the owner login page.
pub async fn login_page(page: PageContext) -> Response {
    if page.is_admin() {
        return Redirect::to(DASHBOARD).into_response();
    }
    AdminLoginTemplate {
        layout: page.layout("Owner Login").await,
    }
    .into_response()
}

/// Handle owner login.
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Response {
    let result = AuthService::new(state.store())
        .admin_login(&form.email, &form.password)
        .await;

    match result.map_err(AppError::from).and_then(|admin| issue(&state, &admin)) {
        Ok(response) => {
            push_notice(&session, Notice::success("Admin login successful!")).await;
            response
        }
        Err(e) => e.redirect_with_notice(&session, "/owners/login").await,
    }
}

fn issue(state: &AppState, admin: &Admin) -> Result<Response, AppError> {
    let token = state
        .tokens()
        .issue(TokenScope::Owner, admin.id.as_i32(), &admin.email)?;
    let cookie = token_cookie(TokenScope::Owner, token, state.config().secure_cookies());
    Ok(redirect_with_cookie(DASHBOARD, &cookie))
}

/// Log the owner out.
pub async fn logout(State(state): State<AppState>, session: Session) -> Response {
    push_notice(&session, Notice::success("Admin logged out successfully.")).await;
    redirect_with_cookie(
        "/owners/login",
        &removal_cookie(TokenScope::Owner, state.config().secure_cookies()),
    )
}

/// Display products and orders. A failed lookup renders the page empty
/// with an error notice.
#[instrument(skip_all, fields(admin_id = %admin.id))]
pub async fn dashboard(
    State(state): State<AppState>,
    page: PageContext,
    RequireAdmin(admin): RequireAdmin,
) -> Response {
    let mut layout = page.layout("Admin Dashboard").await;

    let products = CatalogService::new(state.store())
        .all_products()
        .await
        .unwrap_or_else(|e| {
            let err = AppError::from(e);
            err.report();
            layout.notices.push(Notice::error(err.public_message()));
            Vec::new()
        });
    let orders = OrderService::new(state.store())
        .list_all_orders()
        .await
        .unwrap_or_else(|e| {
            let err = AppError::from(e);
            err.report();
            layout.notices.push(Notice::error(err.public_message()));
            Vec::new()
        });

    DashboardTemplate {
        layout,
        admin_name: admin.fullname,
        products,
        orders: orders.into_iter().map(AdminOrderView::from).collect(),
        categories: category_labels(),
    }
    .into_response()
}

/// Create a product.
#[instrument(skip_all, fields(admin_id = %admin.id))]
pub async fn create_product(
    State(state): State<AppState>,
    session: Session,
    RequireAdmin(admin): RequireAdmin,
    Form(form): Form<ProductForm>,
) -> Response {
    let input = match form.into_input(&[]) {
        Ok(input) => input,
        Err(message) => {
            return AppError::BadRequest(message)
                .redirect_with_notice(&session, DASHBOARD)
                .await;
        }
    };

    match CatalogService::new(state.store()).create_product(input).await {
        Ok(product) => {
            push_notice(
                &session,
                Notice::success(format!("Product \"{}\" created successfully!", product.name)),
            )
            .await;
            Redirect::to(DASHBOARD).into_response()
        }
        Err(e) => AppError::from(e).redirect_with_notice(&session, DASHBOARD).await,
    }
}

/// Display the product edit form.
#[instrument(skip(state, session, page, admin), fields(admin_id = %admin.id))]
pub async fn edit_product_page(
    State(state): State<AppState>,
    session: Session,
    page: PageContext,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<String>,
) -> Response {
    let Ok(product_id) = id.parse::<ProductId>() else {
        return AppError::from(CatalogError::NotFound)
            .redirect_with_notice(&session, DASHBOARD)
            .await;
    };

    match CatalogService::new(state.store()).get_product(product_id).await {
        Ok(product) => EditProductTemplate {
            layout: page.layout("Edit Product").await,
            product_id: product.id.as_i32(),
            categories: category_options(product.category.label()),
            form: ProductForm::from(&product),
            error: None,
        }
        .into_response(),
        Err(e) => AppError::from(e).redirect_with_notice(&session, DASHBOARD).await,
    }
}

/// Save product edits. A rejected edit re-renders the form with the
/// submitted values.
#[instrument(skip(state, session, page, admin, form), fields(admin_id = %admin.id))]
pub async fn update_product(
    State(state): State<AppState>,
    session: Session,
    page: PageContext,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<String>,
    Form(form): Form<ProductForm>,
) -> Response {
    let Ok(product_id) = id.parse::<ProductId>() else {
        return AppError::from(CatalogError::NotFound)
            .redirect_with_notice(&session, DASHBOARD)
            .await;
    };

    let catalog = CatalogService::new(state.store());
    let existing = match catalog.get_product(product_id).await {
        Ok(product) => product,
        Err(e) => return AppError::from(e).redirect_with_notice(&session, DASHBOARD).await,
    };

    let submitted = form.clone();
    let result = match form.into_input(&existing.images) {
        Ok(input) => catalog
            .update_product(product_id, input)
            .await
            .map_err(AppError::from),
        Err(message) => Err(AppError::BadRequest(message)),
    };

    match result {
        Ok(product) => {
            push_notice(
                &session,
                Notice::success(format!("Product \"{}\" updated successfully!", product.name)),
            )
            .await;
            Redirect::to(DASHBOARD).into_response()
        }
        Err(AppError::Catalog(CatalogError::NotFound)) => {
            AppError::from(CatalogError::NotFound)
                .redirect_with_notice(&session, DASHBOARD)
                .await
        }
        Err(e) => {
            e.report();
            EditProductTemplate {
                layout: page.layout("Edit Product").await,
                product_id: product_id.as_i32(),
                categories: category_options(&submitted.category),
                form: submitted,
                error: Some(e.public_message()),
            }
            .into_response()
        }
    }
}

/// Delete a product.
#[instrument(skip(state, session, admin), fields(admin_id = %admin.id))]
pub async fn delete_product(
    State(state): State<AppState>,
    session: Session,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<String>,
) -> Response {
    let Ok(product_id) = id.parse::<ProductId>() else {
        return AppError::from(CatalogError::NotFound)
            .redirect_with_notice(&session, DASHBOARD)
            .await;
    };

    match CatalogService::new(state.store()).delete_product(product_id).await {
        Ok(()) => {
            push_notice(&session, Notice::success("Product deleted successfully!")).await;
            Redirect::to(DASHBOARD).into_response()
        }
        Err(e) => AppError::from(e).redirect_with_notice(&session, DASHBOARD).await,
    }
}

/// Move an order through its lifecycle.
#[instrument(skip(state, session, admin, form), fields(admin_id = %admin.id))]
pub async fn update_order_status(
    State(state): State<AppState>,
    session: Session,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<String>,
    Form(form): Form<StatusForm>,
) -> Response {
    let result = match (id.parse::<OrderId>(), form.status.parse::<OrderStatus>()) {
        (Ok(order_id), Ok(status)) => OrderService::new(state.store())
            .update_status(order_id, status)
            .await
            .map_err(AppError::from),
        (Err(_), _) => Err(AppError::NotFound("Order".to_owned())),
        (_, Err(e)) => Err(AppError::BadRequest(e.to_string())),
    };

    match result {
        Ok(order) => {
            push_notice(
                &session,
                Notice::success(format!(
                    "Order {} is now {}.",
                    order.order_number(),
                    order.status
                )),
            )
            .await;
            Redirect::to(DASHBOARD).into_response()
        }
        Err(e) => e.redirect_with_notice(&session, DASHBOARD).await,
    }
}

/// Record a payment outcome for an order.
#[instrument(skip(state, session, admin, form), fields(admin_id = %admin.id))]
pub async fn update_payment_status(
    State(state): State<AppState>,
    session: Session,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<String>,
    Form(form): Form<PaymentForm>,
) -> Response {
    let result = match (
        id.parse::<OrderId>(),
        form.payment_status.parse::<PaymentStatus>(),
    ) {
        (Ok(order_id), Ok(status)) => OrderService::new(state.store())
            .update_payment_status(order_id, status)
            .await
            .map_err(AppError::from),
        (Err(_), _) => Err(AppError::NotFound("Order".to_owned())),
        (_, Err(e)) => Err(AppError::BadRequest(e.to_string())),
    };

    match result {
        Ok(order) => {
            push_notice(
                &session,
                Notice::success(format!(
                    "Payment for order {} marked {}.",
                    order.order_number(),
                    order.payment_status
                )),
            )
            .await;
            Redirect::to(DASHBOARD).into_response()
        }
        Err(e) => e.redirect_with_notice(&session, DASHBOARD).await,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn form() -> ProductForm {
        ProductForm {
            name: " Tote ".into(),
            description: "Roomy".into(),
            price: "1200".into(),
            discount_price: String::new(),
            category: "handbags".into(),
            stock_quantity: "4".into(),
            image_url: String::new(),
            featured: Some("on".into()),
        }
    }

    #[test]
    fn test_product_form_parses_fields() {
        let input = form().into_input(&[]).unwrap();
        assert_eq!(input.name, "Tote");
        assert_eq!(input.price, Decimal::from(1200));
        assert_eq!(input.discount_price, Decimal::ZERO);
        assert_eq!(input.category, Category::Handbags);
        assert_eq!(input.stock_quantity, 4);
        assert!(input.featured);
        assert!(input.images.is_empty());
    }

    #[test]
    fn test_product_form_rejects_bad_numbers() {
        let bad_price = ProductForm {
            price: "twelve".into(),
            ..form()
        };
        assert_eq!(
            bad_price.into_input(&[]).unwrap_err(),
            "Please enter a valid price."
        );

        let bad_stock = ProductForm {
            stock_quantity: "2.5".into(),
            ..form()
        };
        assert!(bad_stock.into_input(&[]).is_err());

        let bad_category = ProductForm {
            category: "Shoes".into(),
            ..form()
        };
        assert_eq!(
            bad_category.into_input(&[]).unwrap_err(),
            "Please choose a category."
        );
    }

    #[test]
    fn test_blank_image_keeps_existing_images() {
        let existing = vec![ProductImage {
            url: "https://img.example/old.jpg".into(),
            public_id: "old".into(),
            is_primary: true,
        }];
        let input = form().into_input(&existing).unwrap();
        assert_eq!(input.images, existing);

        let replaced = ProductForm {
            image_url: "https://img.example/new.jpg".into(),
            ..form()
        }
        .into_input(&existing)
        .unwrap();
        assert_eq!(replaced.images.len(), 1);
        assert_eq!(replaced.images[0].url, "https://img.example/new.jpg");
    }
}
