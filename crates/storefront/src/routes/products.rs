//! Shop, new arrivals and product detail handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use rust_decimal::Decimal;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use scatch_core::{Category, ProductId};

use crate::error::AppError;
use crate::filters;
use crate::middleware::push_notice;
use crate::models::{Notice, Product};
use crate::routes::page::{Layout, PageContext};
use crate::services::{CatalogError, CatalogService, ShopListing};
use crate::state::AppState;

/// Related products shown under a product.
const RELATED_LIMIT: usize = 4;

/// Product display data for templates.
#[derive(Debug, Clone)]
pub struct ProductView {
    pub id: i32,
    pub name: String,
    pub description: String,
    pub category: &'static str,
    pub price: Decimal,
    pub effective_price: Decimal,
    pub has_discount: bool,
    pub discount_percentage: u32,
    pub stock_quantity: i32,
    pub in_stock: bool,
    pub image: Option<ImageView>,
    pub images: Vec<ImageView>,
    pub featured: bool,
}

/// Image display data for templates.
#[derive(Debug, Clone)]
pub struct ImageView {
    pub url: String,
    pub alt: String,
}

impl From<&Product> for ProductView {
    fn from(product: &Product) -> Self {
        let image_view = |url: &str| ImageView {
            url: url.to_owned(),
            alt: product.name.clone(),
        };
        Self {
            id: product.id.as_i32(),
            name: product.name.clone(),
            description: product.description.clone(),
            category: product.category.label(),
            price: product.price,
            effective_price: product.effective_price(),
            has_discount: product.has_discount(),
            discount_percentage: product.discount_percentage(),
            stock_quantity: product.stock_quantity,
            in_stock: product.in_stock(),
            image: product.primary_image().map(|image| image_view(&image.url)),
            images: product.images.iter().map(|image| image_view(&image.url)).collect(),
            featured: product.featured,
        }
    }
}

/// One category filter tab.
#[derive(Debug, Clone)]
pub struct CategoryTab {
    pub label: &'static str,
    pub count: i64,
    pub active: bool,
}

/// Shop query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct ShopQuery {
    pub category: Option<String>,
    pub search: Option<String>,
}

/// Shop page template.
#[derive(Template, WebTemplate)]
#[template(path = "shop/index.html")]
pub struct ShopTemplate {
    pub layout: Layout,
    pub products: Vec<ProductView>,
    pub categories: Vec<CategoryTab>,
    pub all_active: bool,
    pub search: String,
}

/// New arrivals page template.
#[derive(Template, WebTemplate)]
#[template(path = "shop/new_arrivals.html")]
pub struct NewArrivalsTemplate {
    pub layout: Layout,
    pub products: Vec<ProductView>,
}

/// Product detail page template.
#[derive(Template, WebTemplate)]
#[template(path = "shop/product.html")]
pub struct ProductShowTemplate {
    pub layout: Layout,
    pub product: ProductView,
    pub related_products: Vec<ProductView>,
}

/// Quick view fragment template.
#[derive(Template, WebTemplate)]
#[template(path = "partials/quick_view.html")]
pub struct QuickViewTemplate {
    pub product: ProductView,
}

/// Quick view fragment for a product that no longer exists.
#[derive(Template, WebTemplate)]
#[template(path = "partials/quick_view_missing.html")]
pub struct QuickViewMissingTemplate;

fn category_tabs(listing: &ShopListing) -> Vec<CategoryTab> {
    Category::ALL
        .into_iter()
        .map(|category| CategoryTab {
            label: category.label(),
            count: listing
                .category_counts
                .iter()
                .find(|(c, _)| *c == category)
                .map_or(0, |(_, count)| *count),
            active: listing.category == Some(category),
        })
        .collect()
}

/// Display the shop.
///
/// A failed lookup still renders the page, empty, with an error notice; the
/// shop is where every other failure redirects to.
#[instrument(skip_all)]
pub async fn shop(
    State(state): State<AppState>,
    page: PageContext,
    Query(query): Query<ShopQuery>,
) -> Response {
    let result = CatalogService::new(state.store())
        .shop(query.category.as_deref(), query.search.as_deref())
        .await;

    let mut layout = page.layout("Shop").await;
    match result {
        Ok(listing) => ShopTemplate {
            layout,
            products: listing.products.iter().map(ProductView::from).collect(),
            categories: category_tabs(&listing),
            all_active: listing.category.is_none(),
            search: listing.search.unwrap_or_default(),
        }
        .into_response(),
        Err(e) => {
            let err = AppError::from(e);
            err.report();
            layout.notices.push(Notice::error(err.public_message()));
            ShopTemplate {
                layout,
                products: Vec::new(),
                categories: Vec::new(),
                all_active: true,
                search: query.search.unwrap_or_default(),
            }
            .into_response()
        }
    }
}

/// Display the latest arrivals.
#[instrument(skip_all)]
pub async fn new_arrivals(
    State(state): State<AppState>,
    session: Session,
    page: PageContext,
) -> Response {
    match CatalogService::new(state.store()).new_arrivals().await {
        Ok(products) => NewArrivalsTemplate {
            layout: page.layout("New Arrivals").await,
            products: products.iter().map(ProductView::from).collect(),
        }
        .into_response(),
        Err(e) => AppError::from(e).redirect_with_notice(&session, "/shop").await,
    }
}

/// Display a product with a few others from its category.
#[instrument(skip(state, session, page))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    page: PageContext,
    Path(id): Path<String>,
) -> Response {
    let Ok(id) = id.parse::<ProductId>() else {
        push_notice(&session, Notice::error("Product not found!")).await;
        return Redirect::to("/shop").into_response();
    };

    let catalog = CatalogService::new(state.store());
    let product = match catalog.get_product(id).await {
        Ok(product) => product,
        Err(e) => return AppError::from(e).redirect_with_notice(&session, "/shop").await,
    };

    // Related products are a nicety; the page renders without them.
    let related_products = catalog
        .shop(Some(product.category.label()), None)
        .await
        .map(|listing| {
            listing
                .products
                .iter()
                .filter(|p| p.id != product.id)
                .take(RELATED_LIMIT)
                .map(ProductView::from)
                .collect()
        })
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, "related products unavailable");
            Vec::new()
        });

    ProductShowTemplate {
        layout: page.layout(&product.name).await,
        product: ProductView::from(&product),
        related_products,
    }
    .into_response()
}

/// Product quick view fragment.
#[instrument(skip(state))]
pub async fn quick_view(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let Ok(id) = id.parse::<ProductId>() else {
        return (StatusCode::NOT_FOUND, QuickViewMissingTemplate).into_response();
    };

    match CatalogService::new(state.store()).get_product(id).await {
        Ok(product) => QuickViewTemplate {
            product: ProductView::from(&product),
        }
        .into_response(),
        Err(CatalogError::NotFound) => {
            (StatusCode::NOT_FOUND, QuickViewMissingTemplate).into_response()
        }
        Err(e) => AppError::from(e).into_response(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::models::ProductImage;

    fn product() -> Product {
        Product {
            id: ProductId::new(7),
            name: "Canvas Backpack".into(),
            description: "Everyday carry".into(),
            price: Decimal::from(200),
            discount_price: Decimal::from(150),
            category: Category::Backpacks,
            stock_quantity: 0,
            images: vec![
                ProductImage {
                    url: "https://img.example/a.jpg".into(),
                    public_id: String::new(),
                    is_primary: false,
                },
                ProductImage {
                    url: "https://img.example/b.jpg".into(),
                    public_id: String::new(),
                    is_primary: true,
                },
            ],
            featured: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_product_view_prices_and_primary_image() {
        let view = ProductView::from(&product());
        assert_eq!(view.effective_price, Decimal::from(150));
        assert!(view.has_discount);
        assert_eq!(view.discount_percentage, 25);
        assert!(!view.in_stock);
        assert_eq!(view.image.unwrap().url, "https://img.example/b.jpg");
        assert_eq!(view.images.len(), 2);
    }

    #[test]
    fn test_category_tabs_fill_missing_counts() {
        let listing = ShopListing {
            products: vec![],
            category_counts: vec![(Category::Handbags, 3)],
            category: Some(Category::Handbags),
            search: None,
        };
        let tabs = category_tabs(&listing);
        assert_eq!(tabs.len(), Category::ALL.len());
        let handbags = tabs.iter().find(|t| t.label == "Handbags").unwrap();
        assert_eq!(handbags.count, 3);
        assert!(handbags.active);
        let clutches = tabs.iter().find(|t| t.label == "Clutches").unwrap();
        assert_eq!(clutches.count, 0);
        assert!(!clutches.active);
    }
}
