//! Cart route handlers.
//!
//! Adding and removing are plain form posts that redirect. The quantity
//! stepper posts JSON and gets the new totals back as JSON.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use scatch_core::{CartTotals, ProductId, UserId};

use crate::error::{AppError, CartJson};
use crate::filters;
use crate::middleware::{OptionalUser, RequireUser, push_notice};
use crate::models::{CartItem, Notice};
use crate::routes::page::{Layout, PageContext};
use crate::routes::products::ProductView;
use crate::services::{CartAction, CartService};
use crate::state::AppState;

/// Shown for stepper failures that carry no shopper-facing message.
const UPDATE_FAILED: &str = "Failed to update cart";

/// Cart line display data for templates.
#[derive(Debug, Clone)]
pub struct CartLineView {
    pub product: ProductView,
    pub quantity: i32,
    pub subtotal: Decimal,
}

impl From<&CartItem> for CartLineView {
    fn from(item: &CartItem) -> Self {
        Self {
            product: ProductView::from(&item.product),
            quantity: item.quantity,
            subtotal: item.subtotal(),
        }
    }
}

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartShowTemplate {
    pub layout: Layout,
    pub lines: Vec<CartLineView>,
    pub totals: CartTotals,
}

/// A product id sent as either a JSON number or a string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ProductIdParam {
    Number(i32),
    Text(String),
}

impl ProductIdParam {
    fn parse(&self) -> Option<ProductId> {
        match self {
            Self::Number(id) => Some(ProductId::new(*id)),
            Self::Text(raw) => raw.parse().ok(),
        }
    }
}

/// Quantity stepper request body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartUpdateRequest {
    pub product_id: ProductIdParam,
    pub action: String,
}

/// Cart badge body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartCountJson {
    pub success: bool,
    pub cart_count: i64,
}

/// Display the cart.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    page: PageContext,
    RequireUser(user): RequireUser,
) -> Response {
    match CartService::new(state.store()).get_cart(user.id).await {
        Ok(cart) => CartShowTemplate {
            layout: page.layout("Your Cart").await,
            lines: cart.items.iter().map(CartLineView::from).collect(),
            totals: cart.totals,
        }
        .into_response(),
        Err(e) => AppError::from(e).redirect_with_notice(&session, "/shop").await,
    }
}

/// Add one unit of a product, then show the cart.
#[instrument(skip(state, session, user), fields(user_id = %user.id))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    RequireUser(user): RequireUser,
    Path(id): Path<String>,
) -> Response {
    let Ok(product_id) = id.parse::<ProductId>() else {
        push_notice(&session, Notice::error("Product not found!")).await;
        return Redirect::to("/shop").into_response();
    };

    match CartService::new(state.store())
        .add_item(user.id, product_id)
        .await
    {
        Ok(_) => {
            push_notice(&session, Notice::success("Added to cart!")).await;
            Redirect::to("/cart").into_response()
        }
        Err(e) => AppError::from(e).redirect_with_notice(&session, "/shop").await,
    }
}

/// Step a line's quantity and return the new totals.
#[instrument(skip_all)]
pub async fn update(
    State(state): State<AppState>,
    OptionalUser(user): OptionalUser,
    body: Result<Json<CartUpdateRequest>, JsonRejection>,
) -> Response {
    let Some(user) = user else {
        return (
            StatusCode::UNAUTHORIZED,
            Json(CartJson::failure("Please login!")),
        )
            .into_response();
    };

    let request = match body {
        Ok(Json(request)) => request,
        Err(rejection) => {
            tracing::debug!(error = %rejection, "malformed cart update");
            return (StatusCode::BAD_REQUEST, Json(CartJson::failure(UPDATE_FAILED)))
                .into_response();
        }
    };

    let (Some(product_id), Ok(action)) = (
        request.product_id.parse(),
        request.action.parse::<CartAction>(),
    ) else {
        return (StatusCode::BAD_REQUEST, Json(CartJson::failure(UPDATE_FAILED))).into_response();
    };

    match step(&state, user.id, product_id, action).await {
        Ok(body) => Json(body).into_response(),
        Err(e) => (e.kind().status(), Json(CartJson::from_error(&e))).into_response(),
    }
}

async fn step(
    state: &AppState,
    user_id: UserId,
    product_id: ProductId,
    action: CartAction,
) -> Result<CartJson, AppError> {
    let cart = CartService::new(state.store());
    cart.update_quantity(user_id, product_id, action).await?;
    let summary = cart.get_cart(user_id).await?;

    Ok(CartJson {
        success: true,
        message: None,
        total_amount: Some(summary.totals.total),
        cart_count: Some(summary.totals.item_count),
    })
}

/// Remove a line. Removing a line that is already gone still succeeds.
#[instrument(skip(state, session, user), fields(user_id = %user.id))]
pub async fn remove(
    State(state): State<AppState>,
    session: Session,
    RequireUser(user): RequireUser,
    Path(id): Path<String>,
) -> Response {
    let Ok(product_id) = id.parse::<ProductId>() else {
        push_notice(&session, Notice::error("Item not found in cart")).await;
        return Redirect::to("/cart").into_response();
    };

    match CartService::new(state.store())
        .remove_item(user.id, product_id)
        .await
    {
        Ok(()) => {
            push_notice(&session, Notice::success("Item removed from cart")).await;
            Redirect::to("/cart").into_response()
        }
        Err(e) => AppError::from(e).redirect_with_notice(&session, "/cart").await,
    }
}

/// Units in the cart, for the header badge. Guests have an empty cart.
pub async fn count(State(state): State<AppState>, OptionalUser(user): OptionalUser) -> Response {
    let Some(user) = user else {
        return Json(CartCountJson {
            success: true,
            cart_count: 0,
        })
        .into_response();
    };

    match CartService::new(state.store()).cart_count(user.id).await {
        Ok(cart_count) => Json(CartCountJson {
            success: true,
            cart_count,
        })
        .into_response(),
        Err(e) => {
            let err = AppError::from(e);
            (err.kind().status(), Json(CartJson::from_error(&err))).into_response()
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_update_request_accepts_string_or_number_ids() {
        let request: CartUpdateRequest =
            serde_json::from_str(r#"{"productId":"12","action":"increase"}"#).unwrap();
        assert_eq!(request.product_id.parse(), Some(ProductId::new(12)));

        let request: CartUpdateRequest =
            serde_json::from_str(r#"{"productId":12,"action":"decrease"}"#).unwrap();
        assert_eq!(request.product_id.parse(), Some(ProductId::new(12)));
        assert_eq!(request.action.parse::<CartAction>(), Ok(CartAction::Decrease));
    }

    #[test]
    fn test_non_numeric_id_is_rejected() {
        let request: CartUpdateRequest =
            serde_json::from_str(r#"{"productId":"abc","action":"increase"}"#).unwrap();
        assert_eq!(request.product_id.parse(), None);
    }

    #[test]
    fn test_count_body_is_camel_case() {
        let body = serde_json::to_value(CartCountJson {
            success: true,
            cart_count: 3,
        })
        .unwrap();
        assert_eq!(body["cartCount"], 3);
    }
}
