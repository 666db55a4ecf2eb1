//! Unified error handling with Sentry integration.
//!
//! Services return their own error enums; handlers lift them into
//! [`AppError`], which knows how each one is shown to the shopper. Server
//! faults are captured to Sentry before the response goes out, and their
//! detail never reaches the client.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Serialize;
use thiserror::Error;
use tower_sessions::Session;

use crate::db::RepositoryError;
use crate::middleware::push_notice;
use crate::models::Notice;
use crate::services::{AuthError, CartError, CatalogError, OrderError};

/// Message shown for any server-side fault.
pub const GENERIC_FAILURE: &str = "Something went wrong. Please try again.";

/// How an error is classified for the shopper.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Forbidden,
    OutOfStock,
    StockExceeded,
    EmptyCart,
    InvalidTransition,
    Auth,
    Internal,
}

impl ErrorKind {
    #[must_use]
    pub const fn status(self) -> StatusCode {
        match self {
            Self::Validation | Self::EmptyCart => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::OutOfStock | Self::StockExceeded | Self::InvalidTransition => {
                StatusCode::CONFLICT
            }
            Self::Auth => StatusCode::UNAUTHORIZED,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Cart error: {0}")]
    Cart(#[from] CartError),

    #[error("Order error: {0}")]
    Order(#[from] OrderError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Cart(err) => match err {
                CartError::ProductNotFound | CartError::NotInCart => ErrorKind::NotFound,
                CartError::OutOfStock => ErrorKind::OutOfStock,
                CartError::StockExceeded { .. } => ErrorKind::StockExceeded,
                CartError::Repository(_) => ErrorKind::Internal,
            },
            Self::Order(err) => match err {
                OrderError::EmptyCart => ErrorKind::EmptyCart,
                OrderError::MissingShipping(_) | OrderError::InvalidPaymentMethod => {
                    ErrorKind::Validation
                }
                OrderError::StockExceeded { .. } => ErrorKind::StockExceeded,
                OrderError::NotFound => ErrorKind::NotFound,
                OrderError::InvalidTransition(_) => ErrorKind::InvalidTransition,
                OrderError::Repository(_) => ErrorKind::Internal,
            },
            Self::Catalog(err) => match err {
                CatalogError::NotFound => ErrorKind::NotFound,
                CatalogError::Invalid(_) => ErrorKind::Validation,
                CatalogError::Repository(_) => ErrorKind::Internal,
            },
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials => ErrorKind::Auth,
                AuthError::UserAlreadyExists => ErrorKind::Forbidden,
                AuthError::InvalidEmail(_)
                | AuthError::WeakPassword(_)
                | AuthError::InvalidAge
                | AuthError::MissingName => ErrorKind::Validation,
                AuthError::Token(_) | AuthError::Repository(_) | AuthError::PasswordHash => {
                    ErrorKind::Internal
                }
            },
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::BadRequest(_) => ErrorKind::Validation,
            Self::Database(_) | Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Message safe to show the shopper.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            _ if self.kind() == ErrorKind::Internal => GENERIC_FAILURE.to_owned(),
            Self::Cart(err) => err.to_string(),
            Self::Order(err) => err.to_string(),
            Self::Catalog(err) => err.to_string(),
            Self::Auth(AuthError::InvalidEmail(_)) => "Please enter a valid email address.".to_owned(),
            Self::Auth(err) => err.to_string(),
            Self::NotFound(what) => format!("{what} not found!"),
            Self::BadRequest(message) => message.clone(),
            Self::Database(_) | Self::Internal(_) => GENERIC_FAILURE.to_owned(),
        }
    }

    /// Send server faults to Sentry and the log. Client errors are logged
    /// at debug only.
    pub fn report(&self) {
        if self.kind() == ErrorKind::Internal {
            let event_id = sentry::capture_error(self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        } else {
            tracing::debug!(error = %self, "request rejected");
        }
    }

    /// One-shot notice plus a redirect, the answer every HTML form handler
    /// gives on failure.
    pub async fn redirect_with_notice(self, session: &Session, to: &str) -> Response {
        self.report();
        push_notice(session, Notice::error(self.public_message())).await;
        Redirect::to(to).into_response()
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.report();
        (self.kind().status(), self.public_message()).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Body of the JSON cart endpoints.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartJson {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_amount: Option<rust_decimal::Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cart_count: Option<i64>,
}

impl CartJson {
    #[must_use]
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            total_amount: None,
            cart_count: None,
        }
    }

    /// Failure body for `err`, reporting it first.
    #[must_use]
    pub fn from_error(err: &AppError) -> Self {
        err.report();
        Self::failure(err.public_message())
    }
}

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

#[cfg(test)]
mod tests {
    use scatch_core::{OrderStatus, TransitionError};

    use super::*;

    fn status_of(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            status_of(AppError::Cart(CartError::OutOfStock)),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(AppError::Order(OrderError::EmptyCart)),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(AppError::Order(OrderError::NotFound)),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(AppError::Auth(AuthError::InvalidCredentials)),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status_of(AppError::Database(RepositoryError::Unavailable)),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_internal_detail_is_hidden() {
        let err = AppError::Cart(CartError::Repository(RepositoryError::DataCorruption(
            "bad row 17".into(),
        )));
        assert_eq!(err.public_message(), GENERIC_FAILURE);
        assert_eq!(err.kind(), ErrorKind::Internal);
    }

    #[test]
    fn test_domain_messages_pass_through() {
        assert_eq!(
            AppError::Cart(CartError::StockExceeded { available: 2 }).public_message(),
            "Maximum stock available reached!"
        );
        assert_eq!(
            AppError::Auth(AuthError::UserAlreadyExists).public_message(),
            "You already have an account, please login!"
        );
        let transition = AppError::Order(OrderError::InvalidTransition(TransitionError {
            from: OrderStatus::Pending,
            to: OrderStatus::Shipped,
        }));
        assert_eq!(transition.kind(), ErrorKind::InvalidTransition);
    }

    #[test]
    fn test_cart_json_shape() {
        let body = serde_json::to_value(CartJson::failure("Item not found in cart")).unwrap_or_default();
        assert_eq!(
            body,
            serde_json::json!({ "success": false, "message": "Item not found in cart" })
        );
    }
}
