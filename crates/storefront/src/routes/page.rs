//! Data every rendered page shares: navigation, cart badge and notices.

use std::convert::Infallible;

use axum::{extract::FromRequestParts, http::request::Parts};
use tower_sessions::Session;

use crate::middleware::{ResolvedAdmin, ResolvedUser, take_notices};
use crate::models::Notice;
use crate::services::CartService;
use crate::state::AppState;

/// Shared template context, rendered by `base.html`.
#[derive(Debug, Clone, Default)]
pub struct Layout {
    pub title: String,
    pub notices: Vec<Notice>,
    /// First name of the logged-in shopper.
    pub user_name: Option<String>,
    pub cart_count: i64,
    pub is_admin: bool,
}

/// Extractor that builds a [`Layout`] on demand.
///
/// Building the layout drains the pending notices, so handlers that may
/// redirect instead of rendering call [`PageContext::layout`] only on the
/// render path.
pub struct PageContext {
    state: AppState,
    session: Option<Session>,
    user: ResolvedUser,
    is_admin: bool,
}

impl FromRequestParts<AppState> for PageContext {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(Self {
            state: state.clone(),
            session: parts.extensions.get::<Session>().cloned(),
            user: parts
                .extensions
                .get::<ResolvedUser>()
                .cloned()
                .unwrap_or_default(),
            is_admin: parts
                .extensions
                .get::<ResolvedAdmin>()
                .is_some_and(|admin| admin.0.is_some()),
        })
    }
}

impl PageContext {
    /// Whether a valid owner token came with the request.
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        self.is_admin
    }

    /// Layout for a page titled `title`.
    pub async fn layout(&self, title: &str) -> Layout {
        let notices = match &self.session {
            Some(session) => take_notices(session).await,
            None => Vec::new(),
        };

        let cart_count = match &self.user.0 {
            Some(user) => CartService::new(self.state.store())
                .cart_count(user.id)
                .await
                .unwrap_or_else(|e| {
                    tracing::warn!(error = %e, "cart badge unavailable");
                    0
                }),
            None => 0,
        };

        Layout {
            title: title.to_owned(),
            notices,
            user_name: self
                .user
                .0
                .as_ref()
                .map(|user| user.display_name().to_owned()),
            cart_count,
            is_admin: self.is_admin,
        }
    }
}
