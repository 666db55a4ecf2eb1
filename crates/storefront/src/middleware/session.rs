//! Session middleware configuration and flash notices.
//!
//! Sessions live in process memory and only carry one-shot notices, so
//! losing them on restart costs a message, never a login.

use tower_sessions::{Expiry, MemoryStore, Session, SessionManagerLayer};

use crate::config::StorefrontConfig;
use crate::models::{Notice, session::keys};

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "scatch_session";

/// Session expiry time in seconds (1 hour of inactivity).
const SESSION_EXPIRY_SECONDS: i64 = 60 * 60;

/// Create the session layer with an in-memory store.
#[must_use]
pub fn create_session_layer(config: &StorefrontConfig) -> SessionManagerLayer<MemoryStore> {
    SessionManagerLayer::new(MemoryStore::default())
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(config.secure_cookies())
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}

/// Queue a notice for the next rendered page.
///
/// Session failures are logged and otherwise ignored; a lost notice never
/// fails the request.
pub async fn push_notice(session: &Session, notice: Notice) {
    let mut notices = session
        .get::<Vec<Notice>>(keys::NOTICES)
        .await
        .ok()
        .flatten()
        .unwrap_or_default();
    notices.push(notice);

    if let Err(e) = session.insert(keys::NOTICES, notices).await {
        tracing::warn!(error = %e, "failed to store notice");
    }
}

/// Take every pending notice, leaving none behind.
pub async fn take_notices(session: &Session) -> Vec<Notice> {
    match session.remove::<Vec<Notice>>(keys::NOTICES).await {
        Ok(notices) => notices.unwrap_or_default(),
        Err(e) => {
            tracing::warn!(error = %e, "failed to read notices");
            Vec::new()
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[tokio::test]
    async fn test_notices_are_drained_once() {
        let session = Session::new(None, Arc::new(MemoryStore::default()), None);

        push_notice(&session, Notice::success("Added to cart!")).await;
        push_notice(&session, Notice::error("Product is out of stock!")).await;

        let notices = take_notices(&session).await;
        assert_eq!(notices.len(), 2);
        assert!(!notices[0].is_error());
        assert!(notices[1].is_error());
        assert!(take_notices(&session).await.is_empty());
    }
}
