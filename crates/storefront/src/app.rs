//! Router assembly.
//!
//! Kept out of `main` so integration tests drive the exact stack the
//! server runs.

use axum::{Router, middleware};
use tower_http::{
    services::ServeDir,
    trace::{DefaultOnResponse, OnResponse, TraceLayer},
};
use tracing::Span;

use crate::middleware::{
    create_session_layer, request_id_middleware, resolve_identity, security_headers_middleware,
};
use crate::routes;
use crate::state::AppState;

/// Directory served under `/static`.
pub const STATIC_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/static");

/// Build the full application router.
///
/// Sentry layers are added by the binary on top of this.
pub fn router(state: AppState) -> Router {
    let session_layer = create_session_layer(state.config());

    Router::new()
        .merge(routes::routes(state.config().rate_limit_auth))
        .nest_service("/static", ServeDir::new(STATIC_DIR))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            resolve_identity,
        ))
        .layer(session_layer)
        .layer(middleware::from_fn(security_headers_middleware))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::Body,
        http::{Request, StatusCode, header},
    };
    use secrecy::SecretString;
    use tower::ServiceExt;

    use super::*;
    use crate::config::{DatabaseConfig, DatabaseTarget, StorefrontConfig};
    use crate::db::UnavailableStore;

    fn degraded_router() -> Router {
        let config = StorefrontConfig {
            database: DatabaseConfig {
                target: DatabaseTarget::Unavailable,
                connect_timeout: std::time::Duration::from_secs(1),
                idle_timeout: std::time::Duration::from_secs(1),
            },
            host: std::net::IpAddr::from([127, 0, 0, 1]),
            port: 0,
            base_url: "http://localhost:3000".to_owned(),
            token_secret: SecretString::from("Qw7Er4Ty1Ui8Op5As2Df9Gh6Jk3Lz0Xc"),
            session_secret: SecretString::from("Mn3Bv6Cx9Zl2Kj5Hg8Fd1Sa4Po7Iu0Yt"),
            rate_limit_auth: false,
            sentry_dsn: None,
            sentry_environment: None,
        };
        router(AppState::new(config, Arc::new(UnavailableStore)))
    }

    async fn get(path: &str) -> axum::response::Response {
        degraded_router()
            .oneshot(Request::get(path).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_degraded_mode_stays_live_but_not_ready() {
        assert_eq!(get("/health").await.status(), StatusCode::OK);
        assert_eq!(
            get("/health/ready").await.status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[tokio::test]
    async fn test_degraded_shop_renders_instead_of_redirecting() {
        let response = get("/shop").await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_static_assets_are_served() {
        let response = get("/static/css/main.css").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(
            response.headers()[header::CONTENT_TYPE]
                .to_str()
                .unwrap()
                .starts_with("text/css")
        );
    }
}
