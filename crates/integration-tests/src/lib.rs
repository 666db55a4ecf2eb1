//! In-process test client for the Scatch storefront.
//!
//! [`TestApp`] drives the exact router the server runs, backed by a
//! [`MemoryStore`] seeded with the demo catalog. Requests go through
//! `tower::ServiceExt::oneshot`, so no port is bound and no database is
//! needed. Cookies set by responses are kept in a jar and replayed, which
//! is enough to follow a shopper (or owner) across a login.
//!
//! ```rust,ignore
//! let mut app = TestApp::new();
//! app.register_shopper("asha@example.com").await;
//! let res = app.post_form("/cart/add/1", &[]).await;
//! assert_eq!(res.location(), Some("/cart"));
//! ```

#![allow(clippy::missing_panics_doc, clippy::must_use_candidate)]

use std::collections::BTreeMap;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    body::{Body, Bytes},
    http::{HeaderMap, Method, Request, StatusCode, header},
};
use http_body_util::BodyExt;
use secrecy::SecretString;
use serde_json::Value;
use tower::ServiceExt;
use tower_sessions::cookie::Cookie;

use scatch_storefront::app;
use scatch_storefront::config::{DatabaseConfig, DatabaseTarget, StorefrontConfig};
use scatch_storefront::db::{MemoryStore, seed};
use scatch_storefront::services::AuthService;
use scatch_storefront::state::AppState;

/// Password used for every account the helpers create.
pub const TEST_PASSWORD: &str = "correct-horse-battery";

/// Owner account created by [`TestApp::login_owner`].
pub const OWNER_EMAIL: &str = "owner@scatch.test";

/// Configuration for an in-memory, unthrottled storefront.
pub fn test_config() -> StorefrontConfig {
    StorefrontConfig {
        database: DatabaseConfig {
            target: DatabaseTarget::Memory,
            connect_timeout: Duration::from_secs(1),
            idle_timeout: Duration::from_secs(1),
        },
        host: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: 0,
        base_url: "http://localhost:3000".to_owned(),
        token_secret: SecretString::from("kP3v9Qm2Lx8Rt5Wz7Yb1Nc4Hd6Fg0Js"),
        session_secret: SecretString::from("Zr8Tq1Wm5Xv3Kp9Ld2Hs7Nb4Fc6Gj0Ya"),
        rate_limit_auth: false,
        sentry_dsn: None,
        sentry_environment: None,
    }
}

/// A response with its body read to the end.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    /// Target of a redirect.
    pub fn location(&self) -> Option<&str> {
        self.headers
            .get(header::LOCATION)
            .and_then(|value| value.to_str().ok())
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).expect("response body is not JSON")
    }

    /// Whether the response sets `name`, including removals.
    pub fn sets_cookie(&self, name: &str) -> bool {
        set_cookies(&self.headers).any(|cookie| cookie.name() == name)
    }
}

fn set_cookies(headers: &HeaderMap) -> impl Iterator<Item = Cookie<'static>> + '_ {
    headers
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .filter_map(|raw| Cookie::parse(raw.to_owned()).ok())
}

/// The storefront router plus a cookie jar.
pub struct TestApp {
    router: Router,
    state: AppState,
    cookies: BTreeMap<String, String>,
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

impl TestApp {
    /// Storefront over a fresh in-memory store holding the demo catalog.
    pub fn new() -> Self {
        let catalog = seed::demo_catalog().expect("demo catalog parses");
        let store = Arc::new(MemoryStore::with_catalog(&catalog));
        let state = AppState::new(test_config(), store);
        Self {
            router: app::router(state.clone()),
            state,
            cookies: BTreeMap::new(),
        }
    }

    /// Shared state, for asserting on the store directly.
    pub const fn state(&self) -> &AppState {
        &self.state
    }

    /// Drop every cookie, as a new browser would.
    pub fn clear_cookies(&mut self) {
        self.cookies.clear();
    }

    /// Value of a cookie currently in the jar.
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    /// Put a cookie in the jar by hand.
    pub fn set_cookie(&mut self, name: &str, value: &str) {
        self.cookies.insert(name.to_owned(), value.to_owned());
    }

    pub async fn get(&mut self, path: &str) -> TestResponse {
        self.send(Method::GET, path, None, Body::empty()).await
    }

    /// POST an urlencoded form.
    pub async fn post_form(&mut self, path: &str, fields: &[(&str, &str)]) -> TestResponse {
        let body = fields
            .iter()
            .map(|(key, value)| {
                format!("{}={}", urlencoding::encode(key), urlencoding::encode(value))
            })
            .collect::<Vec<_>>()
            .join("&");
        self.send(
            Method::POST,
            path,
            Some("application/x-www-form-urlencoded"),
            Body::from(body),
        )
        .await
    }

    pub async fn post_json(&mut self, path: &str, body: &Value) -> TestResponse {
        self.send(
            Method::POST,
            path,
            Some("application/json"),
            Body::from(body.to_string()),
        )
        .await
    }

    /// Register a shopper through the signup form, which also logs them in.
    pub async fn register_shopper(&mut self, email: &str) -> TestResponse {
        self.post_form(
            "/register",
            &[
                ("fullname", "Asha Verma"),
                ("email", email),
                ("password", TEST_PASSWORD),
                ("age", "29"),
                ("gender", "Female"),
            ],
        )
        .await
    }

    /// Create the owner account and log in through the owner form.
    pub async fn login_owner(&mut self) -> TestResponse {
        AuthService::new(self.state.store())
            .create_admin("Store Owner", OWNER_EMAIL, TEST_PASSWORD)
            .await
            .expect("owner account is created");
        self.post_form(
            "/owners/login",
            &[("email", OWNER_EMAIL), ("password", TEST_PASSWORD)],
        )
        .await
    }

    async fn send(
        &mut self,
        method: Method,
        path: &str,
        content_type: Option<&str>,
        body: Body,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(content_type) = content_type {
            builder = builder.header(header::CONTENT_TYPE, content_type);
        }
        if !self.cookies.is_empty() {
            let jar = self
                .cookies
                .iter()
                .map(|(name, value)| format!("{name}={value}"))
                .collect::<Vec<_>>()
                .join("; ");
            builder = builder.header(header::COOKIE, jar);
        }
        let request = builder.body(body).expect("valid request");

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .into_body()
            .collect()
            .await
            .expect("body is readable")
            .to_bytes();

        for cookie in set_cookies(&headers) {
            if cookie.value().is_empty() {
                self.cookies.remove(cookie.name());
            } else {
                self.cookies
                    .insert(cookie.name().to_owned(), cookie.value().to_owned());
            }
        }

        TestResponse {
            status,
            headers,
            body,
        }
    }
}
