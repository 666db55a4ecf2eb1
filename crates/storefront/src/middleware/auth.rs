//! Identity resolution and route guards.
//!
//! [`resolve_identity`] runs once per request: it verifies the `token` and
//! `admin_token` cookies, loads the matching accounts and stores them in the
//! request extensions. The extractors below read from there.
//!
//! A token that fails verification, or whose account no longer exists, makes
//! the request anonymous and the stale cookie is cleared on the way out.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{
        HeaderMap, HeaderValue,
        header::{COOKIE, SET_COOKIE},
        request::Parts,
    },
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::{
    Session,
    cookie::{Cookie, SameSite, time::Duration},
};

use crate::db::RepositoryError;
use crate::error::{clear_sentry_user, set_sentry_user};
use crate::middleware::push_notice;
use crate::models::{Admin, Notice, User};
use crate::services::{TOKEN_TTL_SECONDS, TokenScope};
use crate::state::AppState;

/// The shopper resolved for this request, if any.
#[derive(Debug, Clone, Default)]
pub struct ResolvedUser(pub Option<User>);

/// The owner resolved for this request, if any.
#[derive(Debug, Clone, Default)]
pub struct ResolvedAdmin(pub Option<Admin>);

/// What a token cookie resolved to.
enum Resolution<T> {
    Absent,
    Found(T),
    /// Bad signature, expired, wrong scope or unknown account.
    Stale,
    /// The store failed; keep the cookie and treat the request as anonymous.
    Unknown,
}

impl<T> Resolution<T> {
    fn into_option(self) -> Option<T> {
        match self {
            Self::Found(value) => Some(value),
            Self::Absent | Self::Stale | Self::Unknown => None,
        }
    }

    const fn is_stale(&self) -> bool {
        matches!(self, Self::Stale)
    }
}

/// Middleware that attaches [`ResolvedUser`] and [`ResolvedAdmin`] to every
/// request.
pub async fn resolve_identity(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let user = resolve_user(&state, request.headers()).await;
    let admin = resolve_admin(&state, request.headers()).await;
    let clear_user = user.is_stale();
    let clear_admin = admin.is_stale();

    let user = user.into_option();
    match &user {
        Some(user) => set_sentry_user(&user.id, Some(user.email.as_str())),
        None => clear_sentry_user(),
    }

    request.extensions_mut().insert(ResolvedUser(user));
    request
        .extensions_mut()
        .insert(ResolvedAdmin(admin.into_option()));

    let mut response = next.run(request).await;

    let secure = state.config().secure_cookies();
    for (scope, clear) in [
        (TokenScope::Shopper, clear_user),
        (TokenScope::Owner, clear_admin),
    ] {
        if clear && !sets_cookie(&response, scope.cookie_name()) {
            append_cookie(&mut response, &removal_cookie(scope, secure));
        }
    }

    response
}

async fn resolve_user(state: &AppState, headers: &HeaderMap) -> Resolution<User> {
    let Some(token) = read_cookie(headers, TokenScope::Shopper.cookie_name()) else {
        return Resolution::Absent;
    };
    let Some(claims) = state.tokens().verify(TokenScope::Shopper, &token) else {
        return Resolution::Stale;
    };
    let Ok(email) = scatch_core::Email::parse(&claims.email) else {
        return Resolution::Stale;
    };

    match state.store().get_user_by_email(&email).await {
        Ok(Some(user)) if user.id.as_i32() == claims.id => Resolution::Found(user),
        Ok(_) => Resolution::Stale,
        Err(e) => log_lookup_failure(&e),
    }
}

async fn resolve_admin(state: &AppState, headers: &HeaderMap) -> Resolution<Admin> {
    let Some(token) = read_cookie(headers, TokenScope::Owner.cookie_name()) else {
        return Resolution::Absent;
    };
    let Some(claims) = state.tokens().verify(TokenScope::Owner, &token) else {
        return Resolution::Stale;
    };
    let Ok(email) = scatch_core::Email::parse(&claims.email) else {
        return Resolution::Stale;
    };

    match state.store().get_admin_by_email(&email).await {
        Ok(Some(admin)) if admin.id.as_i32() == claims.id => Resolution::Found(admin),
        Ok(_) => Resolution::Stale,
        Err(e) => log_lookup_failure(&e),
    }
}

fn log_lookup_failure<T>(e: &RepositoryError) -> Resolution<T> {
    tracing::warn!(error = %e, "identity lookup failed, treating request as anonymous");
    Resolution::Unknown
}

/// Read a cookie value from the request headers.
#[must_use]
pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(Result::ok)
        .find(|cookie| cookie.name() == name)
        .map(|cookie| cookie.value().to_owned())
}

/// Cookie carrying a freshly issued token.
#[must_use]
pub fn token_cookie(scope: TokenScope, token: String, secure: bool) -> Cookie<'static> {
    Cookie::build((scope.cookie_name(), token))
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .path("/")
        .max_age(Duration::seconds(TOKEN_TTL_SECONDS))
        .build()
}

/// Cookie that deletes the token for `scope`.
#[must_use]
pub fn removal_cookie(scope: TokenScope, secure: bool) -> Cookie<'static> {
    Cookie::build((scope.cookie_name(), ""))
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .path("/")
        .max_age(Duration::ZERO)
        .build()
}

/// Append a `Set-Cookie` header to a response.
pub fn append_cookie(response: &mut Response, cookie: &Cookie<'_>) {
    match HeaderValue::from_str(&cookie.to_string()) {
        Ok(value) => {
            response.headers_mut().append(SET_COOKIE, value);
        }
        Err(e) => tracing::error!(error = %e, cookie = cookie.name(), "unencodable cookie"),
    }
}

/// Whether a handler already set this cookie (login and logout do).
fn sets_cookie(response: &Response, name: &str) -> bool {
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .any(|value| value.starts_with(&format!("{name}=")))
}

/// A redirect that also sets `cookie`.
#[must_use]
pub fn redirect_with_cookie(to: &str, cookie: &Cookie<'_>) -> Response {
    let mut response = Redirect::to(to).into_response();
    append_cookie(&mut response, cookie);
    response
}

/// Extractor that optionally gets the current shopper.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(OptionalUser(user): OptionalUser) -> impl IntoResponse {
///     match user {
///         Some(u) => format!("Hello, {}!", u.fullname),
///         None => "Hello, guest!".to_string(),
///     }
/// }
/// ```
pub struct OptionalUser(pub Option<User>);

impl<S> FromRequestParts<S> for OptionalUser
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = parts
            .extensions
            .get::<ResolvedUser>()
            .and_then(|resolved| resolved.0.clone());
        Ok(Self(user))
    }
}

/// Extractor that requires a logged-in shopper.
///
/// Anonymous requests are redirected to `/login` with a notice.
pub struct RequireUser(pub User);

/// Returned when a guarded route is hit without the right identity.
pub struct AuthRejection {
    to: &'static str,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        Redirect::to(self.to).into_response()
    }
}

impl<S> FromRequestParts<S> for RequireUser
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(ResolvedUser(Some(user))) = parts.extensions.get::<ResolvedUser>() {
            return Ok(Self(user.clone()));
        }

        if let Some(session) = parts.extensions.get::<Session>() {
            push_notice(session, Notice::error("Please login!")).await;
        }
        Err(AuthRejection { to: "/login" })
    }
}

/// Extractor that requires a logged-in owner.
///
/// Anonymous requests, and shoppers, are redirected to `/owners/login`.
pub struct RequireAdmin(pub Admin);

impl<S> FromRequestParts<S> for RequireAdmin
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(ResolvedAdmin(Some(admin))) = parts.extensions.get::<ResolvedAdmin>() {
            return Ok(Self(admin.clone()));
        }

        if let Some(session) = parts.extensions.get::<Session>() {
            push_notice(session, Notice::error("Please login as an admin.")).await;
        }
        Err(AuthRejection { to: "/owners/login" })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_cookie_across_headers() {
        let mut headers = HeaderMap::new();
        headers.append(COOKIE, HeaderValue::from_static("theme=dark; token=abc.def"));
        headers.append(COOKIE, HeaderValue::from_static("admin_token=xyz"));

        assert_eq!(read_cookie(&headers, "token").as_deref(), Some("abc.def"));
        assert_eq!(read_cookie(&headers, "admin_token").as_deref(), Some("xyz"));
        assert_eq!(read_cookie(&headers, "missing"), None);
    }

    #[test]
    fn test_token_cookie_attributes() {
        let rendered = token_cookie(TokenScope::Shopper, "t".into(), true).to_string();
        assert!(rendered.starts_with("token=t"));
        assert!(rendered.contains("HttpOnly"));
        assert!(rendered.contains("SameSite=Lax"));
        assert!(rendered.contains("Secure"));
        assert!(rendered.contains("Max-Age=86400"));

        let removal = removal_cookie(TokenScope::Owner, false).to_string();
        assert!(removal.starts_with("admin_token="));
        assert!(removal.contains("Max-Age=0"));
        assert!(!removal.contains("Secure"));
    }
}
