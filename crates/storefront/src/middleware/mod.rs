//! HTTP middleware stack for storefront.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (added in `main`)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//! 4. Security headers
//! 5. Session layer (tower-sessions, memory store, flash notices only)
//! 6. Identity (verify token cookies, attach shopper/owner)
//! 7. Rate limiting on the auth forms (governor)

pub mod auth;
pub mod rate_limit;
pub mod request_id;
pub mod security_headers;
pub mod session;

pub use auth::{
    OptionalUser, RequireAdmin, RequireUser, ResolvedAdmin, ResolvedUser, read_cookie,
    redirect_with_cookie, removal_cookie, resolve_identity, token_cookie,
};
pub use rate_limit::auth_rate_limiter;
pub use request_id::request_id_middleware;
pub use security_headers::security_headers_middleware;
pub use session::{create_session_layer, push_notice, take_notices};
