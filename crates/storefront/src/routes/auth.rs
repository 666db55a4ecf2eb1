//! Shopper authentication route handlers.
//!
//! Login and registration issue a signed token in the `token` cookie;
//! logout clears it.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use scatch_core::Gender;

use crate::error::AppError;
use crate::filters;
use crate::middleware::{
    OptionalUser, push_notice, redirect_with_cookie, removal_cookie, token_cookie,
};
use crate::models::{Notice, User};
use crate::routes::page::{Layout, PageContext};
use crate::services::{AuthService, Registration, TokenScope};
use crate::state::AppState;

// =============================================================================
// Form Types
// =============================================================================

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub layout: Layout,
}

/// Register page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/register.html")]
pub struct RegisterTemplate {
    pub layout: Layout,
    pub genders: Vec<&'static str>,
}

// =============================================================================
// Handlers
// =============================================================================

/// Display the login page.
pub async fn login_page(OptionalUser(user): OptionalUser, page: PageContext) -> Response {
    if user.is_some() {
        return Redirect::to("/shop").into_response();
    }
    LoginTemplate {
        layout: page.layout("Login").await,
    }
    .into_response()
}

/// Handle login form submission.
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Response {
    let result = AuthService::new(state.store())
        .login(&form.email, &form.password)
        .await;

    match result.map_err(AppError::from).and_then(|user| issue(&state, &user)) {
        Ok(response) => {
            push_notice(&session, Notice::success("Login successful!")).await;
            response
        }
        Err(e) => e.redirect_with_notice(&session, "/login").await,
    }
}

/// Display the registration page.
pub async fn register_page(OptionalUser(user): OptionalUser, page: PageContext) -> Response {
    if user.is_some() {
        return Redirect::to("/shop").into_response();
    }
    RegisterTemplate {
        layout: page.layout("Create account").await,
        genders: Gender::ALL.iter().map(|g| g.label()).collect(),
    }
    .into_response()
}

/// Handle registration form submission. A new account is logged in at once.
#[instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<Registration>,
) -> Response {
    let result = AuthService::new(state.store()).register(&form).await;

    match result.map_err(AppError::from).and_then(|user| issue(&state, &user)) {
        Ok(response) => {
            push_notice(
                &session,
                Notice::success("Account created successfully! Welcome!"),
            )
            .await;
            response
        }
        Err(e) => e.redirect_with_notice(&session, "/register").await,
    }
}

/// Log the shopper out.
pub async fn logout(State(state): State<AppState>) -> Response {
    redirect_with_cookie(
        "/login",
        &removal_cookie(TokenScope::Shopper, state.config().secure_cookies()),
    )
}

/// Redirect to the shop with a fresh shopper token.
fn issue(state: &AppState, user: &User) -> Result<Response, AppError> {
    let token = state
        .tokens()
        .issue(TokenScope::Shopper, user.id.as_i32(), &user.email)?;
    let cookie = token_cookie(TokenScope::Shopper, token, state.config().secure_cookies());
    Ok(redirect_with_cookie("/shop", &cookie))
}
