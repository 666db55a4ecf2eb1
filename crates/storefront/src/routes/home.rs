//! Entry point and fallback redirects.

use axum::response::Redirect;

use crate::middleware::OptionalUser;

/// `/` sends shoppers to the shop and everyone else to the login page.
pub async fn home(OptionalUser(user): OptionalUser) -> Redirect {
    if user.is_some() {
        Redirect::to("/shop")
    } else {
        Redirect::to("/login")
    }
}

/// Unknown paths land on the login page.
pub async fn fallback() -> Redirect {
    Redirect::to("/login")
}

/// Old back-office URL.
pub async fn admin_dashboard_alias() -> Redirect {
    Redirect::to("/owners/admin")
}
