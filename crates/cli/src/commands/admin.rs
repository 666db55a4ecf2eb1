//! Owner account management.
//!
//! # Usage
//!
//! ```bash
//! scatch-cli admin create -e owner@example.com -n "Owner Name" -p 'a long password'
//! ```

use thiserror::Error;

use scatch_storefront::db::PgStore;
use scatch_storefront::services::{AuthError, AuthService};

use super::{CommandError, connect};

/// Errors from owner account commands.
#[derive(Debug, Error)]
pub enum AdminError {
    #[error(transparent)]
    Connect(#[from] CommandError),

    #[error("Admin user already exists with email: {0}")]
    UserExists(String),

    #[error(transparent)]
    Auth(AuthError),
}

/// Create an owner account.
///
/// # Returns
///
/// The ID of the created owner.
///
/// # Errors
///
/// Returns an error for an invalid email, blank name, short password or an
/// email that is already taken.
pub async fn create_user(email: &str, name: &str, password: &str) -> Result<i32, AdminError> {
    let store = PgStore::new(connect().await?);

    tracing::info!("Creating admin user: {}", email);

    let admin = AuthService::new(&store)
        .create_admin(name, email, password)
        .await
        .map_err(|e| match e {
            AuthError::UserAlreadyExists => AdminError::UserExists(email.to_owned()),
            other => AdminError::Auth(other),
        })?;

    tracing::info!(
        "Admin user created successfully! ID: {}, Email: {}",
        admin.id,
        admin.email
    );

    Ok(admin.id.as_i32())
}
