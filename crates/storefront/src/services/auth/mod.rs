//! Authentication service.
//!
//! Password accounts for shoppers and owners. Successful logins are turned
//! into signed tokens by [`TokenKeys`].

mod error;
mod token;

pub use error::AuthError;
pub use token::{Claims, TOKEN_TTL_HOURS, TOKEN_TTL_SECONDS, TokenKeys, TokenScope};

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use serde::Deserialize;
use tracing::instrument;

use scatch_core::{Email, Gender};

use crate::db::{RepositoryError, Store};
use crate::models::{Admin, NewAdmin, NewUser, User};

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Accepted age range at registration.
const AGE_RANGE: std::ops::RangeInclusive<i32> = 13..=120;

/// Registration form as submitted.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Registration {
    pub fullname: String,
    pub email: String,
    pub password: String,
    pub age: String,
    pub gender: String,
}

/// Authentication service.
pub struct AuthService<'a> {
    store: &'a dyn Store,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(store: &'a dyn Store) -> Self {
        Self { store }
    }

    /// Register a new shopper.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail`, `MissingName`, `InvalidAge` or
    /// `WeakPassword` for bad input, and `AuthError::UserAlreadyExists` if the
    /// email is already registered.
    #[instrument(skip_all, fields(email = %form.email.trim()))]
    pub async fn register(&self, form: &Registration) -> Result<User, AuthError> {
        let email = Email::parse(&form.email)?;

        let fullname = form.fullname.trim();
        if fullname.is_empty() {
            return Err(AuthError::MissingName);
        }

        let age = parse_age(&form.age)?;
        let gender = form.gender.parse::<Gender>().unwrap_or_default();

        validate_password(&form.password)?;
        let password_hash = hash_password(&form.password)?;

        let user = self
            .store
            .create_user(&NewUser {
                fullname: fullname.to_owned(),
                email,
                password_hash,
                gender,
                age,
            })
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })?;

        tracing::info!(user_id = %user.id, "shopper registered");
        Ok(user)
    }

    /// Login with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong.
    #[instrument(skip_all)]
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;

        let (user, password_hash) = self
            .store
            .get_user_credentials(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &password_hash)?;

        Ok(user)
    }

    /// Login to the back office.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong.
    #[instrument(skip_all)]
    pub async fn admin_login(&self, email: &str, password: &str) -> Result<Admin, AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;

        let (admin, password_hash) = self
            .store
            .get_admin_credentials(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &password_hash)?;

        Ok(admin)
    }

    /// Create an owner account.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserAlreadyExists` if the email is taken by another
    /// owner.
    pub async fn create_admin(
        &self,
        fullname: &str,
        email: &str,
        password: &str,
    ) -> Result<Admin, AuthError> {
        let email = Email::parse(email)?;
        let fullname = fullname.trim();
        if fullname.is_empty() {
            return Err(AuthError::MissingName);
        }
        validate_password(password)?;
        let password_hash = hash_password(password)?;

        self.store
            .create_admin(&NewAdmin {
                fullname: fullname.to_owned(),
                email,
                password_hash,
            })
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })
    }
}

fn parse_age(raw: &str) -> Result<i32, AuthError> {
    raw.trim()
        .parse::<i32>()
        .ok()
        .filter(|age| AGE_RANGE.contains(age))
        .ok_or(AuthError::InvalidAge)
}

/// Validate password meets requirements.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters."
        )));
    }

    Ok(())
}

/// Hash a password using Argon2id.
fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use crate::db::MemoryStore;

    use super::*;

    fn registration(email: &str) -> Registration {
        Registration {
            fullname: "Asha Rao".into(),
            email: email.into(),
            password: "correct horse".into(),
            age: "30".into(),
            gender: "Female".into(),
        }
    }

    #[tokio::test]
    async fn test_register_then_login() {
        let store = MemoryStore::new();
        let auth = AuthService::new(&store);

        let user = auth
            .register(&registration("  Asha@Example.com "))
            .await
            .unwrap();
        assert_eq!(user.email.as_str(), "asha@example.com");
        assert_eq!(user.gender, Gender::Female);

        let logged_in = auth.login("ASHA@example.com", "correct horse").await.unwrap();
        assert_eq!(logged_in.id, user.id);
    }

    #[tokio::test]
    async fn test_login_failures_look_identical() {
        let store = MemoryStore::new();
        let auth = AuthService::new(&store);
        auth.register(&registration("asha@example.com"))
            .await
            .unwrap();

        let wrong_password = auth.login("asha@example.com", "nope nope").await;
        let unknown_email = auth.login("nobody@example.com", "correct horse").await;
        assert!(matches!(wrong_password, Err(AuthError::InvalidCredentials)));
        assert!(matches!(unknown_email, Err(AuthError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_duplicate_registration() {
        let store = MemoryStore::new();
        let auth = AuthService::new(&store);
        auth.register(&registration("asha@example.com"))
            .await
            .unwrap();

        let again = auth.register(&registration("ASHA@example.com")).await;
        assert!(matches!(again, Err(AuthError::UserAlreadyExists)));
    }

    #[tokio::test]
    async fn test_registration_validation() {
        let store = MemoryStore::new();
        let auth = AuthService::new(&store);

        let mut young = registration("kid@example.com");
        young.age = "12".into();
        assert!(matches!(
            auth.register(&young).await,
            Err(AuthError::InvalidAge)
        ));

        let mut short = registration("short@example.com");
        short.password = "1234567".into();
        assert!(matches!(
            auth.register(&short).await,
            Err(AuthError::WeakPassword(_))
        ));

        let mut bad_email = registration("not-an-email");
        bad_email.email = "not-an-email".into();
        assert!(matches!(
            auth.register(&bad_email).await,
            Err(AuthError::InvalidEmail(_))
        ));
    }

    #[tokio::test]
    async fn test_admin_and_shopper_accounts_are_separate() {
        let store = MemoryStore::new();
        let auth = AuthService::new(&store);
        auth.register(&registration("asha@example.com"))
            .await
            .unwrap();

        let as_admin = auth.admin_login("asha@example.com", "correct horse").await;
        assert!(matches!(as_admin, Err(AuthError::InvalidCredentials)));

        auth.create_admin("Owner", "owner@example.com", "owner password")
            .await
            .unwrap();
        let admin = auth
            .admin_login("owner@example.com", "owner password")
            .await
            .unwrap();
        assert_eq!(admin.email.as_str(), "owner@example.com");
        assert!(matches!(
            auth.login("owner@example.com", "owner password").await,
            Err(AuthError::InvalidCredentials)
        ));
    }
}
