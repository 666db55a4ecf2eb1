//! Account domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use scatch_core::{AdminId, Email, Gender, Role, ShippingDetails, UserId};

/// A registered shopper (domain type).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: UserId,
    pub fullname: String,
    /// Unique, normalised to lower case.
    pub email: Email,
    pub role: Role,
    pub gender: Gender,
    pub age: Option<i32>,
    pub contact: Option<String>,
    /// Saved default shipping address, used to prefill checkout.
    pub address: Option<ShippingDetails>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Name shown in the navigation bar.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.fullname
            .split_whitespace()
            .next()
            .unwrap_or_else(|| self.email.local_part())
    }
}

/// Data needed to insert a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub fullname: String,
    pub email: Email,
    pub password_hash: String,
    pub gender: Gender,
    pub age: i32,
}

/// A store owner with back-office access.
///
/// Owners live apart from shoppers; an owner is never resolved from a
/// shopper token or the other way round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Admin {
    pub id: AdminId,
    pub fullname: String,
    pub email: Email,
    pub created_at: DateTime<Utc>,
}

/// Data needed to insert an owner.
#[derive(Debug, Clone)]
pub struct NewAdmin {
    pub fullname: String,
    pub email: Email,
    pub password_hash: String,
}
