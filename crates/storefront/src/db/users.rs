//! User repository for database operations.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use scatch_core::{Email, Gender, Role, ShippingDetails, UserId};

use super::{RepositoryError, conflict_on_unique};
use crate::models::{NewUser, User};

macro_rules! user_columns {
    () => {
        "id, fullname, email, role, gender, age, contact, \
         address_full_name, address_street, address_city, address_state, \
         address_zip_code, address_phone, address_country, created_at, updated_at"
    };
}

/// Row type for the `users` table.
#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: UserId,
    fullname: String,
    email: String,
    role: Role,
    gender: Gender,
    age: Option<i32>,
    contact: Option<String>,
    address_full_name: Option<String>,
    address_street: Option<String>,
    address_city: Option<String>,
    address_state: Option<String>,
    address_zip_code: Option<String>,
    address_phone: Option<String>,
    address_country: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct UserWithHashRow {
    #[sqlx(flatten)]
    user: UserRow,
    password_hash: String,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        let address = match (row.address_street, row.address_city) {
            (Some(street), Some(city)) => Some(ShippingDetails {
                full_name: row.address_full_name.unwrap_or_else(|| row.fullname.clone()),
                street,
                city,
                state: row.address_state.unwrap_or_default(),
                zip_code: row.address_zip_code.unwrap_or_default(),
                phone: row.address_phone.unwrap_or_default(),
                country: row.address_country.unwrap_or_default(),
            }),
            _ => None,
        };

        Ok(Self {
            id: row.id,
            fullname: row.fullname,
            email,
            role: row.role,
            gender: row.gender,
            age: row.age,
            contact: row.contact,
            address,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Repository for user database operations.
pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a user by their email address.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the email in the database is invalid.
    pub async fn get_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let row: Option<UserRow> =
            sqlx::query_as(concat!("SELECT ", user_columns!(), " FROM users WHERE email = $1"))
                .bind(email.as_str())
                .fetch_optional(self.pool)
                .await?;
        row.map(User::try_from).transpose()
    }

    /// Get a user by their ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the email in the database is invalid.
    pub async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let row: Option<UserRow> =
            sqlx::query_as(concat!("SELECT ", user_columns!(), " FROM users WHERE id = $1"))
                .bind(id)
                .fetch_optional(self.pool)
                .await?;
        row.map(User::try_from).transpose()
    }

    /// Create a new user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email already exists.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(&self, user: &NewUser) -> Result<User, RepositoryError> {
        let row: UserRow = sqlx::query_as(concat!(
            r"
            INSERT INTO users (fullname, email, password_hash, gender, age)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING ",
            user_columns!()
        ))
        .bind(user.fullname.trim())
        .bind(user.email.as_str())
        .bind(&user.password_hash)
        .bind(user.gender)
        .bind(user.age)
        .fetch_one(self.pool)
        .await
        .map_err(conflict_on_unique("email already exists"))?;
        row.try_into()
    }

    /// Get a user together with their password hash.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_with_password_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let row: Option<UserWithHashRow> = sqlx::query_as(concat!(
            "SELECT ",
            user_columns!(),
            ", password_hash FROM users WHERE email = $1"
        ))
        .bind(email.as_str())
        .fetch_optional(self.pool)
        .await?;

        match row {
            Some(r) => Ok(Some((r.user.try_into()?, r.password_hash))),
            None => Ok(None),
        }
    }
}
