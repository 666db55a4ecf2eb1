//! Store owner repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use scatch_core::{AdminId, Email};

use super::{RepositoryError, conflict_on_unique};
use crate::models::{Admin, NewAdmin};

#[derive(Debug, sqlx::FromRow)]
struct AdminRow {
    id: AdminId,
    fullname: String,
    email: String,
    created_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct AdminWithHashRow {
    #[sqlx(flatten)]
    admin: AdminRow,
    password_hash: String,
}

impl TryFrom<AdminRow> for Admin {
    type Error = RepositoryError;

    fn try_from(row: AdminRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;
        Ok(Self {
            id: row.id,
            fullname: row.fullname,
            email,
            created_at: row.created_at,
        })
    }
}

/// Repository for the `owners` table.
pub struct AdminRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> AdminRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Create an owner account.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email already exists.
    pub async fn create(&self, admin: &NewAdmin) -> Result<Admin, RepositoryError> {
        let row: AdminRow = sqlx::query_as(
            r"
            INSERT INTO owners (fullname, email, password_hash)
            VALUES ($1, $2, $3)
            RETURNING id, fullname, email, created_at
            ",
        )
        .bind(admin.fullname.trim())
        .bind(admin.email.as_str())
        .bind(&admin.password_hash)
        .fetch_one(self.pool)
        .await
        .map_err(conflict_on_unique("owner email already exists"))?;
        row.try_into()
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_email(&self, email: &Email) -> Result<Option<Admin>, RepositoryError> {
        let row: Option<AdminRow> =
            sqlx::query_as("SELECT id, fullname, email, created_at FROM owners WHERE email = $1")
                .bind(email.as_str())
                .fetch_optional(self.pool)
                .await?;
        row.map(Admin::try_from).transpose()
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_with_password_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(Admin, String)>, RepositoryError> {
        let row: Option<AdminWithHashRow> = sqlx::query_as(
            "SELECT id, fullname, email, created_at, password_hash FROM owners WHERE email = $1",
        )
        .bind(email.as_str())
        .fetch_optional(self.pool)
        .await?;

        match row {
            Some(r) => Ok(Some((r.admin.try_into()?, r.password_hash))),
            None => Ok(None),
        }
    }
}
