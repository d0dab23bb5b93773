//! User repository for database operations
//!
//! Defines the [`UserStore`] seam the auth service persists through, and its
//! PostgreSQL implementation. Email uniqueness is the database's job: the
//! partial unique index on live rows rejects duplicates, and the violation is
//! reported as [`UserStoreError::DuplicateEmail`].

use async_trait::async_trait;
use sqlx::PgPool;

use crate::core::db::models::{NewUser, ProfileUpdate, User};

const USER_COLUMNS: &str = "id, email, password_hash, first_name, last_name, phone, role, \
                            is_active, deleted_at, created_at, updated_at";

/// User store error types
#[derive(Debug, thiserror::Error)]
pub enum UserStoreError {
    #[error("User not found")]
    NotFound,

    #[error("Email already exists")]
    DuplicateEmail,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Persistence operations on user records. Lookups never return soft-deleted rows.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, UserStoreError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<User>, UserStoreError>;

    /// Insert a new active user. Fails with `DuplicateEmail` if a live user has the email.
    async fn insert(&self, user: NewUser) -> Result<User, UserStoreError>;

    async fn update_profile(
        &self,
        id: i64,
        update: ProfileUpdate,
    ) -> Result<User, UserStoreError>;

    async fn set_active(&self, id: i64, active: bool) -> Result<User, UserStoreError>;

    /// Mark the user deleted. The row is kept; its email becomes free again.
    async fn soft_delete(&self, id: i64) -> Result<(), UserStoreError>;
}

/// PostgreSQL-backed user store
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    /// Create a new user repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn map_insert_error(err: sqlx::Error) -> UserStoreError {
    if err
        .as_database_error()
        .is_some_and(|db_err| db_err.is_unique_violation())
    {
        UserStoreError::DuplicateEmail
    } else {
        UserStoreError::Database(err)
    }
}

#[async_trait]
impl UserStore for UserRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, UserStoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1 AND deleted_at IS NULL"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<User>, UserStoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1 AND deleted_at IS NULL"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn insert(&self, user: NewUser) -> Result<User, UserStoreError> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (email, password_hash, first_name, last_name, phone, role, is_active)
            VALUES ($1, $2, $3, $4, $5, $6, TRUE)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.phone)
        .bind(user.role)
        .fetch_one(&self.pool)
        .await
        .map_err(map_insert_error)
    }

    async fn update_profile(
        &self,
        id: i64,
        update: ProfileUpdate,
    ) -> Result<User, UserStoreError> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET first_name = $2, last_name = $3, phone = $4, updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&update.first_name)
        .bind(&update.last_name)
        .bind(&update.phone)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(UserStoreError::NotFound)
    }

    async fn set_active(&self, id: i64, active: bool) -> Result<User, UserStoreError> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET is_active = $2, updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(active)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(UserStoreError::NotFound)
    }

    async fn soft_delete(&self, id: i64) -> Result<(), UserStoreError> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET deleted_at = NOW(), is_active = FALSE, updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(UserStoreError::NotFound);
        }

        Ok(())
    }
}
