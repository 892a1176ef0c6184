use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;

use super::RepositoryError;
use crate::models::user::{CreateUserRequest, User};

const USER_COLUMNS: &str =
    "id, email, password_hash, first_name, last_name, created_at, updated_at";

/// Trait defining user repository operations
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Create a new user
    async fn create(
        &self,
        user: CreateUserRequest,
        password_hash: String,
    ) -> Result<User, RepositoryError>;

    /// Find a user by email, ignoring case
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError>;

    /// Find a user by ID
    async fn find_by_id(&self, id: i64) -> Result<Option<User>, RepositoryError>;

    /// Replace the user's first and last name
    async fn update_name(
        &self,
        id: i64,
        first_name: &str,
        last_name: &str,
    ) -> Result<User, RepositoryError>;
}

/// SQLite implementation of UserRepository
pub struct SqliteUserRepository {
    pool: SqlitePool,
}

impl SqliteUserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for SqliteUserRepository {
    async fn create(
        &self,
        user: CreateUserRequest,
        password_hash: String,
    ) -> Result<User, RepositoryError> {
        let now = Utc::now();

        let result = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (email, password_hash, first_name, last_name, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&user.email)
        .bind(&password_hash)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(user) => Ok(user),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => Err(
                RepositoryError::ConstraintViolation("Email already exists".to_string()),
            ),
            Err(e) => Err(e.into()),
        }
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = ?"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<User>, RepositoryError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn update_name(
        &self,
        id: i64,
        first_name: &str,
        last_name: &str,
    ) -> Result<User, RepositoryError> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET first_name = ?, last_name = ?, updated_at = ?
            WHERE id = ?
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(first_name)
        .bind(last_name)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        user.ok_or(RepositoryError::NotFound)
    }
}
