pub mod category_repository;
pub mod expense_repository;
pub mod user_repository;

pub use category_repository::{CategoryRepository, SqliteCategoryRepository};
pub use expense_repository::{ExpenseRepository, SqliteExpenseRepository};
pub use user_repository::{SqliteUserRepository, UserRepository};

/// Repository errors for database operations
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Resource not found")]
    NotFound,

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),
}

impl From<sqlx::Error> for RepositoryError {
    fn from(error: sqlx::Error) -> Self {
        match error {
            sqlx::Error::RowNotFound => RepositoryError::NotFound,
            sqlx::Error::Database(db_err)
                if db_err.is_unique_violation() || db_err.is_foreign_key_violation() =>
            {
                RepositoryError::ConstraintViolation(db_err.message().to_string())
            }
            e => RepositoryError::DatabaseError(e.to_string()),
        }
    }
}
