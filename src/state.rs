use axum::extract::FromRef;
use sqlx::SqlitePool;
use std::sync::Arc;

use crate::config::AuthSettings;
use crate::repositories::{SqliteCategoryRepository, SqliteExpenseRepository, SqliteUserRepository};
use crate::services::{
    AuthService, AuthServiceImpl, CategoryService, CategoryServiceImpl, ExpenseService,
    ExpenseServiceImpl,
};

/// Services shared by every request handler
#[derive(Clone, FromRef)]
pub struct AppState {
    pub auth_service: Arc<dyn AuthService>,
    pub category_service: Arc<dyn CategoryService>,
    pub expense_service: Arc<dyn ExpenseService>,
}

impl AppState {
    /// Wire the SQLite repositories and services on top of `pool`
    pub fn new(pool: SqlitePool, auth_settings: AuthSettings) -> Self {
        let user_repository = Arc::new(SqliteUserRepository::new(pool.clone()));
        let category_repository = Arc::new(SqliteCategoryRepository::new(pool.clone()));
        let expense_repository = Arc::new(SqliteExpenseRepository::new(pool));

        Self {
            auth_service: Arc::new(AuthServiceImpl::new(user_repository, auth_settings)),
            category_service: Arc::new(CategoryServiceImpl::new(category_repository)),
            expense_service: Arc::new(ExpenseServiceImpl::new(expense_repository)),
        }
    }
}
