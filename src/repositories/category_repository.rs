use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use super::RepositoryError;
use crate::models::category::{
    Category, CategoryOwner, CreateCategoryRequest, DEFAULT_CATEGORIES, OwnedCategory,
};

const CATEGORY_COLUMNS: &str = "id, name, description, color, icon, user_id, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct CategoryRow {
    id: i64,
    name: String,
    description: Option<String>,
    color: String,
    icon: String,
    user_id: Option<i64>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Category {
            id: row.id,
            name: row.name,
            description: row.description,
            color: row.color,
            icon: row.icon,
            owner: CategoryOwner::from_user_id(row.user_id),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Trait defining category repository operations
#[async_trait]
pub trait CategoryRepository: Send + Sync {
    /// Create a category owned by `owner_id`
    async fn create(
        &self,
        owner_id: i64,
        category: CreateCategoryRequest,
    ) -> Result<Category, RepositoryError>;

    /// Find a category by ID regardless of owner
    async fn find_by_id(&self, id: i64) -> Result<Option<Category>, RepositoryError>;

    /// Categories owned by the user, preceded by the shared ones when `include_defaults` is set
    async fn find_for_user(
        &self,
        user_id: i64,
        include_defaults: bool,
    ) -> Result<Vec<Category>, RepositoryError>;

    /// Write the mutable fields of an owned category
    async fn update(&self, category: &OwnedCategory) -> Result<Category, RepositoryError>;

    /// Delete an owned category unless an expense still references it.
    ///
    /// Returns `false` when the category is in use.
    async fn delete_unused(&self, category: &OwnedCategory) -> Result<bool, RepositoryError>;

    /// Number of the user's expenses filed under the category
    async fn count_expenses(&self, category_id: i64, user_id: i64)
    -> Result<i64, RepositoryError>;

    /// Insert the default categories when no shared category exists yet.
    ///
    /// Returns the number of categories inserted.
    async fn seed_defaults(&self) -> Result<usize, RepositoryError>;
}

/// SQLite implementation of CategoryRepository
pub struct SqliteCategoryRepository {
    pool: SqlitePool,
}

impl SqliteCategoryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CategoryRepository for SqliteCategoryRepository {
    async fn create(
        &self,
        owner_id: i64,
        category: CreateCategoryRequest,
    ) -> Result<Category, RepositoryError> {
        let now = Utc::now();

        let row = sqlx::query_as::<_, CategoryRow>(&format!(
            r#"
            INSERT INTO categories (name, description, color, icon, user_id, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            RETURNING {CATEGORY_COLUMNS}
            "#
        ))
        .bind(&category.name)
        .bind(&category.description)
        .bind(&category.color)
        .bind(&category.icon)
        .bind(owner_id)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Category>, RepositoryError> {
        let row = sqlx::query_as::<_, CategoryRow>(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM categories WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Category::from))
    }

    async fn find_for_user(
        &self,
        user_id: i64,
        include_defaults: bool,
    ) -> Result<Vec<Category>, RepositoryError> {
        let rows = sqlx::query_as::<_, CategoryRow>(&format!(
            r#"
            SELECT {CATEGORY_COLUMNS}
            FROM categories
            WHERE user_id = ? OR (? AND user_id IS NULL)
            ORDER BY user_id IS NOT NULL, name COLLATE NOCASE ASC, id ASC
            "#
        ))
        .bind(user_id)
        .bind(include_defaults)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Category::from).collect())
    }

    async fn update(&self, category: &OwnedCategory) -> Result<Category, RepositoryError> {
        let fields = category.category();

        let row = sqlx::query_as::<_, CategoryRow>(&format!(
            r#"
            UPDATE categories
            SET name = ?, description = ?, color = ?, icon = ?, updated_at = ?
            WHERE id = ? AND user_id = ?
            RETURNING {CATEGORY_COLUMNS}
            "#
        ))
        .bind(&fields.name)
        .bind(&fields.description)
        .bind(&fields.color)
        .bind(&fields.icon)
        .bind(Utc::now())
        .bind(fields.id)
        .bind(category.owner_id())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Category::from).ok_or(RepositoryError::NotFound)
    }

    async fn delete_unused(&self, category: &OwnedCategory) -> Result<bool, RepositoryError> {
        let id = category.category().id;

        let result = sqlx::query(
            r#"
            DELETE FROM categories
            WHERE id = ? AND user_id = ?
                AND NOT EXISTS (SELECT 1 FROM expenses WHERE category_id = ?)
            "#,
        )
        .bind(id)
        .bind(category.owner_id())
        .bind(id)
        .execute(&self.pool)
        .await;

        match result {
            Ok(done) => Ok(done.rows_affected() > 0),
            // an expense inserted between the check and the delete trips the foreign key
            Err(sqlx::Error::Database(db_err)) if db_err.is_foreign_key_violation() => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn count_expenses(
        &self,
        category_id: i64,
        user_id: i64,
    ) -> Result<i64, RepositoryError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM expenses WHERE category_id = ? AND user_id = ?",
        )
        .bind(category_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    async fn seed_defaults(&self) -> Result<usize, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let existing: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM categories WHERE user_id IS NULL")
                .fetch_one(&mut *tx)
                .await?;
        if existing > 0 {
            return Ok(0);
        }

        let now = Utc::now();
        for default in DEFAULT_CATEGORIES {
            sqlx::query(
                r#"
                INSERT INTO categories (name, description, color, icon, user_id, created_at, updated_at)
                VALUES (?, ?, ?, ?, NULL, ?, ?)
                "#,
            )
            .bind(default.name)
            .bind(default.description)
            .bind(default.color)
            .bind(default.icon)
            .bind(now)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(DEFAULT_CATEGORIES.len())
    }
}
