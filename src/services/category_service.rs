use async_trait::async_trait;
use std::sync::Arc;

use crate::models::category::{
    Category, CategoryStats, CreateCategoryRequest, UpdateCategoryRequest,
};
use crate::repositories::{CategoryRepository, RepositoryError};
use crate::services::ownership::{self, AccessError};
use crate::validation::normalize_optional;

/// Category service errors
#[derive(Debug, thiserror::Error)]
pub enum CategoryError {
    #[error("Category not found")]
    CategoryNotFound,

    #[error("Default categories cannot be modified")]
    CannotModifyDefault,

    #[error("Category is in use and cannot be deleted")]
    CategoryInUse,

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<RepositoryError> for CategoryError {
    fn from(error: RepositoryError) -> Self {
        match error {
            RepositoryError::NotFound => CategoryError::CategoryNotFound,
            RepositoryError::DatabaseError(msg) => CategoryError::DatabaseError(msg),
            RepositoryError::ConstraintViolation(msg) => CategoryError::DatabaseError(msg),
        }
    }
}

impl From<AccessError> for CategoryError {
    fn from(error: AccessError) -> Self {
        match error {
            AccessError::NotFound => CategoryError::CategoryNotFound,
            AccessError::ReadOnly => CategoryError::CannotModifyDefault,
        }
    }
}

/// Trait defining category service operations
#[async_trait]
pub trait CategoryService: Send + Sync {
    /// Categories the user can use, optionally without the shared defaults
    async fn list_categories(
        &self,
        user_id: i64,
        include_defaults: bool,
    ) -> Result<Vec<Category>, CategoryError>;

    /// A single category visible to the user
    async fn get_category(&self, user_id: i64, id: i64) -> Result<Category, CategoryError>;

    /// A visible category with the number of the user's expenses filed under it
    async fn category_stats(
        &self,
        user_id: i64,
        id: i64,
    ) -> Result<(Category, CategoryStats), CategoryError>;

    /// Create a category owned by the user
    async fn create_category(
        &self,
        user_id: i64,
        request: CreateCategoryRequest,
    ) -> Result<Category, CategoryError>;

    /// Apply the present fields of `request` to one of the user's categories
    async fn update_category(
        &self,
        user_id: i64,
        id: i64,
        request: UpdateCategoryRequest,
    ) -> Result<Category, CategoryError>;

    /// Delete one of the user's categories if no expense uses it
    async fn delete_category(&self, user_id: i64, id: i64) -> Result<(), CategoryError>;

    /// Insert the shared default categories if there are none yet
    async fn seed_defaults(&self) -> Result<usize, CategoryError>;
}

/// Implementation of CategoryService
pub struct CategoryServiceImpl {
    category_repository: Arc<dyn CategoryRepository>,
}

impl CategoryServiceImpl {
    pub fn new(category_repository: Arc<dyn CategoryRepository>) -> Self {
        Self {
            category_repository,
        }
    }
}

#[async_trait]
impl CategoryService for CategoryServiceImpl {
    async fn list_categories(
        &self,
        user_id: i64,
        include_defaults: bool,
    ) -> Result<Vec<Category>, CategoryError> {
        let categories = self
            .category_repository
            .find_for_user(user_id, include_defaults)
            .await?;
        Ok(categories)
    }

    async fn get_category(&self, user_id: i64, id: i64) -> Result<Category, CategoryError> {
        let category = self.category_repository.find_by_id(id).await?;
        Ok(ownership::visible_category(category, user_id)?)
    }

    async fn category_stats(
        &self,
        user_id: i64,
        id: i64,
    ) -> Result<(Category, CategoryStats), CategoryError> {
        let category = self.get_category(user_id, id).await?;
        let expense_count = self
            .category_repository
            .count_expenses(category.id, user_id)
            .await?;

        Ok((category, CategoryStats { expense_count }))
    }

    async fn create_category(
        &self,
        user_id: i64,
        request: CreateCategoryRequest,
    ) -> Result<Category, CategoryError> {
        let request = CreateCategoryRequest {
            name: request.name.trim().to_string(),
            description: normalize_optional(request.description),
            color: request.color.to_uppercase(),
            icon: request.icon.trim().to_string(),
        };

        let category = self.category_repository.create(user_id, request).await?;
        tracing::info!(category_id = category.id, user_id, "Category created");
        Ok(category)
    }

    async fn update_category(
        &self,
        user_id: i64,
        id: i64,
        request: UpdateCategoryRequest,
    ) -> Result<Category, CategoryError> {
        let current = self.category_repository.find_by_id(id).await?;
        let mut owned = ownership::mutable_category(current, user_id)?;

        let category = owned.category_mut();
        if let Some(name) = request.name {
            category.name = name.trim().to_string();
        }
        if let Some(description) = request.description {
            category.description = normalize_optional(Some(description));
        }
        if let Some(color) = request.color {
            category.color = color.to_uppercase();
        }
        if let Some(icon) = request.icon {
            category.icon = icon.trim().to_string();
        }

        Ok(self.category_repository.update(&owned).await?)
    }

    async fn delete_category(&self, user_id: i64, id: i64) -> Result<(), CategoryError> {
        let current = self.category_repository.find_by_id(id).await?;
        let owned = ownership::mutable_category(current, user_id)?;

        if !self.category_repository.delete_unused(&owned).await? {
            return Err(CategoryError::CategoryInUse);
        }

        tracing::info!(category_id = id, user_id, "Category deleted");
        Ok(())
    }

    async fn seed_defaults(&self) -> Result<usize, CategoryError> {
        Ok(self.category_repository.seed_defaults().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::models::category::{CategoryOwner, DEFAULT_CATEGORIES};
    use crate::models::user::CreateUserRequest;
    use crate::repositories::{SqliteCategoryRepository, SqliteUserRepository, UserRepository};
    use sqlx::SqlitePool;

    struct Fixture {
        pool: SqlitePool,
        service: CategoryServiceImpl,
        alice: i64,
        bob: i64,
    }

    async fn setup() -> Fixture {
        let pool = db::connect_in_memory().await.unwrap();
        let users = SqliteUserRepository::new(pool.clone());
        let mut ids = Vec::new();
        for email in ["alice@example.com", "bob@example.com"] {
            let user = users
                .create(
                    CreateUserRequest {
                        email: email.to_string(),
                        password: "password123".to_string(),
                        first_name: "Test".to_string(),
                        last_name: "User".to_string(),
                    },
                    "hash".to_string(),
                )
                .await
                .unwrap();
            ids.push(user.id);
        }

        let service = CategoryServiceImpl::new(Arc::new(SqliteCategoryRepository::new(pool.clone())));
        service.seed_defaults().await.unwrap();

        Fixture {
            pool,
            service,
            alice: ids[0],
            bob: ids[1],
        }
    }

    fn request(name: &str) -> CreateCategoryRequest {
        CreateCategoryRequest {
            name: name.to_string(),
            description: Some("Daily caffeine".to_string()),
            color: "#6f4e37".to_string(),
            icon: "coffee".to_string(),
        }
    }

    async fn shared_category(f: &Fixture) -> Category {
        f.service
            .list_categories(f.alice, true)
            .await
            .unwrap()
            .into_iter()
            .find(Category::is_default)
            .unwrap()
    }

    #[tokio::test]
    async fn test_create_normalizes_input() {
        let f = setup().await;

        let category = f
            .service
            .create_category(
                f.alice,
                CreateCategoryRequest {
                    name: "  Coffee ".to_string(),
                    description: Some("   ".to_string()),
                    ..request("Coffee")
                },
            )
            .await
            .unwrap();

        assert_eq!(category.name, "Coffee");
        assert_eq!(category.description, None);
        assert_eq!(category.color, "#6F4E37");
        assert_eq!(category.owner, CategoryOwner::Owned(f.alice));
    }

    #[tokio::test]
    async fn test_list_respects_include_defaults() {
        let f = setup().await;
        f.service.create_category(f.alice, request("Coffee")).await.unwrap();
        f.service.create_category(f.bob, request("Bob's")).await.unwrap();

        let all = f.service.list_categories(f.alice, true).await.unwrap();
        assert_eq!(all.len(), DEFAULT_CATEGORIES.len() + 1);

        let own = f.service.list_categories(f.alice, false).await.unwrap();
        assert_eq!(own.len(), 1);
        assert_eq!(own[0].name, "Coffee");
    }

    #[tokio::test]
    async fn test_other_users_category_is_not_found() {
        let f = setup().await;
        let bobs = f.service.create_category(f.bob, request("Bob's")).await.unwrap();

        assert!(matches!(
            f.service.get_category(f.alice, bobs.id).await,
            Err(CategoryError::CategoryNotFound)
        ));
        assert!(matches!(
            f.service
                .update_category(f.alice, bobs.id, UpdateCategoryRequest::default())
                .await,
            Err(CategoryError::CategoryNotFound)
        ));
        assert!(matches!(
            f.service.delete_category(f.alice, bobs.id).await,
            Err(CategoryError::CategoryNotFound)
        ));
    }

    #[tokio::test]
    async fn test_shared_category_is_read_only() {
        let f = setup().await;
        let shared = shared_category(&f).await;

        assert!(f.service.get_category(f.alice, shared.id).await.is_ok());
        assert!(matches!(
            f.service
                .update_category(
                    f.alice,
                    shared.id,
                    UpdateCategoryRequest {
                        name: Some("Mine now".to_string()),
                        ..UpdateCategoryRequest::default()
                    },
                )
                .await,
            Err(CategoryError::CannotModifyDefault)
        ));
        assert!(matches!(
            f.service.delete_category(f.bob, shared.id).await,
            Err(CategoryError::CannotModifyDefault)
        ));

        let unchanged = f.service.get_category(f.bob, shared.id).await.unwrap();
        assert_eq!(unchanged.name, shared.name);
    }

    #[tokio::test]
    async fn test_partial_update_keeps_other_fields() {
        let f = setup().await;
        let created = f.service.create_category(f.alice, request("Coffee")).await.unwrap();

        let updated = f
            .service
            .update_category(
                f.alice,
                created.id,
                UpdateCategoryRequest {
                    name: Some("Tea".to_string()),
                    ..UpdateCategoryRequest::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "Tea");
        assert_eq!(updated.description, created.description);
        assert_eq!(updated.color, created.color);
        assert_eq!(updated.icon, created.icon);

        let cleared = f
            .service
            .update_category(
                f.alice,
                created.id,
                UpdateCategoryRequest {
                    description: Some(String::new()),
                    ..UpdateCategoryRequest::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(cleared.description, None);
        assert_eq!(cleared.name, "Tea");
    }

    #[tokio::test]
    async fn test_delete_in_use_category_conflicts() {
        let f = setup().await;
        let created = f.service.create_category(f.alice, request("Coffee")).await.unwrap();

        sqlx::query(
            r#"
            INSERT INTO expenses (amount_cents, description, date, category_id, user_id, created_at, updated_at)
            VALUES (350, 'Flat white', '2024-03-01', ?, ?, '2024-03-01T00:00:00Z', '2024-03-01T00:00:00Z')
            "#,
        )
        .bind(created.id)
        .bind(f.alice)
        .execute(&f.pool)
        .await
        .unwrap();

        let (_, stats) = f.service.category_stats(f.alice, created.id).await.unwrap();
        assert_eq!(stats.expense_count, 1);

        assert!(matches!(
            f.service.delete_category(f.alice, created.id).await,
            Err(CategoryError::CategoryInUse)
        ));
        assert!(f.service.get_category(f.alice, created.id).await.is_ok());

        let empty = f.service.create_category(f.alice, request("Empty")).await.unwrap();
        f.service.delete_category(f.alice, empty.id).await.unwrap();
        assert!(matches!(
            f.service.get_category(f.alice, empty.id).await,
            Err(CategoryError::CategoryNotFound)
        ));
    }
}
