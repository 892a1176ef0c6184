use async_trait::async_trait;
use std::sync::Arc;

use crate::models::expense::{CreateExpenseRequest, Expense, NewExpense, UpdateExpenseRequest};
use crate::models::filters::{ExpenseFilter, ExpensePage, ExpenseQuery, ExpenseTotals};
use crate::repositories::{ExpenseRepository, RepositoryError};
use crate::services::ownership::{self, AccessError};
use crate::validation::{normalize_optional, normalize_tags};

/// Expense service errors
#[derive(Debug, thiserror::Error)]
pub enum ExpenseError {
    #[error("Expense not found")]
    ExpenseNotFound,

    #[error("Category not found or not available")]
    InvalidCategory,

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<RepositoryError> for ExpenseError {
    fn from(error: RepositoryError) -> Self {
        match error {
            RepositoryError::NotFound => ExpenseError::ExpenseNotFound,
            RepositoryError::DatabaseError(msg) => ExpenseError::DatabaseError(msg),
            RepositoryError::ConstraintViolation(msg) => ExpenseError::DatabaseError(msg),
        }
    }
}

impl From<AccessError> for ExpenseError {
    fn from(_: AccessError) -> Self {
        ExpenseError::ExpenseNotFound
    }
}

/// Trait defining expense service operations
#[async_trait]
pub trait ExpenseService: Send + Sync {
    /// One page of the user's expenses matching the query
    async fn list_expenses(
        &self,
        user_id: i64,
        query: ExpenseQuery,
    ) -> Result<ExpensePage, ExpenseError>;

    /// Count and sum of the user's expenses matching the filter
    async fn summarize_expenses(
        &self,
        user_id: i64,
        filter: ExpenseFilter,
    ) -> Result<ExpenseTotals, ExpenseError>;

    /// A single expense owned by the user
    async fn get_expense(&self, user_id: i64, id: i64) -> Result<Expense, ExpenseError>;

    /// Record a new expense for the user
    async fn create_expense(
        &self,
        user_id: i64,
        request: CreateExpenseRequest,
    ) -> Result<Expense, ExpenseError>;

    /// Apply the present fields of `request` to one of the user's expenses
    async fn update_expense(
        &self,
        user_id: i64,
        id: i64,
        request: UpdateExpenseRequest,
    ) -> Result<Expense, ExpenseError>;

    /// Delete one of the user's expenses
    async fn delete_expense(&self, user_id: i64, id: i64) -> Result<(), ExpenseError>;
}

/// Implementation of ExpenseService
pub struct ExpenseServiceImpl {
    expense_repository: Arc<dyn ExpenseRepository>,
}

impl ExpenseServiceImpl {
    pub fn new(expense_repository: Arc<dyn ExpenseRepository>) -> Self {
        Self { expense_repository }
    }
}

/// Overlay the present fields of `request` on `current`.
///
/// Empty `receiptFilename` or `notes` clear the stored value.
fn merge(current: Expense, request: UpdateExpenseRequest) -> NewExpense {
    NewExpense {
        user_id: current.user_id,
        amount: request.amount.unwrap_or(current.amount),
        description: request
            .description
            .map(|d| d.trim().to_string())
            .unwrap_or(current.description),
        date: request.date.unwrap_or(current.date),
        category_id: request.category_id.unwrap_or(current.category_id),
        receipt_filename: match request.receipt_filename {
            Some(filename) => normalize_optional(Some(filename)),
            None => current.receipt_filename,
        },
        tags: request.tags.map(normalize_tags).unwrap_or(current.tags),
        notes: match request.notes {
            Some(notes) => normalize_optional(Some(notes)),
            None => current.notes,
        },
    }
}

#[async_trait]
impl ExpenseService for ExpenseServiceImpl {
    async fn list_expenses(
        &self,
        user_id: i64,
        query: ExpenseQuery,
    ) -> Result<ExpensePage, ExpenseError> {
        Ok(self.expense_repository.query(user_id, &query).await?)
    }

    async fn summarize_expenses(
        &self,
        user_id: i64,
        filter: ExpenseFilter,
    ) -> Result<ExpenseTotals, ExpenseError> {
        Ok(self.expense_repository.summarize(user_id, &filter).await?)
    }

    async fn get_expense(&self, user_id: i64, id: i64) -> Result<Expense, ExpenseError> {
        let expense = self.expense_repository.find_by_id(id).await?;
        Ok(ownership::owned_expense(expense, user_id)?)
    }

    async fn create_expense(
        &self,
        user_id: i64,
        request: CreateExpenseRequest,
    ) -> Result<Expense, ExpenseError> {
        let expense = NewExpense {
            user_id,
            amount: request.amount,
            description: request.description.trim().to_string(),
            date: request.date,
            category_id: request.category_id,
            receipt_filename: normalize_optional(request.receipt_filename),
            tags: normalize_tags(request.tags),
            notes: normalize_optional(request.notes),
        };

        self.expense_repository
            .create(expense)
            .await?
            .ok_or(ExpenseError::InvalidCategory)
    }

    async fn update_expense(
        &self,
        user_id: i64,
        id: i64,
        request: UpdateExpenseRequest,
    ) -> Result<Expense, ExpenseError> {
        let current = self.get_expense(user_id, id).await?;
        let merged = merge(current, request);

        if let Some(updated) = self.expense_repository.update(id, merged).await? {
            return Ok(updated);
        }

        // nothing written: either the expense vanished meanwhile or the category is not usable
        match self.expense_repository.find_by_id(id).await? {
            Some(expense) if expense.user_id == user_id => Err(ExpenseError::InvalidCategory),
            _ => Err(ExpenseError::ExpenseNotFound),
        }
    }

    async fn delete_expense(&self, user_id: i64, id: i64) -> Result<(), ExpenseError> {
        if !self.expense_repository.delete(id, user_id).await? {
            return Err(ExpenseError::ExpenseNotFound);
        }

        tracing::info!(expense_id = id, user_id, "Expense deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::models::category::CreateCategoryRequest;
    use crate::models::user::CreateUserRequest;
    use crate::repositories::{
        CategoryRepository, SqliteCategoryRepository, SqliteExpenseRepository,
        SqliteUserRepository, UserRepository,
    };
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    struct Fixture {
        service: ExpenseServiceImpl,
        alice: i64,
        bob: i64,
        food: i64,
        travel: i64,
        bobs_category: i64,
    }

    async fn setup() -> Fixture {
        let pool = db::connect_in_memory().await.unwrap();
        let users = SqliteUserRepository::new(pool.clone());
        let categories = SqliteCategoryRepository::new(pool.clone());

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

        categories.seed_defaults().await.unwrap();
        let shared = categories.find_for_user(ids[0], true).await.unwrap();
        let food = shared.iter().find(|c| c.name == "Food & Dining").unwrap().id;
        let travel = shared.iter().find(|c| c.name == "Travel").unwrap().id;
        let bobs_category = categories
            .create(
                ids[1],
                CreateCategoryRequest {
                    name: "Private".to_string(),
                    description: None,
                    color: "#000000".to_string(),
                    icon: "lock".to_string(),
                },
            )
            .await
            .unwrap()
            .id;

        Fixture {
            service: ExpenseServiceImpl::new(Arc::new(SqliteExpenseRepository::new(pool))),
            alice: ids[0],
            bob: ids[1],
            food,
            travel,
            bobs_category,
        }
    }

    fn lunch(category_id: i64) -> CreateExpenseRequest {
        CreateExpenseRequest {
            amount: Decimal::from_str("42.50").unwrap(),
            description: " Lunch ".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            category_id,
            receipt_filename: Some("receipt.jpg".to_string()),
            tags: vec![" work ".to_string(), "".to_string(), "team".to_string()],
            notes: Some("Team lunch".to_string()),
        }
    }

    #[tokio::test]
    async fn test_create_normalizes_fields() {
        let f = setup().await;

        let expense = f.service.create_expense(f.alice, lunch(f.food)).await.unwrap();

        assert_eq!(expense.description, "Lunch");
        assert_eq!(expense.tags, vec!["work", "team"]);
        assert_eq!(expense.user_id, f.alice);
        assert_eq!(expense.category.unwrap().id, f.food);
    }

    #[tokio::test]
    async fn test_create_with_invisible_category_fails() {
        let f = setup().await;

        let result = f.service.create_expense(f.alice, lunch(f.bobs_category)).await;
        assert!(matches!(result, Err(ExpenseError::InvalidCategory)));

        let result = f.service.create_expense(f.alice, lunch(9999)).await;
        assert!(matches!(result, Err(ExpenseError::InvalidCategory)));
    }

    #[tokio::test]
    async fn test_partial_update_preserves_untouched_fields() {
        let f = setup().await;
        let created = f.service.create_expense(f.alice, lunch(f.food)).await.unwrap();

        let updated = f
            .service
            .update_expense(
                f.alice,
                created.id,
                UpdateExpenseRequest {
                    amount: Some(Decimal::from_str("10").unwrap()),
                    ..UpdateExpenseRequest::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.amount, Decimal::from_str("10.00").unwrap());
        assert_eq!(updated.description, created.description);
        assert_eq!(updated.date, created.date);
        assert_eq!(updated.category_id, created.category_id);
        assert_eq!(updated.tags, created.tags);
        assert_eq!(updated.notes, created.notes);
        assert_eq!(updated.receipt_filename, created.receipt_filename);
    }

    #[tokio::test]
    async fn test_update_clears_optional_text_with_empty_string() {
        let f = setup().await;
        let created = f.service.create_expense(f.alice, lunch(f.food)).await.unwrap();

        let updated = f
            .service
            .update_expense(
                f.alice,
                created.id,
                UpdateExpenseRequest {
                    notes: Some(String::new()),
                    receipt_filename: Some("  ".to_string()),
                    category_id: Some(f.travel),
                    ..UpdateExpenseRequest::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.notes, None);
        assert_eq!(updated.receipt_filename, None);
        assert_eq!(updated.category.unwrap().name, "Travel");
        assert_eq!(updated.amount, created.amount);
    }

    #[tokio::test]
    async fn test_update_to_invisible_category_fails() {
        let f = setup().await;
        let created = f.service.create_expense(f.alice, lunch(f.food)).await.unwrap();

        let result = f
            .service
            .update_expense(
                f.alice,
                created.id,
                UpdateExpenseRequest {
                    category_id: Some(f.bobs_category),
                    ..UpdateExpenseRequest::default()
                },
            )
            .await;

        assert!(matches!(result, Err(ExpenseError::InvalidCategory)));
        let unchanged = f.service.get_expense(f.alice, created.id).await.unwrap();
        assert_eq!(unchanged.category_id, f.food);
    }

    #[tokio::test]
    async fn test_cross_user_access_is_not_found() {
        let f = setup().await;
        let created = f.service.create_expense(f.alice, lunch(f.food)).await.unwrap();

        assert!(matches!(
            f.service.get_expense(f.bob, created.id).await,
            Err(ExpenseError::ExpenseNotFound)
        ));
        assert!(matches!(
            f.service
                .update_expense(f.bob, created.id, UpdateExpenseRequest::default())
                .await,
            Err(ExpenseError::ExpenseNotFound)
        ));
        assert!(matches!(
            f.service.delete_expense(f.bob, created.id).await,
            Err(ExpenseError::ExpenseNotFound)
        ));

        let still_there = f.service.get_expense(f.alice, created.id).await.unwrap();
        assert_eq!(still_there, created);
    }

    #[tokio::test]
    async fn test_list_and_summarize_share_filter() {
        let f = setup().await;
        f.service.create_expense(f.alice, lunch(f.food)).await.unwrap();
        let mut train = lunch(f.travel);
        train.amount = Decimal::from_str("12.25").unwrap();
        train.description = "Train".to_string();
        f.service.create_expense(f.alice, train).await.unwrap();
        f.service.create_expense(f.bob, lunch(f.food)).await.unwrap();

        let filter = ExpenseFilter {
            category_id: Some(f.food),
            ..ExpenseFilter::default()
        };
        let page = f
            .service
            .list_expenses(
                f.alice,
                ExpenseQuery {
                    filter: filter.clone(),
                    ..ExpenseQuery::default()
                },
            )
            .await
            .unwrap();
        let totals = f.service.summarize_expenses(f.alice, filter).await.unwrap();

        assert_eq!(page.totals, totals);
        assert_eq!(totals.count, 1);
        assert_eq!(totals.amount, Decimal::from_str("42.50").unwrap());

        let everything = f
            .service
            .summarize_expenses(f.alice, ExpenseFilter::default())
            .await
            .unwrap();
        assert_eq!(everything.count, 2);
        assert_eq!(everything.amount, Decimal::from_str("54.75").unwrap());
    }

    #[tokio::test]
    async fn test_delete_own_expense() {
        let f = setup().await;
        let created = f.service.create_expense(f.alice, lunch(f.food)).await.unwrap();

        f.service.delete_expense(f.alice, created.id).await.unwrap();
        assert!(matches!(
            f.service.get_expense(f.alice, created.id).await,
            Err(ExpenseError::ExpenseNotFound)
        ));
        assert!(matches!(
            f.service.delete_expense(f.alice, created.id).await,
            Err(ExpenseError::ExpenseNotFound)
        ));
    }
}
