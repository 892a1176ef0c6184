use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use sqlx::types::Json;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};

use super::RepositoryError;
use crate::models::expense::{CategorySummary, Expense, NewExpense};
use crate::models::filters::{
    ExpenseFilter, ExpensePage, ExpenseQuery, ExpenseTotals, SortBy, SortOrder,
};

const SELECT_EXPENSE: &str = r#"
    SELECT e.id, e.amount_cents, e.description, e.date, e.category_id, e.user_id,
           e.receipt_filename, e.tags, e.notes, e.created_at, e.updated_at,
           c.name AS category_name, c.color AS category_color, c.icon AS category_icon
    FROM expenses e
    LEFT JOIN categories c ON c.id = e.category_id
"#;

/// Category must be shared or belong to the expense owner; binds category id then owner id
const VISIBLE_CATEGORY: &str =
    "EXISTS (SELECT 1 FROM categories WHERE id = ? AND (user_id IS NULL OR user_id = ?))";

#[derive(sqlx::FromRow)]
struct ExpenseRow {
    id: i64,
    amount_cents: i64,
    description: String,
    date: NaiveDate,
    category_id: i64,
    user_id: i64,
    receipt_filename: Option<String>,
    tags: Json<Vec<String>>,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    category_name: Option<String>,
    category_color: Option<String>,
    category_icon: Option<String>,
}

impl From<ExpenseRow> for Expense {
    fn from(row: ExpenseRow) -> Self {
        let category = match (row.category_name, row.category_color, row.category_icon) {
            (Some(name), Some(color), Some(icon)) => Some(CategorySummary {
                id: row.category_id,
                name,
                color,
                icon,
            }),
            _ => None,
        };

        Expense {
            id: row.id,
            amount: Decimal::new(row.amount_cents, 2),
            description: row.description,
            date: row.date,
            category_id: row.category_id,
            user_id: row.user_id,
            receipt_filename: row.receipt_filename,
            tags: row.tags.0,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
            category,
        }
    }
}

fn to_cents(amount: Decimal) -> Result<i64, RepositoryError> {
    (amount.round_dp(2) * Decimal::ONE_HUNDRED)
        .to_i64()
        .ok_or_else(|| RepositoryError::ConstraintViolation(format!("Amount {} out of range", amount)))
}

fn cents_to_amount(cents: i64) -> Decimal {
    Decimal::new(cents, 2)
}

fn sort_column(sort_by: SortBy) -> &'static str {
    match sort_by {
        SortBy::Date => "e.date",
        SortBy::Amount => "e.amount_cents",
        SortBy::Description => "e.description COLLATE NOCASE",
        SortBy::CreatedAt => "e.created_at",
    }
}

fn sort_direction(sort_order: SortOrder) -> &'static str {
    match sort_order {
        SortOrder::Asc => "ASC",
        SortOrder::Desc => "DESC",
    }
}

/// Append the WHERE conditions selecting the owner's expenses that match `filter`.
///
/// Both the totals statement and the page statement are built through this
/// function, so count, sum and rows always describe the same set.
fn push_predicate(builder: &mut QueryBuilder<'_, Sqlite>, owner_id: i64, filter: &ExpenseFilter) {
    builder.push(" WHERE e.user_id = ").push_bind(owner_id);

    if let Some(category_id) = filter.category_id {
        builder.push(" AND e.category_id = ").push_bind(category_id);
    }
    if let Some(start_date) = filter.start_date {
        builder.push(" AND e.date >= ").push_bind(start_date);
    }
    if let Some(end_date) = filter.end_date {
        builder.push(" AND e.date <= ").push_bind(end_date);
    }
    if let Some(search) = &filter.search {
        builder
            .push(" AND (instr(lower(e.description), lower(")
            .push_bind(search.clone())
            .push(")) > 0 OR instr(lower(coalesce(e.notes, '')), lower(")
            .push_bind(search.clone())
            .push(")) > 0)");
    }
}

async fn fetch_totals(
    conn: &mut SqliteConnection,
    owner_id: i64,
    filter: &ExpenseFilter,
) -> Result<ExpenseTotals, RepositoryError> {
    let mut builder = QueryBuilder::<Sqlite>::new(
        "SELECT COUNT(*), COALESCE(SUM(e.amount_cents), 0) FROM expenses e",
    );
    push_predicate(&mut builder, owner_id, filter);

    let (count, total_cents) = builder
        .build_query_as::<(i64, i64)>()
        .fetch_one(conn)
        .await?;

    Ok(ExpenseTotals {
        count: count.max(0) as u64,
        amount: cents_to_amount(total_cents),
    })
}

async fn fetch_by_id(conn: &mut SqliteConnection, id: i64) -> Result<Option<Expense>, RepositoryError> {
    let row = sqlx::query_as::<_, ExpenseRow>(&format!("{SELECT_EXPENSE} WHERE e.id = ?"))
        .bind(id)
        .fetch_optional(conn)
        .await?;

    Ok(row.map(Expense::from))
}

/// Trait defining expense repository operations
#[async_trait]
pub trait ExpenseRepository: Send + Sync {
    /// Insert an expense.
    ///
    /// Returns `None` without writing when the category is not visible to the owner.
    async fn create(&self, expense: NewExpense) -> Result<Option<Expense>, RepositoryError>;

    /// Find an expense by ID regardless of owner, hydrated with its category
    async fn find_by_id(&self, id: i64) -> Result<Option<Expense>, RepositoryError>;

    /// Replace every mutable field of the owner's expense and refresh `updated_at`.
    ///
    /// Returns `None` without writing when the expense does not belong to
    /// `expense.user_id` or the category is not visible to them.
    async fn update(&self, id: i64, expense: NewExpense) -> Result<Option<Expense>, RepositoryError>;

    /// Delete the owner's expense; `false` when nothing matched
    async fn delete(&self, id: i64, owner_id: i64) -> Result<bool, RepositoryError>;

    /// One page of the owner's matching expenses plus totals over all of them
    async fn query(&self, owner_id: i64, query: &ExpenseQuery) -> Result<ExpensePage, RepositoryError>;

    /// Count and sum of the owner's expenses matching `filter`
    async fn summarize(
        &self,
        owner_id: i64,
        filter: &ExpenseFilter,
    ) -> Result<ExpenseTotals, RepositoryError>;
}

/// SQLite implementation of ExpenseRepository
pub struct SqliteExpenseRepository {
    pool: SqlitePool,
}

impl SqliteExpenseRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ExpenseRepository for SqliteExpenseRepository {
    async fn create(&self, expense: NewExpense) -> Result<Option<Expense>, RepositoryError> {
        let amount_cents = to_cents(expense.amount)?;
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let id: Option<i64> = sqlx::query_scalar(&format!(
            r#"
            INSERT INTO expenses (
                amount_cents, description, date, category_id, user_id,
                receipt_filename, tags, notes, created_at, updated_at
            )
            SELECT ?, ?, ?, ?, ?, ?, ?, ?, ?, ?
            WHERE {VISIBLE_CATEGORY}
            RETURNING id
            "#
        ))
        .bind(amount_cents)
        .bind(&expense.description)
        .bind(expense.date)
        .bind(expense.category_id)
        .bind(expense.user_id)
        .bind(&expense.receipt_filename)
        .bind(Json(&expense.tags))
        .bind(&expense.notes)
        .bind(now)
        .bind(now)
        .bind(expense.category_id)
        .bind(expense.user_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(id) = id else {
            return Ok(None);
        };

        let created = fetch_by_id(&mut tx, id).await?;
        tx.commit().await?;

        tracing::debug!(expense_id = id, user_id = expense.user_id, "Expense created");
        Ok(created)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Expense>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        fetch_by_id(&mut conn, id).await
    }

    async fn update(&self, id: i64, expense: NewExpense) -> Result<Option<Expense>, RepositoryError> {
        let amount_cents = to_cents(expense.amount)?;
        let mut tx = self.pool.begin().await?;

        let updated: Option<i64> = sqlx::query_scalar(&format!(
            r#"
            UPDATE expenses
            SET amount_cents = ?, description = ?, date = ?, category_id = ?,
                receipt_filename = ?, tags = ?, notes = ?, updated_at = ?
            WHERE id = ? AND user_id = ? AND {VISIBLE_CATEGORY}
            RETURNING id
            "#
        ))
        .bind(amount_cents)
        .bind(&expense.description)
        .bind(expense.date)
        .bind(expense.category_id)
        .bind(&expense.receipt_filename)
        .bind(Json(&expense.tags))
        .bind(&expense.notes)
        .bind(Utc::now())
        .bind(id)
        .bind(expense.user_id)
        .bind(expense.category_id)
        .bind(expense.user_id)
        .fetch_optional(&mut *tx)
        .await?;

        if updated.is_none() {
            return Ok(None);
        }

        let expense = fetch_by_id(&mut tx, id).await?;
        tx.commit().await?;
        Ok(expense)
    }

    async fn delete(&self, id: i64, owner_id: i64) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM expenses WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(owner_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn query(&self, owner_id: i64, query: &ExpenseQuery) -> Result<ExpensePage, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let totals = fetch_totals(&mut tx, owner_id, &query.filter).await?;

        let mut builder = QueryBuilder::<Sqlite>::new(SELECT_EXPENSE);
        push_predicate(&mut builder, owner_id, &query.filter);
        builder
            .push(" ORDER BY ")
            .push(sort_column(query.sort_by))
            .push(" ")
            .push(sort_direction(query.sort_order))
            .push(", e.id ASC LIMIT ")
            .push_bind(i64::from(query.limit))
            .push(" OFFSET ")
            .push_bind(query.offset() as i64);

        let rows = builder
            .build_query_as::<ExpenseRow>()
            .fetch_all(&mut *tx)
            .await?;
        tx.commit().await?;

        tracing::debug!(
            user_id = owner_id,
            total_count = totals.count,
            returned = rows.len(),
            "Expense query executed"
        );

        Ok(ExpensePage {
            items: rows.into_iter().map(Expense::from).collect(),
            totals,
            page: query.page,
            limit: query.limit,
        })
    }

    async fn summarize(
        &self,
        owner_id: i64,
        filter: &ExpenseFilter,
    ) -> Result<ExpenseTotals, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        fetch_totals(&mut conn, owner_id, filter).await
    }
}
