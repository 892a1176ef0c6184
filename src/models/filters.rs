use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::{ValidationError, ValidationErrors};

use super::expense::Expense;

pub const DEFAULT_PAGE_LIMIT: u32 = 20;
pub const MAX_PAGE_LIMIT: u32 = 100;
pub const MAX_SEARCH_LENGTH: usize = 100;

/// Column an expense listing is ordered by
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SortBy {
    #[default]
    Date,
    Amount,
    Description,
    CreatedAt,
}

impl SortBy {
    fn parse(value: &str) -> Option<Self> {
        match value {
            "date" => Some(SortBy::Date),
            "amount" => Some(SortBy::Amount),
            "description" => Some(SortBy::Description),
            "created_at" | "createdAt" => Some(SortBy::CreatedAt),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "asc" => Some(SortOrder::Asc),
            "desc" => Some(SortOrder::Desc),
            _ => None,
        }
    }
}

/// Row-selection part of an expense query; paging and ordering excluded
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpenseFilter {
    pub category_id: Option<i64>,
    /// Inclusive lower bound
    pub start_date: Option<NaiveDate>,
    /// Inclusive upper bound
    pub end_date: Option<NaiveDate>,
    /// Case-insensitive substring matched against description or notes
    pub search: Option<String>,
}

/// A validated expense listing request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpenseQuery {
    pub filter: ExpenseFilter,
    pub page: u32,
    pub limit: u32,
    pub sort_by: SortBy,
    pub sort_order: SortOrder,
}

impl Default for ExpenseQuery {
    fn default() -> Self {
        Self {
            filter: ExpenseFilter::default(),
            page: 1,
            limit: DEFAULT_PAGE_LIMIT,
            sort_by: SortBy::default(),
            sort_order: SortOrder::default(),
        }
    }
}

impl ExpenseQuery {
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.limit)
    }
}

/// Raw query-string parameters of the expense listing.
///
/// Every value is kept as text so that [ExpenseQueryParams::parse] can report
/// all invalid fields at once instead of failing on the first.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ExpenseQueryParams {
    /// Restrict to one category
    #[serde(alias = "categoryId")]
    #[param(value_type = Option<i64>)]
    pub category_id: Option<String>,
    /// Inclusive lower date bound (YYYY-MM-DD)
    #[serde(alias = "startDate")]
    #[param(value_type = Option<String>, format = Date)]
    pub start_date: Option<String>,
    /// Inclusive upper date bound (YYYY-MM-DD)
    #[serde(alias = "endDate")]
    #[param(value_type = Option<String>, format = Date)]
    pub end_date: Option<String>,
    /// Substring searched in description and notes
    pub search: Option<String>,
    /// Page number, starting at 1
    #[param(value_type = Option<u32>)]
    pub page: Option<String>,
    /// Page size, 1 to 100
    #[param(value_type = Option<u32>)]
    pub limit: Option<String>,
    /// One of date, amount, description, created_at
    #[serde(alias = "sortBy")]
    pub sort_by: Option<String>,
    /// asc or desc
    #[serde(alias = "sortOrder")]
    pub sort_order: Option<String>,
}

fn invalid(code: &'static str, message: String) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(message.into());
    error
}

/// Blank query values are treated as absent
fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()
}

impl ExpenseQueryParams {
    /// Validate the parameters, collecting an error for every invalid field
    pub fn parse(&self) -> Result<ExpenseQuery, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let mut query = ExpenseQuery::default();

        if let Some(raw) = present(&self.category_id) {
            match raw.parse::<i64>() {
                Ok(id) if id > 0 => query.filter.category_id = Some(id),
                _ => errors.add(
                    "category_id",
                    invalid("invalid_id", format!("'{}' is not a positive integer", raw)),
                ),
            }
        }

        if let Some(raw) = present(&self.start_date) {
            match parse_date(raw) {
                Some(date) => query.filter.start_date = Some(date),
                None => errors.add(
                    "start_date",
                    invalid("invalid_date", format!("'{}' is not an ISO date", raw)),
                ),
            }
        }

        if let Some(raw) = present(&self.end_date) {
            match parse_date(raw) {
                Some(date) => query.filter.end_date = Some(date),
                None => errors.add(
                    "end_date",
                    invalid("invalid_date", format!("'{}' is not an ISO date", raw)),
                ),
            }
        }

        if let (Some(start), Some(end)) = (query.filter.start_date, query.filter.end_date) {
            if start > end {
                errors.add(
                    "end_date",
                    invalid(
                        "invalid_range",
                        "End date must not be before start date".to_string(),
                    ),
                );
            }
        }

        if let Some(search) = present(&self.search) {
            if search.chars().count() > MAX_SEARCH_LENGTH {
                errors.add(
                    "search",
                    invalid(
                        "too_long",
                        format!("Search cannot exceed {} characters", MAX_SEARCH_LENGTH),
                    ),
                );
            } else {
                query.filter.search = Some(search.to_string());
            }
        }

        if let Some(raw) = present(&self.page) {
            match raw.parse::<u32>() {
                Ok(page) if page >= 1 => query.page = page,
                _ => errors.add(
                    "page",
                    invalid("invalid_page", "Page must be an integer of at least 1".to_string()),
                ),
            }
        }

        if let Some(raw) = present(&self.limit) {
            match raw.parse::<u32>() {
                Ok(limit) if (1..=MAX_PAGE_LIMIT).contains(&limit) => query.limit = limit,
                _ => errors.add(
                    "limit",
                    invalid(
                        "invalid_limit",
                        format!("Limit must be an integer between 1 and {}", MAX_PAGE_LIMIT),
                    ),
                ),
            }
        }

        if let Some(raw) = present(&self.sort_by) {
            match SortBy::parse(raw) {
                Some(sort_by) => query.sort_by = sort_by,
                None => errors.add(
                    "sort_by",
                    invalid(
                        "invalid_sort_by",
                        "Sort by must be one of date, amount, description, created_at".to_string(),
                    ),
                ),
            }
        }

        if let Some(raw) = present(&self.sort_order) {
            match SortOrder::parse(raw) {
                Some(sort_order) => query.sort_order = sort_order,
                None => errors.add(
                    "sort_order",
                    invalid("invalid_sort_order", "Sort order must be asc or desc".to_string()),
                ),
            }
        }

        if errors.is_empty() {
            Ok(query)
        } else {
            Err(errors)
        }
    }
}

/// Number and sum of the expenses matching a filter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExpenseTotals {
    pub count: u64,
    pub amount: Decimal,
}

impl ExpenseTotals {
    /// Mean amount rounded to cents, zero when nothing matched
    pub fn average_amount(&self) -> Decimal {
        if self.count == 0 {
            return Decimal::ZERO;
        }
        (self.amount / Decimal::from(self.count))
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
    }
}

/// One page of an expense listing plus the totals over all matching rows
#[derive(Debug, Clone, PartialEq)]
pub struct ExpensePage {
    pub items: Vec<Expense>,
    pub totals: ExpenseTotals,
    pub page: u32,
    pub limit: u32,
}

impl ExpensePage {
    pub fn total_pages(&self) -> u64 {
        self.totals.count.div_ceil(u64::from(self.limit))
    }

    pub fn has_next(&self) -> bool {
        u64::from(self.page) < self.total_pages()
    }

    pub fn has_prev(&self) -> bool {
        self.page > 1
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total_count: u64,
    pub total_pages: u64,
    pub has_next: bool,
    pub has_prev: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseSummary {
    pub total_expenses: u64,
    #[schema(value_type = String)]
    pub total_amount: Decimal,
    #[schema(value_type = String)]
    pub average_amount: Decimal,
}

impl From<ExpenseTotals> for ExpenseSummary {
    fn from(totals: ExpenseTotals) -> Self {
        Self {
            total_expenses: totals.count,
            total_amount: totals.amount,
            average_amount: totals.average_amount(),
        }
    }
}

/// Response body of the expense listing
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ExpenseListResponse {
    pub expenses: Vec<Expense>,
    pub pagination: Pagination,
    pub summary: ExpenseSummary,
}

impl From<ExpensePage> for ExpenseListResponse {
    fn from(page: ExpensePage) -> Self {
        let pagination = Pagination {
            page: page.page,
            limit: page.limit,
            total_count: page.totals.count,
            total_pages: page.total_pages(),
            has_next: page.has_next(),
            has_prev: page.has_prev(),
        };

        Self {
            expenses: page.items,
            pagination,
            summary: page.totals.into(),
        }
    }
}
