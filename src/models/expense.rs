use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::validation::{validate_amount, validate_not_blank, validate_tags};

/// Category fields embedded in every expense so clients need no second lookup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CategorySummary {
    pub id: i64,
    pub name: String,
    pub color: String,
    pub icon: String,
}

/// Expense entity representing a single spending record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    pub id: i64,
    #[schema(value_type = String, example = "42.50")]
    pub amount: Decimal,
    pub description: String,
    #[schema(example = "2024-03-01")]
    pub date: NaiveDate,
    pub category_id: i64,
    pub user_id: i64,
    pub receipt_filename: Option<String>,
    pub tags: Vec<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub category: Option<CategorySummary>,
}

/// Field values for an expense about to be inserted
#[derive(Debug, Clone, PartialEq)]
pub struct NewExpense {
    pub user_id: i64,
    pub amount: Decimal,
    pub description: String,
    pub date: NaiveDate,
    pub category_id: i64,
    pub receipt_filename: Option<String>,
    pub tags: Vec<String>,
    pub notes: Option<String>,
}

/// Request payload for creating an expense
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
#[schema(example = json!({
    "amount": 42.50,
    "description": "Lunch",
    "date": "2024-03-01",
    "categoryId": 1,
    "tags": ["work"],
    "notes": "Team lunch"
}))]
pub struct CreateExpenseRequest {
    #[validate(custom(function = "validate_amount"))]
    #[schema(value_type = f64, minimum = 0.01, maximum = 999999.99)]
    pub amount: Decimal,

    #[validate(
        length(max = 255, message = "Description cannot exceed 255 characters"),
        custom(function = "validate_not_blank")
    )]
    pub description: String,

    pub date: NaiveDate,

    #[validate(range(min = 1, message = "Category id must be a positive integer"))]
    pub category_id: i64,

    #[validate(length(max = 255, message = "Receipt filename cannot exceed 255 characters"))]
    pub receipt_filename: Option<String>,

    #[serde(default)]
    #[validate(custom(function = "validate_tags"))]
    pub tags: Vec<String>,

    #[validate(length(max = 1000, message = "Notes cannot exceed 1000 characters"))]
    pub notes: Option<String>,
}

/// Request payload for updating an expense.
///
/// Absent fields keep their current value; an empty string clears
/// `receiptFilename` or `notes`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
#[schema(example = json!({ "amount": 10.00 }))]
pub struct UpdateExpenseRequest {
    #[validate(custom(function = "validate_amount"))]
    #[schema(value_type = Option<f64>, minimum = 0.01, maximum = 999999.99)]
    pub amount: Option<Decimal>,

    #[validate(
        length(max = 255, message = "Description cannot exceed 255 characters"),
        custom(function = "validate_not_blank")
    )]
    pub description: Option<String>,

    pub date: Option<NaiveDate>,

    #[validate(range(min = 1, message = "Category id must be a positive integer"))]
    pub category_id: Option<i64>,

    #[validate(length(max = 255, message = "Receipt filename cannot exceed 255 characters"))]
    pub receipt_filename: Option<String>,

    #[validate(custom(function = "validate_tags"))]
    pub tags: Option<Vec<String>>,

    #[validate(length(max = 1000, message = "Notes cannot exceed 1000 characters"))]
    pub notes: Option<String>,
}
