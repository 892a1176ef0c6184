//! Access decisions for expenses and categories.
//!
//! Anything the caller may not see is reported as [AccessError::NotFound],
//! whether or not it exists, so ids of other users' data cannot be probed.
//! [AccessError::ReadOnly] is reserved for shared categories, which every
//! caller can already see.

use crate::models::category::{Category, OwnedCategory};
use crate::models::expense::Expense;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AccessError {
    #[error("Resource not found")]
    NotFound,

    #[error("Resource is shared and cannot be modified")]
    ReadOnly,
}

/// The expense, if it exists and belongs to the caller
pub fn owned_expense(expense: Option<Expense>, caller_id: i64) -> Result<Expense, AccessError> {
    match expense {
        Some(expense) if expense.user_id == caller_id => Ok(expense),
        _ => Err(AccessError::NotFound),
    }
}

/// The category, if it exists and is shared or owned by the caller
pub fn visible_category(category: Option<Category>, caller_id: i64) -> Result<Category, AccessError> {
    match category {
        Some(category) if category.owner.is_visible_to(caller_id) => Ok(category),
        _ => Err(AccessError::NotFound),
    }
}

/// The category as an [OwnedCategory], if the caller may modify it
pub fn mutable_category(
    category: Option<Category>,
    caller_id: i64,
) -> Result<OwnedCategory, AccessError> {
    visible_category(category, caller_id)?
        .into_owned_by(caller_id)
        .map_err(|_| AccessError::ReadOnly)
}
