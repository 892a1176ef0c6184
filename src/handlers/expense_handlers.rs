use axum::{
    Json,
    extract::{
        Extension, Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use validator::Validate;

use super::{
    ErrorResponse, body_validation_error, internal_error, json_rejection, query_rejection,
    query_validation_error,
};
use crate::middleware::auth_middleware::AuthenticatedUser;
use crate::models::expense::{CreateExpenseRequest, Expense, UpdateExpenseRequest};
use crate::models::filters::{ExpenseListResponse, ExpenseQueryParams, ExpenseSummary};
use crate::services::expense_service::{ExpenseError, ExpenseService};

/// Convert ExpenseError to HTTP response
impl IntoResponse for ExpenseError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match self {
            ExpenseError::ExpenseNotFound => (
                StatusCode::NOT_FOUND,
                "expense_not_found",
                "Expense not found",
            ),
            ExpenseError::InvalidCategory => (
                StatusCode::BAD_REQUEST,
                "invalid_category",
                "Category not found or not available",
            ),
            ExpenseError::DatabaseError(ref msg) => return internal_error(msg),
        };

        ErrorResponse::new(error_type, message).into_response_with(status)
    }
}

/// Handler for listing expenses
///
/// Returns one page of the user's expenses matching the filters, with the
/// count and sum over every matching expense.
#[utoipa::path(
    get,
    path = "/api/expenses",
    params(ExpenseQueryParams),
    responses(
        (status = 200, description = "Page of expenses", body = ExpenseListResponse),
        (status = 400, description = "Invalid query parameters", body = ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "expenses"
)]
pub async fn list_expenses_handler(
    State(expense_service): State<Arc<dyn ExpenseService>>,
    Extension(auth_user): Extension<AuthenticatedUser>,
    params: Result<Query<ExpenseQueryParams>, QueryRejection>,
) -> Result<Json<ExpenseListResponse>, Response> {
    let Query(params) = params.map_err(query_rejection)?;
    let query = params.parse().map_err(|e| query_validation_error(&e))?;

    match expense_service.list_expenses(auth_user.user_id, query).await {
        Ok(page) => Ok(Json(page.into())),
        Err(e) => Err(e.into_response()),
    }
}

/// Handler for the expense summary
///
/// Count, total and average of the user's expenses matching the filters.
/// Paging and sorting parameters are validated but do not affect the result.
#[utoipa::path(
    get,
    path = "/api/expenses/summary",
    params(ExpenseQueryParams),
    responses(
        (status = 200, description = "Totals over matching expenses", body = ExpenseSummary),
        (status = 400, description = "Invalid query parameters", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "expenses"
)]
pub async fn expense_summary_handler(
    State(expense_service): State<Arc<dyn ExpenseService>>,
    Extension(auth_user): Extension<AuthenticatedUser>,
    params: Result<Query<ExpenseQueryParams>, QueryRejection>,
) -> Result<Json<ExpenseSummary>, Response> {
    let Query(params) = params.map_err(query_rejection)?;
    let query = params.parse().map_err(|e| query_validation_error(&e))?;

    match expense_service
        .summarize_expenses(auth_user.user_id, query.filter)
        .await
    {
        Ok(totals) => Ok(Json(totals.into())),
        Err(e) => Err(e.into_response()),
    }
}

/// Handler for fetching a single expense
#[utoipa::path(
    get,
    path = "/api/expenses/{id}",
    params(
        ("id" = i64, Path, description = "Expense ID")
    ),
    responses(
        (status = 200, description = "Expense", body = Expense),
        (status = 404, description = "Expense not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "expenses"
)]
pub async fn get_expense_handler(
    State(expense_service): State<Arc<dyn ExpenseService>>,
    Extension(auth_user): Extension<AuthenticatedUser>,
    Path(expense_id): Path<i64>,
) -> Result<Json<Expense>, Response> {
    match expense_service
        .get_expense(auth_user.user_id, expense_id)
        .await
    {
        Ok(expense) => Ok(Json(expense)),
        Err(e) => Err(e.into_response()),
    }
}

/// Handler for creating an expense
#[utoipa::path(
    post,
    path = "/api/expenses",
    request_body = CreateExpenseRequest,
    responses(
        (status = 201, description = "Expense created", body = Expense),
        (status = 400, description = "Validation error or unusable category", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "expenses"
)]
pub async fn create_expense_handler(
    State(expense_service): State<Arc<dyn ExpenseService>>,
    Extension(auth_user): Extension<AuthenticatedUser>,
    payload: Result<Json<CreateExpenseRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Expense>), Response> {
    let Json(request) = payload.map_err(json_rejection)?;
    request.validate().map_err(|e| body_validation_error(&e))?;

    match expense_service
        .create_expense(auth_user.user_id, request)
        .await
    {
        Ok(expense) => Ok((StatusCode::CREATED, Json(expense))),
        Err(e) => Err(e.into_response()),
    }
}

/// Handler for updating an expense
///
/// Absent fields keep their value; an empty `notes` or `receiptFilename` clears it.
#[utoipa::path(
    put,
    path = "/api/expenses/{id}",
    params(
        ("id" = i64, Path, description = "Expense ID")
    ),
    request_body = UpdateExpenseRequest,
    responses(
        (status = 200, description = "Expense updated", body = Expense),
        (status = 400, description = "Validation error or unusable category", body = ErrorResponse),
        (status = 404, description = "Expense not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "expenses"
)]
pub async fn update_expense_handler(
    State(expense_service): State<Arc<dyn ExpenseService>>,
    Extension(auth_user): Extension<AuthenticatedUser>,
    Path(expense_id): Path<i64>,
    payload: Result<Json<UpdateExpenseRequest>, JsonRejection>,
) -> Result<Json<Expense>, Response> {
    let Json(request) = payload.map_err(json_rejection)?;
    request.validate().map_err(|e| body_validation_error(&e))?;

    match expense_service
        .update_expense(auth_user.user_id, expense_id, request)
        .await
    {
        Ok(expense) => Ok(Json(expense)),
        Err(e) => Err(e.into_response()),
    }
}

/// Handler for deleting an expense
#[utoipa::path(
    delete,
    path = "/api/expenses/{id}",
    params(
        ("id" = i64, Path, description = "Expense ID")
    ),
    responses(
        (status = 204, description = "Expense deleted"),
        (status = 404, description = "Expense not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "expenses"
)]
pub async fn delete_expense_handler(
    State(expense_service): State<Arc<dyn ExpenseService>>,
    Extension(auth_user): Extension<AuthenticatedUser>,
    Path(expense_id): Path<i64>,
) -> Result<StatusCode, Response> {
    match expense_service
        .delete_expense(auth_user.user_id, expense_id)
        .await
    {
        Ok(()) => Ok(StatusCode::NO_CONTENT),
        Err(e) => Err(e.into_response()),
    }
}
