use axum::{
    Json,
    extract::{
        Extension, Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use std::sync::Arc;
use utoipa::IntoParams;
use validator::Validate;

use super::{ErrorResponse, body_validation_error, internal_error, json_rejection, query_rejection};
use crate::middleware::auth_middleware::AuthenticatedUser;
use crate::models::category::{
    CategoryListResponse, CategoryResponse, CategoryStatsResponse, CreateCategoryRequest,
    UpdateCategoryRequest,
};
use crate::services::category_service::{CategoryError, CategoryService};

/// Convert CategoryError to HTTP response
impl IntoResponse for CategoryError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match self {
            CategoryError::CategoryNotFound => (
                StatusCode::NOT_FOUND,
                "category_not_found",
                "Category not found",
            ),
            CategoryError::CannotModifyDefault => (
                StatusCode::FORBIDDEN,
                "default_category",
                "Default categories cannot be modified",
            ),
            CategoryError::CategoryInUse => (
                StatusCode::CONFLICT,
                "category_in_use",
                "Category has expenses and cannot be deleted",
            ),
            CategoryError::DatabaseError(ref msg) => return internal_error(msg),
        };

        ErrorResponse::new(error_type, message).into_response_with(status)
    }
}

#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CategoryListParams {
    /// Include the shared default categories (default true)
    #[serde(default = "default_true", alias = "includeDefaults")]
    pub include_defaults: bool,
}

fn default_true() -> bool {
    true
}

/// Handler for listing categories
///
/// Returns the shared default categories first, then the user's own, by name.
#[utoipa::path(
    get,
    path = "/api/categories",
    params(CategoryListParams),
    responses(
        (status = 200, description = "Categories available to the user", body = CategoryListResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "categories"
)]
pub async fn list_categories_handler(
    State(category_service): State<Arc<dyn CategoryService>>,
    Extension(auth_user): Extension<AuthenticatedUser>,
    params: Result<Query<CategoryListParams>, QueryRejection>,
) -> Result<Json<CategoryListResponse>, Response> {
    let Query(params) = params.map_err(query_rejection)?;

    match category_service
        .list_categories(auth_user.user_id, params.include_defaults)
        .await
    {
        Ok(categories) => Ok(Json(CategoryListResponse {
            categories: categories.into_iter().map(CategoryResponse::from).collect(),
        })),
        Err(e) => Err(e.into_response()),
    }
}

/// Handler for fetching a single category
#[utoipa::path(
    get,
    path = "/api/categories/{id}",
    params(
        ("id" = i64, Path, description = "Category ID")
    ),
    responses(
        (status = 200, description = "Category", body = CategoryResponse),
        (status = 404, description = "Category not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "categories"
)]
pub async fn get_category_handler(
    State(category_service): State<Arc<dyn CategoryService>>,
    Extension(auth_user): Extension<AuthenticatedUser>,
    Path(category_id): Path<i64>,
) -> Result<Json<CategoryResponse>, Response> {
    match category_service
        .get_category(auth_user.user_id, category_id)
        .await
    {
        Ok(category) => Ok(Json(category.into())),
        Err(e) => Err(e.into_response()),
    }
}

/// Handler for category usage statistics
#[utoipa::path(
    get,
    path = "/api/categories/{id}/stats",
    params(
        ("id" = i64, Path, description = "Category ID")
    ),
    responses(
        (status = 200, description = "Category with expense count", body = CategoryStatsResponse),
        (status = 404, description = "Category not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "categories"
)]
pub async fn category_stats_handler(
    State(category_service): State<Arc<dyn CategoryService>>,
    Extension(auth_user): Extension<AuthenticatedUser>,
    Path(category_id): Path<i64>,
) -> Result<Json<CategoryStatsResponse>, Response> {
    match category_service
        .category_stats(auth_user.user_id, category_id)
        .await
    {
        Ok((category, stats)) => Ok(Json(CategoryStatsResponse {
            category: category.into(),
            stats,
        })),
        Err(e) => Err(e.into_response()),
    }
}

/// Handler for creating a category
#[utoipa::path(
    post,
    path = "/api/categories",
    request_body = CreateCategoryRequest,
    responses(
        (status = 201, description = "Category created", body = CategoryResponse),
        (status = 400, description = "Validation error", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "categories"
)]
pub async fn create_category_handler(
    State(category_service): State<Arc<dyn CategoryService>>,
    Extension(auth_user): Extension<AuthenticatedUser>,
    payload: Result<Json<CreateCategoryRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CategoryResponse>), Response> {
    let Json(request) = payload.map_err(json_rejection)?;
    request.validate().map_err(|e| body_validation_error(&e))?;

    match category_service
        .create_category(auth_user.user_id, request)
        .await
    {
        Ok(category) => Ok((StatusCode::CREATED, Json(category.into()))),
        Err(e) => Err(e.into_response()),
    }
}

/// Handler for updating a category
///
/// Only the caller's own categories can be updated; absent fields are kept.
#[utoipa::path(
    put,
    path = "/api/categories/{id}",
    params(
        ("id" = i64, Path, description = "Category ID")
    ),
    request_body = UpdateCategoryRequest,
    responses(
        (status = 200, description = "Category updated", body = CategoryResponse),
        (status = 400, description = "Validation error", body = ErrorResponse),
        (status = 403, description = "Default categories are read-only", body = ErrorResponse),
        (status = 404, description = "Category not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "categories"
)]
pub async fn update_category_handler(
    State(category_service): State<Arc<dyn CategoryService>>,
    Extension(auth_user): Extension<AuthenticatedUser>,
    Path(category_id): Path<i64>,
    payload: Result<Json<UpdateCategoryRequest>, JsonRejection>,
) -> Result<Json<CategoryResponse>, Response> {
    let Json(request) = payload.map_err(json_rejection)?;
    request.validate().map_err(|e| body_validation_error(&e))?;

    match category_service
        .update_category(auth_user.user_id, category_id, request)
        .await
    {
        Ok(category) => Ok(Json(category.into())),
        Err(e) => Err(e.into_response()),
    }
}

/// Handler for deleting a category
///
/// Fails with 409 while any expense still uses the category.
#[utoipa::path(
    delete,
    path = "/api/categories/{id}",
    params(
        ("id" = i64, Path, description = "Category ID")
    ),
    responses(
        (status = 204, description = "Category deleted"),
        (status = 403, description = "Default categories are read-only", body = ErrorResponse),
        (status = 404, description = "Category not found", body = ErrorResponse),
        (status = 409, description = "Category is in use", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "categories"
)]
pub async fn delete_category_handler(
    State(category_service): State<Arc<dyn CategoryService>>,
    Extension(auth_user): Extension<AuthenticatedUser>,
    Path(category_id): Path<i64>,
) -> Result<StatusCode, Response> {
    match category_service
        .delete_category(auth_user.user_id, category_id)
        .await
    {
        Ok(()) => Ok(StatusCode::NO_CONTENT),
        Err(e) => Err(e.into_response()),
    }
}
