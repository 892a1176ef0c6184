pub mod auth_handlers;
pub mod category_handlers;
pub mod expense_handlers;

use axum::{
    Json,
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::ValidationErrors;

use crate::validation::{FieldError, camel_case, field_errors};

/// Error response structure
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    /// One entry per invalid field, present on validation errors
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<FieldError>>,
}

impl ErrorResponse {
    pub fn new(error: &str, message: &str) -> Self {
        Self {
            error: error.to_string(),
            message: message.to_string(),
            details: None,
        }
    }

    pub fn into_response_with(self, status: StatusCode) -> Response {
        (status, Json(self)).into_response()
    }
}

fn validation_failure(details: Vec<FieldError>) -> Response {
    let error_response = ErrorResponse {
        details: Some(details),
        ..ErrorResponse::new("validation_error", "Request validation failed")
    };
    error_response.into_response_with(StatusCode::BAD_REQUEST)
}

/// 400 response for an invalid JSON body; field names are reported in camelCase
pub fn body_validation_error(errors: &ValidationErrors) -> Response {
    let details = field_errors(errors)
        .into_iter()
        .map(|e| FieldError {
            field: camel_case(&e.field),
            message: e.message,
        })
        .collect();
    validation_failure(details)
}

/// 400 response for invalid query parameters; field names are the parameter names
pub fn query_validation_error(errors: &ValidationErrors) -> Response {
    validation_failure(field_errors(errors))
}

/// 400 response for a body that could not be deserialized at all
pub fn json_rejection(rejection: JsonRejection) -> Response {
    ErrorResponse::new("invalid_body", &rejection.body_text())
        .into_response_with(StatusCode::BAD_REQUEST)
}

pub fn query_rejection(rejection: QueryRejection) -> Response {
    ErrorResponse::new("invalid_query", &rejection.body_text())
        .into_response_with(StatusCode::BAD_REQUEST)
}

/// 500 response; `detail` is logged but never sent to the client
pub fn internal_error(detail: &str) -> Response {
    tracing::error!(detail, "Request failed with internal error");
    ErrorResponse::new("internal_error", "An unexpected error occurred")
        .into_response_with(StatusCode::INTERNAL_SERVER_ERROR)
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/api/health",
    responses(
        (status = 200, description = "Service is running", body = HealthResponse)
    ),
    tag = "health"
)]
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "OK".to_string(),
        message: "Expense tracker API is running".to_string(),
        timestamp: Utc::now(),
    })
}
