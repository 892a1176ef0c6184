use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::validation::validate_not_blank;

/// User entity representing a registered user in the system
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub email: String,
    #[serde(skip_serializing, default)]
    #[schema(ignore)]
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request payload for user registration
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
#[schema(example = json!({
    "email": "jane.doe@example.com",
    "password": "secret123",
    "firstName": "Jane",
    "lastName": "Doe"
}))]
pub struct CreateUserRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,

    #[validate(
        length(max = 100, message = "First name cannot exceed 100 characters"),
        custom(function = "validate_not_blank")
    )]
    pub first_name: String,

    #[validate(
        length(max = 100, message = "Last name cannot exceed 100 characters"),
        custom(function = "validate_not_blank")
    )]
    pub last_name: String,
}

/// Request payload for updating the caller's profile; absent fields are left unchanged
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    #[validate(
        length(max = 100, message = "First name cannot exceed 100 characters"),
        custom(function = "validate_not_blank")
    )]
    pub first_name: Option<String>,

    #[validate(
        length(max = 100, message = "Last name cannot exceed 100 characters"),
        custom(function = "validate_not_blank")
    )]
    pub last_name: Option<String>,
}
