use axum::{
    Json,
    extract::{Extension, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use validator::Validate;

use super::{ErrorResponse, body_validation_error, internal_error, json_rejection};
use crate::middleware::auth_middleware::AuthenticatedUser;
use crate::models::auth::{AuthResponse, LoginRequest};
use crate::models::user::{CreateUserRequest, UpdateProfileRequest, User};
use crate::services::auth_service::{AuthError, AuthService};

/// Convert AuthError to HTTP response
impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match self {
            AuthError::DuplicateEmail => (
                StatusCode::CONFLICT,
                "duplicate_email",
                "Email already exists",
            ),
            AuthError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                "invalid_credentials",
                "Invalid email or password",
            ),
            AuthError::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                "invalid_token",
                "Invalid authentication token",
            ),
            AuthError::TokenExpired => (
                StatusCode::UNAUTHORIZED,
                "token_expired",
                "Authentication token has expired",
            ),
            AuthError::UserNotFound => (
                StatusCode::NOT_FOUND,
                "user_not_found",
                "User not found",
            ),
            AuthError::DatabaseError(ref msg) => return internal_error(msg),
        };

        ErrorResponse::new(error_type, message).into_response_with(status)
    }
}

/// Handler for user registration
///
/// Creates a new user account and returns it with a JWT token.
#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User successfully registered", body = AuthResponse),
        (status = 400, description = "Validation error", body = ErrorResponse),
        (status = 409, description = "Email already exists", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn register_handler(
    State(auth_service): State<Arc<dyn AuthService>>,
    payload: Result<Json<CreateUserRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<AuthResponse>), Response> {
    let Json(request) = payload.map_err(json_rejection)?;
    request.validate().map_err(|e| body_validation_error(&e))?;

    match auth_service.register(request).await {
        Ok(response) => Ok((StatusCode::CREATED, Json(response))),
        Err(e) => Err(e.into_response()),
    }
}

/// Handler for user login
///
/// Authenticates a user and returns a JWT token.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 400, description = "Validation error", body = ErrorResponse),
        (status = 401, description = "Invalid credentials", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn login_handler(
    State(auth_service): State<Arc<dyn AuthService>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<AuthResponse>, Response> {
    let Json(request) = payload.map_err(json_rejection)?;
    request.validate().map_err(|e| body_validation_error(&e))?;

    match auth_service.login(request).await {
        Ok(response) => Ok(Json(response)),
        Err(e) => Err(e.into_response()),
    }
}

/// Handler for logout
///
/// Tokens are stateless; the client discards its token.
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses(
        (status = 204, description = "Logged out")
    ),
    tag = "auth"
)]
pub async fn logout_handler() -> StatusCode {
    StatusCode::NO_CONTENT
}

/// Handler returning the authenticated user
#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses(
        (status = 200, description = "Current user", body = User),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "auth"
)]
pub async fn me_handler(
    State(auth_service): State<Arc<dyn AuthService>>,
    Extension(auth_user): Extension<AuthenticatedUser>,
) -> Result<Json<User>, Response> {
    match auth_service.current_user(auth_user.user_id).await {
        Ok(user) => Ok(Json(user)),
        Err(e) => Err(e.into_response()),
    }
}

/// Handler for updating the authenticated user's name
#[utoipa::path(
    put,
    path = "/api/auth/me",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Profile updated", body = User),
        (status = 400, description = "Validation error", body = ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "auth"
)]
pub async fn update_me_handler(
    State(auth_service): State<Arc<dyn AuthService>>,
    Extension(auth_user): Extension<AuthenticatedUser>,
    payload: Result<Json<UpdateProfileRequest>, JsonRejection>,
) -> Result<Json<User>, Response> {
    let Json(request) = payload.map_err(json_rejection)?;
    request.validate().map_err(|e| body_validation_error(&e))?;

    match auth_service.update_profile(auth_user.user_id, request).await {
        Ok(user) => Ok(Json(user)),
        Err(e) => Err(e.into_response()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AuthSettings;
    use crate::db;
    use crate::repositories::SqliteUserRepository;
    use crate::services::auth_service::AuthServiceImpl;

    async fn auth_service() -> Arc<dyn AuthService> {
        let pool = db::connect_in_memory().await.unwrap();
        let settings = AuthSettings {
            bcrypt_cost: 4,
            ..AuthSettings::new("test_secret")
        };
        Arc::new(AuthServiceImpl::new(
            Arc::new(SqliteUserRepository::new(pool)),
            settings,
        ))
    }

    fn register_request(email: &str) -> CreateUserRequest {
        CreateUserRequest {
            email: email.to_string(),
            password: "password123".to_string(),
            first_name: "Jane".to_string(),
            last_name: "Doe".to_string(),
        }
    }

    #[tokio::test]
    async fn test_register_handler_success() {
        let auth_service = auth_service().await;

        let result = register_handler(
            State(auth_service),
            Ok(Json(register_request("test@example.com"))),
        )
        .await;

        let (status, Json(response)) = result.unwrap();
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(response.user.email, "test@example.com");
        assert!(!response.token.is_empty());
    }

    #[tokio::test]
    async fn test_register_handler_validation_error() {
        let auth_service = auth_service().await;

        let request = CreateUserRequest {
            email: "invalid-email".to_string(),
            password: "123".to_string(),
            ..register_request("unused")
        };

        let response = register_handler(State(auth_service), Ok(Json(request)))
            .await
            .unwrap_err();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        let fields: Vec<&str> = json["details"]
            .as_array()
            .unwrap()
            .iter()
            .map(|d| d["field"].as_str().unwrap())
            .collect();
        assert_eq!(fields, vec!["email", "password"]);
    }

    #[tokio::test]
    async fn test_register_handler_duplicate_email() {
        let auth_service = auth_service().await;

        register_handler(
            State(auth_service.clone()),
            Ok(Json(register_request("test@example.com"))),
        )
        .await
        .unwrap();

        let response = register_handler(
            State(auth_service),
            Ok(Json(register_request("test@example.com"))),
        )
        .await
        .unwrap_err();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_login_handler() {
        let auth_service = auth_service().await;
        register_handler(
            State(auth_service.clone()),
            Ok(Json(register_request("test@example.com"))),
        )
        .await
        .unwrap();

        let Json(response) = login_handler(
            State(auth_service.clone()),
            Ok(Json(LoginRequest {
                email: "test@example.com".to_string(),
                password: "password123".to_string(),
            })),
        )
        .await
        .unwrap();
        assert!(!response.token.is_empty());

        let rejected = login_handler(
            State(auth_service),
            Ok(Json(LoginRequest {
                email: "test@example.com".to_string(),
                password: "wrongpassword".to_string(),
            })),
        )
        .await
        .unwrap_err();
        assert_eq!(rejected.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_me_handlers() {
        let auth_service = auth_service().await;
        let (_, Json(registered)) = register_handler(
            State(auth_service.clone()),
            Ok(Json(register_request("test@example.com"))),
        )
        .await
        .unwrap();
        let auth_user = AuthenticatedUser {
            user_id: registered.user.id,
        };

        let Json(user) = update_me_handler(
            State(auth_service.clone()),
            Extension(auth_user.clone()),
            Ok(Json(UpdateProfileRequest {
                last_name: Some("Smith".to_string()),
                ..UpdateProfileRequest::default()
            })),
        )
        .await
        .unwrap();
        assert_eq!(user.first_name, "Jane");
        assert_eq!(user.last_name, "Smith");

        let Json(me) = me_handler(State(auth_service), Extension(auth_user))
            .await
            .unwrap();
        assert_eq!(me.last_name, "Smith");
    }
}
