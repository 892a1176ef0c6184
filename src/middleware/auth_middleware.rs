use axum::{
    extract::{Request, State},
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use crate::handlers::{ErrorResponse, internal_error};
use crate::services::auth_service::{AuthError, AuthService};

/// Extension type to store authenticated user ID in request
#[derive(Clone, Debug)]
pub struct AuthenticatedUser {
    pub user_id: i64,
}

/// Auth middleware that validates JWT tokens and adds the user to request extensions
pub async fn auth_middleware(
    State(auth_service): State<Arc<dyn AuthService>>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthRejection> {
    let auth_header = headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or(AuthRejection::MissingToken)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or(AuthRejection::InvalidTokenFormat)?;

    let user_id = auth_service
        .validate_token(token)
        .await
        .map_err(|e| match e {
            AuthError::TokenExpired => AuthRejection::TokenExpired,
            AuthError::DatabaseError(msg) => AuthRejection::Internal(msg),
            _ => AuthRejection::InvalidToken,
        })?;

    request
        .extensions_mut()
        .insert(AuthenticatedUser { user_id });

    Ok(next.run(request).await)
}

/// Reasons a request is refused by the auth middleware
#[derive(Debug)]
pub enum AuthRejection {
    MissingToken,
    InvalidTokenFormat,
    InvalidToken,
    TokenExpired,
    Internal(String),
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        let (error_type, message) = match self {
            AuthRejection::MissingToken => ("missing_token", "Missing authorization token"),
            AuthRejection::InvalidTokenFormat => (
                "invalid_token_format",
                "Invalid authorization header format. Expected: Bearer <token>",
            ),
            AuthRejection::InvalidToken => ("invalid_token", "Invalid or malformed token"),
            AuthRejection::TokenExpired => ("token_expired", "Token has expired"),
            AuthRejection::Internal(ref msg) => return internal_error(msg),
        };

        ErrorResponse::new(error_type, message).into_response_with(StatusCode::UNAUTHORIZED)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AuthSettings;
    use crate::models::auth::AuthResponse;
    use crate::models::user::{CreateUserRequest, User};
    use crate::repositories::{RepositoryError, UserRepository};
    use crate::services::auth_service::AuthServiceImpl;
    use async_trait::async_trait;
    use axum::{Json, Router, body::Body, http::Request, middleware, routing::get};
    use chrono::{Duration, Utc};
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use tower::ServiceExt;

    // Mock repository for testing
    struct MockUserRepository {
        users: Mutex<HashMap<String, User>>,
    }

    impl MockUserRepository {
        fn new() -> Self {
            Self {
                users: Mutex::new(HashMap::new()),
            }
        }
    }

    #[async_trait]
    impl UserRepository for MockUserRepository {
        async fn create(
            &self,
            user: CreateUserRequest,
            password_hash: String,
        ) -> Result<User, RepositoryError> {
            let mut users = self.users.lock().unwrap();

            let new_user = User {
                id: users.len() as i64 + 1,
                email: user.email.clone(),
                password_hash,
                first_name: user.first_name,
                last_name: user.last_name,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            };

            users.insert(new_user.email.clone(), new_user.clone());
            Ok(new_user)
        }

        async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
            let users = self.users.lock().unwrap();
            Ok(users.get(email).cloned())
        }

        async fn find_by_id(&self, id: i64) -> Result<Option<User>, RepositoryError> {
            let users = self.users.lock().unwrap();
            Ok(users.values().find(|u| u.id == id).cloned())
        }

        async fn update_name(
            &self,
            _id: i64,
            _first_name: &str,
            _last_name: &str,
        ) -> Result<User, RepositoryError> {
            Err(RepositoryError::NotFound)
        }
    }

    // Test handler that requires authentication
    async fn protected_handler(
        axum::Extension(user): axum::Extension<AuthenticatedUser>,
    ) -> impl IntoResponse {
        Json(json!({
            "user_id": user.user_id,
            "message": "Access granted"
        }))
    }

    fn create_auth_service(token_ttl: Duration) -> Arc<dyn AuthService> {
        let settings = AuthSettings {
            token_ttl,
            bcrypt_cost: 4,
            ..AuthSettings::new("test_secret")
        };
        Arc::new(AuthServiceImpl::new(
            Arc::new(MockUserRepository::new()),
            settings,
        ))
    }

    fn create_test_app(auth_service: Arc<dyn AuthService>) -> Router {
        Router::new()
            .route("/protected", get(protected_handler))
            .layer(middleware::from_fn_with_state(
                auth_service.clone(),
                auth_middleware,
            ))
            .with_state(auth_service)
    }

    async fn register(auth_service: &Arc<dyn AuthService>) -> AuthResponse {
        auth_service
            .register(CreateUserRequest {
                email: "test@example.com".to_string(),
                password: "password123".to_string(),
                first_name: "Test".to_string(),
                last_name: "User".to_string(),
            })
            .await
            .unwrap()
    }

    async fn call(app: Router, authorization: Option<&str>) -> (StatusCode, serde_json::Value) {
        let mut builder = Request::builder().uri("/protected");
        if let Some(value) = authorization {
            builder = builder.header("Authorization", value);
        }

        let response = app
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_middleware_with_valid_token() {
        let auth_service = create_auth_service(Duration::hours(1));
        let registered = register(&auth_service).await;
        let app = create_test_app(auth_service);

        let (status, body) = call(app, Some(&format!("Bearer {}", registered.token))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user_id"], registered.user.id);
        assert_eq!(body["message"], "Access granted");
    }

    #[tokio::test]
    async fn test_middleware_without_token() {
        let app = create_test_app(create_auth_service(Duration::hours(1)));

        let (status, body) = call(app, None).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "missing_token");
    }

    #[tokio::test]
    async fn test_middleware_with_invalid_token() {
        let app = create_test_app(create_auth_service(Duration::hours(1)));

        let (status, body) = call(app, Some("Bearer invalid_token_here")).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "invalid_token");
    }

    #[tokio::test]
    async fn test_middleware_with_malformed_header() {
        let app = create_test_app(create_auth_service(Duration::hours(1)));

        let (status, body) = call(app, Some("some_token")).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "invalid_token_format");
        assert!(
            body["message"]
                .as_str()
                .unwrap()
                .contains("Invalid authorization header format")
        );
    }

    #[tokio::test]
    async fn test_middleware_with_expired_token() {
        let auth_service = create_auth_service(Duration::hours(-2));
        let registered = register(&auth_service).await;
        let app = create_test_app(auth_service);

        let (status, body) = call(app, Some(&format!("Bearer {}", registered.token))).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "token_expired");
    }
}
