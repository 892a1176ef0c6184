use async_trait::async_trait;
use bcrypt::{hash, verify};
use chrono::Utc;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::AuthSettings;
use crate::models::auth::{AuthResponse, LoginRequest};
use crate::models::user::{CreateUserRequest, UpdateProfileRequest, User};
use crate::repositories::{RepositoryError, UserRepository};

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String, // user_id
    exp: i64,
    iat: i64,
}

/// Authentication service errors
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Email already exists")]
    DuplicateEmail,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token expired")]
    TokenExpired,

    #[error("User not found")]
    UserNotFound,

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<RepositoryError> for AuthError {
    fn from(error: RepositoryError) -> Self {
        match error {
            RepositoryError::ConstraintViolation(_) => AuthError::DuplicateEmail,
            RepositoryError::NotFound => AuthError::UserNotFound,
            RepositoryError::DatabaseError(msg) => AuthError::DatabaseError(msg),
        }
    }
}

/// Trait defining authentication service operations
#[async_trait]
pub trait AuthService: Send + Sync {
    /// Register a new user and sign them in
    async fn register(&self, request: CreateUserRequest) -> Result<AuthResponse, AuthError>;

    /// Authenticate user and return JWT token
    async fn login(&self, request: LoginRequest) -> Result<AuthResponse, AuthError>;

    /// Validate JWT token and return the id of an existing user
    async fn validate_token(&self, token: &str) -> Result<i64, AuthError>;

    /// Load the user behind an authenticated request
    async fn current_user(&self, user_id: i64) -> Result<User, AuthError>;

    /// Change the user's name; absent fields keep their value
    async fn update_profile(
        &self,
        user_id: i64,
        request: UpdateProfileRequest,
    ) -> Result<User, AuthError>;
}

/// Implementation of AuthService
pub struct AuthServiceImpl {
    user_repository: Arc<dyn UserRepository>,
    settings: AuthSettings,
}

impl AuthServiceImpl {
    pub fn new(user_repository: Arc<dyn UserRepository>, settings: AuthSettings) -> Self {
        Self {
            user_repository,
            settings,
        }
    }

    /// Hash a password using bcrypt
    fn hash_password(&self, password: &str) -> Result<String, AuthError> {
        hash(password, self.settings.bcrypt_cost)
            .map_err(|e| AuthError::DatabaseError(format!("Password hashing failed: {}", e)))
    }

    /// Verify a password against a hash
    fn verify_password(password: &str, hash: &str) -> Result<bool, AuthError> {
        verify(password, hash)
            .map_err(|e| AuthError::DatabaseError(format!("Password verification failed: {}", e)))
    }

    /// Generate a JWT token for a user
    fn issue_token(&self, user: User) -> Result<AuthResponse, AuthError> {
        let issued_at = Utc::now();
        let expires_at = issued_at + self.settings.token_ttl;

        let claims = Claims {
            sub: user.id.to_string(),
            exp: expires_at.timestamp(),
            iat: issued_at.timestamp(),
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.settings.jwt_secret.as_bytes()),
        )
        .map_err(|e| AuthError::DatabaseError(format!("Token generation failed: {}", e)))?;

        Ok(AuthResponse {
            user,
            token,
            expires_at,
        })
    }

    /// Decode and validate a JWT token
    fn decode_jwt(&self, token: &str) -> Result<i64, AuthError> {
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.settings.jwt_secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::InvalidToken,
        })?;

        token_data
            .claims
            .sub
            .parse()
            .map_err(|_| AuthError::InvalidToken)
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[async_trait]
impl AuthService for AuthServiceImpl {
    async fn register(&self, request: CreateUserRequest) -> Result<AuthResponse, AuthError> {
        let password_hash = self.hash_password(&request.password)?;

        let request = CreateUserRequest {
            email: normalize_email(&request.email),
            first_name: request.first_name.trim().to_string(),
            last_name: request.last_name.trim().to_string(),
            ..request
        };

        let user = self.user_repository.create(request, password_hash).await?;
        tracing::info!(user_id = user.id, "User registered");

        self.issue_token(user)
    }

    async fn login(&self, request: LoginRequest) -> Result<AuthResponse, AuthError> {
        let user = self
            .user_repository
            .find_by_email(&normalize_email(&request.email))
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        let is_valid = Self::verify_password(&request.password, &user.password_hash)?;
        if !is_valid {
            tracing::debug!(user_id = user.id, "Rejected login with wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        self.issue_token(user)
    }

    async fn validate_token(&self, token: &str) -> Result<i64, AuthError> {
        let user_id = self.decode_jwt(token)?;

        // tokens of deleted users are no longer honoured
        self.user_repository
            .find_by_id(user_id)
            .await?
            .map(|user| user.id)
            .ok_or(AuthError::InvalidToken)
    }

    async fn current_user(&self, user_id: i64) -> Result<User, AuthError> {
        self.user_repository
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)
    }

    async fn update_profile(
        &self,
        user_id: i64,
        request: UpdateProfileRequest,
    ) -> Result<User, AuthError> {
        let user = self.current_user(user_id).await?;

        let first_name = request
            .first_name
            .map(|name| name.trim().to_string())
            .unwrap_or(user.first_name);
        let last_name = request
            .last_name
            .map(|name| name.trim().to_string())
            .unwrap_or(user.last_name);

        let user = self
            .user_repository
            .update_name(user_id, &first_name, &last_name)
            .await?;
        Ok(user)
    }
}
