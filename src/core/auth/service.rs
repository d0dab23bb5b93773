//! Authentication service
//!
//! Business logic for registration, login, profile updates and token to
//! user resolution. Coordinates the user store, the password hasher and the
//! token service, and translates their errors into [`AuthError`].

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::auth::jwt::{Claims, JwtError, TokenService};
use crate::core::auth::password::{MAX_PASSWORD_BYTES, PasswordError, PasswordHasher};
use crate::core::db::models::{NewUser, ProfileUpdate, Role, User, UserResponse};
use crate::core::db::repositories::{UserStore, UserStoreError};

/// Minimum password length in characters
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Authentication service error types
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Account is deactivated")]
    AccountDeactivated,

    #[error("User not found")]
    UserNotFound,

    #[error("User with this email already exists")]
    DuplicateUser,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token expired")]
    TokenExpired,

    #[error("Password too short (minimum 6 characters)")]
    PasswordTooShort,

    #[error("Password too long (maximum 72 bytes)")]
    PasswordTooLong,

    #[error("Invalid email format")]
    InvalidEmail,

    #[error("Invalid role: must be one of member, trainer, physio, admin")]
    InvalidRole,

    #[error("First and last name are required")]
    MissingName,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<UserStoreError> for AuthError {
    fn from(err: UserStoreError) -> Self {
        match err {
            UserStoreError::NotFound => AuthError::UserNotFound,
            UserStoreError::DuplicateEmail => AuthError::DuplicateUser,
            UserStoreError::Database(e) => AuthError::Internal(e.to_string()),
        }
    }
}

impl From<JwtError> for AuthError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::Expired => AuthError::TokenExpired,
            JwtError::InvalidToken => AuthError::InvalidToken,
            _ => AuthError::Internal(err.to_string()),
        }
    }
}

impl From<PasswordError> for AuthError {
    fn from(err: PasswordError) -> Self {
        AuthError::Internal(err.to_string())
    }
}

/// Registration request data
#[derive(Clone, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub phone: String,
    pub role: String,
}

impl std::fmt::Debug for RegisterRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisterRequest")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("phone", &self.phone)
            .field("role", &self.role)
            .finish()
    }
}

/// Login request data
#[derive(Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Profile update request. Only these fields are writable through it.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateProfileRequest {
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub phone: String,
}

/// Authentication response with token and sanitized user
#[derive(Debug, Clone, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserResponse,
    pub expires_at: DateTime<Utc>,
}

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn UserStore>,
    tokens: TokenService,
    hasher: PasswordHasher,
}

impl AuthService {
    /// Create a new authentication service
    pub fn new(store: Arc<dyn UserStore>, tokens: TokenService, hasher: PasswordHasher) -> Self {
        Self {
            store,
            tokens,
            hasher,
        }
    }

    /// Validate email format
    fn validate_email(email: &str) -> Result<(), AuthError> {
        if email.is_empty() || email.chars().any(char::is_whitespace) {
            return Err(AuthError::InvalidEmail);
        }

        // Check for valid structure: something@something.something
        let (local, domain) = email.split_once('@').ok_or(AuthError::InvalidEmail)?;

        if local.is_empty() || domain.is_empty() || domain.contains('@') {
            return Err(AuthError::InvalidEmail);
        }

        if !domain.contains('.') || domain.split('.').any(str::is_empty) {
            return Err(AuthError::InvalidEmail);
        }

        Ok(())
    }

    /// Validate password length
    fn validate_password(password: &str) -> Result<(), AuthError> {
        if password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(AuthError::PasswordTooShort);
        }

        if password.len() > MAX_PASSWORD_BYTES {
            return Err(AuthError::PasswordTooLong);
        }

        Ok(())
    }

    fn validate_names(first_name: &str, last_name: &str) -> Result<(), AuthError> {
        if first_name.trim().is_empty() || last_name.trim().is_empty() {
            return Err(AuthError::MissingName);
        }
        Ok(())
    }

    async fn hash_password(&self, password: String) -> Result<String, AuthError> {
        let hasher = self.hasher.clone();
        let hash = tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| AuthError::Internal(e.to_string()))??;
        Ok(hash)
    }

    /// Verify on the blocking pool. With no stored hash, burns a dummy
    /// verification and reports a mismatch.
    async fn verify_password(
        &self,
        password: String,
        hash: Option<String>,
    ) -> Result<bool, AuthError> {
        let hasher = self.hasher.clone();
        tokio::task::spawn_blocking(move || match hash {
            Some(hash) => hasher.verify(&password, &hash),
            None => hasher.verify_dummy(&password),
        })
        .await
        .map_err(|e| AuthError::Internal(e.to_string()))
    }

    fn respond(&self, user: User) -> Result<AuthResponse, AuthError> {
        let (token, expires_at) = self.tokens.issue(&user)?;

        Ok(AuthResponse {
            token,
            user: user.into(),
            expires_at,
        })
    }

    /// Register a new user
    pub async fn register(&self, request: RegisterRequest) -> Result<AuthResponse, AuthError> {
        let role: Role = request.role.parse().map_err(|_| AuthError::InvalidRole)?;
        Self::validate_email(&request.email)?;
        Self::validate_password(&request.password)?;
        Self::validate_names(&request.first_name, &request.last_name)?;

        let password_hash = self.hash_password(request.password).await?;

        let user = self
            .store
            .insert(NewUser {
                email: request.email,
                password_hash,
                first_name: request.first_name,
                last_name: request.last_name,
                phone: request.phone,
                role,
            })
            .await?;

        tracing::info!(user_id = user.id, role = %user.role, "User registered");

        self.respond(user)
    }

    /// Login an existing user
    pub async fn login(&self, request: LoginRequest) -> Result<AuthResponse, AuthError> {
        let user = self.store.find_by_email(&request.email).await?;

        let stored_hash = user.as_ref().map(|u| u.password_hash.clone());
        let valid = self.verify_password(request.password, stored_hash).await?;

        let user = match user {
            Some(user) if valid => user,
            _ => {
                tracing::warn!("Login rejected: invalid credentials");
                return Err(AuthError::InvalidCredentials);
            }
        };

        if !user.is_active {
            tracing::warn!(user_id = user.id, "Login rejected: account deactivated");
            return Err(AuthError::AccountDeactivated);
        }

        tracing::info!(user_id = user.id, "User logged in");

        self.respond(user)
    }

    /// Validate a session token and return its claims
    pub fn validate_token(&self, token: &str) -> Result<Claims, AuthError> {
        Ok(self.tokens.validate(token)?)
    }

    /// Get a user by ID, without the password hash
    pub async fn get_user_by_id(&self, id: i64) -> Result<UserResponse, AuthError> {
        let user = self
            .store
            .find_by_id(id)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        Ok(user.into())
    }

    /// Update first name, last name and phone
    pub async fn update_profile(
        &self,
        id: i64,
        request: UpdateProfileRequest,
    ) -> Result<UserResponse, AuthError> {
        Self::validate_names(&request.first_name, &request.last_name)?;

        let user = self
            .store
            .update_profile(
                id,
                ProfileUpdate {
                    first_name: request.first_name,
                    last_name: request.last_name,
                    phone: request.phone,
                },
            )
            .await?;

        tracing::info!(user_id = id, "Profile updated");

        Ok(user.into())
    }

    /// Deactivate an account. Existing tokens stop working at the next request.
    pub async fn deactivate_user(&self, id: i64) -> Result<UserResponse, AuthError> {
        let user = self.store.set_active(id, false).await?;
        tracing::info!(user_id = id, "User deactivated");
        Ok(user.into())
    }

    pub async fn activate_user(&self, id: i64) -> Result<UserResponse, AuthError> {
        let user = self.store.set_active(id, true).await?;
        tracing::info!(user_id = id, "User activated");
        Ok(user.into())
    }

    /// Soft-delete an account
    pub async fn delete_user(&self, id: i64) -> Result<(), AuthError> {
        self.store.soft_delete(id).await?;
        tracing::info!(user_id = id, "User deleted");
        Ok(())
    }
}
