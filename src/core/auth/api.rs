//! Auth API endpoints
//!
//! Provides the REST API under `/api/v1`:
//! - GET /health - Liveness check
//! - POST /auth/register - Register a new user
//! - POST /auth/login - Login and get a session token
//! - GET /users/profile - Current user
//! - PUT /users/profile - Update current user's profile
//! - GET /staff/users/{id} - Look up a user (admin, trainer)
//! - PUT /admin/users/{id}/deactivate - Deactivate a user (admin)
//! - PUT /admin/users/{id}/activate - Reactivate a user (admin)
//! - DELETE /admin/users/{id} - Soft-delete a user (admin)

use std::time::Duration;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{Method, StatusCode, header},
    middleware,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
};
use chrono::Utc;
use serde::Serialize;
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::core::auth::gate::{RoleGate, role_gate};
use crate::core::auth::middleware::{AuthContext, authenticate};
use crate::core::auth::service::{
    AuthError, AuthResponse, AuthService, LoginRequest, RegisterRequest, UpdateProfileRequest,
};
use crate::core::db::models::{Role, UserResponse};

/// API error response
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: String,
    pub code: String,
}

impl ApiError {
    pub fn new(error: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: code.into(),
        }
    }
}

/// Convert AuthError to API response
impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            AuthError::InvalidCredentials | AuthError::AccountDeactivated => {
                (StatusCode::UNAUTHORIZED, "INVALID_CREDENTIALS")
            }
            AuthError::UserNotFound => (StatusCode::NOT_FOUND, "USER_NOT_FOUND"),
            AuthError::DuplicateUser => (StatusCode::CONFLICT, "EMAIL_EXISTS"),
            AuthError::InvalidToken | AuthError::TokenExpired => {
                (StatusCode::UNAUTHORIZED, "INVALID_TOKEN")
            }
            AuthError::PasswordTooShort => (StatusCode::BAD_REQUEST, "PASSWORD_TOO_SHORT"),
            AuthError::PasswordTooLong => (StatusCode::BAD_REQUEST, "PASSWORD_TOO_LONG"),
            AuthError::InvalidEmail => (StatusCode::BAD_REQUEST, "INVALID_EMAIL"),
            AuthError::InvalidRole => (StatusCode::BAD_REQUEST, "INVALID_ROLE"),
            AuthError::MissingName => (StatusCode::BAD_REQUEST, "MISSING_NAME"),
            AuthError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };

        let message = match &self {
            // Deactivated accounts must not be distinguishable at login
            AuthError::AccountDeactivated => AuthError::InvalidCredentials.to_string(),
            AuthError::InvalidToken | AuthError::TokenExpired => {
                "Invalid or expired token".to_string()
            }
            AuthError::Internal(detail) => {
                tracing::error!("Internal error: {}", detail);
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        (status, Json(ApiError::new(message, code))).into_response()
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub message: &'static str,
    pub timestamp: chrono::DateTime<Utc>,
}

/// Generic success response
#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
    pub message: String,
}

/// Create the API router with its cross-cutting layers
pub fn api_router(service: AuthService, request_timeout: Duration) -> Router {
    let staff = Router::new()
        .route("/staff/users/{id}", get(get_user_handler))
        .route_layer(middleware::from_fn_with_state(
            RoleGate::require(&[Role::Admin, Role::Trainer]),
            role_gate,
        ));

    let admin = Router::new()
        .route("/admin/users/{id}/deactivate", put(deactivate_handler))
        .route("/admin/users/{id}/activate", put(activate_handler))
        .route("/admin/users/{id}", delete(delete_handler))
        .route_layer(middleware::from_fn_with_state(
            RoleGate::require(&[Role::Admin]),
            role_gate,
        ));

    let protected = Router::new()
        .route(
            "/users/profile",
            get(get_profile_handler).put(update_profile_handler),
        )
        .merge(staff)
        .merge(admin)
        .route_layer(middleware::from_fn_with_state(
            service.clone(),
            authenticate,
        ));

    let public = Router::new()
        .route("/health", get(health_handler))
        .route("/auth/register", post(register_handler))
        .route("/auth/login", post(login_handler));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    Router::new()
        .nest("/api/v1", public.merge(protected))
        .with_state(service)
        .layer(TimeoutLayer::new(request_timeout))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// GET /api/v1/health
async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        message: "FitTrack+ API is running",
        timestamp: Utc::now(),
    })
}

/// POST /api/v1/auth/register
async fn register_handler(
    State(service): State<AuthService>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), AuthError> {
    tracing::info!("Registration attempt for email: {}", request.email);

    let response = service.register(request).await?;

    Ok((StatusCode::CREATED, Json(response)))
}

/// POST /api/v1/auth/login
async fn login_handler(
    State(service): State<AuthService>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AuthError> {
    tracing::info!("Login attempt for email: {}", request.email);

    let response = service.login(request).await?;

    Ok(Json(response))
}

/// GET /api/v1/users/profile
async fn get_profile_handler(ctx: AuthContext) -> Json<UserResponse> {
    Json(ctx.user)
}

/// PUT /api/v1/users/profile
async fn update_profile_handler(
    State(service): State<AuthService>,
    ctx: AuthContext,
    Json(request): Json<UpdateProfileRequest>,
) -> Result<Json<UserResponse>, AuthError> {
    let user = service.update_profile(ctx.user_id, request).await?;
    Ok(Json(user))
}

/// GET /api/v1/staff/users/{id}
async fn get_user_handler(
    State(service): State<AuthService>,
    Path(id): Path<i64>,
) -> Result<Json<UserResponse>, AuthError> {
    let user = service.get_user_by_id(id).await?;
    Ok(Json(user))
}

/// PUT /api/v1/admin/users/{id}/deactivate
async fn deactivate_handler(
    State(service): State<AuthService>,
    ctx: AuthContext,
    Path(id): Path<i64>,
) -> Result<Json<UserResponse>, AuthError> {
    tracing::info!(admin_id = ctx.user_id, user_id = id, "Deactivation requested");

    let user = service.deactivate_user(id).await?;
    Ok(Json(user))
}

/// PUT /api/v1/admin/users/{id}/activate
async fn activate_handler(
    State(service): State<AuthService>,
    ctx: AuthContext,
    Path(id): Path<i64>,
) -> Result<Json<UserResponse>, AuthError> {
    tracing::info!(admin_id = ctx.user_id, user_id = id, "Activation requested");

    let user = service.activate_user(id).await?;
    Ok(Json(user))
}

/// DELETE /api/v1/admin/users/{id}
async fn delete_handler(
    State(service): State<AuthService>,
    ctx: AuthContext,
    Path(id): Path<i64>,
) -> Result<Json<SuccessResponse>, AuthError> {
    tracing::info!(admin_id = ctx.user_id, user_id = id, "Deletion requested");

    service.delete_user(id).await?;

    Ok(Json(SuccessResponse {
        success: true,
        message: "User deleted successfully".to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_api_error_serialization() {
        let error = ApiError::new("Something went wrong", "ERROR_CODE");
        let json = serde_json::to_string(&error).unwrap();

        assert!(json.contains("Something went wrong"));
        assert!(json.contains("ERROR_CODE"));
    }

    #[test]
    fn test_auth_error_status_codes() {
        let cases = [
            (AuthError::InvalidCredentials, StatusCode::UNAUTHORIZED),
            (AuthError::AccountDeactivated, StatusCode::UNAUTHORIZED),
            (AuthError::InvalidToken, StatusCode::UNAUTHORIZED),
            (AuthError::TokenExpired, StatusCode::UNAUTHORIZED),
            (AuthError::UserNotFound, StatusCode::NOT_FOUND),
            (AuthError::DuplicateUser, StatusCode::CONFLICT),
            (AuthError::InvalidEmail, StatusCode::BAD_REQUEST),
            (AuthError::PasswordTooShort, StatusCode::BAD_REQUEST),
            (AuthError::PasswordTooLong, StatusCode::BAD_REQUEST),
            (AuthError::InvalidRole, StatusCode::BAD_REQUEST),
            (AuthError::MissingName, StatusCode::BAD_REQUEST),
            (
                AuthError::Internal("boom".to_string()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, expected) in cases {
            assert_eq!(error.into_response().status(), expected);
        }
    }

    #[tokio::test]
    async fn test_deactivated_login_body_matches_invalid_credentials() {
        let deactivated = body_json(AuthError::AccountDeactivated.into_response()).await;
        let invalid = body_json(AuthError::InvalidCredentials.into_response()).await;

        assert_eq!(deactivated, invalid);
        assert_eq!(invalid["error"], "Invalid email or password");
        assert_eq!(invalid["code"], "INVALID_CREDENTIALS");
    }

    #[tokio::test]
    async fn test_expired_token_body_matches_invalid_token() {
        let expired = body_json(AuthError::TokenExpired.into_response()).await;
        let invalid = body_json(AuthError::InvalidToken.into_response()).await;

        assert_eq!(expired, invalid);
        assert_eq!(invalid["error"], "Invalid or expired token");
        assert_eq!(invalid["code"], "INVALID_TOKEN");
    }

    #[tokio::test]
    async fn test_internal_error_body_is_generic() {
        let json =
            body_json(AuthError::Internal("connection refused at 10.0.0.5".to_string()).into_response())
                .await;

        assert_eq!(json["error"], "Internal server error");
        assert!(!json.to_string().contains("10.0.0.5"));
    }

    #[test]
    fn test_success_response_serialization() {
        let response = SuccessResponse {
            success: true,
            message: "Operation completed".to_string(),
        };
        let json = serde_json::to_string(&response).unwrap();

        assert!(json.contains("true"));
        assert!(json.contains("Operation completed"));
    }
}
