//! Request authentication
//!
//! [`authenticate`] resolves the bearer token on every protected request to a
//! live, active user and stores the result as an [`AuthContext`] in the
//! request extensions. Handlers read it back with the [`AuthContext`]
//! extractor. Any failure short-circuits with a JSON error body.

use axum::{
    Json,
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, StatusCode, header, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::core::auth::api::ApiError;
use crate::core::auth::service::{AuthError, AuthService};
use crate::core::db::models::{Role, UserResponse};

/// Authenticated caller, valid for the lifetime of one request
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user: UserResponse,
    pub user_id: i64,
    pub role: Role,
}

impl From<UserResponse> for AuthContext {
    fn from(user: UserResponse) -> Self {
        Self {
            user_id: user.id,
            role: user.role,
            user,
        }
    }
}

/// Why a request was refused before reaching its handler
#[derive(Debug, thiserror::Error)]
pub enum Rejection {
    #[error("Authorization header is required")]
    MissingHeader,

    #[error("Authorization header must be in the form 'Bearer <token>'")]
    MalformedHeader,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("User not found")]
    UserNotFound,

    #[error("Account is deactivated")]
    AccountDeactivated,

    #[error("User role not found in context")]
    MissingIdentity,

    #[error("Insufficient permissions")]
    Forbidden,

    #[error("Internal server error")]
    Internal,
}

impl Rejection {
    pub fn status(&self) -> StatusCode {
        match self {
            Rejection::Forbidden => StatusCode::FORBIDDEN,
            Rejection::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::UNAUTHORIZED,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Rejection::MissingHeader => "MISSING_AUTH_HEADER",
            Rejection::MalformedHeader => "INVALID_AUTH_HEADER",
            Rejection::InvalidToken => "INVALID_TOKEN",
            Rejection::UserNotFound => "USER_NOT_FOUND",
            Rejection::AccountDeactivated => "ACCOUNT_DEACTIVATED",
            Rejection::MissingIdentity => "MISSING_IDENTITY",
            Rejection::Forbidden => "FORBIDDEN",
            Rejection::Internal => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for Rejection {
    fn into_response(self) -> Response {
        let body = ApiError::new(self.to_string(), self.code());
        (self.status(), Json(body)).into_response()
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header.
///
/// The scheme match is exact and case-sensitive. A header that is present but
/// not visible ASCII is malformed. An empty remainder is returned as is and
/// fails token validation.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, Rejection> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or(Rejection::MissingHeader)?
        .to_str()
        .map_err(|_| Rejection::MalformedHeader)?;

    value
        .strip_prefix("Bearer ")
        .ok_or(Rejection::MalformedHeader)
}

/// Authentication middleware for protected routes
pub async fn authenticate(
    State(service): State<AuthService>,
    mut req: Request,
    next: Next,
) -> Result<Response, Rejection> {
    let token = bearer_token(req.headers())?;

    let claims = service.validate_token(token).map_err(|e| {
        tracing::debug!("Token validation failed: {}", e);
        Rejection::InvalidToken
    })?;

    let user = match service.get_user_by_id(claims.user_id).await {
        Ok(user) => user,
        Err(AuthError::UserNotFound) => {
            tracing::debug!(user_id = claims.user_id, "Token subject no longer exists");
            return Err(Rejection::UserNotFound);
        }
        Err(e) => {
            tracing::error!("User lookup failed during authentication: {}", e);
            return Err(Rejection::Internal);
        }
    };

    if !user.is_active {
        tracing::debug!(user_id = user.id, "Token presented for deactivated account");
        return Err(Rejection::AccountDeactivated);
    }

    req.extensions_mut().insert(AuthContext::from(user));

    Ok(next.run(req).await)
}

impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = Rejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .cloned()
            .ok_or(Rejection::MissingIdentity)
    }
}
