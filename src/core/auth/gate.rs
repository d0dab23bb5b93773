//! Role-based authorization
//!
//! A [`RoleGate`] restricts a group of routes to a set of roles. It must be
//! layered inside [`authenticate`](super::middleware::authenticate), which
//! supplies the [`AuthContext`] it reads.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::core::auth::middleware::{AuthContext, Rejection};
use crate::core::db::models::Role;

#[derive(Debug, Clone)]
pub struct RoleGate {
    allowed: Arc<[Role]>,
}

impl RoleGate {
    /// Allow only the given roles
    pub fn require(roles: &[Role]) -> Self {
        Self {
            allowed: roles.into(),
        }
    }

    /// Decide whether a caller with `role` may pass
    pub fn check(&self, role: Role) -> Result<(), Rejection> {
        if self.allowed.contains(&role) {
            Ok(())
        } else {
            Err(Rejection::Forbidden)
        }
    }
}

/// Middleware enforcing a [`RoleGate`]
pub async fn role_gate(
    State(gate): State<RoleGate>,
    req: Request,
    next: Next,
) -> Result<Response, Rejection> {
    let Some(ctx) = req.extensions().get::<AuthContext>() else {
        tracing::error!("Role gate reached without an authenticated context");
        return Err(Rejection::MissingIdentity);
    };

    if let Err(rejection) = gate.check(ctx.role) {
        tracing::debug!(
            user_id = ctx.user_id,
            role = %ctx.role,
            "Access denied by role gate"
        );
        return Err(rejection);
    }

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::db::models::UserResponse;
    use axum::{
        Router,
        body::Body,
        http::StatusCode,
        middleware::{self, from_fn},
        routing::get,
    };
    use chrono::Utc;
    use tower::ServiceExt;

    fn context(role: Role) -> AuthContext {
        AuthContext::from(UserResponse {
            id: 7,
            email: "gate@example.com".to_string(),
            first_name: "Gate".to_string(),
            last_name: "Keeper".to_string(),
            phone: String::new(),
            role,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        })
    }

    fn app(gate: RoleGate, caller: Option<Role>) -> Router {
        Router::new()
            .route("/guarded", get(|| async { "ok" }))
            .route_layer(middleware::from_fn_with_state(gate, role_gate))
            .route_layer(from_fn(move |mut req: Request, next: Next| async move {
                if let Some(role) = caller {
                    req.extensions_mut().insert(context(role));
                }
                next.run(req).await
            }))
    }

    async fn status_for(gate: RoleGate, caller: Option<Role>) -> StatusCode {
        app(gate, caller)
            .oneshot(
                axum::http::Request::builder()
                    .uri("/guarded")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap()
            .status()
    }

    // ========================================================================
    // Decision Tests
    // ========================================================================

    #[test]
    fn test_check_allows_listed_roles() {
        let gate = RoleGate::require(&[Role::Admin, Role::Trainer]);

        assert!(gate.check(Role::Admin).is_ok());
        assert!(gate.check(Role::Trainer).is_ok());
        assert!(matches!(gate.check(Role::Member), Err(Rejection::Forbidden)));
        assert!(matches!(gate.check(Role::Physio), Err(Rejection::Forbidden)));
    }

    #[test]
    fn test_empty_gate_denies_everyone() {
        let gate = RoleGate::require(&[]);

        for role in Role::ALL {
            assert!(gate.check(role).is_err());
        }
    }

    // ========================================================================
    // Middleware Tests
    // ========================================================================

    #[tokio::test]
    async fn test_role_gate_allows() {
        let gate = RoleGate::require(&[Role::Admin, Role::Trainer]);
        assert_eq!(status_for(gate, Some(Role::Trainer)).await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_role_gate_forbids() {
        let gate = RoleGate::require(&[Role::Admin]);
        assert_eq!(
            status_for(gate, Some(Role::Member)).await,
            StatusCode::FORBIDDEN
        );
    }

    #[tokio::test]
    async fn test_role_gate_without_context() {
        let gate = RoleGate::require(&[Role::Admin]);
        assert_eq!(status_for(gate, None).await, StatusCode::UNAUTHORIZED);
    }
}
