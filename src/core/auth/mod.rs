//! Authentication and authorization for FitTrack+
//!
//! This module provides:
//! - Password hashing with bcrypt
//! - Session token issuance and validation (HS256 JWT)
//! - User registration, login and profile management
//! - Request authentication middleware and role gates
//! - REST API endpoints

pub mod api;
pub mod gate;
pub mod jwt;
pub mod middleware;
pub mod password;
pub mod service;

pub use api::{ApiError, api_router};
pub use gate::{RoleGate, role_gate};
pub use jwt::{Claims, JwtConfig, JwtError, TOKEN_LIFETIME_HOURS, TokenService};
pub use middleware::{AuthContext, Rejection, authenticate};
pub use password::{PasswordError, PasswordHasher};
pub use service::{
    AuthError, AuthResponse, AuthService, LoginRequest, RegisterRequest, UpdateProfileRequest,
};
