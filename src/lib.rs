//! FitTrack - authentication and authorization backend
//!
//! Account registration and login, bearer-token identity propagation and
//! role gating for the FitTrack+ fitness platform, served over axum.

pub mod core;
