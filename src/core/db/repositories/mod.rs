//! Database repositories for FitTrack
//!
//! Repositories encapsulate data access and give the auth service a
//! storage-agnostic API through the [`UserStore`] trait.

pub mod memory;
pub mod user;

pub use memory::MemoryUserStore;
pub use user::{UserRepository, UserStore, UserStoreError};
