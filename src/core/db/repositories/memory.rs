//! In-memory user store
//!
//! Backs the service when no `DATABASE_URL` is configured, and in tests.
//! Uniqueness is enforced atomically through the email index entry.

use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use super::user::{UserStore, UserStoreError};
use crate::core::db::models::{NewUser, ProfileUpdate, User};

pub struct MemoryUserStore {
    users: DashMap<i64, User>,
    /// Live users only: email -> id
    emails: DashMap<String, i64>,
    next_id: AtomicI64,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self {
            users: DashMap::new(),
            emails: DashMap::new(),
            next_id: AtomicI64::new(1),
        }
    }

    /// Number of live users
    pub fn len(&self) -> usize {
        self.emails.len()
    }

    pub fn is_empty(&self) -> bool {
        self.emails.is_empty()
    }

    fn live(&self, id: i64) -> Option<User> {
        self.users
            .get(&id)
            .filter(|user| user.deleted_at.is_none())
            .map(|user| user.value().clone())
    }

    fn modify(&self, id: i64, apply: impl FnOnce(&mut User)) -> Result<User, UserStoreError> {
        let mut user = self
            .users
            .get_mut(&id)
            .filter(|user| user.deleted_at.is_none())
            .ok_or(UserStoreError::NotFound)?;

        apply(user.value_mut());
        user.updated_at = Utc::now();
        Ok(user.value().clone())
    }
}

impl Default for MemoryUserStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, UserStoreError> {
        let id = match self.emails.get(email) {
            Some(entry) => *entry.value(),
            None => return Ok(None),
        };
        Ok(self.live(id))
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<User>, UserStoreError> {
        Ok(self.live(id))
    }

    async fn insert(&self, new_user: NewUser) -> Result<User, UserStoreError> {
        match self.emails.entry(new_user.email.clone()) {
            Entry::Occupied(_) => Err(UserStoreError::DuplicateEmail),
            Entry::Vacant(slot) => {
                let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                let now = Utc::now();
                let user = User {
                    id,
                    email: new_user.email,
                    password_hash: new_user.password_hash,
                    first_name: new_user.first_name,
                    last_name: new_user.last_name,
                    phone: new_user.phone,
                    role: new_user.role,
                    is_active: true,
                    deleted_at: None,
                    created_at: now,
                    updated_at: now,
                };
                self.users.insert(id, user.clone());
                slot.insert(id);
                Ok(user)
            }
        }
    }

    async fn update_profile(
        &self,
        id: i64,
        update: ProfileUpdate,
    ) -> Result<User, UserStoreError> {
        self.modify(id, |user| {
            user.first_name = update.first_name;
            user.last_name = update.last_name;
            user.phone = update.phone;
        })
    }

    async fn set_active(&self, id: i64, active: bool) -> Result<User, UserStoreError> {
        self.modify(id, |user| user.is_active = active)
    }

    async fn soft_delete(&self, id: i64) -> Result<(), UserStoreError> {
        // The users guard is released before touching the email index;
        // insert takes the locks in the opposite order.
        let email = self
            .modify(id, |user| {
                user.deleted_at = Some(Utc::now());
                user.is_active = false;
            })?
            .email;

        self.emails.remove_if(&email, |_, owner| *owner == id);
        Ok(())
    }
}
