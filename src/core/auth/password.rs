//! Password hashing with bcrypt
//!
//! Digests are salted per call and carry their cost, so a change of cost only
//! affects new hashes. Verification goes through bcrypt's own constant-time
//! comparison and never errors: a digest that cannot be parsed simply does
//! not match.

use std::sync::{Arc, OnceLock};

/// Cost factor for bcrypt hashing (12 is recommended for production)
pub const DEFAULT_BCRYPT_COST: u32 = 12;

/// Range of cost factors bcrypt accepts
pub const MIN_BCRYPT_COST: u32 = 4;
pub const MAX_BCRYPT_COST: u32 = 31;

/// bcrypt only reads this many bytes of a password
pub const MAX_PASSWORD_BYTES: usize = 72;

const DUMMY_PASSWORD: &str = "fittrack-timing-equalizer";

/// Password hashing errors
#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("Password hashing failed: {0}")]
    HashingError(String),
}

#[derive(Clone)]
pub struct PasswordHasher {
    cost: u32,
    dummy_hash: Arc<OnceLock<Option<String>>>,
}

impl PasswordHasher {
    /// Create a hasher with the given cost, clamped to bcrypt's supported range
    pub fn new(cost: u32) -> Self {
        Self {
            cost: cost.clamp(MIN_BCRYPT_COST, MAX_BCRYPT_COST),
            dummy_hash: Arc::new(OnceLock::new()),
        }
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }

    /// Hash a password using bcrypt with automatic salt generation
    pub fn hash(&self, password: &str) -> Result<String, PasswordError> {
        bcrypt::hash(password, self.cost).map_err(|e| PasswordError::HashingError(e.to_string()))
    }

    /// Verify a password against a bcrypt hash
    ///
    /// Passwords longer than [`MAX_PASSWORD_BYTES`] never match, since bcrypt
    /// would compare only their prefix. The digest is still worked through so
    /// the rejection takes as long as a real comparison.
    pub fn verify(&self, password: &str, hash: &str) -> bool {
        if password.len() > MAX_PASSWORD_BYTES {
            let _ = bcrypt::verify(DUMMY_PASSWORD, hash);
            return false;
        }

        match bcrypt::verify(password, hash) {
            Ok(matches) => matches,
            Err(e) => {
                tracing::debug!("Rejecting unverifiable password hash: {}", e);
                false
            }
        }
    }

    /// Spend the same work as a real verification, for accounts that do not exist.
    /// Always returns `false`.
    pub fn verify_dummy(&self, password: &str) -> bool {
        match self.dummy_hash.get_or_init(|| dummy_digest(self.cost)) {
            Some(dummy) => {
                let _ = self.verify(password, dummy);
            }
            // Hashing costs the same as verifying at this cost
            None => {
                let _ = bcrypt::hash(DUMMY_PASSWORD, self.cost);
            }
        }
        false
    }
}

fn dummy_digest(cost: u32) -> Option<String> {
    match bcrypt::hash(DUMMY_PASSWORD, cost) {
        Ok(digest) => Some(digest),
        Err(e) => {
            tracing::error!("Failed to prepare dummy password digest: {}", e);
            None
        }
    }
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new(DEFAULT_BCRYPT_COST)
    }
}
