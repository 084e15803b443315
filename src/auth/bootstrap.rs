//! Bootstrap admin account creation.
//!
//! Produces the first (and, within this crate, only) admin credential when
//! multi-user mode is enabled. Input validation happens before any hashing
//! so a rejected request has no side effects; the returned record carries
//! the username and the salted hash, never the plaintext.

use crate::auth::error::AuthError;
use crate::auth::mode::{
    AdminAccount, CredentialHash, DEFAULT_HASH_ITERATIONS, MAX_USERNAME_LEN, MIN_PASSWORD_LEN,
    MIN_USERNAME_LEN,
};

/// Creates the initial administrator account for multi-user mode.
#[derive(Debug, Clone)]
pub struct CredentialBootstrapper {
    iterations: u32,
}

impl Default for CredentialBootstrapper {
    fn default() -> Self {
        Self::new(DEFAULT_HASH_ITERATIONS)
    }
}

impl CredentialBootstrapper {
    /// Create a bootstrapper with an explicit stretching count.
    /// Production callers should use [`Default`]; tests lower it for speed.
    pub fn new(iterations: u32) -> Self {
        Self { iterations }
    }

    /// Validate inputs and produce the admin account record.
    ///
    /// Uniqueness needs no check here: the caller only invokes this while
    /// creating a fresh multi-user configuration, so the account set it
    /// lands in is empty by construction.
    pub fn create(&self, username: &str, password: &str) -> Result<AdminAccount, AuthError> {
        let trimmed = username.trim();
        if trimmed.chars().count() < MIN_USERNAME_LEN {
            return Err(AuthError::validation(format!(
                "username must be at least {MIN_USERNAME_LEN} characters"
            )));
        }
        if trimmed.chars().count() > MAX_USERNAME_LEN {
            return Err(AuthError::validation(format!(
                "username too long (max {MAX_USERNAME_LEN} characters)"
            )));
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::validation(format!(
                "password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }

        Ok(AdminAccount {
            username: trimmed.to_string(),
            credential: CredentialHash::derive(password, self.iterations),
        })
    }

    /// Hash an instance password with the same parameters.
    pub fn hash_instance_password(&self, password: &str) -> Result<CredentialHash, AuthError> {
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::validation(format!(
                "password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }
        Ok(CredentialHash::derive(password, self.iterations))
    }
}

// ── Tests ───────────────────────────────────────────────────────────
