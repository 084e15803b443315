//! Authentication-mode transition controller.
//!
//! The only component allowed to mutate the persisted configuration.
//! Legal transitions:
//!
//! | From              | To                | Operation                       |
//! |-------------------|-------------------|---------------------------------|
//! | Disabled          | PasswordProtected | `set_password_protection(true)` |
//! | PasswordProtected | Disabled          | `set_password_protection(false)`|
//! | Disabled          | MultiUser         | `enable_multi_user`             |
//! | PasswordProtected | MultiUser         | `enable_multi_user`             |
//!
//! Multi-user mode is terminal: no operation here leaves it. Every
//! operation reads current state, validates, commits via compare-and-swap,
//! and only then fires session invalidation — a losing concurrent request
//! observes a conflict and must re-read rather than retry blindly.

use crate::auth::bootstrap::CredentialBootstrapper;
use crate::auth::error::AuthError;
use crate::auth::mode::{AuthConfig, AuthMode};
use crate::auth::store::AuthModeStore;
use crate::session::{InvalidationReason, SessionInvalidator};
use std::sync::Arc;

/// Validates and executes authentication-mode transitions.
pub struct ModeTransitionController {
    store: Arc<AuthModeStore>,
    bootstrapper: CredentialBootstrapper,
    invalidator: Arc<dyn SessionInvalidator>,
}

impl ModeTransitionController {
    pub fn new(
        store: Arc<AuthModeStore>,
        bootstrapper: CredentialBootstrapper,
        invalidator: Arc<dyn SessionInvalidator>,
    ) -> Self {
        Self {
            store,
            bootstrapper,
            invalidator,
        }
    }

    /// Enable multi-user mode, bootstrapping the given admin account.
    ///
    /// Deliberately not idempotent: once multi-user mode is active a second
    /// call fails with a conflict instead of silently replacing the admin
    /// identity.
    pub fn enable_multi_user(
        &self,
        username: &str,
        password: &str,
    ) -> Result<AuthConfig, AuthError> {
        let current = self.store.read()?;
        if current.mode == AuthMode::MultiUser {
            return Err(AuthError::conflict("already in multi-user mode"));
        }

        let account = self.bootstrapper.create(username, password)?;
        let next = AuthConfig {
            mode: AuthMode::MultiUser,
            password_hash: None,
            admin_accounts: vec![account],
            version: current.version,
        };

        let committed = self.store.compare_and_swap(current.version, next)?;
        tracing::info!(
            from = %current.mode,
            version = committed.version,
            "Multi-user mode enabled"
        );

        self.invalidator.invalidate(InvalidationReason::ModeEscalated);
        Ok(committed)
    }

    /// Turn shared-password protection on (with a new password) or off.
    ///
    /// Rejected outright in multi-user mode: individual accounts supersede
    /// the instance password and cannot be toggled underneath it.
    pub fn set_password_protection(
        &self,
        enabled: bool,
        new_password: Option<&str>,
    ) -> Result<AuthConfig, AuthError> {
        let current = self.store.read()?;
        if current.mode == AuthMode::MultiUser {
            return Err(AuthError::conflict("multi-user mode active"));
        }

        let (next, reason) = if enabled {
            let password = new_password
                .ok_or_else(|| AuthError::validation("a new password is required"))?;
            let hash = self.bootstrapper.hash_instance_password(password)?;
            (
                AuthConfig {
                    mode: AuthMode::PasswordProtected,
                    password_hash: Some(hash),
                    admin_accounts: Vec::new(),
                    version: current.version,
                },
                InvalidationReason::PasswordChanged,
            )
        } else {
            (
                AuthConfig {
                    mode: AuthMode::Disabled,
                    password_hash: None,
                    admin_accounts: Vec::new(),
                    version: current.version,
                },
                InvalidationReason::AuthDisabled,
            )
        };

        let committed = self.store.compare_and_swap(current.version, next)?;
        tracing::info!(
            from = %current.mode,
            to = %committed.mode,
            version = committed.version,
            "Password protection updated"
        );

        self.invalidator.invalidate(reason);
        Ok(committed)
    }
}

// ── Tests ───────────────────────────────────────────────────────────
