//! Read-only view of the authentication configuration.
//!
//! Used by any caller that needs to know whether auth is required before
//! attempting an operation. No side effects; always reflects the latest
//! committed state.

use crate::auth::error::AuthError;
use crate::auth::mode::AuthMode;
use crate::auth::store::AuthModeStore;
use serde::Serialize;
use std::sync::Arc;

/// Snapshot of the instance's authentication posture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModeDescription {
    pub mode: AuthMode,
    pub requires_auth: bool,
}

/// Read-only facade over [`AuthModeStore`].
#[derive(Clone)]
pub struct ConfigQuery {
    store: Arc<AuthModeStore>,
}

impl ConfigQuery {
    pub fn new(store: Arc<AuthModeStore>) -> Self {
        Self { store }
    }

    /// Whether the instance runs individual admin/user accounts.
    pub fn is_multi_user_mode(&self) -> Result<bool, AuthError> {
        Ok(self.store.read()?.mode == AuthMode::MultiUser)
    }

    /// Current mode plus whether any authentication is required.
    pub fn describe(&self) -> Result<ModeDescription, AuthError> {
        let config = self.store.read()?;
        Ok(ModeDescription {
            mode: config.mode,
            requires_auth: config.requires_auth(),
        })
    }
}

// ── Tests ───────────────────────────────────────────────────────────
