//! Session invalidation contract.
//!
//! Every committed authentication transition must be followed by exactly
//! one `invalidate` call; previously issued credentials stop working and
//! connected clients are told to re-authenticate. The call is
//! fire-and-forget with respect to the transition result — the transition
//! already succeeded when it runs, so failures here are logged, never
//! propagated. Client delivery is eventually consistent and unordered
//! across clients.

use crate::session::store::SessionStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Broadcast channel depth for re-authentication signals. Transitions are
/// rare; a small buffer is plenty.
const SIGNAL_CAPACITY: usize = 16;

/// Why sessions were invalidated. Sent verbatim to connected clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvalidationReason {
    /// The instance moved to multi-user mode.
    ModeEscalated,
    /// The shared instance password changed or was set.
    PasswordChanged,
    /// Authentication was turned off entirely.
    AuthDisabled,
}

impl std::fmt::Display for InvalidationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::ModeEscalated => "mode_escalated",
            Self::PasswordChanged => "password_changed",
            Self::AuthDisabled => "auth_disabled",
        };
        f.write_str(label)
    }
}

/// Single-capability interface: revoke everything, tell everyone.
pub trait SessionInvalidator: Send + Sync {
    fn invalidate(&self, reason: InvalidationReason);
}

/// Production invalidator: wipes the token store and broadcasts the reason
/// to whatever transport is serving connected clients.
pub struct TokenSessionInvalidator {
    sessions: Arc<SessionStore>,
    signal: broadcast::Sender<InvalidationReason>,
}

impl TokenSessionInvalidator {
    pub fn new(sessions: Arc<SessionStore>) -> Self {
        let (signal, _) = broadcast::channel(SIGNAL_CAPACITY);
        Self { sessions, signal }
    }

    /// Subscribe to re-authentication signals (one receiver per connected
    /// client transport).
    pub fn subscribe(&self) -> broadcast::Receiver<InvalidationReason> {
        self.signal.subscribe()
    }
}

impl SessionInvalidator for TokenSessionInvalidator {
    fn invalidate(&self, reason: InvalidationReason) {
        match self.sessions.revoke_all() {
            Ok(revoked) => {
                tracing::info!(reason = %reason, revoked, "Sessions invalidated");
            }
            Err(e) => {
                // The transition is already committed; clients that kept a
                // stale token will be re-checked against the new config.
                tracing::warn!(reason = %reason, error = %e, "Session revocation failed");
            }
        }

        // No receivers is fine — nobody was connected.
        let _ = self.signal.send(reason);
    }
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reason_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&InvalidationReason::ModeEscalated).unwrap(),
            "\"mode_escalated\""
        );
        assert_eq!(
            serde_json::to_string(&InvalidationReason::AuthDisabled).unwrap(),
            "\"auth_disabled\""
        );
    }

    #[test]
    fn invalidate_revokes_all_sessions() {
        let sessions = Arc::new(SessionStore::open_in_memory(Some(3600)).unwrap());
        let token = sessions.issue("admin").unwrap();

        let invalidator = TokenSessionInvalidator::new(Arc::clone(&sessions));
        invalidator.invalidate(InvalidationReason::PasswordChanged);

        assert!(sessions.validate(&token).is_none());
    }

    #[test]
    fn invalidate_signals_subscribers() {
        let sessions = Arc::new(SessionStore::open_in_memory(Some(3600)).unwrap());
        let invalidator = TokenSessionInvalidator::new(sessions);

        let mut rx = invalidator.subscribe();
        invalidator.invalidate(InvalidationReason::ModeEscalated);

        let got = rx.try_recv().unwrap();
        assert_eq!(got, InvalidationReason::ModeEscalated);
    }

    #[test]
    fn invalidate_without_subscribers_does_not_panic() {
        let sessions = Arc::new(SessionStore::open_in_memory(Some(3600)).unwrap());
        let invalidator = TokenSessionInvalidator::new(sessions);
        invalidator.invalidate(InvalidationReason::AuthDisabled);
    }
}
