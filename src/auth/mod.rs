//! Authentication configuration core.
//!
//! Provides:
//! - The persisted configuration model (`AuthMode`, `AuthConfig`) with
//!   structural invariants enforced before every commit
//! - A version-gated SQLite store with atomic compare-and-swap
//! - The transition controller implementing the mode state machine
//! - Bootstrap admin creation (PBKDF2-HMAC-SHA256, 100k rounds + per-credential salt)
//! - A read-only query facade for callers that just need the posture
//!
//! ## Design Decisions
//! - Modes are an explicit three-state enum with a dedicated transition
//!   function per operation — never a pair of booleans that could encode
//!   an invalid combination.
//! - Optimistic concurrency (version compare-and-swap) instead of a lock:
//!   the same instance may be administered from several sessions at once,
//!   and only conflicting commits are rejected.
//! - Losing the instance password or admin credentials is unrecoverable:
//!   there is deliberately no reset or recovery path.

pub mod bootstrap;
pub mod controller;
pub mod error;
pub mod mode;
pub mod query;
pub mod store;

pub use bootstrap::CredentialBootstrapper;
pub use controller::ModeTransitionController;
pub use error::AuthError;
pub use mode::{AdminAccount, AuthConfig, AuthMode, CredentialHash};
pub use query::{ConfigQuery, ModeDescription};
pub use store::AuthModeStore;
