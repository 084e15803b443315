//! Session tokens and the invalidation contract.
//!
//! Provides:
//! - Opaque session tokens (random hex, SHA-256 hashed for storage,
//!   time-limited), issued by the gateway login flow
//! - The [`SessionInvalidator`] capability invoked after every committed
//!   authentication transition
//! - A broadcast signal telling connected clients to re-authenticate

pub mod invalidator;
pub mod store;

pub use invalidator::{InvalidationReason, SessionInvalidator, TokenSessionInvalidator};
pub use store::{SessionClaims, SessionStore};
