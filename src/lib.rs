//! authgate — authentication posture control for a self-hosted instance.
//!
//! One instance, one persisted authentication configuration, three
//! postures: no auth, a shared instance password, or multi-user accounts
//! bootstrapped with a single admin. The transition state machine, its
//! invariants, and the session-invalidation contract live in [`auth`] and
//! [`session`]; [`gateway`] exposes the settings surface over HTTP.

pub mod auth;
pub mod config;
pub mod gateway;
pub mod session;
