//! SQLite-backed session token store.
//!
//! Tables:
//! - `sessions`: token_hash, principal, created_at, expires_at
//!
//! Tokens are opaque random hex strings, revealed to the client once and
//! stored only as SHA-256 hashes. Validation is a server-side lookup; a
//! mode transition revokes the whole table at once via
//! [`SessionStore::revoke_all`].

use crate::auth::error::AuthError;
use parking_lot::Mutex;
use rand::Rng;
use sha2::{Digest, Sha256};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

/// Default session duration: 30 days (seconds).
const DEFAULT_SESSION_TTL_SECS: u64 = 30 * 24 * 3600;

/// Token byte length before hex encoding (32 bytes = 64 hex chars).
const TOKEN_BYTES: usize = 32;

/// An issued session, as seen by validation.
#[derive(Debug, Clone)]
pub struct SessionClaims {
    /// Who the session was issued to: an admin username in multi-user
    /// mode, or `"instance"` under shared-password protection.
    pub principal: String,
    pub expires_at: i64,
}

/// SQLite-backed session token store.
pub struct SessionStore {
    conn: Mutex<rusqlite::Connection>,
    ttl_secs: u64,
}

impl SessionStore {
    /// Open (or create) the session table in the database at `db_path`.
    pub fn open(db_path: &Path, ttl_secs: Option<u64>) -> Result<Self, AuthError> {
        let conn = rusqlite::Connection::open(db_path)?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA busy_timeout = 5000;",
        )?;
        Self::from_conn(conn, ttl_secs)
    }

    /// In-memory store for tests.
    pub fn open_in_memory(ttl_secs: Option<u64>) -> Result<Self, AuthError> {
        Self::from_conn(rusqlite::Connection::open_in_memory()?, ttl_secs)
    }

    fn from_conn(conn: rusqlite::Connection, ttl_secs: Option<u64>) -> Result<Self, AuthError> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS sessions (
                token_hash TEXT PRIMARY KEY,
                principal TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                expires_at INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_sessions_expires ON sessions(expires_at);",
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
            ttl_secs: ttl_secs.unwrap_or(DEFAULT_SESSION_TTL_SECS),
        })
    }

    /// Issue a session token for a principal.
    /// Returns the plaintext token (only revealed once).
    pub fn issue(&self, principal: &str) -> Result<String, AuthError> {
        let token = generate_token();
        let token_hash = hash_token(&token);
        let now = epoch_secs();
        let expires_at = now + self.ttl_secs;

        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO sessions (token_hash, principal, created_at, expires_at)
             VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![token_hash, principal, now as i64, expires_at as i64],
        )?;

        Ok(token)
    }

    /// Validate a session token.
    /// Returns `None` if the token is unknown, revoked, or expired.
    pub fn validate(&self, token: &str) -> Option<SessionClaims> {
        let token_hash = hash_token(token);
        let now = epoch_secs() as i64;

        let conn = self.conn.lock();
        conn.query_row(
            "SELECT principal, expires_at FROM sessions
             WHERE token_hash = ?1 AND expires_at > ?2",
            rusqlite::params![token_hash, now],
            |row| {
                Ok(SessionClaims {
                    principal: row.get(0)?,
                    expires_at: row.get(1)?,
                })
            },
        )
        .ok()
    }

    /// Revoke every issued session. Returns the number revoked.
    pub fn revoke_all(&self) -> Result<u64, AuthError> {
        let conn = self.conn.lock();
        let deleted = conn.execute("DELETE FROM sessions", [])?;
        Ok(deleted as u64)
    }

    /// Clean up expired sessions.
    pub fn cleanup_expired(&self) -> Result<u64, AuthError> {
        let now = epoch_secs() as i64;
        let conn = self.conn.lock();
        let deleted = conn.execute(
            "DELETE FROM sessions WHERE expires_at <= ?1",
            rusqlite::params![now],
        )?;
        Ok(deleted as u64)
    }
}

/// Generate a random session token (hex-encoded).
fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Hash a session token (SHA-256, single pass — tokens are already high-entropy).
fn hash_token(token: &str) -> String {
    let mut h = Sha256::new();
    h.update(token.as_bytes());
    hex::encode(h.finalize())
}

/// Current Unix epoch in seconds.
fn epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

// ── Tests ───────────────────────────────────────────────────────────
