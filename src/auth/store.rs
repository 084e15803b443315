//! SQLite-backed store for the instance authentication configuration.
//!
//! Tables:
//! - `auth_config`: one row per instance (there is exactly one), holding
//!   the version counter, the mode discriminant, and the JSON payload.
//!
//! All mutation goes through [`AuthModeStore::compare_and_swap`]: a
//! conditional `UPDATE ... WHERE version = ?` whose affected-row count
//! decides between commit and conflict. Concurrent administrative
//! requests are serialized by that check alone — readers never block.

use crate::auth::error::AuthError;
use crate::auth::mode::AuthConfig;
use parking_lot::Mutex;
use std::path::Path;

/// Well-known row key: one configuration per instance.
const INSTANCE_ID: &str = "instance";

/// SQLite-backed authentication configuration store.
pub struct AuthModeStore {
    conn: Mutex<rusqlite::Connection>,
}

impl AuthModeStore {
    /// Open (or create) the config database at the given path.
    ///
    /// First open seeds the default configuration: no authentication,
    /// version 0.
    pub fn open(db_path: &Path) -> Result<Self, AuthError> {
        let conn = rusqlite::Connection::open(db_path)?;

        // WAL mode for concurrent reads + crash safety
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA busy_timeout = 5000;",
        )?;

        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_tables()?;
        Ok(store)
    }

    /// In-memory store for tests.
    pub fn open_in_memory() -> Result<Self, AuthError> {
        let conn = rusqlite::Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_tables()?;
        Ok(store)
    }

    fn init_tables(&self) -> Result<(), AuthError> {
        let conn = self.conn.lock();
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS auth_config (
                id TEXT PRIMARY KEY,
                version INTEGER NOT NULL,
                mode TEXT NOT NULL,
                payload TEXT NOT NULL
            );",
        )?;

        // Seed the default row exactly once; later opens keep what's there.
        let initial = AuthConfig::initial();
        let payload = serde_json::to_string(&initial)?;
        conn.execute(
            "INSERT OR IGNORE INTO auth_config (id, version, mode, payload)
             VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![
                INSTANCE_ID,
                initial.version as i64,
                initial.mode.as_str(),
                payload
            ],
        )?;
        Ok(())
    }

    /// Return the current persisted configuration.
    pub fn read(&self) -> Result<AuthConfig, AuthError> {
        let conn = self.conn.lock();
        let payload: String = conn.query_row(
            "SELECT payload FROM auth_config WHERE id = ?1",
            rusqlite::params![INSTANCE_ID],
            |row| row.get(0),
        )?;
        Ok(serde_json::from_str(&payload)?)
    }

    /// Atomically commit `new_config` with `version = expected_version + 1`,
    /// but only if the stored version still equals `expected_version`.
    ///
    /// A losing racer gets `Conflict` and must re-read before retrying;
    /// the stored configuration is untouched in that case.
    pub fn compare_and_swap(
        &self,
        expected_version: u64,
        new_config: AuthConfig,
    ) -> Result<AuthConfig, AuthError> {
        let mut committed = new_config;
        committed.version = expected_version + 1;
        committed.validate()?;

        let payload = serde_json::to_string(&committed)?;
        let conn = self.conn.lock();
        let updated = conn.execute(
            "UPDATE auth_config
             SET version = ?1, mode = ?2, payload = ?3
             WHERE id = ?4 AND version = ?5",
            rusqlite::params![
                committed.version as i64,
                committed.mode.as_str(),
                payload,
                INSTANCE_ID,
                expected_version as i64
            ],
        )?;

        if updated == 0 {
            return Err(AuthError::conflict(
                "authentication config changed concurrently; re-read and retry",
            ));
        }

        Ok(committed)
    }
}

// ── Tests ───────────────────────────────────────────────────────────
