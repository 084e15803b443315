//! Instance settings loaded from `config.toml`.
//!
//! A missing file means defaults; unknown keys are tolerated so older
//! configs keep working across upgrades. Secrets never live here — the
//! authentication payload itself is stored hashed in the database.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Database filename inside the data directory.
const DB_FILENAME: &str = "authgate.db";

/// Gateway bind settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GatewaySettings {
    pub host: String,
    pub port: u16,
    /// Allow binding to a non-loopback address while authentication is
    /// disabled. Off by default; an open instance on a public interface
    /// is almost always a mistake.
    pub allow_public_bind: bool,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 3001,
            allow_public_bind: false,
        }
    }
}

/// Top-level instance settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Where the instance database lives. Defaults to the platform data dir.
    pub data_dir: Option<PathBuf>,
    pub gateway: GatewaySettings,
    /// Session lifetime in seconds (default 30 days).
    pub session_ttl_secs: u64,
    /// PBKDF2 stretching rounds for credential hashing.
    pub hash_iterations: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: None,
            gateway: GatewaySettings::default(),
            session_ttl_secs: 30 * 24 * 3600,
            hash_iterations: crate::auth::mode::DEFAULT_HASH_ITERATIONS,
        }
    }
}

impl Settings {
    /// Load settings from an explicit path, or from the default location.
    /// Missing file = defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match default_config_path() {
                Some(p) => p,
                None => return Ok(Self::default()),
            },
        };

        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read config at {}", path.display()))?;
        let settings: Settings = toml::from_str(&raw)
            .with_context(|| format!("failed to parse config at {}", path.display()))?;
        Ok(settings)
    }

    /// Resolve (and create) the data directory.
    pub fn resolve_data_dir(&self) -> Result<PathBuf> {
        let dir = match &self.data_dir {
            Some(dir) => dir.clone(),
            None => directories::ProjectDirs::from("dev", "zeroclaw-labs", "authgate")
                .context("could not determine a platform data directory")?
                .data_dir()
                .to_path_buf(),
        };
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create data dir {}", dir.display()))?;
        Ok(dir)
    }

    /// Path of the instance database.
    pub fn db_path(&self) -> Result<PathBuf> {
        Ok(self.resolve_data_dir()?.join(DB_FILENAME))
    }
}

fn default_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("dev", "zeroclaw-labs", "authgate")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

// ── Tests ───────────────────────────────────────────────────────────
