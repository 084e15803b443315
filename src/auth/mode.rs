//! Authentication posture data model.
//!
//! The persisted configuration is a single record: which posture the
//! instance runs in (`AuthMode`), the payload that posture needs (an
//! instance-password hash, or the admin account set), and a version
//! counter used for optimistic concurrency control.
//!
//! Exactly one payload field is populated at a time; `AuthConfig::validate`
//! rejects any combination that could not have been produced by a legal
//! transition, so a malformed record never reaches storage.

use crate::auth::error::AuthError;
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::Sha256;

/// PBKDF2-HMAC-SHA256 rounds for credential stretching.
pub const DEFAULT_HASH_ITERATIONS: u32 = 100_000;

/// Salt byte length for credential hashing.
const SALT_BYTES: usize = 16;

/// Derived digest length (SHA-256 output).
const DIGEST_BYTES: usize = 32;

/// Minimum username length (characters, after trimming).
pub const MIN_USERNAME_LEN: usize = 2;

/// Maximum username length (characters).
pub const MAX_USERNAME_LEN: usize = 64;

/// Minimum password / instance-passphrase length (characters, pre-hash).
pub const MIN_PASSWORD_LEN: usize = 8;

// ── Authentication mode ─────────────────────────────────────────────

/// Authentication posture of the instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMode {
    /// No authentication required; every caller is trusted.
    Disabled,
    /// A single shared instance password gates access.
    PasswordProtected,
    /// Individual admin/user accounts; terminal — once entered, the
    /// transition controller never leaves it.
    MultiUser,
}

impl AuthMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Disabled => "disabled",
            Self::PasswordProtected => "password_protected",
            Self::MultiUser => "multi_user",
        }
    }
}

impl std::fmt::Display for AuthMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Credential hash ─────────────────────────────────────────────────

/// A salted, stretched credential digest.
///
/// Stores iterations + salt alongside the digest so parameters can be
/// raised later without invalidating existing records. The plaintext is
/// consumed at derivation time and never stored or returned to a caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialHash {
    /// PBKDF2 iteration count used for this record.
    pub iterations: u32,
    /// Per-credential random salt (hex-encoded).
    pub salt: String,
    /// PBKDF2-HMAC-SHA256 digest (hex-encoded).
    pub digest: String,
}

impl CredentialHash {
    /// Derive a hash from a plaintext credential with a fresh random salt.
    pub fn derive(plaintext: &str, iterations: u32) -> Self {
        let mut salt = [0u8; SALT_BYTES];
        rand::rng().fill_bytes(&mut salt);

        let digest = stretch(plaintext, &salt, iterations);
        Self {
            iterations,
            salt: hex::encode(salt),
            digest: hex::encode(digest),
        }
    }

    /// Verify a plaintext credential against this record in constant time.
    pub fn verify(&self, plaintext: &str) -> bool {
        let Ok(salt) = hex::decode(&self.salt) else {
            return false;
        };
        let attempt = stretch(plaintext, &salt, self.iterations);
        let attempt_hex = hex::encode(attempt);
        constant_time_eq(attempt_hex.as_bytes(), self.digest.as_bytes())
    }
}

/// PBKDF2-HMAC-SHA256 key stretching.
fn stretch(plaintext: &str, salt: &[u8], iterations: u32) -> [u8; DIGEST_BYTES] {
    let mut out = [0u8; DIGEST_BYTES];
    pbkdf2::pbkdf2_hmac::<Sha256>(plaintext.as_bytes(), salt, iterations.max(1), &mut out);
    out
}

/// Constant-time byte comparison to prevent timing attacks.
pub(crate) fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

// ── Admin account ───────────────────────────────────────────────────

/// The bootstrap credential created when multi-user mode is enabled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminAccount {
    pub username: String,
    pub credential: CredentialHash,
}

// ── Persisted configuration ─────────────────────────────────────────

/// The persisted authentication configuration of the instance.
///
/// Created once at first initialization (`AuthConfig::initial`), mutated
/// exclusively through the transition controller, never deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthConfig {
    pub mode: AuthMode,
    /// Instance-password hash; populated iff `mode == PasswordProtected`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_hash: Option<CredentialHash>,
    /// Admin account set; non-empty iff `mode == MultiUser`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub admin_accounts: Vec<AdminAccount>,
    /// Monotonically increasing commit counter for compare-and-swap.
    pub version: u64,
}

impl AuthConfig {
    /// The configuration every instance starts with: no authentication.
    pub fn initial() -> Self {
        Self {
            mode: AuthMode::Disabled,
            password_hash: None,
            admin_accounts: Vec::new(),
            version: 0,
        }
    }

    /// Check the structural invariants that must hold after every commit.
    pub fn validate(&self) -> Result<(), AuthError> {
        match self.mode {
            AuthMode::Disabled => {
                if self.password_hash.is_some() || !self.admin_accounts.is_empty() {
                    return Err(AuthError::validation(
                        "disabled mode must not carry credentials",
                    ));
                }
            }
            AuthMode::PasswordProtected => {
                if self.password_hash.is_none() {
                    return Err(AuthError::validation(
                        "password protection requires an instance password hash",
                    ));
                }
                if !self.admin_accounts.is_empty() {
                    return Err(AuthError::validation(
                        "password protection must not carry admin accounts",
                    ));
                }
            }
            AuthMode::MultiUser => {
                if self.password_hash.is_some() {
                    return Err(AuthError::validation(
                        "multi-user mode must not carry an instance password",
                    ));
                }
                if self.admin_accounts.is_empty() {
                    return Err(AuthError::validation(
                        "multi-user mode requires at least one admin account",
                    ));
                }
            }
        }

        let mut seen = std::collections::HashSet::new();
        for account in &self.admin_accounts {
            if account.username.trim().chars().count() < MIN_USERNAME_LEN {
                return Err(AuthError::validation(format!(
                    "username '{}' is shorter than {MIN_USERNAME_LEN} characters",
                    account.username
                )));
            }
            if !seen.insert(account.username.to_lowercase()) {
                return Err(AuthError::validation(format!(
                    "duplicate admin username '{}'",
                    account.username
                )));
            }
        }

        Ok(())
    }

    /// Whether any authentication is required to use the instance.
    pub fn requires_auth(&self) -> bool {
        self.mode != AuthMode::Disabled
    }
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    /// Low iteration count so hashing-heavy tests stay fast.
    const TEST_ITERATIONS: u32 = 10;

    #[test]
    fn initial_config_is_disabled_version_zero() {
        let config = AuthConfig::initial();
        assert_eq!(config.mode, AuthMode::Disabled);
        assert_eq!(config.version, 0);
        assert!(!config.requires_auth());
        config.validate().unwrap();
    }

    #[test]
    fn mode_round_trips_through_serde() {
        for mode in [
            AuthMode::Disabled,
            AuthMode::PasswordProtected,
            AuthMode::MultiUser,
        ] {
            let json = serde_json::to_string(&mode).unwrap();
            let back: AuthMode = serde_json::from_str(&json).unwrap();
            assert_eq!(mode, back);
        }
        assert_eq!(
            serde_json::to_string(&AuthMode::MultiUser).unwrap(),
            "\"multi_user\""
        );
    }

    #[test]
    fn credential_hash_verifies_correct_password() {
        let hash = CredentialHash::derive("hunter2hunter2", TEST_ITERATIONS);
        assert!(hash.verify("hunter2hunter2"));
        assert!(!hash.verify("hunter2hunter3"));
    }

    #[test]
    fn credential_hash_uses_unique_salts() {
        let a = CredentialHash::derive("same-password", TEST_ITERATIONS);
        let b = CredentialHash::derive("same-password", TEST_ITERATIONS);
        assert_ne!(a.salt, b.salt);
        assert_ne!(a.digest, b.digest);
    }

    #[test]
    fn credential_hash_never_contains_plaintext() {
        let hash = CredentialHash::derive("super-secret-phrase", TEST_ITERATIONS);
        let json = serde_json::to_string(&hash).unwrap();
        assert!(!json.contains("super-secret-phrase"));
    }

    #[test]
    fn disabled_mode_rejects_leftover_credentials() {
        let mut config = AuthConfig::initial();
        config.password_hash = Some(CredentialHash::derive("pw", TEST_ITERATIONS));
        assert!(config.validate().is_err());
    }

    #[test]
    fn password_mode_requires_hash() {
        let config = AuthConfig {
            mode: AuthMode::PasswordProtected,
            password_hash: None,
            admin_accounts: Vec::new(),
            version: 1,
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn multi_user_requires_admin_account() {
        let config = AuthConfig {
            mode: AuthMode::MultiUser,
            password_hash: None,
            admin_accounts: Vec::new(),
            version: 1,
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn multi_user_rejects_duplicate_usernames() {
        let credential = CredentialHash::derive("password123", TEST_ITERATIONS);
        let config = AuthConfig {
            mode: AuthMode::MultiUser,
            password_hash: None,
            admin_accounts: vec![
                AdminAccount {
                    username: "Admin".into(),
                    credential: credential.clone(),
                },
                AdminAccount {
                    username: "admin".into(),
                    credential,
                },
            ],
            version: 1,
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn constant_time_eq_works() {
        assert!(constant_time_eq(b"hello", b"hello"));
        assert!(!constant_time_eq(b"hello", b"world"));
        assert!(!constant_time_eq(b"short", b"longer"));
    }
}
