//! Configuration for the authentication core
//!
//! Loaded from TOML. Every field has a default, so a file only needs the
//! settings it changes:
//!
//! ```toml
//! utc_offset_hours = 8
//!
//! [lockout]
//! threshold = 5
//!
//! [session]
//! timeout_minutes = 30
//!
//! [reset]
//! token_ttl_minutes = 60
//! enforce_policy = true
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Duration, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::clock::{self, CANONICAL_OFFSET_HOURS};
use crate::error::{AuthError, Result};
use crate::hasher::HasherConfig;
use crate::lockout::LockoutPolicy;

/// Configuration file name
const CONFIG_FILE_NAME: &str = "auth.toml";

/// Configuration directory under the platform config dir
const CONFIG_DIR_NAME: &str = "payvault";

/// Longest configurable timeout or lifetime (one year)
const MAX_WINDOW_MINUTES: u64 = 365 * 24 * 60;

/// Session timeout settings
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Idle minutes after which a session is no longer valid
    pub timeout_minutes: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timeout_minutes: 30,
        }
    }
}

impl SessionConfig {
    pub fn timeout(&self) -> Duration {
        clock::minutes(self.timeout_minutes)
    }
}

/// Password-reset settings
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResetConfig {
    /// Minutes a reset token stays usable
    pub token_ttl_minutes: u64,
    /// Reject new passwords that fail the password policy
    pub enforce_policy: bool,
}

impl Default for ResetConfig {
    fn default() -> Self {
        Self {
            token_ttl_minutes: 60,
            enforce_policy: true,
        }
    }
}

impl ResetConfig {
    pub fn token_ttl(&self) -> Duration {
        clock::minutes(self.token_ttl_minutes)
    }
}

/// Complete authentication configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Fixed offset from UTC used for every timestamp
    pub utc_offset_hours: i32,
    pub lockout: LockoutPolicy,
    pub session: SessionConfig,
    pub reset: ResetConfig,
    pub hasher: HasherConfig,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            utc_offset_hours: CANONICAL_OFFSET_HOURS,
            lockout: LockoutPolicy::default(),
            session: SessionConfig::default(),
            reset: ResetConfig::default(),
            hasher: HasherConfig::default(),
        }
    }
}

impl AuthConfig {
    /// Create a stricter configuration for high-security deployments
    pub fn strict() -> Self {
        Self {
            lockout: LockoutPolicy::strict(),
            session: SessionConfig {
                timeout_minutes: 10,
            },
            reset: ResetConfig {
                token_ttl_minutes: 15,
                enforce_policy: true,
            },
            hasher: HasherConfig {
                memory_kib: 64 * 1024,
                iterations: 3,
                parallelism: 1,
            },
            ..Default::default()
        }
    }

    /// Create a more lenient configuration for development
    ///
    /// Uses cheap hashing parameters; hashes produced under it will not
    /// verify under the default configuration.
    pub fn development() -> Self {
        Self {
            lockout: LockoutPolicy::with_auto_unlock(5),
            session: SessionConfig {
                timeout_minutes: 240,
            },
            reset: ResetConfig {
                token_ttl_minutes: 24 * 60,
                enforce_policy: true,
            },
            hasher: HasherConfig::low_cost(),
            ..Default::default()
        }
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config = Self::from_toml_str(&contents)?;
        tracing::debug!("Loaded auth config from {:?}", path);
        Ok(config)
    }

    /// Load from the default location, falling back to defaults when the file is absent
    pub fn load_or_default() -> Result<Self> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Default config file path
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Serialize to TOML
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| AuthError::Config(e.to_string()))
    }

    /// Check internal consistency
    pub fn validate(&self) -> Result<()> {
        if self.lockout.threshold == 0 {
            return Err(AuthError::Config(
                "lockout.threshold must be at least 1".to_string(),
            ));
        }
        check_window("session.timeout_minutes", self.session.timeout_minutes)?;
        check_window("reset.token_ttl_minutes", self.reset.token_ttl_minutes)?;
        if let Some(minutes) = self.lockout.auto_unlock_after_minutes {
            check_window("lockout.auto_unlock_after_minutes", minutes)?;
        }
        self.hasher
            .params()
            .map_err(|e| AuthError::Config(format!("hasher: {}", e)))?;
        if clock::offset_from_hours(self.utc_offset_hours).is_none() {
            return Err(AuthError::Config(format!(
                "utc_offset_hours must be within ±23, got {}",
                self.utc_offset_hours
            )));
        }
        Ok(())
    }

    /// The fixed offset all timestamps use
    pub fn offset(&self) -> FixedOffset {
        clock::offset_from_hours(self.utc_offset_hours).unwrap_or_else(clock::canonical_offset)
    }
}

fn check_window(name: &str, minutes: u64) -> Result<()> {
    if minutes == 0 || minutes > MAX_WINDOW_MINUTES {
        return Err(AuthError::Config(format!(
            "{} must be between 1 and {}, got {}",
            name, MAX_WINDOW_MINUTES, minutes
        )));
    }
    Ok(())
}
