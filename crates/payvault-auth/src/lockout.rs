//! Lockout policy for repeated login failures
//!
//! Five consecutive failures lock the account. A locked account refuses
//! every candidate, including the correct password, until one of:
//!
//! - a successful password reset
//! - an explicit administrative unlock
//! - the optional auto-unlock window elapsing (disabled by default)

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::clock;

/// Consecutive failures that lock an account
pub const DEFAULT_LOCKOUT_THRESHOLD: u32 = 5;

/// Lockout policy
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LockoutPolicy {
    /// Consecutive failures before the account locks
    pub threshold: u32,
    /// Minutes after which a lock clears itself on the next attempt
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_unlock_after_minutes: Option<u64>,
}

impl Default for LockoutPolicy {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_LOCKOUT_THRESHOLD,
            auto_unlock_after_minutes: None,
        }
    }
}

impl LockoutPolicy {
    /// Create a strict policy (fewer attempts, never auto-unlocks)
    pub fn strict() -> Self {
        Self {
            threshold: 3,
            auto_unlock_after_minutes: None,
        }
    }

    /// Create a policy whose locks clear after the given number of minutes
    pub fn with_auto_unlock(minutes: u64) -> Self {
        Self {
            auto_unlock_after_minutes: Some(minutes),
            ..Default::default()
        }
    }

    /// Check if the failure count locks the account
    pub fn is_locked(&self, failed_attempts: u32) -> bool {
        failed_attempts >= self.threshold
    }

    /// Attempts left before the account locks
    pub fn attempts_remaining(&self, failed_attempts: u32) -> u32 {
        self.threshold.saturating_sub(failed_attempts)
    }

    /// Auto-unlock window, if the policy has one
    pub fn auto_unlock_after(&self) -> Option<Duration> {
        self.auto_unlock_after_minutes.map(clock::minutes)
    }

    /// Human-readable description of the lockout state
    pub fn describe(&self, failed_attempts: u32) -> String {
        if !self.is_locked(failed_attempts) {
            return format!(
                "{} attempts remaining",
                self.attempts_remaining(failed_attempts)
            );
        }

        match self.auto_unlock_after_minutes {
            Some(minutes) if minutes < 60 => format!("Locked for {} minutes", minutes),
            Some(minutes) => format!("Locked for {} hours", minutes / 60),
            None => "Locked until the password is reset or an administrator unlocks it"
                .to_string(),
        }
    }
}
