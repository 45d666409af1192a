//! Password strength rules
//!
//! A password is accepted only when it meets every rule at once:
//! at least [`MIN_PASSWORD_LENGTH`] characters, one ASCII uppercase letter,
//! one ASCII lowercase letter, one digit, and one symbol (any character
//! outside `[A-Za-z0-9]`).

use std::fmt;

/// Minimum password length, in characters
pub const MIN_PASSWORD_LENGTH: usize = 8;

const REQUIREMENTS: &str = "Password must be at least 8 characters long and contain \
at least one uppercase letter, one lowercase letter, one digit, and one special character";

/// A single unmet password rule
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PolicyViolation {
    /// Fewer than [`MIN_PASSWORD_LENGTH`] characters
    TooShort,
    /// No uppercase letter
    MissingUppercase,
    /// No lowercase letter
    MissingLowercase,
    /// No digit
    MissingDigit,
    /// No character outside the alphanumeric set
    MissingSymbol,
}

impl fmt::Display for PolicyViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolicyViolation::TooShort => {
                write!(f, "must be at least {} characters long", MIN_PASSWORD_LENGTH)
            }
            PolicyViolation::MissingUppercase => write!(f, "must contain an uppercase letter"),
            PolicyViolation::MissingLowercase => write!(f, "must contain a lowercase letter"),
            PolicyViolation::MissingDigit => write!(f, "must contain a digit"),
            PolicyViolation::MissingSymbol => write!(f, "must contain a special character"),
        }
    }
}

/// List every rule the candidate fails; empty means acceptable
pub fn check_password(candidate: &str) -> Vec<PolicyViolation> {
    let mut violations = Vec::new();

    if candidate.chars().count() < MIN_PASSWORD_LENGTH {
        violations.push(PolicyViolation::TooShort);
    }
    if !candidate.chars().any(|c| c.is_ascii_uppercase()) {
        violations.push(PolicyViolation::MissingUppercase);
    }
    if !candidate.chars().any(|c| c.is_ascii_lowercase()) {
        violations.push(PolicyViolation::MissingLowercase);
    }
    if !candidate.chars().any(|c| c.is_ascii_digit()) {
        violations.push(PolicyViolation::MissingDigit);
    }
    if !candidate.chars().any(|c| !c.is_ascii_alphanumeric()) {
        violations.push(PolicyViolation::MissingSymbol);
    }

    violations
}

/// Whether the candidate satisfies every rule
pub fn is_password_valid(candidate: &str) -> bool {
    check_password(candidate).is_empty()
}

/// Human-readable description of the rules
pub fn password_requirements() -> &'static str {
    REQUIREMENTS
}
