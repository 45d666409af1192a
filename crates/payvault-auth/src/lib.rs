//! Payvault Auth - authentication and session core for the Payvault payroll system
//!
//! This crate provides:
//! - Salted Argon2id credential hashing in a `salt:hash` text form
//! - Password policy checks
//! - Per-principal login state with lockout, sessions and password reset
//! - Role-based authorization checks
//!
//! Employee, payroll and leave records live in the data-access layer; this
//! crate reaches them only through [`store::CredentialStore`].
//!
//! # Security Model
//!
//! - Passwords are hashed with Argon2id (memory-hard) under a 16-byte random salt
//! - Hash and reset-token comparisons run in constant time
//! - Five consecutive failures lock the account until a password reset or unlock
//! - Sessions expire after a configurable idle timeout
//! - Reset tokens are single-use, time-limited, and held only as a SHA-256 digest
//! - Plaintext passwords, hashes and tokens are never logged

pub mod authz;
pub mod clock;
pub mod config;
pub mod error;
pub mod hasher;
pub mod lockout;
pub mod policy;
pub mod principal;
pub mod session;
pub mod store;

pub use authz::{is_admin, is_employee, Permission, Role};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{AuthConfig, ResetConfig, SessionConfig};
pub use error::{AuthError, Result};
pub use hasher::{CredentialHasher, HasherConfig};
pub use lockout::LockoutPolicy;
pub use policy::{is_password_valid, password_requirements, PolicyViolation};
pub use principal::{CredentialRecord, Principal, PrincipalId};
pub use session::{ActiveSession, AuthSession, AuthState};
pub use store::{CredentialStore, FileCredentialStore, InMemoryCredentialStore};
