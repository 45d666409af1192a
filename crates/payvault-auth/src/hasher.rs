//! Salted credential hashing
//!
//! Stored representations have the form `<salt>:<hash>`, where both parts
//! are standard padded base64 of fixed-length byte strings:
//!
//! - 16-byte random salt (24 characters)
//! - 32-byte Argon2id output (44 characters)
//!
//! The Argon2 cost parameters are not embedded in the representation, so a
//! hash must be verified with the same [`HasherConfig`] that produced it.

use argon2::{Algorithm, Argon2, Params, Version};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use rand::{rngs::OsRng, RngCore};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use crate::error::{AuthError, Result};

/// Salt length in bytes
pub const SALT_LEN: usize = 16;
/// Derived hash length in bytes
pub const HASH_LEN: usize = 32;
/// Separator between the salt and hash parts
pub const DELIMITER: char = ':';

/// Argon2id cost parameters
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HasherConfig {
    /// Memory cost in KiB
    pub memory_kib: u32,
    /// Number of passes
    pub iterations: u32,
    /// Degree of parallelism
    pub parallelism: u32,
}

impl Default for HasherConfig {
    fn default() -> Self {
        Self {
            memory_kib: 19 * 1024,
            iterations: 2,
            parallelism: 1,
        }
    }
}

impl HasherConfig {
    /// Cheap parameters for tests and fuzzing. Never use for stored credentials.
    pub fn low_cost() -> Self {
        Self {
            memory_kib: 256,
            iterations: 1,
            parallelism: 1,
        }
    }

    /// Build the Argon2 parameters, rejecting values the algorithm cannot use
    pub fn params(&self) -> Result<Params> {
        Params::new(
            self.memory_kib,
            self.iterations,
            self.parallelism,
            Some(HASH_LEN),
        )
        .map_err(|e| AuthError::Crypto(format!("Invalid Argon2 parameters: {}", e)))
    }
}

/// Turns plaintext passwords into salted representations and checks candidates against them
#[derive(Clone, Debug, Default)]
pub struct CredentialHasher {
    config: HasherConfig,
}

impl CredentialHasher {
    /// Create a hasher with the given cost parameters
    pub fn new(config: HasherConfig) -> Self {
        Self { config }
    }

    /// The cost parameters in use
    pub fn config(&self) -> &HasherConfig {
        &self.config
    }

    /// Generate a fresh random salt, base64 encoded
    pub fn generate_salt() -> String {
        let mut salt = [0u8; SALT_LEN];
        OsRng.fill_bytes(&mut salt);
        STANDARD.encode(salt)
    }

    /// Hash a password under a freshly generated salt
    pub fn hash_password(&self, plaintext: &str) -> Result<String> {
        self.hash_password_with_salt(plaintext, &Self::generate_salt())
    }

    /// Hash a password under a caller-supplied base64 salt
    pub fn hash_password_with_salt(&self, plaintext: &str, salt: &str) -> Result<String> {
        if plaintext.is_empty() {
            return Err(AuthError::InvalidInput("password must not be empty".to_string()));
        }

        let salt_bytes = decode_fixed::<SALT_LEN>(salt).ok_or_else(|| {
            AuthError::InvalidInput(format!(
                "salt must be base64 encoding {} bytes",
                SALT_LEN
            ))
        })?;

        let hash = self.derive(plaintext, &salt_bytes)?;
        Ok(format!(
            "{}{}{}",
            STANDARD.encode(salt_bytes),
            DELIMITER,
            STANDARD.encode(hash.as_slice())
        ))
    }

    /// Check a candidate password against a stored `salt:hash` representation
    ///
    /// Malformed representations never match. The final comparison runs in
    /// constant time.
    pub fn verify_password(&self, plaintext: &str, stored: &str) -> bool {
        let Some((salt, expected)) = parse_stored(stored) else {
            return false;
        };

        match self.derive(plaintext, &salt) {
            Ok(actual) => bool::from(actual.as_slice().ct_eq(expected.as_slice())),
            Err(e) => {
                tracing::warn!("Key derivation failed during verification: {}", e);
                false
            }
        }
    }

    fn derive(&self, plaintext: &str, salt: &[u8; SALT_LEN]) -> Result<Zeroizing<[u8; HASH_LEN]>> {
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, self.config.params()?);

        let password = Zeroizing::new(plaintext.as_bytes().to_vec());
        let mut out = Zeroizing::new([0u8; HASH_LEN]);
        argon2
            .hash_password_into(&password, salt, out.as_mut_slice())
            .map_err(|e| AuthError::Crypto(format!("Failed to hash password: {}", e)))?;

        Ok(out)
    }
}

/// Split a stored representation into its decoded salt and hash
///
/// Returns `None` for a missing or repeated delimiter, bad base64, or parts
/// that decode to the wrong length.
pub fn parse_stored(stored: &str) -> Option<([u8; SALT_LEN], [u8; HASH_LEN])> {
    let (salt, hash) = stored.split_once(DELIMITER)?;
    if hash.contains(DELIMITER) {
        return None;
    }
    Some((decode_fixed::<SALT_LEN>(salt)?, decode_fixed::<HASH_LEN>(hash)?))
}

fn decode_fixed<const N: usize>(encoded: &str) -> Option<[u8; N]> {
    if encoded.is_empty() {
        return None;
    }
    let bytes = STANDARD.decode(encoded).ok()?;
    bytes.try_into().ok()
}
