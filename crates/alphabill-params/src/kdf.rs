//! Vault key-derivation parameters

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// PBKDF2-HMAC-SHA256 iteration count used for vault keys
pub const PBKDF2_ITERATIONS: u32 = 129_531;

/// Random salt length in bytes
pub const SALT_LENGTH: usize = 32;

/// AES-GCM IV length in bytes (taken from SHA-256(password || salt))
pub const IV_LENGTH: usize = 16;

/// Password KDF parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfParams {
    /// PBKDF2 iteration count
    pub iterations: u32,
    /// Salt length in bytes
    pub salt_length: usize,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            iterations: PBKDF2_ITERATIONS,
            salt_length: SALT_LENGTH,
        }
    }
}

impl KdfParams {
    /// Reject parameters weaker than the persisted vault format allows
    pub fn validate(&self) -> Result<()> {
        if self.iterations < PBKDF2_ITERATIONS {
            return Err(Error::InvalidKdf(format!(
                "{} iterations is below the minimum {}",
                self.iterations, PBKDF2_ITERATIONS
            )));
        }
        if self.salt_length < SALT_LENGTH {
            return Err(Error::InvalidKdf(format!(
                "salt of {} bytes is shorter than {}",
                self.salt_length, SALT_LENGTH
            )));
        }
        Ok(())
    }

    /// Cheap parameters for unit tests only
    pub const fn insecure_for_tests() -> Self {
        Self {
            iterations: 1_000,
            salt_length: SALT_LENGTH,
        }
    }
}
