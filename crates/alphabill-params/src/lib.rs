//! Alphabill network parameters and constants
//!
//! Partition identifiers, the BIP-44 coin type, transaction timeouts and
//! vault key-derivation parameters shared by the wallet crates.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod kdf;
pub mod network;

pub use kdf::{KdfParams, PBKDF2_ITERATIONS, SALT_LENGTH, IV_LENGTH};
pub use network::{Network, NetworkType, ALPHABILL_COIN_TYPE, MONEY_SYSTEM_ID, TOKENS_SYSTEM_ID};

/// Error types for parameter operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid network specified
    #[error("Invalid network: {0}")]
    InvalidNetwork(String),

    /// KDF parameters below the allowed minimum
    #[error("Invalid KDF parameters: {0}")]
    InvalidKdf(String),
}

/// Result type for parameter operations
pub type Result<T> = std::result::Result<T, Error>;
