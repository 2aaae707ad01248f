//! Error types for Alphabill Core
//!
//! Vault, selection and signing failures are returned as values so that form
//! code can attach a message to the offending field.

use std::fmt;

/// Result type
pub type Result<T> = std::result::Result<T, Error>;

/// Alphabill Core errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Vault could not be opened: wrong password or unreadable contents
    #[error("Incorrect password")]
    IncorrectPassword,

    /// Not enough spendable value for the requested amount
    #[error("Insufficient funds: {0}")]
    InsufficientFunds(String),

    /// No signing key is available for the requested account
    #[error("Missing hashing keys: {0}")]
    MissingHashingKeys(String),

    /// A freshly produced signature failed verification
    #[error("Signature invalid: {0}")]
    SignatureInvalid(String),

    /// Transaction proof does not match the local transaction
    #[error("Proof mismatch: {0}")]
    ProofMismatch(String),

    /// Invalid amount
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Amount overflow
    #[error("Amount overflow: {0}")]
    AmountOverflow(String),

    /// Invalid mnemonic
    #[error("Invalid mnemonic: {0}")]
    InvalidMnemonic(String),

    /// Invalid key
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Key derivation error
    #[error("Key derivation error: {0}")]
    KeyDerivation(String),

    /// Vault encryption error
    #[error("Encryption error: {0}")]
    Encryption(String),

    /// Account alias or index problem
    #[error("Invalid account: {0}")]
    InvalidAccount(String),

    /// Malformed transaction or attribute data
    #[error("Invalid transaction: {0}")]
    InvalidTransaction(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<alphabill_params::Error> for Error {
    fn from(e: alphabill_params::Error) -> Self {
        match e {
            alphabill_params::Error::InvalidKdf(_) => Error::Encryption(e.to_string()),
            _ => Error::Other(e.to_string()),
        }
    }
}

impl Error {
    /// Check if error is a user-facing error (vs internal error)
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            Error::IncorrectPassword
                | Error::InsufficientFunds(_)
                | Error::InvalidAmount(_)
                | Error::InvalidMnemonic(_)
                | Error::InvalidAccount(_)
        )
    }

    /// Get user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            Error::IncorrectPassword => "Incorrect password".to_string(),
            Error::InsufficientFunds(_) => {
                "Insufficient funds. Reduce the amount and try again.".to_string()
            }
            Error::InvalidAmount(_) => {
                "The amount is invalid. Please enter a valid amount.".to_string()
            }
            Error::InvalidMnemonic(_) => {
                "The recovery phrase is invalid. Please check and try again.".to_string()
            }
            Error::InvalidAccount(reason) => reason.clone(),
            Error::SignatureInvalid(_) => {
                "Transaction signing failed. The transaction was not sent.".to_string()
            }
            _ => self.to_string(),
        }
    }

    /// Form field the error should be attached to, if any
    pub fn field(&self) -> Option<&'static str> {
        match self {
            Error::IncorrectPassword | Error::Encryption(_) => Some("password"),
            Error::InsufficientFunds(_) | Error::InvalidAmount(_) | Error::AmountOverflow(_) => {
                Some("amount")
            }
            Error::InvalidMnemonic(_) => Some("mnemonic"),
            Error::InvalidAccount(_) => Some("alias"),
            _ => None,
        }
    }

    /// Get error category for logging
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::InsufficientFunds(_) | Error::InvalidAmount(_) | Error::AmountOverflow(_) => {
                ErrorCategory::Amount
            }
            Error::IncorrectPassword | Error::Encryption(_) => ErrorCategory::Vault,
            Error::InvalidMnemonic(_) | Error::InvalidAccount(_) => ErrorCategory::Vault,
            Error::MissingHashingKeys(_) | Error::InvalidKey(_) | Error::KeyDerivation(_) => {
                ErrorCategory::Keys
            }
            Error::SignatureInvalid(_) | Error::InvalidTransaction(_) => {
                ErrorCategory::Transaction
            }
            Error::ProofMismatch(_) => ErrorCategory::Proof,
            Error::Serialization(_) | Error::Other(_) => ErrorCategory::Internal,
        }
    }
}

/// Error categories for classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Amount-related errors
    Amount,
    /// Vault and password errors
    Vault,
    /// Key-related errors
    Keys,
    /// Transaction-related errors
    Transaction,
    /// Proof verification errors
    Proof,
    /// Internal/system errors
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::Amount => write!(f, "Amount"),
            ErrorCategory::Vault => write!(f, "Vault"),
            ErrorCategory::Keys => write!(f, "Keys"),
            ErrorCategory::Transaction => write!(f, "Transaction"),
            ErrorCategory::Proof => write!(f, "Proof"),
            ErrorCategory::Internal => write!(f, "Internal"),
        }
    }
}
