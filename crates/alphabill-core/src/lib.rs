//! Alphabill wallet core
//!
//! This crate implements the wallet vault and transaction signing engine:
//! password-encrypted key storage, BIP-32 account derivation, bill selection,
//! canonical transaction hashing, owner proofs and proof verification.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod bill;
pub mod error;
pub mod fees;
pub mod keys;
pub mod predicate;
pub mod proof;
pub mod selection;
pub mod transaction;
pub mod vault;
pub mod wallet;

pub use bill::{total_value, Bill, NATIVE_TYPE_ID};
pub use error::{Error, ErrorCategory, Result};
pub use fees::{FeeCalculator, DEFAULT_FEE_PER_BILL, MAX_FEE_PER_BILL};
pub use keys::{derive_key, derive_key_for_network, generate_mnemonic, KeyPair, PUBLIC_KEY_LENGTH};
pub use predicate::{
    always_true, create_owner_proof, pay_to_public_key_hash, OwnerProof, OWNER_PROOF_LENGTH,
};
pub use proof::{HashChainItem, TransactionProof};
pub use selection::{BillSelector, SelectionResult};
pub use transaction::{
    dc_nonce, ClientMetadata, TransactionAttributes, TransactionBuilder, TransactionOrder,
    TransactionPayload,
};
pub use vault::{EncryptedVault, VaultCipher, VaultContents, VaultKey, DEFAULT_ACCOUNT_ALIAS};
pub use wallet::{AccountInfo, VaultSession};
