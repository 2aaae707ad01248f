//! Transaction proof verification
//!
//! A proof ties a recorded transaction to a unit through the block tree hash
//! chain. The first chain item names the unit and carries
//! `SHA-256(primary_hash || hash_value)`.

use crate::bill::Bill;
use crate::keys::PUBLIC_KEY_LENGTH;
use crate::transaction::TransactionOrder;
use crate::{Error, Result};
use sha2::{Digest, Sha256};

/// One step of the block tree hash chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashChainItem {
    /// Unit id at this step
    pub val: Vec<u8>,
    /// Hash at this step
    pub hash: Vec<u8>,
}

/// Inclusion proof for one transaction, as returned by the backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionProof {
    /// Hash of the block header
    pub block_header_hash: Vec<u8>,
    /// Root over the block's transactions
    pub transactions_hash: Vec<u8>,
    /// Unit state hash after the transaction
    pub hash_value: Vec<u8>,
    /// Path from the unit to the block tree root
    pub block_tree_hash_chain: Vec<HashChainItem>,
    /// Serialized unicity certificate, treated as opaque
    pub unicity_certificate: Vec<u8>,
    /// The proven transaction
    pub tx: TransactionOrder,
}

impl TransactionProof {
    /// Canonical bytes, as embedded in swap transactions
    pub fn bytes(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&self.block_header_hash);
        buf.extend_from_slice(&self.transactions_hash);
        buf.extend_from_slice(&self.hash_value);
        for item in &self.block_tree_hash_chain {
            buf.extend_from_slice(&item.val);
            buf.extend_from_slice(&item.hash);
        }
        buf.extend_from_slice(&self.unicity_certificate);
        buf.extend_from_slice(&self.tx.bytes());
        buf
    }

    /// Minimal proof that verifies for `tx`
    #[cfg(any(test, feature = "test-helpers"))]
    pub fn for_tests(tx: TransactionOrder) -> Self {
        let hash_value = vec![0x11; 32];
        let item = HashChainItem {
            val: tx.payload.unit_id.clone(),
            hash: unit_hash(&tx.hash(), &hash_value).to_vec(),
        };
        Self {
            block_header_hash: vec![0x22; 32],
            transactions_hash: vec![0x33; 32],
            hash_value,
            block_tree_hash_chain: vec![item],
            unicity_certificate: Vec::new(),
            tx,
        }
    }
}

/// `SHA-256(primary_hash || hash_value)`
pub fn unit_hash(primary_hash: &[u8], hash_value: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(primary_hash);
    hasher.update(hash_value);
    hasher.finalize().into()
}

/// Check `proof` against the bill it spends and the account's public key.
///
/// Returns `None` when the proof holds, otherwise a message for the UI.
pub fn verify(
    proof: &TransactionProof,
    bill: &Bill,
    public_key: Option<&[u8; PUBLIC_KEY_LENGTH]>,
) -> Option<String> {
    let Some(public_key) = public_key else {
        return Some("Missing hashing keys".to_string());
    };

    let tx = &proof.tx;
    if tx.payload.unit_id != bill.id {
        return Some(format!(
            "Transaction unit {} does not match bill {}",
            hex::encode(&tx.payload.unit_id),
            bill.id_hex()
        ));
    }

    let Some(owner_proof) = &tx.owner_proof else {
        return Some("Transaction has no owner proof".to_string());
    };
    if owner_proof.public_key != *public_key {
        return Some("Owner proof was made with a different key".to_string());
    }
    if !owner_proof.verify(&tx.sig_hash()) {
        return Some("Owner proof signature is not valid".to_string());
    }

    let Some(first) = proof.block_tree_hash_chain.first() else {
        return Some("Block tree hash chain is empty".to_string());
    };
    if first.val != bill.id {
        return Some(format!(
            "Hash chain names unit {}, expected {}",
            hex::encode(&first.val),
            bill.id_hex()
        ));
    }
    if first.hash.as_slice() != unit_hash(&tx.hash(), &proof.hash_value).as_slice() {
        return Some("Unit hash does not match the hash chain".to_string());
    }

    None
}

/// [`verify`] as a `Result`, failing with [`Error::ProofMismatch`]
pub fn verify_or_err(
    proof: &TransactionProof,
    bill: &Bill,
    public_key: Option<&[u8; PUBLIC_KEY_LENGTH]>,
) -> Result<()> {
    if public_key.is_none() {
        return Err(Error::MissingHashingKeys(
            "No public key to verify the proof with".to_string(),
        ));
    }
    match verify(proof, bill, public_key) {
        None => Ok(()),
        Some(reason) => {
            tracing::warn!("Proof for bill {} rejected: {}", bill.id_hex(), reason);
            Err(Error::ProofMismatch(reason))
        }
    }
}
