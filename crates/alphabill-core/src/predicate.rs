//! Predicate scripts and owner proofs
//!
//! Bearer predicates lock a unit to a public-key hash; an owner proof is the
//! matching predicate argument carrying a recoverable secp256k1 signature and
//! the signer's compressed public key.

use crate::keys::{KeyPair, PUBLIC_KEY_LENGTH};
use crate::{Error, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use secp256k1::ecdsa::{RecoverableSignature, RecoveryId, Signature};
use secp256k1::{Message, PublicKey, Secp256k1, SecretKey};

/// Script start marker
pub const START_BYTE: u8 = 0x53;
/// Push boolean
pub const OP_PUSH_BOOL: u8 = 0x51;
/// Push hash
pub const OP_PUSH_HASH: u8 = 0x4f;
/// Push public key
pub const OP_PUSH_PUB_KEY: u8 = 0x55;
/// Push signature
pub const OP_PUSH_SIG: u8 = 0x54;
/// Duplicate top of stack
pub const OP_DUP: u8 = 0x76;
/// Hash top of stack
pub const OP_HASH: u8 = 0xa8;
/// Fail unless top of stack is true
pub const OP_VERIFY: u8 = 0x69;
/// Compare top two stack items
pub const OP_EQUAL: u8 = 0x87;
/// Check signature against public key
pub const OP_CHECKSIG: u8 = 0xac;
/// secp256k1 signature scheme id
pub const SIG_SCHEME_SECP256K1: u8 = 0x01;
/// SHA-256 hash algorithm id
pub const HASH_ALG_SHA256: u8 = 0x01;

/// Compact signature plus recovery id
pub const SIGNATURE_LENGTH: usize = 65;

/// Length of an encoded owner proof script
pub const OWNER_PROOF_LENGTH: usize = 3 + SIGNATURE_LENGTH + 2 + PUBLIC_KEY_LENGTH;

/// Length of a pay-to-public-key-hash bearer predicate
pub const P2PKH_LENGTH: usize = 6 + 32 + 4;

/// Signature and public key authorizing the spend of one unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnerProof {
    /// `r || s || recovery_id`
    pub signature: [u8; SIGNATURE_LENGTH],
    /// Compressed signer public key
    pub public_key: [u8; PUBLIC_KEY_LENGTH],
}

impl OwnerProof {
    /// Encode as predicate argument script
    pub fn to_script(&self) -> Vec<u8> {
        build_predicate_script(&self.signature, &self.public_key)
    }

    /// Base64 of the script bytes, as sent to the backend
    pub fn to_transport(&self) -> String {
        STANDARD.encode(self.to_script())
    }

    /// Parse a predicate argument script
    pub fn from_script(script: &[u8]) -> Result<Self> {
        if script.len() != OWNER_PROOF_LENGTH {
            return Err(Error::InvalidTransaction(format!(
                "Owner proof must be {} bytes, got {}",
                OWNER_PROOF_LENGTH,
                script.len()
            )));
        }
        let sig_end = 3 + SIGNATURE_LENGTH;
        if script[..3] != [START_BYTE, OP_PUSH_SIG, SIG_SCHEME_SECP256K1]
            || script[sig_end..sig_end + 2] != [OP_PUSH_PUB_KEY, SIG_SCHEME_SECP256K1]
        {
            return Err(Error::InvalidTransaction(
                "Unrecognized owner proof op-codes".to_string(),
            ));
        }

        let mut signature = [0u8; SIGNATURE_LENGTH];
        signature.copy_from_slice(&script[3..sig_end]);
        let mut public_key = [0u8; PUBLIC_KEY_LENGTH];
        public_key.copy_from_slice(&script[sig_end + 2..]);

        Ok(Self {
            signature,
            public_key,
        })
    }

    /// Decode from the base64 transport form
    pub fn from_transport(encoded: &str) -> Result<Self> {
        let script = STANDARD
            .decode(encoded)
            .map_err(|e| Error::InvalidTransaction(format!("Owner proof is not base64: {e}")))?;
        Self::from_script(&script)
    }

    /// Check the proof signs `message_hash`
    pub fn verify(&self, message_hash: &[u8]) -> bool {
        verify(&self.signature, message_hash, &self.public_key)
    }
}

/// `[START, PUSH_SIG, scheme, sig(65), PUSH_PUBKEY, scheme, pubkey(33)]`
pub fn build_predicate_script(signature: &[u8; SIGNATURE_LENGTH], public_key: &[u8; PUBLIC_KEY_LENGTH]) -> Vec<u8> {
    let mut script = Vec::with_capacity(OWNER_PROOF_LENGTH);
    script.extend_from_slice(&[START_BYTE, OP_PUSH_SIG, SIG_SCHEME_SECP256K1]);
    script.extend_from_slice(signature);
    script.extend_from_slice(&[OP_PUSH_PUB_KEY, SIG_SCHEME_SECP256K1]);
    script.extend_from_slice(public_key);
    script
}

/// Bearer predicate locking a unit to `SHA-256(pubkey) == pub_key_hash`
pub fn pay_to_public_key_hash(pub_key_hash: &[u8; 32]) -> Vec<u8> {
    let mut script = Vec::with_capacity(P2PKH_LENGTH);
    script.extend_from_slice(&[
        START_BYTE,
        OP_DUP,
        OP_HASH,
        HASH_ALG_SHA256,
        OP_PUSH_HASH,
        HASH_ALG_SHA256,
    ]);
    script.extend_from_slice(pub_key_hash);
    script.extend_from_slice(&[OP_EQUAL, OP_VERIFY, OP_CHECKSIG, SIG_SCHEME_SECP256K1]);
    script
}

/// Predicate anyone can satisfy
pub fn always_true() -> Vec<u8> {
    vec![START_BYTE, OP_PUSH_BOOL, 0x01]
}

/// Extract the locked public-key hash from a pay-to-public-key-hash predicate
pub fn extract_pub_key_hash(predicate: &[u8]) -> Option<[u8; 32]> {
    if predicate.len() != P2PKH_LENGTH || predicate[..6] != pay_to_public_key_hash(&[0u8; 32])[..6] {
        return None;
    }
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&predicate[6..38]);
    Some(hash)
}

/// Deterministic (RFC 6979) compact ECDSA signature with recovery id
pub fn sign(message_hash: &[u8], private_key: &[u8]) -> Result<([u8; 64], u8)> {
    let secp = Secp256k1::signing_only();
    let message = Message::from_slice(message_hash)
        .map_err(|e| Error::InvalidTransaction(format!("Message must be a 32-byte hash: {e}")))?;
    let secret = SecretKey::from_slice(private_key)
        .map_err(|e| Error::InvalidKey(format!("Invalid private key: {e}")))?;

    let (recovery_id, compact) = secp
        .sign_ecdsa_recoverable(&message, &secret)
        .serialize_compact();

    // recovery ids are 0..=3
    Ok((compact, recovery_id.to_i32() as u8))
}

/// Verify a 64- or 65-byte signature over `message_hash`
pub fn verify(signature: &[u8], message_hash: &[u8], public_key: &[u8]) -> bool {
    if signature.len() != 64 && signature.len() != SIGNATURE_LENGTH {
        return false;
    }
    let secp = Secp256k1::verification_only();
    let (Ok(message), Ok(signature), Ok(key)) = (
        Message::from_slice(message_hash),
        Signature::from_compact(&signature[..64]),
        PublicKey::from_slice(public_key),
    ) else {
        return false;
    };
    secp.verify_ecdsa(&message, &signature, &key).is_ok()
}

/// Recover the compressed public key from a 65-byte signature
pub fn recover_public_key(signature: &[u8], message_hash: &[u8]) -> Result<[u8; PUBLIC_KEY_LENGTH]> {
    if signature.len() != SIGNATURE_LENGTH {
        return Err(Error::SignatureInvalid(format!(
            "Recoverable signature must be {} bytes",
            SIGNATURE_LENGTH
        )));
    }
    let recovery_id = RecoveryId::from_i32(i32::from(signature[64]))
        .map_err(|e| Error::SignatureInvalid(e.to_string()))?;
    let recoverable = RecoverableSignature::from_compact(&signature[..64], recovery_id)
        .map_err(|e| Error::SignatureInvalid(e.to_string()))?;
    let message = Message::from_slice(message_hash)
        .map_err(|e| Error::SignatureInvalid(e.to_string()))?;

    Secp256k1::verification_only()
        .recover_ecdsa(&message, &recoverable)
        .map(|key| key.serialize())
        .map_err(|e| Error::SignatureInvalid(e.to_string()))
}

/// Sign `message_hash` and wrap the result as an owner proof.
///
/// The signature is verified before it is returned; a failure means the key
/// material is corrupt and the transaction must not be submitted.
pub fn create_owner_proof(message_hash: &[u8; 32], key: &KeyPair) -> Result<OwnerProof> {
    let (compact, recovery_id) = sign(message_hash, key.private_key())?;

    let mut signature = [0u8; SIGNATURE_LENGTH];
    signature[..64].copy_from_slice(&compact);
    signature[64] = recovery_id;

    if !verify(&signature, message_hash, key.public_key()) {
        tracing::error!("Freshly created signature failed verification");
        return Err(Error::SignatureInvalid(
            "Signature does not verify against the signing key".to_string(),
        ));
    }

    Ok(OwnerProof {
        signature,
        public_key: *key.public_key(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::derive_key;
    use sha2::{Digest, Sha256};

    const TEST_MNEMONIC: &str =
        "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    fn hash(data: &[u8]) -> [u8; 32] {
        Sha256::digest(data).into()
    }

    #[test]
    fn test_sign_verify() {
        let key = derive_key(TEST_MNEMONIC, 0).unwrap();
        let msg = hash(b"transfer");
        let (sig, _) = sign(&msg, key.private_key()).unwrap();

        assert!(verify(&sig, &msg, key.public_key()));
        assert!(!verify(&sig, &hash(b"other"), key.public_key()));

        let other = derive_key(TEST_MNEMONIC, 1).unwrap();
        assert!(!verify(&sig, &msg, other.public_key()));
    }

    #[test]
    fn test_signing_is_deterministic() {
        let key = derive_key(TEST_MNEMONIC, 0).unwrap();
        let msg = hash(b"same message");
        assert_eq!(
            sign(&msg, key.private_key()).unwrap(),
            sign(&msg, key.private_key()).unwrap()
        );
    }

    #[test]
    fn test_owner_proof_script_layout() {
        let key = derive_key(TEST_MNEMONIC, 0).unwrap();
        let proof = create_owner_proof(&hash(b"tx"), &key).unwrap();
        let script = proof.to_script();

        assert_eq!(script.len(), 103);
        assert_eq!(&script[..3], &[0x53, 0x54, 0x01]);
        assert_eq!(&script[68..70], &[0x55, 0x01]);
        assert_eq!(&script[70..], key.public_key());
        assert_eq!(OwnerProof::from_script(&script).unwrap(), proof);
        assert_eq!(OwnerProof::from_transport(&proof.to_transport()).unwrap(), proof);
    }

    #[test]
    fn test_recover_public_key() {
        let key = derive_key(TEST_MNEMONIC, 2).unwrap();
        let msg = hash(b"recover me");
        let proof = create_owner_proof(&msg, &key).unwrap();
        assert_eq!(&recover_public_key(&proof.signature, &msg).unwrap(), key.public_key());
    }

    #[test]
    fn test_bearer_predicate() {
        let key = derive_key(TEST_MNEMONIC, 0).unwrap();
        let predicate = pay_to_public_key_hash(&key.pub_key_hash());
        assert_eq!(predicate.len(), 42);
        assert_eq!(predicate[0], START_BYTE);
        assert_eq!(extract_pub_key_hash(&predicate), Some(key.pub_key_hash()));
        assert_eq!(extract_pub_key_hash(&always_true()), None);
    }

    #[test]
    fn test_malformed_inputs() {
        assert!(!verify(&[0u8; 10], &[0u8; 32], &[2u8; 33]));
        assert!(OwnerProof::from_script(&[0u8; OWNER_PROOF_LENGTH]).is_err());
        assert!(sign(&[1u8; 31], &[1u8; 32]).is_err());
    }
}
