//! Key derivation and management
//!
//! Implements BIP-39 seed generation and BIP-32/BIP-44 derivation of
//! secp256k1 account keys along `m/44'/634'/{index}'/0/0`.

use crate::{Error, Result};
use alphabill_params::Network;
use bip32::{DerivationPath, XPrv};
use bip39::{Language, Mnemonic};
use rand::RngCore;
use secp256k1::{PublicKey, Secp256k1, SecretKey};
use sha2::{Digest, Sha256};
use std::fmt;
use zeroize::Zeroizing;

/// Compressed secp256k1 public key length
pub const PUBLIC_KEY_LENGTH: usize = 33;

/// Private key length
pub const PRIVATE_KEY_LENGTH: usize = 32;

/// secp256k1 key pair for one account.
///
/// The private half is wiped when the pair is dropped.
pub struct KeyPair {
    private_key: Zeroizing<[u8; PRIVATE_KEY_LENGTH]>,
    public_key: [u8; PUBLIC_KEY_LENGTH],
}

impl KeyPair {
    /// Build a key pair from raw private key bytes
    pub fn from_private_key(bytes: &[u8]) -> Result<Self> {
        let secret = SecretKey::from_slice(bytes)
            .map_err(|e| Error::InvalidKey(format!("Invalid private key: {e}")))?;
        let public = PublicKey::from_secret_key(&Secp256k1::signing_only(), &secret);

        let mut private_key = Zeroizing::new([0u8; PRIVATE_KEY_LENGTH]);
        private_key.copy_from_slice(bytes);

        Ok(Self {
            private_key,
            public_key: public.serialize(),
        })
    }

    /// Raw private key bytes
    pub fn private_key(&self) -> &[u8; PRIVATE_KEY_LENGTH] {
        &self.private_key
    }

    /// Compressed public key
    pub fn public_key(&self) -> &[u8; PUBLIC_KEY_LENGTH] {
        &self.public_key
    }

    /// Hex-encoded compressed public key
    pub fn public_key_hex(&self) -> String {
        hex::encode(self.public_key)
    }

    /// SHA-256 of the compressed public key, used in bearer predicates
    pub fn pub_key_hash(&self) -> [u8; 32] {
        pub_key_hash(&self.public_key)
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("public_key", &self.public_key_hex())
            .field("private_key", &"<redacted>")
            .finish()
    }
}

/// SHA-256 of a compressed public key
pub fn pub_key_hash(public_key: &[u8]) -> [u8; 32] {
    Sha256::digest(public_key).into()
}

/// Decode and validate a hex-encoded compressed public key
pub fn public_key_from_hex(encoded: &str) -> Result<[u8; PUBLIC_KEY_LENGTH]> {
    let bytes = hex::decode(encoded.trim_start_matches("0x"))
        .map_err(|_| Error::InvalidKey("Invalid hex encoding".to_string()))?;
    let key = PublicKey::from_slice(&bytes)
        .map_err(|e| Error::InvalidKey(format!("Invalid public key: {e}")))?;
    Ok(key.serialize())
}

/// Parse and normalize an English BIP-39 phrase
pub fn parse_mnemonic(mnemonic: &str) -> Result<Mnemonic> {
    Mnemonic::parse_in_normalized(Language::English, mnemonic.trim())
        .map_err(|e| Error::InvalidMnemonic(e.to_string()))
}

/// Generate new random mnemonic
///
/// # Arguments
/// * `word_count` - Number of words in mnemonic (12 or 24). Defaults to 12.
pub fn generate_mnemonic(word_count: Option<u32>) -> Result<String> {
    let entropy_size = match word_count.unwrap_or(12) {
        12 => 16,
        24 => 32,
        other => {
            return Err(Error::InvalidMnemonic(format!(
                "Unsupported word count {other}, expected 12 or 24"
            )))
        }
    };

    let mut entropy = Zeroizing::new(vec![0u8; entropy_size]);
    rand::thread_rng().fill_bytes(&mut entropy);

    let mnemonic = Mnemonic::from_entropy(&entropy)
        .map_err(|e| Error::InvalidMnemonic(e.to_string()))?;
    Ok(mnemonic.to_string())
}

/// Derive the key pair for an account index on mainnet parameters
pub fn derive_key(mnemonic: &str, index: u32) -> Result<KeyPair> {
    derive_key_for_network(mnemonic, index, &Network::mainnet())
}

/// Derive the key pair for an account index.
///
/// seed = BIP-39 seed (empty passphrase), child = `m/44'/coin'/{index}'/0/0`.
pub fn derive_key_for_network(mnemonic: &str, index: u32, network: &Network) -> Result<KeyPair> {
    let mnemonic = parse_mnemonic(mnemonic)?;
    let seed = Zeroizing::new(mnemonic.to_seed(""));

    let path: DerivationPath = network
        .derivation_path(index)
        .parse()
        .map_err(|e| Error::KeyDerivation(format!("Invalid derivation path: {e}")))?;

    let child = XPrv::derive_from_path(&seed[..], &path)
        .map_err(|e| Error::KeyDerivation(e.to_string()))?;
    let private_key = Zeroizing::new(child.to_bytes());

    tracing::debug!("Derived account key at index {}", index);

    KeyPair::from_private_key(&private_key[..])
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_MNEMONIC: &str =
        "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    #[test]
    fn test_generate_mnemonic() {
        let mnemonic = generate_mnemonic(None).unwrap();
        assert_eq!(mnemonic.split_whitespace().count(), 12);
        let long = generate_mnemonic(Some(24)).unwrap();
        assert_eq!(long.split_whitespace().count(), 24);
        assert!(generate_mnemonic(Some(13)).is_err());
    }

    #[test]
    fn test_derive_is_deterministic() {
        let a = derive_key(TEST_MNEMONIC, 0).unwrap();
        let b = derive_key(TEST_MNEMONIC, 0).unwrap();
        assert_eq!(a.public_key(), b.public_key());
        assert_eq!(a.private_key(), b.private_key());
    }

    #[test]
    fn test_known_account_key() {
        // m/44'/634'/0'/0/0 of the all-"abandon" phrase
        let pair = derive_key(TEST_MNEMONIC, 0).unwrap();
        assert_eq!(
            pair.public_key_hex(),
            "02c1d52fd398fa7827b2f05bb1be2c37f3ec16322f416ed7b63dd2b17bf997389f"
        );
    }

    #[test]
    fn test_indices_differ() {
        let a = derive_key(TEST_MNEMONIC, 0).unwrap();
        let b = derive_key(TEST_MNEMONIC, 1).unwrap();
        assert_ne!(a.public_key(), b.public_key());
    }

    #[test]
    fn test_public_key_is_compressed() {
        let pair = derive_key(TEST_MNEMONIC, 0).unwrap();
        assert!(matches!(pair.public_key()[0], 0x02 | 0x03));
        assert_eq!(public_key_from_hex(&pair.public_key_hex()).unwrap(), *pair.public_key());
    }

    #[test]
    fn test_invalid_mnemonic() {
        assert!(matches!(
            derive_key("not a valid phrase", 0),
            Err(Error::InvalidMnemonic(_))
        ));
    }

    #[test]
    fn test_debug_redacts_private_key() {
        let pair = derive_key(TEST_MNEMONIC, 0).unwrap();
        let rendered = format!("{pair:?}");
        assert!(rendered.contains("<redacted>"));
        assert!(!rendered.contains(&hex::encode(pair.private_key())));
    }
}
