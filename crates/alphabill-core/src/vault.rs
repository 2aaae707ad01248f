//! Password-encrypted vault
//!
//! The vault holds the mnemonic and the list of account keys. It is sealed
//! with AES-256-GCM under a PBKDF2-HMAC-SHA256 key; the 16-byte IV is the
//! prefix of SHA-256(password || salt). A fresh salt is drawn on every
//! encryption, so key and IV never repeat across writes.

use crate::keys::parse_mnemonic;
use crate::{Error, Result};
use aes_gcm::aead::consts::U16;
use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::aes::Aes256;
use aes_gcm::{AesGcm, Nonce};
use alphabill_params::{KdfParams, IV_LENGTH};
use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use zeroize::{Zeroize, Zeroizing};

/// Alias given to the account created together with the vault
pub const DEFAULT_ACCOUNT_ALIAS: &str = "Account 1";

/// AES-256-GCM with a 16-byte nonce
type VaultAesGcm = AesGcm<Aes256, U16>;

/// One derived account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultKey {
    /// User-visible account name
    pub alias: String,
    /// BIP-44 account index
    pub index: u32,
}

/// Decrypted vault contents
#[derive(Clone, Serialize, Deserialize)]
pub struct VaultContents {
    mnemonic: String,
    keys: Vec<VaultKey>,
}

impl VaultContents {
    /// New contents with a single default account at index 0
    pub fn new(mnemonic: &str) -> Result<Self> {
        let normalized = parse_mnemonic(mnemonic)?.to_string();
        Ok(Self {
            mnemonic: normalized,
            keys: vec![VaultKey {
                alias: DEFAULT_ACCOUNT_ALIAS.to_string(),
                index: 0,
            }],
        })
    }

    /// Recovery phrase
    pub fn mnemonic(&self) -> &str {
        &self.mnemonic
    }

    /// Accounts in creation order
    pub fn keys(&self) -> &[VaultKey] {
        &self.keys
    }

    /// Register a new account under the next free index
    pub fn add_key(&mut self, alias: &str) -> Result<VaultKey> {
        let alias = alias.trim();
        if alias.is_empty() {
            return Err(Error::InvalidAccount("Alias cannot be empty".to_string()));
        }
        if self.keys.iter().any(|k| k.alias == alias) {
            return Err(Error::InvalidAccount(format!(
                "Alias \"{alias}\" is already in use"
            )));
        }

        let index = match self.keys.iter().map(|k| k.index).max() {
            Some(max) => max
                .checked_add(1)
                .ok_or_else(|| Error::InvalidAccount("Account index overflow".to_string()))?,
            None => 0,
        };

        let key = VaultKey {
            alias: alias.to_string(),
            index,
        };
        self.keys.push(key.clone());
        Ok(key)
    }
}

impl Drop for VaultContents {
    fn drop(&mut self) {
        self.mnemonic.zeroize();
    }
}

impl std::fmt::Debug for VaultContents {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultContents")
            .field("mnemonic", &"<redacted>")
            .field("keys", &self.keys)
            .finish()
    }
}

/// Persisted vault: `{salt: hex, vault: hex}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedVault {
    /// Hex-encoded PBKDF2 salt
    pub salt: String,
    /// Hex-encoded AES-GCM ciphertext (tag appended)
    pub vault: String,
}

/// Seals and opens vaults with fixed KDF parameters
#[derive(Debug, Clone)]
pub struct VaultCipher {
    params: KdfParams,
}

impl VaultCipher {
    /// Cipher with validated KDF parameters
    pub fn new(params: KdfParams) -> Result<Self> {
        params.validate()?;
        Ok(Self { params })
    }

    /// Cipher with weak parameters so tests run quickly
    #[cfg(any(test, feature = "test-helpers"))]
    pub fn insecure_for_tests() -> Self {
        Self {
            params: KdfParams::insecure_for_tests(),
        }
    }

    /// KDF parameters in use
    pub fn params(&self) -> &KdfParams {
        &self.params
    }

    /// Create a vault for a mnemonic with one default account
    pub fn create(&self, mnemonic: &str, password: &str) -> Result<EncryptedVault> {
        let contents = VaultContents::new(mnemonic)?;
        self.seal(&contents, password)
    }

    /// Encrypt contents under a fresh salt
    pub fn seal(&self, contents: &VaultContents, password: &str) -> Result<EncryptedVault> {
        if password.is_empty() {
            return Err(Error::Encryption("Password cannot be empty".to_string()));
        }

        let mut salt = vec![0u8; self.params.salt_length];
        OsRng.fill_bytes(&mut salt);

        let plaintext = Zeroizing::new(serde_json::to_vec(contents)?);
        let ciphertext = self.encrypt_with_salt(&plaintext, password, &salt)?;

        tracing::debug!("Sealed vault with {} account(s)", contents.keys.len());

        Ok(EncryptedVault {
            salt: hex::encode(salt),
            vault: hex::encode(ciphertext),
        })
    }

    /// Decrypt a vault.
    ///
    /// A failed tag check, undecodable hex and unparsable JSON all map to
    /// [`Error::IncorrectPassword`].
    pub fn unlock(&self, password: &str, encrypted: &EncryptedVault) -> Result<VaultContents> {
        let salt = hex::decode(&encrypted.salt).map_err(|_| Error::IncorrectPassword)?;
        let ciphertext = hex::decode(&encrypted.vault).map_err(|_| Error::IncorrectPassword)?;

        let plaintext = self.decrypt_with_salt(&ciphertext, password, &salt)?;
        let contents: VaultContents = serde_json::from_slice(&plaintext).map_err(|_| {
            tracing::warn!("Vault decrypted but contents are unreadable");
            Error::IncorrectPassword
        })?;

        Ok(contents)
    }

    /// Re-encrypt an existing vault under a new password
    pub fn change_password(
        &self,
        encrypted: &EncryptedVault,
        old_password: &str,
        new_password: &str,
    ) -> Result<EncryptedVault> {
        let contents = self.unlock(old_password, encrypted)?;
        self.seal(&contents, new_password)
    }

    fn derive_key_iv(
        &self,
        password: &str,
        salt: &[u8],
    ) -> (Zeroizing<[u8; 32]>, [u8; IV_LENGTH]) {
        let mut key = Zeroizing::new([0u8; 32]);
        pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, self.params.iterations, &mut key[..]);

        let digest = Sha256::new()
            .chain_update(password.as_bytes())
            .chain_update(salt)
            .finalize();
        let mut iv = [0u8; IV_LENGTH];
        iv.copy_from_slice(&digest[..IV_LENGTH]);

        (key, iv)
    }

    fn encrypt_with_salt(&self, plaintext: &[u8], password: &str, salt: &[u8]) -> Result<Vec<u8>> {
        let (key, iv) = self.derive_key_iv(password, salt);
        let cipher = VaultAesGcm::new_from_slice(&key[..])
            .map_err(|e| Error::Encryption(e.to_string()))?;
        cipher
            .encrypt(Nonce::<U16>::from_slice(&iv), plaintext)
            .map_err(|e| Error::Encryption(e.to_string()))
    }

    fn decrypt_with_salt(
        &self,
        ciphertext: &[u8],
        password: &str,
        salt: &[u8],
    ) -> Result<Zeroizing<Vec<u8>>> {
        let (key, iv) = self.derive_key_iv(password, salt);
        let cipher = VaultAesGcm::new_from_slice(&key[..]).map_err(|_| Error::IncorrectPassword)?;
        cipher
            .decrypt(Nonce::<U16>::from_slice(&iv), ciphertext)
            .map(Zeroizing::new)
            .map_err(|_| Error::IncorrectPassword)
    }
}

impl Default for VaultCipher {
    fn default() -> Self {
        Self {
            params: KdfParams::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_MNEMONIC: &str =
        "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    #[test]
    fn test_create_and_unlock() {
        let cipher = VaultCipher::insecure_for_tests();
        let encrypted = cipher.create(TEST_MNEMONIC, "hunter22").unwrap();
        let contents = cipher.unlock("hunter22", &encrypted).unwrap();

        assert_eq!(contents.mnemonic(), TEST_MNEMONIC);
        assert_eq!(contents.keys().len(), 1);
        assert_eq!(contents.keys()[0].index, 0);
        assert_eq!(contents.keys()[0].alias, DEFAULT_ACCOUNT_ALIAS);
    }

    #[test]
    fn test_wrong_password() {
        let cipher = VaultCipher::insecure_for_tests();
        let encrypted = cipher.create(TEST_MNEMONIC, "hunter22").unwrap();
        assert!(matches!(
            cipher.unlock("hunter23", &encrypted),
            Err(Error::IncorrectPassword)
        ));
    }

    #[test]
    fn test_corrupt_data_looks_like_wrong_password() {
        let cipher = VaultCipher::insecure_for_tests();
        let mut encrypted = cipher.create(TEST_MNEMONIC, "hunter22").unwrap();
        let mut raw = hex::decode(&encrypted.vault).unwrap();
        raw[0] ^= 0x01;
        encrypted.vault = hex::encode(raw);
        assert!(matches!(
            cipher.unlock("hunter22", &encrypted),
            Err(Error::IncorrectPassword)
        ));

        let garbage = EncryptedVault {
            salt: "zz".to_string(),
            vault: "00".to_string(),
        };
        assert!(matches!(
            cipher.unlock("hunter22", &garbage),
            Err(Error::IncorrectPassword)
        ));
    }

    #[test]
    fn test_fresh_salt_per_seal() {
        let cipher = VaultCipher::insecure_for_tests();
        let a = cipher.create(TEST_MNEMONIC, "pw-one").unwrap();
        let b = cipher.create(TEST_MNEMONIC, "pw-one").unwrap();
        assert_ne!(a.salt, b.salt);
        assert_ne!(a.vault, b.vault);
        assert_eq!(hex::decode(&a.salt).unwrap().len(), 32);
    }

    #[test]
    fn test_add_key_assigns_next_index() {
        let mut contents = VaultContents::new(TEST_MNEMONIC).unwrap();
        let key = contents.add_key("Savings").unwrap();
        assert_eq!(key.index, 1);
        assert!(contents.add_key("Savings").is_err());
        assert!(contents.add_key("   ").is_err());
        assert_eq!(contents.keys().len(), 2);
    }

    #[test]
    fn test_change_password() {
        let cipher = VaultCipher::insecure_for_tests();
        let encrypted = cipher.create(TEST_MNEMONIC, "old-pass").unwrap();
        let rotated = cipher.change_password(&encrypted, "old-pass", "new-pass").unwrap();

        assert!(cipher.unlock("old-pass", &rotated).is_err());
        assert_eq!(cipher.unlock("new-pass", &rotated).unwrap().mnemonic(), TEST_MNEMONIC);
        assert!(matches!(
            cipher.change_password(&encrypted, "nope", "new-pass"),
            Err(Error::IncorrectPassword)
        ));
    }

    #[test]
    fn test_invalid_mnemonic_rejected() {
        let cipher = VaultCipher::insecure_for_tests();
        assert!(matches!(
            cipher.create("one two three", "pw"),
            Err(Error::InvalidMnemonic(_))
        ));
    }

    const KNOWN_CIPHERTEXT: &str = concat!(
        "ffc0208503e2914fb79f0b88bd9d50712e5457e99b6970ab6c208688db6b43d8",
        "54fa6f68cf84ea9a02d363901d69251251394833a117f8d1fb57cfddffa2a142",
        "756ef7be94dd1a0af905b7a74e39251ccc2ceaaa3b9b7d52c7aed07a43d8f70a",
        "ba5d7d13d1a1bde419af0fa0e8aebb217dae64e2fa520b71babd7edefc0698ec",
        "f987082d952795734505baf4dbf93503de10393575687f3ca5d31ef83326e887",
        "2055f8e9ab",
    );

    #[test]
    fn test_known_vault_ciphertext() {
        let cipher = VaultCipher::default();
        let salt: Vec<u8> = (0u8..32).collect();
        let password = "correct horse battery staple";

        let plaintext = serde_json::to_vec(&VaultContents::new(TEST_MNEMONIC).unwrap()).unwrap();
        assert_eq!(
            String::from_utf8(plaintext.clone()).unwrap(),
            format!(r#"{{"mnemonic":"{TEST_MNEMONIC}","keys":[{{"alias":"Account 1","index":0}}]}}"#)
        );

        let ciphertext = cipher.encrypt_with_salt(&plaintext, password, &salt).unwrap();
        assert_eq!(hex::encode(&ciphertext), KNOWN_CIPHERTEXT);

        let stored = EncryptedVault {
            salt: hex::encode(&salt),
            vault: KNOWN_CIPHERTEXT.to_string(),
        };
        let contents = cipher.unlock(password, &stored).unwrap();
        assert_eq!(contents.mnemonic(), TEST_MNEMONIC);
        assert_eq!(contents.keys()[0].alias, DEFAULT_ACCOUNT_ALIAS);
    }

    #[test]
    fn test_weak_params_rejected() {
        assert!(VaultCipher::new(KdfParams::insecure_for_tests()).is_err());
        assert!(VaultCipher::new(KdfParams::default()).is_ok());
    }
}
