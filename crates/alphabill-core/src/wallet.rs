//! Wallet session over an encrypted vault.
//!
//! The session keeps the sealed vault and the public account listing only.
//! Every signing call unlocks the vault with the caller's password, derives
//! the account key, signs and drops both the mnemonic and the key before it
//! returns, so no decrypted secret outlives the call. The session is shared
//! as `Arc<VaultSession>`.

use crate::keys::{derive_key_for_network, pub_key_hash, KeyPair, PUBLIC_KEY_LENGTH};
use crate::predicate::{create_owner_proof, OwnerProof};
use crate::transaction::TransactionOrder;
use crate::vault::{EncryptedVault, VaultCipher, VaultContents, VaultKey};
use crate::{Error, Result};
use alphabill_params::Network;
use parking_lot::RwLock;

/// Public view of one account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountInfo {
    /// User-visible name
    pub alias: String,
    /// BIP-44 account index
    pub index: u32,
    /// Compressed public key
    pub public_key: [u8; PUBLIC_KEY_LENGTH],
}

impl AccountInfo {
    /// Hex-encoded public key
    pub fn public_key_hex(&self) -> String {
        hex::encode(self.public_key)
    }

    /// SHA-256 of the public key, the owner id used by the backend
    pub fn pub_key_hash(&self) -> [u8; 32] {
        pub_key_hash(&self.public_key)
    }
}

struct SessionState {
    open: bool,
    accounts: Vec<AccountInfo>,
    encrypted: EncryptedVault,
}

/// Wallet session over one vault
pub struct VaultSession {
    cipher: VaultCipher,
    network: Network,
    state: RwLock<SessionState>,
}

impl VaultSession {
    /// Check `password` against `encrypted` and list its accounts
    pub fn open(
        cipher: VaultCipher,
        encrypted: EncryptedVault,
        password: &str,
        network: Network,
    ) -> Result<Self> {
        let accounts = {
            let contents = cipher.unlock(password, &encrypted)?;
            account_infos(&contents, &network)?
        };

        tracing::info!("Vault session opened with {} accounts", accounts.len());

        Ok(Self {
            cipher,
            network,
            state: RwLock::new(SessionState {
                open: true,
                accounts,
                encrypted,
            }),
        })
    }

    /// Network the keys are derived for
    pub fn network(&self) -> &Network {
        &self.network
    }

    /// Whether the session still accepts signing calls
    pub fn is_open(&self) -> bool {
        self.state.read().open
    }

    /// All accounts in creation order
    pub fn accounts(&self) -> Vec<AccountInfo> {
        self.state.read().accounts.clone()
    }

    /// Account at BIP-44 `index`
    pub fn account(&self, index: u32) -> Result<AccountInfo> {
        self.state
            .read()
            .accounts
            .iter()
            .find(|a| a.index == index)
            .cloned()
            .ok_or_else(|| Error::MissingHashingKeys(format!("No account with index {index}")))
    }

    /// First account
    pub fn primary(&self) -> Result<AccountInfo> {
        self.state
            .read()
            .accounts
            .first()
            .cloned()
            .ok_or_else(|| Error::MissingHashingKeys("Vault has no accounts".to_string()))
    }

    /// Space-separated hex public keys, primary first
    pub fn public_keys_line(&self) -> String {
        self.state
            .read()
            .accounts
            .iter()
            .map(AccountInfo::public_key_hex)
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Current persisted form of the vault
    pub fn encrypted(&self) -> EncryptedVault {
        self.state.read().encrypted.clone()
    }

    fn with_key<T>(
        &self,
        account_index: u32,
        password: &str,
        f: impl FnOnce(&KeyPair) -> Result<T>,
    ) -> Result<T> {
        let (account, encrypted) = {
            let state = self.state.read();
            if !state.open {
                return Err(Error::MissingHashingKeys("Vault session is closed".to_string()));
            }
            let account = state
                .accounts
                .iter()
                .find(|a| a.index == account_index)
                .cloned()
                .ok_or_else(|| {
                    Error::MissingHashingKeys(format!("No account with index {account_index}"))
                })?;
            (account, state.encrypted.clone())
        };

        let key = {
            let contents = self.cipher.unlock(password, &encrypted)?;
            derive_key_for_network(contents.mnemonic(), account_index, &self.network)?
        };
        if *key.public_key() != account.public_key {
            return Err(Error::KeyDerivation(
                "Derived key does not match the listed account".to_string(),
            ));
        }
        f(&key)
    }

    /// Owner proof over `message_hash` with the account's key
    pub fn sign(
        &self,
        account_index: u32,
        password: &str,
        message_hash: &[u8; 32],
    ) -> Result<OwnerProof> {
        self.with_key(account_index, password, |key| create_owner_proof(message_hash, key))
    }

    /// Sign every order with one unlock of the vault
    pub fn sign_orders(
        &self,
        account_index: u32,
        password: &str,
        orders: Vec<TransactionOrder>,
    ) -> Result<Vec<TransactionOrder>> {
        self.with_key(account_index, password, |key| {
            orders.into_iter().map(|order| order.sign(key)).collect()
        })
    }

    /// Add an account and re-seal the vault.
    ///
    /// Returns the new persisted vault, which the caller must store.
    pub fn add_account(&self, alias: &str, password: &str) -> Result<(EncryptedVault, AccountInfo)> {
        let mut state = self.state.write();
        let mut contents = self.cipher.unlock(password, &state.encrypted)?;
        let key = contents.add_key(alias)?;
        let info = account_info(&contents, &key, &self.network)?;
        let encrypted = self.cipher.seal(&contents, password)?;

        state.accounts.push(info.clone());
        state.encrypted = encrypted.clone();

        tracing::info!("Added account {} at index {}", info.alias, info.index);
        Ok((encrypted, info))
    }

    /// Re-encrypt the vault under a new password
    pub fn change_password(&self, old_password: &str, new_password: &str) -> Result<EncryptedVault> {
        let mut state = self.state.write();
        let encrypted = self
            .cipher
            .change_password(&state.encrypted, old_password, new_password)?;
        state.encrypted = encrypted.clone();
        Ok(encrypted)
    }

    /// Refuse further signing; account listing stays available
    pub fn close(&self) {
        let mut state = self.state.write();
        if std::mem::replace(&mut state.open, false) {
            tracing::info!("Vault session closed");
        }
    }
}

impl std::fmt::Debug for VaultSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("VaultSession")
            .field("network", &self.network.name)
            .field("accounts", &state.accounts)
            .field("open", &state.open)
            .finish()
    }
}

fn account_info(contents: &VaultContents, key: &VaultKey, network: &Network) -> Result<AccountInfo> {
    let pair = derive_key_for_network(contents.mnemonic(), key.index, network)?;
    Ok(AccountInfo {
        alias: key.alias.clone(),
        index: key.index,
        public_key: *pair.public_key(),
    })
}

fn account_infos(contents: &VaultContents, network: &Network) -> Result<Vec<AccountInfo>> {
    contents
        .keys()
        .iter()
        .map(|key| account_info(contents, key, network))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::derive_key;
    use std::sync::Arc;

    const TEST_MNEMONIC: &str =
        "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";
    const PASSWORD: &str = "correct horse";

    fn open_session() -> VaultSession {
        let cipher = VaultCipher::insecure_for_tests();
        let encrypted = cipher.create(TEST_MNEMONIC, PASSWORD).unwrap();
        VaultSession::open(cipher, encrypted, PASSWORD, Network::mainnet()).unwrap()
    }

    #[test]
    fn test_open_lists_accounts() {
        let session = open_session();
        let primary = session.primary().unwrap();
        assert_eq!(primary.index, 0);
        assert_eq!(&primary.public_key, derive_key(TEST_MNEMONIC, 0).unwrap().public_key());
        assert_eq!(session.public_keys_line(), primary.public_key_hex());
    }

    #[test]
    fn test_wrong_password() {
        let cipher = VaultCipher::insecure_for_tests();
        let encrypted = cipher.create(TEST_MNEMONIC, PASSWORD).unwrap();
        assert!(matches!(
            VaultSession::open(cipher, encrypted, "nope", Network::mainnet()),
            Err(Error::IncorrectPassword)
        ));
    }

    #[test]
    fn test_sign_and_close() {
        let session = open_session();
        let hash = [7u8; 32];
        let proof = session.sign(0, PASSWORD, &hash).unwrap();
        assert!(proof.verify(&hash));

        assert!(matches!(
            session.sign(3, PASSWORD, &hash),
            Err(Error::MissingHashingKeys(_))
        ));

        session.close();
        assert!(!session.is_open());
        assert!(matches!(
            session.sign(0, PASSWORD, &hash),
            Err(Error::MissingHashingKeys(_))
        ));
        assert_eq!(session.accounts().len(), 1);
    }

    #[test]
    fn test_add_account() {
        let session = open_session();
        let (encrypted, info) = session.add_account("Savings", PASSWORD).unwrap();
        assert_eq!(info.index, 1);
        assert_eq!(&info.public_key, derive_key(TEST_MNEMONIC, 1).unwrap().public_key());
        assert_eq!(session.public_keys_line().split(' ').count(), 2);
        assert!(session.sign(1, PASSWORD, &[1u8; 32]).is_ok());

        let reopened = VaultSession::open(
            VaultCipher::insecure_for_tests(),
            encrypted,
            PASSWORD,
            Network::mainnet(),
        )
        .unwrap();
        assert_eq!(reopened.accounts(), session.accounts());

        assert!(session.add_account("Savings", PASSWORD).is_err());
        assert!(matches!(
            session.add_account("Other", "wrong"),
            Err(Error::IncorrectPassword)
        ));
    }

    #[test]
    fn test_change_password() {
        let session = open_session();
        let encrypted = session.change_password(PASSWORD, "new password").unwrap();
        assert_eq!(session.encrypted(), encrypted);
        assert!(session.add_account("Second", "new password").is_ok());
        assert!(matches!(
            session.sign(0, PASSWORD, &[2u8; 32]),
            Err(Error::IncorrectPassword)
        ));
        assert!(session.sign(1, "new password", &[2u8; 32]).is_ok());
    }

    #[test]
    fn test_signing_unlocks_per_call() {
        let session = open_session();
        let hash = [9u8; 32];

        let err = session.sign(0, "not the password", &hash).unwrap_err();
        assert!(matches!(err, Error::IncorrectPassword));
        assert_eq!(err.field(), Some("password"));
        assert!(session.is_open());

        assert!(session.sign(0, PASSWORD, &hash).unwrap().verify(&hash));

        let rendered = format!("{session:?}");
        assert!(!rendered.contains("abandon"));
    }

    #[test]
    fn test_concurrent_signing() {
        let session = Arc::new(open_session());
        let handles: Vec<_> = (0..4u8)
            .map(|i| {
                let session = Arc::clone(&session);
                std::thread::spawn(move || {
                    session
                        .sign(0, PASSWORD, &[i; 32])
                        .map(|p| p.verify(&[i; 32]))
                })
            })
            .collect();
        for handle in handles {
            assert!(handle.join().unwrap().unwrap());
        }
    }
}
