//! Data access layer

use crate::models::{keys, ActiveAsset};
use crate::{Database, Error, Result};
use alphabill_core::keys::public_key_from_hex;
use alphabill_core::{EncryptedVault, VaultCipher, VaultSession, PUBLIC_KEY_LENGTH};
use alphabill_params::Network;
use rusqlite::{params, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Repository for wallet state
pub struct Repository<'a> {
    db: &'a Database,
}

impl<'a> Repository<'a> {
    /// Create repository
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    fn put(&self, key: &str, value: &str) -> Result<()> {
        self.db.conn().execute(
            "INSERT INTO wallet_state (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value, chrono::Utc::now().timestamp()],
        )?;
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self
            .db
            .conn()
            .query_row(
                "SELECT value FROM wallet_state WHERE key = ?1",
                [key],
                |row| row.get(0),
            )
            .optional()?)
    }

    fn put_json<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        self.put(key, &serde_json::to_string(value)?)
    }

    fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        self.get(key)?
            .map(|raw| serde_json::from_str(&raw).map_err(Error::from))
            .transpose()
    }

    fn remove(&self, key: &str) -> Result<bool> {
        let rows = self
            .db
            .conn()
            .execute("DELETE FROM wallet_state WHERE key = ?1", [key])?;
        Ok(rows > 0)
    }

    /// Store the encrypted vault
    pub fn save_vault(&self, vault: &EncryptedVault) -> Result<()> {
        self.put_json(keys::VAULT, vault)?;
        tracing::debug!("Saved encrypted vault");
        Ok(())
    }

    /// Load the encrypted vault, if one exists
    pub fn load_vault(&self) -> Result<Option<EncryptedVault>> {
        self.get_json(keys::VAULT)
    }

    /// Whether a vault has been created
    pub fn has_vault(&self) -> Result<bool> {
        Ok(self.get(keys::VAULT)?.is_some())
    }

    /// Remove the vault; returns whether one existed
    pub fn delete_vault(&self) -> Result<bool> {
        self.remove(keys::VAULT)
    }

    /// Store public keys, primary first
    pub fn save_public_keys(&self, public_keys: &[[u8; PUBLIC_KEY_LENGTH]]) -> Result<()> {
        let line = public_keys.iter().map(hex::encode).collect::<Vec<_>>().join(" ");
        self.put(keys::PUB_KEYS, &line)
    }

    /// Load public keys, primary first; empty if none are stored
    pub fn load_public_keys(&self) -> Result<Vec<[u8; PUBLIC_KEY_LENGTH]>> {
        let Some(line) = self.get(keys::PUB_KEYS)? else {
            return Ok(Vec::new());
        };
        line.split_whitespace()
            .map(|encoded| {
                public_key_from_hex(encoded)
                    .map_err(|e| Error::Validation(format!("Stored public key {encoded}: {e}")))
            })
            .collect()
    }

    /// Select the account shown in the UI
    pub fn set_active_account_id(&self, account_id: &str) -> Result<()> {
        self.put_json(keys::ACTIVE_ACCOUNT_ID, &account_id)
    }

    /// Account shown in the UI
    pub fn active_account_id(&self) -> Result<Option<String>> {
        self.get_json(keys::ACTIVE_ACCOUNT_ID)
    }

    /// Select the asset shown in the UI
    pub fn set_active_asset(&self, asset: &ActiveAsset) -> Result<()> {
        self.put_json(keys::ACTIVE_ASSET, asset)
    }

    /// Asset shown in the UI, the native coin if none was chosen
    pub fn active_asset(&self) -> Result<ActiveAsset> {
        Ok(self.get_json(keys::ACTIVE_ASSET)?.unwrap_or_default())
    }

    /// Open a session over the stored vault and refresh the stored keys
    pub fn open_session(
        &self,
        cipher: VaultCipher,
        password: &str,
        network: Network,
    ) -> Result<VaultSession> {
        let vault = self
            .load_vault()?
            .ok_or_else(|| Error::NotFound("No vault has been created".to_string()))?;
        let session = VaultSession::open(cipher, vault, password, network)?;

        let public_keys: Vec<_> = session.accounts().iter().map(|a| a.public_key).collect();
        self.save_public_keys(&public_keys)?;
        if self.active_account_id()?.is_none() {
            self.set_active_account_id(&session.primary()?.public_key_hex())?;
        }
        Ok(session)
    }

    /// Remove all wallet state in one transaction
    pub fn delete_all(&self) -> Result<()> {
        let tx = self.db.transaction()?;
        for key in keys::ALL {
            tx.execute("DELETE FROM wallet_state WHERE key = ?1", [key])?;
        }
        tx.commit()?;
        tracing::info!("Deleted all wallet state");
        Ok(())
    }
}
