//! Persisted UI state records

use serde::{Deserialize, Serialize};

/// Stable storage keys
pub mod keys {
    /// Encrypted vault, `{"salt": hex, "vault": hex}`
    pub const VAULT: &str = "vault";
    /// Space-separated hex public keys, primary first
    pub const PUB_KEYS: &str = "pubKeys";
    /// Account selected in the UI
    pub const ACTIVE_ACCOUNT_ID: &str = "activeAccountId";
    /// Asset selected in the UI
    pub const ACTIVE_ASSET: &str = "activeAsset";

    /// Every key the wallet writes
    pub const ALL: [&str; 4] = [VAULT, PUB_KEYS, ACTIVE_ACCOUNT_ID, ACTIVE_ASSET];
}

/// Asset selected in the UI
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveAsset {
    /// Type id, `ALPHA` for the native coin
    pub type_id: String,
    /// Display name
    pub name: String,
}

impl Default for ActiveAsset {
    fn default() -> Self {
        Self {
            type_id: alphabill_core::NATIVE_TYPE_ID.to_string(),
            name: alphabill_core::NATIVE_TYPE_ID.to_string(),
        }
    }
}
