//! Spendable bills

use serde::{Deserialize, Serialize};

/// Type identifier of the native ALPHA coin
pub const NATIVE_TYPE_ID: &str = "ALPHA";

/// A spendable unit of native coin or fungible token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bill {
    /// Unit identifier
    #[serde(with = "base64_bytes")]
    pub id: Vec<u8>,
    /// Value in the smallest denomination
    #[serde(with = "u64_string")]
    pub value: u64,
    /// Hash of the last transaction on this unit (the backlink)
    #[serde(with = "base64_bytes")]
    pub tx_hash: Vec<u8>,
    /// Coin or token type
    pub type_id: String,
    /// Bill was produced by a dust-collection transfer and awaits a swap
    #[serde(default)]
    pub is_dc_bill: bool,
}

impl Bill {
    /// Native coin bill
    pub fn new(id: Vec<u8>, value: u64, tx_hash: Vec<u8>) -> Self {
        Self {
            id,
            value,
            tx_hash,
            type_id: NATIVE_TYPE_ID.to_string(),
            is_dc_bill: false,
        }
    }

    /// Fungible token bill
    pub fn token(id: Vec<u8>, value: u64, tx_hash: Vec<u8>, type_id: &str) -> Self {
        Self {
            type_id: type_id.to_string(),
            ..Self::new(id, value, tx_hash)
        }
    }

    /// Hex form of the id, for logs and UI keys
    pub fn id_hex(&self) -> String {
        hex::encode(&self.id)
    }
}

/// Sum bill values, `None` on overflow
pub fn total_value<'a>(bills: impl IntoIterator<Item = &'a Bill>) -> Option<u64> {
    bills
        .into_iter()
        .try_fold(0u64, |acc, bill| acc.checked_add(bill.value))
}

/// Serde helper for byte fields carried as base64 strings
pub mod base64_bytes {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde::{Deserialize, Deserializer, Serializer};

    /// Serialize bytes as base64
    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    /// Deserialize base64 into bytes
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded).map_err(serde::de::Error::custom)
    }
}

/// Values travel as decimal strings so JSON consumers keep full u64 precision
mod u64_string {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
