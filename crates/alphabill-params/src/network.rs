//! Alphabill network definitions

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// BIP-44 coin type registered for Alphabill
pub const ALPHABILL_COIN_TYPE: u32 = 634;

/// System identifier of the money partition
pub const MONEY_SYSTEM_ID: [u8; 4] = [0, 0, 0, 0];

/// System identifier of the tokens partition
pub const TOKENS_SYSTEM_ID: [u8; 4] = [0, 0, 0, 2];

/// Network type enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkType {
    /// Mainnet
    Mainnet,
    /// Public testnet
    Testnet,
    /// Local development network
    Local,
}

impl FromStr for NetworkType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "mainnet" => Ok(Self::Mainnet),
            "testnet" => Ok(Self::Testnet),
            "local" | "localhost" => Ok(Self::Local),
            other => Err(Error::InvalidNetwork(other.to_string())),
        }
    }
}

/// Network configuration
#[derive(Debug, Clone)]
pub struct Network {
    /// Network type
    pub network_type: NetworkType,
    /// Human-readable name
    pub name: &'static str,
    /// Coin type (BIP-44)
    pub coin_type: u32,
    /// Money partition system identifier
    pub money_system_id: [u8; 4],
    /// Tokens partition system identifier
    pub tokens_system_id: [u8; 4],
    /// Rounds added to the current round number to get a transaction timeout
    pub timeout_offset: u64,
    /// Maximum fee a client is willing to pay per transaction
    pub max_fee: u64,
    /// Default backend endpoint
    pub default_backend_url: &'static str,
}

impl Network {
    /// Get mainnet parameters
    pub const fn mainnet() -> Self {
        Self {
            network_type: NetworkType::Mainnet,
            name: "mainnet",
            coin_type: ALPHABILL_COIN_TYPE,
            money_system_id: MONEY_SYSTEM_ID,
            tokens_system_id: TOKENS_SYSTEM_ID,
            timeout_offset: 10,
            max_fee: 1,
            default_backend_url: "https://money-backend.mainnet.alphabill.org",
        }
    }

    /// Get testnet parameters
    pub const fn testnet() -> Self {
        Self {
            network_type: NetworkType::Testnet,
            name: "testnet",
            coin_type: ALPHABILL_COIN_TYPE,
            money_system_id: MONEY_SYSTEM_ID,
            tokens_system_id: TOKENS_SYSTEM_ID,
            timeout_offset: 10,
            max_fee: 1,
            default_backend_url: "https://money-backend.testnet.alphabill.org",
        }
    }

    /// Get local development parameters
    pub const fn local() -> Self {
        Self {
            network_type: NetworkType::Local,
            name: "local",
            coin_type: ALPHABILL_COIN_TYPE,
            money_system_id: MONEY_SYSTEM_ID,
            tokens_system_id: TOKENS_SYSTEM_ID,
            timeout_offset: 5,
            max_fee: 1,
            default_backend_url: "http://localhost:9654",
        }
    }

    /// Get network by type
    pub const fn from_type(network_type: NetworkType) -> Self {
        match network_type {
            NetworkType::Mainnet => Self::mainnet(),
            NetworkType::Testnet => Self::testnet(),
            NetworkType::Local => Self::local(),
        }
    }

    /// Transaction timeout for the given current round
    pub const fn timeout_for_round(&self, round: u64) -> u64 {
        round.saturating_add(self.timeout_offset)
    }

    /// BIP-44 derivation path for an account index
    pub fn derivation_path(&self, index: u32) -> String {
        format!("m/44'/{}'/{}'/0/0", self.coin_type, index)
    }
}

impl Default for Network {
    fn default() -> Self {
        Self::mainnet()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mainnet_params() {
        let net = Network::mainnet();
        assert_eq!(net.network_type, NetworkType::Mainnet);
        assert_eq!(net.coin_type, 634);
        assert_eq!(net.money_system_id, [0, 0, 0, 0]);
        assert_eq!(net.timeout_for_round(100), 110);
    }

    #[test]
    fn test_network_from_type() {
        let net = Network::from_type(NetworkType::Testnet);
        assert_eq!(net.network_type, NetworkType::Testnet);
    }

    #[test]
    fn test_derivation_path() {
        assert_eq!(Network::mainnet().derivation_path(3), "m/44'/634'/3'/0/0");
    }

    #[test]
    fn test_network_type_parse() {
        assert_eq!("Testnet".parse::<NetworkType>().unwrap(), NetworkType::Testnet);
        assert_eq!("localhost".parse::<NetworkType>().unwrap(), NetworkType::Local);
        assert!("devnet".parse::<NetworkType>().is_err());
    }

    #[test]
    fn test_network_type_serde() {
        let json = serde_json::to_string(&NetworkType::Mainnet).unwrap();
        assert_eq!(json, "\"mainnet\"");
    }

    #[test]
    fn test_timeout_saturates() {
        assert_eq!(Network::local().timeout_for_round(u64::MAX), u64::MAX);
    }
}
