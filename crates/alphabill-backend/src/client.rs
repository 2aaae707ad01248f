//! Alphabill backend service interface
//!
//! The JSON-RPC transport lives outside this workspace. Wallet code talks to
//! the backend through [`AlphabillBackend`]; [`RetryingBackend`] adds the
//! retry and request-timeout policy on top of any implementation.

use crate::{Error, Result};
use alphabill_core::{Bill, TransactionOrder, TransactionProof};
use alphabill_params::Network;
use async_trait::async_trait;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Unit state as reported by the backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unit {
    /// Unit identifier
    pub id: Vec<u8>,
    /// Current bearer predicate
    pub bearer: Vec<u8>,
    /// Value in the smallest denomination
    pub value: u64,
    /// Hash of the last transaction on the unit
    pub backlink: Vec<u8>,
    /// Coin or token type
    pub type_id: String,
    /// Nonce if the unit is locked by a dust-collection transfer
    pub dc_nonce: Option<Vec<u8>>,
    /// Proof of the last transaction, when requested
    pub proof: Option<TransactionProof>,
}

impl Unit {
    /// Spendable view of the unit
    pub fn to_bill(&self) -> Bill {
        let mut bill = Bill::token(self.id.clone(), self.value, self.backlink.clone(), &self.type_id);
        bill.is_dc_bill = self.dc_nonce.is_some();
        bill
    }
}

/// Operations the wallet needs from an Alphabill backend
#[async_trait]
pub trait AlphabillBackend: Send + Sync {
    /// Ids of the units locked to `owner_id` (the public-key hash)
    async fn get_units_by_owner(&self, owner_id: &[u8]) -> Result<Vec<Vec<u8>>>;

    /// Current unit state, `None` if the unit does not exist
    async fn get_unit(&self, unit_id: &[u8], include_proof: bool) -> Result<Option<Unit>>;

    /// Latest certified round number
    async fn get_round_number(&self) -> Result<u64>;

    /// Submit a signed order, returning its hash
    async fn submit_transaction(&self, order: &TransactionOrder) -> Result<[u8; 32]>;

    /// Proof for a transaction, `None` until it is included in a block
    async fn get_transaction_proof(&self, tx_hash: &[u8]) -> Result<Option<TransactionProof>>;
}

/// Retry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum retry attempts
    pub max_attempts: u32,
    /// Initial backoff duration
    pub initial_backoff: Duration,
    /// Maximum backoff duration
    pub max_backoff: Duration,
    /// Backoff multiplier
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(30),
            backoff_multiplier: 2.0,
        }
    }
}

/// Backend client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Backend endpoint URL
    pub endpoint: String,
    /// Deadline for a single request
    pub request_timeout: Duration,
    /// Retry policy for transient failures
    pub retry: RetryConfig,
}

impl BackendConfig {
    /// Defaults for `network`
    pub fn for_network(network: &Network) -> Self {
        Self {
            endpoint: network.default_backend_url.to_string(),
            request_timeout: Duration::from_secs(30),
            retry: RetryConfig::default(),
        }
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self::for_network(&Network::default())
    }
}

fn jitter_duration(duration: Duration) -> Duration {
    let millis = duration.as_millis() as u64;
    if millis == 0 {
        return duration;
    }
    let jitter = rand::thread_rng().gen_range(0.8..1.2);
    let jittered = (millis as f64 * jitter) as u64;
    Duration::from_millis(jittered.max(1))
}

/// Backend wrapper applying [`BackendConfig`] timeouts and retries
pub struct RetryingBackend<B> {
    inner: B,
    config: BackendConfig,
}

impl<B: AlphabillBackend> RetryingBackend<B> {
    /// Wrap `inner`
    pub fn new(inner: B, config: BackendConfig) -> Self {
        Self { inner, config }
    }

    /// Configuration in use
    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    /// Wrapped backend
    pub fn inner(&self) -> &B {
        &self.inner
    }

    async fn with_retry<F, Fut, T>(&self, what: &str, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut + Send,
        Fut: Future<Output = Result<T>> + Send,
    {
        let retry = &self.config.retry;
        let mut attempt = 0;
        let mut backoff = retry.initial_backoff;

        loop {
            let result = match tokio::time::timeout(self.config.request_timeout, operation()).await {
                Ok(result) => result,
                Err(_) => Err(Error::NetworkUnavailable(format!(
                    "{} timed out after {:?}",
                    what, self.config.request_timeout
                ))),
            };

            match result {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() => {
                    attempt += 1;
                    if attempt >= retry.max_attempts {
                        return Err(e);
                    }

                    warn!(
                        "{} failed (attempt {}), retrying in {:?}: {}",
                        what, attempt, backoff, e
                    );

                    tokio::time::sleep(jitter_duration(backoff)).await;

                    backoff = std::cmp::min(
                        Duration::from_millis(
                            (backoff.as_millis() as f64 * retry.backoff_multiplier) as u64,
                        ),
                        retry.max_backoff,
                    );
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[async_trait]
impl<B: AlphabillBackend> AlphabillBackend for RetryingBackend<B> {
    async fn get_units_by_owner(&self, owner_id: &[u8]) -> Result<Vec<Vec<u8>>> {
        self.with_retry("get_units_by_owner", || self.inner.get_units_by_owner(owner_id))
            .await
    }

    async fn get_unit(&self, unit_id: &[u8], include_proof: bool) -> Result<Option<Unit>> {
        self.with_retry("get_unit", || self.inner.get_unit(unit_id, include_proof))
            .await
    }

    async fn get_round_number(&self) -> Result<u64> {
        self.with_retry("get_round_number", || self.inner.get_round_number()).await
    }

    async fn submit_transaction(&self, order: &TransactionOrder) -> Result<[u8; 32]> {
        self.with_retry("submit_transaction", || self.inner.submit_transaction(order))
            .await
    }

    async fn get_transaction_proof(&self, tx_hash: &[u8]) -> Result<Option<TransactionProof>> {
        self.with_retry("get_transaction_proof", || self.inner.get_transaction_proof(tx_hash))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct FlakyBackend {
        failures_left: AtomicU32,
        calls: AtomicU32,
        error: Mutex<Option<Error>>,
    }

    impl FlakyBackend {
        fn new(failures: u32) -> Self {
            Self {
                failures_left: AtomicU32::new(failures),
                calls: AtomicU32::new(0),
                error: Mutex::new(None),
            }
        }
    }

    #[async_trait]
    impl AlphabillBackend for FlakyBackend {
        async fn get_units_by_owner(&self, _owner_id: &[u8]) -> Result<Vec<Vec<u8>>> {
            Ok(Vec::new())
        }

        async fn get_unit(&self, _unit_id: &[u8], _include_proof: bool) -> Result<Option<Unit>> {
            Ok(None)
        }

        async fn get_round_number(&self) -> Result<u64> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(e) = self.error.lock().take() {
                return Err(e);
            }
            if self.failures_left.load(Ordering::SeqCst) > 0 {
                self.failures_left.fetch_sub(1, Ordering::SeqCst);
                return Err(Error::NetworkUnavailable("connection reset".to_string()));
            }
            Ok(42)
        }

        async fn submit_transaction(&self, _order: &TransactionOrder) -> Result<[u8; 32]> {
            Err(Error::Rejected("not supported".to_string()))
        }

        async fn get_transaction_proof(&self, _tx_hash: &[u8]) -> Result<Option<TransactionProof>> {
            Ok(None)
        }
    }

    fn fast_config(max_attempts: u32) -> BackendConfig {
        BackendConfig {
            endpoint: "http://localhost".to_string(),
            request_timeout: Duration::from_secs(1),
            retry: RetryConfig {
                max_attempts,
                initial_backoff: Duration::from_millis(1),
                max_backoff: Duration::from_millis(5),
                backoff_multiplier: 2.0,
            },
        }
    }

    #[tokio::test]
    async fn test_retries_transient_failures() {
        let backend = RetryingBackend::new(FlakyBackend::new(2), fast_config(5));
        assert_eq!(backend.get_round_number().await.unwrap(), 42);
        assert_eq!(backend.inner().calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let backend = RetryingBackend::new(FlakyBackend::new(10), fast_config(3));
        assert!(matches!(
            backend.get_round_number().await,
            Err(Error::NetworkUnavailable(_))
        ));
        assert_eq!(backend.inner().calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_rejection_is_not_retried() {
        let flaky = FlakyBackend::new(0);
        *flaky.error.lock() = Some(Error::Rejected("bad backlink".to_string()));
        let backend = RetryingBackend::new(flaky, fast_config(5));
        assert!(matches!(backend.get_round_number().await, Err(Error::Rejected(_))));
        assert_eq!(backend.inner().calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_default_config() {
        let config = BackendConfig::default();
        assert_eq!(config.endpoint, Network::mainnet().default_backend_url);
        assert_eq!(config.retry.max_attempts, 5);
    }

    #[test]
    fn test_unit_to_bill() {
        let unit = Unit {
            id: vec![1; 32],
            bearer: vec![],
            value: 10,
            backlink: vec![2; 32],
            type_id: alphabill_core::NATIVE_TYPE_ID.to_string(),
            dc_nonce: Some(vec![3; 32]),
            proof: None,
        };
        let bill = unit.to_bill();
        assert!(bill.is_dc_bill);
        assert_eq!(bill.tx_hash, vec![2; 32]);
    }
}
