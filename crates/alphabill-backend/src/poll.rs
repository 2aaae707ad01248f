//! Bounded polling for transaction proofs

use crate::{AlphabillBackend, CancelToken, Error, Result};
use alphabill_core::TransactionProof;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;

/// Proof polling limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollConfig {
    /// Pause between attempts
    pub interval: Duration,
    /// Maximum number of proof requests
    pub max_attempts: u32,
    /// Overall deadline
    pub timeout: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            max_attempts: 120,
            timeout: Duration::from_secs(120),
        }
    }
}

/// Poll `backend` until the proof for `tx_hash` is available.
///
/// Fails with [`Error::Timeout`] when the attempts or the deadline run out and
/// with [`Error::Cancelled`] as soon as `cancel` fires.
pub async fn await_proof<B: AlphabillBackend + ?Sized>(
    backend: &B,
    tx_hash: &[u8],
    config: &PollConfig,
    cancel: &CancelToken,
) -> Result<TransactionProof> {
    let deadline = Instant::now() + config.timeout;
    let mut attempt = 0u32;

    loop {
        cancel.check()?;

        let request = backend.get_transaction_proof(tx_hash);
        let response = tokio::select! {
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            _ = tokio::time::sleep_until(deadline) => None,
            response = request => Some(response),
        };
        let Some(response) = response else {
            break;
        };

        match response {
            Ok(Some(proof)) => {
                tracing::info!(
                    "Proof for {} received after {} attempt(s)",
                    hex::encode(tx_hash),
                    attempt + 1
                );
                return Ok(proof);
            }
            Ok(None) => {}
            Err(e) if e.is_retryable() => {
                tracing::debug!("Proof poll for {} failed: {}", hex::encode(tx_hash), e);
            }
            Err(e) => return Err(e),
        }

        attempt += 1;
        if attempt >= config.max_attempts {
            break;
        }

        tokio::select! {
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            _ = tokio::time::sleep_until(deadline) => break,
            _ = tokio::time::sleep(config.interval) => {}
        }
    }

    Err(Error::Timeout(format!(
        "No proof for {} after {} attempt(s)",
        hex::encode(tx_hash),
        attempt
    )))
}
