//! Send and dust-collection pipelines
//!
//! Selection, order building and signing run synchronously against the
//! session, so neither the mnemonic nor a private key lives across an await
//! point. Submission of the signed orders runs concurrently; every order is
//! submitted independently and its outcome is reported on its own.

use crate::poll::{await_proof, PollConfig};
use crate::{AlphabillBackend, CancelToken, Error, Result};
use alphabill_core::proof::verify_or_err;
use alphabill_core::transaction::TransactionAttributes;
use alphabill_core::{
    dc_nonce, pay_to_public_key_hash, Bill, BillSelector, SelectionResult, TransactionBuilder,
    TransactionOrder, TransactionProof, VaultSession, NATIVE_TYPE_ID,
};
use std::sync::Arc;
use tokio::task::JoinSet;

/// A signed order accepted by the backend
#[derive(Debug, Clone)]
pub struct SubmittedOrder {
    /// Hash returned by the backend
    pub tx_hash: [u8; 32],
    /// The order as signed
    pub order: TransactionOrder,
    /// Unit the order acts on
    pub bill: Bill,
}

/// A signed order the backend did not accept
#[derive(Debug)]
pub struct FailedOrder {
    /// The order as signed
    pub order: TransactionOrder,
    /// Unit the order acts on, still spendable
    pub bill: Bill,
    /// Why submission failed
    pub error: Error,
}

/// Result of a payment
#[derive(Debug)]
pub struct SendOutcome {
    /// How the amount was covered
    pub selection: SelectionResult,
    /// Accepted orders in submission order: transfers first, then the split
    pub submitted: Vec<SubmittedOrder>,
    /// Orders the backend refused; the payment is partial when non-empty
    pub failed: Vec<FailedOrder>,
}

impl SendOutcome {
    /// Hashes of all accepted orders
    pub fn tx_hashes(&self) -> Vec<[u8; 32]> {
        self.submitted.iter().map(|s| s.tx_hash).collect()
    }

    /// Whether every order was accepted
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    /// Value that reached the backend for the receiver
    pub fn amount_submitted(&self) -> u64 {
        self.submitted
            .iter()
            .map(|s| match &s.order.payload.attributes {
                TransactionAttributes::Transfer(attrs) => attrs.target_value,
                TransactionAttributes::Split(attrs) => attrs.amount,
                _ => 0,
            })
            .sum()
    }
}

/// Payment pipeline over a backend
pub struct SendPipeline<B> {
    backend: Arc<B>,
    selector: BillSelector,
    poll: PollConfig,
}

impl<B: AlphabillBackend + 'static> SendPipeline<B> {
    /// Pipeline with no per-bill fee and default polling
    pub fn new(backend: Arc<B>) -> Self {
        Self {
            backend,
            selector: BillSelector::default(),
            poll: PollConfig::default(),
        }
    }

    /// Charge `fee_per_bill` on every spent bill
    pub fn with_fee_per_bill(mut self, fee_per_bill: u64) -> Result<Self> {
        self.selector = BillSelector::with_fee_per_bill(fee_per_bill)?;
        Ok(self)
    }

    /// Use other polling limits
    pub fn with_poll_config(mut self, poll: PollConfig) -> Self {
        self.poll = poll;
        self
    }

    /// Backend in use
    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    /// Bills currently locked to `owner_id`, in the order the backend lists them
    pub async fn fetch_bills(&self, owner_id: &[u8]) -> Result<Vec<Bill>> {
        let unit_ids = self.backend.get_units_by_owner(owner_id).await?;
        tracing::debug!(
            "Owner {} has {} unit(s)",
            hex::encode(owner_id),
            unit_ids.len()
        );

        let mut tasks = JoinSet::new();
        for (position, unit_id) in unit_ids.into_iter().enumerate() {
            let backend = Arc::clone(&self.backend);
            tasks.spawn(async move {
                let unit = backend.get_unit(&unit_id, false).await?;
                if unit.is_none() {
                    tracing::warn!("Unit {} disappeared while listing", hex::encode(&unit_id));
                }
                Ok::<_, Error>((position, unit))
            });
        }

        let mut units = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            let (position, unit) = joined.map_err(task_failed)??;
            if let Some(unit) = unit {
                units.push((position, unit.to_bill()));
            }
        }
        units.sort_by_key(|(position, _)| *position);
        Ok(units.into_iter().map(|(_, bill)| bill).collect())
    }

    /// Pay `amount` from the account's native bills to `receiver_pub_key_hash`.
    ///
    /// Fails only when nothing was accepted. A partial payment comes back as
    /// `Ok` with the refused orders in [`SendOutcome::failed`].
    pub async fn send(
        &self,
        session: &VaultSession,
        account_index: u32,
        password: &str,
        bills: &[Bill],
        receiver_pub_key_hash: &[u8; 32],
        amount: u64,
    ) -> Result<SendOutcome> {
        let spendable = BillSelector::spendable(bills, NATIVE_TYPE_ID);
        let selection = self.selector.select(&spendable, amount)?;

        let round = self.backend.get_round_number().await?;
        let builder = TransactionBuilder::for_round(session.network(), round);
        let orders = builder.build_send(&selection, receiver_pub_key_hash)?;
        let signed = session.sign_orders(account_index, password, orders)?;

        tracing::info!(
            "Sending {} to {} with {} order(s)",
            amount,
            hex::encode(receiver_pub_key_hash),
            signed.len()
        );

        let (submitted, failed) = self.submit_all(signed, &spendable).await?;
        let failed = nothing_accepted(&submitted, failed)?;
        if !failed.is_empty() {
            tracing::warn!(
                "Payment is partial: {} order(s) accepted, {} refused",
                submitted.len(),
                failed.len()
            );
        }

        Ok(SendOutcome {
            selection,
            submitted,
            failed,
        })
    }

    /// Await and verify the proof of every submitted order
    pub async fn confirm(
        &self,
        session: &VaultSession,
        account_index: u32,
        submitted: &[SubmittedOrder],
        cancel: &CancelToken,
    ) -> Result<Vec<TransactionProof>> {
        let account = session.account(account_index)?;
        let mut proofs = Vec::with_capacity(submitted.len());
        for entry in submitted {
            let proof = await_proof(self.backend.as_ref(), &entry.tx_hash, &self.poll, cancel).await?;
            verify_or_err(&proof, &entry.bill, Some(&account.public_key))?;
            proofs.push(proof);
        }
        Ok(proofs)
    }

    /// Join the account's native bills into one.
    ///
    /// Every bill is locked with a dust-collection transfer under a shared
    /// nonce; once the accepted transfers are proven, a swap creates the
    /// joined bill. When `bills` already holds locked bills from an
    /// interrupted run, those are swapped instead and unlocked bills are left
    /// for the next collection.
    pub async fn collect_dust(
        &self,
        session: &VaultSession,
        account_index: u32,
        password: &str,
        bills: &[Bill],
        cancel: &CancelToken,
    ) -> Result<SubmittedOrder> {
        cancel.check()?;

        let locked: Vec<Bill> = bills
            .iter()
            .filter(|b| b.is_dc_bill && b.type_id == NATIVE_TYPE_ID)
            .cloned()
            .collect();
        if !locked.is_empty() {
            return self
                .resume_swap(session, account_index, password, &locked, cancel)
                .await;
        }

        let spendable = BillSelector::spendable(bills, NATIVE_TYPE_ID);
        if spendable.len() < 2 {
            return Err(alphabill_core::Error::InvalidTransaction(
                "Dust collection needs at least two bills".to_string(),
            )
            .into());
        }

        let nonce = dc_nonce(&spendable);
        let owner = owner_condition(session, account_index)?;

        let round = self.backend.get_round_number().await?;
        let builder = TransactionBuilder::for_round(session.network(), round);
        let transfers = spendable
            .iter()
            .map(|bill| builder.dust_collection(bill, &nonce, &owner))
            .collect();
        let signed = session.sign_orders(account_index, password, transfers)?;

        tracing::info!(
            "Collecting {} bill(s) under nonce {}",
            spendable.len(),
            hex::encode(nonce)
        );

        let (submitted, failed) = self.submit_all(signed, &spendable).await?;
        let failed = nothing_accepted(&submitted, failed)?;
        if !failed.is_empty() {
            tracing::warn!(
                "{} dust transfer(s) refused, swapping the {} accepted",
                failed.len(),
                submitted.len()
            );
        }

        let proofs = self
            .confirm(session, account_index, &submitted, cancel)
            .await?;
        let transfers = submitted.into_iter().map(|s| s.order).collect();
        self.submit_swap(session, account_index, password, transfers, proofs, cancel)
            .await
    }

    /// Swap bills locked by an earlier dust collection.
    ///
    /// Proofs come from the unit state; bills locked under another nonce than
    /// the first one are left for a later run.
    async fn resume_swap(
        &self,
        session: &VaultSession,
        account_index: u32,
        password: &str,
        locked: &[Bill],
        cancel: &CancelToken,
    ) -> Result<SubmittedOrder> {
        let account = session.account(account_index)?;

        let mut nonce: Option<Vec<u8>> = None;
        let mut transfers = Vec::new();
        let mut proofs = Vec::new();
        for bill in locked {
            cancel.check()?;
            let unit = self
                .backend
                .get_unit(&bill.id, true)
                .await?
                .ok_or_else(|| Error::NotFound(format!("Locked unit {}", bill.id_hex())))?;
            let Some(unit_nonce) = unit.dc_nonce else {
                tracing::debug!("Unit {} is no longer locked", bill.id_hex());
                continue;
            };
            if *nonce.get_or_insert_with(|| unit_nonce.clone()) != unit_nonce {
                tracing::debug!("Leaving {} for its own swap", bill.id_hex());
                continue;
            }
            let proof = unit.proof.ok_or_else(|| {
                Error::NotFound(format!("Proof of the transfer locking {}", bill.id_hex()))
            })?;

            verify_or_err(&proof, bill, Some(&account.public_key))?;
            transfers.push(proof.tx.clone());
            proofs.push(proof);
        }

        if transfers.is_empty() {
            return Err(alphabill_core::Error::InvalidTransaction(
                "No locked bills left to swap".to_string(),
            )
            .into());
        }

        tracing::info!(
            "Resuming swap of {} locked bill(s) under nonce {}",
            transfers.len(),
            nonce.as_deref().map(hex::encode).unwrap_or_default()
        );

        self.submit_swap(session, account_index, password, transfers, proofs, cancel)
            .await
    }

    async fn submit_swap(
        &self,
        session: &VaultSession,
        account_index: u32,
        password: &str,
        transfers: Vec<TransactionOrder>,
        proofs: Vec<TransactionProof>,
        cancel: &CancelToken,
    ) -> Result<SubmittedOrder> {
        cancel.check()?;
        let owner = owner_condition(session, account_index)?;
        let round = self.backend.get_round_number().await?;
        let swap = TransactionBuilder::for_round(session.network(), round).swap(
            transfers,
            proofs,
            &owner,
        )?;
        let target_value = match &swap.payload.attributes {
            TransactionAttributes::Swap(attrs) => attrs.target_value,
            _ => 0,
        };
        let joined = Bill::new(swap.payload.unit_id.clone(), target_value, Vec::new());

        let mut signed = session.sign_orders(account_index, password, vec![swap])?;
        let swap = signed.remove(0);
        let tx_hash = self.backend.submit_transaction(&swap).await?;
        check_hash(&swap, &tx_hash)?;

        tracing::info!("Swap {} submitted for value {}", hex::encode(tx_hash), target_value);
        Ok(SubmittedOrder {
            tx_hash,
            order: swap,
            bill: joined,
        })
    }

    /// Submit every order and wait for all of them.
    ///
    /// A refused order does not stop the others; accepted and refused orders
    /// come back separately, each in submission order.
    async fn submit_all(
        &self,
        orders: Vec<TransactionOrder>,
        bills: &[Bill],
    ) -> Result<(Vec<SubmittedOrder>, Vec<FailedOrder>)> {
        let mut pending = Vec::with_capacity(orders.len());
        for order in orders {
            let bill = bills
                .iter()
                .find(|b| b.id == order.payload.unit_id)
                .cloned()
                .ok_or_else(|| Error::Rejected("Order for an unknown bill".to_string()))?;
            pending.push((order, bill));
        }

        let tasks: Vec<_> = pending
            .into_iter()
            .map(|(order, bill)| {
                let backend = Arc::clone(&self.backend);
                let to_submit = order.clone();
                let task =
                    tokio::spawn(async move { backend.submit_transaction(&to_submit).await });
                (order, bill, task)
            })
            .collect();

        let mut submitted = Vec::new();
        let mut failed = Vec::new();
        for (order, bill, task) in tasks {
            let outcome = match task.await {
                Ok(result) => {
                    result.and_then(|tx_hash| check_hash(&order, &tx_hash).map(|_| tx_hash))
                }
                Err(e) => Err(task_failed(e)),
            };
            match outcome {
                Ok(tx_hash) => {
                    tracing::debug!("Submitted {}", hex::encode(tx_hash));
                    submitted.push(SubmittedOrder { tx_hash, order, bill });
                }
                Err(error) => {
                    tracing::warn!("Order on bill {} refused: {}", bill.id_hex(), error);
                    failed.push(FailedOrder { order, bill, error });
                }
            }
        }
        Ok((submitted, failed))
    }
}

/// Turn an all-refused submission into the first refusal
fn nothing_accepted(
    submitted: &[SubmittedOrder],
    mut failed: Vec<FailedOrder>,
) -> Result<Vec<FailedOrder>> {
    if submitted.is_empty() && !failed.is_empty() {
        return Err(failed.remove(0).error);
    }
    Ok(failed)
}

fn owner_condition(session: &VaultSession, account_index: u32) -> Result<Vec<u8>> {
    let account = session.account(account_index)?;
    Ok(pay_to_public_key_hash(&account.pub_key_hash()))
}

fn check_hash(order: &TransactionOrder, tx_hash: &[u8; 32]) -> Result<()> {
    if order.hash() != *tx_hash {
        return Err(Error::Rejected(format!(
            "Backend returned hash {} for a different transaction",
            hex::encode(tx_hash)
        )));
    }
    Ok(())
}

fn task_failed(e: tokio::task::JoinError) -> Error {
    Error::Rejected(format!("Backend task failed: {e}"))
}
