//! In-memory backend shared by the integration tests

#![allow(dead_code)]

use alphabill_backend::{AlphabillBackend, Error, Result, Unit};
use alphabill_core::transaction::TransactionAttributes;
use alphabill_core::{Bill, TransactionOrder, TransactionProof};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};

#[derive(Default)]
struct State {
    round: u64,
    owners: HashMap<Vec<u8>, Vec<Vec<u8>>>,
    units: HashMap<Vec<u8>, Unit>,
    submitted: Vec<TransactionOrder>,
    proofs: HashMap<[u8; 32], TransactionProof>,
    empty_polls_before_proof: u32,
    polls: HashMap<[u8; 32], u32>,
    reject_submissions: bool,
    rejected_units: HashSet<Vec<u8>>,
    offline: bool,
}

/// Backend that records submissions and proves them after a number of polls
#[derive(Default)]
pub struct MockBackend {
    state: Mutex<State>,
}

impl MockBackend {
    pub fn new(round: u64) -> Self {
        let backend = Self::default();
        backend.state.lock().round = round;
        backend
    }

    pub fn add_bill(&self, owner_id: &[u8], bill: &Bill) {
        let mut state = self.state.lock();
        state
            .owners
            .entry(owner_id.to_vec())
            .or_default()
            .push(bill.id.clone());
        state.units.insert(
            bill.id.clone(),
            Unit {
                id: bill.id.clone(),
                bearer: Vec::new(),
                value: bill.value,
                backlink: bill.tx_hash.clone(),
                type_id: bill.type_id.clone(),
                dc_nonce: None,
                proof: None,
            },
        );
    }

    /// List a unit id whose unit lookup returns nothing
    pub fn add_dangling_unit(&self, owner_id: &[u8], unit_id: &[u8]) {
        self.state
            .lock()
            .owners
            .entry(owner_id.to_vec())
            .or_default()
            .push(unit_id.to_vec());
    }

    pub fn set_empty_polls(&self, polls: u32) {
        self.state.lock().empty_polls_before_proof = polls;
    }

    pub fn set_reject_submissions(&self, reject: bool) {
        self.state.lock().reject_submissions = reject;
    }

    /// Refuse orders acting on `unit_id` only
    pub fn reject_unit(&self, unit_id: &[u8]) {
        self.state.lock().rejected_units.insert(unit_id.to_vec());
    }

    pub fn unit(&self, unit_id: &[u8]) -> Option<Unit> {
        self.state.lock().units.get(unit_id).cloned()
    }

    pub fn set_offline(&self, offline: bool) {
        self.state.lock().offline = offline;
    }

    pub fn submitted(&self) -> Vec<TransactionOrder> {
        self.state.lock().submitted.clone()
    }

    pub fn replace_proof(&self, tx_hash: [u8; 32], proof: TransactionProof) {
        self.state.lock().proofs.insert(tx_hash, proof);
    }
}

#[async_trait]
impl AlphabillBackend for MockBackend {
    async fn get_units_by_owner(&self, owner_id: &[u8]) -> Result<Vec<Vec<u8>>> {
        let state = self.state.lock();
        if state.offline {
            return Err(Error::NetworkUnavailable("offline".to_string()));
        }
        Ok(state.owners.get(owner_id).cloned().unwrap_or_default())
    }

    async fn get_unit(&self, unit_id: &[u8], include_proof: bool) -> Result<Option<Unit>> {
        let mut unit = self.state.lock().units.get(unit_id).cloned();
        if !include_proof {
            if let Some(unit) = unit.as_mut() {
                unit.proof = None;
            }
        }
        Ok(unit)
    }

    async fn get_round_number(&self) -> Result<u64> {
        Ok(self.state.lock().round)
    }

    async fn submit_transaction(&self, order: &TransactionOrder) -> Result<[u8; 32]> {
        let mut state = self.state.lock();
        if state.reject_submissions || state.rejected_units.contains(&order.payload.unit_id) {
            return Err(Error::Rejected("invalid backlink".to_string()));
        }
        let tx_hash = order.hash();
        let proof = TransactionProof::for_tests(order.clone());
        state.submitted.push(order.clone());
        state.proofs.insert(tx_hash, proof.clone());

        // dust transfers lock the unit until it is swapped
        if let TransactionAttributes::DustCollection(attrs) = &order.payload.attributes {
            if let Some(unit) = state.units.get_mut(&order.payload.unit_id) {
                unit.dc_nonce = Some(attrs.nonce.clone());
                unit.backlink = tx_hash.to_vec();
                unit.proof = Some(proof);
            }
        }
        Ok(tx_hash)
    }

    async fn get_transaction_proof(&self, tx_hash: &[u8]) -> Result<Option<TransactionProof>> {
        let mut state = self.state.lock();
        if state.offline {
            return Err(Error::NetworkUnavailable("offline".to_string()));
        }
        let Ok(key) = <[u8; 32]>::try_from(tx_hash) else {
            return Ok(None);
        };
        let needed = state.empty_polls_before_proof;
        let polls = state.polls.entry(key).or_insert(0);
        if *polls < needed {
            *polls += 1;
            return Ok(None);
        }
        Ok(state.proofs.get(&key).cloned())
    }
}
