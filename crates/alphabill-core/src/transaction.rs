//! Transaction orders and their canonical hashes
//!
//! A transaction is hashed over the concatenation
//! `system_id || unit_id || owner_proof? || timeout || attributes`, with every
//! integer written as 8 bytes big endian. The signature covers the buffer
//! without the owner proof; proofs and swaps refer to the hash with it.

use crate::bill::Bill;
use crate::keys::KeyPair;
use crate::predicate::{create_owner_proof, pay_to_public_key_hash, OwnerProof};
use crate::proof::TransactionProof;
use crate::selection::SelectionResult;
use crate::{Error, Result};
use alphabill_params::Network;
use sha2::{Digest, Sha256};

/// Transfer a whole bill to a new bearer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferAttributes {
    /// Bearer predicate of the receiver
    pub new_bearer: Vec<u8>,
    /// Value of the transferred bill
    pub target_value: u64,
    /// Hash of the previous transaction on the bill
    pub backlink: Vec<u8>,
}

/// Split part of a bill off to a new bearer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitAttributes {
    /// Value of the new bill
    pub amount: u64,
    /// Bearer predicate of the new bill
    pub target_bearer: Vec<u8>,
    /// Value left on the original bill
    pub remaining_value: u64,
    /// Hash of the previous transaction on the bill
    pub backlink: Vec<u8>,
}

/// First phase of dust collection: lock a bill under a nonce
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DustCollectionAttributes {
    /// Hash of the ids of all bills being collected
    pub nonce: Vec<u8>,
    /// Bearer of the bill produced by the swap
    pub target_bearer: Vec<u8>,
    /// Value of the collected bill
    pub target_value: u64,
    /// Hash of the previous transaction on the bill
    pub backlink: Vec<u8>,
}

/// Second phase of dust collection: swap locked bills for one new bill
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapAttributes {
    /// Bearer predicate of the new bill
    pub owner_condition: Vec<u8>,
    /// Ids of the collected bills
    pub bill_ids: Vec<Vec<u8>>,
    /// Signed dust-collection transfers, one per collected bill
    pub dc_transfers: Vec<TransactionOrder>,
    /// Inclusion proofs of the dust-collection transfers
    pub proofs: Vec<TransactionProof>,
    /// Value of the new bill
    pub target_value: u64,
}

/// Transaction kind with only the fields that kind needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionAttributes {
    /// Whole-bill transfer
    Transfer(TransferAttributes),
    /// Bill split
    Split(SplitAttributes),
    /// Dust-collection transfer
    DustCollection(DustCollectionAttributes),
    /// Dust-collection swap
    Swap(SwapAttributes),
}

impl TransactionAttributes {
    /// Backend type name
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Transfer(_) => "trans",
            Self::Split(_) => "split",
            Self::DustCollection(_) => "transDC",
            Self::Swap(_) => "swapDC",
        }
    }

    /// Append the canonical attribute bytes
    pub fn write_bytes(&self, buf: &mut Vec<u8>) {
        match self {
            Self::Transfer(a) => {
                buf.extend_from_slice(&a.new_bearer);
                buf.extend_from_slice(&a.target_value.to_be_bytes());
                buf.extend_from_slice(&a.backlink);
            }
            Self::Split(a) => {
                buf.extend_from_slice(&a.amount.to_be_bytes());
                buf.extend_from_slice(&a.target_bearer);
                buf.extend_from_slice(&a.remaining_value.to_be_bytes());
                buf.extend_from_slice(&a.backlink);
            }
            Self::DustCollection(a) => {
                buf.extend_from_slice(&a.nonce);
                buf.extend_from_slice(&a.target_bearer);
                buf.extend_from_slice(&a.target_value.to_be_bytes());
                buf.extend_from_slice(&a.backlink);
            }
            Self::Swap(a) => {
                buf.extend_from_slice(&a.owner_condition);
                for id in &a.bill_ids {
                    buf.extend_from_slice(id);
                }
                for dc in &a.dc_transfers {
                    buf.extend_from_slice(&dc.bytes());
                }
                for proof in &a.proofs {
                    buf.extend_from_slice(&proof.bytes());
                }
                buf.extend_from_slice(&a.target_value.to_be_bytes());
            }
        }
    }
}

/// Client-side limits attached to a payload
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ClientMetadata {
    /// Round number after which the transaction is void
    pub timeout: u64,
    /// Maximum fee the client accepts
    pub max_fee: u64,
    /// Fee credit record paying for the transaction
    pub fee_credit_record_id: Option<Vec<u8>>,
}

/// Unsigned transaction content
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionPayload {
    /// Partition identifier
    pub system_id: Vec<u8>,
    /// Target unit
    pub unit_id: Vec<u8>,
    /// Kind-specific attributes
    pub attributes: TransactionAttributes,
    /// Timeout and fee limits
    pub client_metadata: ClientMetadata,
}

/// Payload plus the owner proof authorizing it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionOrder {
    /// Transaction content
    pub payload: TransactionPayload,
    /// Predicate argument, absent until signed
    pub owner_proof: Option<OwnerProof>,
}

impl TransactionOrder {
    /// Order without an owner proof
    pub fn unsigned(payload: TransactionPayload) -> Self {
        Self {
            payload,
            owner_proof: None,
        }
    }

    fn write_bytes(&self, buf: &mut Vec<u8>, with_proof: bool) {
        buf.extend_from_slice(&self.payload.system_id);
        buf.extend_from_slice(&self.payload.unit_id);
        if with_proof {
            if let Some(proof) = &self.owner_proof {
                buf.extend_from_slice(&proof.to_script());
            }
        }
        buf.extend_from_slice(&self.payload.client_metadata.timeout.to_be_bytes());
        self.payload.attributes.write_bytes(buf);
    }

    /// Bytes covered by the owner's signature
    pub fn sig_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.write_bytes(&mut buf, false);
        buf
    }

    /// Full canonical bytes, owner proof included
    pub fn bytes(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.write_bytes(&mut buf, true);
        buf
    }

    /// Message that gets signed
    pub fn sig_hash(&self) -> [u8; 32] {
        Sha256::digest(self.sig_bytes()).into()
    }

    /// Primary hash of the order
    pub fn hash(&self) -> [u8; 32] {
        Sha256::digest(self.bytes()).into()
    }

    /// Attach an owner proof made with `key`
    pub fn sign(mut self, key: &KeyPair) -> Result<Self> {
        let proof = create_owner_proof(&self.sig_hash(), key)?;
        tracing::debug!(
            "Signed {} order for unit {}",
            self.payload.attributes.type_name(),
            hex::encode(&self.payload.unit_id)
        );
        self.owner_proof = Some(proof);
        Ok(self)
    }
}

/// Dust-collection nonce: SHA-256 over the concatenated bill ids
pub fn dc_nonce(bills: &[Bill]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    for bill in bills {
        hasher.update(&bill.id);
    }
    hasher.finalize().into()
}

/// Builds payloads for one partition and timeout
#[derive(Debug, Clone)]
pub struct TransactionBuilder {
    system_id: Vec<u8>,
    timeout: u64,
    max_fee: u64,
    fee_credit_record_id: Option<Vec<u8>>,
}

impl TransactionBuilder {
    /// Builder for the money partition of `network`, timing out at `timeout`
    pub fn new(network: &Network, timeout: u64) -> Self {
        Self {
            system_id: network.money_system_id.to_vec(),
            timeout,
            max_fee: network.max_fee,
            fee_credit_record_id: None,
        }
    }

    /// Builder for the round after which the backend drops the transactions
    pub fn for_round(network: &Network, current_round: u64) -> Self {
        Self::new(network, network.timeout_for_round(current_round))
    }

    /// Use another partition
    pub fn with_system_id(mut self, system_id: &[u8]) -> Self {
        self.system_id = system_id.to_vec();
        self
    }

    /// Pay fees from a fee credit record
    pub fn with_fee_credit(mut self, record_id: Vec<u8>) -> Self {
        self.fee_credit_record_id = Some(record_id);
        self
    }

    fn payload(&self, unit_id: &[u8], attributes: TransactionAttributes) -> TransactionPayload {
        TransactionPayload {
            system_id: self.system_id.clone(),
            unit_id: unit_id.to_vec(),
            attributes,
            client_metadata: ClientMetadata {
                timeout: self.timeout,
                max_fee: self.max_fee,
                fee_credit_record_id: self.fee_credit_record_id.clone(),
            },
        }
    }

    /// Transfer `bill` whole to `new_bearer`
    pub fn transfer(&self, bill: &Bill, new_bearer: &[u8]) -> TransactionOrder {
        TransactionOrder::unsigned(self.payload(
            &bill.id,
            TransactionAttributes::Transfer(TransferAttributes {
                new_bearer: new_bearer.to_vec(),
                target_value: bill.value,
                backlink: bill.tx_hash.clone(),
            }),
        ))
    }

    /// Split `amount` off `bill` to `target_bearer`
    pub fn split(&self, bill: &Bill, amount: u64, target_bearer: &[u8]) -> Result<TransactionOrder> {
        if amount == 0 || amount >= bill.value {
            return Err(Error::InvalidAmount(format!(
                "Split amount {} must be between 1 and {}",
                amount,
                bill.value.saturating_sub(1)
            )));
        }
        Ok(TransactionOrder::unsigned(self.payload(
            &bill.id,
            TransactionAttributes::Split(SplitAttributes {
                amount,
                target_bearer: target_bearer.to_vec(),
                remaining_value: bill.value - amount,
                backlink: bill.tx_hash.clone(),
            }),
        )))
    }

    /// Unsigned orders paying a selection to `receiver_pub_key_hash`: one
    /// transfer per whole bill, then the split if there is one
    pub fn build_send(
        &self,
        selection: &SelectionResult,
        receiver_pub_key_hash: &[u8; 32],
    ) -> Result<Vec<TransactionOrder>> {
        let bearer = pay_to_public_key_hash(receiver_pub_key_hash);
        let mut orders: Vec<_> = selection
            .bills_to_transfer
            .iter()
            .map(|bill| self.transfer(bill, &bearer))
            .collect();

        if let (Some(bill), Some(amount)) = (&selection.bill_to_split, selection.split_bill_amount) {
            orders.push(self.split(bill, amount, &bearer)?);
        }
        Ok(orders)
    }

    /// Lock `bill` for collection under `nonce`
    pub fn dust_collection(&self, bill: &Bill, nonce: &[u8], target_bearer: &[u8]) -> TransactionOrder {
        TransactionOrder::unsigned(self.payload(
            &bill.id,
            TransactionAttributes::DustCollection(DustCollectionAttributes {
                nonce: nonce.to_vec(),
                target_bearer: target_bearer.to_vec(),
                target_value: bill.value,
                backlink: bill.tx_hash.clone(),
            }),
        ))
    }

    /// Swap confirmed dust-collection transfers for one bill.
    ///
    /// The new unit id is the shared nonce; every transfer must carry it and
    /// have a matching proof.
    pub fn swap(
        &self,
        dc_transfers: Vec<TransactionOrder>,
        proofs: Vec<TransactionProof>,
        owner_condition: &[u8],
    ) -> Result<TransactionOrder> {
        if dc_transfers.is_empty() || dc_transfers.len() != proofs.len() {
            return Err(Error::InvalidTransaction(format!(
                "Swap needs one proof per transfer, got {} transfers and {} proofs",
                dc_transfers.len(),
                proofs.len()
            )));
        }

        let mut nonce: Option<&[u8]> = None;
        let mut target_value = 0u64;
        let mut bill_ids = Vec::with_capacity(dc_transfers.len());
        for dc in &dc_transfers {
            let TransactionAttributes::DustCollection(attrs) = &dc.payload.attributes else {
                return Err(Error::InvalidTransaction(
                    "Swap accepts only dust-collection transfers".to_string(),
                ));
            };
            match nonce {
                Some(n) if n != attrs.nonce.as_slice() => {
                    return Err(Error::InvalidTransaction(
                        "Dust-collection transfers use different nonces".to_string(),
                    ))
                }
                _ => nonce = Some(&attrs.nonce),
            }
            target_value = target_value
                .checked_add(attrs.target_value)
                .ok_or_else(|| Error::AmountOverflow("Swap value overflows".to_string()))?;
            bill_ids.push(dc.payload.unit_id.clone());
        }
        let unit_id = nonce.map(<[u8]>::to_vec).unwrap_or_default();

        Ok(TransactionOrder::unsigned(self.payload(
            &unit_id,
            TransactionAttributes::Swap(SwapAttributes {
                owner_condition: owner_condition.to_vec(),
                bill_ids,
                dc_transfers,
                proofs,
                target_value,
            }),
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::derive_key;
    use crate::selection::BillSelector;

    const TEST_MNEMONIC: &str =
        "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    fn bill(id: u8, value: u64) -> Bill {
        Bill::new(vec![id; 32], value, vec![0xbb; 32])
    }

    fn builder() -> TransactionBuilder {
        TransactionBuilder::new(&Network::mainnet(), 42)
    }

    #[test]
    fn test_transfer_layout() {
        let order = builder().transfer(&bill(1, 500), &[0x53, 0x51, 0x01]);
        let bytes = order.sig_bytes();

        let mut expected = vec![0, 0, 0, 0];
        expected.extend_from_slice(&[1; 32]);
        expected.extend_from_slice(&42u64.to_be_bytes());
        expected.extend_from_slice(&[0x53, 0x51, 0x01]);
        expected.extend_from_slice(&500u64.to_be_bytes());
        expected.extend_from_slice(&[0xbb; 32]);
        assert_eq!(bytes, expected);
        assert_eq!(order.payload.attributes.type_name(), "trans");
    }

    #[test]
    fn test_split_layout() {
        let order = builder().split(&bill(2, 1000), 300, &[7, 7]).unwrap();
        let bytes = order.sig_bytes();
        let attrs = &bytes[4 + 32 + 8..];

        assert_eq!(&attrs[..8], &300u64.to_be_bytes());
        assert_eq!(&attrs[8..10], &[7, 7]);
        assert_eq!(&attrs[10..18], &700u64.to_be_bytes());
        assert_eq!(&attrs[18..], &[0xbb; 32]);
    }

    #[test]
    fn test_split_bounds() {
        assert!(builder().split(&bill(2, 1000), 0, &[]).is_err());
        assert!(builder().split(&bill(2, 1000), 1000, &[]).is_err());
        assert!(builder().split(&bill(2, 1000), 999, &[]).is_ok());
    }

    #[test]
    fn test_hash_is_deterministic_and_field_sensitive() {
        let a = builder().transfer(&bill(1, 500), &[1]);
        let b = builder().transfer(&bill(1, 500), &[1]);
        assert_eq!(a.sig_hash(), b.sig_hash());

        let later = TransactionBuilder::new(&Network::mainnet(), 43).transfer(&bill(1, 500), &[1]);
        assert_ne!(a.sig_hash(), later.sig_hash());

        let mut other_backlink = bill(1, 500);
        other_backlink.tx_hash = vec![0xcc; 32];
        assert_ne!(a.sig_hash(), builder().transfer(&other_backlink, &[1]).sig_hash());
    }

    #[test]
    fn test_signing_changes_full_hash_only() {
        let key = derive_key(TEST_MNEMONIC, 0).unwrap();
        let unsigned = builder().transfer(&bill(1, 500), &pay_to_public_key_hash(&key.pub_key_hash()));
        let signed = unsigned.clone().sign(&key).unwrap();

        assert_eq!(unsigned.sig_hash(), signed.sig_hash());
        assert_ne!(unsigned.hash(), signed.hash());
        assert!(signed.owner_proof.as_ref().unwrap().verify(&signed.sig_hash()));
        assert_eq!(signed.bytes().len(), signed.sig_bytes().len() + 103);
    }

    #[test]
    fn test_build_send() {
        let bills = vec![bill(1, 100), bill(2, 200), bill(3, 500), bill(4, 1000)];
        let selection = BillSelector::default().select(&bills, 1300).unwrap();
        let orders = builder().build_send(&selection, &[0x44; 32]).unwrap();

        assert_eq!(orders.len(), 2);
        assert_eq!(orders[0].payload.unit_id, vec![4; 32]);
        assert_eq!(orders[0].payload.attributes.type_name(), "trans");
        match &orders[1].payload.attributes {
            TransactionAttributes::Split(attrs) => {
                assert_eq!(attrs.amount, 300);
                assert_eq!(attrs.remaining_value, 200);
                assert_eq!(attrs.target_bearer, pay_to_public_key_hash(&[0x44; 32]));
            }
            other => panic!("unexpected attributes {other:?}"),
        }
    }

    #[test]
    fn test_dc_nonce_and_swap() {
        let bills = vec![bill(1, 10), bill(2, 20)];
        let nonce = dc_nonce(&bills);
        let dcs: Vec<_> = bills
            .iter()
            .map(|b| builder().dust_collection(b, &nonce, &[9]))
            .collect();
        let proofs = dcs.iter().map(|dc| TransactionProof::for_tests(dc.clone())).collect();

        let swap = builder().swap(dcs, proofs, &[9]).unwrap();
        assert_eq!(swap.payload.unit_id, nonce.to_vec());
        match &swap.payload.attributes {
            TransactionAttributes::Swap(attrs) => {
                assert_eq!(attrs.target_value, 30);
                assert_eq!(attrs.bill_ids, vec![vec![1; 32], vec![2; 32]]);
            }
            other => panic!("unexpected attributes {other:?}"),
        }
        assert!(swap.sig_bytes().ends_with(&30u64.to_be_bytes()));
    }

    #[test]
    fn test_swap_rejects_mixed_inputs() {
        let transfer = builder().transfer(&bill(1, 10), &[9]);
        let proof = TransactionProof::for_tests(transfer.clone());
        assert!(builder().swap(vec![transfer], vec![proof], &[9]).is_err());
        assert!(builder().swap(vec![], vec![], &[9]).is_err());
    }
}
