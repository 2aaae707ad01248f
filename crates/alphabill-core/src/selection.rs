//! Bill selection for payments
//!
//! Greedy selection: take the smallest bill that covers what is still needed,
//! otherwise take the largest bill below it and continue with the rest. When
//! the selection overshoots, one selected bill is split and the difference
//! stays with the sender.

use crate::bill::{total_value, Bill};
use crate::fees::FeeCalculator;
use crate::{Error, Result};

/// Outcome of a bill selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionResult {
    /// All bills touched by the payment
    pub optimal_bills: Vec<Bill>,
    /// Bill that is split, if the selection overshoots
    pub bill_to_split: Option<Bill>,
    /// Bills transferred whole to the receiver
    pub bills_to_transfer: Vec<Bill>,
    /// Value split off `bill_to_split` for the receiver
    pub split_bill_amount: Option<u64>,
    /// Total fee for every selected bill
    pub total_fee: u64,
}

impl SelectionResult {
    /// Value the sender keeps from the split bill
    pub fn remainder(&self) -> u64 {
        match (&self.bill_to_split, self.split_bill_amount) {
            (Some(bill), Some(amount)) => bill.value - amount,
            _ => 0,
        }
    }

    /// Value leaving the sender's selected bills
    pub fn amount_sent(&self) -> u64 {
        self.bills_to_transfer.iter().map(|b| b.value).sum::<u64>()
            + self.split_bill_amount.unwrap_or(0)
    }
}

/// Bill selector
#[derive(Debug, Clone, Default)]
pub struct BillSelector {
    fees: FeeCalculator,
}

impl BillSelector {
    /// Selector charging the calculator's fee on every selected bill
    pub fn new(fees: FeeCalculator) -> Self {
        Self { fees }
    }

    /// Selector with a flat per-bill fee
    pub fn with_fee_per_bill(fee_per_bill: u64) -> Result<Self> {
        Ok(Self::new(FeeCalculator::new(fee_per_bill)?))
    }

    /// Select bills covering `target` and decide on a split
    pub fn select(&self, bills: &[Bill], target: u64) -> Result<SelectionResult> {
        let optimal = self.optimal_bills(bills, target)?;
        self.split_plan(optimal, target)
    }

    /// Greedy pick of the bills to spend
    pub fn optimal_bills(&self, bills: &[Bill], target: u64) -> Result<Vec<Bill>> {
        if target == 0 {
            return Err(Error::InvalidAmount("Amount must be greater than zero".to_string()));
        }
        let fee = self.fees.fee_per_bill();

        tracing::debug!(
            "Selecting bills: target={}, fee_per_bill={}, available={}",
            target,
            fee,
            bills.len()
        );

        // ascending by value, id breaks ties so equal inputs select identically
        let mut pool: Vec<&Bill> = bills.iter().collect();
        pool.sort_by(|a, b| a.value.cmp(&b.value).then_with(|| a.id.cmp(&b.id)));

        let mut selected = Vec::new();
        let mut remaining = target;

        loop {
            let needed = remaining.checked_add(fee).ok_or_else(|| {
                Error::AmountOverflow("Amount plus fee overflows".to_string())
            })?;

            if let Some(pos) = pool.iter().position(|b| b.value >= needed) {
                selected.push(pool.remove(pos).clone());
                break;
            }

            // every remaining bill is below `needed`; the largest is the closest
            let Some(bill) = pool.pop() else {
                let available = total_value(bills).unwrap_or(u64::MAX);
                return Err(Error::InsufficientFunds(format!(
                    "Required {} plus fees, have {}",
                    target, available
                )));
            };
            remaining = needed - bill.value;
            selected.push(bill.clone());
        }

        Ok(selected)
    }

    /// Work out which selected bill to split and by how much.
    ///
    /// `difference = sum(selected) - target - fee * count`; the split bill is
    /// the smallest selected bill worth more than the difference.
    pub fn split_plan(&self, selected: Vec<Bill>, target: u64) -> Result<SelectionResult> {
        let total_fee = self.fees.total_fee(selected.len())?;
        let sum = total_value(&selected)
            .ok_or_else(|| Error::AmountOverflow("Selected bills overflow u64".to_string()))?;
        let required = target
            .checked_add(total_fee)
            .ok_or_else(|| Error::AmountOverflow("Amount plus fees overflows".to_string()))?;

        let Some(difference) = sum.checked_sub(required) else {
            return Err(Error::InsufficientFunds(format!(
                "Selected {} but {} is required",
                sum, required
            )));
        };

        if difference == 0 {
            tracing::info!("Selected {} bills, exact match, no split", selected.len());
            return Ok(SelectionResult {
                bills_to_transfer: selected.clone(),
                optimal_bills: selected,
                bill_to_split: None,
                split_bill_amount: None,
                total_fee,
            });
        }

        let bill_to_split = selected
            .iter()
            .filter(|b| b.value > difference)
            .min_by(|a, b| a.value.cmp(&b.value).then_with(|| a.id.cmp(&b.id)))
            .cloned()
            .ok_or_else(|| {
                Error::InsufficientFunds(format!("No selected bill can absorb {}", difference))
            })?;

        let split_bill_amount = bill_to_split.value - difference;
        let bills_to_transfer = selected
            .iter()
            .filter(|b| b.id != bill_to_split.id)
            .cloned()
            .collect();

        tracing::info!(
            "Selected {} bills, splitting {} into {} for receiver and {} change",
            selected.len(),
            bill_to_split.id_hex(),
            split_bill_amount,
            difference
        );

        Ok(SelectionResult {
            optimal_bills: selected,
            bill_to_split: Some(bill_to_split),
            bills_to_transfer,
            split_bill_amount: Some(split_bill_amount),
            total_fee,
        })
    }

    /// Bills of `type_id` that are not locked in a dust collection
    pub fn spendable(bills: &[Bill], type_id: &str) -> Vec<Bill> {
        bills
            .iter()
            .filter(|b| b.type_id == type_id && !b.is_dc_bill && b.value > 0)
            .cloned()
            .collect()
    }

    /// Check if bills are sufficient without selecting
    pub fn check_sufficient(bills: &[Bill], required_amount: u64) -> bool {
        Self::total_available(bills) >= required_amount
    }

    /// Get total available value
    pub fn total_available(bills: &[Bill]) -> u64 {
        total_value(bills).unwrap_or(u64::MAX)
    }
}
