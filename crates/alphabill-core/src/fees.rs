//! Transaction fee calculation
//!
//! Every transaction in a send (each whole-bill transfer and the split) is
//! charged the same flat fee per bill.

use crate::{Error, Result};

/// Default fee per bill (the legacy money partition charges nothing)
pub const DEFAULT_FEE_PER_BILL: u64 = 0;

/// Maximum fee per bill (safety limit)
pub const MAX_FEE_PER_BILL: u64 = 1_000_000;

/// Flat per-bill fee calculator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeCalculator {
    fee_per_bill: u64,
}

impl FeeCalculator {
    /// Calculator charging `fee_per_bill` on every spent bill
    pub fn new(fee_per_bill: u64) -> Result<Self> {
        Self::validate_fee(fee_per_bill)?;
        Ok(Self { fee_per_bill })
    }

    /// Fee charged per bill
    pub fn fee_per_bill(&self) -> u64 {
        self.fee_per_bill
    }

    /// Total fee for spending `bill_count` bills
    pub fn total_fee(&self, bill_count: usize) -> Result<u64> {
        let count = u64::try_from(bill_count)
            .map_err(|_| Error::AmountOverflow("Bill count too large".to_string()))?;
        self.fee_per_bill.checked_mul(count).ok_or_else(|| {
            Error::AmountOverflow(format!(
                "Fee {} x {} bills overflows",
                self.fee_per_bill, bill_count
            ))
        })
    }

    /// Validate fee is within acceptable range
    pub fn validate_fee(fee: u64) -> Result<()> {
        if fee > MAX_FEE_PER_BILL {
            return Err(Error::InvalidAmount(format!(
                "Fee {} exceeds maximum {}",
                fee, MAX_FEE_PER_BILL
            )));
        }
        Ok(())
    }
}

impl Default for FeeCalculator {
    fn default() -> Self {
        Self {
            fee_per_bill: DEFAULT_FEE_PER_BILL,
        }
    }
}
