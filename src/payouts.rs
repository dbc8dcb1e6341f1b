//! Payout boundary: where exact decimal earnings become currency subunits.
//!
//! Payouts record what a worker is owed for a period. The amount defaults to
//! that worker's aggregated earnings over the period. Settlement through a
//! payment gateway is out of scope; the gateway's reference is stored as an
//! opaque string.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, Result};
use crate::rates;

/// Minor units per currency unit (paise per rupee).
pub const MINOR_UNITS: i64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayoutMethod {
    Cash,
    Gateway,
}

impl PayoutMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            PayoutMethod::Cash => "cash",
            PayoutMethod::Gateway => "gateway",
        }
    }
}

/// Convert an amount to minor units, rounding half away from zero.
pub fn to_minor_units(amount: Decimal) -> Result<i64> {
    amount
        .checked_mul(Decimal::from(MINOR_UNITS))
        .map(|v| v.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero))
        .and_then(|v| v.to_i64())
        .ok_or_else(|| LedgerError::validation("amount", "too large for minor units"))
}

/// Payout amounts are stored in the same `NUMERIC(14, 4)` shape as rates.
pub fn validate_payout_amount(amount: Decimal) -> Result<Decimal> {
    rates::validate_amount(amount)
}
