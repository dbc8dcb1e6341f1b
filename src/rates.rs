//! # Rates — Category Pricing Snapshot
//!
//! A [`RateTable`] is an immutable snapshot of the `rates` store taken at the
//! start of an aggregation. Pricing is fail-open: a category with no stored
//! rate prices at zero rather than rejecting the entry. Amounts are held
//! normalized, so earnings carry no trailing zeros from the store's scale.
//!
//! The validators here run at the API boundary, before anything is written.

use std::collections::BTreeMap;

use rust_decimal::Decimal;

use crate::db::Category;
use crate::error::{LedgerError, Result};

/// Decimal places a stored amount may carry (matches `NUMERIC(14, 4)`).
pub const MAX_RATE_SCALE: u32 = 4;

/// Largest amount a `NUMERIC(14, 4)` column holds: 9,999,999,999.9999.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(0x107A_3FFF, 0x5AF3, 0, false, MAX_RATE_SCALE);

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RateTable {
    rates: BTreeMap<String, Decimal>,
}

impl RateTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rate for `category`, or zero when it has never been priced.
    pub fn get_rate(&self, category: &str) -> Decimal {
        self.rates.get(category).copied().unwrap_or(Decimal::ZERO)
    }

    pub fn is_priced(&self, category: &str) -> bool {
        self.rates.contains_key(category)
    }

    pub fn insert(&mut self, category: impl Into<String>, amount: Decimal) {
        self.rates.insert(category.into(), amount.normalize());
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }
}

impl FromIterator<Category> for RateTable {
    fn from_iter<I: IntoIterator<Item = Category>>(iter: I) -> Self {
        RateTable {
            rates: iter
                .into_iter()
                .map(|c| (c.category, c.amount.normalize()))
                .collect(),
        }
    }
}

impl<'a> FromIterator<(&'a str, Decimal)> for RateTable {
    fn from_iter<I: IntoIterator<Item = (&'a str, Decimal)>>(iter: I) -> Self {
        RateTable {
            rates: iter
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.normalize()))
                .collect(),
        }
    }
}

/// Trim a category identifier and reject it if nothing is left.
pub fn normalize_category(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(LedgerError::validation("category", "must not be empty"));
    }
    Ok(trimmed.to_string())
}

/// A money amount must be non-negative, at most [`MAX_AMOUNT`], and carry
/// at most [`MAX_RATE_SCALE`] decimals. Rates and payouts share this check.
pub fn validate_amount(amount: Decimal) -> Result<Decimal> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(LedgerError::validation("amount", "must not be negative"));
    }
    let amount = amount.normalize();
    if amount.scale() > MAX_RATE_SCALE {
        return Err(LedgerError::validation(
            "amount",
            format!("at most {} decimal places", MAX_RATE_SCALE),
        ));
    }
    if amount > MAX_AMOUNT {
        return Err(LedgerError::validation(
            "amount",
            format!("must not exceed {}", MAX_AMOUNT),
        ));
    }
    Ok(amount)
}
