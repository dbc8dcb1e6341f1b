//! # Earnings — Piece-Rate Aggregation
//!
//! Converts already-fetched production entries into per-worker earnings using
//! a [`RateTable`] snapshot. [`aggregate`] is a pure, synchronous function: it
//! never touches the store, never suspends, and never fails on data.
//!
//! ## Algorithm
//!
//! For each entry, in any order:
//!
//! 1. Resolve the worker. Unresolvable entries are counted in
//!    `skipped_entries` and contribute nothing else.
//! 2. `earnings = quantity × rate(category)`, where unknown categories price
//!    at zero and are counted in `unpriced_entries`.
//! 3. Add quantity, earnings and one entry to the worker's totals and to the
//!    worker's breakdown for that category.
//!
//! Grand totals: `total_workers` counts workers with at least one counted
//! entry, `total_entries` counts every input entry (skipped ones included),
//! and `total_revenue` is the sum of worker earnings.
//!
//! ## Numerics
//!
//! All money is `rust_decimal::Decimal`, so sums are exact and the result is
//! identical under any permutation of the input. Stored amounts are bounded
//! by `rates::MAX_AMOUNT`; sums saturate at `Decimal::MAX` instead of
//! panicking. Conversion to minor currency
//! units happens only at the payout boundary (see `payouts::to_minor_units`).
//! Results are ordered maps, so equal inputs serialize identically.

use std::collections::{BTreeMap, HashMap};

use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::db::{ProductionEntry, Worker};
use crate::rates::RateTable;
use crate::window::Window;

/// Lookup used to decide whether an entry's worker still exists.
pub trait WorkerDirectory {
    fn resolve(&self, id: &Uuid) -> Option<&Worker>;
}

impl WorkerDirectory for HashMap<Uuid, Worker> {
    fn resolve(&self, id: &Uuid) -> Option<&Worker> {
        self.get(id)
    }
}

impl WorkerDirectory for BTreeMap<Uuid, Worker> {
    fn resolve(&self, id: &Uuid) -> Option<&Worker> {
        self.get(id)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CategoryEarnings {
    pub quantity: i64,
    pub earnings: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkerEarnings {
    pub worker_id: Uuid,
    pub worker_name: String,
    pub worker_phone: String,
    pub total_quantity: i64,
    pub total_earnings: Decimal,
    pub entries: u64,
    pub categories: BTreeMap<String, CategoryEarnings>,
}

impl WorkerEarnings {
    fn new(worker: &Worker) -> Self {
        WorkerEarnings {
            worker_id: worker.id,
            worker_name: worker.name.clone(),
            worker_phone: worker.phone_number.clone(),
            total_quantity: 0,
            total_earnings: Decimal::ZERO,
            entries: 0,
            categories: BTreeMap::new(),
        }
    }

    fn add(&mut self, category: &str, quantity: i64, earnings: Decimal) {
        self.total_quantity += quantity;
        self.total_earnings = self.total_earnings.saturating_add(earnings);
        self.entries += 1;
        let slot = self.categories.entry(category.to_string()).or_default();
        slot.quantity += quantity;
        slot.earnings = slot.earnings.saturating_add(earnings);
    }
}

/// Derived, never-persisted earnings summary for one window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregationResult {
    pub period: String,
    pub window: Window,
    /// Ordered by worker id.
    pub workers: Vec<WorkerEarnings>,
    pub total_workers: usize,
    pub total_entries: usize,
    pub skipped_entries: usize,
    /// Counted entries whose category had no rate.
    pub unpriced_entries: usize,
    pub total_revenue: Decimal,
}

impl AggregationResult {
    pub fn worker(&self, id: Uuid) -> Option<&WorkerEarnings> {
        self.workers
            .binary_search_by(|w| w.worker_id.cmp(&id))
            .ok()
            .map(|i| &self.workers[i])
    }

    /// Entries that were priced and attributed to a worker.
    pub fn counted_entries(&self) -> usize {
        self.total_entries - self.skipped_entries
    }
}

/// Earnings of a single entry. A bounded rate times an `i32` quantity stays
/// below 2.2e19, far inside `Decimal`'s range; saturation covers rows written
/// before the bound existed.
pub fn entry_earnings(quantity: i32, rate: Decimal) -> Decimal {
    rate.saturating_mul(Decimal::from(quantity))
}

pub fn aggregate<'a, I, D>(window: &Window, entries: I, rates: &RateTable, workers: &D) -> AggregationResult
where
    I: IntoIterator<Item = &'a ProductionEntry>,
    D: WorkerDirectory + ?Sized,
{
    let mut per_worker: BTreeMap<Uuid, WorkerEarnings> = BTreeMap::new();
    let mut total_entries = 0usize;
    let mut skipped_entries = 0usize;
    let mut unpriced_entries = 0usize;

    for entry in entries {
        total_entries += 1;
        let Some(worker) = workers.resolve(&entry.worker_id) else {
            skipped_entries += 1;
            continue;
        };
        if !rates.is_priced(&entry.category) {
            unpriced_entries += 1;
        }
        let earnings = entry_earnings(entry.quantity, rates.get_rate(&entry.category));
        per_worker
            .entry(worker.id)
            .or_insert_with(|| WorkerEarnings::new(worker))
            .add(&entry.category, i64::from(entry.quantity), earnings);
    }

    let workers: Vec<WorkerEarnings> = per_worker.into_values().collect();
    let total_revenue = workers
        .iter()
        .fold(Decimal::ZERO, |acc, w| acc.saturating_add(w.total_earnings));

    AggregationResult {
        period: window.label.clone(),
        window: window.clone(),
        total_workers: workers.len(),
        workers,
        total_entries,
        skipped_entries,
        unpriced_entries,
        total_revenue,
    }
}
