//! # Ledger — Validated Operations over a Store
//!
//! [`Ledger`] is the service every surface (HTTP, CLI) goes through. It owns
//! an injected [`LedgerStore`] and adds three things the store does not:
//!
//! - **Boundary validation.** Typed request structs are checked before any
//!   store call; malformed input never reaches the store.
//! - **Bounded store calls.** Each store call runs under `store_timeout`. A
//!   timeout aborts the whole operation with `TransientStore`; partial
//!   aggregations are never returned.
//! - **Snapshotting.** An aggregation fetches the rate table, the windowed
//!   entries and the worker directory afresh, then hands them to the pure
//!   [`earnings::aggregate`]. Nothing is cached between calls, so a rate
//!   change is visible to every aggregation that starts after the upsert
//!   commits.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::db::{Category, EntryFilter, NewEntry, NewPayout, NewWorker, Payout, ProductionEntry, Worker};
use crate::earnings::{self, AggregationResult};
use crate::error::{LedgerError, Result};
use crate::payouts::{self, PayoutMethod};
use crate::rates::{self, RateTable};
use crate::store::{LedgerStore, MemoryStore};
use crate::window::Window;

pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(5);

/// Which workers an aggregation covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    AllWorkers,
    Worker(Uuid),
}

impl Scope {
    pub fn worker_id(self) -> Option<Uuid> {
        match self {
            Scope::AllWorkers => None,
            Scope::Worker(id) => Some(id),
        }
    }
}

impl From<Option<Uuid>> for Scope {
    fn from(worker_id: Option<Uuid>) -> Self {
        worker_id.map_or(Scope::AllWorkers, Scope::Worker)
    }
}

// ── Request types ───────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct CreateWorker {
    pub name: String,
    pub phone_number: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpsertRate {
    pub category: String,
    pub amount: Decimal,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecordEntry {
    pub worker_id: Uuid,
    pub category: String,
    pub quantity: i64,
    #[serde(default)]
    pub recorded_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub recorded_by: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePayout {
    pub worker_id: Uuid,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    /// Defaults to the worker's earnings over the period.
    #[serde(default)]
    pub amount: Option<Decimal>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MarkPaid {
    pub method: PayoutMethod,
    #[serde(default)]
    pub gateway_ref: Option<String>,
}

// ── Response types ──────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct RateUpsert {
    #[serde(flatten)]
    pub rate: Category,
    pub created: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RevenueSummary {
    pub total_revenue: Decimal,
    pub total_entries: usize,
    pub skipped_entries: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkerTotal {
    pub worker_id: Uuid,
    pub period: String,
    pub total: Decimal,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PayoutView {
    #[serde(flatten)]
    pub payout: Payout,
    pub amount_minor: i64,
}

impl TryFrom<Payout> for PayoutView {
    type Error = LedgerError;

    fn try_from(payout: Payout) -> Result<Self> {
        let amount_minor = payouts::to_minor_units(payout.amount)?;
        Ok(PayoutView {
            payout,
            amount_minor,
        })
    }
}

// ── Service ─────────────────────────────────────────────────────

#[derive(Clone)]
pub struct Ledger {
    store: Arc<dyn LedgerStore>,
    store_timeout: Duration,
}

impl Ledger {
    pub fn new(store: Arc<dyn LedgerStore>, store_timeout: Duration) -> Self {
        Ledger {
            store,
            store_timeout,
        }
    }

    /// Ledger over a fresh [`MemoryStore`].
    pub fn in_memory() -> Self {
        Ledger::new(Arc::new(MemoryStore::new()), DEFAULT_STORE_TIMEOUT)
    }

    async fn bounded<T>(&self, call: impl Future<Output = Result<T>>) -> Result<T> {
        tokio::time::timeout(self.store_timeout, call).await?
    }

    pub async fn health_check(&self) -> Result<()> {
        self.bounded(self.store.health_check()).await
    }

    // ── Workers ─────────────────────────────────────────────────

    pub async fn create_worker(&self, req: CreateWorker) -> Result<Worker> {
        let name = req.name.trim();
        if name.is_empty() {
            return Err(LedgerError::validation("name", "must not be empty"));
        }
        let phone_number = req.phone_number.trim();
        if phone_number.is_empty() {
            return Err(LedgerError::validation("phone_number", "must not be empty"));
        }
        let worker = self
            .bounded(self.store.insert_worker(&NewWorker {
                name: name.to_string(),
                phone_number: phone_number.to_string(),
            }))
            .await?;
        info!(worker_id = %worker.id, name = %worker.name, "worker created");
        Ok(worker)
    }

    /// Look up a worker, failing with `NotFound` when absent.
    pub async fn resolve_worker(&self, id: Uuid) -> Result<Worker> {
        self.bounded(self.store.get_worker(id))
            .await?
            .ok_or_else(|| LedgerError::not_found("worker", id))
    }

    pub async fn list_workers(&self) -> Result<Vec<Worker>> {
        self.bounded(self.store.list_workers()).await
    }

    /// Remove a worker. Their entries stay and are skipped by aggregation.
    pub async fn delete_worker(&self, id: Uuid) -> Result<()> {
        if !self.bounded(self.store.delete_worker(id)).await? {
            return Err(LedgerError::not_found("worker", id));
        }
        info!(worker_id = %id, "worker deleted");
        Ok(())
    }

    // ── Rates ───────────────────────────────────────────────────

    /// Stored rate for `category`, or zero if it has never been priced.
    pub async fn get_rate(&self, category: &str) -> Result<Decimal> {
        Ok(self
            .bounded(self.store.get_rate(category))
            .await?
            .unwrap_or(Decimal::ZERO))
    }

    pub async fn upsert_rate(&self, req: UpsertRate) -> Result<RateUpsert> {
        let category = rates::normalize_category(&req.category)?;
        let amount = rates::validate_amount(req.amount)?;
        let (mut rate, created) = self
            .bounded(self.store.upsert_rate(&category, amount))
            .await?;
        rate.amount = rate.amount.normalize();
        info!(category = %rate.category, amount = %rate.amount, created, "rate saved");
        Ok(RateUpsert { rate, created })
    }

    /// All rates in category order. Amounts come back without trailing zeros
    /// whatever scale the store keeps.
    pub async fn list_rates(&self) -> Result<Vec<Category>> {
        let mut rates = self.bounded(self.store.list_rates()).await?;
        for rate in &mut rates {
            rate.amount = rate.amount.normalize();
        }
        Ok(rates)
    }

    pub async fn rate_table(&self) -> Result<RateTable> {
        Ok(self.list_rates().await?.into_iter().collect())
    }

    /// Whether `category` has a stored rate.
    pub async fn is_priced(&self, category: &str) -> Result<bool> {
        Ok(self.bounded(self.store.get_rate(category)).await?.is_some())
    }

    // ── Entries ─────────────────────────────────────────────────

    /// Record one entry. `recorded_at` defaults to `now`.
    pub async fn record_entry(&self, req: RecordEntry, now: DateTime<Utc>) -> Result<ProductionEntry> {
        let category = rates::normalize_category(&req.category)?;
        if req.quantity < 1 {
            return Err(LedgerError::validation("quantity", "must be at least 1"));
        }
        let quantity = i32::try_from(req.quantity)
            .map_err(|_| LedgerError::validation("quantity", "too large"))?;
        let worker = self.resolve_worker(req.worker_id).await?;

        let entry = self
            .bounded(self.store.insert_entry(&NewEntry {
                worker_id: worker.id,
                category,
                quantity,
                recorded_at: req.recorded_at.unwrap_or(now),
                recorded_by: req
                    .recorded_by
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty()),
            }))
            .await?;
        info!(
            entry_id = %entry.id,
            worker = %worker.name,
            category = %entry.category,
            quantity = entry.quantity,
            "entry recorded"
        );
        Ok(entry)
    }

    pub async fn list_entries(&self, filter: &EntryFilter) -> Result<Vec<ProductionEntry>> {
        if let (Some(start), Some(end)) = (filter.start, filter.end) {
            Window::explicit_range(start, end)?;
        }
        if filter.limit.is_some_and(|l| l < 0) {
            return Err(LedgerError::validation("limit", "must not be negative"));
        }
        self.bounded(self.store.list_entries(filter)).await
    }

    /// Permanently remove an entry (corrections only).
    pub async fn delete_entry(&self, id: Uuid) -> Result<()> {
        if !self.bounded(self.store.delete_entry(id)).await? {
            return Err(LedgerError::not_found("entry", id));
        }
        info!(entry_id = %id, "entry deleted");
        Ok(())
    }

    // ── Aggregation ─────────────────────────────────────────────

    async fn directory(&self, scope: Scope) -> Result<HashMap<Uuid, Worker>> {
        let workers = match scope {
            Scope::AllWorkers => self.bounded(self.store.list_workers()).await?,
            Scope::Worker(id) => self
                .bounded(self.store.get_worker(id))
                .await?
                .into_iter()
                .collect(),
        };
        Ok(workers.into_iter().map(|w| (w.id, w)).collect())
    }

    /// Aggregate earnings for `window` over `scope` from fresh snapshots.
    pub async fn aggregate(&self, window: &Window, scope: Scope) -> Result<AggregationResult> {
        let filter = window.to_filter(scope.worker_id());
        let (rates, entries, workers) = tokio::try_join!(
            self.bounded(self.store.list_rates()),
            self.bounded(self.store.list_entries(&filter)),
            self.directory(scope),
        )?;
        let table: RateTable = rates.into_iter().collect();
        debug!(
            rates = table.len(),
            entries = entries.len(),
            workers = workers.len(),
            "aggregation snapshot fetched"
        );

        let result = earnings::aggregate(window, &entries, &table, &workers);
        info!(
            period = %result.period,
            workers = result.total_workers,
            entries = result.total_entries,
            skipped = result.skipped_entries,
            unpriced = result.unpriced_entries,
            revenue = %result.total_revenue,
            "earnings aggregated"
        );
        Ok(result)
    }

    /// All-time revenue across every worker.
    pub async fn revenue(&self) -> Result<RevenueSummary> {
        let result = self.aggregate(&Window::all_time(), Scope::AllWorkers).await?;
        Ok(RevenueSummary {
            total_revenue: result.total_revenue,
            total_entries: result.total_entries,
            skipped_entries: result.skipped_entries,
        })
    }

    /// One worker's earnings and entry count over the last seven days.
    pub async fn weekly_total(&self, worker_id: Uuid, now: DateTime<Utc>) -> Result<WorkerTotal> {
        self.resolve_worker(worker_id).await?;
        let window = Window::weekly(now);
        let result = self.aggregate(&window, Scope::Worker(worker_id)).await?;
        let (total, count) = result
            .worker(worker_id)
            .map_or((Decimal::ZERO, 0), |w| (w.total_earnings, w.entries));
        Ok(WorkerTotal {
            worker_id,
            period: result.period,
            total,
            count,
        })
    }

    // ── Payouts ─────────────────────────────────────────────────

    pub async fn create_payout(&self, req: CreatePayout) -> Result<PayoutView> {
        let window = Window::explicit_range(req.period_start, req.period_end)?;
        let supplied = req.amount.map(payouts::validate_payout_amount).transpose()?;
        self.resolve_worker(req.worker_id).await?;

        let amount = match supplied {
            Some(amount) => amount,
            None => payouts::validate_payout_amount(
                self.aggregate(&window, Scope::Worker(req.worker_id))
                    .await?
                    .worker(req.worker_id)
                    .map_or(Decimal::ZERO, |w| w.total_earnings),
            )?,
        };
        let payout = self
            .bounded(self.store.insert_payout(&NewPayout {
                worker_id: req.worker_id,
                period_start: req.period_start,
                period_end: req.period_end,
                amount,
            }))
            .await?;
        info!(payout_id = %payout.id, worker_id = %payout.worker_id, amount = %payout.amount, "payout created");
        PayoutView::try_from(payout)
    }

    pub async fn list_payouts(&self) -> Result<Vec<PayoutView>> {
        self.bounded(self.store.list_payouts())
            .await?
            .into_iter()
            .map(PayoutView::try_from)
            .collect()
    }

    pub async fn mark_payout_paid(&self, id: Uuid, req: MarkPaid) -> Result<PayoutView> {
        let gateway_ref = req
            .gateway_ref
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());
        if req.method == PayoutMethod::Gateway && gateway_ref.is_none() {
            return Err(LedgerError::validation(
                "gateway_ref",
                "required for gateway payouts",
            ));
        }
        let payout = self
            .bounded(self.store.mark_payout_paid(id, req.method.as_str(), gateway_ref))
            .await?
            .ok_or_else(|| LedgerError::not_found("payout", id))?;
        info!(payout_id = %id, method = req.method.as_str(), "payout marked paid");
        PayoutView::try_from(payout)
    }
}
