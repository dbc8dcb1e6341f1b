//! # Store — Ledger Persistence Seam
//!
//! [`LedgerStore`] is the only place the ledger suspends. Two backends
//! implement it:
//!
//! - [`Database`]: PostgreSQL via `sqlx` (production).
//! - [`MemoryStore`]: in-process maps behind a `tokio::sync::RwLock`, used by
//!   `serve --memory` and by the test suites.
//!
//! Both give the same guarantees: one rate row per category (upsert under a
//! single write), inclusive time-range filtering, newest-first listing unless
//! ascending order is requested, and hard deletes.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::db::{
    Category, Database, EntryFilter, NewEntry, NewPayout, NewWorker, Payout, ProductionEntry,
    Worker,
};
use crate::error::Result;

#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn insert_worker(&self, worker: &NewWorker) -> Result<Worker>;
    async fn get_worker(&self, id: Uuid) -> Result<Option<Worker>>;
    async fn list_workers(&self) -> Result<Vec<Worker>>;
    async fn delete_worker(&self, id: Uuid) -> Result<bool>;

    /// Returns the stored row and whether it was newly created.
    async fn upsert_rate(&self, category: &str, amount: Decimal) -> Result<(Category, bool)>;
    async fn get_rate(&self, category: &str) -> Result<Option<Decimal>>;
    async fn list_rates(&self) -> Result<Vec<Category>>;

    async fn insert_entry(&self, entry: &NewEntry) -> Result<ProductionEntry>;
    async fn list_entries(&self, filter: &EntryFilter) -> Result<Vec<ProductionEntry>>;
    async fn delete_entry(&self, id: Uuid) -> Result<bool>;

    async fn insert_payout(&self, payout: &NewPayout) -> Result<Payout>;
    async fn list_payouts(&self) -> Result<Vec<Payout>>;
    async fn mark_payout_paid(
        &self,
        id: Uuid,
        method: &str,
        gateway_ref: Option<&str>,
    ) -> Result<Option<Payout>>;

    async fn health_check(&self) -> Result<()>;
}

#[async_trait]
impl LedgerStore for Database {
    async fn insert_worker(&self, worker: &NewWorker) -> Result<Worker> {
        Ok(Database::insert_worker(self, worker).await?)
    }

    async fn get_worker(&self, id: Uuid) -> Result<Option<Worker>> {
        Ok(Database::get_worker(self, id).await?)
    }

    async fn list_workers(&self) -> Result<Vec<Worker>> {
        Ok(self.get_all_workers().await?)
    }

    async fn delete_worker(&self, id: Uuid) -> Result<bool> {
        Ok(Database::delete_worker(self, id).await?)
    }

    async fn upsert_rate(&self, category: &str, amount: Decimal) -> Result<(Category, bool)> {
        Ok(Database::upsert_rate(self, category, amount).await?)
    }

    async fn get_rate(&self, category: &str) -> Result<Option<Decimal>> {
        Ok(Database::get_rate(self, category).await?)
    }

    async fn list_rates(&self) -> Result<Vec<Category>> {
        Ok(self.get_rates().await?)
    }

    async fn insert_entry(&self, entry: &NewEntry) -> Result<ProductionEntry> {
        Ok(Database::insert_entry(self, entry).await?)
    }

    async fn list_entries(&self, filter: &EntryFilter) -> Result<Vec<ProductionEntry>> {
        Ok(self.get_entries_filtered(filter).await?)
    }

    async fn delete_entry(&self, id: Uuid) -> Result<bool> {
        Ok(Database::delete_entry(self, id).await?)
    }

    async fn insert_payout(&self, payout: &NewPayout) -> Result<Payout> {
        Ok(Database::insert_payout(self, payout).await?)
    }

    async fn list_payouts(&self) -> Result<Vec<Payout>> {
        Ok(self.get_payouts().await?)
    }

    async fn mark_payout_paid(
        &self,
        id: Uuid,
        method: &str,
        gateway_ref: Option<&str>,
    ) -> Result<Option<Payout>> {
        Ok(Database::mark_payout_paid(self, id, method, gateway_ref).await?)
    }

    async fn health_check(&self) -> Result<()> {
        Ok(Database::health_check(self).await?)
    }
}

// ── In-memory backend ───────────────────────────────────────────

#[derive(Default)]
struct MemoryState {
    workers: BTreeMap<Uuid, Worker>,
    rates: BTreeMap<String, Category>,
    entries: BTreeMap<Uuid, ProductionEntry>,
    payouts: BTreeMap<Uuid, Payout>,
}

#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
    latency: Option<Duration>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every call by `latency`, to exercise store timeouts.
    pub fn with_latency(latency: Duration) -> Self {
        MemoryStore {
            latency: Some(latency),
            ..Default::default()
        }
    }

    async fn round_trip(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    async fn insert_worker(&self, worker: &NewWorker) -> Result<Worker> {
        self.round_trip().await;
        let row = Worker {
            id: Uuid::new_v4(),
            name: worker.name.clone(),
            phone_number: worker.phone_number.clone(),
            is_active: true,
            joined_at: Utc::now(),
        };
        self.state.write().await.workers.insert(row.id, row.clone());
        Ok(row)
    }

    async fn get_worker(&self, id: Uuid) -> Result<Option<Worker>> {
        self.round_trip().await;
        Ok(self.state.read().await.workers.get(&id).cloned())
    }

    async fn list_workers(&self) -> Result<Vec<Worker>> {
        self.round_trip().await;
        let mut rows: Vec<Worker> = self.state.read().await.workers.values().cloned().collect();
        rows.sort_by(|a, b| b.joined_at.cmp(&a.joined_at).then(a.id.cmp(&b.id)));
        Ok(rows)
    }

    async fn delete_worker(&self, id: Uuid) -> Result<bool> {
        self.round_trip().await;
        Ok(self.state.write().await.workers.remove(&id).is_some())
    }

    async fn upsert_rate(&self, category: &str, amount: Decimal) -> Result<(Category, bool)> {
        self.round_trip().await;
        let mut state = self.state.write().await;
        let now = Utc::now();
        match state.rates.get_mut(category) {
            Some(existing) => {
                existing.amount = amount;
                existing.updated_at = now;
                Ok((existing.clone(), false))
            }
            None => {
                let row = Category {
                    category: category.to_string(),
                    amount,
                    updated_at: now,
                };
                state.rates.insert(row.category.clone(), row.clone());
                Ok((row, true))
            }
        }
    }

    async fn get_rate(&self, category: &str) -> Result<Option<Decimal>> {
        self.round_trip().await;
        Ok(self.state.read().await.rates.get(category).map(|c| c.amount))
    }

    async fn list_rates(&self) -> Result<Vec<Category>> {
        self.round_trip().await;
        Ok(self.state.read().await.rates.values().cloned().collect())
    }

    async fn insert_entry(&self, entry: &NewEntry) -> Result<ProductionEntry> {
        self.round_trip().await;
        let row = ProductionEntry {
            id: Uuid::new_v4(),
            worker_id: entry.worker_id,
            category: entry.category.clone(),
            quantity: entry.quantity,
            recorded_at: entry.recorded_at,
            recorded_by: entry.recorded_by.clone(),
            created_at: Utc::now(),
        };
        self.state.write().await.entries.insert(row.id, row.clone());
        Ok(row)
    }

    async fn list_entries(&self, filter: &EntryFilter) -> Result<Vec<ProductionEntry>> {
        self.round_trip().await;
        let mut rows: Vec<ProductionEntry> = self
            .state
            .read()
            .await
            .entries
            .values()
            .filter(|e| filter.matches(e))
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.recorded_at.cmp(&b.recorded_at).then(a.id.cmp(&b.id)));
        if filter.safe_sort_dir() == "DESC" {
            rows.reverse();
        }
        if let Some(limit) = filter.limit {
            rows.truncate(usize::try_from(limit.max(0)).unwrap_or(usize::MAX));
        }
        Ok(rows)
    }

    async fn delete_entry(&self, id: Uuid) -> Result<bool> {
        self.round_trip().await;
        Ok(self.state.write().await.entries.remove(&id).is_some())
    }

    async fn insert_payout(&self, payout: &NewPayout) -> Result<Payout> {
        self.round_trip().await;
        let now = Utc::now();
        let row = Payout {
            id: Uuid::new_v4(),
            worker_id: payout.worker_id,
            period_start: payout.period_start,
            period_end: payout.period_end,
            amount: payout.amount,
            status: "pending".to_string(),
            method: None,
            gateway_ref: None,
            created_at: now,
            updated_at: now,
        };
        self.state.write().await.payouts.insert(row.id, row.clone());
        Ok(row)
    }

    async fn list_payouts(&self) -> Result<Vec<Payout>> {
        self.round_trip().await;
        let mut rows: Vec<Payout> = self.state.read().await.payouts.values().cloned().collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(rows)
    }

    async fn mark_payout_paid(
        &self,
        id: Uuid,
        method: &str,
        gateway_ref: Option<&str>,
    ) -> Result<Option<Payout>> {
        self.round_trip().await;
        let mut state = self.state.write().await;
        Ok(state.payouts.get_mut(&id).map(|p| {
            p.status = "paid".to_string();
            p.method = Some(method.to_string());
            p.gateway_ref = gateway_ref.map(str::to_string);
            p.updated_at = Utc::now();
            p.clone()
        }))
    }

    async fn health_check(&self) -> Result<()> {
        self.round_trip().await;
        Ok(())
    }
}
