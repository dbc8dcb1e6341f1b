//! # Database — PostgreSQL Storage Layer
//!
//! Async database operations for the workshop ledger via `sqlx::PgPool`.
//!
//! ## Schema
//!
//! - `rates`: category (unique), amount, updated_at
//! - `workers`: id, name, phone_number, is_active, joined_at
//! - `entries`: id, worker_id, category, quantity, recorded_at, recorded_by
//! - `payouts`: id, worker_id, period bounds, amount, status, method
//!
//! `entries.worker_id` and `entries.category` are loose references. Neither
//! is a foreign key: an entry may outlive its worker, and a category may be
//! recorded before it is priced.
//!
//! ## Module Structure
//!
//! - [`rates`]: rate upsert and listing
//! - [`workers`]: worker registry
//! - [`entries`]: entry insert, filtered listing, deletion
//! - [`payouts`]: payout records

mod entries;
mod payouts;
mod rates;
mod workers;

use anyhow::Result;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use uuid::Uuid;

// ── Rate types ──────────────────────────────────────────────────

/// One priced category. At most one row exists per `category`.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct Category {
    pub category: String,
    pub amount: Decimal,
    pub updated_at: DateTime<Utc>,
}

// ── Worker types ────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct Worker {
    pub id: Uuid,
    pub name: String,
    pub phone_number: String,
    pub is_active: bool,
    pub joined_at: DateTime<Utc>,
}

/// Validated input for worker creation.
#[derive(Debug, Clone)]
pub struct NewWorker {
    pub name: String,
    pub phone_number: String,
}

// ── Entry types ─────────────────────────────────────────────────

/// One recorded unit of stitching work. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct ProductionEntry {
    pub id: Uuid,
    pub worker_id: Uuid,
    pub category: String,
    pub quantity: i32,
    pub recorded_at: DateTime<Utc>,
    pub recorded_by: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Validated input for entry insertion. `recorded_at` is already resolved.
#[derive(Debug, Clone)]
pub struct NewEntry {
    pub worker_id: Uuid,
    pub category: String,
    pub quantity: i32,
    pub recorded_at: DateTime<Utc>,
    pub recorded_by: Option<String>,
}

/// Entry listing filter. Both time bounds are inclusive.
#[derive(Debug, Deserialize, Default, Clone)]
pub struct EntryFilter {
    pub worker_id: Option<Uuid>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub order: Option<String>,
    pub limit: Option<i64>,
}

impl EntryFilter {
    /// Whitelist sort direction. Only "asc"/"ASC" are accepted; everything
    /// else defaults to "DESC" (newest first).
    pub(crate) fn safe_sort_dir(&self) -> &str {
        match self.order.as_deref() {
            Some("asc") | Some("ASC") => "ASC",
            _ => "DESC",
        }
    }

    pub(crate) fn matches(&self, entry: &ProductionEntry) -> bool {
        self.worker_id.map_or(true, |w| entry.worker_id == w)
            && self.start.map_or(true, |s| entry.recorded_at >= s)
            && self.end.map_or(true, |e| entry.recorded_at <= e)
    }
}

// ── Payout types ────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct Payout {
    pub id: Uuid,
    pub worker_id: Uuid,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub amount: Decimal,
    pub status: String,
    pub method: Option<String>,
    pub gateway_ref: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewPayout {
    pub worker_id: Uuid,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub amount: Decimal,
}

// ── Database struct and connection ──────────────────────────────

#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Connect to PostgreSQL using the provided database URL.
    ///
    /// Parses the URL by hand so percent-encoded credentials survive intact.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let url = url::Url::parse(database_url)?;
        let username = urlencoding::decode(url.username())?.into_owned();
        let password = url
            .password()
            .map(|p| urlencoding::decode(p).map(|s| s.into_owned()))
            .transpose()?;
        let mut opts = PgConnectOptions::new()
            .host(url.host_str().unwrap_or("localhost"))
            .port(url.port().unwrap_or(5432))
            .database(url.path().trim_start_matches('/'))
            .username(&username);
        if let Some(ref pw) = password {
            opts = opts.password(pw);
        }
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(std::time::Duration::from_secs(3))
            .connect_with(opts)
            .await?;
        Ok(Database { pool })
    }

    /// Get a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Health check: execute `SELECT 1` to verify database connectivity.
    pub async fn health_check(&self) -> Result<(), sqlx::Error> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(())
    }
}

// ── Tests ───────────────────────────────────────────────────────
