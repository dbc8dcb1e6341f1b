//! # CLI Execution Functions
//!
//! Execution logic for each subcommand, kept out of `main.rs`. Every command
//! builds a [`Ledger`] and goes through it, so CLI and HTTP share validation.

use anyhow::Result;
use chrono::{DateTime, Utc};
use piecework::db;
use piecework::ledger::{Ledger, Scope, UpsertRate};
use piecework::store::MemoryStore;
use piecework::window::WindowQuery;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

use super::Cli;

async fn connect(cli: &Cli) -> Result<Ledger> {
    let database_url = cli.database_url.as_deref().ok_or_else(|| {
        anyhow::anyhow!("DATABASE_URL is required (set via --database-url or env)")
    })?;
    let database = db::Database::connect(database_url).await?;
    Ok(Ledger::new(
        Arc::new(database),
        Duration::from_secs(cli.store_timeout_secs),
    ))
}

pub async fn run_serve(cli: &Cli, port: u16, memory: bool) -> Result<()> {
    let ledger = if memory {
        warn!("using in-memory store; data will not survive a restart");
        Ledger::new(
            Arc::new(MemoryStore::new()),
            Duration::from_secs(cli.store_timeout_secs),
        )
    } else {
        connect(cli).await?
    };
    info!(
        port,
        memory,
        store_timeout_secs = cli.store_timeout_secs,
        "piecework starting"
    );
    piecework::api::run(port, ledger).await
}

pub async fn run_rates_list(cli: &Cli) -> Result<()> {
    let ledger = connect(cli).await?;
    let rates = ledger.list_rates().await?;
    if rates.is_empty() {
        println!("no rates configured");
    }
    for rate in rates {
        println!("{:<24} {:>12}", rate.category, rate.amount);
    }
    Ok(())
}

pub async fn run_rates_set(cli: &Cli, category: &str, amount: Decimal) -> Result<()> {
    let ledger = connect(cli).await?;
    let saved = ledger
        .upsert_rate(UpsertRate {
            category: category.to_string(),
            amount,
        })
        .await?;
    println!("{}", serde_json::to_string_pretty(&saved)?);
    Ok(())
}

pub async fn run_report(
    cli: &Cli,
    days: Option<u32>,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
    worker: Option<Uuid>,
) -> Result<()> {
    let window = WindowQuery { days, start, end }.resolve(Utc::now())?;
    let ledger = connect(cli).await?;
    let result = ledger.aggregate(&window, Scope::from(worker)).await?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
