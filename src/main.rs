//! # Main — CLI Entry Point
//!
//! Routes subcommands to the API server and to one-shot ledger commands.
//!
//! ## Subcommands
//!
//! - `serve`: run the HTTP API (Postgres, or `--memory` for an in-process store).
//! - `rates list` / `rates set`: inspect or change the rate table.
//! - `report`: print an earnings aggregation as JSON.
//!
//! ## Global Options
//!
//! - `--database-url` / `DATABASE_URL`: PostgreSQL connection.
//! - `--store-timeout-secs` / `STORE_TIMEOUT_SECS`: bound on each store call (default 5).

mod cli;

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser)]
#[command(name = "piecework", about = "Piece-rate earnings ledger for a tailoring workshop")]
struct Cli {
    /// PostgreSQL connection URL (or set DATABASE_URL env var)
    #[arg(long, env = "DATABASE_URL", global = true)]
    database_url: Option<String>,

    /// Seconds each store call may take before the request fails with 503
    #[arg(long, env = "STORE_TIMEOUT_SECS", default_value_t = 5, global = true)]
    store_timeout_secs: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API server
    Serve {
        /// Port to listen on
        #[arg(long, env = "PORT", default_value_t = 7001)]
        port: u16,
        /// Use an in-process store instead of PostgreSQL (data is lost on exit)
        #[arg(long)]
        memory: bool,
    },
    /// Inspect or change category rates
    Rates {
        #[command(subcommand)]
        action: RatesAction,
    },
    /// Print an earnings aggregation as JSON
    Report {
        /// Last N days ending now
        #[arg(long, conflicts_with_all = ["start", "end"])]
        days: Option<u32>,
        /// Inclusive range start (RFC 3339)
        #[arg(long, requires = "end")]
        start: Option<DateTime<Utc>>,
        /// Inclusive range end (RFC 3339)
        #[arg(long, requires = "start")]
        end: Option<DateTime<Utc>>,
        /// Restrict to one worker
        #[arg(long)]
        worker: Option<Uuid>,
    },
}

#[derive(Subcommand)]
enum RatesAction {
    /// List all rates in category order
    List,
    /// Create or replace the rate for a category
    Set {
        category: String,
        amount: Decimal,
    },
}

fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    // LOG_FORMAT=json for log shippers, human-readable otherwise
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_default();
    if log_format == "json" {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .init();
    }

    let cli = Cli::parse();
    let rt = tokio::runtime::Runtime::new()?;

    match &cli.command {
        Commands::Serve { port, memory } => rt.block_on(cli::run_serve(&cli, *port, *memory)),
        Commands::Rates { action } => match action {
            RatesAction::List => rt.block_on(cli::run_rates_list(&cli)),
            RatesAction::Set { category, amount } => {
                rt.block_on(cli::run_rates_set(&cli, category, *amount))
            }
        },
        Commands::Report {
            days,
            start,
            end,
            worker,
        } => rt.block_on(cli::run_report(&cli, *days, *start, *end, *worker)),
    }
}
