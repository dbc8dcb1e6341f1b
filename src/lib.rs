//! Piece-rate earnings ledger for a tailoring workshop.
//!
//! Workers record stitched pieces per category; a mutable rate table prices
//! each category; windowed aggregation turns entries into per-worker
//! earnings for payroll. [`ledger::Ledger`] is the entry point for every
//! surface, backed by any [`store::LedgerStore`].

pub mod api;
pub mod db;
pub mod earnings;
pub mod error;
pub mod ledger;
pub mod payouts;
pub mod prom_metrics;
pub mod rates;
pub mod store;
pub mod window;
