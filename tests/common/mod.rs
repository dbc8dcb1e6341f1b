//! Shared test helpers for integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use piecework::api::{build_router, AppState};
use piecework::db::Database;
use piecework::ledger::Ledger;
use piecework::store::MemoryStore;

/// Returns the test database URL from the `TEST_DATABASE_URL` environment variable.
/// Panics if the variable is not set.
pub fn test_db_url() -> String {
    std::env::var("TEST_DATABASE_URL")
        .expect("TEST_DATABASE_URL must be set for database tests")
}

/// Returns true if the test database URL is configured.
pub fn has_test_db() -> bool {
    std::env::var("TEST_DATABASE_URL").is_ok()
}

/// Connect to the test database, apply the reference schema and empty every table.
pub async fn setup_test_db() -> Database {
    let db = Database::connect(&test_db_url())
        .await
        .expect("Failed to connect to test database");
    let schema = std::fs::read_to_string("sql/schema.sql").expect("sql/schema.sql not found");
    sqlx::raw_sql(&schema)
        .execute(db.pool())
        .await
        .expect("schema setup failed");
    truncate_all_tables(db.pool()).await;
    db
}

pub async fn truncate_all_tables(pool: &sqlx::PgPool) {
    sqlx::raw_sql("TRUNCATE TABLE payouts, entries, workers, rates")
        .execute(pool)
        .await
        .unwrap();
}

/// Router over a fresh in-memory store.
pub fn build_memory_app() -> axum::Router {
    build_router(AppState::new(Ledger::in_memory()))
}

/// Router whose store takes `latency` per call, bounded by `timeout`.
pub fn build_slow_app(latency: Duration, timeout: Duration) -> axum::Router {
    let ledger = Ledger::new(Arc::new(MemoryStore::with_latency(latency)), timeout);
    build_router(AppState::new(ledger))
}

/// Router over the test database.
pub async fn build_db_app() -> axum::Router {
    let db = setup_test_db().await;
    let ledger = Ledger::new(Arc::new(db), Duration::from_secs(5));
    build_router(AppState::new(ledger))
}
