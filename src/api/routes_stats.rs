//! Stats API: windowed earnings aggregation and revenue.
//!
//! | Endpoint | Window |
//! |----------|--------|
//! | `GET /api/stats/weekly` | last 7 days, all workers |
//! | `GET /api/stats?days=N` | last N days |
//! | `GET /api/stats?start=..&end=..` | explicit inclusive range |
//! | `GET /api/stats` | all time |
//!
//! `worker_id` narrows any of the `/api/stats` forms to one worker.

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use super::{query, AppState};
use crate::earnings::AggregationResult;
use crate::error::LedgerError;
use crate::ledger::Scope;
use crate::window::{Window, WindowQuery};

#[derive(Debug, Deserialize)]
pub(super) struct StatsQuery {
    days: Option<u32>,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
    worker_id: Option<Uuid>,
}

async fn run_aggregation(
    state: &AppState,
    window: &Window,
    scope: Scope,
) -> Result<AggregationResult, LedgerError> {
    let result = state.ledger.aggregate(window, scope).await?;
    state
        .prom_metrics
        .observe_aggregation(&result.period, result.skipped_entries);
    Ok(result)
}

pub(super) async fn handler_stats_weekly(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, LedgerError> {
    let window = Window::weekly(Utc::now());
    Ok(Json(run_aggregation(&state, &window, Scope::AllWorkers).await?))
}

pub(super) async fn handler_stats(
    State(state): State<Arc<AppState>>,
    params: Result<Query<StatsQuery>, QueryRejection>,
) -> Result<impl IntoResponse, LedgerError> {
    let params = query(params)?;
    let window = WindowQuery {
        days: params.days,
        start: params.start,
        end: params.end,
    }
    .resolve(Utc::now())?;
    let scope = Scope::from(params.worker_id);
    Ok(Json(run_aggregation(&state, &window, scope).await?))
}

pub(super) async fn handler_stats_revenue(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, LedgerError> {
    let revenue = state.ledger.revenue().await?;
    state
        .prom_metrics
        .observe_aggregation("all_time", revenue.skipped_entries);
    Ok(Json(revenue))
}
