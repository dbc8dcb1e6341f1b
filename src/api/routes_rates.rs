//! Rate API: list the rate table and create or replace a category's rate.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;
use std::sync::Arc;

use super::{body, AppState};
use crate::error::LedgerError;
use crate::ledger::UpsertRate;

pub(super) async fn handler_rates_list(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, LedgerError> {
    let rates = state.ledger.list_rates().await?;
    Ok(Json(json!({ "rates": rates })))
}

/// 201 when the category is new, 200 when an existing rate was replaced.
pub(super) async fn handler_rates_upsert(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<UpsertRate>, JsonRejection>,
) -> Result<impl IntoResponse, LedgerError> {
    let saved = state.ledger.upsert_rate(body(payload)?).await?;
    state.prom_metrics.rate_upserts.inc();
    let status = if saved.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(saved)))
}
