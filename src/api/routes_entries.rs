//! Entry API: record, list and delete production entries.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use super::{body, path, query, AppState};
use crate::db::EntryFilter;
use crate::error::LedgerError;
use crate::ledger::RecordEntry;

pub(super) async fn handler_entries_list(
    State(state): State<Arc<AppState>>,
    filter: Result<Query<EntryFilter>, QueryRejection>,
) -> Result<impl IntoResponse, LedgerError> {
    let entries = state.ledger.list_entries(&query(filter)?).await?;
    Ok(Json(json!({ "entries": entries })))
}

pub(super) async fn handler_entries_create(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RecordEntry>, JsonRejection>,
) -> Result<impl IntoResponse, LedgerError> {
    let entry = state
        .ledger
        .record_entry(body(payload)?, chrono::Utc::now())
        .await?;
    match state.ledger.is_priced(&entry.category).await {
        Ok(priced) => state.prom_metrics.observe_entry(priced),
        Err(e) => tracing::warn!(error = %e, "rate lookup for entry metric failed"),
    }
    Ok((StatusCode::CREATED, Json(entry)))
}

pub(super) async fn handler_entries_delete(
    State(state): State<Arc<AppState>>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<impl IntoResponse, LedgerError> {
    let id = path(id)?;
    state.ledger.delete_entry(id).await?;
    Ok(Json(json!({ "deleted": id })))
}
