//! Worker API: directory CRUD plus per-worker entries and weekly totals.

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use super::{body, path, AppState};
use crate::db::EntryFilter;
use crate::error::LedgerError;
use crate::ledger::CreateWorker;

pub(super) async fn handler_workers_list(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, LedgerError> {
    let workers = state.ledger.list_workers().await?;
    Ok(Json(json!({ "workers": workers })))
}

pub(super) async fn handler_workers_create(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CreateWorker>, JsonRejection>,
) -> Result<impl IntoResponse, LedgerError> {
    let worker = state.ledger.create_worker(body(payload)?).await?;
    Ok((StatusCode::CREATED, Json(worker)))
}

pub(super) async fn handler_workers_get(
    State(state): State<Arc<AppState>>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<impl IntoResponse, LedgerError> {
    let worker = state.ledger.resolve_worker(path(id)?).await?;
    Ok(Json(worker))
}

pub(super) async fn handler_workers_delete(
    State(state): State<Arc<AppState>>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<impl IntoResponse, LedgerError> {
    let id = path(id)?;
    state.ledger.delete_worker(id).await?;
    Ok(Json(json!({ "deleted": id })))
}

/// Newest first.
pub(super) async fn handler_worker_entries(
    State(state): State<Arc<AppState>>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<impl IntoResponse, LedgerError> {
    let worker = state.ledger.resolve_worker(path(id)?).await?;
    let filter = EntryFilter {
        worker_id: Some(worker.id),
        ..Default::default()
    };
    let entries = state.ledger.list_entries(&filter).await?;
    Ok(Json(json!({ "worker": worker, "entries": entries })))
}

pub(super) async fn handler_worker_weekly_total(
    State(state): State<Arc<AppState>>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<impl IntoResponse, LedgerError> {
    let total = state
        .ledger
        .weekly_total(path(id)?, chrono::Utc::now())
        .await?;
    Ok(Json(total))
}
