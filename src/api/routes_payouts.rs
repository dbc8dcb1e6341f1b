//! Payout API: create payout records and mark them settled.

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use super::{body, path, AppState};
use crate::error::LedgerError;
use crate::ledger::{CreatePayout, MarkPaid};

pub(super) async fn handler_payouts_list(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, LedgerError> {
    let payouts = state.ledger.list_payouts().await?;
    Ok(Json(json!({ "payouts": payouts })))
}

pub(super) async fn handler_payouts_create(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CreatePayout>, JsonRejection>,
) -> Result<impl IntoResponse, LedgerError> {
    let payout = state.ledger.create_payout(body(payload)?).await?;
    Ok((StatusCode::CREATED, Json(payout)))
}

pub(super) async fn handler_payouts_mark_paid(
    State(state): State<Arc<AppState>>,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<MarkPaid>, JsonRejection>,
) -> Result<impl IntoResponse, LedgerError> {
    let payout = state
        .ledger
        .mark_payout_paid(path(id)?, body(payload)?)
        .await?;
    Ok(Json(payout))
}
