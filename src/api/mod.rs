//! # API — HTTP Server for the Ledger
//!
//! Runs an Axum server exposing rates, entries, workers, stats and payouts as
//! JSON. Every handler goes through [`Ledger`], so validation, timeouts and
//! logging are the same whether the backing store is Postgres or in-memory.
//!
//! Errors render as `{"error": <kind>, ...}` with the status taken from the
//! [`LedgerError`] variant (see [`IntoResponse`] impl below).

mod routes_entries;
mod routes_health;
mod routes_payouts;
mod routes_rates;
mod routes_stats;
mod routes_workers;

use anyhow::Result;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::Request;
use axum::http::{HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, Instrument};

use crate::error::LedgerError;
use crate::ledger::Ledger;
use crate::prom_metrics;

pub struct AppState {
    pub ledger: Ledger,
    pub prom_metrics: prom_metrics::Metrics,
}

impl AppState {
    pub fn new(ledger: Ledger) -> Arc<Self> {
        Arc::new(AppState {
            ledger,
            prom_metrics: prom_metrics::Metrics::new(),
        })
    }
}

// ── Error rendering ─────────────────────────────────────────────

impl IntoResponse for LedgerError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            LedgerError::Validation { field, reason } => (
                StatusCode::BAD_REQUEST,
                json!({"error": "validation", "field": field, "message": reason}),
            ),
            LedgerError::NotFound { .. } => (
                StatusCode::NOT_FOUND,
                json!({"error": "not_found", "message": self.to_string()}),
            ),
            LedgerError::TransientStore(reason) => {
                tracing::warn!(reason = %reason, "store unavailable");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    json!({"error": "unavailable", "message": "try again"}),
                )
            }
            LedgerError::Internal(e) => {
                error!(error = %e, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({"error": "internal", "message": "internal error"}),
                )
            }
        };
        (status, Json(body)).into_response()
    }
}

/// Unwrap a JSON body, turning extractor rejections into validation errors.
fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, LedgerError> {
    payload
        .map(|Json(v)| v)
        .map_err(|e| LedgerError::validation("body", e.body_text()))
}

fn query<T>(
    q: Result<axum::extract::Query<T>, QueryRejection>,
) -> Result<T, LedgerError> {
    q.map(|axum::extract::Query(v)| v)
        .map_err(|e| LedgerError::validation("query", e.body_text()))
}

fn path<T>(p: Result<axum::extract::Path<T>, PathRejection>) -> Result<T, LedgerError> {
    p.map(|axum::extract::Path(v)| v)
        .map_err(|e| LedgerError::validation("id", e.body_text()))
}

// ── Middleware ──────────────────────────────────────────────────

/// Records request duration, propagates or generates `x-request-id`, and
/// runs the request inside a tracing span carrying that id.
async fn metrics_middleware(
    axum::extract::State(state): axum::extract::State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Response {
    let request_id = req
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let method = req.method().to_string();
    let raw_path = req.uri().path().to_string();
    let norm_path = normalize_path(&raw_path);
    let start = std::time::Instant::now();

    let span = tracing::info_span!(
        "request",
        request_id = %request_id,
        method = %method,
        path = %raw_path,
    );
    let mut response = next.run(req).instrument(span).await;

    state
        .prom_metrics
        .http_request_duration
        .get_or_create(&prom_metrics::HttpLabel {
            method,
            path: norm_path,
        })
        .observe(start.elapsed().as_secs_f64());
    if response.status() == StatusCode::SERVICE_UNAVAILABLE && raw_path.starts_with("/api/") {
        state.prom_metrics.store_unavailable.inc();
    }

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert("x-request-id", value);
    }
    response
}

/// Collapse UUID and numeric path segments so histogram labels stay bounded.
fn normalize_path(path: &str) -> String {
    path.split('/')
        .map(|seg| {
            if seg.is_empty() {
                seg.to_string()
            } else if seg.chars().all(|c| c.is_ascii_digit()) {
                ":id".to_string()
            } else if uuid::Uuid::parse_str(seg).is_ok() {
                ":uuid".to_string()
            } else {
                seg.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

// ── Router ──────────────────────────────────────────────────────

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(
            "/api/rates",
            get(routes_rates::handler_rates_list).post(routes_rates::handler_rates_upsert),
        )
        .route(
            "/api/entries",
            get(routes_entries::handler_entries_list).post(routes_entries::handler_entries_create),
        )
        .route(
            "/api/entries/{id}",
            axum::routing::delete(routes_entries::handler_entries_delete),
        )
        .route("/api/stats", get(routes_stats::handler_stats))
        .route("/api/stats/weekly", get(routes_stats::handler_stats_weekly))
        .route("/api/stats/revenue", get(routes_stats::handler_stats_revenue))
        .route(
            "/api/workers",
            get(routes_workers::handler_workers_list).post(routes_workers::handler_workers_create),
        )
        .route(
            "/api/workers/{id}",
            get(routes_workers::handler_workers_get).delete(routes_workers::handler_workers_delete),
        )
        .route(
            "/api/workers/{id}/entries",
            get(routes_workers::handler_worker_entries),
        )
        .route(
            "/api/workers/{id}/weekly-total",
            get(routes_workers::handler_worker_weekly_total),
        )
        .route(
            "/api/payouts",
            get(routes_payouts::handler_payouts_list).post(routes_payouts::handler_payouts_create),
        )
        .route(
            "/api/payouts/{id}/paid",
            post(routes_payouts::handler_payouts_mark_paid),
        )
        .route("/healthz", get(routes_health::handler_healthz))
        .route("/readyz", get(routes_health::handler_readyz))
        .route("/metrics", get(routes_health::handler_metrics))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(CatchPanicLayer::new())
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            metrics_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(RequestBodyLimitLayer::new(64 * 1024))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(30),
        ))
        .with_state(state)
}

pub async fn run(port: u16, ledger: Ledger) -> Result<()> {
    let state = AppState::new(ledger);
    let app = build_router(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "ledger API listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => info!("received SIGINT, shutting down"),
                    _ = sigterm.recv() => info!("received SIGTERM, shutting down"),
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to install SIGTERM handler");
                ctrl_c.await.ok();
                info!("received SIGINT, shutting down");
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("received SIGINT, shutting down");
    }
}
