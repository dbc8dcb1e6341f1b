//! # Errors — Ledger Failure Taxonomy
//!
//! Every fallible ledger operation returns [`LedgerError`]. The variants map
//! one-to-one onto caller-visible behaviour:
//!
//! | Variant | Meaning | HTTP |
//! |---------|---------|------|
//! | `Validation` | malformed input, never retried | 400 |
//! | `NotFound` | referenced worker/entry/payout is absent | 404 |
//! | `TransientStore` | store unreachable or timed out, retryable | 503 |
//! | `Internal` | anything else | 500 |
//!
//! Dangling worker references found while aggregating are not errors; they
//! are counted in `AggregationResult::skipped_entries`.

use thiserror::Error;

pub type Result<T, E = LedgerError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },

    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: String },

    #[error("store unavailable: {0}")]
    TransientStore(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl LedgerError {
    pub fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        LedgerError::Validation {
            field,
            reason: reason.into(),
        }
    }

    pub fn not_found(kind: &'static str, id: impl ToString) -> Self {
        LedgerError::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    /// True for conditions the caller may retry unchanged.
    pub fn is_transient(&self) -> bool {
        matches!(self, LedgerError::TransientStore(_))
    }
}

impl From<sqlx::Error> for LedgerError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                LedgerError::TransientStore(e.to_string())
            }
            other => LedgerError::Internal(other.into()),
        }
    }
}

impl From<tokio::time::error::Elapsed> for LedgerError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        LedgerError::TransientStore("store call timed out".to_string())
    }
}
