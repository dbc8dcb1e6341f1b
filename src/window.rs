//! # Window — Time Range Selection for Aggregation
//!
//! A [`Window`] scopes which entries an aggregation sees. It performs no I/O:
//! the ledger turns it into an [`EntryFilter`] and the store does the
//! filtering. Both bounds are inclusive; `None` means unbounded.
//!
//! | Constructor | Range | Label |
//! |-------------|-------|-------|
//! | [`Window::last_n_days`] | `[now - n days, now]` | `last_<n>_days` |
//! | [`Window::weekly`] | `[now - 7 days, now]` | `last_7_days` |
//! | [`Window::all_time`] | unbounded | `all_time` |
//! | [`Window::explicit_range`] | `[start, end]` | `range` |
//!
//! `now` is always passed in so callers (and tests) control the clock.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::{EntryFilter, ProductionEntry};
use crate::error::{LedgerError, Result};

pub const WEEKLY_DAYS: u32 = 7;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Window {
    pub label: String,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl Window {
    pub fn last_n_days(n: u32, now: DateTime<Utc>) -> Result<Window> {
        let start = now
            .checked_sub_signed(Duration::days(i64::from(n)))
            .ok_or_else(|| LedgerError::validation("days", format!("{} days is out of range", n)))?;
        Ok(Window {
            label: format!("last_{}_days", n),
            start: Some(start),
            end: Some(now),
        })
    }

    pub fn weekly(now: DateTime<Utc>) -> Window {
        let start = now - Duration::days(i64::from(WEEKLY_DAYS));
        Window {
            label: format!("last_{}_days", WEEKLY_DAYS),
            start: Some(start),
            end: Some(now),
        }
    }

    pub fn all_time() -> Window {
        Window {
            label: "all_time".to_string(),
            start: None,
            end: None,
        }
    }

    pub fn explicit_range(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Window> {
        if start > end {
            return Err(LedgerError::validation(
                "range",
                format!("start {} is after end {}", start.to_rfc3339(), end.to_rfc3339()),
            ));
        }
        Ok(Window {
            label: "range".to_string(),
            start: Some(start),
            end: Some(end),
        })
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start.map_or(true, |s| at >= s) && self.end.map_or(true, |e| at <= e)
    }

    /// Store filter selecting this window, optionally narrowed to one worker.
    pub fn to_filter(&self, worker_id: Option<Uuid>) -> EntryFilter {
        EntryFilter {
            worker_id,
            start: self.start,
            end: self.end,
            ..Default::default()
        }
    }

    /// In-memory equivalent of [`Window::to_filter`].
    pub fn select<'a>(&self, entries: &'a [ProductionEntry]) -> Vec<&'a ProductionEntry> {
        entries.iter().filter(|e| self.contains(e.recorded_at)).collect()
    }
}

/// Window selection as it arrives on a query string or the command line.
///
/// `days` and `start`/`end` are mutually exclusive; with neither set the
/// window is all time.
#[derive(Debug, Deserialize, Default, Clone)]
pub struct WindowQuery {
    pub days: Option<u32>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl WindowQuery {
    pub fn resolve(&self, now: DateTime<Utc>) -> Result<Window> {
        match (self.days, self.start, self.end) {
            (Some(_), Some(_), _) | (Some(_), _, Some(_)) => Err(LedgerError::validation(
                "days",
                "cannot be combined with start/end",
            )),
            (Some(n), None, None) => Window::last_n_days(n, now),
            (None, Some(start), Some(end)) => Window::explicit_range(start, end),
            (None, Some(_), None) => Err(LedgerError::validation("end", "required with start")),
            (None, None, Some(_)) => Err(LedgerError::validation("start", "required with end")),
            (None, None, None) => Ok(Window::all_time()),
        }
    }
}
