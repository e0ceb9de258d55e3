//! Persisted usage-session records and their aggregate projections.

use serde::{Deserialize, Serialize};

use crate::utils::time::start_of_day_ms;

/// A contiguous interval during which a monitored package held the
/// foreground.
///
/// `end_time` is `None` while the session is open. `date` redundantly stores
/// the local-midnight timestamp of `start_time`'s day so day-bucketed sums
/// stay index-friendly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageSession {
    /// SQLite rowid, assigned on insert. Zero means not yet persisted.
    pub id: i64,
    pub package_name: String,
    pub start_time: i64,
    pub end_time: Option<i64>,
    pub date: i64,
}

impl UsageSession {
    pub fn open(package_name: impl Into<String>, start_time_ms: i64) -> Self {
        Self {
            id: 0,
            package_name: package_name.into(),
            start_time: start_time_ms,
            end_time: None,
            date: start_of_day_ms(start_time_ms),
        }
    }

    pub fn is_open(&self) -> bool {
        self.end_time.is_none()
    }

    /// Elapsed time; open sessions measure against `now_ms`.
    pub fn duration_ms(&self, now_ms: i64) -> i64 {
        (self.end_time.unwrap_or(now_ms) - self.start_time).max(0)
    }
}

/// Per-package aggregate for one day.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyAppStats {
    pub package_name: String,
    pub session_count: i64,
    pub total_time_ms: i64,
}

/// Coarse store statistics, used for diagnostics and retention decisions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseStats {
    pub total_records: i64,
    pub oldest_ms: Option<i64>,
    pub newest_ms: Option<i64>,
}
