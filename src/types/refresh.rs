use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Milliseconds in one minute of refresh interval.
pub const MINUTE_MS: i64 = 60 * 1000;

/// Persisted per-tab refresh configuration.
///
/// Field names match the records the extension already wrote, so existing
/// `refreshData` survives the move to the native host.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct RefreshEntry {
    /// Minutes between reloads. `<= 0` means no scheduled refresh.
    #[serde(default, rename = "interval")]
    pub interval_minutes: i64,
    /// Epoch milliseconds of the last reload (or of scheduling).
    #[serde(default, rename = "lastRefresh")]
    pub last_refresh_ms: i64,
}

impl RefreshEntry {
    pub fn new(interval_minutes: i64, last_refresh_ms: i64) -> Self {
        Self {
            interval_minutes,
            last_refresh_ms,
        }
    }

    /// Whether this entry schedules anything at all.
    pub fn is_scheduled(&self) -> bool {
        self.interval_minutes > 0
    }

    /// Epoch milliseconds at which the next reload becomes due.
    pub fn next_refresh_ms(&self) -> i64 {
        self.last_refresh_ms
            .saturating_add(self.interval_minutes.saturating_mul(MINUTE_MS))
    }

    /// True iff the entry is scheduled and `now_ms` has reached its next refresh.
    pub fn is_due(&self, now_ms: i64) -> bool {
        self.is_scheduled() && now_ms >= self.next_refresh_ms()
    }
}

/// The whole `refreshData` record: tab id (string form) to entry.
pub type RefreshData = BTreeMap<String, RefreshEntry>;
