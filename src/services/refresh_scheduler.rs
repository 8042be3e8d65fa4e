//! Refresh Scheduler for tabpilot.
//!
//! Per-tab reload intervals live in the `refreshData` record. Nothing here
//! owns a per-tab timer: a coarse periodic wake-up calls [`RefreshScheduler::check_due`],
//! which reloads every tab whose interval has elapsed.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::database::{KeyValueStore, REFRESH_DATA_KEY};
use crate::platform::TabHost;
use crate::types::command::Outcome;
use crate::types::errors::StoreError;
use crate::types::refresh::{RefreshData, RefreshEntry};
use crate::types::tab::TabId;

/// Current wall-clock time in epoch milliseconds.
pub fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

/// What one refresh check did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshReport {
    /// Tabs reloaded and re-stamped.
    pub reloaded: Vec<TabId>,
    /// Tabs that were due but whose reload failed.
    pub failed: Vec<TabId>,
    /// Keys that do not parse as a tab id.
    pub skipped_keys: Vec<String>,
}

/// Trait defining refresh scheduling operations.
pub trait RefreshSchedulerTrait {
    fn set_interval_at(&self, tab_id: TabId, minutes: i64, now_ms: i64) -> Result<RefreshEntry, StoreError>;
    fn clear_interval(&self, tab_id: TabId) -> Result<Outcome, StoreError>;
    fn mark_refreshed(&self, tab_id: TabId, now_ms: i64) -> Result<bool, StoreError>;
    fn prune_tab(&self, tab_id: TabId) -> Result<bool, StoreError>;
    fn entries(&self) -> Result<RefreshData, StoreError>;
    fn entry(&self, tab_id: TabId) -> Result<Option<RefreshEntry>, StoreError>;
    fn due_entries(&self, now_ms: i64) -> Result<Vec<(TabId, RefreshEntry)>, StoreError>;
}

pub struct RefreshScheduler {
    store: Arc<KeyValueStore>,
}

impl RefreshScheduler {
    pub fn new(store: Arc<KeyValueStore>) -> Self {
        Self { store }
    }

    /// Upsert with the current time as the stamp for new entries.
    pub fn set_interval(&self, tab_id: TabId, minutes: i64) -> Result<RefreshEntry, StoreError> {
        self.set_interval_at(tab_id, minutes, now_ms())
    }

    /// Reload every due tab through `host`, then stamp the ones that succeeded.
    ///
    /// Reloads run without holding the store. Each stamp is its own
    /// read-modify-write and only touches entries that still exist, so an
    /// interval changed or removed mid-check is not resurrected.
    pub async fn check_due(&self, host: &dyn TabHost, now_ms: i64) -> Result<RefreshReport, StoreError> {
        let data = self.entries()?;
        let mut report = RefreshReport::default();

        for (key, entry) in &data {
            if !entry.is_due(now_ms) {
                continue;
            }
            let Some(tab_id) = parse_tab_key(key) else {
                tracing::warn!(key = %key, "refresh entry with non-numeric tab id");
                report.skipped_keys.push(key.clone());
                continue;
            };

            match host.reload(tab_id).await {
                Ok(()) => {
                    self.mark_refreshed(tab_id, now_ms)?;
                    tracing::info!(tab_id, interval = entry.interval_minutes, "tab reloaded");
                    report.reloaded.push(tab_id);
                }
                Err(e) => {
                    tracing::debug!(tab_id, error = %e, "reload failed, entry left as is");
                    report.failed.push(tab_id);
                }
            }
        }

        Ok(report)
    }
}

pub(crate) fn parse_tab_key(key: &str) -> Option<TabId> {
    key.trim().parse::<TabId>().ok()
}

impl RefreshSchedulerTrait for RefreshScheduler {
    /// Keeps an existing `lastRefresh` so changing the interval does not
    /// restart the countdown.
    fn set_interval_at(&self, tab_id: TabId, minutes: i64, now_ms: i64) -> Result<RefreshEntry, StoreError> {
        let entry = self
            .store
            .update(REFRESH_DATA_KEY, RefreshData::new(), |data| {
                let last_refresh_ms = data
                    .get(&tab_id.to_string())
                    .map(|e| e.last_refresh_ms)
                    .filter(|ms| *ms != 0)
                    .unwrap_or(now_ms);
                let entry = RefreshEntry::new(minutes, last_refresh_ms);
                data.insert(tab_id.to_string(), entry);
                entry
            })?;
        tracing::debug!(tab_id, minutes, "refresh interval set");
        Ok(entry)
    }

    fn clear_interval(&self, tab_id: TabId) -> Result<Outcome, StoreError> {
        let removed = self
            .store
            .update(REFRESH_DATA_KEY, RefreshData::new(), |data| {
                data.remove(&tab_id.to_string()).is_some()
            })?;
        Ok(if removed {
            Outcome::Removed
        } else {
            Outcome::NotFound
        })
    }

    /// Stamp `lastRefresh` if the entry still exists. Returns whether it did.
    fn mark_refreshed(&self, tab_id: TabId, now_ms: i64) -> Result<bool, StoreError> {
        self.store
            .update(REFRESH_DATA_KEY, RefreshData::new(), |data| {
                match data.get_mut(&tab_id.to_string()) {
                    Some(entry) => {
                        entry.last_refresh_ms = now_ms;
                        true
                    }
                    None => false,
                }
            })
    }

    /// Drop the entry of a tab the browser reported closed.
    fn prune_tab(&self, tab_id: TabId) -> Result<bool, StoreError> {
        let pruned = self.clear_interval(tab_id)? == Outcome::Removed;
        if pruned {
            tracing::info!(tab_id, "pruned refresh entry of closed tab");
        }
        Ok(pruned)
    }

    fn entries(&self) -> Result<RefreshData, StoreError> {
        self.store.get(REFRESH_DATA_KEY, RefreshData::new())
    }

    fn entry(&self, tab_id: TabId) -> Result<Option<RefreshEntry>, StoreError> {
        Ok(self.entries()?.get(&tab_id.to_string()).copied())
    }

    fn due_entries(&self, now_ms: i64) -> Result<Vec<(TabId, RefreshEntry)>, StoreError> {
        Ok(self
            .entries()?
            .iter()
            .filter(|(_, e)| e.is_due(now_ms))
            .filter_map(|(k, e)| parse_tab_key(k).map(|id| (id, *e)))
            .collect())
    }
}
