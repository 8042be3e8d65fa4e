//! Popup view model for tabpilot.
//!
//! The popup reads `refreshData` once when it opens and recomputes every
//! countdown from that snapshot and the wall clock. It does not re-read the
//! store, so it can disagree with the host about when a tab was last
//! reloaded; both sides may then reload the same tab, which is harmless.

use std::fmt;
use std::sync::Arc;

use crate::database::{KeyValueStore, REFRESH_DATA_KEY, ROTATION_DATA_KEY};
use crate::managers::default_tab_manager::{DefaultTabManager, DefaultTabManagerTrait};
use crate::platform::TabHost;
use crate::services::refresh_scheduler::{RefreshScheduler, RefreshSchedulerTrait};
use crate::types::default_tab::DefaultTabEntry;
use crate::types::errors::{RegistryError, StoreError};
use crate::types::refresh::{RefreshData, RefreshEntry};
use crate::types::rotation::RotationState;
use crate::types::tab::{TabId, WindowId};

/// Bounds of the per-tab interval slider, in minutes.
pub const SLIDER_MIN_MINUTES: i64 = 1;
pub const SLIDER_MAX_MINUTES: i64 = 30;

/// What the countdown label of one tab shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownStatus {
    NoRefresh,
    Due,
    Remaining { minutes: i64, seconds: i64 },
}

impl fmt::Display for CountdownStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CountdownStatus::NoRefresh => write!(f, "No refresh"),
            CountdownStatus::Due => write!(f, "Refreshing..."),
            CountdownStatus::Remaining { minutes, seconds } => {
                write!(f, "Next in {}m {}s", minutes, seconds)
            }
        }
    }
}

/// Read-mostly countdown state built from one `refreshData` snapshot.
#[derive(Debug, Clone, Default)]
pub struct CountdownView {
    snapshot: RefreshData,
}

impl CountdownView {
    pub fn from_snapshot(snapshot: RefreshData) -> Self {
        Self { snapshot }
    }

    pub fn load(store: &KeyValueStore) -> Result<Self, StoreError> {
        Ok(Self::from_snapshot(store.get(REFRESH_DATA_KEY, RefreshData::new())?))
    }

    pub fn entry(&self, tab_id: TabId) -> Option<&RefreshEntry> {
        self.snapshot.get(&tab_id.to_string())
    }

    pub fn status(&self, tab_id: TabId, now_ms: i64) -> CountdownStatus {
        let Some(entry) = self.entry(tab_id).filter(|e| e.is_scheduled()) else {
            return CountdownStatus::NoRefresh;
        };
        let last = if entry.last_refresh_ms == 0 {
            now_ms
        } else {
            entry.last_refresh_ms
        };
        let next = RefreshEntry::new(entry.interval_minutes, last).next_refresh_ms();
        let diff_secs = next.saturating_sub(now_ms).div_euclid(1000);
        if diff_secs <= 0 {
            CountdownStatus::Due
        } else {
            CountdownStatus::Remaining {
                minutes: diff_secs / 60,
                seconds: diff_secs % 60,
            }
        }
    }

    /// Mirror a successful `updateTabInterval` locally.
    pub fn apply_interval(&mut self, tab_id: TabId, minutes: i64, now_ms: i64) {
        let key = tab_id.to_string();
        let last = self
            .snapshot
            .get(&key)
            .map(|e| e.last_refresh_ms)
            .filter(|ms| *ms != 0)
            .unwrap_or(now_ms);
        self.snapshot.insert(key, RefreshEntry::new(minutes, last));
    }

    /// Mirror a successful `removeTabRefresh` locally.
    pub fn forget(&mut self, tab_id: TabId) {
        self.snapshot.remove(&tab_id.to_string());
    }

    /// One countdown poll: reload every due tab among `tab_ids` and write the
    /// new stamp back, both locally and to the store. Returns the reloaded tabs.
    ///
    /// Each tab is handled on its own; a failed reload or store write is
    /// logged and the poll moves on to the next tab.
    pub async fn tick(
        &mut self,
        host: &dyn TabHost,
        scheduler: &RefreshScheduler,
        tab_ids: &[TabId],
        now_ms: i64,
    ) -> Vec<TabId> {
        let mut reloaded = Vec::new();
        for &tab_id in tab_ids {
            if self.status(tab_id, now_ms) != CountdownStatus::Due {
                continue;
            }
            if let Err(e) = host.reload(tab_id).await {
                tracing::debug!(tab_id, error = %e, "popup reload failed");
                continue;
            }
            if let Some(entry) = self.snapshot.get_mut(&tab_id.to_string()) {
                entry.last_refresh_ms = now_ms;
            }
            if let Err(e) = scheduler.mark_refreshed(tab_id, now_ms) {
                tracing::warn!(tab_id, error = %e, "popup could not store refresh stamp");
            }
            reloaded.push(tab_id);
        }
        reloaded
    }
}

/// One row of the popup's tab list.
#[derive(Debug, Clone, PartialEq)]
pub struct TabRow {
    pub tab_id: TabId,
    pub title: String,
    pub slider_minutes: i64,
    pub countdown: CountdownStatus,
}

/// State of the rotation controls for the popup's window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RotationPanel {
    pub interval_secs: i64,
    /// Rotation is active and targets this window.
    pub enabled_here: bool,
}

impl RotationPanel {
    pub fn from_state(state: &RotationState, window_id: WindowId, default_secs: i64) -> Self {
        if state.active_window() == Some(window_id) {
            Self {
                interval_secs: state.interval_secs,
                enabled_here: true,
            }
        } else {
            Self {
                interval_secs: default_secs,
                enabled_here: false,
            }
        }
    }

    /// Label of the toggle button.
    pub fn toggle_label(&self) -> &'static str {
        if self.enabled_here {
            "Disable"
        } else {
            "Enable"
        }
    }
}

/// Everything the popup renders for one window.
#[derive(Debug, Clone)]
pub struct PopupState {
    pub window_id: WindowId,
    pub rows: Vec<TabRow>,
    pub rotation: RotationPanel,
    pub default_tabs: Vec<DefaultTabEntry>,
    pub countdown: CountdownView,
}

impl PopupState {
    pub async fn load(
        host: &dyn TabHost,
        store: &Arc<KeyValueStore>,
        window_id: WindowId,
        default_rotation_secs: i64,
        now_ms: i64,
    ) -> Result<Self, RegistryError> {
        let tabs = match host.query_tabs(window_id).await {
            Ok(tabs) => tabs,
            Err(e) => {
                tracing::debug!(window_id, error = %e, "popup could not list tabs");
                Vec::new()
            }
        };
        let countdown = CountdownView::load(store)?;
        let rotation_state = store.get(ROTATION_DATA_KEY, RotationState::default())?;
        let default_tabs = DefaultTabManager::new(Arc::clone(store)).list()?;

        let rows = tabs
            .iter()
            .map(|tab| TabRow {
                tab_id: tab.id,
                title: tab
                    .title
                    .clone()
                    .filter(|t| !t.is_empty())
                    .unwrap_or_else(|| "Untitled".to_string()),
                slider_minutes: slider_value(countdown.entry(tab.id)),
                countdown: countdown.status(tab.id, now_ms),
            })
            .collect();

        Ok(Self {
            window_id,
            rows,
            rotation: RotationPanel::from_state(&rotation_state, window_id, default_rotation_secs),
            default_tabs,
            countdown,
        })
    }

    pub fn tab_ids(&self) -> Vec<TabId> {
        self.rows.iter().map(|r| r.tab_id).collect()
    }

    /// Recompute every row's countdown label.
    pub fn refresh_countdowns(&mut self, now_ms: i64) {
        for row in &mut self.rows {
            row.countdown = self.countdown.status(row.tab_id, now_ms);
        }
    }
}

fn slider_value(entry: Option<&RefreshEntry>) -> i64 {
    match entry {
        Some(e) if e.interval_minutes > 0 => e
            .interval_minutes
            .clamp(SLIDER_MIN_MINUTES, SLIDER_MAX_MINUTES),
        _ => SLIDER_MIN_MINUTES,
    }
}
