use serde::{Deserialize, Serialize};

use super::tab::{TabId, WindowId};

/// Rotation period used when nothing has been stored yet.
pub const DEFAULT_ROTATION_INTERVAL_SECS: i64 = 30;

/// Longest accepted rotation period (one day).
pub const MAX_ROTATION_INTERVAL_SECS: i64 = 24 * 60 * 60;

/// Persisted singleton `rotationData` record.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RotationState {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default, rename = "intervalSec")]
    pub interval_secs: i64,
    #[serde(default, rename = "windowId")]
    pub window_id: Option<WindowId>,
}

impl Default for RotationState {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_secs: DEFAULT_ROTATION_INTERVAL_SECS,
            window_id: None,
        }
    }
}

impl RotationState {
    /// State written by an explicit disable.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            interval_secs: 0,
            window_id: None,
        }
    }

    pub fn enabled(window_id: WindowId, interval_secs: i64) -> Self {
        Self {
            enabled: true,
            interval_secs,
            window_id: Some(window_id),
        }
    }

    /// Whether `secs` is an acceptable rotation period.
    pub fn valid_interval(secs: i64) -> bool {
        (1..=MAX_ROTATION_INTERVAL_SECS).contains(&secs)
    }

    /// Effective state: `enabled` only counts with a window and a period
    /// between 1s and [`MAX_ROTATION_INTERVAL_SECS`].
    pub fn is_active(&self) -> bool {
        self.enabled && self.window_id.is_some() && Self::valid_interval(self.interval_secs)
    }

    /// Window being rotated, if the state is active.
    pub fn active_window(&self) -> Option<WindowId> {
        if self.is_active() {
            self.window_id
        } else {
            None
        }
    }
}

/// Result of a single rotation tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationOutcome {
    /// The active tab moved forward.
    Advanced { from: TabId, to: TabId },
    /// The window had no tabs (or is gone).
    NoTabs,
    /// No tab in the window is marked active.
    NoActiveTab,
    /// The browser refused to activate the next tab.
    Failed { target: TabId },
}
