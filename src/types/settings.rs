use serde::{Deserialize, Serialize};

use super::rotation::DEFAULT_ROTATION_INTERVAL_SECS;

/// Longest accepted refresh alarm period (one day).
pub const MAX_ALARM_PERIOD_SECS: u64 = 24 * 60 * 60;

/// Host process settings, stored as JSON in the platform config directory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HostSettings {
    /// Period of the coarse refresh wake-up.
    pub alarm_period_secs: u64,
    /// Rotation period shown when nothing is stored.
    pub default_rotation_interval_secs: i64,
    /// How long a bridged browser call may stay unanswered.
    pub bridge_timeout_ms: u64,
    /// Drop a tab's refresh entry when the browser reports it closed.
    pub prune_closed_tabs: bool,
    /// `tracing` filter directive used when `RUST_LOG` is unset.
    pub log_filter: String,
}

impl Default for HostSettings {
    fn default() -> Self {
        Self {
            alarm_period_secs: 60,
            default_rotation_interval_secs: DEFAULT_ROTATION_INTERVAL_SECS,
            bridge_timeout_ms: 5000,
            prune_closed_tabs: true,
            log_filter: "tabpilot=info".to_string(),
        }
    }
}
