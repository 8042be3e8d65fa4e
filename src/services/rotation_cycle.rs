//! Rotation Cycle for tabpilot.
//!
//! Moves the active tab forward inside one window on a fixed cadence. The
//! running timer is a field of [`RotationCycle`]; `enable` and `disable` are
//! the only things that start or stop it, and starting always aborts the
//! previous task first, so at most one rotation timer exists.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::database::{KeyValueStore, ROTATION_DATA_KEY};
use crate::platform::TabHost;
use crate::types::errors::{RotationError, StoreError};
use crate::types::rotation::{RotationOutcome, RotationState};
use crate::types::tab::WindowId;

/// Advance the active tab of `window_id` by one position, wrapping at the end.
pub async fn rotate_once(host: &dyn TabHost, window_id: WindowId) -> RotationOutcome {
    let tabs = match host.query_tabs(window_id).await {
        Ok(tabs) => tabs,
        Err(e) => {
            tracing::debug!(window_id, error = %e, "rotation query failed");
            return RotationOutcome::NoTabs;
        }
    };
    if tabs.is_empty() {
        return RotationOutcome::NoTabs;
    }
    let Some(position) = tabs.iter().position(|t| t.active) else {
        return RotationOutcome::NoActiveTab;
    };

    let from = tabs[position].id;
    let to = tabs[(position + 1) % tabs.len()].id;
    match host.activate(to).await {
        Ok(()) => RotationOutcome::Advanced { from, to },
        Err(e) => {
            tracing::debug!(window_id, tab_id = to, error = %e, "rotation activate failed");
            RotationOutcome::Failed { target: to }
        }
    }
}

pub struct RotationCycle {
    store: Arc<KeyValueStore>,
    host: Arc<dyn TabHost>,
    timer: Option<JoinHandle<()>>,
}

impl RotationCycle {
    pub fn new(store: Arc<KeyValueStore>, host: Arc<dyn TabHost>) -> Self {
        Self {
            store,
            host,
            timer: None,
        }
    }

    /// Persist an enabled state for `window_id` and (re)start the timer.
    ///
    /// Must be called from within a tokio runtime.
    pub fn enable(&mut self, window_id: WindowId, interval_secs: i64) -> Result<RotationState, RotationError> {
        if !RotationState::valid_interval(interval_secs) {
            return Err(RotationError::InvalidInterval(interval_secs));
        }
        let state = RotationState::enabled(window_id, interval_secs);
        self.store.set(ROTATION_DATA_KEY, &state)?;
        self.start(state);
        tracing::info!(window_id, interval_secs, "rotation enabled");
        Ok(state)
    }

    /// Persist the disabled state and stop the timer.
    pub fn disable(&mut self) -> Result<(), RotationError> {
        self.store.set(ROTATION_DATA_KEY, &RotationState::disabled())?;
        self.stop();
        tracing::info!("rotation disabled");
        Ok(())
    }

    /// Rehydrate from storage after a restart. The timer only comes back for
    /// an active state.
    pub fn restore(&mut self) -> Result<RotationState, RotationError> {
        let state = self.state()?;
        if state.is_active() {
            self.start(state);
            tracing::info!(
                window_id = state.window_id,
                interval_secs = state.interval_secs,
                "rotation restored"
            );
        } else {
            self.stop();
        }
        Ok(state)
    }

    pub fn state(&self) -> Result<RotationState, StoreError> {
        self.store.get(ROTATION_DATA_KEY, RotationState::default())
    }

    /// Whether a rotation timer task is alive.
    pub fn is_running(&self) -> bool {
        self.timer.as_ref().is_some_and(|t| !t.is_finished())
    }

    fn start(&mut self, state: RotationState) {
        self.stop();
        let Some(window_id) = state.active_window() else {
            return;
        };
        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                tracing::warn!("no async runtime, rotation timer not started");
                return;
            }
        };

        let period = Duration::from_secs(state.interval_secs.unsigned_abs());
        // First advance happens one full period after enabling.
        let Some(first_tick) = Instant::now().checked_add(period) else {
            tracing::warn!(interval_secs = state.interval_secs, "rotation period out of range");
            return;
        };

        let host = Arc::clone(&self.host);
        self.timer = Some(runtime.spawn(async move {
            let mut ticker = tokio::time::interval_at(first_tick, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let outcome = rotate_once(host.as_ref(), window_id).await;
                tracing::trace!(window_id, ?outcome, "rotation tick");
            }
        }));
    }

    /// Stop the timer without touching the stored state, so the next
    /// `restore` brings rotation back.
    pub fn halt(&mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

impl Drop for RotationCycle {
    fn drop(&mut self) {
        self.stop();
    }
}
