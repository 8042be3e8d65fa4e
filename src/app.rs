//! Background coordinator for tabpilot.
//!
//! Holds the store, the browser surface, and every component, and reacts to
//! the environment: the coarse refresh alarm, new windows, and closed tabs.

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::database::KeyValueStore;
use crate::managers::default_tab_manager::DefaultTabManager;
use crate::platform::TabHost;
use crate::services::refresh_scheduler::{now_ms, RefreshReport, RefreshScheduler, RefreshSchedulerTrait};
use crate::services::rotation_cycle::RotationCycle;
use crate::services::settings_engine::{SettingsEngine, SettingsEngineTrait};
use crate::types::errors::{RegistryError, StoreError};
use crate::types::settings::{HostSettings, MAX_ALARM_PERIOD_SECS};
use crate::types::tab::{TabId, WindowId, WindowKind};

/// Central coordinator shared (behind an `Arc`) by the protocol loop and the
/// timer tasks.
pub struct App {
    pub store: Arc<KeyValueStore>,
    pub host: Arc<dyn TabHost>,
    pub scheduler: RefreshScheduler,
    pub default_tabs: DefaultTabManager,
    settings: Mutex<SettingsEngine>,
    rotation: Mutex<RotationCycle>,
    alarm: Mutex<Option<JoinHandle<()>>>,
}

impl App {
    pub fn new(store: Arc<KeyValueStore>, host: Arc<dyn TabHost>, settings: SettingsEngine) -> Self {
        Self {
            scheduler: RefreshScheduler::new(Arc::clone(&store)),
            default_tabs: DefaultTabManager::new(Arc::clone(&store)),
            rotation: Mutex::new(RotationCycle::new(Arc::clone(&store), Arc::clone(&host))),
            alarm: Mutex::new(None),
            settings: Mutex::new(settings),
            store,
            host,
        }
    }

    /// Opens (or creates) the record database at `db_path`.
    pub fn open<P: AsRef<Path>>(
        db_path: P,
        host: Arc<dyn TabHost>,
        settings: SettingsEngine,
    ) -> Result<Self, StoreError> {
        let store = Arc::new(KeyValueStore::open(db_path)?);
        Ok(Self::new(store, host, settings))
    }

    /// Snapshot of the current settings.
    pub fn settings(&self) -> HostSettings {
        self.with_settings(|engine| engine.get_settings().clone())
    }

    /// Run `f` with exclusive access to the settings engine.
    pub fn with_settings<R>(&self, f: impl FnOnce(&mut SettingsEngine) -> R) -> R {
        let mut engine = self.settings.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut engine)
    }

    /// Run `f` with exclusive access to the rotation cycle.
    pub fn with_rotation<R>(&self, f: impl FnOnce(&mut RotationCycle) -> R) -> R {
        let mut rotation = self.rotation.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut rotation)
    }

    /// Startup sequence: bring rotation back if it was running. Failures are
    /// logged and otherwise ignored.
    pub fn startup(&self) {
        if let Err(e) = self.with_rotation(|r| r.restore()) {
            tracing::warn!(error = %e, "could not restore rotation");
        }
    }

    /// Start the coarse refresh wake-up. Calling it again replaces the old loop.
    pub fn start_alarm(self: &Arc<Self>) {
        let period = Duration::from_secs(
            self.settings()
                .alarm_period_secs
                .clamp(1, MAX_ALARM_PERIOD_SECS),
        );
        let app = Arc::clone(self);
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                if let Err(e) = app.run_refresh_check().await {
                    tracing::warn!(error = %e, "refresh check failed");
                }
            }
        });

        let mut alarm = self.alarm.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(old) = alarm.replace(task) {
            old.abort();
        }
        tracing::info!(period_secs = period.as_secs(), "refresh alarm started");
    }

    pub fn alarm_running(&self) -> bool {
        self.alarm
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .is_some_and(|t| !t.is_finished())
    }

    pub async fn run_refresh_check(&self) -> Result<RefreshReport, StoreError> {
        self.scheduler.check_due(self.host.as_ref(), now_ms()).await
    }

    /// React to a new window: only normal windows get the default tabs.
    pub async fn on_window_created(
        &self,
        window_id: WindowId,
        kind: WindowKind,
    ) -> Result<Vec<TabId>, RegistryError> {
        if kind != WindowKind::Normal {
            tracing::debug!(window_id, ?kind, "ignoring non-normal window");
            return Ok(Vec::new());
        }
        self.default_tabs
            .apply_to_window(self.host.as_ref(), &self.scheduler, window_id)
            .await
    }

    /// React to a closed tab by pruning its refresh entry, if enabled.
    pub fn on_tab_removed(&self, tab_id: TabId) -> Result<bool, StoreError> {
        if !self.settings().prune_closed_tabs {
            return Ok(false);
        }
        self.scheduler.prune_tab(tab_id)
    }

    /// Stop every timer. Stored state is left alone.
    pub fn shutdown(&self) {
        if let Some(task) = self
            .alarm
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
        {
            task.abort();
        }
        self.with_rotation(|r| r.halt());
        tracing::info!("coordinator stopped");
    }
}
