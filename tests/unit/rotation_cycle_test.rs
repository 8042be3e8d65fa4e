use std::sync::{Arc, Mutex};
use std::time::Duration;

use tabpilot::database::{KeyValueStore, ROTATION_DATA_KEY};
use tabpilot::managers::tab_manager::{TabManager, TabManagerTrait};
use tabpilot::platform::TabHost;
use tabpilot::services::rotation_cycle::{rotate_once, RotationCycle};
use tabpilot::types::errors::RotationError;
use tabpilot::types::rotation::{RotationOutcome, RotationState, MAX_ROTATION_INTERVAL_SECS};
use tabpilot::types::tab::{TabId, WindowId, WindowKind};

struct Fixture {
    store: Arc<KeyValueStore>,
    model: Arc<Mutex<TabManager>>,
    window: WindowId,
    tabs: Vec<TabId>,
}

impl Fixture {
    /// One normal window with tabs A (active), B and C.
    fn new() -> Self {
        let mut mgr = TabManager::new();
        let window = mgr.open_window(WindowKind::Normal);
        let tabs = ["a", "b", "c"]
            .iter()
            .map(|u| mgr.create_tab(window, u, false).unwrap())
            .collect();
        Self {
            store: Arc::new(KeyValueStore::open_in_memory().unwrap()),
            model: Arc::new(Mutex::new(mgr)),
            window,
            tabs,
        }
    }

    fn cycle(&self) -> RotationCycle {
        let host: Arc<dyn TabHost> = self.model.clone();
        RotationCycle::new(self.store.clone(), host)
    }

    fn active(&self) -> Option<TabId> {
        self.model.lock().unwrap().active_tab(self.window)
    }
}

#[tokio::test]
async fn test_rotate_once_wraps_around() {
    let fx = Fixture::new();
    let host = fx.model.as_ref();
    let (a, b, c) = (fx.tabs[0], fx.tabs[1], fx.tabs[2]);

    assert_eq!(
        rotate_once(host, fx.window).await,
        RotationOutcome::Advanced { from: a, to: b }
    );
    assert_eq!(
        rotate_once(host, fx.window).await,
        RotationOutcome::Advanced { from: b, to: c }
    );
    assert_eq!(
        rotate_once(host, fx.window).await,
        RotationOutcome::Advanced { from: c, to: a }
    );
    assert_eq!(fx.active(), Some(a));
}

#[tokio::test]
async fn test_rotate_once_single_tab_stays_put() {
    let mut mgr = TabManager::new();
    let w = mgr.open_window(WindowKind::Normal);
    let only = mgr.create_tab(w, "a", true).unwrap();
    let host = Mutex::new(mgr);

    assert_eq!(
        rotate_once(&host, w).await,
        RotationOutcome::Advanced { from: only, to: only }
    );
}

#[tokio::test]
async fn test_rotate_once_without_tabs_or_active_tab() {
    let fx = Fixture::new();
    assert_eq!(rotate_once(fx.model.as_ref(), 404).await, RotationOutcome::NoTabs);

    fx.model.lock().unwrap().clear_active(fx.window);
    assert_eq!(
        rotate_once(fx.model.as_ref(), fx.window).await,
        RotationOutcome::NoActiveTab
    );
    assert_eq!(fx.active(), None);
}

#[tokio::test]
async fn test_enable_rejects_sub_second_interval() {
    let fx = Fixture::new();
    let mut cycle = fx.cycle();

    for bad in [0, -5] {
        assert!(matches!(
            cycle.enable(fx.window, bad),
            Err(RotationError::InvalidInterval(v)) if v == bad
        ));
    }
    assert!(!cycle.is_running());
    assert!(!fx.store.contains(ROTATION_DATA_KEY).unwrap());
}

#[tokio::test]
async fn test_enable_rejects_interval_above_one_day() {
    let fx = Fixture::new();
    let mut cycle = fx.cycle();

    for bad in [MAX_ROTATION_INTERVAL_SECS + 1, i64::MAX] {
        assert!(matches!(
            cycle.enable(fx.window, bad),
            Err(RotationError::InvalidInterval(v)) if v == bad
        ));
    }
    assert!(!cycle.is_running());
    assert!(!fx.store.contains(ROTATION_DATA_KEY).unwrap());

    cycle.enable(fx.window, MAX_ROTATION_INTERVAL_SECS).unwrap();
    assert!(cycle.is_running());
}

#[tokio::test]
async fn test_restore_ignores_out_of_range_stored_interval() {
    let fx = Fixture::new();
    fx.store
        .set(
            ROTATION_DATA_KEY,
            &serde_json::json!({"enabled": true, "windowId": fx.window, "intervalSec": i64::MAX}),
        )
        .unwrap();

    let mut cycle = fx.cycle();
    let state = cycle.restore().unwrap();
    assert!(state.enabled);
    assert!(!state.is_active());
    assert!(!cycle.is_running());
}

#[tokio::test]
async fn test_state_defaults_when_nothing_stored() {
    let fx = Fixture::new();
    let cycle = fx.cycle();
    assert_eq!(cycle.state().unwrap(), RotationState::default());
    assert_eq!(cycle.state().unwrap().interval_secs, 30);
}

#[tokio::test(start_paused = true)]
async fn test_enable_persists_and_advances_after_one_period() {
    let fx = Fixture::new();
    let mut cycle = fx.cycle();

    let state = cycle.enable(fx.window, 5).unwrap();
    assert_eq!(state, RotationState::enabled(fx.window, 5));
    assert_eq!(cycle.state().unwrap(), state);
    assert!(cycle.is_running());

    tokio::time::sleep(Duration::from_millis(4_500)).await;
    assert_eq!(fx.active(), Some(fx.tabs[0]));

    tokio::time::sleep(Duration::from_millis(1_000)).await;
    assert_eq!(fx.active(), Some(fx.tabs[1]));
}

#[tokio::test(start_paused = true)]
async fn test_repeated_enable_keeps_a_single_timer() {
    let fx = Fixture::new();
    let mut cycle = fx.cycle();

    cycle.enable(fx.window, 1).unwrap();
    cycle.enable(fx.window, 1).unwrap();

    tokio::time::sleep(Duration::from_millis(1_500)).await;
    assert_eq!(fx.active(), Some(fx.tabs[1]));
}

#[tokio::test(start_paused = true)]
async fn test_disable_stops_rotation() {
    let fx = Fixture::new();
    let mut cycle = fx.cycle();

    cycle.enable(fx.window, 1).unwrap();
    cycle.disable().unwrap();
    assert!(!cycle.is_running());
    assert_eq!(cycle.state().unwrap(), RotationState::disabled());

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(fx.active(), Some(fx.tabs[0]));
}

#[tokio::test(start_paused = true)]
async fn test_restore_resumes_stored_rotation() {
    let fx = Fixture::new();
    fx.store
        .set(ROTATION_DATA_KEY, &RotationState::enabled(fx.window, 2))
        .unwrap();

    let mut cycle = fx.cycle();
    let state = cycle.restore().unwrap();
    assert!(state.is_active());
    assert!(cycle.is_running());

    tokio::time::sleep(Duration::from_millis(2_500)).await;
    assert_eq!(fx.active(), Some(fx.tabs[1]));
}

#[tokio::test]
async fn test_restore_ignores_enabled_state_without_window() {
    let fx = Fixture::new();
    fx.store
        .set(
            ROTATION_DATA_KEY,
            &serde_json::json!({"enabled": true, "intervalSec": 10}),
        )
        .unwrap();

    let mut cycle = fx.cycle();
    let state = cycle.restore().unwrap();
    assert!(state.enabled);
    assert!(!state.is_active());
    assert!(!cycle.is_running());
}

#[tokio::test(start_paused = true)]
async fn test_halt_keeps_stored_state() {
    let fx = Fixture::new();
    let mut cycle = fx.cycle();
    cycle.enable(fx.window, 1).unwrap();
    cycle.halt();

    assert!(!cycle.is_running());
    assert!(cycle.state().unwrap().is_active());
    tokio::time::sleep(Duration::from_secs(3)).await;
    assert_eq!(fx.active(), Some(fx.tabs[0]));
}

#[tokio::test(start_paused = true)]
async fn test_dropping_cycle_stops_timer() {
    let fx = Fixture::new();
    {
        let mut cycle = fx.cycle();
        cycle.enable(fx.window, 1).unwrap();
    }
    tokio::time::sleep(Duration::from_secs(3)).await;
    assert_eq!(fx.active(), Some(fx.tabs[0]));
}
