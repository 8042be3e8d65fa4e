//! Property-based tests for refresh due-time evaluation.
//!
//! These tests check that a refresh check reloads a tab exactly when its
//! interval has elapsed, never reloads unscheduled entries, and that a
//! second check at the same instant reloads nothing.

use std::sync::{Arc, Mutex};

use proptest::prelude::*;
use tabpilot::database::{KeyValueStore, REFRESH_DATA_KEY};
use tabpilot::managers::tab_manager::{TabManager, TabManagerTrait};
use tabpilot::services::popup_view::{CountdownStatus, CountdownView};
use tabpilot::services::refresh_scheduler::RefreshScheduler;
use tabpilot::types::refresh::{RefreshData, RefreshEntry, MINUTE_MS};
use tabpilot::types::tab::WindowKind;

fn block_on<F: std::future::Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("Failed to build runtime")
        .block_on(future)
}

// **Property 1: Reload iff due**
//
// *For any* interval, last-refresh stamp and elapsed time, one refresh check
// SHALL reload the tab exactly when the interval is positive and the elapsed
// time has reached it, and an immediate second check SHALL reload nothing.
proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn check_reloads_exactly_when_due(
        interval in -5i64..=60,
        last in 1i64..=1_000_000_000_000,
        elapsed in 0i64..=(120 * MINUTE_MS),
    ) {
        let store = Arc::new(KeyValueStore::open_in_memory().expect("store"));
        let scheduler = RefreshScheduler::new(store.clone());
        let mut mgr = TabManager::new();
        let w = mgr.open_window(WindowKind::Normal);
        let tab = mgr.create_tab(w, "https://example.org", true).expect("tab");
        let host = Mutex::new(mgr);

        let mut data = RefreshData::new();
        data.insert(tab.to_string(), RefreshEntry::new(interval, last));
        store.set(REFRESH_DATA_KEY, &data).expect("seed");

        let now = last + elapsed;
        let expected = interval > 0 && elapsed >= interval * MINUTE_MS;

        let first = block_on(scheduler.check_due(&host, now)).expect("check");
        prop_assert_eq!(first.reloaded.contains(&tab), expected);

        let second = block_on(scheduler.check_due(&host, now)).expect("check");
        prop_assert!(second.reloaded.is_empty());
        prop_assert_eq!(host.lock().unwrap().reload_count(tab), u32::from(expected));
    }
}

// **Property 2: Countdown agrees with the due check**
//
// *For any* scheduled entry with a nonzero stamp, the popup SHALL show
// "Refreshing..." whenever the host would consider the entry due.
proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn countdown_shows_due_when_host_would_reload(
        interval in 1i64..=30,
        last in 1i64..=1_000_000_000_000,
        elapsed in 0i64..=(40 * MINUTE_MS),
    ) {
        let entry = RefreshEntry::new(interval, last);
        let mut data = RefreshData::new();
        data.insert("5".to_string(), entry);
        let view = CountdownView::from_snapshot(data);

        let now = last + elapsed;
        let status = view.status(5, now);
        if entry.is_due(now) {
            prop_assert_eq!(status, CountdownStatus::Due);
        }
        if let CountdownStatus::Remaining { minutes, seconds } = status {
            prop_assert!(!entry.is_due(now));
            prop_assert!((0..60).contains(&seconds));
            prop_assert!(minutes * 60 + seconds <= interval * 60);
        }
    }
}
