//! Property-based tests for the rotation step.
//!
//! These tests check that one rotation step moves the active tab to the next
//! position (wrapping at the end) and that a full lap returns to the start.

use std::sync::Mutex;

use proptest::prelude::*;
use tabpilot::managers::tab_manager::{TabManager, TabManagerTrait};
use tabpilot::services::rotation_cycle::rotate_once;
use tabpilot::types::rotation::RotationOutcome;
use tabpilot::types::tab::{TabId, WindowId, WindowKind};

fn block_on<F: std::future::Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("Failed to build runtime")
        .block_on(future)
}

/// A window with `count` tabs where the tab at `active` is selected.
fn window_with(count: usize, active: usize) -> (Mutex<TabManager>, WindowId, Vec<TabId>) {
    let mut mgr = TabManager::new();
    let w = mgr.open_window(WindowKind::Normal);
    let tabs: Vec<TabId> = (0..count)
        .map(|i| mgr.create_tab(w, &format!("https://t{i}.example"), false).expect("tab"))
        .collect();
    mgr.switch_tab(tabs[active]).expect("switch");
    (Mutex::new(mgr), w, tabs)
}

// **Property 3: One step advances by one position**
proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn step_activates_next_position(
        (count, active) in (1usize..=12).prop_flat_map(|n| (Just(n), 0..n)),
    ) {
        let (host, w, tabs) = window_with(count, active);
        let outcome = block_on(rotate_once(&host, w));

        let expected_to = tabs[(active + 1) % count];
        prop_assert_eq!(
            outcome,
            RotationOutcome::Advanced { from: tabs[active], to: expected_to }
        );
        prop_assert_eq!(host.lock().unwrap().active_tab(w), Some(expected_to));
    }
}

// **Property 4: A full lap is the identity**
//
// *For any* window of n tabs, n rotation steps SHALL leave the original tab
// active, visiting every tab exactly once on the way.
proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn full_lap_returns_to_start(
        (count, active) in (1usize..=10).prop_flat_map(|n| (Just(n), 0..n)),
    ) {
        let (host, w, tabs) = window_with(count, active);
        let mut visited = Vec::with_capacity(count);
        for _ in 0..count {
            match block_on(rotate_once(&host, w)) {
                RotationOutcome::Advanced { to, .. } => visited.push(to),
                other => prop_assert!(false, "unexpected outcome {:?}", other),
            }
        }

        prop_assert_eq!(host.lock().unwrap().active_tab(w), Some(tabs[active]));
        visited.sort_unstable();
        let mut all = tabs.clone();
        all.sort_unstable();
        prop_assert_eq!(visited, all);
    }
}
