use std::sync::{Arc, Mutex};

use tabpilot::database::{KeyValueStore, DEFAULT_TABS_KEY};
use tabpilot::managers::default_tab_manager::{DefaultTabManager, DefaultTabManagerTrait};
use tabpilot::managers::tab_manager::{TabManager, TabManagerTrait};
use tabpilot::services::refresh_scheduler::{RefreshScheduler, RefreshSchedulerTrait};
use tabpilot::types::default_tab::DefaultTabEntry;
use tabpilot::types::errors::RegistryError;
use tabpilot::types::tab::WindowKind;

fn setup() -> (Arc<KeyValueStore>, DefaultTabManager, RefreshScheduler) {
    let store = Arc::new(KeyValueStore::open_in_memory().unwrap());
    let registry = DefaultTabManager::new(store.clone());
    let scheduler = RefreshScheduler::new(store.clone());
    (store, registry, scheduler)
}

fn urls(entries: &[DefaultTabEntry]) -> Vec<&str> {
    entries.iter().map(|e| e.url.as_str()).collect()
}

#[test]
fn test_append_preserves_order() {
    let (_store, registry, _) = setup();
    registry.append("https://x", 5).unwrap();
    registry.append("https://y", 1).unwrap();

    let list = registry.list().unwrap();
    assert_eq!(urls(&list), vec!["https://x", "https://y"]);
    assert_eq!(list[0].interval_minutes, 5);
    assert_eq!(registry.len().unwrap(), 2);
}

#[test]
fn test_append_allows_duplicates_with_distinct_ids() {
    let (_store, registry, _) = setup();
    let a = registry.append("https://x", 5).unwrap();
    let b = registry.append("https://x", 5).unwrap();
    assert_ne!(a.id, b.id);
    assert_eq!(registry.len().unwrap(), 2);
}

#[test]
fn test_append_rejects_blank_url() {
    let (_store, registry, _) = setup();
    assert!(matches!(
        registry.append("   ", 5),
        Err(RegistryError::InvalidUrl(_))
    ));
    assert_eq!(registry.len().unwrap(), 0);
}

#[test]
fn test_append_trims_url() {
    let (_store, registry, _) = setup();
    let entry = registry.append("  https://x  ", 5).unwrap();
    assert_eq!(entry.url, "https://x");
}

#[test]
fn test_remove_at_shifts_later_entries() {
    let (_store, registry, _) = setup();
    for url in ["https://a", "https://b", "https://c"] {
        registry.append(url, 1).unwrap();
    }

    let removed = registry.remove_at(1).unwrap();
    assert_eq!(removed.url, "https://b");
    assert_eq!(urls(&registry.list().unwrap()), vec!["https://a", "https://c"]);
}

#[test]
fn test_remove_at_out_of_range_leaves_list_unchanged() {
    let (store, registry, _) = setup();
    registry.append("https://x", 5).unwrap();
    registry.append("https://y", 1).unwrap();
    let before: serde_json::Value = store.get(DEFAULT_TABS_KEY, serde_json::Value::Null).unwrap();

    for index in [2, 7, -1] {
        assert!(matches!(
            registry.remove_at(index),
            Err(RegistryError::OutOfRange { len: 2, .. })
        ));
    }

    let after: serde_json::Value = store.get(DEFAULT_TABS_KEY, serde_json::Value::Null).unwrap();
    assert_eq!(before, after);
}

#[test]
fn test_remove_at_on_empty_registry() {
    let (store, registry, _) = setup();
    assert!(registry.remove_at(0).is_err());
    assert!(!store.contains(DEFAULT_TABS_KEY).unwrap());
}

#[test]
fn test_remove_by_id() {
    let (_store, registry, _) = setup();
    let keep = registry.append("https://x", 5).unwrap();
    let gone = registry.append("https://x", 5).unwrap();

    assert_eq!(registry.remove_by_id(&gone.id).unwrap(), gone);
    assert_eq!(registry.list().unwrap(), vec![keep]);
    assert!(matches!(
        registry.remove_by_id(&gone.id),
        Err(RegistryError::UnknownId(_))
    ));
}

#[test]
fn test_legacy_entries_get_stable_ids() {
    let (store, registry, _) = setup();
    store
        .set(
            DEFAULT_TABS_KEY,
            &serde_json::json!([{"url": "https://old", "interval": 3}]),
        )
        .unwrap();

    let first = registry.list().unwrap();
    let second = registry.list().unwrap();
    assert_eq!(first.len(), 1);
    assert!(!first[0].id.is_empty());
    assert_eq!(first[0].id, second[0].id);
    assert_eq!(first[0].interval_minutes, 3);
}

#[tokio::test]
async fn test_apply_to_window_opens_entries_in_order_with_refresh() {
    let (_store, registry, scheduler) = setup();
    registry.append("https://x", 5).unwrap();
    registry.append("https://y", 0).unwrap();

    let mut mgr = TabManager::new();
    let w = mgr.open_window(WindowKind::Normal);
    let host = Mutex::new(mgr);

    let opened = registry.apply_to_window(&host, &scheduler, w).await.unwrap();
    assert_eq!(opened.len(), 2);

    let tabs = host.lock().unwrap().tabs_in_window(w);
    assert_eq!(
        tabs.iter().map(|t| t.url.as_str()).collect::<Vec<_>>(),
        vec!["https://x", "https://y"]
    );
    assert_eq!(scheduler.entry(opened[0]).unwrap().unwrap().interval_minutes, 5);
    assert_eq!(scheduler.entry(opened[1]).unwrap().unwrap().interval_minutes, 0);
}

#[tokio::test]
async fn test_apply_to_window_skips_failed_tabs() {
    let (_store, registry, scheduler) = setup();
    registry.append("https://x", 5).unwrap();

    let host = Mutex::new(TabManager::new());
    let opened = registry.apply_to_window(&host, &scheduler, 77).await.unwrap();
    assert!(opened.is_empty());
    assert!(scheduler.entries().unwrap().is_empty());
}

#[tokio::test]
async fn test_open_now_by_index() {
    let (_store, registry, scheduler) = setup();
    registry.append("https://x", 5).unwrap();
    registry.append("https://y", 2).unwrap();

    let mut mgr = TabManager::new();
    let w = mgr.open_window(WindowKind::Normal);
    let host = Mutex::new(mgr);

    let tab = registry.open_now(&host, &scheduler, 1, w).await.unwrap().unwrap();
    assert_eq!(host.lock().unwrap().get_tab(tab).unwrap().url, "https://y");
    assert_eq!(scheduler.entry(tab).unwrap().unwrap().interval_minutes, 2);

    assert!(matches!(
        registry.open_now(&host, &scheduler, 5, w).await,
        Err(RegistryError::OutOfRange { index: 5, len: 2 })
    ));
}
