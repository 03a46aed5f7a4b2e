//! Notification store behavior across mutations and reloads.

use signal_relay::models::{NotificationData, NotificationKind};
use signal_relay::store::{
    FileStorage, MAX_TRACKED, MemoryStorage, NotificationState, NotificationStore, StateStorage,
};

fn data(pair: &str, direction: &str) -> NotificationData {
    NotificationData {
        pair: pair.to_string(),
        direction: direction.to_string(),
        ..Default::default()
    }
}

#[test]
fn test_unread_counts_distinct_signals() {
    let mut store = NotificationStore::in_memory();
    for id in [1, 2, 1, 3, 2, 2] {
        store.add_notification(id, NotificationKind::NewSignal, data("BTC", "LONG"));
    }

    assert_eq!(store.unread_count(), 3);
    assert!(store.has_unread());
    assert_eq!(store.items().len(), 6);
    assert_eq!(store.state().tracked_signal_ids, vec![2, 3, 1]);
}

#[test]
fn test_ai_complete_replaces_previous_completion() {
    let mut store = NotificationStore::in_memory();
    store.add_notification(42, NotificationKind::NewSignal, data("BTC", "LONG"));
    store.add_notification(7, NotificationKind::NewSignal, data("ETH", "SHORT"));
    store.add_notification(42, NotificationKind::AiAnalysisComplete, data("BTC", "LONG"));
    store.add_notification(
        42,
        NotificationKind::AiAnalysisComplete,
        NotificationData {
            quality_score: Some("A".to_string()),
            ..data("BTC", "LONG")
        },
    );

    let completions: Vec<_> = store
        .items()
        .iter()
        .filter(|i| i.signal_id == 42 && i.kind == NotificationKind::AiAnalysisComplete)
        .collect();
    assert_eq!(completions.len(), 1);
    assert_eq!(completions[0].quality_score.as_deref(), Some("A"));

    // Latest completion sits at the front; the new-signal item is kept.
    assert_eq!(store.items()[0].kind, NotificationKind::AiAnalysisComplete);
    assert_eq!(store.items().len(), 3);
    assert_eq!(store.unread_count(), 2);
}

#[test]
fn test_fifty_first_signal_evicts_oldest() {
    let mut store = NotificationStore::in_memory();
    for id in 0..=MAX_TRACKED as i64 {
        store.add_notification(id, NotificationKind::NewSignal, data("BTC", "LONG"));
    }

    assert_eq!(store.items().len(), MAX_TRACKED);
    assert_eq!(store.state().tracked_signal_ids.len(), MAX_TRACKED);
    assert!(!store.state().tracked_signal_ids.contains(&0));
    assert_eq!(store.items()[0].signal_id, MAX_TRACKED as i64);
    assert_eq!(store.unread_count(), MAX_TRACKED as u32 + 1);

    // The evicted id is no longer recognized as a duplicate.
    store.add_notification(0, NotificationKind::NewSignal, data("BTC", "LONG"));
    assert_eq!(store.unread_count(), MAX_TRACKED as u32 + 2);
}

#[test]
fn test_mark_as_read_acknowledges() {
    let mut store = NotificationStore::in_memory();
    store.add_notification(1, NotificationKind::NewSignal, data("BTC", "LONG"));
    assert!(store.has_new_since_last_view());

    store.mark_as_read();

    assert_eq!(store.unread_count(), 0);
    assert!(!store.has_unread());
    assert!(!store.has_new_since_last_view());
    assert_eq!(
        store.state().last_seen_notification_id,
        store.state().last_notification_id
    );
}

#[test]
fn test_refresh_signals_keeps_unread() {
    let mut store = NotificationStore::in_memory();
    store.add_notification(1, NotificationKind::NewSignal, data("BTC", "LONG"));
    store.add_notification(2, NotificationKind::NewSignal, data("ETH", "SHORT"));

    store.refresh_signals();

    assert_eq!(store.unread_count(), 2);
    assert!(store.has_unread());
    assert!(!store.has_new_since_last_view());
    assert_eq!(store.items().len(), 2);
}

#[test]
fn test_event_id_names_signal_and_kind() {
    let mut store = NotificationStore::in_memory();
    store.add_notification(42, NotificationKind::AiAnalysisComplete, data("BTC", "LONG"));

    let id = store.state().last_notification_id.clone().unwrap();
    assert!(id.starts_with("42-ai_analysis_complete-"), "unexpected id {id}");
}

#[test]
fn test_mutations_persist_and_reload() {
    let storage = MemoryStorage::new();
    let mut store = NotificationStore::load(storage.clone());
    store.add_notification(42, NotificationKind::NewSignal, data("BTC", "LONG"));
    store.add_notification(42, NotificationKind::AiAnalysisComplete, data("BTC", "LONG"));

    let reloaded = NotificationStore::load(storage.clone());
    assert_eq!(reloaded.state(), store.state());

    store.mark_as_read();
    let reloaded = NotificationStore::load(storage);
    assert_eq!(reloaded.unread_count(), 0);
    assert_eq!(reloaded.items().len(), 2);
}

#[test]
fn test_clear_all_removes_record() {
    let storage = MemoryStorage::new();
    let mut store = NotificationStore::load(storage.clone());
    store.add_notification(1, NotificationKind::NewSignal, data("BTC", "LONG"));
    assert!(storage.snapshot().is_some());

    store.clear_all();

    assert_eq!(store.state(), &NotificationState::default());
    assert!(storage.snapshot().is_none());
    let reloaded = NotificationStore::load(storage);
    assert_eq!(reloaded.state(), &NotificationState::default());
}

#[test]
fn test_corrupted_record_falls_back_to_default() {
    let storage = MemoryStorage::with_record("{not json");
    let store = NotificationStore::load(storage.clone());

    assert_eq!(store.state(), &NotificationState::default());
    assert!(storage.snapshot().is_none(), "corrupted record should be removed");
}

#[test]
fn test_clear_notifications_then_repeat_counts_again() {
    let mut store = NotificationStore::in_memory();
    store.add_notification(9, NotificationKind::NewSignal, data("SOL", "LONG"));
    store.clear_notifications();
    store.add_notification(9, NotificationKind::NewSignal, data("SOL", "LONG"));

    assert_eq!(store.unread_count(), 1);
    assert_eq!(store.items().len(), 1);
}

#[test]
fn test_file_storage_round_trip() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("notification-storage.json");

    {
        let mut store = NotificationStore::load(FileStorage::new(&path));
        store.add_notification(5, NotificationKind::NewSignal, data("BNB", "SHORT"));
    }

    let raw = std::fs::read_to_string(&path).expect("record should be written");
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(value["unreadCount"], 1);
    assert_eq!(value["hasUnreadNotifications"], true);
    assert_eq!(value["newSignalIds"], serde_json::json!([5]));
    assert_eq!(value["notifications"][0]["type"], "new_signal");
    assert_eq!(value["notifications"][0]["signalId"], 5);

    let mut store = NotificationStore::load(FileStorage::new(&path));
    assert_eq!(store.unread_count(), 1);
    assert_eq!(store.items()[0].pair, "BNB");

    store.clear_all();
    assert!(!path.exists());
    assert_eq!(FileStorage::new(&path).load().unwrap(), None);
}
