//! Signal feed behavior and the REST signal source.

mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use signal_relay::models::{
    NotificationData, NotificationKind, Signal, SignalFilters, SignalStats, SignalVersion,
};
use signal_relay::signals::{SignalFeed, SignalSource, SignalsApi};
use signal_relay::store::NotificationStore;
use signal_relay::{RelayError, Result};
use tokio_util::sync::CancellationToken;

use common::{StubServer, wait_for};

fn signal(id: i64, status: &str) -> Signal {
    serde_json::from_value(json!({
        "id": id, "pair": "BTCUSDT", "direction": "LONG", "status": status
    }))
    .unwrap()
}

#[derive(Default)]
struct FakeSource {
    list_calls: AtomicUsize,
    fail: AtomicBool,
    last_filters: std::sync::Mutex<Option<SignalFilters>>,
}

#[async_trait]
impl SignalSource for FakeSource {
    async fn list_signals(&self, filters: &SignalFilters) -> Result<Vec<Signal>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_filters.lock().unwrap() = Some(filters.clone());
        if self.fail.load(Ordering::SeqCst) {
            return Err(RelayError::Platform("backend down".to_string()));
        }
        Ok(vec![signal(1, "ACTIVE"), signal(2, "TP_HIT"), signal(3, "pending")])
    }

    async fn get_signal(&self, id: i64) -> Result<Signal> {
        Ok(signal(id, "SL_HIT"))
    }

    async fn get_stats(&self) -> Result<SignalStats> {
        Ok(SignalStats {
            total: 10,
            active: 2,
            wins: 6,
            losses: 2,
            win_rate: 75.0,
        })
    }
}

fn store_with_unread() -> signal_relay::store::SharedStore {
    let mut store = NotificationStore::in_memory();
    store.add_notification(1, NotificationKind::NewSignal, NotificationData::default());
    store.into_shared()
}

#[tokio::test]
async fn test_fetch_annotates_versions() {
    let feed = SignalFeed::new(
        Arc::new(FakeSource::default()),
        NotificationStore::in_memory().into_shared(),
        SignalFilters::default(),
    );
    let rx = feed.subscribe();

    let signals = feed.fetch().await.unwrap();

    let versions: Vec<_> = signals.iter().map(|s| s.version).collect();
    assert_eq!(
        versions,
        vec![SignalVersion::V1, SignalVersion::V2, SignalVersion::V1]
    );
    assert_eq!(*rx.borrow(), signals);

    let value = serde_json::to_value(&signals[1]).unwrap();
    assert_eq!(value["version"], "v2");
    assert_eq!(value["id"], 2);
}

#[tokio::test]
async fn test_refetch_moves_watermark_but_keeps_unread() {
    let store = store_with_unread();
    let feed = SignalFeed::new(
        Arc::new(FakeSource::default()),
        store.clone(),
        SignalFilters::default(),
    );
    assert!(store.lock().unwrap().has_new_since_last_view());

    feed.fetch().await.unwrap();

    let store = store.lock().unwrap();
    assert!(!store.has_new_since_last_view());
    assert_eq!(store.unread_count(), 1);
    assert!(store.has_unread());
}

#[tokio::test]
async fn test_failed_fetch_leaves_store_untouched() {
    let store = store_with_unread();
    let source = Arc::new(FakeSource::default());
    source.fail.store(true, Ordering::SeqCst);
    let feed = SignalFeed::new(source, store.clone(), SignalFilters::default());

    assert!(feed.fetch().await.is_err());
    assert!(store.lock().unwrap().has_new_since_last_view());
}

#[tokio::test]
async fn test_single_signal_and_stats_do_not_refresh_store() {
    let store = store_with_unread();
    let feed = SignalFeed::new(
        Arc::new(FakeSource::default()),
        store.clone(),
        SignalFilters::default(),
    );

    let signal = feed.fetch_signal(7).await.unwrap();
    assert_eq!(signal.signal.id, 7);
    assert_eq!(signal.version, SignalVersion::V2);

    let stats = feed.fetch_stats().await.unwrap();
    assert_eq!(stats.total, 10);

    assert!(store.lock().unwrap().has_new_since_last_view());
}

#[tokio::test]
async fn test_set_filters_refetches_only_on_change() {
    let source = Arc::new(FakeSource::default());
    let mut feed = SignalFeed::new(
        source.clone(),
        NotificationStore::in_memory().into_shared(),
        SignalFilters::default(),
    );

    assert!(!feed.set_filters(SignalFilters::default()).await.unwrap());
    assert_eq!(source.list_calls.load(Ordering::SeqCst), 0);

    let filters = SignalFilters {
        pair: Some("ETHUSDT".to_string()),
        limit: Some(20),
        ..Default::default()
    };
    assert!(feed.set_filters(filters.clone()).await.unwrap());
    assert_eq!(source.list_calls.load(Ordering::SeqCst), 1);
    assert_eq!(*source.last_filters.lock().unwrap(), Some(filters.clone()));
    assert_eq!(feed.filters(), &filters);

    assert!(!feed.set_filters(filters).await.unwrap());
    assert_eq!(source.list_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_run_refetches_until_cancelled() {
    let source = Arc::new(FakeSource::default());
    let feed = Arc::new(SignalFeed::new(
        source.clone(),
        NotificationStore::in_memory().into_shared(),
        SignalFilters::default(),
    ));
    let mut rx = feed.subscribe();
    let cancel = CancellationToken::new();

    let task = {
        let feed = feed.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move { feed.run(Duration::from_millis(20), cancel).await })
    };

    wait_for(&mut rx, |s| s.len() == 3).await;
    tokio::time::sleep(Duration::from_millis(80)).await;
    assert!(source.list_calls.load(Ordering::SeqCst) >= 2);

    cancel.cancel();
    tokio::time::timeout(common::WAIT, task)
        .await
        .expect("feed did not stop")
        .unwrap();
}

#[tokio::test]
async fn test_api_lists_wrapped_response_with_filters() {
    let body = r#"{"signals": [{"id": 4, "pair": "SOLUSDT", "direction": "SHORT", "status": "OPEN", "confidence": 0.8}], "total": 1}"#;
    let server = StubServer::start(vec![(200, body)]).await;
    let api = SignalsApi::new(format!("{}/api/", server.url));

    let filters = SignalFilters {
        status: Some("OPEN".to_string()),
        max_age_hours: Some(24),
        ..Default::default()
    };
    let signals = api.list_signals(&filters).await.expect("list failed");

    assert_eq!(signals.len(), 1);
    assert_eq!(signals[0].pair, "SOLUSDT");
    assert_eq!(signals[0].extra["confidence"], 0.8);

    let requests = server.requests.lock().unwrap();
    assert!(requests[0].starts_with("GET /api/signals?"));
    assert!(requests[0].contains("status=OPEN"));
    assert!(requests[0].contains("max_age_hours=24"));
    assert!(!requests[0].contains("pair="));
}

#[tokio::test]
async fn test_api_accepts_bare_list_and_reports_errors() {
    let server = StubServer::start(vec![
        (200, r#"[{"id": 1, "status": "ACTIVE"}, {"id": 2, "status": "TP_HIT"}]"#),
        (404, r#"{"detail": "not found"}"#),
    ])
    .await;
    let api = SignalsApi::new(server.url.clone());

    let signals = api.list_signals(&SignalFilters::default()).await.unwrap();
    assert_eq!(signals.len(), 2);

    assert!(api.get_signal(99).await.is_err());
    let requests = server.requests.lock().unwrap();
    assert!(requests[1].starts_with("GET /signals/99 "));
}
