use std::sync::Arc;

use signal_relay::RelayError;
use signal_relay::config::fetch_config;
use signal_relay::listener::NotificationListener;
use signal_relay::models::{CoinPriceSnapshot, PushMessage, SignalFilters};
use signal_relay::polling::{PollingPriceClient, PollingSettings};
use signal_relay::signals::{REFRESH_INTERVAL, SignalFeed, SignalsApi};
use signal_relay::store::{FileStorage, NotificationStore};
use signal_relay::stream::{PriceStreamClient, StreamSettings};
use signal_relay::worker::{DeliveryWorker, LogNotificationSink, WindowRegistry};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), RelayError> {
    // Initialize tracing subscriber for logging output.
    tracing_subscriber::fmt::init();

    let app_config = fetch_config()?;

    let store = NotificationStore::load(FileStorage::new(&app_config.store_path)).into_shared();
    let cancel = CancellationToken::new();

    // This process acts as one open window receiving relayed pushes.
    let (registry, mut navigations) = WindowRegistry::new();
    let registry = Arc::new(registry);
    let (_window, relay_rx) = registry.register(true);
    let listener = tokio::spawn(NotificationListener::new(store.clone()).run(relay_rx));

    // Push messages arrive as JSON lines on stdin.
    let worker = DeliveryWorker::new(
        Arc::new(LogNotificationSink),
        registry.clone(),
        app_config.app_url.clone(),
    );
    let mut pushes = BufReader::new(tokio::io::stdin()).lines();
    let mut pushes_open = true;

    let feed_task = app_config.signals_api_url.clone().map(|url| {
        let feed = SignalFeed::new(
            Arc::new(SignalsApi::new(url)),
            store.clone(),
            SignalFilters::default(),
        );
        let cancel = cancel.clone();
        tokio::spawn(async move { feed.run(REFRESH_INTERVAL, cancel).await })
    });

    let prices = PriceStreamClient::spawn(StreamSettings::new(
        app_config.prices.stream_url.clone(),
        app_config.prices.symbols.clone(),
    ));
    let mut snapshots = prices.subscribe_snapshots();

    // REST polling covers the gaps while the stream is down.
    let polling = Arc::new(PollingPriceClient::new(PollingSettings::new(
        app_config.prices.rest_url.clone(),
        app_config.prices.symbols.clone(),
    )));
    let mut polled = polling.subscribe();
    let fallback_task = polling.spawn_fallback(prices.subscribe_status(), cancel.clone());

    loop {
        tokio::select! {
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                log_prices("stream", &snapshots.borrow_and_update());
            }
            Ok(()) = polled.changed() => {
                log_prices("rest", &polled.borrow_and_update());
            }
            line = pushes.next_line(), if pushes_open => match line {
                Ok(Some(line)) if !line.trim().is_empty() => {
                    match serde_json::from_str::<PushMessage>(&line) {
                        Ok(push) => {
                            let outcome = worker.handle_push(&push).await;
                            info!(?outcome, "Push handled");
                        }
                        Err(e) => warn!("Ignoring malformed push line: {e}"),
                    }
                }
                Ok(Some(_)) => {}
                Ok(None) => {
                    info!("Push input closed");
                    pushes_open = false;
                }
                Err(e) => {
                    warn!("Failed to read push input: {e}");
                    pushes_open = false;
                }
            },
            Some(url) = navigations.recv() => {
                info!(url = %url, "Navigation requested");
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down");
                break;
            }
        }
    }

    cancel.cancel();
    let _ = fallback_task.await;
    prices.shutdown().await;
    if let Some(task) = feed_task {
        let _ = task.await;
    }
    drop(worker);
    drop(registry);
    let _ = listener.await;

    Ok(())
}

fn log_prices(source: &str, snapshots: &[CoinPriceSnapshot]) {
    for snapshot in snapshots {
        info!(
            source,
            symbol = %snapshot.symbol,
            price = %snapshot.price,
            change_pct = %snapshot.change_percent,
            "Price"
        );
    }
}
