//! Signal data fetching.
//!
//! [`SignalFeed`] loads signal lists through a [`SignalSource`], merges the
//! derived `version` tag, publishes the result, and moves the notification
//! store's seen watermark via
//! [`refresh_signals`](crate::store::NotificationStore::refresh_signals).
//! It never touches unread state directly.

mod api;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::Result;
use crate::models::{AnnotatedSignal, Signal, SignalFilters, SignalStats};
use crate::store::SharedStore;

pub use api::SignalsApi;

/// Interval between background refetches.
pub const REFRESH_INTERVAL: Duration = Duration::from_secs(5);

/// Backend access for signal data.
#[async_trait]
pub trait SignalSource: Send + Sync {
    async fn list_signals(&self, filters: &SignalFilters) -> Result<Vec<Signal>>;
    async fn get_signal(&self, id: i64) -> Result<Signal>;
    async fn get_stats(&self) -> Result<SignalStats>;
}

/// Filtered signal list kept in sync with the backend.
pub struct SignalFeed<S> {
    source: Arc<S>,
    store: SharedStore,
    filters: SignalFilters,
    signals_tx: watch::Sender<Vec<AnnotatedSignal>>,
}

impl<S: SignalSource> SignalFeed<S> {
    pub fn new(source: Arc<S>, store: SharedStore, filters: SignalFilters) -> Self {
        let (signals_tx, _) = watch::channel(Vec::new());
        Self {
            source,
            store,
            filters,
            signals_tx,
        }
    }

    pub fn filters(&self) -> &SignalFilters {
        &self.filters
    }

    /// Receiver for the latest annotated signal list.
    pub fn subscribe(&self) -> watch::Receiver<Vec<AnnotatedSignal>> {
        self.signals_tx.subscribe()
    }

    /// Fetches the list for the current filters. On success the list is
    /// published and the store's seen watermark is refreshed.
    ///
    /// # Errors
    ///
    /// Returns the source's error; the store is left untouched.
    pub async fn fetch(&self) -> Result<Vec<AnnotatedSignal>> {
        let signals: Vec<AnnotatedSignal> = self
            .source
            .list_signals(&self.filters)
            .await?
            .into_iter()
            .map(AnnotatedSignal::from)
            .collect();

        self.signals_tx.send_replace(signals.clone());
        self.store
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .refresh_signals();

        debug!(count = signals.len(), "Signal list refreshed");
        Ok(signals)
    }

    /// Replaces the filters and refetches when they changed. Returns
    /// whether a fetch happened.
    ///
    /// # Errors
    ///
    /// Returns the source's error if the refetch fails. The new filters are
    /// kept either way.
    pub async fn set_filters(&mut self, filters: SignalFilters) -> Result<bool> {
        if filters == self.filters {
            return Ok(false);
        }
        self.filters = filters;
        self.fetch().await?;
        Ok(true)
    }

    /// Fetches one signal with its derived fields.
    ///
    /// # Errors
    ///
    /// Returns the source's error.
    pub async fn fetch_signal(&self, id: i64) -> Result<AnnotatedSignal> {
        Ok(self.source.get_signal(id).await?.into())
    }

    /// Fetches aggregate statistics.
    ///
    /// # Errors
    ///
    /// Returns the source's error.
    pub async fn fetch_stats(&self) -> Result<SignalStats> {
        self.source.get_stats().await
    }

    /// Refetches every `interval` until `cancel` fires. Failures are logged
    /// and retried on the next tick.
    pub async fn run(&self, interval: Duration, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(interval_ms = interval.as_millis() as u64, "Starting signal feed");

        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    info!("Signal feed cancelled");
                    return;
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.fetch().await {
                        warn!("Signal fetch failed: {e}");
                    }
                }
            }
        }
    }
}
