//! REST polling fallback for live prices.
//!
//! [`PollingPriceClient`] fetches the same 24-hour ticker data as the stream
//! over HTTP. Results are cached for a short TTL and failed requests are
//! retried with exponential backoff. [`PollingPriceClient::spawn_fallback`]
//! polls only while the price stream is not open.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::Result;
use crate::models::CoinPriceSnapshot;
use crate::models::ticker::TickerStats;
use crate::stream::{ConnectionState, StreamStatus};

/// Interval between polls.
pub const POLL_INTERVAL: Duration = Duration::from_secs(5);

/// How long a successful fetch is served from cache.
pub const CACHE_TTL: Duration = Duration::from_secs(4);

/// Retries after the first failed attempt.
pub const MAX_RETRIES: u32 = 3;

/// First retry delay; doubles per attempt.
const RETRY_BASE: Duration = Duration::from_secs(1);

/// Upper bound on a single retry delay.
const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);

/// Parameters for [`PollingPriceClient`].
#[derive(Debug, Clone)]
pub struct PollingSettings {
    pub rest_url: String,
    pub symbols: Vec<String>,
    pub interval: Duration,
    pub cache_ttl: Duration,
    pub retry_base: Duration,
}

impl PollingSettings {
    pub fn new(rest_url: impl Into<String>, symbols: Vec<String>) -> Self {
        Self {
            rest_url: rest_url.into(),
            symbols,
            interval: POLL_INTERVAL,
            cache_ttl: CACHE_TTL,
            retry_base: RETRY_BASE,
        }
    }
}

struct CachedPrices {
    fetched_at: Instant,
    snapshots: Vec<CoinPriceSnapshot>,
}

/// Periodic REST price fetcher with caching and retries.
pub struct PollingPriceClient {
    http: reqwest::Client,
    settings: PollingSettings,
    cache: Mutex<Option<CachedPrices>>,
    snapshots_tx: watch::Sender<Vec<CoinPriceSnapshot>>,
}

impl PollingPriceClient {
    pub fn new(settings: PollingSettings) -> Self {
        let (snapshots_tx, _) = watch::channel(Vec::new());
        Self {
            http: reqwest::Client::new(),
            settings,
            cache: Mutex::new(None),
            snapshots_tx,
        }
    }

    /// Latest published snapshots.
    pub fn subscribe(&self) -> watch::Receiver<Vec<CoinPriceSnapshot>> {
        self.snapshots_tx.subscribe()
    }

    /// Returns current prices, from cache when fresh unless `force` is set.
    /// Successful network fetches are published to subscribers.
    ///
    /// # Errors
    ///
    /// Returns a [`RelayError`](crate::RelayError) if every attempt fails.
    pub async fn fetch(&self, force: bool) -> Result<Vec<CoinPriceSnapshot>> {
        if !force {
            if let Some(snapshots) = self.cached() {
                debug!(count = snapshots.len(), "Serving prices from cache");
                return Ok(snapshots);
            }
        }

        let stats = self.fetch_with_retry().await?;
        let snapshots: Vec<CoinPriceSnapshot> = stats.iter().map(CoinPriceSnapshot::from).collect();

        *self.lock_cache() = Some(CachedPrices {
            fetched_at: Instant::now(),
            snapshots: snapshots.clone(),
        });
        self.snapshots_tx.send_replace(snapshots.clone());
        Ok(snapshots)
    }

    /// Polls every interval until `cancel` fires.
    pub fn spawn_polling(self: Arc<Self>, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.settings.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!(
                interval_ms = self.settings.interval.as_millis() as u64,
                "Starting price polling"
            );

            loop {
                tokio::select! {
                    () = cancel.cancelled() => {
                        info!("Price polling cancelled");
                        return;
                    }
                    _ = ticker.tick() => {
                        tokio::select! {
                            () = cancel.cancelled() => {
                                info!("Price polling cancelled");
                                return;
                            }
                            result = self.fetch(true) => {
                                if let Err(e) = result {
                                    warn!("Price poll failed: {e}");
                                }
                            }
                        }
                    }
                }
            }
        })
    }

    /// Polls while `status` reports anything but an open stream and stops
    /// as soon as it opens. Exits when `cancel` fires or the status sender
    /// is dropped.
    pub fn spawn_fallback(
        self: Arc<Self>,
        mut status: watch::Receiver<StreamStatus>,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut polling: Option<(CancellationToken, JoinHandle<()>)> = None;

            loop {
                let stream_open = status.borrow_and_update().state == ConnectionState::Open;
                if stream_open {
                    if let Some((token, handle)) = polling.take() {
                        info!("Price stream open, stopping REST fallback");
                        token.cancel();
                        let _ = handle.await;
                    }
                } else if polling.is_none() {
                    info!("Price stream unavailable, polling REST");
                    let token = cancel.child_token();
                    polling = Some((token.clone(), self.clone().spawn_polling(token)));
                }

                tokio::select! {
                    () = cancel.cancelled() => break,
                    changed = status.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                }
            }

            if let Some((token, handle)) = polling.take() {
                token.cancel();
                let _ = handle.await;
            }
        })
    }

    fn cached(&self) -> Option<Vec<CoinPriceSnapshot>> {
        let cache = self.lock_cache();
        cache
            .as_ref()
            .filter(|c| c.fetched_at.elapsed() < self.settings.cache_ttl)
            .map(|c| c.snapshots.clone())
    }

    async fn fetch_with_retry(&self) -> Result<Vec<TickerStats>> {
        let mut attempt = 0;
        loop {
            match self.fetch_once().await {
                Ok(stats) => return Ok(stats),
                Err(e) if attempt < MAX_RETRIES => {
                    let delay = retry_delay(self.settings.retry_base, attempt);
                    warn!(
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        "Price fetch failed, retrying: {e}"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn fetch_once(&self) -> Result<Vec<TickerStats>> {
        let endpoint = format!(
            "{}/api/v3/ticker/24hr",
            self.settings.rest_url.trim_end_matches('/')
        );
        let symbols = serde_json::to_string(&self.settings.symbols)?;
        let response = self
            .http
            .get(endpoint)
            .query(&[("symbols", symbols)])
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json::<Vec<TickerStats>>().await?)
    }

    fn lock_cache(&self) -> std::sync::MutexGuard<'_, Option<CachedPrices>> {
        self.cache.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// `min(base * 2^attempt, 30s)`.
pub fn retry_delay(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(2u32.saturating_pow(attempt))
        .min(MAX_RETRY_DELAY)
}
