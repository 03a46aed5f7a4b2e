//! REST client for the signal backend.

use async_trait::async_trait;
use tracing::debug;

use super::SignalSource;
use crate::Result;
use crate::models::signal::SignalListResponse;
use crate::models::{Signal, SignalFilters, SignalStats};

/// HTTP implementation of [`SignalSource`].
#[derive(Debug, Clone)]
pub struct SignalsApi {
    http: reqwest::Client,
    base_url: String,
}

impl SignalsApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

#[async_trait]
impl SignalSource for SignalsApi {
    async fn list_signals(&self, filters: &SignalFilters) -> Result<Vec<Signal>> {
        let response = self
            .http
            .get(self.endpoint("signals"))
            .query(filters)
            .send()
            .await?
            .error_for_status()?;
        let signals = response.json::<SignalListResponse>().await?.into_signals();
        debug!(count = signals.len(), ?filters, "Fetched signals");
        Ok(signals)
    }

    async fn get_signal(&self, id: i64) -> Result<Signal> {
        let response = self
            .http
            .get(self.endpoint(&format!("signals/{id}")))
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json::<Signal>().await?)
    }

    async fn get_stats(&self) -> Result<SignalStats> {
        let response = self
            .http
            .get(self.endpoint("signals/stats"))
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json::<SignalStats>().await?)
    }
}
