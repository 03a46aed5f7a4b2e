//! Signal records returned by the backend and the derived version tag.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Statuses of signals whose outcome is not yet known.
pub const UNRESOLVED_STATUSES: &[&str] = &["PENDING", "ACTIVE", "OPEN"];

/// A trading signal as served by the backend.
///
/// Unknown fields are kept in `extra` so they pass through to the UI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub id: i64,
    #[serde(default)]
    pub pair: String,
    #[serde(default)]
    pub direction: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub strategy: Option<String>,
    #[serde(default)]
    pub timeframe: Option<String>,
    #[serde(default)]
    pub entry_price: Option<Decimal>,
    #[serde(default)]
    pub stop_loss: Option<Decimal>,
    #[serde(default)]
    pub take_profit: Option<Decimal>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Derived generation tag for a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalVersion {
    V1,
    V2,
}

impl SignalVersion {
    /// `V1` while the status is unresolved, `V2` otherwise.
    pub fn for_status(status: &str) -> Self {
        let unresolved = UNRESOLVED_STATUSES
            .iter()
            .any(|s| s.eq_ignore_ascii_case(status.trim()));
        if unresolved {
            SignalVersion::V1
        } else {
            SignalVersion::V2
        }
    }
}

/// A signal with its derived fields merged in. Serializes flat.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnnotatedSignal {
    #[serde(flatten)]
    pub signal: Signal,
    pub version: SignalVersion,
}

impl From<Signal> for AnnotatedSignal {
    fn from(signal: Signal) -> Self {
        let version = SignalVersion::for_status(&signal.status);
        Self { signal, version }
    }
}

/// Aggregate performance figures.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SignalStats {
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub active: u64,
    #[serde(default)]
    pub wins: u64,
    #[serde(default)]
    pub losses: u64,
    #[serde(default)]
    pub win_rate: f64,
}

/// Query filters for signal lists. A change to any field triggers a refetch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SignalFilters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pair: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<u32>,
    /// Only signals created within this many hours.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_age_hours: Option<u32>,
}

/// Signal list as returned by the backend: wrapped or a bare array. Other
/// envelope keys (`total`, paging) are ignored.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum SignalListResponse {
    Wrapped { signals: Vec<Signal> },
    Bare(Vec<Signal>),
}

impl SignalListResponse {
    pub fn into_signals(self) -> Vec<Signal> {
        match self {
            SignalListResponse::Wrapped { signals } => signals,
            SignalListResponse::Bare(signals) => signals,
        }
    }
}
