//! Incoming stream message parsing.

use crate::Result;
use crate::error::RelayError;
use crate::models::ticker::{CombinedStreamMessage, TickerEvent};
use crate::models::CoinPriceSnapshot;

/// Event type carried by 24-hour ticker messages.
const TICKER_EVENT: &str = "24hrTicker";

/// Parses one text frame into a snapshot.
///
/// Accepts the multiplexed envelope (`{"stream": ..., "data": {...}}`) and
/// a bare ticker event.
///
/// # Errors
///
/// Returns [`RelayError::MalformedMessage`] if the frame is not JSON, not a
/// ticker event, or is missing fields.
pub fn parse_tick(text: &str) -> Result<CoinPriceSnapshot> {
    let value: serde_json::Value =
        serde_json::from_str(text).map_err(|e| RelayError::MalformedMessage(e.to_string()))?;

    let event: TickerEvent = if value.get("stream").is_some() {
        serde_json::from_value::<CombinedStreamMessage>(value)
            .map_err(|e| RelayError::MalformedMessage(e.to_string()))?
            .data
    } else {
        serde_json::from_value(value).map_err(|e| RelayError::MalformedMessage(e.to_string()))?
    };

    if event.event_type != TICKER_EVENT {
        return Err(RelayError::MalformedMessage(format!(
            "unexpected event type {}",
            event.event_type
        )));
    }

    Ok(CoinPriceSnapshot::from(&event))
}

/// Upserts a snapshot by symbol, keeping every other symbol's entry.
pub fn upsert_snapshot(snapshots: &mut Vec<CoinPriceSnapshot>, snapshot: CoinPriceSnapshot) {
    match snapshots.iter_mut().find(|s| s.symbol == snapshot.symbol) {
        Some(existing) => *existing = snapshot,
        None => snapshots.push(snapshot),
    }
}
