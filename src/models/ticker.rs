//! Ticker wire formats and the derived [`CoinPriceSnapshot`].

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Quote asset dropped from exchange symbols to obtain the display symbol.
pub const QUOTE_ASSET: &str = "USDT";

/// Envelope wrapping every message on a multiplexed stream connection.
#[derive(Debug, Deserialize)]
pub struct CombinedStreamMessage {
    /// Stream name, e.g. `btcusdt@ticker`.
    pub stream: String,
    pub data: TickerEvent,
}

/// Rolling 24-hour ticker event pushed by the stream.
///
/// Field names follow the exchange's single-letter wire keys.
#[derive(Debug, Deserialize)]
pub struct TickerEvent {
    #[serde(rename = "e")]
    pub event_type: String,
    #[serde(rename = "s")]
    pub symbol: String,
    #[serde(rename = "c")]
    pub last_price: Decimal,
    #[serde(rename = "p")]
    pub price_change: Decimal,
    #[serde(rename = "P")]
    pub price_change_percent: Decimal,
    #[serde(rename = "h")]
    pub high_price: Decimal,
    #[serde(rename = "l")]
    pub low_price: Decimal,
    #[serde(rename = "v")]
    pub volume: Decimal,
    #[serde(rename = "q")]
    pub quote_volume: Decimal,
}

/// 24-hour statistics returned by the REST ticker endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TickerStats {
    pub symbol: String,
    pub price_change: Decimal,
    pub price_change_percent: Decimal,
    pub last_price: Decimal,
    pub high_price: Decimal,
    pub low_price: Decimal,
    pub volume: Decimal,
    pub quote_volume: Decimal,
}

/// Latest display-ready price data for one instrument.
///
/// Snapshots are produced by the price clients and replaced wholesale on
/// every update; readers never mutate them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoinPriceSnapshot {
    pub symbol: String,
    pub name: String,
    pub price: String,
    pub change: String,
    pub change_percent: String,
    pub is_positive: bool,
    pub volume: String,
    #[serde(rename = "high24h")]
    pub high_24h: String,
    #[serde(rename = "low24h")]
    pub low_24h: String,
}

/// Raw decimal inputs shared by both ticker wire formats.
struct TickerFields<'a> {
    symbol: &'a str,
    last: Decimal,
    change: Decimal,
    change_percent: Decimal,
    quote_volume: Decimal,
    high: Decimal,
    low: Decimal,
}

impl CoinPriceSnapshot {
    fn from_fields(fields: TickerFields<'_>) -> Self {
        let symbol = display_symbol(fields.symbol);
        Self {
            name: coin_name(&symbol).to_string(),
            symbol,
            price: format_decimal(fields.last),
            change: format_decimal(fields.change),
            change_percent: format_decimal(fields.change_percent),
            is_positive: fields.change_percent >= Decimal::ZERO,
            volume: format_decimal(fields.quote_volume),
            high_24h: format_decimal(fields.high),
            low_24h: format_decimal(fields.low),
        }
    }
}

impl From<&TickerEvent> for CoinPriceSnapshot {
    fn from(event: &TickerEvent) -> Self {
        Self::from_fields(TickerFields {
            symbol: &event.symbol,
            last: event.last_price,
            change: event.price_change,
            change_percent: event.price_change_percent,
            quote_volume: event.quote_volume,
            high: event.high_price,
            low: event.low_price,
        })
    }
}

impl From<&TickerStats> for CoinPriceSnapshot {
    fn from(stats: &TickerStats) -> Self {
        Self::from_fields(TickerFields {
            symbol: &stats.symbol,
            last: stats.last_price,
            change: stats.price_change,
            change_percent: stats.price_change_percent,
            quote_volume: stats.quote_volume,
            high: stats.high_price,
            low: stats.low_price,
        })
    }
}

/// Strips the quote asset suffix: `BTCUSDT` -> `BTC`.
pub fn display_symbol(exchange_symbol: &str) -> String {
    let upper = exchange_symbol.to_ascii_uppercase();
    match upper.strip_suffix(QUOTE_ASSET) {
        Some(base) if !base.is_empty() => base.to_string(),
        _ => upper,
    }
}

/// Human-readable coin name, falling back to the symbol itself.
pub fn coin_name(symbol: &str) -> &str {
    match symbol {
        "BTC" => "Bitcoin",
        "ETH" => "Ethereum",
        "SOL" => "Solana",
        "BNB" => "BNB",
        "XRP" => "XRP",
        "ADA" => "Cardano",
        "DOGE" => "Dogecoin",
        "AVAX" => "Avalanche",
        "DOT" => "Polkadot",
        "LINK" => "Chainlink",
        other => other,
    }
}

/// Formats with exactly two decimal places, rounding half away from zero.
fn format_decimal(value: Decimal) -> String {
    let rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    format!("{rounded:.2}")
}
