//! Application configuration loaded from environment variables.
//!
//! Every value has a default so the client runs without any setup:
//! - `PRICE_STREAM_URL` - base URL of the multiplexed ticker WebSocket
//! - `PRICE_REST_URL` - base URL of the REST ticker endpoint used for polling
//! - `PRICE_SYMBOLS` - comma-separated exchange symbols (e.g. `BTCUSDT,ETHUSDT`)
//! - `SIGNALS_API_URL` - signal backend; signal fetching is disabled when unset
//! - `APP_URL` - application root opened when a notification is clicked
//! - `NOTIFICATION_STORE_PATH` - file holding the persisted notification record

use std::path::PathBuf;

/// Default multiplexed ticker stream endpoint.
const DEFAULT_STREAM_URL: &str = "wss://stream.binance.com:9443";

/// Default REST endpoint for the polling fallback.
const DEFAULT_REST_URL: &str = "https://api.binance.com";

/// Symbols shown by the live price widgets when none are configured.
const DEFAULT_SYMBOLS: &[&str] = &["BTCUSDT", "ETHUSDT", "SOLUSDT", "BNBUSDT"];

/// Default application root.
const DEFAULT_APP_URL: &str = "http://localhost:5173";

/// Default location of the persisted notification record.
const DEFAULT_STORE_PATH: &str = "notification-storage.json";

/// Top-level application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub prices: PriceConfig,
    pub signals_api_url: Option<String>,
    pub app_url: String,
    pub store_path: PathBuf,
}

/// Market-data configuration shared by the stream and polling clients.
#[derive(Debug, Clone)]
pub struct PriceConfig {
    pub stream_url: String,
    pub rest_url: String,
    pub symbols: Vec<String>,
}

/// Loads the application configuration from environment variables.
///
/// # Errors
///
/// Returns [`RelayError::Config`](crate::RelayError::Config) if
/// `PRICE_SYMBOLS` is set but contains no symbols.
pub fn fetch_config() -> crate::Result<AppConfig> {
    let stream_url = non_empty_var("PRICE_STREAM_URL")
        .unwrap_or_else(|| DEFAULT_STREAM_URL.to_string());
    let rest_url =
        non_empty_var("PRICE_REST_URL").unwrap_or_else(|| DEFAULT_REST_URL.to_string());

    let symbols = match non_empty_var("PRICE_SYMBOLS") {
        Some(raw) => parse_symbols(&raw)?,
        None => DEFAULT_SYMBOLS.iter().map(|s| (*s).to_string()).collect(),
    };

    let app_url = non_empty_var("APP_URL")
        .map(|url| url.trim_end_matches('/').to_string())
        .unwrap_or_else(|| DEFAULT_APP_URL.to_string());

    let store_path = non_empty_var("NOTIFICATION_STORE_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_STORE_PATH));

    Ok(AppConfig {
        prices: PriceConfig {
            stream_url: stream_url.trim_end_matches('/').to_string(),
            rest_url: rest_url.trim_end_matches('/').to_string(),
            symbols,
        },
        signals_api_url: non_empty_var("SIGNALS_API_URL"),
        app_url,
        store_path,
    })
}

/// Splits a comma-separated symbol list, upper-casing and dropping blanks.
fn parse_symbols(raw: &str) -> crate::Result<Vec<String>> {
    let symbols: Vec<String> = raw
        .split(',')
        .map(|s| s.trim().to_ascii_uppercase())
        .filter(|s| !s.is_empty())
        .collect();

    if symbols.is_empty() {
        return Err(crate::RelayError::Config(
            "PRICE_SYMBOLS is set but lists no symbols".to_string(),
        ));
    }
    Ok(symbols)
}

/// Returns the value of an environment variable if it exists and is non-empty.
fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.is_empty())
}
