//! Live price streaming over a single multiplexed WebSocket.
//!
//! This module is organized by concern:
//! - [`state`] - connection state machine and reconnect policy
//! - [`handler`] - incoming frame parsing and snapshot upserts
//! - [`connection`] - the [`PriceStreamClient`] driver task

pub mod connection;
pub mod handler;
pub mod state;

use futures_util::StreamExt;
use futures_util::stream::{SplitSink, SplitStream};
use tokio::net::TcpStream;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::info;
use tungstenite::Message;

use crate::Result;

pub use connection::{PriceStreamClient, StreamSettings, StreamStatus};
pub use state::{ConnectionState, ReconnectMachine, StreamAction, StreamEvent};

/// Write half of a stream connection.
pub type WsWriter = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;

/// Read half of a stream connection.
pub type WsReader = SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;

/// Establishes a WebSocket connection to the given URL.
///
/// # Errors
///
/// Returns a [`RelayError`](crate::RelayError) if the connection or TLS handshake fails.
pub async fn connect(url: &str) -> Result<(WsWriter, WsReader)> {
    let (ws_stream, _) = connect_async(url).await?;
    info!("WebSocket handshake completed");

    Ok(ws_stream.split())
}

/// Builds one combined-stream URL covering every distinct symbol:
/// `{base}/stream?streams=btcusdt@ticker/ethusdt@ticker`.
pub fn combined_stream_url(base_url: &str, symbols: &[String]) -> String {
    let mut streams: Vec<String> = Vec::with_capacity(symbols.len());
    for symbol in symbols {
        let stream = format!("{}@ticker", symbol.trim().to_ascii_lowercase());
        if !streams.contains(&stream) {
            streams.push(stream);
        }
    }

    format!(
        "{}/stream?streams={}",
        base_url.trim_end_matches('/'),
        streams.join("/")
    )
}
