//! Shared test utilities and fakes.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use signal_relay::models::{NotificationRequest, PushMessage, RelayMessage};
use signal_relay::worker::{NotificationSink, WindowClients, WindowId};
use signal_relay::{RelayError, Result};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio_tungstenite::{WebSocketStream, accept_async};

/// Binance public stream endpoint.
pub const BINANCE_STREAM_URL: &str = "wss://stream.binance.com:9443";

/// Upper bound for any single wait in a test.
pub const WAIT: Duration = Duration::from_secs(5);

/// Waits until the watched value satisfies `pred`, panicking after [`WAIT`].
pub async fn wait_for<T>(rx: &mut watch::Receiver<T>, pred: impl FnMut(&T) -> bool) {
    tokio::time::timeout(WAIT, rx.wait_for(pred))
        .await
        .expect("Timed out waiting for watched value")
        .expect("Watch sender dropped");
}

/// Binds a local listener and returns it with its `ws://` base URL.
pub async fn local_listener() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind local listener");
    let addr = listener.local_addr().expect("Listener has no address");
    (listener, format!("ws://{addr}"))
}

/// Accepts one WebSocket client on `listener`.
pub async fn accept_ws(listener: &TcpListener) -> WebSocketStream<TcpStream> {
    let (tcp, _) = tokio::time::timeout(WAIT, listener.accept())
        .await
        .expect("Timed out waiting for client")
        .expect("Failed to accept TCP connection");
    accept_async(tcp).await.expect("WebSocket handshake failed")
}

/// Builds a push message without a platform notification payload.
pub fn push(data: Value) -> PushMessage {
    PushMessage {
        data: data.as_object().cloned().unwrap_or_default(),
        notification: None,
    }
}

/// A combined-stream ticker frame for `symbol` at `price`.
pub fn ticker_frame(symbol: &str, price: &str, change_pct: &str) -> String {
    serde_json::json!({
        "stream": format!("{}@ticker", symbol.to_ascii_lowercase()),
        "data": {
            "e": "24hrTicker", "E": 1_700_000_000_000_i64, "s": symbol,
            "p": "10.00", "P": change_pct, "c": price, "h": price, "l": price,
            "v": "100", "q": "1000000"
        }
    })
    .to_string()
}

/// Notification sink that records every request.
#[derive(Default)]
pub struct RecordingSink {
    pub shown: Mutex<Vec<NotificationRequest>>,
    pub closed: Mutex<Vec<String>>,
    pub fail_show: bool,
}

impl RecordingSink {
    pub fn failing() -> Self {
        Self {
            fail_show: true,
            ..Default::default()
        }
    }

    pub fn shown(&self) -> Vec<NotificationRequest> {
        self.shown.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn show(&self, request: &NotificationRequest) -> Result<()> {
        if self.fail_show {
            return Err(RelayError::Platform("notifications blocked".to_string()));
        }
        self.shown.lock().unwrap().push(request.clone());
        Ok(())
    }

    async fn close(&self, tag: &str) -> Result<()> {
        self.closed.lock().unwrap().push(tag.to_string());
        Ok(())
    }
}

/// Window clients whose full enumeration always fails; the controlled-only
/// fallback returns two windows unless `fallback_fails` is set.
#[derive(Default)]
pub struct FlakyClients {
    pub fallback_fails: bool,
    pub enumerations: Mutex<Vec<bool>>,
    pub posted: Mutex<Vec<(WindowId, RelayMessage)>>,
}

#[async_trait]
impl WindowClients for FlakyClients {
    async fn match_all(&self, include_uncontrolled: bool) -> Result<Vec<WindowId>> {
        self.enumerations.lock().unwrap().push(include_uncontrolled);
        if include_uncontrolled || self.fallback_fails {
            return Err(RelayError::Platform("clients unavailable".to_string()));
        }
        Ok(vec![WindowId(1), WindowId(2)])
    }

    async fn post_message(&self, window: WindowId, message: &RelayMessage) -> Result<()> {
        self.posted.lock().unwrap().push((window, message.clone()));
        Ok(())
    }

    async fn open_window(&self, _url: &str) -> Result<()> {
        Err(RelayError::Platform("popup blocked".to_string()))
    }
}

/// Minimal HTTP/1.1 responder. Serves `responses` in order, repeating the
/// last one, and records every request line.
pub struct StubServer {
    pub url: String,
    pub requests: Arc<Mutex<Vec<String>>>,
}

impl StubServer {
    pub async fn start(responses: Vec<(u16, &'static str)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let requests = Arc::new(Mutex::new(Vec::new()));
        let seen = requests.clone();

        tokio::spawn(async move {
            let mut served = 0;
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                let mut buf = Vec::new();
                let mut chunk = [0u8; 1024];
                while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut chunk).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => buf.extend_from_slice(&chunk[..n]),
                    }
                }
                let request = String::from_utf8_lossy(&buf);
                let line = request.lines().next().unwrap_or_default().to_string();
                seen.lock().unwrap().push(line);

                let (status, body) = responses[served.min(responses.len() - 1)];
                served += 1;
                let response = format!(
                    "HTTP/1.1 {status} Stub\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });

        Self { url, requests }
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}
