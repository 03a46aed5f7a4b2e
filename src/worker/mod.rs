//! Background notification delivery.
//!
//! [`DeliveryWorker`] handles push messages and notification clicks without
//! any window being open. Platform facilities sit behind two seams:
//! - [`NotificationSink`] - displays and closes system notifications
//! - [`WindowClients`] - enumerates open windows, posts relay messages to
//!   them, and opens new windows
//!
//! Showing a notification and relaying to windows are independent
//! best-effort effects: a failure in one never prevents the other, and the
//! handlers never return an error.

mod relay;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::Result;
use crate::models::notification::NEW_SIGNAL;
use crate::models::{
    NotificationAttachment, NotificationClick, NotificationKind, NotificationRequest, PushMessage,
    RelayMessage,
};

pub use relay::{NavigationReceiver, RelayReceiver, WindowRegistry};

/// Quality score shown when the payload carries none.
const MISSING_SCORE: &str = "N/A";

/// Opaque handle to an open application window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowId(pub u64);

/// Displays system notifications.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Shows a notification. A notification with the same tag is replaced.
    async fn show(&self, request: &NotificationRequest) -> Result<()>;

    /// Closes the notification with the given tag.
    async fn close(&self, tag: &str) -> Result<()>;
}

/// Access to the application's open windows.
#[async_trait]
pub trait WindowClients: Send + Sync {
    /// Lists open windows. With `include_uncontrolled` false only windows
    /// already controlled by the worker are returned.
    async fn match_all(&self, include_uncontrolled: bool) -> Result<Vec<WindowId>>;

    /// Posts a relay message to one window.
    async fn post_message(&self, window: WindowId, message: &RelayMessage) -> Result<()>;

    /// Opens a new window at `url`.
    async fn open_window(&self, url: &str) -> Result<()>;
}

/// Sink that renders notifications as structured log events.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotificationSink;

#[async_trait]
impl NotificationSink for LogNotificationSink {
    async fn show(&self, request: &NotificationRequest) -> Result<()> {
        info!(
            title = %request.title,
            body = %request.body,
            tag = %request.tag,
            "Notification"
        );
        Ok(())
    }

    async fn close(&self, tag: &str) -> Result<()> {
        debug!(tag, "Notification closed");
        Ok(())
    }
}

/// What a push invocation did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushOutcome {
    /// Tag of the displayed notification, if one was shown.
    pub displayed: Option<String>,
    /// Number of windows the relay message reached.
    pub relayed_to: usize,
}

/// Handles push and notification-click events.
pub struct DeliveryWorker<N, W> {
    sink: Arc<N>,
    clients: Arc<W>,
    app_url: String,
}

impl<N: NotificationSink, W: WindowClients> DeliveryWorker<N, W> {
    /// `app_url` is the application root opened by clicks without a URL.
    pub fn new(sink: Arc<N>, clients: Arc<W>, app_url: impl Into<String>) -> Self {
        Self {
            sink,
            clients,
            app_url: app_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Handles one push message.
    ///
    /// When the message already carries a platform notification nothing is
    /// displayed here; the relay to open windows always runs.
    pub async fn handle_push(&self, message: &PushMessage) -> PushOutcome {
        let kind = NotificationKind::from_push_type(message.push_type());

        let displayed = if message.notification.is_some() {
            debug!("Push carries a platform notification, skipping display");
            None
        } else {
            let request = self.build_notification(message, kind);
            match self.sink.show(&request).await {
                Ok(()) => Some(request.tag),
                Err(e) => {
                    warn!(tag = %request.tag, "Failed to show notification: {e}");
                    None
                }
            }
        };

        let relay = RelayMessage {
            tpe: kind.into(),
            payload: message.data.clone(),
        };
        let relayed_to = self.relay(&relay).await;

        PushOutcome {
            displayed,
            relayed_to,
        }
    }

    /// Handles a notification click: closes it and opens a new window at
    /// the attached URL, or the application root. Returns the URL opened.
    pub async fn handle_click(&self, click: &NotificationClick) -> String {
        if let Err(e) = self.sink.close(&click.tag).await {
            warn!(tag = %click.tag, "Failed to close notification: {e}");
        }

        let url = click
            .data
            .url
            .clone()
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| self.app_url.clone());

        if let Err(e) = self.clients.open_window(&url).await {
            warn!(url = %url, "Failed to open window: {e}");
        }
        url
    }

    /// Builds the notification for a push without a platform payload.
    pub fn build_notification(&self, message: &PushMessage, kind: NotificationKind) -> NotificationRequest {
        let data = &message.data;
        let field = |key: &str| -> String {
            match data.get(key) {
                Some(serde_json::Value::String(s)) => s.trim().to_string(),
                Some(serde_json::Value::Number(n)) => n.to_string(),
                _ => String::new(),
            }
        };
        let pair = field("pair");
        let direction = field("direction");
        let subject = describe(&pair, &direction);

        let (title, body) = match kind {
            NotificationKind::AiAnalysisComplete => {
                let score = Some(field("quality_score"))
                    .filter(|s| !s.is_empty())
                    .unwrap_or_else(|| MISSING_SCORE.to_string());
                (
                    "✅ AI Analysis Complete".to_string(),
                    format!("{subject} - Quality: {score}"),
                )
            }
            NotificationKind::NewSignal => (
                format!("{} New Trading Signal", direction_marker(&direction)),
                format!("{subject} - AI analysis starting..."),
            ),
        };

        let signal_id = message.signal_id();
        let id_part = signal_id
            .map(|id| id.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        let type_part = message.push_type().unwrap_or(NEW_SIGNAL);

        NotificationRequest {
            title,
            body,
            tag: format!("signal-{id_part}-{type_part}"),
            renotify: true,
            data: NotificationAttachment {
                url: signal_id.map(|id| format!("{}/signals/{id}", self.app_url)),
                signal_id,
            },
        }
    }

    /// Posts to every window. Enumeration retries once with the
    /// controlled-only listing; each post is independent, so one failing
    /// window never blocks the others. Returns how many windows were
    /// reached.
    async fn relay(&self, message: &RelayMessage) -> usize {
        let windows = match self.clients.match_all(true).await {
            Ok(windows) => windows,
            Err(e) => {
                warn!("Window enumeration failed, retrying controlled only: {e}");
                match self.clients.match_all(false).await {
                    Ok(windows) => windows,
                    Err(e) => {
                        warn!("Window enumeration fallback failed, dropping message: {e}");
                        return 0;
                    }
                }
            }
        };

        let mut reached = 0;
        for window in &windows {
            match self.clients.post_message(*window, message).await {
                Ok(()) => reached += 1,
                Err(e) => warn!(window = window.0, "Failed to post relay message: {e}"),
            }
        }
        debug!(
            windows = windows.len(),
            reached,
            tpe = message.tpe.as_str(),
            "Relayed push to windows"
        );
        reached
    }
}

/// Marker distinguishing long from short signals.
fn direction_marker(direction: &str) -> &'static str {
    match direction.to_ascii_uppercase().as_str() {
        "LONG" => "🟢",
        "SHORT" => "🔴",
        _ => "⚪",
    }
}

/// `"BTC LONG"`, or a placeholder when both parts are missing.
fn describe(pair: &str, direction: &str) -> String {
    let subject = format!("{pair} {direction}");
    let subject = subject.trim();
    if subject.is_empty() {
        "Signal".to_string()
    } else {
        subject.to_string()
    }
}
