//! Page-side consumer of relay messages.
//!
//! Drains a window's [`RelayReceiver`] and forwards each message into the
//! shared [`NotificationStore`](crate::store::NotificationStore).

use tracing::{debug, info, warn};

use crate::models::notification::parse_signal_id;
use crate::models::{NotificationData, NotificationKind, RelayMessage};
use crate::store::SharedStore;
use crate::worker::RelayReceiver;

/// Forwards relay messages into the notification store.
pub struct NotificationListener {
    store: SharedStore,
}

impl NotificationListener {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// Applies one relay message. Returns `false` when the payload has no
    /// usable signal id and the message was skipped.
    pub fn apply(&self, message: &RelayMessage) -> bool {
        let Some(signal_id) = parse_signal_id(message.payload.get("signal_id")) else {
            warn!(tpe = message.tpe.as_str(), "Relay message without a valid signal_id");
            return false;
        };

        let kind = NotificationKind::from(message.tpe);
        let data = NotificationData::from_payload(&message.payload);

        let mut store = self.store.lock().unwrap_or_else(|e| e.into_inner());
        store.add_notification(signal_id, kind, data);
        debug!(signal_id, kind = kind.as_str(), "Forwarded relay message to store");
        true
    }

    /// Consumes messages until the relay channel closes. Returns the number
    /// of messages applied.
    pub async fn run(self, mut rx: RelayReceiver) -> usize {
        let mut applied = 0;
        while let Some(message) = rx.recv().await {
            if self.apply(&message) {
                applied += 1;
            }
        }
        info!(applied, "Relay channel closed, listener stopping");
        applied
    }
}
