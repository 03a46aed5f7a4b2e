//! Notification state store.
//!
//! [`NotificationStore`] is the single source of truth for unread badges
//! and the recent-notification list. It is an explicit container passed to
//! consumers as a [`SharedStore`]; every mutation ends with an explicit
//! [`persist`](NotificationStore::persist) call that writes the record
//! through a [`StateStorage`] backend.
//!
//! De-duplication uses a bounded most-recently-seen window of signal ids
//! ([`MAX_TRACKED`]). An id that falls out of the window and later repeats
//! is counted again.

pub mod persistence;

use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::models::{NotificationData, NotificationItem, NotificationKind};
pub use persistence::{FileStorage, MemoryStorage, StateStorage};

/// Maximum number of tracked signal ids and retained items.
pub const MAX_TRACKED: usize = 50;

/// Store handle shared between the listener, signal feed, and readers.
pub type SharedStore = Arc<Mutex<NotificationStore>>;

/// Persisted notification state. Field names match the stored record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationState {
    #[serde(rename = "hasUnreadNotifications", default)]
    pub has_unread: bool,
    #[serde(default)]
    pub unread_count: u32,
    #[serde(default)]
    pub last_notification_id: Option<String>,
    #[serde(default)]
    pub last_seen_notification_id: Option<String>,
    /// Most-recent-first, capped at [`MAX_TRACKED`].
    #[serde(rename = "newSignalIds", default)]
    pub tracked_signal_ids: Vec<i64>,
    /// Most-recent-first, capped at [`MAX_TRACKED`].
    #[serde(rename = "notifications", default)]
    pub items: Vec<NotificationItem>,
    #[serde(default)]
    pub last_viewed_at: Option<i64>,
}

/// Notification state plus the storage it persists to.
pub struct NotificationStore {
    state: NotificationState,
    storage: Box<dyn StateStorage>,
}

impl std::fmt::Debug for NotificationStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationStore")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl NotificationStore {
    /// Loads state from `storage`, falling back to the initial state when
    /// nothing is stored or the record is corrupted. A corrupted record is
    /// removed.
    pub fn load(storage: impl StateStorage + 'static) -> Self {
        let storage: Box<dyn StateStorage> = Box::new(storage);
        let state = match storage.load() {
            Ok(Some(record)) => match serde_json::from_str::<NotificationState>(&record) {
                Ok(state) => {
                    info!(
                        unread = state.unread_count,
                        items = state.items.len(),
                        "Restored notification state"
                    );
                    state
                }
                Err(e) => {
                    warn!("Discarding corrupted notification record: {e}");
                    if let Err(e) = storage.remove() {
                        warn!("Failed to remove corrupted notification record: {e}");
                    }
                    NotificationState::default()
                }
            },
            Ok(None) => NotificationState::default(),
            Err(e) => {
                warn!("Failed to read notification record: {e}");
                NotificationState::default()
            }
        };

        Self { state, storage }
    }

    /// A store backed by fresh in-memory storage.
    pub fn in_memory() -> Self {
        Self::load(MemoryStorage::new())
    }

    /// Wraps the store for sharing across tasks.
    pub fn into_shared(self) -> SharedStore {
        Arc::new(Mutex::new(self))
    }

    pub fn state(&self) -> &NotificationState {
        &self.state
    }

    pub fn items(&self) -> &[NotificationItem] {
        &self.state.items
    }

    pub fn unread_count(&self) -> u32 {
        self.state.unread_count
    }

    pub fn has_unread(&self) -> bool {
        self.state.has_unread
    }

    /// Whether an event arrived after the seen watermark was last moved.
    pub fn has_new_since_last_view(&self) -> bool {
        self.state.last_notification_id.is_some()
            && self.state.last_notification_id != self.state.last_seen_notification_id
    }

    /// Badge text: empty when nothing is unread, `9+` above nine.
    pub fn unread_badge(&self) -> String {
        match self.state.unread_count {
            0 => String::new(),
            n @ 1..=9 => n.to_string(),
            _ => "9+".to_string(),
        }
    }

    /// Records a delivered signal event.
    ///
    /// The unread count only grows for signal ids outside the tracked
    /// window. `AiAnalysisComplete` replaces any existing completion item
    /// for the same signal and moves it to the front; other kinds always
    /// prepend.
    pub fn add_notification(&mut self, signal_id: i64, kind: NotificationKind, data: NotificationData) {
        let now = now_unix_ms();
        let state = &mut self.state;

        let already_tracked = state.tracked_signal_ids.contains(&signal_id);
        state.tracked_signal_ids.retain(|id| *id != signal_id);
        state.tracked_signal_ids.insert(0, signal_id);
        state.tracked_signal_ids.truncate(MAX_TRACKED);

        if !already_tracked {
            state.unread_count = state.unread_count.saturating_add(1);
        }
        state.has_unread = true;
        state.last_notification_id = Some(format!("{signal_id}-{}-{now}", kind.as_str()));

        if kind == NotificationKind::AiAnalysisComplete {
            state
                .items
                .retain(|item| !(item.signal_id == signal_id && item.kind == kind));
        }
        state
            .items
            .insert(0, NotificationItem::new(signal_id, kind, data, now));
        state.items.truncate(MAX_TRACKED);

        debug!(
            signal_id,
            kind = kind.as_str(),
            duplicate = already_tracked,
            unread = state.unread_count,
            "Added notification"
        );
        self.persist();
    }

    /// Acknowledges everything: clears unread state and moves the seen
    /// watermark. Items and tracked ids are kept.
    pub fn mark_as_read(&mut self) {
        self.state.has_unread = false;
        self.state.unread_count = 0;
        self.state.last_seen_notification_id = self.state.last_notification_id.clone();
        self.state.last_viewed_at = Some(now_unix_ms());
        self.persist();
    }

    /// Empties items and tracked ids and resets unread state. Watermarks
    /// are left as they are.
    pub fn clear_notifications(&mut self) {
        self.state.items.clear();
        self.state.tracked_signal_ids.clear();
        self.state.has_unread = false;
        self.state.unread_count = 0;
        self.persist();
    }

    /// Moves the seen watermark after the signal list reloads. Unread state
    /// is untouched: a refreshed list is not an acknowledgement.
    pub fn refresh_signals(&mut self) {
        self.state.last_seen_notification_id = self.state.last_notification_id.clone();
        self.persist();
    }

    /// Resets to the initial state and removes the persisted record.
    pub fn clear_all(&mut self) {
        self.state = NotificationState::default();
        if let Err(e) = self.storage.remove() {
            warn!("Failed to remove notification record: {e}");
        }
        info!("Cleared all notification state");
    }

    /// Writes the current state to storage. Failures are logged only.
    pub fn persist(&self) {
        let record = match serde_json::to_string(&self.state) {
            Ok(record) => record,
            Err(e) => {
                warn!("Failed to serialize notification state: {e}");
                return;
            }
        };
        if let Err(e) = self.storage.save(&record) {
            warn!("Failed to persist notification state: {e}");
        }
    }
}

fn now_unix_ms() -> i64 {
    match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(duration) => duration.as_millis().min(i64::MAX as u128) as i64,
        Err(_) => 0,
    }
}
