//! Channel-backed window registry.
//!
//! Each open application window registers here and receives relay messages
//! on its own unbounded channel. Windows whose receiver was dropped are
//! pruned on the next enumeration.

use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{debug, info};

use super::{WindowClients, WindowId};
use crate::Result;
use crate::error::RelayError;
use crate::models::RelayMessage;

/// Receiving end of a window's relay channel.
pub type RelayReceiver = mpsc::UnboundedReceiver<RelayMessage>;

/// Receives URLs the worker asked to open in a new window.
pub type NavigationReceiver = mpsc::UnboundedReceiver<String>;

struct Window {
    id: WindowId,
    controlled: bool,
    tx: mpsc::UnboundedSender<RelayMessage>,
}

/// Registry of open windows, implementing [`WindowClients`].
pub struct WindowRegistry {
    windows: Mutex<Vec<Window>>,
    next_id: AtomicU64,
    navigations: mpsc::UnboundedSender<String>,
}

impl WindowRegistry {
    /// Creates an empty registry and the receiver for open-window requests.
    #[must_use]
    pub fn new() -> (Self, NavigationReceiver) {
        let (navigations, nav_rx) = mpsc::unbounded_channel();
        let registry = Self {
            windows: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
            navigations,
        };
        (registry, nav_rx)
    }

    /// Registers a window. `controlled` windows are reachable through the
    /// controlled-only fallback enumeration as well.
    pub fn register(&self, controlled: bool) -> (WindowId, RelayReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = WindowId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.lock().push(Window { id, controlled, tx });
        info!(window = id.0, controlled, "Window registered");
        (id, rx)
    }

    /// Number of windows whose receiver is still alive.
    pub fn window_count(&self) -> usize {
        let mut windows = self.lock();
        windows.retain(|w| !w.tx.is_closed());
        windows.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Window>> {
        self.windows.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl WindowClients for WindowRegistry {
    async fn match_all(&self, include_uncontrolled: bool) -> Result<Vec<WindowId>> {
        let mut windows = self.lock();
        windows.retain(|w| !w.tx.is_closed());
        Ok(windows
            .iter()
            .filter(|w| include_uncontrolled || w.controlled)
            .map(|w| w.id)
            .collect())
    }

    async fn post_message(&self, window: WindowId, message: &RelayMessage) -> Result<()> {
        let windows = self.lock();
        let target = windows
            .iter()
            .find(|w| w.id == window)
            .ok_or_else(|| RelayError::Platform(format!("window {} is not open", window.0)))?;
        target
            .tx
            .send(message.clone())
            .map_err(|_| RelayError::Platform(format!("window {} closed", window.0)))?;
        debug!(window = window.0, tpe = message.tpe.as_str(), "Posted relay message");
        Ok(())
    }

    async fn open_window(&self, url: &str) -> Result<()> {
        self.navigations
            .send(url.to_string())
            .map_err(|_| RelayError::Platform("navigation receiver dropped".to_string()))?;
        info!(url, "Opened window");
        Ok(())
    }
}
