//! Shared models for push payloads, relay messages, signals, and tickers.
//!
//! Contains the stream and REST ticker wire formats, the display-ready
//! [`CoinPriceSnapshot`](ticker::CoinPriceSnapshot), the push/relay message
//! schema exchanged between the worker and open windows, and the signal
//! records served by the backend.

pub mod notification;
pub mod signal;
pub mod ticker;

pub use notification::{
    ClientMessageType, NotificationAttachment, NotificationClick, NotificationData,
    NotificationItem, NotificationKind, NotificationRequest, PlatformNotification, PushMessage,
    RelayMessage,
};
pub use signal::{AnnotatedSignal, Signal, SignalFilters, SignalStats, SignalVersion};
pub use ticker::CoinPriceSnapshot;
