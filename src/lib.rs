//! Notification delivery and live price synchronization for a
//! trading-signal client.
//!
//! Provides the background push handler that shows notifications and relays
//! events to open windows, the persisted notification store those events
//! land in, a multiplexed ticker stream with an explicit reconnect state
//! machine, a REST polling fallback, and the signal feed that keeps the
//! store's seen watermark current.

pub mod config;
pub mod error;
pub mod listener;
pub mod models;
pub mod polling;
pub mod signals;
pub mod store;
pub mod stream;
pub mod worker;

pub use error::{RelayError, Result};
