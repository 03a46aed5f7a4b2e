//! Connection state machine for the price stream.
//!
//! [`ReconnectMachine`] is pure: it consumes [`StreamEvent`]s and returns
//! the [`StreamAction`]s the driver must perform. A reconnect timer only
//! exists while in [`ConnectionState::ReconnectScheduled`], so at most one
//! is ever pending.

/// Lifecycle of the stream connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// A connection attempt is in flight.
    Connecting,
    /// The socket is open and delivering ticks.
    Open,
    /// Idle; only a manual reconnect leaves this state.
    Disconnected,
    /// Waiting for the reconnect timer.
    ReconnectScheduled,
}

/// Inputs to the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// The handshake completed.
    Opened,
    /// The socket or the connection attempt failed.
    Error(String),
    /// The socket closed, after an error or not.
    Closed,
    /// Manual reconnect.
    ReconnectRequested,
    /// Manual disconnect or teardown.
    DisconnectRequested,
    /// The pending reconnect timer elapsed.
    ReconnectTimerFired,
}

/// Side effects requested by a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamAction {
    OpenSocket,
    CloseSocket,
    ScheduleReconnect,
    CancelReconnect,
}

/// Tracks the connection state plus the connected/error flags exposed to
/// readers.
#[derive(Debug, Clone)]
pub struct ReconnectMachine {
    state: ConnectionState,
    connected: bool,
    error: Option<String>,
    timer_pending: bool,
}

impl Default for ReconnectMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl ReconnectMachine {
    /// Starts disconnected with no timer.
    pub fn new() -> Self {
        Self {
            state: ConnectionState::Disconnected,
            connected: false,
            error: None,
            timer_pending: false,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Whether a reconnect timer is currently scheduled.
    pub fn timer_pending(&self) -> bool {
        self.timer_pending
    }

    /// Applies an event and returns the actions to perform, in order.
    pub fn apply(&mut self, event: StreamEvent) -> Vec<StreamAction> {
        use ConnectionState::*;

        let actions = match (self.state, event) {
            (Connecting, StreamEvent::Opened) => {
                self.state = Open;
                self.connected = true;
                self.error = None;
                vec![]
            }
            // A handshake finishing after a disconnect is discarded.
            (_, StreamEvent::Opened) => vec![StreamAction::CloseSocket],

            (Connecting | Open, StreamEvent::Error(message)) => {
                self.connected = false;
                self.error = Some(message);
                vec![]
            }
            (_, StreamEvent::Error(_)) => vec![],

            (Connecting | Open, StreamEvent::Closed) => {
                self.state = ReconnectScheduled;
                self.connected = false;
                vec![StreamAction::CancelReconnect, StreamAction::ScheduleReconnect]
            }
            (_, StreamEvent::Closed) => vec![],

            (Connecting | Open, StreamEvent::ReconnectRequested) => vec![],
            (Disconnected, StreamEvent::ReconnectRequested) => {
                self.state = Connecting;
                vec![StreamAction::OpenSocket]
            }
            (ReconnectScheduled, StreamEvent::ReconnectRequested) => {
                self.state = Connecting;
                vec![StreamAction::CancelReconnect, StreamAction::OpenSocket]
            }

            (ReconnectScheduled, StreamEvent::ReconnectTimerFired) => {
                self.state = Connecting;
                self.timer_pending = false;
                vec![StreamAction::OpenSocket]
            }
            (_, StreamEvent::ReconnectTimerFired) => vec![],

            (Connecting | Open, StreamEvent::DisconnectRequested) => {
                self.state = Disconnected;
                self.connected = false;
                vec![StreamAction::CloseSocket]
            }
            (ReconnectScheduled, StreamEvent::DisconnectRequested) => {
                self.state = Disconnected;
                vec![StreamAction::CancelReconnect]
            }
            (Disconnected, StreamEvent::DisconnectRequested) => vec![],
        };

        for action in &actions {
            match action {
                StreamAction::CancelReconnect => self.timer_pending = false,
                StreamAction::ScheduleReconnect => {
                    debug_assert!(!self.timer_pending, "reconnect timer already pending");
                    self.timer_pending = true;
                }
                StreamAction::OpenSocket | StreamAction::CloseSocket => {}
            }
        }

        actions
    }
}
