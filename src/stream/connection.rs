//! Price stream connection lifecycle.
//!
//! [`PriceStreamClient`] owns a driver task that feeds socket, timer, and
//! command events through the [`ReconnectMachine`] and performs the actions
//! it returns. Snapshots and status are published over `watch` channels.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use tungstenite::Message as WsMessage;

use super::handler::{parse_tick, upsert_snapshot};
use super::state::{ConnectionState, ReconnectMachine, StreamAction, StreamEvent};
use super::{WsReader, WsWriter, combined_stream_url, connect};
use crate::Result;
use crate::models::CoinPriceSnapshot;

/// Delay before reconnecting after the socket closes.
pub const RECONNECT_DELAY: Duration = Duration::from_secs(5);

type ConnectFuture = Pin<Box<dyn Future<Output = Result<(WsWriter, WsReader)>> + Send>>;

/// Connection parameters for [`PriceStreamClient::spawn`].
#[derive(Debug, Clone)]
pub struct StreamSettings {
    pub base_url: String,
    pub symbols: Vec<String>,
    pub reconnect_delay: Duration,
}

impl StreamSettings {
    pub fn new(base_url: impl Into<String>, symbols: Vec<String>) -> Self {
        Self {
            base_url: base_url.into(),
            symbols,
            reconnect_delay: RECONNECT_DELAY,
        }
    }

    #[must_use]
    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }
}

/// Connection status exposed to readers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamStatus {
    pub state: ConnectionState,
    pub is_connected: bool,
    pub error: Option<String>,
}

impl StreamStatus {
    fn from_machine(machine: &ReconnectMachine) -> Self {
        Self {
            state: machine.state(),
            is_connected: machine.is_connected(),
            error: machine.error().map(String::from),
        }
    }
}

/// Commands sent from the client handle to the driver task.
enum StreamCommand {
    Reconnect,
    Disconnect,
}

/// Handle to a running price stream.
///
/// Dropping the handle tears the stream down.
pub struct PriceStreamClient {
    cmd_tx: mpsc::UnboundedSender<StreamCommand>,
    snapshots: watch::Receiver<Vec<CoinPriceSnapshot>>,
    status: watch::Receiver<StreamStatus>,
    task: Option<JoinHandle<()>>,
}

impl PriceStreamClient {
    /// Spawns the driver task and starts connecting. Must be called from
    /// within a tokio runtime.
    pub fn spawn(settings: StreamSettings) -> Self {
        let url = combined_stream_url(&settings.base_url, &settings.symbols);
        let machine = ReconnectMachine::new();

        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (snapshots_tx, snapshots) = watch::channel(Vec::new());
        let (status_tx, status) = watch::channel(StreamStatus::from_machine(&machine));

        let driver = StreamDriver {
            url,
            reconnect_delay: settings.reconnect_delay,
            machine,
            snapshots_tx,
            status_tx,
            cmd_rx,
            connecting: None,
            writer: None,
            reader: None,
            reconnect_at: None,
        };
        let task = tokio::spawn(driver.run());

        Self {
            cmd_tx,
            snapshots,
            status,
            task: Some(task),
        }
    }

    /// Connects now unless already open or connecting. Cancels a pending
    /// reconnect timer.
    pub fn reconnect(&self) {
        let _ = self.cmd_tx.send(StreamCommand::Reconnect);
    }

    /// Cancels any pending reconnect, closes the socket, and stays
    /// disconnected until [`reconnect`](Self::reconnect).
    pub fn disconnect(&self) {
        let _ = self.cmd_tx.send(StreamCommand::Disconnect);
    }

    /// Latest snapshot per symbol, in first-seen order.
    pub fn snapshots(&self) -> Vec<CoinPriceSnapshot> {
        self.snapshots.borrow().clone()
    }

    pub fn subscribe_snapshots(&self) -> watch::Receiver<Vec<CoinPriceSnapshot>> {
        self.snapshots.clone()
    }

    pub fn status(&self) -> StreamStatus {
        self.status.borrow().clone()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<StreamStatus> {
        self.status.clone()
    }

    /// Disconnects and waits for the driver task to finish.
    pub async fn shutdown(mut self) {
        self.disconnect();
        let task = self.task.take();
        drop(self);
        if let Some(task) = task {
            let _ = task.await;
        }
    }
}

impl Drop for PriceStreamClient {
    fn drop(&mut self) {
        // The driver also exits once the command channel closes.
        let _ = self.cmd_tx.send(StreamCommand::Disconnect);
    }
}

/// Task state owned by the spawned driver.
struct StreamDriver {
    url: String,
    reconnect_delay: Duration,
    machine: ReconnectMachine,
    snapshots_tx: watch::Sender<Vec<CoinPriceSnapshot>>,
    status_tx: watch::Sender<StreamStatus>,
    cmd_rx: mpsc::UnboundedReceiver<StreamCommand>,
    connecting: Option<ConnectFuture>,
    writer: Option<WsWriter>,
    reader: Option<WsReader>,
    reconnect_at: Option<Instant>,
}

impl StreamDriver {
    async fn run(mut self) {
        info!(url = %self.url, "Starting price stream");
        self.dispatch(StreamEvent::ReconnectRequested).await;

        loop {
            let events = tokio::select! {
                result = next_connect(&mut self.connecting) => {
                    self.connecting = None;
                    match result {
                        Ok((writer, reader)) => {
                            self.writer = Some(writer);
                            self.reader = Some(reader);
                            vec![StreamEvent::Opened]
                        }
                        Err(e) => {
                            warn!("Price stream connection failed: {e}");
                            vec![StreamEvent::Error(e.to_string()), StreamEvent::Closed]
                        }
                    }
                }

                frame = next_frame(&mut self.reader) => self.handle_frame(frame),

                () = reconnect_timer(self.reconnect_at) => {
                    self.reconnect_at = None;
                    vec![StreamEvent::ReconnectTimerFired]
                }

                cmd = self.cmd_rx.recv() => match cmd {
                    Some(StreamCommand::Reconnect) => vec![StreamEvent::ReconnectRequested],
                    Some(StreamCommand::Disconnect) => vec![StreamEvent::DisconnectRequested],
                    None => {
                        self.dispatch(StreamEvent::DisconnectRequested).await;
                        info!("Price stream handle dropped, driver stopping");
                        return;
                    }
                },
            };

            for event in events {
                self.dispatch(event).await;
            }
        }
    }

    /// Turns one read result into state-machine events, publishing ticks.
    fn handle_frame(
        &mut self,
        frame: Option<std::result::Result<WsMessage, tungstenite::Error>>,
    ) -> Vec<StreamEvent> {
        match frame {
            Some(Ok(WsMessage::Text(text))) => {
                match parse_tick(&text) {
                    Ok(snapshot) => {
                        debug!(symbol = %snapshot.symbol, price = %snapshot.price, "Tick");
                        self.snapshots_tx
                            .send_modify(|snapshots| upsert_snapshot(snapshots, snapshot));
                    }
                    Err(e) => warn!("Dropping stream message: {e}"),
                }
                vec![]
            }
            Some(Ok(_)) => vec![], // Binary/Ping/Pong/Close frames
            Some(Err(e)) => {
                warn!("Price stream error: {e}");
                self.drop_socket();
                vec![StreamEvent::Error(e.to_string()), StreamEvent::Closed]
            }
            None => {
                warn!("Price stream closed");
                self.drop_socket();
                vec![StreamEvent::Closed]
            }
        }
    }

    /// Feeds an event to the machine, performs its actions, and publishes
    /// the resulting status.
    async fn dispatch(&mut self, event: StreamEvent) {
        for action in self.machine.apply(event) {
            match action {
                StreamAction::OpenSocket => {
                    let url = self.url.clone();
                    info!(url = %url, "Connecting to price stream");
                    self.connecting = Some(Box::pin(async move { connect(&url).await }));
                }
                StreamAction::CloseSocket => {
                    self.connecting = None;
                    self.reader = None;
                    if let Some(mut writer) = self.writer.take() {
                        if let Err(e) = writer.close().await {
                            debug!("Close handshake failed: {e}");
                        }
                    }
                }
                StreamAction::ScheduleReconnect => {
                    info!(
                        delay_ms = self.reconnect_delay.as_millis() as u64,
                        "Scheduling price stream reconnect"
                    );
                    self.reconnect_at = Some(Instant::now() + self.reconnect_delay);
                }
                StreamAction::CancelReconnect => {
                    self.reconnect_at = None;
                }
            }
        }

        self.status_tx
            .send_replace(StreamStatus::from_machine(&self.machine));
    }

    fn drop_socket(&mut self) {
        self.reader = None;
        self.writer = None;
    }
}

async fn next_connect(connecting: &mut Option<ConnectFuture>) -> Result<(WsWriter, WsReader)> {
    match connecting.as_mut() {
        Some(fut) => fut.await,
        None => std::future::pending().await,
    }
}

async fn next_frame(
    reader: &mut Option<WsReader>,
) -> Option<std::result::Result<WsMessage, tungstenite::Error>> {
    match reader.as_mut() {
        Some(read) => read.next().await,
        None => std::future::pending().await,
    }
}

async fn reconnect_timer(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending::<()>().await,
    }
}
