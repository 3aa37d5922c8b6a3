//! Connection manager: one event-stream link with keepalive and bounded
//! reconnection.
//!
//! [`ConnectionManager::open`] spawns a task that owns the link and the
//! [`SubscriptionRegistry`]. The returned [`ConnectionHandle`] is the only way
//! to observe it; closing (or dropping) the handle stops every timer and
//! guarantees no liveness or frame notification is delivered afterwards.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracker_core::{is_liveness_ack, Channel, ControlFrame, SubscriptionRegistry};
use tracker_logging::{tracker_debug, tracker_info, tracker_trace, tracker_warn};

use crate::transport::{Connector, Link};

#[derive(Debug, Clone)]
pub struct ConnectionSettings {
    /// Websocket endpoint, e.g. `ws://localhost:8000/api/ws`.
    pub endpoint: String,
    pub bearer_token: Option<String>,
    pub connect_timeout: Duration,
    pub keepalive_interval: Duration,
    pub reconnect_delay: Duration,
    pub max_reconnect_attempts: u32,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            endpoint: "ws://localhost:8000/api/ws".to_string(),
            bearer_token: None,
            connect_timeout: Duration::from_secs(10),
            keepalive_interval: Duration::from_secs(30),
            reconnect_delay: Duration::from_secs(3),
            max_reconnect_attempts: 5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReconnectState {
    pub attempts: u32,
    /// The cap was reached; nothing is scheduled until [`ConnectionHandle::reopen`].
    pub exhausted: bool,
}

enum Command {
    Subscribe(Channel),
    Unsubscribe(Channel),
    Reopen,
}

/// Notification side of a connection. Every send goes through the lock so
/// that `close()` is a hard cut-off.
struct Outlet {
    closed: bool,
    live_tx: watch::Sender<bool>,
    reconnect_tx: watch::Sender<ReconnectState>,
    frame_tx: mpsc::UnboundedSender<String>,
}

type SharedOutlet = Arc<Mutex<Outlet>>;

fn with_outlet(outlet: &SharedOutlet, f: impl FnOnce(&Outlet) -> bool) -> bool {
    match outlet.lock() {
        Ok(guard) if !guard.closed => f(&guard),
        _ => false,
    }
}

fn publish_live(outlet: &SharedOutlet, live: bool) {
    with_outlet(outlet, |o| {
        o.live_tx.send_if_modified(|current| {
            let changed = *current != live;
            *current = live;
            changed
        })
    });
}

fn publish_reconnect(outlet: &SharedOutlet, state: ReconnectState) {
    with_outlet(outlet, |o| {
        o.reconnect_tx.send_replace(state);
        true
    });
}

fn emit_frame(outlet: &SharedOutlet, text: String) -> bool {
    with_outlet(outlet, |o| o.frame_tx.send(text).is_ok())
}

/// Factory for connections sharing one transport and one set of settings.
#[derive(Clone)]
pub struct ConnectionManager {
    connector: Arc<dyn Connector>,
    settings: ConnectionSettings,
}

impl ConnectionManager {
    pub fn new(connector: Arc<dyn Connector>, settings: ConnectionSettings) -> Self {
        Self {
            connector,
            settings,
        }
    }

    pub fn settings(&self) -> &ConnectionSettings {
        &self.settings
    }

    /// Starts connecting with `channels` in the handshake. Must be called
    /// from within a tokio runtime.
    pub fn open(&self, channels: impl IntoIterator<Item = Channel>) -> ConnectionHandle {
        let (live_tx, live_rx) = watch::channel(false);
        let (reconnect_tx, reconnect_rx) = watch::channel(ReconnectState::default());
        let (frame_tx, frame_rx) = mpsc::unbounded_channel();
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let outlet = Arc::new(Mutex::new(Outlet {
            closed: false,
            live_tx,
            reconnect_tx,
            frame_tx,
        }));
        let cancel = CancellationToken::new();

        let worker = Worker {
            connector: self.connector.clone(),
            settings: self.settings.clone(),
            registry: SubscriptionRegistry::new(channels),
            outlet: outlet.clone(),
            cmd_rx,
            cancel: cancel.clone(),
        };
        let task = tokio::spawn(worker.run());

        ConnectionHandle {
            cancel,
            outlet,
            cmd_tx,
            frame_rx,
            live_rx,
            reconnect_rx,
            task: Some(task),
        }
    }
}

/// Owner-side view of one open connection.
pub struct ConnectionHandle {
    cancel: CancellationToken,
    outlet: SharedOutlet,
    cmd_tx: mpsc::UnboundedSender<Command>,
    frame_rx: mpsc::UnboundedReceiver<String>,
    live_rx: watch::Receiver<bool>,
    reconnect_rx: watch::Receiver<ReconnectState>,
    task: Option<JoinHandle<()>>,
}

impl ConnectionHandle {
    pub fn subscribe(&self, channel: Channel) {
        let _ = self.cmd_tx.send(Command::Subscribe(channel));
    }

    pub fn unsubscribe(&self, channel: Channel) {
        let _ = self.cmd_tx.send(Command::Unsubscribe(channel));
    }

    /// Resumes connecting with a fresh attempt counter after the cap was hit.
    pub fn reopen(&self) {
        let _ = self.cmd_tx.send(Command::Reopen);
    }

    /// Raw liveness. Feeds the status presenter.
    pub fn liveness(&self) -> watch::Receiver<bool> {
        self.live_rx.clone()
    }

    pub fn is_live(&self) -> bool {
        !self.is_closed() && *self.live_rx.borrow()
    }

    pub fn reconnect_state(&self) -> watch::Receiver<ReconnectState> {
        self.reconnect_rx.clone()
    }

    /// Next raw payload, keepalive acknowledgements excluded. Returns `None`
    /// once the handle is closed.
    pub async fn next_frame(&mut self) -> Option<String> {
        if self.is_closed() {
            return None;
        }
        self.frame_rx.recv().await
    }

    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Idempotent teardown: cancels the link, keepalive and any pending
    /// reconnection timer.
    pub fn close(&mut self) {
        if let Ok(mut outlet) = self.outlet.lock() {
            outlet.closed = true;
        }
        self.cancel.cancel();
        self.frame_rx.close();
        if self.task.take().is_some() {
            tracker_debug!("event stream connection closed by owner");
        }
    }
}

impl Drop for ConnectionHandle {
    fn drop(&mut self) {
        self.close();
    }
}

enum LinkEnd {
    Cancelled,
    Lost(String),
}

enum Wait {
    Elapsed,
    Reopen,
    Cancelled,
}

struct Worker {
    connector: Arc<dyn Connector>,
    settings: ConnectionSettings,
    registry: SubscriptionRegistry,
    outlet: SharedOutlet,
    cmd_rx: mpsc::UnboundedReceiver<Command>,
    cancel: CancellationToken,
}

impl Worker {
    async fn run(mut self) {
        let mut attempts: u32 = 0;
        loop {
            let channels = self.registry.channels();
            let connected = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return,
                result = self.connector.connect(&channels) => result,
            };

            match connected {
                Ok(link) => {
                    // The counter only ever resets here, on a successful handshake.
                    attempts = 0;
                    publish_reconnect(&self.outlet, ReconnectState::default());
                    publish_live(&self.outlet, true);
                    tracker_info!(
                        "event stream connected with {} channel(s)",
                        channels.len()
                    );

                    let end = self.drive(link).await;
                    publish_live(&self.outlet, false);
                    match end {
                        LinkEnd::Cancelled => return,
                        LinkEnd::Lost(reason) => tracker_warn!("event stream lost: {}", reason),
                    }
                }
                Err(err) => {
                    tracker_warn!("event stream connect failed: {}", err);
                    publish_live(&self.outlet, false);
                }
            }

            if attempts >= self.settings.max_reconnect_attempts {
                tracker_warn!(
                    "giving up on the event stream after {} reconnect attempt(s)",
                    attempts
                );
                publish_reconnect(
                    &self.outlet,
                    ReconnectState {
                        attempts,
                        exhausted: true,
                    },
                );
                if !self.park().await {
                    return;
                }
                attempts = 0;
                publish_reconnect(&self.outlet, ReconnectState::default());
                continue;
            }

            attempts += 1;
            publish_reconnect(
                &self.outlet,
                ReconnectState {
                    attempts,
                    exhausted: false,
                },
            );
            tracker_debug!(
                "reconnecting in {:?} (attempt {}/{})",
                self.settings.reconnect_delay,
                attempts,
                self.settings.max_reconnect_attempts
            );
            match self.wait_for_retry().await {
                Wait::Elapsed => {}
                Wait::Reopen => {
                    attempts = 0;
                    publish_reconnect(&self.outlet, ReconnectState::default());
                }
                Wait::Cancelled => return,
            }
        }
    }

    async fn drive(&mut self, mut link: Box<dyn Link>) -> LinkEnd {
        let period = self.settings.keepalive_interval;
        let mut keepalive = tokio::time::interval_at(Instant::now() + period, period);
        keepalive.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut awaiting_pong = false;

        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return LinkEnd::Cancelled,
                inbound = link.recv() => match inbound {
                    Some(Ok(text)) => {
                        if is_liveness_ack(&text) {
                            awaiting_pong = false;
                            continue;
                        }
                        tracker_trace!("frame received ({} bytes)", text.len());
                        if !emit_frame(&self.outlet, text) {
                            return LinkEnd::Cancelled;
                        }
                    }
                    Some(Err(err)) => return LinkEnd::Lost(err.to_string()),
                    None => return LinkEnd::Lost("closed by remote".to_string()),
                },
                command = self.cmd_rx.recv() => {
                    let frame = match command {
                        Some(Command::Subscribe(channel)) => self.registry.subscribe(channel, true),
                        Some(Command::Unsubscribe(channel)) => {
                            self.registry.unsubscribe(&channel, true)
                        }
                        Some(Command::Reopen) => None,
                        None => return LinkEnd::Cancelled,
                    };
                    if let Some(frame) = frame {
                        if let Err(err) = link.send(frame.encode()).await {
                            return LinkEnd::Lost(err.to_string());
                        }
                    }
                }
                _ = keepalive.tick() => {
                    if awaiting_pong {
                        return LinkEnd::Lost("keepalive probe unanswered".to_string());
                    }
                    if let Err(err) = link.send(ControlFrame::Ping.encode()).await {
                        return LinkEnd::Lost(err.to_string());
                    }
                    awaiting_pong = true;
                }
            }
        }
    }

    /// Sleeps out the reconnect delay while keeping the desired set current.
    async fn wait_for_retry(&mut self) -> Wait {
        let sleep = tokio::time::sleep(self.settings.reconnect_delay);
        tokio::pin!(sleep);
        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Wait::Cancelled,
                _ = &mut sleep => return Wait::Elapsed,
                command = self.cmd_rx.recv() => match command {
                    Some(Command::Reopen) => return Wait::Reopen,
                    Some(command) => self.apply_offline(command),
                    None => return Wait::Cancelled,
                },
            }
        }
    }

    /// Idles without timers after the cap was reached. Returns `true` on reopen.
    async fn park(&mut self) -> bool {
        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return false,
                command = self.cmd_rx.recv() => match command {
                    Some(Command::Reopen) => {
                        tracker_info!("event stream reopened by owner");
                        return true;
                    }
                    Some(command) => self.apply_offline(command),
                    None => return false,
                },
            }
        }
    }

    fn apply_offline(&mut self, command: Command) {
        match command {
            Command::Subscribe(channel) => {
                self.registry.subscribe(channel, false);
            }
            Command::Unsubscribe(channel) => {
                self.registry.unsubscribe(&channel, false);
            }
            Command::Reopen => {}
        }
    }
}
