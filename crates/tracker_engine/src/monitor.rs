use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracker_core::{update, Channel, Effect, MonitorState, MonitorViewModel, Msg};
use tracker_logging::{tracker_info, tracker_warn};

use crate::api::{ApiSettings, SnapshotApi};
use crate::connection::{ConnectionHandle, ConnectionManager, ConnectionSettings};
use crate::presenter::StatusPresenter;
use crate::transport::Connector;

#[derive(Debug, Clone)]
pub struct MonitorSettings {
    pub connection: ConnectionSettings,
    pub api: ApiSettings,
    pub status_debounce: Duration,
    /// Also follow the global feed next to the per-batch channel.
    pub subscribe_global: bool,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            connection: ConnectionSettings::default(),
            api: ApiSettings::default(),
            status_debounce: Duration::from_secs(1),
            subscribe_global: true,
        }
    }
}

/// Runs the update loop for one consumer: stream frames, debounced status,
/// snapshot results and user messages all become [`Msg`]s, and the resulting
/// [`Effect`]s are executed here.
pub struct BatchMonitor {
    msg_tx: mpsc::UnboundedSender<Msg>,
    view_rx: watch::Receiver<MonitorViewModel>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl BatchMonitor {
    pub fn start(
        connector: Arc<dyn Connector>,
        api: Arc<dyn SnapshotApi>,
        settings: &MonitorSettings,
    ) -> Self {
        let (msg_tx, msg_rx) = mpsc::unbounded_channel();
        let state = MonitorState::new();
        let (view_tx, view_rx) = watch::channel(state.view());
        let cancel = CancellationToken::new();

        let mut channels = Vec::new();
        if settings.subscribe_global {
            channels.push(Channel::Updates);
        }
        let connections = ConnectionManager::new(connector, settings.connection.clone());
        let connection = connections.open(channels);
        let presenter = StatusPresenter::spawn(connection.liveness(), settings.status_debounce);

        let runtime = MonitorRuntime {
            state,
            connection,
            presenter,
            api,
            requests: JoinSet::new(),
            view_tx,
        };
        let task = tokio::spawn(runtime.run(msg_rx, cancel.clone()));

        Self {
            msg_tx,
            view_rx,
            cancel,
            task: Some(task),
        }
    }

    pub fn send(&self, msg: Msg) {
        let _ = self.msg_tx.send(msg);
    }

    pub fn view(&self) -> watch::Receiver<MonitorViewModel> {
        self.view_rx.clone()
    }

    /// Stops the loop, closes the connection and aborts in-flight requests.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            if let Err(err) = task.await {
                tracker_warn!("monitor task ended abnormally: {}", err);
            }
        }
    }
}

impl Drop for BatchMonitor {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

struct MonitorRuntime {
    state: MonitorState,
    connection: ConnectionHandle,
    presenter: StatusPresenter,
    api: Arc<dyn SnapshotApi>,
    requests: JoinSet<Msg>,
    view_tx: watch::Sender<MonitorViewModel>,
}

impl MonitorRuntime {
    async fn run(mut self, mut msg_rx: mpsc::UnboundedReceiver<Msg>, cancel: CancellationToken) {
        let mut presented = self.presenter.presented();
        let mut reconnect = self.connection.reconnect_state();
        let mut raw = self.connection.liveness();
        let mut presenter_open = true;
        let mut reconnect_open = true;
        let mut raw_open = true;
        let mut was_live = false;

        loop {
            let msg = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                msg = msg_rx.recv() => match msg {
                    Some(msg) => msg,
                    None => break,
                },
                frame = self.connection.next_frame() => match frame {
                    Some(raw) => Msg::FrameReceived(raw),
                    None => break,
                },
                changed = presented.changed(), if presenter_open => match changed {
                    Ok(()) => Msg::ConnectionStatusChanged(*presented.borrow_and_update()),
                    Err(_) => {
                        presenter_open = false;
                        continue;
                    }
                },
                changed = raw.changed(), if raw_open => match changed {
                    Ok(()) => {
                        let live = *raw.borrow_and_update();
                        let reconnected = live && was_live;
                        was_live |= live;
                        if !reconnected {
                            continue;
                        }
                        Msg::StreamReconnected
                    }
                    Err(_) => {
                        raw_open = false;
                        continue;
                    }
                },
                changed = reconnect.changed(), if reconnect_open => match changed {
                    Ok(()) => {
                        let state = *reconnect.borrow_and_update();
                        Msg::ReconnectStateChanged {
                            attempts: state.attempts,
                            exhausted: state.exhausted,
                        }
                    }
                    Err(_) => {
                        reconnect_open = false;
                        continue;
                    }
                },
                Some(joined) = self.requests.join_next(), if !self.requests.is_empty() => match joined {
                    Ok(msg) => msg,
                    Err(err) => {
                        tracker_warn!("request task failed: {}", err);
                        continue;
                    }
                },
            };

            let (state, effects) = update(std::mem::take(&mut self.state), msg);
            self.state = state;
            for effect in effects {
                self.execute(effect);
            }
            if self.state.consume_dirty() {
                self.view_tx.send_replace(self.state.view());
            }
        }

        // Teardown order: no request result or frame may land after this.
        self.requests.abort_all();
        self.connection.close();
        tracker_info!("batch monitor stopped");
    }

    fn execute(&mut self, effect: Effect) {
        match effect {
            Effect::Subscribe(channel) => self.connection.subscribe(channel),
            Effect::Unsubscribe(channel) => self.connection.unsubscribe(channel),
            Effect::Reconnect => self.connection.reopen(),
            Effect::FetchSnapshot { batch_id } => {
                let api = self.api.clone();
                self.requests.spawn(async move {
                    match api.get_batch(&batch_id).await {
                        Ok(snapshot) => Msg::SnapshotLoaded(snapshot),
                        Err(err) => Msg::SnapshotFailed {
                            batch_id,
                            message: err.to_string(),
                        },
                    }
                });
            }
            Effect::RunControl { batch_id, action } => {
                let api = self.api.clone();
                self.requests.spawn(async move {
                    let result = api
                        .control(&batch_id, action)
                        .await
                        .map_err(|err| err.to_string());
                    Msg::ControlFinished {
                        batch_id,
                        action,
                        result,
                    }
                });
            }
        }
    }
}
