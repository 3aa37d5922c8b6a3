use crate::{BatchId, BatchSnapshot, ControlAction, JobId};

#[derive(Debug, Clone, PartialEq)]
pub enum Msg {
    /// A batch detail view was opened.
    OpenBatch { batch_id: BatchId },
    /// The batch detail view went away; its state is discarded.
    CloseBatch,
    /// Snapshot API returned the batch with its jobs.
    SnapshotLoaded(BatchSnapshot),
    /// Snapshot API call failed; the current view is kept.
    SnapshotFailed { batch_id: BatchId, message: String },
    /// Raw payload received on the event stream.
    FrameReceived(String),
    /// Debounced connection status changed.
    ConnectionStatusChanged(bool),
    /// The raw link came back after a drop, possibly too fast to be presented.
    StreamReconnected,
    /// Reconnect counter moved, or the connection gave up.
    ReconnectStateChanged { attempts: u32, exhausted: bool },
    /// User asked to reconnect after the connection gave up.
    ReconnectRequested,
    /// User asked for a fresh snapshot.
    RefreshRequested,
    /// User asked for a control action on the open batch.
    ControlRequested(ControlAction),
    /// Control endpoint answered.
    ControlFinished {
        batch_id: BatchId,
        action: ControlAction,
        result: Result<(), String>,
    },
    /// Follow one job on its dedicated channel.
    WatchJob(JobId),
    UnwatchJob(JobId),
    /// Render tick.
    Tick,
    NoOp,
}
