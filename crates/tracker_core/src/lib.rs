//! Batch tracker core: pure domain model, frame codec and state machine.
mod channel;
mod dispatch;
mod effect;
mod frame;
mod msg;
pub mod reconcile;
mod state;
mod types;
mod update;
mod view_model;

pub use channel::{join_channels, Channel, ChannelParseError, SubscriptionRegistry};
pub use dispatch::{Dispatch, Dispatcher, DomainEvent};
pub use effect::Effect;
pub use frame::{is_liveness_ack, BatchUpdate, ControlFrame, InboundFrame, JobUpdate};
pub use msg::Msg;
pub use reconcile::{apply_batch_update, apply_job_update, IgnoreReason, Outcome};
pub use state::{MonitorState, MAX_PENDING_EVENTS};
pub use types::{
    derived_progress, Batch, BatchId, BatchSnapshot, BatchStatus, ControlAction, Job, JobId,
    JobStatus,
};
pub use update::update;
pub use view_model::{BatchRowView, ConnectionView, JobRowView, MonitorViewModel};
