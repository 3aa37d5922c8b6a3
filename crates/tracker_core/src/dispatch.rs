use tracker_logging::{tracker_debug, tracker_trace, tracker_warn};

use crate::reconcile::{apply_batch_update, apply_job_update, Outcome};
use crate::{BatchSnapshot, BatchUpdate, InboundFrame, JobUpdate};

/// A decoded frame that carries domain state.
#[derive(Debug, Clone, PartialEq)]
pub enum DomainEvent {
    Job(JobUpdate),
    Batch(BatchUpdate),
}

impl DomainEvent {
    pub fn batch_id(&self) -> &str {
        match self {
            DomainEvent::Job(event) => &event.batch_id,
            DomainEvent::Batch(event) => &event.batch_id,
        }
    }

    /// Routes the event to the reducer for its declared type.
    pub fn apply(&self, snapshot: Option<BatchSnapshot>) -> (Option<BatchSnapshot>, Outcome) {
        match self {
            DomainEvent::Job(event) => apply_job_update(snapshot, event),
            DomainEvent::Batch(event) => apply_batch_update(snapshot, event),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    Event(DomainEvent),
    /// Liveness, subscription or error notice from the server; not domain state.
    Discarded,
    /// Payload could not be decoded.
    Dropped,
}

/// Decodes raw payloads and classifies them. Never fails; bad frames are counted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dispatcher {
    decode_failures: u64,
    discarded: u64,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn classify(&mut self, raw: &str) -> Dispatch {
        let frame = match InboundFrame::decode(raw) {
            Ok(frame) => frame,
            Err(err) => {
                self.decode_failures += 1;
                tracker_debug!(
                    "dropping undecodable frame ({} so far): {}",
                    self.decode_failures,
                    err
                );
                return Dispatch::Dropped;
            }
        };

        match frame {
            InboundFrame::JobUpdate(event) => Dispatch::Event(DomainEvent::Job(event)),
            InboundFrame::BatchUpdate(event) => Dispatch::Event(DomainEvent::Batch(event)),
            InboundFrame::Pong => {
                self.discarded += 1;
                Dispatch::Discarded
            }
            InboundFrame::Subscribed { channel } | InboundFrame::Unsubscribed { channel } => {
                tracker_trace!("subscription acknowledged for {}", channel);
                self.discarded += 1;
                Dispatch::Discarded
            }
            InboundFrame::Error { message } => {
                tracker_warn!("event stream reported an error: {}", message);
                self.discarded += 1;
                Dispatch::Discarded
            }
        }
    }

    pub fn decode_failures(&self) -> u64 {
        self.decode_failures
    }

    pub fn discarded(&self) -> u64 {
        self.discarded
    }
}
