use crate::{BatchId, Channel, ControlAction};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Subscribe(Channel),
    Unsubscribe(Channel),
    FetchSnapshot { batch_id: BatchId },
    RunControl { batch_id: BatchId, action: ControlAction },
    Reconnect,
}
