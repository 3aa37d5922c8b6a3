use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{BatchId, BatchStatus, JobId, JobStatus};

/// Per-job progress event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobUpdate {
    pub job_id: JobId,
    pub batch_id: BatchId,
    #[serde(default)]
    pub episode_id: String,
    pub status: JobStatus,
    #[serde(default)]
    pub progress: u8,
    #[serde(default)]
    pub current_step: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// Batch-level summary event. Carries aggregates, never job detail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchUpdate {
    pub batch_id: BatchId,
    pub status: BatchStatus,
    #[serde(default)]
    pub completed_episodes: u32,
    #[serde(default)]
    pub failed_episodes: u32,
    #[serde(default)]
    pub total_episodes: u32,
    /// 0..=100
    #[serde(default)]
    pub progress_percent: f64,
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// Every frame the server may push, keyed by its `type` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundFrame {
    JobUpdate(JobUpdate),
    BatchUpdate(BatchUpdate),
    Pong,
    Subscribed { channel: String },
    Unsubscribed { channel: String },
    Error { message: String },
}

impl InboundFrame {
    pub fn decode(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}

/// Frames the client sends on the open stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum ControlFrame {
    Subscribe { channel: String },
    Unsubscribe { channel: String },
    Ping,
}

impl ControlFrame {
    pub fn encode(&self) -> String {
        let value = match self {
            ControlFrame::Subscribe { channel } => {
                json!({ "action": "subscribe", "channel": channel })
            }
            ControlFrame::Unsubscribe { channel } => {
                json!({ "action": "unsubscribe", "channel": channel })
            }
            ControlFrame::Ping => json!({ "action": "ping" }),
        };
        value.to_string()
    }
}

#[derive(Deserialize)]
struct FrameType {
    #[serde(rename = "type")]
    kind: Option<String>,
}

/// Cheap check used by the transport to swallow keepalive acknowledgements.
pub fn is_liveness_ack(raw: &str) -> bool {
    serde_json::from_str::<FrameType>(raw)
        .map(|frame| frame.kind.as_deref() == Some("pong"))
        .unwrap_or(false)
}
