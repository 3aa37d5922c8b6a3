use crate::{BatchStatus, JobId, JobStatus};

#[derive(Debug, Clone, PartialEq, Default)]
pub struct MonitorViewModel {
    pub connection: ConnectionView,
    pub batch_id: Option<String>,
    pub loading: bool,
    pub batch: Option<BatchRowView>,
    pub jobs: Vec<JobRowView>,
    pub watched_jobs: Vec<JobId>,
    pub last_error: Option<String>,
    pub decode_failures: u64,
    pub dirty: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConnectionView {
    pub connected: bool,
    pub reconnect_attempts: u32,
    pub gave_up: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatchRowView {
    pub id: String,
    pub name: Option<String>,
    pub status: BatchStatus,
    pub total: u32,
    pub completed: u32,
    pub failed: u32,
    pub progress_percent: f64,
    pub actual_cost_cents: i64,
    pub estimated_cost_cents: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRowView {
    pub job_id: JobId,
    /// Episode title when known, otherwise the episode id.
    pub label: String,
    pub status: JobStatus,
    pub progress: u8,
    pub current_step: Option<String>,
    pub error_message: Option<String>,
}
