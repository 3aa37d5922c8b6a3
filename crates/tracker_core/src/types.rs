use std::fmt;

use serde::{Deserialize, Serialize};

pub type BatchId = String;
pub type JobId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchStatus {
    Pending,
    Running,
    Paused,
    Completed,
    Cancelled,
    Failed,
}

impl BatchStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            BatchStatus::Pending => "pending",
            BatchStatus::Running => "running",
            BatchStatus::Paused => "paused",
            BatchStatus::Completed => "completed",
            BatchStatus::Cancelled => "cancelled",
            BatchStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Job lifecycle. The in-progress stages follow the pipeline order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Queued,
    Processing,
    Downloading,
    Uploading,
    Transcribing,
    Labeling,
    Chunking,
    Embedding,
    Done,
    Failed,
    Paused,
    Cancelled,
    /// Stand-in for a status this client does not know, taken from a snapshot.
    /// Stream events never decode into it.
    #[serde(skip_deserializing)]
    Unknown,
}

impl JobStatus {
    /// Terminal with respect to stream events; only a snapshot can move a job out.
    pub const fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Failed | JobStatus::Cancelled)
    }

    pub const fn is_in_progress(self) -> bool {
        matches!(
            self,
            JobStatus::Processing
                | JobStatus::Downloading
                | JobStatus::Uploading
                | JobStatus::Transcribing
                | JobStatus::Labeling
                | JobStatus::Chunking
                | JobStatus::Embedding
        )
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Queued => "queued",
            JobStatus::Processing => "processing",
            JobStatus::Downloading => "downloading",
            JobStatus::Uploading => "uploading",
            JobStatus::Transcribing => "transcribing",
            JobStatus::Labeling => "labeling",
            JobStatus::Chunking => "chunking",
            JobStatus::Embedding => "embedding",
            JobStatus::Done => "done",
            JobStatus::Failed => "failed",
            JobStatus::Paused => "paused",
            JobStatus::Cancelled => "cancelled",
            JobStatus::Unknown => "unknown",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub id: JobId,
    pub batch_id: BatchId,
    pub episode_id: String,
    pub episode_title: Option<String>,
    pub status: JobStatus,
    /// 0..=100
    pub progress: u8,
    pub current_step: Option<String>,
    pub error_message: Option<String>,
    pub cost_cents: Option<i64>,
}

impl Job {
    pub fn new(id: impl Into<JobId>, batch_id: impl Into<BatchId>, status: JobStatus) -> Self {
        Self {
            id: id.into(),
            batch_id: batch_id.into(),
            episode_id: String::new(),
            episode_title: None,
            status,
            progress: 0,
            current_step: None,
            error_message: None,
            cost_cents: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    pub id: BatchId,
    pub name: Option<String>,
    pub status: BatchStatus,
    pub total: u32,
    pub completed: u32,
    pub failed: u32,
    /// Fraction in `0.0..=1.0`.
    pub progress: f64,
    pub estimated_cost_cents: Option<i64>,
    pub actual_cost_cents: i64,
}

impl Batch {
    pub fn new(id: impl Into<BatchId>, status: BatchStatus, total: u32) -> Self {
        Self {
            id: id.into(),
            name: None,
            status,
            total,
            completed: 0,
            failed: 0,
            progress: 0.0,
            estimated_cost_cents: None,
            actual_cost_cents: 0,
        }
    }

    pub fn progress_percent(&self) -> f64 {
        self.progress * 100.0
    }
}

/// `(completed + failed) / total`, or 0 for an empty batch.
pub fn derived_progress(completed: u32, failed: u32, total: u32) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (f64::from(completed) + f64::from(failed)) / f64::from(total)
}

/// A batch together with its jobs, as read from the snapshot API.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchSnapshot {
    pub batch: Batch,
    pub jobs: Vec<Job>,
}

impl BatchSnapshot {
    pub fn new(batch: Batch, jobs: Vec<Job>) -> Self {
        Self { batch, jobs }
    }

    pub fn id(&self) -> &str {
        &self.batch.id
    }

    pub fn job(&self, job_id: &str) -> Option<&Job> {
        self.jobs.iter().find(|job| job.id == job_id)
    }

    pub(crate) fn job_mut(&mut self, job_id: &str) -> Option<&mut Job> {
        self.jobs.iter_mut().find(|job| job.id == job_id)
    }

    pub fn has_retryable_jobs(&self) -> bool {
        self.jobs
            .iter()
            .any(|job| matches!(job.status, JobStatus::Failed | JobStatus::Cancelled))
    }
}

/// Out-of-band control request against the snapshot API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlAction {
    Start,
    Pause,
    Resume,
    Cancel,
    Retry,
}

impl ControlAction {
    /// Path segment of the control endpoint.
    pub const fn as_str(self) -> &'static str {
        match self {
            ControlAction::Start => "start",
            ControlAction::Pause => "pause",
            ControlAction::Resume => "resume",
            ControlAction::Cancel => "cancel",
            ControlAction::Retry => "retry",
        }
    }

    /// Mirrors the server's preconditions so obviously invalid requests are not sent.
    pub fn is_allowed(self, snapshot: &BatchSnapshot) -> bool {
        let status = snapshot.batch.status;
        match self {
            ControlAction::Start => matches!(status, BatchStatus::Pending | BatchStatus::Paused),
            ControlAction::Pause => status == BatchStatus::Running,
            ControlAction::Resume => status == BatchStatus::Paused,
            ControlAction::Cancel => {
                !matches!(status, BatchStatus::Completed | BatchStatus::Cancelled)
            }
            ControlAction::Retry => snapshot.has_retryable_jobs(),
        }
    }
}

impl fmt::Display for ControlAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
