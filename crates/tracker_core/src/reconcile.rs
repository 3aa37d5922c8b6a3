//! Pure reducers merging stream events into a batch snapshot.
//!
//! Both reducers take the snapshot by value and hand it back together with an
//! [`Outcome`]. An ignored event always returns the input untouched.

use crate::{derived_progress, BatchSnapshot, BatchStatus, BatchUpdate, JobStatus, JobUpdate};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Applied,
    Ignored(IgnoreReason),
}

impl Outcome {
    pub fn is_applied(self) -> bool {
        self == Outcome::Applied
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    NoSnapshot,
    BatchMismatch,
    BatchCancelled,
    UnknownJob,
    TerminalJob,
}

pub fn apply_job_update(
    snapshot: Option<BatchSnapshot>,
    event: &JobUpdate,
) -> (Option<BatchSnapshot>, Outcome) {
    let Some(mut snapshot) = snapshot else {
        return (None, Outcome::Ignored(IgnoreReason::NoSnapshot));
    };
    if snapshot.id() != event.batch_id {
        return (Some(snapshot), Outcome::Ignored(IgnoreReason::BatchMismatch));
    }
    // Cancellation is a one-way gate; stragglers must not unwind it.
    if snapshot.batch.status == BatchStatus::Cancelled {
        return (Some(snapshot), Outcome::Ignored(IgnoreReason::BatchCancelled));
    }

    let Some(job) = snapshot.job_mut(&event.job_id) else {
        return (Some(snapshot), Outcome::Ignored(IgnoreReason::UnknownJob));
    };
    if job.status.is_terminal() {
        return (Some(snapshot), Outcome::Ignored(IgnoreReason::TerminalJob));
    }

    job.status = event.status;
    job.progress = event.progress.min(100);
    job.current_step = event.current_step.clone().filter(|step| !step.is_empty());
    job.error_message = event.error_message.clone();

    recount(&mut snapshot);
    (Some(snapshot), Outcome::Applied)
}

pub fn apply_batch_update(
    snapshot: Option<BatchSnapshot>,
    event: &BatchUpdate,
) -> (Option<BatchSnapshot>, Outcome) {
    let Some(mut snapshot) = snapshot else {
        return (None, Outcome::Ignored(IgnoreReason::NoSnapshot));
    };
    if snapshot.id() != event.batch_id {
        return (Some(snapshot), Outcome::Ignored(IgnoreReason::BatchMismatch));
    }

    let batch = &mut snapshot.batch;
    batch.status = event.status;
    // A missing total keeps the snapshot's value.
    if event.total_episodes > 0 {
        batch.total = event.total_episodes;
    }
    batch.completed = event.completed_episodes;
    batch.failed = event.failed_episodes;
    batch.progress = (event.progress_percent / 100.0).clamp(0.0, 1.0);

    if event.status == BatchStatus::Cancelled {
        for job in snapshot
            .jobs
            .iter_mut()
            .filter(|job| !job.status.is_terminal())
        {
            job.status = JobStatus::Cancelled;
            job.current_step = None;
        }
    }

    (Some(snapshot), Outcome::Applied)
}

/// Recomputes the aggregates from the job list; never delta-based, so
/// duplicated or replayed events cannot skew the counts.
fn recount(snapshot: &mut BatchSnapshot) {
    let count = |status: JobStatus| {
        let n = snapshot.jobs.iter().filter(|job| job.status == status).count();
        u32::try_from(n).unwrap_or(u32::MAX)
    };
    let completed = count(JobStatus::Done);
    let failed = count(JobStatus::Failed);

    let batch = &mut snapshot.batch;
    batch.completed = completed;
    batch.failed = failed;
    batch.progress = derived_progress(completed, failed, batch.total).min(1.0);
}
