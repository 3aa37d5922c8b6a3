#![allow(dead_code)]

use tracker_core::{
    Batch, BatchSnapshot, BatchStatus, BatchUpdate, Job, JobStatus, JobUpdate,
};

pub fn init_logging() {
    tracker_logging::initialize_for_tests();
}

pub fn snapshot(batch_id: &str, statuses: &[JobStatus]) -> BatchSnapshot {
    let total = u32::try_from(statuses.len()).unwrap();
    let mut batch = Batch::new(batch_id, BatchStatus::Running, total);
    batch.name = Some("Weekly podcast backfill".to_string());
    let jobs = statuses
        .iter()
        .enumerate()
        .map(|(index, status)| {
            let mut job = Job::new(format!("job{}", index + 1), batch_id, *status);
            job.episode_id = format!("ep{}", index + 1);
            job
        })
        .collect();
    BatchSnapshot::new(batch, jobs)
}

pub fn job_update(batch_id: &str, job_id: &str, status: JobStatus) -> JobUpdate {
    JobUpdate {
        job_id: job_id.to_string(),
        batch_id: batch_id.to_string(),
        episode_id: String::new(),
        status,
        progress: if status == JobStatus::Done { 100 } else { 0 },
        current_step: None,
        error_message: None,
        timestamp: None,
    }
}

pub fn batch_update(
    batch_id: &str,
    status: BatchStatus,
    completed: u32,
    failed: u32,
    total: u32,
    progress_percent: f64,
) -> BatchUpdate {
    BatchUpdate {
        batch_id: batch_id.to_string(),
        status,
        completed_episodes: completed,
        failed_episodes: failed,
        total_episodes: total,
        progress_percent,
        timestamp: None,
    }
}

pub fn statuses(snapshot: &BatchSnapshot) -> Vec<JobStatus> {
    snapshot.jobs.iter().map(|job| job.status).collect()
}
