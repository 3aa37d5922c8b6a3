mod common;

use common::{batch_update, init_logging, job_update, snapshot, statuses};
use pretty_assertions::assert_eq;
use tracker_core::{
    apply_batch_update, apply_job_update, BatchSnapshot, BatchStatus, IgnoreReason, JobStatus,
    JobUpdate, Outcome,
};

fn apply_all(snapshot: BatchSnapshot, events: &[JobUpdate]) -> BatchSnapshot {
    events.iter().fold(snapshot, |current, event| {
        apply_job_update(Some(current), event).0.unwrap()
    })
}

fn permutations<T: Clone>(items: &[T]) -> Vec<Vec<T>> {
    if items.len() <= 1 {
        return vec![items.to_vec()];
    }
    let mut out = Vec::new();
    for index in 0..items.len() {
        let mut rest = items.to_vec();
        let head = rest.remove(index);
        for mut tail in permutations(&rest) {
            tail.insert(0, head.clone());
            out.push(tail);
        }
    }
    out
}

#[test]
fn worked_example_done_failed_then_cancel() {
    init_logging();
    let start = snapshot("b1", &[JobStatus::Pending; 3]);

    let (after_done, outcome) =
        apply_job_update(Some(start), &job_update("b1", "job1", JobStatus::Done));
    assert_eq!(outcome, Outcome::Applied);
    let after_done = after_done.unwrap();
    assert_eq!(after_done.batch.completed, 1);
    assert_eq!(after_done.batch.failed, 0);
    assert!((after_done.batch.progress - 1.0 / 3.0).abs() < 1e-9);

    let mut failed = job_update("b1", "job2", JobStatus::Failed);
    failed.error_message = Some("timeout".to_string());
    let (after_failed, _) = apply_job_update(Some(after_done), &failed);
    let after_failed = after_failed.unwrap();
    assert_eq!(after_failed.batch.completed, 1);
    assert_eq!(after_failed.batch.failed, 1);
    assert!((after_failed.batch.progress - 2.0 / 3.0).abs() < 1e-9);
    assert_eq!(
        after_failed.job("job2").unwrap().error_message.as_deref(),
        Some("timeout")
    );

    let cancel = batch_update("b1", BatchStatus::Cancelled, 1, 1, 3, 66.7);
    let (cancelled, outcome) = apply_batch_update(Some(after_failed), &cancel);
    assert_eq!(outcome, Outcome::Applied);
    let cancelled = cancelled.unwrap();
    assert_eq!(cancelled.batch.status, BatchStatus::Cancelled);
    assert_eq!(cancelled.batch.completed, 1);
    assert_eq!(cancelled.batch.failed, 1);
    assert!((cancelled.batch.progress - 0.667).abs() < 1e-9);
    assert_eq!(
        statuses(&cancelled),
        vec![JobStatus::Done, JobStatus::Failed, JobStatus::Cancelled]
    );
}

#[test]
fn counts_match_terminal_jobs_for_every_arrival_order() {
    init_logging();
    let events = vec![
        job_update("b1", "job1", JobStatus::Transcribing),
        job_update("b1", "job1", JobStatus::Done),
        job_update("b1", "job2", JobStatus::Failed),
        job_update("b1", "job3", JobStatus::Embedding),
        job_update("b1", "job2", JobStatus::Failed),
    ];

    for order in permutations(&events) {
        let result = apply_all(snapshot("b1", &[JobStatus::Queued; 4]), &order);
        let done = result
            .jobs
            .iter()
            .filter(|job| job.status == JobStatus::Done)
            .count() as u32;
        let failed = result
            .jobs
            .iter()
            .filter(|job| job.status == JobStatus::Failed)
            .count() as u32;
        assert_eq!(result.batch.completed, done, "order: {order:?}");
        assert_eq!(result.batch.failed, failed, "order: {order:?}");
        assert!(result.batch.completed + result.batch.failed <= result.batch.total);
    }
}

#[test]
fn applying_the_same_event_twice_equals_applying_it_once() {
    let mut event = job_update("b1", "job2", JobStatus::Chunking);
    event.progress = 65;
    event.current_step = Some("Creating chunks".to_string());

    let once = apply_all(snapshot("b1", &[JobStatus::Pending; 3]), &[event.clone()]);
    let twice = apply_all(
        snapshot("b1", &[JobStatus::Pending; 3]),
        &[event.clone(), event],
    );
    assert_eq!(once, twice);
}

#[test]
fn cancelled_batch_is_never_unwound_by_job_events() {
    let events = vec![
        job_update("b1", "job1", JobStatus::Downloading),
        job_update("b1", "job2", JobStatus::Done),
        job_update("b1", "job3", JobStatus::Pending),
    ];
    for order in permutations(&events) {
        let start = snapshot("b1", &[JobStatus::Transcribing, JobStatus::Done, JobStatus::Queued]);
        let cancel = batch_update("b1", BatchStatus::Cancelled, 1, 0, 3, 33.3);
        let (cancelled, _) = apply_batch_update(Some(start), &cancel);
        let mut current = cancelled.unwrap();

        for event in &order {
            let (next, outcome) = apply_job_update(Some(current), event);
            assert_eq!(outcome, Outcome::Ignored(IgnoreReason::BatchCancelled));
            current = next.unwrap();
        }
        assert!(current
            .jobs
            .iter()
            .all(|job| matches!(job.status, JobStatus::Cancelled | JobStatus::Done)));
    }
}

#[test]
fn cancel_clears_current_step_but_keeps_other_fields() {
    let mut start = snapshot("b1", &[JobStatus::Labeling, JobStatus::Done]);
    start.jobs[0].current_step = Some("Identifying speakers".to_string());
    start.jobs[0].progress = 50;
    start.jobs[1].current_step = Some("Complete".to_string());

    let cancel = batch_update("b1", BatchStatus::Cancelled, 1, 0, 2, 50.0);
    let cancelled = apply_batch_update(Some(start), &cancel).0.unwrap();

    let first = cancelled.job("job1").unwrap();
    assert_eq!(first.status, JobStatus::Cancelled);
    assert_eq!(first.current_step, None);
    assert_eq!(first.progress, 50);
    let second = cancelled.job("job2").unwrap();
    assert_eq!(second.status, JobStatus::Done);
    assert_eq!(second.current_step.as_deref(), Some("Complete"));
}

#[test]
fn unknown_job_leaves_snapshot_unchanged() {
    let mut start = snapshot("b1", &[JobStatus::Done, JobStatus::Pending]);
    // Deliberately stale aggregates: an ignored event must not trigger a recount.
    start.batch.completed = 0;

    let (after, outcome) =
        apply_job_update(Some(start.clone()), &job_update("b1", "ghost", JobStatus::Done));
    assert_eq!(outcome, Outcome::Ignored(IgnoreReason::UnknownJob));
    assert_eq!(after, Some(start));
}

#[test]
fn events_for_other_batches_or_without_snapshot_are_ignored() {
    let start = snapshot("b1", &[JobStatus::Pending]);

    let (after, outcome) =
        apply_job_update(Some(start.clone()), &job_update("b2", "job1", JobStatus::Done));
    assert_eq!(outcome, Outcome::Ignored(IgnoreReason::BatchMismatch));
    assert_eq!(after, Some(start.clone()));

    let other = batch_update("b2", BatchStatus::Cancelled, 0, 0, 1, 0.0);
    let (after, outcome) = apply_batch_update(Some(start.clone()), &other);
    assert_eq!(outcome, Outcome::Ignored(IgnoreReason::BatchMismatch));
    assert_eq!(after, Some(start));

    let (after, outcome) = apply_job_update(None, &job_update("b1", "job1", JobStatus::Done));
    assert_eq!(outcome, Outcome::Ignored(IgnoreReason::NoSnapshot));
    assert_eq!(after, None);
}

#[test]
fn terminal_jobs_are_not_resurrected_by_events() {
    let start = snapshot("b1", &[JobStatus::Failed, JobStatus::Cancelled]);

    let (after, outcome) =
        apply_job_update(Some(start.clone()), &job_update("b1", "job1", JobStatus::Pending));
    assert_eq!(outcome, Outcome::Ignored(IgnoreReason::TerminalJob));
    let (after, _) = apply_job_update(after, &job_update("b1", "job2", JobStatus::Downloading));
    assert_eq!(after, Some(start));
}

#[test]
fn job_fields_are_replaced_last_write_wins() {
    let start = snapshot("b1", &[JobStatus::Downloading]);
    let mut first = job_update("b1", "job1", JobStatus::Transcribing);
    first.progress = 20;
    first.current_step = Some("Transcribing".to_string());
    let mut second = job_update("b1", "job1", JobStatus::Downloading);
    second.progress = 5;
    second.current_step = Some(String::new());

    let result = apply_all(start, &[first, second]);
    let job = result.job("job1").unwrap();
    assert_eq!(job.status, JobStatus::Downloading);
    assert_eq!(job.progress, 5);
    assert_eq!(job.current_step, None);
}

#[test]
fn non_cancel_batch_update_copies_aggregates_and_leaves_jobs() {
    let start = snapshot("b1", &[JobStatus::Pending, JobStatus::Transcribing]);
    let paused = batch_update("b1", BatchStatus::Paused, 0, 1, 2, 50.0);

    let result = apply_batch_update(Some(start.clone()), &paused).0.unwrap();
    assert_eq!(result.batch.status, BatchStatus::Paused);
    assert_eq!(result.batch.failed, 1);
    assert!((result.batch.progress - 0.5).abs() < 1e-9);
    assert_eq!(result.jobs, start.jobs);
}

#[test]
fn empty_batch_has_zero_progress() {
    let start = snapshot("b1", &[]);
    let (after, outcome) = apply_job_update(Some(start), &job_update("b1", "job1", JobStatus::Done));
    assert_eq!(outcome, Outcome::Ignored(IgnoreReason::UnknownJob));
    assert_eq!(after.unwrap().batch.progress, 0.0);
}
