use std::collections::{BTreeSet, VecDeque};

use tracker_logging::{tracker_debug, tracker_warn};

use crate::dispatch::{Dispatch, Dispatcher, DomainEvent};
use crate::reconcile::Outcome;
use crate::view_model::{BatchRowView, ConnectionView, JobRowView, MonitorViewModel};
use crate::{BatchId, BatchSnapshot, Channel, JobId};

/// Events held while a snapshot for the open batch is in flight.
pub const MAX_PENDING_EVENTS: usize = 512;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct MonitorState {
    batch_id: Option<BatchId>,
    snapshot: Option<BatchSnapshot>,
    loading: bool,
    pending: VecDeque<DomainEvent>,
    dispatcher: Dispatcher,
    connection: ConnectionView,
    ever_connected: bool,
    watched_jobs: BTreeSet<JobId>,
    last_error: Option<String>,
    /// `last_error` came from a snapshot fetch and goes away with the next load.
    stale_snapshot: bool,
    dirty: bool,
}

impl MonitorState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn batch_id(&self) -> Option<&str> {
        self.batch_id.as_deref()
    }

    pub fn snapshot(&self) -> Option<&BatchSnapshot> {
        self.snapshot.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn pending_events(&self) -> usize {
        self.pending.len()
    }

    pub fn decode_failures(&self) -> u64 {
        self.dispatcher.decode_failures()
    }

    pub fn is_connected(&self) -> bool {
        self.connection.connected
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Channels the open view wants, excluding the global feed.
    pub fn channels(&self) -> Vec<Channel> {
        let mut channels = Vec::with_capacity(1 + self.watched_jobs.len());
        if let Some(batch_id) = &self.batch_id {
            channels.push(Channel::Batch(batch_id.clone()));
        }
        channels.extend(self.watched_jobs.iter().cloned().map(Channel::Job));
        channels
    }

    pub fn view(&self) -> MonitorViewModel {
        let batch = self.snapshot.as_ref().map(|snapshot| {
            let batch = &snapshot.batch;
            BatchRowView {
                id: batch.id.clone(),
                name: batch.name.clone(),
                status: batch.status,
                total: batch.total,
                completed: batch.completed,
                failed: batch.failed,
                progress_percent: batch.progress_percent(),
                actual_cost_cents: batch.actual_cost_cents,
                estimated_cost_cents: batch.estimated_cost_cents,
            }
        });
        let jobs = self
            .snapshot
            .iter()
            .flat_map(|snapshot| snapshot.jobs.iter())
            .map(|job| JobRowView {
                job_id: job.id.clone(),
                label: job
                    .episode_title
                    .clone()
                    .unwrap_or_else(|| job.episode_id.clone()),
                status: job.status,
                progress: job.progress,
                current_step: job.current_step.clone(),
                error_message: job.error_message.clone(),
            })
            .collect();

        MonitorViewModel {
            connection: self.connection,
            batch_id: self.batch_id.clone(),
            loading: self.loading,
            batch,
            jobs,
            watched_jobs: self.watched_jobs.iter().cloned().collect(),
            last_error: self.last_error.clone(),
            decode_failures: self.dispatcher.decode_failures(),
            dirty: self.dirty,
        }
    }

    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Starts tracking `batch_id`, discarding whatever was open before.
    pub(crate) fn open_batch(&mut self, batch_id: BatchId) {
        self.discard_batch();
        self.batch_id = Some(batch_id);
        self.loading = true;
        self.mark_dirty();
    }

    pub(crate) fn discard_batch(&mut self) {
        self.batch_id = None;
        self.snapshot = None;
        self.loading = false;
        self.pending.clear();
        self.watched_jobs.clear();
        self.last_error = None;
        self.stale_snapshot = false;
        self.mark_dirty();
    }

    pub(crate) fn begin_reload(&mut self) {
        self.loading = true;
        self.mark_dirty();
    }

    /// Replaces the snapshot wholesale and replays what arrived meanwhile.
    /// Returns `false` for a snapshot of a batch that is no longer open.
    pub(crate) fn load_snapshot(&mut self, snapshot: BatchSnapshot) -> bool {
        if self.batch_id.as_deref() != Some(snapshot.id()) {
            return false;
        }
        self.snapshot = Some(snapshot);
        self.loading = false;
        if std::mem::take(&mut self.stale_snapshot) {
            self.last_error = None;
        }

        let pending = std::mem::take(&mut self.pending);
        if !pending.is_empty() {
            tracker_debug!("replaying {} buffered events onto snapshot", pending.len());
        }
        for event in pending {
            self.reduce(&event);
        }
        self.mark_dirty();
        true
    }

    pub(crate) fn snapshot_failed(&mut self, batch_id: &str, message: String) {
        if self.batch_id.as_deref() != Some(batch_id) {
            return;
        }
        self.loading = false;
        self.pending.clear();
        self.last_error = Some(message);
        self.stale_snapshot = true;
        self.mark_dirty();
    }

    pub(crate) fn receive_frame(&mut self, raw: &str) {
        let event = match self.dispatcher.classify(raw) {
            Dispatch::Event(event) => event,
            Dispatch::Discarded => return,
            Dispatch::Dropped => {
                self.mark_dirty();
                return;
            }
        };

        if self.batch_id.as_deref() != Some(event.batch_id()) {
            return;
        }
        if self.loading {
            self.buffer(event.clone());
        }
        self.reduce(&event);
    }

    fn buffer(&mut self, event: DomainEvent) {
        if self.pending.len() >= MAX_PENDING_EVENTS {
            tracker_warn!(
                "event buffer full ({} events); dropping the oldest",
                MAX_PENDING_EVENTS
            );
            self.pending.pop_front();
        }
        self.pending.push_back(event);
    }

    fn reduce(&mut self, event: &DomainEvent) {
        let (snapshot, outcome) = event.apply(self.snapshot.take());
        self.snapshot = snapshot;
        match outcome {
            Outcome::Applied => self.mark_dirty(),
            Outcome::Ignored(reason) => {
                tracker_debug!("ignored event for batch {}: {:?}", event.batch_id(), reason);
            }
        }
    }

    /// Records the presented status; `true` when this is a reconnect.
    pub(crate) fn set_connected(&mut self, connected: bool) -> bool {
        if self.connection.connected == connected {
            return false;
        }
        let reconnected = connected && self.ever_connected;
        self.connection.connected = connected;
        if connected {
            self.ever_connected = true;
            self.connection.gave_up = false;
        }
        self.mark_dirty();
        reconnected
    }

    pub(crate) fn set_reconnect_state(&mut self, attempts: u32, exhausted: bool) {
        self.connection.reconnect_attempts = attempts;
        self.connection.gave_up = exhausted;
        self.mark_dirty();
    }

    pub(crate) fn record_error(&mut self, message: String) {
        self.last_error = Some(message);
        self.stale_snapshot = false;
        self.mark_dirty();
    }

    pub(crate) fn clear_error(&mut self) {
        self.stale_snapshot = false;
        if self.last_error.take().is_some() {
            self.mark_dirty();
        }
    }

    pub(crate) fn watch_job(&mut self, job_id: JobId) -> bool {
        let added = self.watched_jobs.insert(job_id);
        if added {
            self.mark_dirty();
        }
        added
    }

    pub(crate) fn unwatch_job(&mut self, job_id: &str) -> bool {
        let removed = self.watched_jobs.remove(job_id);
        if removed {
            self.mark_dirty();
        }
        removed
    }
}
