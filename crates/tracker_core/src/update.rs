use tracker_logging::{tracker_debug, tracker_info, tracker_warn};

use crate::{Channel, Effect, MonitorState, Msg};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: MonitorState, msg: Msg) -> (MonitorState, Vec<Effect>) {
    let effects = match msg {
        Msg::OpenBatch { batch_id } => {
            if state.batch_id() == Some(batch_id.as_str()) {
                state.begin_reload();
                return (state, vec![Effect::FetchSnapshot { batch_id }]);
            }
            let mut effects: Vec<Effect> =
                state.channels().into_iter().map(Effect::Unsubscribe).collect();
            tracker_info!("opening batch {}", batch_id);
            state.open_batch(batch_id.clone());
            effects.push(Effect::Subscribe(Channel::Batch(batch_id.clone())));
            effects.push(Effect::FetchSnapshot { batch_id });
            effects
        }
        Msg::CloseBatch => {
            let effects = state.channels().into_iter().map(Effect::Unsubscribe).collect();
            state.discard_batch();
            effects
        }
        Msg::SnapshotLoaded(snapshot) => {
            let batch_id = snapshot.id().to_string();
            let jobs = snapshot.jobs.len();
            if state.load_snapshot(snapshot) {
                tracker_info!("snapshot loaded for batch {} ({} jobs)", batch_id, jobs);
            } else {
                tracker_debug!("discarding snapshot for batch {} that is no longer open", batch_id);
            }
            Vec::new()
        }
        Msg::SnapshotFailed { batch_id, message } => {
            tracker_warn!("snapshot fetch for batch {} failed: {}", batch_id, message);
            state.snapshot_failed(&batch_id, message);
            Vec::new()
        }
        Msg::FrameReceived(raw) => {
            state.receive_frame(&raw);
            Vec::new()
        }
        Msg::ConnectionStatusChanged(connected) => {
            let reconnected = state.set_connected(connected);
            // Whatever happened while disconnected is only recoverable from a snapshot.
            match state.batch_id().map(str::to_owned) {
                Some(batch_id) if reconnected => {
                    state.begin_reload();
                    vec![Effect::FetchSnapshot { batch_id }]
                }
                _ => Vec::new(),
            }
        }
        Msg::StreamReconnected => match state.batch_id().map(str::to_owned) {
            // A presented outage resyncs when the presented status recovers.
            Some(batch_id) if state.is_connected() => {
                state.begin_reload();
                vec![Effect::FetchSnapshot { batch_id }]
            }
            _ => Vec::new(),
        },
        Msg::ReconnectStateChanged {
            attempts,
            exhausted,
        } => {
            state.set_reconnect_state(attempts, exhausted);
            Vec::new()
        }
        Msg::ReconnectRequested => vec![Effect::Reconnect],
        Msg::RefreshRequested => match state.batch_id().map(str::to_owned) {
            Some(batch_id) => {
                state.begin_reload();
                vec![Effect::FetchSnapshot { batch_id }]
            }
            None => Vec::new(),
        },
        Msg::ControlRequested(action) => {
            let Some(snapshot) = state.snapshot() else {
                state.record_error(format!("cannot {action}: no batch loaded"));
                return (state, Vec::new());
            };
            if !action.is_allowed(snapshot) {
                let message = format!(
                    "cannot {action} batch with status {}",
                    snapshot.batch.status
                );
                tracker_warn!("{}", message);
                state.record_error(message);
                return (state, Vec::new());
            }
            let batch_id = snapshot.id().to_string();
            state.clear_error();
            vec![Effect::RunControl { batch_id, action }]
        }
        Msg::ControlFinished {
            batch_id,
            action,
            result,
        } => {
            if state.batch_id() != Some(batch_id.as_str()) {
                return (state, Vec::new());
            }
            match result {
                Ok(()) => tracker_info!("{} accepted for batch {}", action, batch_id),
                Err(message) => {
                    tracker_warn!("{} failed for batch {}: {}", action, batch_id, message);
                    state.record_error(format!("{action} failed: {message}"));
                }
            }
            // The stream is not guaranteed to reflect the action soon; resync instead.
            state.begin_reload();
            vec![Effect::FetchSnapshot { batch_id }]
        }
        Msg::WatchJob(job_id) => {
            if state.batch_id().is_some() && state.watch_job(job_id.clone()) {
                vec![Effect::Subscribe(Channel::Job(job_id))]
            } else {
                Vec::new()
            }
        }
        Msg::UnwatchJob(job_id) => {
            if state.unwatch_job(&job_id) {
                vec![Effect::Unsubscribe(Channel::Job(job_id))]
            } else {
                Vec::new()
            }
        }
        Msg::Tick | Msg::NoOp => Vec::new(),
    };

    (state, effects)
}
