use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Debounces raw liveness so a fast reconnect never shows as "disconnected".
///
/// Every raw change restarts the delay; the presented value only follows once
/// the raw value has held still for the whole delay. Dropping the presenter
/// cancels the pending timer.
pub struct StatusPresenter {
    presented_rx: watch::Receiver<bool>,
    cancel: CancellationToken,
}

impl StatusPresenter {
    pub fn spawn(raw: watch::Receiver<bool>, delay: Duration) -> Self {
        let initial = *raw.borrow();
        let (presented_tx, presented_rx) = watch::channel(initial);
        let cancel = CancellationToken::new();
        tokio::spawn(debounce(raw, presented_tx, delay, cancel.clone()));
        Self {
            presented_rx,
            cancel,
        }
    }

    pub fn presented(&self) -> watch::Receiver<bool> {
        self.presented_rx.clone()
    }

    pub fn current(&self) -> bool {
        *self.presented_rx.borrow()
    }
}

impl Drop for StatusPresenter {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn debounce(
    mut raw: watch::Receiver<bool>,
    presented: watch::Sender<bool>,
    delay: Duration,
    cancel: CancellationToken,
) {
    let mut pending: Option<(bool, Instant)> = None;
    let mut source_open = true;

    loop {
        if !source_open && pending.is_none() {
            return;
        }
        let deadline = pending.map(|(_, at)| at).unwrap_or_else(Instant::now);

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            changed = raw.changed(), if source_open => {
                if changed.is_err() {
                    source_open = false;
                    continue;
                }
                let value = *raw.borrow_and_update();
                pending = Some((value, Instant::now() + delay));
            }
            _ = tokio::time::sleep_until(deadline), if pending.is_some() => {
                let Some((value, _)) = pending.take() else {
                    continue;
                };
                if *raw.borrow() == value {
                    presented.send_if_modified(|current| {
                        let changed = *current != value;
                        *current = value;
                        changed
                    });
                }
            }
        }
    }
}
