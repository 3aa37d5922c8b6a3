use std::time::Duration;

use tokio::sync::watch;
use tokio::time::sleep;
use tracker_engine::StatusPresenter;

const DELAY: Duration = Duration::from_secs(1);

#[tokio::test(start_paused = true)]
async fn brief_drop_is_never_presented() {
    let (raw_tx, raw_rx) = watch::channel(true);
    let presenter = StatusPresenter::spawn(raw_rx, DELAY);
    let presented = presenter.presented();

    raw_tx.send_replace(false);
    sleep(Duration::from_millis(100)).await;
    raw_tx.send_replace(true);
    sleep(Duration::from_secs(5)).await;

    assert!(presenter.current());
    assert!(!presented.has_changed().unwrap());
}

#[tokio::test(start_paused = true)]
async fn stable_change_is_presented_after_the_delay() {
    let (raw_tx, raw_rx) = watch::channel(false);
    let presenter = StatusPresenter::spawn(raw_rx, DELAY);

    raw_tx.send_replace(true);
    sleep(Duration::from_millis(999)).await;
    assert!(!presenter.current());

    sleep(Duration::from_millis(2)).await;
    assert!(presenter.current());
}

#[tokio::test(start_paused = true)]
async fn every_change_restarts_the_delay() {
    let (raw_tx, raw_rx) = watch::channel(true);
    let presenter = StatusPresenter::spawn(raw_rx, DELAY);

    raw_tx.send_replace(false);
    sleep(Duration::from_millis(600)).await;
    raw_tx.send_replace(true);
    sleep(Duration::from_millis(600)).await;
    raw_tx.send_replace(false);
    sleep(Duration::from_millis(600)).await;
    assert!(presenter.current());

    sleep(Duration::from_millis(500)).await;
    assert!(!presenter.current());
}

#[tokio::test(start_paused = true)]
async fn dropping_the_presenter_cancels_the_pending_timer() {
    let (raw_tx, raw_rx) = watch::channel(true);
    let presenter = StatusPresenter::spawn(raw_rx, DELAY);
    let mut presented = presenter.presented();

    raw_tx.send_replace(false);
    sleep(Duration::from_millis(10)).await;
    drop(presenter);
    sleep(Duration::from_secs(5)).await;

    assert!(*presented.borrow());
    assert!(presented.changed().await.is_err());
}
