use std::time::Duration;

use compose_watch::types::WatchAction;
use compose_watch::watch::{batch_debounce_events, FileEvent};
use compose_watch_test_utils::init_tracing;
use tokio::sync::mpsc;
use tokio::time::{sleep, timeout, Instant};
use tokio_util::sync::CancellationToken;

const QUIET: Duration = Duration::from_millis(500);

fn sync(path: &str) -> FileEvent {
    FileEvent::new(WatchAction::Sync, path, Some(format!("/app{path}")))
}

#[tokio::test(start_paused = true)]
async fn burst_collapses_into_one_ordered_batch() {
    init_tracing();
    let (tx, rx) = mpsc::channel(1);
    let mut batches = batch_debounce_events(CancellationToken::new(), QUIET, rx);

    let start = Instant::now();
    tx.send(sync("/a")).await.unwrap();
    sleep(Duration::from_millis(100)).await;
    tx.send(sync("/b")).await.unwrap();
    sleep(Duration::from_millis(100)).await;
    tx.send(sync("/a")).await.unwrap();

    let batch = batches.recv().await.unwrap();
    assert_eq!(batch, vec![sync("/b"), sync("/a")]);
    assert!(start.elapsed() >= Duration::from_millis(700));
}

#[tokio::test(start_paused = true)]
async fn nothing_is_emitted_before_the_quiet_period() {
    let (tx, rx) = mpsc::channel(1);
    let mut batches = batch_debounce_events(CancellationToken::new(), QUIET, rx);

    tx.send(sync("/a")).await.unwrap();
    let early = timeout(Duration::from_millis(400), batches.recv()).await;
    assert!(early.is_err(), "batch flushed before the quiet period elapsed");

    let batch = batches.recv().await.unwrap();
    assert_eq!(batch, vec![sync("/a")]);
}

#[tokio::test(start_paused = true)]
async fn separate_bursts_produce_separate_batches() {
    let (tx, rx) = mpsc::channel(1);
    let mut batches = batch_debounce_events(CancellationToken::new(), QUIET, rx);

    tx.send(sync("/a")).await.unwrap();
    assert_eq!(batches.recv().await.unwrap(), vec![sync("/a")]);

    sleep(Duration::from_secs(2)).await;
    tx.send(sync("/a")).await.unwrap();
    tx.send(sync("/b")).await.unwrap();
    assert_eq!(batches.recv().await.unwrap(), vec![sync("/a"), sync("/b")]);
}

#[tokio::test(start_paused = true)]
async fn same_path_with_different_actions_stays_distinct() {
    let (tx, rx) = mpsc::channel(1);
    let mut batches = batch_debounce_events(CancellationToken::new(), QUIET, rx);

    let rebuild = FileEvent::new(WatchAction::Rebuild, "/a", None);
    tx.send(sync("/a")).await.unwrap();
    tx.send(rebuild.clone()).await.unwrap();

    let batch = batches.recv().await.unwrap();
    assert_eq!(batch, vec![sync("/a"), rebuild]);
}

#[tokio::test(start_paused = true)]
async fn cancellation_flushes_pending_events_and_closes() {
    let cancel = CancellationToken::new();
    let (tx, rx) = mpsc::channel(1);
    let mut batches = batch_debounce_events(cancel.clone(), QUIET, rx);

    tx.send(sync("/a")).await.unwrap();
    cancel.cancel();

    assert_eq!(batches.recv().await.unwrap(), vec![sync("/a")]);
    assert!(batches.recv().await.is_none());
}

#[tokio::test(start_paused = true)]
async fn closing_input_flushes_and_closes() {
    let (tx, rx) = mpsc::channel(1);
    let mut batches = batch_debounce_events(CancellationToken::new(), QUIET, rx);

    tx.send(sync("/a")).await.unwrap();
    drop(tx);

    assert_eq!(batches.recv().await.unwrap(), vec![sync("/a")]);
    assert!(batches.recv().await.is_none());
}

#[tokio::test(start_paused = true)]
async fn idle_debouncer_emits_no_empty_batches() {
    let (_tx, rx) = mpsc::channel::<FileEvent>(1);
    let mut batches = batch_debounce_events(CancellationToken::new(), QUIET, rx);

    let res = timeout(Duration::from_secs(5), batches.recv()).await;
    assert!(res.is_err());
}
