// src/watch/debounce.rs

//! Sliding-window batching of file events.
//!
//! Events are collected until no new event has arrived for a full quiet
//! period; the pending set is then flushed as one batch. Repeated equal
//! events collapse into a single entry carrying the time of their latest
//! observation, and a batch is ordered oldest → newest by that time.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::watch::event::FileEvent;

/// Default quiet period before a batch is flushed.
pub const QUIET_PERIOD: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy)]
struct Observation {
    at: Instant,
    /// Tie-breaker for events observed at the same instant.
    seq: u64,
}

/// Distinct pending events and when each was last seen.
#[derive(Debug, Default)]
struct SeenEvents {
    events: HashMap<FileEvent, Observation>,
    next_seq: u64,
}

impl SeenEvents {
    fn observe(&mut self, event: FileEvent) {
        let observation = Observation {
            at: Instant::now(),
            seq: self.next_seq,
        };
        self.next_seq += 1;
        self.events.insert(event, observation);
    }

    fn len(&self) -> usize {
        self.events.len()
    }

    /// Take every pending event, oldest observation first.
    fn flush(&mut self) -> Option<Vec<FileEvent>> {
        if self.events.is_empty() {
            return None;
        }
        let mut pending: Vec<(FileEvent, Observation)> = self.events.drain().collect();
        pending.sort_by_key(|(_, obs)| (obs.at, obs.seq));
        Some(pending.into_iter().map(|(event, _)| event).collect())
    }
}

/// Spawn the debouncer and return the channel batches are written to.
///
/// The returned channel is closed once the debouncer stops, either because
/// `input` was closed or `cancel` fired. In both cases pending events
/// (including ones already buffered in `input`) are flushed as a final batch
/// first.
pub fn batch_debounce_events(
    cancel: CancellationToken,
    delay: Duration,
    mut input: mpsc::Receiver<FileEvent>,
) -> mpsc::Receiver<Vec<FileEvent>> {
    let (out_tx, out_rx) = mpsc::channel::<Vec<FileEvent>>(1);

    tokio::spawn(async move {
        let mut seen = SeenEvents::default();
        let timer = sleep(delay);
        tokio::pin!(timer);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    while let Ok(event) = input.try_recv() {
                        seen.observe(event);
                    }
                    if let Some(batch) = seen.flush() {
                        debug!(count = batch.len(), "flushing pending events on cancellation");
                        let _ = out_tx.send(batch).await;
                    }
                    break;
                }
                () = &mut timer => {
                    timer.as_mut().reset(Instant::now() + delay);
                    if let Some(batch) = seen.flush() {
                        trace!(count = batch.len(), "quiet period elapsed; flushing batch");
                        if out_tx.send(batch).await.is_err() {
                            debug!("batch receiver dropped; stopping debouncer");
                            break;
                        }
                    }
                }
                received = input.recv() => match received {
                    Some(event) => {
                        seen.observe(event);
                        trace!(pending = seen.len(), "event received; restarting quiet period");
                        timer.as_mut().reset(Instant::now() + delay);
                    }
                    None => {
                        if let Some(batch) = seen.flush() {
                            let _ = out_tx.send(batch).await;
                        }
                        break;
                    }
                },
            }
        }
        debug!("debouncer finished");
    });

    out_rx
}
