// src/engine/service_loop.rs

//! The watch pipeline of a single service.
//!
//! ```text
//! watcher ──▶ classify (per trigger) ──▶ debouncer ──▶ batch consumer ──▶ dispatcher
//! ```
//!
//! Each arrow is a bounded channel, so a slow stage pushes back on the
//! previous one. The consumer awaits every dispatch before reading the next
//! batch: one service never runs a sync and a rebuild at the same time.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::config::Trigger;
use crate::engine::dispatcher::BatchDispatcher;
use crate::errors::Result;
use crate::watch::{
    batch_debounce_events, maybe_file_event, trigger_ignores, CompositeMatcher, FileEvent,
    PathMatcher, WatchStreams,
};

/// Everything one service's watch loop needs.
#[derive(Debug)]
pub struct ServiceWatch {
    pub service: String,
    pub triggers: Vec<Trigger>,
    /// Service-wide ignore rules; each trigger adds its own on top.
    pub ignore: Arc<dyn PathMatcher>,
    pub dispatcher: BatchDispatcher,
    pub quiet_period: Duration,
}

impl ServiceWatch {
    /// Run until `parent` is cancelled, the watcher reports an error, or the
    /// watcher's event stream ends.
    ///
    /// Only a watcher error (or failing to build the ignore rules) is
    /// returned; dispatch failures are logged and watching continues.
    pub async fn run(self, parent: &CancellationToken, streams: WatchStreams) -> Result<()> {
        let cancel = parent.child_token();
        let _guard = cancel.clone().drop_guard();

        let ignores = self
            .triggers
            .iter()
            .map(|trigger| trigger_ignores(Arc::clone(&self.ignore), trigger))
            .collect::<Result<Vec<_>>>()?;

        let (event_tx, event_rx) = mpsc::channel::<FileEvent>(1);
        let batches = batch_debounce_events(cancel.clone(), self.quiet_period, event_rx);
        let consumer = tokio::spawn(consume_batches(cancel.clone(), self.dispatcher, batches));

        let result = watch_loop(
            &cancel,
            &self.service,
            &self.triggers,
            &ignores,
            streams,
            event_tx,
        )
        .await;

        cancel.cancel();
        if let Err(err) = consumer.await {
            warn!(service = %self.service, error = %err, "batch consumer task failed");
        }
        debug!(service = %self.service, ok = result.is_ok(), "watch loop finished");
        result
    }
}

async fn watch_loop(
    cancel: &CancellationToken,
    service: &str,
    triggers: &[Trigger],
    ignores: &[CompositeMatcher],
    mut streams: WatchStreams,
    events: mpsc::Sender<FileEvent>,
) -> Result<()> {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return Ok(()),
            Some(err) = streams.errors.recv() => return Err(err.into()),
            change = streams.events.recv() => {
                let Some(change) = change else {
                    debug!(service = %service, "watcher event stream closed");
                    return Ok(());
                };
                let host_path = change.path();
                for (trigger, ignore) in triggers.iter().zip(ignores) {
                    trace!(service = %service, path = ?host_path, trigger = ?trigger.path, "comparing change with trigger");
                    let Some(event) = maybe_file_event(trigger, host_path, ignore) else {
                        continue;
                    };
                    tokio::select! {
                        _ = cancel.cancelled() => return Ok(()),
                        sent = events.send(event) => {
                            if sent.is_err() {
                                debug!(service = %service, "debouncer stopped");
                                return Ok(());
                            }
                        }
                    }
                }
            }
        }
    }
}

async fn consume_batches(
    cancel: CancellationToken,
    dispatcher: BatchDispatcher,
    mut batches: mpsc::Receiver<Vec<FileEvent>>,
) {
    loop {
        let batch = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            batch = batches.recv() => match batch {
                Some(batch) => batch,
                None => break,
            },
        };

        let start = Instant::now();
        debug!(service = %dispatcher.service(), count = batch.len(), "batch start");
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            res = dispatcher.dispatch(&batch) => {
                if let Err(err) = res {
                    warn!(
                        service = %dispatcher.service(),
                        error = %err,
                        "error handling changed files for service"
                    );
                }
            }
        }
        debug!(
            service = %dispatcher.service(),
            duration = ?start.elapsed(),
            count = batch.len(),
            "batch complete"
        );
    }
}
