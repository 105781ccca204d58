use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use compose_watch::config::{Project, ServiceConfig};
use compose_watch::errors::{ComposeWatchError, Result};
use compose_watch::exec::{BoxFuture, Rebuilder, Syncer};
use compose_watch::watch::{FileChange, Notify, PathMatcher, PathMapping, WatchStreams, WatcherFactory};
use tokio::sync::mpsc;

/// One recorded `Syncer::sync` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncCall {
    pub service: String,
    pub paths: Vec<PathMapping>,
}

/// A fake syncer that:
/// - records every call (also streamed over a channel)
/// - fails every call when built with [`RecordingSyncer::failing`]
pub struct RecordingSyncer {
    calls: Arc<Mutex<Vec<SyncCall>>>,
    tx: mpsc::UnboundedSender<SyncCall>,
    fail: bool,
}

impl RecordingSyncer {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<SyncCall>) {
        Self::build(false)
    }

    pub fn failing() -> (Arc<Self>, mpsc::UnboundedReceiver<SyncCall>) {
        Self::build(true)
    }

    fn build(fail: bool) -> (Arc<Self>, mpsc::UnboundedReceiver<SyncCall>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let syncer = Self {
            calls: Arc::new(Mutex::new(Vec::new())),
            tx,
            fail,
        };
        (Arc::new(syncer), rx)
    }

    pub fn calls(&self) -> Vec<SyncCall> {
        self.calls.lock().unwrap().clone()
    }
}

impl Syncer for RecordingSyncer {
    fn sync<'a>(
        &'a self,
        service: &'a ServiceConfig,
        paths: &'a [PathMapping],
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let call = SyncCall {
                service: service.name.clone(),
                paths: paths.to_vec(),
            };
            self.calls.lock().unwrap().push(call.clone());
            let _ = self.tx.send(call);
            if self.fail {
                return Err(ComposeWatchError::Other(anyhow::anyhow!("sync failed")));
            }
            Ok(())
        })
    }
}

/// A fake rebuilder recording the services it was asked to rebuild.
pub struct RecordingRebuilder {
    calls: Arc<Mutex<Vec<String>>>,
    tx: mpsc::UnboundedSender<String>,
    fail: bool,
}

impl RecordingRebuilder {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<String>) {
        Self::build(false)
    }

    pub fn failing() -> (Arc<Self>, mpsc::UnboundedReceiver<String>) {
        Self::build(true)
    }

    fn build(fail: bool) -> (Arc<Self>, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let rebuilder = Self {
            calls: Arc::new(Mutex::new(Vec::new())),
            tx,
            fail,
        };
        (Arc::new(rebuilder), rx)
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl Rebuilder for RecordingRebuilder {
    fn rebuild_and_restart<'a>(
        &'a self,
        _project: &'a Project,
        service: &'a str,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            self.calls.lock().unwrap().push(service.to_string());
            let _ = self.tx.send(service.to_string());
            if self.fail {
                return Err(ComposeWatchError::Other(anyhow::anyhow!("image build failed")));
            }
            Ok(())
        })
    }
}

/// Test-side handle of a [`FakeWatcher`]: push changes and errors into the
/// watch loop, and check whether the watcher was closed.
#[derive(Clone)]
pub struct FakeWatcherHandle {
    pub paths: Vec<PathBuf>,
    pub ignore: Arc<dyn PathMatcher>,
    events: mpsc::Sender<FileChange>,
    errors: mpsc::Sender<notify::Error>,
    closed: Arc<AtomicBool>,
}

impl FakeWatcherHandle {
    pub async fn change(&self, path: impl Into<PathBuf>) {
        self.events
            .send(FileChange::new(path))
            .await
            .expect("watch loop stopped reading events");
    }

    pub async fn fail(&self, msg: &str) {
        self.errors
            .send(notify::Error::generic(msg))
            .await
            .expect("watch loop stopped reading errors");
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// Watcher whose changes come from a [`FakeWatcherHandle`].
pub struct FakeWatcher {
    streams: Option<WatchStreams>,
    closed: Arc<AtomicBool>,
    fail_start: bool,
}

impl Notify for FakeWatcher {
    fn start(&mut self) -> Result<WatchStreams> {
        if self.fail_start {
            return Err(notify::Error::generic("cannot start watcher").into());
        }
        self.streams
            .take()
            .ok_or_else(|| ComposeWatchError::config("watcher already started"))
    }

    fn close(&mut self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Factory recording every watcher it creates.
#[derive(Default)]
pub struct FakeWatcherFactory {
    handles: Mutex<Vec<FakeWatcherHandle>>,
    fail_start: bool,
}

impl FakeWatcherFactory {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Every watcher built by this factory fails to start.
    pub fn failing_start() -> Arc<Self> {
        Arc::new(Self {
            handles: Mutex::new(Vec::new()),
            fail_start: true,
        })
    }

    pub fn handles(&self) -> Vec<FakeWatcherHandle> {
        self.handles.lock().unwrap().clone()
    }

    /// Handle of the watcher whose roots include `path`.
    pub fn handle_for(&self, path: impl Into<PathBuf>) -> Option<FakeWatcherHandle> {
        let path = path.into();
        self.handles().into_iter().find(|h| h.paths.contains(&path))
    }

    /// Wait until at least `n` watchers were created.
    pub async fn wait_for_watchers(&self, n: usize) -> Vec<FakeWatcherHandle> {
        loop {
            let handles = self.handles();
            if handles.len() >= n {
                return handles;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }
}

impl WatcherFactory for FakeWatcherFactory {
    fn new_watcher(
        &self,
        paths: Vec<PathBuf>,
        ignore: Arc<dyn PathMatcher>,
    ) -> Result<Box<dyn Notify>> {
        let (events_tx, events_rx) = mpsc::channel(64);
        let (errors_tx, errors_rx) = mpsc::channel(1);
        let closed = Arc::new(AtomicBool::new(false));

        self.handles.lock().unwrap().push(FakeWatcherHandle {
            paths,
            ignore,
            events: events_tx,
            errors: errors_tx,
            closed: Arc::clone(&closed),
        });

        Ok(Box::new(FakeWatcher {
            streams: Some(WatchStreams {
                events: events_rx,
                errors: errors_rx,
            }),
            closed,
            fail_start: self.fail_start,
        }))
    }
}
