// src/watch/watcher.rs

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::anyhow;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::errors::{ComposeWatchError, Result};
use crate::watch::ignore::PathMatcher;
use crate::watch::path_utils::is_child;

/// Capacity of the raw change channel between the OS backend and a watch
/// loop. The backend thread blocks once it is full.
const EVENT_BUFFER: usize = 64;

/// A raw change reported by the filesystem backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChange {
    path: PathBuf,
}

impl FileChange {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Streams handed out by a started watcher.
#[derive(Debug)]
pub struct WatchStreams {
    pub events: mpsc::Receiver<FileChange>,
    pub errors: mpsc::Receiver<notify::Error>,
}

/// A filesystem watcher over a fixed set of root paths.
pub trait Notify: Send {
    /// Begin watching. May only be called once.
    fn start(&mut self) -> Result<WatchStreams>;

    /// Stop watching and release OS resources.
    fn close(&mut self) -> Result<()>;
}

/// Builds watchers for the orchestrator.
pub trait WatcherFactory: Send + Sync {
    fn new_watcher(
        &self,
        paths: Vec<PathBuf>,
        ignore: Arc<dyn PathMatcher>,
    ) -> Result<Box<dyn Notify>>;
}

/// [`WatcherFactory`] producing [`NotifyWatcher`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct NotifyWatcherFactory;

impl WatcherFactory for NotifyWatcherFactory {
    fn new_watcher(
        &self,
        paths: Vec<PathBuf>,
        ignore: Arc<dyn PathMatcher>,
    ) -> Result<Box<dyn Notify>> {
        Ok(Box::new(NotifyWatcher::new(paths, ignore)))
    }
}

/// Watcher backed by `notify`'s recommended OS backend.
///
/// Changes outside the root paths and changes matched by `ignore` are
/// dropped before they reach the channel.
pub struct NotifyWatcher {
    paths: Vec<PathBuf>,
    ignore: Arc<dyn PathMatcher>,
    inner: Option<RecommendedWatcher>,
}

impl std::fmt::Debug for NotifyWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotifyWatcher")
            .field("paths", &self.paths)
            .field("started", &self.inner.is_some())
            .finish_non_exhaustive()
    }
}

impl NotifyWatcher {
    pub fn new(paths: Vec<PathBuf>, ignore: Arc<dyn PathMatcher>) -> Self {
        Self {
            paths,
            ignore,
            inner: None,
        }
    }
}

impl Notify for NotifyWatcher {
    fn start(&mut self) -> Result<WatchStreams> {
        if self.inner.is_some() {
            return Err(ComposeWatchError::Other(anyhow!("watcher already started")));
        }

        let (event_tx, event_rx) = mpsc::channel::<FileChange>(EVENT_BUFFER);
        let (error_tx, error_rx) = mpsc::channel::<notify::Error>(1);

        let roots = self.paths.clone();
        let ignore = Arc::clone(&self.ignore);

        // Runs on the backend's own thread, so blocking sends are fine.
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if matches!(event.kind, EventKind::Access(_)) {
                        return;
                    }
                    for path in event.paths {
                        if !roots.iter().any(|root| is_child(root, &path)) {
                            continue;
                        }
                        match ignore.matches(&path) {
                            Ok(true) => continue,
                            Ok(false) => {}
                            Err(err) => {
                                warn!(path = ?path, error = %err, "error matching ignore rules");
                            }
                        }
                        if event_tx.blocking_send(FileChange::new(path)).is_err() {
                            return;
                        }
                    }
                }
                Err(err) => {
                    let _ = error_tx.blocking_send(err);
                }
            },
            Config::default(),
        )?;

        for path in &self.paths {
            let (root, mode) = watch_target(path);
            debug!(path = ?path, root = ?root, ?mode, "registering watch");
            watcher.watch(&root, mode)?;
        }

        info!(paths = ?self.paths, "file watcher started");
        self.inner = Some(watcher);

        Ok(WatchStreams {
            events: event_rx,
            errors: error_rx,
        })
    }

    fn close(&mut self) -> Result<()> {
        if self.inner.take().is_some() {
            debug!(paths = ?self.paths, "file watcher closed");
        }
        Ok(())
    }
}

/// Where to register a watch for `path`.
///
/// Existing paths are watched recursively. For a path that does not exist
/// yet, the nearest existing ancestor is watched recursively instead, so
/// files written below the path after it appears are still reported; the
/// root filter in the callback drops everything else. The filesystem root
/// itself is only watched non-recursively.
fn watch_target(path: &Path) -> (PathBuf, RecursiveMode) {
    if path.exists() {
        return (path.to_path_buf(), RecursiveMode::Recursive);
    }
    match path.ancestors().skip(1).find(|p| p.exists()) {
        Some(ancestor) if ancestor.parent().is_some() => {
            (ancestor.to_path_buf(), RecursiveMode::Recursive)
        }
        Some(root) => (root.to_path_buf(), RecursiveMode::NonRecursive),
        None => (PathBuf::from("/"), RecursiveMode::NonRecursive),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn existing_paths_are_watched_recursively() {
        let dir = tempfile::tempdir().unwrap();
        let (root, mode) = watch_target(dir.path());
        assert_eq!(root, dir.path());
        assert_eq!(mode, RecursiveMode::Recursive);
    }

    #[test]
    fn missing_paths_watch_nearest_ancestor() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("not/yet/here");
        let (root, mode) = watch_target(&missing);
        assert_eq!(root, dir.path());
        assert_eq!(mode, RecursiveMode::Recursive);
    }

    #[tokio::test]
    async fn files_inside_a_path_created_later_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        let root = std::fs::canonicalize(dir.path()).unwrap();
        let generated = root.join("gen");

        let mut watcher = NotifyWatcher::new(
            vec![generated.clone()],
            Arc::new(crate::watch::ignore::CompositeMatcher::default()),
        );
        let mut streams = watcher.start().unwrap();

        std::fs::write(root.join("outside.txt"), "x").unwrap();
        std::fs::create_dir(&generated).unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(200)).await;
        let file = generated.join("out.js");
        std::fs::write(&file, "console.log(1)").unwrap();

        let seen = tokio::time::timeout(std::time::Duration::from_secs(5), async {
            while let Some(change) = streams.events.recv().await {
                assert!(is_child(&generated, change.path()), "{:?}", change.path());
                if change.path() == file.as_path() {
                    return true;
                }
            }
            false
        })
        .await
        .unwrap_or(false);

        drop(streams);
        watcher.close().unwrap();
        assert!(seen, "no event for a file written under the new directory");
    }
}
