// src/watch/event.rs

//! Classification of raw filesystem changes into per-trigger file events.

use std::path::PathBuf;

use tracing::{debug, warn};

use crate::config::Trigger;
use crate::types::WatchAction;
use crate::watch::ignore::PathMatcher;
use crate::watch::path_utils::{is_child, join_container_path, relative_str};

/// A host path and where it lands inside the container.
///
/// `container_path` is `None` when the trigger has no `target`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathMapping {
    pub host_path: PathBuf,
    pub container_path: Option<String>,
}

/// A classified change. Equal events collapse into one inside a batch.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileEvent {
    pub action: WatchAction,
    pub mapping: PathMapping,
}

impl FileEvent {
    pub fn new(
        action: WatchAction,
        host_path: impl Into<PathBuf>,
        container_path: Option<String>,
    ) -> Self {
        Self {
            action,
            mapping: PathMapping {
                host_path: host_path.into(),
                container_path,
            },
        }
    }

    pub fn host_path(&self) -> &PathBuf {
        &self.mapping.host_path
    }
}

/// Returns a file event if `host_path` is relevant for `trigger` and not
/// ignored.
///
/// Nothing here is fatal: an ignore-matcher error is logged and the path is
/// treated as not ignored, and a path that cannot be made relative to the
/// trigger is logged and dropped.
pub fn maybe_file_event(
    trigger: &Trigger,
    host_path: &std::path::Path,
    ignore: &dyn PathMatcher,
) -> Option<FileEvent> {
    if !is_child(&trigger.path, host_path) {
        return None;
    }

    match ignore.matches(host_path) {
        Ok(true) => {
            debug!(path = ?host_path, "path matches an ignore pattern");
            return None;
        }
        Ok(false) => {}
        Err(err) => {
            warn!(path = ?host_path, error = %err, "error matching ignore rules; not ignoring");
        }
    }

    let container_path = match trigger.target.as_deref() {
        None | Some("") => None,
        Some(target) => match relative_str(&trigger.path, host_path) {
            Some(rel) => Some(join_container_path(target, &rel)),
            None => {
                warn!(
                    path = ?host_path,
                    trigger = ?trigger.path,
                    "error making path relative to trigger"
                );
                return None;
            }
        },
    };

    Some(FileEvent::new(trigger.action, host_path, container_path))
}
