use std::fmt;

use serde::Deserialize;

/// What a watch trigger does with a change under its path.
///
/// - `Sync`: copy the changed file into the running container.
/// - `Rebuild`: rebuild the service image and recreate its container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WatchAction {
    Sync,
    Rebuild,
}

impl fmt::Display for WatchAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WatchAction::Sync => f.write_str("sync"),
            WatchAction::Rebuild => f.write_str("rebuild"),
        }
    }
}

/// How changed files are pushed into a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum SyncStrategy {
    /// Stream a tar archive into `tar -x` running inside the container.
    #[default]
    Archive,
    /// One `docker cp` per changed file.
    Copy,
}

/// `pull_policy` of a service.
///
/// The watcher forces `Build` on every watched service so a rebuild action
/// always rebuilds the image instead of pulling it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PullPolicy {
    Always,
    Never,
    #[default]
    Missing,
    Build,
}
