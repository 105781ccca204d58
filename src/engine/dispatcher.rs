// src/engine/dispatcher.rs

//! Applies one debounced batch to a service.

use std::path::Path;
use std::sync::Arc;

use tracing::{error, info, Level};

use crate::config::Project;
use crate::errors::Result;
use crate::exec::{Rebuilder, Syncer};
use crate::types::WatchAction;
use crate::watch::{FileEvent, PathMapping};

/// Above this many paths a sync announcement only shows a count, unless
/// debug logging is on.
pub const MAX_PATHS_TO_SHOW: usize = 10;

/// Turns batches for one service into a rebuild or a sync.
pub struct BatchDispatcher {
    project: Arc<Project>,
    service: String,
    syncer: Arc<dyn Syncer>,
    rebuilder: Arc<dyn Rebuilder>,
}

impl std::fmt::Debug for BatchDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchDispatcher")
            .field("service", &self.service)
            .finish_non_exhaustive()
    }
}

impl BatchDispatcher {
    pub fn new(
        project: Arc<Project>,
        service: impl Into<String>,
        syncer: Arc<dyn Syncer>,
        rebuilder: Arc<dyn Rebuilder>,
    ) -> Self {
        Self {
            project,
            service: service.into(),
            syncer,
            rebuilder,
        }
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    /// Apply a batch.
    ///
    /// The first `rebuild` event wins: the service is rebuilt once and the
    /// rest of the batch is dropped, since syncing files into a container
    /// that is about to be replaced is pointless. A failed rebuild is
    /// reported but not returned. Without a rebuild event every path is
    /// synced in one call, and sync errors are returned.
    pub async fn dispatch(&self, batch: &[FileEvent]) -> Result<()> {
        if let Some(event) = batch.iter().find(|e| e.action == WatchAction::Rebuild) {
            println!("{}", rebuild_message(&self.service, event.host_path()));
            if let Err(err) = self
                .rebuilder
                .rebuild_and_restart(&self.project, &self.service)
                .await
            {
                error!(service = %self.service, error = %err, "rebuild failed");
                eprintln!("Application failed to start after update");
            }
            return Ok(());
        }

        let mappings: Vec<PathMapping> = batch.iter().map(|e| e.mapping.clone()).collect();
        let verbose = tracing::enabled!(Level::DEBUG);
        println!("{}", sync_message(&self.service, &mappings, verbose));

        let service = self.project.service(&self.service)?;
        self.syncer.sync(service, &mappings).await?;
        info!(service = %self.service, count = mappings.len(), "files synced");
        Ok(())
    }
}

/// Announcement printed before a rebuild.
pub fn rebuild_message(service: &str, path: &Path) -> String {
    format!(
        "Rebuilding {service} after changes were detected:\n  - {}",
        path.display()
    )
}

/// Announcement printed before a sync: every path for small batches (or
/// when `verbose`), otherwise only a count.
pub fn sync_message(service: &str, mappings: &[PathMapping], verbose: bool) -> String {
    if mappings.len() <= MAX_PATHS_TO_SHOW || verbose {
        let mut msg = format!("Syncing {service} after changes were detected:");
        for mapping in mappings {
            msg.push_str("\n  - ");
            msg.push_str(&mapping.host_path.display().to_string());
        }
        msg
    } else {
        format!(
            "Syncing {service} after {} changes were detected",
            mappings.len()
        )
    }
}
