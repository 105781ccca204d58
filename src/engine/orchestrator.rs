// src/engine/orchestrator.rs

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::{load_development_config, Project, Trigger, VolumeConfig};
use crate::engine::dispatcher::BatchDispatcher;
use crate::engine::service_loop::ServiceWatch;
use crate::errors::{ComposeWatchError, Result};
use crate::exec::{Rebuilder, Syncer};
use crate::fs::{FileSystem, RealFileSystem};
use crate::types::PullPolicy;
use crate::watch::path_utils::is_child;
use crate::watch::{
    service_ignores, CompositeMatcher, NotifyWatcherFactory, PathMatcher, WatcherFactory,
    QUIET_PERIOD,
};

/// Returned when no selected service ends up with anything to watch.
pub const NOTHING_TO_WATCH: &str = "none of the selected services is configured for watch, \
consider setting an 'x-develop' section";

/// What the orchestrator decided to watch for one service.
#[derive(Debug, Clone)]
pub struct ServicePlan {
    pub service: String,
    pub triggers: Vec<Trigger>,
    /// Trigger paths handed to the watcher; bind-mounted ones are left out.
    pub paths: Vec<PathBuf>,
    pub ignore: Arc<CompositeMatcher>,
}

/// Sets up and supervises one watch loop per eligible service.
///
/// Planning happens for every service before any watcher starts, so a
/// configuration error never leaves a half-started session behind. Once
/// running, the first loop to fail cancels all the others and its error is
/// returned.
pub struct WatchOrchestrator {
    fs: Arc<dyn FileSystem>,
    watchers: Arc<dyn WatcherFactory>,
    syncer: Arc<dyn Syncer>,
    rebuilder: Arc<dyn Rebuilder>,
    quiet_period: Duration,
}

impl fmt::Debug for WatchOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchOrchestrator")
            .field("fs", &self.fs)
            .field("quiet_period", &self.quiet_period)
            .finish_non_exhaustive()
    }
}

impl WatchOrchestrator {
    pub fn new(syncer: Arc<dyn Syncer>, rebuilder: Arc<dyn Rebuilder>) -> Self {
        Self {
            fs: Arc::new(RealFileSystem),
            watchers: Arc::new(NotifyWatcherFactory),
            syncer,
            rebuilder,
            quiet_period: QUIET_PERIOD,
        }
    }

    pub fn with_file_system(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.fs = fs;
        self
    }

    pub fn with_watcher_factory(mut self, watchers: Arc<dyn WatcherFactory>) -> Self {
        self.watchers = watchers;
        self
    }

    pub fn with_quiet_period(mut self, quiet_period: Duration) -> Self {
        self.quiet_period = quiet_period;
        self
    }

    /// Decide what to watch, without touching the filesystem watcher.
    ///
    /// Every service that gets a plan also has its pull policy forced to
    /// `build` in `project`, so later rebuilds pick up source changes.
    pub fn plan(&self, project: &mut Project, selected: &[String]) -> Result<Vec<ServicePlan>> {
        let mut plans = Vec::new();

        for name in project.for_services(selected)? {
            let service = project.service(&name)?;
            let Some(config) = load_development_config(self.fs.as_ref(), service, project)? else {
                debug!(service = %name, "no x-develop section; not watching");
                continue;
            };

            let explicitly_selected = selected.iter().any(|s| s == &name);
            let Some(build) = &service.build else {
                if !config.watch.is_empty() || explicitly_selected {
                    return Err(ComposeWatchError::config(format!(
                        "can't watch service {name:?} without a build context"
                    )));
                }
                debug!(service = %name, "no build section; not watching");
                continue;
            };

            // Trigger paths are symlink-resolved; resolve the paths compared
            // against them the same way.
            let context = resolve_host_path(self.fs.as_ref(), &build.context);
            let ignore = Arc::new(service_ignores(self.fs.as_ref(), &context)?);
            let volumes: Vec<VolumeConfig> = service
                .volumes
                .iter()
                .map(|volume| {
                    let mut volume = volume.clone();
                    if let Some(source) = volume.bind_source() {
                        let resolved = resolve_host_path(self.fs.as_ref(), source);
                        volume.source = resolved.to_string_lossy().into_owned();
                    }
                    volume
                })
                .collect();

            let mut triggers = Vec::with_capacity(config.watch.len());
            let mut paths: Vec<PathBuf> = Vec::new();
            for trigger in config.watch {
                if let Some(volume) = bind_mount_covering(&trigger.path, &volumes) {
                    warn!(
                        service = %name,
                        path = ?trigger.path,
                        mount = ?volume.source,
                        "path is already bind-mounted into the container; not watching it"
                    );
                    continue;
                }
                if !paths.contains(&trigger.path) {
                    paths.push(trigger.path.clone());
                }
                triggers.push(trigger);
            }

            project.service_mut(&name)?.pull_policy = PullPolicy::Build;

            if paths.is_empty() {
                warn!(service = %name, "no watchable paths left for service; skipping");
                continue;
            }

            plans.push(ServicePlan {
                service: name,
                triggers,
                paths,
                ignore,
            });
        }

        Ok(plans)
    }

    /// Watch the selected services (all of them when `selected` is empty)
    /// until `cancel` fires or a loop fails.
    pub async fn watch(
        &self,
        cancel: CancellationToken,
        mut project: Project,
        selected: &[String],
    ) -> Result<()> {
        let plans = self.plan(&mut project, selected)?;
        if plans.is_empty() {
            return Err(ComposeWatchError::config(NOTHING_TO_WATCH));
        }
        let project = Arc::new(project);

        let mut started = Vec::with_capacity(plans.len());
        for plan in plans {
            let ignore: Arc<dyn PathMatcher> = plan.ignore.clone();
            let mut watcher = self.watchers.new_watcher(plan.paths.clone(), ignore)?;
            let streams = watcher.start()?;
            println!("watching {:?}", plan.paths);
            started.push((plan, watcher, streams));
        }

        let group = cancel.child_token();
        let mut loops = JoinSet::new();
        for (plan, mut watcher, streams) in started {
            let dispatcher = BatchDispatcher::new(
                Arc::clone(&project),
                plan.service.clone(),
                Arc::clone(&self.syncer),
                Arc::clone(&self.rebuilder),
            );
            let watch = ServiceWatch {
                service: plan.service.clone(),
                triggers: plan.triggers,
                ignore: plan.ignore,
                dispatcher,
                quiet_period: self.quiet_period,
            };
            let group = group.clone();
            let service = plan.service;

            loops.spawn(async move {
                let result = watch.run(&group, streams).await;
                if let Err(err) = watcher.close() {
                    warn!(service = %service, error = %err, "failed to close watcher");
                }
                if let Err(err) = &result {
                    error!(service = %service, error = %err, "watch loop failed");
                }
                result
            });
        }
        info!(services = loops.len(), "watch session started");

        let mut first_error = None;
        while let Some(joined) = loops.join_next().await {
            let result = joined.unwrap_or_else(|err| {
                Err(ComposeWatchError::Other(anyhow::anyhow!(
                    "watch loop task failed: {err}"
                )))
            });
            if let Err(err) = result {
                if first_error.is_none() {
                    group.cancel();
                    first_error = Some(err);
                }
            }
        }

        info!("watch session finished");
        first_error.map_or(Ok(()), Err)
    }
}

/// Symlink-resolved `path`, or `path` itself when it can't be resolved.
fn resolve_host_path(fs: &dyn FileSystem, path: &Path) -> PathBuf {
    match fs.canonicalize(path) {
        Ok(resolved) => resolved,
        Err(err) => {
            debug!(path = ?path, error = %err, "path not resolvable; using it as-is");
            path.to_path_buf()
        }
    }
}

/// The bind mount whose host source contains `path`, if any. Such paths are
/// already live inside the container.
pub fn bind_mount_covering<'a>(
    path: &Path,
    volumes: &'a [VolumeConfig],
) -> Option<&'a VolumeConfig> {
    volumes
        .iter()
        .find(|v| v.bind_source().is_some_and(|source| is_child(source, path)))
}
