// src/exec/sync.rs

//! Strategies for pushing changed files into running containers.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result as AnyResult};
use tracing::{debug, info, warn};

use crate::config::ServiceConfig;
use crate::errors::Result;
use crate::exec::docker::DockerCli;
use crate::exec::{BoxFuture, Syncer};
use crate::types::SyncStrategy;
use crate::watch::PathMapping;

/// A mapping with a resolved container path.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Transfer {
    host_path: PathBuf,
    container_path: String,
}

/// Changed paths split by what has to happen inside the container.
#[derive(Debug, Default, PartialEq, Eq)]
struct SyncPlan {
    copy: Vec<Transfer>,
    delete: Vec<String>,
}

/// Existing host paths are copied, missing ones deleted in the container.
/// Mappings without a container path can't be synced and are skipped.
fn plan_sync(service: &str, paths: &[PathMapping]) -> SyncPlan {
    let mut plan = SyncPlan::default();
    for mapping in paths {
        let Some(container_path) = mapping.container_path.clone() else {
            warn!(
                service = %service,
                path = ?mapping.host_path,
                "no target configured for this path; skipping sync"
            );
            continue;
        };
        if mapping.host_path.exists() {
            plan.copy.push(Transfer {
                host_path: mapping.host_path.clone(),
                container_path,
            });
        } else {
            plan.delete.push(container_path);
        }
    }
    plan
}

fn rm_command(paths: &[String]) -> Vec<String> {
    let mut cmd = vec!["rm".to_string(), "-rf".to_string()];
    cmd.extend(paths.iter().cloned());
    cmd
}

/// Pick the syncer for a session.
pub fn syncer_for(strategy: SyncStrategy, project: &str, docker: DockerCli) -> Arc<dyn Syncer> {
    match strategy {
        SyncStrategy::Archive => Arc::new(ArchiveSyncer::new(project, docker)),
        SyncStrategy::Copy => Arc::new(CopySyncer::new(project, docker)),
    }
}

/// Streams one tar archive per container into `tar -x` running inside it.
#[derive(Debug, Clone)]
pub struct ArchiveSyncer {
    project: String,
    docker: DockerCli,
}

impl ArchiveSyncer {
    pub fn new(project: impl Into<String>, docker: DockerCli) -> Self {
        Self {
            project: project.into(),
            docker,
        }
    }

    async fn sync_inner(&self, service: &ServiceConfig, paths: &[PathMapping]) -> AnyResult<()> {
        let plan = plan_sync(&service.name, paths);
        if plan.copy.is_empty() && plan.delete.is_empty() {
            return Ok(());
        }

        let containers = self
            .docker
            .containers_for_service(&self.project, &service.name)
            .await?;
        if containers.is_empty() {
            warn!(service = %service.name, "no running containers to sync into");
            return Ok(());
        }

        let archive = if plan.copy.is_empty() {
            None
        } else {
            let copy = plan.copy.clone();
            Some(
                tokio::task::spawn_blocking(move || build_archive(&copy))
                    .await
                    .context("archive builder task failed")??,
            )
        };

        for container in &containers {
            if !plan.delete.is_empty() {
                self.docker
                    .exec(container, &rm_command(&plan.delete), None)
                    .await
                    .with_context(|| format!("deleting files in container {container}"))?;
            }
            if let Some(archive) = &archive {
                let untar = ["tar", "-x", "-C", "/", "-f", "-"].map(String::from);
                self.docker
                    .exec(container, &untar, Some(archive.clone()))
                    .await
                    .with_context(|| format!("extracting archive in container {container}"))?;
            }
            debug!(
                service = %service.name,
                container = %container,
                copied = plan.copy.len(),
                deleted = plan.delete.len(),
                "container synced"
            );
        }

        info!(service = %service.name, containers = containers.len(), "sync complete");
        Ok(())
    }
}

impl Syncer for ArchiveSyncer {
    fn sync<'a>(
        &'a self,
        service: &'a ServiceConfig,
        paths: &'a [PathMapping],
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move { Ok(self.sync_inner(service, paths).await?) })
    }
}

/// Tar archive with each host path stored under its container path.
fn build_archive(transfers: &[Transfer]) -> AnyResult<Vec<u8>> {
    let mut builder = tar::Builder::new(Vec::new());
    builder.follow_symlinks(false);

    for transfer in transfers {
        let name = transfer.container_path.trim_start_matches('/');
        if transfer.host_path.is_dir() {
            builder
                .append_dir_all(name, &transfer.host_path)
                .with_context(|| format!("archiving directory {:?}", transfer.host_path))?;
        } else {
            builder
                .append_path_with_name(&transfer.host_path, name)
                .with_context(|| format!("archiving file {:?}", transfer.host_path))?;
        }
    }

    builder.into_inner().context("finishing archive")
}

/// One `docker cp` per changed file.
#[derive(Debug, Clone)]
pub struct CopySyncer {
    project: String,
    docker: DockerCli,
}

impl CopySyncer {
    pub fn new(project: impl Into<String>, docker: DockerCli) -> Self {
        Self {
            project: project.into(),
            docker,
        }
    }

    async fn sync_inner(&self, service: &ServiceConfig, paths: &[PathMapping]) -> AnyResult<()> {
        let plan = plan_sync(&service.name, paths);
        if plan.copy.is_empty() && plan.delete.is_empty() {
            return Ok(());
        }

        let containers = self
            .docker
            .containers_for_service(&self.project, &service.name)
            .await?;
        if containers.is_empty() {
            warn!(service = %service.name, "no running containers to sync into");
            return Ok(());
        }

        for container in &containers {
            if !plan.delete.is_empty() {
                self.docker
                    .exec(container, &rm_command(&plan.delete), None)
                    .await
                    .with_context(|| format!("deleting files in container {container}"))?;
            }
            for transfer in &plan.copy {
                if transfer.host_path.is_dir() {
                    let mkdir = vec![
                        "mkdir".to_string(),
                        "-p".to_string(),
                        transfer.container_path.clone(),
                    ];
                    self.docker.exec(container, &mkdir, None).await?;
                    continue;
                }
                let args = vec![
                    "cp".to_string(),
                    transfer.host_path.to_string_lossy().into_owned(),
                    format!("{container}:{}", transfer.container_path),
                ];
                self.docker
                    .run(None, &args, None)
                    .await
                    .with_context(|| format!("copying {:?} into {container}", transfer.host_path))?;
            }
        }

        info!(service = %service.name, containers = containers.len(), "sync complete");
        Ok(())
    }
}

impl Syncer for CopySyncer {
    fn sync<'a>(
        &'a self,
        service: &'a ServiceConfig,
        paths: &'a [PathMapping],
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move { Ok(self.sync_inner(service, paths).await?) })
    }
}

#[cfg(test)]
mod tests {
    use std::io::Read;

    use super::*;

    #[test]
    fn plan_splits_existing_missing_and_untargeted() {
        let dir = tempfile::tempdir().unwrap();
        let present = dir.path().join("main.go");
        std::fs::write(&present, "package main").unwrap();

        let paths = vec![
            PathMapping {
                host_path: present.clone(),
                container_path: Some("/app/main.go".to_string()),
            },
            PathMapping {
                host_path: dir.path().join("gone.go"),
                container_path: Some("/app/gone.go".to_string()),
            },
            PathMapping {
                host_path: dir.path().join("README.md"),
                container_path: None,
            },
        ];

        let plan = plan_sync("web", &paths);
        assert_eq!(
            plan.copy,
            vec![Transfer {
                host_path: present,
                container_path: "/app/main.go".to_string()
            }]
        );
        assert_eq!(plan.delete, vec!["/app/gone.go".to_string()]);
    }

    #[test]
    fn archive_entries_use_container_paths() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("index.js");
        std::fs::write(&file, "console.log(1)").unwrap();

        let bytes = build_archive(&[Transfer {
            host_path: file,
            container_path: "/srv/app/index.js".to_string(),
        }])
        .unwrap();

        let mut archive = tar::Archive::new(bytes.as_slice());
        let mut entries = archive.entries().unwrap();
        let mut entry = entries.next().unwrap().unwrap();
        assert_eq!(
            entry.path().unwrap().to_string_lossy(),
            "srv/app/index.js"
        );
        let mut body = String::new();
        entry.read_to_string(&mut body).unwrap();
        assert_eq!(body, "console.log(1)");
    }

    #[test]
    fn rm_command_lists_every_path() {
        assert_eq!(
            rm_command(&["/a".to_string(), "/b".to_string()]),
            vec!["rm", "-rf", "/a", "/b"]
        );
    }
}
