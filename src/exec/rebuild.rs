// src/exec/rebuild.rs

use anyhow::Context;
use tracing::info;

use crate::config::Project;
use crate::errors::Result;
use crate::exec::docker::DockerCli;
use crate::exec::{BoxFuture, Rebuilder};
use crate::types::PullPolicy;

/// Rebuilds and recreates one service with `docker compose up`.
#[derive(Debug, Clone, Default)]
pub struct ComposeRebuilder {
    docker: DockerCli,
}

impl ComposeRebuilder {
    pub fn new(docker: DockerCli) -> Self {
        Self { docker }
    }
}

/// Arguments for `docker compose ... up` restricted to `service`.
///
/// Dependencies are left alone (`--no-deps`); the image is rebuilt when the
/// service's pull policy is `build`.
pub fn compose_up_args(project: &Project, service: &str) -> Result<Vec<String>> {
    let svc = project.service(service)?;

    let mut args = vec![
        "compose".to_string(),
        "-p".to_string(),
        project.name.clone(),
    ];
    for file in &project.compose_files {
        args.push("-f".to_string());
        args.push(file.to_string_lossy().into_owned());
    }
    args.extend(["up", "--detach", "--no-deps"].map(String::from));
    if svc.pull_policy == PullPolicy::Build {
        args.push("--build".to_string());
    }
    args.push(service.to_string());
    Ok(args)
}

impl Rebuilder for ComposeRebuilder {
    fn rebuild_and_restart<'a>(
        &'a self,
        project: &'a Project,
        service: &'a str,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let args = compose_up_args(project, service)?;
            info!(service = %service, cmd = %args.join(" "), "rebuilding service");
            self.docker
                .run(Some(&project.working_dir), &args, None)
                .await
                .with_context(|| format!("rebuilding service {service}"))?;
            Ok(())
        })
    }
}
