// src/exec/docker.rs

//! Thin async wrapper around the `docker` CLI.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use anyhow::{bail, Context, Result};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct DockerCli {
    binary: PathBuf,
}

impl Default for DockerCli {
    fn default() -> Self {
        Self::new("docker")
    }
}

impl DockerCli {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Run `docker <args>` and return its stdout.
    ///
    /// `stdin`, if given, is streamed into the process. A non-zero exit is an
    /// error carrying the trimmed stderr.
    pub async fn run(
        &self,
        cwd: Option<&Path>,
        args: &[String],
        stdin: Option<Vec<u8>>,
    ) -> Result<String> {
        let rendered = args.join(" ");
        debug!(cmd = %rendered, "running docker");

        let mut cmd = Command::new(&self.binary);
        cmd.args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .stdin(if stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .kill_on_drop(true);
        if let Some(dir) = cwd {
            cmd.current_dir(dir);
        }

        let mut child = cmd
            .spawn()
            .with_context(|| format!("spawning `docker {rendered}`"))?;

        // Feed stdin concurrently so a chatty child can't deadlock on a full
        // stdout pipe.
        let writer = match (stdin, child.stdin.take()) {
            (Some(data), Some(mut pipe)) => Some(tokio::spawn(async move {
                pipe.write_all(&data).await?;
                pipe.shutdown().await
            })),
            _ => None,
        };

        let output = child
            .wait_with_output()
            .await
            .with_context(|| format!("waiting for `docker {rendered}`"))?;

        if let Some(writer) = writer {
            writer
                .await
                .context("stdin writer task failed")?
                .with_context(|| format!("writing stdin of `docker {rendered}`"))?;
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        for line in stderr.lines() {
            debug!(cmd = %rendered, "stderr: {}", line);
        }

        if !output.status.success() {
            bail!(
                "`docker {}` exited with code {}: {}",
                rendered,
                output.status.code().unwrap_or(-1),
                stderr.trim()
            );
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// IDs of the running containers of one service.
    pub async fn containers_for_service(&self, project: &str, service: &str) -> Result<Vec<String>> {
        let args = ["compose", "-p", project, "ps", "-q", service].map(String::from);
        let stdout = self.run(None, &args, None).await?;
        Ok(stdout
            .lines()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .collect())
    }

    /// `docker exec [-i] <container> <cmd...>`.
    pub async fn exec(&self, container: &str, cmd: &[String], stdin: Option<Vec<u8>>) -> Result<()> {
        let mut args = vec!["exec".to_string()];
        if stdin.is_some() {
            args.push("-i".to_string());
        }
        args.push(container.to_string());
        args.extend(cmd.iter().cloned());
        self.run(None, &args, stdin).await.map(|_| ())
    }
}
