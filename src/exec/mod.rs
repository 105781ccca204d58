// src/exec/mod.rs

//! Container-side collaborators.
//!
//! The watch engine talks to a [`Syncer`] and a [`Rebuilder`] instead of
//! running commands itself. This makes it easy to swap in recording fakes in
//! tests while keeping the production implementations here:
//!
//! - [`docker`] wraps the `docker` CLI via `tokio::process::Command`.
//! - [`sync`] provides the archive-based and copy-based syncers.
//! - [`rebuild`] rebuilds and recreates a single service.

use std::future::Future;
use std::pin::Pin;

use crate::config::{Project, ServiceConfig};
use crate::errors::Result;
use crate::watch::PathMapping;

pub mod docker;
pub mod rebuild;
pub mod sync;

pub use docker::DockerCli;
pub use rebuild::{compose_up_args, ComposeRebuilder};
pub use sync::{syncer_for, ArchiveSyncer, CopySyncer};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Copies changed host files into the containers of a service.
pub trait Syncer: Send + Sync {
    fn sync<'a>(
        &'a self,
        service: &'a ServiceConfig,
        paths: &'a [PathMapping],
    ) -> BoxFuture<'a, Result<()>>;
}

/// Rebuilds one service's image and restarts it, leaving other services
/// untouched.
pub trait Rebuilder: Send + Sync {
    fn rebuild_and_restart<'a>(
        &'a self,
        project: &'a Project,
        service: &'a str,
    ) -> BoxFuture<'a, Result<()>>;
}
