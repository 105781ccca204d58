// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod types;
pub mod watch;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::{load_and_validate, Project};
use crate::engine::{ServicePlan, WatchOrchestrator, NOTHING_TO_WATCH};
use crate::exec::{syncer_for, ComposeRebuilder, DockerCli};
use crate::types::SyncStrategy;

/// Environment switch for the sync strategy when no CLI flag is given.
pub const WATCH_TAR_ENV: &str = "COMPOSE_EXPERIMENTAL_WATCH_TAR";

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - project loading
/// - syncer / rebuilder selection
/// - the watch orchestrator
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let project = load_and_validate(&args.file)?;
    info!(project = %project.name, services = project.services.len(), "project loaded");

    let strategy = resolve_sync_strategy(
        args.sync_strategy,
        std::env::var(WATCH_TAR_ENV).ok().as_deref(),
    );
    debug!(?strategy, "sync strategy selected");

    let docker = DockerCli::default();
    let syncer = syncer_for(strategy, &project.name, docker.clone());
    let rebuilder = Arc::new(ComposeRebuilder::new(docker));

    let mut orchestrator = WatchOrchestrator::new(syncer, rebuilder);
    if let Some(ms) = args.quiet_period_ms {
        orchestrator = orchestrator.with_quiet_period(Duration::from_millis(ms));
    }

    if args.dry_run {
        let mut project = project;
        let plans = orchestrator.plan(&mut project, &args.services)?;
        print_dry_run(&project, &plans, strategy);
        return Ok(());
    }

    // Ctrl-C → graceful shutdown.
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "failed to listen for Ctrl+C");
                return;
            }
            info!("interrupt received; stopping watch session");
            cancel.cancel();
        });
    }

    orchestrator.watch(cancel, project, &args.services).await?;
    Ok(())
}

/// The CLI flag wins; otherwise `COMPOSE_EXPERIMENTAL_WATCH_TAR` set to a
/// false value selects `docker cp`. Anything else means archive.
pub fn resolve_sync_strategy(flag: Option<SyncStrategy>, env: Option<&str>) -> SyncStrategy {
    if let Some(strategy) = flag {
        return strategy;
    }
    match env.map(|v| v.trim().to_lowercase()) {
        Some(v) if matches!(v.as_str(), "0" | "false" | "no" | "off") => SyncStrategy::Copy,
        _ => SyncStrategy::Archive,
    }
}

fn print_dry_run(project: &Project, plans: &[ServicePlan], strategy: SyncStrategy) {
    println!("compose-watch dry-run");
    println!("  project = {}", project.name);
    println!("  working_dir = {}", project.working_dir.display());
    println!("  sync_strategy = {strategy:?}");
    println!();

    if plans.is_empty() {
        println!("{NOTHING_TO_WATCH}");
        return;
    }

    println!("services ({}):", plans.len());
    for plan in plans {
        println!("  - {}", plan.service);
        println!("      watch: {:?}", plan.paths);
        for trigger in &plan.triggers {
            print!("      {} {}", trigger.action, trigger.path.display());
            if let Some(target) = trigger.target.as_deref().filter(|t| !t.is_empty()) {
                print!(" -> {target}");
            }
            println!();
            if !trigger.ignore.is_empty() {
                println!("        ignore: {:?}", trigger.ignore);
            }
        }
    }

    debug!("dry-run complete (no watcher started)");
}
