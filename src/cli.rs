// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::config::default_config_path;
use crate::types::SyncStrategy;

/// Command-line arguments for `compose-watch`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "compose-watch",
    version,
    about = "Sync or rebuild compose services when their source files change.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the project descriptor (TOML).
    #[arg(short, long, value_name = "PATH", default_value_os_t = default_config_path())]
    pub file: PathBuf,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `COMPOSE_WATCH_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// How changed files are copied into containers.
    ///
    /// If omitted, `COMPOSE_EXPERIMENTAL_WATCH_TAR=0` selects `copy`;
    /// otherwise `archive` is used.
    #[arg(long, value_enum, value_name = "STRATEGY")]
    pub sync_strategy: Option<SyncStrategy>,

    /// Quiet period, in milliseconds, that closes a batch of changes.
    #[arg(long, value_name = "MS", value_parser = clap::value_parser!(u64).range(1..))]
    pub quiet_period_ms: Option<u64>,

    /// Validate the project and print what would be watched, without
    /// starting any watcher.
    #[arg(long)]
    pub dry_run: bool,

    /// Services to watch. Defaults to every service with an `x-develop`
    /// section.
    #[arg(value_name = "SERVICE")]
    pub services: Vec<String>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let args = CliArgs::try_parse_from(["compose-watch"]).unwrap();
        assert_eq!(args.file, default_config_path());
        assert!(args.services.is_empty());
        assert!(args.sync_strategy.is_none());
        assert!(!args.dry_run);
    }

    #[test]
    fn services_and_flags() {
        let args = CliArgs::try_parse_from([
            "compose-watch",
            "--file",
            "dev.toml",
            "--sync-strategy",
            "copy",
            "--quiet-period-ms",
            "200",
            "web",
            "api",
        ])
        .unwrap();
        assert_eq!(args.file, PathBuf::from("dev.toml"));
        assert_eq!(args.sync_strategy, Some(SyncStrategy::Copy));
        assert_eq!(args.quiet_period_ms, Some(200));
        assert_eq!(args.services, vec!["web", "api"]);
    }

    #[test]
    fn zero_quiet_period_is_rejected() {
        let err = CliArgs::try_parse_from(["compose-watch", "--quiet-period-ms", "0"]);
        assert!(err.is_err());
        let args = CliArgs::try_parse_from(["compose-watch", "--quiet-period-ms", "1"]).unwrap();
        assert_eq!(args.quiet_period_ms, Some(1));
    }
}
