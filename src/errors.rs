// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ComposeWatchError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("no such service: {0}")]
    ServiceNotFound(String),

    #[error("Cycle detected in service dependencies: {0}")]
    DependencyCycle(String),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("invalid x-develop section for service {service}: {source}")]
    DevelopDecode {
        service: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("resolving symlink for {path:?}: {source}")]
    WorkingDir {
        path: std::path::PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("file watcher error: {0}")]
    Notify(#[from] notify::Error),

    #[error("invalid ignore pattern: {0}")]
    Pattern(#[from] globset::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ComposeWatchError {
    /// Shorthand for a [`ComposeWatchError::ConfigError`].
    pub fn config(msg: impl Into<String>) -> Self {
        ComposeWatchError::ConfigError(msg.into())
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, ComposeWatchError>;
