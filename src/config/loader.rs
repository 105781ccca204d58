// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::model::{Project, RawProject};
use crate::errors::Result;

/// Load a project descriptor from a given path and return the raw
/// `RawProject`.
///
/// This only performs TOML deserialization; it does **not** validate or
/// resolve paths. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawProject> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let raw: RawProject = toml::from_str(&contents)?;

    Ok(raw)
}

/// Load a project descriptor and validate it.
///
/// Relative paths inside the file are resolved against its `working_dir`,
/// which defaults to the directory the file lives in.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<Project> {
    let path = path.as_ref();
    let raw = load_from_path(path)?;
    raw.into_project(&descriptor_dir(path))
}

/// Default project descriptor: `compose-watch.toml` in the current directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("compose-watch.toml")
}

/// Directory containing the descriptor.
///
/// A bare filename like `compose-watch.toml` (parent = "") falls back to the
/// current working directory.
fn descriptor_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}
