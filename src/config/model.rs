// src/config/model.rs

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::errors::{ComposeWatchError, Result};
use crate::types::PullPolicy;

/// Project descriptor as read from a TOML file.
///
/// ```toml
/// name = "shop"
/// compose_files = ["compose.yaml"]
///
/// [services.web]
/// build = "./web"
/// volumes = ["./data:/var/lib/data"]
/// depends_on = ["db"]
///
/// [services.web.x-develop]
/// watch = [
///   { path = "./web/src", action = "sync", target = "/app/src" },
///   { path = "./web/package.json", action = "rebuild" },
/// ]
/// ```
///
/// Relative paths are resolved against `working_dir` (default: the directory
/// holding the descriptor) by [`RawProject::into_project`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawProject {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub working_dir: Option<PathBuf>,

    /// Compose files handed to `docker compose -f` when rebuilding.
    #[serde(default)]
    pub compose_files: Vec<PathBuf>,

    #[serde(default)]
    pub services: BTreeMap<String, ServiceConfig>,
}

/// `[services.<name>]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServiceConfig {
    /// Filled in from the table key once the project is validated.
    #[serde(skip)]
    pub name: String,

    #[serde(default)]
    pub build: Option<BuildConfig>,

    #[serde(default)]
    pub volumes: Vec<VolumeConfig>,

    #[serde(default)]
    pub pull_policy: PullPolicy,

    #[serde(default)]
    pub depends_on: Vec<String>,

    /// `x-*` extension blocks (e.g. `x-develop`). Any other unknown key is
    /// rejected during validation.
    #[serde(flatten)]
    pub extensions: BTreeMap<String, toml::Value>,
}

/// `build` accepts either a bare context path or a table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "RawBuild")]
pub struct BuildConfig {
    pub context: PathBuf,
    pub dockerfile: Option<PathBuf>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawBuild {
    Context(PathBuf),
    Table {
        context: PathBuf,
        #[serde(default)]
        dockerfile: Option<PathBuf>,
    },
}

impl From<RawBuild> for BuildConfig {
    fn from(raw: RawBuild) -> Self {
        match raw {
            RawBuild::Context(context) => BuildConfig {
                context,
                dockerfile: None,
            },
            RawBuild::Table {
                context,
                dockerfile,
            } => BuildConfig {
                context,
                dockerfile,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VolumeType {
    Bind,
    Volume,
    Tmpfs,
}

/// One entry of `volumes`, either `"src:dst[:mode]"` or a table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawVolume")]
pub struct VolumeConfig {
    pub kind: VolumeType,
    /// Host path for binds, volume name for named volumes, empty otherwise.
    pub source: String,
    pub target: String,
    pub read_only: bool,
}

impl VolumeConfig {
    pub fn is_bind(&self) -> bool {
        self.kind == VolumeType::Bind
    }

    /// Host side of a bind mount.
    pub fn bind_source(&self) -> Option<&Path> {
        if self.is_bind() && !self.source.is_empty() {
            Some(Path::new(&self.source))
        } else {
            None
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawVolume {
    Short(String),
    Table {
        #[serde(rename = "type")]
        kind: VolumeType,
        #[serde(default)]
        source: String,
        target: String,
        #[serde(default)]
        read_only: bool,
    },
}

impl TryFrom<RawVolume> for VolumeConfig {
    type Error = ComposeWatchError;

    fn try_from(raw: RawVolume) -> Result<Self> {
        match raw {
            RawVolume::Short(spec) => parse_short_volume(&spec),
            RawVolume::Table {
                kind,
                source,
                target,
                read_only,
            } => Ok(VolumeConfig {
                kind,
                source,
                target,
                read_only,
            }),
        }
    }
}

/// Parse the short volume syntax: `target`, `source:target` or
/// `source:target:mode`.
///
/// A source starting with `.`, `/` or `~` is a bind mount; anything else is
/// a named volume.
fn parse_short_volume(spec: &str) -> Result<VolumeConfig> {
    let parts: Vec<&str> = spec.split(':').collect();
    let (source, target, mode) = match parts.as_slice() {
        [target] => ("", *target, ""),
        [source, target] => (*source, *target, ""),
        [source, target, mode] => (*source, *target, *mode),
        _ => {
            return Err(ComposeWatchError::config(format!(
                "invalid volume specification: {spec}"
            )));
        }
    };

    if target.is_empty() {
        return Err(ComposeWatchError::config(format!(
            "invalid volume specification: {spec} (empty target)"
        )));
    }

    let kind = if source.is_empty() {
        VolumeType::Volume
    } else if source.starts_with('.') || source.starts_with('/') || source.starts_with('~') {
        VolumeType::Bind
    } else {
        VolumeType::Volume
    };

    Ok(VolumeConfig {
        kind,
        source: source.to_string(),
        target: target.to_string(),
        read_only: mode.split(',').any(|m| m == "ro"),
    })
}

/// A validated project with absolute paths.
#[derive(Debug, Clone)]
pub struct Project {
    pub name: String,
    pub working_dir: PathBuf,
    pub compose_files: Vec<PathBuf>,
    pub services: BTreeMap<String, ServiceConfig>,
}

impl Project {
    /// Build a project without running validation.
    ///
    /// Only use this for values you know are valid (e.g. in tests);
    /// [`RawProject::into_project`] is the checked constructor.
    pub fn new_unchecked(
        name: String,
        working_dir: PathBuf,
        compose_files: Vec<PathBuf>,
        services: BTreeMap<String, ServiceConfig>,
    ) -> Self {
        Self {
            name,
            working_dir,
            compose_files,
            services,
        }
    }

    pub fn service(&self, name: &str) -> Result<&ServiceConfig> {
        self.services
            .get(name)
            .ok_or_else(|| ComposeWatchError::ServiceNotFound(name.to_string()))
    }

    pub fn service_mut(&mut self, name: &str) -> Result<&mut ServiceConfig> {
        self.services
            .get_mut(name)
            .ok_or_else(|| ComposeWatchError::ServiceNotFound(name.to_string()))
    }

    /// Names of the services a selection applies to, in project order.
    ///
    /// An empty selection means every service. Otherwise the selected
    /// services plus everything they transitively `depends_on` are returned.
    /// Unknown names are an error.
    pub fn for_services(&self, selected: &[String]) -> Result<Vec<String>> {
        if selected.is_empty() {
            return Ok(self.services.keys().cloned().collect());
        }

        let mut enabled = std::collections::BTreeSet::new();
        let mut stack: Vec<&str> = selected.iter().map(|s| s.as_str()).collect();

        while let Some(name) = stack.pop() {
            let service = self.service(name)?;
            if !enabled.insert(name.to_string()) {
                continue;
            }
            stack.extend(service.depends_on.iter().map(|s| s.as_str()));
        }

        Ok(self
            .services
            .keys()
            .filter(|name| enabled.contains(*name))
            .cloned()
            .collect())
    }
}

/// Normalize a directory name into a compose project name: lowercase, only
/// `[a-z0-9_-]`, leading separators dropped.
pub fn normalize_project_name(raw: &str) -> String {
    let name: String = raw
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '_' || *c == '-')
        .collect();
    name.trim_start_matches(['_', '-']).to_string()
}
