// src/config/validate.rs

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use regex::Regex;

use crate::config::model::{normalize_project_name, Project, RawProject};
use crate::errors::{ComposeWatchError, Result};
use crate::watch::path_utils::clean_path;

/// Prefix every extension key must carry.
const EXTENSION_PREFIX: &str = "x-";

impl RawProject {
    /// Validate the raw descriptor and resolve every relative path.
    ///
    /// `default_working_dir` is used when the descriptor has no
    /// `working_dir`; it is normally the directory containing the file.
    pub fn into_project(self, default_working_dir: &Path) -> Result<Project> {
        validate_raw_project(&self)?;

        let working_dir = match &self.working_dir {
            Some(dir) if dir.is_absolute() => dir.clone(),
            Some(dir) => default_working_dir.join(dir),
            None => default_working_dir.to_path_buf(),
        };
        let working_dir = clean_path(&std::path::absolute(&working_dir)?);

        let name = match &self.name {
            Some(name) => name.clone(),
            None => working_dir
                .file_name()
                .map(|n| normalize_project_name(&n.to_string_lossy()))
                .unwrap_or_default(),
        };
        if name.is_empty() {
            return Err(ComposeWatchError::config(
                "project name is empty; set `name` in the project file",
            ));
        }

        let compose_files = self
            .compose_files
            .iter()
            .map(|f| resolve_host_path(&working_dir, f))
            .collect();

        let mut services = self.services;
        for (name, service) in services.iter_mut() {
            service.name = name.clone();
            if let Some(build) = service.build.as_mut() {
                build.context = resolve_host_path(&working_dir, &build.context);
            }
            for volume in service.volumes.iter_mut() {
                if volume.is_bind() && !volume.source.is_empty() {
                    let source = resolve_host_path(&working_dir, Path::new(&volume.source));
                    volume.source = source.to_string_lossy().into_owned();
                }
            }
        }

        Ok(Project::new_unchecked(
            name,
            working_dir,
            compose_files,
            services,
        ))
    }
}

/// Absolute, lexically cleaned host path; `~` expands to `$HOME`.
fn resolve_host_path(working_dir: &Path, path: &Path) -> PathBuf {
    let expanded = match path.strip_prefix("~") {
        Ok(rest) => match std::env::var_os("HOME") {
            Some(home) => PathBuf::from(home).join(rest),
            None => path.to_path_buf(),
        },
        Err(_) => path.to_path_buf(),
    };

    if expanded.is_absolute() {
        clean_path(&expanded)
    } else {
        clean_path(&working_dir.join(expanded))
    }
}

fn validate_raw_project(cfg: &RawProject) -> Result<()> {
    ensure_has_services(cfg)?;
    validate_service_names(cfg)?;
    validate_extensions(cfg)?;
    validate_service_dependencies(cfg)?;
    validate_dependency_graph(cfg)?;
    Ok(())
}

fn ensure_has_services(cfg: &RawProject) -> Result<()> {
    if cfg.services.is_empty() {
        return Err(ComposeWatchError::config(
            "project must contain at least one [services.<name>] section",
        ));
    }
    Ok(())
}

fn service_name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9][a-zA-Z0-9_.-]*$").expect("service name regex is valid")
    })
}

fn validate_service_names(cfg: &RawProject) -> Result<()> {
    for name in cfg.services.keys() {
        if !service_name_regex().is_match(name) {
            return Err(ComposeWatchError::config(format!(
                "invalid service name '{name}': must match [a-zA-Z0-9][a-zA-Z0-9_.-]*"
            )));
        }
    }
    Ok(())
}

fn validate_extensions(cfg: &RawProject) -> Result<()> {
    for (name, service) in cfg.services.iter() {
        if let Some(key) = service
            .extensions
            .keys()
            .find(|k| !k.starts_with(EXTENSION_PREFIX))
        {
            return Err(ComposeWatchError::config(format!(
                "service '{name}' has unknown field '{key}' (extensions must start with '{EXTENSION_PREFIX}')"
            )));
        }
    }
    Ok(())
}

fn validate_service_dependencies(cfg: &RawProject) -> Result<()> {
    for (name, service) in cfg.services.iter() {
        for dep in service.depends_on.iter() {
            if !cfg.services.contains_key(dep) {
                return Err(ComposeWatchError::config(format!(
                    "service '{}' depends on undefined service '{}'",
                    name, dep
                )));
            }
            if dep == name {
                return Err(ComposeWatchError::config(format!(
                    "service '{}' cannot depend on itself",
                    name
                )));
            }
        }
    }
    Ok(())
}

fn validate_dependency_graph(cfg: &RawProject) -> Result<()> {
    // Edge direction: dependency -> dependent.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for name in cfg.services.keys() {
        graph.add_node(name.as_str());
    }

    for (name, service) in cfg.services.iter() {
        for dep in service.depends_on.iter() {
            graph.add_edge(dep.as_str(), name.as_str(), ());
        }
    }

    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => Err(ComposeWatchError::DependencyCycle(format!(
            "dependency cycle involving service '{}'",
            cycle.node_id()
        ))),
    }
}
