use std::path::{Path, PathBuf};

use compose_watch::config::{
    BuildConfig, Project, RawProject, ServiceConfig, VolumeConfig, VolumeType, DEVELOP_EXTENSION,
};
use compose_watch::types::WatchAction;

/// Builder for `Project` to simplify test setup.
///
/// Paths go through the same resolution as a loaded descriptor, so relative
/// build contexts and bind sources end up under `working_dir`.
pub struct ProjectBuilder {
    working_dir: PathBuf,
    project: RawProject,
}

impl ProjectBuilder {
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: working_dir.into(),
            project: RawProject::default(),
        }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.project.name = Some(name.to_string());
        self
    }

    pub fn with_service(mut self, name: &str, service: ServiceConfig) -> Self {
        self.project.services.insert(name.to_string(), service);
        self
    }

    pub fn build(self) -> Project {
        self.project
            .into_project(&self.working_dir)
            .expect("Failed to build valid project from builder")
    }
}

/// Builder for `ServiceConfig`.
pub struct ServiceBuilder {
    service: ServiceConfig,
    triggers: Option<Vec<toml::Value>>,
}

impl ServiceBuilder {
    pub fn new() -> Self {
        Self {
            service: ServiceConfig::default(),
            triggers: None,
        }
    }

    pub fn build_context(mut self, context: impl AsRef<Path>) -> Self {
        self.service.build = Some(BuildConfig {
            context: context.as_ref().to_path_buf(),
            dockerfile: None,
        });
        self
    }

    pub fn bind(mut self, source: &str, target: &str) -> Self {
        self.service.volumes.push(VolumeConfig {
            kind: VolumeType::Bind,
            source: source.to_string(),
            target: target.to_string(),
            read_only: false,
        });
        self
    }

    pub fn depends_on(mut self, service: &str) -> Self {
        self.service.depends_on.push(service.to_string());
        self
    }

    /// Add an `x-develop` section with no triggers yet.
    pub fn develop(mut self) -> Self {
        self.triggers.get_or_insert_with(Vec::new);
        self
    }

    pub fn sync(self, path: &str, target: &str) -> Self {
        self.trigger(path, WatchAction::Sync, Some(target), &[])
    }

    pub fn rebuild(self, path: &str) -> Self {
        self.trigger(path, WatchAction::Rebuild, None, &[])
    }

    pub fn trigger(
        mut self,
        path: &str,
        action: WatchAction,
        target: Option<&str>,
        ignore: &[&str],
    ) -> Self {
        let mut table = toml::Table::new();
        table.insert("path".into(), toml::Value::String(path.to_string()));
        table.insert("action".into(), toml::Value::String(action.to_string()));
        if let Some(target) = target {
            table.insert("target".into(), toml::Value::String(target.to_string()));
        }
        if !ignore.is_empty() {
            table.insert(
                "ignore".into(),
                toml::Value::Array(
                    ignore
                        .iter()
                        .map(|p| toml::Value::String(p.to_string()))
                        .collect(),
                ),
            );
        }
        self.triggers
            .get_or_insert_with(Vec::new)
            .push(toml::Value::Table(table));
        self
    }

    pub fn build(mut self) -> ServiceConfig {
        if let Some(triggers) = self.triggers {
            let mut develop = toml::Table::new();
            develop.insert("watch".into(), toml::Value::Array(triggers));
            self.service
                .extensions
                .insert(DEVELOP_EXTENSION.to_string(), toml::Value::Table(develop));
        }
        self.service
    }
}

impl Default for ServiceBuilder {
    fn default() -> Self {
        Self::new()
    }
}
