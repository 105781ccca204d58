// src/config/develop.rs

//! The `x-develop` service extension: watch triggers.

use std::path::PathBuf;

use serde::Deserialize;
use tracing::debug;

use crate::config::model::{Project, ServiceConfig};
use crate::errors::{ComposeWatchError, Result};
use crate::fs::FileSystem;
use crate::types::WatchAction;
use crate::watch::path_utils::clean_path;

/// Extension key holding the watch configuration of a service.
pub const DEVELOP_EXTENSION: &str = "x-develop";

/// Decoded `x-develop` block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DevelopmentConfig {
    #[serde(default)]
    pub watch: Vec<Trigger>,
}

/// One watch rule.
///
/// After [`load_development_config`] the `path` is absolute, cleaned, and
/// symlink-resolved when the path existed.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Trigger {
    #[serde(default)]
    pub path: PathBuf,
    pub action: WatchAction,
    /// Directory inside the container that `path` maps onto.
    #[serde(default)]
    pub target: Option<String>,
    /// Ignore patterns, relative to `path`.
    #[serde(default)]
    pub ignore: Vec<String>,
}

/// Resolve the watch triggers of `service`.
///
/// Returns `Ok(None)` when the service has no `x-develop` block.
pub fn load_development_config(
    fs: &dyn FileSystem,
    service: &ServiceConfig,
    project: &Project,
) -> Result<Option<DevelopmentConfig>> {
    let Some(raw) = service.extensions.get(DEVELOP_EXTENSION) else {
        return Ok(None);
    };

    let mut config: DevelopmentConfig =
        raw.clone()
            .try_into()
            .map_err(|source| ComposeWatchError::DevelopDecode {
                service: service.name.clone(),
                source,
            })?;

    let base_dir = fs
        .canonicalize(&project.working_dir)
        .map_err(|source| ComposeWatchError::WorkingDir {
            path: project.working_dir.clone(),
            source,
        })?;

    for trigger in config.watch.iter_mut() {
        if trigger.path.as_os_str().is_empty() {
            return Err(ComposeWatchError::config(format!(
                "service {}: watch rules MUST define a path",
                service.name
            )));
        }

        if !trigger.path.is_absolute() {
            trigger.path = base_dir.join(&trigger.path);
        }

        // The path may not exist yet; keep it unresolved in that case.
        match fs.canonicalize(&trigger.path) {
            Ok(resolved) => trigger.path = resolved,
            Err(err) => debug!(
                service = %service.name,
                path = ?trigger.path,
                error = %err,
                "watch path not resolvable; using it as-is"
            ),
        }
        trigger.path = clean_path(&trigger.path);

        if trigger.action == WatchAction::Rebuild && service.build.is_none() {
            return Err(ComposeWatchError::config(format!(
                "service {} doesn't have a build section, can't apply 'rebuild' on watch",
                service.name
            )));
        }
    }

    Ok(Some(config))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::path::Path;

    use super::*;
    use crate::config::model::BuildConfig;
    use crate::fs::mock::MockFileSystem;

    fn project(working_dir: &str) -> Project {
        Project::new_unchecked(
            "demo".to_string(),
            PathBuf::from(working_dir),
            Vec::new(),
            BTreeMap::new(),
        )
    }

    fn service(develop: &str, with_build: bool) -> ServiceConfig {
        let mut svc = ServiceConfig {
            name: "web".to_string(),
            ..Default::default()
        };
        if with_build {
            svc.build = Some(BuildConfig {
                context: PathBuf::from("/work"),
                dockerfile: None,
            });
        }
        if !develop.is_empty() {
            let value: toml::Value = toml::from_str(develop).unwrap();
            svc.extensions.insert(DEVELOP_EXTENSION.to_string(), value);
        }
        svc
    }

    #[test]
    fn no_extension_means_no_config() {
        let fs = MockFileSystem::new();
        let cfg = load_development_config(&fs, &service("", true), &project("/work")).unwrap();
        assert!(cfg.is_none());
    }

    #[test]
    fn relative_paths_join_resolved_working_dir() {
        let fs = MockFileSystem::new();
        fs.add_symlink("/link/work", "/real/work");
        fs.add_dir("/real/work/src");

        let svc = service(
            r#"watch = [{ path = "src/../src/", action = "sync", target = "/app" }]"#,
            true,
        );
        let cfg = load_development_config(&fs, &svc, &project("/link/work"))
            .unwrap()
            .unwrap();

        assert_eq!(cfg.watch.len(), 1);
        assert_eq!(cfg.watch[0].path, Path::new("/real/work/src"));
        assert_eq!(cfg.watch[0].target.as_deref(), Some("/app"));
    }

    #[test]
    fn missing_paths_are_kept_unresolved() {
        let fs = MockFileSystem::new();
        fs.add_dir("/work");

        let svc = service(r#"watch = [{ path = "/work/later/./x", action = "sync" }]"#, true);
        let cfg = load_development_config(&fs, &svc, &project("/work"))
            .unwrap()
            .unwrap();
        assert_eq!(cfg.watch[0].path, Path::new("/work/later/x"));
    }

    #[test]
    fn unresolvable_working_dir_is_fatal() {
        let fs = MockFileSystem::new();
        let svc = service(r#"watch = [{ path = "src", action = "sync" }]"#, true);
        let err = load_development_config(&fs, &svc, &project("/nope")).unwrap_err();
        assert!(matches!(err, ComposeWatchError::WorkingDir { .. }));
    }

    #[test]
    fn empty_path_is_rejected() {
        let fs = MockFileSystem::new();
        fs.add_dir("/work");
        let svc = service(r#"watch = [{ action = "sync" }]"#, true);
        let err = load_development_config(&fs, &svc, &project("/work")).unwrap_err();
        assert!(err.to_string().contains("MUST define a path"));
    }

    #[test]
    fn rebuild_without_build_context_is_rejected() {
        let fs = MockFileSystem::new();
        fs.add_dir("/work");
        let svc = service(r#"watch = [{ path = "src", action = "rebuild" }]"#, false);
        let err = load_development_config(&fs, &svc, &project("/work")).unwrap_err();
        assert!(err.to_string().contains("can't apply 'rebuild'"));
    }

    #[test]
    fn malformed_block_is_a_decode_error() {
        let fs = MockFileSystem::new();
        fs.add_dir("/work");
        let svc = service(r#"watch = [{ path = "src", action = "restart" }]"#, true);
        let err = load_development_config(&fs, &svc, &project("/work")).unwrap_err();
        assert!(matches!(err, ComposeWatchError::DevelopDecode { .. }));
    }
}
