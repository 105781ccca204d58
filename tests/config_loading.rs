use std::fs;
use std::path::{Path, PathBuf};

use compose_watch::config::{load_and_validate, load_development_config, VolumeType};
use compose_watch::errors::ComposeWatchError;
use compose_watch::fs::RealFileSystem;
use compose_watch::types::{PullPolicy, WatchAction};

fn write_descriptor(dir: &Path, contents: &str) -> PathBuf {
    let path = dir.join("compose-watch.toml");
    fs::write(&path, contents).unwrap();
    path
}

const SHOP: &str = r#"
name = "shop"
compose_files = ["compose.yaml"]

[services.web]
build = "./web"
volumes = ["./data:/var/lib/data:ro", "cache:/cache"]
depends_on = ["db"]

[services.web.x-develop]
watch = [
  { path = "./web/src", action = "sync", target = "/app/src", ignore = ["node_modules/"] },
  { path = "./web/package.json", action = "rebuild" },
]

[services.db]
pull_policy = "always"
"#;

#[test]
fn descriptor_paths_resolve_against_its_directory() {
    let dir = tempfile::tempdir().unwrap();
    let root = fs::canonicalize(dir.path()).unwrap();
    let project = load_and_validate(write_descriptor(&root, SHOP)).unwrap();

    assert_eq!(project.name, "shop");
    assert_eq!(project.working_dir, root);
    assert_eq!(project.compose_files, vec![root.join("compose.yaml")]);

    let web = project.service("web").unwrap();
    assert_eq!(web.name, "web");
    assert_eq!(web.build.as_ref().unwrap().context, root.join("web"));
    assert_eq!(web.volumes[0].kind, VolumeType::Bind);
    assert_eq!(web.volumes[0].bind_source(), Some(root.join("data").as_path()));
    assert!(web.volumes[0].read_only);
    assert_eq!(web.volumes[1].kind, VolumeType::Volume);
    assert_eq!(web.volumes[1].bind_source(), None);

    assert_eq!(project.service("db").unwrap().pull_policy, PullPolicy::Always);
}

#[test]
fn develop_triggers_become_absolute_and_resolved() {
    let dir = tempfile::tempdir().unwrap();
    let root = fs::canonicalize(dir.path()).unwrap();
    fs::create_dir_all(root.join("web/src")).unwrap();
    let project = load_and_validate(write_descriptor(&root, SHOP)).unwrap();

    let web = project.service("web").unwrap();
    let config = load_development_config(&RealFileSystem, web, &project)
        .unwrap()
        .unwrap();

    assert_eq!(config.watch.len(), 2);
    assert_eq!(config.watch[0].path, root.join("web/src"));
    assert_eq!(config.watch[0].action, WatchAction::Sync);
    assert_eq!(config.watch[0].target.as_deref(), Some("/app/src"));
    assert_eq!(config.watch[0].ignore, vec!["node_modules/".to_string()]);
    // Missing paths are kept as-is instead of failing.
    assert_eq!(config.watch[1].path, root.join("web/package.json"));
    assert_eq!(config.watch[1].action, WatchAction::Rebuild);

    let db = project.service("db").unwrap();
    assert!(load_development_config(&RealFileSystem, db, &project).unwrap().is_none());
}

#[test]
fn unknown_service_keys_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_descriptor(
        dir.path(),
        r#"
[services.web]
image_name = "nginx"
"#,
    );

    let err = load_and_validate(path).unwrap_err();
    assert!(matches!(err, ComposeWatchError::ConfigError(_)), "{err}");
}

#[test]
fn dependency_cycles_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_descriptor(
        dir.path(),
        r#"
[services.a]
depends_on = ["b"]

[services.b]
depends_on = ["a"]
"#,
    );

    let err = load_and_validate(path).unwrap_err();
    assert!(matches!(err, ComposeWatchError::DependencyCycle(_)), "{err}");
}

#[test]
fn malformed_develop_section_names_the_service() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_descriptor(
        dir.path(),
        r#"
[services.web]
build = "."

[services.web.x-develop]
watch = [{ path = "src", action = "restart" }]
"#,
    );
    let project = load_and_validate(path).unwrap();
    let web = project.service("web").unwrap();

    let err = load_development_config(&RealFileSystem, web, &project).unwrap_err();
    match err {
        ComposeWatchError::DevelopDecode { service, .. } => assert_eq!(service, "web"),
        other => panic!("unexpected error: {other}"),
    }
}
