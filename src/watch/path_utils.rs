// src/watch/path_utils.rs

//! Utility functions for path handling in the watcher.

use std::path::{Component, Path, PathBuf};

/// Lexically clean a path: drop `.` components, fold `..` into the previous
/// component, and never climb above the root of an absolute path.
///
/// An empty result becomes `"."`.
pub fn clean_path(path: &Path) -> PathBuf {
    let mut out: Vec<Component<'_>> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.last() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(component),
            },
            other => out.push(other),
        }
    }

    if out.is_empty() {
        return PathBuf::from(".");
    }
    out.iter().collect()
}

/// True if `child` is `parent` itself or lies below it.
///
/// Comparison is per path component, so `/a/bc` is not a child of `/a/b`.
pub fn is_child(parent: &Path, child: &Path) -> bool {
    child.starts_with(parent)
}

/// Convert a path into a string relative to `root`, with forward slashes.
///
/// Returns `None` if `path` is not below `root`. `path == root` yields `""`.
pub fn relative_str(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = rel
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    Some(parts.join("/"))
}

/// Join a forward-slash relative path onto a container directory and clean
/// the result with POSIX semantics, whatever the host's separator is.
pub fn join_container_path(target: &str, rel: &str) -> String {
    let absolute = target.starts_with('/');
    let mut parts: Vec<&str> = Vec::new();
    for part in target.split('/').chain(rel.split('/')) {
        match part {
            "" | "." => {}
            ".." => {
                if matches!(parts.last(), Some(last) if *last != "..") {
                    parts.pop();
                } else if !absolute {
                    parts.push("..");
                }
            }
            other => parts.push(other),
        }
    }

    let joined = parts.join("/");
    match (absolute, joined.is_empty()) {
        (true, _) => format!("/{joined}"),
        (false, true) => ".".to_string(),
        (false, false) => joined,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_path_folds_dots() {
        assert_eq!(clean_path(Path::new("/a/./b/../c/")), PathBuf::from("/a/c"));
        assert_eq!(clean_path(Path::new("/../a")), PathBuf::from("/a"));
        assert_eq!(clean_path(Path::new("a/../..")), PathBuf::from(".."));
        assert_eq!(clean_path(Path::new("")), PathBuf::from("."));
    }

    #[test]
    fn is_child_uses_components() {
        assert!(is_child(Path::new("/a/b"), Path::new("/a/b")));
        assert!(is_child(Path::new("/a/b"), Path::new("/a/b/c")));
        assert!(!is_child(Path::new("/a/b"), Path::new("/a/bc")));
        assert!(!is_child(Path::new("/a/x"), Path::new("/a/b/c")));
    }

    #[test]
    fn relative_str_uses_forward_slashes() {
        assert_eq!(
            relative_str(Path::new("/src"), Path::new("/src/pkg/file.go")).as_deref(),
            Some("pkg/file.go")
        );
        assert_eq!(relative_str(Path::new("/src"), Path::new("/src")).as_deref(), Some(""));
        assert_eq!(relative_str(Path::new("/src"), Path::new("/other")), None);
    }

    #[test]
    fn join_container_path_is_posix() {
        assert_eq!(join_container_path("/app", "pkg/file.go"), "/app/pkg/file.go");
        assert_eq!(join_container_path("/app/", ""), "/app");
        assert_eq!(join_container_path("/app", "../etc"), "/etc");
        assert_eq!(join_container_path("/", "x"), "/x");
        assert_eq!(join_container_path("app", "x"), "app/x");
    }
}
