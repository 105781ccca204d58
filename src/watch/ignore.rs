// src/watch/ignore.rs

//! Ignore rules for watched paths.
//!
//! Every watched trigger gets one [`CompositeMatcher`] built from:
//! - the service build context's `.dockerignore`,
//! - a fixed `.git` exclusion,
//! - a fixed set of editor temp/swap-file patterns,
//! - the trigger's own `ignore` list (relative to the trigger path).
//!
//! A path is ignored as soon as any constituent matcher reports a match.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::anyhow;
use globset::{Glob, GlobBuilder, GlobMatcher, GlobSet, GlobSetBuilder};
use tracing::debug;

use crate::config::Trigger;
use crate::errors::{ComposeWatchError, Result};
use crate::fs::FileSystem;
use crate::watch::path_utils::{join_container_path, relative_str};

/// Name of the ignore file read from a build context.
pub const DOCKERIGNORE_FILE: &str = ".dockerignore";

/// File-name patterns produced by editors while saving.
const EPHEMERAL_PATTERNS: &[&str] = &[
    // JetBrains safe-write
    "*___jb_old___",
    "*___jb_tmp___",
    // Vim
    "4913",
    "*~",
    ".*.swp",
    ".*.swx",
    // Emacs
    ".#*",
    "#*#",
];

/// A predicate over absolute host paths.
pub trait PathMatcher: Send + Sync + fmt::Debug {
    /// Whether `path` should be ignored.
    fn matches(&self, path: &Path) -> Result<bool>;
}

#[derive(Debug, Clone)]
struct DockerPattern {
    raw: String,
    matcher: GlobMatcher,
    exclusion: bool,
}

impl DockerPattern {
    /// A pattern matches a relative path if it matches the path itself or
    /// any of its parent directories.
    fn matches(&self, rel: &str) -> bool {
        if self.matcher.is_match(rel) {
            return true;
        }
        rel.match_indices('/')
            .any(|(idx, _)| self.matcher.is_match(&rel[..idx]))
    }
}

/// `.dockerignore`-style matcher rooted at a directory.
///
/// Patterns are evaluated in order and the last matching one wins, so
/// `!pattern` re-includes paths excluded by an earlier pattern.
#[derive(Debug, Clone)]
pub struct DockerPatternMatcher {
    root: PathBuf,
    patterns: Vec<DockerPattern>,
}

impl DockerPatternMatcher {
    pub fn new(root: impl Into<PathBuf>, patterns: &[String]) -> Result<Self> {
        let root = root.into();
        let mut compiled = Vec::with_capacity(patterns.len());

        for raw in patterns {
            let mut pattern = raw.trim();
            let exclusion = pattern.starts_with('!');
            if exclusion {
                pattern = pattern[1..].trim();
            }

            let cleaned = join_container_path("", pattern.trim_start_matches('/'));
            if cleaned == "." {
                continue;
            }

            let matcher = GlobBuilder::new(&cleaned)
                .literal_separator(true)
                .build()?
                .compile_matcher();

            compiled.push(DockerPattern {
                raw: raw.clone(),
                matcher,
                exclusion,
            });
        }

        Ok(Self {
            root,
            patterns: compiled,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

impl PathMatcher for DockerPatternMatcher {
    fn matches(&self, path: &Path) -> Result<bool> {
        if !path.is_absolute() {
            return Err(ComposeWatchError::Other(anyhow!(
                "cannot match relative path {:?} against patterns rooted at {:?}",
                path,
                self.root
            )));
        }

        let rel = match relative_str(&self.root, path) {
            Some(rel) if !rel.is_empty() => rel,
            _ => return Ok(false),
        };

        let mut matched = false;
        for pattern in &self.patterns {
            if pattern.matches(&rel) {
                matched = !pattern.exclusion;
                debug!(path = %rel, pattern = %pattern.raw, matched, "ignore pattern hit");
            }
        }
        Ok(matched)
    }
}

/// Matches editor temp and swap files by file name.
#[derive(Debug, Clone)]
pub struct EphemeralPathMatcher {
    set: GlobSet,
}

impl EphemeralPathMatcher {
    pub fn new() -> Result<Self> {
        let mut builder = GlobSetBuilder::new();
        for pattern in EPHEMERAL_PATTERNS {
            builder.add(Glob::new(pattern)?);
        }
        Ok(Self {
            set: builder.build()?,
        })
    }
}

impl PathMatcher for EphemeralPathMatcher {
    fn matches(&self, path: &Path) -> Result<bool> {
        Ok(path
            .file_name()
            .is_some_and(|name| self.set.is_match(Path::new(name))))
    }
}

/// OR-composition of matchers.
///
/// A matcher error does not hide a positive answer from another matcher;
/// it is only returned when no matcher reported a match.
#[derive(Debug, Clone, Default)]
pub struct CompositeMatcher {
    matchers: Vec<Arc<dyn PathMatcher>>,
}

impl CompositeMatcher {
    pub fn new(matchers: Vec<Arc<dyn PathMatcher>>) -> Self {
        Self { matchers }
    }
}

impl PathMatcher for CompositeMatcher {
    fn matches(&self, path: &Path) -> Result<bool> {
        let mut first_err = None;
        for matcher in &self.matchers {
            match matcher.matches(path) {
                Ok(true) => return Ok(true),
                Ok(false) => {}
                Err(err) => {
                    first_err.get_or_insert(err);
                }
            }
        }
        match first_err {
            Some(err) => Err(err),
            None => Ok(false),
        }
    }
}

/// Read `<context>/.dockerignore` into a matcher rooted at `context`.
///
/// A missing file yields an empty matcher.
pub fn load_dockerignore(fs: &dyn FileSystem, context: &Path) -> Result<DockerPatternMatcher> {
    let file = context.join(DOCKERIGNORE_FILE);
    if !fs.exists(&file) {
        return DockerPatternMatcher::new(context, &[]);
    }

    let contents = fs.read_to_string(&file)?;
    let patterns: Vec<String> = contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect();

    debug!(file = ?file, count = patterns.len(), "loaded .dockerignore");
    DockerPatternMatcher::new(context, &patterns)
}

/// Ignore rules shared by every trigger of a service.
pub fn service_ignores(fs: &dyn FileSystem, build_context: &Path) -> Result<CompositeMatcher> {
    let dockerignore = load_dockerignore(fs, build_context)?;
    let dot_git = DockerPatternMatcher::new("/", &["**/.git".to_string()])?;

    Ok(CompositeMatcher::new(vec![
        Arc::new(dockerignore),
        Arc::new(EphemeralPathMatcher::new()?),
        Arc::new(dot_git),
    ]))
}

/// Service rules plus the trigger's own `ignore` list.
pub fn trigger_ignores(
    service: Arc<dyn PathMatcher>,
    trigger: &Trigger,
) -> Result<CompositeMatcher> {
    let own = DockerPatternMatcher::new(&trigger.path, &trigger.ignore)?;
    Ok(CompositeMatcher::new(vec![service, Arc::new(own)]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    fn patterns(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn docker_patterns_match_files_and_directories() {
        let m = DockerPatternMatcher::new("/ctx", &patterns(&["node_modules/", "*.log"])).unwrap();

        assert!(m.matches(Path::new("/ctx/node_modules")).unwrap());
        assert!(m.matches(Path::new("/ctx/node_modules/pkg/index.js")).unwrap());
        assert!(m.matches(Path::new("/ctx/debug.log")).unwrap());
        assert!(!m.matches(Path::new("/ctx/src/debug.log")).unwrap());
        assert!(!m.matches(Path::new("/ctx/src/main.js")).unwrap());
        assert!(!m.matches(Path::new("/elsewhere/debug.log")).unwrap());
    }

    #[test]
    fn exclusions_reinclude_later() {
        let m = DockerPatternMatcher::new("/ctx", &patterns(&["docs", "!docs/keep.md"])).unwrap();

        assert!(m.matches(Path::new("/ctx/docs/a.md")).unwrap());
        assert!(!m.matches(Path::new("/ctx/docs/keep.md")).unwrap());
    }

    #[test]
    fn relative_query_is_an_error() {
        let m = DockerPatternMatcher::new("/ctx", &patterns(&["*"])).unwrap();
        assert!(m.matches(Path::new("ctx/a")).is_err());
    }

    #[test]
    fn ephemeral_files_are_ignored() {
        let m = EphemeralPathMatcher::new().unwrap();
        for path in [
            "/src/.main.rs.swp",
            "/src/main.rs~",
            "/src/4913",
            "/src/.#main.rs",
            "/src/#main.rs#",
            "/src/main.rs___jb_tmp___",
        ] {
            assert!(m.matches(Path::new(path)).unwrap(), "{path} should be ignored");
        }
        assert!(!m.matches(Path::new("/src/main.rs")).unwrap());
    }

    #[test]
    fn composite_is_logical_or() {
        let fs = MockFileSystem::new();
        fs.add_file("/ctx/.dockerignore", "# build output\n\ntarget\n");

        let ignore = service_ignores(&fs, Path::new("/ctx")).unwrap();
        assert!(ignore.matches(Path::new("/ctx/target/debug/app")).unwrap());
        assert!(ignore.matches(Path::new("/ctx/.git/HEAD")).unwrap());
        assert!(ignore.matches(Path::new("/ctx/sub/.git/index")).unwrap());
        assert!(ignore.matches(Path::new("/ctx/src/.lib.rs.swx")).unwrap());
        assert!(!ignore.matches(Path::new("/ctx/src/lib.rs")).unwrap());
    }

    #[test]
    fn composite_error_only_when_nothing_matched() {
        let docker = DockerPatternMatcher::new("/ctx", &patterns(&["*"])).unwrap();
        let composite = CompositeMatcher::new(vec![
            Arc::new(docker),
            Arc::new(EphemeralPathMatcher::new().unwrap()),
        ]);

        // Relative path: docker matcher fails, ephemeral one still answers.
        assert!(composite.matches(Path::new("a~")).unwrap());
        assert!(composite.matches(Path::new("a")).is_err());
    }

    #[test]
    fn missing_dockerignore_is_empty() {
        let fs = MockFileSystem::new();
        let m = load_dockerignore(&fs, Path::new("/ctx")).unwrap();
        assert!(m.is_empty());
    }
}
