// src/fs/mock.rs

use super::FileSystem;
use anyhow::{anyhow, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone)]
pub enum MockEntry {
    File(Vec<u8>),
    Dir,
    /// Resolves to another path on `canonicalize`.
    Symlink(PathBuf),
}

/// In-memory filesystem for tests.
///
/// Paths are stored as given; parents of added files are created implicitly.
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    entries: Arc<Mutex<HashMap<PathBuf, MockEntry>>>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        let path = path.as_ref();
        let mut entries = self.entries.lock().unwrap();
        Self::ensure_parents(&mut entries, path);
        entries.insert(path.to_path_buf(), MockEntry::File(content.into()));
    }

    pub fn add_dir(&self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        let mut entries = self.entries.lock().unwrap();
        Self::ensure_parents(&mut entries, path);
        entries.insert(path.to_path_buf(), MockEntry::Dir);
    }

    pub fn add_symlink(&self, path: impl AsRef<Path>, target: impl Into<PathBuf>) {
        let path = path.as_ref();
        let mut entries = self.entries.lock().unwrap();
        Self::ensure_parents(&mut entries, path);
        entries.insert(path.to_path_buf(), MockEntry::Symlink(target.into()));
    }

    fn ensure_parents(entries: &mut HashMap<PathBuf, MockEntry>, path: &Path) {
        for ancestor in path.ancestors().skip(1) {
            if ancestor.as_os_str().is_empty() {
                break;
            }
            entries
                .entry(ancestor.to_path_buf())
                .or_insert(MockEntry::Dir);
        }
    }
}

impl FileSystem for MockFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String> {
        let entries = self.entries.lock().unwrap();
        match entries.get(path) {
            Some(MockEntry::File(content)) => {
                String::from_utf8(content.clone()).map_err(|e| anyhow!("Invalid UTF-8: {}", e))
            }
            Some(_) => Err(anyhow!("Not a regular file: {:?}", path)),
            None => Err(anyhow!("File not found: {:?}", path)),
        }
    }

    fn exists(&self, path: &Path) -> bool {
        self.entries.lock().unwrap().contains_key(path)
    }

    fn canonicalize(&self, path: &Path) -> Result<PathBuf> {
        let entries = self.entries.lock().unwrap();
        match entries.get(path) {
            Some(MockEntry::Symlink(target)) => Ok(target.clone()),
            Some(_) => Ok(path.to_path_buf()),
            None => Err(anyhow!("No such file or directory: {:?}", path)),
        }
    }
}
