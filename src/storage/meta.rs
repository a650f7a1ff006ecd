//! Access to the metadata directory.
//!
//! Everything the storage layer persists is a small text file addressed by a
//! `/`-separated path relative to the metadata root (`HEAD`, `refs/heads/main`,
//! `commits/<hash>`). [`MetaStore`] is the seam: [`FsMetaDir`] is the real
//! directory, [`MemoryMetaDir`] keeps the same files in memory for tests.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;
use walkdir::WalkDir;

use crate::storage::error::{StorageError, StorageResult};

/// File-level operations on a metadata directory.
pub trait MetaStore {
    /// read a file, `None` when it does not exist
    fn read(&self, rel: &str) -> StorageResult<Option<String>>;

    /// create or overwrite a file, creating parent directories as needed
    fn write(&self, rel: &str, contents: &str) -> StorageResult<()>;

    fn exists(&self, rel: &str) -> bool;

    /// all files below `dir`, as sorted paths relative to `dir`
    fn list(&self, dir: &str) -> StorageResult<Vec<String>>;
}

impl<T: MetaStore + ?Sized> MetaStore for &T {
    fn read(&self, rel: &str) -> StorageResult<Option<String>> {
        (**self).read(rel)
    }

    fn write(&self, rel: &str, contents: &str) -> StorageResult<()> {
        (**self).write(rel, contents)
    }

    fn exists(&self, rel: &str) -> bool {
        (**self).exists(rel)
    }

    fn list(&self, dir: &str) -> StorageResult<Vec<String>> {
        (**self).list(dir)
    }
}

/// reject paths that would leave the metadata root
fn check_relative(rel: &str) -> StorageResult<()> {
    let escapes = rel.is_empty()
        || rel.starts_with('/')
        || rel.split('/').any(|part| part == ".." || part.contains('\\'));
    if escapes {
        return Err(StorageError::Internal(format!(
            "path escapes metadata directory: {:?}",
            rel
        )));
    }
    Ok(())
}

/// A metadata directory on the local filesystem.
#[derive(Debug, Clone)]
pub struct FsMetaDir {
    root: PathBuf,
}

impl FsMetaDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, rel: &str) -> StorageResult<PathBuf> {
        check_relative(rel)?;
        Ok(rel
            .split('/')
            .filter(|part| !part.is_empty() && *part != ".")
            .fold(self.root.clone(), |path, part| path.join(part)))
    }
}

impl MetaStore for FsMetaDir {
    fn read(&self, rel: &str) -> StorageResult<Option<String>> {
        let path = self.resolve(rel)?;
        match fs::read_to_string(&path) {
            Ok(contents) => {
                debug!(path = %path.display(), bytes = contents.len(), "read");
                Ok(Some(contents))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    fn write(&self, rel: &str, contents: &str) -> StorageResult<()> {
        let path = self.resolve(rel)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, contents)?;
        debug!(path = %path.display(), bytes = contents.len(), "wrote");
        Ok(())
    }

    fn exists(&self, rel: &str) -> bool {
        self.resolve(rel).map(|p| p.is_file()).unwrap_or(false)
    }

    fn list(&self, dir: &str) -> StorageResult<Vec<String>> {
        let base = self.resolve(dir)?;
        if !base.is_dir() {
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(&base).min_depth(1) {
            let entry = entry.map_err(|e| match e.into_io_error() {
                Some(io_err) => StorageError::Io(io_err),
                None => StorageError::Internal("filesystem loop under metadata directory".into()),
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            if let Ok(rel) = entry.path().strip_prefix(&base) {
                let parts: Vec<String> = rel
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy().into_owned())
                    .collect();
                files.push(parts.join("/"));
            }
        }
        files.sort();
        Ok(files)
    }
}

/// An in-memory metadata directory.
///
/// Clones share the same files.
#[derive(Debug, Clone, Default)]
pub struct MemoryMetaDir {
    files: Arc<RwLock<BTreeMap<String, String>>>,
}

impl MemoryMetaDir {
    pub fn new() -> Self {
        Self::default()
    }

    /// remove a file, returning whether it existed
    pub fn remove(&self, rel: &str) -> bool {
        self.files.write().remove(rel).is_some()
    }
}

impl MetaStore for MemoryMetaDir {
    fn read(&self, rel: &str) -> StorageResult<Option<String>> {
        check_relative(rel)?;
        Ok(self.files.read().get(rel).cloned())
    }

    fn write(&self, rel: &str, contents: &str) -> StorageResult<()> {
        check_relative(rel)?;
        self.files.write().insert(rel.to_string(), contents.to_string());
        Ok(())
    }

    fn exists(&self, rel: &str) -> bool {
        check_relative(rel).is_ok() && self.files.read().contains_key(rel)
    }

    fn list(&self, dir: &str) -> StorageResult<Vec<String>> {
        check_relative(dir)?;
        let prefix = format!("{}/", dir.trim_end_matches('/'));
        Ok(self
            .files
            .read()
            .keys()
            .filter_map(|key| key.strip_prefix(&prefix).map(str::to_string))
            .collect())
    }
}
