//! Persistent commit records.
//!
//! Each commit lives in `commits/<hash>` as its text record. The store never
//! deduplicates or collects anything: a record stays until it is removed by
//! hand.

use tracing::debug;

use crate::storage::commit::Commit;
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::meta::MetaStore;
use crate::storage::types::CommitId;

/// Saves and loads commits by hash.
#[derive(Debug, Clone)]
pub struct CommitStore<S> {
    meta: S,
}

impl<S: MetaStore> CommitStore<S> {
    /// directory holding commit records, relative to the metadata root
    pub const DIR: &'static str = "commits";

    pub fn new(meta: S) -> Self {
        Self { meta }
    }

    pub fn meta(&self) -> &S {
        &self.meta
    }

    /// `None` for hashes that cannot name a record file
    fn record_path(id: &CommitId) -> Option<String> {
        let hash = id.as_str();
        let usable = !hash.is_empty()
            && hash != "."
            && hash != ".."
            && !hash.contains(&['/', '\\'][..])
            && !hash.chars().any(char::is_whitespace);
        usable.then(|| format!("{}/{}", Self::DIR, hash))
    }

    /// write a commit record, replacing any record with the same hash
    pub fn save(&self, commit: &Commit) -> StorageResult<()> {
        let path = Self::record_path(commit.hash()).ok_or_else(|| {
            StorageError::Internal(format!("cannot store commit with hash {:?}", commit.hash().as_str()))
        })?;
        self.meta.write(&path, &commit.serialize())?;
        debug!(hash = %commit.hash(), "saved commit");
        Ok(())
    }

    /// read a commit record
    pub fn load(&self, hash: &CommitId) -> StorageResult<Commit> {
        let contents = match Self::record_path(hash) {
            Some(path) => self.meta.read(&path)?,
            None => None,
        };
        let contents = contents.ok_or_else(|| StorageError::CommitNotFound(hash.clone()))?;
        debug!(hash = %hash, "loaded commit");
        Ok(Commit::deserialize(&contents))
    }

    pub fn contains(&self, hash: &CommitId) -> bool {
        Self::record_path(hash)
            .map(|path| self.meta.exists(&path))
            .unwrap_or(false)
    }

    /// hashes of all stored records, sorted
    pub fn list(&self) -> StorageResult<Vec<CommitId>> {
        Ok(self
            .meta
            .list(Self::DIR)?
            .into_iter()
            .filter(|name| !name.contains('/'))
            .map(CommitId::new)
            .collect())
    }
}
