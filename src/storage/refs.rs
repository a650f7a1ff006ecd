//!  HEAD and branch management.
//!
//!  refs are small text files under the metadata root:
//! - `HEAD` is either `ref: refs/heads/<name>\n` (attached to a branch) or a
//!   raw commit hash (detached)
//! - `refs/heads/<name>` holds a commit hash, or nothing for a branch that has
//!   no commits yet
//!
//! Committing moves whatever HEAD points at, so callers never need to know
//! whether HEAD is attached or detached.

use tracing::{debug, info};

use crate::storage::error::{StorageError, StorageResult};
use crate::storage::meta::MetaStore;
use crate::storage::types::{BranchName, CommitId};

/// marker that starts a symbolic HEAD
pub const SYMBOLIC_PREFIX: &str = "ref: ";

/// The parsed content of `HEAD`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Head {
    /// no HEAD file (or an empty one): nothing has been committed
    Missing,
    /// attached to a branch; holds the ref path relative to the metadata root
    Symbolic(String),
    /// holds a commit hash directly
    Detached(CommitId),
}

impl Head {
    pub fn parse(content: &str) -> Self {
        if let Some(target) = content.strip_prefix(SYMBOLIC_PREFIX) {
            return Head::Symbolic(target.trim_end_matches(&['\n', '\r'][..]).to_string());
        }
        match CommitId::parse(content) {
            Some(id) => Head::Detached(id),
            None => Head::Missing,
        }
    }

    /// the branch name HEAD is attached to (last path segment of the ref)
    pub fn branch_name(&self) -> Option<&str> {
        match self {
            Head::Symbolic(path) => path.rsplit('/').next(),
            _ => None,
        }
    }

    pub fn is_detached(&self) -> bool {
        matches!(self, Head::Detached(_))
    }
}

/// Reads and moves HEAD and branches.
#[derive(Debug, Clone)]
pub struct RefManager<S> {
    meta: S,
}

impl<S: MetaStore> RefManager<S> {
    /// name of the HEAD file
    pub const HEAD: &'static str = "HEAD";

    pub fn new(meta: S) -> Self {
        Self { meta }
    }

    /// Read and parse HEAD.
    pub fn head(&self) -> StorageResult<Head> {
        Ok(match self.meta.read(Self::HEAD)? {
            Some(content) => Head::parse(&content),
            None => Head::Missing,
        })
    }

    /// Resolve HEAD to the current commit.
    ///
    /// Returns `None` when there is no HEAD yet or HEAD is attached to a
    /// branch without commits.
    pub fn current_commit(&self) -> StorageResult<Option<CommitId>> {
        match self.head()? {
            Head::Missing => Ok(None),
            Head::Detached(id) => Ok(Some(id)),
            Head::Symbolic(path) => Ok(self
                .meta
                .read(&path)?
                .and_then(|content| CommitId::parse(&content))),
        }
    }

    /// Point the current position at `commit`.
    ///
    /// Attached: the branch moves and HEAD keeps its symbolic content.
    /// Detached or missing: HEAD itself is overwritten with the hash.
    pub fn update_head(&self, commit: &CommitId) -> StorageResult<()> {
        match self.head()? {
            Head::Symbolic(path) => {
                self.meta.write(&path, commit.as_str())?;
                info!(target_ref = %path, commit = %commit.short(), "moved branch");
            }
            Head::Detached(_) | Head::Missing => {
                self.meta.write(Self::HEAD, commit.as_str())?;
                info!(commit = %commit.short(), "moved detached HEAD");
            }
        }
        Ok(())
    }

    /// Create (or overwrite) a branch pointing at `commit`. HEAD is untouched.
    pub fn create_branch(&self, branch: &BranchName, commit: &CommitId) -> StorageResult<()> {
        self.meta.write(&branch.as_ref_path(), commit.as_str())?;
        debug!(branch = %branch, commit = %commit.short(), "wrote branch");
        Ok(())
    }

    /// Name of the branch HEAD is attached to, `None` when detached or missing.
    pub fn current_branch(&self) -> StorageResult<Option<String>> {
        Ok(self.head()?.branch_name().map(str::to_string))
    }

    /// Check if a branch exists.
    pub fn branch_exists(&self, branch: &BranchName) -> bool {
        self.meta.exists(&branch.as_ref_path())
    }

    /// Resolve a branch to its commit, `None` for a branch without commits.
    pub fn resolve_branch(&self, branch: &BranchName) -> StorageResult<Option<CommitId>> {
        let content = self
            .meta
            .read(&branch.as_ref_path())?
            .ok_or_else(|| StorageError::RefNotFound(branch.to_string()))?;
        Ok(CommitId::parse(&content))
    }

    /// List all branches, sorted by name.
    pub fn list_branches(&self) -> StorageResult<Vec<BranchName>> {
        let mut result = Vec::new();
        for name in self.meta.list(BranchName::HEADS_DIR)? {
            match BranchName::new(name.as_str()) {
                Ok(branch) => result.push(branch),
                Err(e) => debug!(file = %name, error = %e, "skipping unusable branch file"),
            }
        }
        Ok(result)
    }

    /// Attach HEAD to an existing branch.
    pub fn switch_branch(&self, branch: &BranchName) -> StorageResult<()> {
        if !self.branch_exists(branch) {
            return Err(StorageError::RefNotFound(branch.to_string()));
        }
        self.write_symbolic_head(branch)?;
        info!(branch = %branch, "switched HEAD");
        Ok(())
    }

    /// Detach HEAD at `commit`.
    pub fn detach_head(&self, commit: &CommitId) -> StorageResult<()> {
        self.meta.write(Self::HEAD, commit.as_str())?;
        info!(commit = %commit.short(), "detached HEAD");
        Ok(())
    }

    /// Set up an empty repository: HEAD attached to `branch`, which has no
    /// commits yet. Existing branch content is kept.
    pub fn init(&self, branch: &BranchName) -> StorageResult<()> {
        if !self.branch_exists(branch) {
            self.meta.write(&branch.as_ref_path(), "")?;
        }
        self.write_symbolic_head(branch)
    }

    fn write_symbolic_head(&self, branch: &BranchName) -> StorageResult<()> {
        let content = format!("{}{}\n", SYMBOLIC_PREFIX, branch.as_ref_path());
        self.meta.write(Self::HEAD, &content)
    }
}
