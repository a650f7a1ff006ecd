//! Repository API - high-level interface for minigit.

use std::path::{Path, PathBuf};

use chrono::Utc;
use thiserror::Error;
use tracing::info;

use crate::storage::{
    BlobMap, BranchName, Commit, CommitId, CommitStore, FsMetaDir, HashAlgorithm, HistoryWalker,
    InvalidNameError, LogOutcome, MemoryMetaDir, MetaStore, Parents, RefManager, StorageError,
};

/// Result type for repository operations.
pub type RepoResult<T> = Result<T, RepoError>;

/// Repository errors.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("invalid branch name: {0}")]
    InvalidBranchName(#[from] InvalidNameError),

    #[error("repository already exists: {0}")]
    AlreadyExists(PathBuf),

    #[error("repository not found: {0}")]
    NotFound(PathBuf),

    #[error("branch already exists: {0}")]
    BranchAlreadyExists(String),

    #[error("no commits yet")]
    EmptyHistory,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl RepoError {
    /// check if this error indicates the resource doesn't exist
    pub fn is_not_found(&self) -> bool {
        match self {
            RepoError::Storage(e) => e.is_not_found(),
            RepoError::NotFound(_) => true,
            _ => false,
        }
    }
}

/// Repository configuration options.
#[derive(Debug, Clone)]
pub struct RepoConfig {
    /// Path to the metadata directory.
    pub path: PathBuf,
    /// Digest used for new commits.
    pub hash_algorithm: HashAlgorithm,
    /// Initialize on open if the directory has no HEAD.
    pub create_if_missing: bool,
    /// Branch HEAD is attached to after init.
    pub default_branch: String,
}

impl Default for RepoConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(".minigit"),
            hash_algorithm: HashAlgorithm::default(),
            create_if_missing: false,
            default_branch: BranchName::MAIN.to_string(),
        }
    }
}

impl RepoConfig {
    /// Create a new configuration with the given path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    /// Set the commit digest.
    pub fn hash_algorithm(mut self, value: HashAlgorithm) -> Self {
        self.hash_algorithm = value;
        self
    }

    /// Set create_if_missing flag.
    pub fn create_if_missing(mut self, value: bool) -> Self {
        self.create_if_missing = value;
        self
    }

    /// Set the branch created by init.
    pub fn default_branch(mut self, value: impl Into<String>) -> Self {
        self.default_branch = value.into();
        self
    }

    fn default_branch_name(&self) -> RepoResult<BranchName> {
        BranchName::new(self.default_branch.clone()).map_err(|e| {
            RepoError::InvalidConfig(format!(
                "default branch '{}': {}",
                self.default_branch, e
            ))
        })
    }
}

/// Where the repository currently stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoStatus {
    /// branch HEAD is attached to
    pub branch: Option<String>,
    /// commit HEAD resolves to
    pub head: Option<CommitId>,
    pub detached: bool,
    /// number of stored commit records
    pub stored_commits: usize,
}

/// The main repository handle.
pub struct Repository<S = FsMetaDir> {
    config: RepoConfig,
    store: CommitStore<S>,
    refs: RefManager<S>,
}

impl Repository<FsMetaDir> {
    /// Initialize a new repository at the given path.
    pub fn init(path: impl AsRef<Path>) -> RepoResult<Self> {
        Self::init_with_config(RepoConfig::new(path.as_ref()))
    }

    /// Initialize a new repository with custom configuration.
    pub fn init_with_config(config: RepoConfig) -> RepoResult<Self> {
        let branch = config.default_branch_name()?;
        if config.path.join(RefManager::<FsMetaDir>::HEAD).exists() {
            return Err(RepoError::AlreadyExists(config.path.clone()));
        }
        std::fs::create_dir_all(config.path.join(CommitStore::<FsMetaDir>::DIR))?;

        let repo = Self::with_meta(FsMetaDir::new(&config.path), config);
        repo.refs.init(&branch)?;
        info!(path = %repo.config.path.display(), branch = %branch, "initialized repository");
        Ok(repo)
    }

    /// Open an existing repository at the given path.
    pub fn open(path: impl AsRef<Path>) -> RepoResult<Self> {
        Self::open_with_config(RepoConfig::new(path.as_ref()))
    }

    /// Open a repository, initializing it if allowed by the configuration.
    pub fn open_with_config(config: RepoConfig) -> RepoResult<Self> {
        if config.path.join(RefManager::<FsMetaDir>::HEAD).exists() {
            return Ok(Self::with_meta(FsMetaDir::new(&config.path), config));
        }
        if config.create_if_missing {
            Self::init_with_config(config)
        } else {
            Err(RepoError::NotFound(config.path.clone()))
        }
    }

    /// Get the metadata directory path.
    pub fn path(&self) -> &Path {
        &self.config.path
    }
}

impl Repository<MemoryMetaDir> {
    /// Create a new in-memory repository (for testing).
    pub fn in_memory() -> RepoResult<Self> {
        Self::in_memory_with_config(RepoConfig::default())
    }

    pub fn in_memory_with_config(config: RepoConfig) -> RepoResult<Self> {
        let branch = config.default_branch_name()?;
        let repo = Self::with_meta(MemoryMetaDir::new(), config);
        repo.refs.init(&branch)?;
        Ok(repo)
    }
}

impl<S: MetaStore + Clone> Repository<S> {
    /// Wrap an existing metadata handle without initializing anything.
    pub fn with_meta(meta: S, config: RepoConfig) -> Self {
        Self {
            config,
            store: CommitStore::new(meta.clone()),
            refs: RefManager::new(meta),
        }
    }
}

impl<S: MetaStore> Repository<S> {
    /// Get the configuration.
    pub fn config(&self) -> &RepoConfig {
        &self.config
    }

    pub fn store(&self) -> &CommitStore<S> {
        &self.store
    }

    pub fn refs(&self) -> &RefManager<S> {
        &self.refs
    }

    /// The commit HEAD resolves to.
    pub fn head(&self) -> RepoResult<Option<CommitId>> {
        Ok(self.refs.current_commit()?)
    }

    pub fn current_branch(&self) -> RepoResult<Option<String>> {
        Ok(self.refs.current_branch()?)
    }

    /// Record a commit on top of HEAD and advance HEAD to it.
    pub fn commit(&self, message: impl Into<String>, blobs: BlobMap) -> RepoResult<Commit> {
        let parents = match self.head()? {
            Some(parent) => Parents::Single(parent),
            None => Parents::Root,
        };
        self.record(message.into(), parents, blobs)
    }

    /// Record a merge commit with HEAD as first parent and `other` as second.
    pub fn commit_merge(
        &self,
        message: impl Into<String>,
        other: &CommitId,
        blobs: BlobMap,
    ) -> RepoResult<Commit> {
        let head = self.head()?.ok_or(RepoError::EmptyHistory)?;
        if !self.store.contains(other) {
            return Err(StorageError::CommitNotFound(other.clone()).into());
        }
        self.record(message.into(), Parents::merge(head, other.clone()), blobs)
    }

    fn record(&self, message: String, parents: Parents, blobs: BlobMap) -> RepoResult<Commit> {
        let commit = Commit::create_with(
            &self.config.hash_algorithm,
            message,
            parents,
            blobs,
            Utc::now().timestamp(),
        );
        self.store.save(&commit)?;
        self.refs.update_head(commit.hash())?;
        info!(
            commit = %commit.hash().short(),
            parents = commit.parents().len(),
            files = commit.blobs().len(),
            "recorded commit"
        );
        Ok(commit)
    }

    /// First-parent history from HEAD.
    pub fn log(&self, limit: Option<usize>) -> LogOutcome {
        let walker = HistoryWalker::new(&self.store, &self.refs);
        match limit {
            Some(n) => walker.limit(n).walk(),
            None => walker.walk(),
        }
    }

    /// Load one commit.
    pub fn show(&self, hash: &CommitId) -> RepoResult<Commit> {
        Ok(self.store.load(hash)?)
    }

    /// Create a branch at `at`, or at HEAD when not given. HEAD stays where it is.
    pub fn create_branch(&self, name: &str, at: Option<&CommitId>) -> RepoResult<BranchName> {
        let branch = BranchName::new(name)?;
        if self.refs.branch_exists(&branch) {
            return Err(RepoError::BranchAlreadyExists(branch.to_string()));
        }

        let target = match at {
            Some(id) => {
                if !self.store.contains(id) {
                    return Err(StorageError::CommitNotFound(id.clone()).into());
                }
                id.clone()
            }
            // a branch made before the first commit starts out unborn
            None => self.head()?.unwrap_or_else(|| CommitId::new("")),
        };

        self.refs.create_branch(&branch, &target)?;
        info!(branch = %branch, commit = %target.short(), "created branch");
        Ok(branch)
    }

    /// Attach HEAD to an existing branch.
    pub fn switch_branch(&self, name: &str) -> RepoResult<()> {
        let branch = BranchName::new(name)?;
        Ok(self.refs.switch_branch(&branch)?)
    }

    /// Detach HEAD at a stored commit.
    pub fn detach(&self, hash: &CommitId) -> RepoResult<()> {
        if !self.store.contains(hash) {
            return Err(StorageError::CommitNotFound(hash.clone()).into());
        }
        Ok(self.refs.detach_head(hash)?)
    }

    /// List all branches.
    pub fn branches(&self) -> RepoResult<Vec<BranchName>> {
        Ok(self.refs.list_branches()?)
    }

    pub fn status(&self) -> RepoResult<RepoStatus> {
        let head = self.refs.head()?;
        Ok(RepoStatus {
            branch: head.branch_name().map(str::to_string),
            head: self.refs.current_commit()?,
            detached: head.is_detached(),
            stored_commits: self.store.list()?.len(),
        })
    }
}
