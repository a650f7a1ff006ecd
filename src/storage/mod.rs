//! storage layer for minigit
//!
//! this module owns everything that is persisted in the metadata directory.
//! The repository facade uses this API and never touches files directly.
//!
//!  # Architecture
//!
//! ```text
//!  ┌─────────────┐       ┌─────────────┐
//!  │   history   │──────▶│    refs     │
//!  │    (log)    │       │(HEAD, heads)│
//!  └─────────────┘       └─────────────┘
//!         │                     │
//!         ▼                     │
//!  ┌─────────────┐              │
//!  │    store    │              │
//!  │  (commits)  │              │
//!  └─────────────┘              │
//!         │                     │
//!         └──────────┬──────────┘
//!                    ▼
//!             ┌─────────────┐
//!             │    meta     │
//!             │ (MetaStore) │
//!             └─────────────┘
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use minigit::storage::{BlobMap, Commit, CommitStore, FsMetaDir, HistoryWalker, RefManager};
//!
//! let meta = FsMetaDir::new(".minigit");
//! let store = CommitStore::new(meta.clone());
//! let refs = RefManager::new(meta);
//!
//! let parent = refs.current_commit()?;
//! let parent = parent.as_ref().map(|id| id.as_str()).unwrap_or("");
//! let commit = Commit::new("Initial commit", parent, BlobMap::new());
//! store.save(&commit)?;
//! refs.update_head(commit.hash())?;
//!
//! for commit in HistoryWalker::new(&store, &refs).walk().commits {
//!     println!("{} {}", commit.hash().short(), commit.summary());
//! }
//! # Ok::<(), minigit::storage::StorageError>(())
//! ```

mod commit;
mod error;
mod hasher;
mod history;
mod meta;
mod refs;
mod store;
mod types;

// Re-export public API
pub use commit::{compute_hash, BlobMap, Commit, Parents};
pub use error::{StorageError, StorageResult};
pub use hasher::{CommitHasher, HashAlgorithm};
pub use history::{format_entry, History, HistoryWalker, LogOutcome};
pub use meta::{FsMetaDir, MemoryMetaDir, MetaStore};
pub use refs::{Head, RefManager, SYMBOLIC_PREFIX};
pub use store::CommitStore;
pub use types::{BranchName, CommitId, InvalidNameError};
