//! minigit - the history core of a minimal version-control tool
//!
//! This crate provides immutable, content-addressed commits, a file-backed
//! commit store, HEAD/branch references and a first-parent history walk.
//! Hashing of the tracked files themselves happens elsewhere: callers hand
//! in a filename -> content hash mapping for each commit.
//!
//! # Example
//!
//! ```no_run
//! use minigit::repo::Repository;
//! use minigit::storage::BlobMap;
//!
//! let repo = Repository::init(".minigit").unwrap();
//! let mut blobs = BlobMap::new();
//! blobs.insert("file1.txt".into(), "a1b2c3d4".into());
//! repo.commit("Initial commit", blobs).unwrap();
//!
//! for commit in repo.log(None).commits {
//!     println!("{} {}", commit.hash().short(), commit.summary());
//! }
//! ```

pub mod repo;
pub mod storage;
