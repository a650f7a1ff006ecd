//! High-level repository API.
//!
//! This module ties the commit store and the refs together into the
//! operations a user runs: commit, log, branch, switch, show.

mod api;

pub use api::{RepoConfig, RepoError, RepoResult, RepoStatus, Repository};
