//! History traversal ("log").
//!
//! The walk starts at whatever HEAD resolves to and follows first parents
//! only: for a merge commit the second parent's line is never visited.

use std::collections::HashSet;

use chrono::Local;
use tracing::warn;

use crate::storage::commit::Commit;
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::meta::MetaStore;
use crate::storage::refs::RefManager;
use crate::storage::store::CommitStore;
use crate::storage::types::CommitId;

/// Everything a walk produced.
#[derive(Debug)]
pub struct LogOutcome {
    /// commits emitted, newest first
    pub commits: Vec<Commit>,
    /// the failure that stopped the walk early, if any
    pub error: Option<StorageError>,
}

impl LogOutcome {
    pub fn is_complete(&self) -> bool {
        self.error.is_none()
    }

    pub fn hashes(&self) -> Vec<CommitId> {
        self.commits.iter().map(|c| c.hash().clone()).collect()
    }
}

/// Walks history backwards from HEAD.
pub struct HistoryWalker<'a, S> {
    store: &'a CommitStore<S>,
    refs: &'a RefManager<S>,
    limit: Option<usize>,
}

impl<'a, S: MetaStore> HistoryWalker<'a, S> {
    pub fn new(store: &'a CommitStore<S>, refs: &'a RefManager<S>) -> Self {
        Self {
            store,
            refs,
            limit: None,
        }
    }

    /// stop after `n` commits
    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }

    /// Walk from the current commit.
    ///
    /// Never fails: a load error ends the walk and is returned next to the
    /// commits already emitted.
    pub fn walk(&self) -> LogOutcome {
        match self.refs.current_commit() {
            Ok(start) => self.walk_from(start),
            Err(e) => {
                warn!(error = %e, "could not resolve HEAD");
                LogOutcome {
                    commits: Vec::new(),
                    error: Some(e),
                }
            }
        }
    }

    /// Walk from an explicit starting commit.
    pub fn walk_from(&self, start: Option<CommitId>) -> LogOutcome {
        let mut commits = Vec::new();
        let mut error = None;

        for item in self.history_from(start) {
            match item {
                Ok(commit) => commits.push(commit),
                Err(e) => {
                    warn!(error = %e, emitted = commits.len(), "history walk stopped");
                    error = Some(e);
                }
            }
        }

        LogOutcome { commits, error }
    }

    /// Lazy form of [`walk_from`](Self::walk_from).
    pub fn history_from(&self, start: Option<CommitId>) -> History<'a, S> {
        History {
            store: self.store,
            next: start,
            remaining: self.limit,
            seen: HashSet::new(),
        }
    }
}

/// First-parent iterator over stored commits.
///
/// Yields at most one error, after which it is exhausted.
pub struct History<'a, S> {
    store: &'a CommitStore<S>,
    next: Option<CommitId>,
    remaining: Option<usize>,
    seen: HashSet<CommitId>,
}

impl<S: MetaStore> Iterator for History<'_, S> {
    type Item = StorageResult<Commit>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == Some(0) {
            return None;
        }
        let current = self.next.take()?;

        // hand-edited records can point back into their own history
        if !self.seen.insert(current.clone()) {
            return Some(Err(StorageError::Internal(format!(
                "history loops back to commit {}",
                current
            ))));
        }

        match self.store.load(&current) {
            Ok(commit) => {
                self.next = commit.parents().first().cloned();
                if let Some(n) = self.remaining.as_mut() {
                    *n -= 1;
                }
                Some(Ok(commit))
            }
            Err(e) => Some(Err(e)),
        }
    }
}

/// Render a commit the way `log` prints it.
pub fn format_entry(commit: &Commit) -> String {
    let mut out = format!("commit {}\n", commit.hash());
    if let Some(second) = commit.parents().second() {
        let first = commit.parents().first().map(CommitId::short).unwrap_or_default();
        out.push_str(&format!("Merge: {} {}\n", first, second.short()));
    }
    let date = commit.datetime().with_timezone(&Local);
    out.push_str(&format!("Date:   {}\n\n", date.format("%Y-%m-%d %H:%M:%S")));
    for line in commit.message().lines() {
        out.push_str(&format!("    {}\n", line));
    }
    if commit.message().is_empty() {
        out.push_str("    \n");
    }
    out.push('\n');
    out
}
