//!  Commit objects and their text record format
//!
//!  a commit is an immutable snapshot of history:
//! - a message and the time it was created
//! - zero, one or two parent hashes (root, normal, merge)
//! - the filename -> content hash mapping supplied by the caller
//!
//! the commit hash is a digest over all of the above, so it doubles as the
//! storage key. Records are line oriented:
//!
//! ```text
//! commit <hash>
//! parent <parent-hash>
//! timestamp <epoch-seconds>
//! message <message-text>
//! blob <filename> <content-hash>
//! ```
//!
//! The message escapes `\`, LF and CR. Hashes and filenames are single tokens
//! and additionally escape space (`\s`) and tab (`\t`).

use std::borrow::Cow;
use std::collections::BTreeMap;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Serialize, Serializer};

use crate::storage::hasher::{CommitHasher, HashAlgorithm};
use crate::storage::types::CommitId;

/// filename -> content hash, kept sorted so hashing and records are canonical
pub type BlobMap = BTreeMap<String, String>;

/// the parent links of a commit
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Parents {
    /// start of history
    #[default]
    Root,
    /// a normal commit
    Single(CommitId),
    /// a merge commit; only the first parent is followed by the log
    Merge(CommitId, CommitId),
}

impl Parents {
    /// single-parent form; a blank parent hash means a root commit
    pub fn single(parent: &str) -> Self {
        match CommitId::parse(parent) {
            Some(id) => Parents::Single(id),
            None => Parents::Root,
        }
    }

    /// build from parent hashes in record order
    ///
    /// Anything beyond the second parent is dropped.
    pub fn from_ids(ids: Vec<CommitId>) -> Self {
        let mut ids = ids.into_iter().filter(|id| !id.is_empty());
        match (ids.next(), ids.next()) {
            (None, _) => Parents::Root,
            (Some(first), None) => Parents::Single(first),
            (Some(first), Some(second)) => Parents::Merge(first, second),
        }
    }

    /// merge form; blank hashes are dropped, so this may collapse to
    /// `Single` or `Root`
    pub fn merge(first: CommitId, second: CommitId) -> Self {
        Self::from_ids(vec![first, second])
    }

    fn normalized(self) -> Self {
        match self {
            Parents::Root => Parents::Root,
            other => Parents::from_ids(other.to_vec()),
        }
    }

    /// the parent followed by history traversal
    pub fn first(&self) -> Option<&CommitId> {
        match self {
            Parents::Root => None,
            Parents::Single(p) | Parents::Merge(p, _) => Some(p),
        }
    }

    pub fn second(&self) -> Option<&CommitId> {
        match self {
            Parents::Merge(_, p) => Some(p),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Parents::Root => 0,
            Parents::Single(_) => 1,
            Parents::Merge(..) => 2,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Parents::Root)
    }

    /// parents in order
    pub fn iter(&self) -> impl Iterator<Item = &CommitId> {
        self.first().into_iter().chain(self.second())
    }

    pub fn to_vec(&self) -> Vec<CommitId> {
        self.iter().cloned().collect()
    }
}

impl Serialize for Parents {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}

/// an immutable commit
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Commit {
    hash: CommitId,
    parents: Parents,
    message: String,
    timestamp: i64,
    blobs: BlobMap,
}

impl Default for Commit {
    fn default() -> Self {
        Self {
            hash: CommitId::new(""),
            parents: Parents::Root,
            message: String::new(),
            timestamp: 0,
            blobs: BlobMap::new(),
        }
    }
}

impl Commit {
    /// create a normal commit stamped with the current time
    ///
    /// An empty `parent` creates a root commit.
    pub fn new(message: impl Into<String>, parent: &str, blobs: BlobMap) -> Self {
        Self::create(message, Parents::single(parent), blobs)
    }

    /// create a merge commit stamped with the current time
    pub fn merge(
        message: impl Into<String>,
        parent1: CommitId,
        parent2: CommitId,
        blobs: BlobMap,
    ) -> Self {
        Self::create(message, Parents::merge(parent1, parent2), blobs)
    }

    /// create a commit using the default digest and the current time
    pub fn create(message: impl Into<String>, parents: Parents, blobs: BlobMap) -> Self {
        Self::create_with(&HashAlgorithm::default(), message, parents, blobs, now())
    }

    /// create a commit with an explicit digest and timestamp
    pub fn create_with(
        hasher: &dyn CommitHasher,
        message: impl Into<String>,
        parents: Parents,
        blobs: BlobMap,
        timestamp: i64,
    ) -> Self {
        let message = message.into();
        let parents = parents.normalized();
        let hash = compute_hash(hasher, &message, timestamp, &parents, &blobs);
        Self::from_parts(hash, parents, message, timestamp, blobs)
    }

    /// assemble a commit from already-known fields without hashing
    pub(crate) fn from_parts(
        hash: CommitId,
        parents: Parents,
        message: String,
        timestamp: i64,
        blobs: BlobMap,
    ) -> Self {
        Self {
            hash,
            parents: parents.normalized(),
            message,
            timestamp,
            blobs,
        }
    }

    pub fn hash(&self) -> &CommitId {
        &self.hash
    }

    pub fn parents(&self) -> &Parents {
        &self.parents
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// seconds since the Unix epoch
    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn blobs(&self) -> &BlobMap {
        &self.blobs
    }

    pub fn datetime(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.timestamp, 0)
            .single()
            .unwrap_or_default()
    }

    /// get a short summary of the commit (first line of message)
    pub fn summary(&self) -> &str {
        self.message.lines().next().unwrap_or(&self.message)
    }

    pub fn is_root(&self) -> bool {
        self.parents.is_empty()
    }

    /// check if this is a merge commit (has two parents)
    pub fn is_merge(&self) -> bool {
        matches!(self.parents, Parents::Merge(..))
    }

    /// render the text record
    pub fn serialize(&self) -> String {
        let mut out = format!("commit {}\n", escape_token(self.hash.as_str()));
        for parent in self.parents.iter() {
            out.push_str(&format!("parent {}\n", escape_token(parent.as_str())));
        }
        out.push_str(&format!("timestamp {}\n", self.timestamp));
        out.push_str(&format!("message {}\n", escape(&self.message)));
        for (file, blob_hash) in &self.blobs {
            out.push_str(&format!(
                "blob {} {}\n",
                escape_token(file),
                escape_token(blob_hash)
            ));
        }
        out
    }

    /// parse a text record
    ///
    /// Parsing is permissive: unknown keywords are skipped and malformed or
    /// missing fields fall back to empty values, so garbage input yields a
    /// default root commit instead of an error. The stored hash is taken as is.
    pub fn deserialize(data: &str) -> Self {
        let mut hash = CommitId::new("");
        let mut parents = Vec::new();
        let mut timestamp = 0;
        let mut message = String::new();
        let mut blobs = BlobMap::new();

        for line in data.lines() {
            let line = line.trim_start();
            let (key, rest) = line.split_once(' ').unwrap_or((line, ""));

            match key {
                "commit" => {
                    if let Some(token) = rest.split_whitespace().next() {
                        hash = CommitId::new(unescape(token));
                    }
                }
                "parent" => {
                    if let Some(token) = rest.split_whitespace().next() {
                        parents.push(CommitId::new(unescape(token)));
                    }
                }
                "timestamp" => {
                    timestamp = rest
                        .split_whitespace()
                        .next()
                        .and_then(|t| t.parse().ok())
                        .unwrap_or(0);
                }
                "message" => message = unescape(rest).into_owned(),
                "blob" => {
                    // the hash token never holds a raw space, so the last space
                    // splits even records with unescaped filenames
                    if let Some((file, blob_hash)) = rest.rsplit_once(' ') {
                        blobs.insert(
                            unescape(file).into_owned(),
                            unescape(blob_hash).into_owned(),
                        );
                    }
                }
                _ => {}
            }
        }

        Self::from_parts(hash, Parents::from_ids(parents), message, timestamp, blobs)
    }
}

/// digest over the framed commit fields
///
/// Each field is written as `tag len:bytes` so no two field splits encode the
/// same way.
pub fn compute_hash(
    hasher: &dyn CommitHasher,
    message: &str,
    timestamp: i64,
    parents: &Parents,
    blobs: &BlobMap,
) -> CommitId {
    let mut input = Vec::new();
    frame(&mut input, "message", message.as_bytes());
    frame(&mut input, "timestamp", timestamp.to_string().as_bytes());
    for parent in parents.iter() {
        frame(&mut input, "parent", parent.as_str().as_bytes());
    }
    for (file, blob_hash) in blobs {
        frame(&mut input, "file", file.as_bytes());
        frame(&mut input, "blob", blob_hash.as_bytes());
    }
    CommitId::new(hasher.digest_hex(&input))
}

fn frame(buf: &mut Vec<u8>, tag: &str, bytes: &[u8]) {
    buf.extend_from_slice(tag.as_bytes());
    buf.extend_from_slice(format!(" {}:", bytes.len()).as_bytes());
    buf.extend_from_slice(bytes);
    buf.push(b'\n');
}

fn now() -> i64 {
    Utc::now().timestamp()
}

/// keep free text on a single record line
fn escape(text: &str) -> Cow<'_, str> {
    if !text.contains(&['\\', '\n', '\r'][..]) {
        return Cow::Borrowed(text);
    }
    let mut out = String::with_capacity(text.len() + 8);
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            _ => out.push(c),
        }
    }
    Cow::Owned(out)
}

/// like [`escape`], but also keeps the text free of spaces and tabs
fn escape_token(text: &str) -> Cow<'_, str> {
    if !text.contains(&[' ', '\t'][..]) {
        return escape(text);
    }
    Cow::Owned(
        escape(text)
            .replace(' ', "\\s")
            .replace('\t', "\\t"),
    )
}

fn unescape(text: &str) -> Cow<'_, str> {
    if !text.contains('\\') {
        return Cow::Borrowed(text);
    }
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('s') => out.push(' '),
            Some('t') => out.push('\t'),
            // unknown escapes are kept verbatim
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    Cow::Owned(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blobs(entries: &[(&str, &str)]) -> BlobMap {
        entries
            .iter()
            .map(|(f, h)| (f.to_string(), h.to_string()))
            .collect()
    }

    fn fixed(message: &str, parents: Parents, blob_map: BlobMap, ts: i64) -> Commit {
        Commit::create_with(&HashAlgorithm::Sha256, message, parents, blob_map, ts)
    }

    #[test]
    fn test_round_trip() {
        let commit = fixed(
            "Add new feature",
            Parents::single("c1"),
            blobs(&[("file1.txt", "c3d4e5f6"), ("file3.txt", "a7b8c9d0")]),
            1_700_000_000,
        );

        let parsed = Commit::deserialize(&commit.serialize());
        assert_eq!(parsed, commit);
        assert_eq!(parsed.parents().to_vec(), vec![CommitId::new("c1")]);
    }

    #[test]
    fn test_round_trip_merge_keeps_parent_order() {
        let commit = Commit::merge(
            "Merge feature",
            CommitId::new("pA"),
            CommitId::new("pB"),
            BlobMap::new(),
        );

        let parsed = Commit::deserialize(&commit.serialize());
        assert!(parsed.is_merge());
        assert_eq!(parsed.parents().first(), Some(&CommitId::new("pA")));
        assert_eq!(parsed.parents().second(), Some(&CommitId::new("pB")));
        assert_eq!(parsed.hash(), commit.hash());
    }

    #[test]
    fn test_hash_is_deterministic() {
        let a = fixed("msg", Parents::single("p"), blobs(&[("a", "1")]), 42);
        let b = fixed("msg", Parents::single("p"), blobs(&[("a", "1")]), 42);
        assert_eq!(a.hash(), b.hash());
        assert_eq!(a.hash().as_str().len(), 64);
    }

    #[test]
    fn test_hash_sensitivity() {
        let base = fixed("msg", Parents::single("p"), blobs(&[("a", "1")]), 42);

        let variants = [
            fixed("msg2", Parents::single("p"), blobs(&[("a", "1")]), 42),
            fixed("msg", Parents::single("q"), blobs(&[("a", "1")]), 42),
            fixed("msg", Parents::Root, blobs(&[("a", "1")]), 42),
            fixed("msg", Parents::single("p"), blobs(&[("a", "2")]), 42),
            fixed("msg", Parents::single("p"), blobs(&[("b", "1")]), 42),
            fixed("msg", Parents::single("p"), blobs(&[("a", "1")]), 43),
        ];
        for variant in &variants {
            assert_ne!(variant.hash(), base.hash());
        }
    }

    #[test]
    fn test_hash_respects_parent_order() {
        let ab = fixed(
            "m",
            Parents::Merge(CommitId::new("a"), CommitId::new("b")),
            BlobMap::new(),
            1,
        );
        let ba = fixed(
            "m",
            Parents::Merge(CommitId::new("b"), CommitId::new("a")),
            BlobMap::new(),
            1,
        );
        assert_ne!(ab.hash(), ba.hash());
    }

    #[test]
    fn test_hash_fields_do_not_run_together() {
        let a = fixed("ab", Parents::Root, blobs(&[("c", "d")]), 1);
        let b = fixed("a", Parents::Root, blobs(&[("bc", "d")]), 1);
        assert_ne!(a.hash(), b.hash());
    }

    #[test]
    fn test_hash_depends_on_algorithm() {
        let sha = Commit::create_with(&HashAlgorithm::Sha256, "m", Parents::Root, BlobMap::new(), 7);
        let b3 = Commit::create_with(&HashAlgorithm::Blake3, "m", Parents::Root, BlobMap::new(), 7);
        assert_ne!(sha.hash(), b3.hash());
    }

    #[test]
    fn test_root_commit_encoding() {
        let root = Commit::new("Initial commit", "", blobs(&[("file1.txt", "a1b2c3d4")]));
        assert!(root.is_root());

        let text = root.serialize();
        assert!(!text.contains("parent"));

        let parsed = Commit::deserialize(&text);
        assert!(parsed.parents().is_empty());
        assert_eq!(parsed.parents().len(), 0);
    }

    #[test]
    fn test_serialize_layout() {
        let commit = Commit::from_parts(
            CommitId::new("h1"),
            Parents::single("p1"),
            "hello world".into(),
            12,
            blobs(&[("b.txt", "2"), ("a.txt", "1")]),
        );
        assert_eq!(
            commit.serialize(),
            "commit h1\nparent p1\ntimestamp 12\nmessage hello world\nblob a.txt 1\nblob b.txt 2\n"
        );
    }

    #[test]
    fn test_deserialize_uses_stored_hash() {
        let text = "commit deadbeef\ntimestamp 5\nmessage tampered\n";
        let parsed = Commit::deserialize(text);
        assert_eq!(parsed.hash().as_str(), "deadbeef");
        assert_eq!(parsed.timestamp(), 5);
    }

    #[test]
    fn test_deserialize_garbage_is_default() {
        assert_eq!(Commit::deserialize(""), Commit::default());

        let parsed = Commit::deserialize("this is not\na commit record\n");
        assert!(parsed.is_root());
        assert_eq!(parsed.message(), "");
        assert_eq!(parsed.timestamp(), 0);
        assert!(parsed.hash().is_empty());
    }

    #[test]
    fn test_deserialize_ignores_unknown_keywords() {
        let text = "commit abc\nauthor someone\ntimestamp 9\nmessage hi\ntree xyz\n";
        let parsed = Commit::deserialize(text);
        assert_eq!(parsed.hash().as_str(), "abc");
        assert_eq!(parsed.message(), "hi");
        assert_eq!(parsed.timestamp(), 9);
    }

    #[test]
    fn test_deserialize_bad_timestamp_is_zero() {
        let parsed = Commit::deserialize("commit abc\ntimestamp soon\n");
        assert_eq!(parsed.timestamp(), 0);
    }

    #[test]
    fn test_message_whitespace_preserved() {
        let parsed = Commit::deserialize("commit a\nmessage   spaced  out  \n");
        assert_eq!(parsed.message(), "  spaced  out  ");
    }

    #[test]
    fn test_multiline_message_round_trip() {
        let commit = fixed("subject\n\nbody with a \\ slash", Parents::Root, BlobMap::new(), 3);
        let text = commit.serialize();
        assert_eq!(text.lines().filter(|l| l.starts_with("message")).count(), 1);

        let parsed = Commit::deserialize(&text);
        assert_eq!(parsed.message(), "subject\n\nbody with a \\ slash");
        assert_eq!(parsed.summary(), "subject");
    }

    #[test]
    fn test_filename_with_spaces() {
        let commit = fixed("m", Parents::Root, blobs(&[("my notes.txt", "abcd")]), 1);
        let parsed = Commit::deserialize(&commit.serialize());
        assert_eq!(parsed.blobs().get("my notes.txt").map(String::as_str), Some("abcd"));
    }

    #[test]
    fn test_blob_hash_cannot_add_record_lines() {
        let commit = fixed(
            "m",
            Parents::Root,
            blobs(&[("f.txt", "abc\nparent deadbeef")]),
            1,
        );
        let text = commit.serialize();
        assert!(!text.contains("\nparent"));

        let parsed = Commit::deserialize(&text);
        assert!(parsed.is_root());
        assert_eq!(parsed, commit);
        assert_eq!(
            parsed.blobs().get("f.txt").map(String::as_str),
            Some("abc\nparent deadbeef")
        );
    }

    #[test]
    fn test_odd_parent_ids_round_trip() {
        let commit = fixed(
            "m",
            Parents::Merge(CommitId::new("a b"), CommitId::new("c\nd")),
            BlobMap::new(),
            1,
        );
        let text = commit.serialize();
        assert_eq!(text.lines().filter(|l| l.starts_with("parent")).count(), 2);
        assert_eq!(Commit::deserialize(&text), commit);
    }

    #[test]
    fn test_blank_parents_are_dropped() {
        let merge = Commit::merge("m", CommitId::new(""), CommitId::new("x"), BlobMap::new());
        assert_eq!(merge.parents(), &Parents::Single(CommitId::new("x")));

        let text = merge.serialize();
        assert!(!text.contains("parent \n"));
        assert_eq!(Commit::deserialize(&text), merge);

        let direct = fixed("m", Parents::Single(CommitId::new("")), BlobMap::new(), 1);
        assert!(direct.is_root());
        assert!(!direct.serialize().contains("parent"));
        assert_eq!(Commit::deserialize(&direct.serialize()), direct);
    }

    #[test]
    fn test_filename_edge_cases_round_trip() {
        let commit = fixed(
            "m",
            Parents::Root,
            blobs(&[("", "h2"), ("trailing ", "h1"), ("tab\there", "h3"), ("empty-hash", "")]),
            1,
        );
        let parsed = Commit::deserialize(&commit.serialize());
        assert_eq!(parsed.blobs(), commit.blobs());
        assert_eq!(parsed, commit);
    }

    #[test]
    fn test_unescaped_filename_with_spaces_still_reads() {
        let parsed = Commit::deserialize("commit a\nblob my notes.txt abcd\n");
        assert_eq!(parsed.blobs().get("my notes.txt").map(String::as_str), Some("abcd"));
    }

    #[test]
    fn test_parents_from_ids() {
        assert_eq!(Parents::from_ids(vec![]), Parents::Root);
        assert_eq!(
            Parents::from_ids(vec![CommitId::new("a")]),
            Parents::Single(CommitId::new("a"))
        );
        let three = Parents::from_ids(vec![
            CommitId::new("a"),
            CommitId::new("b"),
            CommitId::new("c"),
        ]);
        assert_eq!(three, Parents::Merge(CommitId::new("a"), CommitId::new("b")));
    }

    #[test]
    fn test_json_shape() {
        let commit = Commit::from_parts(
            CommitId::new("h"),
            Parents::Merge(CommitId::new("a"), CommitId::new("b")),
            "m".into(),
            1,
            BlobMap::new(),
        );
        let json = serde_json::to_value(&commit).unwrap();
        assert_eq!(json["hash"], "h");
        assert_eq!(json["parents"], serde_json::json!(["a", "b"]));
    }
}
