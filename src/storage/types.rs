//! core type-safe wrappers around the identifiers used by the storage layer.

use std::fmt;
use std::fmt::Formatter;

use serde::Serialize;

/// Hex digest identifying a commit record.
///
/// This makes sure we don't accidentally pass a branch name or blob hash where
/// a commit hash is expected. The value is kept verbatim: records read back from
/// disk may carry hashes produced by a different digest than the current one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct CommitId(String);

impl CommitId {
    /// length of the abbreviated form
    pub const SHORT_LEN: usize = 7;

    pub fn new(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    /// parse a CommitId from ref/record text, `None` when blank
    pub fn parse(text: &str) -> Option<Self> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// short form of the commit ID
    pub fn short(&self) -> &str {
        self.0.get(..Self::SHORT_LEN).unwrap_or(&self.0)
    }
}

impl fmt::Display for CommitId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for CommitId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for CommitId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for CommitId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// a validated branch name
///
/// Branch names become paths under `refs/heads/`, so they are restricted to
/// keep them inside that directory. Nested names (`team/feature`) are allowed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct BranchName(String);

impl BranchName {
    /// the default branch name
    pub const MAIN: &'static str = "main";

    /// directory holding branch files, relative to the metadata root
    pub const HEADS_DIR: &'static str = "refs/heads";

    /// create a new BranchName
    pub fn new(name: impl Into<String>) -> Result<Self, InvalidNameError> {
        let name = name.into();
        Self::validate(&name)?;
        Ok(Self(name))
    }

    fn validate(name: &str) -> Result<(), InvalidNameError> {
        if name.is_empty() {
            return Err(InvalidNameError::Empty);
        }
        if name.len() > 255 {
            return Err(InvalidNameError::TooLong(name.len()));
        }
        if name.contains("..") || name.contains("//") || name.ends_with('/') || name.starts_with('/')
        {
            return Err(InvalidNameError::InvalidPath(name.to_string()));
        }
        for (i, c) in name.chars().enumerate() {
            if c.is_whitespace() || c.is_control() || c == '\\' {
                return Err(InvalidNameError::InvalidCharacter { char: c, position: i });
            }
        }
        Ok(())
    }

    /// create the main branch reference
    pub fn main() -> Self {
        Self(Self::MAIN.to_string())
    }

    /// get the ref path relative to the metadata root (e.g., "refs/heads/main")
    pub fn as_ref_path(&self) -> String {
        format!("{}/{}", Self::HEADS_DIR, self.0)
    }

    /// get the short name
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BranchName {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for BranchName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// error type for invalid branch names
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidNameError {
    Empty,
    TooLong(usize),
    InvalidCharacter { char: char, position: usize },
    InvalidPath(String),
}

impl fmt::Display for InvalidNameError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "name cannot be empty"),
            Self::TooLong(len) => write!(f, "name too long: {} characters", len),
            Self::InvalidCharacter { char, position } => {
                write!(f, "invalid character {:?} at position {}", char, position)
            }
            Self::InvalidPath(path) => write!(f, "invalid path: '{}'", path),
        }
    }
}

impl std::error::Error for InvalidNameError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_branch_name_valid() {
        assert!(BranchName::new("main").is_ok());
        assert!(BranchName::new("feature-x").is_ok());
        assert!(BranchName::new("team/feature").is_ok());
    }

    #[test]
    fn test_branch_name_invalid() {
        assert_eq!(BranchName::new(""), Err(InvalidNameError::Empty));
        assert!(BranchName::new("../escape").is_err());
        assert!(BranchName::new("/abs").is_err());
        assert!(BranchName::new("trailing/").is_err());
        assert!(BranchName::new("has space").is_err());
        assert!(BranchName::new("a".repeat(256)).is_err());
    }

    #[test]
    fn test_branch_name_main() {
        let branch = BranchName::main();
        assert_eq!(branch.as_str(), "main");
        assert_eq!(branch.as_ref_path(), "refs/heads/main");
    }

    #[test]
    fn test_commit_id_short() {
        let id = CommitId::new("0123456789abcdef");
        assert_eq!(id.short(), "0123456");

        let tiny = CommitId::new("abc");
        assert_eq!(tiny.short(), "abc");
    }

    #[test]
    fn test_commit_id_parse() {
        assert_eq!(CommitId::parse("abc123\n"), Some(CommitId::new("abc123")));
        assert_eq!(CommitId::parse("  \n"), None);
        assert_eq!(CommitId::parse(""), None);
    }
}
