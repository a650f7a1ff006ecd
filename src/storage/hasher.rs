//! Digest functions used to derive commit hashes.
//!
//! Commit hashes are lowercase hex. The digest is pluggable through
//! [`CommitHasher`]; repositories default to SHA-256.

use std::fmt;
use std::str::FromStr;

use sha2::{Digest, Sha256};

/// Turns a canonical commit encoding into a hex digest.
pub trait CommitHasher {
    /// hex digest of `input`
    fn digest_hex(&self, input: &[u8]) -> String;
}

/// Built-in digest algorithms.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum HashAlgorithm {
    #[default]
    Sha256,
    Blake3,
}

impl HashAlgorithm {
    pub const ALL: [HashAlgorithm; 2] = [HashAlgorithm::Sha256, HashAlgorithm::Blake3];

    pub fn name(&self) -> &'static str {
        match self {
            HashAlgorithm::Sha256 => "sha256",
            HashAlgorithm::Blake3 => "blake3",
        }
    }
}

impl CommitHasher for HashAlgorithm {
    fn digest_hex(&self, input: &[u8]) -> String {
        match self {
            HashAlgorithm::Sha256 => {
                let mut hasher = Sha256::new();
                hasher.update(input);
                hex::encode(hasher.finalize())
            }
            HashAlgorithm::Blake3 => blake3::hash(input).to_hex().to_string(),
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for HashAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sha256" | "sha-256" => Ok(HashAlgorithm::Sha256),
            "blake3" => Ok(HashAlgorithm::Blake3),
            other => Err(format!(
                "unknown hash algorithm '{}' (expected sha256 or blake3)",
                other
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_known_vector() {
        let digest = HashAlgorithm::Sha256.digest_hex(b"abc");
        assert_eq!(
            digest,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_blake3_matches_crate() {
        let digest = HashAlgorithm::Blake3.digest_hex(b"hello\n");
        assert_eq!(digest, blake3::hash(b"hello\n").to_hex().to_string());
        assert_eq!(digest.len(), 64);
    }

    #[test]
    fn test_algorithms_disagree() {
        let sha = HashAlgorithm::Sha256.digest_hex(b"same input");
        let b3 = HashAlgorithm::Blake3.digest_hex(b"same input");
        assert_ne!(sha, b3);
    }

    #[test]
    fn test_parse_algorithm() {
        assert_eq!("sha256".parse::<HashAlgorithm>(), Ok(HashAlgorithm::Sha256));
        assert_eq!("BLAKE3".parse::<HashAlgorithm>(), Ok(HashAlgorithm::Blake3));
        assert!("md5".parse::<HashAlgorithm>().is_err());
        for algo in HashAlgorithm::ALL {
            assert_eq!(algo.name().parse::<HashAlgorithm>(), Ok(algo));
        }
    }
}
