//! Hash algorithm registry.
//!
//! Every stored hash is an algorithm-prefixed string (`"blake3:ab12…"`).
//! Verification extracts the algorithm from the prefix, so events hashed
//! under different algorithms can coexist in one chain and old events stay
//! verifiable after the default changes.

use crate::error::{ConcordResult, IntegrityError};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Digest length in bytes for all registered algorithms.
pub const DIGEST_LEN: usize = 32;

/// Algorithm tag used for the genesis sentinel.
pub const GENESIS_ALGORITHM: HashAlgorithm = HashAlgorithm::Blake3;

static GENESIS_SENTINEL: Lazy<String> = Lazy::new(|| {
    format!(
        "{}:{}",
        GENESIS_ALGORITHM.tag(),
        "0".repeat(DIGEST_LEN * 2)
    )
});

/// Hash algorithm for ledger integrity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    /// Blake3 hash algorithm (fast default)
    #[default]
    Blake3,
    /// SHA-256 hash algorithm (portable baseline)
    Sha256,
}

impl HashAlgorithm {
    /// The string tag used as the hash-string prefix.
    pub const fn tag(&self) -> &'static str {
        match self {
            HashAlgorithm::Blake3 => "blake3",
            HashAlgorithm::Sha256 => "sha256",
        }
    }

    /// Resolve an algorithm from its tag.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "blake3" => Some(HashAlgorithm::Blake3),
            "sha256" => Some(HashAlgorithm::Sha256),
            _ => None,
        }
    }

    /// Digest raw bytes under this algorithm.
    pub fn digest(&self, bytes: &[u8]) -> [u8; DIGEST_LEN] {
        match self {
            HashAlgorithm::Blake3 => blake3::hash(bytes).into(),
            HashAlgorithm::Sha256 => {
                use sha2::{Digest, Sha256};
                let result = Sha256::digest(bytes);
                let mut hash = [0u8; DIGEST_LEN];
                hash.copy_from_slice(&result);
                hash
            }
        }
    }

    /// Digest bytes and return the prefixed hash string.
    pub fn compute(&self, bytes: &[u8]) -> String {
        format!("{}:{}", self.tag(), hex::encode(self.digest(bytes)))
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Extract the algorithm named by a prefixed hash string.
pub fn algorithm_of(hash_string: &str) -> ConcordResult<HashAlgorithm> {
    let (tag, _) = hash_string.split_once(':').ok_or_else(|| {
        IntegrityError::UnsupportedAlgorithm {
            algorithm: hash_string.to_string(),
        }
    })?;
    HashAlgorithm::from_tag(tag)
        .ok_or_else(|| {
            IntegrityError::UnsupportedAlgorithm {
                algorithm: tag.to_string(),
            }
            .into()
        })
}

/// Verify a prefixed hash string against raw bytes, selecting the algorithm
/// from the prefix. Unknown prefixes fail with `UnsupportedAlgorithm`.
pub fn verify(hash_string: &str, bytes: &[u8]) -> ConcordResult<bool> {
    let algorithm = algorithm_of(hash_string)?;
    Ok(algorithm.compute(bytes) == hash_string.to_ascii_lowercase())
}

/// The genesis sentinel: an all-zero digest under the declared genesis
/// algorithm tag, used as `prev_hash` of the first event only.
pub fn genesis_sentinel() -> &'static str {
    &GENESIS_SENTINEL
}

/// Check whether a hash string is the genesis sentinel.
pub fn is_genesis_sentinel(hash_string: &str) -> bool {
    hash_string == GENESIS_SENTINEL.as_str()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConcordError;

    #[test]
    fn test_compute_prefixes_algorithm() {
        let h = HashAlgorithm::Blake3.compute(b"petition");
        assert!(h.starts_with("blake3:"));
        assert_eq!(h.len(), "blake3:".len() + 64);

        let h = HashAlgorithm::Sha256.compute(b"petition");
        assert!(h.starts_with("sha256:"));
    }

    #[test]
    fn test_verify_selects_algorithm_from_prefix() {
        let bytes = b"deliberation record";
        let blake = HashAlgorithm::Blake3.compute(bytes);
        let sha = HashAlgorithm::Sha256.compute(bytes);

        assert!(verify(&blake, bytes).unwrap());
        assert!(verify(&sha, bytes).unwrap());
        assert!(!verify(&blake, b"tampered").unwrap());
        assert!(!verify(&sha, b"tampered").unwrap());
    }

    #[test]
    fn test_verify_rejects_unknown_prefix() {
        let err = verify("md5:abcd", b"x").unwrap_err();
        assert!(matches!(
            err,
            ConcordError::Integrity(IntegrityError::UnsupportedAlgorithm { .. })
        ));
    }

    #[test]
    fn test_verify_rejects_missing_prefix() {
        assert!(verify("deadbeef", b"x").is_err());
    }

    #[test]
    fn test_genesis_sentinel_shape() {
        let sentinel = genesis_sentinel();
        assert!(sentinel.starts_with("blake3:"));
        assert!(sentinel.ends_with(&"0".repeat(64)));
        assert!(is_genesis_sentinel(sentinel));
        assert!(!is_genesis_sentinel(&HashAlgorithm::Blake3.compute(b"x")));
    }

    #[test]
    fn test_algorithms_disagree() {
        // Same input, different digests: the prefix is load-bearing.
        let bytes = b"charter";
        assert_ne!(
            HashAlgorithm::Blake3.compute(bytes),
            HashAlgorithm::Sha256.compute(bytes)
        );
    }
}
