use sha2::{Digest, Sha256};
use tessel_types::{HashAlgorithm, ObjectHash};

use crate::canonical::{to_canonical_vec, CanonicalError};

/// Content hasher over the exact byte sequence it is given.
///
/// No domain tag is mixed in: the address of a segment or snapshot is the
/// plain digest of its bytes, so any peer can recompute it independently.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ContentHasher {
    algorithm: HashAlgorithm,
}

impl ContentHasher {
    /// SHA-256 hasher.
    pub const SHA256: Self = Self {
        algorithm: HashAlgorithm::Sha256,
    };
    /// BLAKE3 hasher.
    pub const BLAKE3: Self = Self {
        algorithm: HashAlgorithm::Blake3,
    };

    pub const fn new(algorithm: HashAlgorithm) -> Self {
        Self { algorithm }
    }

    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    /// Hash raw bytes.
    pub fn hash(&self, data: &[u8]) -> ObjectHash {
        let digest: [u8; 32] = match self.algorithm {
            HashAlgorithm::Sha256 => Sha256::digest(data).into(),
            HashAlgorithm::Blake3 => *blake3::hash(data).as_bytes(),
        };
        ObjectHash::new(self.algorithm, digest)
    }

    /// Hash the canonical JSON encoding of a value.
    pub fn hash_canonical<T: serde::Serialize>(&self, value: &T) -> Result<ObjectHash, CanonicalError> {
        let data = to_canonical_vec(value)?;
        Ok(self.hash(&data))
    }

    /// Verify that `data` hashes to `expected`.
    ///
    /// Uses the algorithm named by `expected`, not this hasher's own, so a
    /// store configured for one algorithm can still verify foreign addresses.
    pub fn verify(data: &[u8], expected: &ObjectHash) -> bool {
        Self::new(expected.algorithm()).hash(data) == *expected
    }
}
