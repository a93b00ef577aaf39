use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::TypeError;

/// Digest algorithm used to address stored objects.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    /// SHA-256 (the default address space).
    #[default]
    Sha256,
    /// BLAKE3.
    Blake3,
}

impl HashAlgorithm {
    /// The address prefix for this algorithm (`"sha256"`, `"blake3"`).
    pub fn name(&self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
            Self::Blake3 => "blake3",
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for HashAlgorithm {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sha256" => Ok(Self::Sha256),
            "blake3" => Ok(Self::Blake3),
            other => Err(TypeError::UnknownAlgorithm(other.to_string())),
        }
    }
}

/// Content address of an immutable object: algorithm plus 32-byte digest.
///
/// Rendered as `"<algo>:<hex>"`, e.g. `sha256:ab12…`. Identical bytes hashed
/// with the same algorithm always produce the same `ObjectHash`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectHash {
    algorithm: HashAlgorithm,
    digest: [u8; 32],
}

impl ObjectHash {
    /// Create an address from a pre-computed digest.
    pub fn new(algorithm: HashAlgorithm, digest: [u8; 32]) -> Self {
        Self { algorithm, digest }
    }

    /// The algorithm that produced the digest.
    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    /// The raw 32-byte digest.
    pub fn digest(&self) -> &[u8; 32] {
        &self.digest
    }

    /// Hex-encoded digest (without the algorithm prefix).
    pub fn to_hex(&self) -> String {
        hex::encode(self.digest)
    }

    /// Short hex representation (first 8 characters).
    pub fn short_hex(&self) -> String {
        hex::encode(&self.digest[..4])
    }

    /// The shard directory name: the first two hex characters of the digest.
    pub fn shard(&self) -> String {
        hex::encode(&self.digest[..1])
    }

    /// The remaining hex characters after the shard prefix.
    pub fn shard_rest(&self) -> String {
        hex::encode(&self.digest[1..])
    }

    /// Parse an `"<algo>:<hex>"` address.
    pub fn parse(s: &str) -> Result<Self, TypeError> {
        let (algo, hex_part) = s
            .split_once(':')
            .ok_or_else(|| TypeError::MalformedAddress(s.to_string()))?;
        let algorithm = algo.parse::<HashAlgorithm>()?;
        let bytes = hex::decode(hex_part).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
        if bytes.len() != 32 {
            return Err(TypeError::InvalidLength {
                expected: 32,
                actual: bytes.len(),
            });
        }
        let mut digest = [0u8; 32];
        digest.copy_from_slice(&bytes);
        Ok(Self { algorithm, digest })
    }
}

impl fmt::Debug for ObjectHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectHash({}:{})", self.algorithm, self.short_hex())
    }
}

impl fmt::Display for ObjectHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.algorithm, self.to_hex())
    }
}

impl FromStr for ObjectHash {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for ObjectHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ObjectHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ObjectHash {
        let mut digest = [0u8; 32];
        digest[0] = 0xab;
        digest[1] = 0x12;
        ObjectHash::new(HashAlgorithm::Sha256, digest)
    }

    #[test]
    fn display_has_algorithm_prefix() {
        let h = sample();
        let s = h.to_string();
        assert!(s.starts_with("sha256:ab12"));
        assert_eq!(s.len(), "sha256:".len() + 64);
    }

    #[test]
    fn parse_roundtrip() {
        let h = sample();
        let parsed: ObjectHash = h.to_string().parse().unwrap();
        assert_eq!(parsed, h);
    }

    #[test]
    fn shard_is_first_two_hex_chars() {
        let h = sample();
        assert_eq!(h.shard(), "ab");
        assert_eq!(h.shard_rest().len(), 62);
        assert!(h.shard_rest().starts_with("12"));
    }

    #[test]
    fn parse_rejects_unknown_algorithm() {
        let err = ObjectHash::parse(&format!("md5:{}", "00".repeat(32))).unwrap_err();
        assert_eq!(err, TypeError::UnknownAlgorithm("md5".into()));
    }

    #[test]
    fn parse_rejects_missing_prefix() {
        assert!(matches!(
            ObjectHash::parse(&"00".repeat(32)),
            Err(TypeError::MalformedAddress(_))
        ));
    }

    #[test]
    fn parse_rejects_short_digest() {
        assert!(matches!(
            ObjectHash::parse("sha256:abcd"),
            Err(TypeError::InvalidLength { expected: 32, actual: 2 })
        ));
    }

    #[test]
    fn serde_uses_string_form() {
        let h = sample();
        let json = serde_json::to_string(&h).unwrap();
        assert_eq!(json, format!("\"{h}\""));
        let back: ObjectHash = serde_json::from_str(&json).unwrap();
        assert_eq!(back, h);
    }

    #[test]
    fn algorithm_names() {
        assert_eq!(HashAlgorithm::Sha256.name(), "sha256");
        assert_eq!("blake3".parse::<HashAlgorithm>().unwrap(), HashAlgorithm::Blake3);
        assert_eq!(HashAlgorithm::default(), HashAlgorithm::Sha256);
    }
}
