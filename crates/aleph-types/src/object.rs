use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Multihash function code for sha2-256.
pub const MULTIHASH_SHA2_256: u8 = 0x12;

/// Digest length of sha2-256 in bytes.
pub const SHA2_256_LEN: usize = 32;

/// Self-describing content digest for a stored value.
///
/// A `ContentRef` holds a multihash (function code, digest length, digest
/// bytes) and renders as base58btc text, e.g. `QmYwAPJzv5CZsnA625s3Xf2nemtYgPpHdWEz79ojWnPbdG`.
/// Identical content always produces the same `ContentRef`.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContentRef {
    multihash: Vec<u8>,
}

impl ContentRef {
    /// Build a sha2-256 reference from a precomputed digest.
    pub fn from_sha2_256(digest: [u8; SHA2_256_LEN]) -> Self {
        let mut multihash = Vec::with_capacity(2 + SHA2_256_LEN);
        multihash.push(MULTIHASH_SHA2_256);
        multihash.push(SHA2_256_LEN as u8);
        multihash.extend_from_slice(&digest);
        Self { multihash }
    }

    /// Parse raw multihash bytes, validating the header against the body.
    pub fn from_multihash(bytes: &[u8]) -> Result<Self, TypeError> {
        if bytes.len() < 2 {
            return Err(TypeError::InvalidMultihash(format!(
                "{} bytes is shorter than a multihash header",
                bytes.len()
            )));
        }
        let declared = bytes[1] as usize;
        let actual = bytes.len() - 2;
        if declared != actual {
            return Err(TypeError::InvalidLength {
                expected: declared,
                actual,
            });
        }
        if bytes[0] == MULTIHASH_SHA2_256 && declared != SHA2_256_LEN {
            return Err(TypeError::InvalidLength {
                expected: SHA2_256_LEN,
                actual: declared,
            });
        }
        Ok(Self {
            multihash: bytes.to_vec(),
        })
    }

    /// Parse from base58 text.
    pub fn from_b58(s: &str) -> Result<Self, TypeError> {
        let bytes = bs58::decode(s)
            .into_vec()
            .map_err(|e| TypeError::InvalidBase58(e.to_string()))?;
        Self::from_multihash(&bytes)
    }

    /// Multihash function code.
    pub fn code(&self) -> u8 {
        self.multihash[0]
    }

    /// Digest bytes without the multihash header.
    pub fn digest(&self) -> &[u8] {
        &self.multihash[2..]
    }

    /// Full multihash bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.multihash
    }

    /// Base58 text representation.
    pub fn to_b58(&self) -> String {
        bs58::encode(&self.multihash).into_string()
    }

    /// Short representation (first 10 base58 characters).
    pub fn short(&self) -> String {
        self.to_b58().chars().take(10).collect()
    }
}

impl fmt::Debug for ContentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentRef({})", self.short())
    }
}

impl fmt::Display for ContentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_b58())
    }
}

impl FromStr for ContentRef {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_b58(s)
    }
}

impl TryFrom<String> for ContentRef {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::from_b58(&s)
    }
}

impl From<ContentRef> for String {
    fn from(r: ContentRef) -> Self {
        r.to_b58()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha2_refs_start_with_qm() {
        let r = ContentRef::from_sha2_256([7u8; 32]);
        assert!(r.to_b58().starts_with("Qm"));
        assert_eq!(r.code(), MULTIHASH_SHA2_256);
        assert_eq!(r.digest(), &[7u8; 32]);
    }

    #[test]
    fn b58_roundtrip() {
        let r = ContentRef::from_sha2_256([42u8; 32]);
        let parsed: ContentRef = r.to_b58().parse().unwrap();
        assert_eq!(r, parsed);
    }

    #[test]
    fn rejects_bad_base58() {
        let err = ContentRef::from_b58("0OIl").unwrap_err();
        assert!(matches!(err, TypeError::InvalidBase58(_)));
    }

    #[test]
    fn rejects_truncated_multihash() {
        let r = ContentRef::from_sha2_256([1u8; 32]);
        let truncated = &r.as_bytes()[..20];
        let err = ContentRef::from_multihash(truncated).unwrap_err();
        assert!(matches!(err, TypeError::InvalidLength { .. }));
    }

    #[test]
    fn rejects_missing_header() {
        assert!(ContentRef::from_multihash(&[0x12]).is_err());
    }

    #[test]
    fn display_is_full_b58() {
        let r = ContentRef::from_sha2_256([3u8; 32]);
        assert_eq!(format!("{r}"), r.to_b58());
        assert_eq!(r.short().len(), 10);
    }

    #[test]
    fn serde_as_string() {
        let r = ContentRef::from_sha2_256([9u8; 32]);
        let json = serde_json::to_string(&r).unwrap();
        assert_eq!(json, format!("\"{}\"", r.to_b58()));
        let parsed: ContentRef = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, r);
    }
}
