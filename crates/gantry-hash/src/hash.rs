//! Content digests
//!
//! Provides [`ContentHash`], the fixed-size digest carried by every snapshot
//! node, and [`ContentHasher`] for hashing data incrementally.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Digest length in bytes.
pub const HASH_LEN: usize = 32;

/// A 32-byte content digest (Blake3)
///
/// Regular files carry the digest of their bytes, directories the Merkle
/// digest of their children. Immutable and `Copy`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ContentHash([u8; HASH_LEN]);

impl ContentHash {
    /// Wrap raw digest bytes
    #[inline]
    #[must_use]
    pub const fn new(bytes: [u8; HASH_LEN]) -> Self {
        Self(bytes)
    }

    /// Underlying bytes
    #[inline]
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; HASH_LEN] {
        &self.0
    }

    /// Create digest from a byte slice
    ///
    /// # Errors
    /// Returns error if slice length is not exactly 32 bytes
    #[inline]
    pub fn from_slice(bytes: &[u8]) -> Result<Self, HashError> {
        let arr: [u8; HASH_LEN] = bytes.try_into().map_err(|_| HashError::InvalidLength {
            expected: HASH_LEN,
            actual: bytes.len(),
        })?;
        Ok(Self(arr))
    }

    /// Digest of arbitrary bytes
    #[inline]
    #[must_use]
    pub fn compute(data: &[u8]) -> Self {
        Self::new(*blake3::hash(data).as_bytes())
    }

    /// Fixed digest standing for a marker rather than content
    ///
    /// Used where a node has no bytes of its own, e.g. a missing file.
    #[must_use]
    pub fn signature(marker: &str) -> Self {
        let mut hasher = ContentHasher::new();
        hasher.put_str("signature");
        hasher.put_str(marker);
        hasher.finish()
    }

    /// First 16 hex chars
    #[inline]
    #[must_use]
    pub fn short(&self) -> String {
        hex::encode(&self.0[..8])
    }

    /// Check if digest is all zeros
    #[inline]
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|b| *b == 0)
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({})", self.short())
    }
}

impl Display for ContentHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl FromStr for ContentHash {
    type Err = HashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s)?;
        Self::from_slice(&bytes)
    }
}

impl AsRef<[u8]> for ContentHash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Default for ContentHash {
    fn default() -> Self {
        Self([0; HASH_LEN])
    }
}

impl serde::Serialize for ContentHash {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        if serializer.is_human_readable() {
            serializer.serialize_str(&self.to_string())
        } else {
            serializer.serialize_bytes(&self.0)
        }
    }
}

impl<'de> serde::Deserialize<'de> for ContentHash {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct ContentHashVisitor;

        impl<'de> serde::de::Visitor<'de> for ContentHashVisitor {
            type Value = ContentHash;

            fn expecting(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
                formatter.write_str("a 32-byte digest as hex string or byte array")
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                value.parse().map_err(serde::de::Error::custom)
            }

            fn visit_bytes<E>(self, value: &[u8]) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                ContentHash::from_slice(value).map_err(serde::de::Error::custom)
            }
        }

        if deserializer.is_human_readable() {
            deserializer.deserialize_str(ContentHashVisitor)
        } else {
            deserializer.deserialize_bytes(ContentHashVisitor)
        }
    }
}

/// Incremental digest builder
///
/// Strings and byte runs are length-prefixed so that adjacent fields can
/// never be confused (`"ab" + "c"` differs from `"a" + "bc"`).
#[derive(Debug, Clone, Default)]
pub struct ContentHasher {
    inner: blake3::Hasher,
}

impl ContentHasher {
    /// Create empty hasher
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed raw bytes without framing
    #[inline]
    pub fn update(&mut self, data: &[u8]) -> &mut Self {
        self.inner.update(data);
        self
    }

    /// Feed a length-prefixed string
    #[inline]
    pub fn put_str(&mut self, value: &str) -> &mut Self {
        self.put_u64(value.len() as u64);
        self.inner.update(value.as_bytes());
        self
    }

    /// Feed an integer (little endian)
    #[inline]
    pub fn put_u64(&mut self, value: u64) -> &mut Self {
        self.inner.update(&value.to_le_bytes());
        self
    }

    /// Feed another digest
    #[inline]
    pub fn put_hash(&mut self, hash: &ContentHash) -> &mut Self {
        self.inner.update(hash.as_bytes());
        self
    }

    /// Finish into a digest
    #[inline]
    #[must_use]
    pub fn finish(&self) -> ContentHash {
        ContentHash::new(*self.inner.finalize().as_bytes())
    }
}

/// Errors that can occur when working with content digests
#[derive(Debug, thiserror::Error)]
pub enum HashError {
    /// Invalid digest length
    #[error("invalid hash length: expected {expected}, got {actual}")]
    InvalidLength {
        /// Required length
        expected: usize,
        /// Length supplied
        actual: usize,
    },

    /// Hex encoding error
    #[error("hex decode error: {0}")]
    HexDecode(#[from] hex::FromHexError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_slice_rejects_wrong_length() {
        let result = ContentHash::from_slice(&[1u8; 31]);
        assert!(matches!(
            result,
            Err(HashError::InvalidLength { expected: 32, actual: 31 })
        ));
    }

    #[test]
    fn compute_is_deterministic() {
        assert_eq!(ContentHash::compute(b"hello"), ContentHash::compute(b"hello"));
        assert_ne!(ContentHash::compute(b"data1"), ContentHash::compute(b"data2"));
    }

    #[test]
    fn display_round_trips_through_parse() {
        let hash = ContentHash::compute(b"test");
        let parsed: ContentHash = hash.to_string().parse().unwrap();
        assert_eq!(hash, parsed);
        assert!(hash.to_string().starts_with(&hash.short()));
    }

    #[test]
    fn signature_differs_from_content_of_same_text() {
        assert_ne!(ContentHash::signature("missing"), ContentHash::compute(b"missing"));
        assert_eq!(ContentHash::signature("missing"), ContentHash::signature("missing"));
    }

    #[test]
    fn hasher_framing_separates_fields() {
        let ab_c = ContentHasher::new().put_str("ab").put_str("c").finish();
        let a_bc = ContentHasher::new().put_str("a").put_str("bc").finish();
        assert_ne!(ab_c, a_bc);
    }

    #[test]
    fn zero_hash_detection() {
        assert!(ContentHash::default().is_zero());
        assert!(!ContentHash::compute(b"x").is_zero());
    }

    #[test]
    fn serde_json_uses_hex() {
        let hash = ContentHash::compute(b"test");
        let json = serde_json::to_string(&hash).unwrap();
        assert_eq!(json, format!("\"{hash}\""));
        let decoded: ContentHash = serde_json::from_str(&json).unwrap();
        assert_eq!(hash, decoded);
    }
}
