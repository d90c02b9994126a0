//! Merkle hashing of directory contents
//!
//! [`MerkleDirectoryHasher`] folds `(name, digest)` pairs of a directory's
//! children into one digest using an `rs_merkle` tree. The caller decides the
//! child order; snapshot builders sort children by name first so that the
//! result does not depend on directory enumeration order.

use crate::hash::{ContentHash, ContentHasher};
use rs_merkle::{Hasher, MerkleTree};

/// Accumulates children of one directory and produces its Merkle digest
#[derive(Debug, Clone, Default)]
pub struct MerkleDirectoryHasher {
    leaves: Vec<[u8; 32]>,
}

impl MerkleDirectoryHasher {
    /// Create empty hasher
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create hasher sized for `capacity` children
    #[inline]
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            leaves: Vec::with_capacity(capacity),
        }
    }

    /// Append one child
    pub fn add_child(&mut self, name: &str, hash: &ContentHash) {
        let leaf = ContentHasher::new().put_str(name).put_hash(hash).finish();
        self.leaves.push(*leaf.as_bytes());
    }

    /// Number of children added so far
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.leaves.len()
    }

    /// Check if no children were added
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }

    /// Digest of the directory
    ///
    /// The tree root is wrapped with a directory tag and the child count, so an
    /// empty directory still gets a distinct, non-zero digest and a directory
    /// with a single child never collides with that child's leaf.
    #[must_use]
    pub fn finish(&self) -> ContentHash {
        let tree = MerkleTree::<Blake3Hasher>::from_leaves(&self.leaves);
        let root = tree.root().map_or_else(ContentHash::default, ContentHash::new);
        ContentHasher::new()
            .put_str("directory")
            .put_u64(self.leaves.len() as u64)
            .put_hash(&root)
            .finish()
    }
}

/// Blake3 hasher adapter for `rs_merkle`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Blake3Hasher;

impl Hasher for Blake3Hasher {
    type Hash = [u8; 32];

    #[inline]
    fn hash(data: &[u8]) -> Self::Hash {
        *blake3::hash(data).as_bytes()
    }
}
