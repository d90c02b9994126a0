//! Gantry hashing primitives
//!
//! Content digests and the hashing collaborators consumed by snapshotting.
//!
//! # Core Concepts
//!
//! - [`ContentHash`]: 32-byte Blake3 digest
//! - [`MerkleDirectoryHasher`]: digest of a directory from its children
//! - [`FileHasher`]: hashes regular files, keyed by length and mtime
//! - [`StringInterner`]: shared storage for repeated path strings

#![warn(unreachable_pub)]

mod file_hasher;
mod hash;
mod interner;

/// Merkle hashing of directory contents
pub mod merkle;

pub use file_hasher::{CachingFileHasher, DefaultFileHasher, FileHasher, FileHasherStats};
pub use hash::{ContentHash, ContentHasher, HashError, HASH_LEN};
pub use interner::{ConcurrentInterner, NoopInterner, StringInterner};
pub use merkle::MerkleDirectoryHasher;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
