//! Regular file content hashing
//!
//! [`FileHasher`] is the collaborator snapshotting uses to hash regular files.
//! The file's length and modification time are passed alongside the path so
//! implementations can use them as a cheap invalidation key.

use crate::hash::{ContentHash, HASH_LEN};
use moka::sync::Cache;
use std::fmt;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Hashes the content of a regular file
pub trait FileHasher: Send + Sync {
    /// Digest of the file's bytes
    ///
    /// # Errors
    /// Returns the I/O error raised while opening or reading the file
    fn hash(&self, path: &Path, length: u64, last_modified: i64) -> io::Result<ContentHash>;
}

impl<T: FileHasher + ?Sized> FileHasher for Arc<T> {
    fn hash(&self, path: &Path, length: u64, last_modified: i64) -> io::Result<ContentHash> {
        (**self).hash(path, length, last_modified)
    }
}

/// Streams the file through Blake3
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultFileHasher;

impl DefaultFileHasher {
    /// Create hasher
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl FileHasher for DefaultFileHasher {
    fn hash(&self, path: &Path, _length: u64, _last_modified: i64) -> io::Result<ContentHash> {
        let mut reader = BufReader::new(File::open(path)?);
        let mut hasher = blake3::Hasher::new();
        io::copy(&mut reader, &mut hasher)?;
        let digest: [u8; HASH_LEN] = *hasher.finalize().as_bytes();
        Ok(ContentHash::new(digest))
    }
}

#[derive(Debug, Clone, Copy)]
struct CachedHash {
    length: u64,
    last_modified: i64,
    hash: ContentHash,
}

/// Hit/miss counters of a [`CachingFileHasher`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FileHasherStats {
    /// Lookups answered from memory
    pub hits: u64,
    /// Lookups that had to read the file
    pub misses: u64,
}

/// Remembers digests while `(length, last_modified)` stay unchanged
///
/// Holds at most `capacity` digests; beyond that the least useful ones are
/// evicted.
pub struct CachingFileHasher<H> {
    delegate: H,
    entries: Cache<PathBuf, CachedHash>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<H: FileHasher> CachingFileHasher<H> {
    /// Wrap `delegate`
    #[must_use]
    pub fn new(delegate: H, capacity: usize) -> Self {
        Self {
            delegate,
            entries: Cache::new(u64::try_from(capacity.max(1)).unwrap_or(u64::MAX)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Forget every remembered digest
    pub fn invalidate_all(&self) {
        self.entries.invalidate_all();
    }

    /// Number of remembered digests
    #[must_use]
    pub fn len(&self) -> u64 {
        self.entries.run_pending_tasks();
        self.entries.entry_count()
    }

    /// Check if nothing is remembered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current counters
    #[must_use]
    pub fn stats(&self) -> FileHasherStats {
        FileHasherStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

impl<H: FileHasher> FileHasher for CachingFileHasher<H> {
    fn hash(&self, path: &Path, length: u64, last_modified: i64) -> io::Result<ContentHash> {
        if let Some(cached) = self.entries.get(path) {
            if cached.length == length && cached.last_modified == last_modified {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Ok(cached.hash);
            }
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let hash = self.delegate.hash(path, length, last_modified)?;
        self.entries.insert(
            path.to_path_buf(),
            CachedHash {
                length,
                last_modified,
                hash,
            },
        );
        Ok(hash)
    }
}

impl<H> fmt::Debug for CachingFileHasher<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachingFileHasher")
            .field("entries", &self.entries.entry_count())
            .field("hits", &self.hits.load(Ordering::Relaxed))
            .field("misses", &self.misses.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[derive(Debug, Default)]
    struct CountingHasher {
        calls: AtomicUsize,
    }

    impl FileHasher for CountingHasher {
        fn hash(&self, path: &Path, length: u64, last_modified: i64) -> io::Result<ContentHash> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            DefaultFileHasher.hash(path, length, last_modified)
        }
    }

    #[test]
    fn default_hasher_matches_in_memory_digest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::write(&path, b"content").unwrap();

        let hash = DefaultFileHasher.hash(&path, 7, 0).unwrap();
        assert_eq!(hash, ContentHash::compute(b"content"));
    }

    #[test]
    fn default_hasher_reports_missing_file() {
        let result = DefaultFileHasher.hash(Path::new("/nonexistent/gantry/file"), 0, 0);
        assert_eq!(result.unwrap_err().kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn caching_hasher_reuses_digest_for_same_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::write(&path, b"one").unwrap();

        let hasher = CachingFileHasher::new(CountingHasher::default(), 16);
        let first = hasher.hash(&path, 3, 100).unwrap();
        let second = hasher.hash(&path, 3, 100).unwrap();

        assert_eq!(first, second);
        assert_eq!(hasher.delegate.calls.load(Ordering::SeqCst), 1);
        assert_eq!(hasher.stats(), FileHasherStats { hits: 1, misses: 1 });
    }

    #[test]
    fn caching_hasher_rehashes_when_mtime_changes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::write(&path, b"one").unwrap();

        let hasher = CachingFileHasher::new(CountingHasher::default(), 16);
        let first = hasher.hash(&path, 3, 100).unwrap();
        std::fs::write(&path, b"two").unwrap();
        let second = hasher.hash(&path, 3, 200).unwrap();

        assert_ne!(first, second);
        assert_eq!(hasher.delegate.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn caching_hasher_keeps_recent_digests_when_full() {
        let dir = tempfile::tempdir().unwrap();
        let hasher = CachingFileHasher::new(DefaultFileHasher, 2);
        let paths: Vec<_> = (0..3)
            .map(|i| {
                let path = dir.path().join(format!("{i}.txt"));
                std::fs::write(&path, i.to_string()).unwrap();
                path
            })
            .collect();
        for path in &paths {
            hasher.hash(path, 1, 0).unwrap();
        }
        assert!(hasher.len() <= 2);

        hasher.hash(&paths[0], 1, 0).unwrap();
        hasher.hash(&paths[1], 1, 0).unwrap();
        assert!(hasher.stats().hits >= 1, "{:?}", hasher.stats());
    }

    #[test]
    fn invalidate_all_forgets_digests() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::write(&path, b"one").unwrap();
        let hasher = CachingFileHasher::new(CountingHasher::default(), 16);

        hasher.hash(&path, 3, 100).unwrap();
        assert_eq!(hasher.len(), 1);
        hasher.invalidate_all();
        hasher.hash(&path, 3, 100).unwrap();
        assert_eq!(hasher.delegate.calls.load(Ordering::SeqCst), 2);
    }
}
