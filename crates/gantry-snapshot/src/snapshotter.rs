//! Caching snapshot façade
//!
//! Every request consults the [`FileSystemMirror`] first. On a miss the
//! producer for that path runs under a striped lock and re-checks the mirror
//! once it holds the lock, so concurrent requests for one path cause a single
//! stat and walk.

use crate::config::SnapshotterConfig;
use crate::error::{Result, SnapshotError};
use crate::excludes::DefaultExcludes;
use crate::filter::FileSystemSnapshotFilter;
use crate::guard::StripedProducerGuard;
use crate::locations::{ImmutableRoots, NoWellKnownLocations, WellKnownFileLocations};
use crate::metadata::{DefaultStat, FileMetadata, FileType, Stat};
use crate::mirror::FileSystemMirror;
use crate::predicate::SnapshottingFilter;
use crate::snapshot::FileSystemLocationSnapshot;
use crate::stats::{DirectorySnapshotterStatistics, WalkStatistics};
use crate::walker::DirectorySnapshotter;
use gantry_hash::{CachingFileHasher, ConcurrentInterner, ContentHash, DefaultFileHasher, FileHasher, StringInterner};
use std::path::Path;
use std::sync::Arc;

/// Snapshots locations, caching results in a [`FileSystemMirror`]
pub struct DefaultFileSystemSnapshotter {
    walker: DirectorySnapshotter,
    hasher: Arc<dyn FileHasher>,
    interner: Arc<dyn StringInterner>,
    stat: Arc<dyn Stat>,
    mirror: FileSystemMirror,
    producer_guard: StripedProducerGuard,
}

impl DefaultFileSystemSnapshotter {
    /// Create snapshotter from explicit collaborators
    ///
    /// # Errors
    /// Returns [`SnapshotError::Config`] if `config` is invalid
    pub fn new(
        config: &SnapshotterConfig,
        hasher: Arc<dyn FileHasher>,
        interner: Arc<dyn StringInterner>,
        stat: Arc<dyn Stat>,
        locations: Arc<dyn WellKnownFileLocations>,
    ) -> Result<Self> {
        config.validate()?;
        let walker = DirectorySnapshotter::new(
            Arc::clone(&hasher),
            Arc::clone(&interner),
            DefaultExcludes::new(&config.default_excludes),
            Arc::new(DirectorySnapshotterStatistics::new()),
        );
        let stripes = config.effective_lock_stripes();
        tracing::debug!(stripes, "creating file system snapshotter");
        Ok(Self {
            walker,
            hasher,
            interner,
            stat,
            mirror: FileSystemMirror::new(locations),
            producer_guard: StripedProducerGuard::new(stripes),
        })
    }

    /// Create snapshotter over the real file system
    ///
    /// Uses a caching Blake3 file hasher, a concurrent interner and the
    /// configured immutable roots.
    ///
    /// # Errors
    /// Returns [`SnapshotError::Config`] if `config` is invalid
    pub fn from_config(config: &SnapshotterConfig) -> Result<Self> {
        let hasher = CachingFileHasher::new(DefaultFileHasher::new(), config.file_hash_cache_capacity);
        let locations: Arc<dyn WellKnownFileLocations> = if config.immutable_roots.is_empty() {
            Arc::new(NoWellKnownLocations)
        } else {
            Arc::new(ImmutableRoots::new(config.immutable_roots.iter().cloned()))
        };
        Self::new(
            config,
            Arc::new(hasher),
            Arc::new(ConcurrentInterner::new()),
            Arc::new(DefaultStat),
            locations,
        )
    }

    /// Backing mirror, for lifecycle invalidation
    #[inline]
    #[must_use]
    pub fn mirror(&self) -> &FileSystemMirror {
        &self.mirror
    }

    /// Walk counters so far
    #[must_use]
    pub fn statistics(&self) -> WalkStatistics {
        self.walker.statistics().snapshot()
    }

    /// Snapshot of whatever is at `path`
    ///
    /// Missing locations yield a missing snapshot, not an error.
    ///
    /// # Errors
    /// Returns [`SnapshotError::Stat`] or [`SnapshotError::Hash`] if the
    /// location cannot be read, or [`SnapshotError::CouldNotReadDirectory`]
    /// if a directory walk fails
    pub fn snapshot(&self, path: &Path) -> Result<FileSystemLocationSnapshot> {
        if let Some(cached) = self.mirror.get_snapshot(path) {
            tracing::debug!(path = %path.display(), "snapshot cache hit");
            return Ok(cached);
        }
        self.producer_guard.guard_by_key(path, || {
            if let Some(cached) = self.mirror.get_snapshot(path) {
                return Ok(cached);
            }
            tracing::debug!(path = %path.display(), "snapshot cache miss");
            let metadata = self.stat(path)?;
            let snapshot = match metadata.file_type {
                FileType::Directory => self.walker.snapshot(path, None, &mut |_| {})?.snapshot,
                _ => self.snapshot_leaf(path, metadata)?,
            };
            self.mirror.put_snapshot(snapshot.clone());
            Ok(snapshot)
        })
    }

    /// Snapshot of `path` with only the entries `filter` accepts
    ///
    /// A cached unfiltered tree is filtered in memory. Otherwise the walk
    /// applies the filter; its result is cached only when nothing was
    /// filtered out, and the complete subtrees of a filtered walk are cached
    /// under their own paths.
    ///
    /// # Errors
    /// Same as [`Self::snapshot`]
    pub fn snapshot_directory_tree(
        &self,
        path: &Path,
        filter: &dyn SnapshottingFilter,
    ) -> Result<FileSystemLocationSnapshot> {
        if filter.is_empty() {
            return self.snapshot(path);
        }
        if let Some(cached) = self.mirror.get_snapshot(path) {
            return Ok(FileSystemSnapshotFilter::filter_snapshot(
                filter.as_snapshot_predicate(),
                &cached,
            ));
        }
        self.producer_guard.guard_by_key(path, || {
            if let Some(cached) = self.mirror.get_snapshot(path) {
                return Ok(FileSystemSnapshotFilter::filter_snapshot(
                    filter.as_snapshot_predicate(),
                    &cached,
                ));
            }
            let metadata = self.stat(path)?;
            if metadata.file_type != FileType::Directory {
                let snapshot = self.snapshot_leaf(path, metadata)?;
                self.mirror.put_snapshot(snapshot.clone());
                return Ok(snapshot);
            }

            let mut complete = Vec::new();
            let outcome = self.walker.snapshot(
                path,
                Some(filter.as_directory_walker_predicate()),
                &mut |snapshot| complete.push(snapshot),
            )?;
            tracing::debug!(
                path = %path.display(),
                filtered = outcome.filtered,
                cached = complete.len(),
                "filtered directory walk finished"
            );
            for snapshot in complete {
                self.mirror.put_snapshot(snapshot);
            }
            Ok(outcome.snapshot)
        })
    }

    /// Content digest of the regular file at `path`
    ///
    /// Returns `None` for directories and missing locations without walking
    /// anything.
    ///
    /// # Errors
    /// Same as [`Self::snapshot`]
    pub fn regular_file_content_hash(&self, path: &Path) -> Result<Option<ContentHash>> {
        if let Some(cached) = self.mirror.get_snapshot(path) {
            return Ok(cached.regular_file_hash());
        }
        let metadata = self.stat(path)?;
        if metadata.file_type != FileType::RegularFile {
            return Ok(None);
        }
        Ok(self.snapshot(path)?.regular_file_hash())
    }

    fn stat(&self, path: &Path) -> Result<FileMetadata> {
        if let Some(metadata) = self.mirror.get_metadata(path) {
            return Ok(metadata);
        }
        let metadata = self.stat.stat(path)?;
        self.mirror.put_metadata(path, metadata);
        Ok(metadata)
    }

    fn snapshot_leaf(&self, path: &Path, metadata: FileMetadata) -> Result<FileSystemLocationSnapshot> {
        let absolute = self.interner.intern(&path.to_string_lossy());
        let name = self.interner.intern(
            &path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default(),
        );
        if metadata.file_type != FileType::RegularFile {
            return Ok(FileSystemLocationSnapshot::missing(absolute, name, metadata.access_type));
        }
        let hash = self
            .hasher
            .hash(path, metadata.length, metadata.last_modified)
            .map_err(|source| SnapshotError::Hash {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(FileSystemLocationSnapshot::regular_file(absolute, name, hash, metadata))
    }
}

impl std::fmt::Debug for DefaultFileSystemSnapshotter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DefaultFileSystemSnapshotter")
            .field("walker", &self.walker)
            .field("mirror", &self.mirror)
            .field("stripes", &self.producer_guard.stripe_count())
            .finish_non_exhaustive()
    }
}
