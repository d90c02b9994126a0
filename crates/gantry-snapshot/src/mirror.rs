//! In-memory mirror of snapshotted locations
//!
//! Snapshots and stat results are kept in two partitions each. Locations the
//! [`WellKnownFileLocations`] classifier calls immutable survive output
//! changes; everything else is dropped whenever outputs may have changed.

use crate::locations::WellKnownFileLocations;
use crate::metadata::FileMetadata;
use crate::snapshot::FileSystemLocationSnapshot;
use dashmap::DashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Concurrent cache of snapshots and stat results keyed by absolute path
pub struct FileSystemMirror {
    locations: Arc<dyn WellKnownFileLocations>,
    mutable_snapshots: DashMap<PathBuf, FileSystemLocationSnapshot>,
    immutable_snapshots: DashMap<PathBuf, FileSystemLocationSnapshot>,
    mutable_metadata: DashMap<PathBuf, FileMetadata>,
    immutable_metadata: DashMap<PathBuf, FileMetadata>,
}

impl FileSystemMirror {
    /// Create empty mirror partitioned by `locations`
    pub fn new(locations: Arc<dyn WellKnownFileLocations>) -> Self {
        Self {
            locations,
            mutable_snapshots: DashMap::new(),
            immutable_snapshots: DashMap::new(),
            mutable_metadata: DashMap::new(),
            immutable_metadata: DashMap::new(),
        }
    }

    fn snapshots_for(&self, path: &Path) -> &DashMap<PathBuf, FileSystemLocationSnapshot> {
        if self.locations.is_immutable(path) {
            &self.immutable_snapshots
        } else {
            &self.mutable_snapshots
        }
    }

    fn metadata_for(&self, path: &Path) -> &DashMap<PathBuf, FileMetadata> {
        if self.locations.is_immutable(path) {
            &self.immutable_metadata
        } else {
            &self.mutable_metadata
        }
    }

    /// Cached snapshot of `path`
    #[must_use]
    pub fn get_snapshot(&self, path: &Path) -> Option<FileSystemLocationSnapshot> {
        self.snapshots_for(path)
            .get(path)
            .map(|entry| entry.value().clone())
    }

    /// Cache `snapshot` under its own absolute path
    pub fn put_snapshot(&self, snapshot: FileSystemLocationSnapshot) {
        let path = PathBuf::from(snapshot.absolute_path().as_ref());
        self.snapshots_for(&path).insert(path, snapshot);
    }

    /// Cached stat result of `path`
    #[must_use]
    pub fn get_metadata(&self, path: &Path) -> Option<FileMetadata> {
        self.metadata_for(path).get(path).map(|entry| *entry.value())
    }

    /// Cache a stat result
    pub fn put_metadata(&self, path: &Path, metadata: FileMetadata) {
        self.metadata_for(path).insert(path.to_path_buf(), metadata);
    }

    /// Outputs may have changed anywhere
    pub fn before_output_change(&self) {
        tracing::debug!(
            snapshots = self.mutable_snapshots.len(),
            metadata = self.mutable_metadata.len(),
            "invalidating mutable file system mirror"
        );
        self.mutable_snapshots.clear();
        self.mutable_metadata.clear();
    }

    /// Outputs may have changed at `affected` paths
    ///
    /// Drops every mutable entry at, above or below an affected path.
    pub fn before_output_change_for<I, P>(&self, affected: I)
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let affected: Vec<P> = affected.into_iter().collect();
        let overlaps = |key: &PathBuf| {
            affected.iter().any(|changed| {
                let changed = changed.as_ref();
                key.starts_with(changed) || changed.starts_with(key)
            })
        };
        self.mutable_snapshots.retain(|key, _| !overlaps(key));
        self.mutable_metadata.retain(|key, _| !overlaps(key));
    }

    /// The build is over; nothing may be trusted any more
    pub fn before_build_finished(&self) {
        tracing::debug!("invalidating whole file system mirror");
        self.mutable_snapshots.clear();
        self.immutable_snapshots.clear();
        self.mutable_metadata.clear();
        self.immutable_metadata.clear();
    }

    /// Number of cached snapshots across both partitions
    #[must_use]
    pub fn snapshot_count(&self) -> usize {
        self.mutable_snapshots.len() + self.immutable_snapshots.len()
    }

    /// Number of cached stat results across both partitions
    #[must_use]
    pub fn metadata_count(&self) -> usize {
        self.mutable_metadata.len() + self.immutable_metadata.len()
    }
}

impl fmt::Debug for FileSystemMirror {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileSystemMirror")
            .field("mutable_snapshots", &self.mutable_snapshots.len())
            .field("immutable_snapshots", &self.immutable_snapshots.len())
            .field("mutable_metadata", &self.mutable_metadata.len())
            .field("immutable_metadata", &self.immutable_metadata.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locations::ImmutableRoots;
    use crate::metadata::AccessType;

    fn missing(path: &str) -> FileSystemLocationSnapshot {
        let name = path.rsplit('/').next().unwrap_or(path);
        FileSystemLocationSnapshot::missing(Arc::from(path), Arc::from(name), AccessType::Direct)
    }

    fn mirror() -> FileSystemMirror {
        FileSystemMirror::new(Arc::new(ImmutableRoots::new(["/cache"])))
    }

    #[test]
    fn put_and_get_by_absolute_path() {
        let mirror = mirror();
        let snapshot = missing("/work/a");
        mirror.put_snapshot(snapshot.clone());
        let cached = mirror.get_snapshot(Path::new("/work/a")).unwrap();
        assert!(cached.ptr_eq(&snapshot));
        assert!(mirror.get_snapshot(Path::new("/work/b")).is_none());
    }

    #[test]
    fn output_change_keeps_immutable_partition() {
        let mirror = mirror();
        mirror.put_snapshot(missing("/work/a"));
        mirror.put_snapshot(missing("/cache/lib.jar"));
        mirror.put_metadata(Path::new("/work/a"), FileMetadata::missing(AccessType::Direct));
        mirror.put_metadata(Path::new("/cache/lib.jar"), FileMetadata::missing(AccessType::Direct));

        mirror.before_output_change();

        assert!(mirror.get_snapshot(Path::new("/work/a")).is_none());
        assert!(mirror.get_snapshot(Path::new("/cache/lib.jar")).is_some());
        assert!(mirror.get_metadata(Path::new("/work/a")).is_none());
        assert!(mirror.get_metadata(Path::new("/cache/lib.jar")).is_some());
    }

    #[test]
    fn selective_invalidation_drops_ancestors_and_descendants() {
        let mirror = mirror();
        for path in ["/work", "/work/out", "/work/out/a.class", "/work/src", "/cache/out"] {
            mirror.put_snapshot(missing(path));
        }

        mirror.before_output_change_for(["/work/out"]);

        assert!(mirror.get_snapshot(Path::new("/work")).is_none());
        assert!(mirror.get_snapshot(Path::new("/work/out")).is_none());
        assert!(mirror.get_snapshot(Path::new("/work/out/a.class")).is_none());
        assert!(mirror.get_snapshot(Path::new("/work/src")).is_some());
        assert!(mirror.get_snapshot(Path::new("/cache/out")).is_some());
    }

    #[test]
    fn build_finished_clears_everything() {
        let mirror = mirror();
        mirror.put_snapshot(missing("/work/a"));
        mirror.put_snapshot(missing("/cache/b"));
        mirror.before_build_finished();
        assert_eq!(mirror.snapshot_count(), 0);
    }
}
