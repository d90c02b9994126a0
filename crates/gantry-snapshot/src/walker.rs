//! Recursive directory walk producing a snapshot tree
//!
//! The walk never follows symlinks implicitly. A symlink to a directory is
//! entered explicitly as a new frame whose reads go to the link's canonical
//! target while every produced path stays on the link side. A frame is only
//! opened when its canonical path is not already open further up, which keeps
//! symlink cycles finite.

use crate::builder::{DirectorySnapshotBuilder, FilteredTrackingMerkleDirectorySnapshotBuilder};
use crate::error::{Result, SnapshotError};
use crate::excludes::DefaultExcludes;
use crate::metadata::{classify, stat_path, AccessType, FileType};
use crate::predicate::DirectoryWalkerPredicate;
use crate::snapshot::FileSystemLocationSnapshot;
use crate::stats::DirectorySnapshotterStatistics;
use gantry_hash::{FileHasher, StringInterner};
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Result of one walk
#[derive(Debug, Clone)]
pub struct WalkOutcome {
    /// Root of the produced tree
    pub snapshot: FileSystemLocationSnapshot,
    /// Whether the predicate rejected at least one entry
    pub filtered: bool,
}

/// Walks directory trees into snapshots
pub struct DirectorySnapshotter {
    hasher: Arc<dyn FileHasher>,
    interner: Arc<dyn StringInterner>,
    excludes: DefaultExcludes,
    statistics: Arc<DirectorySnapshotterStatistics>,
}

impl DirectorySnapshotter {
    /// Create walker
    pub fn new(
        hasher: Arc<dyn FileHasher>,
        interner: Arc<dyn StringInterner>,
        excludes: DefaultExcludes,
        statistics: Arc<DirectorySnapshotterStatistics>,
    ) -> Self {
        Self {
            hasher,
            interner,
            excludes,
            statistics,
        }
    }

    /// Shared counters
    #[inline]
    #[must_use]
    pub fn statistics(&self) -> &Arc<DirectorySnapshotterStatistics> {
        &self.statistics
    }

    /// Snapshot everything below `root`
    ///
    /// `unfiltered_consumer` receives the whole result when `predicate`
    /// rejected nothing; otherwise it receives every complete subtree of the
    /// filtered result, so callers can cache those under their own paths.
    ///
    /// # Errors
    /// Returns [`SnapshotError::CouldNotReadDirectory`] if the root or a
    /// nested directory cannot be listed for a reason other than missing
    /// permissions, and [`SnapshotError::Stat`] if the root cannot be
    /// classified.
    pub fn snapshot(
        &self,
        root: &Path,
        predicate: Option<&dyn DirectoryWalkerPredicate>,
        unfiltered_consumer: &mut dyn FnMut(FileSystemLocationSnapshot),
    ) -> Result<WalkOutcome> {
        self.statistics.record_walk();
        let root_metadata = stat_path(root).map_err(|source| SnapshotError::Stat {
            path: root.to_path_buf(),
            source,
        })?;
        let root_name = self.interner.intern(&file_name(root));
        let root_absolute = self.interner.intern(&root.to_string_lossy());

        let outcome = match root_metadata.file_type {
            FileType::Missing => WalkOutcome {
                snapshot: FileSystemLocationSnapshot::missing(
                    root_absolute,
                    root_name,
                    root_metadata.access_type,
                ),
                filtered: false,
            },
            FileType::RegularFile => {
                let metadata = fs::metadata(root).map_err(|source| SnapshotError::Stat {
                    path: root.to_path_buf(),
                    source,
                })?;
                let mut visitor = PathVisitor::new(self, predicate, &mut *unfiltered_consumer);
                let snapshot = visitor.snapshot_file(
                    root,
                    root_absolute,
                    root_name,
                    &metadata,
                    root_metadata.access_type,
                );
                WalkOutcome {
                    snapshot,
                    filtered: false,
                }
            }
            FileType::Directory => {
                let canonical = fs::canonicalize(root).map_err(|source| {
                    SnapshotError::CouldNotReadDirectory {
                        path: root.to_path_buf(),
                        source,
                    }
                })?;
                let mut visitor = PathVisitor::new(self, predicate, &mut *unfiltered_consumer);
                visitor.walk(root, canonical, root_name, root_metadata.access_type)?
            }
        };

        if !outcome.filtered {
            unfiltered_consumer(outcome.snapshot.clone());
        }
        tracing::debug!(
            root = %root.display(),
            filtered = outcome.filtered,
            statistics = %self.statistics.snapshot(),
            "directory walk finished"
        );
        Ok(outcome)
    }
}

impl std::fmt::Debug for DirectorySnapshotter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectorySnapshotter")
            .field("excludes", &self.excludes)
            .field("statistics", &self.statistics.snapshot())
            .finish_non_exhaustive()
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// One open directory of the walk
struct OpenDirectory {
    /// Path reported in snapshots
    logical_path: PathBuf,
    /// Path actually read
    physical_path: PathBuf,
    /// Resolved path used for cycle detection
    canonical_path: PathBuf,
    via_symlink: bool,
    pushed_segment: bool,
    entries: std::vec::IntoIter<OsString>,
}

struct PathVisitor<'a, C> {
    snapshotter: &'a DirectorySnapshotter,
    predicate: Option<&'a dyn DirectoryWalkerPredicate>,
    builder: FilteredTrackingMerkleDirectorySnapshotBuilder<C>,
    stack: Vec<OpenDirectory>,
    segments: Vec<Arc<str>>,
}

impl<'a, C: FnMut(FileSystemLocationSnapshot)> PathVisitor<'a, C> {
    fn new(
        snapshotter: &'a DirectorySnapshotter,
        predicate: Option<&'a dyn DirectoryWalkerPredicate>,
        consumer: C,
    ) -> Self {
        Self {
            snapshotter,
            predicate,
            builder: FilteredTrackingMerkleDirectorySnapshotBuilder::new(consumer),
            stack: Vec::new(),
            segments: Vec::new(),
        }
    }

    fn walk(
        mut self,
        root: &Path,
        canonical: PathBuf,
        name: Arc<str>,
        access_type: AccessType,
    ) -> Result<WalkOutcome> {
        let entries = read_entries(&canonical).map_err(|source| SnapshotError::CouldNotReadDirectory {
            path: root.to_path_buf(),
            source,
        })?;
        self.push_directory(
            root.to_path_buf(),
            canonical.clone(),
            canonical,
            name,
            access_type == AccessType::ViaSymlink,
            false,
            entries,
        );

        while let Some(top) = self.stack.last_mut() {
            match top.entries.next() {
                Some(entry) => self.visit_child(&entry)?,
                None => {
                    if let Some(closed) = self.stack.pop() {
                        if closed.pushed_segment {
                            self.segments.pop();
                        }
                    }
                    self.builder.leave_directory();
                }
            }
        }

        let filtered = !self.builder.is_current_level_unfiltered();
        let snapshot = self.builder.into_result().ok_or_else(|| SnapshotError::CouldNotReadDirectory {
            path: root.to_path_buf(),
            source: io::Error::new(io::ErrorKind::Other, "walk produced no snapshot"),
        })?;
        Ok(WalkOutcome { snapshot, filtered })
    }

    #[allow(clippy::too_many_arguments)]
    fn push_directory(
        &mut self,
        logical_path: PathBuf,
        physical_path: PathBuf,
        canonical_path: PathBuf,
        name: Arc<str>,
        via_symlink: bool,
        pushed_segment: bool,
        entries: Vec<OsString>,
    ) {
        self.snapshotter.statistics.record_directory();
        let absolute = self.snapshotter.interner.intern(&logical_path.to_string_lossy());
        self.builder
            .enter_directory(AccessType::via_symlink(via_symlink), absolute, Arc::clone(&name));
        if pushed_segment {
            self.segments.push(name);
        }
        self.stack.push(OpenDirectory {
            logical_path,
            physical_path,
            canonical_path,
            via_symlink,
            pushed_segment,
            entries: entries.into_iter(),
        });
    }

    fn visit_child(&mut self, entry: &OsString) -> Result<()> {
        let Some(parent) = self.stack.last() else {
            return Ok(());
        };
        let physical = parent.physical_path.join(entry);
        let logical = parent.logical_path.join(entry);
        let canonical = parent.canonical_path.join(entry);
        let parent_via_symlink = parent.via_symlink;
        let name = self.snapshotter.interner.intern(&entry.to_string_lossy());

        let link_metadata = match fs::symlink_metadata(&physical) {
            Ok(metadata) => metadata,
            Err(error) => {
                if self.should_visit(&logical, &name, false) {
                    self.record_unreadable(&logical, name, AccessType::via_symlink(parent_via_symlink), &error);
                }
                return Ok(());
            }
        };

        if link_metadata.file_type().is_symlink() {
            self.snapshotter.statistics.record_symlink();
            return self.visit_symlink(&physical, logical, name);
        }

        if link_metadata.is_dir() {
            if self.should_visit(&logical, &name, true) {
                self.enter_child_directory(logical, physical, canonical, name, parent_via_symlink)?;
            }
            return Ok(());
        }

        if self.should_visit(&logical, &name, false) {
            let absolute = self.snapshotter.interner.intern(&logical.to_string_lossy());
            let snapshot = self.snapshot_file(
                &physical,
                absolute,
                name,
                &link_metadata,
                AccessType::via_symlink(parent_via_symlink),
            );
            self.builder.visit_entry(snapshot);
        }
        Ok(())
    }

    fn visit_symlink(&mut self, physical: &Path, logical: PathBuf, name: Arc<str>) -> Result<()> {
        let target_metadata = match fs::metadata(physical) {
            Ok(metadata) => metadata,
            Err(_) => {
                if self.should_visit(&logical, &name, false) {
                    let absolute = self.snapshotter.interner.intern(&logical.to_string_lossy());
                    self.builder.visit_entry(FileSystemLocationSnapshot::missing(
                        absolute,
                        name,
                        AccessType::ViaSymlink,
                    ));
                }
                return Ok(());
            }
        };

        if !target_metadata.is_dir() {
            if self.should_visit(&logical, &name, false) {
                let absolute = self.snapshotter.interner.intern(&logical.to_string_lossy());
                let snapshot =
                    self.snapshot_file(physical, absolute, name, &target_metadata, AccessType::ViaSymlink);
                self.builder.visit_entry(snapshot);
            }
            return Ok(());
        }

        let target = match fs::canonicalize(physical) {
            Ok(target) => target,
            Err(error) => {
                if self.should_visit(&logical, &name, true) {
                    self.record_unreadable(&logical, name, AccessType::ViaSymlink, &error);
                }
                return Ok(());
            }
        };
        if self.introduces_cycle(&target) {
            tracing::debug!(
                path = %logical.display(),
                target = %target.display(),
                "skipping symlink back into an open ancestor"
            );
            return Ok(());
        }
        if self.should_visit(&logical, &name, true) {
            self.enter_child_directory(logical, target.clone(), target, name, true)?;
        }
        Ok(())
    }

    fn enter_child_directory(
        &mut self,
        logical: PathBuf,
        physical: PathBuf,
        canonical: PathBuf,
        name: Arc<str>,
        via_symlink: bool,
    ) -> Result<()> {
        match read_entries(&physical) {
            Ok(entries) => {
                self.push_directory(logical, physical, canonical, name, via_symlink, true, entries);
                Ok(())
            }
            Err(error) if error.kind() == io::ErrorKind::PermissionDenied => {
                self.record_unreadable(&logical, name, AccessType::via_symlink(via_symlink), &error);
                Ok(())
            }
            Err(source) => Err(SnapshotError::CouldNotReadDirectory {
                path: logical,
                source,
            }),
        }
    }

    fn introduces_cycle(&self, target: &Path) -> bool {
        self.stack.iter().any(|open| open.canonical_path == target)
    }

    /// Applies default excludes, then the predicate.
    ///
    /// Only predicate rejections mark the walk as filtered.
    fn should_visit(&mut self, logical: &Path, name: &Arc<str>, is_directory: bool) -> bool {
        let excludes = &self.snapshotter.excludes;
        let excluded = if is_directory {
            excludes.exclude_dir(name)
        } else {
            excludes.exclude_file(name)
        };
        if excluded {
            return false;
        }
        let Some(predicate) = self.predicate else {
            return true;
        };
        self.segments.push(Arc::clone(name));
        let allowed = predicate.test(logical, name, is_directory, &self.segments);
        self.segments.pop();
        if !allowed {
            self.builder.mark_current_level_as_filtered();
        }
        allowed
    }

    fn snapshot_file(
        &mut self,
        physical: &Path,
        absolute: Arc<str>,
        name: Arc<str>,
        metadata: &fs::Metadata,
        access_type: AccessType,
    ) -> FileSystemLocationSnapshot {
        let file_metadata = classify(metadata, access_type);
        if file_metadata.file_type != FileType::RegularFile {
            return FileSystemLocationSnapshot::missing(absolute, name, access_type);
        }
        match self
            .snapshotter
            .hasher
            .hash(physical, file_metadata.length, file_metadata.last_modified)
        {
            Ok(hash) => {
                self.snapshotter.statistics.record_file();
                FileSystemLocationSnapshot::regular_file(absolute, name, hash, file_metadata)
            }
            Err(error) => {
                tracing::info!(path = %absolute, %error, "could not hash file, recording as missing");
                FileSystemLocationSnapshot::missing(absolute, name, access_type)
            }
        }
    }

    fn record_unreadable(&mut self, logical: &Path, name: Arc<str>, access_type: AccessType, error: &io::Error) {
        tracing::info!(path = %logical.display(), %error, "could not read entry, recording as missing");
        let absolute = self.snapshotter.interner.intern(&logical.to_string_lossy());
        self.builder
            .visit_entry(FileSystemLocationSnapshot::missing(absolute, name, access_type));
    }
}

fn read_entries(directory: &Path) -> io::Result<Vec<OsString>> {
    fs::read_dir(directory)?
        .map(|entry| entry.map(|e| e.file_name()))
        .collect()
}
