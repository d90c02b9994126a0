//! Filters applied while walking or to finished snapshots
//!
//! Both predicate flavours see the entry's path relative to the snapshot root
//! as a list of segments. The root's own name is never part of it, and entries
//! under a followed symlink see the symlink-side path.

use crate::metadata::FileType;
use crate::snapshot::FileSystemLocationSnapshot;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Decides which entries a directory walk descends into or records
pub trait DirectoryWalkerPredicate: Send + Sync {
    /// Check if the entry is kept
    ///
    /// `path` is the logical path of the entry: below a followed symlink it
    /// lies under the link, not under the link's target, matching the paths
    /// recorded in the snapshot. `relative_path` holds the segments from the
    /// walk root down to and including `name`.
    fn test(&self, path: &Path, name: &str, is_directory: bool, relative_path: &[Arc<str>]) -> bool;
}

/// Decides which nodes of a finished snapshot are kept
pub trait SnapshotPredicate: Send + Sync {
    /// Check if the node is kept
    fn test(&self, snapshot: &FileSystemLocationSnapshot, relative_path: &[Arc<str>]) -> bool;
}

/// A filter usable both during a walk and on a finished snapshot
pub trait SnapshottingFilter: Send + Sync {
    /// Check if the filter accepts everything
    fn is_empty(&self) -> bool;

    /// View as a walk predicate
    fn as_directory_walker_predicate(&self) -> &dyn DirectoryWalkerPredicate;

    /// View as a snapshot predicate
    fn as_snapshot_predicate(&self) -> &dyn SnapshotPredicate;
}

type SegmentTest = dyn Fn(&[Arc<str>], bool) -> bool + Send + Sync;

/// Filter over relative path segments
///
/// ```
/// use gantry_snapshot::{PathFilter, SnapshottingFilter};
///
/// let only_rust = PathFilter::new(|segments, is_dir| {
///     is_dir || segments.last().is_some_and(|name| name.ends_with(".rs"))
/// });
/// assert!(!only_rust.is_empty());
/// assert!(PathFilter::accept_all().is_empty());
/// ```
#[derive(Clone)]
pub struct PathFilter {
    test: Option<Arc<SegmentTest>>,
}

impl PathFilter {
    /// Filter keeping entries for which `test(relative_segments, is_directory)` holds
    pub fn new<F>(test: F) -> Self
    where
        F: Fn(&[Arc<str>], bool) -> bool + Send + Sync + 'static,
    {
        Self {
            test: Some(Arc::new(test)),
        }
    }

    /// Filter keeping everything
    #[inline]
    #[must_use]
    pub fn accept_all() -> Self {
        Self { test: None }
    }

    fn accepts(&self, relative_path: &[Arc<str>], is_directory: bool) -> bool {
        self.test
            .as_ref()
            .map_or(true, |test| test(relative_path, is_directory))
    }
}

impl Default for PathFilter {
    fn default() -> Self {
        Self::accept_all()
    }
}

impl fmt::Debug for PathFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PathFilter")
            .field("accept_all", &self.test.is_none())
            .finish()
    }
}

impl DirectoryWalkerPredicate for PathFilter {
    fn test(&self, _path: &Path, _name: &str, is_directory: bool, relative_path: &[Arc<str>]) -> bool {
        self.accepts(relative_path, is_directory)
    }
}

impl SnapshotPredicate for PathFilter {
    fn test(&self, snapshot: &FileSystemLocationSnapshot, relative_path: &[Arc<str>]) -> bool {
        self.accepts(relative_path, snapshot.file_type() == FileType::Directory)
    }
}

impl SnapshottingFilter for PathFilter {
    fn is_empty(&self) -> bool {
        self.test.is_none()
    }

    fn as_directory_walker_predicate(&self) -> &dyn DirectoryWalkerPredicate {
        self
    }

    fn as_snapshot_predicate(&self) -> &dyn SnapshotPredicate {
        self
    }
}
