//! Walk statistics

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters shared by every walk of one snapshotter
#[derive(Debug, Default)]
pub struct DirectorySnapshotterStatistics {
    walks: AtomicU64,
    directories: AtomicU64,
    files: AtomicU64,
    symlinks: AtomicU64,
}

impl DirectorySnapshotterStatistics {
    /// Create zeroed counters
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_walk(&self) {
        self.walks.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_directory(&self) {
        self.directories.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_file(&self) {
        self.files.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_symlink(&self) {
        self.symlinks.fetch_add(1, Ordering::Relaxed);
    }

    /// Current values
    #[must_use]
    pub fn snapshot(&self) -> WalkStatistics {
        WalkStatistics {
            walks: self.walks.load(Ordering::Relaxed),
            directories: self.directories.load(Ordering::Relaxed),
            files: self.files.load(Ordering::Relaxed),
            symlinks: self.symlinks.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`DirectorySnapshotterStatistics`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalkStatistics {
    /// Directory hierarchies walked
    pub walks: u64,
    /// Directories entered
    pub directories: u64,
    /// Regular files snapshotted
    pub files: u64,
    /// Symbolic links followed
    pub symlinks: u64,
}

impl fmt::Display for WalkStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} walks, {} directories, {} files, {} symlinks",
            self.walks, self.directories, self.files, self.symlinks
        )
    }
}
