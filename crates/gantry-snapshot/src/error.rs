//! Error types for snapshotting
//!
//! Per-entry read failures inside a walk never surface here; they become
//! missing snapshots. What does surface is fatal for the request that hit it.

use std::io;
use std::path::PathBuf;

/// Snapshotting error
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    /// Listing a directory's children failed
    #[error("could not read directory {}: {source}", path.display())]
    CouldNotReadDirectory {
        /// Directory being listed
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// Classifying a path failed for a reason other than it being absent
    #[error("could not stat {}: {source}", path.display())]
    Stat {
        /// Path being classified
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// Reading a regular file for hashing failed
    #[error("could not hash {}: {source}", path.display())]
    Hash {
        /// File being hashed
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// Invalid snapshotter configuration
    #[error("invalid snapshotter configuration: {reason}")]
    Config {
        /// What was wrong
        reason: String,
    },
}

impl SnapshotError {
    /// Check if the error aborts the whole request
    ///
    /// Only directory listing failures do; stat and hash failures on a single
    /// location can be retried once the location settles.
    #[inline]
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::CouldNotReadDirectory { .. } | Self::Config { .. })
    }

    /// Path the error is about, if any
    #[must_use]
    pub fn path(&self) -> Option<&std::path::Path> {
        match self {
            Self::CouldNotReadDirectory { path, .. }
            | Self::Stat { path, .. }
            | Self::Hash { path, .. } => Some(path),
            Self::Config { .. } => None,
        }
    }
}

/// Result alias for snapshotting
pub type Result<T> = std::result::Result<T, SnapshotError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directory_errors_name_the_path() {
        let err = SnapshotError::CouldNotReadDirectory {
            path: PathBuf::from("/tmp/project"),
            source: io::Error::from(io::ErrorKind::Other),
        };
        assert!(err.to_string().contains("/tmp/project"));
        assert!(err.is_fatal());
        assert_eq!(err.path(), Some(std::path::Path::new("/tmp/project")));
    }

    #[test]
    fn hash_errors_are_not_fatal() {
        let err = SnapshotError::Hash {
            path: PathBuf::from("/tmp/a.txt"),
            source: io::Error::from(io::ErrorKind::PermissionDenied),
        };
        assert!(!err.is_fatal());
    }
}
