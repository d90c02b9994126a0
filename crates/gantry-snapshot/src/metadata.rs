//! File metadata and the `stat` collaborator

use crate::error::SnapshotError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;
use std::time::UNIX_EPOCH;

/// How a location was reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccessType {
    /// Reached without following a symbolic link
    Direct,
    /// Reached through at least one symbolic link
    ViaSymlink,
}

impl AccessType {
    /// `ViaSymlink` when `via_symlink` holds, `Direct` otherwise
    #[inline]
    #[must_use]
    pub fn via_symlink(via_symlink: bool) -> Self {
        if via_symlink {
            Self::ViaSymlink
        } else {
            Self::Direct
        }
    }
}

/// Kind of a location
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FileType {
    /// A regular file
    RegularFile,
    /// A directory
    Directory,
    /// Nothing (or nothing readable) at the path
    Missing,
}

/// Lightweight result of a `stat` call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileMetadata {
    /// Kind of the location
    pub file_type: FileType,
    /// Length in bytes, zero for non-files
    pub length: u64,
    /// Modification time in milliseconds since the epoch, zero for non-files
    pub last_modified: i64,
    /// Whether a symlink was followed
    pub access_type: AccessType,
}

impl FileMetadata {
    /// Metadata of a regular file
    #[inline]
    #[must_use]
    pub fn file(length: u64, last_modified: i64, access_type: AccessType) -> Self {
        Self {
            file_type: FileType::RegularFile,
            length,
            last_modified,
            access_type,
        }
    }

    /// Metadata of a directory
    #[inline]
    #[must_use]
    pub fn directory(access_type: AccessType) -> Self {
        Self {
            file_type: FileType::Directory,
            length: 0,
            last_modified: 0,
            access_type,
        }
    }

    /// Metadata of a missing location
    #[inline]
    #[must_use]
    pub fn missing(access_type: AccessType) -> Self {
        Self {
            file_type: FileType::Missing,
            length: 0,
            last_modified: 0,
            access_type,
        }
    }
}

/// Classifies a path as file, directory or missing
pub trait Stat: Send + Sync {
    /// Metadata of `path`, following symbolic links
    ///
    /// # Errors
    /// Returns [`SnapshotError::Stat`] for I/O failures other than the path
    /// not existing
    fn stat(&self, path: &Path) -> Result<FileMetadata, SnapshotError>;
}

/// `Stat` over the real file system
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultStat;

impl Stat for DefaultStat {
    fn stat(&self, path: &Path) -> Result<FileMetadata, SnapshotError> {
        stat_path(path).map_err(|source| SnapshotError::Stat {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Follows a symlink at `path` if there is one and classifies the target.
///
/// A dangling symlink is reported as missing via symlink. Sockets, pipes and
/// devices have no content to snapshot and are reported as missing.
pub(crate) fn stat_path(path: &Path) -> io::Result<FileMetadata> {
    let link_metadata = match fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Ok(FileMetadata::missing(AccessType::Direct));
        }
        Err(e) => return Err(e),
    };

    if !link_metadata.file_type().is_symlink() {
        return Ok(classify(&link_metadata, AccessType::Direct));
    }

    match fs::metadata(path) {
        Ok(target) => Ok(classify(&target, AccessType::ViaSymlink)),
        Err(_) => Ok(FileMetadata::missing(AccessType::ViaSymlink)),
    }
}

pub(crate) fn classify(metadata: &fs::Metadata, access_type: AccessType) -> FileMetadata {
    if metadata.is_dir() {
        FileMetadata::directory(access_type)
    } else if metadata.is_file() {
        FileMetadata::file(metadata.len(), last_modified_millis(metadata), access_type)
    } else {
        FileMetadata::missing(access_type)
    }
}

pub(crate) fn last_modified_millis(metadata: &fs::Metadata) -> i64 {
    metadata
        .modified()
        .ok()
        .and_then(|time| time.duration_since(UNIX_EPOCH).ok())
        .map_or(0, |d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stat_classifies_file_and_directory() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.txt");
        fs::write(&file, b"12345").unwrap();

        let file_meta = DefaultStat.stat(&file).unwrap();
        assert_eq!(file_meta.file_type, FileType::RegularFile);
        assert_eq!(file_meta.length, 5);
        assert_eq!(file_meta.access_type, AccessType::Direct);

        let dir_meta = DefaultStat.stat(dir.path()).unwrap();
        assert_eq!(dir_meta.file_type, FileType::Directory);
    }

    #[test]
    fn stat_reports_missing_without_error() {
        let dir = tempfile::tempdir().unwrap();
        let meta = DefaultStat.stat(&dir.path().join("nope")).unwrap();
        assert_eq!(meta, FileMetadata::missing(AccessType::Direct));
    }

    #[cfg(unix)]
    #[test]
    fn stat_follows_symlinks() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("target.txt");
        fs::write(&target, b"x").unwrap();
        let link = dir.path().join("link");
        std::os::unix::fs::symlink(&target, &link).unwrap();
        let dangling = dir.path().join("dangling");
        std::os::unix::fs::symlink(dir.path().join("gone"), &dangling).unwrap();

        let meta = DefaultStat.stat(&link).unwrap();
        assert_eq!(meta.file_type, FileType::RegularFile);
        assert_eq!(meta.access_type, AccessType::ViaSymlink);

        let meta = DefaultStat.stat(&dangling).unwrap();
        assert_eq!(meta, FileMetadata::missing(AccessType::ViaSymlink));
    }
}
