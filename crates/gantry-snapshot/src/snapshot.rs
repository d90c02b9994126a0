//! Immutable snapshot trees
//!
//! A [`FileSystemLocationSnapshot`] is one of a regular file, a directory or a
//! missing location. Nodes are reference counted, so cloning a snapshot is
//! cheap and two handles can be compared for identity with
//! [`FileSystemLocationSnapshot::ptr_eq`].

use crate::metadata::{AccessType, FileMetadata, FileType};
use gantry_hash::ContentHash;
use once_cell::sync::Lazy;
use std::sync::Arc;

static MISSING_FILE_SIGNATURE: Lazy<ContentHash> =
    Lazy::new(|| ContentHash::signature("missing-file"));

/// Snapshot of a regular file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegularFileSnapshot {
    /// Absolute path as seen by the caller (symlink side, not target side)
    pub absolute_path: Arc<str>,
    /// File name
    pub name: Arc<str>,
    /// Digest of the file's bytes
    pub content_hash: ContentHash,
    /// Length, modification time and access type
    pub metadata: FileMetadata,
}

/// Snapshot of a directory and everything below it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectorySnapshot {
    /// Absolute path as seen by the caller
    pub absolute_path: Arc<str>,
    /// Directory name
    pub name: Arc<str>,
    /// Whether a symlink was followed to get here
    pub access_type: AccessType,
    /// Merkle digest over the children's names and digests
    pub merkle_hash: ContentHash,
    /// Children, sorted by name when built from a walk
    pub children: Vec<FileSystemLocationSnapshot>,
}

/// Snapshot of a location with no readable content
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingFileSnapshot {
    /// Absolute path as seen by the caller
    pub absolute_path: Arc<str>,
    /// Last path segment
    pub name: Arc<str>,
    /// Whether a symlink was followed to get here
    pub access_type: AccessType,
}

/// A node of a snapshot tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileSystemLocationSnapshot {
    /// A regular file
    RegularFile(Arc<RegularFileSnapshot>),
    /// A directory
    Directory(Arc<DirectorySnapshot>),
    /// Nothing at the path, or content that could not be read
    Missing(Arc<MissingFileSnapshot>),
}

impl FileSystemLocationSnapshot {
    /// Snapshot of a regular file
    #[must_use]
    pub fn regular_file(
        absolute_path: Arc<str>,
        name: Arc<str>,
        content_hash: ContentHash,
        metadata: FileMetadata,
    ) -> Self {
        Self::RegularFile(Arc::new(RegularFileSnapshot {
            absolute_path,
            name,
            content_hash,
            metadata,
        }))
    }

    /// Snapshot of a directory with a precomputed Merkle digest
    #[must_use]
    pub fn directory(
        absolute_path: Arc<str>,
        name: Arc<str>,
        access_type: AccessType,
        merkle_hash: ContentHash,
        children: Vec<FileSystemLocationSnapshot>,
    ) -> Self {
        Self::Directory(Arc::new(DirectorySnapshot {
            absolute_path,
            name,
            access_type,
            merkle_hash,
            children,
        }))
    }

    /// Snapshot of a missing location
    #[must_use]
    pub fn missing(absolute_path: Arc<str>, name: Arc<str>, access_type: AccessType) -> Self {
        Self::Missing(Arc::new(MissingFileSnapshot {
            absolute_path,
            name,
            access_type,
        }))
    }

    /// Absolute path of the node
    #[must_use]
    pub fn absolute_path(&self) -> &Arc<str> {
        match self {
            Self::RegularFile(file) => &file.absolute_path,
            Self::Directory(dir) => &dir.absolute_path,
            Self::Missing(missing) => &missing.absolute_path,
        }
    }

    /// Last path segment of the node
    #[must_use]
    pub fn name(&self) -> &Arc<str> {
        match self {
            Self::RegularFile(file) => &file.name,
            Self::Directory(dir) => &dir.name,
            Self::Missing(missing) => &missing.name,
        }
    }

    /// Content digest of a file, Merkle digest of a directory, or the fixed
    /// missing-file signature
    #[must_use]
    pub fn hash(&self) -> ContentHash {
        match self {
            Self::RegularFile(file) => file.content_hash,
            Self::Directory(dir) => dir.merkle_hash,
            Self::Missing(_) => *MISSING_FILE_SIGNATURE,
        }
    }

    /// Kind of the node
    #[inline]
    #[must_use]
    pub fn file_type(&self) -> FileType {
        match self {
            Self::RegularFile(_) => FileType::RegularFile,
            Self::Directory(_) => FileType::Directory,
            Self::Missing(_) => FileType::Missing,
        }
    }

    /// How the node was reached
    #[must_use]
    pub fn access_type(&self) -> AccessType {
        match self {
            Self::RegularFile(file) => file.metadata.access_type,
            Self::Directory(dir) => dir.access_type,
            Self::Missing(missing) => missing.access_type,
        }
    }

    /// Children of a directory, empty for other nodes
    #[must_use]
    pub fn children(&self) -> &[FileSystemLocationSnapshot] {
        match self {
            Self::Directory(dir) => &dir.children,
            _ => &[],
        }
    }

    /// Content digest if this is a regular file
    #[must_use]
    pub fn regular_file_hash(&self) -> Option<ContentHash> {
        match self {
            Self::RegularFile(file) => Some(file.content_hash),
            _ => None,
        }
    }

    /// Check if both handles point at the same node
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::RegularFile(a), Self::RegularFile(b)) => Arc::ptr_eq(a, b),
            (Self::Directory(a), Self::Directory(b)) => Arc::ptr_eq(a, b),
            (Self::Missing(a), Self::Missing(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Number of nodes in the tree, this one included
    #[must_use]
    pub fn node_count(&self) -> usize {
        1 + self.children().iter().map(Self::node_count).sum::<usize>()
    }

    /// Walk the tree depth first
    ///
    /// The visitor sees each node with its path relative to this node (the
    /// root itself has an empty relative path). Returns `false` if the visitor
    /// terminated the walk early.
    pub fn accept<V: SnapshotHierarchyVisitor + ?Sized>(&self, visitor: &mut V) -> bool {
        let mut relative_path = Vec::new();
        self.accept_at(visitor, &mut relative_path, true)
    }

    fn accept_at<V: SnapshotHierarchyVisitor + ?Sized>(
        &self,
        visitor: &mut V,
        relative_path: &mut Vec<Arc<str>>,
        is_root: bool,
    ) -> bool {
        match visitor.visit_entry(self, relative_path, is_root) {
            SnapshotVisitResult::Terminate => return false,
            SnapshotVisitResult::SkipSubtree => return true,
            SnapshotVisitResult::Continue => {}
        }
        let Self::Directory(dir) = self else {
            return true;
        };
        for child in &dir.children {
            relative_path.push(Arc::clone(child.name()));
            let keep_going = child.accept_at(visitor, relative_path, false);
            relative_path.pop();
            if !keep_going {
                return false;
            }
        }
        visitor.leave_directory(dir, relative_path, is_root);
        true
    }
}

/// What a visitor wants to do after seeing an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotVisitResult {
    /// Descend into the entry if it is a directory
    Continue,
    /// Do not descend into the entry
    SkipSubtree,
    /// Stop the whole walk
    Terminate,
}

/// Visitor over a materialized snapshot tree
pub trait SnapshotHierarchyVisitor {
    /// Called for every entry, directories before their children
    fn visit_entry(
        &mut self,
        snapshot: &FileSystemLocationSnapshot,
        relative_path: &[Arc<str>],
        is_root: bool,
    ) -> SnapshotVisitResult;

    /// Called after all children of a directory have been visited
    fn leave_directory(
        &mut self,
        _directory: &DirectorySnapshot,
        _relative_path: &[Arc<str>],
        _is_root: bool,
    ) {
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(path: &str, name: &str, content: &[u8]) -> FileSystemLocationSnapshot {
        FileSystemLocationSnapshot::regular_file(
            Arc::from(path),
            Arc::from(name),
            ContentHash::compute(content),
            FileMetadata::file(content.len() as u64, 0, AccessType::Direct),
        )
    }

    fn tree() -> FileSystemLocationSnapshot {
        let sub = FileSystemLocationSnapshot::directory(
            Arc::from("/d/sub"),
            Arc::from("sub"),
            AccessType::Direct,
            ContentHash::compute(b"sub"),
            vec![file("/d/sub/c.txt", "c.txt", b"3")],
        );
        FileSystemLocationSnapshot::directory(
            Arc::from("/d"),
            Arc::from("d"),
            AccessType::Direct,
            ContentHash::compute(b"d"),
            vec![file("/d/a.txt", "a.txt", b"1"), sub],
        )
    }

    struct Collect(Vec<String>);

    impl SnapshotHierarchyVisitor for Collect {
        fn visit_entry(
            &mut self,
            _snapshot: &FileSystemLocationSnapshot,
            relative_path: &[Arc<str>],
            _is_root: bool,
        ) -> SnapshotVisitResult {
            self.0.push(relative_path.join("/"));
            SnapshotVisitResult::Continue
        }
    }

    #[test]
    fn visitor_sees_relative_paths_depth_first() {
        let mut visitor = Collect(Vec::new());
        assert!(tree().accept(&mut visitor));
        assert_eq!(visitor.0, vec!["", "a.txt", "sub", "sub/c.txt"]);
    }

    #[test]
    fn missing_snapshots_share_a_signature() {
        let a = FileSystemLocationSnapshot::missing(Arc::from("/a"), Arc::from("a"), AccessType::Direct);
        let b = FileSystemLocationSnapshot::missing(Arc::from("/b"), Arc::from("b"), AccessType::ViaSymlink);
        assert_eq!(a.hash(), b.hash());
        assert_ne!(a, b);
    }

    #[test]
    fn ptr_eq_distinguishes_equal_copies() {
        let a = tree();
        let b = tree();
        assert_eq!(a, b);
        assert!(!a.ptr_eq(&b));
        assert!(a.ptr_eq(&a.clone()));
    }

    #[test]
    fn node_count_includes_root() {
        assert_eq!(tree().node_count(), 4);
    }

    #[test]
    fn regular_file_hash_only_for_files() {
        let t = tree();
        assert!(t.regular_file_hash().is_none());
        assert_eq!(t.children()[0].regular_file_hash(), Some(ContentHash::compute(b"1")));
    }
}
