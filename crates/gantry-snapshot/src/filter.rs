//! Re-filtering finished snapshots without touching the disk

use crate::builder::{DirectorySnapshotBuilder, IncompleteTrackingMerkleDirectorySnapshotBuilder};
use crate::predicate::SnapshotPredicate;
use crate::snapshot::{
    DirectorySnapshot, FileSystemLocationSnapshot, SnapshotHierarchyVisitor, SnapshotVisitResult,
};
use std::sync::Arc;

/// Applies a [`SnapshotPredicate`] to an already materialized tree
#[derive(Debug, Clone, Copy, Default)]
pub struct FileSystemSnapshotFilter;

impl FileSystemSnapshotFilter {
    /// Keep only the nodes of `snapshot` accepted by `predicate`
    ///
    /// The root is always kept. Rejected directories are dropped together
    /// with their subtree; accepted directories are kept even if all of their
    /// children are rejected. When nothing is rejected the very same snapshot
    /// is returned, so callers can use [`FileSystemLocationSnapshot::ptr_eq`].
    #[must_use]
    pub fn filter_snapshot(
        predicate: &dyn SnapshotPredicate,
        snapshot: &FileSystemLocationSnapshot,
    ) -> FileSystemLocationSnapshot {
        let mut visitor = FilteringVisitor {
            predicate,
            builder: IncompleteTrackingMerkleDirectorySnapshotBuilder::new(|_| {}),
        };
        snapshot.accept(&mut visitor);

        if visitor.builder.is_result_complete() {
            return snapshot.clone();
        }
        visitor
            .builder
            .into_result()
            .unwrap_or_else(|| snapshot.clone())
    }
}

struct FilteringVisitor<'a, C> {
    predicate: &'a dyn SnapshotPredicate,
    builder: IncompleteTrackingMerkleDirectorySnapshotBuilder<C>,
}

impl<C: FnMut(FileSystemLocationSnapshot)> SnapshotHierarchyVisitor for FilteringVisitor<'_, C> {
    fn visit_entry(
        &mut self,
        snapshot: &FileSystemLocationSnapshot,
        relative_path: &[Arc<str>],
        is_root: bool,
    ) -> SnapshotVisitResult {
        if !is_root && !self.predicate.test(snapshot, relative_path) {
            self.builder.mark_current_level_as_incomplete();
            return SnapshotVisitResult::SkipSubtree;
        }
        match snapshot {
            FileSystemLocationSnapshot::Directory(dir) => {
                self.builder.enter_directory(
                    dir.access_type,
                    Arc::clone(&dir.absolute_path),
                    Arc::clone(&dir.name),
                );
                SnapshotVisitResult::Continue
            }
            _ => {
                self.builder.visit_entry(snapshot.clone());
                SnapshotVisitResult::SkipSubtree
            }
        }
    }

    fn leave_directory(&mut self, _directory: &DirectorySnapshot, _relative_path: &[Arc<str>], _is_root: bool) {
        self.builder.leave_directory();
    }
}
