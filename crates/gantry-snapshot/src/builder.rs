//! Bottom-up construction of directory snapshots
//!
//! A builder is a stack machine driven by a walk: `enter_directory` opens a
//! frame, `visit_entry` appends a finished child to the open frame and
//! `leave_directory` closes the frame into a [`DirectorySnapshot`] with its
//! Merkle digest. The closed directory becomes an entry of the frame below, or
//! the result once the outermost frame is closed.
//!
//! The tracking variants additionally remember, per open frame, whether some
//! entry was left out. When such a frame closes, its parent is marked too and
//! every child that is itself complete is handed to a consumer. The consumer
//! thus receives the largest complete subtrees of a partial walk.
//!
//! [`DirectorySnapshot`]: crate::snapshot::DirectorySnapshot

use crate::metadata::AccessType;
use crate::snapshot::FileSystemLocationSnapshot;
use gantry_hash::merkle::MerkleDirectoryHasher;
use std::collections::HashSet;
use std::sync::Arc;

/// Stack-based snapshot builder
pub trait DirectorySnapshotBuilder {
    /// Open a directory frame
    fn enter_directory(&mut self, access_type: AccessType, absolute_path: Arc<str>, name: Arc<str>);

    /// Append a finished entry to the open frame, or make it the result when
    /// no frame is open
    fn visit_entry(&mut self, snapshot: FileSystemLocationSnapshot);

    /// Close the open frame
    ///
    /// Returns the finished directory, or `None` if no frame was open.
    fn leave_directory(&mut self) -> Option<FileSystemLocationSnapshot>;

    /// Finished outermost entry, if any
    fn result(&self) -> Option<&FileSystemLocationSnapshot>;
}

#[derive(Debug)]
struct Frame {
    absolute_path: Arc<str>,
    name: Arc<str>,
    access_type: AccessType,
    children: Vec<FileSystemLocationSnapshot>,
}

/// Plain Merkle builder
#[derive(Debug)]
pub struct MerkleDirectorySnapshotBuilder {
    sort_children: bool,
    frames: Vec<Frame>,
    result: Option<FileSystemLocationSnapshot>,
}

impl MerkleDirectorySnapshotBuilder {
    /// Builder that sorts children by name before hashing
    ///
    /// Use for walks, where enumeration order depends on the file system.
    #[inline]
    #[must_use]
    pub fn sorting_required() -> Self {
        Self::with_sorting(true)
    }

    /// Builder that keeps children in the order they were visited
    ///
    /// Use when rebuilding from an already sorted snapshot.
    #[inline]
    #[must_use]
    pub fn no_sorting_required() -> Self {
        Self::with_sorting(false)
    }

    fn with_sorting(sort_children: bool) -> Self {
        Self {
            sort_children,
            frames: Vec::new(),
            result: None,
        }
    }

    /// Number of open frames
    #[inline]
    #[must_use]
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Take the finished outermost entry
    #[inline]
    #[must_use]
    pub fn into_result(self) -> Option<FileSystemLocationSnapshot> {
        self.result
    }
}

impl DirectorySnapshotBuilder for MerkleDirectorySnapshotBuilder {
    fn enter_directory(&mut self, access_type: AccessType, absolute_path: Arc<str>, name: Arc<str>) {
        self.frames.push(Frame {
            absolute_path,
            name,
            access_type,
            children: Vec::new(),
        });
    }

    fn visit_entry(&mut self, snapshot: FileSystemLocationSnapshot) {
        match self.frames.last_mut() {
            Some(frame) => frame.children.push(snapshot),
            None => self.result = Some(snapshot),
        }
    }

    fn leave_directory(&mut self) -> Option<FileSystemLocationSnapshot> {
        let mut frame = self.frames.pop()?;
        if self.sort_children {
            frame.children.sort_by(|a, b| a.name().cmp(b.name()));
        }
        let mut hasher = MerkleDirectoryHasher::with_capacity(frame.children.len());
        for child in &frame.children {
            hasher.add_child(child.name(), &child.hash());
        }
        let directory = FileSystemLocationSnapshot::directory(
            frame.absolute_path,
            frame.name,
            frame.access_type,
            hasher.finish(),
            frame.children,
        );
        self.visit_entry(directory.clone());
        Some(directory)
    }

    fn result(&self) -> Option<&FileSystemLocationSnapshot> {
        self.result.as_ref()
    }
}

#[derive(Debug, Default)]
struct TrackedFrame {
    marked: bool,
    marked_children: HashSet<Arc<str>>,
}

/// Shared frame tracking of the two tracking builders
struct TrackingCore<C> {
    delegate: MerkleDirectorySnapshotBuilder,
    frames: Vec<TrackedFrame>,
    outermost_marked: bool,
    consumer: C,
}

impl<C: FnMut(FileSystemLocationSnapshot)> TrackingCore<C> {
    fn new(delegate: MerkleDirectorySnapshotBuilder, consumer: C) -> Self {
        Self {
            delegate,
            frames: Vec::new(),
            outermost_marked: false,
            consumer,
        }
    }

    fn enter_directory(&mut self, access_type: AccessType, absolute_path: Arc<str>, name: Arc<str>) {
        self.delegate.enter_directory(access_type, absolute_path, name);
        self.frames.push(TrackedFrame::default());
    }

    fn mark_current(&mut self) {
        match self.frames.last_mut() {
            Some(frame) => frame.marked = true,
            None => self.outermost_marked = true,
        }
    }

    fn is_current_unmarked(&self) -> bool {
        self.frames
            .last()
            .map_or(!self.outermost_marked, |frame| !frame.marked)
    }

    fn leave_directory(&mut self) -> Option<FileSystemLocationSnapshot> {
        let frame = self.frames.pop()?;
        let directory = self.delegate.leave_directory()?;
        if frame.marked {
            match self.frames.last_mut() {
                Some(parent) => {
                    parent.marked = true;
                    parent
                        .marked_children
                        .insert(Arc::clone(directory.absolute_path()));
                }
                None => self.outermost_marked = true,
            }
            for child in directory.children() {
                if !frame.marked_children.contains(child.absolute_path()) {
                    (self.consumer)(child.clone());
                }
            }
        }
        Some(directory)
    }
}

/// Merkle builder for filtered walks
///
/// Sorts children. The walk marks a frame as filtered whenever its predicate
/// rejects an entry of that frame; complete subtrees go to the consumer.
pub struct FilteredTrackingMerkleDirectorySnapshotBuilder<C> {
    core: TrackingCore<C>,
}

impl<C: FnMut(FileSystemLocationSnapshot)> FilteredTrackingMerkleDirectorySnapshotBuilder<C> {
    /// Create builder handing complete subtrees to `unfiltered_consumer`
    pub fn new(unfiltered_consumer: C) -> Self {
        Self {
            core: TrackingCore::new(
                MerkleDirectorySnapshotBuilder::sorting_required(),
                unfiltered_consumer,
            ),
        }
    }

    /// Record that an entry of the open frame was left out
    #[inline]
    pub fn mark_current_level_as_filtered(&mut self) {
        self.core.mark_current();
    }

    /// Check if nothing was left out of the open frame so far
    ///
    /// Once every frame is closed this answers for the whole walk.
    #[inline]
    #[must_use]
    pub fn is_current_level_unfiltered(&self) -> bool {
        self.core.is_current_unmarked()
    }

    /// Take the finished outermost entry
    #[inline]
    #[must_use]
    pub fn into_result(self) -> Option<FileSystemLocationSnapshot> {
        self.core.delegate.into_result()
    }
}

impl<C: FnMut(FileSystemLocationSnapshot)> DirectorySnapshotBuilder
    for FilteredTrackingMerkleDirectorySnapshotBuilder<C>
{
    fn enter_directory(&mut self, access_type: AccessType, absolute_path: Arc<str>, name: Arc<str>) {
        self.core.enter_directory(access_type, absolute_path, name);
    }

    fn visit_entry(&mut self, snapshot: FileSystemLocationSnapshot) {
        self.core.delegate.visit_entry(snapshot);
    }

    fn leave_directory(&mut self) -> Option<FileSystemLocationSnapshot> {
        self.core.leave_directory()
    }

    fn result(&self) -> Option<&FileSystemLocationSnapshot> {
        self.core.delegate.result()
    }
}

/// Merkle builder for re-filtering a finished snapshot
///
/// Keeps visit order. A frame is incomplete once any of its entries was
/// dropped; complete subtrees go to the consumer.
pub struct IncompleteTrackingMerkleDirectorySnapshotBuilder<C> {
    core: TrackingCore<C>,
}

impl<C: FnMut(FileSystemLocationSnapshot)> IncompleteTrackingMerkleDirectorySnapshotBuilder<C> {
    /// Create builder handing complete subtrees to `complete_consumer`
    pub fn new(complete_consumer: C) -> Self {
        Self {
            core: TrackingCore::new(
                MerkleDirectorySnapshotBuilder::no_sorting_required(),
                complete_consumer,
            ),
        }
    }

    /// Record that an entry of the open frame was dropped
    #[inline]
    pub fn mark_current_level_as_incomplete(&mut self) {
        self.core.mark_current();
    }

    /// Check if nothing was dropped anywhere in the closed frames
    #[inline]
    #[must_use]
    pub fn is_result_complete(&self) -> bool {
        !self.core.outermost_marked
    }

    /// Take the finished outermost entry
    #[inline]
    #[must_use]
    pub fn into_result(self) -> Option<FileSystemLocationSnapshot> {
        self.core.delegate.into_result()
    }
}

impl<C: FnMut(FileSystemLocationSnapshot)> DirectorySnapshotBuilder
    for IncompleteTrackingMerkleDirectorySnapshotBuilder<C>
{
    fn enter_directory(&mut self, access_type: AccessType, absolute_path: Arc<str>, name: Arc<str>) {
        self.core.enter_directory(access_type, absolute_path, name);
    }

    fn visit_entry(&mut self, snapshot: FileSystemLocationSnapshot) {
        self.core.delegate.visit_entry(snapshot);
    }

    fn leave_directory(&mut self) -> Option<FileSystemLocationSnapshot> {
        self.core.leave_directory()
    }

    fn result(&self) -> Option<&FileSystemLocationSnapshot> {
        self.core.delegate.result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::FileMetadata;
    use gantry_hash::ContentHash;
    use proptest::prelude::*;

    fn file(dir: &str, name: &str) -> FileSystemLocationSnapshot {
        FileSystemLocationSnapshot::regular_file(
            Arc::from(format!("{dir}/{name}")),
            Arc::from(name),
            ContentHash::compute(name.as_bytes()),
            FileMetadata::file(name.len() as u64, 0, AccessType::Direct),
        )
    }

    fn enter<B: DirectorySnapshotBuilder>(builder: &mut B, path: &str) {
        let name = path.rsplit('/').next().unwrap_or(path);
        builder.enter_directory(AccessType::Direct, Arc::from(path), Arc::from(name));
    }

    #[test]
    fn leave_without_enter_yields_nothing() {
        let mut builder = MerkleDirectorySnapshotBuilder::sorting_required();
        assert!(builder.leave_directory().is_none());
        assert!(builder.result().is_none());
    }

    #[test]
    fn empty_directories_are_kept() {
        let mut builder = MerkleDirectorySnapshotBuilder::sorting_required();
        enter(&mut builder, "/d");
        enter(&mut builder, "/d/empty");
        builder.leave_directory();
        let root = builder.leave_directory().unwrap();
        assert_eq!(root.children().len(), 1);
        assert!(root.children()[0].children().is_empty());
        assert_eq!(builder.depth(), 0);
    }

    #[test]
    fn outermost_file_becomes_result() {
        let mut builder = MerkleDirectorySnapshotBuilder::no_sorting_required();
        builder.visit_entry(file("/d", "a.txt"));
        assert_eq!(builder.into_result().unwrap().name().as_ref(), "a.txt");
    }

    #[test]
    fn unsorted_builder_keeps_visit_order() {
        let mut builder = MerkleDirectorySnapshotBuilder::no_sorting_required();
        enter(&mut builder, "/d");
        builder.visit_entry(file("/d", "b"));
        builder.visit_entry(file("/d", "a"));
        let root = builder.leave_directory().unwrap();
        let names: Vec<&str> = root.children().iter().map(|c| c.name().as_ref()).collect();
        assert_eq!(names, vec!["b", "a"]);
    }

    #[test]
    fn filtered_levels_hand_complete_children_to_consumer() {
        let mut harvested = Vec::new();
        let mut builder = FilteredTrackingMerkleDirectorySnapshotBuilder::new(|s: FileSystemLocationSnapshot| {
            harvested.push(s.absolute_path().to_string());
        });
        enter(&mut builder, "/d");
        builder.visit_entry(file("/d", "kept.txt"));
        enter(&mut builder, "/d/complete");
        builder.visit_entry(file("/d/complete", "x"));
        builder.leave_directory();
        enter(&mut builder, "/d/partial");
        builder.visit_entry(file("/d/partial", "y"));
        builder.mark_current_level_as_filtered();
        assert!(!builder.is_current_level_unfiltered());
        builder.leave_directory();
        builder.leave_directory();
        assert!(!builder.is_current_level_unfiltered());
        drop(builder);

        harvested.sort();
        assert_eq!(
            harvested,
            vec!["/d/complete", "/d/kept.txt", "/d/partial/y"]
        );
    }

    #[test]
    fn unfiltered_walk_harvests_nothing() {
        let mut count = 0;
        let mut builder = FilteredTrackingMerkleDirectorySnapshotBuilder::new(|_| count += 1);
        enter(&mut builder, "/d");
        builder.visit_entry(file("/d", "a"));
        builder.leave_directory();
        assert!(builder.is_current_level_unfiltered());
        drop(builder);
        assert_eq!(count, 0);
    }

    #[test]
    fn incomplete_tracking_reports_completeness() {
        let mut builder = IncompleteTrackingMerkleDirectorySnapshotBuilder::new(|_| {});
        enter(&mut builder, "/d");
        enter(&mut builder, "/d/sub");
        builder.mark_current_level_as_incomplete();
        builder.leave_directory();
        builder.leave_directory();
        assert!(!builder.is_result_complete());
        assert!(builder.into_result().is_some());
    }

    proptest! {
        #[test]
        fn sorted_digest_ignores_visit_order(
            names in proptest::collection::btree_set("[a-z]{1,6}", 1..12),
            seed in any::<u64>(),
        ) {
            let ordered: Vec<String> = names.into_iter().collect();
            let mut shuffled = ordered.clone();
            // deterministic rotation driven by the seed
            let len = shuffled.len();
            shuffled.rotate_left((seed as usize) % len);
            shuffled.reverse();

            let build = |order: &[String]| {
                let mut builder = MerkleDirectorySnapshotBuilder::sorting_required();
                enter(&mut builder, "/d");
                for name in order {
                    builder.visit_entry(file("/d", name));
                }
                builder.leave_directory().unwrap()
            };
            prop_assert_eq!(build(&ordered), build(&shuffled));
        }
    }
}
