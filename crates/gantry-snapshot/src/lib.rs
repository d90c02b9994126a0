//! Gantry file system snapshots
//!
//! Produces immutable, Merkle-hashed snapshot trees of directories and files,
//! and caches them per absolute path.
//!
//! # Core Concepts
//!
//! - [`FileSystemLocationSnapshot`]: a regular file, a directory or a missing location
//! - [`DirectorySnapshotter`]: walks a directory tree once, following symlinks without looping
//! - [`FileSystemSnapshotFilter`]: re-filters a finished tree in memory
//! - [`DefaultFileSystemSnapshotter`]: the cached, single-flight entry point
//! - [`FileSystemMirror`]: the cache, split into mutable and immutable partitions
//!
//! # Example
//!
//! ```no_run
//! use gantry_snapshot::{DefaultFileSystemSnapshotter, SnapshotterConfig};
//! use std::path::Path;
//!
//! let snapshotter = DefaultFileSystemSnapshotter::from_config(&SnapshotterConfig::default())?;
//! let tree = snapshotter.snapshot(Path::new("/work/project/src"))?;
//! println!("{} nodes, digest {}", tree.node_count(), tree.hash());
//! # Ok::<(), gantry_snapshot::SnapshotError>(())
//! ```

#![warn(unreachable_pub)]

mod config;
mod error;
mod excludes;
mod filter;
mod guard;
mod locations;
mod metadata;
mod mirror;
mod predicate;
mod snapshot;
mod snapshotter;
mod stats;
mod walker;

/// Stack-based Merkle snapshot builders
pub mod builder;

pub use builder::{
    DirectorySnapshotBuilder, FilteredTrackingMerkleDirectorySnapshotBuilder,
    IncompleteTrackingMerkleDirectorySnapshotBuilder, MerkleDirectorySnapshotBuilder,
};
pub use config::{SnapshotterConfig, DEFAULT_EXCLUDES};
pub use error::{Result, SnapshotError};
pub use excludes::DefaultExcludes;
pub use filter::FileSystemSnapshotFilter;
pub use guard::StripedProducerGuard;
pub use locations::{ImmutableRoots, NoWellKnownLocations, WellKnownFileLocations};
pub use metadata::{AccessType, DefaultStat, FileMetadata, FileType, Stat};
pub use mirror::FileSystemMirror;
pub use predicate::{DirectoryWalkerPredicate, PathFilter, SnapshotPredicate, SnapshottingFilter};
pub use snapshot::{
    DirectorySnapshot, FileSystemLocationSnapshot, MissingFileSnapshot, RegularFileSnapshot,
    SnapshotHierarchyVisitor, SnapshotVisitResult,
};
pub use snapshotter::DefaultFileSystemSnapshotter;
pub use stats::{DirectorySnapshotterStatistics, WalkStatistics};
pub use walker::{DirectorySnapshotter, WalkOutcome};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
