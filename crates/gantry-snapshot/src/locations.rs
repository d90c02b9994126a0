//! Classification of well-known immutable locations

use std::path::{Path, PathBuf};

/// Decides which cache partition a path belongs to
pub trait WellKnownFileLocations: Send + Sync {
    /// Check if contents under `path` never change while the process runs
    fn is_immutable(&self, path: &Path) -> bool;
}

/// Every location is mutable
#[derive(Debug, Clone, Copy, Default)]
pub struct NoWellKnownLocations;

impl WellKnownFileLocations for NoWellKnownLocations {
    fn is_immutable(&self, _path: &Path) -> bool {
        false
    }
}

/// Locations below any of a fixed set of roots are immutable
#[derive(Debug, Clone, Default)]
pub struct ImmutableRoots {
    roots: Vec<PathBuf>,
}

impl ImmutableRoots {
    /// Create classifier over `roots`
    #[must_use]
    pub fn new<I, P>(roots: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            roots: roots.into_iter().map(Into::into).collect(),
        }
    }

    /// Configured roots
    #[inline]
    #[must_use]
    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }
}

impl WellKnownFileLocations for ImmutableRoots {
    fn is_immutable(&self, path: &Path) -> bool {
        self.roots.iter().any(|root| path.starts_with(root))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roots_cover_descendants_only() {
        let locations = ImmutableRoots::new(["/opt/cache"]);
        assert!(locations.is_immutable(Path::new("/opt/cache")));
        assert!(locations.is_immutable(Path::new("/opt/cache/a/b.jar")));
        assert!(!locations.is_immutable(Path::new("/opt/cache2/a")));
        assert!(!locations.is_immutable(Path::new("/opt")));
    }

    #[test]
    fn nothing_is_immutable_by_default() {
        assert!(!NoWellKnownLocations.is_immutable(Path::new("/opt/cache")));
    }
}
