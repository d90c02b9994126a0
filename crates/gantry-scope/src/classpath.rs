//! Ordered sets of class directories

use std::path::{Path, PathBuf};

/// Ordered, de-duplicated list of class directory roots
///
/// Class `a.b.C` is looked up as `<root>/a/b/C.class` in each root in order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ClassPath {
    roots: Vec<PathBuf>,
}

impl ClassPath {
    /// Empty classpath
    #[inline]
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Classpath of `roots`, keeping the first occurrence of duplicates
    #[must_use]
    pub fn new<I, P>(roots: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let mut class_path = Self::empty();
        for root in roots {
            class_path.push(root.into());
        }
        class_path
    }

    /// Classpath of a single root
    #[must_use]
    pub fn of(root: impl Into<PathBuf>) -> Self {
        Self {
            roots: vec![root.into()],
        }
    }

    fn push(&mut self, root: PathBuf) {
        if !self.roots.contains(&root) {
            self.roots.push(root);
        }
    }

    /// This classpath followed by the roots of `other` it lacks
    #[must_use]
    pub fn plus(&self, other: &Self) -> Self {
        let mut joined = self.clone();
        for root in &other.roots {
            joined.push(root.clone());
        }
        joined
    }

    /// Check if there are no roots
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Number of roots
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.roots.len()
    }

    /// Roots in lookup order
    #[inline]
    #[must_use]
    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Check if `root` is part of this classpath
    #[must_use]
    pub fn contains(&self, root: &Path) -> bool {
        self.roots.iter().any(|r| r == root)
    }

    /// Location of the class file for `class_name`, if any root has one
    #[must_use]
    pub fn find_class(&self, class_name: &str) -> Option<PathBuf> {
        let relative = class_file_path(class_name)?;
        self.roots
            .iter()
            .map(|root| root.join(&relative))
            .find(|candidate| candidate.is_file())
    }
}

impl<P: Into<PathBuf>> FromIterator<P> for ClassPath {
    fn from_iter<I: IntoIterator<Item = P>>(iter: I) -> Self {
        Self::new(iter)
    }
}

/// `a.b.C` to `a/b/C.class`; `None` for names that cannot be class names
fn class_file_path(class_name: &str) -> Option<PathBuf> {
    let malformed = |segment: &str| segment.is_empty() || segment.contains(['/', '\\']);
    if class_name.split('.').any(malformed) {
        return None;
    }
    let mut relative: PathBuf = class_name.split('.').collect();
    relative.set_extension("class");
    Some(relative)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn duplicates_are_dropped_keeping_order() {
        let cp = ClassPath::new(["/b", "/a", "/b"]);
        assert_eq!(cp.roots(), &[PathBuf::from("/b"), PathBuf::from("/a")]);
        let joined = cp.plus(&ClassPath::new(["/a", "/c"]));
        assert_eq!(joined.len(), 3);
        assert!(joined.contains(Path::new("/c")));
    }

    #[test]
    fn class_names_map_to_files() {
        assert_eq!(class_file_path("a.b.C"), Some(PathBuf::from("a/b/C.class")));
        assert_eq!(class_file_path("Top"), Some(PathBuf::from("Top.class")));
        assert_eq!(class_file_path("a..C"), None);
        assert_eq!(class_file_path("../C"), None);
        assert_eq!(class_file_path(""), None);
    }

    #[test]
    fn finds_first_root_with_class() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        fs::create_dir_all(second.path().join("a/b")).unwrap();
        fs::write(second.path().join("a/b/C.class"), b"").unwrap();

        let cp = ClassPath::new([first.path(), second.path()]);
        assert_eq!(cp.find_class("a.b.C"), Some(second.path().join("a/b/C.class")));
        assert_eq!(cp.find_class("a.b.D"), None);
    }
}
