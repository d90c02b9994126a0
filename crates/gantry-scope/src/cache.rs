//! Shared cache of class loaders
//!
//! Scopes ask the cache for their loaders instead of building them, so two
//! scopes with the same identifier and the same inputs share one loader.

use crate::classpath::ClassPath;
use crate::identifier::ClassLoaderId;
use crate::loader::ClassLoader;
use gantry_hash::ContentHash;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Everything a cached loader was built from
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClassLoaderSpec {
    /// Own classpath
    pub class_path: ClassPath,
    /// Serials of the parents, in order
    pub parent_serials: Vec<u64>,
    /// Implementation hash, if known
    pub implementation_hash: Option<ContentHash>,
    /// Whether own classes trigger a deprecation warning
    pub deprecated: bool,
}

impl ClassLoaderSpec {
    /// Spec of a loader over `class_path` with `parents`
    #[must_use]
    pub fn new(
        class_path: &ClassPath,
        parents: &[Arc<ClassLoader>],
        implementation_hash: Option<ContentHash>,
        deprecated: bool,
    ) -> Self {
        Self {
            class_path: class_path.clone(),
            parent_serials: parents.iter().map(|p| p.serial()).collect(),
            implementation_hash,
            deprecated,
        }
    }
}

/// Builds a loader for a cache miss
pub type ClassLoaderFactory<'a> = &'a dyn Fn(ClassLoaderId, ClassPath, Vec<Arc<ClassLoader>>, Option<ContentHash>) -> Arc<ClassLoader>;

/// At-most-once loader construction per identifier and spec
pub trait ClassLoaderCache: Send + Sync {
    /// Loader for `id` built by `factory` unless an identical one exists
    ///
    /// A different spec under the same identifier replaces the old loader.
    /// `deprecated` is part of the spec; `factory` must honour it.
    fn create_if_absent(
        &self,
        id: &ClassLoaderId,
        class_path: &ClassPath,
        parents: &[Arc<ClassLoader>],
        implementation_hash: Option<ContentHash>,
        deprecated: bool,
        factory: ClassLoaderFactory<'_>,
    ) -> Arc<ClassLoader>;

    /// Loader for `id`, deprecated or not
    fn get(
        &self,
        id: &ClassLoaderId,
        class_path: &ClassPath,
        parents: &[Arc<ClassLoader>],
        implementation_hash: Option<ContentHash>,
        deprecated: bool,
    ) -> Arc<ClassLoader> {
        self.create_if_absent(
            id,
            class_path,
            parents,
            implementation_hash,
            deprecated,
            &|id, cp, parents, hash| ClassLoader::create(id, cp, parents, hash, deprecated),
        )
    }

    /// Forget the loader for `id`
    fn remove(&self, id: &ClassLoaderId);

    /// Number of cached loaders
    fn size(&self) -> usize;
}

struct CachedLoader {
    spec: ClassLoaderSpec,
    loader: Arc<ClassLoader>,
}

/// In-memory [`ClassLoaderCache`]
#[derive(Default)]
pub struct DefaultClassLoaderCache {
    entries: Mutex<HashMap<ClassLoaderId, CachedLoader>>,
}

impl DefaultClassLoaderCache {
    /// Create empty cache
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl ClassLoaderCache for DefaultClassLoaderCache {
    fn create_if_absent(
        &self,
        id: &ClassLoaderId,
        class_path: &ClassPath,
        parents: &[Arc<ClassLoader>],
        implementation_hash: Option<ContentHash>,
        deprecated: bool,
        factory: ClassLoaderFactory<'_>,
    ) -> Arc<ClassLoader> {
        let spec = ClassLoaderSpec::new(class_path, parents, implementation_hash, deprecated);
        let mut entries = self.entries.lock();
        if let Some(cached) = entries.get(id) {
            if cached.spec == spec {
                tracing::debug!(loader = %id, "class loader cache hit");
                return Arc::clone(&cached.loader);
            }
            tracing::debug!(loader = %id, "class loader spec changed, replacing");
        }
        let loader = factory(id.clone(), class_path.clone(), parents.to_vec(), implementation_hash);
        entries.insert(
            id.clone(),
            CachedLoader {
                spec,
                loader: Arc::clone(&loader),
            },
        );
        loader
    }

    fn remove(&self, id: &ClassLoaderId) {
        self.entries.lock().remove(id);
    }

    fn size(&self) -> usize {
        self.entries.lock().len()
    }
}

impl std::fmt::Debug for DefaultClassLoaderCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DefaultClassLoaderCache")
            .field("size", &self.size())
            .finish()
    }
}
