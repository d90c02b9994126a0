//! Class loaders
//!
//! A loader resolves a class name parent-first: each parent is asked in order,
//! then the loader's own classpath. A loader with an empty classpath and
//! several parents is a multi-parent loader; parents may be added after
//! construction so late contributions to an eagerly built scope stay visible.

use crate::classpath::ClassPath;
use crate::identifier::ClassLoaderId;
use gantry_hash::ContentHash;
use parking_lot::{Mutex, RwLock};
use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_SERIAL: AtomicU64 = AtomicU64::new(1);

/// A class resolved by some loader
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedClass {
    name: Arc<str>,
    origin: PathBuf,
    loader_id: ClassLoaderId,
    loader_serial: u64,
}

impl LoadedClass {
    /// Fully qualified class name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Class file the class was read from
    #[inline]
    #[must_use]
    pub fn origin(&self) -> &std::path::Path {
        &self.origin
    }

    /// Identifier of the defining loader
    #[inline]
    #[must_use]
    pub fn loader_id(&self) -> &ClassLoaderId {
        &self.loader_id
    }
}

/// Warns once per class about classes from a deprecated loader
#[derive(Debug, Default)]
struct DeprecationMarker {
    warned: Mutex<HashSet<Arc<str>>>,
}

impl DeprecationMarker {
    fn on_define(&self, loader: &ClassLoaderId, class_name: &Arc<str>) {
        if self.warned.lock().insert(Arc::clone(class_name)) {
            tracing::warn!(
                loader = %loader,
                class = %class_name,
                "class loaded from a deprecated class loader scope"
            );
        }
    }
}

/// A class loader over a [`ClassPath`]
pub struct ClassLoader {
    id: ClassLoaderId,
    serial: u64,
    class_path: ClassPath,
    parents: RwLock<Vec<Arc<ClassLoader>>>,
    implementation_hash: Option<ContentHash>,
    deprecation: Option<DeprecationMarker>,
}

impl ClassLoader {
    /// Create loader over `class_path` delegating to `parents`
    #[must_use]
    pub fn new(id: ClassLoaderId, class_path: ClassPath, parents: Vec<Arc<ClassLoader>>) -> Arc<Self> {
        Self::create(id, class_path, parents, None, false)
    }

    /// Create loader whose own classes trigger a deprecation warning
    #[must_use]
    pub fn new_deprecated(id: ClassLoaderId, class_path: ClassPath, parents: Vec<Arc<ClassLoader>>) -> Arc<Self> {
        Self::create(id, class_path, parents, None, true)
    }

    /// Create loader with every option spelled out
    #[must_use]
    pub fn create(
        id: ClassLoaderId,
        class_path: ClassPath,
        parents: Vec<Arc<ClassLoader>>,
        implementation_hash: Option<ContentHash>,
        deprecated: bool,
    ) -> Arc<Self> {
        let serial = NEXT_SERIAL.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(loader = %id, serial, roots = class_path.len(), "creating class loader");
        Arc::new(Self {
            id,
            serial,
            class_path,
            parents: RwLock::new(parents),
            implementation_hash,
            deprecation: deprecated.then(DeprecationMarker::default),
        })
    }

    /// Identifier
    #[inline]
    #[must_use]
    pub fn id(&self) -> &ClassLoaderId {
        &self.id
    }

    /// Process-unique serial number
    #[inline]
    #[must_use]
    pub fn serial(&self) -> u64 {
        self.serial
    }

    /// Own classpath
    #[inline]
    #[must_use]
    pub fn class_path(&self) -> &ClassPath {
        &self.class_path
    }

    /// Hash of the implementation this loader was built for, if known
    #[inline]
    #[must_use]
    pub fn implementation_hash(&self) -> Option<ContentHash> {
        self.implementation_hash
    }

    /// Check if own classes trigger a deprecation warning
    #[inline]
    #[must_use]
    pub fn is_deprecated(&self) -> bool {
        self.deprecation.is_some()
    }

    /// Current parents in delegation order
    #[must_use]
    pub fn parents(&self) -> Vec<Arc<ClassLoader>> {
        self.parents.read().clone()
    }

    /// Append a parent, consulted after the existing ones
    pub fn add_parent(&self, parent: Arc<ClassLoader>) {
        tracing::debug!(loader = %self.id, parent = %parent.id, "adding class loader parent");
        self.parents.write().push(parent);
    }

    /// Resolve `class_name`, parents first
    #[must_use]
    pub fn load_class(&self, class_name: &str) -> Option<LoadedClass> {
        let parents = self.parents();
        if let Some(found) = parents.iter().find_map(|parent| parent.load_class(class_name)) {
            return Some(found);
        }
        self.find_own_class(class_name)
    }

    fn find_own_class(&self, class_name: &str) -> Option<LoadedClass> {
        let origin = self.class_path.find_class(class_name)?;
        let name: Arc<str> = Arc::from(class_name);
        if let Some(marker) = &self.deprecation {
            marker.on_define(&self.id, &name);
        }
        Some(LoadedClass {
            name,
            origin,
            loader_id: self.id.clone(),
            loader_serial: self.serial,
        })
    }

    /// Check if this very loader defined `class`
    #[inline]
    #[must_use]
    pub fn defines(&self, class: &LoadedClass) -> bool {
        class.loader_serial == self.serial
    }
}

impl fmt::Debug for ClassLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassLoader")
            .field("id", &self.id)
            .field("serial", &self.serial)
            .field("class_path", &self.class_path)
            .field("parents", &self.parents.read().len())
            .field("deprecated", &self.is_deprecated())
            .finish()
    }
}
