//! The class loader scope tree
//!
//! Scopes live in an arena owned by a [`ClassLoaderScopeRegistry`] and are
//! handed out as cheap [`ClassLoaderScope`] handles. Each scope collects local
//! and exported classpath until it is locked. Loaders are built the first time
//! one is requested:
//!
//! - after lock, the cheapest delegation chain for the collected classpath is
//!   chosen and the loaders come from the [`ClassLoaderCache`];
//! - before lock, multi-parent loaders are built so that later contributions
//!   can still be attached as extra parents. This is slow and logged, or
//!   refused in strict mode.
//!
//! Listener callbacks and recursion into the parent scope never happen while
//! the arena lock is held.

use crate::cache::{ClassLoaderCache, DefaultClassLoaderCache};
use crate::classpath::ClassPath;
use crate::config::ScopeConfig;
use crate::error::{Result, ScopeError};
use crate::identifier::{ClassLoaderId, ClassLoaderScopeId};
use crate::listener::{ClassLoaderScopeRegistryListener, NoopScopeRegistryListener};
use crate::loader::{ClassLoader, LoadedClass};
use gantry_hash::ContentHash;
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct ScopeIndex(usize);

#[derive(Debug, Clone)]
struct Loaders {
    local: Arc<ClassLoader>,
    export: Arc<ClassLoader>,
}

#[derive(Debug, Clone, Default)]
struct Contributions {
    local: ClassPath,
    export: ClassPath,
    export_loaders: Vec<Arc<ClassLoader>>,
}

impl Contributions {
    fn has_export(&self) -> bool {
        !self.export.is_empty() || !self.export_loaders.is_empty()
    }
}

#[derive(Debug)]
enum ScopeState {
    /// Unlocked, nothing built yet
    Collecting(Contributions),
    /// Unlocked, multi-parent loaders already handed out
    EagerlyBuilt(Loaders),
    /// Locked, loaders built on first request
    Locked(Contributions),
    /// Locked and built
    Built(Loaders),
}

#[derive(Debug)]
enum ScopeKind {
    Root(Loaders),
    Immutable(Loaders),
    Default { deprecated: bool, state: ScopeState },
}

#[derive(Debug)]
struct ScopeRecord {
    id: ClassLoaderScopeId,
    parent: ScopeIndex,
    kind: ScopeKind,
    /// Bumped on every contribution and on lock
    revision: u64,
    /// Loaders this scope built itself
    owned: Vec<Arc<ClassLoader>>,
    /// Creation events, replayed on reuse
    announced: Vec<(ClassLoaderId, ClassPath)>,
}

struct Registry {
    config: ScopeConfig,
    cache: Arc<dyn ClassLoaderCache>,
    listener: Arc<dyn ClassLoaderScopeRegistryListener>,
    scopes: RwLock<Vec<ScopeRecord>>,
}

/// Owner of a scope tree
#[derive(Clone)]
pub struct ClassLoaderScopeRegistry {
    inner: Arc<Registry>,
}

impl ClassLoaderScopeRegistry {
    /// Registry with default cache, no listener and lenient mode
    #[must_use]
    pub fn new(root_name: &str, root_class_path: ClassPath) -> Self {
        Self::builder().build(root_name, root_class_path)
    }

    /// Start configuring a registry
    #[inline]
    #[must_use]
    pub fn builder() -> ScopeRegistryBuilder {
        ScopeRegistryBuilder::default()
    }

    /// The root scope
    #[must_use]
    pub fn root_scope(&self) -> ClassLoaderScope {
        ClassLoaderScope {
            registry: Arc::clone(&self.inner),
            index: ScopeIndex(0),
        }
    }

    /// Loader cache shared by all scopes
    #[inline]
    #[must_use]
    pub fn cache(&self) -> &Arc<dyn ClassLoaderCache> {
        &self.inner.cache
    }

    /// Active configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> ScopeConfig {
        self.inner.config
    }

    /// Number of scopes created so far, root included
    #[must_use]
    pub fn scope_count(&self) -> usize {
        self.inner.scopes.read().len()
    }
}

impl fmt::Debug for ClassLoaderScopeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassLoaderScopeRegistry")
            .field("config", &self.inner.config)
            .field("scopes", &self.scope_count())
            .finish_non_exhaustive()
    }
}

/// Configures a [`ClassLoaderScopeRegistry`]
#[derive(Default)]
pub struct ScopeRegistryBuilder {
    config: ScopeConfig,
    cache: Option<Arc<dyn ClassLoaderCache>>,
    listener: Option<Arc<dyn ClassLoaderScopeRegistryListener>>,
}

impl ScopeRegistryBuilder {
    /// With configuration
    #[inline]
    #[must_use]
    pub fn with_config(mut self, config: ScopeConfig) -> Self {
        self.config = config;
        self
    }

    /// With a shared loader cache
    #[inline]
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<dyn ClassLoaderCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// With a listener
    #[inline]
    #[must_use]
    pub fn with_listener(mut self, listener: Arc<dyn ClassLoaderScopeRegistryListener>) -> Self {
        self.listener = Some(listener);
        self
    }

    /// Build the registry and its root scope over `root_class_path`
    #[must_use]
    pub fn build(self, root_name: &str, root_class_path: ClassPath) -> ClassLoaderScopeRegistry {
        let id = ClassLoaderScopeId::root(root_name);
        let root_loader = ClassLoader::new(id.export_id(), root_class_path, Vec::new());
        let root = ScopeRecord {
            id,
            parent: ScopeIndex(0),
            kind: ScopeKind::Root(Loaders {
                local: Arc::clone(&root_loader),
                export: Arc::clone(&root_loader),
            }),
            revision: 0,
            owned: vec![root_loader],
            announced: Vec::new(),
        };
        ClassLoaderScopeRegistry {
            inner: Arc::new(Registry {
                config: self.config,
                cache: self
                    .cache
                    .unwrap_or_else(|| Arc::new(DefaultClassLoaderCache::new())),
                listener: self
                    .listener
                    .unwrap_or_else(|| Arc::new(NoopScopeRegistryListener)),
                scopes: RwLock::new(vec![root]),
            }),
        }
    }
}

/// Handle to one scope of a registry
#[derive(Clone)]
pub struct ClassLoaderScope {
    registry: Arc<Registry>,
    index: ScopeIndex,
}

enum Contribution {
    Local(ClassPath),
    Export(ClassPath),
    ExportLoader(Arc<ClassLoader>),
}

impl Contribution {
    fn is_empty(&self) -> bool {
        match self {
            Self::Local(cp) | Self::Export(cp) => cp.is_empty(),
            Self::ExportLoader(_) => false,
        }
    }

    fn operation(&self) -> &'static str {
        match self {
            Self::Local(_) => "local",
            Self::Export(_) => "export",
            Self::ExportLoader(_) => "export_loader",
        }
    }
}

enum Plan {
    Ready(Loaders),
    Build {
        id: ClassLoaderScopeId,
        parent: ScopeIndex,
        deprecated: bool,
        eager: bool,
        revision: u64,
        contributions: Contributions,
    },
}

struct BuiltLoaders {
    loaders: Loaders,
    owned: Vec<Arc<ClassLoader>>,
    announced: Vec<(ClassLoaderId, ClassPath)>,
}

impl ClassLoaderScope {
    fn handle(&self, index: ScopeIndex) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
            index,
        }
    }

    /// Identifier
    #[must_use]
    pub fn id(&self) -> ClassLoaderScopeId {
        self.registry.scopes.read()[self.index.0].id.clone()
    }

    /// Parent scope; the root is its own parent
    #[must_use]
    pub fn parent(&self) -> ClassLoaderScope {
        let parent = self.registry.scopes.read()[self.index.0].parent;
        self.handle(parent)
    }

    /// Check if contributions are frozen
    ///
    /// Root and immutable scopes are always locked.
    #[must_use]
    pub fn is_locked(&self) -> bool {
        match &self.registry.scopes.read()[self.index.0].kind {
            ScopeKind::Root(_) | ScopeKind::Immutable(_) => true,
            ScopeKind::Default { state, .. } => {
                matches!(state, ScopeState::Locked(_) | ScopeState::Built(_))
            }
        }
    }

    /// Create an empty, unlocked child scope
    ///
    /// Legal whatever the state of this scope.
    #[must_use]
    pub fn create_child(&self, name: &str) -> ClassLoaderScope {
        self.add_child(name, false)
    }

    /// Create a child whose classes trigger a deprecation warning on first use
    #[must_use]
    pub fn create_deprecated_child(&self, name: &str) -> ClassLoaderScope {
        self.add_child(name, true)
    }

    fn add_child(&self, name: &str, deprecated: bool) -> ClassLoaderScope {
        let (parent_id, child_id, index) = {
            let mut scopes = self.registry.scopes.write();
            let parent_id = scopes[self.index.0].id.clone();
            let child_id = parent_id.child(name);
            scopes.push(ScopeRecord {
                id: child_id.clone(),
                parent: self.index,
                kind: ScopeKind::Default {
                    deprecated,
                    state: ScopeState::Collecting(Contributions::default()),
                },
                revision: 0,
                owned: Vec::new(),
                announced: Vec::new(),
            });
            (parent_id, child_id, ScopeIndex(scopes.len() - 1))
        };
        tracing::debug!(scope = %child_id, deprecated, "created class loader scope");
        self.registry.listener.child_scope_created(&parent_id, &child_id);
        self.handle(index)
    }

    /// Create a locked child with a single loader over `class_path`
    ///
    /// # Errors
    /// Propagates failures to obtain this scope's export loader
    pub fn create_immutable_child(
        &self,
        name: &str,
        class_path: ClassPath,
        implementation_hash: Option<ContentHash>,
    ) -> Result<ClassLoaderScope> {
        let parent_export = self.export_class_loader()?;
        let parent_id = self.id();
        let child_id = parent_id.child(name);
        let loader_id = child_id.immutable_id();
        let loader = self
            .registry
            .cache
            .get(&loader_id, &class_path, &[parent_export], implementation_hash, false);

        let index = {
            let mut scopes = self.registry.scopes.write();
            scopes.push(ScopeRecord {
                id: child_id.clone(),
                parent: self.index,
                kind: ScopeKind::Immutable(Loaders {
                    local: Arc::clone(&loader),
                    export: Arc::clone(&loader),
                }),
                revision: 0,
                owned: vec![loader],
                announced: vec![(loader_id.clone(), class_path.clone())],
            });
            ScopeIndex(scopes.len() - 1)
        };
        let listener = &self.registry.listener;
        listener.child_scope_created(&parent_id, &child_id);
        listener.class_loader_created(&child_id, &loader_id, &class_path);
        Ok(self.handle(index))
    }

    /// Add classpath visible to this scope only
    ///
    /// # Errors
    /// [`ScopeError::Locked`] once locked, [`ScopeError::Unsupported`] on
    /// root and immutable scopes. An empty classpath is always accepted.
    pub fn local(&self, class_path: ClassPath) -> Result<Self> {
        self.contribute(Contribution::Local(class_path))
    }

    /// Add classpath visible to this scope and its descendants
    ///
    /// # Errors
    /// Same as [`Self::local`]
    pub fn export(&self, class_path: ClassPath) -> Result<Self> {
        self.contribute(Contribution::Export(class_path))
    }

    /// Add an existing loader visible to this scope and its descendants
    ///
    /// # Errors
    /// Same as [`Self::local`]
    pub fn export_loader(&self, loader: Arc<ClassLoader>) -> Result<Self> {
        self.contribute(Contribution::ExportLoader(loader))
    }

    fn contribute(&self, contribution: Contribution) -> Result<Self> {
        if contribution.is_empty() {
            return Ok(self.clone());
        }
        let announced = {
            let mut scopes = self.registry.scopes.write();
            let record = &mut scopes[self.index.0];
            let ScopeKind::Default { deprecated, state } = &mut record.kind else {
                return Err(ScopeError::Unsupported {
                    scope: record.id.clone(),
                    operation: contribution.operation(),
                });
            };
            let deprecated = *deprecated;
            let announced = match state {
                ScopeState::Locked(_) | ScopeState::Built(_) => {
                    return Err(ScopeError::Locked {
                        scope: record.id.clone(),
                    });
                }
                ScopeState::Collecting(pending) => {
                    match contribution {
                        Contribution::Local(cp) => pending.local = pending.local.plus(&cp),
                        Contribution::Export(cp) => pending.export = pending.export.plus(&cp),
                        Contribution::ExportLoader(loader) => pending.export_loaders.push(loader),
                    }
                    None
                }
                ScopeState::EagerlyBuilt(loaders) => {
                    let (target, id, cp) = match contribution {
                        Contribution::Local(cp) => (&loaders.local, record.id.local_id(), cp),
                        Contribution::Export(cp) => (&loaders.export, record.id.export_id(), cp),
                        Contribution::ExportLoader(loader) => {
                            loaders.export.add_parent(loader);
                            record.revision += 1;
                            return Ok(self.clone());
                        }
                    };
                    let added = ClassLoader::create(id.clone(), cp.clone(), Vec::new(), None, deprecated);
                    target.add_parent(Arc::clone(&added));
                    record.owned.push(added);
                    record.announced.push((id.clone(), cp.clone()));
                    Some((record.id.clone(), id, cp))
                }
            };
            record.revision += 1;
            announced
        };
        if let Some((scope, loader, cp)) = announced {
            self.registry.listener.class_loader_created(&scope, &loader, &cp);
        }
        Ok(self.clone())
    }

    /// Freeze contributions
    ///
    /// Idempotent. A no-op on root and immutable scopes.
    #[allow(clippy::must_use_candidate)]
    pub fn lock(&self) -> Self {
        let mut scopes = self.registry.scopes.write();
        let record = &mut scopes[self.index.0];
        if let ScopeKind::Default { state, .. } = &mut record.kind {
            let previous = std::mem::replace(state, ScopeState::Collecting(Contributions::default()));
            *state = match previous {
                ScopeState::Collecting(pending) => ScopeState::Locked(pending),
                ScopeState::EagerlyBuilt(loaders) => ScopeState::Built(loaders),
                locked => locked,
            };
            record.revision += 1;
            tracing::debug!(scope = %record.id, "locked class loader scope");
        }
        drop(scopes);
        self.clone()
    }

    /// Loader seeing this scope's local and exported classpath plus
    /// everything its ancestors export
    ///
    /// # Errors
    /// [`ScopeError::DefinedBeforeLocked`] in strict mode when this scope or
    /// an ancestor is not locked yet
    pub fn local_class_loader(&self) -> Result<Arc<ClassLoader>> {
        Ok(self.loaders()?.local)
    }

    /// Loader seeing this scope's exported classpath plus everything its
    /// ancestors export
    ///
    /// # Errors
    /// Same as [`Self::local_class_loader`]
    pub fn export_class_loader(&self) -> Result<Arc<ClassLoader>> {
        Ok(self.loaders()?.export)
    }

    fn plan(&self) -> Plan {
        let scopes = self.registry.scopes.read();
        let record = &scopes[self.index.0];
        match &record.kind {
            ScopeKind::Root(loaders) | ScopeKind::Immutable(loaders) => Plan::Ready(loaders.clone()),
            ScopeKind::Default { deprecated, state } => match state {
                ScopeState::EagerlyBuilt(loaders) | ScopeState::Built(loaders) => Plan::Ready(loaders.clone()),
                ScopeState::Collecting(pending) | ScopeState::Locked(pending) => Plan::Build {
                    id: record.id.clone(),
                    parent: record.parent,
                    deprecated: *deprecated,
                    eager: matches!(state, ScopeState::Collecting(_)),
                    revision: record.revision,
                    contributions: pending.clone(),
                },
            },
        }
    }

    fn loaders(&self) -> Result<Loaders> {
        loop {
            let (id, parent, deprecated, eager, revision, contributions) = match self.plan() {
                Plan::Ready(loaders) => return Ok(loaders),
                Plan::Build {
                    id,
                    parent,
                    deprecated,
                    eager,
                    revision,
                    contributions,
                } => (id, parent, deprecated, eager, revision, contributions),
            };

            if eager {
                if self.registry.config.strict {
                    return Err(ScopeError::DefinedBeforeLocked { scope: id });
                }
                tracing::warn!(
                    scope = %id,
                    "class loader requested before scope is locked, building flexible loaders"
                );
            }

            let parent_export = self.handle(parent).export_class_loader()?;
            let built = if eager {
                build_eager(&id, &contributions, parent_export, deprecated)
            } else {
                build_locked(self.registry.cache.as_ref(), &id, &contributions, parent_export, deprecated)
            };

            if self.install(revision, eager, &built) {
                for (loader, cp) in &built.announced {
                    self.registry.listener.class_loader_created(&id, loader, cp);
                }
                return Ok(built.loaders);
            }
        }
    }

    /// Store freshly built loaders unless the scope changed meanwhile
    fn install(&self, revision: u64, eager: bool, built: &BuiltLoaders) -> bool {
        let mut scopes = self.registry.scopes.write();
        let record = &mut scopes[self.index.0];
        if record.revision != revision {
            return false;
        }
        let ScopeKind::Default { state, .. } = &mut record.kind else {
            return false;
        };
        *state = if eager {
            ScopeState::EagerlyBuilt(built.loaders.clone())
        } else {
            ScopeState::Built(built.loaders.clone())
        };
        record.revision += 1;
        record.owned.extend(built.owned.iter().cloned());
        record.announced.extend(built.announced.iter().cloned());
        true
    }

    /// Check if one of this scope's own loaders defined `class`
    ///
    /// Loaders inherited from ancestors do not count.
    #[must_use]
    pub fn defines(&self, class: &LoadedClass) -> bool {
        self.registry.scopes.read()[self.index.0]
            .owned
            .iter()
            .any(|loader| loader.defines(class))
    }

    /// Announce this scope and its loaders to the listener again
    ///
    /// Ancestors are announced first. Nothing is rebuilt.
    pub fn on_reuse(&self) {
        let (parent, parent_id, id, announced, is_root) = {
            let scopes = self.registry.scopes.read();
            let record = &scopes[self.index.0];
            (
                record.parent,
                scopes[record.parent.0].id.clone(),
                record.id.clone(),
                record.announced.clone(),
                matches!(record.kind, ScopeKind::Root(_)),
            )
        };
        if is_root {
            return;
        }
        self.handle(parent).on_reuse();
        let listener = &self.registry.listener;
        listener.child_scope_created(&parent_id, &id);
        for (loader, cp) in &announced {
            listener.class_loader_created(&id, loader, cp);
        }
    }
}

impl PartialEq for ClassLoaderScope {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.registry, &other.registry) && self.index == other.index
    }
}

impl Eq for ClassLoaderScope {}

impl fmt::Debug for ClassLoaderScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassLoaderScope")
            .field("id", &self.id())
            .field("locked", &self.is_locked())
            .finish()
    }
}

impl fmt::Display for ClassLoaderScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.id(), f)
    }
}

/// Multi-parent loaders that accept more parents later
fn build_eager(
    id: &ClassLoaderScopeId,
    contributions: &Contributions,
    parent_export: Arc<ClassLoader>,
    deprecated: bool,
) -> BuiltLoaders {
    let mut owned = Vec::new();
    let mut announced = Vec::new();

    let mut export_parents = vec![parent_export];
    if !contributions.export.is_empty() {
        let loader = ClassLoader::create(id.export_id(), contributions.export.clone(), Vec::new(), None, deprecated);
        owned.push(Arc::clone(&loader));
        export_parents.push(loader);
    }
    export_parents.extend(contributions.export_loaders.iter().cloned());
    let export = ClassLoader::new(id.export_id(), ClassPath::empty(), export_parents);
    owned.push(Arc::clone(&export));
    announced.push((id.export_id(), contributions.export.clone()));

    let mut local_parents = vec![Arc::clone(&export)];
    if !contributions.local.is_empty() {
        let loader = ClassLoader::create(id.local_id(), contributions.local.clone(), Vec::new(), None, deprecated);
        owned.push(Arc::clone(&loader));
        local_parents.push(loader);
    }
    let local = ClassLoader::new(id.local_id(), ClassPath::empty(), local_parents);
    owned.push(Arc::clone(&local));
    announced.push((id.local_id(), contributions.local.clone()));

    BuiltLoaders {
        loaders: Loaders { local, export },
        owned,
        announced,
    }
}

/// Shortest delegation chain for the final contributions
fn build_locked(
    cache: &dyn ClassLoaderCache,
    id: &ClassLoaderScopeId,
    contributions: &Contributions,
    parent_export: Arc<ClassLoader>,
    deprecated: bool,
) -> BuiltLoaders {
    let mut owned = Vec::new();
    let mut announced = Vec::new();

    let export = if contributions.has_export() {
        let mut parents = vec![parent_export];
        parents.extend(contributions.export_loaders.iter().cloned());
        let loader = cached_loader(cache, &id.export_id(), &contributions.export, &parents, deprecated);
        owned.push(Arc::clone(&loader));
        announced.push((id.export_id(), contributions.export.clone()));
        loader
    } else {
        parent_export
    };

    let local = if contributions.local.is_empty() {
        Arc::clone(&export)
    } else {
        let loader = cached_loader(
            cache,
            &id.local_id(),
            &contributions.local,
            &[Arc::clone(&export)],
            deprecated,
        );
        owned.push(Arc::clone(&loader));
        announced.push((id.local_id(), contributions.local.clone()));
        loader
    };

    BuiltLoaders {
        loaders: Loaders { local, export },
        owned,
        announced,
    }
}

fn cached_loader(
    cache: &dyn ClassLoaderCache,
    id: &ClassLoaderId,
    class_path: &ClassPath,
    parents: &[Arc<ClassLoader>],
    deprecated: bool,
) -> Arc<ClassLoader> {
    cache.get(id, class_path, parents, None, deprecated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn class_dir(classes: &[&str]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for class in classes {
            let file = dir.path().join(format!("{}.class", class.replace('.', "/")));
            fs::create_dir_all(file.parent().unwrap()).unwrap();
            fs::write(file, b"").unwrap();
        }
        dir
    }

    fn registry() -> ClassLoaderScopeRegistry {
        ClassLoaderScopeRegistry::new("root", ClassPath::empty())
    }

    #[test]
    fn child_ids_extend_parent_id() {
        let registry = registry();
        let child = registry.root_scope().create_child("settings").create_child("plugin");
        assert_eq!(child.id().to_string(), "root:settings:plugin");
        assert_eq!(child.parent().id().to_string(), "root:settings");
        assert_eq!(registry.root_scope().parent(), registry.root_scope());
        assert_eq!(registry.scope_count(), 3);
    }

    #[test]
    fn empty_scope_collapses_to_parent_export() {
        let registry = registry();
        let root_export = registry.root_scope().export_class_loader().unwrap();
        let child = registry.root_scope().create_child("empty").lock();

        let local = child.local_class_loader().unwrap();
        let export = child.export_class_loader().unwrap();
        assert!(Arc::ptr_eq(&local, &root_export));
        assert!(Arc::ptr_eq(&export, &root_export));
        assert_eq!(registry.cache().size(), 0);
    }

    #[test]
    fn local_only_scope_keeps_parent_export() {
        let dir = class_dir(&["a.Local"]);
        let registry = registry();
        let root_export = registry.root_scope().export_class_loader().unwrap();
        let child = registry
            .root_scope()
            .create_child("c")
            .local(ClassPath::of(dir.path()))
            .unwrap()
            .lock();

        let local = child.local_class_loader().unwrap();
        assert!(Arc::ptr_eq(&child.export_class_loader().unwrap(), &root_export));
        assert_eq!(local.parents().len(), 1);
        assert!(local.load_class("a.Local").is_some());
    }

    #[test]
    fn export_only_scope_shares_one_loader() {
        let dir = class_dir(&["a.Api"]);
        let registry = registry();
        let child = registry
            .root_scope()
            .create_child("c")
            .export(ClassPath::of(dir.path()))
            .unwrap()
            .lock();
        let local = child.local_class_loader().unwrap();
        let export = child.export_class_loader().unwrap();
        assert!(Arc::ptr_eq(&local, &export));
        let class = export.load_class("a.Api").unwrap();
        assert!(child.defines(&class));
    }

    #[test]
    fn local_loader_delegates_to_export_loader() {
        let local_dir = class_dir(&["a.Impl"]);
        let export_dir = class_dir(&["a.Api"]);
        let registry = registry();
        let child = registry
            .root_scope()
            .create_child("c")
            .local(ClassPath::of(local_dir.path()))
            .unwrap()
            .export(ClassPath::of(export_dir.path()))
            .unwrap()
            .lock();

        let local = child.local_class_loader().unwrap();
        let export = child.export_class_loader().unwrap();
        assert!(Arc::ptr_eq(&local.parents()[0], &export));
        assert!(local.load_class("a.Api").is_some());
        assert!(export.load_class("a.Impl").is_none());
    }

    #[test]
    fn mutation_after_lock_fails() {
        let registry = registry();
        let child = registry.root_scope().create_child("c").lock();
        let err = child.local(ClassPath::of("/classes")).unwrap_err();
        assert!(matches!(err, ScopeError::Locked { .. }));
        assert!(child.local(ClassPath::empty()).is_ok());
        assert!(child.is_locked());
    }

    #[test]
    fn root_rejects_contributions() {
        let registry = registry();
        let err = registry.root_scope().export(ClassPath::of("/x")).unwrap_err();
        assert!(matches!(err, ScopeError::Unsupported { operation: "export", .. }));
    }

    #[test]
    fn eager_loader_sees_later_contributions() {
        let dir = class_dir(&["late.Added"]);
        let registry = registry();
        let child = registry.root_scope().create_child("c");

        let local = child.local_class_loader().unwrap();
        assert!(local.load_class("late.Added").is_none());

        child.local(ClassPath::of(dir.path())).unwrap();
        let class = local.load_class("late.Added").unwrap();
        assert!(child.defines(&class));

        let locked = child.lock();
        assert!(Arc::ptr_eq(&locked.local_class_loader().unwrap(), &local));
    }

    #[test]
    fn strict_mode_refuses_eager_loaders() {
        let registry = ClassLoaderScopeRegistry::builder()
            .with_config(ScopeConfig::new().with_strict(true))
            .build("root", ClassPath::empty());
        let child = registry.root_scope().create_child("c");
        let err = child.export_class_loader().unwrap_err();
        assert_eq!(err, ScopeError::DefinedBeforeLocked { scope: child.id() });

        child.lock();
        assert!(child.export_class_loader().is_ok());
    }

    #[test]
    fn immutable_child_is_locked_and_loads() {
        let dir = class_dir(&["fixed.Class"]);
        let registry = registry();
        let child = registry
            .root_scope()
            .create_immutable_child("fixed", ClassPath::of(dir.path()), Some(ContentHash::compute(b"v1")))
            .unwrap();
        assert!(child.is_locked());
        let loader = child.local_class_loader().unwrap();
        assert_eq!(loader.id().to_string(), "root:fixed(immutable)");
        assert_eq!(loader.implementation_hash(), Some(ContentHash::compute(b"v1")));
        assert!(loader.load_class("fixed.Class").is_some());
        assert!(matches!(
            child.local(ClassPath::of(dir.path())),
            Err(ScopeError::Unsupported { .. })
        ));
    }

    #[test]
    fn deprecated_child_builds_deprecated_loaders() {
        let dir = class_dir(&["old.Api"]);
        let registry = registry();
        let child = registry
            .root_scope()
            .create_deprecated_child("old")
            .export(ClassPath::of(dir.path()))
            .unwrap()
            .lock();
        let loader = child.export_class_loader().unwrap();
        assert!(loader.is_deprecated());
        assert!(loader.load_class("old.Api").is_some());
    }
}
