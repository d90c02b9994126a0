//! Scope that can be swapped for a fresh sibling

use crate::scope::ClassLoaderScope;
use parking_lot::RwLock;

/// Stands in for a child scope that is recreated whenever its inputs change
///
/// Each [`mutate`](Self::mutate) replaces the delegate with a new, empty child
/// of the same parent. Handles taken earlier keep pointing at the old scope.
#[derive(Debug)]
pub struct MutableClassLoaderScope {
    parent: ClassLoaderScope,
    name: String,
    generation: RwLock<(u32, ClassLoaderScope)>,
}

impl MutableClassLoaderScope {
    /// Create the first delegate as child `name` of `parent`
    #[must_use]
    pub fn new(parent: ClassLoaderScope, name: impl Into<String>) -> Self {
        let name = name.into();
        let delegate = parent.create_child(&name);
        Self {
            parent,
            name,
            generation: RwLock::new((0, delegate)),
        }
    }

    /// Current delegate
    #[must_use]
    pub fn delegate(&self) -> ClassLoaderScope {
        self.generation.read().1.clone()
    }

    /// Number of times the delegate has been replaced
    #[must_use]
    pub fn generation(&self) -> u32 {
        self.generation.read().0
    }

    /// Replace the delegate with a new child named `name` plus `suffix`
    ///
    /// Concurrent calls are serialized; the child created last is the one
    /// left in place.
    pub fn mutate(&self, suffix: &str) -> ClassLoaderScope {
        let mut generation = self.generation.write();
        let fresh = self.parent.create_child(&format!("{}{suffix}", self.name));
        generation.0 += 1;
        generation.1 = fresh.clone();
        tracing::debug!(scope = %fresh, generation = generation.0, "replaced mutable scope delegate");
        fresh
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classpath::ClassPath;
    use crate::identifier::{ClassLoaderId, ClassLoaderScopeId};
    use crate::listener::ClassLoaderScopeRegistryListener;
    use crate::scope::ClassLoaderScopeRegistry;
    use parking_lot::Mutex;
    use std::sync::Arc;
    use std::thread;

    #[derive(Default)]
    struct CreatedChildren(Mutex<Vec<ClassLoaderScopeId>>);

    impl ClassLoaderScopeRegistryListener for CreatedChildren {
        fn child_scope_created(&self, _parent: &ClassLoaderScopeId, child: &ClassLoaderScopeId) {
            self.0.lock().push(child.clone());
        }

        fn class_loader_created(&self, _scope: &ClassLoaderScopeId, _loader: &ClassLoaderId, _class_path: &ClassPath) {}
    }

    #[test]
    fn mutate_starts_over_unlocked() {
        let registry = ClassLoaderScopeRegistry::new("root", ClassPath::empty());
        let mutable = MutableClassLoaderScope::new(registry.root_scope(), "script");
        let first = mutable.delegate();
        first.local(ClassPath::of("/one")).unwrap().lock();

        let second = mutable.mutate("-2");
        assert_eq!(second.id().to_string(), "root:script-2");
        assert!(!second.is_locked());
        assert_eq!(mutable.delegate(), second);
        assert_eq!(mutable.generation(), 1);
        assert!(first.is_locked());
        assert_eq!(second.parent(), registry.root_scope());
    }

    #[test]
    fn concurrent_mutations_leave_the_last_child_in_place() {
        let created = Arc::new(CreatedChildren::default());
        let registry = ClassLoaderScopeRegistry::builder()
            .with_listener(created.clone())
            .build("root", ClassPath::empty());
        let mutable = MutableClassLoaderScope::new(registry.root_scope(), "script");

        thread::scope(|scope| {
            for i in 0..8 {
                let mutable = &mutable;
                scope.spawn(move || mutable.mutate(&format!("-{i}")));
            }
        });

        assert_eq!(mutable.generation(), 8);
        assert_eq!(registry.scope_count(), 10);
        let last = created.0.lock().last().cloned().unwrap();
        assert_eq!(mutable.delegate().id(), last);
    }
}
