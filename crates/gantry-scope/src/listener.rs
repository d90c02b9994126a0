//! Bookkeeping hooks for scope and loader creation

use crate::classpath::ClassPath;
use crate::identifier::{ClassLoaderId, ClassLoaderScopeId};

/// Observes the scope tree as it grows
///
/// [`ClassLoaderScope::on_reuse`] replays the same calls for a scope that is
/// reused rather than rebuilt.
///
/// [`ClassLoaderScope::on_reuse`]: crate::ClassLoaderScope::on_reuse
pub trait ClassLoaderScopeRegistryListener: Send + Sync {
    /// A child scope was created under `parent`
    fn child_scope_created(&self, parent: &ClassLoaderScopeId, child: &ClassLoaderScopeId);

    /// A loader owned by `scope` was created over `class_path`
    fn class_loader_created(&self, scope: &ClassLoaderScopeId, loader: &ClassLoaderId, class_path: &ClassPath);
}

/// Listener that ignores everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopScopeRegistryListener;

impl ClassLoaderScopeRegistryListener for NoopScopeRegistryListener {
    fn child_scope_created(&self, _parent: &ClassLoaderScopeId, _child: &ClassLoaderScopeId) {}

    fn class_loader_created(&self, _scope: &ClassLoaderScopeId, _loader: &ClassLoaderId, _class_path: &ClassPath) {}
}
