//! Scope and loader identifiers

use std::fmt;
use std::sync::Arc;

/// Hierarchical scope identifier, rendered `root:child:grandchild`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassLoaderScopeId {
    path: Arc<str>,
}

impl ClassLoaderScopeId {
    /// Identifier of a root scope
    #[must_use]
    pub fn root(name: &str) -> Self {
        Self {
            path: Arc::from(name),
        }
    }

    /// Identifier of a child named `name`
    #[must_use]
    pub fn child(&self, name: &str) -> Self {
        Self {
            path: Arc::from(format!("{}:{name}", self.path)),
        }
    }

    /// Full path
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.path
    }

    /// Last segment
    #[must_use]
    pub fn name(&self) -> &str {
        self.path.rsplit(':').next().unwrap_or(&self.path)
    }

    /// Number of segments
    #[must_use]
    pub fn depth(&self) -> usize {
        self.path.split(':').count()
    }

    /// Identifier of this scope's local loader
    #[inline]
    #[must_use]
    pub fn local_id(&self) -> ClassLoaderId {
        ClassLoaderId::new(self.clone(), LoaderRole::Local)
    }

    /// Identifier of this scope's export loader
    #[inline]
    #[must_use]
    pub fn export_id(&self) -> ClassLoaderId {
        ClassLoaderId::new(self.clone(), LoaderRole::Export)
    }

    /// Identifier of the single loader of an immutable scope
    #[inline]
    #[must_use]
    pub fn immutable_id(&self) -> ClassLoaderId {
        ClassLoaderId::new(self.clone(), LoaderRole::Immutable)
    }
}

impl fmt::Display for ClassLoaderScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)
    }
}

/// What a loader is for within its scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LoaderRole {
    /// Sees local and exported classes
    Local,
    /// Sees exported classes, inherited by children
    Export,
    /// Sole loader of an immutable scope
    Immutable,
}

impl LoaderRole {
    /// Lower-case name used in identifiers
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Export => "export",
            Self::Immutable => "immutable",
        }
    }
}

/// Identifier of a loader, rendered `scope(role)`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassLoaderId {
    scope: ClassLoaderScopeId,
    role: LoaderRole,
}

impl ClassLoaderId {
    /// Create identifier
    #[inline]
    #[must_use]
    pub fn new(scope: ClassLoaderScopeId, role: LoaderRole) -> Self {
        Self { scope, role }
    }

    /// Owning scope
    #[inline]
    #[must_use]
    pub fn scope(&self) -> &ClassLoaderScopeId {
        &self.scope
    }

    /// Role within the scope
    #[inline]
    #[must_use]
    pub fn role(&self) -> LoaderRole {
        self.role
    }
}

impl fmt::Display for ClassLoaderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.scope, self.role.as_str())
    }
}
