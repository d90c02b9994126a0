//! Error types for class loader scopes

use crate::identifier::ClassLoaderScopeId;

/// Scope misuse or configuration error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScopeError {
    /// Classpath contributed after the scope was locked
    #[error("class loader scope {scope} is locked")]
    Locked {
        /// Offending scope
        scope: ClassLoaderScopeId,
    },

    /// Loader requested before lock while strict mode is on
    #[error("attempt to define scope class loader before scope is locked, scope identifier: {scope}")]
    DefinedBeforeLocked {
        /// Offending scope
        scope: ClassLoaderScopeId,
    },

    /// Operation the scope kind does not support
    #[error("class loader scope {scope} does not support {operation}")]
    Unsupported {
        /// Offending scope
        scope: ClassLoaderScopeId,
        /// Operation name
        operation: &'static str,
    },

    /// Invalid configuration
    #[error("invalid class loader scope configuration: {reason}")]
    Config {
        /// What was wrong
        reason: String,
    },
}

impl ScopeError {
    /// Scope the error is about, if any
    #[must_use]
    pub fn scope(&self) -> Option<&ClassLoaderScopeId> {
        match self {
            Self::Locked { scope }
            | Self::DefinedBeforeLocked { scope }
            | Self::Unsupported { scope, .. } => Some(scope),
            Self::Config { .. } => None,
        }
    }

    /// Check if the error signals a call made in the wrong state
    #[inline]
    #[must_use]
    pub fn is_illegal_state(&self) -> bool {
        matches!(self, Self::Locked { .. } | Self::DefinedBeforeLocked { .. })
    }
}

/// Result alias for scope operations
pub type Result<T> = std::result::Result<T, ScopeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_scope() {
        let scope = ClassLoaderScopeId::root("root").child("plugin");
        let err = ScopeError::Locked { scope: scope.clone() };
        assert_eq!(err.to_string(), "class loader scope root:plugin is locked");
        assert_eq!(err.scope(), Some(&scope));
        assert!(err.is_illegal_state());
        assert!(!ScopeError::Config { reason: "x".into() }.is_illegal_state());
    }
}
