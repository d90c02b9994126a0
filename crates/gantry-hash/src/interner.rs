//! String interning for paths and file names
//!
//! Snapshot trees repeat the same names and path prefixes many times. An
//! interner hands out one shared `Arc<str>` per distinct string.

use dashmap::DashSet;
use std::sync::Arc;

/// Hands out a canonical shared copy of a string
pub trait StringInterner: Send + Sync {
    /// Canonical copy of `value`
    fn intern(&self, value: &str) -> Arc<str>;
}

/// Concurrent interner backed by a `DashSet`
#[derive(Debug, Default)]
pub struct ConcurrentInterner {
    strings: DashSet<Arc<str>>,
}

impl ConcurrentInterner {
    /// Create empty interner
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct strings held
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    /// Check if nothing has been interned
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}

impl StringInterner for ConcurrentInterner {
    fn intern(&self, value: &str) -> Arc<str> {
        if let Some(existing) = self.strings.get(value) {
            return Arc::clone(&existing);
        }
        let candidate: Arc<str> = Arc::from(value);
        // Another thread may have inserted the same string meanwhile.
        if self.strings.insert(Arc::clone(&candidate)) {
            candidate
        } else {
            self.strings
                .get(value)
                .map_or(candidate, |existing| Arc::clone(&existing))
        }
    }
}

/// Interner that allocates a fresh copy every time
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopInterner;

impl StringInterner for NoopInterner {
    fn intern(&self, value: &str) -> Arc<str> {
        Arc::from(value)
    }
}
