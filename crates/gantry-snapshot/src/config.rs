//! Snapshotter configuration

use crate::error::{Result, SnapshotError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Ant's default excludes
pub const DEFAULT_EXCLUDES: &[&str] = &[
    "**/*~",
    "**/#*#",
    "**/.#*",
    "**/%*%",
    "**/._*",
    "**/CVS",
    "**/CVS/**",
    "**/.cvsignore",
    "**/SCCS",
    "**/SCCS/**",
    "**/vssver.scc",
    "**/.svn",
    "**/.svn/**",
    "**/.DS_Store",
    "**/.git",
    "**/.git/**",
    "**/.gitattributes",
    "**/.gitignore",
    "**/.gitmodules",
    "**/.hg",
    "**/.hg/**",
    "**/.hgignore",
    "**/.hgsub",
    "**/.hgsubstate",
    "**/.hgtags",
    "**/.bzr",
    "**/.bzr/**",
    "**/.bzrignore",
];

/// Snapshotter configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotterConfig {
    /// Ant-style exclude patterns applied to every walk
    pub default_excludes: Vec<String>,
    /// Fixed number of producer lock stripes, overrides `stripes_per_core`
    pub lock_stripes: Option<usize>,
    /// Lock stripes per available core
    pub stripes_per_core: usize,
    /// Maximum number of remembered file digests
    pub file_hash_cache_capacity: usize,
    /// Roots whose contents never change while the process runs
    pub immutable_roots: Vec<PathBuf>,
}

impl SnapshotterConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With exclude patterns replacing the defaults
    #[must_use]
    pub fn with_default_excludes<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.default_excludes = patterns.into_iter().map(Into::into).collect();
        self
    }

    /// With a fixed number of lock stripes
    #[inline]
    #[must_use]
    pub fn with_lock_stripes(mut self, stripes: usize) -> Self {
        self.lock_stripes = Some(stripes);
        self
    }

    /// With lock stripes per available core
    #[inline]
    #[must_use]
    pub fn with_stripes_per_core(mut self, stripes: usize) -> Self {
        self.stripes_per_core = stripes;
        self
    }

    /// With file digest cache capacity
    #[inline]
    #[must_use]
    pub fn with_file_hash_cache_capacity(mut self, capacity: usize) -> Self {
        self.file_hash_cache_capacity = capacity;
        self
    }

    /// With an additional immutable root
    #[must_use]
    pub fn with_immutable_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.immutable_roots.push(root.into());
        self
    }

    /// Parse from TOML
    ///
    /// # Errors
    /// Returns [`SnapshotError::Config`] if the text is not valid TOML for
    /// this structure or fails [`Self::validate`]
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text).map_err(|e| SnapshotError::Config {
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges
    ///
    /// # Errors
    /// Returns [`SnapshotError::Config`] naming the offending field
    pub fn validate(&self) -> Result<()> {
        if self.lock_stripes == Some(0) {
            return Err(SnapshotError::Config {
                reason: "lock_stripes must be at least 1".to_string(),
            });
        }
        if self.stripes_per_core == 0 {
            return Err(SnapshotError::Config {
                reason: "stripes_per_core must be at least 1".to_string(),
            });
        }
        if self.file_hash_cache_capacity == 0 {
            return Err(SnapshotError::Config {
                reason: "file_hash_cache_capacity must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Number of lock stripes to allocate
    #[must_use]
    pub fn effective_lock_stripes(&self) -> usize {
        self.lock_stripes.unwrap_or_else(|| {
            let cores = std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get);
            cores * self.stripes_per_core.max(1)
        })
    }
}

impl Default for SnapshotterConfig {
    fn default() -> Self {
        Self {
            default_excludes: DEFAULT_EXCLUDES.iter().map(|s| (*s).to_string()).collect(),
            lock_stripes: None,
            stripes_per_core: 4,
            file_hash_cache_capacity: 65_536,
            immutable_roots: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_carry_ant_excludes() {
        let config = SnapshotterConfig::default();
        assert!(config.default_excludes.iter().any(|p| p == "**/.git/**"));
        assert_eq!(config.default_excludes.len(), DEFAULT_EXCLUDES.len());
        assert!(config.effective_lock_stripes() >= 4);
    }

    #[test]
    fn parses_partial_toml() {
        let config = SnapshotterConfig::from_toml_str(
            r#"
            lock_stripes = 8
            immutable_roots = ["/opt/cache"]
            "#,
        )
        .unwrap();
        assert_eq!(config.effective_lock_stripes(), 8);
        assert_eq!(config.stripes_per_core, 4);
        assert_eq!(config.immutable_roots, vec![PathBuf::from("/opt/cache")]);
    }

    #[test]
    fn rejects_zero_stripes() {
        let err = SnapshotterConfig::from_toml_str("lock_stripes = 0").unwrap_err();
        assert!(matches!(err, SnapshotError::Config { .. }));
    }

    #[test]
    fn rejects_malformed_toml() {
        assert!(SnapshotterConfig::from_toml_str("lock_stripes = \"many\"").is_err());
    }

    #[test]
    fn builders_compose() {
        let config = SnapshotterConfig::new()
            .with_default_excludes(["**/build/**"])
            .with_stripes_per_core(2)
            .with_file_hash_cache_capacity(10)
            .with_immutable_root("/cache");
        assert_eq!(config.default_excludes, vec!["**/build/**".to_string()]);
        assert_eq!(config.file_hash_cache_capacity, 10);
        assert!(config.validate().is_ok());
    }
}
