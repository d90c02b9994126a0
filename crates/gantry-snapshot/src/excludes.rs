//! Default exclude patterns
//!
//! Patterns use the subset of Ant syntax that matters for single path
//! segments. A leading `**/` is ignored. A trailing `/**` excludes directories
//! with that name. A pattern without `*` excludes files with exactly that
//! name. Otherwise the text before the first `*` must prefix the file name and
//! the text after it must suffix it.

use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Eq)]
struct NameMatcher {
    prefix: String,
    suffix: String,
}

impl NameMatcher {
    fn matches(&self, name: &str) -> bool {
        name.starts_with(&self.prefix) && name.ends_with(&self.suffix)
    }
}

/// Compiled default excludes
#[derive(Debug, Clone, Default)]
pub struct DefaultExcludes {
    file_names: HashSet<String>,
    dir_names: HashSet<String>,
    file_matchers: Vec<NameMatcher>,
}

impl DefaultExcludes {
    /// Compile `patterns`
    #[must_use]
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut excludes = Self::default();
        for pattern in patterns {
            let pattern = pattern.as_ref();
            let pattern = pattern.strip_prefix("**/").unwrap_or(pattern);
            if let Some(dir) = pattern.strip_suffix("/**") {
                excludes.dir_names.insert(dir.to_string());
            } else if let Some(star) = pattern.find('*') {
                excludes.file_matchers.push(NameMatcher {
                    prefix: pattern[..star].to_string(),
                    suffix: pattern[star + 1..].to_string(),
                });
            } else {
                excludes.file_names.insert(pattern.to_string());
            }
        }
        excludes
    }

    /// Check if a directory with this name is skipped
    #[inline]
    #[must_use]
    pub fn exclude_dir(&self, name: &str) -> bool {
        self.dir_names.contains(name)
    }

    /// Check if a file with this name is skipped
    #[must_use]
    pub fn exclude_file(&self, name: &str) -> bool {
        self.file_names.contains(name) || self.file_matchers.iter().any(|m| m.matches(name))
    }

    /// Check if nothing is ever excluded
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.file_names.is_empty() && self.dir_names.is_empty() && self.file_matchers.is_empty()
    }
}
