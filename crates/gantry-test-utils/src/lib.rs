//! Testing utilities for the Gantry workspace
//!
//! Shared fixtures: throwaway directory trees and a recording scope listener.

#![allow(missing_docs)]
#![allow(clippy::missing_panics_doc)]

use gantry_scope::{ClassLoaderId, ClassLoaderScopeId, ClassLoaderScopeRegistryListener, ClassPath};
use parking_lot::Mutex;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Route `tracing` output to the test harness, honouring `RUST_LOG`
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Temporary directory tree removed on drop
///
/// The root is canonicalized so snapshots and expectations agree on paths
/// even when the temp dir lives behind a symlink.
#[derive(Debug)]
pub struct TempTree {
    _dir: TempDir,
    root: PathBuf,
}

impl TempTree {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        Self { _dir: dir, root }
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    pub fn join(&self, relative: &str) -> PathBuf {
        self.root.join(relative)
    }

    /// Write a file, creating missing parents
    pub fn file(&self, relative: &str, contents: &str) -> PathBuf {
        let path = self.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, contents).unwrap();
        path
    }

    pub fn dir(&self, relative: &str) -> PathBuf {
        let path = self.join(relative);
        fs::create_dir_all(&path).unwrap();
        path
    }

    #[cfg(unix)]
    pub fn symlink(&self, relative: &str, target: impl AsRef<Path>) -> PathBuf {
        let path = self.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        std::os::unix::fs::symlink(target, &path).unwrap();
        path
    }

    /// Empty class files for `classes` under `relative`, returned as a classpath
    pub fn class_files(&self, relative: &str, classes: &[&str]) -> ClassPath {
        let root = self.dir(relative);
        for class in classes {
            self.file(&format!("{relative}/{}.class", class.replace('.', "/")), "");
        }
        ClassPath::of(root)
    }
}

impl Default for TempTree {
    fn default() -> Self {
        Self::new()
    }
}

/// Listener keeping every callback as a readable line
#[derive(Debug, Default)]
pub struct RecordingListener {
    events: Mutex<Vec<String>>,
}

impl RecordingListener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().clone()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl ClassLoaderScopeRegistryListener for RecordingListener {
    fn child_scope_created(&self, parent: &ClassLoaderScopeId, child: &ClassLoaderScopeId) {
        self.events.lock().push(format!("scope {parent} -> {child}"));
    }

    fn class_loader_created(&self, scope: &ClassLoaderScopeId, loader: &ClassLoaderId, class_path: &ClassPath) {
        self.events
            .lock()
            .push(format!("loader {scope} {loader} roots={}", class_path.len()));
    }
}
