//! Gantry class loader scopes
//!
//! A tree of scopes, each contributing classpath that is visible either to the
//! scope alone or to the scope and all its descendants. Loaders are only built
//! once a scope is locked, so the delegation chain can be collapsed to what the
//! final classpath actually needs.
//!
//! # Core Concepts
//!
//! - [`ClassLoaderScopeRegistry`]: owns a scope tree and its root scope
//! - [`ClassLoaderScope`]: collects local and exported classpath, then locks
//! - [`ClassLoader`]: parent-first resolution of classes over a [`ClassPath`]
//! - [`ClassLoaderCache`]: shares loaders between scopes with identical inputs
//! - [`MutableClassLoaderScope`]: a child scope that is recreated on change
//!
//! # Example
//!
//! ```no_run
//! use gantry_scope::{ClassLoaderScopeRegistry, ClassPath};
//!
//! let registry = ClassLoaderScopeRegistry::new("root", ClassPath::of("/gantry/lib"));
//! let plugin = registry
//!     .root_scope()
//!     .create_child("plugin")
//!     .export(ClassPath::of("/plugin/api"))?
//!     .local(ClassPath::of("/plugin/impl"))?
//!     .lock();
//! let loader = plugin.local_class_loader()?;
//! assert!(loader.load_class("com.example.Plugin").is_some());
//! # Ok::<(), gantry_scope::ScopeError>(())
//! ```

#![warn(unreachable_pub)]

mod cache;
mod classpath;
mod config;
mod error;
mod identifier;
mod listener;
mod loader;
mod mutable;
mod scope;

pub use cache::{ClassLoaderCache, ClassLoaderFactory, ClassLoaderSpec, DefaultClassLoaderCache};
pub use classpath::ClassPath;
pub use config::{ScopeConfig, STRICT_ENV_VAR};
pub use error::{Result, ScopeError};
pub use identifier::{ClassLoaderId, ClassLoaderScopeId, LoaderRole};
pub use listener::{ClassLoaderScopeRegistryListener, NoopScopeRegistryListener};
pub use loader::{ClassLoader, LoadedClass};
pub use mutable::MutableClassLoaderScope;
pub use scope::{ClassLoaderScope, ClassLoaderScopeRegistry, ScopeRegistryBuilder};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
