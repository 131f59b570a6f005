//! Plugin system for NobleBlocks
//!
//! This module provides the infrastructure for discovering and activating plugins:
//!
//! - [`PluginHost`]: Scans a directory, activates plugins, and shuts them down
//! - [`ModuleLoader`]: Turns one file into the plugin declarations it exports
//! - [`PluginRegistry`]: Ordered set of successfully activated plugins
//! - [`PluginHostError`]: Error types for plugin operations
//!
//! # Plugin Discovery
//!
//! Plugins live in a single flat directory, by default `<app dir>/plugins/`.
//! Every file whose extension has a registered loader is a candidate; all
//! other files are ignored. There is no manifest and no load ordering beyond
//! the directory listing.
//!
//! # Failure Isolation
//!
//! A scan never fails as a whole. An unreadable directory, a library that
//! will not load, or a plugin that errors or panics while being constructed
//! or activated is logged, recorded in the [`ScanReport`], and skipped.

mod error;
mod host;
mod loader;
mod registry;

pub use error::{ActivationStage, PluginHostError};
pub use host::{PluginHost, PluginHostConfig, ScanFailure, ScanReport};
pub use loader::{LoadedModule, ModuleLoader, NativeLoader, UnitName};
pub use registry::{ActivePlugin, LoadState, PluginDescriptor, PluginRegistry};
