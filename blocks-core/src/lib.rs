//! blocks-core: Core library for NobleBlocks
//!
//! This crate hosts the plugin system: it scans a plugin directory, loads each
//! recognized library as an isolated unit, constructs and activates every
//! plugin type the unit declares, and keeps the activated instances for the
//! rest of the process.
//!
//! # Quick Start
//!
//! ```no_run
//! use blocks_core::{HostContext, PluginHost, PluginHostConfig};
//!
//! let ctx = HostContext::for_app("NobleBlocks", blocks_paths::app_dir());
//! let mut host = PluginHost::new(PluginHostConfig::default());
//!
//! let report = host.load_all(&ctx);
//! println!("{} plugins active, {} failures", host.plugin_count(), report.failures.len());
//!
//! host.shutdown();
//! ```

pub mod plugins;

pub use blocks_plugin_api::{HostContext, Plugin, PluginError};
pub use plugins::{
    ActivationStage, ActivePlugin, LoadState, LoadedModule, ModuleLoader, NativeLoader,
    PluginDescriptor, PluginHost, PluginHostConfig, PluginHostError, PluginRegistry, ScanFailure,
    ScanReport, UnitName,
};
