//! blocks-plugin-api - Plugin API for the NobleBlocks plugin host
//!
//! This crate provides the traits and types needed to write plugins for
//! NobleBlocks. A plugin library is a native dynamic library that declares one
//! or more plugin types through a registration entry point. The host scans its
//! plugin directory, loads each library, constructs every declared type with a
//! shared [`HostContext`] and activates it exactly once.
//!
//! # Example
//!
//! ```ignore
//! use blocks_plugin_api::{export_plugins, HostContext, Plugin, PluginError, PluginFactory};
//!
//! pub struct PaperStats {
//!     ctx: HostContext,
//! }
//!
//! impl PluginFactory for PaperStats {
//!     fn create(ctx: &HostContext) -> Result<Self, PluginError> {
//!         Ok(Self { ctx: ctx.clone() })
//!     }
//! }
//!
//! impl Plugin for PaperStats {
//!     fn name(&self) -> &str {
//!         "paper-stats"
//!     }
//!
//!     fn activate(&mut self) -> Result<(), PluginError> {
//!         self.ctx.log_info(self.name(), "Paper stats ready");
//!         Ok(())
//!     }
//! }
//!
//! export_plugins!(PaperStats);
//! ```

pub mod context;
pub mod error;
pub mod guard;
pub mod types;

pub use context::{HostContext, LogSink, PluginConfig};
pub use error::PluginError;
pub use guard::{PanicGuard, catch_panic, panic_message};
pub use types::{ConstructFn, PluginDeclaration, PluginRegistrar};

/// Current plugin API version. Plugin libraries must match this exactly.
pub const API_VERSION: u32 = 1;

/// Symbol a plugin library exports to report its [`API_VERSION`].
pub const API_VERSION_SYMBOL: &[u8] = b"_blocks_plugin_api_version";

/// Symbol a plugin library exports to register its plugin types.
pub const REGISTER_SYMBOL: &[u8] = b"_blocks_plugin_register";

/// The capability contract every plugin implements.
///
/// An instance is created by [`PluginFactory::create`], activated once by the
/// host and deactivated once when the host shuts down.
pub trait Plugin: Send {
    /// Human-readable plugin name, used for diagnostics and lookups
    fn name(&self) -> &str;

    /// Called exactly once, synchronously, right after construction.
    fn activate(&mut self) -> Result<(), PluginError>;

    /// Called once at host shutdown for plugins that activated successfully.
    fn deactivate(&mut self) -> Result<(), PluginError> {
        Ok(())
    }
}

/// Construction half of the contract.
///
/// Each plugin type receives the shared host context when it is built.
pub trait PluginFactory: Plugin + Sized + 'static {
    fn create(ctx: &HostContext) -> Result<Self, PluginError>;
}

/// Export plugin types for dynamic loading.
///
/// Generates the C ABI entry points the host looks up in every library:
///
/// - `_blocks_plugin_api_version()`: returns [`API_VERSION`]
/// - `_blocks_plugin_register(&mut PluginRegistrar)`: declares each listed type,
///   in the order given
///
/// Panics raised by the listed types are caught inside the library and
/// reported to the host as [`PluginError::Panicked`].
///
/// # Usage
///
/// ```ignore
/// blocks_plugin_api::export_plugins!(PaperStats, DownloadWatcher);
/// ```
#[macro_export]
macro_rules! export_plugins {
    ($($plugin_type:ty),+ $(,)?) => {
        #[unsafe(no_mangle)]
        pub extern "C" fn _blocks_plugin_api_version() -> u32 {
            $crate::API_VERSION
        }

        #[unsafe(no_mangle)]
        #[allow(improper_ctypes_definitions)]
        pub extern "C" fn _blocks_plugin_register(registrar: &mut $crate::PluginRegistrar) {
            $(registrar.register::<$plugin_type>();)+
        }
    };
}
