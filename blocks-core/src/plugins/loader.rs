//! Module loaders - turn one file into the plugin declarations it exports

use libloading::Library;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use blocks_plugin_api::{
    API_VERSION, API_VERSION_SYMBOL, PluginDeclaration, PluginRegistrar, REGISTER_SYMBOL,
};

use super::error::PluginHostError;

/// Name a loaded unit is keyed by.
///
/// Derived from the full file name, extension included, so `stats.so` and
/// `stats.dll` in the same directory never share a name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UnitName(String);

impl UnitName {
    pub fn from_path(path: &Path) -> Option<Self> {
        path.file_name()
            .map(|name| Self(name.to_string_lossy().into_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UnitName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Result of loading one unit: its declarations plus whatever keeps their code mapped
pub struct LoadedModule {
    declarations: Vec<PluginDeclaration>,
    library: Option<Arc<Library>>,
}

impl LoadedModule {
    /// A module whose declarations live in the host binary itself
    pub fn new(declarations: Vec<PluginDeclaration>) -> Self {
        Self {
            declarations,
            library: None,
        }
    }

    /// A module backed by a dynamic library that must outlive its instances
    pub fn with_library(declarations: Vec<PluginDeclaration>, library: Library) -> Self {
        Self {
            declarations,
            library: Some(Arc::new(library)),
        }
    }

    pub fn declarations(&self) -> &[PluginDeclaration] {
        &self.declarations
    }

    pub(crate) fn library(&self) -> Option<Arc<Library>> {
        self.library.clone()
    }
}

impl fmt::Debug for LoadedModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedModule")
            .field("declarations", &self.declarations)
            .field("native", &self.library.is_some())
            .finish()
    }
}

/// Loads one candidate file into a [`LoadedModule`].
///
/// The host picks a loader by file extension. Each call loads an independent
/// unit; a loader must not let one unit's declarations leak into another's.
pub trait ModuleLoader: Send + Sync {
    fn load(&self, unit: &UnitName, path: &Path) -> Result<LoadedModule, PluginHostError>;
}

/// Loads native plugin libraries built with `blocks_plugin_api::export_plugins!`
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeLoader;

impl NativeLoader {
    /// Dynamic library extensions for the current platform
    pub fn default_extensions() -> &'static [&'static str] {
        if cfg!(target_os = "macos") {
            &["dylib", "so"]
        } else if cfg!(target_os = "windows") {
            &["dll"]
        } else {
            &["so"]
        }
    }
}

impl ModuleLoader for NativeLoader {
    fn load(&self, unit: &UnitName, path: &Path) -> Result<LoadedModule, PluginHostError> {
        // SAFETY: Plugin libraries run with full host privileges. The plugin
        // directory is trusted by whoever operates the application.
        let library = unsafe { Library::new(path)? };

        let missing = |symbol: &[u8], source| PluginHostError::MissingEntryPoint {
            unit: unit.to_string(),
            symbol: String::from_utf8_lossy(symbol).into_owned(),
            source,
        };

        // SAFETY: The symbol is generated by `export_plugins!` with this signature.
        let api_version_fn = *unsafe { library.get::<extern "C" fn() -> u32>(API_VERSION_SYMBOL) }
            .map_err(|e| missing(API_VERSION_SYMBOL, e))?;

        let found = api_version_fn();
        if found != API_VERSION {
            return Err(PluginHostError::ApiVersionMismatch {
                unit: unit.to_string(),
                expected: API_VERSION,
                found,
            });
        }

        // SAFETY: Same as above. The API version check guarantees the
        // registrar layout matches what the library was built against.
        let register_fn = *unsafe {
            library.get::<extern "C" fn(&mut PluginRegistrar)>(REGISTER_SYMBOL)
        }
        .map_err(|e| missing(REGISTER_SYMBOL, e))?;

        let mut registrar = PluginRegistrar::new();
        register_fn(&mut registrar);

        tracing::debug!(
            unit = %unit,
            declared = registrar.len(),
            "Native plugin unit registered"
        );

        Ok(LoadedModule::with_library(
            registrar.into_declarations(),
            library,
        ))
    }
}
