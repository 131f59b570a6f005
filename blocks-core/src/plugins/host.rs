//! PluginHost - discovers, activates, and shuts down plugins

use chrono::Utc;
use libloading::Library;
use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use blocks_plugin_api::{HostContext, Plugin, PluginDeclaration, PluginError, panic_message};

use super::error::{ActivationStage, PluginHostError};
use super::loader::{LoadedModule, ModuleLoader, NativeLoader, UnitName};
use super::registry::{ActivePlugin, LoadState, PluginDescriptor, PluginRegistry};

/// Configuration for PluginHost
#[derive(Debug, Clone)]
pub struct PluginHostConfig {
    /// Directory scanned by [`PluginHost::load_all`]
    pub plugin_dir: PathBuf,
    /// Extensions handled by the native loader; `None` uses the platform defaults
    pub extensions: Option<Vec<String>>,
}

impl Default for PluginHostConfig {
    fn default() -> Self {
        Self {
            plugin_dir: blocks_paths::plugin_dir(),
            extensions: None,
        }
    }
}

/// One thing that went wrong during a scan
#[derive(Debug)]
pub struct ScanFailure {
    /// File the failure belongs to (the directory itself for listing errors)
    pub path: PathBuf,
    pub error: PluginHostError,
}

/// Outcome of a scan pass: what was activated and what was skipped
#[derive(Debug)]
pub struct ScanReport {
    pub directory: PathBuf,
    /// Names of plugins activated by this scan, in activation order
    pub activated: Vec<String>,
    pub failures: Vec<ScanFailure>,
}

impl ScanReport {
    fn new(directory: &Path) -> Self {
        Self {
            directory: directory.to_path_buf(),
            activated: Vec::new(),
            failures: Vec::new(),
        }
    }

    fn fail(&mut self, path: &Path, error: PluginHostError) {
        self.failures.push(ScanFailure {
            path: path.to_path_buf(),
            error,
        });
    }

    /// True when nothing failed
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// True when the directory itself could not be listed
    pub fn directory_unavailable(&self) -> bool {
        self.failures
            .iter()
            .any(|f| matches!(f.error, PluginHostError::DirectoryUnavailable { .. }))
    }
}

/// The plugin host owns every activated plugin for the life of the process.
///
/// Native libraries stay loaded until the host is dropped, even after
/// [`shutdown`](PluginHost::shutdown). A service a native plugin publishes on
/// the [`HostContext`] runs that library's code when it is dropped, so drop
/// the context before the host.
pub struct PluginHost {
    /// Activated plugins in discovery order
    registry: PluginRegistry,
    /// Every native library loaded so far
    libraries: Vec<Arc<Library>>,
    /// Every unit and plugin type seen, including failures
    descriptors: Vec<PluginDescriptor>,
    /// Loaders keyed by lowercase file extension
    loaders: BTreeMap<String, Arc<dyn ModuleLoader>>,
    plugin_dir: PathBuf,
}

impl PluginHost {
    /// Create a host that loads native libraries from the configured directory
    pub fn new(config: PluginHostConfig) -> Self {
        let mut host = Self::with_loaders(config.plugin_dir);
        let native: Arc<dyn ModuleLoader> = Arc::new(NativeLoader);

        match config.extensions {
            Some(extensions) => {
                for ext in &extensions {
                    host.register_loader(ext, native.clone());
                }
            }
            None => {
                for ext in NativeLoader::default_extensions() {
                    host.register_loader(ext, native.clone());
                }
            }
        }

        host
    }

    /// Create a host with no loaders registered
    pub fn with_loaders(plugin_dir: impl Into<PathBuf>) -> Self {
        Self {
            registry: PluginRegistry::new(),
            libraries: Vec::new(),
            descriptors: Vec::new(),
            loaders: BTreeMap::new(),
            plugin_dir: plugin_dir.into(),
        }
    }

    /// Handle files with `extension` (no leading dot) using `loader`
    pub fn register_loader(&mut self, extension: &str, loader: Arc<dyn ModuleLoader>) {
        let ext = extension.trim_start_matches('.').to_ascii_lowercase();
        self.loaders.insert(ext, loader);
    }

    /// Extensions a file must have to be considered, sorted
    pub fn recognized_extensions(&self) -> Vec<&str> {
        self.loaders.keys().map(String::as_str).collect()
    }

    pub fn plugin_dir(&self) -> &Path {
        &self.plugin_dir
    }

    /// Scan the configured plugin directory
    pub fn load_all(&mut self, ctx: &HostContext) -> ScanReport {
        let dir = self.plugin_dir.clone();
        self.load_plugins(ctx, &dir)
    }

    /// Discover and activate every plugin in `dir`.
    ///
    /// Never fails: errors at any level are logged, recorded in the returned
    /// report, and skipped. Files are visited in directory listing order and
    /// plugin types in the order their unit declares them.
    ///
    /// Calling this twice on the same directory activates everything again.
    pub fn load_plugins(&mut self, ctx: &HostContext, dir: &Path) -> ScanReport {
        let mut report = ScanReport::new(dir);

        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(source) => {
                tracing::error!(dir = %dir.display(), error = %source, "Error loading plugins");
                report.fail(
                    dir,
                    PluginHostError::DirectoryUnavailable {
                        path: dir.to_path_buf(),
                        source,
                    },
                );
                return report;
            }
        };

        for entry in entries {
            let path = match entry {
                Ok(entry) => entry.path(),
                Err(e) => {
                    tracing::warn!(dir = %dir.display(), error = %e, "Unreadable directory entry");
                    report.fail(dir, e.into());
                    continue;
                }
            };

            let Some(loader) = self.loader_for(&path) else {
                tracing::debug!(path = %path.display(), "Ignoring non-plugin file");
                continue;
            };
            if path.is_dir() {
                tracing::debug!(path = %path.display(), "Ignoring directory");
                continue;
            }
            let Some(unit) = UnitName::from_path(&path) else {
                continue;
            };

            self.load_unit(ctx, loader.as_ref(), &unit, &path, &mut report);
        }

        tracing::info!(
            dir = %dir.display(),
            activated = report.activated.len(),
            failed = report.failures.len(),
            "Plugin scan complete"
        );

        report
    }

    fn loader_for(&self, path: &Path) -> Option<Arc<dyn ModuleLoader>> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        self.loaders.get(&ext).cloned()
    }

    /// Load one unit and activate everything it declares
    fn load_unit(
        &mut self,
        ctx: &HostContext,
        loader: &dyn ModuleLoader,
        unit: &UnitName,
        path: &Path,
        report: &mut ScanReport,
    ) {
        let loaded = std::panic::catch_unwind(AssertUnwindSafe(|| loader.load(unit, path)))
            .unwrap_or_else(|payload| {
                Err(PluginHostError::LoadFailure {
                    unit: unit.to_string(),
                    reason: format!("panicked: {}", panic_message(payload.as_ref())),
                })
            });

        let module = match loaded {
            Ok(module) => module,
            Err(e) => {
                tracing::error!(unit = %unit, path = %path.display(), error = %e, "Failed to load plugin unit");
                let state = LoadState::Failed {
                    error: e.to_string(),
                };
                self.descriptors
                    .push(PluginDescriptor::unit(unit.as_str(), path.to_path_buf(), state));
                report.fail(path, e);
                return;
            }
        };

        self.libraries.extend(module.library());

        if module.declarations().is_empty() {
            tracing::warn!(unit = %unit, "Plugin unit declares no plugins");
            self.descriptors.push(PluginDescriptor::unit(
                unit.as_str(),
                path.to_path_buf(),
                LoadState::Loaded,
            ));
            return;
        }

        self.activate_module(ctx, unit, path, &module, report);
    }

    fn activate_module(
        &mut self,
        ctx: &HostContext,
        unit: &UnitName,
        path: &Path,
        module: &LoadedModule,
        report: &mut ScanReport,
    ) {
        for declaration in module.declarations() {
            let mut descriptor =
                PluginDescriptor::declared(unit.as_str(), path.to_path_buf(), declaration.type_name);

            match activate_declaration(ctx, declaration) {
                Ok((name, instance)) => {
                    tracing::info!(plugin = %name, unit = %unit, "Loaded plugin");

                    descriptor.name = Some(name.clone());
                    descriptor.state = LoadState::Activated;
                    descriptor.activated_at = Some(Utc::now());
                    self.descriptors.push(descriptor.clone());
                    self.registry
                        .push(ActivePlugin::new(descriptor, instance, module.library()));
                    report.activated.push(name);
                }
                Err(e) => {
                    tracing::error!(
                        plugin = %declaration.type_name,
                        unit = %unit,
                        error = %e,
                        "Error loading plugin"
                    );
                    descriptor.state = LoadState::Failed {
                        error: e.to_string(),
                    };
                    self.descriptors.push(descriptor);
                    report.fail(path, e);
                }
            }
        }
    }

    /// Deactivate every plugin, most recently activated first, and empty the registry.
    ///
    /// Teardown errors are logged and do not stop the remaining plugins.
    pub fn shutdown(&mut self) {
        if self.registry.is_empty() {
            return;
        }

        tracing::info!(count = self.registry.len(), "Shutting down plugins");

        while let Some(mut plugin) = self.registry.pop() {
            match plugin.deactivate() {
                Ok(()) => tracing::debug!(plugin = %plugin.name(), "Plugin deactivated"),
                Err(e) => {
                    tracing::warn!(plugin = %plugin.name(), error = %e, "Plugin deactivate returned error")
                }
            }
        }

        for descriptor in &mut self.descriptors {
            if descriptor.state == LoadState::Activated {
                descriptor.state = LoadState::Deactivated;
            }
        }
    }

    // ─── Enumeration ─────────────────────────────────────────────────

    /// The registry of activated plugins
    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    /// Activated plugin instances in activation order
    pub fn plugins(&self) -> impl Iterator<Item = &dyn Plugin> {
        self.registry.iter().map(ActivePlugin::plugin)
    }

    /// Number of activated plugins
    pub fn plugin_count(&self) -> usize {
        self.registry.len()
    }

    /// Diagnostics for every unit and plugin type seen, including failures
    pub fn list_plugins(&self) -> Vec<PluginDescriptor> {
        self.descriptors.clone()
    }

    /// Diagnostics for a plugin by instance name, type name, or unit name
    pub fn get_plugin_info(&self, name: &str) -> Option<PluginDescriptor> {
        self.descriptors
            .iter()
            .rev()
            .find(|d| {
                d.name.as_deref() == Some(name)
                    || d.type_name.as_deref() == Some(name)
                    || d.unit == name
            })
            .cloned()
    }

    /// Check if a plugin with this name is active
    pub fn is_plugin_active(&self, name: &str) -> bool {
        self.registry.contains(name)
    }
}

impl Drop for PluginHost {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Construct then activate one declared type, isolating errors and panics.
///
/// Returns the name the instance reports along with the instance. A plugin
/// that fails after construction is dropped here, never deactivated.
fn activate_declaration(
    ctx: &HostContext,
    declaration: &PluginDeclaration,
) -> Result<(String, Box<dyn Plugin>), PluginHostError> {
    let type_name = declaration.type_name;
    let mut instance = guarded(type_name, ActivationStage::Construct, || {
        (declaration.construct)(ctx)
    })?;

    let name = match guarded(type_name, ActivationStage::Activate, || {
        Ok(instance.name().to_string())
    }) {
        Ok(name) => name,
        Err(e) => {
            discard(type_name, instance);
            return Err(e);
        }
    };

    if let Err(e) = guarded(&name, ActivationStage::Activate, || instance.activate()) {
        discard(&name, instance);
        return Err(e);
    }

    Ok((name, instance))
}

fn guarded<T>(
    plugin: &str,
    stage: ActivationStage,
    f: impl FnOnce() -> Result<T, PluginError>,
) -> Result<T, PluginHostError> {
    let reason = match std::panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(value)) => return Ok(value),
        Ok(Err(e)) => e.to_string(),
        Err(payload) => format!("panicked: {}", panic_message(payload.as_ref())),
    };

    Err(PluginHostError::ActivationFailure {
        plugin: plugin.to_string(),
        stage,
        reason,
    })
}

/// Drop a plugin that never made it into the registry
fn discard(plugin: &str, instance: Box<dyn Plugin>) {
    if let Err(payload) = std::panic::catch_unwind(AssertUnwindSafe(move || drop(instance))) {
        tracing::warn!(
            plugin = %plugin,
            error = %panic_message(payload.as_ref()),
            "Plugin panicked while being dropped"
        );
    }
}
