//! HostContext - the shared handle every plugin is constructed with

use crate::error::PluginError;
use serde::{Serialize, de::DeserializeOwned};
use std::any::Any;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::Level;

type Service = Arc<dyn Any + Send + Sync>;

/// Receives `(level, app, plugin, message)` for every `log_*` call.
///
/// A plugin library carries its own copy of `tracing` with no subscriber
/// installed, so plugin log lines must be emitted by code that lives in the
/// host. The sink is created by the host when it builds the context.
pub type LogSink = Arc<dyn Fn(Level, &str, &str, &str) + Send + Sync>;

/// The host's shared state, handed to every plugin constructor.
///
/// Cloning is cheap and every clone refers to the same host. The host does not
/// restrict what a plugin does with it: any plugin may read or write config
/// values and publish services other plugins look up later.
///
/// - Application identity (name, application directory, plugin directory)
/// - Configuration (persistent key-value store backed by TOML)
/// - Named services shared between the host and plugins
/// - Logging utilities
#[derive(Clone)]
pub struct HostContext {
    inner: Arc<HostInner>,
}

struct HostInner {
    app_name: String,
    app_dir: PathBuf,
    plugin_dir: PathBuf,
    config: RwLock<PluginConfig>,
    services: RwLock<HashMap<String, Service>>,
    log: RwLock<LogSink>,
}

impl HostContext {
    /// Create a context with an explicit plugin directory and config
    pub fn new(
        app_name: impl Into<String>,
        app_dir: impl Into<PathBuf>,
        plugin_dir: impl Into<PathBuf>,
        config: PluginConfig,
    ) -> Self {
        Self {
            inner: Arc::new(HostInner {
                app_name: app_name.into(),
                app_dir: app_dir.into(),
                plugin_dir: plugin_dir.into(),
                config: RwLock::new(config),
                services: RwLock::new(HashMap::new()),
                log: RwLock::new(Arc::new(emit) as LogSink),
            }),
        }
    }

    /// Create a context whose plugin directory is `<app_dir>/plugins`
    pub fn for_app(app_name: impl Into<String>, app_dir: impl Into<PathBuf>) -> Self {
        let app_dir = app_dir.into();
        let plugin_dir = app_dir.join("plugins");
        Self::new(app_name, app_dir, plugin_dir, PluginConfig::new())
    }

    // ─── Identity ────────────────────────────────────────────────────

    pub fn app_name(&self) -> &str {
        &self.inner.app_name
    }

    /// Directory the application runs from
    pub fn app_dir(&self) -> &Path {
        &self.inner.app_dir
    }

    /// Directory plugins are loaded from
    pub fn plugin_dir(&self) -> &Path {
        &self.inner.plugin_dir
    }

    /// True when both handles refer to the same host
    pub fn same_host(&self, other: &HostContext) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    // ─── Configuration ───────────────────────────────────────────────

    /// Read a configuration value
    ///
    /// # Example
    /// ```ignore
    /// let folder: Option<String> = ctx.config_get("download_folder");
    /// ```
    pub fn config_get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.inner
            .config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
    }

    /// Write a configuration value
    pub fn config_set<T: Serialize>(&self, key: &str, value: T) -> Result<(), PluginError> {
        self.inner
            .config
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .set(key, value)
    }

    /// Check if the configuration has unsaved changes
    pub fn config_is_dirty(&self) -> bool {
        self.inner
            .config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_dirty()
    }

    /// Persist the configuration to a TOML file
    pub fn save_config(&self, path: &Path) -> Result<(), PluginError> {
        self.inner
            .config
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .save(path)
    }

    // ─── Services ────────────────────────────────────────────────────

    /// Publish a named service. Returns `true` if an earlier service was replaced.
    pub fn provide_service<T: Any + Send + Sync>(&self, name: &str, service: Arc<T>) -> bool {
        self.inner
            .services
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_string(), service)
            .is_some()
    }

    /// Look up a named service by type.
    ///
    /// Returns `None` if nothing was published under `name` or it has another type.
    pub fn service<T: Any + Send + Sync>(&self, name: &str) -> Option<Arc<T>> {
        let service = self
            .inner
            .services
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()?;
        service.downcast::<T>().ok()
    }

    /// Like [`service`](Self::service) but fails with [`PluginError::MissingService`]
    pub fn require_service<T: Any + Send + Sync>(&self, name: &str) -> Result<Arc<T>, PluginError> {
        self.service(name)
            .ok_or_else(|| PluginError::MissingService(name.to_string()))
    }

    /// Names of all published services, sorted
    pub fn service_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .inner
            .services
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    // ─── Logging ─────────────────────────────────────────────────────

    /// Replace where `log_*` calls go. Defaults to the host's `tracing` subscriber.
    pub fn set_log_sink(&self, sink: LogSink) {
        *self.inner.log.write().unwrap_or_else(PoisonError::into_inner) = sink;
    }

    fn log(&self, level: Level, plugin: &str, message: &str) {
        let sink = self
            .inner
            .log
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        sink(level, self.inner.app_name.as_str(), plugin, message);
    }

    /// Log an info message tagged with the plugin name
    pub fn log_info(&self, plugin: &str, message: &str) {
        self.log(Level::INFO, plugin, message);
    }

    /// Log a warning message
    pub fn log_warn(&self, plugin: &str, message: &str) {
        self.log(Level::WARN, plugin, message);
    }

    /// Log an error message
    pub fn log_error(&self, plugin: &str, message: &str) {
        self.log(Level::ERROR, plugin, message);
    }

    /// Log a debug message
    pub fn log_debug(&self, plugin: &str, message: &str) {
        self.log(Level::DEBUG, plugin, message);
    }
}

fn emit(level: Level, app: &str, plugin: &str, message: &str) {
    match level {
        Level::ERROR => tracing::error!(app = %app, plugin = %plugin, "{}", message),
        Level::WARN => tracing::warn!(app = %app, plugin = %plugin, "{}", message),
        Level::INFO => tracing::info!(app = %app, plugin = %plugin, "{}", message),
        Level::DEBUG => tracing::debug!(app = %app, plugin = %plugin, "{}", message),
        _ => tracing::trace!(app = %app, plugin = %plugin, "{}", message),
    }
}

impl std::fmt::Debug for HostContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostContext")
            .field("app_name", &self.inner.app_name)
            .field("app_dir", &self.inner.app_dir)
            .field("plugin_dir", &self.inner.plugin_dir)
            .finish_non_exhaustive()
    }
}

/// Plugin configuration - persistent key-value store backed by TOML
#[derive(Debug)]
pub struct PluginConfig {
    values: HashMap<String, toml::Value>,
    dirty: bool,
}

impl PluginConfig {
    /// Create a new empty config
    pub fn new() -> Self {
        Self {
            values: HashMap::new(),
            dirty: false,
        }
    }

    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self, PluginError> {
        if !path.exists() {
            return Ok(Self::new());
        }
        let content = std::fs::read_to_string(path)?;
        let values: HashMap<String, toml::Value> =
            toml::from_str(&content).map_err(|e| PluginError::Config(e.to_string()))?;
        Ok(Self {
            values,
            dirty: false,
        })
    }

    /// Save configuration to a TOML file
    pub fn save(&mut self, path: &Path) -> Result<(), PluginError> {
        let content = toml::to_string_pretty(&self.values)
            .map_err(|e| PluginError::Serialization(e.to_string()))?;

        if let Some(parent) = path.parent().filter(|p| !p.exists()) {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, content)?;
        self.dirty = false;
        Ok(())
    }

    /// Get a configuration value
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.values.get(key).and_then(|v| v.clone().try_into().ok())
    }

    /// Set a configuration value
    pub fn set<T: Serialize>(&mut self, key: &str, value: T) -> Result<(), PluginError> {
        let toml_value =
            toml::Value::try_from(value).map_err(|e| PluginError::Serialization(e.to_string()))?;
        self.values.insert(key.to_string(), toml_value);
        self.dirty = true;
        Ok(())
    }

    /// Check if the config has been modified since loading/saving
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self::new()
    }
}
