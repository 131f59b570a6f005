//! Plugin registry - the ordered set of activated plugins

use chrono::{DateTime, Utc};
use libloading::Library;
use serde::Serialize;
use std::mem::ManuallyDrop;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Arc;

use blocks_plugin_api::{Plugin, PluginError, panic_message};

/// Where a discovered unit or plugin type ended up
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum LoadState {
    /// Unit loaded; for a plugin type, declared but not yet activated
    Loaded,
    /// Constructed and activated, present in the registry
    Activated,
    /// Deactivated at host shutdown
    Deactivated,
    /// Load, construction, or activation failed
    Failed { error: String },
}

/// Diagnostics record for one discovered unit or plugin type
#[derive(Debug, Clone, Serialize)]
pub struct PluginDescriptor {
    /// Unit name derived from the file name
    pub unit: String,
    /// Source path of the unit
    pub path: PathBuf,
    /// Declared type name, `None` when the unit itself failed to load
    pub type_name: Option<String>,
    /// Name the instance reports, once constructed
    pub name: Option<String>,
    pub state: LoadState,
    pub activated_at: Option<DateTime<Utc>>,
}

impl PluginDescriptor {
    pub(crate) fn unit(unit: &str, path: PathBuf, state: LoadState) -> Self {
        Self {
            unit: unit.to_string(),
            path,
            type_name: None,
            name: None,
            state,
            activated_at: None,
        }
    }

    pub(crate) fn declared(unit: &str, path: PathBuf, type_name: &str) -> Self {
        Self {
            type_name: Some(type_name.to_string()),
            ..Self::unit(unit, path, LoadState::Loaded)
        }
    }

    /// Best available label: instance name, then type name, then unit name
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .or(self.type_name.as_deref())
            .unwrap_or(&self.unit)
    }
}

/// An activated plugin owned by the registry.
///
/// The instance is dropped in `Drop::drop`, before the library that holds its
/// code is released.
pub struct ActivePlugin {
    descriptor: PluginDescriptor,
    instance: ManuallyDrop<Box<dyn Plugin>>,
    deactivated: bool,
    _library: Option<Arc<Library>>,
}

impl ActivePlugin {
    pub(crate) fn new(
        descriptor: PluginDescriptor,
        instance: Box<dyn Plugin>,
        library: Option<Arc<Library>>,
    ) -> Self {
        Self {
            descriptor,
            instance: ManuallyDrop::new(instance),
            deactivated: false,
            _library: library,
        }
    }

    /// Name reported at activation
    pub fn name(&self) -> &str {
        self.descriptor.display_name()
    }

    pub fn descriptor(&self) -> &PluginDescriptor {
        &self.descriptor
    }

    pub fn plugin(&self) -> &dyn Plugin {
        &**self.instance
    }

    /// Run the plugin's teardown once. Later calls are no-ops.
    pub(crate) fn deactivate(&mut self) -> Result<(), PluginError> {
        if self.deactivated {
            return Ok(());
        }
        self.deactivated = true;
        self.descriptor.state = LoadState::Deactivated;

        match panic::catch_unwind(AssertUnwindSafe(|| self.instance.deactivate())) {
            Ok(result) => result,
            Err(payload) => Err(PluginError::Panicked(panic_message(payload.as_ref()))),
        }
    }
}

impl Drop for ActivePlugin {
    fn drop(&mut self) {
        if let Err(e) = self.deactivate() {
            tracing::warn!(
                plugin = %self.descriptor.display_name(),
                error = %e,
                "Plugin deactivate returned error"
            );
        }

        let instance = &mut self.instance;
        // SAFETY: `instance` is dropped exactly once, here, and never used after.
        let dropped = panic::catch_unwind(AssertUnwindSafe(|| unsafe {
            ManuallyDrop::drop(instance)
        }));
        if let Err(payload) = dropped {
            tracing::warn!(
                plugin = %self.descriptor.display_name(),
                error = %panic_message(payload.as_ref()),
                "Plugin panicked while being dropped"
            );
        }
    }
}

/// Activated plugins in discovery order.
///
/// Every entry completed activation; nothing else is ever inserted.
#[derive(Default)]
pub struct PluginRegistry {
    entries: Vec<ActivePlugin>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, plugin: ActivePlugin) {
        self.entries.push(plugin);
    }

    /// Remove the most recently activated plugin
    pub(crate) fn pop(&mut self) -> Option<ActivePlugin> {
        self.entries.pop()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ActivePlugin> {
        self.entries.iter()
    }

    /// First active plugin reporting `name`
    pub fn get(&self, name: &str) -> Option<&ActivePlugin> {
        self.entries.iter().find(|p| p.name() == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Plugin names in activation order
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(ActivePlugin::name).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Tracked {
        name: &'static str,
        deactivations: Arc<AtomicUsize>,
        fail_deactivate: bool,
    }

    impl Plugin for Tracked {
        fn name(&self) -> &str {
            self.name
        }

        fn activate(&mut self) -> Result<(), PluginError> {
            Ok(())
        }

        fn deactivate(&mut self) -> Result<(), PluginError> {
            self.deactivations.fetch_add(1, Ordering::SeqCst);
            if self.fail_deactivate {
                Err(PluginError::custom("still downloading"))
            } else {
                Ok(())
            }
        }
    }

    fn active(name: &'static str, counter: &Arc<AtomicUsize>) -> ActivePlugin {
        let mut descriptor = PluginDescriptor::declared("unit.so", PathBuf::from("unit.so"), name);
        descriptor.name = Some(name.to_string());
        descriptor.state = LoadState::Activated;
        ActivePlugin::new(
            descriptor,
            Box::new(Tracked {
                name,
                deactivations: counter.clone(),
                fail_deactivate: false,
            }),
            None,
        )
    }

    #[test]
    fn test_registry_default_is_empty() {
        let registry = PluginRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn test_registry_preserves_insertion_order() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut registry = PluginRegistry::new();
        registry.push(active("b", &counter));
        registry.push(active("a", &counter));
        registry.push(active("c", &counter));

        assert_eq!(registry.names(), vec!["b", "a", "c"]);
        assert!(registry.contains("a"));
        assert!(!registry.contains("d"));
    }

    #[test]
    fn test_deactivate_runs_once() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut plugin = active("once", &counter);

        plugin.deactivate().unwrap();
        plugin.deactivate().unwrap();
        drop(plugin);

        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_drop_deactivates() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut registry = PluginRegistry::new();
        registry.push(active("x", &counter));
        registry.push(active("y", &counter));

        drop(registry);
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_deactivate_error_is_returned() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut plugin = ActivePlugin::new(
            PluginDescriptor::declared("u.so", PathBuf::from("u.so"), "Stubborn"),
            Box::new(Tracked {
                name: "stubborn",
                deactivations: counter.clone(),
                fail_deactivate: true,
            }),
            None,
        );

        let err = plugin.deactivate().unwrap_err();
        assert!(err.to_string().contains("still downloading"));
        assert_eq!(plugin.descriptor().state, LoadState::Deactivated);
    }

    #[test]
    fn test_deactivate_panic_is_caught() {
        struct Panicky;
        impl Plugin for Panicky {
            fn name(&self) -> &str {
                "panicky"
            }
            fn activate(&mut self) -> Result<(), PluginError> {
                Ok(())
            }
            fn deactivate(&mut self) -> Result<(), PluginError> {
                panic!("boom");
            }
        }

        let mut plugin = ActivePlugin::new(
            PluginDescriptor::declared("p.so", PathBuf::from("p.so"), "Panicky"),
            Box::new(Panicky),
            None,
        );
        assert!(matches!(plugin.deactivate(), Err(PluginError::Panicked(ref msg)) if msg == "boom"));
    }

    #[test]
    fn test_drop_contains_destructor_panic() {
        struct Sticky(Arc<AtomicUsize>);
        impl Plugin for Sticky {
            fn name(&self) -> &str {
                "sticky"
            }
            fn activate(&mut self) -> Result<(), PluginError> {
                Ok(())
            }
        }
        impl Drop for Sticky {
            fn drop(&mut self) {
                self.0.fetch_add(1, Ordering::SeqCst);
                panic!("file handle still open");
            }
        }

        let drops = Arc::new(AtomicUsize::new(0));
        let plugin = ActivePlugin::new(
            PluginDescriptor::declared("s.so", PathBuf::from("s.so"), "Sticky"),
            Box::new(Sticky(drops.clone())),
            None,
        );

        drop(plugin);
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_display_name_fallbacks() {
        let mut descriptor =
            PluginDescriptor::unit("stats.so", PathBuf::from("stats.so"), LoadState::Loaded);
        assert_eq!(descriptor.display_name(), "stats.so");

        descriptor.type_name = Some("PaperStats".into());
        assert_eq!(descriptor.display_name(), "PaperStats");

        descriptor.name = Some("paper-stats".into());
        assert_eq!(descriptor.display_name(), "paper-stats");
    }

    #[test]
    fn test_load_state_json_format() {
        let state = LoadState::Failed {
            error: "bad".into(),
        };
        let json = serde_json::to_string(&state).unwrap();
        assert_eq!(json, r#"{"state":"failed","error":"bad"}"#);

        // Unit variants serialize as just the tag
        let json = serde_json::to_string(&LoadState::Activated).unwrap();
        assert_eq!(json, r#"{"state":"activated"}"#);
    }
}
