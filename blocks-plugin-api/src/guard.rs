//! Panic containment for plugin code
//!
//! A plugin library links its own copy of std, so a panic unwinding out of it
//! cannot be caught by the host and aborts the process. Everything here is
//! generic over the plugin type, which means it is monomorphized into the
//! plugin library and catches the panic on the plugin's side of the boundary.

use std::any::Any;
use std::mem::ManuallyDrop;
use std::panic::{self, AssertUnwindSafe};

use crate::Plugin;
use crate::error::PluginError;

/// Run `f`, turning a panic into [`PluginError::Panicked`]
pub fn catch_panic<T>(f: impl FnOnce() -> Result<T, PluginError>) -> Result<T, PluginError> {
    panic::catch_unwind(AssertUnwindSafe(f))
        .unwrap_or_else(|payload| Err(PluginError::Panicked(panic_message(payload.as_ref()))))
}

/// Best-effort text of a panic payload
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Wraps a plugin so that none of its methods, nor its destructor, can
/// unwind into the caller.
pub struct PanicGuard<T: Plugin> {
    type_name: &'static str,
    inner: ManuallyDrop<T>,
}

impl<T: Plugin + 'static> PanicGuard<T> {
    pub fn new(type_name: &'static str, plugin: T) -> Self {
        Self {
            type_name,
            inner: ManuallyDrop::new(plugin),
        }
    }

    /// Guard `plugin` and erase its type
    pub fn boxed(type_name: &'static str, plugin: T) -> Box<dyn Plugin> {
        Box::new(Self::new(type_name, plugin))
    }
}

impl<T: Plugin> Plugin for PanicGuard<T> {
    /// Falls back to the declared type name if the plugin panics
    fn name(&self) -> &str {
        panic::catch_unwind(AssertUnwindSafe(|| self.inner.name())).unwrap_or(self.type_name)
    }

    fn activate(&mut self) -> Result<(), PluginError> {
        catch_panic(|| self.inner.activate())
    }

    fn deactivate(&mut self) -> Result<(), PluginError> {
        catch_panic(|| self.inner.deactivate())
    }
}

impl<T: Plugin> Drop for PanicGuard<T> {
    fn drop(&mut self) {
        let inner = &mut self.inner;
        // A destructor panic has nowhere to be reported from inside the library
        let _ = panic::catch_unwind(AssertUnwindSafe(|| {
            // SAFETY: `inner` is dropped exactly once, here, and never used after.
            unsafe { ManuallyDrop::drop(inner) }
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct Faulty {
        dropped: Arc<AtomicBool>,
    }

    impl Plugin for Faulty {
        fn name(&self) -> &str {
            panic!("name unavailable")
        }

        fn activate(&mut self) -> Result<(), PluginError> {
            panic!("activate exploded")
        }

        fn deactivate(&mut self) -> Result<(), PluginError> {
            panic!("deactivate exploded")
        }
    }

    impl Drop for Faulty {
        fn drop(&mut self) {
            self.dropped.store(true, Ordering::SeqCst);
            panic!("drop exploded");
        }
    }

    fn faulty() -> (PanicGuard<Faulty>, Arc<AtomicBool>) {
        let dropped = Arc::new(AtomicBool::new(false));
        let plugin = Faulty {
            dropped: dropped.clone(),
        };
        (PanicGuard::new("Faulty", plugin), dropped)
    }

    #[test]
    fn test_catch_panic_passes_results_through() {
        assert_eq!(catch_panic(|| Ok(7)).unwrap(), 7);
        let err = catch_panic::<()>(|| Err(PluginError::config("no folder"))).unwrap_err();
        assert!(matches!(err, PluginError::Config(_)));
    }

    #[test]
    fn test_catch_panic_converts_panics() {
        let err = catch_panic::<()>(|| panic!("out of pdfs")).unwrap_err();
        assert!(matches!(err, PluginError::Panicked(ref msg) if msg == "out of pdfs"));

        let err = catch_panic::<()>(|| panic!("{} left", 3)).unwrap_err();
        assert_eq!(err.to_string(), "panicked: 3 left");

        let err = catch_panic::<()>(|| std::panic::panic_any(42u8)).unwrap_err();
        assert_eq!(err.to_string(), "panicked: unknown panic");
    }

    #[test]
    fn test_guard_contains_every_panic() {
        let (mut guard, dropped) = faulty();

        assert_eq!(guard.name(), "Faulty");
        assert!(matches!(guard.activate(), Err(PluginError::Panicked(_))));
        assert!(matches!(guard.deactivate(), Err(PluginError::Panicked(_))));

        drop(guard);
        assert!(dropped.load(Ordering::SeqCst));
    }

    #[test]
    fn test_boxed_guard_is_a_plugin() {
        let (guard, _dropped) = faulty();
        let boxed: Box<dyn Plugin> = Box::new(guard);
        assert_eq!(boxed.name(), "Faulty");
    }
}
