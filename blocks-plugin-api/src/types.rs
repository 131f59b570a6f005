//! Registration types exchanged between a plugin library and the host

use std::fmt;

use crate::context::HostContext;
use crate::error::PluginError;
use crate::guard::{PanicGuard, catch_panic};
use crate::{Plugin, PluginFactory};

/// Builds one plugin instance from the shared host context.
pub type ConstructFn = fn(&HostContext) -> Result<Box<dyn Plugin>, PluginError>;

/// A plugin type declared by a library's registration entry point
#[derive(Clone, Copy)]
pub struct PluginDeclaration {
    /// Type name used in diagnostics before an instance (and its `name()`) exists
    pub type_name: &'static str,
    /// Constructor for the declared type
    pub construct: ConstructFn,
}

impl PluginDeclaration {
    /// Create a declaration from a name and a constructor.
    ///
    /// A hand-written constructor runs inside the plugin library; it should
    /// contain its own panics with [`catch_panic`] and return its instance
    /// wrapped in [`PanicGuard`], as [`of`](Self::of) does.
    pub fn new(type_name: &'static str, construct: ConstructFn) -> Self {
        Self {
            type_name,
            construct,
        }
    }

    /// Declare a [`PluginFactory`] type
    pub fn of<T: PluginFactory>() -> Self {
        Self::new(short_type_name::<T>(), construct_boxed::<T>)
    }
}

impl fmt::Debug for PluginDeclaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginDeclaration")
            .field("type_name", &self.type_name)
            .finish_non_exhaustive()
    }
}

fn construct_boxed<T: PluginFactory>(ctx: &HostContext) -> Result<Box<dyn Plugin>, PluginError> {
    let plugin = catch_panic(|| T::create(ctx))?;
    Ok(PanicGuard::boxed(short_type_name::<T>(), plugin))
}

fn short_type_name<T>() -> &'static str {
    let full = std::any::type_name::<T>();
    // Strip the module path but keep generic arguments intact
    let base_end = full.find('<').unwrap_or(full.len());
    match full[..base_end].rfind("::") {
        Some(idx) => &full[idx + 2..],
        None => full,
    }
}

/// Collects the declarations a plugin library registers.
///
/// Declaration order is preserved; the host activates types in this order.
#[derive(Debug, Default)]
pub struct PluginRegistrar {
    declarations: Vec<PluginDeclaration>,
}

impl PluginRegistrar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a plugin type
    pub fn register<T: PluginFactory>(&mut self) {
        self.declarations.push(PluginDeclaration::of::<T>());
    }

    /// Declare a plugin with a hand-written constructor
    pub fn declare(&mut self, declaration: PluginDeclaration) {
        self.declarations.push(declaration);
    }

    pub fn declarations(&self) -> &[PluginDeclaration] {
        &self.declarations
    }

    pub fn into_declarations(self) -> Vec<PluginDeclaration> {
        self.declarations
    }

    pub fn len(&self) -> usize {
        self.declarations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }
}
