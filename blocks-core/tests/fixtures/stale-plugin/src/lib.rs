//! Plugin library built against a newer plugin API than the host's

use blocks_plugin_api::{HostContext, Plugin, PluginError, PluginFactory};

#[unsafe(no_mangle)]
pub extern "C" fn _blocks_plugin_api_version() -> u32 {
    blocks_plugin_api::API_VERSION + 1
}

pub struct NeverRuns;

impl PluginFactory for NeverRuns {
    fn create(_ctx: &HostContext) -> Result<Self, PluginError> {
        Ok(Self)
    }
}

impl Plugin for NeverRuns {
    fn name(&self) -> &str {
        "never-runs"
    }

    fn activate(&mut self) -> Result<(), PluginError> {
        Ok(())
    }
}

#[unsafe(no_mangle)]
#[allow(improper_ctypes_definitions)]
pub extern "C" fn _blocks_plugin_register(registrar: &mut blocks_plugin_api::PluginRegistrar) {
    registrar.register::<NeverRuns>();
}
