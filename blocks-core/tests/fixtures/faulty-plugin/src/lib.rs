//! Plugin library whose types panic at every stage of their lifecycle

use blocks_plugin_api::{export_plugins, HostContext, Plugin, PluginError, PluginFactory};

pub struct PanicsInCreate;

impl PluginFactory for PanicsInCreate {
    fn create(_ctx: &HostContext) -> Result<Self, PluginError> {
        panic!("create exploded")
    }
}

impl Plugin for PanicsInCreate {
    fn name(&self) -> &str {
        "panics-in-create"
    }

    fn activate(&mut self) -> Result<(), PluginError> {
        Ok(())
    }
}

pub struct PanicsInActivate;

impl PluginFactory for PanicsInActivate {
    fn create(_ctx: &HostContext) -> Result<Self, PluginError> {
        Ok(Self)
    }
}

impl Plugin for PanicsInActivate {
    fn name(&self) -> &str {
        "panics-in-activate"
    }

    fn activate(&mut self) -> Result<(), PluginError> {
        panic!("activate exploded")
    }
}

pub struct PanicsInName;

impl PluginFactory for PanicsInName {
    fn create(_ctx: &HostContext) -> Result<Self, PluginError> {
        Ok(Self)
    }
}

impl Plugin for PanicsInName {
    fn name(&self) -> &str {
        panic!("name exploded")
    }

    fn activate(&mut self) -> Result<(), PluginError> {
        Ok(())
    }
}

pub struct Steady {
    ctx: HostContext,
}

impl PluginFactory for Steady {
    fn create(ctx: &HostContext) -> Result<Self, PluginError> {
        Ok(Self { ctx: ctx.clone() })
    }
}

impl Plugin for Steady {
    fn name(&self) -> &str {
        "steady"
    }

    fn activate(&mut self) -> Result<(), PluginError> {
        self.ctx.log_info(self.name(), "Steady is up");
        Ok(())
    }

    fn deactivate(&mut self) -> Result<(), PluginError> {
        panic!("deactivate exploded")
    }
}

export_plugins!(PanicsInCreate, PanicsInActivate, PanicsInName, Steady);
