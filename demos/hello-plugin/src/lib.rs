//! Hello Plugin - example plugin library for NobleBlocks
//!
//! One library, two plugin types:
//! - `Greeter` publishes a `greeting` service other plugins can look up
//! - `LaunchCounter` reads and bumps a counter in the shared plugin settings
//!
//! ## Building
//!
//! ```bash
//! cargo build --release
//! ```
//!
//! ## Installing
//!
//! ```bash
//! mkdir -p "$(dirname "$(which nobleblocks)")/plugins"
//! cp target/release/libhello_plugin.so "$(dirname "$(which nobleblocks)")/plugins/"
//! nobleblocks plugin scan
//! ```

use std::sync::Arc;

use blocks_plugin_api::{export_plugins, HostContext, Plugin, PluginError, PluginFactory};

/// Service published by [`Greeter`] under the name `greeting`.
pub struct Greeting {
    pub app_name: String,
}

impl Greeting {
    pub fn greet(&self, who: &str) -> String {
        format!("Hello from {}, {}!", self.app_name, who)
    }
}

pub struct Greeter {
    ctx: HostContext,
}

impl PluginFactory for Greeter {
    fn create(ctx: &HostContext) -> Result<Self, PluginError> {
        Ok(Self { ctx: ctx.clone() })
    }
}

impl Plugin for Greeter {
    fn name(&self) -> &str {
        "greeter"
    }

    fn activate(&mut self) -> Result<(), PluginError> {
        let greeting = Arc::new(Greeting {
            app_name: self.ctx.app_name().to_string(),
        });
        if self.ctx.provide_service("greeting", greeting) {
            self.ctx
                .log_warn(self.name(), "Replaced an existing greeting service");
        }
        self.ctx.log_info(self.name(), "Greeting service ready");
        Ok(())
    }

    fn deactivate(&mut self) -> Result<(), PluginError> {
        self.ctx.log_info(self.name(), "Goodbye");
        Ok(())
    }
}

const LAUNCH_KEY: &str = "hello.launches";

/// Counts how many times the host has activated it.
pub struct LaunchCounter {
    ctx: HostContext,
    launches: u64,
}

impl PluginFactory for LaunchCounter {
    fn create(ctx: &HostContext) -> Result<Self, PluginError> {
        let launches = ctx.config_get::<u64>(LAUNCH_KEY).unwrap_or(0);
        Ok(Self {
            ctx: ctx.clone(),
            launches,
        })
    }
}

impl Plugin for LaunchCounter {
    fn name(&self) -> &str {
        "launch-counter"
    }

    fn activate(&mut self) -> Result<(), PluginError> {
        self.launches += 1;
        self.ctx.config_set(LAUNCH_KEY, self.launches)?;

        let message = match self.ctx.service::<Greeting>("greeting") {
            Some(greeting) => greeting.greet(&format!("launch #{}", self.launches)),
            None => format!("Launch #{}", self.launches),
        };
        self.ctx.log_info(self.name(), &message);
        Ok(())
    }
}

export_plugins!(Greeter, LaunchCounter);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_greeter_publishes_service() {
        let ctx = HostContext::for_app("Papers", "/tmp/papers");
        let mut greeter = Greeter::create(&ctx).unwrap();
        greeter.activate().unwrap();

        let greeting = ctx.service::<Greeting>("greeting").unwrap();
        assert_eq!(greeting.greet("reader"), "Hello from Papers, reader!");
    }

    #[test]
    fn test_launch_counter_bumps_setting() {
        let ctx = HostContext::for_app("Papers", "/tmp/papers");
        ctx.config_set(LAUNCH_KEY, 4u64).unwrap();

        let mut counter = LaunchCounter::create(&ctx).unwrap();
        counter.activate().unwrap();

        assert_eq!(ctx.config_get::<u64>(LAUNCH_KEY), Some(5));
        assert!(ctx.config_is_dirty());
    }
}
