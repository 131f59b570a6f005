mod loader;
mod types;

pub use loader::ConfigLoader;
pub use types::{BlocksConfig, DEFAULT_APP_NAME};
