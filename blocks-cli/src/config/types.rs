use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Application name shown to plugins when none is configured
pub const DEFAULT_APP_NAME: &str = "NobleBlocks";

/// Configuration as stored in TOML files (with optional fields for merging)
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawBlocksConfig {
    #[serde(default)]
    pub app: RawAppConfig,

    #[serde(default)]
    pub plugins: RawPluginsConfig,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawAppConfig {
    pub name: Option<String>,
}

/// Plugin config as stored in TOML (optional fields for proper merging)
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawPluginsConfig {
    /// Directory scanned for plugin libraries
    pub dir: Option<PathBuf>,

    /// File extensions treated as plugin libraries
    pub extensions: Option<Vec<String>>,

    /// TOML file backing the settings plugins read and write
    pub settings: Option<PathBuf>,
}

/// Final configuration with defaults applied
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BlocksConfig {
    #[serde(default)]
    pub app: AppConfig,

    #[serde(default)]
    pub plugins: PluginsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub name: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_APP_NAME.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginsConfig {
    pub dir: PathBuf,

    /// `None` means the platform's native library extensions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Vec<String>>,

    pub settings: PathBuf,
}

impl Default for PluginsConfig {
    fn default() -> Self {
        Self {
            dir: blocks_paths::plugin_dir(),
            extensions: None,
            settings: blocks_paths::config_dir().join("plugin-settings.toml"),
        }
    }
}
