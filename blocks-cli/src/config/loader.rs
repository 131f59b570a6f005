use super::types::{
    AppConfig, BlocksConfig, PluginsConfig, RawAppConfig, RawBlocksConfig, RawPluginsConfig,
};
use anyhow::Result;
use std::path::{Path, PathBuf};

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load merged configuration (user + project)
    pub fn load() -> Result<BlocksConfig> {
        Self::load_layers(&[Self::user_config_path(), Self::project_config_path()])
    }

    /// Merge config files in order, later files overriding earlier ones.
    ///
    /// Missing files are skipped; malformed files are an error.
    pub fn load_layers(paths: &[PathBuf]) -> Result<BlocksConfig> {
        let mut raw = RawBlocksConfig::default();

        for path in paths {
            if !path.exists() {
                tracing::debug!(path = %path.display(), "Config file not found, skipping");
                continue;
            }
            let contents = std::fs::read_to_string(path)?;
            let layer: RawBlocksConfig = toml::from_str(&contents)?;
            raw = Self::merge_raw(raw, layer);
        }

        Ok(Self::finalize(raw))
    }

    /// Get user config path
    pub fn user_config_path() -> PathBuf {
        blocks_paths::config_dir().join("config.toml")
    }

    /// Get project config path
    /// Can be overridden with NOBLEBLOCKS_PROJECT_CONFIG_DIR env var (useful for isolated tests)
    pub fn project_config_path() -> PathBuf {
        if let Ok(dir) = std::env::var("NOBLEBLOCKS_PROJECT_CONFIG_DIR") {
            PathBuf::from(dir).join("config.toml")
        } else {
            PathBuf::from(".nobleblocks/config.toml")
        }
    }

    /// Merge two raw configs (overlay values override base only if explicitly set)
    fn merge_raw(base: RawBlocksConfig, overlay: RawBlocksConfig) -> RawBlocksConfig {
        RawBlocksConfig {
            app: RawAppConfig {
                name: overlay.app.name.or(base.app.name),
            },
            plugins: RawPluginsConfig {
                dir: overlay.plugins.dir.or(base.plugins.dir),
                extensions: overlay.plugins.extensions.or(base.plugins.extensions),
                settings: overlay.plugins.settings.or(base.plugins.settings),
            },
        }
    }

    /// Convert raw config to final config with defaults applied
    fn finalize(raw: RawBlocksConfig) -> BlocksConfig {
        let defaults = BlocksConfig::default();
        BlocksConfig {
            app: AppConfig {
                name: raw.app.name.unwrap_or(defaults.app.name),
            },
            plugins: PluginsConfig {
                dir: raw.plugins.dir.unwrap_or(defaults.plugins.dir),
                extensions: raw.plugins.extensions,
                settings: raw.plugins.settings.unwrap_or(defaults.plugins.settings),
            },
        }
    }

    /// Save config to a specific path
    ///
    /// Creates parent directories if they don't exist.
    pub fn save_to_path(config: &BlocksConfig, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let toml = toml::to_string_pretty(config)?;
        std::fs::write(path, toml)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_APP_NAME;
    use serial_test::serial;
    use tempfile::TempDir;

    // ==================== Load Tests ====================

    #[test]
    fn test_load_no_files_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = ConfigLoader::load_layers(&[temp_dir.path().join("absent.toml")]).unwrap();

        assert_eq!(config.app.name, DEFAULT_APP_NAME);
        assert!(config.plugins.dir.ends_with("plugins"));
    }

    #[test]
    fn test_project_layer_overrides_user_layer() {
        let temp_dir = TempDir::new().unwrap();
        let user = temp_dir.path().join("user.toml");
        let project = temp_dir.path().join("project.toml");

        std::fs::write(
            &user,
            "[app]\nname = \"UserBlocks\"\n\n[plugins]\ndir = \"/user/plugins\"\nextensions = [\"so\"]\n",
        )
        .unwrap();
        std::fs::write(&project, "[plugins]\ndir = \"/project/plugins\"\n").unwrap();

        let config = ConfigLoader::load_layers(&[user, project]).unwrap();

        assert_eq!(config.app.name, "UserBlocks");
        assert_eq!(config.plugins.dir, PathBuf::from("/project/plugins"));
        assert_eq!(config.plugins.extensions, Some(vec!["so".to_string()]));
    }

    #[test]
    fn test_malformed_layer_is_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("broken.toml");
        std::fs::write(&path, "[plugins\ndir = ").unwrap();

        assert!(ConfigLoader::load_layers(&[path]).is_err());
    }

    #[test]
    #[serial]
    fn test_project_config_path_env_override() {
        unsafe {
            std::env::set_var("NOBLEBLOCKS_PROJECT_CONFIG_DIR", "/tmp/blocks-project");
        }
        assert_eq!(
            ConfigLoader::project_config_path(),
            PathBuf::from("/tmp/blocks-project/config.toml")
        );
        unsafe {
            std::env::remove_var("NOBLEBLOCKS_PROJECT_CONFIG_DIR");
        }
        assert_eq!(
            ConfigLoader::project_config_path(),
            PathBuf::from(".nobleblocks/config.toml")
        );
    }

    #[test]
    fn test_user_config_path_is_config_toml() {
        assert!(ConfigLoader::user_config_path().ends_with("nobleblocks/config.toml"));
    }

    // ==================== Save Tests ====================

    #[test]
    fn test_save_creates_parent_directories() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir
            .path()
            .join("nested")
            .join("deep")
            .join("config.toml");

        ConfigLoader::save_to_path(&BlocksConfig::default(), &path).unwrap();

        assert!(path.exists());
    }

    #[test]
    fn test_save_then_load_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");

        let mut config = BlocksConfig::default();
        config.plugins.dir = PathBuf::from("/opt/nobleblocks/plugins");
        ConfigLoader::save_to_path(&config, &path).unwrap();

        let loaded = ConfigLoader::load_layers(&[path]).unwrap();
        assert_eq!(loaded.plugins.dir, PathBuf::from("/opt/nobleblocks/plugins"));
        assert!(loaded.plugins.extensions.is_none());
    }
}
