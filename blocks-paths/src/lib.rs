//! Standard paths for NobleBlocks.
//!
//! Config lives under the XDG Base Directory path for cross-platform
//! consistency. Plugins ship next to the application binary, so the default
//! plugin directory is derived from the executable's location instead.

use std::path::PathBuf;

/// Get the NobleBlocks config directory.
///
/// Returns `$XDG_CONFIG_HOME/nobleblocks` if set, otherwise `~/.config/nobleblocks`.
///
/// # Examples
///
/// ```
/// use blocks_paths::config_dir;
///
/// let config = config_dir();
/// let settings = config.join("config.toml");
/// ```
pub fn config_dir() -> PathBuf {
    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
        PathBuf::from(xdg_config).join("nobleblocks")
    } else if let Some(home) = dirs::home_dir() {
        home.join(".config/nobleblocks")
    } else {
        PathBuf::from(".config/nobleblocks")
    }
}

/// Get the directory the application runs from.
///
/// This is the directory containing the current executable, falling back to
/// the working directory when the executable path cannot be resolved.
pub fn app_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Get the default plugin directory: `<app_dir>/plugins`.
///
/// # Examples
///
/// ```
/// let plugins = blocks_paths::plugin_dir();
/// assert!(plugins.ends_with("plugins"));
/// ```
pub fn plugin_dir() -> PathBuf {
    app_dir().join("plugins")
}
