//! Plugin host error types

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Which step of bringing a plugin up failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivationStage {
    /// Building the instance from the host context
    Construct,
    /// The one-time `activate()` call
    Activate,
}

impl fmt::Display for ActivationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Construct => f.write_str("construct"),
            Self::Activate => f.write_str("activate"),
        }
    }
}

/// Errors that can occur in the plugin host
#[derive(Error, Debug)]
pub enum PluginHostError {
    /// Plugin directory missing or not listable
    #[error("Plugin directory unavailable: {path}: {source}")]
    DirectoryUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to load dynamic library
    #[error("Failed to load plugin library: {0}")]
    LibraryLoad(#[from] libloading::Error),

    /// Library loaded but does not export a required symbol
    #[error("Plugin unit '{unit}' is missing entry point {symbol}")]
    MissingEntryPoint {
        unit: String,
        symbol: String,
        #[source]
        source: libloading::Error,
    },

    /// API version mismatch between host and plugin library
    #[error("Plugin unit '{unit}': API version mismatch, host expects {expected}, unit has {found}")]
    ApiVersionMismatch {
        unit: String,
        expected: u32,
        found: u32,
    },

    /// Unit could not be loaded for any other reason (including a panic in the loader)
    #[error("Failed to load plugin unit '{unit}': {reason}")]
    LoadFailure { unit: String, reason: String },

    /// Plugin failed while being constructed or activated
    #[error("Plugin '{plugin}' failed to {stage}: {reason}")]
    ActivationFailure {
        plugin: String,
        stage: ActivationStage,
        reason: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
