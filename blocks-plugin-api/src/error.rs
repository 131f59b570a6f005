//! Error types for plugin authors

use thiserror::Error;

/// Errors that plugins can return
#[derive(Error, Debug)]
pub enum PluginError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Plugin could not reach its running state
    #[error("Activation failed: {0}")]
    Activation(String),

    /// A service the plugin depends on was not provided by the host or another plugin
    #[error("Missing service: {0}")]
    MissingService(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Plugin code panicked; the panic was caught inside the plugin library
    #[error("panicked: {0}")]
    Panicked(String),

    /// Custom error with message
    #[error("{0}")]
    Custom(String),
}

impl PluginError {
    /// Create a custom error with a message
    pub fn custom(message: impl Into<String>) -> Self {
        Self::Custom(message.into())
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create an activation error
    pub fn activation(message: impl Into<String>) -> Self {
        Self::Activation(message.into())
    }
}
