//! Error types shared by the trivis crates.

use thiserror::Error;

/// Error type for window, configuration and IO failures.
#[derive(Error, Debug)]
pub enum Error {
    /// Window creation or surface handle errors
    #[error("Window error: {0}")]
    Window(String),

    /// Vulkan errors raised outside the RHI layer (surface creation)
    #[error("Vulkan error: {0}")]
    Vulkan(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed configuration file
    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Configuration values that parse but make no sense
    #[error("Config error: {0}")]
    Config(String),

    /// Malformed geometry input
    #[error("Input error: {0}")]
    Input(String),
}

/// Result type alias using the core Error type.
pub type Result<T> = std::result::Result<T, Error>;
