//! Core utilities shared by the trivis crates.
//!
//! - Error types and result aliases
//! - Logging initialization
//! - Frame timing
//! - Configuration loading

mod config;
mod error;
mod logging;
mod timer;

pub use config::{Config, GraphicsConfig, LoggingConfig, SceneConfig, ShaderConfig, WindowConfig};
pub use error::{Error, Result};
pub use logging::{DEFAULT_LOG_FILTER, init_logging};
pub use timer::{FrameReport, FrameStats, Timer};
