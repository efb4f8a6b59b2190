//! Viewer configuration loaded from TOML.
//!
//! Every section carries `#[serde(default)]`, so a config file only needs the
//! keys it wants to change.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::logging::DEFAULT_LOG_FILTER;

/// Root configuration structure.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub window: WindowConfig,
    pub graphics: GraphicsConfig,
    pub shaders: ShaderConfig,
    pub scene: SceneConfig,
    pub logging: LoggingConfig,
}

/// Window settings.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "trivis".to_string(),
            width: 1280,
            height: 720,
        }
    }
}

/// Presentation settings.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct GraphicsConfig {
    /// Number of frame slots cycled by the presentation loop.
    pub frames_in_flight: usize,
    pub clear_color: [f32; 4],
    /// Enable the Khronos validation layer when it is installed.
    pub validation: bool,
}

impl Default for GraphicsConfig {
    fn default() -> Self {
        Self {
            frames_in_flight: 2,
            clear_color: [0.2, 0.3, 0.3, 1.0],
            validation: cfg!(debug_assertions),
        }
    }
}

/// SPIR-V binaries for the two pipelines.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ShaderConfig {
    pub triangle_vertex: PathBuf,
    pub triangle_fragment: PathBuf,
    pub wireframe_vertex: PathBuf,
    pub wireframe_fragment: PathBuf,
}

impl Default for ShaderConfig {
    fn default() -> Self {
        Self {
            triangle_vertex: PathBuf::from("shaders/triangle.vert.spv"),
            triangle_fragment: PathBuf::from("shaders/triangle.frag.spv"),
            wireframe_vertex: PathBuf::from("shaders/wireframe.vert.spv"),
            wireframe_fragment: PathBuf::from("shaders/wireframe.frag.spv"),
        }
    }
}

/// Camera and colouring of the displayed geometry.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct SceneConfig {
    /// Colours indexed by each vertex's `color_index`.
    pub colors: [[f32; 4]; 2],
    pub camera_distance: f32,
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
    /// Draw the bounding box of the loaded triangles as a wireframe.
    pub show_bounds: bool,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            colors: [[0.25, 0.55, 0.95, 1.0], [0.95, 0.35, 0.25, 1.0]],
            camera_distance: 25.0,
            fov_degrees: 45.0,
            near: 0.1,
            far: 5000.0,
            show_bounds: true,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl Config {
    /// Loads and validates the configuration at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid TOML for this
    /// schema, or fails [`Config::validate`].
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml(&content)?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Parses and validates a configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        debug!("Config: {:?}", config);
        Ok(config)
    }

    /// Checks invariants the renderer relies on.
    pub fn validate(&self) -> Result<()> {
        if self.graphics.frames_in_flight == 0 {
            return Err(Error::Config(
                "graphics.frames_in_flight must be at least 1".to_string(),
            ));
        }
        if self.window.width == 0 || self.window.height == 0 {
            return Err(Error::Config(format!(
                "window size must be non-zero, got {}x{}",
                self.window.width, self.window.height
            )));
        }
        if !(self.scene.near > 0.0 && self.scene.near < self.scene.far) {
            return Err(Error::Config(format!(
                "scene clip planes must satisfy 0 < near < far, got near={} far={}",
                self.scene.near, self.scene.far
            )));
        }
        if !(self.scene.fov_degrees > 0.0 && self.scene.fov_degrees < 180.0) {
            return Err(Error::Config(format!(
                "scene.fov_degrees must be in (0, 180), got {}",
                self.scene.fov_degrees
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.graphics.frames_in_flight, 2);
        assert_eq!(config.graphics.clear_color, [0.2, 0.3, 0.3, 1.0]);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = Config::from_toml(
            r#"
            [window]
            width = 800

            [graphics]
            frames_in_flight = 3
            "#,
        )
        .unwrap();

        assert_eq!(config.window.width, 800);
        assert_eq!(config.window.height, 720);
        assert_eq!(config.window.title, "trivis");
        assert_eq!(config.graphics.frames_in_flight, 3);
        assert_eq!(config.scene, SceneConfig::default());
    }

    #[test]
    fn test_zero_frames_in_flight_rejected() {
        let result = Config::from_toml("[graphics]\nframes_in_flight = 0\n");
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_inverted_clip_planes_rejected() {
        let result = Config::from_toml("[scene]\nnear = 10.0\nfar = 1.0\n");
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_malformed_toml_is_parse_error() {
        let result = Config::from_toml("[window\nwidth = 1");
        assert!(matches!(result, Err(Error::ConfigParse(_))));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[shaders]\ntriangle_vertex = \"custom.vert.spv\"").unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(
            config.shaders.triangle_vertex,
            PathBuf::from("custom.vert.spv")
        );
        assert_eq!(
            config.shaders.triangle_fragment,
            ShaderConfig::default().triangle_fragment
        );
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = Config::load(Path::new("/nonexistent/trivis.toml"));
        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[test]
    fn test_round_trips_through_toml() {
        let config = Config::default();
        let text = toml::to_string(&config).unwrap();
        assert_eq!(Config::from_toml(&text).unwrap(), config);
    }
}
