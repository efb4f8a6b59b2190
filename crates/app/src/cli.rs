//! Command-line arguments.

use std::path::PathBuf;

use clap::Parser;

use trivis_core::Config;

/// Display a triangle soup with a Vulkan presentation loop.
#[derive(Debug, Parser)]
#[command(name = "trivis", version, about)]
pub struct Args {
    /// TOML configuration file
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Triangle file: a count followed by nine coordinates per triangle ("-" reads stdin)
    #[arg(short, long, value_name = "PATH")]
    pub input: Option<PathBuf>,

    /// Number of frames in flight
    #[arg(long, value_name = "N")]
    pub frames_in_flight: Option<usize>,

    /// Disable the Vulkan validation layer
    #[arg(long)]
    pub no_validation: bool,

    /// Initial window width
    #[arg(long)]
    pub width: Option<u32>,

    /// Initial window height
    #[arg(long)]
    pub height: Option<u32>,
}

impl Args {
    /// Overrides the values in `config` that were given on the command line.
    pub fn apply(&self, config: &mut Config) {
        if let Some(frames) = self.frames_in_flight {
            config.graphics.frames_in_flight = frames;
        }
        if self.no_validation {
            config.graphics.validation = false;
        }
        if let Some(width) = self.width {
            config.window.width = width;
        }
        if let Some(height) = self.height {
            config.window.height = height;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_overrides() {
        let args = Args::try_parse_from([
            "trivis",
            "--input",
            "-",
            "--frames-in-flight",
            "3",
            "--no-validation",
            "--width",
            "640",
        ])
        .unwrap();

        let mut config = Config::default();
        args.apply(&mut config);

        assert_eq!(args.input, Some(PathBuf::from("-")));
        assert_eq!(config.graphics.frames_in_flight, 3);
        assert!(!config.graphics.validation);
        assert_eq!(config.window.width, 640);
        assert_eq!(config.window.height, Config::default().window.height);
    }

    #[test]
    fn test_no_arguments_keep_config() {
        let args = Args::try_parse_from(["trivis"]).unwrap();
        let mut config = Config::default();
        args.apply(&mut config);
        assert_eq!(config, Config::default());
    }
}
