//! Command line configuration for the viewer.

use std::path::PathBuf;

use clap::Parser;

use crate::{
    error::{Error, Result},
    worker::Thresholds,
};

#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "fractal-canvas", version, about = "Interactive escape-time fractal viewer")]
pub struct ViewerConfig {
    /// Initial window width in pixels.
    #[arg(long, default_value_t = 960)]
    pub width: u32,

    /// Initial window height in pixels.
    #[arg(long, default_value_t = 640)]
    pub height: u32,

    /// Complex units per pixel.
    #[arg(long, default_value_t = 0.004)]
    pub scale: f64,

    /// Real part of the initial view centre.
    #[arg(long, default_value_t = -0.6, allow_negative_numbers = true)]
    pub centre_real: f64,

    /// Imaginary part of the initial view centre.
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub centre_imaginary: f64,

    /// Where the iteration limit sits between --min-threshold and --max-threshold.
    #[arg(long, default_value_t = 0.1)]
    pub resolution: f64,

    #[arg(long, default_value_t = 64)]
    pub min_threshold: u32,

    #[arg(long, default_value_t = 4096)]
    pub max_threshold: u32,

    /// Run the palette backwards.
    #[arg(long)]
    pub inversed: bool,

    /// Where the `S` key saves the current frame; the extension picks the format.
    #[arg(long, default_value = "fractal.png")]
    pub save_path: PathBuf,
}

impl ViewerConfig {
    /// Check everything that would otherwise only fail once the window is up.
    pub fn validate(&self) -> Result<Thresholds> {
        if self.width == 0 || self.height == 0 {
            return Err(Error::invalid_argument(format!(
                "window size must be non-empty, got {}x{}",
                self.width, self.height
            )));
        }
        if self.scale == 0.0 || !self.scale.is_finite() {
            return Err(Error::invalid_argument(format!(
                "scale must be non-zero and finite, got {}",
                self.scale
            )));
        }
        Thresholds::new(self.min_threshold, self.max_threshold)?.with_resolution(self.resolution)
    }
}
