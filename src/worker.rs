//! Per-point evaluators.

use crate::{
    error::{Error, Result},
    pixel::Complex,
};

/// Where a worker's current threshold sits between its fixed bounds.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Thresholds {
    min: u32,
    max: u32,
    resolution: f64,
    threshold: u32,
}

impl Thresholds {
    /// Starts at `resolution = 0`, i.e. `threshold == min`.
    pub fn new(min: u32, max: u32) -> Result<Self> {
        if min == 0 {
            return Err(Error::invalid_argument("minimum threshold must be positive"));
        }
        if max <= min {
            return Err(Error::invalid_argument(format!(
                "maximum threshold {} must exceed minimum threshold {}",
                max, min
            )));
        }
        Ok(Self {
            min,
            max,
            resolution: 0.0,
            threshold: min,
        })
    }

    pub fn with_resolution(mut self, resolution: f64) -> Result<Self> {
        self.set_resolution(resolution)?;
        Ok(self)
    }

    pub fn min(&self) -> u32 {
        self.min
    }

    pub fn max(&self) -> u32 {
        self.max
    }

    pub fn resolution(&self) -> f64 {
        self.resolution
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    pub fn set_resolution(&mut self, resolution: f64) -> Result<()> {
        if !(0.0..=1.0).contains(&resolution) {
            return Err(Error::invalid_argument(format!(
                "resolution must lie in [0, 1], got {}",
                resolution
            )));
        }
        self.resolution = resolution;
        self.threshold = self.min + (resolution * (self.max - self.min) as f64).round() as u32;
        Ok(())
    }
}

/// A scalar field over the complex plane.
///
/// `evaluate` must return a value in `[0, threshold()]`, where
/// `threshold()` means "did not escape". The render pipeline calls it from
/// many threads at once.
pub trait PointWorker: Send + Sync {
    fn thresholds(&self) -> &Thresholds;

    fn thresholds_mut(&mut self) -> &mut Thresholds;

    fn evaluate(&self, point: Complex) -> u32;

    fn threshold(&self) -> u32 {
        self.thresholds().threshold()
    }

    fn set_resolution(&mut self, resolution: f64) -> Result<()> {
        self.thresholds_mut().set_resolution(resolution)
    }
}

/// Escape-time iteration count of `z -> z^2 + c`.
pub struct Mandelbrot {
    thresholds: Thresholds,
}

impl Mandelbrot {
    pub fn new(thresholds: Thresholds) -> Self {
        Self { thresholds }
    }
}

impl PointWorker for Mandelbrot {
    fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    fn thresholds_mut(&mut self) -> &mut Thresholds {
        &mut self.thresholds
    }

    fn evaluate(&self, point: Complex) -> u32 {
        let threshold = self.thresholds.threshold();
        let mut z = Complex::ZERO;
        for iteration in 0..threshold {
            z = z * z + point;
            if z.norm_sqr() > 4.0 {
                return iteration;
            }
        }
        threshold
    }
}
