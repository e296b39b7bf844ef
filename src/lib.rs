/*!
Render scalar fields over the complex plane into colour images.

A [`PointWorker`] maps a complex coordinate to an integer in
`[0, threshold]`, a [`ColourMap`] supplies a palette, and the
[`RenderPipeline`] ties them to a pan/zoom [`Viewport`]: it evaluates the
worker for every pixel in parallel, maps every value through an indexed
colour table and keeps the value and pixel buffers sized to the surface.

[`FractalCanvas`] wraps the pipeline with property-style setters that rerun
only the stages a change invalidates and push finished frames to a
[`HostSurface`].
*/

pub mod buffer;
pub mod canvas;
pub mod colour;
pub mod compute;
pub mod config;
pub mod error;
pub mod export;
pub mod frame;
pub mod pipeline;
pub mod pixel;
pub mod screen;
pub mod surface;
pub mod transform;
pub mod worker;

pub use canvas::FractalCanvas;
pub use colour::{Colour, ColourIndex, ColourMap, Gradient};
pub use compute::ValueRange;
pub use error::{Error, Result};
pub use pipeline::{PointValues, RenderPipeline, RunOutcome, RunStats, Trigger};
pub use pixel::{Complex, Point};
pub use screen::Size;
pub use surface::HostSurface;
pub use transform::Viewport;
pub use worker::{Mandelbrot, PointWorker, Thresholds};
