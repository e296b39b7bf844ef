/*!
Property-style front end over [`RenderPipeline`].

Every setter validates its argument, records the change and, while the canvas
is enabled, runs the pipeline to completion and publishes the frame before it
returns. Disabling the canvas turns setters into plain state writes;
re-enabling it runs a single [`Trigger::All`], which is how a host batches an
origin and scale update into one frame.
*/

use std::{
    io::{Seek, Write},
    path::Path,
};

use image::ImageFormat;
use log::{debug, error};

use crate::{
    colour::{Colour, ColourMap},
    error::{Error, Result},
    export,
    pipeline::{PointValues, RenderPipeline, RunOutcome, Trigger},
    pixel::Point,
    screen::Size,
    surface::HostSurface,
    transform::Viewport,
    worker::PointWorker,
};

pub struct FractalCanvas<S> {
    surface: S,
    pipeline: RenderPipeline,
    enabled: bool,
}

impl<S: HostSurface> FractalCanvas<S> {
    /// The viewport takes the surface's current size; the first frame is
    /// rendered once a worker and a colour map are set.
    pub fn new(surface: S, origin: Point, scale: f64) -> Result<Self> {
        let viewport = Viewport::new(origin, scale, surface.size())?;
        Ok(Self {
            surface,
            pipeline: RenderPipeline::new(viewport),
            enabled: true,
        })
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn pipeline(&self) -> &RenderPipeline {
        &self.pipeline
    }

    pub fn viewport(&self) -> &Viewport {
        self.pipeline.viewport()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Returns the outcome of the catch-up run when this re-enables the
    /// canvas, `None` otherwise.
    pub fn set_enabled(&mut self, enabled: bool) -> Result<Option<RunOutcome>> {
        let was_enabled = std::mem::replace(&mut self.enabled, enabled);
        if enabled && !was_enabled {
            self.run(Trigger::All).map(Some)
        } else {
            Ok(None)
        }
    }

    pub fn set_worker(&mut self, worker: Option<Box<dyn PointWorker>>) -> Result<RunOutcome> {
        let worker = worker.ok_or(Error::NullArgument("worker"))?;
        let trigger = self.pipeline.set_worker(worker);
        self.change(trigger)
    }

    pub fn set_colour_map(&mut self, colour_map: Option<Box<dyn ColourMap>>) -> Result<RunOutcome> {
        let colour_map = colour_map.ok_or(Error::NullArgument("colour map"))?;
        let trigger = self.pipeline.set_colour_map(colour_map);
        self.change(trigger)
    }

    pub fn set_resolution(&mut self, resolution: f64) -> Result<RunOutcome> {
        let trigger = self
            .pipeline
            .update_worker(|worker| worker.set_resolution(resolution))?;
        self.change(trigger)
    }

    pub fn set_inversed(&mut self, inversed: bool) -> Result<RunOutcome> {
        let trigger = self.pipeline.update_colour_map(|colour_map| {
            colour_map.set_inversed(inversed);
            Ok(())
        })?;
        self.change(trigger)
    }

    pub fn set_origin(&mut self, origin: Point) -> Result<RunOutcome> {
        let trigger = self.pipeline.set_origin(origin)?;
        self.change(trigger)
    }

    pub fn set_scale(&mut self, scale: f64) -> Result<RunOutcome> {
        let trigger = self.pipeline.set_scale(scale)?;
        self.change(trigger)
    }

    /// Zoom by `factor` around the pixel at `anchor`.
    pub fn zoom_at(&mut self, anchor: Point, factor: f64) -> Result<RunOutcome> {
        let trigger = self.pipeline.zoom_at(anchor, factor)?;
        self.change(trigger)
    }

    pub fn pan_by(&mut self, dx: f64, dy: f64) -> Result<RunOutcome> {
        let trigger = self.pipeline.pan_by(dx, dy)?;
        self.change(trigger)
    }

    /// Pick up the surface's current size. Hosts call this once the surface
    /// becomes ready and after every resize.
    pub fn surface_resized(&mut self) -> Result<RunOutcome> {
        let size = self.surface.size();
        debug!("surface resized to {}x{}", size.width, size.height);
        let trigger = self.pipeline.set_size(size);
        self.change(trigger)
    }

    pub fn get_values(&self, point: Point) -> Option<PointValues> {
        self.pipeline.get_values(point)
    }

    /// Encode the last published frame into `writer`, at the size it was
    /// published with.
    pub fn write_frame<W: Write + Seek>(&self, writer: &mut W, format: ImageFormat) -> Result<()> {
        let (pixels, size) = self.published()?;
        export::write_frame(pixels, size, writer, format)
    }

    pub fn save_frame(&self, path: &Path) -> Result<()> {
        let (pixels, size) = self.published()?;
        export::save_frame(pixels, size, path).map_err(|err| {
            error!("failed to save frame to {}: {}", path.display(), err);
            err
        })
    }

    fn published(&self) -> Result<(&[Colour], Size)> {
        self.pipeline
            .frame()
            .ok_or_else(|| Error::invalid_argument("no frame has been rendered yet"))
    }

    fn change(&mut self, trigger: Trigger) -> Result<RunOutcome> {
        if !self.enabled {
            debug!("canvas disabled, deferring {:?}", trigger);
            return Ok(RunOutcome::Suspended);
        }
        self.run(trigger)
    }

    fn run(&mut self, trigger: Trigger) -> Result<RunOutcome> {
        if !self.pipeline.is_ready() {
            return Ok(RunOutcome::NotReady);
        }

        self.surface.run_started(trigger);
        let outcome = match self.pipeline.apply_change(trigger) {
            Ok(outcome) => outcome,
            Err(err) => {
                error!("{:?} run failed: {}", trigger, err);
                self.surface.run_failed(trigger, &err);
                return Err(err);
            }
        };
        if let RunOutcome::Completed(stats) = &outcome {
            if let Some((pixels, size)) = self.pipeline.frame() {
                self.surface.publish(pixels, size);
            }
            debug!(
                "{:?} run took {:?} ({:.1} fps)",
                trigger,
                stats.elapsed,
                stats.frames_per_second()
            );
            self.surface.run_completed(stats);
        }
        Ok(outcome)
    }
}
