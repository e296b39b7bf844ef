/*!
The render pipeline.

State changes don't render anything by themselves. Each mutator records the
new state and returns the [`Trigger`] describing the smallest amount of work
that brings the frame up to date; [`RenderPipeline::apply_change`] then runs
exactly those stages, in order:

1. (re)allocate the value and pixel buffers if the pixel count changed,
   which in practice only happens on `Geometry` (or the first run),
2. rebuild the indexed colour table if the threshold or palette changed,
3. run the worker over every pixel ([`compute::calculation_pass`]),
4. map every value to a colour ([`crate::colour::colour_pass`]), swapping
   the result in only if every value was in range.

| trigger          | colour index | calculate | colour |
|------------------|--------------|-----------|--------|
| `Geometry`       |              | yes       | yes    |
| `Transformation` |              | yes       | yes    |
| `ColorMap`       | yes          |           | yes    |
| `Calculation`    | yes          | yes       | yes    |
| `All`            | yes          | yes       | yes    |

Stages the trigger skips still run when their output is missing or belongs
to a different geometry, so a run never colours stale values.
*/

use std::time::{Duration, Instant};

use log::{debug, trace};

use crate::{
    colour::{Colour, ColourIndex, ColourMap},
    compute::{self, ValueRange},
    error::{Error, Result},
    frame::FrameBuffers,
    pixel::Point,
    screen,
    transform::Viewport,
    worker::PointWorker,
};

/// Why the pipeline is being re-run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Trigger {
    /// Pixel dimensions changed.
    Geometry,
    /// Origin or scale changed.
    Transformation,
    /// Palette or its inversion changed.
    ColorMap,
    /// The worker or its parameters changed.
    Calculation,
    All,
}

impl Trigger {
    fn rebuilds_index(self) -> bool {
        matches!(
            self,
            Trigger::ColorMap | Trigger::Calculation | Trigger::All
        )
    }

    fn calculates(self) -> bool {
        !matches!(self, Trigger::ColorMap)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RunStats {
    pub trigger: Trigger,
    pub elapsed: Duration,
    pub calculated: bool,
    /// Observed worker output range of the last calculation pass.
    pub value_range: Option<ValueRange>,
}

impl RunStats {
    pub fn frames_per_second(&self) -> f64 {
        1.0 / self.elapsed.as_secs_f64().max(f64::EPSILON)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum RunOutcome {
    Completed(RunStats),
    /// The pipeline is disabled; the change will be applied on re-enable.
    Suspended,
    /// No surface size, worker or colour map yet.
    NotReady,
}

impl RunOutcome {
    pub fn stats(&self) -> Option<&RunStats> {
        match self {
            RunOutcome::Completed(stats) => Some(stats),
            _ => None,
        }
    }
}

/// What a point query sees at one pixel.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointValues {
    pub real: f64,
    pub imaginary: f64,
    pub value: u32,
}

pub struct RenderPipeline {
    viewport: Viewport,
    worker: Option<Box<dyn PointWorker>>,
    colour_map: Option<Box<dyn ColourMap>>,
    index: ColourIndex,
    buffers: Option<FrameBuffers>,
    /// Geometry the value buffer was last filled for.
    calculated_for: Option<Viewport>,
    value_range: Option<ValueRange>,
}

impl RenderPipeline {
    pub fn new(viewport: Viewport) -> Self {
        Self {
            viewport,
            worker: None,
            colour_map: None,
            index: ColourIndex::new(),
            buffers: None,
            calculated_for: None,
            value_range: None,
        }
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn worker(&self) -> Option<&dyn PointWorker> {
        self.worker.as_deref()
    }

    pub fn colour_map(&self) -> Option<&dyn ColourMap> {
        self.colour_map.as_deref()
    }

    pub fn set_worker(&mut self, worker: Box<dyn PointWorker>) -> Trigger {
        self.worker = Some(worker);
        Trigger::Calculation
    }

    /// Change worker parameters in place, e.g. its resolution.
    pub fn update_worker(
        &mut self,
        update: impl FnOnce(&mut dyn PointWorker) -> Result<()>,
    ) -> Result<Trigger> {
        let worker = self.worker.as_deref_mut().ok_or(Error::NullArgument("worker"))?;
        update(worker)?;
        Ok(Trigger::Calculation)
    }

    pub fn set_colour_map(&mut self, colour_map: Box<dyn ColourMap>) -> Trigger {
        self.colour_map = Some(colour_map);
        self.index.invalidate();
        Trigger::ColorMap
    }

    /// Change colour map configuration in place, e.g. its inversion.
    pub fn update_colour_map(
        &mut self,
        update: impl FnOnce(&mut dyn ColourMap) -> Result<()>,
    ) -> Result<Trigger> {
        let colour_map = self
            .colour_map
            .as_deref_mut()
            .ok_or(Error::NullArgument("colour map"))?;
        update(colour_map)?;
        Ok(Trigger::ColorMap)
    }

    pub fn set_origin(&mut self, origin: Point) -> Result<Trigger> {
        self.viewport.set_origin(origin)?;
        Ok(Trigger::Transformation)
    }

    pub fn set_scale(&mut self, scale: f64) -> Result<Trigger> {
        self.viewport.set_scale(scale)?;
        Ok(Trigger::Transformation)
    }

    pub fn zoom_at(&mut self, anchor: Point, factor: f64) -> Result<Trigger> {
        self.viewport.zoom_at(anchor, factor)?;
        Ok(Trigger::Transformation)
    }

    pub fn pan_by(&mut self, dx: f64, dy: f64) -> Result<Trigger> {
        self.viewport.pan_by(dx, dy)?;
        Ok(Trigger::Transformation)
    }

    pub fn set_size(&mut self, size: screen::Size) -> Trigger {
        self.viewport.set_size(size);
        Trigger::Geometry
    }

    /// Whether [`RenderPipeline::apply_change`] would produce a frame.
    pub fn is_ready(&self) -> bool {
        !self.viewport.size().is_empty() && self.worker.is_some() && self.colour_map.is_some()
    }

    /// Run the stages `trigger` needs. Buffers are allocated on the first
    /// run that finds the pipeline ready.
    ///
    /// If the colour pass fails the previous frame stays visible and the
    /// value buffer is treated as stale.
    pub fn apply_change(&mut self, trigger: Trigger) -> Result<RunOutcome> {
        if !self.is_ready() {
            return Ok(RunOutcome::NotReady);
        }
        let size = self.viewport.size();

        let start = Instant::now();
        trace!("begin apply_change({:?})", trigger);

        let stale = self
            .buffers
            .as_ref()
            .map_or(true, |buffers| buffers.pixel_count() != size.pixel_count());
        if stale {
            self.reallocate(size);
        }

        let (worker, colour_map) = match (self.worker.as_deref(), self.colour_map.as_deref()) {
            (Some(worker), Some(colour_map)) => (worker, colour_map),
            _ => return Ok(RunOutcome::NotReady),
        };
        let buffers = match self.buffers.as_mut() {
            Some(buffers) => buffers,
            None => return Ok(RunOutcome::NotReady),
        };

        let threshold = worker.threshold();
        if trigger.rebuilds_index() || !self.index.is_built() || self.index.threshold() != threshold
        {
            self.index.rebuild(threshold, colour_map);
        }

        let calculate = trigger.calculates() || self.calculated_for != Some(self.viewport);
        if calculate {
            self.value_range = compute::calculation_pass(&self.viewport, worker, &mut buffers.values);
            self.calculated_for = Some(self.viewport);
        }

        if let Err(err) = buffers.colour(&self.index, size) {
            self.calculated_for = None;
            return Err(err);
        }

        let stats = RunStats {
            trigger,
            elapsed: start.elapsed(),
            calculated: calculate,
            value_range: self.value_range,
        };
        trace!("end apply_change({:?}) in {:?}", trigger, stats.elapsed);
        Ok(RunOutcome::Completed(stats))
    }

    fn reallocate(&mut self, size: screen::Size) {
        debug!("reallocating buffers for {}x{}", size.width, size.height);
        if let Some(buffers) = self.buffers.take() {
            buffers.destroy();
        }
        self.buffers = Some(FrameBuffers::allocate(size));
        self.calculated_for = None;
        self.value_range = None;
    }

    /// The last successfully coloured frame and the size it was coloured
    /// for, which lags the viewport size until the next run after a resize.
    pub fn frame(&self) -> Option<(&[Colour], screen::Size)> {
        self.buffers.as_ref()?.frame()
    }

    pub fn pixels(&self) -> Option<&[Colour]> {
        self.frame().map(|(pixels, _)| pixels)
    }

    pub fn pixel_bytes(&self) -> Option<&[u8]> {
        self.pixels().map(bytemuck::cast_slice)
    }

    pub fn values(&self) -> Option<&[u32]> {
        self.buffers.as_ref().map(|buffers| &*buffers.values)
    }

    pub fn value_range(&self) -> Option<ValueRange> {
        self.value_range
    }

    /// Complex coordinate and worker output under `point`.
    ///
    /// `None` outside the grid, or when the value buffer hasn't been filled
    /// for the current geometry.
    pub fn get_values(&self, point: Point) -> Option<PointValues> {
        if self.calculated_for != Some(self.viewport) {
            return None;
        }
        let index = self.viewport.to_index(point)?;
        let value = *self.buffers.as_ref()?.values.get(index)?;
        let complex = self.viewport.index_to_complex(index);
        Some(PointValues {
            real: complex.real,
            imaginary: complex.imaginary,
            value,
        })
    }

    /// Drop both buffers and the colour table.
    pub fn release(&mut self) {
        if let Some(buffers) = self.buffers.take() {
            buffers.destroy();
        }
        self.index.invalidate();
        self.calculated_for = None;
        self.value_range = None;
    }
}

impl Drop for RenderPipeline {
    fn drop(&mut self) {
        self.release();
    }
}
