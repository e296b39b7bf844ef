use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use fractal_canvas::{
    Colour, ColourMap, Complex, Error, FractalCanvas, Gradient, HostSurface, Mandelbrot, Point,
    PointWorker, RenderPipeline, RunOutcome, RunStats, Size, Thresholds, Trigger, Viewport,
};

#[derive(Default)]
struct RecordingSurface {
    size: Size,
    frames: Vec<(Vec<Colour>, Size)>,
    started: Vec<Trigger>,
    completed: Vec<RunStats>,
    failed: Vec<Trigger>,
}

impl RecordingSurface {
    fn new(width: u32, height: u32) -> Self {
        Self {
            size: Size::new(width, height),
            ..Default::default()
        }
    }
}

impl HostSurface for RecordingSurface {
    fn size(&self) -> Size {
        self.size
    }

    fn publish(&mut self, pixels: &[Colour], size: Size) {
        self.frames.push((pixels.to_vec(), size));
    }

    fn run_started(&mut self, trigger: Trigger) {
        self.started.push(trigger);
    }

    fn run_completed(&mut self, stats: &RunStats) {
        self.completed.push(*stats);
    }

    fn run_failed(&mut self, trigger: Trigger, _error: &Error) {
        self.failed.push(trigger);
    }
}

/// Returns a fixed value everywhere and counts evaluations.
struct Constant {
    thresholds: Thresholds,
    value: u32,
    calls: Arc<AtomicUsize>,
}

impl Constant {
    fn new(threshold: u32, value: u32) -> Self {
        Self {
            thresholds: Thresholds::new(threshold, threshold + 1).unwrap(),
            value,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl PointWorker for Constant {
    fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    fn thresholds_mut(&mut self) -> &mut Thresholds {
        &mut self.thresholds
    }

    fn evaluate(&self, _point: Complex) -> u32 {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.value
    }
}

/// Distance from the origin in whole complex units, capped at the threshold.
struct Rings {
    thresholds: Thresholds,
}

impl PointWorker for Rings {
    fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    fn thresholds_mut(&mut self) -> &mut Thresholds {
        &mut self.thresholds
    }

    fn evaluate(&self, point: Complex) -> u32 {
        (point.norm_sqr().sqrt() as u32).min(self.thresholds.threshold())
    }
}

/// Colour `i` is `(i, i, i)`; the inversion flag only shows in the alpha channel.
struct Greys {
    inversed: bool,
    builds: Arc<AtomicUsize>,
}

impl Greys {
    fn new() -> Self {
        Self {
            inversed: false,
            builds: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl ColourMap for Greys {
    fn build_indexed_colours(&self, count: usize) -> Vec<Colour> {
        self.builds.fetch_add(1, Ordering::SeqCst);
        let alpha = if self.inversed { 200 } else { 255 };
        (0..count)
            .map(|i| Colour::rgba(i as u8, i as u8, i as u8, alpha))
            .collect()
    }

    fn inversed(&self) -> bool {
        self.inversed
    }

    fn set_inversed(&mut self, inversed: bool) {
        self.inversed = inversed;
    }
}

fn rings_canvas(width: u32, height: u32, threshold: u32) -> FractalCanvas<RecordingSurface> {
    let mut canvas = FractalCanvas::new(
        RecordingSurface::new(width, height),
        Point::new(width as f64 / 2.0, height as f64 / 2.0),
        1.0,
    )
    .unwrap();
    canvas.set_colour_map(Some(Box::new(Greys::new()))).unwrap();
    canvas
        .set_worker(Some(Box::new(Rings {
            thresholds: Thresholds::new(threshold, threshold + 10).unwrap(),
        })))
        .unwrap();
    canvas
}

#[test_log::test]
fn nothing_renders_until_worker_and_colour_map_are_set() {
    let mut canvas =
        FractalCanvas::new(RecordingSurface::new(4, 4), Point::new(2.0, 2.0), 1.0).unwrap();
    assert_eq!(canvas.set_origin(Point::new(1.0, 1.0)).unwrap(), RunOutcome::NotReady);

    let outcome = canvas.set_colour_map(Some(Box::new(Greys::new()))).unwrap();
    assert_eq!(outcome, RunOutcome::NotReady);
    assert!(canvas.surface().frames.is_empty());
    assert!(canvas.surface().started.is_empty());

    let outcome = canvas
        .set_worker(Some(Box::new(Constant::new(10, 3))))
        .unwrap();
    assert!(matches!(outcome, RunOutcome::Completed(_)));
    assert_eq!(canvas.surface().frames.len(), 1);
    assert_eq!(canvas.surface().started, vec![Trigger::Calculation]);
    assert_eq!(canvas.surface().completed.len(), 1);
}

#[test_log::test]
fn absent_worker_or_colour_map_is_a_null_argument() {
    let mut canvas = rings_canvas(4, 4, 10);
    let frames = canvas.surface().frames.len();

    assert!(matches!(
        canvas.set_worker(None),
        Err(Error::NullArgument("worker"))
    ));
    assert!(matches!(
        canvas.set_colour_map(None),
        Err(Error::NullArgument("colour map"))
    ));
    assert_eq!(canvas.surface().frames.len(), frames);
    assert!(canvas.pipeline().worker().is_some());
}

#[test_log::test]
fn zero_scale_is_rejected_before_anything_changes() {
    let mut canvas = rings_canvas(4, 4, 10);
    let frames = canvas.surface().frames.len();

    assert!(matches!(
        canvas.set_scale(0.0),
        Err(Error::InvalidArgument(_))
    ));
    assert!(matches!(
        canvas.set_resolution(1.5),
        Err(Error::InvalidArgument(_))
    ));
    assert_eq!(canvas.viewport().scale(), 1.0);
    assert_eq!(canvas.surface().frames.len(), frames);
}

#[test_log::test]
fn threshold_values_render_transparent_regardless_of_palette() {
    let mut canvas =
        FractalCanvas::new(RecordingSurface::new(5, 3), Point::new(2.0, 1.0), 0.1).unwrap();
    canvas
        .set_colour_map(Some(Box::new(Gradient::default())))
        .unwrap();
    canvas
        .set_worker(Some(Box::new(Constant::new(10, 10))))
        .unwrap();

    let (pixels, size) = canvas.surface().frames.last().unwrap();
    assert_eq!(*size, Size::new(5, 3));
    assert_eq!(pixels.len(), 15);
    assert!(pixels.iter().all(|pixel| *pixel == Colour::TRANSPARENT));
}

#[test_log::test]
fn values_stay_in_range_and_map_through_the_index() {
    let canvas = rings_canvas(16, 12, 5);
    let pipeline = canvas.pipeline();
    let values = pipeline.values().unwrap();
    let pixels = pipeline.pixels().unwrap();

    assert_eq!(values.len(), 16 * 12);
    for (value, pixel) in values.iter().zip(pixels) {
        assert!(*value <= 5);
        if *value == 5 {
            assert_eq!(*pixel, Colour::TRANSPARENT);
        } else {
            let v = *value as u8;
            assert_eq!(*pixel, Colour::rgba(v, v, v, 255));
        }
    }
    assert!(values.contains(&0));
    assert!(values.contains(&5));

    let range = pipeline.value_range().unwrap();
    assert_eq!(range.min, 0);
    assert_eq!(range.max, 5);
}

#[test_log::test]
fn rerunning_without_changes_is_idempotent() {
    let mut pipeline = RenderPipeline::new(
        Viewport::new(Point::new(40.0, 30.0), 0.05, Size::new(80, 60)).unwrap(),
    );
    pipeline.set_colour_map(Box::new(Gradient::default()));
    pipeline.set_worker(Box::new(Mandelbrot::new(
        Thresholds::new(20, 200).unwrap().with_resolution(0.5).unwrap(),
    )));

    pipeline.apply_change(Trigger::All).unwrap();
    let first = pipeline.pixels().unwrap().to_vec();
    pipeline.apply_change(Trigger::All).unwrap();
    let second = pipeline.pixels().unwrap().to_vec();

    assert_eq!(first, second);
}

#[test_log::test]
fn resize_reallocates_and_recomputes_everything() {
    let mut canvas = rings_canvas(8, 6, 3);
    assert_eq!(canvas.pipeline().values().unwrap().len(), 48);

    canvas.surface_mut().size = Size::new(5, 3);
    let outcome = canvas.surface_resized().unwrap();
    let stats = *outcome.stats().unwrap();
    assert_eq!(stats.trigger, Trigger::Geometry);
    assert!(stats.calculated);

    let pipeline = canvas.pipeline();
    assert_eq!(pipeline.values().unwrap().len(), 15);
    assert_eq!(pipeline.pixels().unwrap().len(), 15);

    let mut fresh = RenderPipeline::new(*pipeline.viewport());
    fresh.set_colour_map(Box::new(Greys::new()));
    fresh.set_worker(Box::new(Rings {
        thresholds: Thresholds::new(3, 13).unwrap(),
    }));
    fresh.apply_change(Trigger::All).unwrap();
    assert_eq!(pipeline.values(), fresh.values());
    assert_eq!(pipeline.pixels(), fresh.pixels());

    let (pixels, size) = canvas.surface().frames.last().unwrap();
    assert_eq!(*size, Size::new(5, 3));
    assert_eq!(pixels.len(), 15);
}

#[test_log::test]
fn disabled_changes_coalesce_into_one_full_run() {
    let mut canvas = rings_canvas(10, 10, 4);
    let runs = canvas.surface().started.len();

    assert_eq!(canvas.set_enabled(false).unwrap(), None);
    assert_eq!(
        canvas.set_origin(Point::new(2.0, 3.0)).unwrap(),
        RunOutcome::Suspended
    );
    assert_eq!(canvas.set_scale(0.5).unwrap(), RunOutcome::Suspended);
    assert_eq!(canvas.surface().started.len(), runs);

    let outcome = canvas.set_enabled(true).unwrap().unwrap();
    assert_eq!(outcome.stats().unwrap().trigger, Trigger::All);
    assert_eq!(canvas.surface().started.len(), runs + 1);
    assert_eq!(canvas.surface().started.last(), Some(&Trigger::All));
    assert_eq!(canvas.surface().frames.len(), runs + 1);

    let values = canvas.get_values(Point::new(2.0, 3.0)).unwrap();
    assert_eq!((values.real, values.imaginary), (0.0, 0.0));
    let values = canvas.get_values(Point::new(6.0, 3.0)).unwrap();
    assert_eq!(values.real, 2.0);
    assert_eq!(values.value, 2);

    assert_eq!(canvas.set_enabled(true).unwrap(), None);
    assert_eq!(canvas.surface().started.len(), runs + 1);
}

#[test_log::test]
fn colour_changes_skip_the_calculation_pass() {
    let worker = Constant::new(10, 4);
    let calls = worker.calls.clone();
    let greys = Greys::new();
    let builds = greys.builds.clone();

    let mut canvas =
        FractalCanvas::new(RecordingSurface::new(4, 4), Point::new(2.0, 2.0), 1.0).unwrap();
    canvas.set_colour_map(Some(Box::new(greys))).unwrap();
    canvas.set_worker(Some(Box::new(worker))).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 16);
    assert_eq!(builds.load(Ordering::SeqCst), 1);

    let outcome = canvas.set_inversed(true).unwrap();
    assert!(!outcome.stats().unwrap().calculated);
    assert_eq!(calls.load(Ordering::SeqCst), 16);
    assert_eq!(builds.load(Ordering::SeqCst), 2);
    assert_eq!(
        canvas.surface().frames.last().unwrap().0[0],
        Colour::rgba(4, 4, 4, 200)
    );

    // Back to a table that is already cached.
    canvas.set_inversed(false).unwrap();
    assert_eq!(builds.load(Ordering::SeqCst), 2);
    assert_eq!(calls.load(Ordering::SeqCst), 16);
}

#[test_log::test]
fn transformations_recalculate_without_rebuilding_the_index() {
    let worker = Constant::new(10, 4);
    let calls = worker.calls.clone();
    let greys = Greys::new();
    let builds = greys.builds.clone();

    let mut canvas =
        FractalCanvas::new(RecordingSurface::new(4, 4), Point::new(2.0, 2.0), 1.0).unwrap();
    canvas.set_colour_map(Some(Box::new(greys))).unwrap();
    canvas.set_worker(Some(Box::new(worker))).unwrap();

    canvas.pan_by(1.0, 0.0).unwrap();
    canvas.zoom_at(Point::new(1.0, 1.0), 2.0).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 48);
    assert_eq!(builds.load(Ordering::SeqCst), 1);
    assert_eq!(
        canvas.surface().started,
        vec![
            Trigger::Calculation,
            Trigger::Transformation,
            Trigger::Transformation
        ]
    );
}

#[test_log::test]
fn resolution_change_rebuilds_the_index_for_the_new_threshold() {
    let mut canvas =
        FractalCanvas::new(RecordingSurface::new(6, 6), Point::new(3.0, 3.0), 1.0).unwrap();
    canvas.set_colour_map(Some(Box::new(Greys::new()))).unwrap();
    canvas
        .set_worker(Some(Box::new(Rings {
            thresholds: Thresholds::new(1, 11).unwrap(),
        })))
        .unwrap();
    assert!(canvas.pipeline().values().unwrap().iter().all(|v| *v <= 1));

    let outcome = canvas.set_resolution(1.0).unwrap();
    assert_eq!(outcome.stats().unwrap().trigger, Trigger::Calculation);
    assert_eq!(canvas.pipeline().worker().unwrap().threshold(), 11);

    let values = canvas.pipeline().values().unwrap();
    let pixels = canvas.pipeline().pixels().unwrap();
    assert!(values.iter().any(|v| *v > 1));
    for (value, pixel) in values.iter().zip(pixels) {
        if *value < 11 {
            assert_eq!(pixel.r, *value as u8);
        }
    }
}

#[test_log::test]
fn point_query_agrees_with_the_value_buffer() {
    let canvas = rings_canvas(9, 7, 3);
    let pipeline = canvas.pipeline();
    let viewport = pipeline.viewport();
    let values = pipeline.values().unwrap();

    for index in 0..viewport.pixel_count() {
        let point = viewport.index_to_point(index);
        let queried = canvas
            .get_values(Point::new(point.x + 0.5, point.y + 0.5))
            .unwrap();
        assert_eq!(queried.value, values[index]);
        let complex = viewport.index_to_complex(index);
        assert_eq!((queried.real, queried.imaginary), (complex.real, complex.imaginary));
    }
    assert!(canvas.get_values(Point::new(9.0, 0.0)).is_none());
    assert!(canvas.get_values(Point::new(0.0, -1.0)).is_none());
}

#[test_log::test]
fn point_query_is_empty_before_the_first_calculation() {
    let pipeline = RenderPipeline::new(
        Viewport::new(Point::new(1.0, 1.0), 1.0, Size::new(2, 2)).unwrap(),
    );
    assert!(pipeline.get_values(Point::new(0.0, 0.0)).is_none());
    assert!(pipeline.pixels().is_none());
}

#[test_log::test]
fn two_by_two_grid_maps_the_documented_corners() {
    let mut pipeline = RenderPipeline::new(
        Viewport::new(Point::new(1.0, 1.0), 1.0, Size::new(2, 2)).unwrap(),
    );
    pipeline.set_colour_map(Box::new(Greys::new()));
    pipeline.set_worker(Box::new(Constant::new(10, 1)));
    pipeline.apply_change(Trigger::All).unwrap();

    let corner = pipeline.get_values(Point::new(0.0, 0.0)).unwrap();
    assert_eq!((corner.real, corner.imaginary), (-1.0, 1.0));
    let centre = pipeline.get_values(Point::new(1.0, 1.0)).unwrap();
    assert_eq!((centre.real, centre.imaginary), (0.0, 0.0));
}

/// Goes out of range from `cutoff` real units on.
struct Overshoot {
    thresholds: Thresholds,
    cutoff: f64,
}

impl PointWorker for Overshoot {
    fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    fn thresholds_mut(&mut self) -> &mut Thresholds {
        &mut self.thresholds
    }

    fn evaluate(&self, point: Complex) -> u32 {
        if point.real >= self.cutoff {
            self.thresholds.threshold() + 1
        } else {
            0
        }
    }
}

#[test_log::test]
fn contract_violations_fail_the_run() {
    let mut pipeline = RenderPipeline::new(
        Viewport::new(Point::new(0.0, 0.0), 1.0, Size::new(3, 1)).unwrap(),
    );
    pipeline.set_colour_map(Box::new(Greys::new()));
    pipeline.set_worker(Box::new(Overshoot {
        thresholds: Thresholds::new(5, 6).unwrap(),
        cutoff: 0.0,
    }));

    assert!(matches!(
        pipeline.apply_change(Trigger::All),
        Err(Error::WorkerContract {
            value: 6,
            threshold: 5,
            ..
        })
    ));
    assert!(pipeline.pixels().is_none());
}

#[test_log::test]
fn failed_run_keeps_the_published_frame() {
    let mut canvas =
        FractalCanvas::new(RecordingSurface::new(300, 20), Point::new(0.0, 0.0), 1.0).unwrap();
    canvas.set_colour_map(Some(Box::new(Greys::new()))).unwrap();
    canvas
        .set_worker(Some(Box::new(Constant::new(5, 2))))
        .unwrap();
    let good = canvas.pipeline().pixels().unwrap().to_vec();

    let err = canvas
        .set_worker(Some(Box::new(Overshoot {
            thresholds: Thresholds::new(5, 6).unwrap(),
            cutoff: 290.0,
        })))
        .unwrap_err();
    assert!(matches!(err, Error::WorkerContract { value: 6, .. }));

    assert_eq!(canvas.pipeline().pixels().unwrap(), &good[..]);
    assert_eq!(canvas.surface().frames.len(), 1);
    assert_eq!(canvas.surface().started.len(), 2);
    assert_eq!(canvas.surface().completed.len(), 1);
    assert_eq!(canvas.surface().failed, vec![Trigger::Calculation]);

    let mut encoded = std::io::Cursor::new(Vec::new());
    canvas
        .write_frame(&mut encoded, image::ImageFormat::Png)
        .unwrap();
    let decoded = image::load_from_memory(encoded.get_ref()).unwrap().to_rgba8();
    assert!(decoded.pixels().all(|pixel| pixel.0 == [2, 2, 2, 255]));
}

#[test_log::test]
fn export_after_a_deferred_resize_uses_the_published_size() {
    let mut canvas = rings_canvas(4, 6, 3);
    let published = canvas.surface().frames.last().unwrap().0.clone();
    canvas.set_enabled(false).unwrap();

    for (width, height) in [(6, 4), (5, 5)] {
        canvas.surface_mut().size = Size::new(width, height);
        assert_eq!(canvas.surface_resized().unwrap(), RunOutcome::Suspended);

        let mut encoded = std::io::Cursor::new(Vec::new());
        canvas
            .write_frame(&mut encoded, image::ImageFormat::Png)
            .unwrap();
        let decoded = image::load_from_memory(encoded.get_ref()).unwrap().to_rgba8();
        assert_eq!(decoded.dimensions(), (4, 6));
        for (pixel, colour) in decoded.pixels().zip(&published) {
            assert_eq!(pixel.0, [colour.r, colour.g, colour.b, colour.a]);
        }
    }

    canvas.set_enabled(true).unwrap();
    let (pixels, size) = canvas.surface().frames.last().unwrap();
    assert_eq!(*size, Size::new(5, 5));
    assert_eq!(pixels.len(), 25);
}

#[test_log::test]
fn release_drops_buffers_until_the_next_run() {
    let mut pipeline = RenderPipeline::new(
        Viewport::new(Point::new(1.0, 1.0), 1.0, Size::new(3, 3)).unwrap(),
    );
    pipeline.set_colour_map(Box::new(Greys::new()));
    pipeline.set_worker(Box::new(Constant::new(4, 2)));
    pipeline.apply_change(Trigger::All).unwrap();
    assert!(pipeline.pixels().is_some());

    pipeline.release();
    assert!(pipeline.pixels().is_none());
    assert!(pipeline.get_values(Point::new(1.0, 1.0)).is_none());

    let outcome = pipeline.apply_change(Trigger::Transformation).unwrap();
    assert!(outcome.stats().unwrap().calculated);
    assert_eq!(pipeline.pixels().unwrap().len(), 9);
}

#[test_log::test]
fn completion_reports_frames_per_second() {
    let canvas = rings_canvas(4, 4, 2);
    let stats = canvas.surface().completed.last().unwrap();
    assert!(stats.frames_per_second() > 0.0);
    assert!(stats.frames_per_second().is_finite());
}

#[test_log::test]
fn written_frame_decodes_to_the_published_pixels() {
    let canvas = rings_canvas(6, 4, 3);
    let mut encoded = std::io::Cursor::new(Vec::new());
    canvas
        .write_frame(&mut encoded, image::ImageFormat::Png)
        .unwrap();

    let decoded = image::load_from_memory(encoded.get_ref()).unwrap().to_rgba8();
    assert_eq!(decoded.dimensions(), (6, 4));
    let (pixels, _) = canvas.surface().frames.last().unwrap();
    for (pixel, colour) in decoded.pixels().zip(pixels) {
        assert_eq!(pixel.0, [colour.r, colour.g, colour.b, colour.a]);
    }
}

#[test_log::test]
fn saving_before_the_first_frame_fails() {
    let canvas =
        FractalCanvas::new(RecordingSurface::new(2, 2), Point::new(1.0, 1.0), 1.0).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("frame.png");
    assert!(matches!(
        canvas.save_frame(&path),
        Err(Error::InvalidArgument(_))
    ));
    assert!(!path.exists());
}
