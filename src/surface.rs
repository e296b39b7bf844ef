use crate::{
    colour::Colour,
    error::Error,
    pipeline::{RunStats, Trigger},
    screen,
};

/// Something finished frames can be shown on.
///
/// The surface reports its pixel dimensions; an empty size means it isn't
/// ready and no buffers get allocated. Every `run_started` is followed by
/// exactly one of `run_completed` or `run_failed`; they exist for
/// instrumentation.
pub trait HostSurface {
    fn size(&self) -> screen::Size;

    fn publish(&mut self, pixels: &[Colour], size: screen::Size);

    fn run_started(&mut self, _trigger: Trigger) {}

    fn run_completed(&mut self, _stats: &RunStats) {}

    /// The run stopped with `error` and published nothing.
    fn run_failed(&mut self, _trigger: Trigger, _error: &Error) {}
}
