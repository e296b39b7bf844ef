/*!
The calculation pass.

Every pixel is independent: slot `i` of the value buffer is written from the
complex coordinate of pixel `i` and nothing else, so the buffer can be split
into arbitrary chunks and handed to as many rayon workers as the pool has.

Alongside the values, the pass records the smallest and largest output it saw.
The reduction is a lock-free compare-and-retry on two atomics: read the
current bound, stop if the candidate doesn't improve it, otherwise try to swap
it in and start over if another thread got there first. The range is
diagnostic only and never feeds back into the values.
*/

use std::sync::atomic::{AtomicU32, Ordering};

use log::trace;
use rayon::prelude::{IndexedParallelIterator, IntoParallelRefMutIterator, ParallelIterator};

use crate::{transform::Viewport, worker::PointWorker};

/// Lower bound on the number of pixels a single rayon job processes.
pub const MIN_CHUNK_LEN: usize = 256;

/// Target number of jobs per CPU, so uneven pixels (in-set points cost the
/// full threshold) still balance across threads.
pub const CHUNKS_PER_THREAD: usize = 16;

pub fn chunk_len(total_work: usize) -> usize {
    let jobs = num_cpus::get() * CHUNKS_PER_THREAD;
    (total_work / jobs.max(1)).max(MIN_CHUNK_LEN)
}

/// Smallest and largest worker output observed during one pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ValueRange {
    pub min: u32,
    pub max: u32,
}

struct AtomicRange {
    min: AtomicU32,
    max: AtomicU32,
}

impl AtomicRange {
    fn new() -> Self {
        Self {
            min: AtomicU32::new(u32::MAX),
            max: AtomicU32::new(u32::MIN),
        }
    }

    fn observe(&self, value: u32) {
        update_while(&self.min, value, |candidate, current| candidate < current);
        update_while(&self.max, value, |candidate, current| candidate > current);
    }

    fn into_range(self) -> Option<ValueRange> {
        let min = self.min.into_inner();
        let max = self.max.into_inner();
        (min <= max).then(|| ValueRange { min, max })
    }
}

fn update_while(bound: &AtomicU32, candidate: u32, improves: impl Fn(u32, u32) -> bool) {
    let mut current = bound.load(Ordering::Relaxed);
    while improves(candidate, current) {
        match bound.compare_exchange_weak(current, candidate, Ordering::Relaxed, Ordering::Relaxed)
        {
            Ok(_) => break,
            Err(actual) => current = actual,
        }
    }
}

/// Fill `values` with the worker's output for every pixel of `viewport`.
///
/// Values are stored as returned; the colour pass rejects anything above the
/// threshold. Returns the observed value range, or `None` for an empty buffer.
pub fn calculation_pass(
    viewport: &Viewport,
    worker: &dyn PointWorker,
    values: &mut [u32],
) -> Option<ValueRange> {
    trace!("begin calculation_pass");

    debug_assert_eq!(values.len(), viewport.pixel_count());
    let range = AtomicRange::new();
    let min_len = chunk_len(values.len());

    values
        .par_iter_mut()
        .enumerate()
        .with_min_len(min_len)
        .for_each(|(index, value)| {
            let result = worker.evaluate(viewport.index_to_complex(index));
            *value = result;
            range.observe(result);
        });

    trace!("end calculation_pass");
    range.into_range()
}
