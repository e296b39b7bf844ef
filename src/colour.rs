//! Colouring: palettes, the indexed colour table and the colour-mapping pass.

use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use fnv::FnvHashMap;
use log::{debug, trace};
use rayon::prelude::{
    IndexedParallelIterator, IntoParallelRefIterator, IntoParallelRefMutIterator, ParallelIterator,
};

use crate::{
    compute,
    error::{Error, Result},
};

/// [`bytemuck`]-compatible RGBA colour of a single pixel.
#[repr(C)]
#[derive(Pod, Zeroable, Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Colour {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Colour {
    pub const TRANSPARENT: Self = Colour::rgba(0, 0, 0, 0);

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::rgba(r, g, b, 255)
    }

    fn lerp(self, other: Self, t: f64) -> Self {
        let channel = |from: u8, to: u8| (from as f64 + (to as f64 - from as f64) * t).round() as u8;
        Self {
            r: channel(self.r, other.r),
            g: channel(self.g, other.g),
            b: channel(self.b, other.b),
            a: channel(self.a, other.a),
        }
    }
}

/// Source of the colours a worker's output is painted with.
pub trait ColourMap: Send + Sync {
    /// Produce exactly `count` colours, ordered by worker output.
    fn build_indexed_colours(&self, count: usize) -> Vec<Colour>;

    fn inversed(&self) -> bool;

    fn set_inversed(&mut self, inversed: bool);

    /// Colour of points that never escaped.
    fn transparent(&self) -> Colour {
        Colour::TRANSPARENT
    }
}

/// Piecewise linear gradient through evenly spaced stops.
pub struct Gradient {
    stops: Vec<Colour>,
    inversed: bool,
}

impl Gradient {
    pub fn new(stops: Vec<Colour>) -> Result<Self> {
        if stops.len() < 2 {
            return Err(Error::invalid_argument(format!(
                "a gradient needs at least two stops, got {}",
                stops.len()
            )));
        }
        Ok(Self {
            stops,
            inversed: false,
        })
    }

    fn sample(&self, t: f64) -> Colour {
        let segments = (self.stops.len() - 1) as f64;
        let position = t.clamp(0.0, 1.0) * segments;
        let segment = (position.floor() as usize).min(self.stops.len() - 2);
        self.stops[segment].lerp(self.stops[segment + 1], position - segment as f64)
    }
}

impl Default for Gradient {
    fn default() -> Self {
        Self {
            stops: vec![
                Colour::rgb(0, 7, 100),
                Colour::rgb(32, 107, 203),
                Colour::rgb(237, 255, 255),
                Colour::rgb(255, 170, 0),
                Colour::rgb(0, 2, 0),
            ],
            inversed: false,
        }
    }
}

impl ColourMap for Gradient {
    fn build_indexed_colours(&self, count: usize) -> Vec<Colour> {
        let last = count.saturating_sub(1).max(1) as f64;
        (0..count)
            .map(|index| {
                let t = index as f64 / last;
                self.sample(if self.inversed { 1.0 - t } else { t })
            })
            .collect()
    }

    fn inversed(&self) -> bool {
        self.inversed
    }

    fn set_inversed(&mut self, inversed: bool) {
        self.inversed = inversed;
    }
}

/// How many distinct tables are kept around before the cache is flushed.
const INDEX_CACHE_CAPACITY: usize = 8;

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
struct IndexKey {
    count: usize,
    inversed: bool,
}

/// The colour table indexed directly by worker output.
///
/// Building a table costs time proportional to the threshold, so tables are
/// cached per `(threshold, inversed)` until the palette itself is replaced.
/// The active table is swapped in whole, never edited in place.
pub struct ColourIndex {
    cache: FnvHashMap<IndexKey, Arc<[Colour]>>,
    colours: Option<Arc<[Colour]>>,
    threshold: u32,
    transparent: Colour,
}

impl ColourIndex {
    pub fn new() -> Self {
        Self {
            cache: FnvHashMap::default(),
            colours: None,
            threshold: 0,
            transparent: Colour::TRANSPARENT,
        }
    }

    /// Forget every cached table. Call when the colour map is replaced.
    pub fn invalidate(&mut self) {
        self.cache.clear();
        self.colours = None;
    }

    pub fn rebuild(&mut self, threshold: u32, colour_map: &dyn ColourMap) {
        let key = IndexKey {
            count: threshold as usize + 1,
            inversed: colour_map.inversed(),
        };

        let colours = match self.cache.get(&key) {
            Some(colours) => colours.clone(),
            None => {
                debug!(
                    "building colour index for threshold {} (inversed: {})",
                    threshold, key.inversed
                );
                let colours: Arc<[Colour]> = colour_map.build_indexed_colours(key.count).into();
                debug_assert_eq!(colours.len(), key.count);
                if self.cache.len() >= INDEX_CACHE_CAPACITY {
                    self.cache.clear();
                }
                self.cache.insert(key, colours.clone());
                colours
            }
        };

        self.colours = Some(colours);
        self.threshold = threshold;
        self.transparent = colour_map.transparent();
    }

    pub fn is_built(&self) -> bool {
        self.colours.is_some()
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    pub fn colours(&self) -> Option<&[Colour]> {
        self.colours.as_deref()
    }

    fn lookup(&self, colours: &[Colour], value: u32) -> Option<Colour> {
        if value == self.threshold {
            Some(self.transparent)
        } else if value < self.threshold {
            colours.get(value as usize).copied()
        } else {
            None
        }
    }
}

impl Default for ColourIndex {
    fn default() -> Self {
        Self::new()
    }
}

/// Paint every pixel from its value. Values equal to the threshold become
/// transparent; anything above it is a worker contract violation.
///
/// On error `pixels` is partially written and must not be shown.
pub fn colour_pass(values: &[u32], pixels: &mut [Colour], index: &ColourIndex) -> Result<()> {
    trace!("begin colour_pass");

    if values.len() != pixels.len() {
        return Err(Error::invalid_argument(format!(
            "{} values cannot colour {} pixels",
            values.len(),
            pixels.len()
        )));
    }
    let colours = index
        .colours()
        .ok_or_else(|| Error::invalid_argument("colour index has not been built"))?;
    let threshold = index.threshold();
    let min_len = compute::chunk_len(values.len());

    pixels
        .par_iter_mut()
        .zip(values.par_iter())
        .enumerate()
        .with_min_len(min_len)
        .try_for_each(|(i, (pixel, &value))| match index.lookup(colours, value) {
            Some(colour) => {
                *pixel = colour;
                Ok(())
            }
            None => Err(Error::WorkerContract {
                index: i,
                value,
                threshold,
            }),
        })?;

    trace!("end colour_pass");
    Ok(())
}
