use crate::{
    buffer,
    colour::{self, Colour, ColourIndex},
    error::Result,
    screen,
};

/// The value buffer and a double-buffered pixel buffer for one pixel count.
/// All three have the same length and are replaced together.
///
/// The colour pass writes into `scratch`; only a pass that succeeds is
/// swapped in as the visible frame, so a failed run leaves the previous
/// frame intact.
pub struct FrameBuffers {
    pub values: buffer::Buffer<u32>,
    pixels: buffer::Buffer<Colour>,
    scratch: buffer::Buffer<Colour>,
    /// Dimensions `pixels` was last coloured for.
    coloured: Option<screen::Size>,
}

impl FrameBuffers {
    pub fn allocate(size: screen::Size) -> Self {
        let pixel_count = size.pixel_count();
        Self {
            values: buffer::Builder::new(pixel_count)
                .with_label("values")
                .create(),
            pixels: buffer::Builder::new(pixel_count)
                .with_label("pixels")
                .create(),
            scratch: buffer::Builder::new(pixel_count)
                .with_label("pixels-scratch")
                .create(),
            coloured: None,
        }
    }

    pub fn pixel_count(&self) -> usize {
        debug_assert_eq!(self.values.len(), self.pixels.len());
        self.values.len()
    }

    /// Colour the current values and publish them as a `size` frame.
    pub fn colour(&mut self, index: &ColourIndex, size: screen::Size) -> Result<()> {
        debug_assert_eq!(size.pixel_count(), self.pixel_count());
        colour::colour_pass(&self.values, &mut self.scratch, index)?;
        std::mem::swap(&mut self.pixels, &mut self.scratch);
        self.coloured = Some(size);
        Ok(())
    }

    /// The last successfully coloured frame and its dimensions.
    pub fn frame(&self) -> Option<(&[Colour], screen::Size)> {
        self.coloured.map(|size| (&*self.pixels, size))
    }

    pub fn destroy(self) {
        self.values.destroy();
        self.pixels.destroy();
        self.scratch.destroy();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::colour::ColourMap;

    struct Ramp;

    impl ColourMap for Ramp {
        fn build_indexed_colours(&self, count: usize) -> Vec<Colour> {
            (0..count).map(|i| Colour::rgb(i as u8, 0, 0)).collect()
        }

        fn inversed(&self) -> bool {
            false
        }

        fn set_inversed(&mut self, _inversed: bool) {}
    }

    #[test]
    fn nothing_to_show_before_the_first_colouring() {
        let buffers = FrameBuffers::allocate(screen::Size::new(2, 3));
        assert_eq!(buffers.pixel_count(), 6);
        assert!(buffers.frame().is_none());
    }

    #[test]
    fn failed_colouring_keeps_the_previous_frame() {
        let size = screen::Size::new(3, 1);
        let mut index = ColourIndex::new();
        index.rebuild(4, &Ramp);

        let mut buffers = FrameBuffers::allocate(size);
        buffers.values.copy_from_slice(&[0, 1, 2]);
        buffers.colour(&index, size).unwrap();
        let good = buffers.frame().unwrap().0.to_vec();

        buffers.values.copy_from_slice(&[3, 9, 3]);
        assert!(buffers.colour(&index, size).is_err());
        let (pixels, frame_size) = buffers.frame().unwrap();
        assert_eq!(pixels, &good[..]);
        assert_eq!(frame_size, size);
    }

    #[test]
    fn frame_keeps_the_size_it_was_coloured_for() {
        let mut index = ColourIndex::new();
        index.rebuild(4, &Ramp);

        let mut buffers = FrameBuffers::allocate(screen::Size::new(2, 3));
        buffers.colour(&index, screen::Size::new(2, 3)).unwrap();
        assert_eq!(buffers.frame().unwrap().1, screen::Size::new(2, 3));

        buffers.colour(&index, screen::Size::new(3, 2)).unwrap();
        assert_eq!(buffers.frame().unwrap().1, screen::Size::new(3, 2));
    }
}
