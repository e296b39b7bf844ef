/*!
Pixel space to complex plane mapping.

A [`Viewport`] pins a pixel-space `origin` to complex zero and multiplies
pixel distances by `scale`. Pixel rows run top to bottom while the imaginary
axis grows upwards, so the `y` term is negated:

```text
real      =  scale * (x - origin.x)
imaginary = -scale * (y - origin.y)
```

Buffers are row-major, `index = y * width + x`. Every index to pixel
conversion goes through [`Viewport::index_to_pixel`] so the calculation pass
and point queries always agree on which slot belongs to which pixel.
*/

use crate::{
    error::{Error, Result},
    pixel::{Complex, Point},
    screen,
};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    origin: Point,
    scale: f64,
    size: screen::Size,
}

impl Viewport {
    pub fn new(origin: Point, scale: f64, size: screen::Size) -> Result<Self> {
        validate_origin(origin)?;
        validate_scale(scale)?;
        Ok(Self {
            origin,
            scale,
            size,
        })
    }

    pub fn origin(&self) -> Point {
        self.origin
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn size(&self) -> screen::Size {
        self.size
    }

    pub fn set_origin(&mut self, origin: Point) -> Result<()> {
        validate_origin(origin)?;
        self.origin = origin;
        Ok(())
    }

    pub fn set_scale(&mut self, scale: f64) -> Result<()> {
        validate_scale(scale)?;
        self.scale = scale;
        Ok(())
    }

    pub fn set_size(&mut self, size: screen::Size) {
        self.size = size;
    }

    pub fn pixel_count(&self) -> usize {
        self.size.pixel_count()
    }

    pub fn to_complex(&self, x: f64, y: f64) -> Complex {
        Complex {
            real: self.scale * (x - self.origin.x),
            imaginary: -self.scale * (y - self.origin.y),
        }
    }

    /// Inverse of [`Viewport::to_complex`]. Returns a fractional pixel position.
    pub fn to_point(&self, complex: Complex) -> Point {
        Point {
            x: complex.real / self.scale + self.origin.x,
            y: -complex.imaginary / self.scale + self.origin.y,
        }
    }

    /// Buffer index of the pixel containing `point`, or `None` outside the grid.
    pub fn to_index(&self, point: Point) -> Option<usize> {
        let x = point.x.floor();
        let y = point.y.floor();
        if x < 0.0 || y < 0.0 || x >= self.size.width as f64 || y >= self.size.height as f64 {
            return None;
        }
        Some(y as usize * self.size.width as usize + x as usize)
    }

    pub fn index_to_pixel(&self, index: usize) -> (u32, u32) {
        debug_assert!(self.size.width > 0);
        let width = self.size.width as usize;
        let y = index / width;
        let x = index - y * width;
        (x as u32, y as u32)
    }

    pub fn index_to_point(&self, index: usize) -> Point {
        let (x, y) = self.index_to_pixel(index);
        Point::new(x as f64, y as f64)
    }

    pub fn index_to_complex(&self, index: usize) -> Complex {
        let (x, y) = self.index_to_pixel(index);
        self.to_complex(x as f64, y as f64)
    }

    /// Scale by `factor` while keeping the complex point under `anchor` fixed.
    pub fn zoom_at(&mut self, anchor: Point, factor: f64) -> Result<()> {
        if !factor.is_finite() || factor <= 0.0 {
            return Err(Error::invalid_argument(format!(
                "zoom factor must be positive, got {}",
                factor
            )));
        }
        let scale = self.scale / factor;
        validate_scale(scale)?;

        let fixed = self.to_complex(anchor.x, anchor.y);
        let origin = Point {
            x: anchor.x - fixed.real / scale,
            y: anchor.y + fixed.imaginary / scale,
        };
        validate_origin(origin)?;
        self.scale = scale;
        self.origin = origin;
        Ok(())
    }

    pub fn pan_by(&mut self, dx: f64, dy: f64) -> Result<()> {
        self.set_origin(Point::new(self.origin.x + dx, self.origin.y + dy))
    }
}

fn validate_origin(origin: Point) -> Result<()> {
    if !origin.x.is_finite() || !origin.y.is_finite() {
        return Err(Error::invalid_argument(format!(
            "origin must be finite, got ({}, {})",
            origin.x, origin.y
        )));
    }
    Ok(())
}

fn validate_scale(scale: f64) -> Result<()> {
    if scale == 0.0 || !scale.is_finite() {
        return Err(Error::invalid_argument(format!(
            "scale must be non-zero and finite, got {}",
            scale
        )));
    }
    Ok(())
}
