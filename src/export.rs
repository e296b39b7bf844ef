//! Encoding the current frame with [`image`].

use std::{
    fs::File,
    io::{BufWriter, Seek, Write},
    path::Path,
};

use image::{DynamicImage, ImageFormat, RgbaImage};
use log::debug;

use crate::{
    colour::Colour,
    error::{Error, Result},
    screen,
};

fn supports_alpha(format: ImageFormat) -> bool {
    !matches!(format, ImageFormat::Jpeg)
}

/// Encode `pixels` as `format` into `writer`. Formats without an alpha
/// channel get the RGB part only.
pub fn write_frame<W: Write + Seek>(
    pixels: &[Colour],
    size: screen::Size,
    writer: &mut W,
    format: ImageFormat,
) -> Result<()> {
    let bytes = bytemuck::cast_slice::<Colour, u8>(pixels).to_vec();
    let image = RgbaImage::from_raw(size.width, size.height, bytes).ok_or_else(|| {
        Error::invalid_argument(format!(
            "{} pixels do not fill a {}x{} frame",
            pixels.len(),
            size.width,
            size.height
        ))
    })?;

    let image = if supports_alpha(format) {
        DynamicImage::ImageRgba8(image)
    } else {
        DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(image).to_rgb8())
    };
    image.write_to(writer, format)?;
    Ok(())
}

/// Like [`write_frame`], picking the format from the file extension.
pub fn save_frame(pixels: &[Colour], size: screen::Size, path: &Path) -> Result<()> {
    let format = ImageFormat::from_path(path)?;
    let mut writer = BufWriter::new(File::create(path)?);
    write_frame(pixels, size, &mut writer, format)?;
    writer.flush()?;
    debug!("saved {}x{} frame to {}", size.width, size.height, path.display());
    Ok(())
}
