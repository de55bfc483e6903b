use std::path::Path;

use image::ExtendedColorType;
use tracing::debug;

use crate::buffer::PixelBuffer;
use crate::error::Error;

/// Decode any supported image file to RGBA8. No resizing is applied.
pub fn decode_rgba8(path: &Path) -> Result<PixelBuffer, Error> {
    let img = image::ImageReader::open(path)?
        .with_guessed_format()? // sniff based on content/extension
        .decode()?;
    let rgba8 = img.to_rgba8();
    debug!(
        width = rgba8.width(),
        height = rgba8.height(),
        "decoded {}",
        path.display()
    );
    Ok(PixelBuffer::from(rgba8))
}

/// Encode `buffer` to `path`; the format follows the file extension.
pub fn save_rgba8(path: &Path, buffer: &PixelBuffer) -> Result<(), Error> {
    image::save_buffer(
        path,
        buffer.as_bytes(),
        buffer.width(),
        buffer.height(),
        ExtendedColorType::Rgba8,
    )?;
    debug!("wrote {}", path.display());
    Ok(())
}
