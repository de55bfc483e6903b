//! Owned RGBA8 pixel storage shared by every filter.

use image::RgbaImage;

use crate::error::Error;

/// One RGBA8 pixel.
pub type Rgba8 = [u8; 4];

/// An owned RGBA8 image with a checked `width * height` pixel count.
///
/// Filters borrow a source buffer and hand back a freshly allocated one;
/// nothing in this crate mutates a source in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    pixels: Vec<Rgba8>,
}

impl PixelBuffer {
    /// Allocate a buffer filled with transparent black.
    ///
    /// # Errors
    /// Returns [`Error::DimensionMismatch`] if `width * height` pixels cannot be allocated.
    pub fn new(width: u32, height: u32) -> Result<Self, Error> {
        let count = pixel_count(width, height)?;
        let mut pixels = Vec::new();
        pixels
            .try_reserve_exact(count)
            .map_err(|_| Error::DimensionMismatch {
                width,
                height,
                len: 0,
            })?;
        pixels.resize(count, [0; 4]);
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Wrap already decoded pixels.
    ///
    /// # Errors
    /// Returns [`Error::DimensionMismatch`] if `pixels.len() != width * height`.
    pub fn from_pixels(width: u32, height: u32, pixels: Vec<Rgba8>) -> Result<Self, Error> {
        let expected = pixel_count(width, height)?;
        if pixels.len() != expected {
            return Err(Error::DimensionMismatch {
                width,
                height,
                len: pixels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Build a buffer from flat `RGBARGBA...` bytes.
    ///
    /// # Errors
    /// Returns [`Error::DimensionMismatch`] when the byte count is not exactly
    /// `width * height * 4`. The reported `len` counts a trailing partial pixel as one.
    pub fn from_raw(width: u32, height: u32, raw: Vec<u8>) -> Result<Self, Error> {
        let pixels: &[Rgba8] =
            bytemuck::try_cast_slice(raw.as_slice()).map_err(|_| Error::DimensionMismatch {
                width,
                height,
                len: raw.len().div_ceil(4),
            })?;
        Self::from_pixels(width, height, pixels.to_vec())
    }

    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    #[must_use]
    pub const fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Number of pixels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    /// Row-major pixel slice.
    #[must_use]
    pub fn pixels(&self) -> &[Rgba8] {
        &self.pixels
    }

    /// Flat byte view of the pixels.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(self.pixels.as_slice())
    }

    /// Consume the buffer and return flat `RGBA` bytes.
    #[must_use]
    pub fn into_raw(self) -> Vec<u8> {
        bytemuck::cast_slice(self.pixels.as_slice()).to_vec()
    }

    /// Bounds-checked pixel access.
    #[must_use]
    pub fn get(&self, x: u32, y: u32) -> Option<Rgba8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels.get(self.index(x, y)).copied()
    }

    /// Pixel at `(x, y)` with out-of-range coordinates snapped to the nearest edge.
    ///
    /// # Panics
    /// Panics on an empty buffer; filters check `is_empty` first.
    #[must_use]
    pub(crate) fn clamped(&self, x: i64, y: i64) -> Rgba8 {
        let cx = x.clamp(0, i64::from(self.width) - 1) as u32;
        let cy = y.clamp(0, i64::from(self.height) - 1) as u32;
        self.pixels[self.index(cx, cy)]
    }

    /// Build a same-sized buffer by evaluating `f` for every coordinate in row-major order.
    pub(crate) fn map_coords<F>(&self, mut f: F) -> Self
    where
        F: FnMut(u32, u32) -> Rgba8,
    {
        let mut pixels = Vec::with_capacity(self.pixels.len());
        for y in 0..self.height {
            for x in 0..self.width {
                pixels.push(f(x, y));
            }
        }
        Self {
            width: self.width,
            height: self.height,
            pixels,
        }
    }

    /// Build a same-sized buffer by transforming each pixel independently.
    pub(crate) fn map_pixels<F>(&self, f: F) -> Self
    where
        F: FnMut(&Rgba8) -> Rgba8,
    {
        Self {
            width: self.width,
            height: self.height,
            pixels: self.pixels.iter().map(f).collect(),
        }
    }

    fn index(&self, x: u32, y: u32) -> usize {
        (y as usize) * (self.width as usize) + (x as usize)
    }
}

impl From<RgbaImage> for PixelBuffer {
    fn from(image: RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        let raw = image.into_raw();
        Self {
            width,
            height,
            pixels: bytemuck::cast_slice(raw.as_slice()).to_vec(),
        }
    }
}

impl TryFrom<PixelBuffer> for RgbaImage {
    type Error = Error;

    fn try_from(buffer: PixelBuffer) -> Result<Self, Self::Error> {
        let (width, height) = buffer.dimensions();
        let len = buffer.len();
        RgbaImage::from_raw(width, height, buffer.into_raw()).ok_or(Error::DimensionMismatch {
            width,
            height,
            len,
        })
    }
}

/// Pixel count for `width x height`, rejecting sizes whose byte length cannot be addressed.
fn pixel_count(width: u32, height: u32) -> Result<usize, Error> {
    (width as usize)
        .checked_mul(height as usize)
        .filter(|count| {
            count
                .checked_mul(size_of::<Rgba8>())
                .is_some_and(|bytes| bytes <= isize::MAX as usize)
        })
        .ok_or(Error::DimensionMismatch {
            width,
            height,
            len: 0,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_mismatched_pixel_count() {
        let err = PixelBuffer::from_pixels(2, 2, vec![[0; 4]; 3]).unwrap_err();
        assert!(matches!(
            err,
            Error::DimensionMismatch {
                width: 2,
                height: 2,
                len: 3
            }
        ));
    }

    #[test]
    fn oversized_allocation_is_an_error() {
        let err = PixelBuffer::new(u32::MAX, u32::MAX).unwrap_err();
        assert!(matches!(
            err,
            Error::DimensionMismatch {
                width: u32::MAX,
                height: u32::MAX,
                len: 0
            }
        ));
        assert_eq!(PixelBuffer::new(3, 2).unwrap().len(), 6);
        assert!(PixelBuffer::new(0, 5).unwrap().is_empty());
    }

    #[test]
    fn rejects_partial_raw_pixel() {
        let err = PixelBuffer::from_raw(1, 1, vec![1, 2, 3]).unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch { len: 1, .. }));
        assert!(PixelBuffer::from_raw(1, 2, vec![0; 4]).is_err());
    }

    #[test]
    fn raw_bytes_are_row_major_rgba() {
        let raw = vec![1, 2, 3, 4, 5, 6, 7, 8];
        let buffer = PixelBuffer::from_raw(2, 1, raw.clone()).unwrap();
        assert_eq!(buffer.get(1, 0), Some([5, 6, 7, 8]));
        assert_eq!(buffer.get(2, 0), None);
        assert_eq!(buffer.as_bytes(), raw.as_slice());
        assert_eq!(buffer.into_raw(), raw);
    }

    #[test]
    fn clamped_snaps_to_nearest_edge() {
        let buffer =
            PixelBuffer::from_pixels(2, 2, vec![[1; 4], [2; 4], [3; 4], [4; 4]]).unwrap();
        assert_eq!(buffer.clamped(-5, -5), [1; 4]);
        assert_eq!(buffer.clamped(9, 0), [2; 4]);
        assert_eq!(buffer.clamped(0, 9), [3; 4]);
        assert_eq!(buffer.clamped(7, 7), [4; 4]);
    }

    #[test]
    fn converts_through_rgba_image() {
        let image = RgbaImage::from_raw(1, 2, vec![9, 8, 7, 6, 5, 4, 3, 2]).unwrap();
        let buffer = PixelBuffer::from(image.clone());
        assert_eq!(buffer.dimensions(), (1, 2));
        let back = RgbaImage::try_from(buffer).unwrap();
        assert_eq!(back, image);
    }
}
