use crate::buffer::{PixelBuffer, Rgba8};
use crate::processing::to_channel;

/// Rec. 601 luma weights for R, G and B.
pub const LUMA_WEIGHTS: [f32; 3] = [0.299, 0.587, 0.114];

pub fn luma(pixel: &Rgba8) -> u8 {
    let value = LUMA_WEIGHTS[0] * f32::from(pixel[0])
        + LUMA_WEIGHTS[1] * f32::from(pixel[1])
        + LUMA_WEIGHTS[2] * f32::from(pixel[2]);
    to_channel(value)
}

/// Replace R, G and B with the pixel's luma; alpha is untouched.
pub fn apply_greyscale(source: &PixelBuffer) -> PixelBuffer {
    source.map_pixels(|pixel| {
        let y = luma(pixel);
        [y, y, y, pixel[3]]
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primaries_map_to_weighted_luma() {
        assert_eq!(luma(&[255, 0, 0, 255]), 76);
        assert_eq!(luma(&[0, 255, 0, 255]), 150);
        assert_eq!(luma(&[0, 0, 255, 255]), 29);
        assert_eq!(luma(&[255, 255, 255, 255]), 255);
    }

    #[test]
    fn output_is_grey_with_original_alpha() {
        let source =
            PixelBuffer::from_pixels(2, 1, vec![[10, 200, 30, 40], [250, 5, 128, 0]]).unwrap();
        let out = apply_greyscale(&source);
        for (before, after) in source.pixels().iter().zip(out.pixels()) {
            assert_eq!(after[0], after[1]);
            assert_eq!(after[1], after[2]);
            assert_eq!(after[3], before[3]);
        }
    }
}
