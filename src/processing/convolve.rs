use crate::buffer::PixelBuffer;
use crate::processing::kernels::Kernel3x3;
use crate::processing::to_channel;

/// Convolve RGB with a 3x3 kernel; alpha is copied from the source pixel.
///
/// Neighbours outside the image repeat the nearest edge pixel, so the output
/// keeps the source dimensions. Weighted sums are not normalized, only clamped.
pub fn apply_convolution(source: &PixelBuffer, kernel: &Kernel3x3) -> PixelBuffer {
    if source.is_empty() {
        return source.clone();
    }
    source.map_coords(|x, y| {
        let (x, y) = (i64::from(x), i64::from(y));
        let mut acc = [0.0f32; 3];
        for dy in -1..=1 {
            for dx in -1..=1 {
                let weight = kernel.weight(dx, dy);
                if weight == 0.0 {
                    continue;
                }
                let sample = source.clamped(x + i64::from(dx), y + i64::from(dy));
                for (channel, value) in acc.iter_mut().enumerate() {
                    *value += weight * f32::from(sample[channel]);
                }
            }
        }
        let alpha = source.clamped(x, y)[3];
        [to_channel(acc[0]), to_channel(acc[1]), to_channel(acc[2]), alpha]
    })
}
