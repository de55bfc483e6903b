use tracing::warn;

use crate::buffer::PixelBuffer;
use crate::config::BlurBackend;
use crate::error::Error;
use crate::processing::to_channel;

pub const DEFAULT_BLUR_RADIUS: f32 = 25.0;
/// Largest accepted blur radius in pixels.
pub const MAX_BLUR_RADIUS: f32 = 4096.0;

/// Separable Gaussian blur over all four channels.
///
/// `radius` is the kernel support in pixels on each side; the Gaussian uses
/// `sigma = radius / 3`, so a larger radius always widens the blur. Alpha is
/// blurred with the same weights as colour.
///
/// # Errors
/// Returns [`Error::InvalidParameter`] unless `radius` is positive and at most
/// [`MAX_BLUR_RADIUS`].
pub fn apply_blur(
    source: &PixelBuffer,
    radius: f32,
    backend: BlurBackend,
) -> Result<PixelBuffer, Error> {
    validate_radius(radius)?;
    if source.is_empty() {
        return Ok(source.clone());
    }
    let sigma = radius / 3.0;
    let out = match backend {
        BlurBackend::Cpu => blur_cpu(source, sigma),
        BlurBackend::Neon => neon_blur(source, sigma).unwrap_or_else(|| {
            warn!("neon blur unavailable on this cpu, using scalar path");
            blur_cpu(source, sigma)
        }),
        BlurBackend::Auto => neon_blur(source, sigma).unwrap_or_else(|| blur_cpu(source, sigma)),
    };
    Ok(out)
}

pub fn validate_radius(radius: f32) -> Result<(), Error> {
    if radius > 0.0 && radius <= MAX_BLUR_RADIUS {
        Ok(())
    } else {
        Err(Error::InvalidParameter(format!(
            "blur radius must be within (0, {MAX_BLUR_RADIUS}], got {radius}"
        )))
    }
}

fn blur_cpu(source: &PixelBuffer, sigma: f32) -> PixelBuffer {
    let (weights, radius) = gaussian_kernel(sigma, tap_limit(source));
    if radius == 0 {
        return source.clone();
    }
    let width = source.width() as usize;
    let height = source.height() as usize;
    let mut src = rgba_to_f32(source);
    let mut tmp = vec![0.0f32; src.len()];
    blur_pass(&src, &mut tmp, width, height, radius, &weights, true);
    blur_pass(&tmp, &mut src, width, height, radius, &weights, false);
    f32_to_rgba(source, &src)
}

fn blur_pass(
    src: &[f32],
    dst: &mut [f32],
    width: usize,
    height: usize,
    radius: usize,
    weights: &[f32],
    horizontal: bool,
) {
    for y in 0..height {
        for x in 0..width {
            let mut acc = [0.0f32; 4];
            for (idx, &weight) in weights.iter().enumerate() {
                let offset = idx as isize - radius as isize;
                let base = if horizontal {
                    let sx = clamp_i(x as isize + offset, width as isize);
                    (y * width + sx) * 4
                } else {
                    let sy = clamp_i(y as isize + offset, height as isize);
                    (sy * width + x) * 4
                };
                for (channel, value) in acc.iter_mut().enumerate() {
                    *value += src[base + channel] * weight;
                }
            }
            let out = (y * width + x) * 4;
            dst[out..out + 4].copy_from_slice(&acc);
        }
    }
}

#[inline(always)]
fn clamp_i(value: isize, max: isize) -> usize {
    value.clamp(0, max.saturating_sub(1)) as usize
}

/// Offsets at or beyond this distance clamp to the same edge pixel for every row and column.
fn tap_limit(source: &PixelBuffer) -> usize {
    (source.width().max(source.height()) as usize).saturating_sub(1)
}

/// Normalized 1D Gaussian weights and the support radius they span.
///
/// The support is `ceil(3 * sigma)` taps but never more than `limit`. Weight
/// for taps past `limit` is folded into the two outermost taps, which is exact
/// under clamp-to-edge sampling when `limit` comes from [`tap_limit`].
fn gaussian_kernel(sigma: f32, limit: usize) -> (Vec<f32>, usize) {
    let sigma = sigma.max(0.01);
    let support = (sigma * 3.0).ceil() as usize;
    let radius = support.min(limit);
    let denom = 2.0 * sigma * sigma;
    let gaussian = |i: usize| {
        let x = i as f32;
        (-x * x / denom).exp()
    };

    let mut weights = vec![0.0f32; radius * 2 + 1];
    for i in 0..=radius {
        let w = gaussian(i);
        weights[radius - i] = w;
        weights[radius + i] = w;
    }
    let tail: f32 = (radius + 1..=support).map(gaussian).sum();
    weights[0] += tail;
    weights[radius * 2] += tail;

    let sum: f32 = weights.iter().sum();
    if sum > 0.0 {
        for w in &mut weights {
            *w /= sum;
        }
    }
    (weights, radius)
}

fn rgba_to_f32(source: &PixelBuffer) -> Vec<f32> {
    source.as_bytes().iter().map(|&c| f32::from(c)).collect()
}

fn f32_to_rgba(source: &PixelBuffer, data: &[f32]) -> PixelBuffer {
    let mut index = 0;
    source.map_coords(|_, _| {
        let base = index * 4;
        index += 1;
        [
            to_channel(data[base]),
            to_channel(data[base + 1]),
            to_channel(data[base + 2]),
            to_channel(data[base + 3]),
        ]
    })
}

#[cfg(target_arch = "aarch64")]
fn neon_blur(source: &PixelBuffer, sigma: f32) -> Option<PixelBuffer> {
    if !std::arch::is_aarch64_feature_detected!("neon") {
        return None;
    }
    let (weights, radius) = gaussian_kernel(sigma, tap_limit(source));
    if radius == 0 {
        return Some(source.clone());
    }
    let width = source.width() as usize;
    let height = source.height() as usize;
    let mut src = rgba_to_f32(source);
    let mut tmp = vec![0.0f32; src.len()];
    // SAFETY: neon support was checked above and both buffers hold width * height * 4 floats.
    unsafe {
        neon::blur_pass(&src, &mut tmp, width, height, radius, &weights, true);
        neon::blur_pass(&tmp, &mut src, width, height, radius, &weights, false);
    }
    Some(f32_to_rgba(source, &src))
}

#[cfg(not(target_arch = "aarch64"))]
fn neon_blur(_source: &PixelBuffer, _sigma: f32) -> Option<PixelBuffer> {
    None
}

#[cfg(target_arch = "aarch64")]
mod neon {
    use std::arch::aarch64::*;

    use super::clamp_i;

    #[target_feature(enable = "neon")]
    pub unsafe fn blur_pass(
        src: &[f32],
        dst: &mut [f32],
        width: usize,
        height: usize,
        radius: usize,
        weights: &[f32],
        horizontal: bool,
    ) {
        let src_ptr = src.as_ptr();
        let dst_ptr = dst.as_mut_ptr();
        let kernel = &weights[..(2 * radius + 1)];
        for y in 0..height {
            for x in 0..width {
                let mut acc = vdupq_n_f32(0.0);
                for (idx, &weight) in kernel.iter().enumerate() {
                    let offset = idx as isize - radius as isize;
                    let sample_index = if horizontal {
                        let sx = clamp_i((x as isize) + offset, width as isize);
                        ((y * width) + sx) * 4
                    } else {
                        let sy = clamp_i((y as isize) + offset, height as isize);
                        ((sy * width) + x) * 4
                    };
                    let pix = unsafe { vld1q_f32(src_ptr.add(sample_index)) };
                    acc = vmlaq_f32(acc, pix, vdupq_n_f32(weight));
                }
                let out_index = (y * width + x) * 4;
                unsafe {
                    vst1q_f32(dst_ptr.add(out_index), acc);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checker(size: u32) -> PixelBuffer {
        let pixels = (0..size)
            .flat_map(|y| {
                (0..size).map(move |x| if (x + y) % 2 == 0 { [255, 0, 0, 255] } else { [0, 0, 255, 255] })
            })
            .collect();
        PixelBuffer::from_pixels(size, size, pixels).unwrap()
    }

    #[test]
    fn kernel_is_normalized_and_symmetric() {
        let (weights, radius) = gaussian_kernel(25.0 / 3.0, usize::MAX);
        assert_eq!(weights.len(), radius * 2 + 1);
        let sum: f32 = weights.iter().sum();
        assert!((sum - 1.0).abs() < 1e-4);
        for i in 0..weights.len() / 2 {
            assert!((weights[i] - weights[weights.len() - 1 - i]).abs() < 1e-6);
        }
    }

    #[test]
    fn rejects_out_of_range_radius() {
        let source = checker(4);
        for radius in [0.0, -1.0, f32::NAN, f32::INFINITY, 1.0e10, MAX_BLUR_RADIUS * 2.0] {
            assert!(matches!(
                apply_blur(&source, radius, BlurBackend::Cpu),
                Err(Error::InvalidParameter(_))
            ));
        }
    }

    #[test]
    fn tiny_radius_is_identity() {
        let source = checker(6);
        let out = apply_blur(&source, 0.01, BlurBackend::Cpu).unwrap();
        assert_eq!(out, source);
    }

    #[test]
    fn uniform_image_is_unchanged() {
        let source = PixelBuffer::from_pixels(7, 5, vec![[12, 34, 56, 78]; 35]).unwrap();
        let out = apply_blur(&source, DEFAULT_BLUR_RADIUS, BlurBackend::Cpu).unwrap();
        assert_eq!(out, source);
    }

    #[test]
    fn backends_agree() {
        let source = checker(9);
        let cpu = apply_blur(&source, 3.0, BlurBackend::Cpu).unwrap();
        let auto = apply_blur(&source, 3.0, BlurBackend::Auto).unwrap();
        for (a, b) in cpu.pixels().iter().zip(auto.pixels()) {
            for channel in 0..4 {
                assert!((i16::from(a[channel]) - i16::from(b[channel])).abs() <= 1);
            }
        }
    }

    #[test]
    fn support_is_capped_by_image_extent() {
        let (weights, radius) = gaussian_kernel(MAX_BLUR_RADIUS / 3.0, 3);
        assert_eq!(radius, 3);
        assert_eq!(weights.len(), 7);
        let sum: f32 = weights.iter().sum();
        assert!((sum - 1.0).abs() < 1e-4);
        assert!(weights[0] > weights[1]);
    }

    #[test]
    fn capped_kernel_matches_full_kernel_on_small_image() {
        let pixels = (0..20u32)
            .map(|i| [(i * 12) as u8, (255 - i * 9) as u8, (i * i % 256) as u8, 200])
            .collect();
        let source = PixelBuffer::from_pixels(5, 4, pixels).unwrap();
        let radius = 60.0;
        let sigma = radius / 3.0;

        let (full, full_radius) = gaussian_kernel(sigma, usize::MAX);
        assert_eq!(full_radius, 60);
        let mut src = rgba_to_f32(&source);
        let mut tmp = vec![0.0f32; src.len()];
        blur_pass(&src, &mut tmp, 5, 4, full_radius, &full, true);
        blur_pass(&tmp, &mut src, 5, 4, full_radius, &full, false);
        let expected = f32_to_rgba(&source, &src);

        let out = apply_blur(&source, radius, BlurBackend::Cpu).unwrap();
        for (a, b) in out.pixels().iter().zip(expected.pixels()) {
            for channel in 0..4 {
                assert!((i16::from(a[channel]) - i16::from(b[channel])).abs() <= 1);
            }
        }
    }

    #[test]
    fn largest_radius_on_tiny_image_stays_bounded() {
        let source = checker(2);
        let out = apply_blur(&source, MAX_BLUR_RADIUS, BlurBackend::Cpu).unwrap();
        assert_eq!(out.dimensions(), (2, 2));
        let one_pixel = PixelBuffer::from_pixels(1, 1, vec![[9, 8, 7, 6]]).unwrap();
        assert_eq!(
            apply_blur(&one_pixel, MAX_BLUR_RADIUS, BlurBackend::Cpu).unwrap(),
            one_pixel
        );
    }
}
