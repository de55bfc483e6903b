pub mod blur;
pub mod convolve;
pub mod engine;
pub mod greyscale;
pub mod kernels;
pub mod ripple;

/// Round a float channel value to the nearest representable u8.
#[inline]
pub(crate) fn to_channel(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}
