use crate::buffer::{PixelBuffer, Rgba8};
use crate::config::{RippleParameters, RippleStyle};
use crate::error::Error;
use crate::processing::to_channel;

pub const AMPLITUDE_RANGE: (f32, f32) = (0.01, 1.0);
pub const DAMPING_RANGE: (f32, f32) = (0.0001, 0.01);
pub const FREQUENCY_RANGE: (f32, f32) = (0.01, 0.5);

/// Radial ripple centered on `(center_x, center_y)`.
///
/// Pixels closer than `min_radius`, and the center itself, are copied
/// unchanged. Outside that disc the wave `amplitude * sin(frequency * r)`
/// decays with `exp(-damping * r)` and either displaces the sample point
/// along the radius or modulates brightness, depending on `style`.
///
/// # Errors
/// Returns [`Error::InvalidParameter`] if any parameter is outside its documented range.
pub fn apply_ripple(source: &PixelBuffer, params: &RippleParameters) -> Result<PixelBuffer, Error> {
    validate_parameters(params)?;
    if source.is_empty() {
        return Ok(source.clone());
    }
    let cx = params.center_x as f32;
    let cy = params.center_y as f32;
    let out = source.map_coords(|x, y| {
        let original = source.clamped(i64::from(x), i64::from(y));
        let dx = x as f32 - cx;
        let dy = y as f32 - cy;
        let r = (dx * dx + dy * dy).sqrt();
        if r < params.min_radius || r <= 0.0 {
            return original;
        }
        match params.style {
            RippleStyle::Displace => {
                let d = displacement(params, r);
                sample_bilinear(source, x as f32 + d * dx / r, y as f32 + d * dy / r)
            }
            RippleStyle::Shade => shade(original, params, r - params.min_radius),
        }
    });
    Ok(out)
}

pub fn validate_parameters(params: &RippleParameters) -> Result<(), Error> {
    check_range("amplitude", params.amplitude, AMPLITUDE_RANGE)?;
    check_range("damping", params.damping, DAMPING_RANGE)?;
    check_range("frequency", params.frequency, FREQUENCY_RANGE)?;
    if !params.min_radius.is_finite() || params.min_radius < 0.0 {
        return Err(Error::InvalidParameter(format!(
            "ripple min-radius must be zero or positive, got {}",
            params.min_radius
        )));
    }
    Ok(())
}

fn check_range(name: &str, value: f32, (lo, hi): (f32, f32)) -> Result<(), Error> {
    if (lo..=hi).contains(&value) {
        Ok(())
    } else {
        Err(Error::InvalidParameter(format!(
            "ripple {name} must be within [{lo}, {hi}], got {value}"
        )))
    }
}

/// Radial displacement in pixels at distance `r` from the center.
pub fn displacement(params: &RippleParameters, r: f32) -> f32 {
    params.amplitude * (params.frequency * r).sin() * (-params.damping * r).exp()
}

fn shade(pixel: Rgba8, params: &RippleParameters, shifted: f32) -> Rgba8 {
    let multiplier = params.amplitude
        * (-shifted * params.damping).exp()
        * -(shifted * params.frequency).sin()
        + 1.0;
    [
        to_channel(f32::from(pixel[0]) * multiplier),
        to_channel(f32::from(pixel[1]) * multiplier),
        to_channel(f32::from(pixel[2]) * multiplier),
        pixel[3],
    ]
}

fn sample_bilinear(source: &PixelBuffer, fx: f32, fy: f32) -> Rgba8 {
    let x0 = fx.floor();
    let y0 = fy.floor();
    let tx = fx - x0;
    let ty = fy - y0;
    let (xi, yi) = (x0 as i64, y0 as i64);
    let p00 = source.clamped(xi, yi);
    let p10 = source.clamped(xi + 1, yi);
    let p01 = source.clamped(xi, yi + 1);
    let p11 = source.clamped(xi + 1, yi + 1);
    let mut out = [0u8; 4];
    for (channel, value) in out.iter_mut().enumerate() {
        let top = lerp(f32::from(p00[channel]), f32::from(p10[channel]), tx);
        let bottom = lerp(f32::from(p01[channel]), f32::from(p11[channel]), tx);
        *value = to_channel(lerp(top, bottom, ty));
    }
    out
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}
