use std::path::Path;

use anyhow::{Context, Result, ensure};
use serde::Deserialize;

use crate::processing::blur::{DEFAULT_BLUR_RADIUS, validate_radius};
use crate::processing::ripple::validate_parameters;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BlurBackend {
    /// Portable scalar passes.
    Cpu,
    /// aarch64 SIMD passes; falls back to `cpu` with a warning when unavailable.
    Neon,
    /// `neon` when the CPU supports it, otherwise `cpu`.
    #[default]
    Auto,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct BlurOptions {
    /// Kernel support in pixels on each side of the center tap.
    pub radius: f32,
    pub backend: BlurBackend,
}

impl Default for BlurOptions {
    fn default() -> Self {
        Self {
            radius: DEFAULT_BLUR_RADIUS,
            backend: BlurBackend::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RippleStyle {
    /// Move the sample point along the radius.
    #[default]
    Displace,
    /// Keep geometry and scale brightness by the wave instead.
    Shade,
}

/// Controls for the ripple filter. The default places the wave origin at the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct RippleParameters {
    pub center_x: i32,
    pub center_y: i32,
    /// Pixels closer than this to the center are left untouched.
    pub min_radius: f32,
    /// Peak wave strength, 0.01 to 1.0.
    pub amplitude: f32,
    /// Decay rate with distance, 0.0001 to 0.01. Larger values flatten the ripples sooner.
    pub damping: f32,
    /// Sine frequency, 0.01 to 0.5. Larger values show more ripples.
    pub frequency: f32,
    pub style: RippleStyle,
}

impl Default for RippleParameters {
    fn default() -> Self {
        Self {
            center_x: 0,
            center_y: 0,
            min_radius: 0.0,
            amplitude: 0.75,
            damping: 0.002,
            frequency: 0.075,
            style: RippleStyle::default(),
        }
    }
}

/// Parameters the engine uses for filters that take more than a source image.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct FilterSettings {
    pub blur: BlurOptions,
    pub ripple: RippleParameters,
}

impl FilterSettings {
    pub fn validate(&self) -> Result<()> {
        validate_radius(self.blur.radius).context("invalid blur options")?;
        validate_parameters(&self.ripple).context("invalid ripple options")?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct ProcessorOptions {
    /// Capacity of the command channel feeding the processor task.
    pub command_queue: usize,
    /// Capacity of the channel delivering finished images.
    pub event_queue: usize,
}

impl Default for ProcessorOptions {
    fn default() -> Self {
        Self {
            command_queue: 8,
            event_queue: 8,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Configuration {
    /// Parameters for blur and ripple.
    pub filters: FilterSettings,
    /// Channel sizing for the background processor.
    pub processor: ProcessorOptions,
}

impl Configuration {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let s = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&s)?)
    }

    /// Validate runtime invariants that cannot be expressed via serde defaults alone.
    pub fn validated(self) -> Result<Self> {
        ensure!(
            self.processor.command_queue > 0,
            "processor.command-queue must be greater than zero"
        );
        ensure!(
            self.processor.event_queue > 0,
            "processor.event-queue must be greater than zero"
        );
        self.filters.validate()?;
        Ok(self)
    }
}
