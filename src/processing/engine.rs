use std::fmt;
use std::str::FromStr;
use std::time::Instant;

use serde::de::{self, Deserializer};
use serde::Deserialize;
use tracing::debug;

use crate::buffer::PixelBuffer;
use crate::config::FilterSettings;
use crate::error::Error;
use crate::processing::blur::apply_blur;
use crate::processing::convolve::apply_convolution;
use crate::processing::greyscale::apply_greyscale;
use crate::processing::kernels::coefficients;
use crate::processing::ripple::apply_ripple;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FilterId {
    None,
    Ripple,
    Blur,
    Greyscale,
    Sharpen,
    Lighten,
    Darken,
    Edge,
    Emboss,
}

impl FilterId {
    /// Every filter, in legacy code order.
    pub const ALL: &'static [Self] = &[
        Self::None,
        Self::Ripple,
        Self::Blur,
        Self::Greyscale,
        Self::Sharpen,
        Self::Lighten,
        Self::Darken,
        Self::Edge,
        Self::Emboss,
    ];
    const NAMES: &'static [&'static str] = &[
        "none",
        "ripple",
        "blur",
        "greyscale",
        "sharpen",
        "lighten",
        "darken",
        "edge",
        "emboss",
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Ripple => "ripple",
            Self::Blur => "blur",
            Self::Greyscale => "greyscale",
            Self::Sharpen => "sharpen",
            Self::Lighten => "lighten",
            Self::Darken => "darken",
            Self::Edge => "edge",
            Self::Emboss => "emboss",
        }
    }

    /// Integer code used by older selector lists (`none` = 0 through `emboss` = 8).
    pub const fn code(self) -> i32 {
        self as i32
    }

    /// # Errors
    /// Returns [`Error::UnsupportedFilter`] for codes outside `0..=8`.
    pub fn from_code(code: i32) -> Result<Self, Error> {
        usize::try_from(code)
            .ok()
            .and_then(|idx| Self::ALL.get(idx).copied())
            .ok_or_else(|| Error::UnsupportedFilter(format!("filter code {code}")))
    }

    pub const fn is_convolution(self) -> bool {
        matches!(
            self,
            Self::Sharpen | Self::Lighten | Self::Darken | Self::Edge | Self::Emboss
        )
    }
}

impl fmt::Display for FilterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilterId {
    type Err = Error;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let name = raw.trim().to_ascii_lowercase();
        if name == "mono" {
            return Ok(Self::Greyscale);
        }
        Self::ALL
            .iter()
            .find(|kind| kind.as_str() == name)
            .copied()
            .ok_or_else(|| Error::UnsupportedFilter(raw.to_string()))
    }
}

impl<'de> Deserialize<'de> for FilterId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse()
            .map_err(|_| de::Error::unknown_variant(&raw, Self::NAMES))
    }
}

/// Dispatches a [`FilterId`] to its implementation using fixed settings.
///
/// The engine holds no mutable state, so one instance can serve any number of
/// threads at once.
#[derive(Debug, Clone, Default)]
pub struct FilterEngine {
    settings: FilterSettings,
}

impl FilterEngine {
    pub fn new(settings: FilterSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &FilterSettings {
        &self.settings
    }

    /// Run `filter` over `source`, returning a new buffer of the same size.
    ///
    /// # Errors
    /// Propagates [`Error::InvalidParameter`] from blur or ripple settings.
    pub fn apply(&self, source: &PixelBuffer, filter: FilterId) -> Result<PixelBuffer, Error> {
        let started = Instant::now();
        let out = match filter {
            FilterId::None => source.clone(),
            FilterId::Ripple => apply_ripple(source, &self.settings.ripple)?,
            FilterId::Blur => {
                apply_blur(source, self.settings.blur.radius, self.settings.blur.backend)?
            }
            FilterId::Greyscale => apply_greyscale(source),
            FilterId::Sharpen
            | FilterId::Lighten
            | FilterId::Darken
            | FilterId::Edge
            | FilterId::Emboss => apply_convolution(source, &coefficients(filter)?),
        };
        debug!(
            %filter,
            width = source.width(),
            height = source.height(),
            elapsed_ms = started.elapsed().as_secs_f64() * 1000.0,
            "applied filter"
        );
        Ok(out)
    }

    /// Like [`apply`](Self::apply) but selects the filter by legacy integer code.
    ///
    /// # Errors
    /// Returns [`Error::UnsupportedFilter`] when `code` names no filter.
    pub fn apply_code(&self, source: &PixelBuffer, code: i32) -> Result<PixelBuffer, Error> {
        self.apply(source, FilterId::from_code(code)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_round_trip_in_order() {
        for (idx, filter) in FilterId::ALL.iter().enumerate() {
            assert_eq!(filter.code(), idx as i32);
            assert_eq!(FilterId::from_code(idx as i32).unwrap(), *filter);
        }
        assert!(matches!(
            FilterId::from_code(9),
            Err(Error::UnsupportedFilter(_))
        ));
        assert!(matches!(
            FilterId::from_code(-1),
            Err(Error::UnsupportedFilter(_))
        ));
    }

    #[test]
    fn names_parse_case_insensitively() {
        for filter in FilterId::ALL {
            assert_eq!(filter.as_str().parse::<FilterId>().unwrap(), *filter);
        }
        assert_eq!("Sharpen".parse::<FilterId>().unwrap(), FilterId::Sharpen);
        assert_eq!("mono".parse::<FilterId>().unwrap(), FilterId::Greyscale);
        assert!("sepia".parse::<FilterId>().is_err());
    }

    #[test]
    fn deserializes_kebab_names() {
        let filters: Vec<FilterId> = serde_yaml::from_str("[edge, emboss, none]").unwrap();
        assert_eq!(filters, vec![FilterId::Edge, FilterId::Emboss, FilterId::None]);
        assert!(serde_yaml::from_str::<FilterId>("posterize").is_err());
    }

    #[test]
    fn convolution_ids_match_kernel_table() {
        for filter in FilterId::ALL {
            assert_eq!(filter.is_convolution(), coefficients(*filter).is_ok());
        }
    }

    #[test]
    fn unknown_code_fails_before_processing() {
        let engine = FilterEngine::default();
        let source = PixelBuffer::new(2, 2).unwrap();
        assert!(matches!(
            engine.apply_code(&source, 42),
            Err(Error::UnsupportedFilter(_))
        ));
        assert_eq!(engine.apply_code(&source, 0).unwrap(), source);
    }
}
