use crate::error::Error;
use crate::processing::engine::FilterId;

/// A 3x3 convolution kernel in row-major order; index 4 is the center tap.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Kernel3x3 {
    pub coefficients: [f32; 9],
}

impl Kernel3x3 {
    pub const fn new(coefficients: [f32; 9]) -> Self {
        Self { coefficients }
    }

    /// Weight applied to the neighbour at offset `(dx, dy)`.
    ///
    /// # Panics
    /// Panics if either offset is outside `-1..=1`.
    #[must_use]
    pub(crate) fn weight(&self, dx: i32, dy: i32) -> f32 {
        self.coefficients[((dy + 1) * 3 + (dx + 1)) as usize]
    }

    /// Every coefficient multiplied by `factor`.
    #[must_use]
    pub fn scaled(&self, factor: f32) -> Self {
        Self::new(self.coefficients.map(|c| c * factor))
    }

    #[must_use]
    pub fn sum(&self) -> f32 {
        self.coefficients.iter().sum()
    }
}

const SHARPEN: Kernel3x3 = Kernel3x3::new([
    0.0, -1.0, 0.0, //
    -1.0, 5.0, -1.0, //
    0.0, -1.0, 0.0,
]);

const LIGHTEN: Kernel3x3 = Kernel3x3::new([
    0.0, 0.0, 0.0, //
    0.0, 1.5, 0.0, //
    0.0, 0.0, 0.0,
]);

const DARKEN: Kernel3x3 = Kernel3x3::new([
    0.0, 0.0, 0.0, //
    0.0, 0.5, 0.0, //
    0.0, 0.0, 0.0,
]);

const EDGE: Kernel3x3 = Kernel3x3::new([
    0.0, 1.0, 0.0, //
    1.0, -4.0, 1.0, //
    0.0, 1.0, 0.0,
]);

const EMBOSS: Kernel3x3 = Kernel3x3::new([
    -2.0, -1.0, 0.0, //
    -1.0, 1.0, 1.0, //
    0.0, 1.0, 2.0,
]);

/// Fixed kernel for one of the convolution filters.
///
/// # Errors
/// Returns [`Error::UnsupportedFilter`] for filters that are not plain 3x3 convolutions.
pub fn coefficients(filter: FilterId) -> Result<Kernel3x3, Error> {
    match filter {
        FilterId::Sharpen => Ok(SHARPEN),
        FilterId::Lighten => Ok(LIGHTEN),
        FilterId::Darken => Ok(DARKEN),
        FilterId::Edge => Ok(EDGE),
        FilterId::Emboss => Ok(EMBOSS),
        FilterId::None | FilterId::Ripple | FilterId::Blur | FilterId::Greyscale => Err(
            Error::UnsupportedFilter(format!("{filter} is not a convolution filter")),
        ),
    }
}
