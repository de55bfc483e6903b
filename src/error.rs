use thiserror::Error;

/// Library error type for filter operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The filter identifier is not known, or not valid for the requested operation.
    #[error("unsupported filter: {0}")]
    UnsupportedFilter(String),

    /// The pixel data does not match the declared image dimensions.
    #[error("pixel data length {len} does not match {width}x{height}")]
    DimensionMismatch { width: u32, height: u32, len: usize },

    /// A filter parameter is outside its accepted range.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Underlying IO error.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Image decode/encode error.
    #[error(transparent)]
    Image(#[from] image::ImageError),
}
