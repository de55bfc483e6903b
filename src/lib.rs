//! RGBA8 image filters: 3x3 convolutions, separable blur, greyscale and ripple,
//! plus an async processor that keeps filtering off the caller's thread.

pub mod buffer;
pub mod config;
pub mod error;
pub mod events;
pub mod processing;
pub mod tasks {
    pub mod loader;
    pub mod processor;
}

pub use buffer::PixelBuffer;
pub use error::Error;
pub use processing::engine::{FilterEngine, FilterId};
