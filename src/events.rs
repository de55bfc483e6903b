use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::buffer::PixelBuffer;
use crate::processing::engine::FilterId;

/// Requests accepted by the background processor.
#[derive(Debug)]
pub enum ProcessorCommand {
    /// Decode an image file and make it the new source.
    Load(PathBuf),
    /// Replace the source with an already decoded buffer.
    SetSource(PixelBuffer),
    /// Filter the current source.
    Apply(FilterId),
}

/// Results emitted by the background processor.
#[derive(Debug, Clone)]
pub enum ProcessorEvent {
    ImageAvailable(ImageAvailable),
    Failed(ProcessorFailure),
}

#[derive(Debug, Clone)]
pub struct ImageAvailable {
    /// Sequence number of the request that produced this image.
    pub generation: u64,
    /// `FilterId::None` for freshly loaded sources.
    pub filter: FilterId,
    pub image: Arc<PixelBuffer>,
    pub elapsed: Duration,
}

#[derive(Debug, Clone)]
pub struct ProcessorFailure {
    pub generation: u64,
    /// `None` when a load failed.
    pub filter: Option<FilterId>,
    pub reason: String,
}
