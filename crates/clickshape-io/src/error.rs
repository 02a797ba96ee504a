//! Crate-level error type.

use clickshape_pipeline::PipelineError;

use crate::raster::RasterError;
use crate::sink::SinkError;

/// Anything that can end a digitizing session.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The raster could not be loaded.
    #[error(transparent)]
    Raster(#[from] RasterError),

    /// Output could not be written.
    #[error(transparent)]
    Sink(#[from] SinkError),

    /// Extraction failed in a way that cannot be retried with another
    /// click.
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}
