//! clickshape-pipeline: Pure click-to-polygon extraction (sans-IO).
//!
//! Turns a click on a georeferenced raster into a polygon through:
//! pick -> flood fill -> contour tracing -> optional smoothing ->
//! georeferencing.
//!
//! This crate has **no I/O dependencies** -- it operates on in-memory
//! grids and returns structured data. Raster decoding and shapefile
//! writing live in `clickshape-io`.

pub mod contour;
pub mod diagnostics;
pub mod flood;
pub mod georef;
pub mod raster;
pub mod session;
pub mod smooth;
pub mod types;

pub use contour::{ContourTracer, ContourTracerKind};
pub use diagnostics::ClickDiagnostics;
pub use flood::Connectivity;
pub use georef::{Extent, GeoTransform};
pub use raster::{Grid, Raster};
pub use session::{ClickSession, Extraction};
pub use types::{Dimensions, ExtractConfig, PipelineError, PixelIndex, Point, Polyline};
