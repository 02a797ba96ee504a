//! clickshape-io: Filesystem edge of clickshape.
//!
//! Loads rasters (GeoTIFF or plain images), derives where output goes,
//! writes shapefiles, and ties them together with the pure extraction
//! session in [`Digitizer`].

pub mod digitizer;
pub mod error;
pub mod raster;
pub mod sink;

pub use digitizer::{ClickOutcome, Digitizer, DigitizerOptions};
pub use error::Error;
pub use raster::{RasterError, load_raster};
pub use sink::{ShapefileSink, SinkError, output_path};
