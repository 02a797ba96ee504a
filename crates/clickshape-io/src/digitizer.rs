//! The digitizing session: load once, then persist every click.
//!
//! Each call to [`Digitizer::click`] is one IDLE -> PROCESSING -> IDLE
//! cycle. Recoverable rejections come back as
//! [`ClickOutcome::Skipped`]; anything else is an [`Error`] and should
//! end the session.

use std::path::{Path, PathBuf};

use clickshape_export::EPSG_CODE;
use clickshape_pipeline::{ClickSession, Extent, ExtractConfig, Extraction, PipelineError};

use crate::error::Error;
use crate::raster::load_raster;
use crate::sink::ShapefileSink;

/// Settings for [`Digitizer::open`].
#[derive(Debug, Clone, Default)]
pub struct DigitizerOptions {
    /// Crop the raster to this extent before digitizing.
    pub extent: Option<Extent>,
    /// Extraction settings.
    pub config: ExtractConfig,
    /// Also write a `.geojson` copy of each polygon.
    pub geojson: bool,
}

/// What happened to a click.
#[derive(Debug)]
pub enum ClickOutcome {
    /// A polygon was extracted and written to `path`.
    Saved {
        /// The `.shp` file written.
        path: PathBuf,
        /// The extraction that was written.
        extraction: Box<Extraction>,
    },
    /// The click was rejected; nothing was written.
    Skipped(PipelineError),
}

/// A raster being digitized plus where its polygons go.
#[derive(Debug, Clone)]
pub struct Digitizer {
    session: ClickSession,
    sink: ShapefileSink,
}

impl Digitizer {
    /// Pair an existing session with a sink.
    #[must_use]
    pub const fn new(session: ClickSession, sink: ShapefileSink) -> Self {
        Self { session, sink }
    }

    /// Load the raster at `raster_path` and prepare its output
    /// directory.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Raster`] if the raster cannot be loaded or
    /// cropped, [`Error::Pipeline`] for an invalid configuration, and
    /// [`Error::Sink`] if the output directory cannot be created.
    pub fn open(raster_path: &Path, options: &DigitizerOptions) -> Result<Self, Error> {
        let raster = load_raster(raster_path, options.extent.as_ref())?;
        let session = ClickSession::new(raster, options.config.clone())?;
        let sink = ShapefileSink::create(raster_path, options.geojson)?;
        Ok(Self::new(session, sink))
    }

    /// The extraction session.
    #[must_use]
    pub const fn session(&self) -> &ClickSession {
        &self.session
    }

    /// The `.shp` path every click writes to.
    #[must_use]
    pub fn output_path(&self) -> &Path {
        self.sink.path()
    }

    /// Extract a polygon at `(x, y)` and write it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Pipeline`] for non-recoverable extraction
    /// failures and [`Error::Sink`] if writing fails.
    pub fn click(&self, x: f64, y: f64) -> Result<ClickOutcome, Error> {
        log::info!("Clicked at: {x:.4}, {y:.4}");
        match self.session.click(x, y) {
            Ok(extraction) => {
                self.sink.write(&extraction)?;
                log::info!(
                    "Shapefile saved to {} (EPSG:{EPSG_CODE})",
                    self.sink.path().display()
                );
                Ok(ClickOutcome::Saved {
                    path: self.sink.path().to_path_buf(),
                    extraction: Box::new(extraction),
                })
            }
            Err(e) if e.is_recoverable() => {
                log::warn!("{e}. Try again.");
                Ok(ClickOutcome::Skipped(e))
            }
            Err(e) => Err(e.into()),
        }
    }
}
