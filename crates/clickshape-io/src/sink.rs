//! Persistence sink: one polygon feature per click, overwritten in place.
//!
//! For a raster at `<dir>/<stem>.<ext>` everything is written under
//! `<dir>/<stem>/`: the `.shp`/`.shx`/`.dbf` triple, `.prj`, `.cpg`, and
//! optionally a `.geojson` copy.

use std::fs;
use std::path::{Path, PathBuf};

use clickshape_export::{
    CPG_ENCODING, ExportError, WGS84_PRJ, feature_record, table_builder, to_geojson,
    to_shapefile_polygon,
};
use clickshape_pipeline::Extraction;

/// Errors that can occur while writing output files.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    /// The raster path has no file name to derive the output from.
    #[error("cannot derive an output name from {}", .0.display())]
    NoFileStem(PathBuf),

    /// A file or directory could not be written.
    #[error("failed to write {}: {source}", path.display())]
    Io {
        /// Path that failed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The shapefile writer failed.
    #[error("shapefile write failed: {0}")]
    Shapefile(#[from] shapefile::Error),

    /// The polygon could not be serialized.
    #[error(transparent)]
    Export(#[from] ExportError),
}

/// Path of the shapefile for the raster at `raster_path`:
/// `<dir>/<stem>/<stem>.shp`.
///
/// Only the last extension is stripped, so `a.b.tif` maps to
/// `a.b/a.b.shp`.
///
/// # Errors
///
/// Returns [`SinkError::NoFileStem`] if the path has no file name.
pub fn output_path(raster_path: &Path) -> Result<PathBuf, SinkError> {
    let stem = raster_path
        .file_stem()
        .ok_or_else(|| SinkError::NoFileStem(raster_path.to_path_buf()))?;
    let dir = raster_path.parent().unwrap_or_else(|| Path::new("")).join(stem);
    let mut file_name = stem.to_os_string();
    file_name.push(".shp");
    Ok(dir.join(file_name))
}

/// Writes each extraction over the same set of output files.
#[derive(Debug, Clone)]
pub struct ShapefileSink {
    shp_path: PathBuf,
    write_geojson: bool,
}

impl ShapefileSink {
    /// Derive the output path from `raster_path` and create its
    /// directory if needed.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError::NoFileStem`] for paths without a file name
    /// and [`SinkError::Io`] if the directory cannot be created.
    pub fn create(raster_path: &Path, write_geojson: bool) -> Result<Self, SinkError> {
        let shp_path = output_path(raster_path)?;
        if let Some(dir) = shp_path.parent() {
            fs::create_dir_all(dir).map_err(|source| SinkError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
        }
        log::debug!("output will be written to {}", shp_path.display());
        Ok(Self {
            shp_path,
            write_geojson,
        })
    }

    /// The `.shp` path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.shp_path
    }

    /// Sibling file with the same stem and a different extension.
    #[must_use]
    pub fn sidecar(&self, extension: &str) -> PathBuf {
        self.shp_path.with_extension(extension)
    }

    /// Write `extraction` as the only feature, replacing any previous
    /// output. Without GeoJSON output, a `.geojson` left by an earlier
    /// run is deleted. Files already written are left in place if a
    /// later one fails.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError::Export`] for polygons that cannot be
    /// serialized, [`SinkError::Shapefile`] if the shapefile writer
    /// fails, and [`SinkError::Io`] for sidecar write failures.
    pub fn write(&self, extraction: &Extraction) -> Result<(), SinkError> {
        let polygon = to_shapefile_polygon(&extraction.polygon)?;
        {
            // Headers are finalized when the writer is dropped.
            let mut writer = shapefile::Writer::from_path(&self.shp_path, table_builder()?)?;
            writer.write_shape_and_record(&polygon, &feature_record(0))?;
        }

        write_text(&self.sidecar("prj"), WGS84_PRJ)?;
        write_text(&self.sidecar("cpg"), CPG_ENCODING)?;
        let geojson = self.sidecar("geojson");
        if self.write_geojson {
            write_text(&geojson, &to_geojson(extraction)?)?;
        } else {
            remove_stale(&geojson)?;
        }
        Ok(())
    }
}

/// Delete a sidecar left by an earlier run so it cannot contradict the
/// new shapefile.
fn remove_stale(path: &Path) -> Result<(), SinkError> {
    match fs::remove_file(path) {
        Ok(()) => {
            log::debug!("removed stale {}", path.display());
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(SinkError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn write_text(path: &Path, contents: &str) -> Result<(), SinkError> {
    fs::write(path, contents).map_err(|source| SinkError::Io {
        path: path.to_path_buf(),
        source,
    })
}
