//! Click session: one loaded raster, many clicks.
//!
//! Each click runs pick -> flood fill -> contour tracing -> optional
//! smoothing -> georeferencing, and returns a fresh [`Extraction`].
//! The session itself never changes after construction.

use geo::Area;
use web_time::Instant;

use crate::contour::{ContourTracer, longest_contour};
use crate::diagnostics::{ClickDiagnostics, StageDiagnostics, StageMetrics};
use crate::flood::{self, Connectivity};
use crate::georef::GeoTransform;
use crate::raster::Raster;
use crate::smooth::savgol_smooth;
use crate::types::{ExtractConfig, PipelineError, PixelIndex, Polyline};

/// The result of a single successful click.
#[derive(Debug, Clone)]
pub struct Extraction {
    /// Pixel the region was grown from.
    pub seed: PixelIndex,
    /// Sample value at the seed.
    pub seed_value: f64,
    /// Pixels in the flood-filled region.
    pub region_pixels: u64,
    /// Contours found before the longest was kept.
    pub contour_count: usize,
    /// Kept contour in pixel space, smoothed when [`smoothed`](Self::smoothed).
    pub contour: Polyline,
    /// Whether smoothing was applied.
    pub smoothed: bool,
    /// The contour in geographic coordinates.
    pub polygon: geo::Polygon<f64>,
    /// Per-stage timing and counts.
    pub diagnostics: ClickDiagnostics,
}

/// Interactive digitizing state: the raster and the extraction settings.
#[derive(Debug, Clone)]
pub struct ClickSession {
    raster: Raster,
    config: ExtractConfig,
}

impl ClickSession {
    /// Start a session over `raster`.
    ///
    /// # Errors
    ///
    /// Returns the error from [`ExtractConfig::validate`] if the
    /// configuration can never work.
    pub fn new(raster: Raster, config: ExtractConfig) -> Result<Self, PipelineError> {
        config.validate()?;
        Ok(Self { raster, config })
    }

    /// The raster being digitized.
    #[must_use]
    pub const fn raster(&self) -> &Raster {
        &self.raster
    }

    /// The extraction settings.
    #[must_use]
    pub const fn config(&self) -> &ExtractConfig {
        &self.config
    }

    /// Map a geographic click to the pixel containing it.
    ///
    /// The fractional pixel position is truncated toward zero.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::OutsideExtent`] if the click is not
    /// finite or lies outside the raster's extent, and
    /// [`PipelineError::OutOfBounds`] if it lands on the extent's far
    /// edge, one past the last row or column.
    pub fn pick(&self, x: f64, y: f64) -> Result<PixelIndex, PipelineError> {
        if !x.is_finite() || !y.is_finite() || !self.raster.extent().contains(x, y) {
            return Err(PipelineError::OutsideExtent { x, y });
        }

        let p = self.raster.transform().geo_to_pixel(x, y);
        let (col, row) = (to_i64(p.x.trunc()), to_i64(p.y.trunc()));
        let dims = self.raster.dimensions();
        match (u32::try_from(row), u32::try_from(col)) {
            (Ok(r), Ok(c)) if r < dims.height && c < dims.width => Ok(PixelIndex::new(r, c)),
            _ => Err(PipelineError::OutOfBounds { row, col }),
        }
    }

    /// Handle one click end to end.
    ///
    /// # Errors
    ///
    /// Recoverable: [`PipelineError::OutsideExtent`],
    /// [`PipelineError::OutOfBounds`], [`PipelineError::NoContour`]
    /// when the region has no boundary inside the grid (e.g. it fills
    /// the whole raster), and [`PipelineError::DegenerateContour`] when
    /// the longest boundary is too short to enclose anything.
    ///
    /// Fatal: [`PipelineError::InvalidSmoothingWindow`] when the
    /// configured window is longer than the traced contour.
    pub fn click(&self, x: f64, y: f64) -> Result<Extraction, PipelineError> {
        let total_start = Instant::now();
        let grid = self.raster.grid();

        // 1. Pick.
        let start = Instant::now();
        let seed = self.pick(x, y)?;
        let seed_value = grid
            .get(seed.row, seed.col)
            .ok_or(PipelineError::OutOfBounds {
                row: i64::from(seed.row),
                col: i64::from(seed.col),
            })?;
        let pick = StageDiagnostics {
            duration: start.elapsed(),
            metrics: StageMetrics::Pick {
                x,
                y,
                row: seed.row,
                col: seed.col,
                seed_value,
            },
        };

        // 2. Flood fill.
        let start = Instant::now();
        let mask = flood::flood_fill(
            grid,
            seed,
            self.config.tolerance,
            self.config.connectivity,
        )?;
        let region_pixels = flood::region_size(&mask);
        let flood_fill = StageDiagnostics {
            duration: start.elapsed(),
            metrics: StageMetrics::FloodFill {
                tolerance: self.config.tolerance,
                connectivity: match self.config.connectivity {
                    Connectivity::Four => 4,
                    Connectivity::Eight => 8,
                },
                region_pixels,
                total_pixels: u64::from(grid.width()) * u64::from(grid.height()),
            },
        };

        // 3. Contour tracing, keeping the longest.
        let start = Instant::now();
        let contours = self.config.contour_tracer.trace(&mask);
        let contour_count = contours.len();
        let contour = longest_contour(contours).ok_or(PipelineError::NoContour)?;
        if contour.vertex_count() < ExtractConfig::MIN_POLYGON_VERTICES {
            return Err(PipelineError::DegenerateContour {
                points: contour.vertex_count(),
            });
        }
        log::debug!(
            "region of {region_pixels} px traced into {contour_count} contour(s); keeping {} points",
            contour.len()
        );
        let contour_tracing = StageDiagnostics {
            duration: start.elapsed(),
            metrics: StageMetrics::ContourTracing {
                tracer: self.config.contour_tracer,
                contour_count,
                kept_points: contour.len(),
                discarded: contour_count - 1,
            },
        };

        // 4. Optional smoothing.
        let start = Instant::now();
        let (contour, smoothing) = match self.config.smoothing_window {
            Some(window) if contour.len() >= ExtractConfig::MIN_SMOOTHING_POINTS => {
                let smoothed = savgol_smooth(&contour, window)?;
                let diag = StageDiagnostics {
                    duration: start.elapsed(),
                    metrics: StageMetrics::Smoothing {
                        window,
                        points: smoothed.len(),
                    },
                };
                (smoothed, Some(diag))
            }
            Some(_) => {
                log::debug!(
                    "contour has {} points, fewer than {}; keeping it unsmoothed",
                    contour.len(),
                    ExtractConfig::MIN_SMOOTHING_POINTS
                );
                (contour, None)
            }
            None => (contour, None),
        };

        // 5. Georeference.
        let start = Instant::now();
        let polygon = contour_to_polygon(&contour, self.raster.transform());
        let georeference = StageDiagnostics {
            duration: start.elapsed(),
            metrics: StageMetrics::Georeference {
                vertex_count: polygon.exterior().0.len(),
                area: polygon.unsigned_area(),
            },
        };

        let smoothed = smoothing.is_some();
        Ok(Extraction {
            seed,
            seed_value,
            region_pixels,
            contour_count,
            contour,
            smoothed,
            polygon,
            diagnostics: ClickDiagnostics {
                pick,
                flood_fill,
                contour_tracing,
                smoothing,
                georeference,
                total_duration: total_start.elapsed(),
            },
        })
    }
}

/// Convert a pixel-space contour to a geographic polygon.
///
/// The exterior ring is closed if the contour is not.
#[must_use]
pub fn contour_to_polygon(contour: &Polyline, transform: &GeoTransform) -> geo::Polygon<f64> {
    let coords: Vec<geo::Coord<f64>> = contour
        .points()
        .iter()
        .map(|&p| transform.pixel_to_geo(p))
        .collect();
    geo::Polygon::new(geo::LineString::new(coords), vec![])
}

/// Truncating, saturating float to integer conversion.
#[allow(clippy::cast_possible_truncation)]
fn to_i64(v: f64) -> i64 {
    v as i64
}
