//! Shared types for the clickshape extraction pipeline.

use serde::{Deserialize, Serialize};

use crate::contour::ContourTracerKind;
use crate::flood::Connectivity;

/// Re-export `GrayImage` so downstream crates can reference region
/// masks without depending on `image` directly.
pub use image::GrayImage;

/// A 2D point in pixel space.
///
/// `x` is the column and `y` is the row, both measured from the
/// top-left of the grid and allowed to be fractional.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal position (columns from left edge).
    pub x: f64,
    /// Vertical position (rows from top edge).
    pub y: f64,
}

impl Point {
    /// Create a new point.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// An ordered sequence of points, e.g. a traced region boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polyline(Vec<Point>);

impl Polyline {
    /// Create a new polyline from a vector of points.
    #[must_use]
    pub const fn new(points: Vec<Point>) -> Self {
        Self(points)
    }

    /// Returns `true` if the polyline has no points.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the number of points in the polyline.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` when the first and last points coincide.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        match (self.0.first(), self.0.last()) {
            (Some(a), Some(b)) => self.0.len() > 2 && a == b,
            _ => false,
        }
    }

    /// Number of vertices, not counting the repeated closing point.
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        if self.is_closed() {
            self.0.len() - 1
        } else {
            self.0.len()
        }
    }

    /// Returns a slice of all points.
    #[must_use]
    pub fn points(&self) -> &[Point] {
        &self.0
    }
}

/// Grid dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Number of columns.
    pub width: u32,
    /// Number of rows.
    pub height: u32,
}

/// A `(row, col)` index into a grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PixelIndex {
    /// Row, counted from the top.
    pub row: u32,
    /// Column, counted from the left.
    pub col: u32,
}

impl PixelIndex {
    /// Create a new pixel index.
    #[must_use]
    pub const fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }
}

/// Configuration for region extraction.
///
/// # Smoothing window invariants
///
/// When set, `smoothing_window` must be odd and strictly greater than
/// [`ExtractConfig::SMOOTHING_POLY_ORDER`]. [`validate`](Self::validate)
/// checks this up front; the window is checked against the contour
/// length again at smoothing time because that is only known per click.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractConfig {
    /// Maximum absolute difference from the seed value for a pixel to
    /// join the region.
    pub tolerance: f64,

    /// Savitzky-Golay window length, or `None` to keep the raw contour.
    pub smoothing_window: Option<usize>,

    /// Pixel neighbourhood used by the flood fill.
    pub connectivity: Connectivity,

    /// Which contour tracing algorithm to use on the region mask.
    pub contour_tracer: ContourTracerKind,
}

impl ExtractConfig {
    /// Default flood fill tolerance.
    pub const DEFAULT_TOLERANCE: f64 = 10.0;

    /// Contours with fewer points than this are never smoothed.
    pub const MIN_SMOOTHING_POINTS: usize = 7;

    /// Distinct vertices needed for a contour to become a polygon.
    pub const MIN_POLYGON_VERTICES: usize = 3;

    /// Polynomial order of the Savitzky-Golay fit.
    pub const SMOOTHING_POLY_ORDER: usize = 2;

    /// Check the configuration for values that can never work.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] if the tolerance is
    /// negative or not finite, and [`PipelineError::InvalidSmoothingWindow`]
    /// if the smoothing window is even or too short for the fit order.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err(PipelineError::InvalidConfig(format!(
                "tolerance must be finite and non-negative, got {}",
                self.tolerance
            )));
        }
        if let Some(window) = self.smoothing_window
            && (window % 2 == 0 || window <= Self::SMOOTHING_POLY_ORDER)
        {
            return Err(PipelineError::InvalidSmoothingWindow {
                window,
                points: None,
            });
        }
        Ok(())
    }
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            tolerance: Self::DEFAULT_TOLERANCE,
            smoothing_window: None,
            connectivity: Connectivity::default(),
            contour_tracer: ContourTracerKind::default(),
        }
    }
}

/// Errors that can occur while cropping a raster or handling a click.
///
/// Some variants only reject a single click; see
/// [`is_recoverable`](Self::is_recoverable).
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Configuration is invalid.
    #[error("invalid extraction configuration: {0}")]
    InvalidConfig(String),

    /// Grid sample count does not match its dimensions.
    #[error("grid of {width}x{height} needs {expected} samples, got {actual}")]
    GridSize {
        /// Number of columns.
        width: u32,
        /// Number of rows.
        height: u32,
        /// `width * height`.
        expected: usize,
        /// Samples supplied.
        actual: usize,
    },

    /// The raster has no pixels.
    #[error("raster is empty")]
    EmptyRaster,

    /// Extent bounds are not ordered or not finite.
    #[error("invalid extent [{west}, {south}, {east}, {north}]")]
    InvalidExtent {
        /// Western bound.
        west: f64,
        /// Southern bound.
        south: f64,
        /// Eastern bound.
        east: f64,
        /// Northern bound.
        north: f64,
    },

    /// The requested extent does not overlap the raster.
    #[error("extent lies entirely outside the raster")]
    ExtentOutsideRaster,

    /// The click is outside the raster's geographic extent.
    #[error("click at ({x:.4}, {y:.4}) is outside the raster extent")]
    OutsideExtent {
        /// Clicked x coordinate.
        x: f64,
        /// Clicked y coordinate.
        y: f64,
    },

    /// The click maps to a pixel index outside the grid.
    #[error("click maps to pixel (row {row}, col {col}) outside the grid")]
    OutOfBounds {
        /// Truncated row.
        row: i64,
        /// Truncated column.
        col: i64,
    },

    /// The region mask produced no contour.
    #[error("no contour found")]
    NoContour,

    /// The longest contour has too few distinct vertices for a polygon.
    #[error("contour has {points} distinct vertices, a polygon needs at least {min}", min = ExtractConfig::MIN_POLYGON_VERTICES)]
    DegenerateContour {
        /// Distinct vertices in the contour.
        points: usize,
    },

    /// The smoothing window cannot be applied.
    #[error(
        "invalid smoothing window {window}{suffix}: must be odd, greater than {order}, and at most the contour length",
        suffix = contour_suffix(.points),
        order = ExtractConfig::SMOOTHING_POLY_ORDER
    )]
    InvalidSmoothingWindow {
        /// Configured window length.
        window: usize,
        /// Contour length, when the failure happened at smoothing time.
        points: Option<usize>,
    },
}

#[allow(clippy::ref_option)]
fn contour_suffix(points: &Option<usize>) -> String {
    points.map_or_else(String::new, |p| format!(" for a {p}-point contour"))
}

impl PipelineError {
    /// Returns `true` for errors that only reject the current click.
    ///
    /// A session keeps running after a recoverable error; anything else
    /// should end it.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::OutsideExtent { .. }
                | Self::OutOfBounds { .. }
                | Self::NoContour
                | Self::DegenerateContour { .. }
        )
    }
}
