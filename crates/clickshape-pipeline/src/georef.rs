//! Georeferencing: geographic extents and the pixel <-> geographic
//! affine mapping.
//!
//! Only north-up, axis-aligned transforms are representable. A pixel
//! index `(row, col)` maps to
//!
//! ```text
//! x = west  + col * pixel_width
//! y = north - row * pixel_height
//! ```
//!
//! with both pixel sizes positive. Loaders reject rotated or sheared
//! source transforms before they get here.

use serde::{Deserialize, Serialize};

use crate::types::{Dimensions, PipelineError, Point};

/// Geographic bounds in the raster's coordinate reference system.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Extent {
    /// Minimum x (longitude).
    pub west: f64,
    /// Minimum y (latitude).
    pub south: f64,
    /// Maximum x (longitude).
    pub east: f64,
    /// Maximum y (latitude).
    pub north: f64,
}

impl Extent {
    /// Create an extent, checking that the bounds are finite and ordered.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidExtent`] if any bound is not
    /// finite, `west >= east`, or `south >= north`.
    pub fn new(west: f64, south: f64, east: f64, north: f64) -> Result<Self, PipelineError> {
        let finite = [west, south, east, north].iter().all(|v| v.is_finite());
        if !finite || west >= east || south >= north {
            return Err(PipelineError::InvalidExtent {
                west,
                south,
                east,
                north,
            });
        }
        Ok(Self {
            west,
            south,
            east,
            north,
        })
    }

    /// East-west span.
    #[must_use]
    pub fn width(&self) -> f64 {
        self.east - self.west
    }

    /// North-south span.
    #[must_use]
    pub fn height(&self) -> f64 {
        self.north - self.south
    }

    /// Returns `true` if `(x, y)` lies inside or on the boundary.
    #[must_use]
    pub fn contains(&self, x: f64, y: f64) -> bool {
        (self.west..=self.east).contains(&x) && (self.south..=self.north).contains(&y)
    }
}

/// North-up affine transform between pixel indices and geographic
/// coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    /// x of the top-left corner of the top-left pixel.
    pub west: f64,
    /// y of the top-left corner of the top-left pixel.
    pub north: f64,
    /// Geographic width of one pixel (positive).
    pub pixel_width: f64,
    /// Geographic height of one pixel (positive, y decreases downward).
    pub pixel_height: f64,
}

impl GeoTransform {
    /// Create a transform from its origin and pixel size.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] if the origin is not
    /// finite or either pixel size is not finite and positive.
    pub fn new(
        west: f64,
        north: f64,
        pixel_width: f64,
        pixel_height: f64,
    ) -> Result<Self, PipelineError> {
        let positive = |v: f64| v.is_finite() && v > 0.0;
        if !west.is_finite() || !north.is_finite() {
            return Err(PipelineError::InvalidConfig(format!(
                "transform origin must be finite, got ({west}, {north})"
            )));
        }
        if !positive(pixel_width) || !positive(pixel_height) {
            return Err(PipelineError::InvalidConfig(format!(
                "pixel size must be positive, got {pixel_width} x {pixel_height}"
            )));
        }
        Ok(Self {
            west,
            north,
            pixel_width,
            pixel_height,
        })
    }

    /// Transform that spreads `extent` uniformly over a grid of
    /// `dimensions`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::EmptyRaster`] if the grid has no pixels.
    pub fn from_extent(extent: &Extent, dimensions: Dimensions) -> Result<Self, PipelineError> {
        if dimensions.width == 0 || dimensions.height == 0 {
            return Err(PipelineError::EmptyRaster);
        }
        Self::new(
            extent.west,
            extent.north,
            extent.width() / f64::from(dimensions.width),
            extent.height() / f64::from(dimensions.height),
        )
    }

    /// Identity-like transform for images without georeferencing.
    ///
    /// Pixels are one unit square and the y axis points up, so the
    /// bottom-left corner of the grid is the origin.
    #[must_use]
    pub fn pixel_space(height: u32) -> Self {
        Self {
            west: 0.0,
            north: f64::from(height),
            pixel_width: 1.0,
            pixel_height: 1.0,
        }
    }

    /// Transform of a sub-window whose top-left pixel is at
    /// `(row_off, col_off)` in this transform's grid.
    #[must_use]
    pub fn window(&self, row_off: u32, col_off: u32) -> Self {
        Self {
            west: f64::from(col_off).mul_add(self.pixel_width, self.west),
            north: f64::from(row_off).mul_add(-self.pixel_height, self.north),
            ..*self
        }
    }

    /// Geographic bounds covered by a grid of `dimensions`.
    #[must_use]
    pub fn extent(&self, dimensions: Dimensions) -> Extent {
        Extent {
            west: self.west,
            south: f64::from(dimensions.height).mul_add(-self.pixel_height, self.north),
            east: f64::from(dimensions.width).mul_add(self.pixel_width, self.west),
            north: self.north,
        }
    }

    /// Map a pixel-space point (`x` = column, `y` = row) to geographic
    /// coordinates.
    #[must_use]
    pub fn pixel_to_geo(&self, point: Point) -> geo::Coord<f64> {
        geo::Coord {
            x: point.x.mul_add(self.pixel_width, self.west),
            y: point.y.mul_add(-self.pixel_height, self.north),
        }
    }

    /// Map geographic coordinates to a fractional pixel-space point.
    #[must_use]
    pub fn geo_to_pixel(&self, x: f64, y: f64) -> Point {
        Point::new(
            (x - self.west) / self.pixel_width,
            (self.north - y) / self.pixel_height,
        )
    }
}
