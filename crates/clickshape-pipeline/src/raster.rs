//! In-memory raster: a grid of samples plus its georeferencing.
//!
//! Decoding lives in `clickshape-io`; this module only owns the data
//! and the pure windowing logic used to crop a raster to an extent.

use crate::georef::{Extent, GeoTransform};
use crate::types::{Dimensions, PipelineError};

/// Distance from an integer below which a fractional window bound is
/// snapped to that integer before flooring/ceiling.
const WINDOW_SNAP: f64 = 1e-9;

/// Row-major grid of `f64` samples.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    width: u32,
    height: u32,
    data: Vec<f64>,
}

impl Grid {
    /// Wrap row-major samples.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::GridSize`] if `data.len()` is not
    /// `width * height`.
    pub fn new(width: u32, height: u32, data: Vec<f64>) -> Result<Self, PipelineError> {
        let expected = width as usize * height as usize;
        if data.len() != expected {
            return Err(PipelineError::GridSize {
                width,
                height,
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Build a grid by evaluating `f(row, col)` for every pixel.
    #[must_use]
    pub fn from_fn(width: u32, height: u32, f: impl Fn(u32, u32) -> f64) -> Self {
        let data = (0..height)
            .flat_map(|row| (0..width).map(move |col| (row, col)))
            .map(|(row, col)| f(row, col))
            .collect();
        Self {
            width,
            height,
            data,
        }
    }

    /// Number of columns.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Number of rows.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Width and height together.
    #[must_use]
    pub const fn dimensions(&self) -> Dimensions {
        Dimensions {
            width: self.width,
            height: self.height,
        }
    }

    /// Returns `true` if the grid has no pixels.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Sample at `(row, col)`, or `None` outside the grid.
    #[must_use]
    pub fn get(&self, row: u32, col: u32) -> Option<f64> {
        if row < self.height && col < self.width {
            Some(self.data[self.offset(row, col)])
        } else {
            None
        }
    }

    /// All samples in row-major order.
    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// Row-major offset of `(row, col)`. Callers check bounds.
    pub(crate) const fn offset(&self, row: u32, col: u32) -> usize {
        row as usize * self.width as usize + col as usize
    }

    /// Copy out the `height` x `width` block starting at
    /// `(row_off, col_off)`. The block must lie inside the grid.
    fn window(&self, row_off: u32, col_off: u32, width: u32, height: u32) -> Self {
        let mut data = Vec::with_capacity(width as usize * height as usize);
        for row in row_off..row_off + height {
            let start = self.offset(row, col_off);
            data.extend_from_slice(&self.data[start..start + width as usize]);
        }
        Self {
            width,
            height,
            data,
        }
    }
}

/// A grid with its pixel <-> geographic transform. Immutable after
/// construction.
#[derive(Debug, Clone, PartialEq)]
pub struct Raster {
    grid: Grid,
    transform: GeoTransform,
}

impl Raster {
    /// Pair a grid with its transform.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::EmptyRaster`] if the grid has no pixels.
    pub fn new(grid: Grid, transform: GeoTransform) -> Result<Self, PipelineError> {
        if grid.is_empty() {
            return Err(PipelineError::EmptyRaster);
        }
        Ok(Self { grid, transform })
    }

    /// Spread `extent` uniformly over `grid`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::EmptyRaster`] if the grid has no pixels.
    pub fn from_extent(grid: Grid, extent: &Extent) -> Result<Self, PipelineError> {
        let transform = GeoTransform::from_extent(extent, grid.dimensions())?;
        Self::new(grid, transform)
    }

    /// The sample grid.
    #[must_use]
    pub const fn grid(&self) -> &Grid {
        &self.grid
    }

    /// The pixel <-> geographic transform.
    #[must_use]
    pub const fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    /// Grid dimensions.
    #[must_use]
    pub const fn dimensions(&self) -> Dimensions {
        self.grid.dimensions()
    }

    /// Geographic bounds of the whole grid.
    #[must_use]
    pub fn extent(&self) -> Extent {
        self.transform.extent(self.grid.dimensions())
    }

    /// Crop to the pixels covering `extent`.
    ///
    /// The window starts at the pixel containing the extent's
    /// north-west corner and ends at the pixel containing its
    /// south-east corner, clipped to the grid. The cropped raster's
    /// transform starts at the window's top-left pixel corner, so its
    /// extent can be slightly larger than the one requested.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::ExtentOutsideRaster`] if the window is
    /// empty after clipping.
    pub fn crop(&self, extent: &Extent) -> Result<Self, PipelineError> {
        let t = &self.transform;
        let width = f64::from(self.grid.width);
        let height = f64::from(self.grid.height);

        let col_start = snap((extent.west - t.west) / t.pixel_width).floor();
        let col_end = snap((extent.east - t.west) / t.pixel_width).ceil();
        let row_start = snap((t.north - extent.north) / t.pixel_height).floor();
        let row_end = snap((t.north - extent.south) / t.pixel_height).ceil();

        let col_start = col_start.clamp(0.0, width);
        let col_end = col_end.clamp(0.0, width);
        let row_start = row_start.clamp(0.0, height);
        let row_end = row_end.clamp(0.0, height);

        if col_end <= col_start || row_end <= row_start {
            return Err(PipelineError::ExtentOutsideRaster);
        }

        let (col_off, row_off) = (to_u32(col_start), to_u32(row_start));
        let (win_width, win_height) = (to_u32(col_end) - col_off, to_u32(row_end) - row_off);
        log::debug!(
            "cropping {}x{} raster to window cols {col_off}..{} rows {row_off}..{}",
            self.grid.width,
            self.grid.height,
            col_off + win_width,
            row_off + win_height,
        );

        Ok(Self {
            grid: self.grid.window(row_off, col_off, win_width, win_height),
            transform: t.window(row_off, col_off),
        })
    }
}

/// Snap values within [`WINDOW_SNAP`] of an integer onto it.
fn snap(v: f64) -> f64 {
    let r = v.round();
    if (v - r).abs() < WINDOW_SNAP { r } else { v }
}

/// Convert an already clamped, integral, non-negative `f64` to `u32`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_u32(v: f64) -> u32 {
    v as u32
}
