//! Tolerance flood fill: grow a region from a seed pixel.
//!
//! The region is the maximal connected set of pixels reachable from the
//! seed whose values are within `tolerance` of the seed value. The
//! result is a binary mask (255 = in region) the size of the grid.

use std::collections::VecDeque;

use image::{GrayImage, Luma};
use serde::{Deserialize, Serialize};

use crate::raster::Grid;
use crate::types::{PipelineError, PixelIndex};

/// Mask value for pixels inside the region.
pub const REGION: u8 = 255;

/// Pixel neighbourhood used when growing a region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Connectivity {
    /// Edge neighbours only (up, down, left, right).
    Four,
    /// Edge and corner neighbours.
    #[default]
    Eight,
}

const FOUR_NEIGHBOURS: [(i32, i32); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];

const EIGHT_NEIGHBOURS: [(i32, i32); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

impl Connectivity {
    /// `(row, col)` offsets of the neighbours.
    #[must_use]
    pub const fn offsets(self) -> &'static [(i32, i32)] {
        match self {
            Self::Four => &FOUR_NEIGHBOURS,
            Self::Eight => &EIGHT_NEIGHBOURS,
        }
    }
}

/// Grow a region from `seed` over pixels within `tolerance` of the seed
/// value.
///
/// A pixel joins when `|value - seed_value| <= tolerance`. NaN samples
/// never join; the seed itself is always part of the region.
///
/// # Errors
///
/// Returns [`PipelineError::OutOfBounds`] if `seed` is outside the grid.
#[must_use = "returns the region mask"]
pub fn flood_fill(
    grid: &Grid,
    seed: PixelIndex,
    tolerance: f64,
    connectivity: Connectivity,
) -> Result<GrayImage, PipelineError> {
    let seed_value = grid.get(seed.row, seed.col).ok_or(PipelineError::OutOfBounds {
        row: i64::from(seed.row),
        col: i64::from(seed.col),
    })?;

    let (width, height) = (grid.width(), grid.height());
    let samples = grid.as_slice();
    let mut mask = GrayImage::new(width, height);
    let mut queue = VecDeque::new();

    mask.put_pixel(seed.col, seed.row, Luma([REGION]));
    queue.push_back((seed.row, seed.col));

    while let Some((row, col)) = queue.pop_front() {
        for &(dr, dc) in connectivity.offsets() {
            let (Some(r), Some(c)) = (row.checked_add_signed(dr), col.checked_add_signed(dc))
            else {
                continue;
            };
            if r >= height || c >= width || mask.get_pixel(c, r).0[0] == REGION {
                continue;
            }
            let value = samples[grid.offset(r, c)];
            if (value - seed_value).abs() <= tolerance {
                mask.put_pixel(c, r, Luma([REGION]));
                queue.push_back((r, c));
            }
        }
    }

    Ok(mask)
}

/// Number of pixels inside the region.
#[must_use]
pub fn region_size(mask: &GrayImage) -> u64 {
    mask.pixels()
        .map(|p| u64::from(u8::from(p.0[0] == REGION)))
        .sum()
}
