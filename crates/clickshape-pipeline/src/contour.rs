//! Contour tracing: extract region boundaries from a binary mask.
//!
//! This module defines the [`ContourTracer`] trait for pluggable contour
//! tracing algorithms and the [`ContourTracerKind`] enum for selecting
//! which algorithm to use at runtime.
//!
//! The default, [`ContourTracerKind::MarchingSquares`], produces
//! sub-pixel iso-lines at [`MASK_LEVEL`] in `(x = column, y = row)`
//! pixel units, where integer coordinates are pixel centres.

use std::collections::{HashMap, VecDeque};

use image::GrayImage;
use serde::{Deserialize, Serialize};

use crate::flood::REGION;
use crate::raster::Grid;
use crate::types::{Point, Polyline};

/// Iso-level used when tracing a 0/1 region mask (half occupancy).
pub const MASK_LEVEL: f64 = 0.5;

/// Selects which contour tracing algorithm to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ContourTracerKind {
    /// Marching squares at half occupancy with linear interpolation
    /// along cell edges. Sub-pixel; closed contours repeat their first
    /// point at the end.
    #[default]
    MarchingSquares,

    /// Suzuki-Abe border following via `imageproc::contours::find_contours`.
    ///
    /// Returns the integer centres of the boundary pixels themselves,
    /// so the polygon is about half a pixel smaller than with
    /// marching squares.
    BorderFollowing,
}

/// Trait for contour tracing strategies.
///
/// Input: a binary region mask (255 = region, 0 = background).
/// Output: every boundary the strategy finds, in scan order.
pub trait ContourTracer {
    /// Trace contours in the given region mask.
    fn trace(&self, mask: &GrayImage) -> Vec<Polyline>;
}

impl ContourTracer for ContourTracerKind {
    fn trace(&self, mask: &GrayImage) -> Vec<Polyline> {
        match *self {
            Self::MarchingSquares => {
                let occupancy = Grid::from_fn(mask.width(), mask.height(), |row, col| {
                    if mask.get_pixel(col, row).0[0] == REGION {
                        1.0
                    } else {
                        0.0
                    }
                });
                find_contours(&occupancy, MASK_LEVEL)
            }
            Self::BorderFollowing => trace_border_following(mask),
        }
    }
}

/// Pick the contour with the most points. Ties go to the earliest.
#[must_use]
pub fn longest_contour(contours: Vec<Polyline>) -> Option<Polyline> {
    contours
        .into_iter()
        .reduce(|best, c| if c.len() > best.len() { c } else { best })
}

/// Suzuki-Abe border following via `imageproc::contours::find_contours`.
///
/// Converts `imageproc` contour points (integer grid coordinates) into
/// floating-point [`Point`]s.
fn trace_border_following(mask: &GrayImage) -> Vec<Polyline> {
    let contours: Vec<imageproc::contours::Contour<u32>> =
        imageproc::contours::find_contours(mask);

    contours
        .into_iter()
        .filter(|c| c.points.len() >= 2)
        .map(|c| {
            let points = c
                .points
                .into_iter()
                .map(|p| Point::new(f64::from(p.x), f64::from(p.y)))
                .collect();
            Polyline::new(points)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Marching squares
// ---------------------------------------------------------------------------

/// A grid edge between two adjacent pixel centres.
///
/// Every iso-line crossing lies on exactly one edge, so edges identify
/// crossings exactly when segments from neighbouring cells are joined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Edge {
    /// Between `(row, col)` and `(row, col + 1)`.
    Horizontal { row: u32, col: u32 },
    /// Between `(row, col)` and `(row + 1, col)`.
    Vertical { row: u32, col: u32 },
}

/// Trace iso-lines of `grid` at `level`.
///
/// A sample is "high" when it is strictly greater than `level`. Each
/// segment is oriented with the high side on the same hand, so
/// assembled contours have a consistent winding. Where two high
/// samples touch only diagonally (a saddle cell), they are kept apart:
/// high regions are face-connected, low regions fully connected.
///
/// The grid is not padded, so a region touching the grid edge yields
/// an open contour. Closed contours end with a copy of their first
/// point.
#[must_use]
pub fn find_contours(grid: &Grid, level: f64) -> Vec<Polyline> {
    let (width, height) = (grid.width(), grid.height());
    if width < 2 || height < 2 {
        return Vec::new();
    }
    let value = |row: u32, col: u32| grid.as_slice()[grid.offset(row, col)];

    let mut assembly = Assembly::default();
    for row in 0..height - 1 {
        for col in 0..width - 1 {
            let case = u8::from(value(row, col) > level)
                | u8::from(value(row, col + 1) > level) << 1
                | u8::from(value(row + 1, col) > level) << 2
                | u8::from(value(row + 1, col + 1) > level) << 3;

            let top = Edge::Horizontal { row, col };
            let bottom = Edge::Horizontal { row: row + 1, col };
            let left = Edge::Vertical { row, col };
            let right = Edge::Vertical { row, col: col + 1 };

            let segments: &[(Edge, Edge)] = match case {
                1 => &[(top, left)],
                2 => &[(right, top)],
                3 => &[(right, left)],
                4 => &[(left, bottom)],
                5 => &[(top, bottom)],
                6 => &[(right, top), (left, bottom)],
                7 => &[(right, bottom)],
                8 => &[(bottom, right)],
                9 => &[(top, left), (bottom, right)],
                10 => &[(bottom, top)],
                11 => &[(bottom, left)],
                12 => &[(left, right)],
                13 => &[(top, right)],
                14 => &[(left, top)],
                _ => &[],
            };
            for &(from, to) in segments {
                assembly.add(from, to);
            }
        }
    }

    let fraction = |a: f64, b: f64| if a == b { 0.0 } else { (level - a) / (b - a) };
    let crossing = |edge: Edge| match edge {
        Edge::Horizontal { row, col } => Point::new(
            f64::from(col) + fraction(value(row, col), value(row, col + 1)),
            f64::from(row),
        ),
        Edge::Vertical { row, col } => Point::new(
            f64::from(col),
            f64::from(row) + fraction(value(row, col), value(row + 1, col)),
        ),
    };

    assembly
        .contours
        .into_iter()
        .flatten()
        .map(|edges| Polyline::new(edges.into_iter().map(crossing).collect()))
        .collect()
}

/// Joins oriented segments into polylines as they arrive.
///
/// Contours are kept in creation order; merged contours leave a `None`
/// behind so indices stay stable.
#[derive(Default)]
struct Assembly {
    contours: Vec<Option<VecDeque<Edge>>>,
    /// Contour index by first edge, for open contours.
    starts: HashMap<Edge, usize>,
    /// Contour index by last edge, for open contours.
    ends: HashMap<Edge, usize>,
}

impl Assembly {
    fn add(&mut self, from: Edge, to: Edge) {
        let tail = self.starts.remove(&to);
        let head = self.ends.remove(&from);

        match (tail, head) {
            (Some(t), Some(h)) if t == h => {
                // Closing a loop.
                if let Some(contour) = self.contours[h].as_mut() {
                    contour.push_back(to);
                }
            }
            (Some(t), Some(h)) if t > h => {
                // Append the newer tail contour onto the head contour.
                let Some(tail_edges) = self.contours[t].take() else {
                    return;
                };
                if let Some(contour) = self.contours[h].as_mut() {
                    contour.extend(tail_edges);
                    if let Some(&last) = contour.back() {
                        self.ends.insert(last, h);
                    }
                }
            }
            (Some(t), Some(h)) => {
                // Prepend the newer head contour onto the tail contour.
                let Some(head_edges) = self.contours[h].take() else {
                    return;
                };
                if let Some(contour) = self.contours[t].as_mut() {
                    for edge in head_edges.into_iter().rev() {
                        contour.push_front(edge);
                    }
                    if let Some(&first) = contour.front() {
                        self.starts.insert(first, t);
                    }
                }
            }
            (Some(t), None) => {
                if let Some(contour) = self.contours[t].as_mut() {
                    contour.push_front(from);
                    self.starts.insert(from, t);
                }
            }
            (None, Some(h)) => {
                if let Some(contour) = self.contours[h].as_mut() {
                    contour.push_back(to);
                    self.ends.insert(to, h);
                }
            }
            (None, None) => {
                let index = self.contours.len();
                self.contours.push(Some(VecDeque::from([from, to])));
                self.starts.insert(from, index);
                self.ends.insert(to, index);
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn mask_from_fn(width: u32, height: u32, f: impl Fn(u32, u32) -> bool) -> GrayImage {
        GrayImage::from_fn(width, height, |x, y| {
            if f(y, x) {
                image::Luma([REGION])
            } else {
                image::Luma([0])
            }
        })
    }

    fn bounds(polyline: &Polyline) -> (f64, f64, f64, f64) {
        polyline.points().iter().fold(
            (f64::MAX, f64::MAX, f64::MIN, f64::MIN),
            |(x0, y0, x1, y1), p| (x0.min(p.x), y0.min(p.y), x1.max(p.x), y1.max(p.y)),
        )
    }

    #[test]
    fn default_is_marching_squares() {
        assert_eq!(
            ContourTracerKind::default(),
            ContourTracerKind::MarchingSquares
        );
    }

    #[test]
    fn empty_mask_produces_no_contours() {
        let mask = GrayImage::new(10, 10);
        assert!(ContourTracerKind::MarchingSquares.trace(&mask).is_empty());
        assert!(ContourTracerKind::BorderFollowing.trace(&mask).is_empty());
    }

    #[test]
    fn full_mask_produces_no_marching_squares_contour() {
        let mask = mask_from_fn(6, 6, |_, _| true);
        assert!(ContourTracerKind::MarchingSquares.trace(&mask).is_empty());
    }

    #[test]
    fn single_pixel_is_a_closed_diamond() {
        let mask = mask_from_fn(5, 5, |row, col| row == 2 && col == 2);
        let contours = ContourTracerKind::MarchingSquares.trace(&mask);
        assert_eq!(contours.len(), 1);
        let c = &contours[0];
        assert_eq!(c.len(), 5);
        assert!(c.is_closed());
        assert_eq!(bounds(c), (1.5, 1.5, 2.5, 2.5));
    }

    #[test]
    fn block_contour_is_half_a_pixel_outside_the_centres() {
        let mask = mask_from_fn(10, 10, |row, col| {
            (3..=5).contains(&row) && (3..=5).contains(&col)
        });
        let contours = ContourTracerKind::MarchingSquares.trace(&mask);
        assert_eq!(contours.len(), 1);
        let c = &contours[0];
        assert_eq!(c.len(), 13);
        assert!(c.is_closed());
        assert_eq!(bounds(c), (2.5, 2.5, 5.5, 5.5));
    }

    #[test]
    fn region_on_grid_edge_gives_open_contour() {
        let mask = mask_from_fn(3, 3, |_, col| col == 0);
        let contours = ContourTracerKind::MarchingSquares.trace(&mask);
        assert_eq!(contours.len(), 1);
        let c = &contours[0];
        assert!(!c.is_closed());
        assert_eq!(
            c.points(),
            &[
                Point::new(0.5, 0.0),
                Point::new(0.5, 1.0),
                Point::new(0.5, 2.0)
            ]
        );
    }

    #[test]
    fn diagonal_neighbours_are_traced_separately() {
        let mask = mask_from_fn(4, 4, |row, col| (row, col) == (1, 1) || (row, col) == (2, 2));
        let contours = ContourTracerKind::MarchingSquares.trace(&mask);
        assert_eq!(contours.len(), 2);
        for c in &contours {
            assert_eq!(c.len(), 5);
            assert!(c.is_closed());
        }
    }

    #[test]
    fn ring_yields_outer_and_hole_contours() {
        let mask = mask_from_fn(7, 7, |row, col| {
            let inside = (1..=5).contains(&row) && (1..=5).contains(&col);
            let hole = (2..=4).contains(&row) && (2..=4).contains(&col);
            inside && !hole
        });
        let contours = ContourTracerKind::MarchingSquares.trace(&mask);
        assert_eq!(contours.len(), 2);
        let longest = longest_contour(contours).unwrap();
        assert_eq!(longest.len(), 21);
        assert_eq!(bounds(&longest), (0.5, 0.5, 5.5, 5.5));
    }

    #[test]
    fn interpolates_between_grid_values() {
        let grid = Grid::new(2, 2, vec![0.0, 4.0, 0.0, 4.0]).unwrap();
        let contours = find_contours(&grid, 1.0);
        assert_eq!(contours.len(), 1);
        for p in contours[0].points() {
            assert!((p.x - 0.25).abs() < 1e-12);
        }
    }

    #[test]
    fn tiny_grids_have_no_contours() {
        let grid = Grid::new(1, 3, vec![0.0, 1.0, 0.0]).unwrap();
        assert!(find_contours(&grid, 0.5).is_empty());
    }

    #[test]
    fn longest_contour_prefers_first_on_ties() {
        let a = Polyline::new(vec![Point::new(0.0, 0.0), Point::new(1.0, 0.0)]);
        let b = Polyline::new(vec![Point::new(5.0, 5.0), Point::new(6.0, 5.0)]);
        let longest = longest_contour(vec![a.clone(), b]).unwrap();
        assert_eq!(longest, a);
        assert!(longest_contour(vec![]).is_none());
    }

    #[test]
    fn border_following_traces_rectangle() {
        let mask = mask_from_fn(20, 20, |row, col| {
            (5..15).contains(&row) && (5..15).contains(&col)
        });
        let contours = ContourTracerKind::BorderFollowing.trace(&mask);
        assert!(!contours.is_empty());
        let longest = longest_contour(contours).unwrap();
        assert!(longest.len() >= 4);
        assert_eq!(bounds(&longest), (5.0, 5.0, 14.0, 14.0));
    }
}
