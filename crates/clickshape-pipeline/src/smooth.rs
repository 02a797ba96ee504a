//! Savitzky-Golay smoothing of contour coordinates.
//!
//! Each output sample is the value at its position of a least-squares
//! quadratic fitted to the `window` samples around it. Near the ends,
//! where a centred window does not fit, the quadratic fitted to the
//! first (or last) `window` samples is evaluated instead, so the output
//! has the same length as the input.
//!
//! Columns and rows are smoothed independently.

use crate::types::{ExtractConfig, PipelineError, Point, Polyline};

/// Smooth both coordinate sequences of `polyline` with a quadratic
/// Savitzky-Golay filter of length `window`.
///
/// Closed contours are not treated as periodic; the smoothed first and
/// last points may drift apart.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidSmoothingWindow`] if `window` is even,
/// not greater than [`ExtractConfig::SMOOTHING_POLY_ORDER`], or longer
/// than the polyline.
pub fn savgol_smooth(polyline: &Polyline, window: usize) -> Result<Polyline, PipelineError> {
    let n = polyline.len();
    if window % 2 == 0 || window <= ExtractConfig::SMOOTHING_POLY_ORDER || window > n {
        return Err(PipelineError::InvalidSmoothingWindow {
            window,
            points: Some(n),
        });
    }

    let xs: Vec<f64> = polyline.points().iter().map(|p| p.x).collect();
    let ys: Vec<f64> = polyline.points().iter().map(|p| p.y).collect();
    let filter = QuadraticFit::new(window);

    let points = filter
        .apply(&xs)
        .into_iter()
        .zip(filter.apply(&ys))
        .map(|(x, y)| Point::new(x, y))
        .collect();
    Ok(Polyline::new(points))
}

/// Least-squares quadratic over a window of odd length `2h + 1`, with
/// sample positions centred on zero (`-h..=h`).
struct QuadraticFit {
    half: usize,
    /// `sum(t^2)` over the window.
    s2: f64,
    /// `sum(t^4)` over the window.
    s4: f64,
    /// Determinant of the even-moment block of the normal equations.
    det: f64,
    len: f64,
}

impl QuadraticFit {
    #[allow(clippy::cast_precision_loss)]
    fn new(window: usize) -> Self {
        let half = window / 2;
        let (s2, s4) = offsets(half).fold((0.0, 0.0), |(s2, s4), t| {
            let t2 = t * t;
            (s2 + t2, t2.mul_add(t2, s4))
        });
        let len = window as f64;
        Self {
            half,
            s2,
            s4,
            det: len.mul_add(s4, -(s2 * s2)),
            len,
        }
    }

    /// Coefficients `(a0, a1, a2)` of `a0 + a1 t + a2 t^2` fitted to
    /// `samples`, which must hold exactly one window.
    ///
    /// Odd moments vanish for a centred window, which decouples `a1`
    /// from the other two.
    fn fit(&self, samples: &[f64]) -> (f64, f64, f64) {
        let (t0, t1, t2) = offsets(self.half).zip(samples).fold(
            (0.0, 0.0, 0.0),
            |(t0, t1, t2), (t, &y)| (t0 + y, t.mul_add(y, t1), (t * t).mul_add(y, t2)),
        );
        let a0 = t0.mul_add(self.s4, -(self.s2 * t2)) / self.det;
        let a1 = t1 / self.s2;
        let a2 = self.len.mul_add(t2, -(self.s2 * t0)) / self.det;
        (a0, a1, a2)
    }

    fn apply(&self, values: &[f64]) -> Vec<f64> {
        let window = 2 * self.half + 1;
        let n = values.len();
        let eval = |(a0, a1, a2): (f64, f64, f64), t: f64| a2.mul_add(t * t, a1.mul_add(t, a0));

        let head = self.fit(&values[..window]);
        let tail = self.fit(&values[n - window..]);

        (0..n)
            .map(|i| {
                if i < self.half {
                    eval(head, signed_offset(i, self.half))
                } else if i >= n - self.half {
                    eval(tail, signed_offset(i - (n - window), self.half))
                } else {
                    self.fit(&values[i - self.half..=i + self.half]).0
                }
            })
            .collect()
    }
}

/// Centred positions `-h..=h` as `f64`.
#[allow(clippy::cast_precision_loss)]
fn offsets(half: usize) -> impl Iterator<Item = f64> {
    (0..=2 * half).map(move |i| i as f64 - half as f64)
}

/// Position of window index `i` relative to the window centre.
#[allow(clippy::cast_precision_loss)]
fn signed_offset(i: usize, half: usize) -> f64 {
    i as f64 - half as f64
}
