//! Per-click diagnostics: timing and counts for each extraction stage.
//!
//! Every successful [`ClickSession::click`](crate::ClickSession::click)
//! returns a [`ClickDiagnostics`] alongside the polygon. The CLI prints
//! either [`ClickDiagnostics::report`] or the serialized form.
//!
//! Timestamps are captured via the `web-time` crate. Durations are
//! serialized as fractional seconds (`f64`) since `std::time::Duration`
//! does not implement serde traits.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::contour::ContourTracerKind;

/// Serde support for `std::time::Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a `Duration` as fractional seconds (`f64`).
    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    /// Deserialize a `Duration` from fractional seconds (`f64`).
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom(
                "duration seconds must be finite, non-negative, and representable as a Duration",
            )
        })
    }
}

/// Diagnostics collected while handling a single click.
///
/// `smoothing` is `None` when no window is configured or the contour
/// was too short to smooth.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClickDiagnostics {
    /// Geographic click to pixel index.
    pub pick: StageDiagnostics,
    /// Region growing from the seed.
    pub flood_fill: StageDiagnostics,
    /// Boundary tracing and longest-contour selection.
    pub contour_tracing: StageDiagnostics,
    /// Savitzky-Golay smoothing.
    pub smoothing: Option<StageDiagnostics>,
    /// Pixel to geographic conversion.
    pub georeference: StageDiagnostics,
    /// Wall-clock duration of the whole click (seconds).
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
}

/// Diagnostics for a single stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageDiagnostics {
    /// Wall-clock duration of this stage (seconds).
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// Stage-specific metrics.
    pub metrics: StageMetrics,
}

/// Stage-specific metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StageMetrics {
    /// Click mapping.
    Pick {
        /// Clicked x coordinate.
        x: f64,
        /// Clicked y coordinate.
        y: f64,
        /// Seed row.
        row: u32,
        /// Seed column.
        col: u32,
        /// Sample value at the seed.
        seed_value: f64,
    },
    /// Flood fill.
    FloodFill {
        /// Tolerance around the seed value.
        tolerance: f64,
        /// Neighbourhood size (4 or 8).
        connectivity: u8,
        /// Pixels in the region.
        region_pixels: u64,
        /// Pixels in the grid.
        total_pixels: u64,
    },
    /// Contour tracing.
    ContourTracing {
        /// Which tracer was used.
        tracer: ContourTracerKind,
        /// Contours found in the mask.
        contour_count: usize,
        /// Points in the kept (longest) contour.
        kept_points: usize,
        /// Contours thrown away by the longest-contour rule.
        discarded: usize,
    },
    /// Smoothing.
    Smoothing {
        /// Filter window length.
        window: usize,
        /// Points smoothed.
        points: usize,
    },
    /// Georeferencing.
    Georeference {
        /// Vertices in the polygon exterior (including the closing one).
        vertex_count: usize,
        /// Planar area in squared CRS units.
        area: f64,
    },
}

impl ClickDiagnostics {
    /// Format diagnostics as a human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Click Diagnostics Report\n{}", "=".repeat(60)));
        lines.push(format!(
            "Total duration: {:.3}ms",
            duration_ms(self.total_duration),
        ));
        lines.push(String::new());

        lines.push(format!(
            "{:<18} {:>10} {:>10}  {}",
            "Stage", "Duration", "% Total", "Details"
        ));
        lines.push("-".repeat(80));

        let total_ms = duration_ms(self.total_duration);

        let mut stages = vec![
            ("Pick", &self.pick),
            ("Flood Fill", &self.flood_fill),
            ("Contour Tracing", &self.contour_tracing),
        ];
        if let Some(ref s) = self.smoothing {
            stages.push(("Smoothing", s));
        }
        stages.push(("Georeference", &self.georeference));

        for (name, diag) in &stages {
            let ms = duration_ms(diag.duration);
            let pct = if total_ms > 0.0 {
                ms / total_ms * 100.0
            } else {
                0.0
            };
            let details = format_metrics(&diag.metrics);
            lines.push(format!("{name:<18} {ms:>8.3}ms {pct:>9.1}%  {details}"));
        }

        lines.join("\n")
    }
}

/// Convert a `Duration` to milliseconds as `f64`.
fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

/// Format stage metrics into a compact detail string.
fn format_metrics(metrics: &StageMetrics) -> String {
    match metrics {
        StageMetrics::Pick {
            x,
            y,
            row,
            col,
            seed_value,
        } => format!("({x:.4}, {y:.4}) -> row {row} col {col} value={seed_value}"),
        StageMetrics::FloodFill {
            tolerance,
            connectivity,
            region_pixels,
            total_pixels,
        } => {
            #[allow(clippy::cast_precision_loss)]
            let coverage = if *total_pixels > 0 {
                *region_pixels as f64 / *total_pixels as f64 * 100.0
            } else {
                0.0
            };
            format!(
                "tol={tolerance} {connectivity}-conn region={region_pixels} px ({coverage:.1}%)"
            )
        }
        StageMetrics::ContourTracing {
            tracer,
            contour_count,
            kept_points,
            discarded,
        } => format!(
            "{tracer:?} {contour_count} contours, kept {kept_points} pts, discarded {discarded}"
        ),
        StageMetrics::Smoothing { window, points } => {
            format!("window={window} {points} pts")
        }
        StageMetrics::Georeference { vertex_count, area } => {
            format!("{vertex_count} vertices, area={area:.6}")
        }
    }
}
