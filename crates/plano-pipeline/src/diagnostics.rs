//! Pipeline diagnostics: timing and counts for each stage.
//!
//! Permanent instrumentation for algorithm tuning and parameter
//! experimentation. Timing is abstracted behind the [`Clock`] trait so
//! the sans-IO core never touches a platform time source directly; the
//! CLI supplies an [`std::time::Instant`]-backed implementation.
//!
//! Durations are serialized as fractional seconds (`f64`) for JSON
//! compatibility, since [`std::time::Duration`] does not implement
//! serde traits.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::types::{Dimensions, PipelineError, RgbImage, ScanConfig, StagedScan};
use crate::{detect, enhance, preprocess, rectify, resample, simplify};

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

/// Abstract time source for stage timing.
///
/// The core never reads a platform clock itself; callers provide one
/// (or use the no-op clock implicit in
/// [`process_staged`](crate::process_staged)).
pub trait Clock {
    /// Opaque timestamp type.
    type Instant;

    /// Capture the current instant.
    fn now(&self) -> Self::Instant;

    /// Elapsed time since a captured instant.
    fn elapsed(&self, since: &Self::Instant) -> Duration;
}

/// Clock that measures nothing; every duration is zero.
pub struct NullClock;

impl Clock for NullClock {
    type Instant = ();

    fn now(&self) {}

    fn elapsed(&self, _since: &()) -> Duration {
        Duration::ZERO
    }
}

/// Diagnostics collected from a single pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanDiagnostics {
    /// Stage 1: working-resolution downscale.
    pub downscale: StageDiagnostics,
    /// Stage 2: preprocessing + edge map extraction.
    pub edge_map: StageDiagnostics,
    /// Stage 3: contour tracing.
    pub contour_tracing: StageDiagnostics,
    /// Stage 4: simplification + quadrilateral selection.
    pub quad_selection: StageDiagnostics,
    /// Stage 5: perspective rectification.
    pub rectify: StageDiagnostics,
    /// Stage 6: scan cleanup enhancement.
    pub enhance: StageDiagnostics,
    /// Total wall-clock duration of the entire pipeline.
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
}

/// Diagnostics for a single pipeline stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageDiagnostics {
    /// Wall-clock duration of this stage.
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// Stage-specific metrics.
    pub metrics: StageMetrics,
}

/// Stage-specific metrics that vary by pipeline stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StageMetrics {
    /// Downscale metrics.
    Downscale {
        /// Source image dimensions.
        from: Dimensions,
        /// Working-resolution dimensions.
        to: Dimensions,
        /// Scale ratio back to original coordinates.
        ratio: f64,
    },
    /// Edge map metrics.
    EdgeMap {
        /// Number of edge pixels (value 255) in the output.
        edge_pixel_count: u64,
        /// Total pixel count for computing edge density.
        total_pixel_count: u64,
    },
    /// Contour tracing metrics.
    ContourTracing {
        /// Number of contours traced.
        contour_count: usize,
        /// Total points across all contours.
        total_point_count: usize,
    },
    /// Quadrilateral selection metrics.
    QuadSelection {
        /// Contours examined before a quadrilateral was accepted.
        contours_examined: usize,
    },
    /// Rectification metrics.
    Rectify {
        /// Rectified output dimensions.
        output: Dimensions,
    },
    /// Enhancement metrics.
    Enhance {
        /// Enhanced output dimensions.
        output: Dimensions,
    },
}

impl ScanDiagnostics {
    /// Format diagnostics as a human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        let total_ms = duration_ms(self.total_duration);
        let mut lines = Vec::new();

        lines.push(format!("Scan Diagnostics Report\n{}", "=".repeat(60)));
        lines.push(format!("Total duration: {total_ms:.3}ms"));
        lines.push(String::new());
        lines.push(format!(
            "{:<20} {:>10} {:>9}  {}",
            "Stage", "Duration", "% Total", "Details"
        ));
        lines.push("-".repeat(72));

        let stages = [
            ("Downscale", &self.downscale),
            ("Edge Map", &self.edge_map),
            ("Contour Tracing", &self.contour_tracing),
            ("Quad Selection", &self.quad_selection),
            ("Rectify", &self.rectify),
            ("Enhance", &self.enhance),
        ];
        for (name, diag) in stages {
            let ms = duration_ms(diag.duration);
            let pct = if total_ms > 0.0 {
                ms / total_ms * 100.0
            } else {
                0.0
            };
            let details = format_metrics(&diag.metrics);
            lines.push(format!("{name:<20} {ms:>8.3}ms {pct:>8.1}%  {details}"));
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
        StageMetrics::Downscale { from, to, ratio } => format!(
            "{}x{} -> {}x{} (ratio {ratio:.3})",
            from.width, from.height, to.width, to.height,
        ),
        StageMetrics::EdgeMap {
            edge_pixel_count,
            total_pixel_count,
        } => {
            #[allow(clippy::cast_precision_loss)]
            let density = if *total_pixel_count > 0 {
                *edge_pixel_count as f64 / *total_pixel_count as f64 * 100.0
            } else {
                0.0
            };
            format!("edges={edge_pixel_count} ({density:.1}%)")
        }
        StageMetrics::ContourTracing {
            contour_count,
            total_point_count,
        } => format!("{contour_count} contours, {total_point_count} pts"),
        StageMetrics::QuadSelection { contours_examined } => {
            format!("examined {contours_examined}")
        }
        StageMetrics::Rectify { output } | StageMetrics::Enhance { output } => {
            format!("{}x{}", output.width, output.height)
        }
    }
}

/// Run the staged pipeline, timing every stage with the given clock.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidImage`] for a zero-dimension input,
/// [`PipelineError::DocumentNotFound`] when no contour simplifies to a
/// quadrilateral, and [`PipelineError::DegenerateGeometry`] when the
/// selected quadrilateral cannot be rectified.
pub fn process_staged_with_diagnostics<C: Clock>(
    image: &RgbImage,
    config: &ScanConfig,
    clock: &C,
) -> Result<(StagedScan, ScanDiagnostics), PipelineError> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(PipelineError::InvalidImage);
    }
    let dimensions = Dimensions { width, height };
    let start = clock.now();

    // Stage 1: downscale to working resolution.
    let stage_start = clock.now();
    let (working, ratio) = resample::resize_to_height(image, config.working_height)?;
    let downscale = StageDiagnostics {
        duration: clock.elapsed(&stage_start),
        metrics: StageMetrics::Downscale {
            from: dimensions,
            to: Dimensions {
                width: working.width(),
                height: working.height(),
            },
            ratio,
        },
    };

    // Stage 2: edge map.
    let stage_start = clock.now();
    let edges = preprocess::edge_map(&working, config)?;
    let edge_map = StageDiagnostics {
        duration: clock.elapsed(&stage_start),
        metrics: StageMetrics::EdgeMap {
            edge_pixel_count: edges.pixels().map(|p| u64::from(p.0[0] == 255)).sum(),
            total_pixel_count: u64::from(edges.width()) * u64::from(edges.height()),
        },
    };

    // Stage 3: contour tracing.
    let stage_start = clock.now();
    let contours = detect::trace_contours(&edges);
    let contour_tracing = StageDiagnostics {
        duration: clock.elapsed(&stage_start),
        metrics: StageMetrics::ContourTracing {
            contour_count: contours.len(),
            total_point_count: contours.iter().map(crate::Polygon::len).sum(),
        },
    };

    // Stage 4: simplification + quadrilateral selection.
    let stage_start = clock.now();
    let simplified: Vec<crate::Polygon> = contours
        .iter()
        .map(|c| {
            simplify::simplify_closed(c, config.approx_ratio * detect::contour_perimeter(c))
        })
        .collect();
    let Some((examined, corners)) = simplified.iter().enumerate().find_map(|(i, polygon)| {
        if let &[a, b, c, d] = polygon.points() {
            Some((i + 1, [a, b, c, d]))
        } else {
            None
        }
    }) else {
        return Err(PipelineError::DocumentNotFound);
    };
    let quad = rectify::order_points(corners.map(|p| p.scaled(ratio)));
    let quad_selection = StageDiagnostics {
        duration: clock.elapsed(&stage_start),
        metrics: StageMetrics::QuadSelection {
            contours_examined: examined,
        },
    };

    // Stage 5: rectification against the full-resolution original.
    let stage_start = clock.now();
    let rectified = rectify::warp_quad(image, quad)?;
    let rectify_stage = StageDiagnostics {
        duration: clock.elapsed(&stage_start),
        metrics: StageMetrics::Rectify {
            output: Dimensions {
                width: rectified.width(),
                height: rectified.height(),
            },
        },
    };

    // Stage 6: scan cleanup.
    let stage_start = clock.now();
    let scan = enhance::enhance(&rectified, enhance::EnhancePolicy::ScanCleanup);
    let enhance_stage = StageDiagnostics {
        duration: clock.elapsed(&stage_start),
        metrics: StageMetrics::Enhance {
            output: Dimensions {
                width: scan.width(),
                height: scan.height(),
            },
        },
    };

    let diagnostics = ScanDiagnostics {
        downscale,
        edge_map,
        contour_tracing,
        quad_selection,
        rectify: rectify_stage,
        enhance: enhance_stage,
        total_duration: clock.elapsed(&start),
    };
    let staged = StagedScan {
        working,
        edges,
        contours,
        simplified,
        quad,
        rectified,
        scan,
        dimensions,
    };
    Ok((staged, diagnostics))
}
