//! Shared types for the plano document scanning pipeline.

use serde::{Deserialize, Serialize};

/// Re-export `GrayImage` so downstream crates can reference
/// intermediate raster data without depending on `image` directly.
pub use image::GrayImage;

/// Re-export `RgbImage` so downstream crates can reference the
/// decoded color image without depending on `image` directly.
pub use image::RgbImage;

/// A 2D point in image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal position (pixels from left edge).
    pub x: f64,
    /// Vertical position (pixels from top edge).
    pub y: f64,
}

impl Point {
    /// Create a new point.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Squared Euclidean distance to another point.
    ///
    /// Avoids the square root for comparison purposes.
    #[must_use]
    pub fn distance_squared(self, other: Self) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx.mul_add(dx, dy * dy)
    }

    /// Euclidean distance to another point.
    #[must_use]
    pub fn distance(self, other: Self) -> f64 {
        self.distance_squared(other).sqrt()
    }

    /// Scale both coordinates by a uniform factor.
    ///
    /// Used to map working-resolution detections back to original
    /// image coordinates.
    #[must_use]
    pub fn scaled(self, factor: f64) -> Self {
        Self::new(self.x * factor, self.y * factor)
    }
}

/// An ordered sequence of points describing a closed boundary curve.
///
/// The closing segment (last point back to first) is implicit; points
/// are not required to be unique.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polygon(Vec<Point>);

impl Polygon {
    /// Create a new polygon from a vector of points.
    #[must_use]
    pub const fn new(points: Vec<Point>) -> Self {
        Self(points)
    }

    /// Returns `true` if the polygon has no points.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the number of vertices.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns a slice of all vertices.
    #[must_use]
    pub fn points(&self) -> &[Point] {
        &self.0
    }

    /// Consumes the polygon and returns the underlying vertex vector.
    #[must_use]
    pub fn into_points(self) -> Vec<Point> {
        self.0
    }
}

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

/// A document boundary quadrilateral with corners in fixed clockwise
/// order starting at the top-left.
///
/// Produced by [`rectify::order_points`](crate::rectify::order_points);
/// construct through that function rather than by hand so the corner
/// labels actually hold.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quad {
    /// Corner nearest the image origin.
    pub top_left: Point,
    /// Corner clockwise from top-left.
    pub top_right: Point,
    /// Corner diagonal from top-left.
    pub bottom_right: Point,
    /// Corner counter-clockwise from top-left.
    pub bottom_left: Point,
}

impl Quad {
    /// Corners in traversal order: top-left, top-right, bottom-right,
    /// bottom-left.
    #[must_use]
    pub const fn corners(self) -> [Point; 4] {
        [
            self.top_left,
            self.top_right,
            self.bottom_right,
            self.bottom_left,
        ]
    }

    /// Scale all corners by a uniform factor.
    #[must_use]
    pub fn scaled(self, factor: f64) -> Self {
        Self {
            top_left: self.top_left.scaled(factor),
            top_right: self.top_right.scaled(factor),
            bottom_right: self.bottom_right.scaled(factor),
            bottom_left: self.bottom_left.scaled(factor),
        }
    }
}

/// Configuration for the document scanning pipeline.
///
/// All parameters have defaults matching the `DEFAULT_*` associated
/// constants. Fields are public; values outside the documented ranges
/// are clamped where a stage would otherwise misbehave (see
/// [`preprocess::edge_map`](crate::preprocess::edge_map)).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Working height in pixels for boundary detection. The input is
    /// downscaled so detection runs on a small, fixed-size grid; the
    /// detected corners are scaled back to original coordinates.
    pub working_height: u32,

    /// Canny low hysteresis threshold. Gradient magnitudes between
    /// `canny_low` and `canny_high` count as edges only when connected
    /// to a strong edge.
    pub canny_low: f32,

    /// Canny high hysteresis threshold. Gradient magnitudes above this
    /// are definite edges.
    pub canny_high: f32,

    /// Side length of the elliptical structuring element used for
    /// morphological open/close during preprocessing. Must be odd.
    pub morph_size: usize,

    /// Side length of the Gaussian smoothing kernel applied before
    /// edge detection. Must be odd.
    pub smooth_size: usize,

    /// Sigma of the Gaussian smoothing kernel.
    pub smooth_sigma: f64,

    /// Polygon approximation tolerance as a fraction of contour
    /// perimeter. Higher values collapse more vertices.
    pub approx_ratio: f64,
}

impl ScanConfig {
    /// Default working height for boundary detection.
    pub const DEFAULT_WORKING_HEIGHT: u32 = 500;
    /// Default Canny low threshold.
    pub const DEFAULT_CANNY_LOW: f32 = 75.0;
    /// Default Canny high threshold.
    pub const DEFAULT_CANNY_HIGH: f32 = 100.0;
    /// Default structuring element size for open/close.
    pub const DEFAULT_MORPH_SIZE: usize = 5;
    /// Default Gaussian smoothing kernel size.
    pub const DEFAULT_SMOOTH_SIZE: usize = 7;
    /// Default Gaussian smoothing sigma.
    pub const DEFAULT_SMOOTH_SIGMA: f64 = 1.4;
    /// Default approximation tolerance as a perimeter fraction.
    pub const DEFAULT_APPROX_RATIO: f64 = 0.02;
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            working_height: Self::DEFAULT_WORKING_HEIGHT,
            canny_low: Self::DEFAULT_CANNY_LOW,
            canny_high: Self::DEFAULT_CANNY_HIGH,
            morph_size: Self::DEFAULT_MORPH_SIZE,
            smooth_size: Self::DEFAULT_SMOOTH_SIZE,
            smooth_sigma: Self::DEFAULT_SMOOTH_SIGMA,
            approx_ratio: Self::DEFAULT_APPROX_RATIO,
        }
    }
}

/// Result of running the full scanning pipeline.
#[derive(Debug, Clone)]
pub struct ScanResult {
    /// The rectified, cleanup-enhanced scan.
    pub scan: GrayImage,
    /// The detected document boundary in original image coordinates.
    pub quad: Quad,
    /// Dimensions of the source image in pixels.
    pub dimensions: Dimensions,
}

/// Result of running the pipeline with all intermediate stage outputs
/// preserved.
///
/// Each field captures the output of one logical pipeline stage,
/// letting diagnostic consumers inspect every step of the chain.
#[derive(Debug, Clone)]
pub struct StagedScan {
    /// Stage 1: working-resolution downscale of the input.
    pub working: RgbImage,
    /// Stage 2: binary edge map (post morphology + smoothing + Canny).
    pub edges: GrayImage,
    /// Stage 3: traced contours, sorted by enclosed area descending.
    pub contours: Vec<Polygon>,
    /// Stage 4: perimeter-proportional simplification of each contour.
    pub simplified: Vec<Polygon>,
    /// Stage 5: selected document boundary in original coordinates.
    pub quad: Quad,
    /// Stage 6: perspective-rectified document.
    pub rectified: RgbImage,
    /// Stage 7: cleanup-enhanced scan.
    pub scan: GrayImage,
    /// Source image dimensions in pixels.
    pub dimensions: Dimensions,
}

/// Errors that can occur during pipeline processing.
///
/// All are detected synchronously and are terminal for the single
/// operation; no stage leaves partially-written output behind.
#[derive(Debug, Clone, PartialEq, thiserror::Error, Serialize, Deserialize)]
pub enum PipelineError {
    /// The input buffer has a zero dimension.
    #[error("input image has zero width or height")]
    InvalidImage,

    /// No traced contour simplified to exactly four vertices.
    #[error("no document boundary found among traced contours")]
    DocumentNotFound,

    /// The rectification target collapsed to zero width or height, or
    /// the corner correspondence system was singular.
    #[error("detected quadrilateral is degenerate")]
    DegenerateGeometry,

    /// A resize target dimension was zero.
    #[error("resize target must be non-zero, got {width}x{height}")]
    InvalidDimensions {
        /// Requested output width.
        width: u32,
        /// Requested output height.
        height: u32,
    },

    /// A kernel was requested with an even or zero size, or a
    /// non-positive sigma.
    #[error("kernel size must be odd and positive with sigma > 0, got size {size}, sigma {sigma}")]
    InvalidKernelParameters {
        /// Requested kernel side length.
        size: usize,
        /// Requested Gaussian sigma.
        sigma: f64,
    },
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn point_distance() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(3.0, 4.0);
        assert!((a.distance_squared(b) - 25.0).abs() < f64::EPSILON);
        assert!((a.distance(b) - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn point_distance_to_self_is_zero() {
        let p = Point::new(7.0, 11.0);
        assert!(p.distance(p).abs() < f64::EPSILON);
    }

    #[test]
    fn point_scaled() {
        let p = Point::new(2.0, -3.0).scaled(2.5);
        assert_eq!(p, Point::new(5.0, -7.5));
    }

    #[test]
    fn polygon_accessors() {
        let points = vec![Point::new(0.0, 0.0), Point::new(1.0, 1.0)];
        let poly = Polygon::new(points.clone());
        assert_eq!(poly.len(), 2);
        assert!(!poly.is_empty());
        assert_eq!(poly.points(), &points);
        assert_eq!(poly.into_points(), points);
    }

    #[test]
    fn polygon_empty() {
        let poly = Polygon::new(vec![]);
        assert!(poly.is_empty());
        assert_eq!(poly.len(), 0);
    }

    #[test]
    fn quad_corners_order() {
        let quad = Quad {
            top_left: Point::new(0.0, 0.0),
            top_right: Point::new(10.0, 0.0),
            bottom_right: Point::new(10.0, 10.0),
            bottom_left: Point::new(0.0, 10.0),
        };
        assert_eq!(
            quad.corners(),
            [
                Point::new(0.0, 0.0),
                Point::new(10.0, 0.0),
                Point::new(10.0, 10.0),
                Point::new(0.0, 10.0),
            ],
        );
    }

    #[test]
    fn quad_scaled_scales_every_corner() {
        let quad = Quad {
            top_left: Point::new(1.0, 1.0),
            top_right: Point::new(2.0, 1.0),
            bottom_right: Point::new(2.0, 2.0),
            bottom_left: Point::new(1.0, 2.0),
        };
        let scaled = quad.scaled(3.0);
        assert_eq!(scaled.top_left, Point::new(3.0, 3.0));
        assert_eq!(scaled.bottom_right, Point::new(6.0, 6.0));
    }

    #[test]
    fn config_defaults_match_consts() {
        let config = ScanConfig::default();
        assert_eq!(config.working_height, ScanConfig::DEFAULT_WORKING_HEIGHT);
        assert!((config.canny_low - ScanConfig::DEFAULT_CANNY_LOW).abs() < f32::EPSILON);
        assert!((config.canny_high - ScanConfig::DEFAULT_CANNY_HIGH).abs() < f32::EPSILON);
        assert_eq!(config.morph_size, ScanConfig::DEFAULT_MORPH_SIZE);
        assert_eq!(config.smooth_size, ScanConfig::DEFAULT_SMOOTH_SIZE);
        assert!((config.smooth_sigma - ScanConfig::DEFAULT_SMOOTH_SIGMA).abs() < f64::EPSILON);
        assert!((config.approx_ratio - ScanConfig::DEFAULT_APPROX_RATIO).abs() < f64::EPSILON);
    }

    #[test]
    fn config_serde_round_trip() {
        let config = ScanConfig {
            working_height: 320,
            canny_low: 30.0,
            canny_high: 90.0,
            morph_size: 3,
            smooth_size: 5,
            smooth_sigma: 1.1,
            approx_ratio: 0.05,
        };
        let json = serde_json::to_string(&config).unwrap();
        let deserialized: ScanConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, deserialized);
    }

    #[test]
    fn error_display_messages() {
        assert_eq!(
            PipelineError::DocumentNotFound.to_string(),
            "no document boundary found among traced contours",
        );
        assert_eq!(
            PipelineError::InvalidDimensions {
                width: 0,
                height: 5,
            }
            .to_string(),
            "resize target must be non-zero, got 0x5",
        );
    }

    #[test]
    fn error_serde_round_trip() {
        let err = PipelineError::InvalidKernelParameters {
            size: 4,
            sigma: -1.0,
        };
        let json = serde_json::to_string(&err).unwrap();
        let deserialized: PipelineError = serde_json::from_str(&json).unwrap();
        assert_eq!(err, deserialized);
    }
}
