//! Perspective rectification: corner ordering and four-point warp.
//!
//! Maps the detected document quadrilateral onto an axis-aligned
//! rectangle sized from the quadrilateral's own edge lengths. The
//! homography is solved from the 4 corner correspondences as an
//! 8-unknown linear system and applied by inverse-mapping every
//! destination pixel into source space with bilinear sampling.

use crate::resample::sample_bilinear;
use crate::types::{PipelineError, Point, Quad, RgbImage};

/// Numeric floor below which a pivot or homogeneous divisor is treated
/// as zero.
const EPS: f64 = 1e-9;

/// Order four unordered corners into a [`Quad`].
///
/// The points are stable-sorted by x-coordinate and split into a left
/// and a right pair. Within the left pair the smaller y is top-left,
/// the other bottom-left. Of the right pair, the point with the larger
/// Euclidean distance from top-left is bottom-right and the nearer one
/// top-right (top-right sits closer to top-left than bottom-right does
/// for a roughly axis-aligned quadrilateral).
///
/// Known limitation: the distance-based right-pair disambiguation can
/// mis-order near-square or diagonally-rotated quadrilaterals. The
/// behavior is kept as-is for compatibility with existing detections.
#[must_use]
pub fn order_points(points: [Point; 4]) -> Quad {
    let mut sorted = points;
    sorted.sort_by(|a, b| a.x.partial_cmp(&b.x).unwrap_or(std::cmp::Ordering::Equal));

    let mut left = [sorted[0], sorted[1]];
    left.sort_by(|a, b| a.y.partial_cmp(&b.y).unwrap_or(std::cmp::Ordering::Equal));
    let (top_left, bottom_left) = (left[0], left[1]);

    let right = [sorted[2], sorted[3]];
    let (bottom_right, top_right) =
        if top_left.distance_squared(right[0]) > top_left.distance_squared(right[1]) {
            (right[0], right[1])
        } else {
            (right[1], right[0])
        };

    Quad {
        top_left,
        top_right,
        bottom_right,
        bottom_left,
    }
}

/// A 3x3 homogeneous transform between two image planes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Homography {
    m: [[f64; 3]; 3],
}

impl Homography {
    /// Solve the homography mapping each `from[i]` onto `to[i]`.
    ///
    /// Sets up the 8-unknown linear system implied by the four
    /// correspondences and solves it by Gaussian elimination with
    /// partial pivoting. Returns `None` when the system is singular
    /// (degenerate correspondences).
    #[must_use]
    pub fn from_correspondences(from: [Point; 4], to: [Point; 4]) -> Option<Self> {
        // Rows for x' = (a x + b y + c) / (g x + h y + 1) and
        // y' = (d x + e y + f) / (g x + h y + 1).
        let mut system = [[0.0f64; 9]; 8];
        for (i, (&src, &dst)) in from.iter().zip(to.iter()).enumerate() {
            system[2 * i] = [
                src.x,
                src.y,
                1.0,
                0.0,
                0.0,
                0.0,
                -src.x * dst.x,
                -src.y * dst.x,
                dst.x,
            ];
            system[2 * i + 1] = [
                0.0,
                0.0,
                0.0,
                src.x,
                src.y,
                1.0,
                -src.x * dst.y,
                -src.y * dst.y,
                dst.y,
            ];
        }

        let coeffs = solve(&mut system)?;
        let [a, b, c, d, e, f, g, h] = coeffs;
        Some(Self {
            m: [[a, b, c], [d, e, f], [g, h, 1.0]],
        })
    }

    /// Apply the transform to a point with perspective divide.
    ///
    /// Returns `None` when the homogeneous coordinate vanishes or the
    /// result is non-finite.
    #[must_use]
    pub fn apply(&self, point: Point) -> Option<Point> {
        let w = self.m[2][0].mul_add(point.x, self.m[2][1].mul_add(point.y, self.m[2][2]));
        if !w.is_finite() || w.abs() <= EPS {
            return None;
        }
        let x = self.m[0][0].mul_add(point.x, self.m[0][1].mul_add(point.y, self.m[0][2])) / w;
        let y = self.m[1][0].mul_add(point.x, self.m[1][1].mul_add(point.y, self.m[1][2])) / w;
        if x.is_finite() && y.is_finite() {
            Some(Point::new(x, y))
        } else {
            None
        }
    }
}

/// Solve an 8x8 augmented linear system in place.
///
/// Gaussian elimination with partial pivoting; `None` if a pivot
/// collapses below [`EPS`].
fn solve(system: &mut [[f64; 9]; 8]) -> Option<[f64; 8]> {
    for col in 0..8 {
        let pivot_row = (col..8).max_by(|&a, &b| {
            system[a][col]
                .abs()
                .partial_cmp(&system[b][col].abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        })?;
        if system[pivot_row][col].abs() < EPS {
            return None;
        }
        system.swap(col, pivot_row);

        for row in (col + 1)..8 {
            let factor = system[row][col] / system[col][col];
            for k in col..9 {
                system[row][k] -= factor * system[col][k];
            }
        }
    }

    let mut result = [0.0f64; 8];
    for row in (0..8).rev() {
        let mut value = system[row][8];
        for k in (row + 1)..8 {
            value -= system[row][k] * result[k];
        }
        result[row] = value / system[row][row];
    }
    Some(result)
}

/// Rectify the region bounded by four corner points into an
/// axis-aligned rectangle.
///
/// The destination width is the larger of the two horizontal edge
/// lengths and the height the larger of the two vertical edge lengths,
/// each floored to an integer. Every destination pixel is
/// inverse-mapped through the homography into source space and
/// bilinear-sampled.
///
/// # Errors
///
/// Returns [`PipelineError::DegenerateGeometry`] when the computed
/// width or height is zero, or the corner correspondence system is
/// singular; [`PipelineError::InvalidImage`] for a zero-dimension
/// source.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn four_point_transform(
    image: &RgbImage,
    points: [Point; 4],
) -> Result<RgbImage, PipelineError> {
    let quad = order_points(points);
    warp_quad(image, quad)
}

/// Rectify an already-ordered quadrilateral. See
/// [`four_point_transform`].
///
/// # Errors
///
/// Returns [`PipelineError::DegenerateGeometry`] as
/// [`four_point_transform`] does.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn warp_quad(image: &RgbImage, quad: Quad) -> Result<RgbImage, PipelineError> {
    if image.width() == 0 || image.height() == 0 {
        return Err(PipelineError::InvalidImage);
    }
    let width_bottom = quad.bottom_left.distance(quad.bottom_right);
    let width_top = quad.top_left.distance(quad.top_right);
    let max_width = width_bottom.max(width_top).floor() as u32;

    let height_right = quad.top_right.distance(quad.bottom_right);
    let height_left = quad.top_left.distance(quad.bottom_left);
    let max_height = height_right.max(height_left).floor() as u32;

    if max_width == 0 || max_height == 0 {
        return Err(PipelineError::DegenerateGeometry);
    }

    let destination = [
        Point::new(0.0, 0.0),
        Point::new(f64::from(max_width - 1), 0.0),
        Point::new(f64::from(max_width - 1), f64::from(max_height - 1)),
        Point::new(0.0, f64::from(max_height - 1)),
    ];

    // Solve destination -> source so the warp loop inverse-maps
    // directly without a matrix inversion.
    let homography = Homography::from_correspondences(destination, quad.corners())
        .ok_or(PipelineError::DegenerateGeometry)?;

    let black = image::Rgb([0, 0, 0]);
    Ok(RgbImage::from_fn(max_width, max_height, |x, y| {
        homography
            .apply(Point::new(f64::from(x), f64::from(y)))
            .map_or(black, |src| sample_bilinear(image, src.x, src.y))
    }))
}
