//! Closed-contour simplification via Ramer-Douglas-Peucker.
//!
//! Reduces a traced boundary ring to a minimal polygon by repeatedly
//! dropping vertices whose perpendicular deviation from the chord
//! between their neighbors is below a tolerance.
//!
//! A ring has no natural endpoints, so the curve is first split at its
//! two mutually-farthest vertices; those anchors land on genuine
//! extremes of the shape (for a document boundary, opposite corners),
//! and each half is then simplified as an open chain.

use crate::types::{Point, Polygon};

/// Simplify a closed boundary ring.
///
/// Vertices within `tolerance` pixels of the chord between their
/// retained neighbors are removed. Rings with fewer than 4 vertices
/// are returned unchanged; a ring of coincident points collapses to a
/// single vertex.
#[must_use = "returns the simplified polygon"]
pub fn simplify_closed(polygon: &Polygon, tolerance: f64) -> Polygon {
    let points = polygon.points();
    if points.len() < 4 {
        return polygon.clone();
    }

    let first_anchor = farthest_from(points, points[0]);
    let second_anchor = farthest_from(points, points[first_anchor]);
    let (lo, hi) = if first_anchor < second_anchor {
        (first_anchor, second_anchor)
    } else {
        (second_anchor, first_anchor)
    };
    if lo == hi {
        // Every vertex coincides; nothing to anchor on.
        return Polygon::new(vec![points[lo]]);
    }

    // Two open chains covering the ring: lo..=hi and hi..-wrap-..lo.
    let chain_a: Vec<Point> = points[lo..=hi].to_vec();
    let mut chain_b: Vec<Point> = points[hi..].to_vec();
    chain_b.extend_from_slice(&points[..=lo]);

    let mut simplified = simplify_chain(&chain_a, tolerance);
    let tail = simplify_chain(&chain_b, tolerance);
    // Both chain endpoints are the shared anchors; keep each once.
    simplified.extend_from_slice(&tail[1..tail.len() - 1]);

    Polygon::new(simplified)
}

/// Index of the point farthest from `origin`.
fn farthest_from(points: &[Point], origin: Point) -> usize {
    let mut best = 0;
    let mut best_dist = 0.0;
    for (i, &p) in points.iter().enumerate() {
        let d = origin.distance_squared(p);
        if d > best_dist {
            best_dist = d;
            best = i;
        }
    }
    best
}

/// Simplify an open chain, always keeping both endpoints.
fn simplify_chain(points: &[Point], tolerance: f64) -> Vec<Point> {
    let mut kept = vec![false; points.len()];
    kept[0] = true;
    kept[points.len() - 1] = true;

    rdp_recurse(points, 0, points.len() - 1, tolerance, &mut kept);

    points
        .iter()
        .zip(&kept)
        .filter(|&(_, k)| *k)
        .map(|(&p, _)| p)
        .collect()
}

/// Recursive step of the Ramer-Douglas-Peucker algorithm.
///
/// Finds the point between `start` and `end` that is farthest from the
/// chord between them. If that distance exceeds `tolerance`, the point
/// is kept and both sub-chains are processed recursively.
fn rdp_recurse(points: &[Point], start: usize, end: usize, tolerance: f64, kept: &mut [bool]) {
    if end <= start + 1 {
        return;
    }

    let mut max_dist = 0.0;
    let mut max_idx = start;
    for i in (start + 1)..end {
        let d = perpendicular_distance(points[i], points[start], points[end]);
        if d > max_dist {
            max_dist = d;
            max_idx = i;
        }
    }

    if max_dist > tolerance {
        kept[max_idx] = true;
        rdp_recurse(points, start, max_idx, tolerance, kept);
        rdp_recurse(points, max_idx, end, tolerance, kept);
    }
}

/// Perpendicular distance from point `p` to the line through `a` and `b`.
///
/// Uses `|cross(b-a, p-a)| / |b-a|`; when `a` and `b` coincide, falls
/// back to the point-to-point distance.
fn perpendicular_distance(p: Point, a: Point, b: Point) -> f64 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let length_sq = dx.mul_add(dx, dy * dy);

    if length_sq == 0.0 {
        return p.distance(a);
    }

    let cross = dx.mul_add(a.y - p.y, -(dy * (a.x - p.x)));
    cross.abs() / length_sq.sqrt()
}
