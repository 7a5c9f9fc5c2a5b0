//! Boundary detection: find the document quadrilateral in an edge map.
//!
//! Traces closed contours with Suzuki-Abe border following
//! ([`imageproc::contours::find_contours`]), orders them by enclosed
//! area (the document is assumed to be the dominant foreground shape),
//! and accepts the first contour whose perimeter-proportional
//! simplification has exactly four vertices.

use image::GrayImage;

use crate::simplify::simplify_closed;
use crate::types::{Point, Polygon};

/// Enclosed area of a closed polygon via the shoelace formula.
#[must_use]
pub fn contour_area(polygon: &Polygon) -> f64 {
    let points = polygon.points();
    let n = points.len();
    if n < 3 {
        return 0.0;
    }
    let mut twice_area = 0.0;
    for i in 0..n {
        let j = (i + 1) % n;
        twice_area += points[i].x.mul_add(points[j].y, -(points[j].x * points[i].y));
    }
    twice_area.abs() / 2.0
}

/// Perimeter of a closed polygon, including the closing segment from
/// the last vertex back to the first.
#[must_use]
pub fn contour_perimeter(polygon: &Polygon) -> f64 {
    let points = polygon.points();
    let n = points.len();
    if n < 2 {
        return 0.0;
    }
    let mut length = 0.0;
    for i in 0..n {
        length += points[i].distance(points[(i + 1) % n]);
    }
    length
}

/// Trace closed contours from a binary edge map, sorted by enclosed
/// area descending.
///
/// Contours with fewer than 2 points carry no boundary information and
/// are dropped.
#[must_use = "returns the traced contours"]
pub fn trace_contours(edges: &GrayImage) -> Vec<Polygon> {
    let contours: Vec<imageproc::contours::Contour<u32>> =
        imageproc::contours::find_contours(edges);

    let mut traced: Vec<(f64, Polygon)> = contours
        .into_iter()
        .filter(|c| c.points.len() >= 2)
        .map(|c| {
            let points = c
                .points
                .into_iter()
                .map(|p| Point::new(f64::from(p.x), f64::from(p.y)))
                .collect();
            let polygon = Polygon::new(points);
            (contour_area(&polygon), polygon)
        })
        .collect();

    traced.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
    traced.into_iter().map(|(_, polygon)| polygon).collect()
}

/// Select the document quadrilateral from area-ordered contours.
///
/// Each contour is simplified with tolerance `approx_ratio` times its
/// perimeter; the first simplification with exactly four vertices is
/// returned as an (unordered) corner set.
#[must_use]
pub fn select_document(contours: &[Polygon], approx_ratio: f64) -> Option<[Point; 4]> {
    for contour in contours {
        let tolerance = approx_ratio * contour_perimeter(contour);
        let simplified = simplify_closed(contour, tolerance);
        if let &[a, b, c, d] = simplified.points() {
            return Some([a, b, c, d]);
        }
    }
    None
}
