//! Line and contour rasterization for diagnostic overlays.
//!
//! Lines are traced with Bresenham's integer error-accumulation
//! algorithm: the dominant axis advances in unit steps while error
//! proportional to the minor-axis delta accumulates, stepping the minor
//! axis when the error crosses the dominant-axis delta. No
//! floating-point slope division is involved.
//!
//! Pixels outside the image are skipped rather than panicking, so
//! overlays for geometry that extends past the frame are safe to draw.

use image::{ImageBuffer, Pixel};

use crate::types::Point;

/// Draw a straight line from `start` to `end` inclusive.
///
/// Every pixel visited by the Bresenham trace, including both
/// endpoints, is set to `color`. A `thickness` greater than 1 stamps a
/// `thickness x thickness` neighborhood centered on each visited pixel.
pub fn draw_line_mut<P>(
    image: &mut ImageBuffer<P, Vec<u8>>,
    start: (i64, i64),
    end: (i64, i64),
    color: P,
    thickness: u32,
) where
    P: Pixel<Subpixel = u8>,
{
    let (mut x, mut y) = start;
    let (x2, y2) = end;
    let dx = (x2 - x).abs();
    let dy = (y2 - y).abs();
    let sx = if x > x2 { -1 } else { 1 };
    let sy = if y > y2 { -1 } else { 1 };
    let mut err = dx - dy;

    loop {
        stamp(image, x, y, color, thickness);
        if x == x2 && y == y2 {
            break;
        }
        let e2 = 2 * err;
        if e2 > -dy {
            err -= dy;
            x += sx;
        }
        if e2 < dx {
            err += dx;
            y += sy;
        }
    }
}

/// Draw a polygon by connecting consecutive points with lines.
///
/// Fractional coordinates are rounded to the nearest pixel. When
/// `close` is set the last point is connected back to the first.
pub fn draw_polygon_mut<P>(
    image: &mut ImageBuffer<P, Vec<u8>>,
    points: &[Point],
    color: P,
    thickness: u32,
    close: bool,
) where
    P: Pixel<Subpixel = u8>,
{
    for pair in points.windows(2) {
        draw_line_mut(image, rounded(pair[0]), rounded(pair[1]), color, thickness);
    }
    if close && points.len() > 1 {
        draw_line_mut(
            image,
            rounded(points[points.len() - 1]),
            rounded(points[0]),
            color,
            thickness,
        );
    }
}

/// Round a sub-pixel point to integer pixel coordinates.
#[allow(clippy::cast_possible_truncation)]
fn rounded(point: Point) -> (i64, i64) {
    (point.x.round() as i64, point.y.round() as i64)
}

/// Set a single pixel, or a `thickness x thickness` block around it.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn stamp<P>(image: &mut ImageBuffer<P, Vec<u8>>, x: i64, y: i64, color: P, thickness: u32)
where
    P: Pixel<Subpixel = u8>,
{
    let (w, h) = image.dimensions();
    let t = i64::from(thickness.max(1));
    let half = t / 2;
    for oy in -half..(t - half) {
        for ox in -half..(t - half) {
            let (px, py) = (x + ox, y + oy);
            if px >= 0 && py >= 0 && px < i64::from(w) && py < i64::from(h) {
                image.put_pixel(px as u32, py as u32, color);
            }
        }
    }
}
