//! Simple stateless image effects: grayscale, sepia, invert, rotate.
//!
//! Effects are single-pass transforms with no failure modes beyond
//! invalid input dimensions, dispatched through the closed [`Effect`]
//! enum rather than runtime type inspection.

use serde::{Deserialize, Serialize};

use crate::preprocess::luma;
use crate::resample::sample_bilinear;
use crate::types::RgbImage;

/// Sepia channel-mixing matrix, rows in R/G/B output order.
const SEPIA: [[f64; 3]; 3] = [
    [0.393, 0.769, 0.189],
    [0.349, 0.686, 0.168],
    [0.272, 0.534, 0.131],
];

/// Available color effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Effect {
    /// Weighted luma reduction, replicated across channels.
    Grayscale,
    /// Warm-toned channel mixing.
    Sepia,
    /// Per-channel complement.
    Invert,
}

/// Apply a color effect to an image.
#[must_use = "returns the transformed image"]
pub fn apply_effect(image: &RgbImage, effect: Effect) -> RgbImage {
    match effect {
        Effect::Grayscale => grayscale(image),
        Effect::Sepia => sepia(image),
        Effect::Invert => invert(image),
    }
}

/// Luma reduction replicated across all three channels.
fn grayscale(image: &RgbImage) -> RgbImage {
    let gray = luma(image);
    RgbImage::from_fn(image.width(), image.height(), |x, y| {
        let v = gray.get_pixel(x, y).0[0];
        image::Rgb([v, v, v])
    })
}

/// Fixed 3x3 channel mixing with clamping.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn sepia(image: &RgbImage) -> RgbImage {
    RgbImage::from_fn(image.width(), image.height(), |x, y| {
        let [r, g, b] = image.get_pixel(x, y).0.map(f64::from);
        let mixed = SEPIA.map(|row| {
            let v = row[0].mul_add(r, row[1].mul_add(g, row[2] * b));
            v.round().clamp(0.0, 255.0) as u8
        });
        image::Rgb(mixed)
    })
}

/// Per-channel complement.
fn invert(image: &RgbImage) -> RgbImage {
    RgbImage::from_fn(image.width(), image.height(), |x, y| {
        image::Rgb(image.get_pixel(x, y).0.map(|v| 255 - v))
    })
}

/// Rotate an image about its center by the given angle in degrees.
///
/// Positive angles rotate the content counter-clockwise. The output
/// keeps the input dimensions; destination pixels are inverse-mapped
/// through the rotation and bilinear-sampled, with uncovered regions
/// filled black. Corners that rotate out of frame are cropped.
#[must_use = "returns the rotated image"]
pub fn rotate(image: &RgbImage, angle_degrees: f64) -> RgbImage {
    let (w, h) = image.dimensions();
    if w == 0 || h == 0 {
        return image.clone();
    }
    let angle = angle_degrees.to_radians();
    let (sin, cos) = angle.sin_cos();
    let cx = f64::from(w / 2);
    let cy = f64::from(h / 2);
    // Half a pixel of slack so floating error at the frame boundary
    // does not drop edge pixels.
    let max_x = f64::from(w - 1) + 0.5;
    let max_y = f64::from(h - 1) + 0.5;

    let black = image::Rgb([0, 0, 0]);
    RgbImage::from_fn(w, h, |nx, ny| {
        let dx = f64::from(nx) - cx;
        let dy = f64::from(ny) - cy;
        let src_x = dx.mul_add(cos, -(dy * sin)) + cx;
        let src_y = dx.mul_add(sin, dy * cos) + cy;
        if src_x >= -0.5 && src_x <= max_x && src_y >= -0.5 && src_y <= max_y {
            sample_bilinear(image, src_x, src_y)
        } else {
            black
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn grayscale_replicates_luma_across_channels() {
        let img = RgbImage::from_pixel(2, 2, Rgb([100, 150, 200]));
        let gray = apply_effect(&img, Effect::Grayscale);
        // 0.2989*100 + 0.5870*150 + 0.1140*200 = 140.74 -> 141.
        for pixel in gray.pixels() {
            assert_eq!(pixel.0, [141, 141, 141]);
        }
    }

    #[test]
    fn sepia_known_values() {
        let neutral = apply_effect(&RgbImage::from_pixel(1, 1, Rgb([100, 100, 100])), Effect::Sepia);
        assert_eq!(neutral.get_pixel(0, 0).0, [135, 120, 94]);

        let white = apply_effect(&RgbImage::from_pixel(1, 1, Rgb([255, 255, 255])), Effect::Sepia);
        assert_eq!(white.get_pixel(0, 0).0, [255, 255, 239]);
    }

    #[test]
    fn invert_complements_every_channel() {
        let img = RgbImage::from_pixel(1, 1, Rgb([10, 20, 30]));
        let inverted = apply_effect(&img, Effect::Invert);
        assert_eq!(inverted.get_pixel(0, 0).0, [245, 235, 225]);
    }

    #[test]
    fn double_invert_is_identity() {
        let img = RgbImage::from_fn(4, 4, |x, y| {
            Rgb([u8::try_from(x * 60).unwrap_or(255), u8::try_from(y * 60).unwrap_or(255), 77])
        });
        let twice = apply_effect(&apply_effect(&img, Effect::Invert), Effect::Invert);
        assert_eq!(img, twice);
    }

    #[test]
    fn rotate_zero_is_identity() {
        let img = RgbImage::from_fn(7, 5, |x, y| {
            Rgb([u8::try_from(x * 30).unwrap_or(255), u8::try_from(y * 40).unwrap_or(255), 9])
        });
        assert_eq!(rotate(&img, 0.0), img);
    }

    #[test]
    fn rotate_preserves_dimensions() {
        let img = RgbImage::new(11, 6);
        assert_eq!(rotate(&img, 37.5).dimensions(), (11, 6));
    }

    #[test]
    fn rotate_quarter_turn_moves_marker_counter_clockwise() {
        let mut img = RgbImage::new(3, 3);
        img.put_pixel(2, 1, Rgb([255, 0, 0]));
        let rotated = rotate(&img, 90.0);
        // Right-middle content lands at top-middle.
        assert_eq!(rotated.get_pixel(1, 0).0, [255, 0, 0]);
        assert_eq!(rotated.get_pixel(2, 1).0, [0, 0, 0]);
    }

    #[test]
    fn rotate_crops_corners_to_black() {
        let img = RgbImage::from_pixel(10, 10, Rgb([200, 200, 200]));
        let rotated = rotate(&img, 45.0);
        // The original corners leave the frame; the new corners sample
        // outside the source and fill black.
        assert_eq!(rotated.get_pixel(0, 0).0, [0, 0, 0]);
        assert_eq!(rotated.get_pixel(9, 9).0, [0, 0, 0]);
    }
}
