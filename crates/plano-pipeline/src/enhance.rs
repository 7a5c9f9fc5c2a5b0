//! Scan enhancement: adaptive thresholding policies.
//!
//! Two independent enhancement policies over a color input, selected by
//! caller intent through [`EnhancePolicy`]:
//!
//! - [`ScanCleanup`](EnhancePolicy::ScanCleanup): adaptive mean
//!   thresholding followed by a light blur to soften binarization
//!   artifacts. Applied to rectified documents by the full pipeline.
//! - [`Legibility`](EnhancePolicy::Legibility): pre-blur, adaptive
//!   Gaussian thresholding over a wide neighborhood, and a 1-pixel
//!   dilation. Tuned for making faint text readable.
//!
//! The per-pixel threshold is the local neighborhood mean minus a
//! constant offset; pixels above it become white, the rest black.

use image::GrayImage;
use serde::{Deserialize, Serialize};

use crate::blur::{Kernel, convolve};
use crate::types::RgbImage;
use crate::{morph, preprocess};

/// Neighborhood radius of the mean threshold (9x9 block).
const CLEANUP_MEAN_RADIUS: u32 = 4;
/// Offset subtracted from the local mean for scan cleanup.
const CLEANUP_OFFSET: f64 = 15.0;
/// Kernel size of the post-threshold softening blur.
const CLEANUP_BLUR_SIZE: usize = 3;

/// Neighborhood size of the Gaussian threshold.
const LEGIBILITY_BLOCK: usize = 31;
/// Offset subtracted from the Gaussian-weighted local mean.
const LEGIBILITY_OFFSET: f64 = 10.0;
/// Kernel size of the pre-threshold noise blur.
const LEGIBILITY_BLUR_SIZE: usize = 3;

/// Sigma for a Gaussian kernel of side `size`, matching the
/// convention of deriving sigma from the block size.
#[allow(clippy::cast_precision_loss)]
const fn block_sigma(size: usize) -> f64 {
    0.3 * (((size - 1) as f64) * 0.5 - 1.0) + 0.8
}

/// Enhancement policy, selected by caller intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EnhancePolicy {
    /// Binarize a rectified scan and soften the result.
    #[default]
    ScanCleanup,
    /// Emphasize faint strokes for readability.
    Legibility,
}

/// Enhance a color image under the given policy.
///
/// Both policies reduce to intensity first and produce a
/// single-channel image with the same spatial dimensions as the input.
#[must_use = "returns the enhanced image"]
pub fn enhance(image: &RgbImage, policy: EnhancePolicy) -> GrayImage {
    let gray = preprocess::luma(image);
    match policy {
        EnhancePolicy::ScanCleanup => scan_cleanup(&gray),
        EnhancePolicy::Legibility => legibility(&gray),
    }
}

/// Scan cleanup over an intensity image: 9x9 adaptive mean threshold
/// (offset 15), then a 3x3 Gaussian blur.
#[must_use = "returns the cleaned image"]
pub fn scan_cleanup(gray: &GrayImage) -> GrayImage {
    let binary = adaptive_mean_threshold(gray, CLEANUP_MEAN_RADIUS, CLEANUP_OFFSET);
    let kernel = Kernel::gaussian_unchecked(CLEANUP_BLUR_SIZE, block_sigma(CLEANUP_BLUR_SIZE));
    convolve(&binary, &kernel)
}

/// Legibility enhancement over an intensity image: 3x3 Gaussian blur,
/// 31x31 adaptive Gaussian threshold (offset 10), 1-pixel dilation.
#[must_use = "returns the enhanced image"]
pub fn legibility(gray: &GrayImage) -> GrayImage {
    let kernel = Kernel::gaussian_unchecked(LEGIBILITY_BLUR_SIZE, block_sigma(LEGIBILITY_BLUR_SIZE));
    let blurred = convolve(gray, &kernel);
    let binary = adaptive_gaussian_threshold(
        &blurred,
        LEGIBILITY_BLOCK,
        block_sigma(LEGIBILITY_BLOCK),
        LEGIBILITY_OFFSET,
    );
    morph::dilate(&binary, &morph::StructuringElement::ellipse(3))
}

/// Binarize with a per-pixel threshold of `local mean - offset`.
///
/// The local mean is taken over the square window of the given radius,
/// clamped to the image bounds, via a summed-area table.
#[must_use = "returns the binarized image"]
pub fn adaptive_mean_threshold(gray: &GrayImage, radius: u32, offset: f64) -> GrayImage {
    let integral = integral_image(gray);
    let (w, h) = gray.dimensions();
    GrayImage::from_fn(w, h, |x, y| {
        let mean = region_mean(&integral, w, h, x, y, radius);
        binarize(gray.get_pixel(x, y).0[0], mean - offset)
    })
}

/// Binarize with a per-pixel threshold of `Gaussian-weighted local
/// mean - offset`.
///
/// The weighted mean is the zero-padded convolution of the image with
/// a normalized Gaussian, so border pixels see a darker mean than an
/// edge-replicating variant would produce.
#[must_use = "returns the binarized image"]
pub fn adaptive_gaussian_threshold(
    gray: &GrayImage,
    block: usize,
    sigma: f64,
    offset: f64,
) -> GrayImage {
    let kernel = Kernel::gaussian_unchecked(block | 1, sigma.max(f64::MIN_POSITIVE));
    let weighted_mean = convolve(gray, &kernel);
    let (w, h) = gray.dimensions();
    GrayImage::from_fn(w, h, |x, y| {
        let mean = f64::from(weighted_mean.get_pixel(x, y).0[0]);
        binarize(gray.get_pixel(x, y).0[0], mean - offset)
    })
}

/// Threshold a single sample: above the threshold is white.
const fn binarize(value: u8, threshold: f64) -> image::Luma<u8> {
    if value as f64 > threshold {
        image::Luma([255])
    } else {
        image::Luma([0])
    }
}

/// Summed-area table with a zero top/left border.
///
/// `table[(y + 1) * (w + 1) + (x + 1)]` holds the sum of all samples in
/// the rectangle from the origin through `(x, y)` inclusive.
fn integral_image(gray: &GrayImage) -> Vec<u64> {
    let (w, h) = gray.dimensions();
    let stride = (w + 1) as usize;
    let mut table = vec![0u64; stride * (h + 1) as usize];

    for y in 0..h {
        let mut row_sum = 0u64;
        for x in 0..w {
            row_sum += u64::from(gray.get_pixel(x, y).0[0]);
            let idx = (y + 1) as usize * stride + (x + 1) as usize;
            let above = y as usize * stride + (x + 1) as usize;
            table[idx] = row_sum + table[above];
        }
    }
    table
}

/// Mean sample value in the radius-window around `(cx, cy)`, clamped
/// to the image bounds.
#[allow(clippy::cast_precision_loss)]
fn region_mean(integral: &[u64], w: u32, h: u32, cx: u32, cy: u32, radius: u32) -> f64 {
    let stride = (w + 1) as usize;
    let x1 = cx.saturating_sub(radius) as usize;
    let y1 = cy.saturating_sub(radius) as usize;
    let x2 = ((cx + radius + 1) as usize).min(w as usize);
    let y2 = ((cy + radius + 1) as usize).min(h as usize);

    let area = ((x2 - x1) * (y2 - y1)) as f64;
    let sum = integral[y2 * stride + x2] as f64 - integral[y1 * stride + x2] as f64
        - integral[y2 * stride + x1] as f64
        + integral[y1 * stride + x1] as f64;
    sum / area
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgb};

    fn is_binary(image: &GrayImage) -> bool {
        image.pixels().all(|p| p.0[0] == 0 || p.0[0] == 255)
    }

    #[test]
    fn block_sigma_matches_reference_values() {
        assert!((block_sigma(3) - 0.8).abs() < 1e-12);
        assert!((block_sigma(31) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn integral_image_sums_match_brute_force() {
        let img = GrayImage::from_fn(5, 4, |x, y| Luma([u8::try_from(x + 3 * y).unwrap_or(0)]));
        let integral = integral_image(&img);
        let mean = region_mean(&integral, 5, 4, 2, 2, 1);
        // 3x3 window centered at (2,2): values x + 3y for x in 1..=3, y in 1..=3.
        let brute: f64 = (1..=3)
            .flat_map(|y| (1..=3).map(move |x| f64::from(u8::try_from(x + 3 * y).unwrap_or(0))))
            .sum::<f64>()
            / 9.0;
        assert!((mean - brute).abs() < 1e-9);
    }

    #[test]
    fn region_mean_clamps_at_borders() {
        let img = GrayImage::from_pixel(4, 4, Luma([100]));
        let integral = integral_image(&img);
        // Window extends past the corner; the mean of in-bounds samples
        // is still exactly 100.
        let mean = region_mean(&integral, 4, 4, 0, 0, 2);
        assert!((mean - 100.0).abs() < 1e-9);
    }

    #[test]
    fn uniform_image_thresholds_to_white() {
        // Every pixel sits exactly offset above its local threshold.
        let img = GrayImage::from_pixel(12, 12, Luma([128]));
        let binary = adaptive_mean_threshold(&img, 4, 15.0);
        assert!(binary.pixels().all(|p| p.0[0] == 255));
    }

    #[test]
    fn dark_stroke_on_light_background_goes_black() {
        let mut img = GrayImage::from_pixel(20, 20, Luma([220]));
        for y in 8..12 {
            img.put_pixel(10, y, Luma([20]));
        }
        let binary = adaptive_mean_threshold(&img, 4, 15.0);
        assert!(is_binary(&binary));
        assert_eq!(binary.get_pixel(10, 10).0[0], 0, "stroke must binarize dark");
        assert_eq!(binary.get_pixel(2, 2).0[0], 255, "background must stay white");
    }

    #[test]
    fn gaussian_threshold_is_binary_and_separates_stroke() {
        let mut img = GrayImage::from_pixel(40, 40, Luma([200]));
        for y in 15..25 {
            for x in 19..22 {
                img.put_pixel(x, y, Luma([30]));
            }
        }
        let binary = adaptive_gaussian_threshold(&img, 31, block_sigma(31), 10.0);
        assert!(is_binary(&binary));
        assert_eq!(binary.get_pixel(20, 20).0[0], 0);
    }

    #[test]
    fn enhance_preserves_dimensions_for_both_policies() {
        let img = RgbImage::from_pixel(23, 17, Rgb([180, 180, 180]));
        for policy in [EnhancePolicy::ScanCleanup, EnhancePolicy::Legibility] {
            let out = enhance(&img, policy);
            assert_eq!(out.dimensions(), (23, 17), "{policy:?}");
        }
    }

    #[test]
    fn scan_cleanup_softens_binarization() {
        // After the 3x3 blur, a pixel adjacent to a black/white boundary
        // holds an intermediate value.
        let mut img = GrayImage::from_pixel(20, 20, Luma([220]));
        for y in 5..15 {
            for x in 9..12 {
                img.put_pixel(x, y, Luma([20]));
            }
        }
        let cleaned = scan_cleanup(&img);
        assert_eq!(cleaned.dimensions(), (20, 20));
        let boundary = cleaned.get_pixel(8, 10).0[0];
        assert!(
            boundary > 0 && boundary < 255,
            "expected softened boundary, got {boundary}",
        );
    }

    #[test]
    fn legibility_output_is_binary() {
        let img = RgbImage::from_pixel(34, 34, Rgb([210, 210, 210]));
        let out = enhance(&img, EnhancePolicy::Legibility);
        assert!(is_binary(&out));
    }

    #[test]
    fn default_policy_is_scan_cleanup() {
        assert_eq!(EnhancePolicy::default(), EnhancePolicy::ScanCleanup);
    }
}
