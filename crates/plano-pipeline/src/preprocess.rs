//! Preprocessing: intensity reduction and edge map extraction.
//!
//! Prepares a binary edge map for contour tracing: luma reduction,
//! morphological open + close to suppress speckle noise, Gaussian
//! smoothing, then Canny edge detection with hysteresis thresholding
//! via [`imageproc::edges::canny`].

use image::GrayImage;

use crate::types::{PipelineError, RgbImage, ScanConfig};
use crate::{blur, morph};

/// Minimum allowed Canny threshold.
///
/// A threshold of zero treats every pixel with any gradient as a
/// potential edge, producing a dense edge map that overwhelms contour
/// tracing downstream.
pub const MIN_THRESHOLD: f32 = 1.0;
const _: () = assert!(MIN_THRESHOLD > 0.0);

/// Luma weights for RGB-to-intensity reduction (Rec. 601).
///
/// Green dominates, matching perceptual luminance; the weights sum
/// to 1.
const LUMA_WEIGHTS: [f64; 3] = [0.2989, 0.5870, 0.1140];

/// Reduce a color image to single-channel intensity.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
#[must_use = "returns the intensity image"]
pub fn luma(image: &RgbImage) -> GrayImage {
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        let [r, g, b] = image.get_pixel(x, y).0.map(f64::from);
        let value = LUMA_WEIGHTS[0].mul_add(r, LUMA_WEIGHTS[1].mul_add(g, LUMA_WEIGHTS[2] * b));
        image::Luma([value.round().clamp(0.0, 255.0) as u8])
    })
}

/// Extract a binary edge map suitable for contour tracing.
///
/// Chains luma reduction, morphological opening and closing with an
/// elliptical structuring element, Gaussian smoothing, and Canny edge
/// detection. Output pixels are 255 for edges and 0 for background.
///
/// Canny thresholds are clamped to at least [`MIN_THRESHOLD`] with
/// `low <= high`, so a misconfigured pair degrades instead of
/// producing a degenerate edge map.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidKernelParameters`] if the
/// configured smoothing kernel is invalid.
pub fn edge_map(image: &RgbImage, config: &ScanConfig) -> Result<GrayImage, PipelineError> {
    let gray = luma(image);

    let element = morph::StructuringElement::ellipse(config.morph_size);
    let opened = morph::open(&gray, &element);
    let closed = morph::close(&opened, &element);

    let smoothed = blur::gaussian_blur(&closed, config.smooth_size, config.smooth_sigma)?;

    let high = config.canny_high.max(MIN_THRESHOLD);
    let low = config.canny_low.max(MIN_THRESHOLD).min(high);
    Ok(imageproc::edges::canny(&smoothed, low, high))
}
