//! Bilinear resampling implemented from first principles.
//!
//! The pipeline depends on exact pixel-level resize behavior (border
//! clamping, rounding) both for the working-resolution downscale and
//! for the inverse-mapping warps in [`rectify`](crate::rectify) and
//! [`effects::rotate`](crate::effects::rotate), so the interpolation is
//! written out here rather than delegated to `image::imageops`.

use image::{ImageBuffer, Pixel};

use crate::types::{PipelineError, RgbImage};

/// Maximum channel count of any supported pixel type.
const MAX_CHANNELS: usize = 4;

/// Resize an image to the given dimensions using bilinear interpolation.
///
/// For every destination pixel the fractional source coordinate is
/// computed via independent per-axis `src/dst` ratios; the four integer
/// neighbors (clamped to the last valid row/column) are blended with
/// bilinear weights and the result rounded to `u8`.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidDimensions`] if `width` or `height`
/// is zero, and [`PipelineError::InvalidImage`] if the source has a
/// zero dimension.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn resize<P>(
    image: &ImageBuffer<P, Vec<u8>>,
    width: u32,
    height: u32,
) -> Result<ImageBuffer<P, Vec<u8>>, PipelineError>
where
    P: Pixel<Subpixel = u8>,
{
    if width == 0 || height == 0 {
        return Err(PipelineError::InvalidDimensions { width, height });
    }
    let (src_w, src_h) = image.dimensions();
    if src_w == 0 || src_h == 0 {
        return Err(PipelineError::InvalidImage);
    }

    let x_ratio = f64::from(src_w) / f64::from(width);
    let y_ratio = f64::from(src_h) / f64::from(height);
    let channels = usize::from(P::CHANNEL_COUNT);

    let mut output = ImageBuffer::new(width, height);
    for ny in 0..height {
        for nx in 0..width {
            let src_x = x_ratio * f64::from(nx);
            let src_y = y_ratio * f64::from(ny);
            let x_l = (src_x as u32).min(src_w - 1);
            let y_l = (src_y as u32).min(src_h - 1);
            let x_h = (x_l + 1).min(src_w - 1);
            let y_h = (y_l + 1).min(src_h - 1);
            let wx = src_x - f64::from(x_l);
            let wy = src_y - f64::from(y_l);

            let a = image.get_pixel(x_l, y_l).channels();
            let b = image.get_pixel(x_h, y_l).channels();
            let c = image.get_pixel(x_l, y_h).channels();
            let d = image.get_pixel(x_h, y_h).channels();

            let mut blended = [0u8; MAX_CHANNELS];
            for ch in 0..channels {
                blended[ch] = blend(
                    [a[ch], b[ch], c[ch], d[ch]],
                    wx,
                    wy,
                );
            }
            output.put_pixel(nx, ny, *P::from_slice(&blended[..channels]));
        }
    }
    Ok(output)
}

/// Sample an image at a fractional coordinate with bilinear blending.
///
/// Coordinates are clamped into the valid sample range, so callers may
/// pass slightly out-of-bounds positions produced by inverse mapping.
///
/// # Panics
///
/// Panics if the image has a zero dimension; the pipeline validates
/// inputs before sampling.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
#[must_use = "returns the interpolated pixel"]
pub fn sample_bilinear<P>(image: &ImageBuffer<P, Vec<u8>>, x: f64, y: f64) -> P
where
    P: Pixel<Subpixel = u8>,
{
    let (w, h) = image.dimensions();
    let x = x.clamp(0.0, f64::from(w - 1));
    let y = y.clamp(0.0, f64::from(h - 1));
    let x_l = x as u32;
    let y_l = y as u32;
    let x_h = (x_l + 1).min(w - 1);
    let y_h = (y_l + 1).min(h - 1);
    let wx = x - f64::from(x_l);
    let wy = y - f64::from(y_l);

    let a = image.get_pixel(x_l, y_l).channels();
    let b = image.get_pixel(x_h, y_l).channels();
    let c = image.get_pixel(x_l, y_h).channels();
    let d = image.get_pixel(x_h, y_h).channels();

    let channels = usize::from(P::CHANNEL_COUNT);
    let mut blended = [0u8; MAX_CHANNELS];
    for ch in 0..channels {
        blended[ch] = blend([a[ch], b[ch], c[ch], d[ch]], wx, wy);
    }
    *P::from_slice(&blended[..channels])
}

/// Blend four neighbor samples with bilinear weights.
///
/// The weighted sum is a convex combination of `u8` samples, so
/// rounding alone keeps the result in range.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn blend(samples: [u8; 4], wx: f64, wy: f64) -> u8 {
    let [a, b, c, d] = samples.map(f64::from);
    let value = a * (1.0 - wx) * (1.0 - wy)
        + b * wx * (1.0 - wy)
        + c * (1.0 - wx) * wy
        + d * wx * wy;
    value.round() as u8
}

/// Downscale to a fixed working height, preserving aspect ratio.
///
/// Returns the resized image and the `original_height / target_height`
/// ratio needed to map detected coordinates back to the original grid.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidDimensions`] if `target_height` is
/// zero or the aspect-preserving width truncates to zero.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn resize_to_height(
    image: &RgbImage,
    target_height: u32,
) -> Result<(RgbImage, f64), PipelineError> {
    if target_height == 0 {
        return Err(PipelineError::InvalidDimensions {
            width: 0,
            height: target_height,
        });
    }
    let ratio = f64::from(image.height()) / f64::from(target_height);
    let width = (f64::from(image.width()) / ratio) as u32;
    let resized = resize(image, width, target_height)?;
    Ok((resized, ratio))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, Rgb};

    #[allow(clippy::cast_possible_truncation)]
    fn gradient_rgb(w: u32, h: u32) -> RgbImage {
        RgbImage::from_fn(w, h, |x, y| {
            Rgb([(x * 20) as u8, (y * 20) as u8, ((x + y) * 10) as u8])
        })
    }

    #[test]
    fn zero_target_width_is_rejected() {
        let img = gradient_rgb(4, 4);
        let result = resize(&img, 0, 4);
        assert!(matches!(
            result,
            Err(PipelineError::InvalidDimensions {
                width: 0,
                height: 4,
            }),
        ));
    }

    #[test]
    fn zero_source_is_rejected() {
        let img = RgbImage::new(0, 0);
        assert!(matches!(
            resize(&img, 4, 4),
            Err(PipelineError::InvalidImage),
        ));
    }

    #[test]
    fn identity_resize_reproduces_samples_exactly() {
        let img = gradient_rgb(10, 7);
        let resized = resize(&img, 10, 7).unwrap();
        assert_eq!(img, resized);
    }

    #[test]
    fn downscale_shape_matches_request() {
        let img = gradient_rgb(10, 10);
        let resized = resize(&img, 5, 5).unwrap();
        assert_eq!(resized.dimensions(), (5, 5));
    }

    #[test]
    fn downscale_keeps_all_channels() {
        let img = RgbImage::from_pixel(10, 10, Rgb([10, 120, 250]));
        let resized = resize(&img, 5, 5).unwrap();
        for pixel in resized.pixels() {
            assert_eq!(pixel.0, [10, 120, 250]);
        }
    }

    #[test]
    fn upscale_interpolates_between_neighbors() {
        let mut img = GrayImage::new(2, 1);
        img.put_pixel(0, 0, Luma([0]));
        img.put_pixel(1, 0, Luma([200]));
        let resized = resize(&img, 4, 1).unwrap();
        // x_ratio = 0.5: samples at source x = 0.0, 0.5, 1.0, 1.5.
        assert_eq!(resized.get_pixel(0, 0).0[0], 0);
        assert_eq!(resized.get_pixel(1, 0).0[0], 100);
        assert_eq!(resized.get_pixel(2, 0).0[0], 200);
        // x = 1.5 clamps its high neighbor to the last column.
        assert_eq!(resized.get_pixel(3, 0).0[0], 200);
    }

    #[test]
    fn sample_bilinear_midpoint_averages_four_neighbors() {
        let mut img = GrayImage::new(2, 2);
        img.put_pixel(0, 0, Luma([0]));
        img.put_pixel(1, 0, Luma([100]));
        img.put_pixel(0, 1, Luma([100]));
        img.put_pixel(1, 1, Luma([200]));
        let sampled = sample_bilinear(&img, 0.5, 0.5);
        assert_eq!(sampled.0[0], 100);
    }

    #[test]
    fn sample_bilinear_clamps_out_of_bounds() {
        let img = GrayImage::from_pixel(3, 3, Luma([42]));
        assert_eq!(sample_bilinear(&img, -5.0, -5.0).0[0], 42);
        assert_eq!(sample_bilinear(&img, 99.0, 99.0).0[0], 42);
    }

    #[test]
    fn resize_to_height_preserves_aspect() {
        let img = gradient_rgb(40, 20);
        let (resized, ratio) = resize_to_height(&img, 10).unwrap();
        assert_eq!(resized.dimensions(), (20, 10));
        assert!((ratio - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn resize_to_height_zero_is_rejected() {
        let img = gradient_rgb(4, 4);
        assert!(matches!(
            resize_to_height(&img, 0),
            Err(PipelineError::InvalidDimensions { .. }),
        ));
    }
}
