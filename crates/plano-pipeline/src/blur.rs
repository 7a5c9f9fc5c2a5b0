//! Gaussian kernel generation and convolution blur.
//!
//! The convolution contract (zero-filled border padding, output
//! dimensions equal to the unpadded input, results rounded and clamped
//! into the sample range) is part of the crate's tested behavior, so
//! both the kernel and the convolution loop are written out here rather
//! than delegated to `imageproc::filter`.
//!
//! [`gaussian_blur`] operates on a single grayscale channel.
//! [`gaussian_blur_rgb`] applies the same blur independently to each
//! R/G/B channel of a color image.

use image::GrayImage;

use crate::types::{PipelineError, RgbImage};

/// A square convolution kernel of floating-point weights.
///
/// The side length is always odd so a center tap exists; blur kernels
/// are normalized so their weights sum to 1.0 within floating
/// tolerance.
#[derive(Debug, Clone, PartialEq)]
pub struct Kernel {
    size: usize,
    weights: Vec<f64>,
}

impl Kernel {
    /// Build a normalized Gaussian kernel.
    ///
    /// Evaluates the unnormalized 2D Gaussian over the centered integer
    /// grid `[-size/2, size/2]`, then divides by the total so the
    /// weights sum to exactly 1.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidKernelParameters`] if `size` is
    /// zero or even, or `sigma` is not strictly positive.
    pub fn gaussian(size: usize, sigma: f64) -> Result<Self, PipelineError> {
        if size == 0 || size % 2 == 0 || sigma <= 0.0 {
            return Err(PipelineError::InvalidKernelParameters { size, sigma });
        }
        Ok(Self::gaussian_unchecked(size, sigma))
    }

    /// Build a Gaussian kernel from parameters known to be valid.
    ///
    /// `size` must be odd and non-zero and `sigma` strictly positive;
    /// used internally where the parameters are fixed constants.
    #[allow(clippy::cast_precision_loss)]
    pub(crate) fn gaussian_unchecked(size: usize, sigma: f64) -> Self {
        let half = (size / 2) as isize;
        let denom = 2.0 * sigma * sigma;
        let mut weights = Vec::with_capacity(size * size);
        let mut total = 0.0;
        for dy in -half..=half {
            for dx in -half..=half {
                let (dx, dy) = (dx as f64, dy as f64);
                let value = (-dx.mul_add(dx, dy * dy) / denom).exp();
                weights.push(value);
                total += value;
            }
        }
        for weight in &mut weights {
            *weight /= total;
        }

        Self { size, weights }
    }

    /// Kernel side length.
    #[must_use]
    pub const fn size(&self) -> usize {
        self.size
    }

    /// Weight at kernel row `ky`, column `kx`.
    #[must_use]
    pub fn at(&self, ky: usize, kx: usize) -> f64 {
        self.weights[ky * self.size + kx]
    }

    /// Sum of all weights.
    #[must_use]
    pub fn sum(&self) -> f64 {
        self.weights.iter().sum()
    }
}

/// Convolve a grayscale image with a kernel.
///
/// The border is padded by `size / 2` with zero-fill; every output
/// pixel is the dot product of the kernel with the corresponding
/// window of padded input, rounded and clamped into `0..=255`. Output
/// dimensions equal the (unpadded) input dimensions.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_possible_wrap)]
#[must_use = "returns the convolved image"]
pub fn convolve(image: &GrayImage, kernel: &Kernel) -> GrayImage {
    let (w, h) = image.dimensions();
    let size = kernel.size() as i64;
    let pad = size / 2;

    GrayImage::from_fn(w, h, |x, y| {
        let mut acc = 0.0;
        for ky in 0..size {
            let sy = i64::from(y) + ky - pad;
            if sy < 0 || sy >= i64::from(h) {
                continue;
            }
            for kx in 0..size {
                let sx = i64::from(x) + kx - pad;
                if sx < 0 || sx >= i64::from(w) {
                    continue;
                }
                let sample = f64::from(image.get_pixel(sx as u32, sy as u32).0[0]);
                acc = kernel.at(ky as usize, kx as usize).mul_add(sample, acc);
            }
        }
        image::Luma([acc.round().clamp(0.0, 255.0) as u8])
    })
}

/// Apply Gaussian blur to a grayscale image.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidKernelParameters`] for an even or
/// zero kernel size, or a non-positive sigma.
pub fn gaussian_blur(
    image: &GrayImage,
    size: usize,
    sigma: f64,
) -> Result<GrayImage, PipelineError> {
    let kernel = Kernel::gaussian(size, sigma)?;
    Ok(convolve(image, &kernel))
}

/// Apply Gaussian blur to an RGB image by blurring each channel
/// independently.
///
/// Gaussian blur is a linear, per-channel operation, so splitting into
/// three grayscale planes, blurring each, and reassembling matches a
/// direct color-space blur.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidKernelParameters`] for an even or
/// zero kernel size, or a non-positive sigma.
pub fn gaussian_blur_rgb(
    image: &RgbImage,
    size: usize,
    sigma: f64,
) -> Result<RgbImage, PipelineError> {
    let kernel = Kernel::gaussian(size, sigma)?;
    let (w, h) = image.dimensions();

    let channels: [GrayImage; 3] = std::array::from_fn(|c| {
        GrayImage::from_fn(w, h, |x, y| image::Luma([image.get_pixel(x, y).0[c]]))
    });
    let blurred: [GrayImage; 3] = std::array::from_fn(|c| convolve(&channels[c], &kernel));

    Ok(RgbImage::from_fn(w, h, |x, y| {
        image::Rgb([
            blurred[0].get_pixel(x, y).0[0],
            blurred[1].get_pixel(x, y).0[0],
            blurred[2].get_pixel(x, y).0[0],
        ])
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    /// Create a test image with a sharp black-to-white boundary at x=5.
    fn sharp_edge_image() -> GrayImage {
        GrayImage::from_fn(10, 10, |x, _y| {
            if x < 5 { image::Luma([0]) } else { image::Luma([255]) }
        })
    }

    #[test]
    fn gaussian_5x5_sums_to_one() {
        let kernel = Kernel::gaussian(5, 1.0).unwrap();
        assert_eq!(kernel.size(), 5);
        assert!((kernel.sum() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn gaussian_normalization_holds_across_parameters() {
        for size in [1, 3, 5, 7, 9, 31] {
            for sigma in [0.5, 1.0, 1.4, 5.0, 20.0] {
                let kernel = Kernel::gaussian(size, sigma).unwrap();
                assert!(
                    (kernel.sum() - 1.0).abs() < 1e-6,
                    "kernel({size}, {sigma}) sums to {}",
                    kernel.sum(),
                );
            }
        }
    }

    #[test]
    fn gaussian_peak_is_at_center() {
        let kernel = Kernel::gaussian(5, 1.0).unwrap();
        let center = kernel.at(2, 2);
        for ky in 0..5 {
            for kx in 0..5 {
                assert!(kernel.at(ky, kx) <= center);
            }
        }
    }

    #[test]
    fn even_size_is_rejected() {
        assert!(matches!(
            Kernel::gaussian(4, 1.0),
            Err(PipelineError::InvalidKernelParameters { size: 4, .. }),
        ));
    }

    #[test]
    fn zero_size_is_rejected() {
        assert!(Kernel::gaussian(0, 1.0).is_err());
    }

    #[test]
    fn non_positive_sigma_is_rejected() {
        assert!(Kernel::gaussian(5, 0.0).is_err());
        assert!(Kernel::gaussian(5, -2.0).is_err());
    }

    #[test]
    fn convolve_preserves_dimensions() {
        let img = GrayImage::new(17, 31);
        let kernel = Kernel::gaussian(5, 1.4).unwrap();
        let out = convolve(&img, &kernel);
        assert_eq!(out.dimensions(), (17, 31));
    }

    #[test]
    fn size_one_kernel_is_identity() {
        let img = sharp_edge_image();
        let blurred = gaussian_blur(&img, 1, 1.0).unwrap();
        assert_eq!(img, blurred);
    }

    #[test]
    fn uniform_interior_is_preserved() {
        // Zero-fill padding darkens the border, but interior pixels see
        // the full kernel and must keep their value.
        let img = GrayImage::from_pixel(10, 10, image::Luma([128]));
        let blurred = gaussian_blur(&img, 3, 1.0).unwrap();
        assert_eq!(blurred.get_pixel(5, 5).0[0], 128);
        assert!(blurred.get_pixel(0, 0).0[0] < 128);
    }

    #[test]
    fn blur_smooths_sharp_edge() {
        let img = sharp_edge_image();
        let blurred = gaussian_blur(&img, 5, 2.0).unwrap();
        let left_of_edge = blurred.get_pixel(4, 5).0[0];
        let right_of_edge = blurred.get_pixel(5, 5).0[0];
        assert!(left_of_edge > 0, "expected left of edge above 0");
        assert!(right_of_edge < 255, "expected right of edge below 255");
    }

    #[test]
    fn rgb_blur_matches_per_channel_gray_blur() {
        #[allow(clippy::cast_possible_truncation)]
        let img = RgbImage::from_fn(8, 8, |x, y| {
            image::Rgb([(x * 30) as u8, (y * 30) as u8, ((x + y) * 15) as u8])
        });
        let rgb_blurred = gaussian_blur_rgb(&img, 3, 1.4).unwrap();

        let (w, h) = img.dimensions();
        for c in 0..3 {
            let plane = GrayImage::from_fn(w, h, |x, y| image::Luma([img.get_pixel(x, y).0[c]]));
            let plane_blurred = gaussian_blur(&plane, 3, 1.4).unwrap();
            for y in 0..h {
                for x in 0..w {
                    assert_eq!(
                        rgb_blurred.get_pixel(x, y).0[c],
                        plane_blurred.get_pixel(x, y).0[0],
                        "mismatch at ({x},{y}) channel {c}",
                    );
                }
            }
        }
    }
}
