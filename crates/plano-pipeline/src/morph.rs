//! Morphological operators over grayscale images.
//!
//! Erosion and dilation take the minimum / maximum over the in-bounds
//! neighbors selected by a structuring element; opening and closing
//! compose them to remove speckle noise and fill pinholes while
//! preserving document edges.

use image::GrayImage;

/// A small binary mask defining the neighborhood of a morphological
/// operation.
///
/// The side length is always odd so the anchor sits on a center pixel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuringElement {
    size: usize,
    mask: Vec<bool>,
}

impl StructuringElement {
    /// Build an elliptical (disk-shaped) element with the given side
    /// length.
    ///
    /// Zero is bumped to 1 and even sizes are rounded up to the next
    /// odd value so a center anchor always exists.
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn ellipse(size: usize) -> Self {
        let size = size.max(1);
        let size = if size % 2 == 0 { size + 1 } else { size };
        let radius = ((size - 1) / 2) as f64;

        let mut mask = Vec::with_capacity(size * size);
        for y in 0..size {
            for x in 0..size {
                if radius == 0.0 {
                    mask.push(true);
                    continue;
                }
                let nx = (x as f64 - radius) / radius;
                let ny = (y as f64 - radius) / radius;
                mask.push(nx.mul_add(nx, ny * ny) <= 1.0 + f64::EPSILON);
            }
        }
        Self { size, mask }
    }

    /// Side length of the element.
    #[must_use]
    pub const fn size(&self) -> usize {
        self.size
    }

    /// Whether the cell at element row `ky`, column `kx` is selected.
    #[must_use]
    pub fn contains(&self, ky: usize, kx: usize) -> bool {
        self.mask[ky * self.size + kx]
    }
}

/// Erode: replace each pixel with the minimum over its selected,
/// in-bounds neighbors.
#[must_use = "returns the eroded image"]
pub fn erode(image: &GrayImage, element: &StructuringElement) -> GrayImage {
    reduce(image, element, u8::MAX, u8::min)
}

/// Dilate: replace each pixel with the maximum over its selected,
/// in-bounds neighbors.
#[must_use = "returns the dilated image"]
pub fn dilate(image: &GrayImage, element: &StructuringElement) -> GrayImage {
    reduce(image, element, u8::MIN, u8::max)
}

/// Opening: erosion followed by dilation. Removes bright speckles
/// smaller than the element.
#[must_use = "returns the opened image"]
pub fn open(image: &GrayImage, element: &StructuringElement) -> GrayImage {
    dilate(&erode(image, element), element)
}

/// Closing: dilation followed by erosion. Fills dark pinholes smaller
/// than the element.
#[must_use = "returns the closed image"]
pub fn close(image: &GrayImage, element: &StructuringElement) -> GrayImage {
    erode(&dilate(image, element), element)
}

/// Shared neighborhood scan for erode/dilate.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_possible_wrap)]
fn reduce(
    image: &GrayImage,
    element: &StructuringElement,
    init: u8,
    fold: fn(u8, u8) -> u8,
) -> GrayImage {
    let (w, h) = image.dimensions();
    let size = element.size() as i64;
    let half = size / 2;

    GrayImage::from_fn(w, h, |x, y| {
        let mut value = init;
        for ky in 0..size {
            let sy = i64::from(y) + ky - half;
            if sy < 0 || sy >= i64::from(h) {
                continue;
            }
            for kx in 0..size {
                let sx = i64::from(x) + kx - half;
                if sx < 0 || sx >= i64::from(w) {
                    continue;
                }
                if element.contains(ky as usize, kx as usize) {
                    value = fold(value, image.get_pixel(sx as u32, sy as u32).0[0]);
                }
            }
        }
        image::Luma([value])
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn even_size_rounds_up_to_odd() {
        assert_eq!(StructuringElement::ellipse(4).size(), 5);
        assert_eq!(StructuringElement::ellipse(0).size(), 1);
        assert_eq!(StructuringElement::ellipse(5).size(), 5);
    }

    #[test]
    fn ellipse_5_selects_disk_not_square() {
        let element = StructuringElement::ellipse(5);
        // Center row and column are fully selected.
        for i in 0..5 {
            assert!(element.contains(2, i));
            assert!(element.contains(i, 2));
        }
        // Corners fall outside the inscribed ellipse.
        assert!(!element.contains(0, 0));
        assert!(!element.contains(0, 4));
        assert!(!element.contains(4, 0));
        assert!(!element.contains(4, 4));
    }

    #[test]
    fn size_one_element_is_identity() {
        let element = StructuringElement::ellipse(1);
        let img = GrayImage::from_fn(6, 6, |x, y| Luma([u8::try_from(x * 10 + y).unwrap_or(0)]));
        assert_eq!(erode(&img, &element), img);
        assert_eq!(dilate(&img, &element), img);
    }

    #[test]
    fn erode_removes_single_speckle() {
        let mut img = GrayImage::new(9, 9);
        img.put_pixel(4, 4, Luma([255]));
        let eroded = erode(&img, &StructuringElement::ellipse(3));
        assert!(eroded.pixels().all(|p| p.0[0] == 0));
    }

    #[test]
    fn dilate_grows_single_pixel() {
        let mut img = GrayImage::new(9, 9);
        img.put_pixel(4, 4, Luma([255]));
        let dilated = dilate(&img, &StructuringElement::ellipse(3));
        assert_eq!(dilated.get_pixel(3, 4).0[0], 255);
        assert_eq!(dilated.get_pixel(5, 4).0[0], 255);
        assert_eq!(dilated.get_pixel(4, 3).0[0], 255);
        assert_eq!(dilated.get_pixel(4, 5).0[0], 255);
        assert_eq!(dilated.get_pixel(0, 0).0[0], 0);
    }

    #[test]
    fn open_removes_speckle_keeps_block() {
        let mut img = GrayImage::new(20, 20);
        img.put_pixel(2, 2, Luma([255]));
        for y in 8..16 {
            for x in 8..16 {
                img.put_pixel(x, y, Luma([255]));
            }
        }
        let opened = open(&img, &StructuringElement::ellipse(3));
        assert_eq!(opened.get_pixel(2, 2).0[0], 0, "speckle must be removed");
        assert_eq!(opened.get_pixel(11, 11).0[0], 255, "block must survive");
    }

    #[test]
    fn close_fills_pinhole() {
        let mut img = GrayImage::from_pixel(12, 12, Luma([255]));
        img.put_pixel(6, 6, Luma([0]));
        let closed = close(&img, &StructuringElement::ellipse(3));
        assert_eq!(closed.get_pixel(6, 6).0[0], 255, "pinhole must be filled");
    }

    #[test]
    fn dimensions_are_preserved() {
        let img = GrayImage::new(13, 29);
        let element = StructuringElement::ellipse(5);
        assert_eq!(open(&img, &element).dimensions(), (13, 29));
        assert_eq!(close(&img, &element).dimensions(), (13, 29));
    }
}
