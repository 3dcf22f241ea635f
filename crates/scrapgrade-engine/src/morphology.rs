//! Binary morphology on 0/255 masks.
//!
//! Wraps [`imageproc::morphology`] with the square structuring elements the
//! grading pipeline is tuned for. A square element of side `size` applied
//! `iterations` times is the same operation as a single pass with a
//! Chebyshev (L∞) radius of `size / 2 * iterations`, so every iterated
//! opening or closing maps to one dilation and one erosion.
//!
//! Pixels outside the image never count as background: a mask that is
//! solid to its border stays solid after erosion.

use image::GrayImage;
use imageproc::distance_transform::Norm;

/// Odd-sided square structuring element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SquareElement {
    size: u8,
}

impl SquareElement {
    /// 3×3 element.
    pub const SMALL: Self = Self { size: 3 };
    /// 5×5 element.
    pub const LARGE: Self = Self { size: 5 };

    /// Side length in pixels.
    #[must_use]
    pub const fn size(self) -> u8 {
        self.size
    }

    /// Chebyshev radius equivalent to `iterations` passes of this element.
    #[must_use]
    pub const fn radius(self, iterations: u8) -> u8 {
        (self.size / 2).saturating_mul(iterations)
    }
}

/// Morphological closing (dilate, then erode).
///
/// Bridges gaps narrower than the element and fills small holes.
#[must_use = "returns the closed mask"]
pub fn close(mask: &GrayImage, element: SquareElement, iterations: u8) -> GrayImage {
    match element.radius(iterations) {
        0 => mask.clone(),
        k => erode(&dilate(mask, k), k),
    }
}

/// Morphological opening (erode, then dilate).
///
/// Removes foreground specks and strands thinner than the element.
#[must_use = "returns the opened mask"]
pub fn open(mask: &GrayImage, element: SquareElement, iterations: u8) -> GrayImage {
    match element.radius(iterations) {
        0 => mask.clone(),
        k => dilate(&erode(mask, k), k),
    }
}

/// Grow foreground by Chebyshev radius `k`.
///
/// A mask without foreground is returned unchanged; `imageproc` fills it
/// on images of two pixels or fewer per side.
fn dilate(mask: &GrayImage, k: u8) -> GrayImage {
    if count_foreground(mask) == 0 {
        return mask.clone();
    }
    imageproc::morphology::dilate(mask, Norm::LInf, k)
}

/// Shrink foreground by Chebyshev radius `k`.
///
/// A mask without background is returned unchanged; `imageproc` empties it
/// on images of two pixels or fewer per side.
fn erode(mask: &GrayImage, k: u8) -> GrayImage {
    if count_foreground(mask) == u64::from(mask.width()) * u64::from(mask.height()) {
        return mask.clone();
    }
    imageproc::morphology::erode(mask, Norm::LInf, k)
}

/// Logical NOT of a binary mask.
#[must_use = "returns the inverted mask"]
pub fn invert(mask: &GrayImage) -> GrayImage {
    GrayImage::from_fn(mask.width(), mask.height(), |x, y| {
        image::Luma([if mask.get_pixel(x, y).0[0] == 0 { 255 } else { 0 }])
    })
}

/// Number of non-zero pixels.
#[must_use]
pub fn count_foreground(mask: &GrayImage) -> u64 {
    mask.pixels().map(|p| u64::from(p.0[0] != 0)).sum()
}
