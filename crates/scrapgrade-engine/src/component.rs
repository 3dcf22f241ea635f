//! Component extraction: turn the substrate mask into component blobs.
//!
//! Anything that is not bare board (solder, packages, connectors,
//! silkscreen) is a candidate component. The inverted substrate mask is
//! opened to drop thin noise lines, closed to merge fragments of the same
//! part, and lightly blurred so contour tracing sees smoother outlines.
//!
//! This is step 4 in the pipeline, between the presence gate and contour
//! counting.

use image::GrayImage;

use crate::morphology::{self, SquareElement};

/// Opening iterations with the 3×3 element.
const OPEN_ITERATIONS: u8 = 2;
/// Closing iterations with the 3×3 element.
const CLOSE_ITERATIONS: u8 = 2;

/// Sigma of the smoothing pass.
///
/// Matches the sigma a 5×5 Gaussian kernel gets when sigma is derived from
/// the kernel size: `0.3 * ((5 - 1) * 0.5 - 1) + 0.8`.
pub const SMOOTHING_SIGMA: f32 = 1.1;

/// Taps either side of the kernel centre (a 5-tap kernel).
const SMOOTHING_RADIUS: i8 = 2;

/// Build the smoothed component mask from a substrate mask.
///
/// The output is greyscale: contour tracing treats every non-zero pixel as
/// foreground, so the blur grows each blob by two pixels per side.
#[must_use = "returns the component mask"]
pub fn extract_component_mask(substrate: &GrayImage) -> GrayImage {
    let candidates = morphology::invert(substrate);
    let opened = morphology::open(&candidates, SquareElement::SMALL, OPEN_ITERATIONS);
    let merged = morphology::close(&opened, SquareElement::SMALL, CLOSE_ITERATIONS);
    smooth(&merged, SMOOTHING_SIGMA)
}

/// Normalised 5-tap Gaussian kernel for `sigma`.
#[must_use]
pub fn gaussian_kernel(sigma: f32) -> [f32; 5] {
    let denom = 2.0 * sigma * sigma;
    let mut kernel = [0.0; 5];
    for (tap, offset) in kernel.iter_mut().zip(-SMOOTHING_RADIUS..=SMOOTHING_RADIUS) {
        let d = f32::from(offset);
        *tap = (-(d * d) / denom).exp();
    }
    let sum: f32 = kernel.iter().sum();
    kernel.map(|tap| tap / sum)
}

/// Separable 5×5 Gaussian smoothing of a mask.
///
/// Non-positive sigma returns the mask unchanged.
#[must_use = "returns the smoothed mask"]
pub fn smooth(mask: &GrayImage, sigma: f32) -> GrayImage {
    if sigma <= 0.0 {
        return mask.clone();
    }
    imageproc::filter::separable_filter_equal(mask, &gaussian_kernel(sigma))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Substrate mask that is solid except for square holes of side `side`
    /// at each `(x, y)` corner.
    fn substrate_with_holes(w: u32, h: u32, side: u32, corners: &[(u32, u32)]) -> GrayImage {
        GrayImage::from_fn(w, h, |x, y| {
            let in_hole = corners
                .iter()
                .any(|&(cx, cy)| x >= cx && x < cx + side && y >= cy && y < cy + side);
            image::Luma([if in_hole { 0 } else { 255 }])
        })
    }

    #[test]
    fn solid_substrate_has_no_components() {
        let substrate = GrayImage::from_pixel(50, 50, image::Luma([255]));
        let mask = extract_component_mask(&substrate);
        assert_eq!(morphology::count_foreground(&mask), 0);
    }

    #[test]
    fn empty_substrate_is_all_component() {
        let substrate = GrayImage::new(30, 30);
        let mask = extract_component_mask(&substrate);
        assert_eq!(morphology::count_foreground(&mask), 900);
    }

    #[test]
    fn hole_becomes_blob() {
        let substrate = substrate_with_holes(60, 60, 14, &[(20, 20)]);
        let mask = extract_component_mask(&substrate);
        // Centre of the hole is solidly foreground.
        assert!(mask.get_pixel(27, 27).0[0] >= 250);
        // Far corner stays background.
        assert_eq!(mask.get_pixel(2, 2).0[0], 0);
        // Blur grows the blob a little, never shrinks it.
        assert!(morphology::count_foreground(&mask) >= 14 * 14);
    }

    #[test]
    fn blur_grows_blob_by_two_pixels() {
        // Hole spans 20..34; smoothing reaches 18..36 and no further.
        let substrate = substrate_with_holes(60, 60, 14, &[(20, 20)]);
        let mask = extract_component_mask(&substrate);
        let row: Vec<u8> = (0..60).map(|x| mask.get_pixel(x, 27).0[0]).collect();
        assert_eq!(row.iter().filter(|&&v| v > 0).count(), 18);
        assert!(row[18] > 0 && row[35] > 0);
        assert_eq!(row[17], 0);
        assert_eq!(row[36], 0);

        let contours = crate::contour::external_contours(&mask);
        assert_eq!(contours.len(), 1);
        let xs = contours[0].points.iter().map(|p| p.x);
        assert_eq!(xs.clone().min(), Some(18));
        assert_eq!(xs.max(), Some(35));
    }

    #[test]
    fn kernel_is_normalised_and_symmetric() {
        let k = gaussian_kernel(SMOOTHING_SIGMA);
        assert!((k.iter().sum::<f32>() - 1.0).abs() < 1e-6);
        assert!((k[0] - k[4]).abs() < f32::EPSILON);
        assert!((k[1] - k[3]).abs() < f32::EPSILON);
        assert!(k[2] > k[1] && k[1] > k[0] && k[0] > 0.0);
    }

    #[test]
    fn thin_line_is_removed() {
        // A 2-pixel-wide non-substrate strand does not survive the opening.
        let substrate = GrayImage::from_fn(40, 40, |x, _| {
            image::Luma([if x == 20 || x == 21 { 0 } else { 255 }])
        });
        let mask = extract_component_mask(&substrate);
        assert_eq!(morphology::count_foreground(&mask), 0);
    }

    #[test]
    fn smooth_with_zero_sigma_is_identity() {
        let mask = substrate_with_holes(10, 10, 3, &[(2, 2)]);
        assert_eq!(smooth(&mask, 0.0), mask);
        assert_eq!(smooth(&mask, -1.0), mask);
    }

    #[test]
    fn smooth_preserves_dimensions() {
        let mask = GrayImage::new(17, 31);
        assert_eq!(smooth(&mask, SMOOTHING_SIGMA).dimensions(), (17, 31));
    }
}
