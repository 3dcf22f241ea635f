//! Board-material segmentation: which pixels are bare substrate.
//!
//! Every pixel is converted to 8-bit HSV (see [`crate::hsv`]) and tested
//! against a fixed set of colour bands covering the common solder-mask and
//! laminate tones. The union of the band masks is cleaned with one closing
//! (bridges gaps cut by copper traces) and one opening (drops isolated
//! false-positive specks).
//!
//! This is step 2 in the pipeline, between decoding and the presence gate.

use image::{GrayImage, RgbImage};

use crate::hsv::{Hsv, rgb_to_hsv};
use crate::morphology::{self, SquareElement};

/// An inclusive HSV range identifying one substrate tone.
///
/// Saturation has no upper bound. Value is bounded by `v_max`, which is
/// 255 for every band except brown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubstrateBand {
    /// Human-readable band name, used in diagnostics.
    pub name: &'static str,
    /// Lowest hue (half-degrees, inclusive).
    pub h_min: u8,
    /// Highest hue (half-degrees, inclusive).
    pub h_max: u8,
    /// Lowest saturation (inclusive).
    pub s_min: u8,
    /// Lowest value (inclusive).
    pub v_min: u8,
    /// Highest value (inclusive).
    pub v_max: u8,
}

impl SubstrateBand {
    /// Whether `hsv` falls inside this band.
    #[must_use]
    pub const fn contains(&self, hsv: Hsv) -> bool {
        hsv.h >= self.h_min
            && hsv.h <= self.h_max
            && hsv.s >= self.s_min
            && hsv.v >= self.v_min
            && hsv.v <= self.v_max
    }
}

/// The tuned substrate bands.
///
/// Green gets two overlapping bands to tolerate lighting casts. Red gets
/// two because it straddles the hue wrap point.
pub const SUBSTRATE_BANDS: [SubstrateBand; 7] = [
    SubstrateBand {
        name: "green",
        h_min: 35,
        h_max: 90,
        s_min: 20,
        v_min: 20,
        v_max: 255,
    },
    SubstrateBand {
        name: "green-cyan",
        h_min: 70,
        h_max: 100,
        s_min: 15,
        v_min: 15,
        v_max: 255,
    },
    // Highlights above 220 are glare, not fibreglass.
    SubstrateBand {
        name: "brown",
        h_min: 8,
        h_max: 35,
        s_min: 20,
        v_min: 20,
        v_max: 220,
    },
    SubstrateBand {
        name: "blue",
        h_min: 95,
        h_max: 135,
        s_min: 20,
        v_min: 20,
        v_max: 255,
    },
    SubstrateBand {
        name: "yellow",
        h_min: 15,
        h_max: 40,
        s_min: 40,
        v_min: 40,
        v_max: 255,
    },
    SubstrateBand {
        name: "red",
        h_min: 0,
        h_max: 10,
        s_min: 30,
        v_min: 30,
        v_max: 255,
    },
    SubstrateBand {
        name: "red-wrap",
        h_min: 160,
        h_max: 180,
        s_min: 30,
        v_min: 30,
        v_max: 255,
    },
];

/// Closing iterations with the 5×5 element.
const CLOSE_ITERATIONS: u8 = 2;
/// Opening iterations with the 5×5 element.
const OPEN_ITERATIONS: u8 = 1;

/// Output of the segmenter.
#[derive(Debug, Clone)]
pub struct Segmentation {
    /// Binary substrate mask (255 = substrate).
    pub mask: GrayImage,
    /// Number of substrate pixels in `mask`.
    pub board_pixels: u64,
}

/// Whether an RGB pixel matches any substrate band.
#[must_use]
pub fn is_substrate(rgb: [u8; 3]) -> bool {
    let hsv = rgb_to_hsv(rgb);
    SUBSTRATE_BANDS.iter().any(|band| band.contains(hsv))
}

/// Raw union of all band masks, before morphological cleanup.
#[must_use = "returns the raw substrate mask"]
pub fn band_mask(image: &RgbImage) -> GrayImage {
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        image::Luma([if is_substrate(image.get_pixel(x, y).0) {
            255
        } else {
            0
        }])
    })
}

/// Classify every pixel as substrate or not, then clean the mask.
#[must_use = "returns the substrate segmentation"]
pub fn segment_substrate(image: &RgbImage) -> Segmentation {
    let raw = band_mask(image);
    let closed = morphology::close(&raw, SquareElement::LARGE, CLOSE_ITERATIONS);
    let mask = morphology::open(&closed, SquareElement::LARGE, OPEN_ITERATIONS);
    let board_pixels = morphology::count_foreground(&mask);
    Segmentation { mask, board_pixels }
}
