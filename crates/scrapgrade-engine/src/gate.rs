//! Board-presence gate.
//!
//! Rejects photos of hands, tables and empty backgrounds before component
//! counting runs, so they never receive a misleading grade.

/// Fraction of the image covered by substrate.
///
/// A zero-pixel image yields `0.0` rather than `NaN`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn board_ratio(board_pixels: u64, total_pixels: u64) -> f64 {
    board_pixels as f64 / total_pixels.max(1) as f64
}

/// Whether enough of the image is substrate to treat it as a board photo.
#[must_use]
pub fn board_present(board_pixels: u64, total_pixels: u64, min_board_ratio: f64) -> bool {
    board_ratio(board_pixels, total_pixels) >= min_board_ratio
}
