//! Density classifier: components per substrate pixel mapped to a grade.

use crate::types::{Grade, GradeThresholds};

/// Components per substrate pixel.
///
/// The denominator is clamped to 1 so a zero-pixel substrate cannot divide
/// by zero, even though the presence gate normally prevents it.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn density(components_count: usize, board_pixels: u64) -> f64 {
    components_count as f64 / board_pixels.max(1) as f64
}

/// Map a density to a grade using half-open intervals.
///
/// `[0, low)` is [`Grade::Low`], `[low, high)` is [`Grade::Medium`] and
/// `[high, ∞)` is [`Grade::High`]. A density exactly on a boundary takes
/// the higher grade.
#[must_use]
pub fn classify_density(density: f64, thresholds: &GradeThresholds) -> Grade {
    if density < thresholds.low_density_threshold {
        Grade::Low
    } else if density < thresholds.high_density_threshold {
        Grade::Medium
    } else {
        Grade::High
    }
}
