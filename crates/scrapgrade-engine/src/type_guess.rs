//! Advisory device-category guess from component statistics.
//!
//! Purely informational. It reads the same numbers the classifier reads but
//! never feeds back into the grade.

use crate::types::GradeThresholds;

/// Guess reported when the presence gate rejected the image.
pub const NO_BOARD_GUESS: &str = "board not detected";

/// Guess for dense boards.
pub const HIGH_DENSITY_GUESS: &str = "high-density board (motherboard/phone/server class)";
/// Guess for moderately populated boards.
pub const MEDIUM_DENSITY_GUESS: &str = "medium-density board (router/drive/GPU class)";
/// Guess for lightly populated boards.
pub const LOW_MEDIUM_DENSITY_GUESS: &str =
    "low-medium density (power supply/printer/peripheral class)";
/// Guess for everything else.
pub const SIMPLE_BOARD_GUESS: &str = "simple board (basic electronics)";

/// Pick a probable device category.
///
/// Rows are tried top to bottom; the first match wins.
///
/// | condition | guess |
/// |-----------|-------|
/// | `count > 60` or (`large > 25` and `density > high`) | high-density |
/// | `count > 35` or (`large > 15` and `density > low`) | medium-density |
/// | `count > 20` | low-medium |
/// | otherwise | simple |
#[must_use]
pub fn guess_board_type(
    components_count: usize,
    large_components: usize,
    density: f64,
    thresholds: &GradeThresholds,
) -> &'static str {
    if components_count > 60
        || (large_components > 25 && density > thresholds.high_density_threshold)
    {
        HIGH_DENSITY_GUESS
    } else if components_count > 35
        || (large_components > 15 && density > thresholds.low_density_threshold)
    {
        MEDIUM_DENSITY_GUESS
    } else if components_count > 20 {
        LOW_MEDIUM_DENSITY_GUESS
    } else {
        SIMPLE_BOARD_GUESS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn guess(count: usize, large: usize, density: f64) -> &'static str {
        guess_board_type(count, large, density, &GradeThresholds::default())
    }

    #[test]
    fn count_alone_selects_rows() {
        assert_eq!(guess(61, 0, 0.0), HIGH_DENSITY_GUESS);
        assert_eq!(guess(60, 0, 0.0), MEDIUM_DENSITY_GUESS);
        assert_eq!(guess(36, 0, 0.0), MEDIUM_DENSITY_GUESS);
        assert_eq!(guess(35, 0, 0.0), LOW_MEDIUM_DENSITY_GUESS);
        assert_eq!(guess(21, 0, 0.0), LOW_MEDIUM_DENSITY_GUESS);
        assert_eq!(guess(20, 0, 0.0), SIMPLE_BOARD_GUESS);
        assert_eq!(guess(0, 0, 0.0), SIMPLE_BOARD_GUESS);
    }

    #[test]
    fn many_large_parts_need_density_too() {
        assert_eq!(guess(30, 26, 1e-4), HIGH_DENSITY_GUESS);
        // Density exactly on the threshold is not "above" it.
        assert_eq!(guess(30, 26, 8e-5), MEDIUM_DENSITY_GUESS);
        assert_eq!(guess(18, 16, 3e-5), MEDIUM_DENSITY_GUESS);
        assert_eq!(guess(18, 16, 1e-5), SIMPLE_BOARD_GUESS);
    }

    #[test]
    fn guesses_are_distinct() {
        let all = [
            NO_BOARD_GUESS,
            HIGH_DENSITY_GUESS,
            MEDIUM_DENSITY_GUESS,
            LOW_MEDIUM_DENSITY_GUESS,
            SIMPLE_BOARD_GUESS,
        ];
        for (i, a) in all.iter().enumerate() {
            for b in &all[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}
