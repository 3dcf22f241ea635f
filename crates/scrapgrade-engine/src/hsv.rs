//! 8-bit RGB to HSV conversion.
//!
//! Uses the half-degree hue convention common to 8-bit vision code: hue
//! occupies `0..180` (degrees divided by two) so it fits a `u8`, while
//! saturation and value span the full `0..=255`. The substrate colour bands
//! in [`crate::segment`] are expressed in this convention.

/// A pixel in 8-bit HSV space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hsv {
    /// Hue in half-degrees, `0..180`.
    pub h: u8,
    /// Saturation, `0..=255`.
    pub s: u8,
    /// Value (brightness), `0..=255`.
    pub v: u8,
}

/// Convert one RGB pixel to 8-bit HSV.
///
/// Grey pixels (`max == min`) have hue and saturation zero. Black has
/// saturation zero.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn rgb_to_hsv([r, g, b]: [u8; 3]) -> Hsv {
    let v = r.max(g).max(b);
    let min = r.min(g).min(b);
    let diff = f32::from(v - min);

    let s = if v == 0 {
        0
    } else {
        (255.0 * diff / f32::from(v)).round() as u8
    };

    if v == min {
        return Hsv { h: 0, s, v };
    }

    let (rf, gf, bf) = (f32::from(r), f32::from(g), f32::from(b));
    let degrees = if v == r {
        60.0 * (gf - bf) / diff
    } else if v == g {
        60.0f32.mul_add((bf - rf) / diff, 120.0)
    } else {
        60.0f32.mul_add((rf - gf) / diff, 240.0)
    };

    let mut h = (degrees / 2.0).round() as i32;
    if h < 0 {
        h += 180;
    }
    if h >= 180 {
        h -= 180;
    }
    Hsv { h: h as u8, s, v }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primaries() {
        assert_eq!(rgb_to_hsv([255, 0, 0]), Hsv { h: 0, s: 255, v: 255 });
        assert_eq!(rgb_to_hsv([0, 255, 0]), Hsv { h: 60, s: 255, v: 255 });
        assert_eq!(rgb_to_hsv([0, 0, 255]), Hsv { h: 120, s: 255, v: 255 });
    }

    #[test]
    fn greys_have_no_hue_or_saturation() {
        assert_eq!(rgb_to_hsv([0, 0, 0]), Hsv { h: 0, s: 0, v: 0 });
        assert_eq!(rgb_to_hsv([128, 128, 128]), Hsv { h: 0, s: 0, v: 128 });
        assert_eq!(rgb_to_hsv([255, 255, 255]), Hsv { h: 0, s: 0, v: 255 });
    }

    #[test]
    fn typical_solder_mask_green() {
        // 127 degrees -> 63 half-degrees.
        let hsv = rgb_to_hsv([30, 120, 40]);
        assert_eq!(hsv.h, 63);
        assert_eq!(hsv.s, 191);
        assert_eq!(hsv.v, 120);
    }

    #[test]
    fn magenta_red_wraps_to_top_of_range() {
        // Red with a touch of blue sits just below 360 degrees.
        let hsv = rgb_to_hsv([200, 0, 40]);
        assert_eq!(hsv.h, 174);
    }

    #[test]
    fn yellow_and_cyan() {
        assert_eq!(rgb_to_hsv([255, 255, 0]).h, 30);
        assert_eq!(rgb_to_hsv([0, 255, 255]).h, 90);
    }
}
