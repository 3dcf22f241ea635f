//! Contour filtering and component counting.
//!
//! External contours are traced with Suzuki-Abe border following via
//! [`imageproc::contours::find_contours`]; hole borders and anything nested
//! inside another blob are ignored. Each contour's enclosed area is the
//! polygon area of its boundary points, and only contours inside the
//! admissible area range count as components.
//!
//! This is step 5 in the pipeline, between component extraction and
//! density classification.

use image::GrayImage;
use imageproc::contours::{BorderType, Contour};
use imageproc::point::Point;
use serde::{Deserialize, Serialize};

use crate::types::GradeThresholds;

/// Axis-aligned bounding box of a contour, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bounds {
    /// Left edge.
    pub x: u32,
    /// Top edge.
    pub y: u32,
    /// Width, inclusive of both edge pixels.
    pub width: u32,
    /// Height, inclusive of both edge pixels.
    pub height: u32,
}

/// One admitted component.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComponentCandidate {
    /// Polygon area enclosed by the contour.
    pub area: f64,
    /// Bounding extent of the contour.
    pub bounds: Bounds,
}

/// Aggregate output of the filter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComponentStats {
    /// External contours found before filtering.
    pub total_contours: usize,
    /// Contours that passed the area filter.
    pub components: Vec<ComponentCandidate>,
    /// Summed area of admitted components.
    pub total_component_area: f64,
    /// Admitted components with area above the large-component boundary.
    pub large_components: usize,
    /// Admitted components with area at or below the boundary.
    pub small_components: usize,
}

impl ComponentStats {
    /// Number of admitted components.
    #[must_use]
    pub fn count(&self) -> usize {
        self.components.len()
    }
}

/// Trace the outermost contours of every foreground blob.
///
/// Every non-zero pixel is foreground.
#[must_use]
pub fn external_contours(mask: &GrayImage) -> Vec<Contour<u32>> {
    imageproc::contours::find_contours::<u32>(mask)
        .into_iter()
        .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
        .collect()
}

/// Area of the polygon through `points` (shoelace formula).
///
/// A filled `w`×`h` rectangle traced through its boundary pixel centres
/// has area `(w - 1) * (h - 1)`. Fewer than three points enclose nothing.
#[must_use]
pub fn contour_area(points: &[Point<u32>]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let twice_area: f64 = points
        .iter()
        .zip(points.iter().cycle().skip(1))
        .map(|(a, b)| {
            let (ax, ay) = (f64::from(a.x), f64::from(a.y));
            let (bx, by) = (f64::from(b.x), f64::from(b.y));
            ax.mul_add(by, -(bx * ay))
        })
        .sum();
    twice_area.abs() / 2.0
}

/// Bounding box of a non-empty point set.
fn bounds(points: &[Point<u32>]) -> Bounds {
    let min_x = points.iter().map(|p| p.x).min().unwrap_or(0);
    let max_x = points.iter().map(|p| p.x).max().unwrap_or(0);
    let min_y = points.iter().map(|p| p.y).min().unwrap_or(0);
    let max_y = points.iter().map(|p| p.y).max().unwrap_or(0);
    Bounds {
        x: min_x,
        y: min_y,
        width: max_x - min_x + 1,
        height: max_y - min_y + 1,
    }
}

/// Trace, filter and bucket the components in `mask`.
#[must_use]
pub fn count_components(mask: &GrayImage, thresholds: &GradeThresholds) -> ComponentStats {
    let contours = external_contours(mask);
    let mut stats = ComponentStats {
        total_contours: contours.len(),
        ..ComponentStats::default()
    };

    for contour in &contours {
        let area = contour_area(&contour.points);
        if area < thresholds.min_component_area || area > thresholds.max_component_area {
            continue;
        }
        if area > thresholds.large_component_area {
            stats.large_components += 1;
        } else {
            stats.small_components += 1;
        }
        stats.total_component_area += area;
        stats.components.push(ComponentCandidate {
            area,
            bounds: bounds(&contour.points),
        });
    }

    stats
}
