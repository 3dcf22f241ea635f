//! Incremental pipeline: advance stage-by-stage, inspecting each
//! intermediate result before continuing.
//!
//! [`grade`](crate::grade) runs every stage in one call. [`Pipeline`]
//! lets the caller drive execution one step at a time:
//!
//! ```rust
//! # use scrapgrade_engine::{GradeError, GradeThresholds, Pipeline};
//! # use scrapgrade_engine::pipeline::GateOutcome;
//! # fn run(png: Vec<u8>) -> Result<(), GradeError> {
//! let segmented = Pipeline::new(png, GradeThresholds::default())
//!     .decode()?
//!     .segment();
//!
//! let result = match segmented.gate() {
//!     GateOutcome::NoBoard(result) => result,
//!     GateOutcome::Board(board) => board.extract_components().count().classify(),
//! };
//! # Ok(())
//! # }
//! ```
//!
//! Each stage method consumes `self` and returns the next pipeline state,
//! carrying only what later stages still need. The presence gate is the
//! one branch point: an image without enough substrate ends there with a
//! terminal no-board [`AnalysisResult`].
//!
//! # Memory
//!
//! The decoded raster is dropped once segmentation has run. From then on
//! a stage holds at most two single-channel masks the size of the image.

use crate::classify;
use crate::component;
use crate::contour::{self, ComponentStats};
use crate::decode::{self, DecodedImage};
use crate::diagnostics::StageMetrics;
use crate::format::ImageFormat;
use crate::gate;
use crate::morphology;
use crate::segment::{self, Segmentation};
use crate::type_guess;
use crate::types::{
    AnalysisDiagnostics, AnalysisResult, Dimensions, Grade, GradeError, GradeThresholds, GrayImage,
    RgbImage,
};

// ───────────────────────── Stage 0: Pending ──────────────────────────

/// Pipeline state before any processing has occurred.
///
/// Call [`decode`](Self::decode) to advance to the next stage.
#[must_use = "pipeline stages are consumed by advancing; call .decode() to continue"]
pub struct Pending {
    thresholds: GradeThresholds,
    source: Vec<u8>,
}

impl Pending {
    /// The raw upload payload.
    #[must_use]
    pub fn source(&self) -> &[u8] {
        &self.source
    }

    /// Validate the thresholds, decode the payload and advance to the
    /// [`Decoded`] stage.
    ///
    /// # Errors
    ///
    /// Returns [`GradeError::InvalidThresholds`] before touching the
    /// payload if the thresholds fail validation, otherwise any decode
    /// error from [`decode::decode`].
    pub fn decode(self) -> Result<Decoded, GradeError> {
        self.thresholds.validate()?;
        let decoded = decode::decode(&self.source)?;
        tracing::debug!(
            size = %decoded.dimensions(),
            format = %decoded.format,
            payload_bytes = decoded.payload_len,
            "decoded image"
        );
        Ok(Decoded {
            thresholds: self.thresholds,
            decoded,
        })
    }
}

// ───────────────────────── Stage 1: Decoded ──────────────────────────

/// Pipeline state after decoding.
///
/// Call [`segment`](Self::segment) to advance to the next stage.
#[must_use = "pipeline stages are consumed by advancing; call .segment() to continue"]
pub struct Decoded {
    thresholds: GradeThresholds,
    decoded: DecodedImage,
}

impl Decoded {
    /// The decoded RGB raster.
    #[must_use]
    pub const fn image(&self) -> &RgbImage {
        &self.decoded.image
    }

    /// Sniffed container format.
    #[must_use]
    pub const fn format(&self) -> ImageFormat {
        self.decoded.format
    }

    /// Media type declared by a data URI, if any.
    #[must_use]
    pub fn declared_mime(&self) -> Option<&str> {
        self.decoded.declared_mime.as_deref()
    }

    /// Raster dimensions.
    #[must_use]
    pub fn dimensions(&self) -> Dimensions {
        self.decoded.dimensions()
    }

    /// Metrics describing the decode.
    #[must_use]
    pub fn metrics(&self) -> StageMetrics {
        let dims = self.dimensions();
        StageMetrics::Decode {
            payload_bytes: self.decoded.payload_len,
            format: self.decoded.format,
            width: dims.width,
            height: dims.height,
        }
    }

    /// Segment board substrate and advance to [`Segmented`].
    pub fn segment(self) -> Segmented {
        let dimensions = self.dimensions();
        let segmentation = segment::segment_substrate(&self.decoded.image);
        tracing::debug!(
            board_pixels = segmentation.board_pixels,
            total_pixels = dimensions.pixel_count(),
            "segmented substrate"
        );
        Segmented {
            thresholds: self.thresholds,
            dimensions,
            segmentation,
        }
    }
}

// ───────────────────────── Stage 2: Segmented ────────────────────────

/// Pipeline state after substrate segmentation.
///
/// Call [`gate`](Self::gate) to decide whether a board is present.
#[must_use = "pipeline stages are consumed by advancing; call .gate() to continue"]
pub struct Segmented {
    thresholds: GradeThresholds,
    dimensions: Dimensions,
    segmentation: Segmentation,
}

impl Segmented {
    /// The cleaned substrate mask (255 = substrate).
    #[must_use]
    pub const fn substrate_mask(&self) -> &GrayImage {
        &self.segmentation.mask
    }

    /// Substrate pixel count.
    #[must_use]
    pub const fn board_pixels(&self) -> u64 {
        self.segmentation.board_pixels
    }

    /// Raster dimensions.
    #[must_use]
    pub const fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    /// Fraction of the image covered by substrate.
    #[must_use]
    pub fn board_ratio(&self) -> f64 {
        gate::board_ratio(self.board_pixels(), self.dimensions.pixel_count())
    }

    /// Metrics describing the segmentation.
    #[must_use]
    pub const fn metrics(&self) -> StageMetrics {
        StageMetrics::Segment {
            board_pixels: self.segmentation.board_pixels,
            total_pixels: self.dimensions.pixel_count(),
        }
    }

    /// Apply the presence gate.
    ///
    /// Returns [`GateOutcome::NoBoard`] with a finished result when the
    /// substrate coverage is below `min_board_ratio`.
    pub fn gate(self) -> GateOutcome {
        let board_ratio = self.board_ratio();
        let total_pixels = self.dimensions.pixel_count();
        let present = gate::board_present(
            self.board_pixels(),
            total_pixels,
            self.thresholds.min_board_ratio,
        );
        tracing::debug!(
            board_ratio,
            min_board_ratio = self.thresholds.min_board_ratio,
            present,
            "presence gate"
        );

        if present {
            GateOutcome::Board(BoardPresent {
                thresholds: self.thresholds,
                dimensions: self.dimensions,
                segmentation: self.segmentation,
                board_ratio,
            })
        } else {
            GateOutcome::NoBoard(AnalysisResult::no_board(AnalysisDiagnostics {
                board_ratio,
                board_pixels: self.segmentation.board_pixels,
                total_pixels,
                image_size: self.dimensions.to_string(),
                total_contours: 0,
                valid_contours: 0,
                large_components: 0,
                small_components: 0,
                component_area_ratio: 0.0,
                thresholds: self.thresholds,
            }))
        }
    }
}

/// Result of the presence gate.
#[must_use]
pub enum GateOutcome {
    /// Too little substrate: the run ends here.
    NoBoard(AnalysisResult),
    /// Enough substrate: continue to component extraction.
    Board(BoardPresent),
}

impl GateOutcome {
    /// Metrics describing the gate decision.
    #[must_use]
    pub fn metrics(&self) -> StageMetrics {
        match self {
            Self::NoBoard(result) => {
                let diagnostics = result.diagnostics();
                StageMetrics::Gate {
                    board_ratio: diagnostics.board_ratio,
                    min_board_ratio: diagnostics.thresholds.min_board_ratio,
                    board_detected: false,
                }
            }
            Self::Board(board) => StageMetrics::Gate {
                board_ratio: board.board_ratio,
                min_board_ratio: board.thresholds.min_board_ratio,
                board_detected: true,
            },
        }
    }
}

// ───────────────────────── Stage 3: BoardPresent ─────────────────────

/// Pipeline state after the gate accepted the image.
///
/// Call [`extract_components`](Self::extract_components) to advance.
#[must_use = "pipeline stages are consumed by advancing; call .extract_components() to continue"]
pub struct BoardPresent {
    thresholds: GradeThresholds,
    dimensions: Dimensions,
    segmentation: Segmentation,
    board_ratio: f64,
}

impl BoardPresent {
    /// Substrate coverage that passed the gate.
    #[must_use]
    pub const fn board_ratio(&self) -> f64 {
        self.board_ratio
    }

    /// The cleaned substrate mask.
    #[must_use]
    pub const fn substrate_mask(&self) -> &GrayImage {
        &self.segmentation.mask
    }

    /// Build the component mask and advance to [`ComponentsExtracted`].
    pub fn extract_components(self) -> ComponentsExtracted {
        let component_mask = component::extract_component_mask(&self.segmentation.mask);
        let component_pixels = morphology::count_foreground(&component_mask);
        tracing::debug!(component_pixels, "extracted component mask");
        ComponentsExtracted {
            thresholds: self.thresholds,
            dimensions: self.dimensions,
            board_pixels: self.segmentation.board_pixels,
            board_ratio: self.board_ratio,
            component_mask,
            component_pixels,
        }
    }
}

// ───────────────────────── Stage 4: ComponentsExtracted ──────────────

/// Pipeline state after the component mask has been built.
///
/// Call [`count`](Self::count) to advance.
#[must_use = "pipeline stages are consumed by advancing; call .count() to continue"]
pub struct ComponentsExtracted {
    thresholds: GradeThresholds,
    dimensions: Dimensions,
    board_pixels: u64,
    board_ratio: f64,
    component_mask: GrayImage,
    component_pixels: u64,
}

impl ComponentsExtracted {
    /// The smoothed component mask.
    #[must_use]
    pub const fn component_mask(&self) -> &GrayImage {
        &self.component_mask
    }

    /// Metrics describing the extraction.
    #[must_use]
    pub const fn metrics(&self) -> StageMetrics {
        StageMetrics::Extract {
            component_pixels: self.component_pixels,
        }
    }

    /// Trace and filter contours, advancing to [`Counted`].
    pub fn count(self) -> Counted {
        let stats = contour::count_components(&self.component_mask, &self.thresholds);
        tracing::debug!(
            total_contours = stats.total_contours,
            valid_contours = stats.count(),
            large = stats.large_components,
            small = stats.small_components,
            "counted components"
        );
        Counted {
            thresholds: self.thresholds,
            dimensions: self.dimensions,
            board_pixels: self.board_pixels,
            board_ratio: self.board_ratio,
            stats,
        }
    }
}

// ───────────────────────── Stage 5: Counted ──────────────────────────

/// Pipeline state after component counting.
///
/// Call [`classify`](Self::classify) to produce the final result.
#[must_use = "call .classify() to produce the AnalysisResult"]
pub struct Counted {
    thresholds: GradeThresholds,
    dimensions: Dimensions,
    board_pixels: u64,
    board_ratio: f64,
    stats: ComponentStats,
}

impl Counted {
    /// Admitted components and their statistics.
    #[must_use]
    pub const fn stats(&self) -> &ComponentStats {
        &self.stats
    }

    /// Metrics describing the count.
    #[must_use]
    pub fn metrics(&self) -> StageMetrics {
        StageMetrics::Count {
            total_contours: self.stats.total_contours,
            valid_contours: self.stats.count(),
            large_components: self.stats.large_components,
        }
    }

    /// Components per substrate pixel.
    #[must_use]
    pub fn density(&self) -> f64 {
        classify::density(self.stats.count(), self.board_pixels)
    }

    /// The grade the density maps to.
    #[must_use]
    pub fn grade(&self) -> Grade {
        classify::classify_density(self.density(), &self.thresholds)
    }

    /// Classify the density and build the final [`AnalysisResult`].
    #[must_use = "returns the analysis result"]
    #[allow(clippy::cast_precision_loss)]
    pub fn classify(self) -> AnalysisResult {
        let density = self.density();
        let grade = self.grade();
        let count = self.stats.count();
        let total_pixels = self.dimensions.pixel_count();
        let guess = type_guess::guess_board_type(
            count,
            self.stats.large_components,
            density,
            &self.thresholds,
        );
        tracing::debug!(density, %grade, type_guess = guess, "classified density");

        let diagnostics = AnalysisDiagnostics {
            board_ratio: self.board_ratio,
            board_pixels: self.board_pixels,
            total_pixels,
            image_size: self.dimensions.to_string(),
            total_contours: self.stats.total_contours,
            valid_contours: count,
            large_components: self.stats.large_components,
            small_components: self.stats.small_components,
            component_area_ratio: self.stats.total_component_area / total_pixels.max(1) as f64,
            thresholds: self.thresholds,
        };
        AnalysisResult::graded(grade, count, density, guess.to_owned(), diagnostics)
    }
}

// ───────────────────────── Entry point ───────────────────────────────

/// Entry point for the incremental pipeline.
pub struct Pipeline;

impl Pipeline {
    /// Create a new pipeline from an upload payload and thresholds.
    ///
    /// No processing is performed; call [`.decode()`](Pending::decode) to
    /// begin.
    #[allow(clippy::new_ret_no_self)]
    pub const fn new(payload: Vec<u8>, thresholds: GradeThresholds) -> Pending {
        Pending {
            thresholds,
            source: payload,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const PCB_GREEN: image::Rgb<u8> = image::Rgb([20, 140, 40]);

    fn png(image: &RgbImage) -> Vec<u8> {
        let mut buf = Vec::new();
        let encoder = image::codecs::png::PngEncoder::new(&mut buf);
        image::ImageEncoder::write_image(
            encoder,
            image.as_raw(),
            image.width(),
            image.height(),
            image::ExtendedColorType::Rgb8,
        )
        .unwrap();
        buf
    }

    /// Green board with black square parts of side `side` on a grid.
    fn board_with_parts(size: u32, side: u32, pitch: u32) -> Vec<u8> {
        png(&RgbImage::from_fn(size, size, |x, y| {
            let parts = 8..8 + side;
            if parts.contains(&(x % pitch)) && parts.contains(&(y % pitch)) {
                image::Rgb([0, 0, 0])
            } else {
                PCB_GREEN
            }
        }))
    }

    fn run(payload: Vec<u8>) -> AnalysisResult {
        match Pipeline::new(payload, GradeThresholds::default())
            .decode()
            .unwrap()
            .segment()
            .gate()
        {
            GateOutcome::NoBoard(result) => result,
            GateOutcome::Board(board) => board.extract_components().count().classify(),
        }
    }

    #[test]
    fn decode_rejects_invalid_thresholds() {
        let inverted = GradeThresholds {
            low_density_threshold: 1e-4,
            high_density_threshold: 1e-5,
            ..GradeThresholds::default()
        };
        let payload = png(&RgbImage::from_pixel(8, 8, PCB_GREEN));
        let result = Pipeline::new(payload, inverted).decode();
        assert!(matches!(result, Err(GradeError::InvalidThresholds(_))));

        // Checked before the payload, so an empty one still reports thresholds.
        let result = Pipeline::new(Vec::new(), inverted).decode();
        assert!(matches!(result, Err(GradeError::InvalidThresholds(_))));
    }

    #[test]
    fn pending_exposes_source_bytes() {
        let payload = png(&RgbImage::from_pixel(8, 8, PCB_GREEN));
        let len = payload.len();
        assert_eq!(Pipeline::new(payload, GradeThresholds::default()).source().len(), len);
    }

    #[test]
    fn decode_empty_input_returns_error() {
        let result = Pipeline::new(vec![], GradeThresholds::default()).decode();
        assert!(matches!(result, Err(GradeError::EmptyInput)));
    }

    #[test]
    fn decoded_exposes_raster() {
        let decoded = Pipeline::new(
            png(&RgbImage::from_pixel(12, 7, PCB_GREEN)),
            GradeThresholds::default(),
        )
        .decode()
        .unwrap();
        assert_eq!(decoded.image().dimensions(), (12, 7));
        assert_eq!(decoded.format(), ImageFormat::Png);
        assert_eq!(decoded.declared_mime(), None);
        assert!(matches!(
            decoded.metrics(),
            StageMetrics::Decode {
                width: 12,
                height: 7,
                ..
            }
        ));
    }

    #[test]
    fn segmented_green_image_is_all_substrate() {
        let segmented = Pipeline::new(
            png(&RgbImage::from_pixel(20, 20, PCB_GREEN)),
            GradeThresholds::default(),
        )
        .decode()
        .unwrap()
        .segment();
        assert_eq!(segmented.board_pixels(), 400);
        assert!((segmented.board_ratio() - 1.0).abs() < f64::EPSILON);
        assert_eq!(segmented.substrate_mask().dimensions(), (20, 20));
    }

    #[test]
    fn gray_image_stops_at_gate() {
        let result = run(png(&RgbImage::from_pixel(30, 30, image::Rgb([128, 128, 128]))));
        assert!(!result.board_detected());
        assert_eq!(result.grade(), None);
        assert_eq!(result.diagnostics().image_size, "30x30");
        assert_eq!(result.diagnostics().total_pixels, 900);
        assert_eq!(result.type_guess(), type_guess::NO_BOARD_GUESS);
    }

    #[test]
    fn bare_board_grades_low() {
        let result = run(png(&RgbImage::from_pixel(50, 50, PCB_GREEN)));
        assert!(result.board_detected());
        assert_eq!(result.grade(), Some(Grade::Low));
        assert_eq!(result.components_count(), 0);
        assert_eq!(result.diagnostics().total_contours, 0);
        assert_eq!(result.type_guess(), type_guess::SIMPLE_BOARD_GUESS);
    }

    #[test]
    fn populated_board_counts_parts() {
        // 4x4 grid of 14px parts on a 30px pitch.
        let result = run(board_with_parts(120, 14, 30));
        assert!(result.board_detected());
        assert_eq!(result.components_count(), 16);
        let d = result.diagnostics();
        assert_eq!(d.valid_contours, 16);
        assert_eq!(d.small_components, 16);
        assert_eq!(d.large_components, 0);
        assert!(d.component_area_ratio > 0.0);
        assert!((result.density_score() - 16.0 / d.board_pixels as f64).abs() < 1e-12);
    }

    #[test]
    fn counted_grade_matches_result() {
        let board = match Pipeline::new(board_with_parts(120, 14, 30), GradeThresholds::default())
            .decode()
            .unwrap()
            .segment()
            .gate()
        {
            GateOutcome::Board(board) => Some(board),
            GateOutcome::NoBoard(_) => None,
        };
        let counted = board.unwrap().extract_components().count();
        let grade = counted.grade();
        let density = counted.density();
        assert_eq!(counted.stats().count(), 16);
        let result = counted.classify();
        assert_eq!(result.grade(), Some(grade));
        assert!((result.density_score() - density).abs() < f64::EPSILON);
    }

    #[test]
    fn gate_metrics_reflect_decision() {
        let outcome = Pipeline::new(
            png(&RgbImage::from_pixel(10, 10, image::Rgb([255, 255, 255]))),
            GradeThresholds::default(),
        )
        .decode()
        .unwrap()
        .segment()
        .gate();
        assert!(matches!(
            outcome.metrics(),
            StageMetrics::Gate {
                board_detected: false,
                ..
            }
        ));
    }
}
