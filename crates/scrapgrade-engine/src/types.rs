//! Shared types for the scrapgrade grading pipeline.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Re-export `GrayImage` so downstream crates can reference binary masks
/// without depending on `image` directly.
pub use image::GrayImage;

/// Re-export `RgbImage` so downstream crates can reference the decoded
/// raster without depending on `image` directly.
pub use image::RgbImage;

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Dimensions {
    /// Total pixel count (`width * height`).
    #[must_use]
    pub const fn pixel_count(self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Tuning values for the grading pipeline.
///
/// The defaults are empirically tuned and carry no derivation. Treat any
/// change to them as a grading policy change: it shifts which boards land
/// in which grade.
///
/// Missing fields fall back to their defaults when deserializing, so a
/// partial JSON override such as `{"min_board_ratio": 0.1}` is valid.
///
/// # Invariants
///
/// Checked by [`validate`](Self::validate):
///
/// - every value is finite and non-negative
/// - `min_board_ratio <= 1.0`
/// - `min_component_area < max_component_area`
/// - `low_density_threshold < high_density_threshold`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GradeThresholds {
    /// Minimum fraction of the image that must be board substrate for a
    /// board to be considered present.
    pub min_board_ratio: f64,

    /// Contours enclosing less than this area (pixels) are noise.
    pub min_component_area: f64,

    /// Contours enclosing more than this area (pixels) are a misclassified
    /// board silhouette rather than a component.
    pub max_component_area: f64,

    /// Admitted components strictly larger than this area count as
    /// "large" for the type-guess heuristic.
    pub large_component_area: f64,

    /// Densities below this value grade as [`Grade::Low`].
    pub low_density_threshold: f64,

    /// Densities at or above this value grade as [`Grade::High`].
    pub high_density_threshold: f64,
}

impl GradeThresholds {
    /// Default minimum board coverage ratio.
    pub const DEFAULT_MIN_BOARD_RATIO: f64 = 0.05;
    /// Default lower admissible component area.
    pub const DEFAULT_MIN_COMPONENT_AREA: f64 = 30.0;
    /// Default upper admissible component area.
    pub const DEFAULT_MAX_COMPONENT_AREA: f64 = 80_000.0;
    /// Default large/small component boundary.
    pub const DEFAULT_LARGE_COMPONENT_AREA: f64 = 1000.0;
    /// Default LOW/MEDIUM density boundary.
    pub const DEFAULT_LOW_DENSITY_THRESHOLD: f64 = 0.000_02;
    /// Default MEDIUM/HIGH density boundary.
    pub const DEFAULT_HIGH_DENSITY_THRESHOLD: f64 = 0.000_08;

    /// Check the invariants listed on the type.
    ///
    /// # Errors
    ///
    /// Returns [`GradeError::InvalidThresholds`] naming the first violated
    /// invariant.
    pub fn validate(&self) -> Result<(), GradeError> {
        let fields = [
            ("min_board_ratio", self.min_board_ratio),
            ("min_component_area", self.min_component_area),
            ("max_component_area", self.max_component_area),
            ("large_component_area", self.large_component_area),
            ("low_density_threshold", self.low_density_threshold),
            ("high_density_threshold", self.high_density_threshold),
        ];
        for (name, value) in fields {
            if !value.is_finite() || value < 0.0 {
                return Err(GradeError::InvalidThresholds(format!(
                    "{name} must be finite and non-negative, got {value}"
                )));
            }
        }
        if self.min_board_ratio > 1.0 {
            return Err(GradeError::InvalidThresholds(format!(
                "min_board_ratio must be at most 1.0, got {}",
                self.min_board_ratio
            )));
        }
        if self.min_component_area >= self.max_component_area {
            return Err(GradeError::InvalidThresholds(format!(
                "min_component_area ({}) must be below max_component_area ({})",
                self.min_component_area, self.max_component_area
            )));
        }
        if self.low_density_threshold >= self.high_density_threshold {
            return Err(GradeError::InvalidThresholds(format!(
                "low_density_threshold ({}) must be below high_density_threshold ({})",
                self.low_density_threshold, self.high_density_threshold
            )));
        }
        Ok(())
    }
}

impl Default for GradeThresholds {
    fn default() -> Self {
        Self {
            min_board_ratio: Self::DEFAULT_MIN_BOARD_RATIO,
            min_component_area: Self::DEFAULT_MIN_COMPONENT_AREA,
            max_component_area: Self::DEFAULT_MAX_COMPONENT_AREA,
            large_component_area: Self::DEFAULT_LARGE_COMPONENT_AREA,
            low_density_threshold: Self::DEFAULT_LOW_DENSITY_THRESHOLD,
            high_density_threshold: Self::DEFAULT_HIGH_DENSITY_THRESHOLD,
        }
    }
}

/// Scrap value grade of a board, ordered `Low < Medium < High`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Grade {
    /// Sparse population, little precious metal.
    Low,
    /// Moderate population.
    Medium,
    /// Dense population, likely gold in connectors and BGA packages.
    High,
}

impl Grade {
    /// All grades in ascending order.
    pub const ALL: [Self; 3] = [Self::Low, Self::Medium, Self::High];

    /// Upper-case wire name (`"LOW"`, `"MEDIUM"`, `"HIGH"`).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Debugging detail that accompanies every [`AnalysisResult`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisDiagnostics {
    /// Fraction of the image classified as board substrate.
    pub board_ratio: f64,
    /// Number of substrate pixels after morphological cleanup.
    pub board_pixels: u64,
    /// Total pixels in the image.
    pub total_pixels: u64,
    /// Image size formatted as `WIDTHxHEIGHT`.
    pub image_size: String,
    /// External contours found before area filtering.
    pub total_contours: usize,
    /// Contours admitted by the area filter.
    pub valid_contours: usize,
    /// Admitted components above the large-component area.
    pub large_components: usize,
    /// Admitted components at or below the large-component area.
    pub small_components: usize,
    /// Summed area of admitted components divided by total pixels.
    pub component_area_ratio: f64,
    /// Thresholds the run used.
    pub thresholds: GradeThresholds,
}

/// Output of one grading run.
///
/// `grade` is `Some` exactly when `board_detected` is `true`. The fields
/// are private so that invariant holds; build values through
/// [`no_board`](Self::no_board) or [`graded`](Self::graded).
/// Deserialization rejects records that break it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "AnalysisResultRecord")]
pub struct AnalysisResult {
    board_detected: bool,
    grade: Option<Grade>,
    components_count: usize,
    density_score: f64,
    type_guess: String,
    diagnostics: AnalysisDiagnostics,
}

impl AnalysisResult {
    /// Terminal result for an image whose substrate coverage failed the
    /// presence gate.
    #[must_use]
    pub fn no_board(diagnostics: AnalysisDiagnostics) -> Self {
        Self {
            board_detected: false,
            grade: None,
            components_count: 0,
            density_score: 0.0,
            type_guess: crate::type_guess::NO_BOARD_GUESS.to_owned(),
            diagnostics,
        }
    }

    /// Result for a detected board.
    #[must_use]
    pub const fn graded(
        grade: Grade,
        components_count: usize,
        density_score: f64,
        type_guess: String,
        diagnostics: AnalysisDiagnostics,
    ) -> Self {
        Self {
            board_detected: true,
            grade: Some(grade),
            components_count,
            density_score,
            type_guess,
            diagnostics,
        }
    }

    /// Whether the presence gate passed.
    #[must_use]
    pub const fn board_detected(&self) -> bool {
        self.board_detected
    }

    /// The grade, present only when a board was detected.
    #[must_use]
    pub const fn grade(&self) -> Option<Grade> {
        self.grade
    }

    /// Number of admitted components.
    #[must_use]
    pub const fn components_count(&self) -> usize {
        self.components_count
    }

    /// Components per substrate pixel.
    #[must_use]
    pub const fn density_score(&self) -> f64 {
        self.density_score
    }

    /// Advisory device category.
    #[must_use]
    pub fn type_guess(&self) -> &str {
        &self.type_guess
    }

    /// Debugging detail.
    #[must_use]
    pub const fn diagnostics(&self) -> &AnalysisDiagnostics {
        &self.diagnostics
    }
}

/// Wire shape of [`AnalysisResult`], checked before conversion.
#[derive(Deserialize)]
struct AnalysisResultRecord {
    board_detected: bool,
    grade: Option<Grade>,
    components_count: usize,
    density_score: f64,
    type_guess: String,
    diagnostics: AnalysisDiagnostics,
}

impl TryFrom<AnalysisResultRecord> for AnalysisResult {
    type Error = String;

    fn try_from(record: AnalysisResultRecord) -> Result<Self, Self::Error> {
        if record.grade.is_some() != record.board_detected {
            return Err(format!(
                "grade must be present exactly when board_detected is true \
                 (board_detected={}, grade={:?})",
                record.board_detected, record.grade
            ));
        }
        Ok(Self {
            board_detected: record.board_detected,
            grade: record.grade,
            components_count: record.components_count,
            density_score: record.density_score,
            type_guess: record.type_guess,
            diagnostics: record.diagnostics,
        })
    }
}

/// Errors that can occur while grading an image.
///
/// A photo without a board is not an error: it produces an
/// [`AnalysisResult`] with `board_detected == false`.
#[derive(Debug, thiserror::Error)]
pub enum GradeError {
    /// The input payload was empty, or decoded to a zero-area image.
    #[error("input image data is empty")]
    EmptyInput,

    /// A `data:` URI without the `,` separating header and payload.
    #[error("malformed data URI: missing ',' separator")]
    MalformedDataUri,

    /// The payload looked like base64 text but did not decode.
    #[error("invalid base64 image payload: {0}")]
    Base64(#[from] base64::DecodeError),

    /// The raster decoder could not parse the bytes.
    #[error("failed to decode image: {0}")]
    ImageDecode(#[from] image::ImageError),

    /// Threshold configuration violates an invariant.
    #[error("invalid grade thresholds: {0}")]
    InvalidThresholds(String),

    /// The caller's cancel token was set between stages.
    #[error("grading was cancelled")]
    Cancelled,
}

impl GradeError {
    /// Whether this error means the caller sent an unusable image.
    #[must_use]
    pub const fn is_decode_error(&self) -> bool {
        matches!(
            self,
            Self::EmptyInput | Self::MalformedDataUri | Self::Base64(_) | Self::ImageDecode(_)
        )
    }
}
