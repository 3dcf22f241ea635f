//! scrapgrade-engine: deterministic visual grading of electronics scrap
//! (sans-IO).
//!
//! Turns a photo of a printed circuit board into a coarse value grade
//! (`LOW` / `MEDIUM` / `HIGH`) by measuring how densely the board is
//! populated with components. A photo without enough board substrate is
//! rejected before any grading happens.
//!
//! This crate has **no I/O dependencies**: it operates on in-memory byte
//! slices and returns structured data. Reading files, printing reports
//! and installing a log subscriber live in `scrapgrade-bench`.

pub mod cancel;
pub mod classify;
pub mod component;
pub mod contour;
pub mod decode;
pub mod diagnostics;
pub mod explain;
pub mod format;
pub mod gate;
pub mod hsv;
pub mod morphology;
pub mod pipeline;
pub mod report;
pub mod segment;
pub mod type_guess;
pub mod types;

pub use cancel::CancelToken;
pub use diagnostics::{Clock, RunTimings, grade_with_timings};
pub use explain::{Explanation, ExplanationSource, LocalTemplate, NarrativeProvider};
pub use format::{ImageFormat, sniff_format};
pub use pipeline::Pipeline;
pub use report::ScanReport;
pub use types::{
    AnalysisDiagnostics, AnalysisResult, Dimensions, Grade, GradeError, GradeThresholds,
};

use pipeline::GateOutcome;

/// Grade one upload payload.
///
/// `bytes` may be raw image bytes, base64 text, or a `data:` URI.
///
/// # Pipeline steps
///
/// 1. Decode the payload into an RGB raster
/// 2. Segment board substrate by colour band, then clean the mask
/// 3. Presence gate: stop with `board_detected == false` below
///    `min_board_ratio`
/// 4. Extract component blobs from the inverted substrate mask
/// 5. Trace external contours and keep those in the admissible area range
/// 6. Classify components-per-substrate-pixel into a [`Grade`]
///
/// An image without a board is a successful result, not an error.
///
/// # Errors
///
/// Returns [`GradeError::InvalidThresholds`] if `thresholds` fails
/// validation, and a decode error (see [`GradeError::is_decode_error`])
/// if the payload is not a decodable image.
pub fn grade(bytes: &[u8], thresholds: &GradeThresholds) -> Result<AnalysisResult, GradeError> {
    run(bytes, thresholds, None)
}

/// Grade one upload payload, checking `cancel` before each stage.
///
/// # Errors
///
/// Same as [`grade`], plus [`GradeError::Cancelled`] once `cancel` has
/// been set.
pub fn grade_cancellable(
    bytes: &[u8],
    thresholds: &GradeThresholds,
    cancel: &CancelToken,
) -> Result<AnalysisResult, GradeError> {
    run(bytes, thresholds, Some(cancel))
}

fn run(
    bytes: &[u8],
    thresholds: &GradeThresholds,
    cancel: Option<&CancelToken>,
) -> Result<AnalysisResult, GradeError> {
    let checkpoint = || cancel.map_or(Ok(()), CancelToken::check);

    checkpoint()?;
    let decoded = Pipeline::new(bytes.to_vec(), *thresholds).decode()?;

    checkpoint()?;
    let segmented = decoded.segment();

    checkpoint()?;
    let board = match segmented.gate() {
        GateOutcome::NoBoard(result) => {
            log_outcome(&result);
            return Ok(result);
        }
        GateOutcome::Board(board) => board,
    };

    checkpoint()?;
    let extracted = board.extract_components();

    checkpoint()?;
    let counted = extracted.count();

    checkpoint()?;
    let result = counted.classify();
    log_outcome(&result);
    Ok(result)
}

/// Emit the one `info` event every finished run produces.
pub(crate) fn log_outcome(result: &AnalysisResult) {
    match result.grade() {
        Some(grade) => tracing::info!(
            %grade,
            components = result.components_count(),
            density = result.density_score(),
            "graded board"
        ),
        None => tracing::info!(
            board_ratio = result.diagnostics().board_ratio,
            "no board detected"
        ),
    }
}
