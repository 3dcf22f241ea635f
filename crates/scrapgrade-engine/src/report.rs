//! Scan report: an analysis result packaged with its explanation and a
//! confidence figure, ready to hand back to a client.

use serde::{Deserialize, Serialize};

use crate::explain::{self, ExplanationSource, NarrativeProvider};
use crate::types::AnalysisResult;

/// Ceiling on the reported confidence.
pub const MAX_CONFIDENCE: f64 = 0.95;

/// Everything a client needs to display one scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanReport {
    /// The grading outcome.
    pub analysis: AnalysisResult,
    /// Human-readable explanation. Never empty.
    pub explanation: String,
    /// Where `explanation` came from.
    pub explanation_source: ExplanationSource,
    /// Heuristic confidence in `[0.0, 0.95]`, rounded to two decimals.
    pub confidence: f64,
}

impl ScanReport {
    /// Explain `analysis` and attach a confidence figure.
    #[must_use]
    pub fn build(analysis: AnalysisResult, provider: Option<&dyn NarrativeProvider>) -> Self {
        let explanation = explain::explain(&analysis, provider);
        let confidence = confidence(&analysis);
        Self {
            analysis,
            explanation: explanation.text,
            explanation_source: explanation.source,
            confidence,
        }
    }
}

/// Heuristic confidence for a result.
///
/// `min(0.95, 0.5 + min(density * 10_000, 0.3) + min(count, 50) / 100)`,
/// rounded to two decimals. A result without a board has confidence 0.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn confidence(result: &AnalysisResult) -> f64 {
    if !result.board_detected() {
        return 0.0;
    }
    let density_term = (result.density_score() * 10_000.0).min(0.3);
    let count_term = result.components_count().min(50) as f64 / 100.0;
    let raw = (0.5 + density_term + count_term).min(MAX_CONFIDENCE);
    (raw * 100.0).round() / 100.0
}
