//! Human-readable explanations of a grade.
//!
//! An optional [`NarrativeProvider`] (for example a client for a hosted
//! language model) may enrich the text. The local templates here are the
//! fallback and never fail, so a grade always ships with an explanation
//! whether or not the provider is reachable.

use serde::{Deserialize, Serialize};

use crate::types::{AnalysisResult, Grade};

/// Message shown when no board was found.
pub const NO_BOARD_MESSAGE: &str = "No circuit board was detected in the image. \
    Please retry with a clear, well-lit photo of a printed circuit board (PCB).";

/// Capability for producing enriched explanation prose.
///
/// Implementations absorb their own failures (network errors, timeouts,
/// empty responses) and report them as `None`.
pub trait NarrativeProvider: Send + Sync {
    /// Describe a graded board, or `None` if no text is available.
    fn narrate(&self, grade: Grade, components_count: usize, density_score: f64)
    -> Option<String>;
}

/// The built-in template generator as a provider.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalTemplate;

impl NarrativeProvider for LocalTemplate {
    fn narrate(
        &self,
        grade: Grade,
        components_count: usize,
        density_score: f64,
    ) -> Option<String> {
        Some(local_explanation(
            Some(grade),
            components_count,
            density_score,
            true,
        ))
    }
}

/// Where an explanation's text came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExplanationSource {
    /// Built-in template.
    Local,
    /// External narrative provider.
    Narrative,
}

/// Explanation text plus its origin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Explanation {
    /// The prose. Never empty.
    pub text: String,
    /// Which generator produced `text`.
    pub source: ExplanationSource,
}

/// Template explanation for a grading outcome.
///
/// Returns [`NO_BOARD_MESSAGE`] when `board_detected` is false or `grade`
/// is `None`.
#[must_use]
pub fn local_explanation(
    grade: Option<Grade>,
    components_count: usize,
    density_score: f64,
    board_detected: bool,
) -> String {
    let Some(grade) = grade.filter(|_| board_detected) else {
        return NO_BOARD_MESSAGE.to_owned();
    };

    let detected = format!(
        "Approximately {components_count} electronic components were detected \
         ({density_score:.2e} per board pixel)."
    );
    match grade {
        Grade::High => format!(
            "This board was classified as high value for precious-metal recycling. {detected} \
             The high component density points to a greater likelihood of gold in connectors, \
             BGA chips and processors."
        ),
        Grade::Medium => format!(
            "This board was classified as medium value for recycling. {detected} \
             It carries a moderate number of components that may contain precious metals."
        ),
        Grade::Low => format!(
            "This board was classified as low value for recycling. {detected} \
             Simple boards usually hold little precious metal but can still be worth \
             recovering for copper and tin."
        ),
    }
}

/// Explain an analysis result, preferring `provider` when it has text.
///
/// The provider is only consulted for detected boards. `None`, empty or
/// whitespace-only provider output falls back to [`local_explanation`].
#[must_use]
pub fn explain(result: &AnalysisResult, provider: Option<&dyn NarrativeProvider>) -> Explanation {
    if let (Some(grade), Some(provider)) = (result.grade(), provider) {
        match provider.narrate(grade, result.components_count(), result.density_score()) {
            Some(text) if !text.trim().is_empty() => {
                return Explanation {
                    text: text.trim().to_owned(),
                    source: ExplanationSource::Narrative,
                };
            }
            _ => {
                tracing::warn!("narrative provider returned no usable text, using local template");
            }
        }
    }

    Explanation {
        text: local_explanation(
            result.grade(),
            result.components_count(),
            result.density_score(),
            result.board_detected(),
        ),
        source: ExplanationSource::Local,
    }
}
