//! Run diagnostics: timing and key numbers for each grading stage.
//!
//! The engine stays sans-IO: it never reads a clock itself. Callers that
//! want timings pass a [`Clock`] to [`grade_with_timings`], which drives
//! the [`Pipeline`](crate::Pipeline) stage by stage and records how long
//! each stage took alongside the stage's [`StageMetrics`].
//!
//! Durations are serialized as fractional seconds (`f64`) for JSON
//! compatibility, since `std::time::Duration` does not implement serde
//! traits.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::format::ImageFormat;
use crate::pipeline::{GateOutcome, Pipeline};
use crate::types::{AnalysisResult, Grade, GradeError, GradeThresholds};

/// Time source for stage timing.
///
/// Native callers implement this over `std::time::Instant`; tests can use
/// a fake clock that advances deterministically.
pub trait Clock {
    /// Opaque point in time.
    type Instant;

    /// The current instant.
    fn now(&self) -> Self::Instant;

    /// Time elapsed since `since`.
    fn elapsed(&self, since: &Self::Instant) -> Duration;
}

/// Serde support for `std::time::Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a `Duration` as fractional seconds (`f64`).
    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    /// Deserialize a `Duration` from fractional seconds (`f64`).
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom(
                "duration seconds must be finite, non-negative, and representable as a Duration",
            )
        })
    }
}

/// Timing for a single stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageTiming {
    /// Wall-clock duration of this stage (seconds).
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// Stage-specific numbers.
    pub metrics: StageMetrics,
}

/// Key numbers produced by each stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StageMetrics {
    /// Payload unwrapping and raster decoding.
    Decode {
        /// Size of the image bytes after base64 unwrapping.
        payload_bytes: usize,
        /// Sniffed container format.
        format: ImageFormat,
        /// Decoded width in pixels.
        width: u32,
        /// Decoded height in pixels.
        height: u32,
    },
    /// Colour-band segmentation and mask cleanup.
    Segment {
        /// Substrate pixels after cleanup.
        board_pixels: u64,
        /// Total pixels in the image.
        total_pixels: u64,
    },
    /// Board-presence decision.
    Gate {
        /// Substrate coverage.
        board_ratio: f64,
        /// Coverage required to pass.
        min_board_ratio: f64,
        /// Whether the gate passed.
        board_detected: bool,
    },
    /// Component mask construction.
    Extract {
        /// Non-zero pixels in the smoothed component mask.
        component_pixels: u64,
    },
    /// Contour tracing and area filtering.
    Count {
        /// External contours before filtering.
        total_contours: usize,
        /// Contours admitted as components.
        valid_contours: usize,
        /// Admitted components above the large-component area.
        large_components: usize,
    },
    /// Density classification.
    Classify {
        /// Components per substrate pixel.
        density: f64,
        /// Resulting grade.
        grade: Grade,
    },
}

/// Timings collected from a single grading run.
///
/// Stages after the gate are `None` when the gate rejected the image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunTimings {
    /// Stage 1: decode.
    pub decode: StageTiming,
    /// Stage 2: substrate segmentation.
    pub segment: StageTiming,
    /// Stage 3: presence gate.
    pub gate: StageTiming,
    /// Stage 4: component extraction.
    pub extract: Option<StageTiming>,
    /// Stage 5: contour counting.
    pub count: Option<StageTiming>,
    /// Stage 6: density classification.
    pub classify: Option<StageTiming>,
    /// Total wall-clock duration of the run (seconds).
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
}

impl RunTimings {
    /// Stages in pipeline order, skipping those that did not run.
    #[must_use]
    pub fn stages(&self) -> Vec<(&'static str, &StageTiming)> {
        let mut stages = vec![
            ("Decode", &self.decode),
            ("Segment", &self.segment),
            ("Gate", &self.gate),
        ];
        let optional = [
            ("Extract", &self.extract),
            ("Count", &self.count),
            ("Classify", &self.classify),
        ];
        stages.extend(
            optional
                .into_iter()
                .filter_map(|(name, timing)| timing.as_ref().map(|t| (name, t))),
        );
        stages
    }

    /// Format the timings as a human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Grading Run Report\n{}", "=".repeat(60)));
        lines.push(format!(
            "Total duration: {:.3}ms",
            duration_ms(self.total_duration),
        ));
        lines.push(String::new());

        lines.push(format!(
            "{:<12} {:>10} {:>10}  {}",
            "Stage", "Duration", "% Total", "Details"
        ));
        lines.push("-".repeat(72));

        let total_ms = duration_ms(self.total_duration);
        for (name, timing) in self.stages() {
            let ms = duration_ms(timing.duration);
            let pct = if total_ms > 0.0 {
                ms / total_ms * 100.0
            } else {
                0.0
            };
            let details = format_metrics(&timing.metrics);
            lines.push(format!("{name:<12} {ms:>8.3}ms {pct:>9.1}%  {details}"));
        }

        lines.join("\n")
    }
}

/// Convert a `Duration` to milliseconds as `f64`.
fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

/// Format stage metrics into a compact detail string.
fn format_metrics(metrics: &StageMetrics) -> String {
    match metrics {
        StageMetrics::Decode {
            payload_bytes,
            format,
            width,
            height,
        } => format!("{payload_bytes} bytes {format} -> {width}x{height}"),
        StageMetrics::Segment {
            board_pixels,
            total_pixels,
        } => format!("substrate={board_pixels}/{total_pixels} px"),
        StageMetrics::Gate {
            board_ratio,
            min_board_ratio,
            board_detected,
        } => {
            let verdict = if *board_detected { "board" } else { "no board" };
            format!("ratio={board_ratio:.3} min={min_board_ratio:.3} ({verdict})")
        }
        StageMetrics::Extract { component_pixels } => {
            format!("component_px={component_pixels}")
        }
        StageMetrics::Count {
            total_contours,
            valid_contours,
            large_components,
        } => format!("{valid_contours}/{total_contours} contours kept, {large_components} large"),
        StageMetrics::Classify { density, grade } => format!("density={density:.3e} -> {grade}"),
    }
}

/// Time one stage transition.
fn timed<C: Clock, T>(clock: &C, stage: impl FnOnce() -> T) -> (T, Duration) {
    let start = clock.now();
    let out = stage();
    (out, clock.elapsed(&start))
}

/// Grade an image, recording per-stage timings.
///
/// Produces the same [`AnalysisResult`] as [`grade`](crate::grade).
///
/// # Errors
///
/// Same as [`grade`](crate::grade).
pub fn grade_with_timings<C: Clock>(
    bytes: &[u8],
    thresholds: &GradeThresholds,
    clock: &C,
) -> Result<(AnalysisResult, RunTimings), GradeError> {
    let run_start = clock.now();

    let (decoded, duration) = timed(clock, || Pipeline::new(bytes.to_vec(), *thresholds).decode());
    let decoded = decoded?;
    let decode = StageTiming {
        duration,
        metrics: decoded.metrics(),
    };

    let (segmented, duration) = timed(clock, || decoded.segment());
    let segment = StageTiming {
        duration,
        metrics: segmented.metrics(),
    };

    let (outcome, duration) = timed(clock, || segmented.gate());
    let gate = StageTiming {
        duration,
        metrics: outcome.metrics(),
    };

    let board = match outcome {
        GateOutcome::NoBoard(result) => {
            let timings = RunTimings {
                decode,
                segment,
                gate,
                extract: None,
                count: None,
                classify: None,
                total_duration: clock.elapsed(&run_start),
            };
            crate::log_outcome(&result);
            return Ok((result, timings));
        }
        GateOutcome::Board(board) => board,
    };

    let (extracted, duration) = timed(clock, || board.extract_components());
    let extract = StageTiming {
        duration,
        metrics: extracted.metrics(),
    };

    let (counted, duration) = timed(clock, || extracted.count());
    let count = StageTiming {
        duration,
        metrics: counted.metrics(),
    };

    let metrics = StageMetrics::Classify {
        density: counted.density(),
        grade: counted.grade(),
    };
    let (result, duration) = timed(clock, || counted.classify());
    let classify = StageTiming { duration, metrics };

    let timings = RunTimings {
        decode,
        segment,
        gate,
        extract: Some(extract),
        count: Some(count),
        classify: Some(classify),
        total_duration: clock.elapsed(&run_start),
    };
    crate::log_outcome(&result);
    Ok((result, timings))
}
