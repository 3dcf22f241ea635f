//! scrapgrade-bench: CLI tool for grading board photos and tuning
//! thresholds.
//!
//! Runs the grading pipeline on a given image file with configurable
//! thresholds, printing the scan report and per-stage timings. Useful for:
//!
//! - Checking how a photo grades before changing the defaults
//! - Tuning coverage, component-area and density thresholds
//! - Measuring per-stage durations to identify bottlenecks
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin scrapgrade-bench -- [OPTIONS] <IMAGE_PATH>
//! ```
//!
//! Log verbosity follows `RUST_LOG` (default `info`); logs go to stderr.

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::Parser;
use scrapgrade_engine::diagnostics::Clock;
use scrapgrade_engine::{AnalysisResult, GradeThresholds, RunTimings, ScanReport};
use tracing_subscriber::EnvFilter;

/// Grade a circuit board photo and print diagnostics.
///
/// Runs the grading pipeline on a given image with configurable
/// thresholds and prints the scan report with per-stage timings.
#[derive(Parser)]
#[command(name = "scrapgrade-bench", version)]
struct Cli {
    /// Path to the input: image file, base64 text, or a data URI.
    image_path: PathBuf,

    /// Minimum fraction of the image that must be board substrate.
    #[arg(long, default_value_t = GradeThresholds::DEFAULT_MIN_BOARD_RATIO)]
    min_board_ratio: f64,

    /// Smallest contour area (pixels) counted as a component.
    #[arg(long, default_value_t = GradeThresholds::DEFAULT_MIN_COMPONENT_AREA)]
    min_component_area: f64,

    /// Largest contour area (pixels) counted as a component.
    #[arg(long, default_value_t = GradeThresholds::DEFAULT_MAX_COMPONENT_AREA)]
    max_component_area: f64,

    /// Area (pixels) above which a component counts as large.
    #[arg(long, default_value_t = GradeThresholds::DEFAULT_LARGE_COMPONENT_AREA)]
    large_component_area: f64,

    /// LOW/MEDIUM density boundary (components per substrate pixel).
    #[arg(long, default_value_t = GradeThresholds::DEFAULT_LOW_DENSITY_THRESHOLD)]
    low_density_threshold: f64,

    /// MEDIUM/HIGH density boundary (components per substrate pixel).
    #[arg(long, default_value_t = GradeThresholds::DEFAULT_HIGH_DENSITY_THRESHOLD)]
    high_density_threshold: f64,

    /// Number of runs for averaging.
    #[arg(
        long,
        default_value_t = 1,
        value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..)
    )]
    runs: usize,

    /// Output the report and timings as JSON instead of human-readable text.
    #[arg(long)]
    json: bool,

    /// Full thresholds as a JSON string.
    ///
    /// When provided, all other threshold flags are ignored. Missing
    /// fields take their default values.
    #[arg(long)]
    thresholds_json: Option<String>,
}

/// Build [`GradeThresholds`] from CLI arguments.
///
/// If `--thresholds-json` is provided, the JSON is parsed directly and
/// all individual threshold flags are ignored. Either way the result is
/// validated.
fn thresholds_from_cli(cli: &Cli) -> Result<GradeThresholds, String> {
    let thresholds = if let Some(ref json) = cli.thresholds_json {
        serde_json::from_str(json).map_err(|e| format!("Error parsing --thresholds-json: {e}"))?
    } else {
        GradeThresholds {
            min_board_ratio: cli.min_board_ratio,
            min_component_area: cli.min_component_area,
            max_component_area: cli.max_component_area,
            large_component_area: cli.large_component_area,
            low_density_threshold: cli.low_density_threshold,
            high_density_threshold: cli.high_density_threshold,
        }
    };
    thresholds.validate().map_err(|e| e.to_string())?;
    Ok(thresholds)
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let thresholds = match thresholds_from_cli(&cli) {
        Ok(t) => t,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };

    let image_bytes = match std::fs::read(&cli.image_path) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("Error reading {}: {e}", cli.image_path.display());
            return ExitCode::FAILURE;
        }
    };

    tracing::info!(
        path = %cli.image_path.display(),
        bytes = image_bytes.len(),
        runs = cli.runs,
        "grading"
    );
    tracing::debug!(?thresholds, "thresholds");

    let mut all_timings = Vec::with_capacity(cli.runs);

    for run in 0..cli.runs {
        if cli.runs > 1 {
            eprintln!("--- Run {}/{} ---", run + 1, cli.runs);
        }

        let (result, timings) =
            match scrapgrade_engine::grade_with_timings(&image_bytes, &thresholds, &StdClock) {
                Ok(out) => out,
                Err(e) if e.is_decode_error() => {
                    eprintln!("invalid image: {e}");
                    return ExitCode::FAILURE;
                }
                Err(e) => {
                    eprintln!("Grading error: {e}");
                    return ExitCode::FAILURE;
                }
            };

        let report = build_report(result);

        if cli.json {
            let out = serde_json::json!({ "report": report, "timings": timings });
            match serde_json::to_string_pretty(&out) {
                Ok(json) => println!("{json}"),
                Err(e) => {
                    eprintln!("Error serializing report: {e}");
                    return ExitCode::FAILURE;
                }
            }
        } else {
            println!("{}", format_report(&report));
            println!();
            println!("{}", timings.report());
        }

        all_timings.push(timings);

        if cli.runs > 1 {
            eprintln!();
        }
    }

    if cli.runs > 1 {
        print_multi_run_summary(&all_timings);
    }

    ExitCode::SUCCESS
}

/// Scan report with the built-in template explanation.
///
/// No narrative provider is configured here, so the report's explanation
/// source is always `local`.
fn build_report(result: AnalysisResult) -> ScanReport {
    ScanReport::build(result, None)
}

/// Human-readable summary of a scan report.
fn format_report(report: &ScanReport) -> String {
    let analysis = &report.analysis;
    let diagnostics = analysis.diagnostics();
    let mut lines = Vec::new();

    match analysis.grade() {
        Some(grade) => {
            lines.push(format!("Grade: {grade}  (confidence {:.2})", report.confidence));
            lines.push(format!(
                "Components: {}  (large {}, small {})",
                analysis.components_count(),
                diagnostics.large_components,
                diagnostics.small_components,
            ));
            lines.push(format!("Density: {:.3e} per substrate pixel", analysis.density_score()));
            lines.push(format!("Type guess: {}", analysis.type_guess()));
        }
        None => lines.push("Board not detected".to_owned()),
    }
    lines.push(format!(
        "Image: {}  substrate {:.1}%",
        diagnostics.image_size,
        diagnostics.board_ratio * 100.0,
    ));
    lines.push(String::new());
    lines.push(report.explanation.clone());

    lines.join("\n")
}

/// [`Clock`] implementation backed by [`std::time::Instant`].
struct StdClock;

impl Clock for StdClock {
    type Instant = Instant;

    fn now(&self) -> Instant {
        Instant::now()
    }

    fn elapsed(&self, since: &Instant) -> Duration {
        since.elapsed()
    }
}

/// Function pointer type for extracting a stage duration from timings.
type StageExtractor = fn(&RunTimings) -> Option<Duration>;

/// Print aggregated statistics across multiple runs.
#[allow(clippy::cast_precision_loss)]
fn print_multi_run_summary(all_timings: &[RunTimings]) {
    println!();
    println!("Summary ({} runs)\n{}", all_timings.len(), "=".repeat(60));

    if all_timings.is_empty() {
        println!("Warning: no timings to summarize");
        return;
    }

    let durations: Vec<f64> = all_timings
        .iter()
        .map(|t| t.total_duration.as_secs_f64() * 1000.0)
        .collect();

    let min = durations.iter().copied().reduce(f64::min).unwrap_or(0.0);
    let max = durations.iter().copied().reduce(f64::max).unwrap_or(0.0);
    let mean = durations.iter().sum::<f64>() / durations.len() as f64;

    println!("Total duration: min={min:.3}ms  mean={mean:.3}ms  max={max:.3}ms");

    println!();
    println!("{:<12} {:>12}", "Stage", "Mean (ms)");
    println!("{}", "-".repeat(28));

    let stage_extractors: &[(&str, StageExtractor)] = &[
        ("Decode", |t| Some(t.decode.duration)),
        ("Segment", |t| Some(t.segment.duration)),
        ("Gate", |t| Some(t.gate.duration)),
        ("Extract", |t| t.extract.as_ref().map(|s| s.duration)),
        ("Count", |t| t.count.as_ref().map(|s| s.duration)),
        ("Classify", |t| t.classify.as_ref().map(|s| s.duration)),
    ];

    for (name, extractor) in stage_extractors {
        let stage_durations: Vec<f64> = all_timings
            .iter()
            .filter_map(extractor)
            .map(|d| d.as_secs_f64() * 1000.0)
            .collect();

        if stage_durations.is_empty() {
            continue;
        }

        let stage_mean = stage_durations.iter().sum::<f64>() / stage_durations.len() as f64;
        println!("{name:<12} {stage_mean:>10.3}ms");
    }
}
