//! pagesift-bench: CLI tool for running page analysis on image files.
//!
//! Runs the analysis pipeline on a given page image, printing per-stage
//! diagnostics, the table candidates found and the diagram verdict.
//! Useful for:
//!
//! - Checking why a page was (or was not) flagged as a diagram
//! - Inspecting table candidate boundaries and areas
//! - Saving the cleaned page to see exactly what the OCR engine receives
//! - Measuring per-stage durations to identify bottlenecks
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin pagesift-bench -- [OPTIONS] <IMAGE_PATH>
//! ```
//!
//! Logging goes to stderr and is controlled by `RUST_LOG`
//! (default `warn`).

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::Parser;
use pagesift_pipeline::diagnostics::{AnalysisDiagnostics, Clock};
use pagesift_pipeline::{AnalysisConfig, LanguageModel, PageAnalysis};
use tracing::error;
use tracing_subscriber::EnvFilter;

/// Page analysis diagnostics for pagesift.
///
/// Prepares a scanned page for OCR, detects table candidates and
/// classifies diagram pages, printing per-stage timing and counts.
#[derive(Parser)]
#[command(name = "pagesift-bench", version)]
struct Cli {
    /// Path to the input image (PNG, JPEG, BMP, GIF, WebP).
    image_path: PathBuf,

    /// Write the cleaned (binarized) page to this PNG file.
    #[arg(long)]
    cleaned: Option<PathBuf>,

    /// Language model for text recognition (e.g. `eng`, `hin`, `hin+eng`).
    #[arg(long, default_value = LanguageModel::ENGLISH, value_parser = parse_language)]
    lang: LanguageModel,

    /// Run Tesseract on the cleaned page and print the text.
    #[cfg(feature = "tesseract")]
    #[arg(long)]
    ocr: bool,

    /// Number of runs for averaging.
    #[arg(long, default_value_t = 1, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
    runs: usize,

    /// Output analysis and diagnostics as JSON instead of a report.
    #[arg(long)]
    json: bool,
}

fn parse_language(s: &str) -> Result<LanguageModel, String> {
    s.parse().map_err(|e: pagesift_pipeline::RecognitionError| e.to_string())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = AnalysisConfig::default();

    let image_bytes = match std::fs::read(&cli.image_path) {
        Ok(bytes) => bytes,
        Err(e) => {
            error!(path = %cli.image_path.display(), "failed to read image: {e}");
            return ExitCode::FAILURE;
        }
    };

    eprintln!(
        "Image: {} ({} bytes)",
        cli.image_path.display(),
        image_bytes.len(),
    );
    eprintln!("Language: {}", cli.lang);
    eprintln!("Runs: {}", cli.runs);
    eprintln!();

    let mut all_diagnostics = Vec::with_capacity(cli.runs);
    let mut first_analysis = None;

    for run in 0..cli.runs {
        if cli.runs > 1 {
            eprintln!("--- Run {}/{} ---", run + 1, cli.runs);
        }

        match pagesift_pipeline::diagnostics::analyze_with_diagnostics(
            &image_bytes,
            &config,
            &StdClock,
        ) {
            Ok((analysis, diagnostics)) => {
                if cli.json {
                    let value = serde_json::json!({
                        "analysis": &analysis,
                        "diagnostics": &diagnostics,
                    });
                    match serde_json::to_string_pretty(&value) {
                        Ok(json) => println!("{json}"),
                        Err(e) => {
                            error!("failed to serialize diagnostics: {e}");
                            return ExitCode::FAILURE;
                        }
                    }
                } else {
                    println!("{}", diagnostics.report());
                }

                all_diagnostics.push(diagnostics);
                if first_analysis.is_none() {
                    first_analysis = Some(analysis);
                }
            }
            Err(e) => {
                error!("pipeline error: {e}");
                return ExitCode::FAILURE;
            }
        }

        if cli.runs > 1 {
            eprintln!();
        }
    }

    let Some(analysis) = first_analysis else {
        return ExitCode::FAILURE;
    };

    if !cli.json {
        print_tables(&analysis);
    }

    if let Some(ref path) = cli.cleaned
        && !write_cleaned(&analysis, path)
    {
        return ExitCode::FAILURE;
    }

    #[cfg(feature = "tesseract")]
    if cli.ocr && !run_ocr(&image_bytes, &config, &cli.lang) {
        return ExitCode::FAILURE;
    }

    if cli.runs > 1 {
        print_multi_run_summary(&all_diagnostics);
    }

    ExitCode::SUCCESS
}

/// Print each table candidate's bounds and area.
fn print_tables(analysis: &PageAnalysis) {
    if analysis.tables.is_empty() {
        return;
    }
    println!();
    println!(
        "{:<6} {:>12} {:>12} {:>10} {:>8}",
        "Table", "Origin", "Size", "Area", "Points"
    );
    println!("{}", "-".repeat(52));
    for (i, table) in analysis.tables.iter().enumerate() {
        let b = table.bounds;
        let origin = format!("{},{}", b.x, b.y);
        let size = format!("{}x{}", b.width, b.height);
        println!(
            "{:<6} {origin:>12} {size:>12} {:>10.0} {:>8}",
            i + 1,
            table.area,
            table.contour.len(),
        );
    }
}

/// Save the cleaned page as PNG. Returns `false` on failure.
fn write_cleaned(analysis: &PageAnalysis, path: &Path) -> bool {
    let Some(ref cleaned) = analysis.cleaned else {
        error!("no cleaned page to write");
        return false;
    };
    match cleaned.save_with_format(path, image::ImageFormat::Png) {
        Ok(()) => {
            eprintln!("Cleaned page written to {}", path.display());
            true
        }
        Err(e) => {
            error!(path = %path.display(), "failed to write cleaned page: {e}");
            false
        }
    }
}

/// Transcribe the page with Tesseract. Returns `false` on failure.
#[cfg(feature = "tesseract")]
fn run_ocr(image_bytes: &[u8], config: &AnalysisConfig, language: &LanguageModel) -> bool {
    use pagesift_pipeline::{Analyzer, TesseractRecognizer, Transcription};

    let analyzer = match Analyzer::new(config.clone()) {
        Ok(a) => a,
        Err(e) => {
            error!("pipeline error: {e}");
            return false;
        }
    };
    let image = pagesift_pipeline::raster::load(image_bytes);
    match analyzer.transcribe(image.as_ref(), &TesseractRecognizer::new(), language) {
        Ok(Transcription::Text(text)) => {
            println!();
            println!("{text}");
            true
        }
        Ok(Transcription::NoText) => {
            eprintln!("No text recognized");
            true
        }
        Ok(Transcription::NoImage) => {
            eprintln!("No image to recognize");
            true
        }
        Err(e) => {
            error!("OCR error: {e}");
            false
        }
    }
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

/// Print aggregated statistics across multiple runs.
#[allow(clippy::cast_precision_loss)]
fn print_multi_run_summary(all_diagnostics: &[AnalysisDiagnostics]) {
    println!();
    println!(
        "Summary ({} runs)\n{}",
        all_diagnostics.len(),
        "=".repeat(60),
    );

    if all_diagnostics.is_empty() {
        println!("Warning: no diagnostics to summarize");
        return;
    }

    let durations: Vec<f64> = all_diagnostics
        .iter()
        .map(|d| d.total_duration.as_secs_f64() * 1000.0)
        .collect();

    let min = durations.iter().copied().reduce(f64::min).unwrap_or(0.0);
    let max = durations.iter().copied().reduce(f64::max).unwrap_or(0.0);
    let mean = durations.iter().sum::<f64>() / durations.len() as f64;

    println!("Total duration: min={min:.3}ms  mean={mean:.3}ms  max={max:.3}ms");

    println!();
    println!("{:<24} {:>12}", "Stage", "Mean (ms)");
    println!("{}", "-".repeat(40));

    let names = all_diagnostics[0].stages().map(|(name, _)| name);
    for (index, name) in names.iter().enumerate() {
        let total: f64 = all_diagnostics
            .iter()
            .map(|d| d.stages()[index].1.duration.as_secs_f64() * 1000.0)
            .sum();
        let stage_mean = total / all_diagnostics.len() as f64;
        println!("{name:<24} {stage_mean:>10.3}ms");
    }
}
