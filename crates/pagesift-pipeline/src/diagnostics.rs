//! Analysis diagnostics: timing and counts for each pipeline stage.
//!
//! [`analyze_with_diagnostics`] runs the same stage chains as
//! [`Analyzer::analyze`](crate::Analyzer::analyze), observed through a
//! [`StageObserver`] that records how long each step took, and reports
//! what each produced. Time is read through
//! a caller-supplied [`Clock`] so the library does not depend on a
//! particular time source.
//!
//! Durations are serialized as fractional seconds (`f64`) for JSON
//! compatibility, since `std::time::Duration` does not implement serde
//! traits.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::stage::{Stage, StageObserver};
use crate::types::{AnalysisConfig, Dimensions, PageAnalysis, PipelineError};
use crate::{contour, diagram, edge, grayscale, preprocess, raster, table};

/// Monotonic time source used to measure stage durations.
pub trait Clock {
    /// Opaque timestamp.
    type Instant;

    /// The current time.
    fn now(&self) -> Self::Instant;

    /// Time elapsed since `since`.
    fn elapsed(&self, since: &Self::Instant) -> Duration;
}

/// Serde support for `std::time::Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom(
                "duration seconds must be finite, non-negative, and representable as a Duration",
            )
        })
    }
}

/// Diagnostics collected from a single analysis run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisDiagnostics {
    /// Image decoding.
    pub decode: StageDiagnostics,
    /// Luminance conversion (shared by both branches).
    pub grayscale: StageDiagnostics,
    /// Contrast boost.
    pub contrast: StageDiagnostics,
    /// Sharpening.
    pub sharpen: StageDiagnostics,
    /// Global threshold.
    pub binarize: StageDiagnostics,
    /// Gaussian blur.
    pub blur: StageDiagnostics,
    /// Canny edge detection.
    pub edge_detection: StageDiagnostics,
    /// External contour tracing.
    pub contour_tracing: StageDiagnostics,
    /// Area filter.
    pub table_filter: StageDiagnostics,
    /// Edge-density classification.
    pub diagram: StageDiagnostics,
    /// Wall-clock duration of the whole run (seconds).
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
    /// Summary counts across all stages.
    pub summary: AnalysisSummary,
}

/// Diagnostics for a single stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageDiagnostics {
    /// Wall-clock duration of this stage (seconds).
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// Stage-specific metrics.
    pub metrics: StageMetrics,
}

/// Stage-specific metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StageMetrics {
    /// Image decoding metrics.
    Decode {
        /// Size of the input bytes.
        input_bytes: usize,
        /// Decoded width in pixels.
        width: u32,
        /// Decoded height in pixels.
        height: u32,
    },
    /// Luminance conversion metrics.
    Grayscale {
        /// Mean luminance of the page.
        mean_luminance: f64,
    },
    /// Contrast or sharpness enhancement.
    Enhance {
        /// Enhancement factor applied.
        factor: f32,
    },
    /// Binarization metrics.
    Binarize {
        /// Threshold applied.
        threshold: u8,
        /// Pixels mapped to ink (0).
        ink_pixel_count: u64,
    },
    /// Gaussian blur metrics.
    Blur {
        /// Kernel side length.
        kernel_size: u32,
    },
    /// Canny edge detection metrics.
    EdgeDetection {
        /// Low threshold.
        low_threshold: f32,
        /// High threshold.
        high_threshold: f32,
        /// Number of edge pixels in the map.
        edge_pixel_count: u64,
        /// Total pixel count.
        total_pixel_count: u64,
    },
    /// Contour tracing metrics.
    ContourTracing {
        /// External contours found.
        contour_count: usize,
        /// Points across all contours after chain compression.
        total_point_count: usize,
    },
    /// Table area filter metrics.
    TableFilter {
        /// Minimum area applied.
        min_area: f64,
        /// Contours that passed.
        candidate_count: usize,
        /// Largest candidate area, 0 when there is none.
        largest_area: f64,
    },
    /// Diagram classification metrics.
    Diagram {
        /// Density threshold applied.
        threshold: f64,
        /// Measured edge density.
        edge_density: f64,
        /// Verdict.
        is_diagram: bool,
    },
}

/// High-level summary for the whole run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisSummary {
    /// Source image width in pixels.
    pub image_width: u32,
    /// Source image height in pixels.
    pub image_height: u32,
    /// Total pixel count.
    pub pixel_count: u64,
    /// Number of table candidates.
    pub table_count: usize,
    /// Whether the page was classified as a diagram.
    pub is_diagram: bool,
}

impl AnalysisDiagnostics {
    /// Stages in execution order, with display names.
    #[must_use]
    pub fn stages(&self) -> [(&'static str, &StageDiagnostics); 10] {
        [
            ("Decode", &self.decode),
            ("Grayscale", &self.grayscale),
            ("Contrast", &self.contrast),
            ("Sharpen", &self.sharpen),
            ("Binarize", &self.binarize),
            ("Blur", &self.blur),
            ("Edge Detection", &self.edge_detection),
            ("Contour Tracing", &self.contour_tracing),
            ("Table Filter", &self.table_filter),
            ("Diagram", &self.diagram),
        ]
    }

    /// Format diagnostics as a human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Page Analysis Report\n{}", "=".repeat(60)));
        lines.push(format!(
            "Image: {}x{} ({} pixels)",
            self.summary.image_width, self.summary.image_height, self.summary.pixel_count,
        ));
        lines.push(format!(
            "Total duration: {:.3}ms",
            duration_ms(self.total_duration),
        ));
        lines.push(String::new());

        lines.push(format!(
            "{:<24} {:>10} {:>10}  {}",
            "Stage", "Duration", "% Total", "Details"
        ));
        lines.push("-".repeat(80));

        let total_ms = duration_ms(self.total_duration);
        for (name, diag) in self.stages() {
            let ms = duration_ms(diag.duration);
            let pct = if total_ms > 0.0 {
                ms / total_ms * 100.0
            } else {
                0.0
            };
            let details = format_metrics(&diag.metrics);
            lines.push(format!("{name:<24} {ms:>8.3}ms {pct:>9.1}%  {details}"));
        }

        lines.push(String::new());
        lines.push(format!(
            "Tables: {}  |  Diagram: {}",
            self.summary.table_count,
            if self.summary.is_diagram { "yes" } else { "no" },
        ));

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
            input_bytes,
            width,
            height,
        } => format!("{input_bytes} bytes -> {width}x{height}"),
        StageMetrics::Grayscale { mean_luminance } => format!("mean={mean_luminance:.1}"),
        StageMetrics::Enhance { factor } => format!("factor={factor:.2}"),
        StageMetrics::Binarize {
            threshold,
            ink_pixel_count,
        } => format!("threshold={threshold} ink={ink_pixel_count}"),
        StageMetrics::Blur { kernel_size } => format!("kernel={kernel_size}x{kernel_size}"),
        StageMetrics::EdgeDetection {
            low_threshold,
            high_threshold,
            edge_pixel_count,
            total_pixel_count,
        } => {
            #[allow(clippy::cast_precision_loss)]
            let density = if *total_pixel_count > 0 {
                *edge_pixel_count as f64 / *total_pixel_count as f64 * 100.0
            } else {
                0.0
            };
            format!(
                "low={low_threshold:.1} high={high_threshold:.1} edges={edge_pixel_count} ({density:.1}%)",
            )
        }
        StageMetrics::ContourTracing {
            contour_count,
            total_point_count,
        } => format!("{contour_count} external, {total_point_count} pts"),
        StageMetrics::TableFilter {
            min_area,
            candidate_count,
            largest_area,
        } => format!("area>{min_area:.0}: {candidate_count} candidates (max={largest_area:.0})"),
        StageMetrics::Diagram {
            threshold,
            edge_density,
            is_diagram,
        } => format!("density={edge_density:.4} threshold={threshold:.2} diagram={is_diagram}"),
    }
}

/// Run `f`, returning its result and how long it took on `clock`.
fn timed<C: Clock, T>(clock: &C, f: impl FnOnce() -> T) -> (T, Duration) {
    let start = clock.now();
    let value = f();
    (value, clock.elapsed(&start))
}

/// Records the duration of each observed [`Stage`].
struct StageTimer<'c, C> {
    clock: &'c C,
    contrast: Duration,
    sharpen: Duration,
    binarize: Duration,
    blur: Duration,
    edge_detection: Duration,
}

impl<'c, C: Clock> StageTimer<'c, C> {
    const fn new(clock: &'c C) -> Self {
        Self {
            clock,
            contrast: Duration::ZERO,
            sharpen: Duration::ZERO,
            binarize: Duration::ZERO,
            blur: Duration::ZERO,
            edge_detection: Duration::ZERO,
        }
    }
}

impl<C: Clock> StageObserver for StageTimer<'_, C> {
    fn run<T>(&mut self, stage: Stage, step: impl FnOnce() -> T) -> T {
        let (value, duration) = timed(self.clock, step);
        let slot = match stage {
            Stage::Contrast => &mut self.contrast,
            Stage::Sharpen => &mut self.sharpen,
            Stage::Binarize => &mut self.binarize,
            Stage::Blur => &mut self.blur,
            Stage::EdgeDetection => &mut self.edge_detection,
        };
        *slot += duration;
        value
    }
}

#[allow(clippy::cast_precision_loss)]
fn mean_luminance(image: &image::GrayImage) -> f64 {
    let total = u64::from(image.width()) * u64::from(image.height());
    if total == 0 {
        return 0.0;
    }
    let sum: u64 = image.pixels().map(|p| u64::from(p.0[0])).sum();
    sum as f64 / total as f64
}

/// Decode `bytes` and run every analysis, timing each stage.
///
/// Produces the same [`PageAnalysis`] as
/// [`Analyzer::analyze`](crate::Analyzer::analyze) without a cache.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidConfig`] for a configuration that fails
/// validation, and [`PipelineError::EmptyInput`] or
/// [`PipelineError::ImageDecode`] when `bytes` is not a decodable image.
#[instrument(skip_all, fields(input_bytes = bytes.len()))]
pub fn analyze_with_diagnostics<C: Clock>(
    bytes: &[u8],
    config: &AnalysisConfig,
    clock: &C,
) -> Result<(PageAnalysis, AnalysisDiagnostics), PipelineError> {
    config.validate()?;
    let run_start = clock.now();

    let (decoded, decode_time) = timed(clock, || raster::decode(bytes));
    let image = decoded?;
    let dimensions = Dimensions {
        width: image.width(),
        height: image.height(),
    };

    let (gray, grayscale_time) = timed(clock, || grayscale::luminance(&image));

    let mut timer = StageTimer::new(clock);
    let cleaned = preprocess::clean_gray(&gray, config, &mut timer);
    let edges = edge::edges_from_gray(&gray, config, &mut timer);

    let (contours, contour_time) = timed(clock, || contour::trace_external(&edges));
    let contour_count = contours.len();
    let total_point_count = contours.iter().map(crate::types::Contour::len).sum();

    let (tables, table_time) = timed(clock, || {
        table::filter_candidates(contours, config.table_min_area)
    });
    let (diagram, diagram_time) = timed(clock, || diagram::classify_diagram(&edges, config));

    let total_duration = clock.elapsed(&run_start);

    let ink_pixel_count = cleaned.pixels().map(|p| u64::from(p.0[0] == 0)).sum();
    let largest_area = tables.iter().map(|t| t.area).fold(0.0, f64::max);

    let diagnostics = AnalysisDiagnostics {
        decode: StageDiagnostics {
            duration: decode_time,
            metrics: StageMetrics::Decode {
                input_bytes: bytes.len(),
                width: dimensions.width,
                height: dimensions.height,
            },
        },
        grayscale: StageDiagnostics {
            duration: grayscale_time,
            metrics: StageMetrics::Grayscale {
                mean_luminance: mean_luminance(&gray),
            },
        },
        contrast: StageDiagnostics {
            duration: timer.contrast,
            metrics: StageMetrics::Enhance {
                factor: config.contrast_factor,
            },
        },
        sharpen: StageDiagnostics {
            duration: timer.sharpen,
            metrics: StageMetrics::Enhance {
                factor: config.sharpness_factor,
            },
        },
        binarize: StageDiagnostics {
            duration: timer.binarize,
            metrics: StageMetrics::Binarize {
                threshold: config.binarize_threshold,
                ink_pixel_count,
            },
        },
        blur: StageDiagnostics {
            duration: timer.blur,
            metrics: StageMetrics::Blur {
                kernel_size: config.blur_kernel_size,
            },
        },
        edge_detection: StageDiagnostics {
            duration: timer.edge_detection,
            metrics: StageMetrics::EdgeDetection {
                low_threshold: config.canny_low,
                high_threshold: config.canny_high,
                edge_pixel_count: edges.edge_pixel_count(),
                total_pixel_count: dimensions.pixel_count(),
            },
        },
        contour_tracing: StageDiagnostics {
            duration: contour_time,
            metrics: StageMetrics::ContourTracing {
                contour_count,
                total_point_count,
            },
        },
        table_filter: StageDiagnostics {
            duration: table_time,
            metrics: StageMetrics::TableFilter {
                min_area: config.table_min_area,
                candidate_count: tables.len(),
                largest_area,
            },
        },
        diagram: StageDiagnostics {
            duration: diagram_time,
            metrics: StageMetrics::Diagram {
                threshold: config.diagram_density_threshold,
                edge_density: diagram.edge_density,
                is_diagram: diagram.is_diagram,
            },
        },
        total_duration,
        summary: AnalysisSummary {
            image_width: dimensions.width,
            image_height: dimensions.height,
            pixel_count: dimensions.pixel_count(),
            table_count: tables.len(),
            is_diagram: diagram.is_diagram,
        },
    };

    info!(
        total_ms = duration_ms(total_duration),
        tables = tables.len(),
        is_diagram = diagram.is_diagram,
        "analysis complete"
    );

    let analysis = PageAnalysis {
        dimensions,
        cleaned: Some(Arc::new(cleaned)),
        tables,
        diagram,
    };
    Ok((analysis, diagnostics))
}
