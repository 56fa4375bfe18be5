//! pagesift-pipeline: Pure document page analysis (sans-IO).
//!
//! Two branches run over one page image:
//!
//! - **OCR preparation:** grayscale -> contrast -> sharpen -> binarize,
//!   producing the cleaned page handed to a [`TextRecognizer`].
//! - **Structure detection:** grayscale -> Gaussian blur -> Canny edge
//!   map, which feeds both table region detection (area-filtered external
//!   contours) and diagram classification (global edge density).
//!
//! This crate has **no I/O dependencies**. It operates on in-memory
//! images and byte slices and returns structured data. Reading files and
//! running a real OCR engine live with the caller (see `pagesift-bench`
//! and the optional `tesseract` feature).
//!
//! Every stage treats a missing image as a normal input and returns the
//! stage's empty result instead of an error.

pub mod analyzer;
pub mod blur;
pub mod cache;
pub mod canny;
pub mod contour;
pub mod diagnostics;
pub mod diagram;
pub mod edge;
pub mod enhance;
pub mod grayscale;
pub mod ocr;
pub mod preprocess;
pub mod raster;
pub mod stage;
pub mod table;
pub mod types;

pub use analyzer::Analyzer;
pub use cache::{ContentKey, MemoCache, SessionCache};
pub use diagram::classify_diagram;
pub use edge::extract_edges;
pub use ocr::{LanguageModel, RecognitionError, TextRecognizer, Transcription};
#[cfg(feature = "tesseract")]
pub use ocr::TesseractRecognizer;
pub use preprocess::preprocess;
pub use raster::RawImage;
pub use stage::{Stage, StageObserver, Unobserved};
pub use table::find_table_regions;
pub use types::{
    AnalysisConfig, BoundingBox, Contour, DiagramVerdict, Dimensions, EdgeMap, PageAnalysis,
    PipelineError, Point, TableCandidate,
};

/// Decode an encoded page and run every analysis over it.
///
/// Takes raw image bytes (PNG, JPEG, BMP, GIF, WebP) and returns the
/// cleaned page, table candidates and diagram verdict.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidConfig`] if `config` fails validation.
/// Returns [`PipelineError::EmptyInput`] if `image_bytes` is empty.
/// Returns [`PipelineError::ImageDecode`] if the image format is unrecognized.
pub fn analyze(image_bytes: &[u8], config: &AnalysisConfig) -> Result<PageAnalysis, PipelineError> {
    let analyzer = Analyzer::new(config.clone())?;
    let image = raster::decode(image_bytes)?;
    Ok(analyzer.analyze(Some(&image)))
}
