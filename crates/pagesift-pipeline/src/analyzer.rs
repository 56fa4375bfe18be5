//! Single entry point for every page analysis.
//!
//! An [`Analyzer`] owns a validated [`AnalysisConfig`] and, optionally, a
//! shared [`SessionCache`]. With a cache, the cleaned page and edge map of
//! a given page are computed once per session no matter how many
//! analyses or threads ask for them.

use std::sync::Arc;

use image::{DynamicImage, GrayImage};
use tracing::{debug, instrument, warn};

use crate::cache::{ContentKey, SessionCache};
use crate::diagram;
use crate::edge;
use crate::ocr::{LanguageModel, RecognitionError, TextRecognizer, Transcription};
use crate::preprocess;
use crate::table;
use crate::types::{
    AnalysisConfig, DiagramVerdict, Dimensions, EdgeMap, PageAnalysis, PipelineError,
    TableCandidate,
};

/// Runs the pipeline stages under one configuration.
#[derive(Debug, Clone)]
pub struct Analyzer {
    config: AnalysisConfig,
    cache: Option<Arc<SessionCache>>,
}

impl Analyzer {
    /// Create an analyzer without memoization.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] if `config` fails
    /// [`AnalysisConfig::validate`].
    pub fn new(config: AnalysisConfig) -> Result<Self, PipelineError> {
        config.validate()?;
        Ok(Self {
            config,
            cache: None,
        })
    }

    /// Create an analyzer that memoizes stage results in `cache`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] if `config` fails
    /// [`AnalysisConfig::validate`].
    pub fn with_cache(
        config: AnalysisConfig,
        cache: Arc<SessionCache>,
    ) -> Result<Self, PipelineError> {
        config.validate()?;
        Ok(Self {
            config,
            cache: Some(cache),
        })
    }

    /// The configuration every stage runs with.
    #[must_use]
    pub const fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// The session cache, if this analyzer memoizes.
    #[must_use]
    pub const fn cache(&self) -> Option<&Arc<SessionCache>> {
        self.cache.as_ref()
    }

    /// Cleaned binary page for text recognition, or `None` without an image.
    #[must_use]
    pub fn preprocess(&self, image: Option<&DynamicImage>) -> Option<Arc<GrayImage>> {
        let image = image?;
        let cleaned = match &self.cache {
            Some(cache) => cache
                .cleaned
                .get_or_compute(ContentKey::cleaned(image, &self.config), || {
                    preprocess::clean_page(image, &self.config)
                }),
            None => Arc::new(preprocess::clean_page(image, &self.config)),
        };
        Some(cleaned)
    }

    /// Binary edge map, empty without an image.
    #[must_use]
    pub fn extract_edges(&self, image: Option<&DynamicImage>) -> Arc<EdgeMap> {
        let Some(image) = image else {
            return Arc::new(EdgeMap::empty());
        };
        match &self.cache {
            Some(cache) => cache
                .edges
                .get_or_compute(ContentKey::edges(image, &self.config), || {
                    edge::edge_map(image, &self.config)
                }),
            None => Arc::new(edge::edge_map(image, &self.config)),
        }
    }

    /// Candidate table regions, in discovery order.
    #[must_use]
    pub fn find_table_regions(&self, image: Option<&DynamicImage>) -> Vec<TableCandidate> {
        table::find_table_regions(&self.extract_edges(image), &self.config)
    }

    /// Whole-page diagram verdict.
    #[must_use]
    pub fn classify_diagram(&self, image: Option<&DynamicImage>) -> DiagramVerdict {
        diagram::classify_diagram(&self.extract_edges(image), &self.config)
    }

    /// Run every analysis over one page.
    ///
    /// Tables and the diagram verdict share one edge map.
    #[must_use]
    #[instrument(skip_all)]
    pub fn analyze(&self, image: Option<&DynamicImage>) -> PageAnalysis {
        let dimensions = image.map_or_else(Dimensions::default, |image| Dimensions {
            width: image.width(),
            height: image.height(),
        });
        let cleaned = self.preprocess(image);
        let edges = self.extract_edges(image);
        let tables = table::find_table_regions(&edges, &self.config);
        let diagram = diagram::classify_diagram(&edges, &self.config);

        debug!(
            width = dimensions.width,
            height = dimensions.height,
            tables = tables.len(),
            is_diagram = diagram.is_diagram,
            "page analyzed"
        );
        PageAnalysis {
            dimensions,
            cleaned,
            tables,
            diagram,
        }
    }

    /// Preprocess the page and hand it to `recognizer`.
    ///
    /// # Errors
    ///
    /// Propagates the recognizer's [`RecognitionError`]. A missing image
    /// or an empty result is not an error.
    #[instrument(skip_all, fields(language = %language))]
    pub fn transcribe<R>(
        &self,
        image: Option<&DynamicImage>,
        recognizer: &R,
        language: &LanguageModel,
    ) -> Result<Transcription, RecognitionError>
    where
        R: TextRecognizer + ?Sized,
    {
        let Some(cleaned) = self.preprocess(image) else {
            return Ok(Transcription::NoImage);
        };
        match recognizer.recognize(&cleaned, language) {
            Ok(text) => Ok(Transcription::from_engine_output(text)),
            Err(e) => {
                warn!(error = %e, "text recognition failed");
                Err(e)
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use image::Luma;

    fn boxed_page() -> DynamicImage {
        DynamicImage::ImageLuma8(GrayImage::from_fn(120, 90, |x, y| {
            let inside = (20..80).contains(&x) && (20..70).contains(&y);
            Luma([if inside { 0 } else { 255 }])
        }))
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = AnalysisConfig {
            blur_kernel_size: 0,
            ..AnalysisConfig::default()
        };
        assert!(matches!(
            Analyzer::new(config),
            Err(PipelineError::InvalidConfig(_))
        ));
    }

    #[test]
    fn absent_image_yields_empty_results() {
        let analyzer = Analyzer::new(AnalysisConfig::default()).unwrap();
        let analysis = analyzer.analyze(None);
        assert_eq!(analysis.dimensions, Dimensions::default());
        assert!(analysis.cleaned.is_none());
        assert!(analysis.tables.is_empty());
        assert_eq!(analysis.diagram, DiagramVerdict::NONE);
    }

    #[test]
    fn analyze_matches_individual_stages() {
        let analyzer = Analyzer::new(AnalysisConfig::default()).unwrap();
        let page = boxed_page();
        let analysis = analyzer.analyze(Some(&page));
        assert_eq!(analysis.tables, analyzer.find_table_regions(Some(&page)));
        assert_eq!(analysis.diagram, analyzer.classify_diagram(Some(&page)));
        assert_eq!(
            analysis.cleaned.as_deref(),
            analyzer.preprocess(Some(&page)).as_deref()
        );
        assert_eq!(analysis.tables.len(), 1);
    }

    #[test]
    fn cached_and_uncached_results_agree() {
        let page = boxed_page();
        let plain = Analyzer::new(AnalysisConfig::default()).unwrap();
        let cache = Arc::new(SessionCache::new());
        let cached = Analyzer::with_cache(AnalysisConfig::default(), Arc::clone(&cache)).unwrap();

        assert_eq!(plain.extract_edges(Some(&page)), cached.extract_edges(Some(&page)));
        assert_eq!(plain.preprocess(Some(&page)), cached.preprocess(Some(&page)));
        assert_eq!(cache.edges.len(), 1);
        assert_eq!(cache.cleaned.len(), 1);
    }

    #[test]
    fn cache_is_shared_between_analyzers() {
        let page = boxed_page();
        let cache = Arc::new(SessionCache::new());
        let first = Analyzer::with_cache(AnalysisConfig::default(), Arc::clone(&cache)).unwrap();
        let second = Analyzer::with_cache(AnalysisConfig::default(), Arc::clone(&cache)).unwrap();

        let a = first.extract_edges(Some(&page));
        let b = second.extract_edges(Some(&page));
        assert!(Arc::ptr_eq(&a, &b));

        let retuned = AnalysisConfig {
            canny_high: 200.0,
            ..AnalysisConfig::default()
        };
        let third = Analyzer::with_cache(retuned, Arc::clone(&cache)).unwrap();
        let _ = third.extract_edges(Some(&page));
        assert_eq!(cache.edges.len(), 2);
    }

    #[test]
    fn transcribe_without_image_skips_recognizer() {
        let analyzer = Analyzer::new(AnalysisConfig::default()).unwrap();
        let calls = AtomicUsize::new(0);
        let recognizer = |_: &GrayImage, _: &LanguageModel| -> Result<String, RecognitionError> {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(String::from("never"))
        };
        let out = analyzer
            .transcribe(None, &recognizer, &LanguageModel::default())
            .unwrap();
        assert_eq!(out, Transcription::NoImage);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn transcribe_passes_cleaned_page_and_language() {
        let analyzer = Analyzer::new(AnalysisConfig::default()).unwrap();
        let page = boxed_page();
        let recognizer = |image: &GrayImage, language: &LanguageModel| -> Result<String, RecognitionError> {
            assert!(image.pixels().all(|p| p.0[0] == 0 || p.0[0] == 255));
            Ok(format!("{language}:{}", image.width()))
        };
        let out = analyzer
            .transcribe(Some(&page), &recognizer, &LanguageModel::hindi())
            .unwrap();
        assert_eq!(out, Transcription::Text(String::from("hin:120")));
    }

    #[test]
    fn blank_output_is_no_text() {
        let analyzer = Analyzer::new(AnalysisConfig::default()).unwrap();
        let recognizer =
            |_: &GrayImage, _: &LanguageModel| -> Result<String, RecognitionError> {
                Ok(String::from("  \n"))
            };
        let out = analyzer
            .transcribe(Some(&boxed_page()), &recognizer, &LanguageModel::default())
            .unwrap();
        assert_eq!(out, Transcription::NoText);
    }

    #[test]
    fn recognizer_errors_propagate() {
        let analyzer = Analyzer::new(AnalysisConfig::default()).unwrap();
        let recognizer = |_: &GrayImage, language: &LanguageModel| -> Result<String, RecognitionError> {
            Err(RecognitionError::UnsupportedLanguage(language.to_string()))
        };
        let err = analyzer
            .transcribe(Some(&boxed_page()), &recognizer, &LanguageModel::hindi())
            .unwrap_err();
        assert_eq!(err, RecognitionError::UnsupportedLanguage(String::from("hin")));
    }
}
