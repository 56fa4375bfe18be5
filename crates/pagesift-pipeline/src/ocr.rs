//! Text recognition seam.
//!
//! The pipeline does not recognize text itself. It hands the cleaned page
//! to a [`TextRecognizer`] together with a [`LanguageModel`] selector and
//! reports the outcome as a [`Transcription`]. An empty page is a
//! [`Transcription::NoText`] value; only engine failures are errors.
//!
//! With the `tesseract` feature, [`TesseractRecognizer`] provides a
//! recognizer backed by a system Tesseract installation.

use std::fmt;
use std::str::FromStr;

use image::GrayImage;
use serde::{Deserialize, Serialize};

/// Errors reported by a text recognition engine.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecognitionError {
    /// No recognition engine could be initialized.
    #[error("text recognition engine unavailable: {0}")]
    Unavailable(String),

    /// The requested language model is not installed or not valid.
    #[error("unsupported language model: {0}")]
    UnsupportedLanguage(String),

    /// The engine failed while recognizing the page.
    #[error("text recognition failed: {0}")]
    Engine(String),
}

/// Opaque selector for the script/language model to recognize with.
///
/// Codes follow the Tesseract convention: `eng`, `hin`, and
/// `+`-joined combinations such as `hin+eng`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LanguageModel(String);

impl LanguageModel {
    /// English.
    pub const ENGLISH: &'static str = "eng";
    /// Hindi.
    pub const HINDI: &'static str = "hin";

    /// Parse and validate a language code.
    ///
    /// # Errors
    ///
    /// Returns [`RecognitionError::UnsupportedLanguage`] for an empty
    /// code, an empty `+` component, or characters outside
    /// `[A-Za-z0-9_+]`.
    pub fn new(code: &str) -> Result<Self, RecognitionError> {
        let valid_part = |part: &str| {
            !part.is_empty()
                && part
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_')
        };
        if code.split('+').all(valid_part) {
            Ok(Self(code.to_owned()))
        } else {
            Err(RecognitionError::UnsupportedLanguage(code.to_owned()))
        }
    }

    /// Combine several models into one selector (`hin+eng`).
    #[must_use]
    pub fn combined(models: &[Self]) -> Option<Self> {
        if models.is_empty() {
            return None;
        }
        let joined = models
            .iter()
            .map(Self::as_str)
            .collect::<Vec<_>>()
            .join("+");
        Some(Self(joined))
    }

    /// The English model.
    #[must_use]
    pub fn english() -> Self {
        Self(Self::ENGLISH.to_owned())
    }

    /// The Hindi model.
    #[must_use]
    pub fn hindi() -> Self {
        Self(Self::HINDI.to_owned())
    }

    /// The selector string passed to the engine.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for LanguageModel {
    fn default() -> Self {
        Self::english()
    }
}

impl fmt::Display for LanguageModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for LanguageModel {
    type Err = RecognitionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for LanguageModel {
    type Error = RecognitionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<LanguageModel> for String {
    fn from(value: LanguageModel) -> Self {
        value.0
    }
}

/// An external engine that turns a cleaned page into text.
pub trait TextRecognizer {
    /// Recognize the text on `image` using `language`.
    ///
    /// # Errors
    ///
    /// Returns a [`RecognitionError`] when the engine cannot run or fails.
    fn recognize(&self, image: &GrayImage, language: &LanguageModel)
    -> Result<String, RecognitionError>;
}

impl<F> TextRecognizer for F
where
    F: Fn(&GrayImage, &LanguageModel) -> Result<String, RecognitionError>,
{
    fn recognize(
        &self,
        image: &GrayImage,
        language: &LanguageModel,
    ) -> Result<String, RecognitionError> {
        self(image, language)
    }
}

/// Outcome of transcribing a page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Transcription {
    /// There was no page to transcribe.
    NoImage,
    /// The engine ran but found nothing but whitespace.
    NoText,
    /// Recognized text, as returned by the engine.
    Text(String),
}

impl Transcription {
    /// Classify raw engine output.
    #[must_use]
    pub fn from_engine_output(text: String) -> Self {
        if text.trim().is_empty() {
            Self::NoText
        } else {
            Self::Text(text)
        }
    }

    /// The recognized text, if any.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::NoImage | Self::NoText => None,
        }
    }
}

#[cfg(feature = "tesseract")]
pub use backend::TesseractRecognizer;

#[cfg(feature = "tesseract")]
mod backend {
    use image::GrayImage;
    use tesseract::Tesseract;
    use tracing::{debug, instrument};

    use super::{LanguageModel, RecognitionError, TextRecognizer};

    /// Recognizer backed by the system Tesseract library.
    ///
    /// A fresh engine is initialized per page, so one recognizer can be
    /// shared across threads.
    #[derive(Debug, Clone, Default)]
    pub struct TesseractRecognizer {
        datapath: Option<String>,
    }

    impl TesseractRecognizer {
        /// Use the default tessdata location.
        #[must_use]
        pub const fn new() -> Self {
            Self { datapath: None }
        }

        /// Load language models from `datapath`.
        #[must_use]
        pub fn with_datapath(datapath: impl Into<String>) -> Self {
            Self {
                datapath: Some(datapath.into()),
            }
        }
    }

    impl TextRecognizer for TesseractRecognizer {
        #[instrument(skip_all, fields(language = %language))]
        fn recognize(
            &self,
            image: &GrayImage,
            language: &LanguageModel,
        ) -> Result<String, RecognitionError> {
            let mut png = Vec::new();
            image::ImageEncoder::write_image(
                image::codecs::png::PngEncoder::new(&mut png),
                image.as_raw(),
                image.width(),
                image.height(),
                image::ExtendedColorType::L8,
            )
            .map_err(|e| RecognitionError::Engine(format!("failed to encode page: {e}")))?;

            let engine = Tesseract::new(self.datapath.as_deref(), Some(language.as_str()))
                .map_err(|e| RecognitionError::UnsupportedLanguage(format!("{language}: {e}")))?;
            let mut engine = engine
                .set_image_from_mem(&png)
                .map_err(|e| RecognitionError::Engine(e.to_string()))?;
            let text = engine
                .get_text()
                .map_err(|e| RecognitionError::Engine(e.to_string()))?;

            debug!(chars = text.len(), "tesseract finished");
            Ok(text)
        }
    }
}
