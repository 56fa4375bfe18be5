//! Adapting caller-supplied pixels into images the pipeline can analyze.
//!
//! Two entry points: [`decode`] for encoded file bytes (PNG, JPEG, BMP,
//! GIF, WebP) and [`RawImage`] for an already-decoded bitmap described by
//! its width, height and channel count. [`load`] is the lenient form of
//! [`decode`] used where an undecodable upload simply means "no image".

use image::{DynamicImage, GrayAlphaImage, GrayImage, RgbImage, RgbaImage};
use tracing::{debug, warn};

use crate::types::PipelineError;

/// Decode raw image bytes.
///
/// # Errors
///
/// Returns [`PipelineError::EmptyInput`] if `bytes` is empty.
/// Returns [`PipelineError::ImageDecode`] if the image format is
/// unrecognized or the data is corrupt.
pub fn decode(bytes: &[u8]) -> Result<DynamicImage, PipelineError> {
    if bytes.is_empty() {
        return Err(PipelineError::EmptyInput);
    }

    let img = image::load_from_memory(bytes)?;
    debug!(
        input_bytes = bytes.len(),
        width = img.width(),
        height = img.height(),
        "decoded page image"
    );
    Ok(img)
}

/// Decode raw image bytes, treating any failure as "no image".
#[must_use]
pub fn load(bytes: &[u8]) -> Option<DynamicImage> {
    match decode(bytes) {
        Ok(img) => Some(img),
        Err(PipelineError::EmptyInput) => None,
        Err(e) => {
            warn!(error = %e, "ignoring undecodable page image");
            None
        }
    }
}

/// A decoded bitmap as handed over by the caller.
///
/// Pixels are row-major, 8 bits per channel, channels interleaved.
#[derive(Debug, Clone, Copy)]
pub struct RawImage<'a> {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Channels per pixel: 1 (luma), 2 (luma + alpha), 3 (RGB), 4 (RGBA).
    pub channels: u8,
    /// Interleaved pixel data, `width * height * channels` bytes.
    pub pixels: &'a [u8],
}

impl RawImage<'_> {
    /// Convert to a [`DynamicImage`].
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidImage`] for a zero dimension, an
    /// unsupported channel count, or a buffer of the wrong length.
    pub fn to_dynamic(&self) -> Result<DynamicImage, PipelineError> {
        if self.width == 0 || self.height == 0 {
            return Err(PipelineError::InvalidImage(format!(
                "zero-sized bitmap ({}x{})",
                self.width, self.height
            )));
        }

        let expected = u64::from(self.width) * u64::from(self.height) * u64::from(self.channels);
        if u64::try_from(self.pixels.len()).ok() != Some(expected) {
            return Err(PipelineError::InvalidImage(format!(
                "expected {expected} bytes for {}x{}x{}, got {}",
                self.width,
                self.height,
                self.channels,
                self.pixels.len()
            )));
        }

        let (w, h, data) = (self.width, self.height, self.pixels.to_vec());
        let img = match self.channels {
            1 => GrayImage::from_raw(w, h, data).map(DynamicImage::ImageLuma8),
            2 => GrayAlphaImage::from_raw(w, h, data).map(DynamicImage::ImageLumaA8),
            3 => RgbImage::from_raw(w, h, data).map(DynamicImage::ImageRgb8),
            4 => RgbaImage::from_raw(w, h, data).map(DynamicImage::ImageRgba8),
            n => {
                return Err(PipelineError::InvalidImage(format!(
                    "unsupported channel count {n}"
                )));
            }
        };

        img.ok_or_else(|| PipelineError::InvalidImage("buffer does not match dimensions".into()))
    }
}
