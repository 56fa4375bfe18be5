//! OCR preparation: grayscale, enhance, binarize.
//!
//! The output is a strictly two-valued page (0 = ink, 255 = paper) that
//! the text recognizer consumes. The binarization threshold is global and
//! fixed. Pages with uneven illumination are not compensated for.

use image::{DynamicImage, GrayImage, Luma};
use tracing::{debug, instrument};

use crate::enhance;
use crate::grayscale;
use crate::stage::{Stage, StageObserver, Unobserved};
use crate::types::AnalysisConfig;

/// Map every pixel below `threshold` to 0 and every other pixel to 255.
#[must_use = "returns the binary image"]
pub fn binarize(image: &GrayImage, threshold: u8) -> GrayImage {
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        if image.get_pixel(x, y).0[0] < threshold {
            Luma([0])
        } else {
            Luma([255])
        }
    })
}

/// Produce the cleaned binary page used for text recognition.
///
/// Steps, in this order:
///
/// 1. Luminance conversion
/// 2. Contrast boost by `config.contrast_factor`
/// 3. Sharpening by `config.sharpness_factor`
/// 4. Global threshold at `config.binarize_threshold`
///
/// Returns `None` when there is no image.
#[must_use]
#[instrument(skip_all)]
pub fn preprocess(image: Option<&DynamicImage>, config: &AnalysisConfig) -> Option<GrayImage> {
    image.map(|image| clean_page(image, config))
}

/// [`preprocess`] for a page that is known to be present.
#[must_use]
pub fn clean_page(image: &DynamicImage, config: &AnalysisConfig) -> GrayImage {
    let gray = grayscale::luminance(image);
    let cleaned = clean_gray(&gray, config, &mut Unobserved);

    debug!(
        width = cleaned.width(),
        height = cleaned.height(),
        ink_pixels = cleaned.pixels().filter(|p| p.0[0] == 0).count(),
        "page preprocessed"
    );
    cleaned
}

/// Steps 2 to 4 of [`preprocess`] on an already-converted page, each
/// run through `observer`.
#[must_use]
pub fn clean_gray(
    gray: &GrayImage,
    config: &AnalysisConfig,
    observer: &mut impl StageObserver,
) -> GrayImage {
    let contrasted = observer.run(Stage::Contrast, || {
        enhance::adjust_contrast(gray, config.contrast_factor)
    });
    let sharpened = observer.run(Stage::Sharpen, || {
        enhance::sharpen(&contrasted, config.sharpness_factor)
    });
    observer.run(Stage::Binarize, || binarize(&sharpened, config.binarize_threshold))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn threshold_is_inclusive_on_white_side() {
        let img = GrayImage::from_fn(2, 1, |x, _| Luma([if x == 0 { 139 } else { 140 }]));
        let out = binarize(&img, AnalysisConfig::DEFAULT_BINARIZE_THRESHOLD);
        assert_eq!(out.get_pixel(0, 0).0[0], 0);
        assert_eq!(out.get_pixel(1, 0).0[0], 255);
    }

    #[test]
    fn binarize_extremes() {
        let img = GrayImage::from_fn(2, 1, |x, _| Luma([if x == 0 { 0 } else { 255 }]));
        assert_eq!(binarize(&img, 0), GrayImage::from_pixel(2, 1, Luma([255])));
        assert_eq!(binarize(&img, 255).get_pixel(1, 0).0[0], 255);
        assert_eq!(binarize(&img, 255).get_pixel(0, 0).0[0], 0);
    }

    #[test]
    fn absent_image_yields_none() {
        assert!(preprocess(None, &AnalysisConfig::default()).is_none());
    }

    #[test]
    fn output_is_binary_and_same_size() {
        let img = DynamicImage::ImageRgb8(image::RgbImage::from_fn(23, 11, |x, y| {
            let v = u8::try_from((x * 11 + y * 7) % 256).unwrap();
            image::Rgb([v, v / 2, 255 - v])
        }));
        let out = preprocess(Some(&img), &AnalysisConfig::default()).unwrap();
        assert_eq!(out.dimensions(), (23, 11));
        assert!(out.pixels().all(|p| p.0[0] == 0 || p.0[0] == 255));
    }

    #[test]
    fn deterministic_on_identical_input() {
        let img = DynamicImage::ImageLuma8(GrayImage::from_fn(30, 30, |x, y| {
            Luma([u8::try_from((x * x + y * 3) % 256).unwrap()])
        }));
        let config = AnalysisConfig::default();
        let a = preprocess(Some(&img), &config).unwrap();
        let b = preprocess(Some(&img), &config).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn dark_text_on_light_page_becomes_ink_on_paper() {
        let mut page = GrayImage::from_pixel(20, 20, Luma([220]));
        for x in 5..15 {
            page.put_pixel(x, 10, Luma([40]));
        }
        let out = preprocess(Some(&DynamicImage::ImageLuma8(page)), &AnalysisConfig::default())
            .unwrap();
        assert_eq!(out.get_pixel(10, 10).0[0], 0);
        assert_eq!(out.get_pixel(2, 2).0[0], 255);
    }

    #[test]
    fn enhancement_order_is_observable() {
        let mut gray = GrayImage::from_pixel(3, 3, Luma([100]));
        gray.put_pixel(1, 1, Luma([160]));

        // Contrast first: mean 107, centre 186, border 96, then sharpen
        // around a smoothed centre of 131.
        let forward = enhance::sharpen(&enhance::adjust_contrast(&gray, 1.5), 2.0);
        // Sharpen first: centre 197, then contrast around mean 111.
        let reversed = enhance::adjust_contrast(&enhance::sharpen(&gray, 2.0), 1.5);

        assert_eq!(forward.get_pixel(1, 1).0[0], 241);
        assert_eq!(reversed.get_pixel(1, 1).0[0], 240);
    }
}
