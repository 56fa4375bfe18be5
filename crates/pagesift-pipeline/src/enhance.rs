//! Contrast and sharpness enhancement for OCR preparation.
//!
//! Both operations blend the page against a "degenerate" version of
//! itself and extrapolate away from it by a factor:
//!
//! - contrast: the degenerate image is flat gray at the page's mean
//!   luminance, so factors above 1.0 push pixels away from the mean;
//! - sharpness: the degenerate image is a 3×3 smoothed copy, so factors
//!   above 1.0 amplify local detail (unsharp masking).
//!
//! `out = clamp(degenerate + factor * (pixel - degenerate))`, truncated to
//! an integer. A factor of 1.0 leaves the page unchanged.

use image::{GrayImage, Luma};
use imageproc::definitions::Image;
use imageproc::filter::filter_clamped;
use imageproc::kernel::Kernel;

/// Smoothing weights for the sharpness degenerate image.
const SMOOTH_WEIGHTS: [i32; 9] = [1, 1, 1, 1, 5, 1, 1, 1, 1];
const SMOOTH_DIVISOR: i32 = 13;

/// Scale global contrast around the mean luminance.
#[must_use = "returns the contrast-adjusted image"]
pub fn adjust_contrast(image: &GrayImage, factor: f32) -> GrayImage {
    let Some(mean) = mean_luminance(image) else {
        return image.clone();
    };
    let mean = f32::from(mean);

    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        let p = f32::from(image.get_pixel(x, y).0[0]);
        Luma([blend(mean, p, factor)])
    })
}

/// Sharpen by extrapolating away from a 3×3 smoothed copy.
///
/// The outermost ring of pixels has no full neighbourhood; there the
/// smoothed copy equals the input, so those pixels are left as they are.
#[must_use = "returns the sharpened image"]
pub fn sharpen(image: &GrayImage, factor: f32) -> GrayImage {
    let (width, height) = image.dimensions();
    if width < 3 || height < 3 {
        return image.clone();
    }

    let sums: Image<Luma<i16>> = filter_clamped(image, Kernel::new(&SMOOTH_WEIGHTS, 3, 3));

    GrayImage::from_fn(width, height, |x, y| {
        let p = image.get_pixel(x, y).0[0];
        let on_border = x == 0 || y == 0 || x == width - 1 || y == height - 1;
        if on_border {
            return Luma([p]);
        }
        let sum = i32::from(sums.get_pixel(x, y).0[0]);
        let smoothed = (sum + SMOOTH_DIVISOR / 2) / SMOOTH_DIVISOR;
        #[allow(clippy::cast_precision_loss)]
        let smoothed = smoothed as f32;
        Luma([blend(smoothed, f32::from(p), factor)])
    })
}

/// Mean luminance rounded to the nearest integer, or `None` for an
/// image with no pixels.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn mean_luminance(image: &GrayImage) -> Option<u8> {
    let count = u64::from(image.width()) * u64::from(image.height());
    if count == 0 {
        return None;
    }
    let sum: u64 = image.pixels().map(|p| u64::from(p.0[0])).sum();
    #[allow(clippy::cast_precision_loss)]
    let mean = sum as f64 / count as f64;
    Some((mean + 0.5) as u8)
}

/// Extrapolate from `base` towards `pixel` by `factor`, clamped to u8.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn blend(base: f32, pixel: f32, factor: f32) -> u8 {
    let value = factor.mul_add(pixel - base, base);
    if value <= 0.0 {
        0
    } else if value >= 255.0 {
        255
    } else {
        value as u8
    }
}
