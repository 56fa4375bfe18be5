//! Gaussian blur for noise reduction before edge detection.
//!
//! The kernel is specified by its side length rather than by sigma. Small
//! kernels use the usual binomial approximations (the 5-tap kernel is
//! `[1 4 6 4 1] / 16`); larger ones derive sigma from the size as
//! `sigma = 0.3 * ((size - 1) / 2 - 1) + 0.8`.
//!
//! The blur is applied separably with
//! [`imageproc::filter::separable_filter_equal`].

use image::GrayImage;

/// Normalized 1D Gaussian weights for an odd kernel `size`.
///
/// Returns `None` for even or zero sizes.
#[must_use]
pub fn gaussian_kernel(size: u32) -> Option<Vec<f32>> {
    if size % 2 == 0 {
        return None;
    }

    let fixed: Option<&[f32]> = match size {
        1 => Some(&[1.0]),
        3 => Some(&[0.25, 0.5, 0.25]),
        5 => Some(&[0.0625, 0.25, 0.375, 0.25, 0.0625]),
        7 => Some(&[
            0.031_25, 0.109_375, 0.218_75, 0.281_25, 0.218_75, 0.109_375, 0.031_25,
        ]),
        _ => None,
    };
    if let Some(weights) = fixed {
        return Some(weights.to_vec());
    }

    #[allow(clippy::cast_precision_loss)]
    let (size_f, radius) = (size as f64, f64::from(size / 2));
    let sigma = 0.3f64.mul_add((size_f - 1.0).mul_add(0.5, -1.0), 0.8);
    let denom = 2.0 * sigma * sigma;

    let raw: Vec<f64> = (0..size)
        .map(|i| {
            let d = f64::from(i) - radius;
            (-d * d / denom).exp()
        })
        .collect();
    let total: f64 = raw.iter().sum();

    #[allow(clippy::cast_possible_truncation)]
    Some(raw.into_iter().map(|w| (w / total) as f32).collect())
}

/// Apply a square Gaussian blur with the given kernel side length.
///
/// Sizes of 1 or less and even sizes return the image unchanged.
#[must_use = "returns the blurred image"]
pub fn gaussian_blur(image: &GrayImage, kernel_size: u32) -> GrayImage {
    if kernel_size <= 1 || image.width() == 0 || image.height() == 0 {
        return image.clone();
    }
    let Some(kernel) = gaussian_kernel(kernel_size) else {
        return image.clone();
    };

    imageproc::filter::separable_filter_equal(image, &kernel)
}
