//! Grayscale conversion.
//!
//! Every analysis starts from a single-channel luminance image. Colour
//! pages are reduced with the ITU-R 601-2 luma transform
//! (`L = 0.299 R + 0.587 G + 0.114 B`); pages that are already 8-bit
//! grayscale pass through untouched.

use image::{DynamicImage, GrayImage, Luma};

/// Convert a decoded page to 8-bit luminance.
///
/// Alpha is ignored. Sources with more than 8 bits per channel are
/// narrowed to 8 bits first.
#[must_use = "returns the grayscale image"]
pub fn luminance(image: &DynamicImage) -> GrayImage {
    match image {
        DynamicImage::ImageLuma8(gray) => gray.clone(),
        DynamicImage::ImageLumaA8(_)
        | DynamicImage::ImageLuma16(_)
        | DynamicImage::ImageLumaA16(_) => image.to_luma8(),
        _ => {
            let rgb = image.to_rgb8();
            GrayImage::from_fn(rgb.width(), rgb.height(), |x, y| {
                let [r, g, b] = rgb.get_pixel(x, y).0;
                Luma([luma_601(r, g, b)])
            })
        }
    }
}

/// ITU-R 601-2 luma of one RGB pixel, rounded to nearest.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_lossless)]
pub const fn luma_601(r: u8, g: u8, b: u8) -> u8 {
    let weighted = r as u32 * 299 + g as u32 * 587 + b as u32 * 114;
    ((weighted + 500) / 1000) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gray_input_passes_through_unchanged() {
        let gray = GrayImage::from_fn(7, 5, |x, y| Luma([u8::try_from(x * 30 + y).unwrap_or(0)]));
        let out = luminance(&DynamicImage::ImageLuma8(gray.clone()));
        assert_eq!(out, gray);
    }

    #[test]
    fn output_dimensions_match_input() {
        let img = DynamicImage::ImageRgb8(image::RgbImage::new(17, 31));
        let gray = luminance(&img);
        assert_eq!(gray.width(), 17);
        assert_eq!(gray.height(), 31);
    }

    #[test]
    fn white_and_black_are_preserved() {
        assert_eq!(luma_601(255, 255, 255), 255);
        assert_eq!(luma_601(0, 0, 0), 0);
    }

    #[test]
    fn weighted_channels() {
        assert_eq!(luma_601(255, 0, 0), 76);
        assert_eq!(luma_601(0, 255, 0), 150);
        assert_eq!(luma_601(0, 0, 255), 29);
    }

    #[test]
    fn rgba_alpha_is_ignored() {
        let opaque = image::RgbaImage::from_pixel(1, 1, image::Rgba([0, 255, 0, 255]));
        let clear = image::RgbaImage::from_pixel(1, 1, image::Rgba([0, 255, 0, 0]));
        let a = luminance(&DynamicImage::ImageRgba8(opaque));
        let b = luminance(&DynamicImage::ImageRgba8(clear));
        assert_eq!(a, b);
        assert_eq!(a.get_pixel(0, 0).0[0], 150);
    }
}
