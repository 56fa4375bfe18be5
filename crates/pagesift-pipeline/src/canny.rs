//! Two-threshold Canny edge detection over an already-smoothed image.
//!
//! Derived from `imageproc::edges::{canny, non_maximum_suppression,
//! hysteresis}` with these differences:
//!
//! 1. **No internal blur.** `imageproc` smooths with a fixed sigma of 1.4
//!    before computing gradients; here the caller supplies the smoothed
//!    image so the kernel size stays under its control.
//! 2. **L1 gradient magnitude** (`|gx| + |gy|`) instead of `hypot`.
//! 3. **Strict thresholds**: strong edges need `magnitude > high`, weak
//!    edges `magnitude > low`.
//! 4. **Bounded hysteresis**: neighbour coordinates are bounds-checked and
//!    all 8 neighbours are visited (upstream skipped north / northeast and
//!    underflowed at the border, see imageproc#705).
//! 5. Images narrower or shorter than 3 pixels have no interior and yield
//!    an all-zero map instead of panicking.
//! 6. **One-sided ties** in non-maximum suppression: a pixel must beat the
//!    neighbour that comes first in raster order and match or beat the
//!    other. A step between two flat regions has two pixels of equal
//!    magnitude; only the first survives, so edges stay one pixel thick.

use image::{GrayImage, Luma};
use imageproc::definitions::Image;
use imageproc::filter::filter_clamped;
use imageproc::kernel;

/// Detect edges. Returns 255 for edge pixels, 0 elsewhere.
#[must_use = "returns the binary edge map"]
pub fn canny(image: &GrayImage, low_threshold: f32, high_threshold: f32) -> GrayImage {
    let (width, height) = image.dimensions();
    if width < 3 || height < 3 {
        return GrayImage::new(width, height);
    }

    // 1. Intensity of gradients.
    let gx: Image<Luma<i16>> = filter_clamped(image, kernel::SOBEL_HORIZONTAL_3X3);
    let gy: Image<Luma<i16>> = filter_clamped(image, kernel::SOBEL_VERTICAL_3X3);
    let magnitude: Vec<f32> = gx
        .iter()
        .zip(gy.iter())
        .map(|(h, v)| f32::from(h.unsigned_abs()) + f32::from(v.unsigned_abs()))
        .collect();
    let Some(magnitude) = Image::<Luma<f32>>::from_raw(width, height, magnitude) else {
        return GrayImage::new(width, height);
    };

    // 2. Non-maximum suppression (make edges thinner).
    let thinned = non_maximum_suppression(&magnitude, &gx, &gy);

    // 3. Hysteresis to keep strong edges and weak edges connected to them.
    hysteresis(&thinned, low_threshold, high_threshold)
}

/// Gradient direction quantized to one of four neighbour axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Horizontal,
    Diagonal,
    Vertical,
    AntiDiagonal,
}

impl Direction {
    fn from_gradient(gx: i16, gy: i16) -> Self {
        let mut angle = f32::from(gy).atan2(f32::from(gx)).to_degrees();
        if angle < 0.0 {
            angle += 180.0;
        }
        if (22.5..67.5).contains(&angle) {
            Self::Diagonal
        } else if (67.5..112.5).contains(&angle) {
            Self::Vertical
        } else if (112.5..157.5).contains(&angle) {
            Self::AntiDiagonal
        } else {
            Self::Horizontal
        }
    }

    /// The two neighbours across the edge, as offsets from the centre.
    /// The first one precedes the centre in raster order.
    const fn neighbours(self) -> [(i32, i32); 2] {
        match self {
            Self::Horizontal => [(-1, 0), (1, 0)],
            Self::Diagonal => [(-1, -1), (1, 1)],
            Self::Vertical => [(0, -1), (0, 1)],
            Self::AntiDiagonal => [(1, -1), (-1, 1)],
        }
    }
}

/// Zero every interior pixel that is not a local maximum along its
/// gradient direction. The one-pixel border is always zero.
fn non_maximum_suppression(
    g: &Image<Luma<f32>>,
    gx: &Image<Luma<i16>>,
    gy: &Image<Luma<i16>>,
) -> Image<Luma<f32>> {
    let mut out = Image::from_pixel(g.width(), g.height(), Luma([0.0]));
    for y in 1..g.height() - 1 {
        for x in 1..g.width() - 1 {
            let direction = Direction::from_gradient(gx.get_pixel(x, y).0[0], gy.get_pixel(x, y).0[0]);
            let pixel = g.get_pixel(x, y).0[0];
            let [before, after] = direction.neighbours().map(|(dx, dy)| {
                g.get_pixel(x.saturating_add_signed(dx), y.saturating_add_signed(dy)).0[0]
            });
            if pixel > before && pixel >= after {
                out.put_pixel(x, y, Luma([pixel]));
            }
        }
    }
    out
}

/// Keep pixels above `high_thresh` and everything above `low_thresh` that
/// is 8-connected to them. Non-recursive depth-first flood.
fn hysteresis(input: &Image<Luma<f32>>, low_thresh: f32, high_thresh: f32) -> GrayImage {
    const NEIGHBOURS: [(i32, i32); 8] = [
        (1, 0),
        (1, 1),
        (0, 1),
        (-1, 1),
        (-1, 0),
        (-1, -1),
        (0, -1),
        (1, -1),
    ];

    let (w, h) = input.dimensions();
    let mut out = GrayImage::new(w, h);
    let mut stack = Vec::new();

    for y in 1..h - 1 {
        for x in 1..w - 1 {
            if input.get_pixel(x, y).0[0] <= high_thresh || out.get_pixel(x, y).0[0] != 0 {
                continue;
            }
            out.put_pixel(x, y, Luma([255]));
            stack.push((x, y));

            while let Some((cx, cy)) = stack.pop() {
                for &(dx, dy) in &NEIGHBOURS {
                    let (Some(nx), Some(ny)) =
                        (cx.checked_add_signed(dx), cy.checked_add_signed(dy))
                    else {
                        continue;
                    };
                    if nx >= w || ny >= h {
                        continue;
                    }
                    if input.get_pixel(nx, ny).0[0] > low_thresh && out.get_pixel(nx, ny).0[0] == 0
                    {
                        out.put_pixel(nx, ny, Luma([255]));
                        stack.push((nx, ny));
                    }
                }
            }
        }
    }
    out
}
