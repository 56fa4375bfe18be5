//! Edge map extraction: grayscale -> Gaussian blur -> Canny.
//!
//! The edge map feeds both the table detector and the diagram classifier.
//! Smoothing is not optional; Canny on raw scans picks up paper grain and
//! JPEG noise as edges.

use image::{DynamicImage, GrayImage};
use tracing::{debug, instrument};

use crate::blur;
use crate::canny;
use crate::grayscale;
use crate::stage::{Stage, StageObserver, Unobserved};
use crate::types::{AnalysisConfig, EdgeMap};

/// Compute the binary edge map of a page.
///
/// Returns [`EdgeMap::empty`] when there is no image. Otherwise the map
/// has exactly the dimensions of the source.
#[must_use]
#[instrument(skip_all)]
pub fn extract_edges(image: Option<&DynamicImage>, config: &AnalysisConfig) -> EdgeMap {
    image.map_or_else(EdgeMap::empty, |image| edge_map(image, config))
}

/// [`extract_edges`] for a page that is known to be present.
#[must_use]
pub fn edge_map(image: &DynamicImage, config: &AnalysisConfig) -> EdgeMap {
    let gray = grayscale::luminance(image);
    let edges = edges_from_gray(&gray, config, &mut Unobserved);

    debug!(
        width = edges.dimensions().width,
        height = edges.dimensions().height,
        edge_pixels = edges.edge_pixel_count(),
        "edge map extracted"
    );
    edges
}

/// Blur and Canny on an already-converted page, each run through
/// `observer`.
#[must_use]
pub fn edges_from_gray(
    gray: &GrayImage,
    config: &AnalysisConfig,
    observer: &mut impl StageObserver,
) -> EdgeMap {
    let blurred = observer.run(Stage::Blur, || {
        blur::gaussian_blur(gray, config.blur_kernel_size)
    });
    observer.run(Stage::EdgeDetection, || {
        EdgeMap::from_binary(canny::canny(&blurred, config.canny_low, config.canny_high))
    })
}
