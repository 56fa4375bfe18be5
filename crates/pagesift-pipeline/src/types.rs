//! Shared types for the pagesift analysis pipeline.

use geo::{Area, BoundingRect, Coord, LineString, Polygon};
use serde::{Deserialize, Serialize};

/// Re-export `GrayImage` so downstream crates can reference
/// intermediate raster data without depending on `image` directly.
pub use image::GrayImage;

/// Re-export `DynamicImage`, the decoded source page type.
pub use image::DynamicImage;

/// A 2D integer point in image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal position (pixels from left edge).
    pub x: i32,
    /// Vertical position (pixels from top edge).
    pub y: i32,
}

impl Point {
    /// Create a new point.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    fn to_coord(self) -> Coord<f64> {
        Coord {
            x: f64::from(self.x),
            y: f64::from(self.y),
        }
    }
}

/// Axis-aligned bounding box of a contour, in pixels.
///
/// `width` and `height` are measured between the extreme point
/// coordinates, so a box around a single point has zero size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Left edge.
    pub x: i32,
    /// Top edge.
    pub y: i32,
    /// Horizontal extent.
    pub width: u32,
    /// Vertical extent.
    pub height: u32,
}

/// Closed boundary polyline traced around a region of an edge map.
///
/// The last point implicitly connects back to the first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contour(Vec<Point>);

impl Contour {
    /// Create a contour from an ordered sequence of boundary points.
    #[must_use]
    pub const fn new(points: Vec<Point>) -> Self {
        Self(points)
    }

    /// Returns `true` if the contour has no points.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the number of points in the contour.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns a slice of all points.
    #[must_use]
    pub fn points(&self) -> &[Point] {
        &self.0
    }

    /// Consumes the contour and returns the underlying vector of points.
    #[must_use]
    pub fn into_points(self) -> Vec<Point> {
        self.0
    }

    /// Enclosed area in square pixels (shoelace formula, never negative).
    ///
    /// Contours with fewer than three points enclose nothing.
    #[must_use]
    pub fn area(&self) -> f64 {
        if self.0.len() < 3 {
            return 0.0;
        }
        self.to_polygon().unsigned_area()
    }

    /// Smallest axis-aligned box containing every point, or `None` for an
    /// empty contour.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        let line: LineString<f64> = self.0.iter().map(|p| p.to_coord()).collect();
        let rect = line.bounding_rect()?;
        Some(BoundingBox {
            x: rect.min().x as i32,
            y: rect.min().y as i32,
            width: rect.width() as u32,
            height: rect.height() as u32,
        })
    }

    fn to_polygon(&self) -> Polygon<f64> {
        let ring: LineString<f64> = self.0.iter().map(|p| p.to_coord()).collect();
        Polygon::new(ring, vec![])
    }
}

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Dimensions {
    /// Total number of pixels.
    #[must_use]
    pub fn pixel_count(self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

/// Binary edge map: every pixel is either 0 (background) or 255 (edge).
///
/// Always has the dimensions of the image it was derived from. An
/// empty (0×0) map stands for "no source image".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeMap(GrayImage);

impl EdgeMap {
    /// The empty map returned when there is no source image.
    #[must_use]
    pub fn empty() -> Self {
        Self(GrayImage::new(0, 0))
    }

    /// Wrap a grayscale image, mapping every non-zero pixel to 255.
    #[must_use]
    pub fn from_binary(mut image: GrayImage) -> Self {
        for pixel in image.pixels_mut() {
            if pixel.0[0] != 0 {
                pixel.0[0] = 255;
            }
        }
        Self(image)
    }

    /// Returns `true` if the map has no pixels.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.width() == 0 || self.0.height() == 0
    }

    /// Map dimensions in pixels.
    #[must_use]
    pub fn dimensions(&self) -> Dimensions {
        Dimensions {
            width: self.0.width(),
            height: self.0.height(),
        }
    }

    /// Number of edge pixels.
    #[must_use]
    pub fn edge_pixel_count(&self) -> u64 {
        self.0.pixels().map(|p| u64::from(p.0[0] != 0)).sum()
    }

    /// Fraction of pixels that are edges; 0.0 for an empty map.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn density(&self) -> f64 {
        let total = self.dimensions().pixel_count();
        if total == 0 {
            return 0.0;
        }
        self.edge_pixel_count() as f64 / total as f64
    }

    /// Borrow the underlying raster.
    #[must_use]
    pub const fn as_image(&self) -> &GrayImage {
        &self.0
    }

    /// Consume the map and return the underlying raster.
    #[must_use]
    pub fn into_image(self) -> GrayImage {
        self.0
    }
}

/// A contour large enough to be reported as a possible table region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableCandidate {
    /// Simplified external boundary.
    pub contour: Contour,
    /// Enclosed area in square pixels. Always above the configured minimum.
    pub area: f64,
    /// Bounding box of the boundary.
    pub bounds: BoundingBox,
}

/// Whole-page judgment of whether the page is dense line-art.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DiagramVerdict {
    /// `true` iff `edge_density` exceeds the configured threshold.
    pub is_diagram: bool,
    /// Fraction of edge pixels over the whole page.
    pub edge_density: f64,
}

impl DiagramVerdict {
    /// Verdict for an absent or empty edge map.
    pub const NONE: Self = Self {
        is_diagram: false,
        edge_density: 0.0,
    };
}

/// Configuration for the analysis pipeline.
///
/// The defaults are the fixed constants the pipeline is calibrated for.
/// They are not meant to be tuned per document; the fields exist so
/// tests can reference and perturb individual thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Global contrast multiplier applied before sharpening.
    pub contrast_factor: f32,

    /// Sharpening strength applied after contrast.
    pub sharpness_factor: f32,

    /// Pixels with luminance below this become ink (0), others paper (255).
    pub binarize_threshold: u8,

    /// Side length of the square Gaussian kernel used before edge
    /// detection. Must be odd.
    pub blur_kernel_size: u32,

    /// Canny hysteresis low threshold (weak edge retention).
    pub canny_low: f32,

    /// Canny hysteresis high threshold (strong edge seeding).
    pub canny_high: f32,

    /// Contours must enclose strictly more than this many square pixels to
    /// count as table candidates.
    pub table_min_area: f64,

    /// Pages with an edge density strictly above this are diagrams.
    pub diagram_density_threshold: f64,
}

impl AnalysisConfig {
    /// Default contrast factor.
    pub const DEFAULT_CONTRAST_FACTOR: f32 = 1.5;
    /// Default sharpness factor.
    pub const DEFAULT_SHARPNESS_FACTOR: f32 = 2.0;
    /// Default binarization threshold.
    pub const DEFAULT_BINARIZE_THRESHOLD: u8 = 140;
    /// Default blur kernel size.
    pub const DEFAULT_BLUR_KERNEL_SIZE: u32 = 5;
    /// Default Canny low threshold.
    pub const DEFAULT_CANNY_LOW: f32 = 50.0;
    /// Default Canny high threshold.
    pub const DEFAULT_CANNY_HIGH: f32 = 150.0;
    /// Default minimum table area.
    pub const DEFAULT_TABLE_MIN_AREA: f64 = 1000.0;
    /// Default diagram edge-density threshold.
    pub const DEFAULT_DIAGRAM_DENSITY: f64 = 0.1;

    /// Check the configuration for values the stages cannot work with.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] describing the first
    /// offending field.
    pub fn validate(&self) -> Result<(), PipelineError> {
        let invalid = |msg: String| Err(PipelineError::InvalidConfig(msg));

        if !self.contrast_factor.is_finite() || self.contrast_factor < 0.0 {
            return invalid(format!(
                "contrast_factor must be finite and non-negative, got {}",
                self.contrast_factor
            ));
        }
        if !self.sharpness_factor.is_finite() || self.sharpness_factor < 0.0 {
            return invalid(format!(
                "sharpness_factor must be finite and non-negative, got {}",
                self.sharpness_factor
            ));
        }
        if self.blur_kernel_size % 2 == 0 {
            return invalid(format!(
                "blur_kernel_size must be odd, got {}",
                self.blur_kernel_size
            ));
        }
        if !self.canny_low.is_finite() || !self.canny_high.is_finite() || self.canny_low < 0.0 {
            return invalid(format!(
                "canny thresholds must be finite and non-negative, got {}/{}",
                self.canny_low, self.canny_high
            ));
        }
        if self.canny_low > self.canny_high {
            return invalid(format!(
                "canny_low ({}) must not exceed canny_high ({})",
                self.canny_low, self.canny_high
            ));
        }
        if !self.table_min_area.is_finite() || self.table_min_area < 0.0 {
            return invalid(format!(
                "table_min_area must be finite and non-negative, got {}",
                self.table_min_area
            ));
        }
        if !self.diagram_density_threshold.is_finite() {
            return invalid(format!(
                "diagram_density_threshold must be finite, got {}",
                self.diagram_density_threshold
            ));
        }
        Ok(())
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            contrast_factor: Self::DEFAULT_CONTRAST_FACTOR,
            sharpness_factor: Self::DEFAULT_SHARPNESS_FACTOR,
            binarize_threshold: Self::DEFAULT_BINARIZE_THRESHOLD,
            blur_kernel_size: Self::DEFAULT_BLUR_KERNEL_SIZE,
            canny_low: Self::DEFAULT_CANNY_LOW,
            canny_high: Self::DEFAULT_CANNY_HIGH,
            table_min_area: Self::DEFAULT_TABLE_MIN_AREA,
            diagram_density_threshold: Self::DEFAULT_DIAGRAM_DENSITY,
        }
    }
}

/// Result of running every analysis over one page.
///
/// The cleaned image is shared (it may come from a session cache) and is
/// not serialized; callers that want it on disk encode it themselves.
#[derive(Debug, Clone, Serialize)]
pub struct PageAnalysis {
    /// Source image dimensions, zero when there was no image.
    pub dimensions: Dimensions,
    /// Binarized page prepared for text recognition.
    #[serde(skip)]
    pub cleaned: Option<std::sync::Arc<GrayImage>>,
    /// Candidate table regions in discovery order.
    pub tables: Vec<TableCandidate>,
    /// Diagram judgment for the whole page.
    pub diagram: DiagramVerdict,
}

/// Errors that can occur while adapting input or configuring the pipeline.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Failed to decode the input image.
    #[error("failed to decode image: {0}")]
    ImageDecode(#[from] image::ImageError),

    /// The input image bytes were empty.
    #[error("input image data is empty")]
    EmptyInput,

    /// A raw bitmap did not describe a valid image.
    #[error("invalid image: {0}")]
    InvalidImage(String),

    /// Pipeline configuration is invalid.
    #[error("invalid pipeline configuration: {0}")]
    InvalidConfig(String),
}
