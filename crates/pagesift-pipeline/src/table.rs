//! Table region detection by area-filtering external contours.
//!
//! Any external boundary that encloses more than
//! [`AnalysisConfig::table_min_area`] square pixels is reported. This
//! finds large rectangular blocks, not validated grid structures: large
//! photos and logos are reported too, and small or sparse tables are
//! missed.

use tracing::{debug, instrument};

use crate::contour;
use crate::types::{AnalysisConfig, Contour, EdgeMap, TableCandidate};

impl TableCandidate {
    /// Accept `contour` if its area is strictly greater than `min_area`.
    #[must_use]
    pub fn from_contour(contour: Contour, min_area: f64) -> Option<Self> {
        let area = contour.area();
        if area <= min_area {
            return None;
        }
        let bounds = contour.bounding_box()?;
        Some(Self {
            contour,
            area,
            bounds,
        })
    }
}

/// Keep the contours that qualify as table candidates, preserving order.
#[must_use]
pub fn filter_candidates(contours: Vec<Contour>, min_area: f64) -> Vec<TableCandidate> {
    contours
        .into_iter()
        .filter_map(|c| TableCandidate::from_contour(c, min_area))
        .collect()
}

/// Find candidate table regions in an edge map.
///
/// An empty map yields no candidates.
#[must_use]
#[instrument(skip_all)]
pub fn find_table_regions(edges: &EdgeMap, config: &AnalysisConfig) -> Vec<TableCandidate> {
    let contours = contour::trace_external(edges);
    let traced = contours.len();
    let tables = filter_candidates(contours, config.table_min_area);
    debug!(traced, tables = tables.len(), "table regions filtered");
    tables
}
