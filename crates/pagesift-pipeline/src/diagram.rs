//! Diagram detection from global edge density.
//!
//! Line-art pages carry many more edge pixels per unit area than printed
//! or handwritten text. The statistic is global: it cannot say where a
//! diagram is, and dense handwriting or small dense tables can tip a page
//! over the threshold.

use tracing::debug;

use crate::types::{AnalysisConfig, DiagramVerdict, EdgeMap};

/// Classify a page as diagram or not from its edge map.
///
/// The verdict is `true` iff the edge density is strictly greater than
/// `config.diagram_density_threshold`. An empty map yields
/// [`DiagramVerdict::NONE`].
#[must_use]
pub fn classify_diagram(edges: &EdgeMap, config: &AnalysisConfig) -> DiagramVerdict {
    if edges.is_empty() {
        return DiagramVerdict::NONE;
    }

    let edge_density = edges.density();
    let verdict = DiagramVerdict {
        is_diagram: edge_density > config.diagram_density_threshold,
        edge_density,
    };
    debug!(
        edge_density,
        is_diagram = verdict.is_diagram,
        "diagram classified"
    );
    verdict
}
