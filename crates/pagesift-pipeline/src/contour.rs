//! Contour tracing: extract external boundaries from a binary edge map.
//!
//! Borders are found with Suzuki-Abe border following via
//! [`imageproc::contours::find_contours`]. Only outermost borders are kept:
//! an outer border with no parent. Anything nested inside a hole of
//! another border is discarded.
//!
//! Traced borders list every boundary pixel. [`compress_chain`] reduces
//! each one to the points where the chain changes direction, so a
//! rectangle becomes its four corners.

use imageproc::contours::{self, BorderType};
use tracing::debug;

use crate::types::{Contour, EdgeMap, Point};

/// Trace the external contours of an edge map, in discovery order.
///
/// An empty map has no contours.
#[must_use]
pub fn trace_external(edges: &EdgeMap) -> Vec<Contour> {
    if edges.is_empty() {
        return Vec::new();
    }

    let traced: Vec<contours::Contour<i32>> = contours::find_contours(edges.as_image());
    let total = traced.len();

    let external: Vec<Contour> = traced
        .into_iter()
        .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
        .map(|c| {
            let points: Vec<Point> = c.points.into_iter().map(|p| Point::new(p.x, p.y)).collect();
            Contour::new(compress_chain(&points))
        })
        .collect();

    debug!(
        traced = total,
        external = external.len(),
        "contours traced"
    );
    external
}

/// Drop every point that continues the previous step in the same
/// direction, treating `points` as a closed chain.
///
/// The first point is always kept. Chains of fewer than three points are
/// returned unchanged.
#[must_use]
pub fn compress_chain(points: &[Point]) -> Vec<Point> {
    let n = points.len();
    if n < 3 {
        return points.to_vec();
    }

    let step = |a: Point, b: Point| (b.x - a.x, b.y - a.y);

    (0..n)
        .filter(|&i| {
            let prev = points[(i + n - 1) % n];
            let next = points[(i + 1) % n];
            i == 0 || step(prev, points[i]) != step(points[i], next)
        })
        .map(|i| points[i])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};

    fn edge_map(width: u32, height: u32, draw: impl Fn(u32, u32) -> bool) -> EdgeMap {
        EdgeMap::from_binary(GrayImage::from_fn(width, height, |x, y| {
            Luma([if draw(x, y) { 255 } else { 0 }])
        }))
    }

    /// One-pixel square outline with corners at `lo` and `hi`.
    fn outline(lo: u32, hi: u32) -> impl Fn(u32, u32) -> bool {
        move |x, y| {
            let on_x = (lo..=hi).contains(&x) && (y == lo || y == hi);
            let on_y = (lo..=hi).contains(&y) && (x == lo || x == hi);
            on_x || on_y
        }
    }

    #[test]
    fn empty_map_produces_no_contours() {
        assert!(trace_external(&EdgeMap::empty()).is_empty());
        assert!(trace_external(&edge_map(10, 10, |_, _| false)).is_empty());
    }

    #[test]
    fn filled_rectangle_compresses_to_corners() {
        let map = edge_map(20, 20, |x, y| (5..15).contains(&x) && (5..15).contains(&y));
        let result = trace_external(&map);
        assert_eq!(result.len(), 1);

        let contour = &result[0];
        assert_eq!(contour.len(), 4);
        let mut corners = contour.points().to_vec();
        corners.sort_by_key(|p| (p.y, p.x));
        assert_eq!(
            corners,
            vec![
                Point::new(5, 5),
                Point::new(14, 5),
                Point::new(5, 14),
                Point::new(14, 14),
            ]
        );
        assert!((contour.area() - 81.0).abs() < f64::EPSILON);
    }

    #[test]
    fn nested_outline_is_discarded() {
        let outer = outline(2, 27);
        let inner = outline(8, 20);
        let map = edge_map(30, 30, |x, y| outer(x, y) || inner(x, y));
        let result = trace_external(&map);
        assert_eq!(result.len(), 1);
        assert!((result[0].area() - 625.0).abs() < f64::EPSILON);
    }

    #[test]
    fn separate_outlines_are_all_external() {
        let left = outline(2, 10);
        let right = outline(14, 22);
        let map = edge_map(25, 25, |x, y| left(x, y) || right(x, y));
        assert_eq!(trace_external(&map).len(), 2);
    }

    #[test]
    fn compress_keeps_direction_changes() {
        let chain = [
            Point::new(0, 0),
            Point::new(1, 0),
            Point::new(2, 0),
            Point::new(2, 1),
            Point::new(2, 2),
            Point::new(1, 1),
        ];
        assert_eq!(
            compress_chain(&chain),
            vec![Point::new(0, 0), Point::new(2, 0), Point::new(2, 2)]
        );
    }

    #[test]
    fn compress_short_chains_unchanged() {
        let chain = [Point::new(3, 3), Point::new(4, 3)];
        assert_eq!(compress_chain(&chain), chain.to_vec());
    }

    #[test]
    fn compress_keeps_back_and_forth_steps() {
        // A one-pixel-wide spur traced out and back again.
        let chain = [Point::new(0, 0), Point::new(1, 0), Point::new(2, 0), Point::new(1, 0)];
        assert_eq!(
            compress_chain(&chain),
            vec![Point::new(0, 0), Point::new(2, 0)]
        );
    }
}
