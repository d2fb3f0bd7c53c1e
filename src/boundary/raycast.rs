//! Crossing-number containment tests for boundary rings.
//!
//! Hand-rolled ray casting (even-odd rule) with hole subtraction, so the
//! engine carries no geometry library. The test is winding-agnostic: rings
//! may arrive clockwise or counter-clockwise.
//!
//! Edge convention: closed-set semantics. A point exactly on any ring
//! edge or vertex (exterior or hole) counts as contained.

use crate::error::BoundaryError;
use crate::models::geometry::{Coord, MultiPolygon, Polygon, Ring};

/// Fewest vertices a closed ring can have and still bound area
/// (triangle plus the repeated closing vertex).
const MIN_RING_POINTS: usize = 4;

/// Where a point sits relative to a single ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RingSide {
    Inside,
    Outside,
    OnEdge,
}

/// Classifies `point` against one ring with a crossing-number sweep.
///
/// Rings shorter than [`MIN_RING_POINTS`] cannot bound any area, and a
/// non-finite vertex poisons every crossing comparison; both make the
/// containment test for the owning region unanswerable.
fn ring_side(ring: &Ring, point: Coord) -> Result<RingSide, BoundaryError> {
    let coords = ring.coords();
    if coords.len() < MIN_RING_POINTS {
        return Err(BoundaryError::DegenerateRing {
            points: coords.len(),
        });
    }
    if coords.iter().any(|c| !c.x.is_finite() || !c.y.is_finite()) {
        return Err(BoundaryError::invalid_geometry(
            "ring has a non-finite vertex",
        ));
    }

    let mut inside = false;
    let mut j = coords.len() - 1;
    for i in 0..coords.len() {
        let a = coords[i];
        let b = coords[j];

        if on_segment(point, a, b) {
            return Ok(RingSide::OnEdge);
        }

        // Edge crosses the horizontal through the point; the half-open
        // comparison keeps shared vertices from double-counting.
        if (a.y > point.y) != (b.y > point.y) {
            let cross_x = (b.x - a.x) * (point.y - a.y) / (b.y - a.y) + a.x;
            if point.x < cross_x {
                inside = !inside;
            }
        }

        j = i;
    }

    Ok(if inside {
        RingSide::Inside
    } else {
        RingSide::Outside
    })
}

/// True when `p` lies exactly on the closed segment from `a` to `b`.
fn on_segment(p: Coord, a: Coord, b: Coord) -> bool {
    let cross = (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x);
    if cross != 0.0 {
        return false;
    }
    p.x >= a.x.min(b.x) && p.x <= a.x.max(b.x) && p.y >= a.y.min(b.y) && p.y <= a.y.max(b.y)
}

/// Exact polygon containment: inside the exterior ring and inside none of
/// the holes. A point on a hole's boundary still belongs to the polygon.
pub fn polygon_contains(polygon: &Polygon, point: Coord) -> Result<bool, BoundaryError> {
    match ring_side(polygon.exterior(), point)? {
        RingSide::Outside => return Ok(false),
        RingSide::OnEdge => return Ok(true),
        RingSide::Inside => {}
    }

    for hole in polygon.holes() {
        match ring_side(hole, point)? {
            RingSide::Inside => return Ok(false),
            RingSide::OnEdge => return Ok(true),
            RingSide::Outside => {}
        }
    }

    Ok(true)
}

/// Multi-polygon containment: contained by at least one constituent part.
pub fn multi_polygon_contains(
    geometry: &MultiPolygon,
    point: Coord,
) -> Result<bool, BoundaryError> {
    for polygon in geometry.polygons() {
        if polygon_contains(polygon, point)? {
            return Ok(true);
        }
    }
    Ok(false)
}
