//! Plain geometry types for administrative boundaries.
//!
//! These carry no containment behavior of their own; the point-location
//! algorithms live in `boundary::raycast`. Coordinates are WGS84 with
//! x = longitude and y = latitude, the same axis order the source
//! documents use.

use crate::error::BoundaryError;

/// A single vertex (x = lon, y = lat).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coord {
    pub x: f64,
    pub y: f64,
}

impl Coord {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A closed boundary ring: first and last vertex are assumed equal.
///
/// No winding direction is assumed and no self-intersection check is made;
/// rings are stored exactly as the source document gives them.
#[derive(Debug, Clone, PartialEq)]
pub struct Ring {
    coords: Vec<Coord>,
}

impl Ring {
    pub fn new(coords: Vec<Coord>) -> Self {
        Self { coords }
    }

    pub fn coords(&self) -> &[Coord] {
        &self.coords
    }
}

/// One exterior ring plus zero or more hole rings.
///
/// Holes are assumed strictly inside the exterior and mutually disjoint.
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    exterior: Ring,
    holes: Vec<Ring>,
}

impl Polygon {
    pub fn new(exterior: Ring, holes: Vec<Ring>) -> Self {
        Self { exterior, holes }
    }

    pub fn exterior(&self) -> &Ring {
        &self.exterior
    }

    pub fn holes(&self) -> &[Ring] {
        &self.holes
    }

    /// Exterior ring first, then holes.
    pub fn rings(&self) -> impl Iterator<Item = &Ring> {
        std::iter::once(&self.exterior).chain(self.holes.iter())
    }
}

/// A region geometry of one or more disjoint polygon parts (islands).
#[derive(Debug, Clone, PartialEq)]
pub struct MultiPolygon {
    polygons: Vec<Polygon>,
}

impl MultiPolygon {
    /// Builds a multi-polygon; the collection must be non-empty.
    pub fn new(polygons: Vec<Polygon>) -> Result<Self, BoundaryError> {
        if polygons.is_empty() {
            return Err(BoundaryError::invalid_geometry(
                "multi-polygon must contain at least one polygon",
            ));
        }
        Ok(Self { polygons })
    }

    pub fn polygons(&self) -> &[Polygon] {
        &self.polygons
    }

    /// Every vertex of every ring, for envelope folding.
    pub fn vertices(&self) -> impl Iterator<Item = Coord> + '_ {
        self.polygons
            .iter()
            .flat_map(|p| p.rings())
            .flat_map(|r| r.coords().iter().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Ring {
        Ring::new(vec![
            Coord::new(0.0, 0.0),
            Coord::new(1.0, 0.0),
            Coord::new(1.0, 1.0),
            Coord::new(0.0, 1.0),
            Coord::new(0.0, 0.0),
        ])
    }

    #[test]
    fn test_empty_multipolygon_rejected() {
        let result = MultiPolygon::new(vec![]);
        assert!(result.is_err());
    }

    #[test]
    fn test_vertices_cover_all_rings() {
        let hole = Ring::new(vec![
            Coord::new(0.25, 0.25),
            Coord::new(0.75, 0.25),
            Coord::new(0.75, 0.75),
            Coord::new(0.25, 0.75),
            Coord::new(0.25, 0.25),
        ]);
        let polygon = Polygon::new(square(), vec![hole]);
        let geometry = MultiPolygon::new(vec![polygon]).unwrap();

        assert_eq!(geometry.vertices().count(), 10);
    }
}
