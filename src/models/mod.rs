//! Core data models for the reverse-geocoding engine.

pub mod geometry;
pub mod region;

pub use geometry::{Coord, MultiPolygon, Polygon, Ring};
pub use region::{AdminRegion, CountryBounds};
