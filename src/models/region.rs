//! Admin region records and the per-country bounding accumulator.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use super::geometry::MultiPolygon;

/// One administrative region: geometry plus its admin-level name ladder
/// and the untouched attribute bag of the source feature.
///
/// Immutable once constructed; owned exclusively by the region store.
#[derive(Debug, Clone)]
pub struct AdminRegion {
    geometry: MultiPolygon,
    admin_levels: BTreeMap<String, String>,
    original_attributes: Map<String, Value>,
}

impl AdminRegion {
    pub fn new(
        geometry: MultiPolygon,
        admin_levels: BTreeMap<String, String>,
        original_attributes: Map<String, Value>,
    ) -> Self {
        Self {
            geometry,
            admin_levels,
            original_attributes,
        }
    }

    pub fn geometry(&self) -> &MultiPolygon {
        &self.geometry
    }

    /// Level key (`country`, `level_1`, ...) to display name, in ascending
    /// presentation order.
    pub fn admin_levels(&self) -> &BTreeMap<String, String> {
        &self.admin_levels
    }

    /// The verbatim `properties` bag of the source feature. Passthrough
    /// only; queries never read it.
    pub fn original_attributes(&self) -> &Map<String, Value> {
        &self.original_attributes
    }
}

/// Running axis-aligned envelope over every region loaded for one country.
///
/// Starts inverted (min = +inf, max = -inf) so an unfed accumulator
/// contains nothing; it only ever widens during a load pass and is
/// replaced wholesale on reload.
#[derive(Debug, Clone, Copy)]
pub struct CountryBounds {
    min_lat: f64,
    max_lat: f64,
    min_lon: f64,
    max_lon: f64,
}

impl Default for CountryBounds {
    fn default() -> Self {
        Self {
            min_lat: f64::INFINITY,
            max_lat: f64::NEG_INFINITY,
            min_lon: f64::INFINITY,
            max_lon: f64::NEG_INFINITY,
        }
    }
}

impl CountryBounds {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds the geometry's envelope into the accumulator via min/max.
    pub fn update(&mut self, geometry: &MultiPolygon) {
        for vertex in geometry.vertices() {
            self.min_lon = self.min_lon.min(vertex.x);
            self.max_lon = self.max_lon.max(vertex.x);
            self.min_lat = self.min_lat.min(vertex.y);
            self.max_lat = self.max_lat.max(vertex.y);
        }
    }

    /// Closed-interval containment test, inclusive at both edges.
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        lat >= self.min_lat && lat <= self.max_lat && lon >= self.min_lon && lon <= self.max_lon
    }
}
