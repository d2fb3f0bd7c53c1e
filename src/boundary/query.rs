//! Point-location queries against a published snapshot.
//!
//! A query walks the snapshot's countries, rejects whole countries on the
//! bounding-box pre-filter, and only runs exact ray-casting containment
//! against the regions of countries whose envelope admits the point. The
//! first containing region wins; overlapping claims between countries are
//! resolved by snapshot iteration order, which is deliberately unordered.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::warn;

use crate::boundary::raycast;
use crate::boundary::store::Snapshot;
use crate::models::geometry::Coord;

/// The region answering a point query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionMatch {
    /// Country code keying the region's source document.
    pub country: String,
    /// Number of entries in `properties`.
    #[serde(rename = "levelsCount")]
    pub levels_count: usize,
    /// Level key (`country`, `level_1`, ...) to display name.
    pub properties: BTreeMap<String, String>,
}

/// How much work one query did.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocateStats {
    /// Countries rejected on bounds alone.
    pub countries_pruned: usize,
    /// Regions that reached exact containment testing.
    pub regions_tested: usize,
}

/// Finds the first loaded region containing the point, or `None` when no
/// loaded country claims it. Absence is not an error.
pub fn locate(snapshot: &Snapshot, lat: f64, lon: f64) -> Option<RegionMatch> {
    locate_with_stats(snapshot, lat, lon).0
}

/// `locate`, plus counters that make the pre-filter observable.
pub fn locate_with_stats(
    snapshot: &Snapshot,
    lat: f64,
    lon: f64,
) -> (Option<RegionMatch>, LocateStats) {
    let point = Coord::new(lon, lat);
    let mut stats = LocateStats::default();

    for (code, bounds, regions) in snapshot.iter_countries() {
        if !bounds.contains(lat, lon) {
            stats.countries_pruned += 1;
            continue;
        }

        for region in regions {
            stats.regions_tested += 1;
            match raycast::multi_polygon_contains(region.geometry(), point) {
                Ok(true) => {
                    let properties = region.admin_levels().clone();
                    return (
                        Some(RegionMatch {
                            country: code.to_string(),
                            levels_count: properties.len(),
                            properties,
                        }),
                        stats,
                    );
                }
                Ok(false) => {}
                // A region with broken geometry never answers a query;
                // the scan moves on to the next region.
                Err(err) => {
                    warn!("Skipping region in {} during point test: {}", code, err);
                }
            }
        }
    }

    (None, stats)
}
