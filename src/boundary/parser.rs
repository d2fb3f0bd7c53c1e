//! Boundary document parsing.
//!
//! One document is a GeoJSON FeatureCollection covering one country. The
//! outer document is parsed strictly (wrong collection marker aborts the
//! document), but each feature is parsed through its own `Result` so a
//! single malformed feature is logged and skipped without losing the rest
//! of the country.

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use tracing::warn;

use crate::error::BoundaryError;
use crate::models::geometry::{Coord, MultiPolygon, Polygon, Ring};
use crate::models::region::{AdminRegion, CountryBounds};

/// Top-level marker required of every boundary document.
const COLLECTION_TYPE: &str = "FeatureCollection";

/// Property value marking an absent admin-level name.
const ABSENT_NAME: &str = "NA";

/// Everything parsed out of one country's document.
#[derive(Debug)]
pub struct ParsedCountry {
    /// Regions in document order; queries scan them in this order.
    pub regions: Vec<AdminRegion>,
    /// Envelope over every parsed region, folded during the same pass.
    pub bounds: CountryBounds,
    /// Features dropped for malformed geometry or properties.
    pub skipped_features: usize,
}

/// Derives the country code from a document filename: the second
/// underscore-delimited segment of the stem, e.g. `gadm41_ABW_0.json`
/// yields `ABW`. File naming is the ingestion collaborator's contract;
/// document content never supplies the code.
pub fn country_code_from_filename(filename: &str) -> Option<String> {
    let stem = filename.strip_suffix(".json").unwrap_or(filename);
    let code = stem.split('_').nth(1)?;
    if code.is_empty() {
        None
    } else {
        Some(code.to_string())
    }
}

/// Parses one document end to end: country code from the filename plus the
/// regions and bounds from the content.
pub fn parse_document(
    filename: &str,
    raw: &[u8],
) -> Result<(String, ParsedCountry), BoundaryError> {
    let code = country_code_from_filename(filename).ok_or_else(|| {
        BoundaryError::InvalidFormat(format!("cannot derive a country code from `{filename}`"))
    })?;
    let parsed = parse_collection(raw)?;
    Ok((code, parsed))
}

/// Parses a FeatureCollection document into regions and bounds.
///
/// Returns `InvalidFormat` when the top-level type tag is not
/// `FeatureCollection` or the `features` array is missing; per-feature
/// failures only increment `skipped_features`.
pub fn parse_collection(raw: &[u8]) -> Result<ParsedCountry, BoundaryError> {
    let document: Value = serde_json::from_slice(raw)?;

    match document.get("type").and_then(Value::as_str) {
        Some(COLLECTION_TYPE) => {}
        Some(other) => {
            return Err(BoundaryError::InvalidFormat(format!(
                "expected a `{COLLECTION_TYPE}`, got `{other}`"
            )))
        }
        None => {
            return Err(BoundaryError::InvalidFormat(
                "missing top-level `type` tag".to_string(),
            ))
        }
    }

    let features = document
        .get("features")
        .and_then(Value::as_array)
        .ok_or_else(|| BoundaryError::InvalidFormat("missing `features` array".to_string()))?;

    let mut regions = Vec::with_capacity(features.len());
    let mut bounds = CountryBounds::new();
    let mut skipped_features = 0;

    for (index, feature) in features.iter().enumerate() {
        match parse_feature(feature) {
            Ok(region) => {
                bounds.update(region.geometry());
                regions.push(region);
            }
            Err(err) => {
                warn!("Skipping malformed feature {}: {}", index, err);
                skipped_features += 1;
            }
        }
    }

    Ok(ParsedCountry {
        regions,
        bounds,
        skipped_features,
    })
}

/// Parses a single feature into a region record.
fn parse_feature(feature: &Value) -> Result<AdminRegion, BoundaryError> {
    let geometry = feature
        .get("geometry")
        .ok_or(BoundaryError::MissingMember("geometry"))?;
    let properties = feature
        .get("properties")
        .and_then(Value::as_object)
        .ok_or(BoundaryError::MissingMember("properties"))?;

    let geometry = parse_geometry(geometry)?;
    let admin_levels = extract_admin_levels(properties);

    Ok(AdminRegion::new(geometry, admin_levels, properties.clone()))
}

/// Builds the multi-polygon for a feature's `geometry` member.
fn parse_geometry(node: &Value) -> Result<MultiPolygon, BoundaryError> {
    let kind = node
        .get("type")
        .and_then(Value::as_str)
        .ok_or(BoundaryError::MissingMember("geometry type"))?;
    let coordinates = node
        .get("coordinates")
        .and_then(Value::as_array)
        .ok_or(BoundaryError::MissingMember("coordinates"))?;

    match kind {
        "Polygon" => {
            let polygon = build_polygon(coordinates)?;
            MultiPolygon::new(vec![polygon])
        }
        "MultiPolygon" => {
            let polygons = coordinates
                .iter()
                .map(|part| {
                    let rings = part.as_array().ok_or_else(|| {
                        BoundaryError::invalid_geometry("multi-polygon part is not an array")
                    })?;
                    build_polygon(rings)
                })
                .collect::<Result<Vec<_>, _>>()?;
            MultiPolygon::new(polygons)
        }
        other => Err(BoundaryError::UnsupportedGeometry(other.to_string())),
    }
}

/// Builds one polygon from its ring array: exterior first, then holes.
fn build_polygon(rings: &[Value]) -> Result<Polygon, BoundaryError> {
    let mut rings = rings.iter();
    let exterior = rings
        .next()
        .ok_or_else(|| BoundaryError::invalid_geometry("polygon without an exterior ring"))?;

    let exterior = build_ring(exterior)?;
    let holes = rings.map(build_ring).collect::<Result<Vec<_>, _>>()?;

    Ok(Polygon::new(exterior, holes))
}

/// Pairs consecutive positions into ring vertices, exactly as given.
fn build_ring(node: &Value) -> Result<Ring, BoundaryError> {
    let positions = node
        .as_array()
        .ok_or_else(|| BoundaryError::invalid_geometry("ring is not an array"))?;

    let mut coords = Vec::with_capacity(positions.len());
    for position in positions {
        coords.push(parse_position(position)?);
    }

    Ok(Ring::new(coords))
}

/// Reads `[lon, lat, ...]`; trailing members beyond the first two numbers
/// are ignored.
fn parse_position(node: &Value) -> Result<Coord, BoundaryError> {
    let numbers = node
        .as_array()
        .ok_or_else(|| BoundaryError::invalid_geometry("position is not an array"))?;

    match (
        numbers.first().and_then(Value::as_f64),
        numbers.get(1).and_then(Value::as_f64),
    ) {
        (Some(x), Some(y)) => Ok(Coord::new(x, y)),
        _ => Err(BoundaryError::invalid_geometry(
            "position needs at least two numbers",
        )),
    }
}

/// Scans the property bag for the admin-level name ladder.
///
/// `NAME_<n>` keys with an integer suffix and a value other than the `NA`
/// sentinel become `level_<n>`; the `COUNTRY` key becomes `country`. Every
/// other property is passthrough only.
fn extract_admin_levels(properties: &Map<String, Value>) -> BTreeMap<String, String> {
    let mut levels = BTreeMap::new();

    for (key, value) in properties {
        let Some(name) = value.as_str() else {
            continue;
        };

        if key == "COUNTRY" {
            levels.insert("country".to_string(), name.to_string());
        } else if let Some(n) = key
            .strip_prefix("NAME_")
            .and_then(|suffix| suffix.parse::<u32>().ok())
        {
            if name != ABSENT_NAME {
                levels.insert(format!("level_{n}"), name.to_string());
            }
        }
    }

    levels
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn square_coords() -> Value {
        json!([[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0], [0.0, 0.0]]])
    }

    fn collection(features: Value) -> Vec<u8> {
        json!({"type": "FeatureCollection", "features": features})
            .to_string()
            .into_bytes()
    }

    #[test]
    fn test_country_code_from_filename() {
        assert_eq!(
            country_code_from_filename("gadm41_ABW_0.json").as_deref(),
            Some("ABW")
        );
        assert_eq!(
            country_code_from_filename("gadm41_NLD.json").as_deref(),
            Some("NLD")
        );
        assert_eq!(country_code_from_filename("noseparator.json"), None);
        assert_eq!(country_code_from_filename("trailing_.json"), None);
    }

    #[test]
    fn test_parse_simple_polygon_feature() {
        let raw = collection(json!([{
            "type": "Feature",
            "properties": {"COUNTRY": "Testland", "NAME_1": "Region1", "GID_1": "AAA.1_1"},
            "geometry": {"type": "Polygon", "coordinates": square_coords()}
        }]));

        let parsed = parse_collection(&raw).unwrap();
        assert_eq!(parsed.regions.len(), 1);
        assert_eq!(parsed.skipped_features, 0);

        let region = &parsed.regions[0];
        assert_eq!(
            region.admin_levels().get("country").map(String::as_str),
            Some("Testland")
        );
        assert_eq!(
            region.admin_levels().get("level_1").map(String::as_str),
            Some("Region1")
        );
        // The raw bag keeps everything, including keys queries never use.
        assert_eq!(
            region.original_attributes().get("GID_1"),
            Some(&json!("AAA.1_1"))
        );
        assert!(parsed.bounds.contains(0.5, 0.5));
    }

    #[test]
    fn test_na_sentinel_and_non_numeric_suffixes_are_omitted() {
        let raw = collection(json!([{
            "type": "Feature",
            "properties": {
                "COUNTRY": "Testland",
                "NAME_1": "Region1",
                "NAME_2": "NA",
                "NAME_X": "NotALevel",
                "VARNAME_1": "Alias"
            },
            "geometry": {"type": "Polygon", "coordinates": square_coords()}
        }]));

        let parsed = parse_collection(&raw).unwrap();
        let levels = parsed.regions[0].admin_levels();

        assert_eq!(levels.len(), 2);
        assert!(levels.contains_key("country"));
        assert!(levels.contains_key("level_1"));
        assert!(!levels.contains_key("level_2"));
    }

    #[test]
    fn test_levels_iterate_in_ascending_order() {
        let raw = collection(json!([{
            "type": "Feature",
            "properties": {"NAME_2": "District", "COUNTRY": "Testland", "NAME_1": "Province"},
            "geometry": {"type": "Polygon", "coordinates": square_coords()}
        }]));

        let parsed = parse_collection(&raw).unwrap();
        let keys: Vec<&str> = parsed.regions[0]
            .admin_levels()
            .keys()
            .map(String::as_str)
            .collect();

        assert_eq!(keys, vec!["country", "level_1", "level_2"]);
    }

    #[test]
    fn test_multi_polygon_geometry() {
        let raw = collection(json!([{
            "type": "Feature",
            "properties": {"COUNTRY": "Islandia"},
            "geometry": {"type": "MultiPolygon", "coordinates": [
                [[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0], [0.0, 0.0]]],
                [[[10.0, 10.0], [11.0, 10.0], [11.0, 11.0], [10.0, 11.0], [10.0, 10.0]]]
            ]}
        }]));

        let parsed = parse_collection(&raw).unwrap();
        assert_eq!(parsed.regions[0].geometry().polygons().len(), 2);
        // Bounds cover both islands.
        assert!(parsed.bounds.contains(0.5, 0.5));
        assert!(parsed.bounds.contains(10.5, 10.5));
    }

    #[test]
    fn test_hole_rings_are_kept_as_holes() {
        let raw = collection(json!([{
            "type": "Feature",
            "properties": {},
            "geometry": {"type": "Polygon", "coordinates": [
                [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0], [0.0, 0.0]],
                [[0.25, 0.25], [0.75, 0.25], [0.75, 0.75], [0.25, 0.75], [0.25, 0.25]]
            ]}
        }]));

        let parsed = parse_collection(&raw).unwrap();
        let polygon = &parsed.regions[0].geometry().polygons()[0];
        assert_eq!(polygon.holes().len(), 1);
    }

    #[test]
    fn test_positions_keep_first_two_numbers() {
        let raw = collection(json!([{
            "type": "Feature",
            "properties": {},
            "geometry": {"type": "Polygon", "coordinates": [
                [[0.0, 0.0, 99.0], [1.0, 0.0, 99.0], [1.0, 1.0, 99.0], [0.0, 0.0, 99.0]]
            ]}
        }]));

        let parsed = parse_collection(&raw).unwrap();
        assert_eq!(parsed.regions.len(), 1);
        let ring = parsed.regions[0].geometry().polygons()[0].exterior();
        assert_eq!(ring.coords()[1], Coord::new(1.0, 0.0));
    }

    #[test]
    fn test_wrong_collection_marker_aborts_document() {
        let raw = json!({"type": "Feature", "features": []})
            .to_string()
            .into_bytes();
        let result = parse_collection(&raw);
        assert!(matches!(result, Err(BoundaryError::InvalidFormat(_))));
    }

    #[test]
    fn test_missing_type_tag_aborts_document() {
        let raw = json!({"features": []}).to_string().into_bytes();
        let result = parse_collection(&raw);
        assert!(matches!(result, Err(BoundaryError::InvalidFormat(_))));
    }

    #[test]
    fn test_malformed_features_are_skipped_not_fatal() {
        let raw = collection(json!([
            {
                "type": "Feature",
                "properties": {"COUNTRY": "Testland"},
                "geometry": {"type": "Point", "coordinates": [0.5, 0.5]}
            },
            {
                "type": "Feature",
                "properties": {"COUNTRY": "Testland"}
                // no geometry at all
            },
            {
                "type": "Feature",
                "properties": {"COUNTRY": "Testland"},
                "geometry": {"type": "Polygon", "coordinates": [[[0.0], [1.0]]]}
            },
            {
                "type": "Feature",
                "properties": {"COUNTRY": "Testland"},
                "geometry": {"type": "Polygon", "coordinates": square_coords()}
            }
        ]));

        let parsed = parse_collection(&raw).unwrap();
        assert_eq!(parsed.regions.len(), 1);
        assert_eq!(parsed.skipped_features, 3);
    }

    #[test]
    fn test_empty_feature_list_is_legal() {
        let parsed = parse_collection(&collection(json!([]))).unwrap();
        assert!(parsed.regions.is_empty());
        assert_eq!(parsed.skipped_features, 0);
        // Unfed bounds contain nothing.
        assert!(!parsed.bounds.contains(0.0, 0.0));
    }

    #[test]
    fn test_parse_document_keys_country_by_filename() {
        let raw = collection(json!([{
            "type": "Feature",
            "properties": {"COUNTRY": "Aruba"},
            "geometry": {"type": "Polygon", "coordinates": square_coords()}
        }]));

        let (code, parsed) = parse_document("gadm41_ABW_0.json", &raw).unwrap();
        assert_eq!(code, "ABW");
        assert_eq!(parsed.regions.len(), 1);

        let result = parse_document("nounderscore.json", &raw);
        assert!(matches!(result, Err(BoundaryError::InvalidFormat(_))));
    }
}
