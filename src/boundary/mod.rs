//! The reverse-geocoding engine.
//!
//! Parses per-country boundary documents into an in-memory region store
//! and answers "which admin region contains this point" via a bounding-box
//! pre-filter plus exact ray-casting containment.

mod parser;
mod query;
mod raycast;
mod store;

pub use parser::{country_code_from_filename, parse_collection, parse_document, ParsedCountry};
pub use query::{locate, locate_with_stats, LocateStats, RegionMatch};
pub use raycast::{multi_polygon_contains, polygon_contains};
pub use store::{RegionStore, ReloadSummary, Snapshot};
