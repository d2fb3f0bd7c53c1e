//! Landfall - hierarchical reverse geocoding over admin boundaries
//!
//! This library provides shared types and modules for the server and fetch
//! binaries: the boundary-document parser and region store, point-location
//! queries, the raw-document cache, and the remote catalog client.

pub mod boundary;
pub mod catalog;
pub mod config;
pub mod documents;
pub mod error;
pub mod events;
pub mod models;

pub use boundary::{locate, locate_with_stats, RegionMatch, RegionStore, ReloadSummary, Snapshot};
pub use error::BoundaryError;
