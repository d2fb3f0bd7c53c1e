//! Error types for boundary loading and point-location queries.

use thiserror::Error;

/// Errors raised while loading boundary documents or testing containment.
///
/// Severity is decided by the call site: document-level variants abort one
/// document's load, feature-level variants drop one feature, containment
/// variants drop one region from one query. Only [`BoundaryError::ReloadFailed`]
/// surfaces to a reload caller.
#[derive(Debug, Error)]
pub enum BoundaryError {
    /// Document is not a FeatureCollection; aborts that document's load.
    #[error("invalid boundary document: {0}")]
    InvalidFormat(String),

    /// Document or feature body is not well-formed JSON.
    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// A feature lacks a required member (`geometry`, `properties`, ...).
    #[error("feature is missing `{0}`")]
    MissingMember(&'static str),

    /// A feature carries a geometry type the engine does not index.
    #[error("unsupported geometry type `{0}`")]
    UnsupportedGeometry(String),

    /// A feature's coordinates cannot be turned into rings, or a ring
    /// vertex is non-finite at containment time.
    #[error("invalid geometry: {reason}")]
    InvalidGeometry { reason: String },

    /// A ring with too few points to bound any area was hit while testing
    /// containment; the region under test is skipped for that query.
    #[error("degenerate ring with {points} points")]
    DegenerateRing { points: usize },

    /// The documents source could not be enumerated at all; the store keeps
    /// its previously published contents.
    #[error("reload failed: {reason}")]
    ReloadFailed { reason: String },
}

impl BoundaryError {
    /// Creates a feature-level geometry error.
    pub fn invalid_geometry(reason: impl Into<String>) -> Self {
        Self::InvalidGeometry {
            reason: reason.into(),
        }
    }

    /// Creates a store-level reload error.
    pub fn reload_failed(reason: impl Into<String>) -> Self {
        Self::ReloadFailed {
            reason: reason.into(),
        }
    }
}
