//! The region store: parsed countries behind an atomic snapshot swap.
//!
//! Readers clone an `Arc<Snapshot>` out of the slot and never hold a lock
//! while testing containment. A reload builds a complete replacement off
//! to the side and publishes it with a single pointer swap, so every query
//! sees a fully-old or fully-new world, never a mix.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use rayon::prelude::*;
use serde::Serialize;
use tracing::{info, warn};

use crate::boundary::parser::{self, ParsedCountry};
use crate::error::BoundaryError;
use crate::models::region::{AdminRegion, CountryBounds};

/// An immutable view of every loaded country.
///
/// `countries` and `bounds` always share a key set. Published snapshots
/// are never mutated; reload replaces the whole thing.
#[derive(Debug, Default)]
pub struct Snapshot {
    countries: HashMap<String, Vec<AdminRegion>>,
    bounds: HashMap<String, CountryBounds>,
}

impl Snapshot {
    /// Country code to its regions, in document load order.
    pub fn countries(&self) -> &HashMap<String, Vec<AdminRegion>> {
        &self.countries
    }

    pub fn bounds(&self) -> &HashMap<String, CountryBounds> {
        &self.bounds
    }

    pub fn country_count(&self) -> usize {
        self.countries.len()
    }

    pub fn region_count(&self) -> usize {
        self.countries.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.countries.is_empty()
    }

    #[cfg(test)]
    pub(crate) fn from_parts(
        countries: HashMap<String, Vec<AdminRegion>>,
        bounds: HashMap<String, CountryBounds>,
    ) -> Self {
        Self { countries, bounds }
    }

    /// Every country with its envelope and regions. Map order, so callers
    /// must not read meaning into the sequence.
    pub fn iter_countries(&self) -> impl Iterator<Item = (&str, CountryBounds, &[AdminRegion])> {
        self.countries.iter().map(|(code, regions)| {
            let bounds = self.bounds.get(code).copied().unwrap_or_default();
            (code.as_str(), bounds, regions.as_slice())
        })
    }
}

/// Counters from one completed reload pass.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReloadSummary {
    pub countries: usize,
    pub regions: usize,
    pub skipped_features: usize,
    pub failed_documents: usize,
}

/// What one document contributed to the reload pass.
enum DocumentOutcome {
    Loaded { code: String, parsed: ParsedCountry },
    Failed { code: Option<String> },
}

/// Owns the published snapshot and the directory it reloads from.
///
/// Starts empty; the first `reload` populates it. Reloads are serialized
/// by a gate mutex (a second caller waits, then runs its own full pass);
/// queries are never blocked by either.
pub struct RegionStore {
    data_dir: PathBuf,
    snapshot: RwLock<Arc<Snapshot>>,
    reload_gate: Mutex<()>,
}

impl RegionStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            snapshot: RwLock::new(Arc::new(Snapshot::default())),
            reload_gate: Mutex::new(()),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// The current published snapshot. The lock is held only for the Arc
    /// clone; all containment testing runs on the clone afterwards.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&self.snapshot.read())
    }

    /// Re-reads every `.json` document under the data directory and
    /// publishes a fresh snapshot.
    ///
    /// An unenumerable directory fails the whole reload and leaves the
    /// published snapshot untouched. Zero documents is a legal degraded
    /// state and publishes an empty snapshot. A document that fails to
    /// read or parse keeps its country's previously published regions,
    /// so a country is always served fully-old or fully-new; countries
    /// with no document in the new pass drop out.
    pub fn reload(&self) -> Result<ReloadSummary, BoundaryError> {
        let _gate = self.reload_gate.lock();

        let documents = enumerate_documents(&self.data_dir)?;
        let previous = self.snapshot();

        let outcomes: Vec<DocumentOutcome> = documents
            .par_iter()
            .map(|path| load_document(path))
            .collect();

        let mut countries = HashMap::new();
        let mut bounds = HashMap::new();
        let mut skipped_features = 0;
        let mut failed_documents = 0;

        for outcome in outcomes {
            match outcome {
                DocumentOutcome::Loaded { code, parsed } => {
                    skipped_features += parsed.skipped_features;
                    countries.insert(code.clone(), parsed.regions);
                    bounds.insert(code, parsed.bounds);
                }
                DocumentOutcome::Failed { code } => {
                    failed_documents += 1;
                    let Some(code) = code else { continue };
                    // A loaded document for the same country beats a
                    // carried-over one regardless of outcome order.
                    if countries.contains_key(&code) {
                        continue;
                    }
                    if let (Some(regions), Some(envelope)) = (
                        previous.countries.get(&code),
                        previous.bounds.get(&code),
                    ) {
                        warn!(
                            "Keeping {} previously loaded regions for {}",
                            regions.len(),
                            code
                        );
                        countries.insert(code.clone(), regions.clone());
                        bounds.insert(code, *envelope);
                    }
                }
            }
        }

        let snapshot = Snapshot { countries, bounds };
        let summary = ReloadSummary {
            countries: snapshot.country_count(),
            regions: snapshot.region_count(),
            skipped_features,
            failed_documents,
        };

        *self.snapshot.write() = Arc::new(snapshot);

        info!(
            "Published snapshot: {} countries, {} regions ({} features skipped, {} documents failed)",
            summary.countries, summary.regions, summary.skipped_features, summary.failed_documents
        );
        Ok(summary)
    }

    /// Display-name keyed listing of the loaded countries: each name maps
    /// to the `level_<n>` keys of that country's first region with their
    /// numeric depth. Countries whose first region carries no `country`
    /// level, and countries loaded empty, appear as `"Unknown"`.
    pub fn country_summaries(&self) -> BTreeMap<String, BTreeMap<String, u32>> {
        let snapshot = self.snapshot();
        let mut summaries = BTreeMap::new();

        for regions in snapshot.countries().values() {
            let mut display = "Unknown".to_string();
            let mut levels = BTreeMap::new();

            if let Some(first) = regions.first() {
                if let Some(name) = first.admin_levels().get("country") {
                    display = name.clone();
                }
                for key in first.admin_levels().keys() {
                    if let Some(n) = key
                        .strip_prefix("level_")
                        .and_then(|suffix| suffix.parse::<u32>().ok())
                    {
                        levels.insert(key.clone(), n);
                    }
                }
            }

            summaries.insert(display, levels);
        }

        summaries
    }
}

/// Lists the `.json` documents under `dir`, sorted by filename so the
/// pass order (and therefore which document wins a country-code clash)
/// is deterministic.
fn enumerate_documents(dir: &Path) -> Result<Vec<PathBuf>, BoundaryError> {
    let entries = fs::read_dir(dir).map_err(|err| {
        BoundaryError::reload_failed(format!("cannot enumerate `{}`: {err}", dir.display()))
    })?;

    let mut documents = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|err| {
            BoundaryError::reload_failed(format!("cannot enumerate `{}`: {err}", dir.display()))
        })?;
        let path = entry.path();
        if path.extension().and_then(|ext| ext.to_str()) == Some("json") && path.is_file() {
            documents.push(path);
        }
    }

    documents.sort();
    Ok(documents)
}

/// Reads and parses one document. Failures never abort the pass; they
/// surface as a `Failed` outcome with whatever country code the filename
/// still yields, so the fold can carry the previous regions forward.
fn load_document(path: &Path) -> DocumentOutcome {
    let Some(filename) = path.file_name().and_then(|name| name.to_str()) else {
        warn!("Skipping document with unreadable name: {}", path.display());
        return DocumentOutcome::Failed { code: None };
    };

    let raw = match fs::read(path) {
        Ok(raw) => raw,
        Err(err) => {
            warn!("Failed to read `{}`: {}", path.display(), err);
            return DocumentOutcome::Failed {
                code: parser::country_code_from_filename(filename),
            };
        }
    };

    match parser::parse_document(filename, &raw) {
        Ok((code, parsed)) => DocumentOutcome::Loaded { code, parsed },
        Err(err) => {
            warn!("Failed to load `{}`: {}", path.display(), err);
            DocumentOutcome::Failed {
                code: parser::country_code_from_filename(filename),
            }
        }
    }
}
