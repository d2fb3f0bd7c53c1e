//! Raw boundary-document cache.
//!
//! Keeps the unparsed bytes of every `.json` document in the data
//! directory so the file passthrough routes can serve them without
//! touching disk per request. Rebuilt as a whole and swapped atomically
//! on reload, the same discipline the region store uses.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{info, warn};

pub type DocumentMap = BTreeMap<String, Arc<[u8]>>;

pub struct DocumentCache {
    data_dir: PathBuf,
    documents: RwLock<Arc<DocumentMap>>,
}

impl DocumentCache {
    /// Starts empty; `reload` fills it.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            documents: RwLock::new(Arc::new(DocumentMap::new())),
        }
    }

    /// Re-reads every `.json` document and publishes the fresh map.
    ///
    /// A missing or unreadable directory publishes an empty cache rather
    /// than failing; single unreadable files are logged and skipped.
    /// Returns the number of documents cached.
    pub fn reload(&self) -> usize {
        let mut documents = DocumentMap::new();

        match fs::read_dir(&self.data_dir) {
            Ok(entries) => {
                for entry in entries.flatten() {
                    let path = entry.path();
                    if path.extension().and_then(|ext| ext.to_str()) != Some("json")
                        || !path.is_file()
                    {
                        continue;
                    }
                    let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
                        continue;
                    };
                    match fs::read(&path) {
                        Ok(raw) => {
                            documents.insert(name.to_string(), Arc::from(raw.into_boxed_slice()));
                        }
                        Err(err) => {
                            warn!("Failed to read `{}`: {}", path.display(), err);
                        }
                    }
                }
            }
            Err(err) => {
                warn!(
                    "Cannot enumerate `{}`, serving an empty document cache: {}",
                    self.data_dir.display(),
                    err
                );
            }
        }

        let count = documents.len();
        *self.documents.write() = Arc::new(documents);
        info!("Cached {} raw documents", count);
        count
    }

    /// The current published map; sorted by filename.
    pub fn documents(&self) -> Arc<DocumentMap> {
        Arc::clone(&self.documents.read())
    }

    pub fn get(&self, name: &str) -> Option<Arc<[u8]>> {
        self.documents.read().get(name).cloned()
    }

    pub fn file_names(&self) -> Vec<String> {
        self.documents.read().keys().cloned().collect()
    }
}
