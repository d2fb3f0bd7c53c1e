use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Runtime settings shared by the server and fetch binaries.
///
/// Every field has a default, so a partial config file (or none at all)
/// is fine; command-line flags override whatever the file provides.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Config {
    /// Address the HTTP server binds.
    pub listen: String,
    /// Directory holding the per-country boundary documents.
    pub data_dir: PathBuf,
    /// Dataset index page scraped for document links.
    pub catalog_url: String,
    /// Parallel downloads during a catalog sync.
    pub download_concurrency: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:8080".to_string(),
            data_dir: PathBuf::from("geojson"),
            catalog_url: "https://geodata.ucdavis.edu/gadm/gadm4.1/json/".to_string(),
            download_concurrency: 4,
        }
    }
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path).context("Failed to read config file")?;
        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;
        Ok(config)
    }
}
