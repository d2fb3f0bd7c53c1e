//! Remote boundary-catalog client.
//!
//! Scrapes the dataset index page for per-country document links, keeps
//! only the deepest administrative level offered for each country, and
//! downloads whatever the data directory is missing. Per-file failures
//! are counted, never fatal to the batch.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use futures::stream::{self, StreamExt};
use regex::Regex;
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, info, warn};
use url::Url;

const USER_AGENT: &str = "landfall/0.1 (admin-boundary geocoder)";

/// One downloadable document on the index page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub filename: String,
    pub country: String,
    pub level: u32,
}

/// Counters from one catalog sync.
#[derive(Debug, Clone, Copy, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchSummary {
    pub discovered: usize,
    pub downloaded: usize,
    pub skipped: usize,
    pub failed: usize,
}

pub struct CatalogClient {
    client: Client,
    catalog_url: Url,
    href_pattern: Regex,
    concurrency: usize,
}

impl CatalogClient {
    pub fn new(catalog_url: &str, concurrency: usize) -> Result<Self> {
        let mut catalog_url = Url::parse(catalog_url).context("Invalid catalog URL")?;
        // Relative document links resolve against the index as a
        // directory, so the path must end in a slash.
        if !catalog_url.path().ends_with('/') {
            let path = format!("{}/", catalog_url.path());
            catalog_url.set_path(&path);
        }

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(60))
            .build()
            .context("Failed to create HTTP client")?;

        let href_pattern =
            Regex::new(r#"href="([^"]+\.json)""#).context("Failed to compile link pattern")?;

        Ok(Self {
            client,
            catalog_url,
            href_pattern,
            concurrency: concurrency.max(1),
        })
    }

    /// Scrapes the index page and returns one entry per country, deepest
    /// admin level first served wins.
    pub async fn discover(&self) -> Result<Vec<CatalogEntry>> {
        let page = self
            .client
            .get(self.catalog_url.clone())
            .send()
            .await
            .context("Failed to fetch the catalog index")?
            .error_for_status()
            .context("Catalog index request failed")?
            .text()
            .await
            .context("Failed to read the catalog index")?;

        let entries = self.entries_from_index(&page);
        info!("Catalog offers {} countries", entries.len());
        Ok(entries)
    }

    /// Extracts `.json` links from the index markup and groups them by
    /// country, keeping the highest-level document per country.
    fn entries_from_index(&self, page: &str) -> Vec<CatalogEntry> {
        let mut deepest: HashMap<String, CatalogEntry> = HashMap::new();

        for capture in self.href_pattern.captures_iter(page) {
            let href = &capture[1];
            let filename = href.rsplit('/').next().unwrap_or(href);
            let Some(entry) = parse_entry(filename) else {
                debug!("Ignoring catalog link `{}`", href);
                continue;
            };
            match deepest.get(&entry.country) {
                Some(existing) if existing.level >= entry.level => {}
                _ => {
                    deepest.insert(entry.country.clone(), entry);
                }
            }
        }

        let mut entries: Vec<CatalogEntry> = deepest.into_values().collect();
        entries.sort_by(|a, b| a.filename.cmp(&b.filename));
        entries
    }

    /// Downloads every entry the data directory does not already hold,
    /// `concurrency` files at a time. `on_done` runs once per entry, as it
    /// is skipped or as its download settles.
    pub async fn download_missing<F>(
        &self,
        entries: &[CatalogEntry],
        data_dir: &Path,
        mut on_done: F,
    ) -> Result<FetchSummary>
    where
        F: FnMut(&CatalogEntry),
    {
        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("Failed to create `{}`", data_dir.display()))?;

        let mut summary = FetchSummary {
            discovered: entries.len(),
            ..FetchSummary::default()
        };

        // The stream must own its entries: futures borrowing from the
        // `entries` slice fail the `Send` bound the server handlers need.
        let mut missing: Vec<CatalogEntry> = Vec::new();
        for entry in entries {
            if data_dir.join(&entry.filename).exists() {
                summary.skipped += 1;
                on_done(entry);
            } else {
                missing.push(entry.clone());
            }
        }

        let mut downloads = stream::iter(missing.into_iter().map(|entry| {
            let target = data_dir.join(&entry.filename);
            async move {
                let result = self.download_one(&entry, &target).await;
                (entry, result)
            }
        }))
        .buffer_unordered(self.concurrency);

        while let Some((entry, result)) = downloads.next().await {
            match result {
                Ok(()) => summary.downloaded += 1,
                Err(err) => {
                    warn!("Failed to download `{}`: {:#}", entry.filename, err);
                    summary.failed += 1;
                }
            }
            on_done(&entry);
        }

        Ok(summary)
    }

    async fn download_one(&self, entry: &CatalogEntry, target: &Path) -> Result<()> {
        let url = self
            .catalog_url
            .join(&entry.filename)
            .context("Invalid document link")?;
        debug!("Downloading {}", url);

        let raw = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;

        tokio::fs::write(target, &raw)
            .await
            .with_context(|| format!("Failed to write `{}`", target.display()))?;
        Ok(())
    }

    /// Full sync: discover, then download whatever is missing.
    pub async fn sync(&self, data_dir: &Path) -> Result<FetchSummary> {
        let entries = self.discover().await?;
        self.download_missing(&entries, data_dir, |_| {}).await
    }
}

/// Splits `<prefix>_<CODE>_<level>.json` into its country and level
/// tokens; anything else is not a boundary document.
fn parse_entry(filename: &str) -> Option<CatalogEntry> {
    let stem = filename.strip_suffix(".json")?;
    let mut tokens = stem.split('_');
    let _prefix = tokens.next()?;
    let country = tokens.next()?;
    let level = tokens.next()?.parse::<u32>().ok()?;

    if country.is_empty() {
        return None;
    }
    Some(CatalogEntry {
        filename: filename.to_string(),
        country: country.to_string(),
        level,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_entry() {
        let entry = parse_entry("gadm41_ABW_2.json").unwrap();
        assert_eq!(entry.country, "ABW");
        assert_eq!(entry.level, 2);

        assert_eq!(parse_entry("gadm41_ABW.json"), None);
        assert_eq!(parse_entry("gadm41_ABW_x.json"), None);
        assert_eq!(parse_entry("gadm41__2.json"), None);
        assert_eq!(parse_entry("readme.txt"), None);
    }

    #[tokio::test]
    async fn test_index_scrape_keeps_deepest_level_per_country() {
        let client = CatalogClient::new("https://example.com/catalog", 2).unwrap();
        let page = r#"
            <html><body>
            <a href="gadm41_ABW_0.json">gadm41_ABW_0.json</a>
            <a href="gadm41_ABW_1.json">gadm41_ABW_1.json</a>
            <a href="sub/gadm41_AFG_2.json">gadm41_AFG_2.json</a>
            <a href="gadm41_AFG_1.json">gadm41_AFG_1.json</a>
            <a href="style.css">style</a>
            <a href="notes.json.txt">bad</a>
            </body></html>
        "#;

        let entries = client.entries_from_index(page);
        assert_eq!(
            entries,
            vec![
                CatalogEntry {
                    filename: "gadm41_ABW_1.json".to_string(),
                    country: "ABW".to_string(),
                    level: 1,
                },
                CatalogEntry {
                    filename: "gadm41_AFG_2.json".to_string(),
                    country: "AFG".to_string(),
                    level: 2,
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_invalid_catalog_url_is_an_error() {
        assert!(CatalogClient::new("not a url", 2).is_err());
    }

    #[tokio::test]
    async fn test_download_missing_future_is_send() {
        // Server handlers await this future from spawned tasks, so it
        // must stay `Send`.
        fn assert_send<F: Send>(future: F) -> F {
            future
        }

        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("gadm41_ABW_1.json"), b"{}").unwrap();

        let client = CatalogClient::new("https://example.com/catalog", 2).unwrap();
        let entries = vec![CatalogEntry {
            filename: "gadm41_ABW_1.json".to_string(),
            country: "ABW".to_string(),
            level: 1,
        }];

        let mut done = 0;
        let summary = assert_send(client.download_missing(&entries, dir.path(), |_| done += 1))
            .await
            .unwrap();

        assert_eq!(summary.skipped, 1);
        assert_eq!(done, 1);
    }

    #[tokio::test]
    async fn test_download_missing_skips_present_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("gadm41_ABW_1.json"), b"{}").unwrap();

        let client = CatalogClient::new("https://example.com/catalog", 2).unwrap();
        let entries = vec![CatalogEntry {
            filename: "gadm41_ABW_1.json".to_string(),
            country: "ABW".to_string(),
            level: 1,
        }];

        let summary = client
            .download_missing(&entries, dir.path(), |_| {})
            .await
            .unwrap();

        // Nothing was missing, so no request ever goes out.
        assert_eq!(summary.discovered, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.downloaded, 0);
        assert_eq!(summary.failed, 0);
    }
}
