//! HTTP server for boundary point-location queries.
//!
//! Serves reverse-geocoding lookups against the in-memory region store,
//! plus the operational routes: reload, catalog fetch, country listing,
//! and raw-document passthrough.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use clap::Parser;
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use landfall::catalog::{CatalogClient, FetchSummary};
use landfall::config::Config;
use landfall::documents::DocumentCache;
use landfall::events::{self, ReloadEvent, ReloadNotifier};
use landfall::{locate, BoundaryError, RegionMatch, RegionStore, ReloadSummary};

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

#[derive(Parser, Debug)]
#[command(name = "server")]
#[command(about = "Admin-boundary reverse geocoding server")]
struct Args {
    /// Config file (TOML); flags override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen address
    #[arg(short, long)]
    listen: Option<String>,

    /// Boundary document directory
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Dataset index URL for /api/fetch
    #[arg(long)]
    catalog_url: Option<String>,

    /// Parallel downloads during a catalog sync
    #[arg(long)]
    download_concurrency: Option<usize>,
}

/// Application state shared across handlers
struct AppState {
    store: RegionStore,
    cache: DocumentCache,
    catalog: CatalogClient,
    notifier: ReloadNotifier,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();
    let config = resolve_config(&args)?;

    info!("Landfall Boundary Server");
    info!("Boundary documents: {}", config.data_dir.display());

    let catalog = CatalogClient::new(&config.catalog_url, config.download_concurrency)?;
    let state = Arc::new(AppState {
        store: RegionStore::new(&config.data_dir),
        cache: DocumentCache::new(&config.data_dir),
        catalog,
        notifier: ReloadNotifier::default(),
    });

    tokio::spawn(events::log_reload_events(state.notifier.subscribe()));

    // Initial load. An empty or missing directory is a degraded start,
    // not a fatal one; /api/fetch or /api/reload can fill it later.
    match run_reload(&state).await {
        Ok(summary) => info!(
            "Initial load: {} countries, {} regions",
            summary.countries, summary.regions
        ),
        Err(err) => warn!("Initial load failed, starting empty: {:#}", err),
    }

    // Build router
    let app = Router::new()
        .route("/health", get(health_handler))
        .route("/api/location/find", post(find_handler))
        .route("/api/countries", get(countries_handler))
        .route("/api/reload", post(reload_handler))
        .route("/api/fetch", post(fetch_handler))
        .route("/api/files", get(files_handler))
        .route("/api/files/{name}", get(file_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    info!("Starting server on {}", config.listen);

    let listener = tokio::net::TcpListener::bind(&config.listen).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// File settings first, command-line flags on top.
fn resolve_config(args: &Args) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::load_from_file(path)?,
        None => Config::default(),
    };

    if let Some(listen) = &args.listen {
        config.listen = listen.clone();
    }
    if let Some(data_dir) = &args.data_dir {
        config.data_dir = data_dir.clone();
    }
    if let Some(catalog_url) = &args.catalog_url {
        config.catalog_url = catalog_url.clone();
    }
    if let Some(concurrency) = args.download_concurrency {
        config.download_concurrency = concurrency;
    }

    Ok(config)
}

/// Rebuilds the region store and raw cache off the event loop, then
/// notifies subscribers. The store keeps its previous snapshot when the
/// pass fails.
async fn run_reload(state: &Arc<AppState>) -> Result<ReloadSummary> {
    let worker = Arc::clone(state);
    let summary = tokio::task::spawn_blocking(move || -> Result<ReloadSummary, BoundaryError> {
        let summary = worker.store.reload()?;
        worker.cache.reload();
        Ok(summary)
    })
    .await
    .context("Reload task failed")??;

    state.notifier.publish(ReloadEvent::from_summary(&summary));
    Ok(summary)
}

/// Health check endpoint
async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let snapshot = state.store.snapshot();

    Json(HealthResponse {
        status: if snapshot.is_empty() { "degraded" } else { "ok" },
        countries: snapshot.country_count(),
        regions: snapshot.region_count(),
    })
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    countries: usize,
    regions: usize,
}

/// Point-location lookup
async fn find_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<FindRequest>,
) -> Result<Json<RegionMatch>, (StatusCode, String)> {
    let snapshot = state.store.snapshot();

    match locate(&snapshot, request.latitude, request.longitude) {
        Some(found) => Ok(Json(found)),
        None => Err((
            StatusCode::NOT_FOUND,
            "Location not found in any loaded country.".to_string(),
        )),
    }
}

#[derive(Deserialize)]
struct FindRequest {
    latitude: f64,
    longitude: f64,
}

/// Loaded countries and their level schema
async fn countries_handler(
    State(state): State<Arc<AppState>>,
) -> Json<BTreeMap<String, BTreeMap<String, u32>>> {
    Json(state.store.country_summaries())
}

/// Re-scan the data directory
async fn reload_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ReloadSummary>, (StatusCode, String)> {
    let summary = run_reload(&state).await.map_err(|e| {
        tracing::error!("Reload failed: {:#}", e);
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })?;

    Ok(Json(summary))
}

/// Catalog sync followed by a reload
async fn fetch_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<FetchResponse>, (StatusCode, String)> {
    let fetch = state.catalog.sync(state.store.data_dir()).await.map_err(|e| {
        tracing::error!("Catalog sync failed: {:#}", e);
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })?;

    let reload = run_reload(&state).await.map_err(|e| {
        tracing::error!("Reload after fetch failed: {:#}", e);
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })?;

    Ok(Json(FetchResponse { fetch, reload }))
}

#[derive(Serialize)]
struct FetchResponse {
    fetch: FetchSummary,
    reload: ReloadSummary,
}

/// Cached raw documents
async fn files_handler(State(state): State<Arc<AppState>>) -> Json<Vec<FileEntry>> {
    let documents = state.cache.documents();
    Json(
        documents
            .iter()
            .map(|(name, raw)| FileEntry {
                name: name.clone(),
                bytes: raw.len(),
            })
            .collect(),
    )
}

#[derive(Serialize)]
struct FileEntry {
    name: String,
    bytes: usize,
}

/// One raw document, exactly as downloaded
async fn file_handler(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, StatusCode> {
    match state.cache.get(&name) {
        Some(raw) => Ok(([(header::CONTENT_TYPE, "application/json")], raw.to_vec())),
        None => Err(StatusCode::NOT_FOUND),
    }
}
