//! Reload notifications.
//!
//! Every completed reload publishes a `ReloadEvent` through a broadcast
//! channel; interested parties subscribe, the server wires a listener that
//! logs each event. Publishing never blocks and never fails, so a slow or
//! absent subscriber cannot hold up a reload.

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::boundary::ReloadSummary;

/// One completed reload, as seen by subscribers.
#[derive(Debug, Clone)]
pub struct ReloadEvent {
    pub at: DateTime<Utc>,
    pub countries: usize,
    pub regions: usize,
    pub skipped_features: usize,
    pub failed_documents: usize,
}

impl ReloadEvent {
    pub fn from_summary(summary: &ReloadSummary) -> Self {
        Self {
            at: Utc::now(),
            countries: summary.countries,
            regions: summary.regions,
            skipped_features: summary.skipped_features,
            failed_documents: summary.failed_documents,
        }
    }
}

/// Fan-out point for reload events.
#[derive(Clone)]
pub struct ReloadNotifier {
    sender: broadcast::Sender<ReloadEvent>,
}

impl ReloadNotifier {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Events published without a live subscriber are dropped.
    pub fn publish(&self, event: ReloadEvent) {
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ReloadEvent> {
        self.sender.subscribe()
    }
}

impl Default for ReloadNotifier {
    fn default() -> Self {
        Self::new(16)
    }
}

/// Logs every reload event until the channel closes. Intended to run as a
/// spawned task for the lifetime of the process.
pub async fn log_reload_events(mut receiver: broadcast::Receiver<ReloadEvent>) {
    loop {
        match receiver.recv().await {
            Ok(event) => {
                info!(
                    "Boundary data reloaded at {}: {} countries, {} regions ({} features skipped, {} documents failed)",
                    event.at.to_rfc3339(),
                    event.countries,
                    event.regions,
                    event.skipped_features,
                    event.failed_documents
                );
            }
            Err(broadcast::error::RecvError::Lagged(missed)) => {
                warn!("Reload listener lagged, {} events missed", missed);
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
