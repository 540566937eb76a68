use crate::store::DashboardStore;
use rainguard_core::AggregateStats;
use reqwest::StatusCode;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};
use url::Url;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("snapshot endpoint returned {0}")]
    Status(StatusCode),
    #[error("snapshot body rejected: {0}")]
    Body(#[from] serde_json::Error),
}

/// One-shot reader for the aggregate stats endpoint.
#[derive(Debug, Clone)]
pub struct SnapshotClient {
    url: Url,
    http: reqwest::Client,
}

impl SnapshotClient {
    pub fn new(url: Url, timeout: Duration) -> Result<Self, SnapshotError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("rainguard-monitor/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { url, http })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub async fn fetch(&self) -> Result<AggregateStats, SnapshotError> {
        let response = self.http.get(self.url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SnapshotError::Status(status));
        }
        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

/// Fetches the initial aggregates once and overwrites the store's counters.
/// Failures are logged and left alone; the streamed counters keep working.
pub async fn load_initial_stats(client: &SnapshotClient, store: &DashboardStore) -> bool {
    match client.fetch().await {
        Ok(stats) => {
            info!(
                event = "snapshot_loaded",
                total_farmers = stats.total_farmers,
                active_claims = stats.active_claims,
                total_disbursed = stats.total_disbursed
            );
            store.apply_snapshot(stats);
            true
        }
        Err(err) => {
            warn!(event = "snapshot_failed", url = %client.url(), error = %err);
            false
        }
    }
}
