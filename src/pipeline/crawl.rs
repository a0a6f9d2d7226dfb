// src/pipeline/crawl.rs

//! Capture pipeline: fetch every platform and persist one snapshot.

use reqwest::Client;

use crate::error::Result;
use crate::models::{Config, Snapshot, TimeLabel};
use crate::services::SourceFetcher;
use crate::storage::SnapshotStore;

/// Fetch all configured platforms and write the capture under `label`.
///
/// Returns `None` when crawling is disabled in the configuration.
pub async fn run_crawler(
    config: &Config,
    storage: &dyn SnapshotStore,
    client: &Client,
    label: TimeLabel,
) -> Result<Option<Snapshot>> {
    if !config.crawler.enabled {
        log::info!("Crawler disabled in configuration, skipping fetch");
        return Ok(None);
    }

    log::info!(
        "Capturing {} platform(s) at {}",
        config.platforms.len(),
        label
    );

    let fetcher = SourceFetcher::new(config.crawler.clone(), client.clone());
    let snapshot = fetcher.fetch_all(&config.platforms).await.into_snapshot(label);

    if snapshot.sources.is_empty() {
        log::warn!("Every platform failed; writing a snapshot with failures only");
    }
    storage.write(&snapshot)?;

    Ok(Some(snapshot))
}
