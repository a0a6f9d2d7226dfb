// src/pipeline/pipeline.rs

//! End-to-end run: capture, analyze, deliver.

use std::path::Path;

use chrono::{DateTime, FixedOffset};
use reqwest::Client;
use serde::Serialize;

use crate::error::Result;
use crate::models::{Config, KeywordRules, ReportMode};
use crate::pipeline::crawl::run_crawler;
use crate::pipeline::report::{Analysis, analyze};
use crate::pipeline::score::RankScorer;
use crate::services::{DeliveryOutcome, dispatch, notifiers_from_config};
use crate::storage::SnapshotStore;
use crate::utils::time;

/// Analyze the stored snapshots of the day with the given mode.
pub fn run_report(
    config: &Config,
    rules: &KeywordRules,
    storage: &dyn SnapshotStore,
    mode: ReportMode,
) -> Result<Analysis> {
    let platforms = config.platform_ids();
    let snapshots = storage.read_all(Some(&platforms))?;
    let scorer = RankScorer::new(config.weight, config.report.rank_threshold);
    Ok(analyze(&snapshots, rules, mode, &scorer))
}

/// Summary of one full run.
#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub captured: bool,
    pub should_notify: bool,
    pub deliveries: Vec<DeliveryOutcome>,
}

/// Capture, analyze with the configured mode, then deliver if warranted.
///
/// The keyword file is loaded first; a missing file aborts the run.
pub async fn run_pipeline(
    config: &Config,
    storage: &dyn SnapshotStore,
    client: &Client,
    now: DateTime<FixedOffset>,
) -> Result<RunSummary> {
    let rules = KeywordRules::load(Path::new(&config.paths.keywords_file))?;

    let captured = run_crawler(config, storage, client, time::capture_label(&now)?)
        .await?
        .is_some();

    let mode = config.report.mode;
    let analysis = run_report(config, &rules, storage, mode)?;

    let mut summary = RunSummary {
        captured,
        should_notify: analysis.should_notify,
        deliveries: Vec::new(),
    };

    if !config.notification.enabled {
        log::info!("Notifications disabled, skipping delivery");
        return Ok(summary);
    }
    if !config.notification.webhooks.any_configured() {
        log::info!("No webhook configured, skipping delivery");
        return Ok(summary);
    }
    if !analysis.should_notify {
        log::info!("Nothing worth sending in {} mode", mode.as_str());
        return Ok(summary);
    }

    let notifiers = notifiers_from_config(config, client);
    let timestamp = time::display_timestamp(&now);
    summary.deliveries = dispatch(&notifiers, &analysis.report, config, mode, &timestamp).await;

    Ok(summary)
}
