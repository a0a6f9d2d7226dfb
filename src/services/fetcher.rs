// src/services/fetcher.rs

//! Trending feed fetcher.
//!
//! Fetches ranked item lists from the aggregation API, one platform at a time,
//! with bounded retries and jittered waits.

use std::time::Duration;

use futures::stream::{self, StreamExt};
use rand::Rng;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{CrawlerConfig, Item, Platform, Snapshot, SourceItems, TimeLabel};

#[derive(Debug, Deserialize)]
struct FeedResponse {
    #[serde(default)]
    status: String,
    #[serde(default)]
    items: Vec<FeedItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FeedItem {
    #[serde(default)]
    title: Value,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    mobile_url: Option<String>,
}

impl FeedItem {
    fn title(&self) -> Option<String> {
        match &self.title {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

/// Outcome of fetching every configured platform.
#[derive(Debug, Default)]
pub struct CrawlResult {
    /// Successful sources, in configuration order
    pub sources: Vec<SourceItems>,
    pub failed_ids: Vec<String>,
}

impl CrawlResult {
    pub fn into_snapshot(self, label: TimeLabel) -> Snapshot {
        Snapshot::new(label, self.sources, self.failed_ids)
    }
}

/// Random wait in `[min, max]` milliseconds.
fn jitter_ms(min: u64, max: u64) -> u64 {
    if max <= min {
        return min;
    }
    rand::rng().random_range(min..=max)
}

/// Service for fetching trending feeds.
pub struct SourceFetcher {
    config: CrawlerConfig,
    client: Client,
}

impl SourceFetcher {
    pub fn new(config: CrawlerConfig, client: Client) -> Self {
        Self { config, client }
    }

    /// Fetch every platform, bounded by `max_concurrent`, keeping input order.
    ///
    /// Failures are collected, never abort the crawl.
    pub async fn fetch_all(&self, platforms: &[Platform]) -> CrawlResult {
        let concurrency = self.config.max_concurrent.max(1);
        let mut outcome = CrawlResult::default();

        let mut results = stream::iter(platforms)
            .map(|platform| async move { (platform, self.fetch_source(platform).await) })
            .buffered(concurrency);

        let mut remaining = platforms.len();
        while let Some((platform, result)) = results.next().await {
            remaining -= 1;
            match result {
                Ok(source) => {
                    log::info!("Fetched {} ({} items)", platform.id, source.len());
                    outcome.sources.push(source);
                }
                Err(error) => {
                    log::warn!("Giving up on {}: {}", platform.id, error);
                    outcome.failed_ids.push(platform.id.clone());
                }
            }

            if remaining > 0 && self.config.request_interval_ms > 0 {
                tokio::time::sleep(self.request_interval()).await;
            }
        }

        log::info!(
            "Crawl finished: {} ok, {} failed",
            outcome.sources.len(),
            outcome.failed_ids.len()
        );
        outcome
    }

    /// Fetch one platform, retrying up to `max_retries` times.
    pub async fn fetch_source(&self, platform: &Platform) -> Result<SourceItems> {
        let mut attempt = 0;
        loop {
            match self.fetch_once(platform).await {
                Ok(source) => return Ok(source),
                Err(error) if attempt < self.config.max_retries => {
                    attempt += 1;
                    let wait = self.retry_delay(attempt);
                    log::warn!(
                        "Fetching {} failed: {}. Retry {}/{} in {:.2}s",
                        platform.id,
                        error,
                        attempt,
                        self.config.max_retries,
                        wait.as_secs_f64()
                    );
                    tokio::time::sleep(wait).await;
                }
                Err(error) => return Err(error),
            }
        }
    }

    async fn fetch_once(&self, platform: &Platform) -> Result<SourceItems> {
        let url = self.feed_url(&platform.id)?;
        let response = self
            .client
            .get(url)
            .header("Accept", "application/json, text/plain, */*")
            .header("Cache-Control", "no-cache")
            .send()
            .await?
            .error_for_status()?;
        let feed: FeedResponse = response.json().await?;

        match feed.status.as_str() {
            "success" => log::debug!("{}: fresh data", platform.id),
            "cache" => log::debug!("{}: cached data", platform.id),
            other => {
                return Err(AppError::fetch(
                    &platform.id,
                    format!("unexpected status {other:?}"),
                ));
            }
        }

        let mut source = SourceItems::new(platform.id.clone(), platform.name.clone());
        for (idx, entry) in feed.items.iter().enumerate() {
            let Some(title) = entry.title() else {
                continue;
            };
            let mut item = Item::new(&title, idx as u32 + 1);
            if item.title.is_empty() {
                continue;
            }
            if let Some(url) = &entry.url {
                item = item.with_url(url.clone());
            }
            if let Some(mobile) = &entry.mobile_url {
                item = item.with_mobile_url(mobile.clone());
            }
            source.push(item);
        }
        Ok(source)
    }

    /// `{api_url}?id={id}&latest`
    fn feed_url(&self, source_id: &str) -> Result<Url> {
        let mut url = Url::parse(&self.config.api_url)?;
        url.query_pairs_mut()
            .append_pair("id", source_id)
            .append_key_only("latest");
        Ok(url)
    }

    /// Base wait in the configured range plus 1-2s per earlier retry.
    fn retry_delay(&self, attempt: u32) -> Duration {
        let base = jitter_ms(self.config.retry_min_wait_ms, self.config.retry_max_wait_ms);
        let extra: u64 = (1..attempt).map(|_| jitter_ms(1000, 2000)).sum();
        Duration::from_millis(base + extra)
    }

    fn request_interval(&self) -> Duration {
        let interval = self.config.request_interval_ms;
        Duration::from_millis(jitter_ms(interval.saturating_sub(10), interval + 20).max(50))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(server: &MockServer) -> CrawlerConfig {
        CrawlerConfig {
            api_url: format!("{}/api/s", server.uri()),
            request_interval_ms: 0,
            max_retries: 1,
            retry_min_wait_ms: 0,
            retry_max_wait_ms: 0,
            ..CrawlerConfig::default()
        }
    }

    fn platform(id: &str) -> Platform {
        Platform {
            id: id.into(),
            name: Some(id.to_uppercase()),
        }
    }

    #[test]
    fn test_jitter_bounds() {
        assert_eq!(jitter_ms(5, 5), 5);
        assert_eq!(jitter_ms(9, 3), 9);
        for _ in 0..50 {
            let v = jitter_ms(10, 20);
            assert!((10..=20).contains(&v));
        }
    }

    #[test]
    fn test_feed_url() {
        let fetcher = SourceFetcher::new(CrawlerConfig::default(), Client::new());
        let url = fetcher.feed_url("weibo").unwrap();
        assert_eq!(
            url.as_str(),
            "https://newsnow.busiyi.world/api/s?id=weibo&latest"
        );
    }

    #[tokio::test]
    async fn test_fetch_source_ranks_items() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/s"))
            .and(query_param("id", "weibo"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "cache",
                "items": [
                    {"title": "First", "url": "https://w/1", "mobileUrl": "https://m/1"},
                    {"title": "  Second\n"},
                    {"title": "First"},
                    {"title": 2026},
                    {"title": null}
                ]
            })))
            .mount(&server)
            .await;

        let fetcher = SourceFetcher::new(config(&server), Client::new());
        let source = fetcher.fetch_source(&platform("weibo")).await.unwrap();

        assert_eq!(source.len(), 3);
        let first = source.get("First").unwrap();
        assert_eq!(first.ranks.iter().copied().collect::<Vec<_>>(), vec![1, 3]);
        assert_eq!(first.mobile_url.as_deref(), Some("https://m/1"));
        assert!(source.contains("Second"));
        assert!(source.contains("2026"));
        assert_eq!(source.display_name(), "WEIBO");
    }

    #[tokio::test]
    async fn test_bad_status_retries_then_fails() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/s"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "error"})))
            .expect(2)
            .mount(&server)
            .await;

        let fetcher = SourceFetcher::new(config(&server), Client::new());
        let err = fetcher.fetch_source(&platform("zhihu")).await.unwrap_err();
        assert!(matches!(err, AppError::Fetch { .. }));
    }

    #[tokio::test]
    async fn test_fetch_all_collects_failures_in_order() {
        let server = MockServer::start().await;
        for id in ["a", "c"] {
            Mock::given(method("GET"))
                .and(query_param("id", id))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                    "status": "success",
                    "items": [{"title": format!("{id} news")}]
                })))
                .mount(&server)
                .await;
        }
        Mock::given(method("GET"))
            .and(query_param("id", "b"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let mut cfg = config(&server);
        cfg.max_concurrent = 3;
        let fetcher = SourceFetcher::new(cfg, Client::new());
        let result = fetcher
            .fetch_all(&[platform("a"), platform("b"), platform("c")])
            .await;

        let ids: Vec<_> = result.sources.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
        assert_eq!(result.failed_ids, vec!["b"]);

        let snapshot = result.into_snapshot(TimeLabel::new(12, 0).unwrap());
        assert_eq!(snapshot.item_count(), 2);
    }
}
