//! Application configuration structures.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Root application configuration.
///
/// Built once at startup and handed to every component by reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Feed fetching behavior
    #[serde(default)]
    pub crawler: CrawlerConfig,

    /// Report mode and ranking settings
    #[serde(default)]
    pub report: ReportConfig,

    /// Composite score weights
    #[serde(default)]
    pub weight: WeightConfig,

    /// Delivery settings
    #[serde(default)]
    pub notification: NotificationConfig,

    /// Filesystem locations
    #[serde(default)]
    pub paths: PathsConfig,

    /// Monitored sources
    #[serde(default = "defaults::platforms")]
    pub platforms: Vec<Platform>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&content)?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            let mut config = Self::default();
            config.apply_env(|key| std::env::var(key).ok());
            config
        })
    }

    /// Override webhook settings from the environment.
    ///
    /// A non-empty variable wins over the file value.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let hooks = &mut self.notification.webhooks;
        let targets: [(&str, &mut Option<String>); 5] = [
            ("FEISHU_WEBHOOK_URL", &mut hooks.feishu_url),
            ("DINGTALK_WEBHOOK_URL", &mut hooks.dingtalk_url),
            ("WEWORK_WEBHOOK_URL", &mut hooks.wework_url),
            ("TELEGRAM_BOT_TOKEN", &mut hooks.telegram_bot_token),
            ("TELEGRAM_CHAT_ID", &mut hooks.telegram_chat_id),
        ];
        for (key, slot) in targets {
            if let Some(value) = lookup(key).map(|v| v.trim().to_string()) {
                if !value.is_empty() {
                    log::debug!("{} taken from environment", key);
                    *slot = Some(value);
                }
            }
        }
    }

    /// Ids of the monitored platforms, used to filter stored snapshots.
    pub fn platform_ids(&self) -> HashSet<String> {
        self.platforms.iter().map(|p| p.id.clone()).collect()
    }

    /// Directory holding per-day snapshot folders.
    pub fn output_dir(&self) -> PathBuf {
        PathBuf::from(&self.paths.output_dir)
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.crawler.user_agent.trim().is_empty() {
            return Err(AppError::validation("crawler.user_agent is empty"));
        }
        if self.crawler.timeout_secs == 0 {
            return Err(AppError::validation("crawler.timeout_secs must be > 0"));
        }
        if self.crawler.max_concurrent == 0 {
            return Err(AppError::validation("crawler.max_concurrent must be > 0"));
        }
        if self.crawler.retry_min_wait_ms > self.crawler.retry_max_wait_ms {
            return Err(AppError::validation(
                "crawler.retry_min_wait_ms must not exceed crawler.retry_max_wait_ms",
            ));
        }
        url::Url::parse(&self.crawler.api_url)?;

        if self.report.rank_threshold == 0 {
            return Err(AppError::validation("report.rank_threshold must be > 0"));
        }
        if !(-12..=14).contains(&self.report.utc_offset_hours) {
            return Err(AppError::validation(
                "report.utc_offset_hours must be within -12..=14",
            ));
        }

        let w = &self.weight;
        if [w.rank, w.frequency, w.hotness]
            .iter()
            .any(|v| !v.is_finite() || *v < 0.0)
        {
            return Err(AppError::validation("weights must be finite and >= 0"));
        }

        let n = &self.notification;
        if n.batch_size == 0 || n.dingtalk_batch_size == 0 || n.feishu_batch_size == 0 {
            return Err(AppError::validation("batch sizes must be > 0"));
        }
        for hook in [&n.webhooks.feishu_url, &n.webhooks.dingtalk_url, &n.webhooks.wework_url]
            .into_iter()
            .flatten()
        {
            url::Url::parse(hook)?;
        }

        if self.platforms.is_empty() {
            return Err(AppError::validation("No platforms defined"));
        }
        let mut seen = HashSet::new();
        for platform in &self.platforms {
            if platform.id.trim().is_empty() {
                return Err(AppError::validation("platform id is empty"));
            }
            if !seen.insert(platform.id.as_str()) {
                return Err(AppError::validation(format!(
                    "duplicate platform id: {}",
                    platform.id
                )));
            }
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            crawler: CrawlerConfig::default(),
            report: ReportConfig::default(),
            weight: WeightConfig::default(),
            notification: NotificationConfig::default(),
            paths: PathsConfig::default(),
            platforms: defaults::platforms(),
        }
    }
}

/// HTTP client and fetching behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    /// Whether `run` fetches at all
    #[serde(default = "defaults::enabled")]
    pub enabled: bool,

    /// Feed endpoint; queried as `{api_url}?id={source}&latest`
    #[serde(default = "defaults::api_url")]
    pub api_url: String,

    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Delay between requests in milliseconds (jittered)
    #[serde(default = "defaults::request_interval")]
    pub request_interval_ms: u64,

    /// Maximum concurrent requests
    #[serde(default = "defaults::max_concurrent")]
    pub max_concurrent: usize,

    /// Extra attempts after the first failure
    #[serde(default = "defaults::max_retries")]
    pub max_retries: u32,

    #[serde(default = "defaults::retry_min_wait")]
    pub retry_min_wait_ms: u64,

    #[serde(default = "defaults::retry_max_wait")]
    pub retry_max_wait_ms: u64,

    /// Optional HTTP(S) proxy
    #[serde(default)]
    pub proxy: Option<String>,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            enabled: defaults::enabled(),
            api_url: defaults::api_url(),
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            request_interval_ms: defaults::request_interval(),
            max_concurrent: defaults::max_concurrent(),
            max_retries: defaults::max_retries(),
            retry_min_wait_ms: defaults::retry_min_wait(),
            retry_max_wait_ms: defaults::retry_max_wait(),
            proxy: None,
        }
    }
}

/// Which item population a report covers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportMode {
    /// Everything seen today
    #[default]
    Daily,
    /// Only items new since the previous capture
    Incremental,
    /// Only items present in the latest capture
    Current,
}

impl ReportMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportMode::Daily => "daily",
            ReportMode::Incremental => "incremental",
            ReportMode::Current => "current",
        }
    }
}

impl std::str::FromStr for ReportMode {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "daily" => Ok(ReportMode::Daily),
            "incremental" => Ok(ReportMode::Incremental),
            "current" => Ok(ReportMode::Current),
            other => Err(AppError::config(format!("unknown report mode: {other}"))),
        }
    }
}

/// Report settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    #[serde(default)]
    pub mode: ReportMode,

    /// Positions at or above this rank count toward hotness
    #[serde(default = "defaults::rank_threshold")]
    pub rank_threshold: u32,

    /// Timezone that decides what "today" is
    #[serde(default = "defaults::utc_offset_hours")]
    pub utc_offset_hours: i32,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            mode: ReportMode::default(),
            rank_threshold: defaults::rank_threshold(),
            utc_offset_hours: defaults::utc_offset_hours(),
        }
    }
}

/// Weights of the composite relevance score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightConfig {
    #[serde(default = "defaults::rank_weight")]
    pub rank: f64,
    #[serde(default = "defaults::frequency_weight")]
    pub frequency: f64,
    #[serde(default = "defaults::hotness_weight")]
    pub hotness: f64,
}

impl Default for WeightConfig {
    fn default() -> Self {
        Self {
            rank: defaults::rank_weight(),
            frequency: defaults::frequency_weight(),
            hotness: defaults::hotness_weight(),
        }
    }
}

/// Delivery settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    #[serde(default = "defaults::enabled")]
    pub enabled: bool,

    /// Byte ceiling for WeWork and Telegram payloads
    #[serde(default = "defaults::batch_size")]
    pub batch_size: usize,

    #[serde(default = "defaults::dingtalk_batch_size")]
    pub dingtalk_batch_size: usize,

    #[serde(default = "defaults::feishu_batch_size")]
    pub feishu_batch_size: usize,

    /// Pause between consecutive batches of one channel
    #[serde(default = "defaults::batch_interval")]
    pub batch_interval_ms: u64,

    #[serde(default = "defaults::feishu_separator")]
    pub feishu_separator: String,

    #[serde(default)]
    pub webhooks: WebhookConfig,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            enabled: defaults::enabled(),
            batch_size: defaults::batch_size(),
            dingtalk_batch_size: defaults::dingtalk_batch_size(),
            feishu_batch_size: defaults::feishu_batch_size(),
            batch_interval_ms: defaults::batch_interval(),
            feishu_separator: defaults::feishu_separator(),
            webhooks: WebhookConfig::default(),
        }
    }
}

/// Webhook endpoints and credentials.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct WebhookConfig {
    #[serde(default)]
    pub feishu_url: Option<String>,
    #[serde(default)]
    pub dingtalk_url: Option<String>,
    #[serde(default)]
    pub wework_url: Option<String>,
    #[serde(default)]
    pub telegram_bot_token: Option<String>,
    #[serde(default)]
    pub telegram_chat_id: Option<String>,
}

impl WebhookConfig {
    /// True when at least one channel is fully configured.
    pub fn any_configured(&self) -> bool {
        let set = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
        set(&self.feishu_url)
            || set(&self.dingtalk_url)
            || set(&self.wework_url)
            || (set(&self.telegram_bot_token) && set(&self.telegram_chat_id))
    }
}

/// Filesystem locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "defaults::output_dir")]
    pub output_dir: String,

    /// Keyword rule file
    #[serde(default = "defaults::keywords_file")]
    pub keywords_file: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            output_dir: defaults::output_dir(),
            keywords_file: defaults::keywords_file(),
        }
    }
}

/// A monitored source.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Platform {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

impl Platform {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

mod defaults {
    use super::Platform;

    pub fn enabled() -> bool {
        true
    }

    // Crawler defaults
    pub fn api_url() -> String {
        "https://newsnow.busiyi.world/api/s".into()
    }
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; trendwatch/0.1)".into()
    }
    pub fn timeout() -> u64 {
        10
    }
    pub fn request_interval() -> u64 {
        1000
    }
    pub fn max_concurrent() -> usize {
        1
    }
    pub fn max_retries() -> u32 {
        2
    }
    pub fn retry_min_wait() -> u64 {
        3000
    }
    pub fn retry_max_wait() -> u64 {
        5000
    }

    // Report defaults
    pub fn rank_threshold() -> u32 {
        5
    }
    pub fn utc_offset_hours() -> i32 {
        8
    }
    pub fn rank_weight() -> f64 {
        0.6
    }
    pub fn frequency_weight() -> f64 {
        0.3
    }
    pub fn hotness_weight() -> f64 {
        0.1
    }

    // Notification defaults
    pub fn batch_size() -> usize {
        4000
    }
    pub fn dingtalk_batch_size() -> usize {
        20000
    }
    pub fn feishu_batch_size() -> usize {
        29000
    }
    pub fn batch_interval() -> u64 {
        1000
    }
    pub fn feishu_separator() -> String {
        "━━━━━━━━━━━━━━━━━━━".into()
    }

    // Path defaults
    pub fn output_dir() -> String {
        "output".into()
    }
    pub fn keywords_file() -> String {
        "data/frequency_words.txt".into()
    }

    pub fn platforms() -> Vec<Platform> {
        [
            ("toutiao", "今日头条"),
            ("baidu", "百度热搜"),
            ("weibo", "微博"),
            ("zhihu", "知乎"),
            ("bilibili-hot-search", "bilibili 热搜"),
        ]
        .into_iter()
        .map(|(id, name)| Platform {
            id: id.to_string(),
            name: Some(name.to_string()),
        })
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_default_config_ok() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_user_agent() {
        let mut config = Config::default();
        config.crawler.user_agent = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_rank_threshold() {
        let mut config = Config::default();
        config.report.rank_threshold = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_negative_weight() {
        let mut config = Config::default();
        config.weight.hotness = -0.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_duplicate_platforms() {
        let mut config = Config::default();
        config.platforms.push(config.platforms[0].clone());
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_inverted_retry_window() {
        let mut config = Config::default();
        config.crawler.retry_min_wait_ms = 9000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_bad_webhook_url() {
        let mut config = Config::default();
        config.notification.webhooks.wework_url = Some("not a url".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_toml() {
        let toml_src = r#"
            [report]
            mode = "incremental"
            rank_threshold = 3

            [weight]
            rank = 1.0

            [[platforms]]
            id = "weibo"
            name = "Weibo"

            [[platforms]]
            id = "zhihu"
        "#;
        let config: Config = toml::from_str(toml_src).unwrap();
        assert_eq!(config.report.mode, ReportMode::Incremental);
        assert_eq!(config.report.rank_threshold, 3);
        assert_eq!(config.weight.rank, 1.0);
        assert_eq!(config.weight.frequency, 0.3);
        assert_eq!(config.platforms.len(), 2);
        assert_eq!(config.platforms[1].display_name(), "zhihu");
        assert_eq!(config.notification.batch_size, 4000);
    }

    #[test]
    fn test_env_overrides_non_empty_only() {
        let mut config = Config::default();
        config.notification.webhooks.wework_url = Some("https://file.example/hook".into());
        config.apply_env(|key| match key {
            "WEWORK_WEBHOOK_URL" => Some("  ".to_string()),
            "TELEGRAM_BOT_TOKEN" => Some("123:abc".to_string()),
            _ => None,
        });
        assert_eq!(
            config.notification.webhooks.wework_url.as_deref(),
            Some("https://file.example/hook")
        );
        assert_eq!(
            config.notification.webhooks.telegram_bot_token.as_deref(),
            Some("123:abc")
        );
        assert!(config.notification.webhooks.any_configured());
    }

    #[test]
    fn test_telegram_needs_token_and_chat() {
        let hooks = WebhookConfig {
            telegram_bot_token: Some("token".into()),
            ..WebhookConfig::default()
        };
        assert!(!hooks.any_configured());
    }

    #[test]
    fn test_report_mode_from_str() {
        assert_eq!("Current".parse::<ReportMode>().unwrap(), ReportMode::Current);
        assert!("weekly".parse::<ReportMode>().is_err());
    }
}
