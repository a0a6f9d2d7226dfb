// src/utils/http.rs

//! HTTP client utilities.

use std::time::Duration;

use crate::error::Result;
use crate::models::CrawlerConfig;

/// Create a configured asynchronous HTTP client.
pub fn create_async_client(config: &CrawlerConfig) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder()
        .user_agent(&config.user_agent)
        .timeout(Duration::from_secs(config.timeout_secs));

    if let Some(proxy) = config.proxy.as_deref().filter(|p| !p.trim().is_empty()) {
        log::info!("Using proxy {}", proxy);
        builder = builder.proxy(reqwest::Proxy::all(proxy)?);
    }

    Ok(builder.build()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_client_default() {
        assert!(create_async_client(&CrawlerConfig::default()).is_ok());
    }

    #[test]
    fn test_create_client_with_proxy() {
        let config = CrawlerConfig {
            proxy: Some("http://127.0.0.1:10086".to_string()),
            ..CrawlerConfig::default()
        };
        assert!(create_async_client(&config).is_ok());
    }
}
