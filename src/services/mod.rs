//! Service layer for the trend watcher.
//!
//! This module contains the network collaborators:
//! - Feed fetching (`SourceFetcher`)
//! - Chat delivery (`Notifier`, `WebhookNotifier`)

mod fetcher;
mod notifier;

pub use fetcher::{CrawlResult, SourceFetcher};
pub use notifier::{DeliveryOutcome, Notifier, WebhookNotifier, dispatch, notifiers_from_config};
