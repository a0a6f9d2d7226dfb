// src/models/mod.rs

//! Domain models for the trend watcher.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod config;
mod item;
mod keyword;
mod record;
mod report;

// Re-export all public types
pub use config::{
    Config, CrawlerConfig, NotificationConfig, PathsConfig, Platform, ReportConfig, ReportMode,
    WebhookConfig, WeightConfig,
};
pub use item::{Item, Snapshot, SourceItems, TimeLabel};
pub use keyword::{KeywordGroup, KeywordRules};
pub use record::CumulativeRecord;
pub use report::{GroupReport, MatchedTitle, NewSourceReport, ReportData};
