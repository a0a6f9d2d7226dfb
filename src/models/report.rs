//! Report values handed to renderers and notifiers.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::models::TimeLabel;

/// A classified title together with its display statistics.
///
/// The relevance weight is derived on demand by the scorer, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchedTitle {
    pub title: String,
    pub source_id: String,
    pub source_name: String,
    pub first_time: Option<TimeLabel>,
    pub last_time: Option<TimeLabel>,

    /// Occurrence count across today's snapshots
    pub count: u32,

    pub ranks: BTreeSet<u32>,
    pub url: Option<String>,
    pub mobile_url: Option<String>,
    pub is_new: bool,
}

impl MatchedTitle {
    /// `first` when seen once, otherwise `[first ~ last]`.
    pub fn time_display(&self) -> String {
        match (&self.first_time, &self.last_time) {
            (None, _) => String::new(),
            (Some(first), None) => first.to_string(),
            (Some(first), Some(last)) if first == last => first.to_string(),
            (Some(first), Some(last)) => format!("[{first} ~ {last}]"),
        }
    }

    /// Preferred link: mobile first, then desktop.
    pub fn link(&self) -> Option<&str> {
        self.mobile_url.as_deref().or(self.url.as_deref())
    }

    pub fn min_rank(&self) -> Option<u32> {
        self.ranks.first().copied()
    }

    pub fn max_rank(&self) -> Option<u32> {
        self.ranks.last().copied()
    }
}

/// One keyword group's matches, ranked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupReport {
    pub key: String,
    pub match_count: usize,

    /// Share of the classified population, two decimals
    pub percentage: f64,

    pub titles: Vec<MatchedTitle>,
}

/// Newly appeared titles of one source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSourceReport {
    pub source_id: String,
    pub source_name: String,
    pub titles: Vec<MatchedTitle>,
}

/// Everything a renderer or notifier needs from one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportData {
    pub groups: Vec<GroupReport>,
    pub new_items: Vec<NewSourceReport>,
    pub failed_ids: Vec<String>,
    pub total_new_count: usize,
}

impl ReportData {
    /// Titles across all groups.
    pub fn total_titles(&self) -> usize {
        self.groups.iter().map(|g| g.titles.len()).sum()
    }

    pub fn has_matches(&self) -> bool {
        self.groups.iter().any(|g| g.match_count > 0)
    }

    /// True when there is nothing at all to report.
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty() && self.new_items.is_empty() && self.failed_ids.is_empty()
    }
}
