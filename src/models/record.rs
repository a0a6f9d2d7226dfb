//! Per-(source, title) state merged across a day's snapshots.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::models::{Item, TimeLabel};

/// Merged state of one item across all of today's snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CumulativeRecord {
    pub source_id: String,
    pub title: String,
    pub first_time: TimeLabel,
    pub last_time: TimeLabel,

    /// Number of snapshots the title appeared in
    pub occurrence_count: u32,

    /// Union of observed ranks; never shrinks
    pub ranks: BTreeSet<u32>,

    pub url: Option<String>,
    pub mobile_url: Option<String>,
}

impl CumulativeRecord {
    /// Start a record from the first snapshot containing the item.
    pub fn first_seen(source_id: &str, item: &Item, label: &TimeLabel) -> Self {
        Self {
            source_id: source_id.to_string(),
            title: item.title.clone(),
            first_time: label.clone(),
            last_time: label.clone(),
            occurrence_count: 1,
            ranks: item.ranks.clone(),
            url: item.url.clone(),
            mobile_url: item.mobile_url.clone(),
        }
    }

    /// Fold a later observation into the record.
    pub fn observe(&mut self, item: &Item, label: &TimeLabel) {
        self.last_time = label.clone();
        self.occurrence_count += 1;
        self.ranks.extend(item.ranks.iter().copied());
        if self.url.is_none() {
            self.url = item.url.clone();
        }
        if self.mobile_url.is_none() {
            self.mobile_url = item.mobile_url.clone();
        }
    }

    pub fn min_rank(&self) -> Option<u32> {
        self.ranks.first().copied()
    }
}
