//! New item detection.
//!
//! Diffs the latest capture against everything captured earlier the same day,
//! source by source.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::models::{Snapshot, SourceItems};

/// Titles that first appeared in the latest capture, grouped by source.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewItems {
    /// Sources in latest-capture order; only sources with new titles
    pub sources: Vec<SourceItems>,
}

impl NewItems {
    pub fn contains(&self, source_id: &str, title: &str) -> bool {
        self.sources
            .iter()
            .any(|s| s.id == source_id && s.contains(title))
    }

    /// Total number of new titles.
    pub fn total(&self) -> usize {
        self.sources.iter().map(SourceItems::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

/// Detector for titles new to the day.
#[derive(Debug, Clone, Default)]
pub struct NewItemDetector;

impl NewItemDetector {
    pub fn new() -> Self {
        Self
    }

    /// Compare the last snapshot against the union of all earlier ones.
    ///
    /// With fewer than two snapshots there is nothing to diff against.
    pub fn detect(&self, snapshots: &[Snapshot]) -> NewItems {
        let Some((latest, earlier)) = snapshots.split_last() else {
            return NewItems::default();
        };
        if earlier.is_empty() {
            return NewItems::default();
        }

        let mut history: HashMap<&str, HashSet<&str>> = HashMap::new();
        for snapshot in earlier {
            for source in &snapshot.sources {
                history
                    .entry(source.id.as_str())
                    .or_default()
                    .extend(source.items.iter().map(|i| i.title.as_str()));
            }
        }

        let mut sources = Vec::new();
        for source in &latest.sources {
            let seen = history.get(source.id.as_str());
            let mut added = SourceItems::new(source.id.clone(), source.name.clone());
            for item in &source.items {
                if !seen.is_some_and(|titles| titles.contains(item.title.as_str())) {
                    added.push(item.clone());
                }
            }
            if !added.is_empty() {
                sources.push(added);
            }
        }

        let detected = NewItems { sources };
        log::debug!(
            "Detected {} new title(s) in {}",
            detected.total(),
            latest.label
        );
        detected
    }
}

/// Convenience function to detect new items.
pub fn detect_new_items(snapshots: &[Snapshot]) -> NewItems {
    NewItemDetector::new().detect(snapshots)
}
