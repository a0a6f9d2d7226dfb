//! Folding a day's snapshots into cumulative per-title records.

use std::collections::HashMap;

use crate::models::{CumulativeRecord, Snapshot, TimeLabel};

/// Cumulative state of a day, folded from chronologically ordered snapshots.
#[derive(Debug, Clone, Default)]
pub struct MergedHistory {
    records: Vec<CumulativeRecord>,
    index: HashMap<(String, String), usize>,
    labels: Vec<TimeLabel>,
    source_names: HashMap<String, String>,
}

impl MergedHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold snapshots left to right. Callers supply them sorted by capture time.
    pub fn fold<'a>(snapshots: impl IntoIterator<Item = &'a Snapshot>) -> Self {
        let mut history = Self::new();
        for snapshot in snapshots {
            history.apply(snapshot);
        }
        history
    }

    /// Fold one snapshot. Returns `false` if its time label was already applied.
    pub fn apply(&mut self, snapshot: &Snapshot) -> bool {
        if self.labels.contains(&snapshot.label) {
            log::debug!("Snapshot {} already merged, skipping", snapshot.label);
            return false;
        }
        self.labels.push(snapshot.label.clone());

        for source in &snapshot.sources {
            if let Some(name) = &source.name {
                self.source_names.insert(source.id.clone(), name.clone());
            }

            for item in &source.items {
                let key = (source.id.clone(), item.title.clone());
                match self.index.get(&key) {
                    Some(&idx) => self.records[idx].observe(item, &snapshot.label),
                    None => {
                        self.index.insert(key, self.records.len());
                        self.records.push(CumulativeRecord::first_seen(
                            &source.id,
                            item,
                            &snapshot.label,
                        ));
                    }
                }
            }
        }
        true
    }

    /// Records in first-seen order.
    pub fn records(&self) -> &[CumulativeRecord] {
        &self.records
    }

    pub fn get(&self, source_id: &str, title: &str) -> Option<&CumulativeRecord> {
        self.index
            .get(&(source_id.to_string(), title.to_string()))
            .map(|&idx| &self.records[idx])
    }

    /// Label of the most recently applied snapshot.
    pub fn latest_label(&self) -> Option<&TimeLabel> {
        self.labels.last()
    }

    pub fn snapshot_count(&self) -> usize {
        self.labels.len()
    }

    /// Display name of a source, falling back to its id.
    pub fn source_name<'a>(&'a self, source_id: &'a str) -> &'a str {
        self.source_names
            .get(source_id)
            .map(String::as_str)
            .unwrap_or(source_id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
