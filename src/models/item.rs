//! Captured items and interval snapshots.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::utils::normalize_title;

/// Capture time of a snapshot, `HH:MM`.
///
/// Zero padding makes the lexicographic order chronological.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimeLabel(String);

impl TimeLabel {
    /// Build a label from hour and minute.
    pub fn new(hour: u32, minute: u32) -> Result<Self> {
        if hour > 23 || minute > 59 {
            return Err(AppError::validation(format!(
                "invalid capture time {hour}:{minute}"
            )));
        }
        Ok(Self(format!("{hour:02}:{minute:02}")))
    }

    /// Parse a label from a snapshot file stem (`HH-MM`).
    pub fn from_file_stem(stem: &str) -> Result<Self> {
        let (h, m) = stem
            .split_once('-')
            .ok_or_else(|| AppError::validation(format!("bad snapshot name: {stem}")))?;
        if h.len() != 2 || m.len() != 2 {
            return Err(AppError::validation(format!("bad snapshot name: {stem}")));
        }
        let hour = h
            .parse()
            .map_err(|_| AppError::validation(format!("bad snapshot hour: {stem}")))?;
        let minute = m
            .parse()
            .map_err(|_| AppError::validation(format!("bad snapshot minute: {stem}")))?;
        Self::new(hour, minute)
    }

    /// File stem used on disk (`HH-MM`).
    pub fn file_stem(&self) -> String {
        self.0.replace(':', "-")
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TimeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One title observed at a source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Normalized title; the natural key within a source
    pub title: String,

    /// Observed positions, 1-based
    pub ranks: BTreeSet<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mobile_url: Option<String>,
}

impl Item {
    /// Create an item at a single rank. The title is normalized.
    pub fn new(title: &str, rank: u32) -> Self {
        Self {
            title: normalize_title(title),
            ranks: BTreeSet::from([rank]),
            url: None,
            mobile_url: None,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = non_empty(url.into());
        self
    }

    pub fn with_mobile_url(mut self, url: impl Into<String>) -> Self {
        self.mobile_url = non_empty(url.into());
        self
    }

    /// Lowest observed position.
    pub fn min_rank(&self) -> Option<u32> {
        self.ranks.first().copied()
    }

    /// Fold another observation of the same title into this one.
    ///
    /// Ranks are unioned; links keep their first non-empty value.
    pub fn absorb(&mut self, other: Item) {
        self.ranks.extend(other.ranks);
        if self.url.is_none() {
            self.url = other.url;
        }
        if self.mobile_url.is_none() {
            self.mobile_url = other.mobile_url;
        }
    }
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() { None } else { Some(s) }
}

/// Items captured from one source, in capture order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceItems {
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    pub items: Vec<Item>,
}

impl SourceItems {
    pub fn new(id: impl Into<String>, name: Option<String>) -> Self {
        Self {
            id: id.into(),
            name,
            items: Vec::new(),
        }
    }

    /// Display name, falling back to the id.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }

    /// Add an item, merging it into an existing entry with the same title.
    pub fn push(&mut self, item: Item) {
        match self.items.iter_mut().find(|i| i.title == item.title) {
            Some(existing) => existing.absorb(item),
            None => self.items.push(item),
        }
    }

    pub fn get(&self, title: &str) -> Option<&Item> {
        self.items.iter().find(|i| i.title == title)
    }

    pub fn contains(&self, title: &str) -> bool {
        self.get(title).is_some()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// One interval's capture. Immutable once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub label: TimeLabel,
    pub sources: Vec<SourceItems>,

    /// Sources that failed to fetch during this capture
    #[serde(default)]
    pub failed_ids: Vec<String>,
}

impl Snapshot {
    pub fn new(label: TimeLabel, sources: Vec<SourceItems>, failed_ids: Vec<String>) -> Self {
        Self {
            label,
            sources,
            failed_ids,
        }
    }

    pub fn source(&self, id: &str) -> Option<&SourceItems> {
        self.sources.iter().find(|s| s.id == id)
    }

    /// Drop every source not in `allowed`.
    pub fn retain_sources(&mut self, allowed: &std::collections::HashSet<String>) {
        self.sources.retain(|s| allowed.contains(&s.id));
        self.failed_ids.retain(|id| allowed.contains(id));
    }

    pub fn item_count(&self) -> usize {
        self.sources.iter().map(SourceItems::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_label_roundtrip() {
        let label = TimeLabel::new(9, 5).unwrap();
        assert_eq!(label.as_str(), "09:05");
        assert_eq!(label.file_stem(), "09-05");
        assert_eq!(TimeLabel::from_file_stem("09-05").unwrap(), label);
    }

    #[test]
    fn test_time_label_rejects_garbage() {
        assert!(TimeLabel::from_file_stem("0905").is_err());
        assert!(TimeLabel::from_file_stem("24-00").is_err());
        assert!(TimeLabel::from_file_stem("9-5").is_err());
        assert!(TimeLabel::from_file_stem("ab-cd").is_err());
    }

    #[test]
    fn test_time_label_ordering() {
        let early = TimeLabel::new(8, 59).unwrap();
        let late = TimeLabel::new(10, 0).unwrap();
        assert!(early < late);
    }

    #[test]
    fn test_push_merges_duplicate_titles() {
        let mut source = SourceItems::new("weibo", None);
        source.push(Item::new("Same  title", 3));
        source.push(Item::new("Same title", 1).with_url("https://a.example/1"));
        source.push(Item::new("Other", 2));

        assert_eq!(source.len(), 2);
        let item = source.get("Same title").unwrap();
        assert_eq!(item.ranks, BTreeSet::from([1, 3]));
        assert_eq!(item.url.as_deref(), Some("https://a.example/1"));
    }

    #[test]
    fn test_absorb_keeps_first_url() {
        let mut a = Item::new("t", 1).with_url("https://first");
        a.absorb(Item::new("t", 2).with_url("https://second").with_mobile_url("https://m"));
        assert_eq!(a.url.as_deref(), Some("https://first"));
        assert_eq!(a.mobile_url.as_deref(), Some("https://m"));
    }

    #[test]
    fn test_empty_url_is_none() {
        let item = Item::new("t", 1).with_url("");
        assert!(item.url.is_none());
    }
}
