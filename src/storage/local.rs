//! Local filesystem storage implementation.

use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{AppError, Result};
use crate::models::{Snapshot, TimeLabel};
use crate::storage::{SnapshotStore, format};
use crate::utils::time;

const EXTENSION: &str = "txt";

/// Local filesystem storage backend for one day's snapshots.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root_dir: PathBuf,
    date: String,
}

impl LocalStorage {
    /// Create a storage for the given day folder (e.g. `2026-10-17`).
    pub fn new(root_dir: impl Into<PathBuf>, date: impl Into<String>) -> Self {
        Self {
            root_dir: root_dir.into(),
            date: date.into(),
        }
    }

    /// Create a storage for "today" in the configured timezone.
    pub fn today(root_dir: impl Into<PathBuf>, utc_offset_hours: i32) -> Result<Self> {
        let now = time::now(utc_offset_hours)?;
        Ok(Self::new(root_dir, time::date_folder(&now)))
    }

    pub fn date(&self) -> &str {
        &self.date
    }

    /// Directory holding the day's snapshot records.
    pub fn snapshot_dir(&self) -> PathBuf {
        self.root_dir.join(&self.date).join("snapshots")
    }

    fn path(&self, label: &TimeLabel) -> PathBuf {
        self.snapshot_dir()
            .join(format!("{}.{}", label.file_stem(), EXTENSION))
    }

    /// Records of the day, sorted by time label. A missing directory is empty.
    pub fn list(&self) -> Result<Vec<(TimeLabel, PathBuf)>> {
        let dir = self.snapshot_dir();
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("No snapshot directory at {}", dir.display());
                return Ok(Vec::new());
            }
            Err(e) => return Err(AppError::Io(e)),
        };

        let mut records = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            match TimeLabel::from_file_stem(stem) {
                Ok(label) => records.push((label, path)),
                Err(e) => log::warn!("Ignoring {}: {}", path.display(), e),
            }
        }
        records.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(records)
    }

    /// True when the day has at most one capture.
    pub fn is_first_capture(&self) -> Result<bool> {
        Ok(self.list()?.len() <= 1)
    }

    /// Write bytes atomically (write to temp, then rename).
    fn write_bytes(path: &Path, bytes: &[u8]) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let tmp = path.with_extension("tmp");
        let mut file = fs::File::create(&tmp)?;
        file.write_all(bytes)?;
        file.flush()?;
        drop(file);

        fs::rename(&tmp, path)?;
        Ok(())
    }
}

impl SnapshotStore for LocalStorage {
    fn write(&self, snapshot: &Snapshot) -> Result<PathBuf> {
        let path = self.path(&snapshot.label);
        Self::write_bytes(&path, format::encode(snapshot).as_bytes())?;
        log::info!(
            "Snapshot {} written: {} source(s), {} item(s), {} failed",
            path.display(),
            snapshot.sources.len(),
            snapshot.item_count(),
            snapshot.failed_ids.len()
        );
        Ok(path)
    }

    fn read_all(&self, platforms: Option<&HashSet<String>>) -> Result<Vec<Snapshot>> {
        let mut snapshots = Vec::new();
        for (label, path) in self.list()? {
            let bytes = fs::read(&path)?;
            let mut snapshot = format::parse_bytes(label, &bytes, &path.display().to_string());
            if let Some(allowed) = platforms {
                snapshot.retain_sources(allowed);
            }
            snapshots.push(snapshot);
        }
        log::debug!(
            "Read {} snapshot(s) from {}",
            snapshots.len(),
            self.snapshot_dir().display()
        );
        Ok(snapshots)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Item, SourceItems};
    use tempfile::TempDir;

    fn snapshot(h: u32, m: u32, titles: &[&str]) -> Snapshot {
        let mut weibo = SourceItems::new("weibo", Some("Weibo".into()));
        let mut zhihu = SourceItems::new("zhihu", None);
        for (i, t) in titles.iter().enumerate() {
            weibo.push(Item::new(t, i as u32 + 1));
            zhihu.push(Item::new(t, i as u32 + 1));
        }
        Snapshot::new(TimeLabel::new(h, m).unwrap(), vec![weibo, zhihu], vec![])
    }

    #[test]
    fn test_missing_dir_is_empty_history() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path(), "2026-01-01");
        assert!(storage.read_all(None).unwrap().is_empty());
        assert!(storage.is_first_capture().unwrap());
    }

    #[test]
    fn test_write_and_read_in_chronological_order() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path(), "2026-01-01");

        storage.write(&snapshot(14, 0, &["late"])).unwrap();
        let path = storage.write(&snapshot(9, 5, &["early"])).unwrap();
        assert!(path.ends_with("2026-01-01/snapshots/09-05.txt"));

        let all = storage.read_all(None).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].label.as_str(), "09:05");
        assert_eq!(all[1].label.as_str(), "14:00");
        assert!(!storage.is_first_capture().unwrap());
    }

    #[test]
    fn test_same_label_replaces_record() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path(), "2026-01-01");

        storage.write(&snapshot(9, 0, &["old"])).unwrap();
        storage.write(&snapshot(9, 0, &["new"])).unwrap();

        let all = storage.read_all(None).unwrap();
        assert_eq!(all.len(), 1);
        assert!(all[0].source("weibo").unwrap().contains("new"));
        assert!(!all[0].source("weibo").unwrap().contains("old"));
    }

    #[test]
    fn test_platform_filter_drops_sources() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path(), "2026-01-01");
        storage.write(&snapshot(9, 0, &["a", "b"])).unwrap();

        let allowed = HashSet::from(["zhihu".to_string()]);
        let all = storage.read_all(Some(&allowed)).unwrap();
        assert!(all[0].source("weibo").is_none());
        assert_eq!(all[0].source("zhihu").unwrap().len(), 2);
    }

    #[test]
    fn test_ignores_foreign_files() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path(), "2026-01-01");
        storage.write(&snapshot(9, 0, &["a"])).unwrap();

        let dir = storage.snapshot_dir();
        fs::write(dir.join("notes.md"), "x").unwrap();
        fs::write(dir.join("garbage.txt"), "x").unwrap();

        assert_eq!(storage.list().unwrap().len(), 1);
    }

    #[test]
    fn test_invalid_utf8_line_does_not_abort_read() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path(), "2026-01-01");
        storage.write(&snapshot(8, 0, &["a"])).unwrap();

        let dir = storage.snapshot_dir();
        fs::write(dir.join("09-00.txt"), b"weibo\n1. ok title\n2. bad \xff title\n").unwrap();

        let all = storage.read_all(None).unwrap();
        assert_eq!(all.len(), 2);
        assert!(all[0].source("weibo").unwrap().contains("a"));
        let later = all[1].source("weibo").unwrap();
        assert_eq!(later.len(), 1);
        assert!(later.contains("ok title"));
    }

    #[test]
    fn test_roundtrip_through_disk() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path(), "2026-01-01");

        let mut source = SourceItems::new("baidu", Some("Baidu".into()));
        source.push(
            Item::new("Multi rank", 4)
                .with_url("https://b/1")
                .with_mobile_url("https://m/1"),
        );
        source.push(Item::new("Multi rank", 2));
        let original = Snapshot::new(
            TimeLabel::new(7, 45).unwrap(),
            vec![source],
            vec!["weibo".into()],
        );
        storage.write(&original).unwrap();

        let read = storage.read_all(None).unwrap();
        assert_eq!(read, vec![original]);
    }
}
