//! Snapshot files on disk through to planned chat messages.

use std::collections::HashSet;

use tempfile::TempDir;
use trendwatch::models::{
    Item, KeywordRules, ReportMode, Snapshot, SourceItems, TimeLabel, WeightConfig,
};
use trendwatch::pipeline::{BatchPlanner, MessageFormat, RankScorer, analyze};
use trendwatch::storage::{LocalStorage, SnapshotStore};

const RULES: &str = "rust\ncargo\n\n+AI\n\n!spam\n";
const TS: &str = "2026-10-17 09:30:00";

fn source(id: &str, name: &str, titles: &[(&str, u32)]) -> SourceItems {
    let mut source = SourceItems::new(id, Some(name.to_string()));
    for (title, rank) in titles {
        source.push(Item::new(title, *rank));
    }
    source
}

/// Two captures of the day, written latest first.
fn seeded_storage(tmp: &TempDir) -> LocalStorage {
    let storage = LocalStorage::new(tmp.path(), "2026-10-17");

    let later = Snapshot::new(
        TimeLabel::new(9, 30).unwrap(),
        vec![
            source("weibo", "Weibo", &[("Rust 2.0 released", 2), ("Cargo tips", 4)]),
            source("zhihu", "Zhihu", &[("AI chip news", 1), ("New AI model", 3)]),
        ],
        vec!["baidu".to_string()],
    );
    let earlier = Snapshot::new(
        TimeLabel::new(8, 0).unwrap(),
        vec![
            source(
                "weibo",
                "Weibo",
                &[("Rust 2.0 released", 1), ("Spam rust ad", 2), ("Weather", 3)],
            ),
            source("zhihu", "Zhihu", &[("AI chip news", 1)]),
            source("retired", "Retired", &[("AI old story", 1)]),
        ],
        vec![],
    );
    storage.write(&later).unwrap();
    storage.write(&earlier).unwrap();
    storage
}

fn read(storage: &LocalStorage) -> Vec<Snapshot> {
    let platforms: HashSet<String> = ["weibo", "zhihu", "baidu"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    storage.read_all(Some(&platforms)).unwrap()
}

fn scorer() -> RankScorer {
    RankScorer::new(WeightConfig::default(), 5)
}

#[test]
fn test_snapshots_read_back_in_order_and_filtered() {
    let tmp = TempDir::new().unwrap();
    let storage = seeded_storage(&tmp);

    let snapshots = read(&storage);
    let labels: Vec<_> = snapshots.iter().map(|s| s.label.as_str()).collect();
    assert_eq!(labels, vec!["08:00", "09:30"]);
    assert!(snapshots[0].source("retired").is_none());
    assert_eq!(snapshots[1].failed_ids, vec!["baidu"]);
}

#[test]
fn test_daily_report() {
    let tmp = TempDir::new().unwrap();
    let snapshots = read(&seeded_storage(&tmp));
    let rules = KeywordRules::parse(RULES);

    let analysis = analyze(&snapshots, &rules, ReportMode::Daily, &scorer());
    let report = &analysis.report;
    assert!(analysis.should_notify);

    let keys: Vec<_> = report.groups.iter().map(|g| g.key.as_str()).collect();
    assert_eq!(keys, vec!["rust cargo", "AI"]);

    let rust = &report.groups[0];
    assert!((rust.percentage - 33.33).abs() < 1e-9);
    let titles: Vec<_> = rust.titles.iter().map(|t| t.title.as_str()).collect();
    assert_eq!(titles, vec!["Rust 2.0 released", "Cargo tips"]);
    assert_eq!(rust.titles[0].count, 2);
    assert!(!rust.titles[0].is_new);
    assert!(rust.titles[1].is_new);

    let ai: Vec<_> = report.groups[1].titles.iter().map(|t| t.title.as_str()).collect();
    assert_eq!(ai, vec!["AI chip news", "New AI model"]);

    let new_sources: Vec<_> = report.new_items.iter().map(|s| s.source_id.as_str()).collect();
    assert_eq!(new_sources, vec!["weibo", "zhihu"]);
    assert_eq!(report.total_new_count, 2);
    assert_eq!(report.failed_ids, vec!["baidu"]);

    let json = serde_json::to_value(report).unwrap();
    assert_eq!(json["groups"][0]["key"], "rust cargo");
}

#[test]
fn test_incremental_and_current_populations() {
    let tmp = TempDir::new().unwrap();
    let snapshots = read(&seeded_storage(&tmp));
    let rules = KeywordRules::parse(RULES);

    let incremental = analyze(&snapshots, &rules, ReportMode::Incremental, &scorer());
    let mut titles: Vec<_> = incremental
        .report
        .groups
        .iter()
        .flat_map(|g| g.titles.iter())
        .map(|t| (t.title.as_str(), t.is_new))
        .collect();
    titles.sort();
    assert_eq!(titles, vec![("Cargo tips", true), ("New AI model", true)]);
    assert!(incremental.should_notify);

    let current = analyze(&snapshots, &rules, ReportMode::Current, &scorer());
    assert_eq!(current.report.total_titles(), 4);
    let rust = &current.report.groups[0].titles[0];
    assert_eq!(rust.title, "Rust 2.0 released");
    assert_eq!(rust.count, 2);
    assert_eq!(rust.ranks.iter().copied().collect::<Vec<_>>(), vec![1, 2]);
}

#[test]
fn test_batches_respect_ceiling() {
    let tmp = TempDir::new().unwrap();
    let snapshots = read(&seeded_storage(&tmp));
    let rules = KeywordRules::parse(RULES);
    let report = analyze(&snapshots, &rules, ReportMode::Daily, &scorer()).report;

    let whole = BatchPlanner::new(MessageFormat::Telegram, 4000, 5, ReportMode::Daily, TS)
        .plan(&report);
    assert_eq!(whole.len(), 1);
    assert!(whole[0].contains("📊 Keyword Stats"));
    assert!(whole[0].contains("🆕 New This Round (2 items)"));
    assert!(whole[0].contains("⚠️ Failed sources"));

    let batches = BatchPlanner::new(MessageFormat::Telegram, 300, 5, ReportMode::Daily, TS)
        .plan(&report);
    assert!(batches.len() > 1);

    for batch in &batches {
        assert!(batch.len() <= 300);
        assert!(batch.starts_with("Total items: 4"));
        assert!(batch.ends_with(TS));

        let lines: Vec<&str> = batch.lines().filter(|l| !l.trim().is_empty()).collect();
        for (i, line) in lines.iter().enumerate() {
            if line.starts_with("📌") {
                let next = lines[i + 1].trim_start();
                assert!(next.starts_with(|c: char| c.is_ascii_digit()));
            }
        }
    }

    let joined = batches.concat();
    for title in ["Rust 2.0 released", "Cargo tips", "AI chip news", "New AI model"] {
        assert!(joined.contains(title));
    }
    assert!(!joined.contains("Spam rust ad"));
}
