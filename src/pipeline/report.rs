//! Building a report from a day's snapshots.

use crate::models::{
    CumulativeRecord, GroupReport, Item, KeywordRules, MatchedTitle, NewSourceReport, ReportData,
    ReportMode, Snapshot,
};
use crate::pipeline::diff::{NewItemDetector, NewItems};
use crate::pipeline::matcher::{Classification, Matcher};
use crate::pipeline::merge::MergedHistory;
use crate::pipeline::mode::{ModeStrategy, Population};
use crate::pipeline::score::RankScorer;

/// Group key used when no keyword groups are configured.
pub const PASS_THROUGH_KEY: &str = "All Items";

/// Result of one analysis run.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub report: ReportData,

    /// False when the caller should not send anything
    pub should_notify: bool,

    pub strategy: ModeStrategy,
}

/// Merge, diff, classify and rank a day's snapshots.
///
/// `snapshots` must be chronologically sorted and already platform-filtered.
pub fn analyze(
    snapshots: &[Snapshot],
    rules: &KeywordRules,
    mode: ReportMode,
    scorer: &RankScorer,
) -> Analysis {
    let history = MergedHistory::fold(snapshots);
    let new_items = NewItemDetector::new().detect(snapshots);
    let strategy = ModeStrategy::for_mode(mode, history.snapshot_count() <= 1);
    let matcher = Matcher::new(rules);

    let population: Vec<&CumulativeRecord> = history
        .records()
        .iter()
        .filter(|r| match strategy.population {
            Population::All => true,
            Population::NewOnly => new_items.contains(&r.source_id, &r.title),
            Population::Latest => history.latest_label() == Some(&r.last_time),
        })
        .collect();

    let keys: Vec<&str> = if matcher.is_pass_through() {
        vec![PASS_THROUGH_KEY]
    } else {
        rules.groups.iter().map(|g| g.group_key.as_str()).collect()
    };
    let mut buckets: Vec<Vec<MatchedTitle>> = vec![Vec::new(); keys.len()];

    for record in &population {
        let slot = match matcher.classify(&record.title) {
            Classification::PassThrough => 0,
            Classification::Group(idx) => idx,
            Classification::Filtered | Classification::Unmatched => continue,
        };
        let is_new = strategy.all_new || new_items.contains(&record.source_id, &record.title);
        buckets[slot].push(from_record(record, &history, is_new));
    }

    let total = population.len();
    let mut groups: Vec<GroupReport> = keys
        .into_iter()
        .zip(buckets)
        .filter(|(_, titles)| !titles.is_empty())
        .map(|(key, mut titles)| {
            scorer.sort_titles(&mut titles);
            GroupReport {
                key: key.to_string(),
                match_count: titles.len(),
                percentage: percentage(titles.len(), total),
                titles,
            }
        })
        .collect();
    // Stable: equal counts keep definition order
    groups.sort_by(|a, b| b.match_count.cmp(&a.match_count));

    let new_section = if strategy.show_new_section {
        new_section(&new_items, &matcher, &history)
    } else {
        Vec::new()
    };

    let report = ReportData {
        total_new_count: new_section.iter().map(|s| s.titles.len()).sum(),
        groups,
        new_items: new_section,
        failed_ids: snapshots
            .last()
            .map(|s| s.failed_ids.clone())
            .unwrap_or_default(),
    };

    let should_notify = if strategy.suppress_when_empty {
        report.has_matches()
    } else {
        report.has_matches() || !report.new_items.is_empty()
    };

    log::info!(
        "{} mode: {} of {} title(s) matched in {} group(s), {} new, notify={}",
        mode.as_str(),
        report.total_titles(),
        total,
        report.groups.len(),
        report.total_new_count,
        should_notify
    );

    Analysis {
        report,
        should_notify,
        strategy,
    }
}

fn from_record(record: &CumulativeRecord, history: &MergedHistory, is_new: bool) -> MatchedTitle {
    MatchedTitle {
        title: record.title.clone(),
        source_id: record.source_id.clone(),
        source_name: history.source_name(&record.source_id).to_string(),
        first_time: Some(record.first_time.clone()),
        last_time: Some(record.last_time.clone()),
        count: record.occurrence_count,
        ranks: record.ranks.clone(),
        url: record.url.clone(),
        mobile_url: record.mobile_url.clone(),
        is_new,
    }
}

fn from_new_item(source_id: &str, source_name: &str, item: &Item) -> MatchedTitle {
    MatchedTitle {
        title: item.title.clone(),
        source_id: source_id.to_string(),
        source_name: source_name.to_string(),
        first_time: None,
        last_time: None,
        count: 1,
        ranks: item.ranks.clone(),
        url: item.url.clone(),
        mobile_url: item.mobile_url.clone(),
        is_new: true,
    }
}

/// New titles passing the matcher, in capture order.
fn new_section(
    new_items: &NewItems,
    matcher: &Matcher,
    history: &MergedHistory,
) -> Vec<NewSourceReport> {
    new_items
        .sources
        .iter()
        .filter_map(|source| {
            let name = history.source_name(&source.id);
            let titles: Vec<MatchedTitle> = source
                .items
                .iter()
                .filter(|item| matcher.matches(&item.title))
                .map(|item| from_new_item(&source.id, name, item))
                .collect();
            (!titles.is_empty()).then(|| NewSourceReport {
                source_id: source.id.clone(),
                source_name: name.to_string(),
                titles,
            })
        })
        .collect()
}

/// Share of `total`, rounded to two decimals.
fn percentage(count: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (count as f64 / total as f64 * 10_000.0).round() / 100.0
}
