//! Plain-text snapshot record codec.
//!
//! ```text
//! weibo | Weibo
//! 1. First title [URL:https://...] [MOBILE:https://...]
//! 2. Second title
//!
//! zhihu
//! 1. Another title
//!
//! ==== Failed source IDs ====
//! toutiao
//! ```

use crate::models::{Item, Snapshot, SourceItems, TimeLabel};

/// Marker line opening the failed-ids section.
pub const FAILED_MARKER: &str = "==== Failed source IDs ====";

const URL_TAG: &str = " [URL:";
const MOBILE_TAG: &str = " [MOBILE:";

/// Serialize a snapshot. An item seen at several ranks gets one line per rank.
pub fn encode(snapshot: &Snapshot) -> String {
    let mut sections = Vec::new();

    for source in &snapshot.sources {
        let mut section = match source.name.as_deref() {
            Some(name) if !name.is_empty() && name != source.id => {
                format!("{} | {}\n", source.id, name)
            }
            _ => format!("{}\n", source.id),
        };

        for item in &source.items {
            for rank in &item.ranks {
                section.push_str(&format!("{}. {}", rank, item.title));
                if let Some(url) = &item.url {
                    section.push_str(&format!("{URL_TAG}{url}]"));
                }
                if let Some(mobile) = &item.mobile_url {
                    section.push_str(&format!("{MOBILE_TAG}{mobile}]"));
                }
                section.push('\n');
            }
        }
        sections.push(section);
    }

    if !snapshot.failed_ids.is_empty() {
        let mut section = format!("{FAILED_MARKER}\n");
        for id in &snapshot.failed_ids {
            section.push_str(id);
            section.push('\n');
        }
        sections.push(section);
    }

    sections.join("\n")
}

enum Section {
    Idle,
    Source(SourceItems),
    Failed,
}

/// Parse a snapshot record.
///
/// Malformed lines are logged with `origin` and their line number, then skipped.
pub fn parse(label: TimeLabel, content: &str, origin: &str) -> Snapshot {
    parse_lines(label, content.lines().enumerate(), origin)
}

/// Parse a snapshot record straight from disk bytes.
///
/// A line that is not valid UTF-8 is logged and skipped like any other
/// malformed line; the rest of the record still parses.
pub fn parse_bytes(label: TimeLabel, bytes: &[u8], origin: &str) -> Snapshot {
    let lines = bytes
        .split(|b| *b == b'\n')
        .enumerate()
        .filter_map(|(idx, raw)| match std::str::from_utf8(raw) {
            Ok(line) => Some((idx, line)),
            Err(e) => {
                log::warn!(
                    "Skipping non-UTF-8 line {} in {}: {}",
                    idx + 1,
                    origin,
                    e
                );
                None
            }
        });
    parse_lines(label, lines, origin)
}

fn parse_lines<'a>(
    label: TimeLabel,
    lines: impl Iterator<Item = (usize, &'a str)>,
    origin: &str,
) -> Snapshot {
    let mut sources = Vec::new();
    let mut failed_ids = Vec::new();
    let mut section = Section::Idle;

    for (idx, raw) in lines {
        let line = raw.trim();

        if line.is_empty() {
            if let Section::Source(source) = std::mem::replace(&mut section, Section::Idle) {
                sources.push(source);
            }
            continue;
        }

        if is_marker(line) {
            if let Section::Source(source) = std::mem::replace(&mut section, Section::Failed) {
                sources.push(source);
            }
            continue;
        }

        match &mut section {
            Section::Idle => section = Section::Source(parse_header(line)),
            Section::Source(source) => match parse_item_line(line) {
                Some(item) => source.push(item),
                None => log::warn!(
                    "Skipping malformed line {} in {}: {:?}",
                    idx + 1,
                    origin,
                    line
                ),
            },
            Section::Failed => failed_ids.push(line.to_string()),
        }
    }

    if let Section::Source(source) = section {
        sources.push(source);
    }

    Snapshot::new(label, sources, failed_ids)
}

fn is_marker(line: &str) -> bool {
    line.len() >= 8 && line.starts_with("====") && line.ends_with("====")
}

fn parse_header(line: &str) -> SourceItems {
    match line.split_once(" | ") {
        Some((id, name)) => {
            let name = name.trim();
            SourceItems::new(
                id.trim(),
                (!name.is_empty()).then(|| name.to_string()),
            )
        }
        None => SourceItems::new(line, None),
    }
}

/// Parse `rank. title [URL:...] [MOBILE:...]`.
fn parse_item_line(line: &str) -> Option<Item> {
    let (rank, rest) = line.split_once(". ")?;
    let rank: u32 = rank.trim().parse().ok().filter(|r| *r > 0)?;

    let (rest, mobile) = split_tag(rest, MOBILE_TAG);
    let (title, url) = split_tag(rest, URL_TAG);

    let mut item = Item::new(title, rank);
    if item.title.is_empty() {
        return None;
    }
    if let Some(url) = url {
        item = item.with_url(url);
    }
    if let Some(mobile) = mobile {
        item = item.with_mobile_url(mobile);
    }
    Some(item)
}

/// Split a trailing ` [TAG:value]` off `text`.
fn split_tag<'a>(text: &'a str, tag: &str) -> (&'a str, Option<&'a str>) {
    match text.rsplit_once(tag) {
        Some((head, tail)) if tail.ends_with(']') => (head, Some(&tail[..tail.len() - 1])),
        _ => (text, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn label() -> TimeLabel {
        TimeLabel::new(10, 30).unwrap()
    }

    #[test]
    fn test_encode_layout() {
        let mut weibo = SourceItems::new("weibo", Some("Weibo".into()));
        weibo.push(Item::new("Hello", 1).with_url("https://w/1"));
        weibo.push(Item::new("World", 2).with_mobile_url("https://m/2"));
        let zhihu = SourceItems::new("zhihu", Some("zhihu".into()));
        let snapshot = Snapshot::new(label(), vec![weibo, zhihu], vec!["baidu".into()]);

        let expected = "weibo | Weibo\n\
                        1. Hello [URL:https://w/1]\n\
                        2. World [MOBILE:https://m/2]\n\
                        \n\
                        zhihu\n\
                        \n\
                        ==== Failed source IDs ====\n\
                        baidu\n";
        assert_eq!(encode(&snapshot), expected);
    }

    #[test]
    fn test_parse_tolerates_malformed_lines() {
        let content = "weibo | Weibo\n\
                       1. Good one [URL:https://w/1]\n\
                       no rank here\n\
                       0. zero rank\n\
                       x. bad rank\n\
                       3.    \n\
                       2. Second\n";
        let snapshot = parse(label(), content, "test");
        let weibo = snapshot.source("weibo").unwrap();
        assert_eq!(weibo.len(), 2);
        assert_eq!(weibo.display_name(), "Weibo");
        assert_eq!(
            weibo.get("Good one").unwrap().url.as_deref(),
            Some("https://w/1")
        );
    }

    #[test]
    fn test_parse_failed_section_any_marker_text() {
        let content = "zhihu\n1. A\n\n==== 以下ID请求失败 ====\nbaidu\ntoutiao\n";
        let snapshot = parse(label(), content, "test");
        assert_eq!(snapshot.sources.len(), 1);
        assert_eq!(snapshot.failed_ids, vec!["baidu", "toutiao"]);
    }

    #[test]
    fn test_parse_bytes_skips_invalid_utf8_lines() {
        let bytes = b"weibo | Weibo\r\n1. ok title\r\n2. bad \xff title\r\n3. \xe5\xa5\xbd\r\n";
        let snapshot = parse_bytes(label(), bytes, "test");
        let weibo = snapshot.source("weibo").unwrap();
        assert_eq!(weibo.len(), 2);
        assert!(weibo.contains("ok title"));
        assert!(weibo.contains("好"));
    }

    #[test]
    fn test_parse_title_containing_tags() {
        let line = "4. Why [URL: is weird [URL:https://a] [MOBILE:https://m]";
        let item = parse_item_line(line).unwrap();
        assert_eq!(item.title, "Why [URL: is weird");
        assert_eq!(item.url.as_deref(), Some("https://a"));
        assert_eq!(item.mobile_url.as_deref(), Some("https://m"));
    }

    #[test]
    fn test_roundtrip_preserves_items() {
        let mut source = SourceItems::new("baidu", Some("Baidu".into()));
        source.push(Item::new("  Spaced\n title ", 3).with_url("https://b/1"));
        source.push(Item::new("Spaced title", 1));
        source.push(Item::new("Plain", 2).with_mobile_url("https://m/2"));
        let original = Snapshot::new(label(), vec![source], vec![]);

        let parsed = parse(label(), &encode(&original), "roundtrip");
        let item = parsed.source("baidu").unwrap().get("Spaced title").unwrap();
        assert_eq!(item.ranks, BTreeSet::from([1, 3]));
        assert_eq!(item.url.as_deref(), Some("https://b/1"));
        assert_eq!(parsed, original);
    }
}
