//! Splitting a report into size-bounded chat messages.
//!
//! Every chunk starts with the shared header and ends with the footer. A group
//! (or new-items source) header always travels with its first title, so no
//! chunk ends on a header with nothing under it. Sizes are UTF-8 byte lengths.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::{
    Config, GroupReport, MatchedTitle, NewSourceReport, NotificationConfig, ReportData, ReportMode,
};
use crate::utils::html_escape;

/// Target chat markup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageFormat {
    WeWork,
    Telegram,
    Feishu,
    DingTalk,
}

impl MessageFormat {
    pub const ALL: [MessageFormat; 4] = [
        MessageFormat::Feishu,
        MessageFormat::DingTalk,
        MessageFormat::WeWork,
        MessageFormat::Telegram,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MessageFormat::WeWork => "wework",
            MessageFormat::Telegram => "telegram",
            MessageFormat::Feishu => "feishu",
            MessageFormat::DingTalk => "dingtalk",
        }
    }

    /// Byte ceiling of one message in this format.
    pub fn ceiling(&self, config: &NotificationConfig) -> usize {
        match self {
            MessageFormat::WeWork | MessageFormat::Telegram => config.batch_size,
            MessageFormat::DingTalk => config.dingtalk_batch_size,
            MessageFormat::Feishu => config.feishu_batch_size,
        }
    }

    fn highlight(&self) -> (&'static str, &'static str) {
        match self {
            MessageFormat::Feishu => ("<font color='red'>**", "**</font>"),
            MessageFormat::Telegram => ("<b>", "</b>"),
            MessageFormat::WeWork | MessageFormat::DingTalk => ("**", "**"),
        }
    }
}

impl fmt::Display for MessageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageFormat {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "wework" => Ok(MessageFormat::WeWork),
            "telegram" => Ok(MessageFormat::Telegram),
            "feishu" => Ok(MessageFormat::Feishu),
            "dingtalk" => Ok(MessageFormat::DingTalk),
            other => Err(AppError::config(format!("unknown message format: {other}"))),
        }
    }
}

/// `[min]` or `[min - max]`, highlighted when `min <= rank_threshold`.
pub fn rank_display(title: &MatchedTitle, rank_threshold: u32, format: MessageFormat) -> String {
    let (Some(min), Some(max)) = (title.min_rank(), title.max_rank()) else {
        return String::new();
    };
    let plain = if min == max {
        format!("[{min}]")
    } else {
        format!("[{min} - {max}]")
    };
    if min <= rank_threshold {
        let (open, close) = format.highlight();
        format!("{open}{plain}{close}")
    } else {
        plain
    }
}

/// One title rendered in the target markup.
pub fn format_title(
    title: &MatchedTitle,
    format: MessageFormat,
    rank_threshold: u32,
    show_source: bool,
    mark_new: bool,
) -> String {
    let telegram = format == MessageFormat::Telegram;
    let text = if telegram {
        html_escape(&title.title)
    } else {
        title.title.clone()
    };
    let linked = match title.link() {
        Some(link) if telegram => format!("<a href=\"{link}\">{text}</a>"),
        Some(link) => format!("[{text}]({link})"),
        None => text,
    };

    let mut out = String::new();
    if show_source {
        match format {
            MessageFormat::Feishu => {
                out.push_str(&format!("<font color='grey'>[{}]</font> ", title.source_name))
            }
            MessageFormat::Telegram => {
                out.push_str(&format!("[{}] ", html_escape(&title.source_name)))
            }
            _ => out.push_str(&format!("[{}] ", title.source_name)),
        }
    }
    if mark_new && title.is_new {
        out.push_str("🆕 ");
    }
    out.push_str(&linked);

    let ranks = rank_display(title, rank_threshold, format);
    if !ranks.is_empty() {
        out.push(' ');
        out.push_str(&ranks);
    }

    let time = title.time_display();
    if !time.is_empty() {
        out.push_str(&match format {
            MessageFormat::Feishu => format!(" <font color='grey'>- {time}</font>"),
            MessageFormat::Telegram => format!(" <code>- {time}</code>"),
            _ => format!(" - {time}"),
        });
    }

    if title.count > 1 {
        out.push_str(&match format {
            MessageFormat::Feishu => format!(" <font color='green'>({}x)</font>", title.count),
            MessageFormat::Telegram => format!(" <code>({}x)</code>", title.count),
            _ => format!(" ({}x)", title.count),
        });
    }
    out
}

/// Accumulates units into chunks under a byte ceiling.
struct Chunker {
    header: String,
    footer: String,
    max_bytes: usize,
    batches: Vec<String>,
    current: String,
    has_content: bool,
}

impl Chunker {
    fn new(header: String, footer: String, max_bytes: usize) -> Self {
        Self {
            current: header.clone(),
            header,
            footer,
            max_bytes,
            batches: Vec::new(),
            has_content: false,
        }
    }

    fn fits(&self, unit: &str) -> bool {
        self.current.len() + unit.len() + self.footer.len() < self.max_bytes
    }

    /// Append `unit`, or close the chunk and restart with `header + prefix + unit`.
    ///
    /// `prefixes` are tried longest first; the first one leaving the restarted
    /// chunk under the ceiling wins, falling back to no prefix at all.
    fn push(&mut self, unit: &str, prefixes: &[&str]) {
        if self.fits(unit) {
            self.current.push_str(unit);
        } else {
            self.close();
            let base = self.header.len() + unit.len() + self.footer.len();
            let prefix = prefixes
                .iter()
                .copied()
                .find(|p| base + p.len() < self.max_bytes)
                .unwrap_or("");
            self.current = format!("{}{}{}", self.header, prefix, unit);
            if base > self.max_bytes {
                log::warn!(
                    "Unit of {} bytes exceeds the {} byte ceiling; sending it oversized",
                    unit.len(),
                    self.max_bytes
                );
            }
        }
        self.has_content = true;
    }

    fn push_if_fits(&mut self, unit: &str) {
        if self.fits(unit) {
            self.current.push_str(unit);
        }
    }

    fn append(&mut self, unit: &str) {
        self.current.push_str(unit);
    }

    fn close(&mut self) {
        if self.has_content {
            let chunk = std::mem::take(&mut self.current);
            self.batches.push(chunk + &self.footer);
        }
        self.has_content = false;
    }

    fn finish(mut self) -> Vec<String> {
        self.close();
        self.batches
    }
}

/// Plans the messages of one report for one target format.
#[derive(Debug, Clone)]
pub struct BatchPlanner {
    format: MessageFormat,
    max_bytes: usize,
    rank_threshold: u32,
    mode: ReportMode,
    timestamp: String,
    separator: String,
}

impl BatchPlanner {
    /// `timestamp` is printed in every footer.
    pub fn new(
        format: MessageFormat,
        max_bytes: usize,
        rank_threshold: u32,
        mode: ReportMode,
        timestamp: impl Into<String>,
    ) -> Self {
        Self {
            format,
            max_bytes,
            rank_threshold,
            mode,
            timestamp: timestamp.into(),
            separator: "━━━━━━━━━━━━━━━━━━━".to_string(),
        }
    }

    pub fn from_config(
        format: MessageFormat,
        config: &Config,
        mode: ReportMode,
        timestamp: impl Into<String>,
    ) -> Self {
        Self::new(
            format,
            format.ceiling(&config.notification),
            config.report.rank_threshold,
            mode,
            timestamp,
        )
        .with_separator(config.notification.feishu_separator.clone())
    }

    /// Separator line used between Feishu sections.
    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    /// Keep `bytes` of every message free for a caller-added prefix.
    pub fn reserve(mut self, bytes: usize) -> Self {
        self.max_bytes = self.max_bytes.saturating_sub(bytes);
        self
    }

    pub fn format(&self) -> MessageFormat {
        self.format
    }

    /// Split the report into ordered message payloads.
    pub fn plan(&self, report: &ReportData) -> Vec<String> {
        let header = self.header(report.total_titles());
        let footer = self.footer();

        if report.is_empty() {
            return vec![format!("{header}{}{footer}", self.placeholder())];
        }

        let mut chunker = Chunker::new(header, footer, self.max_bytes);

        if !report.groups.is_empty() {
            let stats_header = self.stats_header();

            let n = report.groups.len();
            for (i, group) in report.groups.iter().enumerate() {
                let group_header = self.group_header(i, n, group);
                let last = group.titles.len().saturating_sub(1);

                let (lead, restart) = if i == 0 {
                    (stats_header.as_str(), "")
                } else {
                    ("", stats_header.as_str())
                };
                let mut unit = format!("{lead}{group_header}");
                if let Some(first) = group.titles.first() {
                    unit.push_str(&self.group_line(0, first, last));
                }
                chunker.push(&unit, &[restart]);

                let prefix = format!("{stats_header}{group_header}");
                for (j, title) in group.titles.iter().enumerate().skip(1) {
                    chunker.push(
                        &self.group_line(j, title, last),
                        &[prefix.as_str(), group_header.as_str()],
                    );
                }

                if i + 1 < n {
                    chunker.push_if_fits(&self.group_separator());
                }
            }
        }

        if !report.new_items.is_empty() {
            let new_header = self.new_header(report.total_new_count);

            for (i, source) in report.new_items.iter().enumerate() {
                let source_header = self.source_header(source);

                let (lead, restart) = if i == 0 {
                    (new_header.as_str(), "")
                } else {
                    ("", new_header.as_str())
                };
                let mut unit = format!("{lead}{source_header}");
                if let Some(first) = source.titles.first() {
                    unit.push_str(&self.new_line(0, first));
                }
                chunker.push(&unit, &[restart]);

                let prefix = format!("{new_header}{source_header}");
                for (j, title) in source.titles.iter().enumerate().skip(1) {
                    chunker.push(
                        &self.new_line(j, title),
                        &[prefix.as_str(), source_header.as_str()],
                    );
                }
                chunker.append("\n");
            }
        }

        if !report.failed_ids.is_empty() {
            let failed_header = self.failed_header();
            for (i, id) in report.failed_ids.iter().enumerate() {
                let line = self.failed_line(id);
                if i == 0 {
                    chunker.push(&format!("{failed_header}{line}"), &[]);
                } else {
                    chunker.push(&line, &[failed_header.as_str()]);
                }
            }
        }

        let batches = chunker.finish();
        log::debug!(
            "Planned {} {} batch(es) under {} bytes",
            batches.len(),
            self.format,
            self.max_bytes
        );
        batches
    }

    fn group_line(&self, idx: usize, title: &MatchedTitle, last: usize) -> String {
        let formatted = format_title(title, self.format, self.rank_threshold, true, true);
        let mut line = format!("  {}. {}\n", idx + 1, formatted);
        if idx < last {
            line.push('\n');
        }
        line
    }

    fn new_line(&self, idx: usize, title: &MatchedTitle) -> String {
        let formatted = format_title(title, self.format, self.rank_threshold, false, false);
        format!("  {}. {}\n", idx + 1, formatted)
    }

    fn escape(&self, text: &str) -> String {
        match self.format {
            MessageFormat::Telegram => html_escape(text),
            _ => text.to_string(),
        }
    }

    fn header(&self, total: usize) -> String {
        match self.format {
            MessageFormat::WeWork => format!("**Total items:** {total}\n\n\n\n"),
            MessageFormat::Telegram => format!("Total items: {total}\n\n"),
            MessageFormat::DingTalk => {
                format!("**Total items:** {total}\n\n**Type:** Trend report\n\n---\n\n")
            }
            MessageFormat::Feishu => format!("**Total items:** {total}\n\n"),
        }
    }

    fn footer(&self) -> String {
        let ts = &self.timestamp;
        match self.format {
            MessageFormat::WeWork => format!("\n\n\n> Updated: {ts}"),
            MessageFormat::Telegram => format!("\n\nUpdated: {ts}"),
            MessageFormat::DingTalk => format!("\n\n> Updated: {ts}"),
            MessageFormat::Feishu => format!("\n\n<font color='grey'>Updated: {ts}</font>"),
        }
    }

    fn section_break(&self) -> String {
        match self.format {
            MessageFormat::WeWork => "\n\n\n\n".to_string(),
            MessageFormat::Telegram => "\n\n".to_string(),
            MessageFormat::DingTalk => "\n---\n\n".to_string(),
            MessageFormat::Feishu => format!("\n{}\n\n", self.separator),
        }
    }

    fn stats_header(&self) -> String {
        match self.format {
            MessageFormat::Telegram => "📊 Keyword Stats\n\n".to_string(),
            _ => "📊 **Keyword Stats**\n\n".to_string(),
        }
    }

    fn group_header(&self, idx: usize, total: usize, group: &GroupReport) -> String {
        let count = group.match_count;
        let emoji = match count {
            c if c >= 10 => "🔥",
            c if c >= 5 => "📈",
            _ => "📌",
        };
        let seq = format!("[{}/{}]", idx + 1, total);
        let key = self.escape(&group.key);

        match self.format {
            MessageFormat::Telegram => format!("{emoji} {seq} {key} : {count} items\n\n"),
            MessageFormat::Feishu => {
                let seq = format!("<font color='grey'>{seq}</font>");
                let count = match count {
                    c if c >= 10 => format!("<font color='red'>{c}</font>"),
                    c if c >= 5 => format!("<font color='orange'>{c}</font>"),
                    c => c.to_string(),
                };
                format!("{emoji} {seq} **{key}** : {count} items\n\n")
            }
            MessageFormat::WeWork | MessageFormat::DingTalk => {
                if count >= 5 {
                    format!("{emoji} {seq} **{key}** : **{count}** items\n\n")
                } else {
                    format!("{emoji} {seq} **{key}** : {count} items\n\n")
                }
            }
        }
    }

    fn group_separator(&self) -> String {
        self.section_break()
    }

    fn new_header(&self, total_new: usize) -> String {
        let title = match self.format {
            MessageFormat::Telegram => format!("🆕 New This Round ({total_new} items)\n\n"),
            _ => format!("🆕 **New This Round** ({total_new} items)\n\n"),
        };
        format!("{}{}", self.section_break(), title)
    }

    fn source_header(&self, source: &NewSourceReport) -> String {
        let name = self.escape(&source.source_name);
        let n = source.titles.len();
        match self.format {
            MessageFormat::Telegram => format!("{name} ({n} items):\n\n"),
            _ => format!("**{name}** ({n} items):\n\n"),
        }
    }

    fn failed_header(&self) -> String {
        let title = match self.format {
            MessageFormat::Telegram => "⚠️ Failed sources:\n\n",
            _ => "⚠️ **Failed sources:**\n\n",
        };
        format!("{}{}", self.section_break(), title)
    }

    fn failed_line(&self, id: &str) -> String {
        match self.format {
            MessageFormat::Feishu => format!("  • <font color='red'>{id}</font>\n"),
            MessageFormat::DingTalk => format!("  • **{id}**\n"),
            _ => format!("  • {}\n", self.escape(id)),
        }
    }

    fn placeholder(&self) -> String {
        let text = match self.mode {
            ReportMode::Incremental => "No new keyword matches in incremental mode",
            ReportMode::Current => "No keyword matches in the current ranking",
            ReportMode::Daily => "No keyword matches",
        };
        format!("📭 {text}\n\n")
    }
}
