//! Keyword rule blocks and the rule file parser.
//!
//! Blocks are separated by a blank line; each non-empty line is one token:
//!
//! ```text
//! +AI          required word
//! model        normal word
//! !ad          global filter word
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// A named matching rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordGroup {
    /// Every one must occur in the title
    pub required_words: Vec<String>,

    /// At least one must occur in the title
    pub normal_words: Vec<String>,

    /// Space-joined normal words, or required words when there are none
    pub group_key: String,
}

impl KeywordGroup {
    /// Build a group; returns `None` when both word sets are empty.
    pub fn new(required_words: Vec<String>, normal_words: Vec<String>) -> Option<Self> {
        let group_key = if !normal_words.is_empty() {
            normal_words.join(" ")
        } else if !required_words.is_empty() {
            required_words.join(" ")
        } else {
            return None;
        };
        Some(Self {
            required_words,
            normal_words,
            group_key,
        })
    }
}

/// Parsed keyword rule file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordRules {
    /// Groups in definition order
    pub groups: Vec<KeywordGroup>,

    /// Global filter words; not tied to a group
    pub filter_words: Vec<String>,
}

impl KeywordRules {
    /// Load the rule file. A missing or unreadable file is a configuration error.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            AppError::config(format!("keyword file {} unreadable: {}", path.display(), e))
        })?;
        let rules = Self::parse(&content);
        log::info!(
            "Loaded {} keyword group(s) and {} filter word(s) from {}",
            rules.groups.len(),
            rules.filter_words.len(),
            path.display()
        );
        Ok(rules)
    }

    /// Parse rule file content.
    pub fn parse(content: &str) -> Self {
        let mut rules = Self::default();
        let normalized = content.replace("\r\n", "\n");

        for block in normalized.split("\n\n") {
            let mut required = Vec::new();
            let mut normal = Vec::new();

            for token in block.lines().map(str::trim).filter(|t| !t.is_empty()) {
                if let Some(word) = token.strip_prefix('!') {
                    if !word.is_empty() {
                        rules.filter_words.push(word.to_string());
                    }
                } else if let Some(word) = token.strip_prefix('+') {
                    if !word.is_empty() {
                        required.push(word.to_string());
                    }
                } else {
                    normal.push(token.to_string());
                }
            }

            if let Some(group) = KeywordGroup::new(required, normal) {
                rules.groups.push(group);
            }
        }
        rules
    }

    /// True when no groups are configured, i.e. everything passes through.
    pub fn is_pass_through(&self) -> bool {
        self.groups.is_empty()
    }
}
