//! Keyword classification of titles.

use crate::models::{KeywordGroup, KeywordRules};

/// Outcome of classifying one title.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// No groups are configured; every title is kept
    PassThrough,
    /// Index of the first matching group
    Group(usize),
    /// A global filter word occurred in the title
    Filtered,
    /// No group matched
    Unmatched,
}

impl Classification {
    /// True if the title is kept in the report.
    pub fn is_match(self) -> bool {
        matches!(self, Self::PassThrough | Self::Group(_))
    }
}

#[derive(Debug, Clone)]
struct LoweredGroup {
    required: Vec<String>,
    normal: Vec<String>,
}

impl LoweredGroup {
    fn from_group(group: &KeywordGroup) -> Self {
        Self {
            required: group.required_words.iter().map(|w| w.to_lowercase()).collect(),
            normal: group.normal_words.iter().map(|w| w.to_lowercase()).collect(),
        }
    }

    fn matches(&self, title: &str) -> bool {
        let required_ok = self.required.iter().all(|w| title.contains(w.as_str()));
        let normal_ok =
            self.normal.is_empty() || self.normal.iter().any(|w| title.contains(w.as_str()));
        required_ok && normal_ok
    }
}

/// Case-insensitive, first-match-wins keyword matcher.
#[derive(Debug, Clone)]
pub struct Matcher {
    groups: Vec<LoweredGroup>,
    filter_words: Vec<String>,
}

impl Matcher {
    pub fn new(rules: &KeywordRules) -> Self {
        Self {
            groups: rules.groups.iter().map(LoweredGroup::from_group).collect(),
            filter_words: rules.filter_words.iter().map(|w| w.to_lowercase()).collect(),
        }
    }

    pub fn is_pass_through(&self) -> bool {
        self.groups.is_empty()
    }

    /// Classify a title against the rules.
    pub fn classify(&self, title: &str) -> Classification {
        if self.groups.is_empty() {
            return Classification::PassThrough;
        }

        let lowered = title.to_lowercase();
        if self
            .filter_words
            .iter()
            .any(|w| lowered.contains(w.as_str()))
        {
            return Classification::Filtered;
        }

        self.groups
            .iter()
            .position(|g| g.matches(&lowered))
            .map_or(Classification::Unmatched, Classification::Group)
    }

    pub fn matches(&self, title: &str) -> bool {
        self.classify(title).is_match()
    }
}

/// Check a single title against a rule set.
pub fn matches(title: &str, rules: &KeywordRules) -> bool {
    Matcher::new(rules).matches(title)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules(content: &str) -> KeywordRules {
        KeywordRules::parse(content)
    }

    #[test]
    fn test_required_word() {
        let r = rules("+AI\n");
        assert!(matches("AI breakthrough", &r));
        assert!(!matches("ML breakthrough", &r));
    }

    #[test]
    fn test_filter_word_any_case() {
        let r = rules("+AI\n\n!spam\n");
        assert!(!matches("AI SPAM offer", &r));
        assert!(!matches("ai Spam", &r));
        assert_eq!(Matcher::new(&r).classify("AI Spam"), Classification::Filtered);
    }

    #[test]
    fn test_pass_through_ignores_filters() {
        let r = rules("!spam\n");
        let matcher = Matcher::new(&r);
        assert!(matcher.is_pass_through());
        assert_eq!(matcher.classify("spam spam"), Classification::PassThrough);
    }

    #[test]
    fn test_first_match_wins() {
        let r = rules("apple\n\napple\nphone\n");
        let matcher = Matcher::new(&r);
        assert_eq!(matcher.classify("New Apple phone"), Classification::Group(0));
        assert_eq!(matcher.classify("A phone"), Classification::Group(1));
        assert_eq!(matcher.classify("Bananas"), Classification::Unmatched);
    }

    #[test]
    fn test_required_and_normal_combined() {
        let r = rules("+Tesla\nrecall\nprice\n");
        let matcher = Matcher::new(&r);
        assert!(matcher.matches("Tesla price cut"));
        assert!(!matcher.matches("Tesla opens factory"));
        assert!(!matcher.matches("Toyota recall"));
    }
}
