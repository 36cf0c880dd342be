//! Prioritized filename classification rules.
//!
//! A [`RuleEngine`] holds rules sorted by descending priority. Classification
//! walks that order and the first matching rule wins, so a higher priority
//! always beats a lower one and equal priorities fall back to insertion order.
//!
//! Rules serialize to the same record shape used by the configuration file:
//!
//! ```toml
//! [[rules]]
//! name = "invoices"
//! rule_type = "keyword"
//! pattern = "invoice"
//! target_folder = "finance"
//! priority = 10
//! case_sensitive = false
//! ```

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::file_category::DEFAULT_CATEGORY;

/// How a rule's pattern is compared against a file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleKind {
    /// Pattern occurs anywhere in the file name.
    Keyword,
    /// Pattern is a regular expression searched within the file name.
    Regex,
    /// File name ends with the pattern (normally something like ".pdf").
    Extension,
}

impl RuleKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleKind::Keyword => "keyword",
            RuleKind::Regex => "regex",
            RuleKind::Extension => "extension",
        }
    }
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string does not name a [`RuleKind`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid rule type '{0}': expected keyword, regex or extension")]
pub struct ParseRuleKindError(pub String);

impl FromStr for RuleKind {
    type Err = ParseRuleKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "keyword" => Ok(RuleKind::Keyword),
            "regex" => Ok(RuleKind::Regex),
            "extension" => Ok(RuleKind::Extension),
            _ => Err(ParseRuleKindError(s.to_string())),
        }
    }
}

/// A named pattern-to-folder mapping.
///
/// This is also the persisted record: field names match the configuration
/// file, with `kind` stored as `rule_type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    pub name: String,
    #[serde(rename = "rule_type")]
    pub kind: RuleKind,
    pub pattern: String,
    pub target_folder: String,
    /// Higher values are evaluated first.
    #[serde(default)]
    pub priority: i64,
    #[serde(default)]
    pub case_sensitive: bool,
}

impl Rule {
    /// Creates a case-insensitive rule with priority 0.
    pub fn new(
        name: impl Into<String>,
        kind: RuleKind,
        pattern: impl Into<String>,
        target_folder: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            pattern: pattern.into(),
            target_folder: target_folder.into(),
            priority: 0,
            case_sensitive: false,
        }
    }

    pub fn with_priority(mut self, priority: i64) -> Self {
        self.priority = priority;
        self
    }

    pub fn case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    /// Checks whether `file_name` matches this rule.
    ///
    /// An invalid regex never matches anything.
    ///
    /// # Examples
    ///
    /// ```
    /// use taxon::rules::{Rule, RuleKind};
    ///
    /// let rule = Rule::new("pdfs", RuleKind::Extension, ".pdf", "documents");
    /// assert!(rule.matches("Report.PDF"));
    /// assert!(!rule.matches("report.pdf.txt"));
    ///
    /// let broken = Rule::new("broken", RuleKind::Regex, "[unclosed", "x");
    /// assert!(!broken.matches("[unclosed"));
    /// ```
    pub fn matches(&self, file_name: &str) -> bool {
        Matcher::compile(self).is_match(file_name)
    }
}

/// Pre-processed form of a rule's pattern.
#[derive(Debug, Clone)]
enum Matcher {
    Keyword { needle: String, fold: bool },
    Extension { suffix: String, fold: bool },
    /// `None` when the pattern failed to compile; such a rule is inert.
    Regex(Option<Regex>),
}

impl Matcher {
    /// Prepares a rule for matching.
    ///
    /// Keyword and extension patterns are lower-cased up front when the rule
    /// ignores case. Regex patterns are never lower-cased: case-insensitivity
    /// comes from the regex engine flag, so escapes such as `\D` or `\W`
    /// keep their meaning.
    fn compile(rule: &Rule) -> Self {
        let fold = !rule.case_sensitive;
        let folded = |pattern: &str| {
            if fold {
                pattern.to_lowercase()
            } else {
                pattern.to_string()
            }
        };

        match rule.kind {
            RuleKind::Keyword => Matcher::Keyword {
                needle: folded(&rule.pattern),
                fold,
            },
            RuleKind::Extension => Matcher::Extension {
                suffix: folded(&rule.pattern),
                fold,
            },
            RuleKind::Regex => {
                let compiled = RegexBuilder::new(&rule.pattern)
                    .case_insensitive(fold)
                    .build();
                if let Err(e) = &compiled {
                    tracing::debug!(rule = %rule.name, error = %e, "regex rule is inert");
                }
                Matcher::Regex(compiled.ok())
            }
        }
    }

    fn is_match(&self, file_name: &str) -> bool {
        match self {
            Matcher::Keyword { needle, fold } => {
                if *fold {
                    file_name.to_lowercase().contains(needle.as_str())
                } else {
                    file_name.contains(needle.as_str())
                }
            }
            Matcher::Extension { suffix, fold } => {
                if *fold {
                    file_name.to_lowercase().ends_with(suffix.as_str())
                } else {
                    file_name.ends_with(suffix.as_str())
                }
            }
            Matcher::Regex(Some(regex)) => regex.is_match(file_name),
            Matcher::Regex(None) => false,
        }
    }
}

#[derive(Debug, Clone)]
struct CompiledRule {
    rule: Rule,
    matcher: Matcher,
}

impl From<Rule> for CompiledRule {
    fn from(rule: Rule) -> Self {
        let matcher = Matcher::compile(&rule);
        Self { rule, matcher }
    }
}

/// Ordered rule set with first-match-wins classification.
///
/// # Examples
///
/// ```
/// use taxon::rules::{Rule, RuleEngine, RuleKind};
///
/// let mut engine = RuleEngine::new();
/// engine.add_rule(Rule::new("docs", RuleKind::Extension, ".pdf", "documents"));
/// engine.add_rule(Rule::new("tax", RuleKind::Keyword, "tax", "finance").with_priority(5));
///
/// assert_eq!(engine.target_folder("tax_2023.pdf", "others"), "finance");
/// assert_eq!(engine.target_folder("manual.pdf", "others"), "documents");
/// assert_eq!(engine.target_folder("song.mp3", "others"), "others");
/// ```
#[derive(Debug, Clone, Default)]
pub struct RuleEngine {
    rules: Vec<CompiledRule>,
}

impl RuleEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an engine from persisted records, sorting them by priority.
    pub fn from_records(records: impl IntoIterator<Item = Rule>) -> Self {
        let mut engine = Self::new();
        for rule in records {
            engine.add_rule(rule);
        }
        engine
    }

    /// Returns the rules in evaluation order, ready to be persisted.
    pub fn to_records(&self) -> Vec<Rule> {
        self.rules().cloned().collect()
    }

    /// Inserts a rule after every rule with the same or higher priority.
    pub fn add_rule(&mut self, rule: Rule) {
        let idx = self
            .rules
            .partition_point(|existing| existing.rule.priority >= rule.priority);
        self.rules.insert(idx, CompiledRule::from(rule));
    }

    /// Removes every rule called `name`. Returns `false` if none existed.
    pub fn remove_rule(&mut self, name: &str) -> bool {
        let before = self.rules.len();
        self.rules.retain(|entry| entry.rule.name != name);
        self.rules.len() < before
    }

    pub fn clear(&mut self) {
        self.rules.clear();
    }

    /// Rules in evaluation order.
    pub fn rules(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter().map(|entry| &entry.rule)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Returns the first rule, in evaluation order, that matches `file_name`.
    pub fn find_matching_rule(&self, file_name: &str) -> Option<&Rule> {
        self.rules
            .iter()
            .find(|entry| entry.matcher.is_match(file_name))
            .map(|entry| &entry.rule)
    }

    /// Returns the target folder of the matching rule, or `default_folder`.
    pub fn target_folder<'a>(&'a self, file_name: &str, default_folder: &'a str) -> &'a str {
        self.find_matching_rule(file_name)
            .map(|rule| rule.target_folder.as_str())
            .unwrap_or(default_folder)
    }

    /// Same as [`target_folder`](Self::target_folder) with the `"others"` default.
    pub fn classify(&self, file_name: &str) -> &str {
        self.target_folder(file_name, DEFAULT_CATEGORY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keyword(name: &str, pattern: &str, folder: &str, priority: i64) -> Rule {
        Rule::new(name, RuleKind::Keyword, pattern, folder).with_priority(priority)
    }

    #[test]
    fn test_higher_priority_wins_regardless_of_insertion_order() {
        let high = keyword("high", "report", "high", 5);
        let low = keyword("low", "report", "low", 3);

        let mut engine = RuleEngine::new();
        engine.add_rule(low.clone());
        engine.add_rule(high.clone());
        assert_eq!(engine.classify("report.txt"), "high");

        let mut engine = RuleEngine::new();
        engine.add_rule(high);
        engine.add_rule(low);
        assert_eq!(engine.classify("report.txt"), "high");
    }

    #[test]
    fn test_equal_priority_keeps_insertion_order() {
        let mut engine = RuleEngine::new();
        engine.add_rule(keyword("a", "report", "first", 1));
        engine.add_rule(keyword("b", "report", "second", 1));
        engine.add_rule(keyword("c", "other", "third", 7));

        assert_eq!(engine.classify("report.txt"), "first");
        let names: Vec<_> = engine.rules().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["c", "a", "b"]);
    }

    #[test]
    fn test_keyword_matching() {
        let rule = keyword("inv", "Invoice", "finance", 0);
        assert!(rule.matches("2024_invoice_acme.pdf"));
        assert!(rule.matches("INVOICE.pdf"));
        assert!(!rule.matches("receipt.pdf"));

        let strict = rule.case_sensitive(true);
        assert!(strict.matches("Invoice.pdf"));
        assert!(!strict.matches("invoice.pdf"));
    }

    #[test]
    fn test_extension_matching_does_not_add_dot() {
        let with_dot = Rule::new("pdf", RuleKind::Extension, ".pdf", "docs");
        assert!(with_dot.matches("a.PDF"));
        assert!(!with_dot.matches("apdf"));

        let without_dot = Rule::new("pdf", RuleKind::Extension, "pdf", "docs");
        assert!(without_dot.matches("apdf"));
    }

    #[test]
    fn test_regex_matching_searches_anywhere() {
        let rule = Rule::new("shots", RuleKind::Regex, r"screenshot \d{4}", "screens");
        assert!(rule.matches("Screenshot 2024-01-01.png"));
        assert!(!rule.matches("screenshot.png"));

        let strict = rule.clone().case_sensitive(true);
        assert!(!strict.matches("Screenshot 2024-01-01.png"));
        assert!(strict.matches("my screenshot 2024.png"));
    }

    #[test]
    fn test_case_insensitive_regex_keeps_escape_meaning() {
        let rule = Rule::new("nodigits", RuleKind::Regex, r"^\D+$", "letters");
        assert!(rule.matches("ABC"));
        assert!(!rule.matches("abc1"));

        let rule = Rule::new("oneword", RuleKind::Regex, r"^\S+$", "words");
        assert!(rule.matches("Report.PDF"));
        assert!(!rule.matches("annual report.pdf"));
    }

    #[test]
    fn test_invalid_regex_is_inert() {
        let mut engine = RuleEngine::new();
        engine.add_rule(Rule::new("bad", RuleKind::Regex, "(unclosed", "bad").with_priority(10));
        engine.add_rule(keyword("good", "unclosed", "good", 0));

        assert!(!engine.rules().next().unwrap().matches("(unclosed"));
        assert_eq!(engine.classify("(unclosed"), "good");
    }

    #[test]
    fn test_remove_rule() {
        let mut engine = RuleEngine::new();
        engine.add_rule(keyword("dup", "a", "x", 0));
        engine.add_rule(keyword("keep", "b", "y", 0));
        engine.add_rule(keyword("dup", "c", "z", 3));

        assert!(engine.remove_rule("dup"));
        assert_eq!(engine.len(), 1);
        assert!(!engine.remove_rule("dup"));
        assert!(!engine.remove_rule("missing"));
    }

    #[test]
    fn test_default_folder_when_nothing_matches() {
        let mut engine = RuleEngine::new();
        engine.add_rule(keyword("k", "zzz", "z", 0));
        assert_eq!(engine.classify("photo.jpg"), "others");
        assert_eq!(engine.target_folder("photo.jpg", "misc"), "misc");
        assert!(engine.find_matching_rule("photo.jpg").is_none());
    }

    #[test]
    fn test_records_round_trip() {
        let mut engine = RuleEngine::new();
        engine.add_rule(keyword("a", "x", "fa", 1));
        engine.add_rule(Rule::new("b", RuleKind::Regex, "^y", "fb").case_sensitive(true));
        engine.add_rule(Rule::new("c", RuleKind::Extension, ".z", "fc").with_priority(9));

        let records = engine.to_records();
        let rebuilt = RuleEngine::from_records(records.clone());
        assert_eq!(rebuilt.to_records(), records);
    }

    #[test]
    fn test_from_records_sorts_stably() {
        let engine = RuleEngine::from_records(vec![
            keyword("low", "a", "1", 0),
            keyword("high", "a", "2", 4),
            keyword("low2", "a", "3", 0),
        ]);
        let names: Vec<_> = engine.rules().map(|r| r.name.clone()).collect();
        assert_eq!(names, vec!["high", "low", "low2"]);
    }

    #[test]
    fn test_record_serialization_field_names() {
        let rule = Rule::new("pics", RuleKind::Extension, ".png", "images").with_priority(2);
        let json = serde_json::to_value(&rule).unwrap();
        assert_eq!(json["rule_type"], "extension");
        assert_eq!(json["target_folder"], "images");
        assert_eq!(json["priority"], 2);
        assert_eq!(json["case_sensitive"], false);

        let parsed: Rule = serde_json::from_str(
            r#"{"name":"n","rule_type":"keyword","pattern":"p","target_folder":"f"}"#,
        )
        .unwrap();
        assert_eq!(parsed.priority, 0);
        assert!(!parsed.case_sensitive);
    }

    #[test]
    fn test_rule_kind_from_str() {
        assert_eq!("Regex".parse::<RuleKind>(), Ok(RuleKind::Regex));
        assert!("glob".parse::<RuleKind>().is_err());
    }
}
