// 🏷️ Analytical Rules - Rules as Data
// Keyword rules that map a free-text description to an analytical account (cost center)

use anyhow::{bail, Context as AnyhowContext, Result};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Account returned when the description is missing or empty.
pub const EMPTY_INPUT_ACCOUNT: &str = "General";

/// Account returned when no rule matches a non-empty description.
pub const NO_MATCH_ACCOUNT: &str = "Uncategorized";

/// Default furniture-business rule table, in evaluation order.
const DEFAULT_RULES: &[(&[&str], &str)] = &[
    (&["wood", "timber", "plywood", "teak", "oak"], "Production"),
    (
        &["expo", "fair", "advertisement", "social", "marketing", "instagram"],
        "Marketing",
    ),
    (&["delivery", "fuel", "truck", "shipping", "freight"], "Logistics"),
    (&["office", "stationary", "rent", "electricity"], "Administrative"),
];

static DEFAULT_RULE_SET: Lazy<RuleSet> = Lazy::new(RuleSet::default);

/// Fold case so that `s`, `s.to_uppercase()` and `s.to_lowercase()` normalize alike.
///
/// Plain `to_lowercase` leaves characters such as 'ſ' or 'ı' untouched even
/// though their uppercase forms lowercase to ASCII 's' and 'i'.
pub fn fold_case(text: &str) -> String {
    text.to_uppercase().to_lowercase()
}

// ============================================================================
// RULE DEFINITION
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    /// Lowercase keywords; any one of them appearing in the description matches
    pub keywords: Vec<String>,

    /// Analytical account assigned on match (e.g. "Production")
    pub account: String,
}

impl Rule {
    /// Build a rule, case-folding keywords and dropping duplicates.
    ///
    /// Fails when the account is blank, when there are no keywords, or when
    /// a keyword is empty (an empty keyword would match every description).
    pub fn new<I, S>(keywords: I, account: impl Into<String>) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let account: String = account.into();
        let account = account.trim().to_string();
        if account.is_empty() {
            bail!("Rule account name must not be empty");
        }

        let mut normalized: Vec<String> = Vec::new();
        for keyword in keywords {
            let keyword = fold_case(keyword.as_ref().trim());
            if keyword.is_empty() {
                bail!("Rule for account '{}' has an empty keyword", account);
            }
            if !normalized.contains(&keyword) {
                normalized.push(keyword);
            }
        }

        if normalized.is_empty() {
            bail!("Rule for account '{}' has no keywords", account);
        }

        Ok(Rule {
            keywords: normalized,
            account,
        })
    }

    /// Check if the rule matches the given text (case-insensitive substring)
    pub fn matches(&self, text: &str) -> bool {
        self.matched_keyword(&fold_case(text)).is_some()
    }

    /// First keyword contained in an already case-folded text
    fn matched_keyword(&self, normalized: &str) -> Option<&str> {
        self.keywords
            .iter()
            .find(|keyword| normalized.contains(keyword.as_str()))
            .map(String::as_str)
    }
}

// ============================================================================
// CLASSIFICATION RESULT
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchOutcome {
    /// A rule matched
    Matched,
    /// Description was missing or empty
    EmptyInput,
    /// Description was scanned against every rule without a hit
    NoMatch,
}

/// Full classification, including which rule and keyword produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Classification<'a> {
    pub account: &'a str,
    pub outcome: MatchOutcome,
    /// Position of the matching rule in declaration order
    pub rule_index: Option<usize>,
    pub keyword: Option<&'a str>,
}

impl Classification<'_> {
    fn fallback(outcome: MatchOutcome) -> Self {
        let account = match outcome {
            MatchOutcome::EmptyInput => EMPTY_INPUT_ACCOUNT,
            _ => NO_MATCH_ACCOUNT,
        };
        Classification {
            account,
            outcome,
            rule_index: None,
            keyword: None,
        }
    }

    pub fn is_match(&self) -> bool {
        self.outcome == MatchOutcome::Matched
    }
}

// ============================================================================
// RULE SET
// ============================================================================

/// Ordered, immutable rule table. The first matching rule wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    /// Create a rule set from rules in evaluation order.
    ///
    /// Rules are re-validated so that hand-built or deserialized rules obey
    /// the same normalization as [`Rule::new`].
    pub fn new(rules: Vec<Rule>) -> Result<Self> {
        let mut validated = Vec::with_capacity(rules.len());
        for (index, rule) in rules.into_iter().enumerate() {
            let rule = Rule::new(&rule.keywords, rule.account)
                .with_context(|| format!("Invalid rule at position {}", index + 1))?;
            validated.push(rule);
        }

        if validated.is_empty() {
            tracing::warn!("rule set is empty; every description will be '{}'", NO_MATCH_ACCOUNT);
        }

        Ok(RuleSet { rules: validated })
    }

    /// Load rules from a JSON file: `[{"keywords": [...], "account": "..."}, ...]`
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read rules file: {:?}", path.as_ref()))?;

        let rule_set = RuleSet::from_json(&content)
            .with_context(|| format!("Failed to load rules from {:?}", path.as_ref()))?;

        tracing::info!(
            path = %path.as_ref().display(),
            rules = rule_set.rule_count(),
            "loaded analytical rules"
        );
        Ok(rule_set)
    }

    /// Parse rules from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        let rules: Vec<Rule> = serde_json::from_str(json).context("Failed to parse rules JSON")?;
        RuleSet::new(rules)
    }

    /// The process-wide default table
    pub fn builtin() -> &'static RuleSet {
        &DEFAULT_RULE_SET
    }

    /// Map a description to an account name
    pub fn classify(&self, description: Option<&str>) -> &str {
        self.classify_detailed(description).account
    }

    /// Same as [`RuleSet::classify`] but also reports the matching rule and keyword
    pub fn classify_detailed(&self, description: Option<&str>) -> Classification<'_> {
        let text = match description {
            Some(text) if !text.is_empty() => text,
            _ => return Classification::fallback(MatchOutcome::EmptyInput),
        };

        let normalized = fold_case(text);
        for (index, rule) in self.rules.iter().enumerate() {
            if let Some(keyword) = rule.matched_keyword(&normalized) {
                return Classification {
                    account: &rule.account,
                    outcome: MatchOutcome::Matched,
                    rule_index: Some(index),
                    keyword: Some(keyword),
                };
            }
        }

        Classification::fallback(MatchOutcome::NoMatch)
    }

    /// Distinct account names in declaration order
    pub fn accounts(&self) -> Vec<&str> {
        let mut accounts: Vec<&str> = Vec::new();
        for rule in &self.rules {
            if !accounts.contains(&rule.account.as_str()) {
                accounts.push(&rule.account);
            }
        }
        accounts
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Get number of rules loaded
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }
}

impl Default for RuleSet {
    fn default() -> Self {
        let rules = DEFAULT_RULES
            .iter()
            .map(|(keywords, account)| Rule {
                keywords: keywords.iter().map(|k| k.to_string()).collect(),
                account: account.to_string(),
            })
            .collect();
        RuleSet { rules }
    }
}

/// Classify against the built-in table
pub fn classify(description: Option<&str>) -> &'static str {
    DEFAULT_RULE_SET.classify(description)
}

// ============================================================================
// TESTS
// ============================================================================
