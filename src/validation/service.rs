/*!
 * Quality checker that runs all validators on one translated string.
 *
 * The checker is pure: it never touches the provider or the memory. Each
 * violated rule yields one `QualityIssue` carrying the detailed messages;
 * the score is derived from the issue severities.
 */

use log::debug;
use serde::{Deserialize, Serialize};

use super::length::{
    LengthValidator, LengthValidatorConfig, DEFAULT_MAX_LENGTH_RATIO, DEFAULT_MIN_LENGTH_RATIO,
    DEFAULT_MIN_SOURCE_LENGTH_FOR_RATIO,
};
use super::markup::check_markup;
use super::placeholders::find_missing_placeholders;

/// Score of a translation with no issues
pub const MAX_QUALITY_SCORE: u32 = 100;

/// Points lost per high-severity issue
const HIGH_PENALTY: u32 = 10;

/// Points lost per informational issue
const INFO_PENALTY: u32 = 3;

/// Configuration for the quality checker
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QualityConfig {
    /// Check that placeholders survive translation
    #[serde(default = "default_true")]
    pub placeholder_check: bool,

    /// Check that markup tags stay balanced
    #[serde(default = "default_true")]
    pub markup_check: bool,

    /// Flag blank translations of non-blank sources
    #[serde(default = "default_true")]
    pub empty_check: bool,

    /// Flag suspicious length ratios
    #[serde(default = "default_true")]
    pub length_check: bool,

    /// Minimum acceptable length ratio
    #[serde(default = "default_min_ratio")]
    pub min_length_ratio: f64,

    /// Maximum acceptable length ratio
    #[serde(default = "default_max_ratio")]
    pub max_length_ratio: f64,

    /// Sources shorter than this many characters skip the ratio check
    #[serde(default = "default_min_source_length")]
    pub min_source_length_for_ratio: usize,
}

fn default_true() -> bool {
    true
}

fn default_min_ratio() -> f64 {
    DEFAULT_MIN_LENGTH_RATIO
}

fn default_max_ratio() -> f64 {
    DEFAULT_MAX_LENGTH_RATIO
}

fn default_min_source_length() -> usize {
    DEFAULT_MIN_SOURCE_LENGTH_FOR_RATIO
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            placeholder_check: true,
            markup_check: true,
            empty_check: true,
            length_check: true,
            min_length_ratio: default_min_ratio(),
            max_length_ratio: default_max_ratio(),
            min_source_length_for_ratio: default_min_source_length(),
        }
    }
}

/// Severity of a quality issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// The translation is likely broken in game
    High,
    /// Worth a look, usually fine
    Info,
}

/// Rule that produced an issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    MissingPlaceholder,
    MarkupImbalance,
    EmptyTranslation,
    LengthAnomaly,
}

impl IssueKind {
    /// Severity attached to this rule
    pub fn severity(&self) -> Severity {
        match self {
            IssueKind::LengthAnomaly => Severity::Info,
            _ => Severity::High,
        }
    }
}

impl std::fmt::Display for IssueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            IssueKind::MissingPlaceholder => "missing_placeholder",
            IssueKind::MarkupImbalance => "markup_imbalance",
            IssueKind::EmptyTranslation => "empty_translation",
            IssueKind::LengthAnomaly => "length_anomaly",
        };
        write!(f, "{}", name)
    }
}

/// One violated rule for a translated string
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityIssue {
    pub kind: IssueKind,
    pub source_text: String,
    /// Human readable details
    pub issues: Vec<String>,
    pub severity: Severity,
}

impl QualityIssue {
    /// Create an issue with the severity of its kind
    pub fn new(kind: IssueKind, source_text: &str, issues: Vec<String>) -> Self {
        Self {
            kind,
            source_text: source_text.to_string(),
            issues,
            severity: kind.severity(),
        }
    }
}

/// Quality checker for translated game strings
#[derive(Debug, Clone)]
pub struct QualityChecker {
    config: QualityConfig,
    length_validator: LengthValidator,
}

impl QualityChecker {
    /// Create a checker with default configuration
    pub fn new() -> Self {
        Self::with_config(QualityConfig::default())
    }

    /// Create a checker with custom configuration
    pub fn with_config(config: QualityConfig) -> Self {
        let length_validator = LengthValidator::with_config(LengthValidatorConfig {
            min_ratio: config.min_length_ratio,
            max_ratio: config.max_length_ratio,
            min_source_length_for_ratio: config.min_source_length_for_ratio,
        });

        Self {
            config,
            length_validator,
        }
    }

    /// Current configuration
    pub fn config(&self) -> &QualityConfig {
        &self.config
    }

    /// Run every enabled rule on a source/translation pair
    pub fn check(&self, source_text: &str, translated_text: &str) -> Vec<QualityIssue> {
        let mut issues = Vec::new();

        if self.config.placeholder_check {
            let missing = find_missing_placeholders(source_text, translated_text);
            if !missing.is_empty() {
                issues.push(QualityIssue::new(
                    IssueKind::MissingPlaceholder,
                    source_text,
                    missing.iter().map(ToString::to_string).collect(),
                ));
            }
        }

        if self.config.markup_check {
            let markup = check_markup(source_text, translated_text);
            if !markup.is_empty() {
                issues.push(QualityIssue::new(
                    IssueKind::MarkupImbalance,
                    source_text,
                    markup.iter().map(ToString::to_string).collect(),
                ));
            }
        }

        if self.config.empty_check {
            if let Some(issue) = self.length_validator.check_empty(source_text, translated_text) {
                issues.push(QualityIssue::new(
                    IssueKind::EmptyTranslation,
                    source_text,
                    vec![issue.to_string()],
                ));
            }
        }

        if self.config.length_check {
            if let Some(issue) = self.length_validator.check_ratio(source_text, translated_text) {
                issues.push(QualityIssue::new(
                    IssueKind::LengthAnomaly,
                    source_text,
                    vec![issue.to_string()],
                ));
            }
        }

        if !issues.is_empty() {
            debug!(
                "Quality check found {} issue(s): {}",
                issues.len(),
                issues.iter().map(|i| i.kind.to_string()).collect::<Vec<_>>().join(", ")
            );
        }

        issues
    }

    /// Score a list of issues: 100 minus 10 per high and 3 per info, floored at 0
    pub fn score(issues: &[QualityIssue]) -> u32 {
        let penalty: u32 = issues
            .iter()
            .map(|issue| match issue.severity {
                Severity::High => HIGH_PENALTY,
                Severity::Info => INFO_PENALTY,
            })
            .sum();
        MAX_QUALITY_SCORE.saturating_sub(penalty)
    }

    /// Check and score in one call
    pub fn assess(&self, source_text: &str, translated_text: &str) -> (Vec<QualityIssue>, u32) {
        let issues = self.check(source_text, translated_text);
        let score = Self::score(&issues);
        (issues, score)
    }
}

impl Default for QualityChecker {
    fn default() -> Self {
        Self::new()
    }
}
