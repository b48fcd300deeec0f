/*!
 * Length checks for translated strings.
 *
 * A blank translation of a non-blank source is always a problem. Beyond
 * that, translations whose length ratio falls outside a band are flagged as
 * suspicious; very short sources are exempt since UI labels vary a lot.
 */

/// Default minimum length ratio (translation / source)
pub const DEFAULT_MIN_LENGTH_RATIO: f64 = 0.3;

/// Default maximum length ratio (translation / source)
pub const DEFAULT_MAX_LENGTH_RATIO: f64 = 3.0;

/// Sources shorter than this (in chars) skip the ratio check
pub const DEFAULT_MIN_SOURCE_LENGTH_FOR_RATIO: usize = 10;

/// Types of length issues
#[derive(Debug, Clone, PartialEq)]
pub enum LengthIssue {
    /// Translation is blank while the source is not
    EmptyTranslation,
    /// Translation is too short relative to source
    TranslationTooShort {
        ratio: f64,
        min_ratio: f64,
        source_len: usize,
        translated_len: usize,
    },
    /// Translation is too long relative to source
    TranslationTooLong {
        ratio: f64,
        max_ratio: f64,
        source_len: usize,
        translated_len: usize,
    },
}

impl std::fmt::Display for LengthIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LengthIssue::EmptyTranslation => write!(f, "Translation is empty"),
            LengthIssue::TranslationTooShort {
                ratio,
                min_ratio,
                source_len,
                translated_len,
            } => write!(
                f,
                "Translation too short: ratio {:.2} < {:.2} ({} -> {} chars)",
                ratio, min_ratio, source_len, translated_len
            ),
            LengthIssue::TranslationTooLong {
                ratio,
                max_ratio,
                source_len,
                translated_len,
            } => write!(
                f,
                "Translation too long: ratio {:.2} > {:.2} ({} -> {} chars)",
                ratio, max_ratio, source_len, translated_len
            ),
        }
    }
}

/// Configuration for length checks
#[derive(Debug, Clone)]
pub struct LengthValidatorConfig {
    pub min_ratio: f64,
    pub max_ratio: f64,
    pub min_source_length_for_ratio: usize,
}

impl Default for LengthValidatorConfig {
    fn default() -> Self {
        Self {
            min_ratio: DEFAULT_MIN_LENGTH_RATIO,
            max_ratio: DEFAULT_MAX_LENGTH_RATIO,
            min_source_length_for_ratio: DEFAULT_MIN_SOURCE_LENGTH_FOR_RATIO,
        }
    }
}

/// Length validator for a source/translation pair
#[derive(Debug, Clone, Default)]
pub struct LengthValidator {
    config: LengthValidatorConfig,
}

impl LengthValidator {
    /// Create a new validator with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new validator with custom configuration
    pub fn with_config(config: LengthValidatorConfig) -> Self {
        Self { config }
    }

    /// Length ratio of translated to source text, in chars
    pub fn calculate_ratio(source: &str, translated: &str) -> f64 {
        let source_len = source.chars().count();
        let translated_len = translated.chars().count();

        match (source_len, translated_len) {
            (0, 0) => 1.0,
            (0, _) => f64::INFINITY,
            _ => translated_len as f64 / source_len as f64,
        }
    }

    /// Blank-translation check only
    pub fn check_empty(&self, source: &str, translated: &str) -> Option<LengthIssue> {
        (!source.trim().is_empty() && translated.trim().is_empty()).then_some(LengthIssue::EmptyTranslation)
    }

    /// Ratio-band check; blank strings and short sources are skipped
    pub fn check_ratio(&self, source: &str, translated: &str) -> Option<LengthIssue> {
        let source = source.trim();
        let translated = translated.trim();
        let source_len = source.chars().count();
        let translated_len = translated.chars().count();

        if translated_len == 0 || source_len < self.config.min_source_length_for_ratio {
            return None;
        }

        let ratio = Self::calculate_ratio(source, translated);
        if ratio < self.config.min_ratio {
            Some(LengthIssue::TranslationTooShort {
                ratio,
                min_ratio: self.config.min_ratio,
                source_len,
                translated_len,
            })
        } else if ratio > self.config.max_ratio {
            Some(LengthIssue::TranslationTooLong {
                ratio,
                max_ratio: self.config.max_ratio,
                source_len,
                translated_len,
            })
        } else {
            None
        }
    }
}
