/*!
 * Placeholder preservation check.
 *
 * Game strings carry format tokens the engine substitutes at runtime
 * (`%s`, `%1$s`, `{0}`, `{name}`, `$var`, `[TAG]`). A translation must keep
 * every token of the source, unmodified, at least as many times as the
 * source uses it.
 */

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;

/// Regex for the supported placeholder syntaxes
static PLACEHOLDER_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"%(?:[0-9]+\$)?[-+0#]*[0-9]*(?:\.[0-9]+)?[sdifuxXoScpeEgG@]",
        r"|\{[0-9]+(?:[:,][^{}]*)?\}",
        r"|\{[A-Za-z_][A-Za-z0-9_.]*\}",
        r"|\$[A-Za-z_][A-Za-z0-9_]*",
        r"|\[[A-Za-z_][A-Za-z0-9_/]*\]",
    ))
    .unwrap()
});

/// A placeholder the translation lost
#[derive(Debug, Clone, PartialEq)]
pub struct MissingPlaceholder {
    /// The token as written in the source
    pub token: String,
    /// Occurrences in the source
    pub expected: usize,
    /// Occurrences in the translation
    pub found: usize,
}

impl std::fmt::Display for MissingPlaceholder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.found == 0 {
            write!(f, "Placeholder '{}' is missing", self.token)
        } else {
            write!(
                f,
                "Placeholder '{}' appears {} time(s), expected {}",
                self.token, self.found, self.expected
            )
        }
    }
}

/// Extract placeholders in order of appearance
pub fn extract_placeholders(text: &str) -> Vec<&str> {
    PLACEHOLDER_REGEX.find_iter(text).map(|m| m.as_str()).collect()
}

fn count_placeholders(text: &str) -> BTreeMap<&str, usize> {
    let mut counts = BTreeMap::new();
    for token in extract_placeholders(text) {
        *counts.entry(token).or_insert(0) += 1;
    }
    counts
}

/// Placeholders of `source` that `translated` does not carry often enough
///
/// Extra placeholders in the translation are not reported.
pub fn find_missing_placeholders(source: &str, translated: &str) -> Vec<MissingPlaceholder> {
    let expected = count_placeholders(source);
    if expected.is_empty() {
        return Vec::new();
    }
    let found = count_placeholders(translated);

    expected
        .into_iter()
        .filter_map(|(token, expected)| {
            let found = found.get(token).copied().unwrap_or(0);
            (found < expected).then(|| MissingPlaceholder {
                token: token.to_string(),
                expected,
                found,
            })
        })
        .collect()
}
