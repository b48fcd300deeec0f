/*!
 * Markup balance check.
 *
 * Game text often embeds HTML-like rich text (`<b>`, `<color=#ff0000>`,
 * `<i>`). A translation must keep the opening and closing tags of each
 * tag name in the same balance as the source. Self-closing tags such as
 * `<br/>` are ignored.
 */

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;

/// Opening or self-closing tag: `<b>`, `<color=red>`, `<size=20>`, `<br/>`
static OPEN_TAG_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<([A-Za-z][A-Za-z0-9_-]*)(?:[\s=][^<>]*)?>").unwrap());

/// Closing tag: `</b>`, `</color>`
static CLOSE_TAG_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"</([A-Za-z][A-Za-z0-9_-]*)\s*>").unwrap());

/// Opening and closing counts of one tag name
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TagCounts {
    pub open: usize,
    pub close: usize,
}

impl TagCounts {
    fn balance(&self) -> i64 {
        self.open as i64 - self.close as i64
    }
}

/// Markup problem found in a translation
#[derive(Debug, Clone, PartialEq)]
pub enum MarkupIssue {
    /// Opening and closing tags do not pair up the way they do in the source
    Unbalanced {
        tag: String,
        source: TagCounts,
        translated: TagCounts,
    },
    /// Tag used a different number of times than in the source
    CountMismatch {
        tag: String,
        source: TagCounts,
        translated: TagCounts,
    },
}

impl std::fmt::Display for MarkupIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MarkupIssue::Unbalanced { tag, translated, .. } => write!(
                f,
                "Tag <{}> is unbalanced: {} opening, {} closing",
                tag, translated.open, translated.close
            ),
            MarkupIssue::CountMismatch { tag, source, translated } => write!(
                f,
                "Tag <{}> appears {} time(s) in the source but {} in the translation",
                tag, source.open, translated.open
            ),
        }
    }
}

/// Count opening and closing tags per lowercase tag name
pub fn count_tags(text: &str) -> BTreeMap<String, TagCounts> {
    let mut counts: BTreeMap<String, TagCounts> = BTreeMap::new();

    for caps in OPEN_TAG_REGEX.captures_iter(text) {
        if caps[0].ends_with("/>") {
            continue;
        }
        counts.entry(caps[1].to_lowercase()).or_default().open += 1;
    }
    for caps in CLOSE_TAG_REGEX.captures_iter(text) {
        counts.entry(caps[1].to_lowercase()).or_default().close += 1;
    }

    counts
}

/// Compare the tag structure of a translation against its source
pub fn check_markup(source: &str, translated: &str) -> Vec<MarkupIssue> {
    let source_counts = count_tags(source);
    let translated_counts = count_tags(translated);
    if source_counts.is_empty() && translated_counts.is_empty() {
        return Vec::new();
    }

    let mut tags: Vec<&String> = source_counts.keys().chain(translated_counts.keys()).collect();
    tags.sort();
    tags.dedup();

    let mut issues = Vec::new();
    for tag in tags {
        let source = source_counts.get(tag).copied().unwrap_or_default();
        let translated = translated_counts.get(tag).copied().unwrap_or_default();

        if translated.balance() != source.balance() {
            issues.push(MarkupIssue::Unbalanced {
                tag: tag.clone(),
                source,
                translated,
            });
        } else if translated.open != source.open {
            issues.push(MarkupIssue::CountMismatch {
                tag: tag.clone(),
                source,
                translated,
            });
        }
    }

    issues
}
