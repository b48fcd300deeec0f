/*!
 * TMX 1.4 exchange.
 *
 * Export writes one `<tu>` per memory entry with the provider, game context
 * and game ID kept as `x-` properties. Import reads the units matching a
 * language pair; imported entries are marked verified.
 */

use anyhow::{anyhow, Result};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::fmt::Write as _;

use super::TranslationMemoryEntry;

/// Provider recorded for imported units
pub const TMX_PROVIDER: &str = "tmx";

static TU_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<tu\b([^>]*)>(.*?)</tu>").unwrap());

static TUV_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)<tuv\b[^>]*?\b(?:xml:)?lang\s*=\s*"([^"]+)"[^>]*>.*?<seg>(.*?)</seg>"#).unwrap()
});

static PROP_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?s)<prop\s+type\s*=\s*"([^"]+)"\s*>(.*?)</prop>"#).unwrap());

static ATTR_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r#"([A-Za-z_:-]+)\s*=\s*"([^"]*)""#).unwrap());

static NUMERIC_ENTITY: Lazy<Regex> = Lazy::new(|| Regex::new(r"&#(x[0-9A-Fa-f]+|[0-9]+);").unwrap());

// Inline markup such as <bpt>, <ept> or <ph> inside a segment
static INLINE_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<(bpt|ept|ph|it|hi|ut)\b[^>]*>.*?</(bpt|ept|ph|it|hi|ut)>|<(ph|it|ut)\b[^>]*/>").unwrap());

/// Escape text for XML content and attribute values
pub fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Reverse of `escape_xml`, also decoding numeric references
pub fn unescape_xml(text: &str) -> String {
    let decoded = NUMERIC_ENTITY.replace_all(text, |caps: &Captures| {
        let raw = &caps[1];
        let code = match raw.strip_prefix('x') {
            Some(hex) => u32::from_str_radix(hex, 16).ok(),
            None => raw.parse::<u32>().ok(),
        };
        code.and_then(char::from_u32)
            .map(|c| c.to_string())
            .unwrap_or_else(|| caps[0].to_string())
    });

    decoded
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

fn same_language(tmx_lang: &str, code: &str) -> bool {
    let base = |c: &str| {
        c.trim()
            .split(['-', '_'])
            .next()
            .unwrap_or_default()
            .to_lowercase()
    };
    base(tmx_lang) == base(code) || crate::language_utils::language_codes_match(&base(tmx_lang), &base(code))
}

/// Render entries as a TMX 1.4 document
pub fn export_tmx(entries: &[TranslationMemoryEntry], source_language: &str, target_language: &str) -> String {
    let mut out = String::new();
    out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    out.push_str("<tmx version=\"1.4\">\n");
    let _ = writeln!(
        out,
        "  <header creationtool=\"{}\" creationtoolversion=\"{}\" segtype=\"sentence\" o-tmf=\"{}\" adminlang=\"en\" srclang=\"{}\" datatype=\"plaintext\"/>",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        env!("CARGO_PKG_NAME"),
        escape_xml(source_language)
    );
    out.push_str("  <body>\n");

    for entry in entries {
        let _ = writeln!(
            out,
            "    <tu creationdate=\"{}\" lastusagedate=\"{}\" usagecount=\"{}\">",
            escape_xml(&entry.created_at),
            escape_xml(&entry.last_used_at),
            entry.usage_count
        );
        let _ = writeln!(out, "      <prop type=\"x-provider\">{}</prop>", escape_xml(&entry.provider));
        if let Some(context) = &entry.game_context {
            let _ = writeln!(out, "      <prop type=\"x-game-context\">{}</prop>", escape_xml(context));
        }
        if let Some(game_id) = &entry.game_id {
            let _ = writeln!(out, "      <prop type=\"x-game-id\">{}</prop>", escape_xml(game_id));
        }
        let _ = writeln!(
            out,
            "      <tuv xml:lang=\"{}\"><seg>{}</seg></tuv>",
            escape_xml(source_language),
            escape_xml(&entry.source_text)
        );
        let _ = writeln!(
            out,
            "      <tuv xml:lang=\"{}\"><seg>{}</seg></tuv>",
            escape_xml(target_language),
            escape_xml(&entry.translated_text)
        );
        out.push_str("    </tu>\n");
    }

    out.push_str("  </body>\n</tmx>\n");
    out
}

/// Read the units of a TMX document that cover the language pair
///
/// Units missing either language are skipped. Imported entries are verified
/// and start with a usage count of zero.
pub fn parse_tmx(content: &str, source_language: &str, target_language: &str) -> Result<Vec<TranslationMemoryEntry>> {
    if !content.contains("<tmx") {
        return Err(anyhow!("Not a TMX document: missing <tmx> root element"));
    }

    let mut entries = Vec::new();

    for tu in TU_REGEX.captures_iter(content) {
        let attributes = &tu[1];
        let body = &tu[2];

        let mut source = None;
        let mut target = None;
        for tuv in TUV_REGEX.captures_iter(body) {
            let segment = unescape_xml(&INLINE_TAG.replace_all(&tuv[2], ""));
            if source.is_none() && same_language(&tuv[1], source_language) {
                source = Some(segment);
            } else if target.is_none() && same_language(&tuv[1], target_language) {
                target = Some(segment);
            }
        }

        let (Some(source), Some(target)) = (source, target) else {
            continue;
        };
        if source.trim().is_empty() || target.trim().is_empty() {
            continue;
        }

        let mut game_context = None;
        let mut game_id = None;
        for prop in PROP_REGEX.captures_iter(body) {
            match &prop[1] {
                "x-game-context" => game_context = Some(unescape_xml(&prop[2])),
                "x-game-id" => game_id = Some(unescape_xml(&prop[2])),
                _ => {}
            }
        }

        let mut entry = TranslationMemoryEntry::new(&source, source_language, target_language, target, TMX_PROVIDER)
            .with_game_context(game_context.as_deref())
            .with_game_id(game_id.as_deref())
            .with_verified(true);
        entry.usage_count = 0;

        for attr in ATTR_REGEX.captures_iter(attributes) {
            if &attr[1] == "creationdate" && !attr[2].is_empty() {
                entry.created_at = unescape_xml(&attr[2]);
            }
        }

        entries.push(entry);
    }

    Ok(entries)
}
