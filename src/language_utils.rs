/*!
 * Language utilities for ISO language code handling.
 *
 * Game string tables name their languages with ISO 639-1 codes, ISO 639-2
 * codes or locale tags such as `pt-BR` / `zh_Hans`. These helpers validate
 * and normalize those codes and classify languages by script family, which
 * the provider recommender uses.
 */

use anyhow::{Result, anyhow};
use isolang::Language;
use serde::{Deserialize, Serialize};

/// Language code type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LanguageCodeType {
    /// ISO 639-1 (2-letter) code
    Part1,
    /// ISO 639-2/T (3-letter) code
    Part2T,
    /// ISO 639-2/B (3-letter) code
    Part2B,
}

/// Script family of a target language
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LanguageClass {
    /// Latin, Cyrillic and Greek alphabets
    Latin,
    /// Chinese, Japanese and Korean
    Cjk,
    /// Right-to-left scripts
    Rtl,
    /// Everything else (Indic, Thai, ...)
    Other,
}

// ISO 639-2/B codes that differ from their 639-2/T form
const BIBLIOGRAPHIC_CODES: [(&str, &str); 18] = [
    ("fre", "fra"),
    ("ger", "deu"),
    ("dut", "nld"),
    ("gre", "ell"),
    ("chi", "zho"),
    ("cze", "ces"),
    ("ice", "isl"),
    ("alb", "sqi"),
    ("arm", "hye"),
    ("baq", "eus"),
    ("bur", "mya"),
    ("per", "fas"),
    ("geo", "kat"),
    ("may", "msa"),
    ("mac", "mkd"),
    ("rum", "ron"),
    ("slo", "slk"),
    ("wel", "cym"),
];

fn bibliographic_to_terminology(code: &str) -> Option<&'static str> {
    BIBLIOGRAPHIC_CODES
        .iter()
        .find(|(b, _)| *b == code)
        .map(|(_, t)| *t)
}

/// Strip a region or script suffix (`pt-BR`, `zh_Hans`) and lowercase
fn base_code(code: &str) -> String {
    code.trim()
        .split(['-', '_'])
        .next()
        .unwrap_or_default()
        .to_lowercase()
}

/// Validate if a language code is a valid ISO 639-1 or ISO 639-2 code
pub fn validate_language_code(code: &str) -> Result<LanguageCodeType> {
    let normalized_code = base_code(code);

    match normalized_code.len() {
        2 if Language::from_639_1(&normalized_code).is_some() => Ok(LanguageCodeType::Part1),
        3 if Language::from_639_3(&normalized_code).is_some() => Ok(LanguageCodeType::Part2T),
        3 if bibliographic_to_terminology(&normalized_code).is_some() => Ok(LanguageCodeType::Part2B),
        _ => Err(anyhow!("Invalid language code: {}", code)),
    }
}

/// Normalize a language code to ISO 639-2/T (3-letter) format
pub fn normalize_to_part2t(code: &str) -> Result<String> {
    let normalized_code = base_code(code);

    match normalized_code.len() {
        2 => Language::from_639_1(&normalized_code).map(|lang| lang.to_639_3().to_string()),
        3 => {
            if Language::from_639_3(&normalized_code).is_some() {
                Some(normalized_code.clone())
            } else {
                bibliographic_to_terminology(&normalized_code).map(str::to_string)
            }
        }
        _ => None,
    }
    .ok_or_else(|| anyhow!("Cannot normalize invalid language code: {}", code))
}

/// Check if two language codes match (represent the same language)
pub fn language_codes_match(code1: &str, code2: &str) -> bool {
    match (normalize_to_part2t(code1), normalize_to_part2t(code2)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Get the language name from a code
pub fn get_language_name(code: &str) -> Result<String> {
    let normalized = normalize_to_part2t(code)?;
    let lang = Language::from_639_3(&normalized)
        .ok_or_else(|| anyhow!("Failed to get language from code: {}", normalized))?;

    Ok(lang.to_name().to_string())
}

/// Language name for prompts, falling back to the raw code when unknown
pub fn display_language(code: &str) -> String {
    get_language_name(code).unwrap_or_else(|_| code.trim().to_string())
}

/// Classify a language code by script family
///
/// Unknown codes are classified as `Other`.
pub fn language_class(code: &str) -> LanguageClass {
    let Ok(part2t) = normalize_to_part2t(code) else {
        return LanguageClass::Other;
    };

    match part2t.as_str() {
        "zho" | "jpn" | "kor" | "yue" => LanguageClass::Cjk,
        "ara" | "heb" | "fas" | "urd" | "yid" | "pus" | "snd" | "uig" | "div" => LanguageClass::Rtl,
        "hin" | "ben" | "tha" | "tam" | "tel" | "kan" | "mal" | "mar" | "guj" | "pan" | "sin"
        | "mya" | "khm" | "lao" | "kat" | "hye" | "amh" | "nep" | "ori" | "bod" => {
            LanguageClass::Other
        }
        _ => LanguageClass::Latin,
    }
}
