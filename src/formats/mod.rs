/*!
 * String file formats.
 *
 * The engine only needs two operations from a format: extract the
 * translatable units from raw content, and write translations back into the
 * original content. One reference format ships with the crate:
 *
 * - `json`: flat or nested JSON objects mapping keys to strings
 */

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use crate::errors::FormatError;
use crate::translation::models::StringUnit;

pub mod json;

pub use json::JsonStrings;

/// Known string file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StringFormat {
    Json,
}

impl StringFormat {
    /// Detect the format from a file name's extension
    pub fn from_filename(filename: &str) -> Option<Self> {
        let extension = Path::new(filename).extension()?.to_str()?.to_lowercase();
        match extension.as_str() {
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

impl fmt::Display for StringFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json => write!(f, "json"),
        }
    }
}

/// Units extracted from one file
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedFile {
    pub format: StringFormat,
    pub strings: Vec<StringUnit>,
}

/// Extracts translatable units from raw file content
pub trait StringParser {
    fn parse(&self, raw: &str, filename: &str) -> Result<ParsedFile, FormatError>;
}

/// Writes translations back into the original content
///
/// `translations` maps unit IDs to translated text; units without an entry
/// keep their source text.
pub trait StringSerializer {
    fn serialize(&self, original: &str, translations: &HashMap<String, String>) -> Result<String, FormatError>;
}

/// Parse `raw` with the format matching `filename`
pub fn parse_file(raw: &str, filename: &str) -> Result<ParsedFile, FormatError> {
    match StringFormat::from_filename(filename) {
        Some(StringFormat::Json) => JsonStrings.parse(raw, filename),
        None => Err(FormatError::ParseFailure {
            file: filename.to_string(),
            reason: "unsupported file extension".to_string(),
        }),
    }
}

/// Serialize translations back into `original` in the given format
pub fn serialize_file(
    format: StringFormat,
    original: &str,
    translations: &HashMap<String, String>,
) -> Result<String, FormatError> {
    match format {
        StringFormat::Json => JsonStrings.serialize(original, translations),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fromFilename_shouldMatchExtensionCaseInsensitively() {
        assert_eq!(StringFormat::from_filename("lang/en.JSON"), Some(StringFormat::Json));
        assert_eq!(StringFormat::from_filename("dialogue.csv"), None);
        assert_eq!(StringFormat::from_filename("README"), None);
    }

    #[test]
    fn test_parseFile_withUnknownExtension_shouldReportFile() {
        let err = parse_file("a,b", "strings.csv").unwrap_err();
        assert!(err.to_string().contains("strings.csv"));
    }
}
