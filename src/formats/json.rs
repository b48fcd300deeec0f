/*!
 * JSON string tables.
 *
 * Accepts a root object whose leaves are strings, either flat
 * (`{"menu.start": "Start"}`) or nested (`{"menu": {"start": "Start"}}`).
 * Arrays are walked with their index as the path segment. Non-string leaves
 * are kept untouched and never translated.
 *
 * The unit ID and key of a leaf is its dotted path from the root.
 */

use serde_json::Value;
use std::collections::{HashMap, HashSet};

use super::{ParsedFile, StringFormat, StringParser, StringSerializer};
use crate::errors::FormatError;
use crate::translation::models::StringUnit;

/// Parser and serializer for JSON key/string files
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonStrings;

fn join_path(prefix: &str, segment: &str) -> String {
    if prefix.is_empty() {
        segment.to_string()
    } else {
        format!("{}.{}", prefix, segment)
    }
}

fn collect_strings(value: &Value, path: &str, out: &mut Vec<(String, String)>) {
    match value {
        Value::String(text) => out.push((path.to_string(), text.clone())),
        Value::Object(map) => {
            for (key, child) in map {
                collect_strings(child, &join_path(path, key), out);
            }
        }
        Value::Array(items) => {
            for (index, child) in items.iter().enumerate() {
                collect_strings(child, &join_path(path, &index.to_string()), out);
            }
        }
        _ => {}
    }
}

fn replace_strings(value: &mut Value, path: &str, translations: &HashMap<String, String>) {
    match value {
        Value::String(text) => {
            if let Some(translated) = translations.get(path) {
                *text = translated.clone();
            }
        }
        Value::Object(map) => {
            for (key, child) in map.iter_mut() {
                replace_strings(child, &join_path(path, key), translations);
            }
        }
        Value::Array(items) => {
            for (index, child) in items.iter_mut().enumerate() {
                replace_strings(child, &join_path(path, &index.to_string()), translations);
            }
        }
        _ => {}
    }
}

impl StringParser for JsonStrings {
    fn parse(&self, raw: &str, filename: &str) -> Result<ParsedFile, FormatError> {
        let failure = |reason: String| FormatError::ParseFailure {
            file: filename.to_string(),
            reason,
        };

        let root: Value = serde_json::from_str(raw).map_err(|e| failure(e.to_string()))?;
        if !root.is_object() {
            return Err(failure("root must be an object of strings".to_string()));
        }

        let mut leaves = Vec::new();
        collect_strings(&root, "", &mut leaves);

        // "a.b" flat and {"a": {"b": ..}} nested would share an ID
        let mut seen = HashSet::new();
        let mut strings = Vec::with_capacity(leaves.len());
        for (position, (path, text)) in leaves.into_iter().enumerate() {
            if !seen.insert(path.clone()) {
                return Err(failure(format!("duplicate key path '{}'", path)));
            }
            strings.push(StringUnit::new(path.clone(), path, text, position));
        }

        Ok(ParsedFile {
            format: StringFormat::Json,
            strings,
        })
    }
}

impl StringSerializer for JsonStrings {
    fn serialize(&self, original: &str, translations: &HashMap<String, String>) -> Result<String, FormatError> {
        let mut root: Value = serde_json::from_str(original).map_err(|e| FormatError::Serialize(e.to_string()))?;
        replace_strings(&mut root, "", translations);

        let mut output = serde_json::to_string_pretty(&root).map_err(|e| FormatError::Serialize(e.to_string()))?;
        output.push('\n');
        Ok(output)
    }
}
