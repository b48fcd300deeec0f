/*!
 * Tests for string file parsing and serialization
 */

use std::collections::HashMap;

use gamestringer::errors::FormatError;
use gamestringer::formats::{parse_file, serialize_file, StringFormat};

const STRINGS: &str = r#"{
    "ui": {
        "title": "Dungeon of Echoes",
        "menu": { "start": "Start", "load": "Load game" }
    },
    "dialogue.intro": "Welcome, {player}!",
    "credits": ["Design", "Music"],
    "max_level": 50,
    "beta": false
}"#;

#[test]
fn test_parseFile_withJson_shouldExtractEveryStringLeaf() {
    let parsed = parse_file(STRINGS, "en.json").unwrap();

    assert_eq!(parsed.format, StringFormat::Json);
    let keys: Vec<&str> = parsed.strings.iter().map(|u| u.key.as_str()).collect();
    assert_eq!(
        keys,
        vec!["ui.title", "ui.menu.start", "ui.menu.load", "dialogue.intro", "credits.0", "credits.1"]
    );
    let positions: Vec<usize> = parsed.strings.iter().map(|u| u.original_position).collect();
    assert_eq!(positions, vec![0, 1, 2, 3, 4, 5]);
}

#[test]
fn test_parseFile_withTruncatedJson_shouldReportParseFailure() {
    let err = parse_file(r#"{"a": "b""#, "fr.json").unwrap_err();
    match err {
        FormatError::ParseFailure { file, .. } => assert_eq!(file, "fr.json"),
        other => panic!("unexpected error: {:?}", other),
    }
}

#[test]
fn test_serializeFile_withPartialTranslations_shouldKeepUntranslatedSource() {
    let parsed = parse_file(STRINGS, "en.json").unwrap();
    let translations: HashMap<String, String> = parsed
        .strings
        .iter()
        .filter(|u| u.key.starts_with("ui."))
        .map(|u| (u.id.clone(), format!("IT {}", u.source_text)))
        .collect();

    let output = serialize_file(StringFormat::Json, STRINGS, &translations).unwrap();
    let reparsed = parse_file(&output, "it.json").unwrap();

    let texts: HashMap<&str, &str> = reparsed
        .strings
        .iter()
        .map(|u| (u.key.as_str(), u.source_text.as_str()))
        .collect();
    assert_eq!(texts["ui.menu.load"], "IT Load game");
    assert_eq!(texts["dialogue.intro"], "Welcome, {player}!");
    assert!(output.contains("\"max_level\": 50"));
}

#[test]
fn test_serializeFile_withInvalidOriginal_shouldFail() {
    let result = serialize_file(StringFormat::Json, "not json", &HashMap::new());
    assert!(matches!(result, Err(FormatError::Serialize(_))));
}
