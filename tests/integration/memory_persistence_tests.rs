/*!
 * Integration tests for the SQLite translation memory.
 *
 * Databases live in temporary directories so every test starts empty.
 */

use std::sync::Arc;

use gamestringer::memory::tmx::{export_tmx, parse_tmx};
use gamestringer::memory::{MemoryKey, SqliteTranslationMemory, TranslationMemory, TranslationMemoryEntry};
use gamestringer::providers::mock::MockProvider;
use gamestringer::translation::{BatchHooks, BatchOptions, ItemStatus};

use crate::common;

#[tokio::test]
async fn test_sqliteMemory_afterReopen_shouldServeEarlierTranslations() {
    common::init_logging();
    let dir = common::create_temp_dir().unwrap();
    let db_path = dir.path().join("memory.db");
    let units = common::units(&["Sword", "Shield", "Potion"]);

    let first_mock = MockProvider::working();
    {
        let memory = Arc::new(SqliteTranslationMemory::open(&db_path).unwrap());
        common::orchestrator_with(&first_mock)
            .with_memory(memory)
            .translate_batch(&units, common::fast_options(), BatchHooks::new())
            .await
            .unwrap();
    }
    assert_eq!(first_mock.call_count(), 3);

    let second_mock = MockProvider::working();
    let memory = Arc::new(SqliteTranslationMemory::open(&db_path).unwrap());
    let job = common::orchestrator_with(&second_mock)
        .with_memory(memory.clone())
        .translate_batch(&units, common::fast_options(), BatchHooks::new())
        .await
        .unwrap();

    assert_eq!(second_mock.call_count(), 0);
    assert!(job.items.iter().all(|item| item.status == ItemStatus::FromMemory));

    let stats = memory.stats().await.unwrap();
    assert_eq!(stats.total_entries, 3);
    assert_eq!(stats.entries_by_provider.get("openai"), Some(&3));
}

#[tokio::test]
async fn test_verifiedEntry_shouldWinOverProvider() {
    let memory = Arc::new(SqliteTranslationMemory::new_in_memory().unwrap());
    memory
        .insert(TranslationMemoryEntry::new("Start", "en", "it", "Avvia", "human").with_verified(true))
        .await
        .unwrap();

    let mock = MockProvider::working();
    let job = common::orchestrator_with(&mock)
        .with_memory(memory.clone())
        .translate_batch(&common::units(&["Start"]), common::fast_options(), BatchHooks::new())
        .await
        .unwrap();

    assert_eq!(mock.call_count(), 0);
    assert_eq!(job.items[0].translated_text.as_deref(), Some("Avvia"));

    memory
        .insert(TranslationMemoryEntry::new("Start", "en", "it", "Inizia", "openai"))
        .await
        .unwrap();
    let entry = memory.lookup_text("Start", "en", "it", None).await.unwrap().unwrap();
    assert_eq!(entry.translated_text, "Avvia");
    assert!(entry.verified);
}

#[tokio::test]
async fn test_gameContext_shouldScopeMemoryEntries() {
    let memory = Arc::new(SqliteTranslationMemory::new_in_memory().unwrap());
    let mock = MockProvider::working();
    let orchestrator = common::orchestrator_with(&mock).with_memory(memory.clone());
    let units = common::units(&["Bank"]);

    let river = BatchOptions {
        game_context: Some("river crossing".to_string()),
        ..common::fast_options()
    };
    orchestrator.translate_batch(&units, river, BatchHooks::new()).await.unwrap();
    orchestrator
        .translate_batch(&units, common::fast_options(), BatchHooks::new())
        .await
        .unwrap();

    assert_eq!(mock.calls_for("Bank"), 2);
    let key = MemoryKey::new("Bank", "en", "it", Some("river crossing"));
    assert!(memory.lookup(&key).await.unwrap().is_some());
}

#[tokio::test]
async fn test_tmxExport_intoFreshMemory_shouldImportEveryEntry() {
    let source = SqliteTranslationMemory::new_in_memory().unwrap();
    source
        .insert_batch(vec![
            TranslationMemoryEntry::new("Inventory", "en", "it", "Inventario", "deepl"),
            TranslationMemoryEntry::new("Fish & Chips", "en", "it", "Pesce & patatine", "deepl"),
            TranslationMemoryEntry::new("Map", "en", "de", "Karte", "deepl"),
        ])
        .await
        .unwrap();

    let entries = source.entries("en", "it").await.unwrap();
    let tmx = export_tmx(&entries, "en", "it");

    let target = SqliteTranslationMemory::new_in_memory().unwrap();
    let imported = target.import(parse_tmx(&tmx, "en", "it").unwrap()).await.unwrap();
    assert_eq!(imported, 2);

    let entry = target.lookup_text("Fish & Chips", "en", "it", None).await.unwrap().unwrap();
    assert_eq!(entry.translated_text, "Pesce & patatine");
    assert!(target.lookup_text("Map", "en", "de", None).await.unwrap().is_none());

    // A second import of the same file adds nothing
    assert_eq!(target.import(parse_tmx(&tmx, "en", "it").unwrap()).await.unwrap(), 0);
}
