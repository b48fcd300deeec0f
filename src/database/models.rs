/*!
 * Database models.
 *
 * Record types for the translation memory and batch snapshot tables.
 */

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

use crate::memory::normalize_source;

/// Lookup key of a translation memory entry
///
/// Two keys are equal when their normalized source texts, language pair and
/// game context are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MemoryKey {
    /// Source text after normalization
    pub source_text: String,
    /// Source language code
    pub source_language: String,
    /// Target language code
    pub target_language: String,
    /// Optional game context
    pub game_context: Option<String>,
}

impl MemoryKey {
    /// Build a key, normalizing every part
    pub fn new(
        source_text: &str,
        source_language: &str,
        target_language: &str,
        game_context: Option<&str>,
    ) -> Self {
        Self {
            source_text: normalize_source(source_text),
            source_language: normalize_language(source_language),
            target_language: normalize_language(target_language),
            game_context: normalize_context(game_context),
        }
    }

    /// SHA256 of the normalized source text
    pub fn source_hash(&self) -> String {
        hash_text(&self.source_text)
    }

    /// Context as stored in the database ('' when absent)
    pub fn context_column(&self) -> String {
        self.game_context.clone().unwrap_or_default()
    }
}

/// Compute SHA256 hash of text
pub fn hash_text(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

pub(crate) fn normalize_language(code: &str) -> String {
    code.trim().to_lowercase()
}

pub(crate) fn normalize_context(context: Option<&str>) -> Option<String> {
    context
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
}

/// A remembered translation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslationMemoryEntry {
    /// Source text after normalization
    pub source_text: String,
    /// Source language code
    pub source_language: String,
    /// Target language code
    pub target_language: String,
    /// Translated text
    pub translated_text: String,
    /// Optional game context the translation belongs to
    pub game_context: Option<String>,
    /// Provider that produced the translation (`tmx` for imports)
    pub provider: String,
    /// Optional game identifier
    pub game_id: Option<String>,
    /// Confirmed by a human or imported from a trusted memory
    pub verified: bool,
    /// Times the entry was stored or reused
    pub usage_count: i64,
    /// Creation timestamp (RFC 3339)
    pub created_at: String,
    /// Last use timestamp (RFC 3339)
    pub last_used_at: String,
}

impl TranslationMemoryEntry {
    /// Create a new, unverified entry
    pub fn new(
        source_text: &str,
        source_language: &str,
        target_language: &str,
        translated_text: impl Into<String>,
        provider: impl Into<String>,
    ) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            source_text: normalize_source(source_text),
            source_language: normalize_language(source_language),
            target_language: normalize_language(target_language),
            translated_text: translated_text.into(),
            game_context: None,
            provider: provider.into(),
            game_id: None,
            verified: false,
            usage_count: 1,
            created_at: now.clone(),
            last_used_at: now,
        }
    }

    /// Set the game context
    pub fn with_game_context(mut self, context: Option<&str>) -> Self {
        self.game_context = normalize_context(context);
        self
    }

    /// Set the game identifier
    pub fn with_game_id(mut self, game_id: Option<&str>) -> Self {
        self.game_id = normalize_context(game_id);
        self
    }

    /// Mark the entry verified or not
    pub fn with_verified(mut self, verified: bool) -> Self {
        self.verified = verified;
        self
    }

    /// Key of this entry
    pub fn key(&self) -> MemoryKey {
        MemoryKey {
            source_text: self.source_text.clone(),
            source_language: self.source_language.clone(),
            target_language: self.target_language.clone(),
            game_context: self.game_context.clone(),
        }
    }
}

/// Aggregate translation memory statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryStats {
    /// Number of entries
    pub total_entries: i64,
    /// Number of verified entries
    pub verified_entries: i64,
    /// Sum of all usage counts
    pub total_usage: i64,
    /// Entry count per provider
    pub entries_by_provider: BTreeMap<String, i64>,
}

impl std::fmt::Display for MemoryStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Entries: {}, Verified: {}, Total usage: {}",
            self.total_entries, self.verified_entries, self.total_usage
        )?;
        for (provider, count) in &self.entries_by_provider {
            write!(f, ", {}: {}", provider, count)?;
        }
        Ok(())
    }
}

/// Row of the `batch_snapshots` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotRecord {
    /// Snapshot ID
    pub id: String,
    /// Job the snapshot was taken from
    pub job_id: String,
    /// Source language code
    pub source_language: String,
    /// Target language code
    pub target_language: String,
    /// Provider identifier
    pub provider: String,
    /// Finished items at snapshot time
    pub completed: i64,
    /// Items in the job
    pub total: i64,
    /// Serialized snapshot
    pub payload: String,
    /// Creation timestamp (RFC 3339)
    pub created_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memoryKey_new_shouldNormalizeAllParts() {
        let a = MemoryKey::new("  Press   %s\n to start ", "EN", "it ", Some("  "));
        let b = MemoryKey::new("Press %s to start", "en", "it", None);
        assert_eq!(a, b);
        assert_eq!(a.source_hash(), b.source_hash());
    }

    #[test]
    fn test_memoryKey_withContext_shouldDifferFromPlainKey() {
        let plain = MemoryKey::new("Sword", "en", "it", None);
        let scoped = MemoryKey::new("Sword", "en", "it", Some("fantasy-rpg"));
        assert_ne!(plain, scoped);
        assert_eq!(scoped.context_column(), "fantasy-rpg");
    }

    #[test]
    fn test_hashText_shouldProduceConsistentHash() {
        let hash1 = hash_text("Hello, World!");
        let hash2 = hash_text("Hello, World!");
        let hash3 = hash_text("Different text");

        assert_eq!(hash1, hash2);
        assert_ne!(hash1, hash3);
        assert_eq!(hash1.len(), 64);
    }

    #[test]
    fn test_entry_key_shouldMatchEquivalentMemoryKey() {
        let entry = TranslationMemoryEntry::new("Hello  world", "en", "it", "Ciao mondo", "openai")
            .with_game_context(Some("demo"));
        assert_eq!(entry.key(), MemoryKey::new("Hello world", "en", "it", Some("demo")));
        assert_eq!(entry.usage_count, 1);
        assert!(!entry.verified);
    }
}
