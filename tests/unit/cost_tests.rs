/*!
 * Tests for cost estimation and provider recommendation
 */

use gamestringer::app_config::TranslationProvider;
use gamestringer::translation::{estimate, recommend_provider, ContentFeatures, EstimateOptions, ProviderProfile};

fn strings(count: usize, text: &str) -> Vec<String> {
    (0..count).map(|_| text.to_string()).collect()
}

#[test]
fn test_estimate_withHalfHitRate_shouldNeedFiftyCalls() {
    let options = EstimateOptions {
        provider: TranslationProvider::DeepL,
        tm_hit_rate: 0.5,
        ..EstimateOptions::default()
    };
    let estimate = estimate(&strings(100, "Open the gate"), &options);

    assert_eq!(estimate.breakdown.estimated_api_calls, 50);
    assert_eq!(estimate.breakdown.estimated_tm_hits, 50);
}

#[test]
fn test_estimate_doublingCharacters_shouldDoubleCost() {
    let options = EstimateOptions {
        provider: TranslationProvider::Google,
        ..EstimateOptions::default()
    };
    let short = estimate(&strings(40, "abcdefghij"), &options);
    let long = estimate(&strings(40, "abcdefghijabcdefghij"), &options);

    assert!((long.estimated_cost - 2.0 * short.estimated_cost).abs() < 1e-9);
}

#[test]
fn test_estimate_shouldUseProviderPrice() {
    let options = EstimateOptions {
        provider: TranslationProvider::OpenAI,
        use_translation_memory: false,
        ..EstimateOptions::default()
    };
    let texts = strings(10, &"x".repeat(100));
    let estimate = estimate(&texts, &options);

    let expected = ProviderProfile::for_provider(TranslationProvider::OpenAI).price_per_1k_chars;
    assert!((estimate.estimated_cost - expected).abs() < 1e-9);
}

#[test]
fn test_recommendProvider_withCjkDialogue_shouldPickGemini() {
    let features = ContentFeatures::from_strings(&["The merchant looks at you suspiciously."], "ja");
    assert_eq!(recommend_provider(&features), TranslationProvider::Gemini);
}

#[test]
fn test_recommendProvider_withLongNarrative_shouldPickAnthropic() {
    let paragraph = "The wind howled through the ruined keep as the last of the torches guttered out, \
                     leaving only the pale glow of the moon to light your way down the spiral stairs.";
    let features = ContentFeatures::from_strings(&[paragraph], "es");
    assert_eq!(recommend_provider(&features), TranslationProvider::Anthropic);
}
