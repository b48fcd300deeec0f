/*!
 * Content-based provider recommendation.
 *
 * Pure functions over a feature vector extracted from the strings to
 * translate. Independent from the provider registry: the recommendation
 * may name a provider that is not configured.
 */

use serde::Serialize;

use crate::app_config::TranslationProvider;
use crate::language_utils::{language_class, LanguageClass};
use crate::validation::markup::count_tags;
use crate::validation::placeholders::extract_placeholders;

/// Share of strings above which format tokens dominate the content
const FORMAT_HEAVY_SHARE: f64 = 0.3;

/// Average length (chars) below which content is treated as UI labels
const SHORT_TEXT_CHARS: f64 = 40.0;

/// Average length (chars) above which content is treated as narrative
const LONG_TEXT_CHARS: f64 = 120.0;

/// Features of a set of strings relevant to provider choice
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentFeatures {
    /// Mean source length in chars
    pub average_length: f64,
    /// Share of strings containing at least one placeholder
    pub placeholder_share: f64,
    /// Share of strings containing markup tags
    pub markup_share: f64,
    pub target_class: LanguageClass,
}

impl ContentFeatures {
    /// Extract features from source strings and a target language code
    pub fn from_strings<S: AsRef<str>>(strings: &[S], target_language: &str) -> Self {
        let target_class = language_class(target_language);
        if strings.is_empty() {
            return Self {
                average_length: 0.0,
                placeholder_share: 0.0,
                markup_share: 0.0,
                target_class,
            };
        }

        let total = strings.len() as f64;
        let chars: usize = strings.iter().map(|s| s.as_ref().chars().count()).sum();
        let with_placeholders = strings
            .iter()
            .filter(|s| !extract_placeholders(s.as_ref()).is_empty())
            .count();
        let with_markup = strings.iter().filter(|s| !count_tags(s.as_ref()).is_empty()).count();

        Self {
            average_length: chars as f64 / total,
            placeholder_share: with_placeholders as f64 / total,
            markup_share: with_markup as f64 / total,
            target_class,
        }
    }

    fn is_format_heavy(&self) -> bool {
        self.placeholder_share >= FORMAT_HEAVY_SHARE || self.markup_share >= FORMAT_HEAVY_SHARE
    }
}

/// Recommended provider with a one-line reason
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub provider: TranslationProvider,
    pub reason: &'static str,
}

/// Pick a provider for the given content
pub fn recommend(features: &ContentFeatures) -> Recommendation {
    let (provider, reason) = if features.is_format_heavy() {
        (
            TranslationProvider::Anthropic,
            "many strings carry placeholders or markup; an instruction-following LLM keeps them intact",
        )
    } else {
        match features.target_class {
            LanguageClass::Cjk => (
                TranslationProvider::Gemini,
                "CJK target; an LLM handles register and segmentation better",
            ),
            LanguageClass::Rtl => (
                TranslationProvider::Google,
                "right-to-left target; broadest language coverage",
            ),
            LanguageClass::Latin if features.average_length < SHORT_TEXT_CHARS => (
                TranslationProvider::DeepL,
                "short UI strings in a Latin-script language; fast and consistent",
            ),
            LanguageClass::Latin if features.average_length >= LONG_TEXT_CHARS => (
                TranslationProvider::Anthropic,
                "long narrative text; an LLM keeps tone across sentences",
            ),
            LanguageClass::Latin => (
                TranslationProvider::OpenAI,
                "mixed-length dialogue in a Latin-script language",
            ),
            LanguageClass::Other => (
                TranslationProvider::Google,
                "uncommon target language; broadest language coverage",
            ),
        }
    };

    Recommendation { provider, reason }
}

/// Pick a provider for the given content
pub fn recommend_provider(features: &ContentFeatures) -> TranslationProvider {
    recommend(features).provider
}
