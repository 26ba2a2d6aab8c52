//! Forward (English to tokens) and reverse (tokens to English) translation,
//! plus a [`Translator`] that caches forward results by exact input text.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use tracing::{debug, trace};

use crate::assemble::assemble;
use crate::detect::detect;
use crate::fallback;
use crate::gloss::{confidence, gloss};
use crate::group::group;
use crate::token::TokenSequence;
use crate::wire::{parse, serialize};

/// The only human-language profile the rule tables model.
pub const DEFAULT_LANGUAGE: &str = "en";

/// Forward results a [`Translator`] keeps before it starts over.
pub const DEFAULT_CACHE_CAPACITY: usize = 1024;

/// Outcome of one translation. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationResult {
    text: String,
    tokens: Option<TokenSequence>,
    token_count: usize,
    original_token_count: usize,
    confidence: f64,
}

impl TranslationResult {
    fn new(text: String, tokens: TokenSequence, original_token_count: usize) -> Self {
        TranslationResult {
            text,
            token_count: tokens.len(),
            confidence: confidence(&tokens),
            tokens: Some(tokens),
            original_token_count,
        }
    }

    /// Wire notation for forward results, the English gloss for reverse ones.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn tokens(&self) -> Option<&TokenSequence> {
        self.tokens.as_ref()
    }

    pub fn token_count(&self) -> usize {
        self.token_count
    }

    /// Whitespace-separated words in the English input; 0 for reverse results.
    pub fn original_token_count(&self) -> usize {
        self.original_token_count
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    /// `1 - token_count / original_token_count`, or 0 without original words.
    pub fn token_efficiency(&self) -> f64 {
        if self.original_token_count == 0 {
            return 0.0;
        }
        1.0 - self.token_count as f64 / self.original_token_count as f64
    }
}

impl Serialize for TranslationResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("TranslationResult", 6)?;
        s.serialize_field("text", &self.text)?;
        s.serialize_field("tokens", &self.tokens)?;
        s.serialize_field("token_count", &self.token_count)?;
        s.serialize_field("original_token_count", &self.original_token_count)?;
        s.serialize_field("token_efficiency", &self.token_efficiency())?;
        s.serialize_field("confidence", &self.confidence)?;
        s.end()
    }
}

/// Per-call translation options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslateOptions {
    pub enable_cache: bool,
    /// Informational; only [`DEFAULT_LANGUAGE`] is modeled.
    pub human_language: String,
    /// Reserved. No current rule reads it.
    pub strict: bool,
}

impl Default for TranslateOptions {
    fn default() -> Self {
        TranslateOptions {
            enable_cache: true,
            human_language: DEFAULT_LANGUAGE.to_string(),
            strict: false,
        }
    }
}

/// Translate English text into token notation. Never fails; text without
/// any cue yields the default operation.
pub fn translate_forward(text: &str) -> TranslationResult {
    let cues = detect(text);
    let grouping = group(&text.to_lowercase(), &cues);
    let mut seq = assemble(&cues, &grouping);
    fallback::apply(text, &mut seq);

    let words = text.split_whitespace().count();
    let result = TranslationResult::new(serialize(&seq), seq, words);
    debug!(
        tokens = result.token_count,
        words,
        confidence = result.confidence,
        "forward translation"
    );
    result
}

/// Translate token notation back into a short English gloss. Unknown or
/// malformed tokens are skipped.
pub fn translate_reverse(molt: &str) -> TranslationResult {
    let seq = parse(molt);
    let result = TranslationResult::new(gloss(&seq), seq, 0);
    debug!(tokens = result.token_count, "reverse translation");
    result
}

/// A translator with a bounded forward-result cache keyed by exact input
/// text.
///
/// The cache is behind a lock, so one translator can be shared between
/// threads (the HTTP server holds one in an `Arc`). It never holds more
/// than `capacity` entries: inserting into a full cache empties it first.
#[derive(Debug)]
pub struct Translator {
    cache: RwLock<HashMap<String, TranslationResult>>,
    capacity: usize,
}

impl Default for Translator {
    fn default() -> Self {
        Translator::with_capacity(DEFAULT_CACHE_CAPACITY)
    }
}

impl Translator {
    pub fn new() -> Self {
        Translator::default()
    }

    /// A translator caching at most `capacity` results; 0 disables caching.
    pub fn with_capacity(capacity: usize) -> Self {
        Translator {
            cache: RwLock::new(HashMap::new()),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn translate_forward(&self, text: &str, options: &TranslateOptions) -> TranslationResult {
        if options.human_language != DEFAULT_LANGUAGE {
            debug!(language = %options.human_language, "unsupported language, using en rules");
        }
        if !options.enable_cache || self.capacity == 0 {
            return translate_forward(text);
        }

        let hit = self
            .cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(text)
            .cloned();
        if let Some(hit) = hit {
            trace!(text, "cache hit");
            return hit;
        }

        let result = translate_forward(text);
        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        if cache.len() >= self.capacity && !cache.contains_key(text) {
            debug!(capacity = self.capacity, "translation cache full, clearing");
            cache.clear();
        }
        cache.insert(text.to_string(), result.clone());
        result
    }

    pub fn translate_reverse(&self, molt: &str, options: &TranslateOptions) -> TranslationResult {
        if options.human_language != DEFAULT_LANGUAGE {
            debug!(language = %options.human_language, "unsupported language, using en gloss");
        }
        translate_reverse(molt)
    }

    /// Number of cached forward results.
    pub fn cache_len(&self) -> usize {
        self.cache.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn clear_cache(&self) {
        self.cache.write().unwrap_or_else(PoisonError::into_inner).clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_result_fields() {
        let result = translate_forward("Fetch data from the API");
        assert_eq!(result.text(), "[op:fetch][src:api]");
        assert_eq!(result.token_count(), 2);
        assert_eq!(result.original_token_count(), 5);
        assert_eq!(result.token_efficiency(), 0.6);
        assert_eq!(result.confidence(), 0.95);
    }

    #[test]
    fn reverse_result_has_no_efficiency() {
        let result = translate_reverse("[op:fetch][src:api]");
        assert_eq!(result.text(), "Fetch data from API");
        assert_eq!(result.original_token_count(), 0);
        assert_eq!(result.token_efficiency(), 0.0);
    }

    #[test]
    fn cache_is_keyed_by_exact_text() {
        let translator = Translator::new();
        let options = TranslateOptions::default();
        let first = translator.translate_forward("Fetch data from API", &options);
        let second = translator.translate_forward("Fetch data from API", &options);
        assert_eq!(first, second);
        assert_eq!(translator.cache_len(), 1);

        translator.translate_forward("fetch data from api", &options);
        assert_eq!(translator.cache_len(), 2);

        translator.clear_cache();
        assert_eq!(translator.cache_len(), 0);
    }

    #[test]
    fn disabled_cache_stores_nothing() {
        let translator = Translator::new();
        let options = TranslateOptions {
            enable_cache: false,
            ..TranslateOptions::default()
        };
        translator.translate_forward("Fetch data from API", &options);
        assert_eq!(translator.cache_len(), 0);
    }

    #[test]
    fn cache_never_exceeds_capacity() {
        let translator = Translator::with_capacity(3);
        let options = TranslateOptions::default();
        for n in 0..10 {
            translator.translate_forward(&format!("fetch item {n} from the api"), &options);
            assert!(translator.cache_len() <= 3);
        }
        // The newest entry survives a reset and is served from the cache.
        let last = translator.translate_forward("fetch item 9 from the api", &options);
        assert_eq!(last.text(), "[op:fetch][src:api]");
        assert!(translator.cache_len() >= 1);
    }

    #[test]
    fn zero_capacity_disables_the_cache() {
        let translator = Translator::with_capacity(0);
        translator.translate_forward("Fetch data from API", &TranslateOptions::default());
        assert_eq!(translator.cache_len(), 0);
    }

    #[test]
    fn serialized_result_carries_efficiency() {
        let json = serde_json::to_value(translate_forward("Fetch data from the API")).unwrap();
        assert_eq!(json["text"], "[op:fetch][src:api]");
        assert_eq!(json["tokens"][1], "[src:api]");
        assert_eq!(json["token_efficiency"], 0.6);
    }
}
