//! molt-validate -- quality scoring for Molt translations.
//!
//! The validator only consumes what the translation engine produces: the
//! original text, the translated text, and optionally the token sequence.
//! It never takes part in detection or grouping. All checks are non-fatal;
//! their outcome is a [`TranslationQuality`] whose validity depends on
//! whether any error-severity issue was found.

pub mod report;
pub mod syntax;

use std::collections::BTreeMap;

use molt_core::{Category, TokenSequence, TranslateOptions, Translator};
use serde::Serialize;
use serde_json::json;
use tracing::debug;

pub use report::{IssueKind, Severity, TranslationQuality, ValidationIssue};
pub use syntax::{check_syntax, check_vocabulary};

/// Similarity above which a failed round trip is only a warning.
const ROUNDTRIP_WARNING_FLOOR: f64 = 0.7;
/// Score penalty per issue.
const ISSUE_PENALTY: f64 = 0.1;

/// Acceptance thresholds, each in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Thresholds {
    pub validation_threshold: f64,
    pub min_token_efficiency: f64,
    pub roundtrip_similarity: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Thresholds {
            validation_threshold: 0.95,
            min_token_efficiency: 0.5,
            roundtrip_similarity: 0.9,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Validator {
    thresholds: Thresholds,
}

impl Validator {
    pub fn new(thresholds: Thresholds) -> Self {
        Validator { thresholds }
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    /// Score a translation of `original` into `translated`.
    pub fn validate_translation(
        &self,
        original: &str,
        translated: &str,
        tokens: Option<&TokenSequence>,
    ) -> TranslationQuality {
        let tokens = tokens.filter(|seq| !seq.is_empty());
        let mut issues = Vec::new();

        if let Some(seq) = tokens {
            if !seq.has_category(Category::Op) {
                issues.push(ValidationIssue::warning(
                    IssueKind::MissingRequired,
                    "Token sequence has no operation",
                    0,
                ));
            }
        }
        issues.extend(check_syntax(translated));
        issues.extend(check_vocabulary(translated));

        let token_count = tokens.map_or(0, TokenSequence::len);
        let words = original.split_whitespace().count();
        let efficiency = match tokens {
            Some(seq) => seq.efficiency_against(words),
            None => 0.0,
        };
        let confidence = estimate_confidence(token_count);

        if confidence < self.thresholds.validation_threshold {
            issues.push(ValidationIssue::warning(
                IssueKind::LowConfidence,
                format!(
                    "Confidence {:.2} below threshold {}",
                    confidence, self.thresholds.validation_threshold
                ),
                0,
            ));
        }
        if efficiency < self.thresholds.min_token_efficiency {
            issues.push(ValidationIssue::warning(
                IssueKind::Inefficient,
                format!(
                    "Token efficiency {:.2}% below minimum {:.2}%",
                    efficiency * 100.0,
                    self.thresholds.min_token_efficiency * 100.0
                ),
                0,
            ));
        }

        let score =
            ((efficiency + confidence) / 2.0 - ISSUE_PENALTY * issues.len() as f64).max(0.0);
        debug!(score, issues = issues.len(), "validated translation");

        let metrics = BTreeMap::from([
            ("original_length".to_string(), json!(original.len())),
            ("translated_length".to_string(), json!(translated.len())),
            ("token_count".to_string(), json!(token_count)),
            ("token_efficiency".to_string(), json!(efficiency)),
            ("confidence".to_string(), json!(confidence)),
        ]);
        TranslationQuality::new(score, efficiency, confidence, issues, metrics)
    }

    /// Translate `original` forward and back, and score the word overlap
    /// between the original and the gloss.
    pub fn validate_roundtrip(&self, original: &str, translator: &Translator) -> TranslationQuality {
        let options = TranslateOptions::default();
        let forward = translator.translate_forward(original, &options);
        let back = translator.translate_reverse(forward.text(), &options);
        let similarity = word_similarity(original, back.text());

        let mut issues = Vec::new();
        if similarity < self.thresholds.roundtrip_similarity {
            let message = format!(
                "Roundtrip similarity {:.2} below {}",
                similarity, self.thresholds.roundtrip_similarity
            );
            issues.push(if similarity > ROUNDTRIP_WARNING_FLOOR {
                ValidationIssue::warning(IssueKind::SemanticError, message, 0)
            } else {
                ValidationIssue::error(IssueKind::SemanticError, message, 0)
            });
        }

        let score = similarity * (1.0 - ISSUE_PENALTY * issues.len() as f64);
        debug!(similarity, score, "validated round trip");

        let metrics = BTreeMap::from([
            ("roundtrip_similarity".to_string(), json!(similarity)),
            ("molt_representation".to_string(), json!(forward.text())),
            ("roundtrip_result".to_string(), json!(back.text())),
        ]);
        TranslationQuality::new(
            score,
            forward.token_efficiency(),
            forward.confidence(),
            issues,
            metrics,
        )
    }
}

/// Token-count heuristic; independent of the engine's own confidence.
fn estimate_confidence(token_count: usize) -> f64 {
    match token_count {
        0 => 0.5,
        1 => 0.7,
        2 => 0.85,
        _ => 0.95,
    }
}

/// Jaccard similarity of the lower-cased whitespace word sets; 0 when either
/// side has no words.
pub fn word_similarity(a: &str, b: &str) -> f64 {
    use std::collections::HashSet;

    let a = a.to_lowercase();
    let b = b.to_lowercase();
    let left: HashSet<&str> = a.split_whitespace().collect();
    let right: HashSet<&str> = b.split_whitespace().collect();
    if left.is_empty() || right.is_empty() {
        return 0.0;
    }
    let shared = left.intersection(&right).count();
    let total = left.union(&right).count();
    shared as f64 / total as f64
}
