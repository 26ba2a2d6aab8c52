//! TranslationQuality -- the scored outcome of a validation run, with the
//! issues that lowered it.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

/// What a validation issue is about.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    InvalidToken,
    MissingRequired,
    SyntaxError,
    SemanticError,
    LowConfidence,
    Inefficient,
}

/// Only error-severity issues make a translation invalid.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ValidationIssue {
    pub kind: IssueKind,
    pub message: String,
    /// Byte offset in the checked text, or 0 when the issue has no location.
    pub position: usize,
    pub severity: Severity,
}

impl ValidationIssue {
    pub fn error(kind: IssueKind, message: impl Into<String>, position: usize) -> Self {
        ValidationIssue {
            kind,
            message: message.into(),
            position,
            severity: Severity::Error,
        }
    }

    pub fn warning(kind: IssueKind, message: impl Into<String>, position: usize) -> Self {
        ValidationIssue {
            kind,
            message: message.into(),
            position,
            severity: Severity::Warning,
        }
    }
}

/// Scored result of validating a translation or a round trip.
#[derive(Debug, Clone, Serialize)]
pub struct TranslationQuality {
    pub is_valid: bool,
    pub score: f64,
    pub token_efficiency: f64,
    pub confidence: f64,
    pub issues: Vec<ValidationIssue>,
    pub metrics: BTreeMap<String, serde_json::Value>,
}

impl TranslationQuality {
    /// Build a quality record; validity is derived from the issues.
    pub fn new(
        score: f64,
        token_efficiency: f64,
        confidence: f64,
        issues: Vec<ValidationIssue>,
        metrics: BTreeMap<String, serde_json::Value>,
    ) -> Self {
        TranslationQuality {
            is_valid: issues.iter().all(|i| i.severity != Severity::Error),
            score,
            token_efficiency,
            confidence,
            issues,
            metrics,
        }
    }

    pub fn errors(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(|i| i.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(|i| i.severity == Severity::Warning)
    }
}

impl fmt::Display for TranslationQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = if self.is_valid { "VALID" } else { "INVALID" };
        write!(
            f,
            "{} (score: {:.2}, efficiency: {:.2}%)",
            status,
            self.score,
            self.token_efficiency * 100.0
        )
    }
}
