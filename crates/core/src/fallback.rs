//! Post-assembly fallback rules. Each rule checks the sequence before it
//! injects, so running the pass twice changes nothing.

use tracing::debug;

use crate::detect::{ensure_returns, is_question};
use crate::token::{Category, TokenKind, TokenSequence};

const SAFETY_CUES: &[&str] = &["safe", "careful", "graceful", "handle"];
const ASSURANCE_CUES: &[&str] = &["ensure", "guarantee", "verify"];

fn mentions(lower: &str, cues: &[&str]) -> bool {
    cues.iter().any(|cue| lower.contains(cue))
}

/// Apply the fallback rules to `seq`, which was assembled from `text`.
pub fn apply(text: &str, seq: &mut TokenSequence) {
    let lower = text.to_lowercase();

    if mentions(&lower, SAFETY_CUES) && !seq.has_category(Category::Ctl) {
        debug!("safety wording without control flow, wrapping in try/catch");
        seq.insert(0, TokenKind::CtlTry);
        seq.push(TokenKind::CtlCatch);
    }

    if mentions(&lower, ASSURANCE_CUES)
        && !ensure_returns(&lower)
        && !seq.contains_kind(TokenKind::OpValidate)
    {
        debug!("assurance wording without validation, adding op:validate");
        seq.push(TokenKind::OpValidate);
    }

    if is_question(text) && !seq.has_category(Category::Op) {
        debug!(
            with_source = seq.has_category(Category::Src),
            "question without operation, adding op:search"
        );
        seq.push(TokenKind::OpSearch);
    }
}
