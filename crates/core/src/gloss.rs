//! Reverse gloss (token sequence to English) and the confidence score shared
//! by both translation directions.

use crate::token::{Category, TokenKind, TokenSequence};

/// Gloss used when no token in the sequence has a rendering.
pub const EMPTY_GLOSS: &str = "Empty operation";

fn gloss_token(kind: TokenKind) -> Option<&'static str> {
    use TokenKind::*;
    let phrase = match kind {
        OpFetch => "Fetch",
        OpParse => "Parse",
        OpTransform => "Transform",
        OpValidate => "Validate",
        OpCompute => "Compute",
        OpSearch => "Search",
        OpFilter => "Filter",
        OpMap => "Map",
        OpReduce => "Reduce",
        OpAggregate => "Aggregate",
        OpProcess => "Process",

        SrcApi => "data from API",
        SrcDb => "data from database",
        SrcFile => "data from file",
        SrcMem => "data from memory",
        SrcStream => "data from stream",
        SrcQueue => "data from queue",
        SrcCache => "data from cache",

        RetJson => "return JSON",
        RetText => "return text",
        RetBin => "return binary",
        RetStream => "return stream",
        RetBool => "return boolean",
        RetNum => "return number",
        RetList => "return list",
        RetDict => "return dictionary",
        RetNull => "return null",

        _ => return None,
    };
    Some(phrase)
}

/// Render `seq` as a short English phrase. Tokens without a rendering are
/// left out.
pub fn gloss(seq: &TokenSequence) -> String {
    let parts: Vec<&str> = seq.iter().filter_map(|t| gloss_token(t.kind())).collect();
    if parts.is_empty() {
        EMPTY_GLOSS.to_string()
    } else {
        parts.join(" ")
    }
}

/// Deterministic confidence in `[0, 1]`, rounded to two decimals.
///
/// A base term grows with token count up to 0.7. An operation earns 0.25
/// when paired with a source or a return, and 0.15 more when paired with
/// both. Any control-flow or error token adds 0.05.
pub fn confidence(seq: &TokenSequence) -> f64 {
    if seq.is_empty() {
        return 0.0;
    }
    let mut score = (0.5 + 0.1 * seq.len() as f64).min(0.7);

    let has_op = seq.has_category(Category::Op);
    let has_src = seq.has_category(Category::Src);
    let has_ret = seq.has_category(Category::Ret);
    if has_op && (has_src || has_ret) {
        score += 0.25;
    }
    if has_op && has_src && has_ret {
        score += 0.15;
    }
    if seq.has_category(Category::Ctl) || seq.has_category(Category::Err) {
        score += 0.05;
    }

    (score.min(1.0) * 100.0).round() / 100.0
}
