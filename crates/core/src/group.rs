//! Semantic grouping: bind sources, parameters and return types to the
//! operation they belong to, using text position and explicit anchors.

use std::ops::Range;
use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;

use crate::detect::{Cue, Cues};
use crate::token::TokenKind;

/// Bytes after the first operation in which a return cue still binds to it.
const EARLY_RETURN_WINDOW: usize = 30;
/// Bytes after an `<op> to` anchor in which a return cue binds to that op.
const TO_RETURN_WINDOW: usize = 20;

/// One operation and the cues bound to it.
#[derive(Debug, Clone)]
pub struct OperationGroup {
    pub operation: Cue,
    pub source: Option<Cue>,
    pub params: Vec<Cue>,
    pub returns: Vec<Cue>,
}

impl OperationGroup {
    fn new(operation: Cue) -> Self {
        OperationGroup {
            operation,
            source: None,
            params: Vec::new(),
            returns: Vec::new(),
        }
    }

    fn has_return(&self, kind: TokenKind) -> bool {
        self.returns.iter().any(|r| r.kind() == kind)
    }
}

/// Output of [`group`].
#[derive(Debug, Clone, Default)]
pub struct Grouping {
    /// One group per operation, in text order.
    pub groups: Vec<OperationGroup>,
    /// The return named by an explicit `return [as] [a] <type>` clause.
    pub final_return: Option<Cue>,
    /// Repeat counts that follow a retry cue. They are emitted next to the
    /// retry token instead of inside an operation group.
    pub reserved_params: Vec<Cue>,
}

fn return_clause_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"return\s+(?:as\s+)?(?:a\s+)?(\w+)").expect("return clause"))
}

fn return_kind_for_word(word: &str) -> Option<TokenKind> {
    match word {
        "json" | "object" => Some(TokenKind::RetJson),
        "csv" | "text" | "plain" => Some(TokenKind::RetText),
        "list" | "array" => Some(TokenKind::RetList),
        "dict" | "dictionary" | "map" => Some(TokenKind::RetDict),
        "bool" | "boolean" => Some(TokenKind::RetBool),
        "number" | "numeric" => Some(TokenKind::RetNum),
        _ => None,
    }
}

/// The rightmost `return ... <type>` clause whose type word is known, with
/// the byte span of the whole clause.
fn final_return_clause(lower: &str) -> Option<(Cue, Range<usize>)> {
    return_clause_re()
        .captures_iter(lower)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let word = caps.get(1)?;
            let kind = return_kind_for_word(word.as_str())?;
            let cue = Cue {
                token: kind.into(),
                position: word.start(),
                phrase: whole.as_str().to_string(),
            };
            Some((cue, whole.range()))
        })
        .last()
}

fn sorted(cues: &[Cue]) -> Vec<Cue> {
    let mut cues = cues.to_vec();
    cues.sort_by_key(|c| c.position);
    cues
}

/// Partition detected cues into operation groups.
///
/// `lower` must be the lower-cased text the cues were detected in.
pub fn group(lower: &str, cues: &Cues) -> Grouping {
    let operations = sorted(&cues.operations);
    let mut groups: Vec<OperationGroup> =
        operations.iter().cloned().map(OperationGroup::new).collect();
    if groups.is_empty() {
        return Grouping::default();
    }

    // Exclusive end of operation i's span.
    let span_end = |i: usize| {
        operations
            .get(i + 1)
            .map_or(lower.len(), |next| next.position)
    };

    bind_sources(&operations, &sorted(&cues.sources), &mut groups);

    // ── Returns ──────────────────────────────────────────────────────

    let mut returns: Vec<Cue> = Vec::new();
    for cue in &cues.returns {
        if !returns.iter().any(|r| r.kind() == cue.kind()) {
            returns.push(cue.clone());
        }
    }
    returns.sort_by_key(|c| c.position);

    let final_clause = final_return_clause(lower);
    let mut used = vec![false; returns.len()];
    if let Some((_, span)) = &final_clause {
        for (j, ret) in returns.iter().enumerate() {
            used[j] = span.contains(&ret.position);
        }
    }

    for (i, op) in operations.iter().enumerate() {
        let anchored = lower.contains(&format!("{} to", op.phrase))
            || lower.contains(&format!("{}s to", op.phrase));
        let to_pos = lower[op.position..]
            .find(" to ")
            .map(|p| p + op.position)
            .filter(|&p| p < span_end(i));

        for (j, ret) in returns.iter().enumerate() {
            if used[j] {
                continue;
            }
            let binds = if anchored {
                to_pos.is_some_and(|to| to < ret.position && ret.position < to + TO_RETURN_WINDOW)
            } else {
                i == 0
                    && op.position <= ret.position
                    && ret.position < op.position + EARLY_RETURN_WINDOW
            };
            if binds {
                debug!(operation = %op.token, ret = %ret.token, "bound return by proximity");
                groups[i].returns.push(ret.clone());
                used[j] = true;
            }
        }
    }

    let last = groups.len() - 1;
    let final_return = final_clause.map(|(cue, _)| cue);
    if let Some(final_return) = &final_return {
        if !groups[last].has_return(final_return.kind()) {
            groups[last].returns.push(final_return.clone());
        }
    }
    for (j, ret) in returns.into_iter().enumerate() {
        if !used[j] && !groups[last].has_return(ret.kind()) {
            groups[last].returns.push(ret);
        }
    }

    // ── Parameters ───────────────────────────────────────────────────

    let retry_positions: Vec<usize> = cues
        .errors
        .iter()
        .filter(|e| e.kind() == TokenKind::ErrRetry)
        .map(|e| e.position)
        .collect();

    let mut reserved_params = Vec::new();
    for param in sorted(&cues.params) {
        if param.kind() == TokenKind::ParamTimes
            && retry_positions.iter().any(|&r| r < param.position)
        {
            reserved_params.push(param);
            continue;
        }
        let owner = operations
            .iter()
            .enumerate()
            .position(|(i, op)| op.position <= param.position && param.position < span_end(i))
            .unwrap_or(last);
        groups[owner].params.push(param);
    }

    Grouping {
        groups,
        final_return,
        reserved_params,
    }
}

/// First operation: nearest source at or before it, else the first source.
/// Later operations: nearest unclaimed source in `(previous op, op]`.
/// Leftovers go to the rightmost group without a source.
fn bind_sources(operations: &[Cue], sources: &[Cue], groups: &mut [OperationGroup]) {
    let mut claimed = vec![false; sources.len()];

    for (i, op) in operations.iter().enumerate() {
        let pick = if i == 0 {
            sources
                .iter()
                .rposition(|s| s.position <= op.position)
                .or(if sources.is_empty() { None } else { Some(0) })
        } else {
            let prev = operations[i - 1].position;
            (0..sources.len()).rev().find(|&j| {
                !claimed[j] && prev < sources[j].position && sources[j].position <= op.position
            })
        };
        if let Some(j) = pick {
            claimed[j] = true;
            groups[i].source = Some(sources[j].clone());
        }
    }

    for (j, src) in sources.iter().enumerate() {
        if claimed[j] {
            continue;
        }
        match groups.iter_mut().rev().find(|g| g.source.is_none()) {
            Some(g) => g.source = Some(src.clone()),
            None => debug!(source = %src.token, "every operation already has a source"),
        }
    }
}
