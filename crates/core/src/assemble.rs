//! Flatten operation groups and the cross-cutting cues into one sequence in
//! canonical order:
//!
//! 1. `ctl:try`
//! 2. modifiers other than `mod:cached`, in text order
//! 3. `ctl:if` / `ctl:else` / `ctl:loop`, in detection order
//! 4. each group: operation, source, parameters, returns
//! 5. `mod:cached`
//! 6. `ctl:catch` (implicit when a try has retry/log handling), `ctl:finally`
//! 7. `err:retry` / `err:log`, a retry followed by its reserved repeat count
//! 8. remaining error tokens
//! 9. type constraints not already implied by a placed return

use crate::detect::{Cue, Cues};
use crate::group::Grouping;
use crate::token::{Category, TokenKind, TokenSequence};

fn is_post_catch(kind: TokenKind) -> bool {
    matches!(kind, TokenKind::ErrRetry | TokenKind::ErrLog)
}

pub fn assemble(cues: &Cues, grouping: &Grouping) -> TokenSequence {
    let mut seq = TokenSequence::new();
    let control = |kind: TokenKind| cues.control.iter().filter(move |c| c.kind() == kind);

    for cue in control(TokenKind::CtlTry) {
        seq.push(cue.token.clone());
    }

    let mut modifiers: Vec<&Cue> = cues
        .modifiers
        .iter()
        .filter(|c| c.kind() != TokenKind::ModCached)
        .collect();
    modifiers.sort_by_key(|c| c.position);
    for cue in modifiers {
        seq.push(cue.token.clone());
    }

    for cue in cues.control.iter().filter(|c| {
        !matches!(
            c.kind(),
            TokenKind::CtlTry | TokenKind::CtlCatch | TokenKind::CtlFinally
        )
    }) {
        seq.push(cue.token.clone());
    }

    for group in &grouping.groups {
        seq.push(group.operation.token.clone());
        if let Some(source) = &group.source {
            seq.push(source.token.clone());
        }
        for cue in group.params.iter().chain(&group.returns) {
            seq.push(cue.token.clone());
        }
    }

    for cue in cues.modifiers.iter().filter(|c| c.kind() == TokenKind::ModCached) {
        seq.push(cue.token.clone());
    }

    let (post_catch, other_errors): (Vec<&Cue>, Vec<&Cue>) =
        cues.errors.iter().partition(|c| is_post_catch(c.kind()));

    let has_try = control(TokenKind::CtlTry).next().is_some();
    let has_catch = control(TokenKind::CtlCatch).next().is_some();
    if has_try && !has_catch && !post_catch.is_empty() {
        seq.push(TokenKind::CtlCatch);
    }
    for cue in control(TokenKind::CtlCatch).chain(control(TokenKind::CtlFinally)) {
        seq.push(cue.token.clone());
    }

    for cue in post_catch {
        seq.push(cue.token.clone());
        if cue.kind() == TokenKind::ErrRetry {
            if let Some(times) = grouping
                .reserved_params
                .iter()
                .find(|p| p.position > cue.position)
            {
                seq.push(times.token.clone());
            }
        }
    }
    for cue in other_errors {
        seq.push(cue.token.clone());
    }

    let implied: Vec<TokenKind> = seq
        .iter()
        .filter(|t| t.category() == Category::Ret)
        .filter_map(|t| t.kind().implied_type())
        .collect();
    let mut placed_types: Vec<TokenKind> = Vec::new();
    for cue in &cues.types {
        let kind = cue.kind();
        if !implied.contains(&kind) && !placed_types.contains(&kind) {
            placed_types.push(kind);
            seq.push(cue.token.clone());
        }
    }

    seq
}
