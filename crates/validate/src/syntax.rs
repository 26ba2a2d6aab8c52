//! Syntax and vocabulary checks on wire-notation text.

use std::sync::OnceLock;

use molt_core::Token;
use regex::Regex;

use crate::report::{IssueKind, ValidationIssue};

fn bracket_body_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[([^\]]+)\]").expect("bracket body"))
}

fn token_format_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^[a-z]+:[a-z_]+(?:=[^\]]+)?$").expect("token format"))
}

/// Bracket balance and per-token format. Both are errors.
pub fn check_syntax(text: &str) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    let open = text.matches('[').count();
    let close = text.matches(']').count();
    if open != close {
        issues.push(ValidationIssue::error(
            IssueKind::SyntaxError,
            format!("Mismatched brackets: {open} open, {close} close"),
            0,
        ));
    }

    for caps in bracket_body_re().captures_iter(text) {
        let Some(body) = caps.get(1) else { continue };
        if !token_format_re().is_match(body.as_str()) {
            issues.push(ValidationIssue::error(
                IssueKind::SyntaxError,
                format!("Invalid token format: [{}]", body.as_str()),
                body.start() - 1,
            ));
        }
    }
    issues
}

/// Well-formed bracket groups that name no known token. These are warnings:
/// the reverse path skips them rather than failing.
pub fn check_vocabulary(text: &str) -> Vec<ValidationIssue> {
    bracket_body_re()
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .filter(|body| token_format_re().is_match(body.as_str()))
        .filter_map(|body| {
            let err = body.as_str().parse::<Token>().err()?;
            Some(ValidationIssue::warning(
                IssueKind::InvalidToken,
                err.to_string(),
                body.start() - 1,
            ))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn well_formed_text_has_no_issues() {
        assert!(check_syntax("[op:fetch][src:api][param:timeout=30]").is_empty());
        assert!(check_syntax("[OP:FETCH]").is_empty());
        assert!(check_syntax("").is_empty());
    }

    #[test]
    fn mismatched_brackets() {
        let issues = check_syntax("[op:fetch][src:api");
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].message, "Mismatched brackets: 2 open, 1 close");
    }

    #[test]
    fn malformed_body_reports_its_offset() {
        let issues = check_syntax("[op:fetch][nocolon]");
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].position, 10);
        assert_eq!(issues[0].message, "Invalid token format: [nocolon]");
    }

    #[test]
    fn unknown_names_are_warnings() {
        let issues = check_vocabulary("[op:fetch][op:teleport][zz:top]");
        assert_eq!(issues.len(), 2);
        assert!(issues.iter().all(|i| i.kind == IssueKind::InvalidToken));
        assert_eq!(issues[0].message, "unknown token op:teleport");
    }
}
