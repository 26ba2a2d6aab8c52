//! Bracketed wire notation: `[category:name]` or `[category:name=value]`,
//! concatenated without separators.
//!
//! Parsing is lenient. Anything that is not a well-formed bracket group, or
//! names no known token, is skipped; encounter order becomes sequence order.

use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;

use crate::token::{Category, Token, TokenKind, TokenSequence};

fn token_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\[([a-zA-Z]+):([a-zA-Z_0-9]+)(?:=([^\]]+))?\]").expect("token pattern")
    })
}

/// Render a sequence in wire notation, lower case.
pub fn serialize(seq: &TokenSequence) -> String {
    seq.to_string()
}

/// Parse wire notation, case-insensitively, skipping unknown tokens.
pub fn parse(molt: &str) -> TokenSequence {
    let mut seq = TokenSequence::new();
    for caps in token_re().captures_iter(molt) {
        let (Some(category), Some(name)) = (caps.get(1), caps.get(2)) else {
            continue;
        };
        let kind = category
            .as_str()
            .parse::<Category>()
            .ok()
            .and_then(|c| TokenKind::lookup(c, name.as_str()));
        let Some(kind) = kind else {
            debug!(token = &caps[0], "skipping unknown token");
            continue;
        };
        seq.push(match caps.get(3) {
            Some(value) => Token::with_value(kind, value.as_str()),
            None => Token::new(kind),
        });
    }
    seq
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_is_case_insensitive() {
        let seq = parse("[OP:FETCH][Src:Api][ret:json]");
        assert_eq!(serialize(&seq), "[op:fetch][src:api][ret:json]");
    }

    #[test]
    fn unknown_tokens_are_skipped() {
        let seq = parse("[op:fetch][op:teleport][zz:top][src:db]");
        assert_eq!(serialize(&seq), "[op:fetch][src:db]");
    }

    #[test]
    fn text_between_groups_is_ignored() {
        let seq = parse("please [op:search] then [ret:list] thanks");
        assert_eq!(seq.len(), 2);
    }

    #[test]
    fn values_keep_their_case() {
        let seq = parse("[PARAM:KEY=AbC-12]");
        assert_eq!(seq.tokens()[0].value(), Some("AbC-12"));
        assert_eq!(serialize(&seq), "[param:key=AbC-12]");
    }

    #[test]
    fn empty_input_gives_empty_sequence() {
        assert!(parse("").is_empty());
        assert!(parse("[op:fetch").is_empty());
    }
}
