//! Cue detection: scan English text once per token family and record every
//! candidate token with the byte offset where its cue starts.
//!
//! Matching runs on the lower-cased text and positions refer to it. Literal
//! parameter values are cut from the original text, so their case survives. Each family owns an ordered phrase table. For
//! every token only the first phrase (in table order) that occurs is used,
//! and only its first occurrence, with one exception: return types record
//! every occurrence, because a sentence may name a type both as an
//! intermediate and as the final result.
//!
//! Keyword conflicts are resolved by the named guards below, each checked
//! before the positive rule it restricts.

use std::ops::Range;
use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;

use crate::token::{Token, TokenKind};

/// A candidate token found in the source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cue {
    pub token: Token,
    /// Byte offset into the lower-cased text. For parameters this is the
    /// offset of the extracted literal, not of the keyword.
    pub position: usize,
    /// The phrase, or the whole pattern match, that produced the cue.
    pub phrase: String,
}

impl Cue {
    fn new(token: impl Into<Token>, position: usize, phrase: impl Into<String>) -> Self {
        Cue {
            token: token.into(),
            position,
            phrase: phrase.into(),
        }
    }

    pub fn kind(&self) -> TokenKind {
        self.token.kind()
    }
}

/// All cues found in one text, split by family.
#[derive(Debug, Clone, Default)]
pub struct Cues {
    pub modifiers: Vec<Cue>,
    pub control: Vec<Cue>,
    pub errors: Vec<Cue>,
    pub operations: Vec<Cue>,
    pub sources: Vec<Cue>,
    pub params: Vec<Cue>,
    pub returns: Vec<Cue>,
    pub types: Vec<Cue>,
}

type PhraseTable = &'static [(TokenKind, &'static [&'static str])];

const MODIFIER_PHRASES: PhraseTable = &[
    (TokenKind::ModAsync, &["async", "asynchronous", "asyncronously"]),
    (TokenKind::ModParallel, &["parallel", "concurrent", "simultaneous"]),
    (TokenKind::ModBatch, &["batch", "bulk", "multiple"]),
    (TokenKind::ModCached, &["cache", "cached", "caching"]),
];

const CONTROL_PHRASES: PhraseTable = &[
    (
        TokenKind::CtlTry,
        &["try", "attempt", "attempting", "trying to", "give it a shot"],
    ),
    (
        TokenKind::CtlCatch,
        &[
            "catch",
            "handle error",
            "on error",
            "except",
            "when error",
            "on failure",
            "error handler",
        ],
    ),
    (
        TokenKind::CtlFinally,
        &["finally", "cleanup", "afterwards", "always do"],
    ),
    (
        TokenKind::CtlIf,
        &["if", "conditional", "when", "whenever", "in case", "depending on"],
    ),
    (
        TokenKind::CtlElse,
        &["else", "otherwise", "alternative", "or else", "fallback"],
    ),
    (
        TokenKind::CtlLoop,
        &["loop", "iterate", "repeat", "cycle", "for each", "while"],
    ),
];

const ERROR_PHRASES: PhraseTable = &[
    (
        TokenKind::ErrRetry,
        &["retry", "try again", "reattempt", "attempt again", "keep trying"],
    ),
    (
        TokenKind::ErrLog,
        &["log", "logging", "record", "write log", "log entry", "log error"],
    ),
    (
        TokenKind::ErrFail,
        &["fail", "throw error", "raise error", "abort on error"],
    ),
    (
        TokenKind::ErrIgnore,
        &["ignore", "skip error", "continue on error", "suppress error"],
    ),
];

const OPERATION_PHRASES: PhraseTable = &[
    (TokenKind::OpFetch, &["fetch", "get", "retrieve", "download"]),
    (TokenKind::OpParse, &["parse", "analyze", "extract"]),
    (TokenKind::OpTransform, &["transform", "convert", "change"]),
    (TokenKind::OpSearch, &["search", "find", "lookup"]),
    (TokenKind::OpValidate, &["validate", "verify", "check", "ensure"]),
    (TokenKind::OpFilter, &["filter", "sift", "screen"]),
    (
        TokenKind::OpAggregate,
        &["aggregate", "combine", "merge", "summarize"],
    ),
    (TokenKind::OpProcess, &["process", "handle"]),
];

const SOURCE_PHRASES: PhraseTable = &[
    (TokenKind::SrcApi, &["api", "endpoint", "rest", "graphql"]),
    (TokenKind::SrcDb, &["database", "db", "sql", "nosql"]),
    (TokenKind::SrcFile, &["file", "csv", "json file", "data file"]),
    (TokenKind::SrcMem, &["memory", "cache", "ram"]),
];

pub(crate) const RETURN_PHRASES: PhraseTable = &[
    (TokenKind::RetJson, &["json", "object"]),
    (TokenKind::RetText, &["csv", "text", "plain"]),
    (TokenKind::RetList, &["list", "array"]),
    (TokenKind::RetDict, &["dictionary", "dict", "map"]),
    (TokenKind::RetBool, &["boolean", "bool", "true", "false"]),
    (TokenKind::RetNum, &["number", "numeric"]),
];

const TYPE_PHRASES: PhraseTable = &[
    (
        TokenKind::TypeStr,
        &["type str", "type string", "string type", "typed list of strings"],
    ),
    (
        TokenKind::TypeInt,
        &["type int", "integer type", "as integer", "to integer"],
    ),
    (
        TokenKind::TypeFloat,
        &["type float", "float type", "decimal type"],
    ),
    (
        TokenKind::TypeBool,
        &["type bool", "boolean type", "as boolean"],
    ),
    (
        TokenKind::TypeList,
        &["type list", "list type", "array type", "as list", "to list"],
    ),
    (
        TokenKind::TypeDict,
        &["type dict", "dict type", "map type", "as dict", "to dict"],
    ),
    (TokenKind::TypeAny, &["type any", "any type"]),
];

// ──────────────────────────────────────────────
// Patterns
// ──────────────────────────────────────────────

/// Parameter patterns, most specific first. Within one parameter kind the
/// first pattern that matches wins.
fn param_patterns() -> &'static [(TokenKind, Regex)] {
    static PATTERNS: OnceLock<Vec<(TokenKind, Regex)>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            (
                TokenKind::ParamKey,
                r"(?:\buser\s+)?\b(?:id|identifier)\s*(?:of|:|=)?\s*(\d+[\w-]*)",
            ),
            (
                TokenKind::ParamKey,
                r#"(?:\bapi\s+)?\bkey\b\s*(?:of|:|=)?\s*["']?([\w-]+)["']?"#,
            ),
            (TokenKind::ParamTimes, r"(?:retry|repeat)\s+(?:.*?)?(\d+)\s+times?"),
            (
                TokenKind::ParamTimeout,
                r"timeout\s*(?:of|:|=)?\s*(\d+)\s*(?:seconds?|secs?|s)?",
            ),
            (
                TokenKind::ParamLimit,
                r"(?:process|batch|handle)\s+(\d+)\s+(?:records?|items?|entries?)",
            ),
            (
                TokenKind::ParamLimit,
                r"(?:limit|max|maximum)\s*(?:of|:|=)?\s*(\d+)|at\s+most\s*(\d+)",
            ),
            (TokenKind::ParamOffset, r"(?:offset|skip)\s*(?:of|:|=)?\s*(\d+)"),
            (
                TokenKind::ParamToken,
                r#"(?:(?:auth|bearer|access)\s+)?\btoken\b\s*(?:of|:|=)?\s*["']?([\w.-]+)["']?"#,
            ),
            (
                TokenKind::ParamQuery,
                r#"(?:query|find)\s+(?:for|:|=)?\s*["']?([^"'\[\]]{1,30}?)(?:["']|,|\.|and)\s"#,
            ),
        ]
        .into_iter()
        .map(|(kind, pattern)| (kind, Regex::new(pattern).expect("parameter pattern")))
        .collect()
    })
}

/// `type: <name>` style constraints, tried after the phrase table.
fn type_patterns() -> &'static [(TokenKind, Regex)] {
    static PATTERNS: OnceLock<Vec<(TokenKind, Regex)>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            (TokenKind::TypeStr, r"\btype\s*[:=]\s*str(?:ing)?\b"),
            (TokenKind::TypeInt, r"\btype\s*[:=]\s*int(?:eger)?\b"),
            (TokenKind::TypeFloat, r"\btype\s*[:=]\s*float\b"),
            (TokenKind::TypeBool, r"\btype\s*[:=]\s*bool(?:ean)?\b"),
            (TokenKind::TypeList, r"\btype\s*[:=]\s*list\b"),
            (TokenKind::TypeDict, r"\btype\s*[:=]\s*dict\b"),
            (TokenKind::TypeAny, r"\btype\s*[:=]\s*any\b"),
        ]
        .into_iter()
        .map(|(kind, pattern)| (kind, Regex::new(pattern).expect("type pattern")))
        .collect()
    })
}

fn list_of_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"list\s+(?:of\s+)?(strings?|strs?|texts?|ints?|floats?|booleans?)")
            .expect("list-of pattern")
    })
}

fn multiple_sources_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"multiple\s+(?:apis?|sources?|endpoints?)").expect("multiple-sources pattern")
    })
}

fn ensure_returns_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"ensure\s+(?:it\s+)?returns?").expect("ensure-returns pattern"))
}

// ──────────────────────────────────────────────
// Guards
// ──────────────────────────────────────────────

/// "multiple APIs/sources/endpoints" talks about sources, not batching.
fn multiple_sources(lower: &str) -> bool {
    multiple_sources_re().is_match(lower)
}

/// "failed"/"failure" are not a request to fail; only a whole-word "fail" is.
fn failure_wording(lower: &str) -> bool {
    lower.contains("failed") || lower.contains("failure")
}

/// "ensure it returns X" describes the return type, not a validation step.
pub(crate) fn ensure_returns(lower: &str) -> bool {
    ensure_returns_re().is_match(lower)
}

/// With error wording present, "if"/"when" read as error handling.
fn error_context(lower: &str) -> bool {
    ["error", "fail", "exception"].iter().any(|w| lower.contains(w))
}

/// "otherwise log ..." is the error branch, not an else branch.
fn otherwise_logs(lower: &str) -> bool {
    lower.contains("otherwise") && ["log", "record", "print"].iter().any(|w| lower.contains(w))
}

/// The "try" at the tail of "retry" is not a try block.
fn inside_retry(lower: &str, position: usize) -> bool {
    lower[..position].ends_with("re")
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn is_whole_word(lower: &str, position: usize, len: usize) -> bool {
    let before = lower[..position].chars().next_back();
    let after = lower[position + len..].chars().next();
    !before.is_some_and(is_word_char) && !after.is_some_and(is_word_char)
}

// ──────────────────────────────────────────────
// Detection
// ──────────────────────────────────────────────

/// Detect every cue family in `text`.
///
/// Never fails. When no operation cue is present a default operation is
/// supplied at position 0: `search` for questions, `compute` otherwise.
pub fn detect(text: &str) -> Cues {
    let lower = text.to_lowercase();

    let mut cues = Cues {
        modifiers: detect_modifiers(&lower),
        control: detect_control(&lower),
        errors: detect_errors(&lower),
        operations: detect_operations(&lower),
        sources: scan_family(&lower, SOURCE_PHRASES, |_, _, _| false),
        params: detect_params(text, &lower),
        returns: detect_returns(&lower),
        types: Vec::new(),
    };
    cues.types = detect_types(&lower, &cues.returns);

    if cues.operations.is_empty() {
        let cue = if is_question(text) {
            Cue::new(TokenKind::OpSearch, 0, "?")
        } else {
            Cue::new(TokenKind::OpCompute, 0, "compute")
        };
        debug!(token = %cue.token, "no operation cue, using default");
        cues.operations.push(cue);
    }

    debug!(
        modifiers = cues.modifiers.len(),
        control = cues.control.len(),
        errors = cues.errors.len(),
        operations = cues.operations.len(),
        sources = cues.sources.len(),
        params = cues.params.len(),
        returns = cues.returns.len(),
        types = cues.types.len(),
        "detected cues"
    );
    cues
}

pub(crate) fn is_question(text: &str) -> bool {
    text.trim().ends_with('?')
}

/// For each token in `table`, record the first occurrence of the first
/// phrase that occurs and is not rejected by `reject(kind, phrase, position)`.
fn scan_family(
    lower: &str,
    table: PhraseTable,
    reject: impl Fn(TokenKind, &str, usize) -> bool,
) -> Vec<Cue> {
    let mut cues = Vec::new();
    for &(kind, phrases) in table {
        let hit = phrases.iter().find_map(|phrase| {
            lower
                .match_indices(phrase)
                .find(|&(pos, _)| !reject(kind, phrase, pos))
                .map(|(pos, _)| Cue::new(kind, pos, *phrase))
        });
        cues.extend(hit);
    }
    cues
}

fn detect_modifiers(lower: &str) -> Vec<Cue> {
    let multiple_sources = multiple_sources(lower);
    scan_family(lower, MODIFIER_PHRASES, |kind, phrase, _| {
        kind == TokenKind::ModBatch && phrase == "multiple" && multiple_sources
    })
}

fn detect_control(lower: &str) -> Vec<Cue> {
    let error_context = error_context(lower);
    let otherwise_logs = otherwise_logs(lower);
    scan_family(lower, CONTROL_PHRASES, |kind, phrase, pos| match kind {
        TokenKind::CtlIf => error_context,
        TokenKind::CtlElse => otherwise_logs,
        TokenKind::CtlTry => phrase == "try" && inside_retry(lower, pos),
        _ => false,
    })
}

fn detect_errors(lower: &str) -> Vec<Cue> {
    let failure_wording = failure_wording(lower);
    scan_family(lower, ERROR_PHRASES, |kind, phrase, pos| {
        kind == TokenKind::ErrFail
            && failure_wording
            && !(phrase == "fail" && is_whole_word(lower, pos, phrase.len()))
    })
}

fn detect_operations(lower: &str) -> Vec<Cue> {
    let ensure_returns = ensure_returns(lower);
    scan_family(lower, OPERATION_PHRASES, |kind, phrase, _| {
        kind == TokenKind::OpValidate && ensure_returns && matches!(phrase, "check" | "ensure")
    })
}

fn detect_params(text: &str, lower: &str) -> Vec<Cue> {
    let mut cues: Vec<Cue> = Vec::new();
    for (kind, regex) in param_patterns() {
        let Some(caps) = regex.captures(lower) else {
            continue;
        };
        // The limit pattern has two alternatives, each with its own group.
        let Some(literal) = caps.iter().skip(1).flatten().next() else {
            continue;
        };
        let token = Token::with_value(*kind, source_slice(text, lower, literal.range()));
        if cues.iter().any(|c| c.token == token) {
            continue;
        }
        let whole = caps.get(0).map_or("", |m| m.as_str());
        cues.push(Cue::new(token, literal.start(), whole));
    }
    cues
}

/// The original-case text behind `range` of `lower`. Falls back to the
/// lower-cased slice when lower-casing moved byte offsets.
fn source_slice<'a>(text: &'a str, lower: &'a str, range: Range<usize>) -> &'a str {
    let folded = &lower[range.clone()];
    match text.get(range) {
        Some(original) if original.to_lowercase() == folded => original,
        _ => folded,
    }
}

fn detect_returns(lower: &str) -> Vec<Cue> {
    let mut cues = Vec::new();
    for &(kind, phrases) in RETURN_PHRASES {
        for phrase in phrases {
            let before = cues.len();
            cues.extend(
                lower
                    .match_indices(phrase)
                    .map(|(pos, _)| Cue::new(kind, pos, *phrase)),
            );
            if cues.len() > before {
                break;
            }
        }
    }
    cues
}

fn detect_types(lower: &str, returns: &[Cue]) -> Vec<Cue> {
    let taken = |pos: usize| returns.iter().any(|r| r.position == pos);
    let mut cues = Vec::new();

    if let Some(word) = list_of_re().captures(lower).and_then(|c| c.get(1)) {
        let kind = match word.as_str() {
            w if w.starts_with("str") || w.starts_with("text") => Some(TokenKind::TypeStr),
            w if w.starts_with("int") => Some(TokenKind::TypeInt),
            w if w.starts_with("float") => Some(TokenKind::TypeFloat),
            w if w.starts_with("boolean") => Some(TokenKind::TypeBool),
            _ => None,
        };
        if let Some(kind) = kind {
            cues.push(Cue::new(kind, word.start(), word.as_str()));
        }
    }

    for &(kind, phrases) in TYPE_PHRASES {
        let phrase_hit = phrases.iter().find_map(|phrase| {
            lower
                .find(phrase)
                .filter(|&pos| !taken(pos))
                .map(|pos| Cue::new(kind, pos, *phrase))
        });
        let hit = phrase_hit.or_else(|| {
            type_patterns()
                .iter()
                .filter(|(k, _)| *k == kind)
                .find_map(|(_, re)| re.find(lower))
                .filter(|m| !taken(m.start()))
                .map(|m| Cue::new(kind, m.start(), m.as_str()))
        });
        cues.extend(hit);
    }
    cues
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(cues: &[Cue]) -> Vec<TokenKind> {
        cues.iter().map(Cue::kind).collect()
    }

    #[test]
    fn positions_point_at_the_cue() {
        let cues = detect("Fetch data from API and return JSON");
        assert_eq!(cues.operations[0].position, 0);
        assert_eq!(cues.sources[0].kind(), TokenKind::SrcApi);
        assert_eq!(cues.sources[0].position, 16);
        assert_eq!(cues.returns[0].position, 31);
    }

    #[test]
    fn first_phrase_in_table_order_wins() {
        // "retrieve" comes after "get" in the fetch table, even though it is
        // leftmost in the text.
        let cues = detect("retrieve then get the record");
        let fetch = &cues.operations[0];
        assert_eq!(fetch.kind(), TokenKind::OpFetch);
        assert_eq!(fetch.phrase, "get");
    }

    #[test]
    fn returns_record_every_occurrence() {
        let cues = detect("convert the json to json");
        let json: Vec<_> = cues
            .returns
            .iter()
            .filter(|c| c.kind() == TokenKind::RetJson)
            .collect();
        assert_eq!(json.len(), 2);
    }

    #[test]
    fn multiple_sources_suppresses_batch() {
        let cues = detect("fetch from multiple endpoints");
        assert!(!kinds(&cues.modifiers).contains(&TokenKind::ModBatch));

        let cues = detect("update multiple records");
        assert!(kinds(&cues.modifiers).contains(&TokenKind::ModBatch));
    }

    #[test]
    fn failure_wording_needs_whole_word_fail() {
        let cues = detect("log the failed records");
        assert!(!kinds(&cues.errors).contains(&TokenKind::ErrFail));

        let cues = detect("on failure, fail loudly");
        let fail = cues
            .errors
            .iter()
            .find(|c| c.kind() == TokenKind::ErrFail)
            .expect("whole-word fail");
        assert_eq!(fail.position, 12);
    }

    #[test]
    fn ensure_returns_is_not_validation() {
        let cues = detect("Ensure it returns a list");
        assert!(!kinds(&cues.operations).contains(&TokenKind::OpValidate));

        let cues = detect("Ensure the data is valid");
        assert!(kinds(&cues.operations).contains(&TokenKind::OpValidate));
    }

    #[test]
    fn error_context_suppresses_if() {
        let cues = detect("If the request errors, log it");
        assert!(!kinds(&cues.control).contains(&TokenKind::CtlIf));

        let cues = detect("If the cache is warm, fetch from memory");
        assert!(kinds(&cues.control).contains(&TokenKind::CtlIf));
    }

    #[test]
    fn otherwise_log_is_not_else() {
        let cues = detect("fetch it, otherwise log a warning");
        assert!(!kinds(&cues.control).contains(&TokenKind::CtlElse));

        let cues = detect("fetch it, otherwise use defaults");
        assert!(kinds(&cues.control).contains(&TokenKind::CtlElse));
    }

    #[test]
    fn try_inside_retry_is_not_try() {
        let cues = detect("fetch the page and retry");
        assert!(!kinds(&cues.control).contains(&TokenKind::CtlTry));
        assert!(kinds(&cues.errors).contains(&TokenKind::ErrRetry));
    }

    #[test]
    fn params_bind_literal_and_its_position() {
        let text = "fetch with timeout of 30 seconds";
        let cues = detect(text);
        let timeout = &cues.params[0];
        assert_eq!(timeout.token, Token::with_value(TokenKind::ParamTimeout, "30"));
        assert_eq!(timeout.position, text.find("30").unwrap());
    }

    #[test]
    fn identifier_and_key_both_extracted() {
        let cues = detect("get user id 12345 with key abc");
        let keys: Vec<_> = cues
            .params
            .iter()
            .filter(|c| c.kind() == TokenKind::ParamKey)
            .filter_map(|c| c.token.value())
            .collect();
        assert_eq!(keys, vec!["12345", "abc"]);
    }

    #[test]
    fn same_literal_from_two_patterns_is_kept_once() {
        // Both limit alternatives see "limit 10" / "process 10 items".
        let cues = detect("process 10 items, limit 10");
        let limits: Vec<_> = cues
            .params
            .iter()
            .filter(|c| c.kind() == TokenKind::ParamLimit)
            .collect();
        assert_eq!(limits.len(), 1);
    }

    #[test]
    fn literal_keeps_original_case() {
        let text = "Use bearer token AbC123XyZ with key SeCrEt-1";
        let cues = detect(text);
        let values: Vec<_> = cues.params.iter().filter_map(|c| c.token.value()).collect();
        assert_eq!(values, vec!["SeCrEt-1", "AbC123XyZ"]);
        for value in values {
            assert!(text.contains(value), "{value} not cut from the source");
        }
    }

    #[test]
    fn literal_falls_back_when_case_folding_shifts_bytes() {
        // 'İ' lower-cases to two chars, so offsets no longer line up.
        let cues = detect("İİ fetch with token AbC");
        assert_eq!(cues.params[0].token.value(), Some("abc"));
    }

    #[test]
    fn limit_second_alternative() {
        let cues = detect("return at most 25 items");
        assert_eq!(
            cues.params[0].token,
            Token::with_value(TokenKind::ParamLimit, "25")
        );
    }

    #[test]
    fn type_phrase_at_return_position_is_skipped() {
        // "list type" starts where the "list" return cue starts.
        let cues = detect("produce a list type");
        assert!(!kinds(&cues.types).contains(&TokenKind::TypeList));
    }

    #[test]
    fn list_of_strings_yields_str_type() {
        let cues = detect("return list of strings");
        assert_eq!(kinds(&cues.types), vec![TokenKind::TypeStr]);
    }

    #[test]
    fn default_operation() {
        assert_eq!(
            kinds(&detect("").operations),
            vec![TokenKind::OpCompute]
        );
        assert_eq!(
            kinds(&detect("What are the options?").operations),
            vec![TokenKind::OpSearch]
        );
    }
}
