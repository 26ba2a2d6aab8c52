//! Token vocabulary, token values and ordered token sequences.
//!
//! The vocabulary is closed: every token the engine can emit or accept is a
//! [`TokenKind`] variant, and each variant belongs to exactly one
//! [`Category`]. Lookup by name scans the constant [`TokenKind::ALL`] table,
//! so there is no registry object to construct or share.

use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};

use crate::error::TokenError;

// ──────────────────────────────────────────────
// Categories
// ──────────────────────────────────────────────

/// The eight token categories, in the order the vocabulary lists them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Operations: what is done.
    Op,
    /// Data sources.
    Src,
    /// Parameters, usually carrying a literal value.
    Param,
    /// Return types.
    Ret,
    /// Control flow.
    Ctl,
    /// Data type constraints.
    Type,
    /// Error handling actions.
    Err,
    /// Execution modifiers.
    Mod,
}

impl Category {
    pub const ALL: [Category; 8] = [
        Category::Op,
        Category::Src,
        Category::Param,
        Category::Ret,
        Category::Ctl,
        Category::Type,
        Category::Err,
        Category::Mod,
    ];

    /// Wire spelling of the category (always lower case).
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Op => "op",
            Category::Src => "src",
            Category::Param => "param",
            Category::Ret => "ret",
            Category::Ctl => "ctl",
            Category::Type => "type",
            Category::Err => "err",
            Category::Mod => "mod",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = TokenError;

    fn from_str(s: &str) -> Result<Self, TokenError> {
        Category::ALL
            .iter()
            .copied()
            .find(|c| c.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| TokenError::UnknownCategory(s.to_owned()))
    }
}

// ──────────────────────────────────────────────
// Vocabulary
// ──────────────────────────────────────────────

macro_rules! vocabulary {
    ($($(#[$meta:meta])* $variant:ident => $cat:ident : $name:literal,)*) => {
        /// Every token the notation knows about.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum TokenKind {
            $($(#[$meta])* $variant,)*
        }

        impl TokenKind {
            /// The whole vocabulary in declaration order.
            pub const ALL: &'static [TokenKind] = &[$(TokenKind::$variant,)*];

            pub fn category(self) -> Category {
                match self {
                    $(TokenKind::$variant => Category::$cat,)*
                }
            }

            /// Lower-case token name as written after the colon.
            pub fn name(self) -> &'static str {
                match self {
                    $(TokenKind::$variant => $name,)*
                }
            }
        }
    };
}

vocabulary! {
    /// Retrieve data.
    OpFetch => Op: "fetch",
    OpParse => Op: "parse",
    OpTransform => Op: "transform",
    OpValidate => Op: "validate",
    /// Generic computation; the fallback operation.
    OpCompute => Op: "compute",
    OpSearch => Op: "search",
    OpFilter => Op: "filter",
    OpMap => Op: "map",
    OpReduce => Op: "reduce",
    OpAggregate => Op: "aggregate",
    OpProcess => Op: "process",

    SrcApi => Src: "api",
    SrcDb => Src: "db",
    SrcFile => Src: "file",
    SrcMem => Src: "mem",
    SrcStream => Src: "stream",
    SrcQueue => Src: "queue",
    SrcCache => Src: "cache",

    /// Authentication token.
    ParamToken => Param: "token",
    /// API key or record identifier.
    ParamKey => Param: "key",
    ParamQuery => Param: "query",
    ParamBody => Param: "body",
    ParamHeader => Param: "header",
    ParamTimeout => Param: "timeout",
    ParamLimit => Param: "limit",
    ParamOffset => Param: "offset",
    /// Retry or repetition count.
    ParamTimes => Param: "times",

    RetJson => Ret: "json",
    RetText => Ret: "text",
    RetBin => Ret: "bin",
    RetStream => Ret: "stream",
    RetBool => Ret: "bool",
    RetNum => Ret: "num",
    RetList => Ret: "list",
    RetDict => Ret: "dict",
    RetNull => Ret: "null",

    CtlIf => Ctl: "if",
    CtlElse => Ctl: "else",
    CtlLoop => Ctl: "loop",
    CtlBreak => Ctl: "break",
    CtlContinue => Ctl: "continue",
    CtlTry => Ctl: "try",
    CtlCatch => Ctl: "catch",
    CtlFinally => Ctl: "finally",

    TypeStr => Type: "str",
    TypeInt => Type: "int",
    TypeFloat => Type: "float",
    TypeBool => Type: "bool",
    TypeList => Type: "list",
    TypeDict => Type: "dict",
    TypeAny => Type: "any",

    ErrRetry => Err: "retry",
    ErrFail => Err: "fail",
    ErrLog => Err: "log",
    ErrIgnore => Err: "ignore",

    ModAsync => Mod: "async",
    ModBatch => Mod: "batch",
    ModParallel => Mod: "parallel",
    ModCached => Mod: "cached",
}

impl TokenKind {
    /// Case-insensitive lookup of a token by category and name.
    pub fn lookup(category: Category, name: &str) -> Option<TokenKind> {
        TokenKind::ALL
            .iter()
            .copied()
            .find(|k| k.category() == category && k.name().eq_ignore_ascii_case(name))
    }

    /// All tokens of one category, in vocabulary order.
    pub fn in_category(category: Category) -> impl Iterator<Item = TokenKind> {
        TokenKind::ALL
            .iter()
            .copied()
            .filter(move |k| k.category() == category)
    }

    /// The data type a return token implies, used to drop redundant type
    /// constraints.
    pub fn implied_type(self) -> Option<TokenKind> {
        match self {
            TokenKind::RetJson | TokenKind::RetText => Some(TokenKind::TypeStr),
            TokenKind::RetList => Some(TokenKind::TypeList),
            TokenKind::RetDict => Some(TokenKind::TypeDict),
            TokenKind::RetBool => Some(TokenKind::TypeBool),
            TokenKind::RetNum => Some(TokenKind::TypeInt),
            _ => None,
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.category(), self.name())
    }
}

// ──────────────────────────────────────────────
// Token
// ──────────────────────────────────────────────

/// One token of the notation, optionally carrying a literal value.
///
/// Two tokens of the same kind with different values are distinct, e.g.
/// `[param:timeout=30]` and `[param:timeout=60]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Token {
    kind: TokenKind,
    value: Option<String>,
}

impl Token {
    pub fn new(kind: TokenKind) -> Self {
        Token { kind, value: None }
    }

    pub fn with_value(kind: TokenKind, value: impl Into<String>) -> Self {
        Token {
            kind,
            value: Some(value.into()),
        }
    }

    pub fn kind(&self) -> TokenKind {
        self.kind
    }

    pub fn category(&self) -> Category {
        self.kind.category()
    }

    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }
}

impl From<TokenKind> for Token {
    fn from(kind: TokenKind) -> Self {
        Token::new(kind)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(v) => write!(f, "[{}={}]", self.kind, v),
            None => write!(f, "[{}]", self.kind),
        }
    }
}

impl FromStr for Token {
    type Err = TokenError;

    /// Parse one token. Surrounding brackets are optional; category and
    /// name are case-insensitive, the value is kept verbatim.
    fn from_str(s: &str) -> Result<Self, TokenError> {
        let body = s.trim();
        let body = body.strip_prefix('[').unwrap_or(body);
        let body = body.strip_suffix(']').unwrap_or(body);

        let (head, value) = match body.split_once('=') {
            Some((_, "")) => return Err(TokenError::Malformed(s.to_owned())),
            Some((head, value)) => (head, Some(value)),
            None => (body, None),
        };
        let (category, name) = head
            .split_once(':')
            .filter(|(c, n)| !c.is_empty() && !n.is_empty())
            .ok_or_else(|| TokenError::Malformed(s.to_owned()))?;

        let category: Category = category.parse()?;
        let kind =
            TokenKind::lookup(category, name).ok_or_else(|| TokenError::UnknownToken {
                category: category.as_str().to_owned(),
                name: name.to_ascii_lowercase(),
            })?;
        Ok(Token {
            kind,
            value: value.map(str::to_owned),
        })
    }
}

impl Serialize for Token {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

// ──────────────────────────────────────────────
// TokenSequence
// ──────────────────────────────────────────────

/// An ordered run of tokens. Insertion order is wire order; a token's
/// position is its index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct TokenSequence {
    tokens: Vec<Token>,
}

impl TokenSequence {
    pub fn new() -> Self {
        TokenSequence::default()
    }

    pub fn push(&mut self, token: impl Into<Token>) {
        self.tokens.push(token.into());
    }

    /// Insert at `index`, shifting later tokens right.
    pub fn insert(&mut self, index: usize, token: impl Into<Token>) {
        self.tokens.insert(index, token.into());
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Token> {
        self.tokens.iter()
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn contains_kind(&self, kind: TokenKind) -> bool {
        self.tokens.iter().any(|t| t.kind == kind)
    }

    pub fn has_category(&self, category: Category) -> bool {
        self.tokens.iter().any(|t| t.category() == category)
    }

    /// Token reduction relative to a word count: `1 - len / words`, or 0
    /// when there are no words.
    pub fn efficiency_against(&self, word_count: usize) -> f64 {
        if word_count == 0 {
            return 0.0;
        }
        1.0 - (self.len() as f64 / word_count as f64)
    }
}

impl fmt::Display for TokenSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for token in &self.tokens {
            write!(f, "{}", token)?;
        }
        Ok(())
    }
}

impl FromIterator<Token> for TokenSequence {
    fn from_iter<I: IntoIterator<Item = Token>>(iter: I) -> Self {
        TokenSequence {
            tokens: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a TokenSequence {
    type Item = &'a Token;
    type IntoIter = std::slice::Iter<'a, Token>;

    fn into_iter(self) -> Self::IntoIter {
        self.tokens.iter()
    }
}
