/// Errors from parsing a single token body or looking a token up by name.
///
/// Translation never produces these: the reverse path skips anything it
/// cannot resolve. They surface only through [`std::str::FromStr`] on
/// [`crate::Token`] and [`crate::Category`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    /// The text is not of the form `[category:name]` or `[category:name=value]`.
    #[error("malformed token '{0}'")]
    Malformed(String),

    /// The category prefix is not one of the eight known categories.
    #[error("unknown token category '{0}'")]
    UnknownCategory(String),

    /// The category is known but has no token with this name.
    #[error("unknown token {category}:{name}")]
    UnknownToken { category: String, name: String },
}
