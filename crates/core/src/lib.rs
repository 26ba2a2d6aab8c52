//! molt-core: translation between short English instructions and the
//! bracketed Molt token notation.
//!
//! The forward path is a pipeline of pure passes:
//!
//! - [`detect()`] -- find lexical cues and their positions
//! - [`group()`] -- bind sources, parameters and returns to operations
//! - [`assemble()`] -- flatten groups into canonical token order
//! - [`fallback::apply`] -- inject tokens implied by safety/assurance/question wording
//!
//! The reverse path is [`parse()`] followed by [`gloss()`]. Both directions
//! are wrapped by [`translate_forward()`] / [`translate_reverse()`], and by
//! [`Translator`] when a result cache is wanted.

pub mod assemble;
pub mod detect;
pub mod error;
pub mod fallback;
pub mod gloss;
pub mod group;
pub mod token;
pub mod translate;
pub mod wire;

// ── Convenience re-exports: key types ────────────────────────────────

pub use detect::{Cue, Cues};
pub use error::TokenError;
pub use group::{Grouping, OperationGroup};
pub use token::{Category, Token, TokenKind, TokenSequence};
pub use translate::{
    TranslateOptions, TranslationResult, Translator, DEFAULT_CACHE_CAPACITY, DEFAULT_LANGUAGE,
};

// ── Convenience re-exports: pipeline entry points ────────────────────

pub use assemble::assemble;
pub use detect::detect;
pub use gloss::{confidence, gloss};
pub use group::group;
pub use translate::{translate_forward, translate_reverse};
pub use wire::{parse, serialize};
