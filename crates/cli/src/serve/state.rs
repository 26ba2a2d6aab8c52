//! Application state shared across request handlers.

use molt_core::{TranslateOptions, Translator};
use molt_validate::Validator;

pub(crate) struct AppState {
    /// Shared translator; its bounded forward cache is internally locked.
    pub(crate) translator: Translator,
    pub(crate) validator: Validator,
    /// Options from the `[translate]` config section.
    pub(crate) options: TranslateOptions,
}

impl AppState {
    pub(crate) fn new(
        translator: Translator,
        validator: Validator,
        options: TranslateOptions,
    ) -> Self {
        AppState {
            translator,
            validator,
            options,
        }
    }
}
