//! Configuration file format for `molt`.
//!
//! Every section and key is optional; missing values take their defaults.
//! Unknown keys are rejected.
//!
//! # Example
//!
//! ```toml
//! [translate]
//! enable_cache = true
//! human_language = "en"
//! strict_mode = false
//! cache_capacity = 1024
//!
//! [validate]
//! validation_threshold = 0.95
//! min_token_efficiency = 0.5
//! roundtrip_similarity = 0.9
//!
//! [serve]
//! port = 8080
//! ```

use std::path::{Path, PathBuf};

use molt_core::{TranslateOptions, Translator, DEFAULT_CACHE_CAPACITY, DEFAULT_LANGUAGE};
use molt_validate::Thresholds;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Environment variable naming a config file when `--config` is not given.
pub const CONFIG_ENV: &str = "MOLT_CONFIG";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read '{}': {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("could not parse '{}': {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("{field} must be between 0 and 1, got {value}")]
    OutOfRange { field: &'static str, value: f64 },
}

// ── Types ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MoltConfig {
    pub translate: TranslateSettings,
    pub validate: ValidateSettings,
    pub serve: ServeSettings,
}

/// `[translate]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TranslateSettings {
    pub enable_cache: bool,
    /// Only "en" is modeled; anything else is treated as "en".
    pub human_language: String,
    /// Reserved; no rule reads it yet.
    pub strict_mode: bool,
    /// Most forward results kept in memory; 0 disables the cache.
    pub cache_capacity: usize,
}

impl Default for TranslateSettings {
    fn default() -> Self {
        TranslateSettings {
            enable_cache: true,
            human_language: DEFAULT_LANGUAGE.to_string(),
            strict_mode: false,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

/// `[validate]` section. All values lie in `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ValidateSettings {
    pub validation_threshold: f64,
    pub min_token_efficiency: f64,
    pub roundtrip_similarity: f64,
}

impl Default for ValidateSettings {
    fn default() -> Self {
        let t = Thresholds::default();
        ValidateSettings {
            validation_threshold: t.validation_threshold,
            min_token_efficiency: t.min_token_efficiency,
            roundtrip_similarity: t.roundtrip_similarity,
        }
    }
}

/// `[serve]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServeSettings {
    pub port: u16,
}

impl Default for ServeSettings {
    fn default() -> Self {
        ServeSettings { port: 8080 }
    }
}

// ── Functions ─────────────────────────────────────────────────────────────────

impl MoltConfig {
    /// Load from `explicit`, else from `$MOLT_CONFIG`, else defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let from_env = std::env::var_os(CONFIG_ENV).map(PathBuf::from);
        match explicit.map(Path::to_path_buf).or(from_env) {
            Some(path) => Self::read(&path),
            None => Ok(MoltConfig::default()),
        }
    }

    /// Read and check a config file.
    pub fn read(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: MoltConfig = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.check()?;
        Ok(config)
    }

    fn check(&self) -> Result<(), ConfigError> {
        let v = &self.validate;
        for (field, value) in [
            ("validation_threshold", v.validation_threshold),
            ("min_token_efficiency", v.min_token_efficiency),
            ("roundtrip_similarity", v.roundtrip_similarity),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::OutOfRange { field, value });
            }
        }
        if self.translate.human_language != DEFAULT_LANGUAGE {
            warn!(
                language = %self.translate.human_language,
                "only the en language profile is implemented, using en"
            );
        }
        Ok(())
    }

    pub fn translate_options(&self) -> TranslateOptions {
        TranslateOptions {
            enable_cache: self.translate.enable_cache,
            human_language: self.translate.human_language.clone(),
            strict: self.translate.strict_mode,
        }
    }

    /// A translator sized by `[translate] cache_capacity`.
    pub fn translator(&self) -> Translator {
        Translator::with_capacity(self.translate.cache_capacity)
    }

    pub fn thresholds(&self) -> Thresholds {
        Thresholds {
            validation_threshold: self.validate.validation_threshold,
            min_token_efficiency: self.validate.min_token_efficiency,
            roundtrip_similarity: self.validate.roundtrip_similarity,
        }
    }
}
