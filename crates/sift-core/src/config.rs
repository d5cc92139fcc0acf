//! Engine configuration
//!
//! Config is loaded with a three-step resolution:
//! 1. An explicit path (e.g., `sift --config engine.toml`)
//! 2. The override in the data dir (~/.local/share/sift/config/engine.toml)
//! 3. Embedded defaults (compiled into binary)
//!
//! Every key is optional; missing keys keep their built-in default.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::MatchMethod;
use crate::settings::CategorizationSettings;

/// Embedded default config (compiled into binary)
const DEFAULT_CONFIG: &str = include_str!("../../../config/engine.toml");

/// Text normalization options
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizerConfig {
    /// Drop tokens made only of digits
    pub drop_numeric_tokens: bool,
    /// Tokens removed from the token list (compared after lower-casing)
    pub noise_tokens: Vec<String>,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            drop_numeric_tokens: true,
            noise_tokens: ["pos", "debit", "purchase", "card", "ach", "www", "com"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// Bulk categorization options
#[derive(Debug, Clone, PartialEq)]
pub struct BatchConfig {
    pub workers: usize,
    pub max_batch_size: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            max_batch_size: 5000,
        }
    }
}

/// Full engine configuration
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Levenshtein candidates at or below this similarity are discarded
    pub levenshtein_floor: f64,
    /// Skip similarity methods after a perfect keyword hit
    pub short_circuit_on_keyword: bool,
    pub normalizer: NormalizerConfig,
    pub batch: BatchConfig,
    /// Settings for users without stored settings
    pub defaults: CategorizationSettings,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            levenshtein_floor: 0.5,
            short_circuit_on_keyword: true,
            normalizer: NormalizerConfig::default(),
            batch: BatchConfig::default(),
            defaults: CategorizationSettings::default(),
        }
    }
}

impl EngineConfig {
    /// Load configuration, preferring `path`, then the data-dir override, then defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let content = match path {
            Some(path) => fs::read_to_string(path).map_err(|e| {
                Error::Config(format!("Failed to read config {}: {}", path.display(), e))
            })?,
            None => match default_config_path().filter(|p| p.exists()) {
                Some(override_path) => {
                    debug!("Loading engine config from {}", override_path.display());
                    fs::read_to_string(&override_path).map_err(|e| {
                        Error::Config(format!("Failed to read config: {}", e))
                    })?
                }
                None => DEFAULT_CONFIG.to_string(),
            },
        };

        Self::from_toml(&content)
    }

    /// Parse config from TOML content
    pub fn from_toml(content: &str) -> Result<Self> {
        let raw: RawConfig = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Invalid config TOML: {}", e)))?;

        let mut config = EngineConfig::default();

        if let Some(engine) = raw.engine {
            if let Some(floor) = engine.levenshtein_floor {
                if !(0.0..=1.0).contains(&floor) {
                    return Err(Error::Config(format!(
                        "levenshtein_floor must be between 0 and 1, got {}",
                        floor
                    )));
                }
                config.levenshtein_floor = floor;
            }
            if let Some(short_circuit) = engine.short_circuit_on_keyword {
                config.short_circuit_on_keyword = short_circuit;
            }
        }

        if let Some(normalizer) = raw.normalizer {
            if let Some(drop_numeric) = normalizer.drop_numeric_tokens {
                config.normalizer.drop_numeric_tokens = drop_numeric;
            }
            if let Some(noise) = normalizer.noise_tokens {
                config.normalizer.noise_tokens =
                    noise.into_iter().map(|t| t.to_ascii_lowercase()).collect();
            }
        }

        if let Some(batch) = raw.batch {
            if let Some(workers) = batch.workers {
                if workers == 0 {
                    return Err(Error::Config("batch.workers must be at least 1".into()));
                }
                config.batch.workers = workers;
            }
            if let Some(max) = batch.max_batch_size {
                config.batch.max_batch_size = max;
            }
        }

        if let Some(defaults) = raw.defaults {
            if let Some(threshold) = defaults.confidence_threshold {
                if !threshold.is_finite() || !(0.0..=1.0).contains(&threshold) {
                    return Err(Error::Config(format!(
                        "defaults.confidence_threshold must be between 0 and 1, got {}",
                        threshold
                    )));
                }
                config.defaults.confidence_threshold = threshold;
            }
            if let Some(auto) = defaults.auto_categorize_on_upload {
                config.defaults.auto_categorize_on_upload = auto;
            }
            if let Some(methods) = defaults.enabled_methods {
                config.defaults.enabled_methods = methods
                    .iter()
                    .map(|m| m.parse::<MatchMethod>().map_err(Error::Config))
                    .collect::<Result<_>>()?;
            }
        }

        Ok(config)
    }
}

/// Default config override path
pub fn default_config_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("sift").join("config").join("engine.toml"))
}

/// Raw config structure for TOML parsing
#[derive(Debug, Deserialize)]
struct RawConfig {
    engine: Option<RawEngine>,
    normalizer: Option<RawNormalizer>,
    batch: Option<RawBatch>,
    defaults: Option<RawDefaults>,
}

#[derive(Debug, Deserialize)]
struct RawEngine {
    levenshtein_floor: Option<f64>,
    short_circuit_on_keyword: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct RawNormalizer {
    drop_numeric_tokens: Option<bool>,
    noise_tokens: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct RawBatch {
    workers: Option<usize>,
    max_batch_size: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct RawDefaults {
    confidence_threshold: Option<f64>,
    auto_categorize_on_upload: Option<bool>,
    enabled_methods: Option<Vec<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_config_matches_builtin_defaults() {
        let config = EngineConfig::from_toml(DEFAULT_CONFIG).unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config = EngineConfig::from_toml(
            r#"
            [engine]
            levenshtein_floor = 0.7
            "#,
        )
        .unwrap();

        assert_eq!(config.levenshtein_floor, 0.7);
        assert!(config.short_circuit_on_keyword);
        assert_eq!(config.batch, BatchConfig::default());
    }

    #[test]
    fn test_defaults_section() {
        let config = EngineConfig::from_toml(
            r#"
            [defaults]
            confidence_threshold = 0.8
            enabled_methods = ["keyword", "jaccard"]
            "#,
        )
        .unwrap();

        assert_eq!(config.defaults.confidence_threshold, 0.8);
        assert_eq!(config.defaults.enabled_methods.len(), 2);
        assert!(config
            .defaults
            .enabled_methods
            .contains(&MatchMethod::Jaccard));
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(
            EngineConfig::from_toml("[defaults]\nconfidence_threshold = 1.5"),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            EngineConfig::from_toml("[defaults]\nenabled_methods = [\"telepathy\"]"),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            EngineConfig::from_toml("[batch]\nworkers = 0"),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            EngineConfig::from_toml("not = [valid"),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_load_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.toml");
        fs::write(&path, "[batch]\nworkers = 2\n").unwrap();

        let config = EngineConfig::load(Some(&path)).unwrap();
        assert_eq!(config.batch.workers, 2);

        let missing = dir.path().join("missing.toml");
        assert!(EngineConfig::load(Some(&missing)).is_err());
    }
}
