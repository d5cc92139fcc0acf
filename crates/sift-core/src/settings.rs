//! Per-user categorization settings and their validation

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::MatchMethod;

/// Default minimum confidence for a match to be reported
pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.6;

/// How the engine behaves for one user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorizationSettings {
    /// Minimum winning score in [0, 1]
    pub confidence_threshold: f64,
    /// Whether imports should categorize automatically (consumed by the import path)
    pub auto_categorize_on_upload: bool,
    /// Methods the engine runs; empty means nothing ever matches
    pub enabled_methods: BTreeSet<MatchMethod>,
}

impl Default for CategorizationSettings {
    fn default() -> Self {
        Self {
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            auto_categorize_on_upload: true,
            enabled_methods: MatchMethod::all().iter().copied().collect(),
        }
    }
}

/// Partial settings update (None = leave unchanged)
///
/// Method names stay strings so unknown names can be reported by name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SettingsUpdate {
    pub confidence_threshold: Option<f64>,
    pub auto_categorize_on_upload: Option<bool>,
    pub enabled_methods: Option<Vec<String>>,
}

impl CategorizationSettings {
    /// Validate `update` and return the merged settings
    ///
    /// `self` is never modified; on error the caller keeps the previous settings.
    pub fn apply_update(&self, update: &SettingsUpdate) -> Result<Self> {
        let mut next = self.clone();

        if let Some(threshold) = update.confidence_threshold {
            validate_threshold(threshold)?;
            next.confidence_threshold = threshold;
        }

        if let Some(auto) = update.auto_categorize_on_upload {
            next.auto_categorize_on_upload = auto;
        }

        if let Some(ref names) = update.enabled_methods {
            next.enabled_methods = parse_methods(names)?;
        }

        Ok(next)
    }

    /// Threshold the engine actually applies
    ///
    /// Stored settings are validated on write, but settings built in code may not be.
    /// Out-of-range values are clamped and non-finite values use `fallback`.
    pub fn effective_threshold(&self, fallback: f64) -> f64 {
        if self.confidence_threshold.is_finite() {
            self.confidence_threshold.clamp(0.0, 1.0)
        } else {
            fallback.clamp(0.0, 1.0)
        }
    }

    pub fn is_enabled(&self, method: MatchMethod) -> bool {
        self.enabled_methods.contains(&method)
    }
}

/// Check that a confidence threshold is a finite value in [0, 1]
pub fn validate_threshold(threshold: f64) -> Result<()> {
    if !threshold.is_finite() || !(0.0..=1.0).contains(&threshold) {
        return Err(Error::Config(format!(
            "confidence_threshold must be between 0 and 1, got {}",
            threshold
        )));
    }
    Ok(())
}

/// Parse method names, rejecting any that are unknown
pub fn parse_methods(names: &[String]) -> Result<BTreeSet<MatchMethod>> {
    names
        .iter()
        .map(|name| name.parse::<MatchMethod>().map_err(Error::Config))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_enable_every_method() {
        let settings = CategorizationSettings::default();
        assert_eq!(settings.enabled_methods.len(), 4);
        assert_eq!(settings.confidence_threshold, DEFAULT_CONFIDENCE_THRESHOLD);
        assert!(settings.auto_categorize_on_upload);
    }

    #[test]
    fn test_apply_update_merges_fields() {
        let settings = CategorizationSettings::default();
        let update = SettingsUpdate {
            confidence_threshold: Some(0.8),
            enabled_methods: Some(vec!["keyword".into(), "jaccard".into()]),
            ..Default::default()
        };

        let next = settings.apply_update(&update).unwrap();
        assert_eq!(next.confidence_threshold, 0.8);
        assert!(next.is_enabled(MatchMethod::Keyword));
        assert!(next.is_enabled(MatchMethod::Jaccard));
        assert!(!next.is_enabled(MatchMethod::Levenshtein));
        // Untouched field is carried over
        assert!(next.auto_categorize_on_upload);
    }

    #[test]
    fn test_threshold_out_of_range_rejected() {
        let settings = CategorizationSettings::default();
        for bad in [1.5, -0.1, f64::NAN, f64::INFINITY] {
            let update = SettingsUpdate {
                confidence_threshold: Some(bad),
                ..Default::default()
            };
            assert!(matches!(
                settings.apply_update(&update),
                Err(Error::Config(_))
            ));
        }
        // Boundaries are valid
        assert!(validate_threshold(0.0).is_ok());
        assert!(validate_threshold(1.0).is_ok());
    }

    #[test]
    fn test_unknown_method_rejected() {
        let settings = CategorizationSettings::default();
        let update = SettingsUpdate {
            enabled_methods: Some(vec!["keyword".into(), "soundex".into()]),
            ..Default::default()
        };
        let err = settings.apply_update(&update).unwrap_err();
        assert!(err.to_string().contains("soundex"));
    }

    #[test]
    fn test_empty_method_list_is_valid() {
        let settings = CategorizationSettings::default();
        let update = SettingsUpdate {
            enabled_methods: Some(vec![]),
            ..Default::default()
        };
        let next = settings.apply_update(&update).unwrap();
        assert!(next.enabled_methods.is_empty());
    }

    #[test]
    fn test_effective_threshold_clamps() {
        let mut settings = CategorizationSettings::default();
        settings.confidence_threshold = 3.0;
        assert_eq!(settings.effective_threshold(0.6), 1.0);
        settings.confidence_threshold = -2.0;
        assert_eq!(settings.effective_threshold(0.6), 0.0);
        settings.confidence_threshold = f64::NAN;
        assert_eq!(settings.effective_threshold(0.6), 0.6);
    }
}
