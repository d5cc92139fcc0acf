//! Text normalization shared by every matching method
//!
//! Bank descriptions arrive as `"STARBUCKS STORE 0512 SEATTLE WA"` or
//! `"AMZN MKTP US*2A3B4"`. Normalization lower-cases ASCII, turns every
//! character outside `[a-z0-9]` into a separator, and collapses whitespace.
//! Noise filtering (numeric tokens, statement boilerplate) only affects the
//! token list, so whole-string comparisons still see the full text.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use crate::config::NormalizerConfig;

/// A description in every representation the matchers need
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedText {
    /// Input as given
    pub raw: String,
    /// ASCII lower-cased, punctuation replaced by spaces, whitespace collapsed
    pub lower: String,
    /// Tokens in order, duplicates kept (TF-IDF term counts)
    pub tokens: Vec<String>,
    /// Deduplicated tokens (Jaccard)
    pub token_set: BTreeSet<String>,
}

impl NormalizedText {
    /// True when nothing matchable is left after normalization
    pub fn is_blank(&self) -> bool {
        self.lower.is_empty()
    }

    /// Token occurrence counts
    pub fn term_counts(&self) -> BTreeMap<&str, usize> {
        let mut counts = BTreeMap::new();
        for token in &self.tokens {
            *counts.entry(token.as_str()).or_insert(0) += 1;
        }
        counts
    }

    /// Raw text with ASCII case folding only (non-ASCII characters kept)
    pub fn folded_raw(&self) -> String {
        self.raw.to_ascii_lowercase()
    }
}

/// Configured normalizer
#[derive(Debug, Clone)]
pub struct Normalizer {
    drop_numeric_tokens: bool,
    noise_tokens: HashSet<String>,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(&NormalizerConfig::default())
    }
}

impl Normalizer {
    pub fn new(config: &NormalizerConfig) -> Self {
        Self {
            drop_numeric_tokens: config.drop_numeric_tokens,
            noise_tokens: config
                .noise_tokens
                .iter()
                .map(|t| t.to_ascii_lowercase())
                .collect(),
        }
    }

    pub fn normalize(&self, text: &str) -> NormalizedText {
        let lower = clean(text);

        let tokens: Vec<String> = lower
            .split(' ')
            .filter(|t| !t.is_empty() && !self.is_noise(t))
            .map(str::to_string)
            .collect();
        let token_set = tokens.iter().cloned().collect();

        NormalizedText {
            raw: text.to_string(),
            lower,
            tokens,
            token_set,
        }
    }

    fn is_noise(&self, token: &str) -> bool {
        (self.drop_numeric_tokens && token.bytes().all(|b| b.is_ascii_digit()))
            || self.noise_tokens.contains(token)
    }
}

/// Normalize with the default configuration
pub fn normalize(text: &str) -> NormalizedText {
    Normalizer::default().normalize(text)
}

/// Lower-case, replace non-`[a-z0-9]` with spaces, collapse whitespace
fn clean(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_space = false;

    for c in text.chars() {
        let c = c.to_ascii_lowercase();
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
            out.push(c);
        } else {
            pending_space = true;
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lower_strips_punctuation_and_collapses_whitespace() {
        let text = normalize("  WHOLE   FOODS GROCERY #123 ");
        assert_eq!(text.lower, "whole foods grocery 123");
        assert_eq!(text.raw, "  WHOLE   FOODS GROCERY #123 ");
    }

    #[test]
    fn test_separator_characters_split_tokens() {
        let text = normalize("AMZN MKTP US*2A3B4");
        assert_eq!(text.lower, "amzn mktp us 2a3b4");
        let expected: BTreeSet<String> = ["amzn", "mktp", "us", "2a3b4"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(text.token_set, expected);
    }

    #[test]
    fn test_numeric_and_noise_tokens_dropped_from_tokens_only() {
        let text = normalize("POS DEBIT STARBUCKS STORE 0512 SEATTLE WA");
        assert_eq!(text.tokens, vec!["starbucks", "store", "seattle", "wa"]);
        // Whole-string form keeps everything
        assert!(text.lower.contains("0512"));
        assert!(text.lower.starts_with("pos debit"));
    }

    #[test]
    fn test_tokens_keep_duplicates_set_does_not() {
        let text = normalize("uber uber eats");
        assert_eq!(text.tokens.len(), 3);
        assert_eq!(text.token_set.len(), 2);
        assert_eq!(text.term_counts().get("uber"), Some(&2));
    }

    #[test]
    fn test_blank_inputs() {
        assert!(normalize("").is_blank());
        assert!(normalize("   \t ").is_blank());
        assert!(normalize("***").is_blank());
        assert!(!normalize("a").is_blank());
    }

    #[test]
    fn test_non_ascii_becomes_separator() {
        let text = normalize("CAFÉ RÖMER");
        assert_eq!(text.lower, "caf r mer");
        assert_eq!(text.folded_raw(), "cafÉ rÖmer");
    }

    #[test]
    fn test_custom_config() {
        let normalizer = Normalizer::new(&NormalizerConfig {
            drop_numeric_tokens: false,
            noise_tokens: vec!["STORE".into()],
        });
        let text = normalizer.normalize("Starbucks Store 0512");
        assert_eq!(text.tokens, vec!["starbucks", "0512"]);
    }

    #[test]
    fn test_deterministic() {
        let a = normalize("Trader Joe's #552 - Portland, OR");
        let b = normalize("Trader Joe's #552 - Portland, OR");
        assert_eq!(a, b);
    }
}
