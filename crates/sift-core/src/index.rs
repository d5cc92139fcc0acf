//! Prepared, read-only view of a user's categories
//!
//! Building the index normalizes every keyword and merchant pattern once,
//! compiles opt-in regex patterns, and builds the TF-IDF corpus. The result
//! is immutable and shared across batch workers without locking.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use regex::{Regex, RegexBuilder};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::matchers::tfidf::TfidfCorpus;
use crate::models::{Category, MatchType};
use crate::normalize::{NormalizedText, Normalizer};

/// Prefix marking a merchant pattern as a regular expression
pub const REGEX_PATTERN_PREFIX: &str = "re:";

/// Upper bound on compiled regex size for one pattern
const REGEX_SIZE_LIMIT: usize = 1 << 20;

/// A literal keyword or merchant pattern, normalized
#[derive(Debug, Clone)]
pub struct IndexedTerm {
    /// The string as defined on the category
    pub text: String,
    pub normalized: NormalizedText,
    pub match_type: MatchType,
    /// Folded raw text, set only for terms containing non-ASCII characters
    pub folded: Option<String>,
    /// Position of this term in the TF-IDF corpus
    pub document: Option<usize>,
}

/// A compiled `re:` merchant pattern
#[derive(Debug, Clone)]
pub struct RegexPattern {
    /// The pattern as defined on the category, prefix included
    pub text: String,
    pub regex: Regex,
}

/// One category that takes part in auto-categorization
#[derive(Debug, Clone)]
pub struct IndexedCategory {
    pub id: i64,
    pub name: String,
    pub is_system: bool,
    pub terms: Vec<IndexedTerm>,
    pub regexes: Vec<RegexPattern>,
    /// Regex patterns that failed to compile
    pub pattern_errors: Vec<String>,
}

/// Immutable corpus of categories for one categorization request or batch
#[derive(Debug, Clone)]
pub struct CategoryIndex {
    categories: Vec<IndexedCategory>,
    tfidf: TfidfCorpus,
    version: String,
}

impl CategoryIndex {
    /// Build the index, skipping inactive categories and categories with nothing to match
    pub fn build(categories: &[Category], normalizer: &Normalizer) -> Self {
        let version = category_set_version(categories);

        let mut sorted: Vec<&Category> = categories.iter().filter(|c| c.is_active).collect();
        sorted.sort_by_key(|c| c.id);

        let mut indexed = Vec::with_capacity(sorted.len());
        let mut documents: Vec<NormalizedText> = Vec::new();

        for category in sorted {
            let mut entry = IndexedCategory {
                id: category.id,
                name: category.name.clone(),
                is_system: category.is_system_category,
                terms: Vec::new(),
                regexes: Vec::new(),
                pattern_errors: Vec::new(),
            };

            let keywords = category.keywords.iter().map(|k| (k, MatchType::Keyword));
            let patterns = category
                .merchant_patterns
                .iter()
                .map(|p| (p, MatchType::MerchantPattern));

            for (text, match_type) in keywords.chain(patterns) {
                if let Some(expr) = text.trim().strip_prefix(REGEX_PATTERN_PREFIX) {
                    if match_type == MatchType::MerchantPattern {
                        match compile_pattern(expr) {
                            Ok(regex) => entry.regexes.push(RegexPattern {
                                text: text.clone(),
                                regex,
                            }),
                            Err(e) => {
                                warn!(
                                    category = %category.name,
                                    pattern = %text,
                                    "Invalid merchant pattern: {}",
                                    e
                                );
                                entry.pattern_errors.push(format!("{}: {}", text, e));
                            }
                        }
                        continue;
                    }
                }

                let normalized = normalizer.normalize(text);
                let folded = if text.is_ascii() {
                    None
                } else {
                    Some(text.trim().to_ascii_lowercase()).filter(|f| !f.is_empty())
                };

                if normalized.is_blank() && folded.is_none() {
                    continue;
                }

                let document = if normalized.tokens.is_empty() {
                    None
                } else {
                    documents.push(normalized.clone());
                    Some(documents.len() - 1)
                };

                entry.terms.push(IndexedTerm {
                    text: text.clone(),
                    normalized,
                    match_type,
                    folded,
                    document,
                });
            }

            let participates = !entry.terms.is_empty()
                || !entry.regexes.is_empty()
                || !entry.pattern_errors.is_empty();
            if participates {
                indexed.push(entry);
            } else {
                debug!(
                    "Skipping category '{}' (no keywords or patterns)",
                    category.name
                );
            }
        }

        let tfidf = TfidfCorpus::build(&documents);

        Self {
            categories: indexed,
            tfidf,
            version,
        }
    }

    /// Participating categories, ordered by id
    pub fn categories(&self) -> &[IndexedCategory] {
        &self.categories
    }

    pub fn tfidf(&self) -> &TfidfCorpus {
        &self.tfidf
    }

    /// Version hash of the category set this index was built from
    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn get(&self, category_id: i64) -> Option<&IndexedCategory> {
        self.categories
            .binary_search_by_key(&category_id, |c| c.id)
            .ok()
            .map(|i| &self.categories[i])
    }
}

/// Reject a `re:` merchant pattern that would not compile
///
/// Literal patterns are always valid.
pub fn validate_merchant_pattern(pattern: &str) -> Result<()> {
    match pattern.trim().strip_prefix(REGEX_PATTERN_PREFIX) {
        Some(expr) => compile_pattern(expr)
            .map(|_| ())
            .map_err(|e| Error::InvalidData(format!("Invalid merchant pattern '{}': {}", pattern, e))),
        None => Ok(()),
    }
}

fn compile_pattern(expr: &str) -> std::result::Result<Regex, regex::Error> {
    RegexBuilder::new(expr)
        .case_insensitive(true)
        .size_limit(REGEX_SIZE_LIMIT)
        .build()
}

/// Content hash identifying a category set, independent of input order
pub fn category_set_version(categories: &[Category]) -> String {
    let mut sorted: Vec<&Category> = categories.iter().collect();
    sorted.sort_by_key(|c| c.id);

    let mut hasher = Sha256::new();
    for category in sorted {
        hasher.update(category.id.to_le_bytes());
        hasher.update(category.updated_at.timestamp_micros().to_le_bytes());
        hasher.update([category.is_active as u8, category.is_system_category as u8]);
        hasher.update(category.name.as_bytes());
        hasher.update([0u8]);
        for keyword in &category.keywords {
            hasher.update(keyword.as_bytes());
            hasher.update([1u8]);
        }
        for pattern in &category.merchant_patterns {
            hasher.update(pattern.as_bytes());
            hasher.update([2u8]);
        }
        hasher.update([3u8]);
    }

    hex::encode(hasher.finalize())
}

/// Memoized indexes keyed by category-set version
///
/// All indexes in one cache must be built with the same normalizer.
pub struct IndexCache {
    capacity: usize,
    entries: Mutex<HashMap<String, Arc<CategoryIndex>>>,
}

impl IndexCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Return the cached index for this category set, building it on a miss
    pub fn get_or_build(&self, categories: &[Category], normalizer: &Normalizer) -> Arc<CategoryIndex> {
        let version = category_set_version(categories);

        {
            let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
            if let Some(index) = entries.get(&version) {
                debug!("Category index cache hit ({})", &version[..12]);
                return Arc::clone(index);
            }
        }

        let index = Arc::new(CategoryIndex::build(categories, normalizer));

        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        if entries.len() >= self.capacity {
            // Versions are content hashes, so dropping everything only costs rebuilds
            entries.clear();
        }
        entries.insert(version, Arc::clone(&index));

        index
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::CategoryType;
    use chrono::Utc;

    pub(crate) fn category(id: i64, name: &str, keywords: &[&str], patterns: &[&str]) -> Category {
        Category {
            id,
            user_id: Some("alice".to_string()),
            name: name.to_string(),
            category_type: CategoryType::Expense,
            keywords: keywords.iter().map(|s| s.to_string()).collect(),
            merchant_patterns: patterns.iter().map(|s| s.to_string()).collect(),
            is_system_category: false,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_empty_categories_are_skipped() {
        let categories = vec![
            category(1, "Groceries", &["grocery"], &[]),
            category(2, "Empty", &[], &[]),
            category(3, "Blank", &["  ", "#"], &[]),
        ];
        let index = CategoryIndex::build(&categories, &Normalizer::default());

        assert_eq!(index.len(), 1);
        assert_eq!(index.categories()[0].name, "Groceries");
        assert!(index.get(2).is_none());
    }

    #[test]
    fn test_inactive_categories_are_skipped() {
        let mut inactive = category(1, "Old", &["old"], &[]);
        inactive.is_active = false;
        let index = CategoryIndex::build(&[inactive], &Normalizer::default());
        assert!(index.is_empty());
    }

    #[test]
    fn test_categories_sorted_by_id() {
        let categories = vec![
            category(9, "Nine", &["nine"], &[]),
            category(2, "Two", &["two"], &[]),
        ];
        let index = CategoryIndex::build(&categories, &Normalizer::default());
        let ids: Vec<i64> = index.categories().iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![2, 9]);
        assert_eq!(index.get(9).unwrap().name, "Nine");
    }

    #[test]
    fn test_regex_patterns_compiled_and_errors_recorded() {
        let categories = vec![
            category(1, "Streaming", &[], &["re:^netflix", "hulu"]),
            category(2, "Broken", &["broken"], &["re:(unclosed"]),
        ];
        let index = CategoryIndex::build(&categories, &Normalizer::default());

        let streaming = index.get(1).unwrap();
        assert_eq!(streaming.regexes.len(), 1);
        assert_eq!(streaming.terms.len(), 1);

        let broken = index.get(2).unwrap();
        assert!(broken.regexes.is_empty());
        assert_eq!(broken.pattern_errors.len(), 1);
        assert_eq!(broken.terms.len(), 1);
    }

    #[test]
    fn test_validate_merchant_pattern() {
        assert!(validate_merchant_pattern("Trader Joe's (*").is_ok());
        assert!(validate_merchant_pattern(r"re:^sq \*").is_ok());
        assert!(matches!(
            validate_merchant_pattern("re:(unclosed"),
            Err(Error::InvalidData(_))
        ));
    }

    #[test]
    fn test_version_is_order_insensitive_and_content_sensitive() {
        let a = category(1, "A", &["a"], &[]);
        let b = category(2, "B", &["b"], &[]);

        let v1 = category_set_version(&[a.clone(), b.clone()]);
        let v2 = category_set_version(&[b.clone(), a.clone()]);
        assert_eq!(v1, v2);

        let mut changed = b.clone();
        changed.keywords.push("bee".into());
        assert_ne!(v1, category_set_version(&[a, changed]));
    }

    #[test]
    fn test_index_cache_reuses_by_version() {
        let cache = IndexCache::new(4);
        let normalizer = Normalizer::default();
        let categories = vec![category(1, "Groceries", &["grocery"], &[])];

        let first = cache.get_or_build(&categories, &normalizer);
        let second = cache.get_or_build(&categories, &normalizer);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);

        let mut changed = categories.clone();
        changed[0].keywords.push("supermarket".into());
        let third = cache.get_or_build(&changed, &normalizer);
        assert!(!Arc::ptr_eq(&first, &third));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_index_cache_bounded() {
        let cache = IndexCache::new(1);
        let normalizer = Normalizer::default();
        cache.get_or_build(&[category(1, "A", &["a"], &[])], &normalizer);
        cache.get_or_build(&[category(2, "B", &["b"], &[])], &normalizer);
        assert_eq!(cache.len(), 1);
    }
}
