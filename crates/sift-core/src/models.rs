//! Domain models for Sift

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ========== Category Models ==========

/// Kind of money movement a category describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoryType {
    Income,
    Expense,
    Transfer,
}

impl CategoryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
            Self::Transfer => "transfer",
        }
    }
}

impl std::str::FromStr for CategoryType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "income" => Ok(Self::Income),
            "expense" => Ok(Self::Expense),
            "transfer" => Ok(Self::Transfer),
            _ => Err(format!("Unknown category type: {}", s)),
        }
    }
}

/// A spending bucket, either owned by one user or shared system-wide
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    /// Owning user (None = system category)
    pub user_id: Option<String>,
    pub name: String,
    pub category_type: CategoryType,
    /// Words that, when found in a description, identify this category
    pub keywords: Vec<String>,
    /// Merchant names or fragments. A `re:` prefix marks a regular expression.
    pub merchant_patterns: Vec<String>,
    /// System categories are not user-editable or deletable
    pub is_system_category: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields for creating a user category
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCategory {
    pub name: String,
    pub category_type: CategoryType,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub merchant_patterns: Vec<String>,
}

/// Partial update of a user category (None = leave unchanged)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CategoryUpdate {
    pub name: Option<String>,
    pub category_type: Option<CategoryType>,
    pub keywords: Option<Vec<String>>,
    pub merchant_patterns: Option<Vec<String>>,
    pub is_active: Option<bool>,
}

// ========== Matching Models ==========

/// Matching technique that produced a candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMethod {
    /// Exact keyword or merchant-pattern hit
    Keyword,
    /// Token-set overlap
    Jaccard,
    /// Whole-string edit distance
    Levenshtein,
    /// Cosine similarity of TF-IDF vectors
    CosineTfidf,
}

impl MatchMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Keyword => "keyword",
            Self::Jaccard => "jaccard",
            Self::Levenshtein => "levenshtein",
            Self::CosineTfidf => "cosine_tfidf",
        }
    }

    /// All methods, in tie-break priority order (most trusted first)
    pub fn all() -> &'static [MatchMethod] {
        &[
            Self::Keyword,
            Self::CosineTfidf,
            Self::Jaccard,
            Self::Levenshtein,
        ]
    }

    /// Tie-break rank when two candidates score the same (higher wins)
    pub fn priority(&self) -> u8 {
        match self {
            Self::Keyword => 4,
            Self::CosineTfidf => 3,
            Self::Jaccard => 2,
            Self::Levenshtein => 1,
        }
    }
}

impl std::fmt::Display for MatchMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MatchMethod {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "keyword" => Ok(Self::Keyword),
            "jaccard" => Ok(Self::Jaccard),
            "levenshtein" => Ok(Self::Levenshtein),
            "cosine_tfidf" => Ok(Self::CosineTfidf),
            _ => Err(format!("Unknown match method: {}", s)),
        }
    }
}

/// Which category field a candidate's matched text came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    Keyword,
    MerchantPattern,
}

/// One method's proposed category for an input, before selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchCandidate {
    pub category_id: i64,
    /// The keyword or pattern (as defined on the category) that produced the hit
    pub matched_text: String,
    pub match_type: MatchType,
    pub method: MatchMethod,
    /// Similarity in [0, 1]
    pub score: f64,
}

/// The engine's selected match for one input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryMatchResult {
    pub category_id: i64,
    pub category_name: String,
    pub match_type: MatchType,
    pub matched_text: String,
    pub confidence: f64,
    pub similarity_type: MatchMethod,
}

/// Per-method breakdown for diagnostic categorization runs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MethodBreakdown {
    pub method: MatchMethod,
    pub candidates: usize,
    pub best: Option<MatchCandidate>,
}

/// Output of a single-string diagnostic categorization
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategorizationTest {
    pub result: Option<CategoryMatchResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<Vec<MethodBreakdown>>,
}

// ========== Batch Models ==========

/// A transaction submitted for bulk categorization
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PreviewTransaction {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub merchant_name: Option<String>,
    #[serde(default)]
    pub amount: Option<f64>,
    /// Category already assigned (e.g., by hand) before the import
    #[serde(default)]
    pub category_id: Option<i64>,
}

/// Preview of one transaction in a bulk import
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewItem {
    pub description: String,
    pub merchant_name: Option<String>,
    pub amount: Option<f64>,
    pub existing_category_id: Option<i64>,
    pub result: Option<CategoryMatchResult>,
    /// Whether committing the import would set this transaction's category
    pub would_be_categorized: bool,
}

/// Result of previewing a bulk categorization
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategorizationPreview {
    pub total_transactions: usize,
    pub will_be_categorized: usize,
    /// Items for which the engine produced any suggestion
    pub suggested: usize,
    /// Items that arrived with a category already set
    pub already_categorized: usize,
    /// `suggested / total_transactions`, matching the analysis rate
    pub success_rate: f64,
    /// Whether suggestions replace pre-existing categories
    pub overwrite_existing: bool,
    pub items: Vec<PreviewItem>,
}

/// Analysis result for one description
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisItem {
    pub description: String,
    pub result: Option<CategoryMatchResult>,
    pub would_be_categorized: bool,
}

/// Result of analyzing how well a set of descriptions categorizes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategorizationAnalysis {
    pub total_transactions: usize,
    pub successful_categorizations: usize,
    pub success_rate: f64,
    /// Mean confidence over successful categorizations (0 when none)
    pub average_confidence: f64,
    /// Winning method counts
    pub method_stats: BTreeMap<MatchMethod, usize>,
    pub results: Vec<AnalysisItem>,
}

/// A human correction applied on top of a preview
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryOverride {
    /// Position of the transaction in the preview
    pub index: usize,
    /// Category to assign (None = leave uncategorized)
    pub category_id: Option<i64>,
}

/// Where a committed category came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionSource {
    Existing,
    Suggested,
    Override,
    Unassigned,
}

/// What the caller should store for one transaction after review
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategorizationDecision {
    pub index: usize,
    pub description: String,
    pub category_id: Option<i64>,
    pub confidence_score: Option<f64>,
    pub needs_review: bool,
    pub source: DecisionSource,
}
