//! Sift Core Library
//!
//! Deterministic, explainable transaction categorization:
//! - Text normalization shared by every matcher
//! - Keyword/pattern, Jaccard, Levenshtein and TF-IDF cosine matchers
//! - Categorization engine with tie-break and threshold policy
//! - Batch preview, analysis and apply over a bounded worker pool
//! - Category and settings storage with migrations
//! - Engine configuration with embedded defaults

pub mod batch;
pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod import;
pub mod index;
pub mod matchers;
pub mod models;
pub mod normalize;
pub mod settings;

pub use batch::BatchCoordinator;
pub use config::{BatchConfig, EngineConfig, NormalizerConfig};
pub use db::{AuditEntry, Database};
pub use engine::{select_best, CategorizationEngine};
pub use error::{Error, Result};
pub use import::{parse_descriptions, parse_transactions_csv};
pub use index::{category_set_version, CategoryIndex, IndexCache};
pub use matchers::{jaccard, levenshtein_score, MatchContext};
pub use normalize::{normalize, NormalizedText, Normalizer};
pub use settings::{CategorizationSettings, SettingsUpdate};
