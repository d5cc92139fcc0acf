//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use sift_core::models::CategoryType;

/// Sift - Explainable transaction categorization
#[derive(Parser)]
#[command(name = "sift")]
#[command(about = "Deterministic transaction categorization engine", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Database path
    #[arg(long, default_value = "sift.db", global = true)]
    pub db: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable database encryption (not recommended for production)
    ///
    /// By default, the database is encrypted using SQLCipher.
    /// Set SIFT_DB_KEY environment variable with your passphrase.
    /// Use --no-encrypt only for development or testing.
    #[arg(long, global = true)]
    pub no_encrypt: bool,

    /// User whose categories and settings are used
    #[arg(long, default_value = "local-dev", global = true)]
    pub user: String,

    /// Engine config file (defaults to the data-dir override, then built-in defaults)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database and seed system categories
    Init,

    /// Manage categories (list, add, update, delete)
    Categories {
        #[command(subcommand)]
        action: Option<CategoriesAction>,
    },

    /// Show or change categorization settings
    Settings {
        #[command(subcommand)]
        action: Option<SettingsAction>,
    },

    /// Categorize a single description
    Test {
        /// Transaction description
        text: String,

        /// Merchant name (preferred over the description when present)
        #[arg(long)]
        merchant: Option<String>,

        /// Show the per-method breakdown
        #[arg(long)]
        stats: bool,
    },

    /// Preview categorization of a CSV file before importing it
    Preview {
        /// CSV file with a description column (merchant, amount, category_id optional)
        #[arg(short, long)]
        file: PathBuf,

        /// Replace categories already present in the file
        #[arg(long)]
        overwrite_existing: bool,

        /// Print the full preview as JSON
        #[arg(long)]
        json: bool,
    },

    /// Analyze how well a list of descriptions categorizes
    Analyze {
        /// Text file with one description per line
        #[arg(short, long)]
        file: PathBuf,

        /// Print the full analysis as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show recent audit log entries
    Audit {
        /// Number of entries to show
        #[arg(short, long, default_value = "20")]
        limit: i64,
    },

    /// Start the web server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Directory containing static files to serve (e.g., ui/dist)
        #[arg(long)]
        static_dir: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
pub enum CategoriesAction {
    /// List active categories
    List {
        /// Include deactivated categories
        #[arg(long)]
        all: bool,
    },

    /// Add a user category
    Add {
        /// Category name
        name: String,

        /// Category type: income, expense, transfer
        #[arg(long = "type", default_value = "expense")]
        category_type: CategoryType,

        /// Comma-separated keywords (e.g., "grocery,supermarket")
        #[arg(long, value_delimiter = ',')]
        keywords: Vec<String>,

        /// Comma-separated merchant patterns; prefix with "re:" for a regex
        #[arg(long, value_delimiter = ',')]
        patterns: Vec<String>,
    },

    /// Update a user category
    Update {
        /// Category ID
        id: i64,

        /// New name
        #[arg(long)]
        name: Option<String>,

        /// New type: income, expense, transfer
        #[arg(long = "type")]
        category_type: Option<CategoryType>,

        /// Replace keywords (comma-separated)
        #[arg(long, value_delimiter = ',')]
        keywords: Option<Vec<String>>,

        /// Replace merchant patterns (comma-separated)
        #[arg(long, value_delimiter = ',')]
        patterns: Option<Vec<String>>,

        /// Activate the category
        #[arg(long, conflicts_with = "deactivate")]
        activate: bool,

        /// Deactivate the category (hidden from matching)
        #[arg(long)]
        deactivate: bool,
    },

    /// Delete a user category
    Delete {
        /// Category ID
        id: i64,
    },
}

#[derive(Subcommand)]
pub enum SettingsAction {
    /// Show current settings
    Show,

    /// Change settings (unspecified values are kept)
    Set {
        /// Minimum confidence in [0, 1]
        #[arg(long)]
        threshold: Option<f64>,

        /// Auto-categorize on upload
        #[arg(long)]
        auto: Option<bool>,

        /// Comma-separated methods: keyword, cosine_tfidf, jaccard, levenshtein
        /// (pass "" to disable all)
        #[arg(long, value_delimiter = ',')]
        methods: Option<Vec<String>>,
    },
}
