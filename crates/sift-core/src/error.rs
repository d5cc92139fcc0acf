//! Error types for Sift

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Database pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("Encryption error: {0}")]
    Encryption(String),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Import error: {0}")]
    Import(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Rejected settings or engine configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// A category pattern that cannot be used for matching
    #[error("Pattern error: {0}")]
    Pattern(String),

    #[error("Batch error: {0}")]
    Batch(String),

    #[error("Batch cancelled")]
    Cancelled,
}

impl Error {
    /// Whether the error was caused by caller input rather than the system
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::Config(_) | Self::InvalidData(_) | Self::Import(_) | Self::Csv(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
