//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `audit` - Audit log listing
//! - `categories` - Category management commands
//! - `categorize` - Single test, bulk preview and analysis
//! - `core` - Init and shared utilities (open_db, load_config)
//! - `serve` - Web server command
//! - `settings` - Categorization settings commands

pub mod audit;
pub mod categories;
pub mod categorize;
pub mod core;
pub mod serve;
pub mod settings;

// Re-export command functions for main.rs
pub use audit::*;
pub use categories::*;
pub use categorize::*;
pub use core::*;
pub use serve::*;
pub use settings::*;

/// Truncate a string to a maximum number of characters, adding "..." if truncated
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
