//! Core command implementations and shared utilities
//!
//! This module contains:
//! - `open_db` - Shared utility to open the database
//! - `load_config` - Resolve the engine configuration
//! - `cmd_init` - Initialize the database

use std::path::Path;

use anyhow::{Context, Result};
use sift_core::{Database, EngineConfig};
use tracing::debug;

/// Open database with encryption by default, or unencrypted if --no-encrypt
pub fn open_db(db_path: &Path, no_encrypt: bool) -> Result<Database> {
    let path_str = db_path
        .to_str()
        .context("Database path must be valid UTF-8")?;
    if no_encrypt {
        Database::new_unencrypted(path_str).context("Failed to open database (unencrypted)")
    } else {
        Database::new(path_str).context("Failed to open database")
    }
}

/// Load the engine config from `--config`, the data-dir override, or built-in defaults
pub fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    let config = EngineConfig::load(path).context("Failed to load engine config")?;
    debug!(
        "Engine config: levenshtein_floor={}, workers={}, default threshold={}",
        config.levenshtein_floor, config.batch.workers, config.defaults.confidence_threshold
    );
    Ok(config)
}

pub fn cmd_init(db_path: &Path, no_encrypt: bool) -> Result<()> {
    println!("🔧 Initializing database at {}...", db_path.display());

    let db = open_db(db_path, no_encrypt)?;

    let seeded = db
        .seed_system_categories()
        .context("Failed to seed system categories")?;
    println!("   Seeded {} system categories", seeded);

    if db.is_encrypted().context("Failed to check encryption status")? {
        println!("   🔒 Encryption: ENABLED");
    } else if no_encrypt {
        println!("   ⚠️  Encryption: DISABLED (--no-encrypt)");
    } else {
        println!("   ⚠️  Encryption: NOT ACTIVE");
    }

    println!("✅ Database initialized successfully!");
    println!();
    println!("Next steps:");
    println!("  1. Add categories: sift categories add Coffee --keywords coffee,espresso");
    println!("  2. Try a description: sift test \"STARBUCKS 0512 SEATTLE\" --stats");
    println!("  3. Preview an import: sift preview --file statement.csv");

    Ok(())
}
