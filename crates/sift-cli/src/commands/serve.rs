//! Server command implementation

use std::path::Path;

use anyhow::{Context, Result};
use sift_core::EngineConfig;

use super::open_db;

pub async fn cmd_serve(
    db_path: &Path,
    config: EngineConfig,
    host: &str,
    port: u16,
    no_encrypt: bool,
    static_dir: Option<&Path>,
) -> Result<()> {
    println!("🚀 Starting Sift web server...");
    println!("   Database: {}", db_path.display());
    println!("   Listening: http://{}:{}", host, port);
    if let Some(dir) = static_dir {
        println!("   Static files: {}", dir.display());
    }
    println!(
        "   Batch workers: {} (max batch {})",
        config.batch.workers, config.batch.max_batch_size
    );
    println!("   Requests without an x-sift-user header act as 'local-dev'");
    if no_encrypt {
        println!("   ⚠️  Encryption DISABLED (--no-encrypt)");
    }
    println!();
    println!("   Press Ctrl+C to stop");

    let db = open_db(db_path, no_encrypt)?;

    let static_dir_str = static_dir
        .map(|p| p.to_str().context("static_dir path must be valid UTF-8"))
        .transpose()?;
    sift_server::serve(db, config, host, port, static_dir_str).await?;

    Ok(())
}
