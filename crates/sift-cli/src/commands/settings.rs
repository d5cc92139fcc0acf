//! Settings command implementations

use anyhow::{Context, Result};
use sift_core::db::Database;
use sift_core::models::MatchMethod;
use sift_core::{CategorizationSettings, EngineConfig, SettingsUpdate};

pub fn cmd_settings_show(db: &Database, user: &str, config: &EngineConfig) -> Result<()> {
    let settings = db.get_settings(user, &config.defaults)?;
    print_settings(user, &settings);
    Ok(())
}

pub fn cmd_settings_set(
    db: &Database,
    user: &str,
    config: &EngineConfig,
    threshold: Option<f64>,
    auto: Option<bool>,
    methods: Option<Vec<String>>,
) -> Result<()> {
    let update = SettingsUpdate {
        confidence_threshold: threshold,
        auto_categorize_on_upload: auto,
        // `--methods ""` arrives as a single empty value
        enabled_methods: methods.map(|names| {
            names
                .into_iter()
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty())
                .collect()
        }),
    };

    let settings = db
        .update_settings(user, &update, &config.defaults)
        .context("Settings not changed")?;

    db.log_audit(user, "update", Some("settings"), None, None)?;
    println!("✅ Settings updated");
    print_settings(user, &settings);

    Ok(())
}

fn print_settings(user: &str, settings: &CategorizationSettings) {
    println!();
    println!("⚙️  Categorization settings for {}", user);
    println!("   ─────────────────────────────");
    println!(
        "   Confidence threshold: {:.2}",
        settings.confidence_threshold
    );
    println!(
        "   Auto-categorize on upload: {}",
        if settings.auto_categorize_on_upload {
            "yes"
        } else {
            "no"
        }
    );
    println!("   Methods:");
    for method in MatchMethod::all() {
        let mark = if settings.is_enabled(*method) { "✓" } else { "✗" };
        println!("     {} {}", mark, method);
    }
}
