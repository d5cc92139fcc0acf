//! Categorization commands: single test, bulk preview, analysis

use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result};
use sift_core::db::Database;
use sift_core::models::{CategorizationPreview, CategoryMatchResult};
use sift_core::{
    parse_descriptions, parse_transactions_csv, BatchCoordinator, CategorizationEngine,
    EngineConfig,
};

use super::truncate;

pub fn cmd_test(
    db: &Database,
    user: &str,
    config: EngineConfig,
    text: &str,
    merchant: Option<&str>,
    stats: bool,
) -> Result<()> {
    let settings = db.get_settings(user, &config.defaults)?;
    let engine = CategorizationEngine::new(config);
    let index = engine.index(&db.list_categories(user)?);

    let report = engine.test_categorization(text, merchant, stats, &settings, &index);

    println!();
    println!("🔎 {}", text);
    match &report.result {
        Some(result) => print_match(result),
        None => println!(
            "   No category above threshold {:.2}",
            settings.confidence_threshold
        ),
    }

    if let Some(breakdown) = &report.stats {
        println!();
        println!("   Method breakdown");
        println!("   ─────────────────────────────");
        for entry in breakdown {
            match &entry.best {
                Some(best) => {
                    let name = index
                        .get(best.category_id)
                        .map(|c| c.name.as_str())
                        .unwrap_or("?");
                    println!(
                        "   {:<13} {:>3} candidates, best {} ({:.3}, \"{}\")",
                        entry.method.as_str(),
                        entry.candidates,
                        name,
                        best.score,
                        best.matched_text
                    );
                }
                None => println!("   {:<13}   0 candidates", entry.method.as_str()),
            }
        }
    }

    db.log_audit(user, "test", Some("categorization"), None, Some(text))?;
    Ok(())
}

pub fn cmd_preview(
    db: &Database,
    user: &str,
    config: EngineConfig,
    file: &Path,
    overwrite_existing: bool,
    json: bool,
) -> Result<()> {
    let reader =
        File::open(file).with_context(|| format!("Failed to open {}", file.display()))?;
    let transactions = parse_transactions_csv(reader)?;

    let settings = db.get_settings(user, &config.defaults)?;
    let coordinator = BatchCoordinator::from_engine(CategorizationEngine::new(config))?;
    let index = coordinator.engine().index(&db.list_categories(user)?);

    let preview = coordinator.preview(&transactions, overwrite_existing, &settings, &index, None)?;

    db.log_audit(
        user,
        "preview",
        Some("categorization"),
        None,
        Some(&format!(
            "{}: {} of {} transactions",
            file.display(),
            preview.will_be_categorized,
            preview.total_transactions
        )),
    )?;

    if json {
        println!("{}", serde_json::to_string_pretty(&preview)?);
    } else {
        print_preview(&preview);
    }

    Ok(())
}

pub fn cmd_analyze(
    db: &Database,
    user: &str,
    config: EngineConfig,
    file: &Path,
    json: bool,
) -> Result<()> {
    let reader =
        File::open(file).with_context(|| format!("Failed to open {}", file.display()))?;
    let descriptions = parse_descriptions(reader)?;

    let settings = db.get_settings(user, &config.defaults)?;
    let coordinator = BatchCoordinator::from_engine(CategorizationEngine::new(config))?;
    let index = coordinator.engine().index(&db.list_categories(user)?);

    let analysis = coordinator.analyze(&descriptions, &settings, &index, None)?;

    db.log_audit(
        user,
        "analyze",
        Some("categorization"),
        None,
        Some(&format!(
            "{}: {} of {} descriptions",
            file.display(),
            analysis.successful_categorizations,
            analysis.total_transactions
        )),
    )?;

    if json {
        println!("{}", serde_json::to_string_pretty(&analysis)?);
        return Ok(());
    }

    println!();
    println!("📊 Categorization Analysis");
    println!("   ─────────────────────────────");
    println!("   Descriptions: {}", analysis.total_transactions);
    println!(
        "   Categorized:  {} ({:.1}%)",
        analysis.successful_categorizations,
        analysis.success_rate * 100.0
    );
    println!("   Avg confidence: {:.3}", analysis.average_confidence);
    println!("   By method:");
    for (method, count) in &analysis.method_stats {
        println!("     {:<13} {}", method.as_str(), count);
    }

    let missed: Vec<_> = analysis
        .results
        .iter()
        .filter(|r| !r.would_be_categorized)
        .collect();
    if !missed.is_empty() {
        println!();
        println!("   Uncategorized:");
        for item in missed.iter().take(20) {
            println!("     • {}", truncate(&item.description, 60));
        }
        if missed.len() > 20 {
            println!("     ... and {} more", missed.len() - 20);
        }
    }

    Ok(())
}

fn print_match(result: &CategoryMatchResult) {
    println!(
        "   → {} (confidence {:.3}, {} on \"{}\")",
        result.category_name,
        result.confidence,
        result.similarity_type.as_str(),
        result.matched_text
    );
}

fn print_preview(preview: &CategorizationPreview) {
    println!();
    println!("📋 Categorization Preview");
    println!("   ─────────────────────────────────────────────────────────────");

    for (i, item) in preview.items.iter().enumerate() {
        let suggestion = match &item.result {
            Some(r) => format!(
                "{} ({:.2}, {})",
                r.category_name,
                r.confidence,
                r.similarity_type.as_str()
            ),
            None => "-".to_string(),
        };
        let state = if item.would_be_categorized {
            "✓"
        } else if item.existing_category_id.is_some() {
            "="
        } else {
            "?"
        };
        println!(
            "   {:>4} {} {:<40} {}",
            i,
            state,
            truncate(&item.description, 40),
            suggestion
        );
    }

    println!();
    println!("   Total: {}", preview.total_transactions);
    println!("   Will be categorized: {}", preview.will_be_categorized);
    println!(
        "   Suggestions: {} ({:.1}%)",
        preview.suggested,
        preview.success_rate * 100.0
    );
    println!("   Already categorized: {}", preview.already_categorized);
}
