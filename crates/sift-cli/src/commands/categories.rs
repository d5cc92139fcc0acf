//! Category command implementations

use anyhow::Result;
use sift_core::db::Database;
use sift_core::models::{CategoryType, CategoryUpdate, NewCategory};

use super::truncate;

pub fn cmd_categories_list(db: &Database, user: &str, all: bool) -> Result<()> {
    let categories = if all {
        db.list_all_categories(user)?
    } else {
        db.list_categories(user)?
    };

    if categories.is_empty() {
        println!("No categories found. Run 'sift init' to seed system categories.");
        return Ok(());
    }

    println!();
    println!("🗂️  Categories");
    println!("   ─────────────────────────────────────────────────────────────");

    for category in &categories {
        let owner = if category.is_system_category {
            " [system]"
        } else {
            ""
        };
        let inactive = if category.is_active { "" } else { " (inactive)" };
        println!(
            "   #{:<4} {} ({}){}{}",
            category.id,
            category.name,
            category.category_type.as_str(),
            owner,
            inactive
        );

        if !category.keywords.is_empty() {
            println!(
                "         keywords: {}",
                truncate(&category.keywords.join(", "), 60)
            );
        }
        if !category.merchant_patterns.is_empty() {
            println!(
                "         patterns: {}",
                truncate(&category.merchant_patterns.join(", "), 60)
            );
        }
    }

    Ok(())
}

pub fn cmd_categories_add(
    db: &Database,
    user: &str,
    name: &str,
    category_type: CategoryType,
    keywords: Vec<String>,
    patterns: Vec<String>,
) -> Result<()> {
    let category = db.create_category(
        user,
        &NewCategory {
            name: name.to_string(),
            category_type,
            keywords,
            merchant_patterns: patterns,
        },
    )?;

    db.log_audit(
        user,
        "create",
        Some("category"),
        Some(category.id),
        Some(&category.name),
    )?;
    println!("✅ Created category '{}' (id: {})", category.name, category.id);

    Ok(())
}

pub fn cmd_categories_update(
    db: &Database,
    user: &str,
    id: i64,
    update: CategoryUpdate,
) -> Result<()> {
    let category = db.update_category(user, id, &update)?;

    db.log_audit(user, "update", Some("category"), Some(id), None)?;
    println!("✅ Updated category '{}' (id: {})", category.name, category.id);

    Ok(())
}

pub fn cmd_categories_delete(db: &Database, user: &str, id: i64) -> Result<()> {
    let category = db
        .get_category(user, id)?
        .ok_or_else(|| anyhow::anyhow!("Category not found: {}", id))?;

    db.delete_category(user, id)?;

    db.log_audit(user, "delete", Some("category"), Some(id), Some(&category.name))?;
    println!("✅ Deleted category '{}'", category.name);

    Ok(())
}
