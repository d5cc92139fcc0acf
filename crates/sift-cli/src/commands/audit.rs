//! Audit log command

use anyhow::Result;
use sift_core::db::Database;

use super::truncate;

pub fn cmd_audit(db: &Database, user: &str, limit: i64) -> Result<()> {
    let entries = db.list_audit_log(user, limit.max(1))?;

    if entries.is_empty() {
        println!("No audit entries yet.");
        return Ok(());
    }

    println!();
    println!("📜 Audit log (latest {})", entries.len());
    println!("   ─────────────────────────────────────────────────────────────");

    for entry in &entries {
        let target = match (&entry.entity_type, entry.entity_id) {
            (Some(kind), Some(id)) => format!("{} #{}", kind, id),
            (Some(kind), None) => kind.clone(),
            _ => String::new(),
        };
        println!(
            "   {}  {:<10} {:<8} {:<20} {}",
            entry.timestamp,
            truncate(&entry.user_id, 10),
            entry.action,
            target,
            truncate(entry.details.as_deref().unwrap_or(""), 40)
        );
    }

    Ok(())
}
