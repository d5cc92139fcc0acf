//! Category operations

use rusqlite::{params, types::Type, OptionalExtension, Row};
use tracing::info;

use super::{parse_datetime, Database, DbConn};
use crate::error::{Error, Result};
use crate::index::validate_merchant_pattern;
use crate::models::{Category, CategoryType, CategoryUpdate, NewCategory};

const CATEGORY_COLUMNS: &str = "id, user_id, name, category_type, keywords, merchant_patterns, \
                                is_system, is_active, created_at, updated_at";

/// Built-in categories visible to every user
const SYSTEM_CATEGORIES: &[(&str, CategoryType, &[&str], &[&str])] = &[
    (
        "Groceries",
        CategoryType::Expense,
        &["grocery", "groceries", "supermarket"],
        &["whole foods", "trader joe's", "safeway", "kroger", "aldi"],
    ),
    (
        "Dining",
        CategoryType::Expense,
        &["restaurant", "cafe", "coffee", "pizza"],
        &["starbucks", "chipotle", "doordash", "grubhub"],
    ),
    (
        "Transport",
        CategoryType::Expense,
        &["fuel", "gas station", "parking", "transit"],
        &["shell", "chevron", "uber", "lyft"],
    ),
    (
        "Shopping",
        CategoryType::Expense,
        &["amazon", "department store"],
        &["target", "walmart", "costco"],
    ),
    (
        "Utilities",
        CategoryType::Expense,
        &["electric", "water bill", "internet", "utility"],
        &["comcast", "verizon"],
    ),
    (
        "Entertainment",
        CategoryType::Expense,
        &["cinema", "streaming", "concert"],
        &["netflix", "spotify", "hulu"],
    ),
    (
        "Healthcare",
        CategoryType::Expense,
        &["pharmacy", "clinic", "dental"],
        &["cvs", "walgreens"],
    ),
    (
        "Income",
        CategoryType::Income,
        &["payroll", "salary", "direct deposit", "interest paid"],
        &[],
    ),
    (
        "Transfer",
        CategoryType::Transfer,
        &["transfer", "payment thank you"],
        &["zelle", "venmo"],
    ),
];

fn row_to_category(row: &Row<'_>) -> rusqlite::Result<Category> {
    let category_type: String = row.get(3)?;
    let keywords: String = row.get(4)?;
    let merchant_patterns: String = row.get(5)?;
    let created_at: String = row.get(8)?;
    let updated_at: String = row.get(9)?;

    Ok(Category {
        id: row.get(0)?,
        user_id: row.get(1)?,
        name: row.get(2)?,
        category_type: category_type
            .parse()
            .map_err(|e: String| conversion_error(3, Error::InvalidData(e)))?,
        keywords: serde_json::from_str(&keywords).map_err(|e| conversion_error(4, e.into()))?,
        merchant_patterns: serde_json::from_str(&merchant_patterns)
            .map_err(|e| conversion_error(5, e.into()))?,
        is_system_category: row.get(6)?,
        is_active: row.get(7)?,
        created_at: parse_datetime(&created_at),
        updated_at: parse_datetime(&updated_at),
    })
}

fn conversion_error(column: usize, err: Error) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(column, Type::Text, Box::new(err))
}

/// Trim, drop empties and duplicates, keep first-seen order
fn clean_terms(terms: &[String]) -> Vec<String> {
    let mut cleaned: Vec<String> = Vec::with_capacity(terms.len());
    for term in terms {
        let term = term.trim();
        if !term.is_empty() && !cleaned.iter().any(|t| t.eq_ignore_ascii_case(term)) {
            cleaned.push(term.to_string());
        }
    }
    cleaned
}

fn clean_patterns(patterns: &[String]) -> Result<Vec<String>> {
    let cleaned = clean_terms(patterns);
    for pattern in &cleaned {
        validate_merchant_pattern(pattern)?;
    }
    Ok(cleaned)
}

fn clean_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::InvalidData("Category name cannot be empty".to_string()));
    }
    Ok(name.to_string())
}

impl Database {
    /// Insert the built-in system categories (idempotent - skips existing names)
    pub fn seed_system_categories(&self) -> Result<usize> {
        let conn = self.conn()?;
        let mut inserted = 0;

        for (name, category_type, keywords, patterns) in SYSTEM_CATEGORIES {
            let exists: bool = conn
                .query_row(
                    "SELECT 1 FROM categories WHERE name = ? AND user_id IS NULL",
                    params![name],
                    |_| Ok(true),
                )
                .optional()?
                .unwrap_or(false);

            if !exists {
                conn.execute(
                    r#"
                    INSERT INTO categories (user_id, name, category_type, keywords, merchant_patterns, is_system)
                    VALUES (NULL, ?, ?, ?, ?, 1)
                    "#,
                    params![
                        name,
                        category_type.as_str(),
                        serde_json::to_string(keywords)?,
                        serde_json::to_string(patterns)?,
                    ],
                )?;
                inserted += 1;
            }
        }

        if inserted > 0 {
            info!("Seeded {} system categories", inserted);
        }
        Ok(inserted)
    }

    /// Active categories visible to a user (their own plus system), ordered by id
    pub fn list_categories(&self, user_id: &str) -> Result<Vec<Category>> {
        self.query_categories(user_id, false)
    }

    /// Like `list_categories`, including inactive categories
    pub fn list_all_categories(&self, user_id: &str) -> Result<Vec<Category>> {
        self.query_categories(user_id, true)
    }

    fn query_categories(&self, user_id: &str, include_inactive: bool) -> Result<Vec<Category>> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {} FROM categories \
             WHERE (user_id = ? OR user_id IS NULL) AND (? OR is_active = 1) \
             ORDER BY id",
            CATEGORY_COLUMNS
        );

        let mut stmt = conn.prepare(&sql)?;
        let categories = stmt
            .query_map(params![user_id, include_inactive], row_to_category)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(categories)
    }

    /// A category visible to the user, active or not
    pub fn get_category(&self, user_id: &str, id: i64) -> Result<Option<Category>> {
        let conn = self.conn()?;
        let category = fetch_category(&conn, id)?;
        Ok(category.filter(|c| visible_to(c, user_id)))
    }

    pub fn create_category(&self, user_id: &str, new: &NewCategory) -> Result<Category> {
        let name = clean_name(&new.name)?;
        let keywords = clean_terms(&new.keywords);
        let patterns = clean_patterns(&new.merchant_patterns)?;

        let conn = self.conn()?;
        ensure_name_available(&conn, user_id, &name, None)?;

        conn.execute(
            r#"
            INSERT INTO categories (user_id, name, category_type, keywords, merchant_patterns, is_system)
            VALUES (?, ?, ?, ?, ?, 0)
            "#,
            params![
                user_id,
                name,
                new.category_type.as_str(),
                serde_json::to_string(&keywords)?,
                serde_json::to_string(&patterns)?,
            ],
        )?;

        let id = conn.last_insert_rowid();
        info!("Created category '{}' ({}) for {}", name, id, user_id);

        fetch_category(&conn, id)?
            .ok_or_else(|| Error::NotFound(format!("Category {} not found", id)))
    }

    /// Apply a partial update to one of the user's own categories
    pub fn update_category(
        &self,
        user_id: &str,
        id: i64,
        update: &CategoryUpdate,
    ) -> Result<Category> {
        let conn = self.conn()?;
        let existing = owned_category(&conn, user_id, id)?;

        let mut updates = Vec::new();
        let mut values: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(ref name) = update.name {
            let name = clean_name(name)?;
            if name != existing.name {
                ensure_name_available(&conn, user_id, &name, Some(id))?;
            }
            updates.push("name = ?");
            values.push(Box::new(name));
        }
        if let Some(category_type) = update.category_type {
            updates.push("category_type = ?");
            values.push(Box::new(category_type.as_str()));
        }
        if let Some(ref keywords) = update.keywords {
            updates.push("keywords = ?");
            values.push(Box::new(serde_json::to_string(&clean_terms(keywords))?));
        }
        if let Some(ref patterns) = update.merchant_patterns {
            updates.push("merchant_patterns = ?");
            values.push(Box::new(serde_json::to_string(&clean_patterns(patterns)?)?));
        }
        if let Some(is_active) = update.is_active {
            updates.push("is_active = ?");
            values.push(Box::new(is_active));
        }

        if updates.is_empty() {
            return Ok(existing);
        }

        updates.push("updated_at = CURRENT_TIMESTAMP");
        values.push(Box::new(id));
        let sql = format!("UPDATE categories SET {} WHERE id = ?", updates.join(", "));
        let params_refs: Vec<&dyn rusqlite::ToSql> = values.iter().map(|p| p.as_ref()).collect();
        conn.execute(&sql, params_refs.as_slice())?;

        fetch_category(&conn, id)?
            .ok_or_else(|| Error::NotFound(format!("Category {} not found", id)))
    }

    /// Delete one of the user's own categories
    pub fn delete_category(&self, user_id: &str, id: i64) -> Result<()> {
        let conn = self.conn()?;
        let existing = owned_category(&conn, user_id, id)?;

        conn.execute("DELETE FROM categories WHERE id = ?", params![id])?;
        info!("Deleted category '{}' ({}) for {}", existing.name, id, user_id);
        Ok(())
    }
}

fn fetch_category(conn: &DbConn, id: i64) -> Result<Option<Category>> {
    let sql = format!("SELECT {} FROM categories WHERE id = ?", CATEGORY_COLUMNS);
    Ok(conn
        .query_row(&sql, params![id], row_to_category)
        .optional()?)
}

fn visible_to(category: &Category, user_id: &str) -> bool {
    match category.user_id.as_deref() {
        Some(owner) => owner == user_id,
        None => true,
    }
}

/// The category if the user may modify it
///
/// Other users' categories are reported as missing; system categories are read-only.
fn owned_category(conn: &DbConn, user_id: &str, id: i64) -> Result<Category> {
    let category = fetch_category(conn, id)?
        .filter(|c| visible_to(c, user_id))
        .ok_or_else(|| Error::NotFound(format!("Category {} not found", id)))?;

    if category.is_system_category {
        return Err(Error::InvalidData(format!(
            "System category '{}' cannot be modified",
            category.name
        )));
    }

    Ok(category)
}

/// Names are unique among a user's categories and the system categories
fn ensure_name_available(
    conn: &DbConn,
    user_id: &str,
    name: &str,
    except_id: Option<i64>,
) -> Result<()> {
    let taken: Option<i64> = conn
        .query_row(
            r#"
            SELECT id FROM categories
            WHERE name = ? COLLATE NOCASE AND (user_id = ? OR user_id IS NULL)
              AND id != COALESCE(?, -1)
            LIMIT 1
            "#,
            params![name, user_id, except_id],
            |row| row.get(0),
        )
        .optional()?;

    match taken {
        Some(_) => Err(Error::InvalidData(format!(
            "A category named '{}' already exists",
            name
        ))),
        None => Ok(()),
    }
}
