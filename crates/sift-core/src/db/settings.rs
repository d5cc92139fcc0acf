//! Categorization settings storage

use rusqlite::{params, OptionalExtension};
use tracing::info;

use super::Database;
use crate::error::Result;
use crate::settings::{parse_methods, CategorizationSettings, SettingsUpdate};

impl Database {
    /// Stored settings for a user, or `defaults` when none are stored
    pub fn get_settings(
        &self,
        user_id: &str,
        defaults: &CategorizationSettings,
    ) -> Result<CategorizationSettings> {
        let conn = self.conn()?;

        let row: Option<(f64, bool, String)> = conn
            .query_row(
                r#"
                SELECT confidence_threshold, auto_categorize_on_upload, enabled_methods
                FROM categorization_settings WHERE user_id = ?
                "#,
                params![user_id],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;

        match row {
            Some((confidence_threshold, auto_categorize_on_upload, methods)) => {
                let names: Vec<String> = serde_json::from_str(&methods)?;
                Ok(CategorizationSettings {
                    confidence_threshold,
                    auto_categorize_on_upload,
                    enabled_methods: parse_methods(&names)?,
                })
            }
            None => Ok(defaults.clone()),
        }
    }

    /// Validate and store a settings patch
    ///
    /// Nothing is written when validation fails.
    pub fn update_settings(
        &self,
        user_id: &str,
        update: &SettingsUpdate,
        defaults: &CategorizationSettings,
    ) -> Result<CategorizationSettings> {
        let current = self.get_settings(user_id, defaults)?;
        let next = current.apply_update(update)?;

        let methods: Vec<&str> = next.enabled_methods.iter().map(|m| m.as_str()).collect();
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO categorization_settings
                (user_id, confidence_threshold, auto_categorize_on_upload, enabled_methods, updated_at)
            VALUES (?, ?, ?, ?, CURRENT_TIMESTAMP)
            ON CONFLICT(user_id) DO UPDATE SET
                confidence_threshold = excluded.confidence_threshold,
                auto_categorize_on_upload = excluded.auto_categorize_on_upload,
                enabled_methods = excluded.enabled_methods,
                updated_at = CURRENT_TIMESTAMP
            "#,
            params![
                user_id,
                next.confidence_threshold,
                next.auto_categorize_on_upload,
                serde_json::to_string(&methods)?,
            ],
        )?;

        info!(
            "Updated categorization settings for {}: threshold {}, methods {:?}",
            user_id, next.confidence_threshold, methods
        );
        Ok(next)
    }
}
