//! Database tests

use super::*;
use crate::models::*;
use crate::settings::{CategorizationSettings, SettingsUpdate};

#[cfg(test)]
mod tests {
    use super::*;

    fn new_category(name: &str, keywords: &[&str], patterns: &[&str]) -> NewCategory {
        NewCategory {
            name: name.to_string(),
            category_type: CategoryType::Expense,
            keywords: keywords.iter().map(|s| s.to_string()).collect(),
            merchant_patterns: patterns.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_in_memory_db() {
        let db = Database::in_memory().unwrap();
        assert!(db.list_categories("alice").unwrap().is_empty());
        assert!(db.list_audit_log("alice", 10).unwrap().is_empty());
        assert!(!db.is_encrypted().unwrap());
    }

    #[test]
    fn test_seed_system_categories_idempotent() {
        let db = Database::in_memory().unwrap();

        let first = db.seed_system_categories().unwrap();
        assert!(first > 0);
        assert_eq!(db.seed_system_categories().unwrap(), 0);

        let categories = db.list_categories("anyone").unwrap();
        assert_eq!(categories.len(), first);
        assert!(categories.iter().all(|c| c.is_system_category && c.user_id.is_none()));
        assert!(categories.iter().any(|c| c.name == "Groceries"));
    }

    #[test]
    fn test_category_crud() {
        let db = Database::in_memory().unwrap();

        let created = db
            .create_category(
                "alice",
                &new_category("Coffee", &[" coffee ", "espresso", "Coffee"], &["Blue Bottle"]),
            )
            .unwrap();
        assert!(created.id > 0);
        assert_eq!(created.user_id.as_deref(), Some("alice"));
        // Trimmed and deduplicated
        assert_eq!(created.keywords, vec!["coffee", "espresso"]);
        assert_eq!(created.merchant_patterns, vec!["Blue Bottle"]);
        assert!(created.is_active);

        let fetched = db.get_category("alice", created.id).unwrap().unwrap();
        assert_eq!(fetched.name, "Coffee");

        let updated = db
            .update_category(
                "alice",
                created.id,
                &CategoryUpdate {
                    keywords: Some(vec!["latte".into()]),
                    category_type: Some(CategoryType::Expense),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.keywords, vec!["latte"]);
        assert_eq!(updated.merchant_patterns, vec!["Blue Bottle"]);

        db.delete_category("alice", created.id).unwrap();
        assert!(db.get_category("alice", created.id).unwrap().is_none());
    }

    #[test]
    fn test_categories_scoped_to_user() {
        let db = Database::in_memory().unwrap();
        db.seed_system_categories().unwrap();
        let system_count = db.list_categories("bob").unwrap().len();

        let alice = db
            .create_category("alice", &new_category("Climbing", &["climbing gym"], &[]))
            .unwrap();

        assert_eq!(db.list_categories("alice").unwrap().len(), system_count + 1);
        assert_eq!(db.list_categories("bob").unwrap().len(), system_count);

        // Other users' categories look missing
        assert!(db.get_category("bob", alice.id).unwrap().is_none());
        assert!(matches!(
            db.delete_category("bob", alice.id),
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            db.update_category("bob", alice.id, &CategoryUpdate::default()),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_system_categories_are_read_only() {
        let db = Database::in_memory().unwrap();
        db.seed_system_categories().unwrap();
        let system = db.list_categories("alice").unwrap().remove(0);

        assert!(matches!(
            db.delete_category("alice", system.id),
            Err(Error::InvalidData(_))
        ));
        let rename = CategoryUpdate {
            name: Some("Mine".into()),
            ..Default::default()
        };
        assert!(matches!(
            db.update_category("alice", system.id, &rename),
            Err(Error::InvalidData(_))
        ));
        assert!(db.get_category("alice", system.id).unwrap().is_some());
    }

    #[test]
    fn test_inactive_categories_hidden_from_listing() {
        let db = Database::in_memory().unwrap();
        let created = db
            .create_category("alice", &new_category("Old", &["old"], &[]))
            .unwrap();

        db.update_category(
            "alice",
            created.id,
            &CategoryUpdate {
                is_active: Some(false),
                ..Default::default()
            },
        )
        .unwrap();

        assert!(db.list_categories("alice").unwrap().is_empty());
        assert_eq!(db.list_all_categories("alice").unwrap().len(), 1);
        assert!(db.get_category("alice", created.id).unwrap().is_some());
    }

    #[test]
    fn test_category_validation() {
        let db = Database::in_memory().unwrap();
        db.seed_system_categories().unwrap();

        assert!(matches!(
            db.create_category("alice", &new_category("  ", &["x"], &[])),
            Err(Error::InvalidData(_))
        ));
        assert!(matches!(
            db.create_category("alice", &new_category("Bad", &[], &["re:(oops"])),
            Err(Error::InvalidData(_))
        ));
        // Clashes with a system name, case-insensitively
        assert!(matches!(
            db.create_category("alice", &new_category("groceries", &["x"], &[])),
            Err(Error::InvalidData(_))
        ));

        db.create_category("alice", &new_category("Pets", &["vet"], &[]))
            .unwrap();
        assert!(matches!(
            db.create_category("alice", &new_category("Pets", &["pet"], &[])),
            Err(Error::InvalidData(_))
        ));
        // Another user may reuse the name
        assert!(db
            .create_category("bob", &new_category("Pets", &["pet"], &[]))
            .is_ok());
    }

    #[test]
    fn test_settings_defaults_and_update() {
        let db = Database::in_memory().unwrap();
        let defaults = CategorizationSettings::default();

        assert_eq!(db.get_settings("alice", &defaults).unwrap(), defaults);

        let updated = db
            .update_settings(
                "alice",
                &SettingsUpdate {
                    confidence_threshold: Some(0.8),
                    enabled_methods: Some(vec!["keyword".into(), "cosine_tfidf".into()]),
                    ..Default::default()
                },
                &defaults,
            )
            .unwrap();
        assert_eq!(updated.confidence_threshold, 0.8);
        assert_eq!(updated.enabled_methods.len(), 2);

        let stored = db.get_settings("alice", &defaults).unwrap();
        assert_eq!(stored, updated);
        // Other users keep defaults
        assert_eq!(db.get_settings("bob", &defaults).unwrap(), defaults);
    }

    #[test]
    fn test_invalid_settings_update_leaves_settings_unchanged() {
        let db = Database::in_memory().unwrap();
        let defaults = CategorizationSettings::default();
        db.update_settings(
            "alice",
            &SettingsUpdate {
                confidence_threshold: Some(0.7),
                ..Default::default()
            },
            &defaults,
        )
        .unwrap();

        let result = db.update_settings(
            "alice",
            &SettingsUpdate {
                confidence_threshold: Some(1.5),
                ..Default::default()
            },
            &defaults,
        );
        assert!(matches!(result, Err(Error::Config(_))));

        let result = db.update_settings(
            "alice",
            &SettingsUpdate {
                enabled_methods: Some(vec!["soundex".into()]),
                ..Default::default()
            },
            &defaults,
        );
        assert!(matches!(result, Err(Error::Config(_))));

        assert_eq!(
            db.get_settings("alice", &defaults).unwrap().confidence_threshold,
            0.7
        );
    }

    #[test]
    fn test_empty_method_list_round_trips() {
        let db = Database::in_memory().unwrap();
        let defaults = CategorizationSettings::default();
        db.update_settings(
            "alice",
            &SettingsUpdate {
                enabled_methods: Some(vec![]),
                ..Default::default()
            },
            &defaults,
        )
        .unwrap();
        assert!(db
            .get_settings("alice", &defaults)
            .unwrap()
            .enabled_methods
            .is_empty());
    }

    #[test]
    fn test_audit_log() {
        let db = Database::in_memory().unwrap();
        db.log_audit("alice", "create", Some("category"), Some(4), Some("Coffee"))
            .unwrap();
        db.log_audit("alice", "preview", None, None, Some("10 transactions"))
            .unwrap();

        db.log_audit("bob", "delete", Some("category"), Some(9), Some("Bob Only"))
            .unwrap();

        let entries = db.list_audit_log("alice", 10).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].action, "preview");
        assert_eq!(entries[1].entity_id, Some(4));
        assert!(entries.iter().all(|e| e.user_id == "alice"));

        assert_eq!(db.list_audit_log("alice", 1).unwrap().len(), 1);

        let bob = db.list_audit_log("bob", 10).unwrap();
        assert_eq!(bob.len(), 1);
        assert_eq!(bob[0].details.as_deref(), Some("Bob Only"));
        assert!(db.list_audit_log("carol", 10).unwrap().is_empty());
    }

    #[test]
    fn test_keyed_db_reports_encryption() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keyed.db");
        let db = Database::new_with_key(path.to_str().unwrap(), Some("test passphrase")).unwrap();
        assert!(db.is_encrypted().unwrap());
    }
}
