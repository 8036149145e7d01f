// Tests for settings persistence

use siteqa_core::credential::{API_KEY_SETTING, CredentialStore};
use siteqa_core::data::Database;
use siteqa_scanner::Credential;
use tempfile::TempDir;

fn create_test_db() -> (TempDir, Database) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");
    let db = Database::new(&db_path).unwrap();
    (temp_dir, db)
}

// ============================================================================
// Database Creation Tests
// ============================================================================

#[test]
fn test_database_creation() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");

    let db = Database::new(&db_path);
    assert!(db.is_ok());
    assert!(db_path.exists());
}

#[test]
fn test_database_exists_and_drop() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");

    assert!(!Database::exists(&db_path));

    let db = Database::new(&db_path).unwrap();
    assert!(Database::exists(&db_path));
    drop(db);

    Database::drop(&db_path).unwrap();
    assert!(!Database::exists(&db_path));
}

#[test]
fn test_reopen_existing_database() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");

    Database::new(&db_path).unwrap();
    assert!(Database::new(&db_path).is_ok());
}

// ============================================================================
// Settings Tests
// ============================================================================

#[test]
fn test_missing_setting_is_none() {
    let (_temp_dir, db) = create_test_db();
    assert_eq!(db.get_setting("nothing").unwrap(), None);
    assert_eq!(db.setting_updated_at("nothing").unwrap(), None);
}

#[test]
fn test_set_and_overwrite_setting() {
    let (_temp_dir, db) = create_test_db();

    db.set_setting("theme", "dark").unwrap();
    assert_eq!(db.get_setting("theme").unwrap().as_deref(), Some("dark"));

    db.set_setting("theme", "light").unwrap();
    assert_eq!(db.get_setting("theme").unwrap().as_deref(), Some("light"));
    assert!(db.setting_updated_at("theme").unwrap().is_some());
}

#[test]
fn test_delete_setting() {
    let (_temp_dir, db) = create_test_db();

    db.set_setting("theme", "dark").unwrap();
    assert!(db.delete_setting("theme").unwrap());
    assert!(!db.delete_setting("theme").unwrap());
    assert_eq!(db.get_setting("theme").unwrap(), None);
}

// ============================================================================
// Credential Persistence Tests
// ============================================================================

#[test]
fn test_credential_survives_reopen() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");

    {
        let db = Database::new(&db_path).unwrap();
        db.set(&Credential::new("fc-persisted")).unwrap();
    }

    let db = Database::new(&db_path).unwrap();
    assert_eq!(db.get().unwrap(), Some(Credential::new("fc-persisted")));
    assert_eq!(
        db.get_setting(API_KEY_SETTING).unwrap().as_deref(),
        Some("fc-persisted")
    );
}

#[test]
fn test_clear_credential() {
    let (_temp_dir, db) = create_test_db();

    db.set(&Credential::new("fc-persisted")).unwrap();
    db.clear().unwrap();
    assert_eq!(db.get().unwrap(), None);
}

#[test]
fn test_blank_stored_value_reads_as_missing() {
    let (_temp_dir, db) = create_test_db();

    db.set_setting(API_KEY_SETTING, "   ").unwrap();
    assert_eq!(db.get().unwrap(), None);
}
