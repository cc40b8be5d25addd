//! Durable local store.
//!
//! The original dashboard persisted exactly two browser-localStorage keys:
//! the JSON-serialized record collection and the user's display name. This
//! keeps the same two-key model in a SQLite table so re-opening the
//! dashboard resumes where the last import left off. The store is a
//! convenience cache, not the system of record — source XML files remain
//! authoritative.

use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension};

use crate::config::{STORE_KEY_TEST_DATA, STORE_KEY_USER_NAME};
use crate::models::TestRecord;

use super::StoreError;

const MIGRATIONS: &[(i64, &str)] = &[(
    1,
    "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER PRIMARY KEY);
     CREATE TABLE IF NOT EXISTS store (key TEXT PRIMARY KEY, value TEXT NOT NULL);
     INSERT INTO schema_version (version) VALUES (1);",
)];

pub struct Store {
    conn: Connection,
}

impl Store {
    /// Open the store at the given path and run migrations, creating the
    /// parent directory when missing.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        configure_pragmas(&conn)?;
        run_migrations(&conn)?;
        Ok(Self { conn })
    }

    /// Open an in-memory store (for testing)
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        configure_pragmas(&conn)?;
        run_migrations(&conn)?;
        Ok(Self { conn })
    }

    pub fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let value = self
            .conn
            .query_row("SELECT value FROM store WHERE key = ?1", params![key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    pub fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO store (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }

    pub fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.conn
            .execute("DELETE FROM store WHERE key = ?1", params![key])?;
        Ok(())
    }

    // ── The dashboard's two keys ────────────────────────────

    /// Load the persisted record collection; an absent key is an empty
    /// collection, not an error.
    pub fn load_records(&self) -> Result<Vec<TestRecord>, StoreError> {
        match self.get(STORE_KEY_TEST_DATA)? {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => Ok(Vec::new()),
        }
    }

    pub fn save_records(&self, records: &[TestRecord]) -> Result<(), StoreError> {
        let json = serde_json::to_string(records)?;
        self.set(STORE_KEY_TEST_DATA, &json)
    }

    pub fn load_user_name(&self) -> Result<String, StoreError> {
        Ok(self
            .get(STORE_KEY_USER_NAME)?
            .unwrap_or_else(|| "Anonymous".to_string()))
    }

    pub fn save_user_name(&self, user_name: &str) -> Result<(), StoreError> {
        self.set(STORE_KEY_USER_NAME, user_name)
    }

    /// Drop both keys (the clear-all-data action).
    pub fn clear(&self) -> Result<(), StoreError> {
        self.delete(STORE_KEY_TEST_DATA)?;
        self.delete(STORE_KEY_USER_NAME)?;
        Ok(())
    }
}

fn configure_pragmas(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        "PRAGMA journal_mode=DELETE;
         PRAGMA foreign_keys=ON;",
    )?;
    Ok(())
}

/// Run all pending migrations
fn run_migrations(conn: &Connection) -> Result<(), StoreError> {
    let current_version = get_current_version(conn);

    for (version, sql) in MIGRATIONS {
        if *version > current_version {
            tracing::info!("Running store migration v{version}");
            conn.execute_batch(sql)
                .map_err(|e| StoreError::MigrationFailed {
                    version: *version,
                    reason: e.to_string(),
                })?;
        }
    }

    Ok(())
}

/// Get the current schema version (0 if no schema exists yet)
fn get_current_version(conn: &Connection) -> i64 {
    conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| {
        row.get::<_, i64>(0)
    })
    .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Metadata, ScoreSet, TestType};

    fn sample_records() -> Vec<TestRecord> {
        let mut scores = ScoreSet::new();
        scores.set_float("percentage", 30.0);
        vec![TestRecord {
            test_name: "BACS Symbol Coding Test".into(),
            test_type: TestType::SymbolCoding,
            date: "2025-01-01".into(),
            timestamp: "15:30:00".into(),
            scores,
            metadata: Metadata {
                file_name: "sample.xml".into(),
                session_id: String::new(),
            },
        }]
    }

    #[test]
    fn get_missing_key_is_none() {
        let store = Store::open_in_memory().unwrap();
        assert_eq!(store.get("nope").unwrap(), None);
    }

    #[test]
    fn set_then_get_round_trips() {
        let store = Store::open_in_memory().unwrap();
        store.set("k", "v1").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v1"));
        store.set("k", "v2").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v2"));
    }

    #[test]
    fn records_round_trip() {
        let store = Store::open_in_memory().unwrap();
        let records = sample_records();
        store.save_records(&records).unwrap();
        let loaded = store.load_records().unwrap();
        assert_eq!(loaded, records);
    }

    #[test]
    fn empty_store_loads_empty_collection() {
        let store = Store::open_in_memory().unwrap();
        assert!(store.load_records().unwrap().is_empty());
        assert_eq!(store.load_user_name().unwrap(), "Anonymous");
    }

    #[test]
    fn user_name_round_trips() {
        let store = Store::open_in_memory().unwrap();
        store.save_user_name("Ada").unwrap();
        assert_eq!(store.load_user_name().unwrap(), "Ada");
    }

    #[test]
    fn clear_drops_both_keys() {
        let store = Store::open_in_memory().unwrap();
        store.save_records(&sample_records()).unwrap();
        store.save_user_name("Ada").unwrap();
        store.clear().unwrap();
        assert!(store.load_records().unwrap().is_empty());
        assert_eq!(store.load_user_name().unwrap(), "Anonymous");
    }

    #[test]
    fn open_creates_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("dashboard.db");
        let store = Store::open(&path).unwrap();
        store.save_user_name("Ada").unwrap();
        drop(store);

        // Re-open and read back
        let store = Store::open(&path).unwrap();
        assert_eq!(store.load_user_name().unwrap(), "Ada");
    }

    #[test]
    fn migrations_idempotent() {
        let store = Store::open_in_memory().unwrap();
        assert!(run_migrations(&store.conn).is_ok());
    }

    #[test]
    fn corrupted_records_payload_is_an_error() {
        let store = Store::open_in_memory().unwrap();
        store.set(STORE_KEY_TEST_DATA, "not json").unwrap();
        assert!(matches!(
            store.load_records(),
            Err(StoreError::Serialization(_))
        ));
    }
}
