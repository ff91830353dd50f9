use std::fs;
use std::path::PathBuf;

use chrono::Utc;
use rusqlite::OptionalExtension;
use serde_json::Value;

use crate::database::Pool;
use crate::errors::DatabaseError;

use super::types::InteractionRecord;

/// Owns the `interaction_data` table plus its legacy-JSON-file fallback,
/// mirroring `MappingStore`'s backfill behavior (spec §4.G).
pub struct InteractionStore {
    pool: Pool,
    storage_root: PathBuf,
}

impl InteractionStore {
    pub fn new(pool: Pool, storage_root: PathBuf) -> Self {
        Self { pool, storage_root }
    }

    fn legacy_path(&self, id: &str) -> PathBuf {
        self.storage_root.join(format!("{id}.json"))
    }

    pub fn exists(&self, id: &str) -> Result<bool, DatabaseError> {
        let conn = self.pool.get()?;
        let found: Option<i64> = conn
            .query_row(
                "SELECT 1 FROM interaction_data WHERE ghost_post_id = ?1",
                [id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some() || self.legacy_path(id).exists())
    }

    pub fn get_interactions(&self, id: &str) -> Result<Option<InteractionRecord>, DatabaseError> {
        let conn = self.pool.get()?;
        let row: Option<String> = conn
            .query_row(
                "SELECT payload FROM interaction_data WHERE ghost_post_id = ?1",
                [id],
                |row| row.get(0),
            )
            .optional()?;
        if let Some(payload) = row {
            return Ok(Some(serde_json::from_str(&payload)?));
        }

        let legacy_path = self.legacy_path(id);
        if legacy_path.exists() {
            let raw = fs::read_to_string(&legacy_path)?;
            let record: InteractionRecord = serde_json::from_str(&raw)?;
            self.put_interactions(id, record.clone())?;
            return Ok(Some(record));
        }

        Ok(None)
    }

    /// Persists `data`, stamping `updated_at` onto the document if it is a
    /// JSON object.
    pub fn put_interactions(&self, id: &str, mut data: InteractionRecord) -> Result<(), DatabaseError> {
        let now = Utc::now();
        if let Value::Object(ref mut map) = data {
            map.insert("updated_at".to_owned(), Value::String(now.to_rfc3339()));
        }
        let conn = self.pool.get()?;
        let payload = serde_json::to_string(&data)?;
        conn.execute(
            "INSERT INTO interaction_data (ghost_post_id, payload, updated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(ghost_post_id) DO UPDATE SET payload = excluded.payload, updated_at = excluded.updated_at",
            rusqlite::params![id, payload, now.to_rfc3339()],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::init_pool;
    use serde_json::json;

    fn store() -> (InteractionStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let pool = init_pool(&dir.path().join("test.sqlite3")).unwrap();
        (InteractionStore::new(pool, dir.path().to_path_buf()), dir)
    }

    #[test]
    fn test_put_then_get_roundtrip() {
        let (store, _dir) = store();
        let data = json!({"platforms": {"mastodon": {"A": {"favorites": 10}}}});
        store.put_interactions("post1", data.clone()).unwrap();
        let fetched = store.get_interactions("post1").unwrap().unwrap();
        assert_eq!(fetched["platforms"]["mastodon"]["A"]["favorites"], 10);
        assert!(fetched["updated_at"].is_string());
    }

    #[test]
    fn test_exists() {
        let (store, _dir) = store();
        assert!(!store.exists("post1").unwrap());
        store.put_interactions("post1", json!({})).unwrap();
        assert!(store.exists("post1").unwrap());
    }

    #[test]
    fn test_legacy_json_backfill() {
        let (store, dir) = store();
        let data = json!({"platforms": {}});
        fs::write(
            dir.path().join("legacy1.json"),
            serde_json::to_string(&data).unwrap(),
        )
        .unwrap();

        assert!(store.get_interactions("legacy1").unwrap().is_some());

        fs::remove_file(dir.path().join("legacy1.json")).unwrap();
        assert!(store.get_interactions("legacy1").unwrap().is_some());
    }
}
