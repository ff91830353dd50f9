use rusqlite::OptionalExtension;

use crate::database::Pool;
use crate::errors::DatabaseError;

use super::types::ReceivedWebmention;

/// Owns the `received_webmentions` table (spec §4.L / §3 "Received
/// webmention").
pub struct WebmentionStore {
    pool: Pool,
}

impl WebmentionStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Inserts a new webmention, or replaces the existing one for the same
    /// `(source, target)` pair (spec §3 invariant).
    pub fn add(&self, webmention: &ReceivedWebmention) -> Result<(), DatabaseError> {
        let conn = self.pool.get()?;
        let payload = serde_json::to_string(webmention)?;
        conn.execute(
            "INSERT INTO received_webmentions (source, target, payload, created_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(source, target) DO UPDATE SET payload = excluded.payload, created_at = excluded.created_at",
            rusqlite::params![
                webmention.source,
                webmention.target,
                payload,
                webmention.received_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Deletes the record for `(source, target)`, used when source
    /// verification finds the mention gone (HTTP 410/404, spec §8).
    pub fn remove(&self, source: &str, target: &str) -> Result<(), DatabaseError> {
        let conn = self.pool.get()?;
        conn.execute(
            "DELETE FROM received_webmentions WHERE source = ?1 AND target = ?2",
            rusqlite::params![source, target],
        )?;
        Ok(())
    }

    pub fn get(&self, source: &str, target: &str) -> Result<Option<ReceivedWebmention>, DatabaseError> {
        let conn = self.pool.get()?;
        let row: Option<String> = conn
            .query_row(
                "SELECT payload FROM received_webmentions WHERE source = ?1 AND target = ?2",
                rusqlite::params![source, target],
                |row| row.get(0),
            )
            .optional()?;
        match row {
            Some(payload) => Ok(Some(serde_json::from_str(&payload)?)),
            None => Ok(None),
        }
    }

    /// Verified webmentions for a given target path, ordered by
    /// `received_at` ascending — backs `GET /api/webmentions/{path}`.
    pub fn get_for_target(&self, target: &str) -> Result<Vec<ReceivedWebmention>, DatabaseError> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT payload FROM received_webmentions WHERE target = ?1 ORDER BY created_at ASC",
        )?;
        let rows = stmt
            .query_map([target], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        let mut mentions = Vec::with_capacity(rows.len());
        for payload in rows {
            let w: ReceivedWebmention = serde_json::from_str(&payload)?;
            if w.status == super::types::WebmentionStatus::Verified {
                mentions.push(w);
            }
        }
        Ok(mentions)
    }

    pub fn count(&self) -> Result<i64, DatabaseError> {
        let conn = self.pool.get()?;
        Ok(conn.query_row("SELECT count(*) FROM received_webmentions", [], |row| row.get(0))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::init_pool;
    use crate::webmentions::types::WebmentionStatus;

    fn store() -> (WebmentionStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let pool = init_pool(&dir.path().join("test.sqlite3")).unwrap();
        (WebmentionStore::new(pool), dir)
    }

    #[test]
    fn test_add_replaces_by_source_target() {
        let (store, _dir) = store();
        let mut w = ReceivedWebmention::pending("https://a.example/p", "https://blog.example.com/post/");
        store.add(&w).unwrap();
        w.status = WebmentionStatus::Verified;
        w.author_name = Some("Alice".to_owned());
        store.add(&w).unwrap();

        assert_eq!(store.count().unwrap(), 1);
        let fetched = store
            .get("https://a.example/p", "https://blog.example.com/post/")
            .unwrap()
            .unwrap();
        assert_eq!(fetched.status, WebmentionStatus::Verified);
        assert_eq!(fetched.author_name.as_deref(), Some("Alice"));
    }

    #[test]
    fn test_get_for_target_only_returns_verified() {
        let (store, _dir) = store();
        let target = "https://blog.example.com/post/";
        let mut pending = ReceivedWebmention::pending("https://a.example/p", target);
        store.add(&pending).unwrap();
        pending.source = "https://b.example/p".to_owned();
        pending.status = WebmentionStatus::Verified;
        store.add(&pending).unwrap();

        let results = store.get_for_target(target).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].source, "https://b.example/p");
    }

    #[test]
    fn test_remove() {
        let (store, _dir) = store();
        let w = ReceivedWebmention::pending("https://a.example/p", "https://blog.example.com/post/");
        store.add(&w).unwrap();
        store.remove(&w.source, &w.target).unwrap();
        assert_eq!(store.count().unwrap(), 0);
    }
}
